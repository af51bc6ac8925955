//! Flat on-disk cache for downloaded recording files
//!
//! Files are stored under a directory named after the SHA-1 of the remote
//! directory they came from (`scheme://host/dir`), keeping their original
//! file name:
//!
//! ```text
//! {cache_root}/{sha1(scheme://host/dir)}/{file_name}
//! ```
//!
//! Sibling files in one remote directory therefore share a cache bucket,
//! which lets multi-file formats and `_about.json` sidecars sit next to the
//! recording they describe. Entries are never expired.
//!
//! Writes go through a temporary file in the bucket that is renamed onto the
//! final path, so concurrent downloads of the same URL replace each other as
//! whole files.

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use url::{Position, Url};

/// Suffix that replaces a file's extension to name its metadata sidecar
pub const SIDECAR_SUFFIX: &str = "_about.json";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to persist cache entry: {0}")]
    PersistError(#[from] tempfile::PersistError),
    #[error("URL has no file name: {0}")]
    NoFileName(String),
}

/// Download cache rooted at a configured directory
#[derive(Debug, Clone)]
pub struct DownloadCache {
    /// Base directory for the cache
    pub base_dir: PathBuf,
}

impl DownloadCache {
    /// Create a new cache at the given directory
    pub fn new(base_dir: PathBuf) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// `scheme://netloc/dir` of a URL, dropping file name, query and fragment
    pub fn base_url(url: &Url) -> String {
        format!("{}{}", &url[..Position::AfterPort], dirname(url.path()))
    }

    /// Name of the cache bucket holding files from this URL's directory
    pub fn directory_key(url: &Url) -> String {
        sha1_hex(Self::base_url(url).as_bytes())
    }

    /// Map a resolved URL to its local path, creating the bucket directory
    pub fn derive_cache_path(&self, resolved_url: &Url) -> Result<PathBuf, CacheError> {
        let file_name = basename(resolved_url.path());
        if file_name.is_empty() {
            return Err(CacheError::NoFileName(resolved_url.to_string()));
        }

        let dir = self.base_dir.join(Self::directory_key(resolved_url));
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join(file_name))
    }

    /// Check if a cache entry exists at the given path
    pub fn is_cached(path: &Path) -> bool {
        path.is_file()
    }

    /// Start writing a cache entry; nothing is visible at `path` until commit
    pub fn begin_entry(&self, path: &Path) -> Result<PendingEntry, CacheError> {
        let dir = path.parent().unwrap_or(&self.base_dir);
        std::fs::create_dir_all(dir)?;
        Ok(PendingEntry {
            file: NamedTempFile::new_in(dir)?,
            target: path.to_path_buf(),
        })
    }

    /// Store a complete file in the cache
    pub fn store(&self, path: &Path, content: &[u8]) -> Result<PathBuf, CacheError> {
        let mut entry = self.begin_entry(path)?;
        entry.write_chunk(content)?;
        entry.commit()
    }
}

/// Cache entry being written
pub struct PendingEntry {
    file: NamedTempFile,
    target: PathBuf,
}

impl PendingEntry {
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), CacheError> {
        self.file.write_all(chunk)?;
        Ok(())
    }

    /// Flush and atomically move the entry onto its final path
    pub fn commit(mut self) -> Result<PathBuf, CacheError> {
        self.file.flush()?;
        self.file.persist(&self.target)?;
        Ok(self.target)
    }
}

/// Local path of the metadata sidecar for a cached file
pub fn sidecar_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}", stem, SIDECAR_SUFFIX))
}

/// Remote URL of the metadata sidecar; only the trailing extension is replaced
pub fn sidecar_url(url: &Url) -> Url {
    let path = url.path();
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let stem_end = path[name_start..]
        .rfind('.')
        .filter(|&i| i > 0)
        .map(|i| name_start + i)
        .unwrap_or(path.len());

    let mut sidecar = url.clone();
    sidecar.set_path(&format!("{}{}", &path[..stem_end], SIDECAR_SUFFIX));
    sidecar.set_fragment(None);
    sidecar
}

/// Lowercase extension of a path, without the leading dot
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// POSIX `dirname`: `/a/b/f` → `/a/b`, `/f` → `/`
fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(i) => {
            let head = path[..i].trim_end_matches('/');
            if head.is_empty() {
                "/"
            } else {
                head
            }
        }
        None => "",
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

/// Compute SHA-1 hash of data and return as hex string
pub fn sha1_hex(data: &[u8]) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
