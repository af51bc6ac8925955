//! Recording readers and the registry that selects them
//!
//! Readers are registered once at startup under a fixed name. A file is
//! opened either by extension (first registered reader wins) or by naming
//! a reader explicitly, which bypasses extension detection.

mod ascii_signal;
mod ascii_spiketrain;

pub use ascii_signal::{AsciiSignalIo, AsciiSignalOptions, Quantity, SignalGroupMode};
pub use ascii_spiketrain::AsciiSpikeTrainIo;

use std::path::Path;
use thiserror::Error;

use crate::cache::extension_of;
use crate::model::Block;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid metadata file: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("File extension {0:?} not registered")]
    UnsupportedExtension(String),
    #[error("Unknown reader type: {0}")]
    UnknownReader(String),
    #[error("{0}")]
    Invalid(String),
}

/// A reader bound to one file
pub trait RecordingIo {
    /// Decode the whole file into a block
    fn read_block(&mut self) -> Result<Block, ReadError>;
}

/// Constructor for a reader bound to a path
pub type OpenFn = fn(&Path) -> Box<dyn RecordingIo>;

/// Registry entry for one reader type
#[derive(Clone, Copy)]
pub struct ReaderEntry {
    pub name: &'static str,
    /// Lowercase extensions without the leading dot
    pub extensions: &'static [&'static str],
    pub open: OpenFn,
}

impl std::fmt::Debug for ReaderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderEntry")
            .field("name", &self.name)
            .field("extensions", &self.extensions)
            .finish()
    }
}

/// Ordered, closed set of readers
#[derive(Debug, Clone, Default)]
pub struct ReaderRegistry {
    entries: Vec<ReaderEntry>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every reader shipped in this crate
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ReaderEntry {
            name: AsciiSignalIo::NAME,
            extensions: AsciiSignalIo::EXTENSIONS,
            open: AsciiSignalIo::open,
        });
        registry.register(ReaderEntry {
            name: AsciiSpikeTrainIo::NAME,
            extensions: AsciiSpikeTrainIo::EXTENSIONS,
            open: AsciiSpikeTrainIo::open,
        });
        registry
    }

    pub fn register(&mut self, entry: ReaderEntry) {
        self.entries.retain(|e| e.name != entry.name);
        self.entries.push(entry);
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.name)
    }

    /// Extensions handled by the named reader, empty if unknown
    pub fn extensions_of(&self, name: &str) -> &'static [&'static str] {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.extensions)
            .unwrap_or(&[])
    }

    /// Pick a reader from the file extension
    pub fn get_io(&self, path: &Path) -> Result<Box<dyn RecordingIo>, ReadError> {
        let ext = extension_of(path).unwrap_or_default();
        self.entries
            .iter()
            .find(|e| e.extensions.contains(&ext.as_str()))
            .map(|e| (e.open)(path))
            .ok_or(ReadError::UnsupportedExtension(ext))
    }

    /// Open a file with an explicitly named reader
    pub fn by_name(&self, name: &str, path: &Path) -> Result<Box<dyn RecordingIo>, ReadError> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| (e.open)(path))
            .ok_or_else(|| ReadError::UnknownReader(name.to_string()))
    }

    /// Decode a file, forcing a reader when `io_type` is given
    pub fn read_block(&self, path: &Path, io_type: Option<&str>) -> Result<Block, ReadError> {
        let mut io = match io_type {
            Some(name) => self.by_name(name, path)?,
            None => self.get_io(path)?,
        };
        io.read_block()
    }
}

/// Split a line on the given delimiter, or on whitespace when none is set
pub(crate) fn split_fields<'a>(line: &'a str, delimiter: Option<&'a str>) -> Vec<&'a str> {
    match delimiter {
        Some(d) if !d.trim().is_empty() => line.split(d).map(str::trim).collect(),
        _ => line.split_whitespace().collect(),
    }
}

/// Parse one numeric field, reporting the 1-based line on failure
pub(crate) fn parse_number(field: &str, line: usize) -> Result<f64, ReadError> {
    field.parse::<f64>().map_err(|_| ReadError::Parse {
        line,
        message: format!("not a number: {:?}", field),
    })
}

/// Lines that carry data: non-empty and not `#` comments
pub(crate) fn data_lines(content: &str, skip: usize) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .skip(skip)
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}
