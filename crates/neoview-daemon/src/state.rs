//! Application state management

use anyhow::Result;
use neoview_core::io::AsciiSignalIo;
use neoview_core::{ReaderRegistry, Segment, Verdict};
use std::sync::Arc;
use tracing::info;

use crate::config::{block_verdict, Config};
use crate::fetch::FileFetcher;

/// Shared application state
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// Remote recording fetcher with caching
    pub fetcher: FileFetcher,
    /// Readers available for decoding, fixed at startup
    pub readers: ReaderRegistry,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config) -> Result<Arc<Self>> {
        let readers = ReaderRegistry::builtin();

        let fetcher = FileFetcher::new(
            config.cache.dir.clone(),
            config.cache.connect_timeout(),
            config.cache.read_timeout(),
            readers.extensions_of(AsciiSignalIo::NAME),
        )?;

        info!(
            cache = %fetcher.cache_dir().display(),
            readers = ?readers.names().collect::<Vec<_>>(),
            strict_consistency = config.consistency.strict,
            "Application state ready"
        );

        Ok(Arc::new(Self {
            config,
            fetcher,
            readers,
        }))
    }

    /// Block-level verdict using the configured check
    pub fn block_verdict(&self, segments: &[Segment]) -> Verdict {
        block_verdict(&self.config.consistency, segments)
    }
}
