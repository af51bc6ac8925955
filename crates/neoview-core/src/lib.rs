//! neoview Core - Recording model, download cache and consistency checks
//!
//! This crate provides the foundational pieces for the neoview daemon:
//! - Block/Segment/signal model for decoded electrophysiology recordings
//! - Flat download cache keyed by the remote directory of each file
//! - Consistency checks used to offer combined multi-signal views
//! - Signal value extraction with fixed-stride down-sampling
//! - Reader registry and plain-text signal/spike train readers
//! - JSON summaries with explicit serializer configuration

pub mod cache;
pub mod consistency;
pub mod extract;
pub mod io;
pub mod model;
pub mod summary;

pub use cache::{sha1_hex, CacheError, DownloadCache};
pub use consistency::{classify_block, classify_block_strict, classify_segment, Verdict};
pub use extract::{extract_signal, DownSampleFactor, ExtractError, SignalData, SignalValues};
pub use io::{ReadError, ReaderRegistry, RecordingIo};
pub use model::{AnalogSignal, Annotations, Block, IrregularlySampledSignal, Segment, SpikeTrain};
pub use summary::{BlockResponse, SegmentSummary, SerializerConfig, SpikeTrainData};
