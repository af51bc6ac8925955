//! JSON payloads describing decoded recordings
//!
//! Response building takes an explicit [`SerializerConfig`] instead of
//! relying on globally registered encoders. Missing names and descriptions
//! serialize as empty strings, and per-signal entries in segment summaries
//! are empty placeholder objects whose count tells the viewer how many
//! signals exist.

use chrono::format::{Fixed, Item, StrftimeItems};
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::consistency::Verdict;
use crate::model::{Annotations, Block, Segment};

/// Serialization settings built once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializerConfig {
    /// strftime-style format for recording datetimes
    #[serde(default = "default_datetime_format")]
    pub datetime_format: String,
}

fn default_datetime_format() -> String {
    "%Y-%m-%dT%H:%M:%S%.3f".to_string()
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            datetime_format: default_datetime_format(),
        }
    }
}

impl SerializerConfig {
    /// True when the datetime format contains only valid specifiers
    pub fn is_valid(&self) -> bool {
        !StrftimeItems::new(&self.datetime_format).any(|item| item == Item::Error)
    }

    /// Format a datetime; `%.f`-style fractions are left out on whole seconds
    pub fn format_datetime(&self, dt: &NaiveDateTime) -> String {
        let whole_second = dt.nanosecond() == 0;
        let items: Vec<Item> = StrftimeItems::new(&self.datetime_format)
            .filter(|item| !(whole_second && is_fraction(item)))
            .collect();
        dt.format_with_items(items.iter()).to_string()
    }

    fn datetime(&self, dt: Option<&NaiveDateTime>) -> Option<String> {
        dt.map(|dt| self.format_datetime(dt))
    }
}

fn is_fraction(item: &Item) -> bool {
    matches!(
        item,
        Item::Fixed(
            Fixed::Nanosecond | Fixed::Nanosecond3 | Fixed::Nanosecond6 | Fixed::Nanosecond9
        )
    )
}

/// Stand-in for a signal in summaries; serializes as `{}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placeholder {}

fn placeholders<T>(items: &[T]) -> Vec<Placeholder> {
    vec![Placeholder {}; items.len()]
}

/// Block endpoint payload
#[derive(Debug, Clone, Serialize)]
pub struct BlockResponse {
    pub block: Vec<BlockSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockSummary {
    pub annotations: Annotations,
    pub description: String,
    pub file_origin: String,
    pub name: String,
    pub rec_datetime: Option<String>,
    pub file_name: String,
    pub segments: Vec<SegmentSummary>,
    /// "multi" when the first signal has more than one channel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<&'static str>,
    /// "exist" when any segment carries spike trains
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spike_trains: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentSummary {
    pub name: String,
    pub description: String,
    pub file_origin: String,
    pub annotations: Annotations,
    pub rec_datetime: Option<String>,
    pub spiketrains: Vec<Placeholder>,
    pub analogsignals: Vec<Placeholder>,
    pub irregularlysampledsignals: Vec<Placeholder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency: Option<&'static str>,
}

/// One entry of the spike train endpoint payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpikeTrainData {
    pub units: String,
    pub t_stop: f64,
    pub times: Vec<f64>,
}

/// Summarize a block together with its block-level verdict
pub fn summarize_block(
    block: &Block,
    file_name: &str,
    verdict: Verdict,
    config: &SerializerConfig,
) -> BlockResponse {
    let has_spike_trains = block.segments.iter().any(|s| !s.spike_trains.is_empty());

    BlockResponse {
        block: vec![BlockSummary {
            annotations: block.annotations.clone(),
            description: block.description.clone().unwrap_or_default(),
            file_origin: block.file_origin.clone().unwrap_or_default(),
            name: block.name.clone().unwrap_or_default(),
            rec_datetime: config.datetime(block.rec_datetime.as_ref()),
            file_name: file_name.to_string(),
            segments: block
                .segments
                .iter()
                .map(|s| summarize_segment(s, Verdict::Unspecified, config))
                .collect(),
            channels: has_multiple_channels(block).then_some("multi"),
            spike_trains: has_spike_trains.then_some("exist"),
            consistency: verdict.as_field(),
        }],
    }
}

/// Summarize one segment together with its segment-level verdict
pub fn summarize_segment(
    segment: &Segment,
    verdict: Verdict,
    config: &SerializerConfig,
) -> SegmentSummary {
    SegmentSummary {
        name: segment.name.clone().unwrap_or_default(),
        description: segment.description.clone().unwrap_or_default(),
        file_origin: segment.file_origin.clone().unwrap_or_default(),
        annotations: segment.annotations.clone(),
        rec_datetime: config.datetime(segment.rec_datetime.as_ref()),
        spiketrains: placeholders(&segment.spike_trains),
        analogsignals: placeholders(&segment.analog_signals),
        irregularlysampledsignals: placeholders(&segment.irregular_signals),
        consistency: verdict.as_field(),
    }
}

/// Spike trains of a segment keyed by their index
pub fn summarize_spike_trains(segment: &Segment) -> BTreeMap<usize, SpikeTrainData> {
    segment
        .spike_trains
        .iter()
        .enumerate()
        .map(|(i, st)| {
            (
                i,
                SpikeTrainData {
                    units: st.time_units.clone(),
                    t_stop: st.t_stop,
                    times: st.times.clone(),
                },
            )
        })
        .collect()
}

/// Whether the first signal of the first segment has several channels
fn has_multiple_channels(block: &Block) -> bool {
    let Some(first) = block.segments.first() else {
        return false;
    };
    first
        .analog_signals
        .first()
        .is_some_and(|s| s.channel_count() > 1)
        || first
            .irregular_signals
            .first()
            .is_some_and(|s| s.channel_count() > 1)
}
