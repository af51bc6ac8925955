//! In-memory recording tree: Block → Segment → signals and spike trains
//!
//! Readers build these values once per request; nothing downstream mutates
//! them. Signal data is stored channel-major, so a signal of shape
//! `(n_samples, n_channels)` holds `n_channels` vectors of `n_samples` values.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// Free-form annotations attached to blocks and segments
pub type Annotations = BTreeMap<String, String>;

/// Top-level container for one decoded recording file
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub name: Option<String>,
    pub description: Option<String>,
    pub file_origin: Option<String>,
    pub rec_datetime: Option<NaiveDateTime>,
    pub annotations: Annotations,
    pub segments: Vec<Segment>,
}

/// A period of recording with a common time base
#[derive(Debug, Clone, Default)]
pub struct Segment {
    pub name: Option<String>,
    pub description: Option<String>,
    pub file_origin: Option<String>,
    pub rec_datetime: Option<NaiveDateTime>,
    pub annotations: Annotations,
    pub analog_signals: Vec<AnalogSignal>,
    pub irregular_signals: Vec<IrregularlySampledSignal>,
    pub spike_trains: Vec<SpikeTrain>,
}

impl Segment {
    /// True when the segment carries no signal of either kind
    pub fn has_no_signals(&self) -> bool {
        self.analog_signals.is_empty() && self.irregular_signals.is_empty()
    }
}

/// Regularly sampled, possibly multi-channel signal
#[derive(Debug, Clone)]
pub struct AnalogSignal {
    pub name: Option<String>,
    /// Physical unit dimensionality, e.g. "mV"
    pub units: String,
    /// Sampling rate magnitude in Hz
    pub sampling_rate: f64,
    pub t_start: f64,
    /// Unit of `t_start` and the sampling period, e.g. "s"
    pub time_units: String,
    /// One vector per channel, all the same length
    pub channels: Vec<Vec<f64>>,
}

impl AnalogSignal {
    /// `(n_samples, n_channels)`
    pub fn shape(&self) -> (usize, usize) {
        (self.sample_count(), self.channels.len())
    }

    pub fn sample_count(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn sampling_period(&self) -> f64 {
        1.0 / self.sampling_rate
    }

    pub fn t_stop(&self) -> f64 {
        self.t_start + self.sample_count() as f64 * self.sampling_period()
    }
}

/// Signal sampled at explicit, possibly uneven, times
#[derive(Debug, Clone)]
pub struct IrregularlySampledSignal {
    pub name: Option<String>,
    pub units: String,
    pub time_units: String,
    pub times: Vec<f64>,
    /// One vector per channel, each as long as `times`
    pub channels: Vec<Vec<f64>>,
}

impl IrregularlySampledSignal {
    /// `(n_samples, n_channels)`
    pub fn shape(&self) -> (usize, usize) {
        (self.times.len(), self.channels.len())
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn t_start(&self) -> f64 {
        self.times.first().copied().unwrap_or(0.0)
    }

    pub fn t_stop(&self) -> f64 {
        self.times.last().copied().unwrap_or(0.0)
    }
}

/// Spike times of a single unit
#[derive(Debug, Clone)]
pub struct SpikeTrain {
    pub name: Option<String>,
    pub time_units: String,
    pub t_start: f64,
    pub t_stop: f64,
    pub times: Vec<f64>,
}
