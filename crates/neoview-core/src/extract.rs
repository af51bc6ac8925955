//! Sample value extraction for the signal viewer
//!
//! Down-sampling is a fixed-stride slice over the raw samples: a factor of
//! `k` keeps indices `0, k, 2k, …`. No filtering or interpolation is done.

use serde::Serialize;
use thiserror::Error;

use crate::model::{AnalogSignal, IrregularlySampledSignal, Segment};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExtractError {
    #[error("signal index {index} out of range ({count} signals)")]
    SignalIndex { index: usize, count: usize },
}

/// Stride applied to analog samples, always at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownSampleFactor(usize);

impl DownSampleFactor {
    pub const NONE: DownSampleFactor = DownSampleFactor(1);

    pub fn new(factor: usize) -> Self {
        Self(factor.max(1))
    }

    /// Parse a query value. Missing, non-integer and sub-1 values all mean 1.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse::<i64>().ok())
            .and_then(|n| usize::try_from(n).ok())
            .map(Self::new)
            .unwrap_or(Self::NONE)
    }

    pub fn get(self) -> usize {
        self.0
    }

    pub fn is_active(self) -> bool {
        self.0 > 1
    }
}

impl Default for DownSampleFactor {
    fn default() -> Self {
        Self::NONE
    }
}

/// Flat array for single-channel signals, one array per channel otherwise
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SignalValues {
    Single(Vec<f64>),
    PerChannel(Vec<Vec<f64>>),
}

impl SignalValues {
    fn from_channels(mut channels: Vec<Vec<f64>>) -> Self {
        if channels.len() == 1 {
            SignalValues::Single(channels.remove(0))
        } else {
            SignalValues::PerChannel(channels)
        }
    }
}

/// Payload of the analog signal endpoint
///
/// Analog signals report `t_start`/`t_stop`/`sampling_period`; irregular
/// signals report their explicit `times` instead.
#[derive(Debug, Clone, Serialize)]
pub struct SignalData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t_start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t_stop: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling_period: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub times: Option<Vec<f64>>,
    pub values: SignalValues,
    pub name: Option<String>,
    pub times_dimensionality: String,
    pub values_units: String,
}

/// Extract one signal from a segment.
///
/// Analog signals take precedence when the segment carries both kinds.
/// Returns `Ok(None)` when the segment has no signals at all.
pub fn extract_signal(
    segment: &Segment,
    index: usize,
    factor: DownSampleFactor,
) -> Result<Option<SignalData>, ExtractError> {
    if !segment.analog_signals.is_empty() {
        let signal = pick(&segment.analog_signals, index)?;
        Ok(Some(extract_analog(signal, factor)))
    } else if !segment.irregular_signals.is_empty() {
        let signal = pick(&segment.irregular_signals, index)?;
        Ok(Some(extract_irregular(signal)))
    } else {
        Ok(None)
    }
}

fn pick<T>(signals: &[T], index: usize) -> Result<&T, ExtractError> {
    signals.get(index).ok_or(ExtractError::SignalIndex {
        index,
        count: signals.len(),
    })
}

pub fn extract_analog(signal: &AnalogSignal, factor: DownSampleFactor) -> SignalData {
    let step = factor.get();
    let channels = signal
        .channels
        .iter()
        .map(|channel| channel.iter().step_by(step).copied().collect())
        .collect();

    SignalData {
        t_start: Some(signal.t_start),
        t_stop: Some(signal.t_stop()),
        sampling_period: Some(signal.sampling_period() * step as f64),
        times: None,
        values: SignalValues::from_channels(channels),
        name: signal.name.clone(),
        times_dimensionality: signal.time_units.clone(),
        values_units: signal.units.clone(),
    }
}

pub fn extract_irregular(signal: &IrregularlySampledSignal) -> SignalData {
    SignalData {
        t_start: None,
        t_stop: None,
        sampling_period: None,
        times: Some(signal.times.clone()),
        values: SignalValues::from_channels(signal.channels.clone()),
        name: signal.name.clone(),
        times_dimensionality: signal.time_units.clone(),
        values_units: signal.units.clone(),
    }
}
