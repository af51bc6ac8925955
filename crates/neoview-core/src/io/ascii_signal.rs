//! Plain-text signal reader
//!
//! Each row is one sample and each column one channel. Reading options come
//! from a `<stem>_about.json` file next to the data when present, falling
//! back to defaults otherwise.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{data_lines, parse_number, split_fields, ReadError, RecordingIo};
use crate::cache::sidecar_path;
use crate::model::{AnalogSignal, Block, IrregularlySampledSignal, Segment};

/// Relative tolerance when deciding whether a time column is evenly spaced
const UNIFORM_TOLERANCE: f64 = 1e-6;

/// How columns are grouped into signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalGroupMode {
    /// One single-channel signal per column
    #[default]
    SplitAll,
    /// One multi-channel signal holding every column
    AllInOne,
}

/// Reading options, as stored in the `_about.json` sidecar
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AsciiSignalOptions {
    /// Column delimiter; detected from the first data row when unset
    pub delimiter: Option<String>,
    /// Leading lines to skip before parsing
    pub skiprows: usize,
    /// Columns to read (0-based); all when unset
    pub usecols: Option<Vec<usize>>,
    /// Column holding sample times
    pub timecolumn: Option<usize>,
    pub units: String,
    pub time_units: String,
    /// Used when there is no time column
    pub sampling_rate: Quantity,
    /// Used when there is no time column
    pub t_start: Quantity,
    pub signal_group_mode: SignalGroupMode,
}

impl Default for AsciiSignalOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            skiprows: 0,
            usecols: None,
            timecolumn: None,
            units: "V".to_string(),
            time_units: "s".to_string(),
            sampling_rate: Quantity::Bare(1.0),
            t_start: Quantity::Bare(0.0),
            signal_group_mode: SignalGroupMode::SplitAll,
        }
    }
}

/// A sidecar number, either bare or with units as neo writes quantities
///
/// Bare numbers are taken as already expressed in the signal's time units
/// (or their inverse for rates).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Bare(f64),
    WithUnits { value: f64, units: String },
}

impl Quantity {
    /// Time value converted to `time_units`
    pub fn to_time(&self, time_units: &str) -> Result<f64, ReadError> {
        match self {
            Quantity::Bare(value) => Ok(*value),
            Quantity::WithUnits { value, units } if units == time_units => Ok(*value),
            Quantity::WithUnits { value, units } => {
                Ok(value * seconds_per(units)? / seconds_per(time_units)?)
            }
        }
    }

    /// Rate converted to samples per `time_units`
    pub fn to_rate(&self, time_units: &str) -> Result<f64, ReadError> {
        match self {
            Quantity::Bare(value) => Ok(*value),
            Quantity::WithUnits { value, units } => {
                Ok(value * hertz_per(units)? * seconds_per(time_units)?)
            }
        }
    }
}

fn seconds_per(units: &str) -> Result<f64, ReadError> {
    match units {
        "s" | "sec" => Ok(1.0),
        "ms" => Ok(1e-3),
        "us" | "µs" | "μs" => Ok(1e-6),
        "ns" => Ok(1e-9),
        "min" => Ok(60.0),
        _ => Err(ReadError::Invalid(format!("unsupported time units {:?}", units))),
    }
}

fn hertz_per(units: &str) -> Result<f64, ReadError> {
    match units {
        "Hz" | "1/s" => Ok(1.0),
        "kHz" => Ok(1e3),
        "MHz" => Ok(1e6),
        _ => Err(ReadError::Invalid(format!("unsupported rate units {:?}", units))),
    }
}

/// Reader for delimited numeric text files
pub struct AsciiSignalIo {
    path: PathBuf,
    options: Option<AsciiSignalOptions>,
}

impl AsciiSignalIo {
    pub const NAME: &'static str = "AsciiSignalIO";
    pub const EXTENSIONS: &'static [&'static str] = &["txt", "asc", "csv", "tsv"];

    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            options: None,
        }
    }

    /// Reader with explicit options; the sidecar is not consulted
    pub fn with_options(path: &Path, options: AsciiSignalOptions) -> Self {
        Self {
            path: path.to_path_buf(),
            options: Some(options),
        }
    }

    pub fn open(path: &Path) -> Box<dyn RecordingIo> {
        Box::new(Self::new(path))
    }

    fn load_options(&self) -> Result<AsciiSignalOptions, ReadError> {
        if let Some(options) = &self.options {
            return Ok(options.clone());
        }

        let about = sidecar_path(&self.path);
        if about.is_file() {
            debug!(path = %about.display(), "Reading signal metadata");
            let content = std::fs::read_to_string(&about)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(AsciiSignalOptions::default())
        }
    }
}

impl RecordingIo for AsciiSignalIo {
    fn read_block(&mut self) -> Result<Block, ReadError> {
        let options = self.load_options()?;
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ReadError::Invalid(format!("not a text file: {}", e)))?;
        let columns = parse_columns(&content, &options)?;
        let segment = build_segment(columns, &options)?;

        let file_origin = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());

        Ok(Block {
            file_origin: file_origin.clone(),
            segments: vec![Segment {
                file_origin,
                ..segment
            }],
            ..Default::default()
        })
    }
}

fn detect_delimiter(line: &str) -> Option<&'static str> {
    if line.contains('\t') {
        Some("\t")
    } else if line.contains(',') {
        Some(",")
    } else if line.contains(';') {
        Some(";")
    } else {
        None
    }
}

/// Parse the file into columns of equal length
fn parse_columns(content: &str, options: &AsciiSignalOptions) -> Result<Vec<Vec<f64>>, ReadError> {
    let mut columns: Vec<Vec<f64>> = Vec::new();
    let mut delimiter = options.delimiter.clone();

    for (line_no, line) in data_lines(content, options.skiprows) {
        if delimiter.is_none() {
            delimiter = detect_delimiter(line).map(str::to_string);
        }
        let fields = split_fields(line, delimiter.as_deref());

        if columns.is_empty() {
            columns = vec![Vec::new(); fields.len()];
        } else if fields.len() != columns.len() {
            return Err(ReadError::Parse {
                line: line_no,
                message: format!("expected {} columns, found {}", columns.len(), fields.len()),
            });
        }

        for (column, field) in columns.iter_mut().zip(fields) {
            column.push(parse_number(field, line_no)?);
        }
    }

    if columns.is_empty() {
        return Err(ReadError::Invalid("file contains no samples".to_string()));
    }
    Ok(columns)
}

fn build_segment(
    mut columns: Vec<Vec<f64>>,
    options: &AsciiSignalOptions,
) -> Result<Segment, ReadError> {
    let column_count = columns.len();
    let check = |index: usize| {
        if index < column_count {
            Ok(index)
        } else {
            Err(ReadError::Invalid(format!(
                "column {} out of range ({} columns)",
                index, column_count
            )))
        }
    };

    let time_index = options.timecolumn.map(check).transpose()?;
    let wanted: Vec<usize> = match &options.usecols {
        Some(cols) => cols.iter().map(|&c| check(c)).collect::<Result<_, _>>()?,
        None => (0..column_count).collect(),
    };

    let times = time_index.map(|i| std::mem::take(&mut columns[i]));
    let data: Vec<Vec<f64>> = wanted
        .into_iter()
        .filter(|&i| Some(i) != time_index)
        .map(|i| columns[i].clone())
        .collect();

    if data.is_empty() {
        return Err(ReadError::Invalid("no signal columns selected".to_string()));
    }

    let t_start = options.t_start.to_time(&options.time_units)?;

    let mut segment = Segment::default();
    match times {
        None => {
            let sampling_rate = options.sampling_rate.to_rate(&options.time_units)?;
            segment.analog_signals = group_analog(data, sampling_rate, t_start, options);
        }
        Some(times) => match uniform_interval(&times) {
            Some(interval) => {
                let t_start = times.first().copied().unwrap_or(t_start);
                segment.analog_signals = group_analog(data, 1.0 / interval, t_start, options);
            }
            None => {
                segment.irregular_signals = vec![IrregularlySampledSignal {
                    name: Some("multichannel".to_string()),
                    units: options.units.clone(),
                    time_units: options.time_units.clone(),
                    times,
                    channels: data,
                }];
            }
        },
    }
    Ok(segment)
}

fn group_analog(
    data: Vec<Vec<f64>>,
    sampling_rate: f64,
    t_start: f64,
    options: &AsciiSignalOptions,
) -> Vec<AnalogSignal> {
    let make = |name: String, channels: Vec<Vec<f64>>| AnalogSignal {
        name: Some(name),
        units: options.units.clone(),
        sampling_rate,
        t_start,
        time_units: options.time_units.clone(),
        channels,
    };

    match options.signal_group_mode {
        SignalGroupMode::SplitAll => data
            .into_iter()
            .enumerate()
            .map(|(i, column)| make(format!("Column {}", i), vec![column]))
            .collect(),
        SignalGroupMode::AllInOne => vec![make("multichannel".to_string(), data)],
    }
}

/// Common spacing of a strictly increasing, evenly spaced time column
fn uniform_interval(times: &[f64]) -> Option<f64> {
    if times.len() < 2 {
        return None;
    }
    let first = times[1] - times[0];
    if first <= 0.0 {
        return None;
    }
    let even = times
        .windows(2)
        .all(|w| ((w[1] - w[0]) - first).abs() <= first * UNIFORM_TOLERANCE);
    even.then_some(first)
}
