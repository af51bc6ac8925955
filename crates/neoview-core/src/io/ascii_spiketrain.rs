//! Plain-text spike train reader: one train per line

use std::path::{Path, PathBuf};

use super::{data_lines, parse_number, ReadError, RecordingIo};
use crate::model::{Block, Segment, SpikeTrain};

pub struct AsciiSpikeTrainIo {
    path: PathBuf,
    time_units: String,
}

impl AsciiSpikeTrainIo {
    pub const NAME: &'static str = "AsciiSpikeTrainIO";
    pub const EXTENSIONS: &'static [&'static str] = &["txt"];

    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            time_units: "s".to_string(),
        }
    }

    pub fn open(path: &Path) -> Box<dyn RecordingIo> {
        Box::new(Self::new(path))
    }
}

impl RecordingIo for AsciiSpikeTrainIo {
    fn read_block(&mut self) -> Result<Block, ReadError> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ReadError::Invalid(format!("not a text file: {}", e)))?;

        let mut trains = Vec::new();
        for (line_no, line) in data_lines(&content, 0) {
            let times = line
                .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                .filter(|field| !field.is_empty())
                .map(|field| parse_number(field, line_no))
                .collect::<Result<Vec<_>, _>>()?;
            trains.push(times);
        }

        if trains.is_empty() {
            return Err(ReadError::Invalid("file contains no spike trains".to_string()));
        }

        // Trains share the segment's time base, ending at the last spike overall
        let t_stop = trains
            .iter()
            .flatten()
            .copied()
            .fold(0.0_f64, f64::max);

        let file_origin = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());

        let spike_trains = trains
            .into_iter()
            .enumerate()
            .map(|(i, times)| SpikeTrain {
                name: Some(format!("Unit {}", i)),
                time_units: self.time_units.clone(),
                t_start: 0.0,
                t_stop,
                times,
            })
            .collect();

        Ok(Block {
            file_origin: file_origin.clone(),
            segments: vec![Segment {
                file_origin,
                spike_trains,
                ..Default::default()
            }],
            ..Default::default()
        })
    }
}
