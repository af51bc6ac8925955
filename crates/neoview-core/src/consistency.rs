//! Consistency checks deciding whether signals can be shown together
//!
//! The front end offers a combined multi-segment (or multi-signal) view only
//! when the relevant collections line up. Every check here reduces to
//! [`uniform_by`]: compare each element after the first against the first,
//! stopping at the first mismatch.

use serde::{Deserialize, Serialize};

use crate::model::{AnalogSignal, IrregularlySampledSignal, Segment};

/// Outcome of a consistency check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Nothing to compare, or a mismatch was found
    Unspecified,
    Consistent,
}

impl Verdict {
    pub fn is_consistent(self) -> bool {
        self == Verdict::Consistent
    }

    /// Value for the optional `consistency` response field
    pub fn as_field(self) -> Option<&'static str> {
        match self {
            Verdict::Consistent => Some("consistent"),
            Verdict::Unspecified => None,
        }
    }
}

/// `Consistent` when there are at least two items and every item after the
/// first satisfies `same(first, item)`.
pub fn uniform_by<T>(items: &[T], same: impl Fn(&T, &T) -> bool) -> Verdict {
    match items.split_first() {
        Some((first, rest)) if !rest.is_empty() => {
            if rest.iter().all(|item| same(first, item)) {
                Verdict::Consistent
            } else {
                Verdict::Unspecified
            }
        }
        _ => Verdict::Unspecified,
    }
}

/// Block-level check: do all segments carry the same number of signals?
///
/// Only the signal kind present on the first segment is compared (analog
/// first, then irregular). The other kind is never looked at, even when
/// later segments carry it.
pub fn classify_block(segments: &[Segment]) -> Verdict {
    let Some(first) = segments.first() else {
        return Verdict::Unspecified;
    };

    if !first.analog_signals.is_empty() {
        uniform_by(segments, |a, b| a.analog_signals.len() == b.analog_signals.len())
    } else if !first.irregular_signals.is_empty() {
        uniform_by(segments, |a, b| {
            a.irregular_signals.len() == b.irregular_signals.len()
        })
    } else {
        Verdict::Unspecified
    }
}

/// Block-level check comparing both signal kinds on every segment
pub fn classify_block_strict(segments: &[Segment]) -> Verdict {
    match segments.first() {
        Some(first) if !first.has_no_signals() => uniform_by(segments, |a, b| {
            a.analog_signals.len() == b.analog_signals.len()
                && a.irregular_signals.len() == b.irregular_signals.len()
        }),
        _ => Verdict::Unspecified,
    }
}

/// Segment-level check over whichever signal kind the segment carries
pub fn classify_segment(segment: &Segment) -> Verdict {
    if !segment.analog_signals.is_empty() {
        classify_analog(&segment.analog_signals)
    } else if !segment.irregular_signals.is_empty() {
        classify_irregular(&segment.irregular_signals)
    } else {
        Verdict::Unspecified
    }
}

/// Analog signals agree on units and sampling rate
pub fn classify_analog(signals: &[AnalogSignal]) -> Verdict {
    uniform_by(signals, |first, signal| {
        signal.units == first.units && signal.sampling_rate == first.sampling_rate
    })
}

/// Irregular signals agree on units and time units
pub fn classify_irregular(signals: &[IrregularlySampledSignal]) -> Verdict {
    uniform_by(signals, |first, signal| {
        signal.units == first.units && signal.time_units == first.time_units
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analog(units: &str, rate: f64) -> AnalogSignal {
        AnalogSignal {
            name: None,
            units: units.to_string(),
            sampling_rate: rate,
            t_start: 0.0,
            time_units: "s".to_string(),
            channels: vec![vec![0.0; 4]],
        }
    }

    fn irregular(units: &str, time_units: &str) -> IrregularlySampledSignal {
        IrregularlySampledSignal {
            name: None,
            units: units.to_string(),
            time_units: time_units.to_string(),
            times: vec![0.0, 0.3, 1.1],
            channels: vec![vec![0.0; 3]],
        }
    }

    fn segment_with_analog(count: usize) -> Segment {
        Segment {
            analog_signals: (0..count).map(|_| analog("mV", 1000.0)).collect(),
            ..Default::default()
        }
    }

    fn segment_with_irregular(count: usize) -> Segment {
        Segment {
            irregular_signals: (0..count).map(|_| irregular("mV", "s")).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_block_equal_counts_are_consistent() {
        let segments: Vec<_> = [2, 2, 2].into_iter().map(segment_with_analog).collect();
        assert_eq!(classify_block(&segments), Verdict::Consistent);
    }

    #[test]
    fn test_block_count_mismatch_is_unspecified() {
        let segments: Vec<_> = [2, 3, 2].into_iter().map(segment_with_analog).collect();
        assert_eq!(classify_block(&segments), Verdict::Unspecified);
    }

    #[test]
    fn test_block_single_segment_is_unspecified() {
        assert_eq!(classify_block(&[segment_with_analog(2)]), Verdict::Unspecified);
        assert_eq!(classify_block(&[]), Verdict::Unspecified);
    }

    #[test]
    fn test_block_irregular_counts() {
        let segments = vec![segment_with_irregular(1), segment_with_irregular(1)];
        assert_eq!(classify_block(&segments), Verdict::Consistent);

        let segments = vec![segment_with_irregular(1), segment_with_irregular(2)];
        assert_eq!(classify_block(&segments), Verdict::Unspecified);
    }

    #[test]
    fn test_block_without_signals_is_unspecified() {
        let segments = vec![Segment::default(), segment_with_analog(1)];
        assert_eq!(classify_block(&segments), Verdict::Unspecified);
    }

    #[test]
    fn test_block_ignores_kind_missing_from_first_segment() {
        let mut second = segment_with_analog(2);
        second.irregular_signals.push(irregular("mV", "s"));
        let segments = vec![segment_with_analog(2), second];

        assert_eq!(classify_block(&segments), Verdict::Consistent);
        assert_eq!(classify_block_strict(&segments), Verdict::Unspecified);
    }

    #[test]
    fn test_block_strict_matching_segments() {
        let mut first = segment_with_analog(2);
        first.irregular_signals.push(irregular("mV", "s"));
        let segments = vec![first.clone(), first];
        assert_eq!(classify_block_strict(&segments), Verdict::Consistent);
    }

    #[test]
    fn test_segment_matching_analog() {
        let segment = Segment {
            analog_signals: vec![analog("mV", 1000.0), analog("mV", 1000.0)],
            ..Default::default()
        };
        assert_eq!(classify_segment(&segment), Verdict::Consistent);
    }

    #[test]
    fn test_segment_rate_mismatch() {
        let segment = Segment {
            analog_signals: vec![analog("mV", 1000.0), analog("mV", 2000.0)],
            ..Default::default()
        };
        assert_eq!(classify_segment(&segment), Verdict::Unspecified);
    }

    #[test]
    fn test_segment_units_mismatch() {
        let signals = vec![analog("mV", 1000.0), analog("mV", 1000.0), analog("pA", 1000.0)];
        assert_eq!(classify_analog(&signals), Verdict::Unspecified);
    }

    #[test]
    fn test_segment_single_signal_is_unspecified() {
        let segment = Segment {
            analog_signals: vec![analog("mV", 1000.0)],
            ..Default::default()
        };
        assert_eq!(classify_segment(&segment), Verdict::Unspecified);
    }

    #[test]
    fn test_segment_irregular_time_units() {
        assert_eq!(
            classify_irregular(&[irregular("mV", "s"), irregular("mV", "s")]),
            Verdict::Consistent
        );
        assert_eq!(
            classify_irregular(&[irregular("mV", "s"), irregular("mV", "ms")]),
            Verdict::Unspecified
        );
    }

    #[test]
    fn test_verdict_field() {
        assert_eq!(Verdict::Consistent.as_field(), Some("consistent"));
        assert_eq!(Verdict::Unspecified.as_field(), None);
    }
}
