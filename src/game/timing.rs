use serde::{Deserialize, Serialize};
use thiserror::Error;

// --- Float tolerance ---

/// Absolute slack (ms) for comparing beat times.
pub const TIME_EPSILON_MS: f64 = 1e-7;
/// Relative slack, so far-out timestamps are not held to sub-ulp precision.
const TIME_EPSILON_REL: f64 = 1e-12;

#[inline(always)]
fn acceptable_difference(a: f64, b: f64) -> f64 {
    TIME_EPSILON_MS.max(a.abs().max(b.abs()) * TIME_EPSILON_REL)
}

/// `a > b` by more than the acceptable rounding slack.
#[inline(always)]
pub fn definitely_bigger(a: f64, b: f64) -> bool {
    a - acceptable_difference(a, b) > b
}

#[inline(always)]
pub fn almost_equals(a: f64, b: f64) -> bool {
    (a - b).abs() <= acceptable_difference(a, b)
}

// --- Control points ---

/// A timing declaration: from `time` onward, beats last `beat_length` ms and a
/// measure holds `time_signature` beats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingControlPoint {
    pub time: f64,
    pub beat_length: f64,
    pub time_signature: u32,
}

impl TimingControlPoint {
    pub const fn new(time: f64, beat_length: f64, time_signature: u32) -> Self {
        Self { time, beat_length, time_signature }
    }

    #[inline(always)]
    pub fn measure_length(&self) -> f64 {
        self.beat_length * f64::from(self.time_signature)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimingError {
    #[error("control point {index} at {time}ms has non-positive beat length {beat_length}")]
    NonPositiveBeatLength { index: usize, time: f64, beat_length: f64 },
    #[error("control point {index} has a non-finite time or beat length")]
    NonFinite { index: usize },
    #[error("control point {index} at {time}ms has a time signature of 0")]
    ZeroTimeSignature { index: usize, time: f64 },
    #[error("control point {index} at {time}ms comes before the previous point at {previous}ms")]
    OutOfOrder { index: usize, time: f64, previous: f64 },
    #[error("last object end time {0} is not finite")]
    NonFiniteEndTime(f64),
    #[error("timeline would produce {count} bar lines (limit {limit})")]
    TooManyBarLines { count: u64, limit: usize },
}

impl TimingError {
    /// Index of the offending control point, when the error is tied to one.
    pub const fn index(&self) -> Option<usize> {
        match *self {
            Self::NonPositiveBeatLength { index, .. }
            | Self::NonFinite { index }
            | Self::ZeroTimeSignature { index, .. }
            | Self::OutOfOrder { index, .. } => Some(index),
            Self::NonFiniteEndTime(_) | Self::TooManyBarLines { .. } => None,
        }
    }
}

/// Checks every point and their ordering. Equal times are allowed; a point
/// earlier than its predecessor is not.
pub fn validate_points(points: &[TimingControlPoint]) -> Result<(), TimingError> {
    let mut previous: Option<f64> = None;
    for (index, point) in points.iter().enumerate() {
        if !point.time.is_finite() || !point.beat_length.is_finite() {
            return Err(TimingError::NonFinite { index });
        }
        if point.beat_length <= 0.0 {
            return Err(TimingError::NonPositiveBeatLength {
                index,
                time: point.time,
                beat_length: point.beat_length,
            });
        }
        if point.time_signature == 0 {
            return Err(TimingError::ZeroTimeSignature { index, time: point.time });
        }
        if let Some(prev) = previous
            && point.time < prev
        {
            return Err(TimingError::OutOfOrder { index, time: point.time, previous: prev });
        }
        previous = Some(point.time);
    }
    Ok(())
}

// --- Timeline ---

/// Validated, time-ordered timing control points of one beatmap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingTimeline {
    points: Vec<TimingControlPoint>,
}

impl TimingTimeline {
    pub fn new(points: Vec<TimingControlPoint>) -> Result<Self, TimingError> {
        validate_points(&points)?;
        Ok(Self { points })
    }

    #[inline(always)]
    pub fn points(&self) -> &[TimingControlPoint] {
        &self.points
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> Option<&TimingControlPoint> {
        self.points.get(index)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
