//! Loader for `.osu` beatmaps in mania mode.
//!
//! Only the sections the timing core needs are read: `[General]`,
//! `[Metadata]`, `[Difficulty]`, `[TimingPoints]` and `[HitObjects]`.

use crate::game::bar_lines::count_bar_lines;
use crate::game::beatmap::{Beatmap, BeatmapMetadata, HitObject, StageDefinition};
use crate::game::timing::{TimingControlPoint, TimingError, TimingTimeline};
use log::{debug, info};
use std::path::Path;
use thiserror::Error;

const MANIA_MODE: i32 = 3;
/// Horizontal playfield width hit object x positions are expressed in.
const PLAYFIELD_WIDTH: f64 = 512.0;
/// Hit object type bit for a hold note.
const TYPE_HOLD: u32 = 1 << 7;
const DEFAULT_TIME_SIGNATURE: u32 = 4;
const MAX_COLUMNS: u32 = 18;

#[derive(Debug, Error)]
pub enum BeatmapError {
    #[error("failed to read beatmap: {0}")]
    Io(#[from] std::io::Error),
    #[error("beatmap mode {0} is not mania (3)")]
    UnsupportedMode(i32),
    #[error("beatmap does not declare a column count (Difficulty/CircleSize)")]
    MissingColumnCount,
    #[error("column count {0} is out of range 1..={MAX_COLUMNS}")]
    InvalidColumnCount(f64),
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("line {line}: invalid timing point: {source}")]
    InvalidTiming {
        line: usize,
        #[source]
        source: TimingError,
    },
    #[error("invalid timing data: {0}")]
    Timing(#[from] TimingError),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    General,
    Metadata,
    Difficulty,
    TimingPoints,
    HitObjects,
    Other,
}

impl Section {
    fn from_header(name: &str) -> Self {
        match name {
            "General" => Self::General,
            "Metadata" => Self::Metadata,
            "Difficulty" => Self::Difficulty,
            "TimingPoints" => Self::TimingPoints,
            "HitObjects" => Self::HitObjects,
            _ => Self::Other,
        }
    }
}

#[inline(always)]
fn malformed(line: usize, reason: impl Into<String>) -> BeatmapError {
    BeatmapError::Malformed { line, reason: reason.into() }
}

#[inline(always)]
fn parse_field<T: std::str::FromStr>(line: usize, name: &str, raw: &str) -> Result<T, BeatmapError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| malformed(line, format!("invalid {name} '{}'", raw.trim())))
}

/// `time,beatLength,meter,sampleSet,sampleIndex,volume,uninherited,effects`.
/// Returns `None` for inherited (velocity) points.
fn parse_timing_point(line: usize, text: &str) -> Result<Option<TimingControlPoint>, BeatmapError> {
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() < 2 {
        return Err(malformed(line, "timing point needs at least time and beat length"));
    }
    let time: f64 = parse_field(line, "time", parts[0])?;
    let beat_length: f64 = parse_field(line, "beat length", parts[1])?;
    let meter = match parts.get(2) {
        Some(raw) => parse_field::<i64>(line, "meter", raw)?,
        None => i64::from(DEFAULT_TIME_SIGNATURE),
    };
    // Old files omit the flag; a positive beat length then means uninherited.
    let uninherited = match parts.get(6) {
        Some(raw) => parse_field::<i32>(line, "uninherited flag", raw)? == 1,
        None => beat_length > 0.0,
    };
    if !uninherited {
        return Ok(None);
    }
    let time_signature = u32::try_from(meter)
        .map_err(|_| malformed(line, format!("time signature {meter} is negative")))?;
    Ok(Some(TimingControlPoint::new(time, beat_length, time_signature)))
}

/// `x,y,time,type,hitSound,extras`; holds carry `endTime:` as the first extra.
fn parse_hit_object(line: usize, text: &str, columns: u32) -> Result<HitObject, BeatmapError> {
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() < 4 {
        return Err(malformed(line, "hit object needs x, y, time and type"));
    }
    let x: f64 = parse_field(line, "x position", parts[0])?;
    let start_time: f64 = parse_field(line, "time", parts[2])?;
    let kind: u32 = parse_field(line, "type", parts[3])?;
    if !start_time.is_finite() {
        return Err(malformed(line, "hit object time is not finite"));
    }

    let column = ((x * f64::from(columns) / PLAYFIELD_WIDTH).floor().max(0.0) as u32)
        .min(columns - 1);

    if kind & TYPE_HOLD == 0 {
        return Ok(HitObject::note(start_time, column));
    }
    let end_raw = parts
        .get(5)
        .and_then(|extras| extras.split(':').next())
        .ok_or_else(|| malformed(line, "hold note is missing its end time"))?;
    let end_time: f64 = parse_field(line, "hold end time", end_raw)?;
    if !end_time.is_finite() || end_time < start_time {
        return Err(malformed(line, format!("hold ends at {end_time} before it starts")));
    }
    Ok(HitObject::hold(start_time, end_time, column))
}

#[inline(always)]
fn key_value(text: &str) -> Option<(&str, &str)> {
    text.split_once(':').map(|(k, v)| (k.trim(), v.trim()))
}

/// Parses `.osu` text into a validated beatmap.
///
/// Timing is fully validated here, including the bar-line ceiling, so a map
/// that loads can always be played.
pub fn parse_osu(text: &str) -> Result<Beatmap, BeatmapError> {
    let mut section = Section::Other;
    let mut mode = 0;
    let mut columns: Option<f64> = None;
    let mut metadata = BeatmapMetadata::default();
    let mut points: Vec<TimingControlPoint> = Vec::new();
    let mut point_lines: Vec<usize> = Vec::new();
    // Objects are parsed after the column count is known.
    let mut object_lines: Vec<(usize, &str)> = Vec::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
            section = Section::from_header(line[1..line.len() - 1].trim());
            continue;
        }
        match section {
            Section::General => {
                if let Some(("Mode", v)) = key_value(line) {
                    mode = parse_field(line_no, "mode", v)?;
                }
            }
            Section::Metadata => match key_value(line) {
                Some(("Title", v)) => metadata.title = v.to_string(),
                Some(("Artist", v)) => metadata.artist = v.to_string(),
                Some(("Version", v)) => metadata.version = v.to_string(),
                _ => {}
            },
            Section::Difficulty => {
                if let Some(("CircleSize", v)) = key_value(line) {
                    columns = Some(parse_field(line_no, "column count", v)?);
                }
            }
            Section::TimingPoints => {
                if let Some(point) = parse_timing_point(line_no, line)? {
                    points.push(point);
                    point_lines.push(line_no);
                }
            }
            Section::HitObjects => object_lines.push((line_no, line)),
            Section::Other => {}
        }
    }

    if mode != MANIA_MODE {
        return Err(BeatmapError::UnsupportedMode(mode));
    }
    let columns_f = columns.ok_or(BeatmapError::MissingColumnCount)?;
    let columns = columns_f.round();
    if !(1.0..=f64::from(MAX_COLUMNS)).contains(&columns) {
        return Err(BeatmapError::InvalidColumnCount(columns_f));
    }
    let columns = columns as u32;

    let timing = TimingTimeline::new(points).map_err(|source| match source.index() {
        Some(i) => BeatmapError::InvalidTiming { line: point_lines[i], source },
        None => BeatmapError::Timing(source),
    })?;

    let hit_objects = object_lines
        .into_iter()
        .map(|(line_no, line)| parse_hit_object(line_no, line, columns))
        .collect::<Result<Vec<_>, _>>()?;

    let beatmap = Beatmap::new(
        metadata,
        timing,
        hit_objects,
        vec![StageDefinition { columns }],
    );
    let bar_lines = count_bar_lines(beatmap.timing(), beatmap.last_object_time())?;
    debug!(
        "Parsed {} timing points, {} objects, {} bar lines.",
        beatmap.timing().len(),
        beatmap.hit_objects().len(),
        bar_lines
    );
    Ok(beatmap)
}

pub fn load_osu<P: AsRef<Path>>(path: P) -> Result<Beatmap, BeatmapError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let beatmap = parse_osu(&text)?;
    info!(
        "Loaded '{}' [{}] ({}K) from {}.",
        beatmap.metadata.title,
        beatmap.metadata.version,
        beatmap.total_columns(),
        path.display()
    );
    Ok(beatmap)
}
