use crate::game::timing::TimingTimeline;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitObject {
    pub start_time: f64,
    /// Zero-based column across all stages.
    pub column: u32,
    /// Set for hold notes.
    pub end_time: Option<f64>,
}

impl HitObject {
    pub const fn note(start_time: f64, column: u32) -> Self {
        Self { start_time, column, end_time: None }
    }

    pub const fn hold(start_time: f64, end_time: f64, column: u32) -> Self {
        Self { start_time, column, end_time: Some(end_time) }
    }

    /// End time for holds, start time otherwise.
    #[inline(always)]
    pub fn end_time(&self) -> f64 {
        self.end_time.unwrap_or(self.start_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
    pub columns: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatmapMetadata {
    pub title: String,
    pub artist: String,
    pub version: String,
}

/// A loaded, validated mania beatmap.
#[derive(Debug, Clone, PartialEq)]
pub struct Beatmap {
    pub metadata: BeatmapMetadata,
    timing: TimingTimeline,
    hit_objects: Vec<HitObject>,
    stages: Vec<StageDefinition>,
}

impl Beatmap {
    pub fn new(
        metadata: BeatmapMetadata,
        timing: TimingTimeline,
        mut hit_objects: Vec<HitObject>,
        stages: Vec<StageDefinition>,
    ) -> Self {
        hit_objects.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Self { metadata, timing, hit_objects, stages }
    }

    #[inline(always)]
    pub fn timing(&self) -> &TimingTimeline {
        &self.timing
    }

    #[inline(always)]
    pub fn hit_objects(&self) -> &[HitObject] {
        &self.hit_objects
    }

    #[inline(always)]
    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    #[inline(always)]
    pub fn total_columns(&self) -> u32 {
        self.stages.iter().map(|s| s.columns).sum()
    }

    /// Latest end time over all objects, `None` for an empty map.
    pub fn last_object_time(&self) -> Option<f64> {
        self.hit_objects
            .iter()
            .map(HitObject::end_time)
            .max_by(f64::total_cmp)
    }

    /// Copy laid out for dual-stage play: the stage layout appears twice.
    /// Objects keep their columns on the first stage.
    pub fn with_dual_stages(&self) -> Self {
        let mut stages = self.stages.clone();
        stages.extend_from_slice(&self.stages);
        Self {
            metadata: self.metadata.clone(),
            timing: self.timing.clone(),
            hit_objects: self.hit_objects.clone(),
            stages,
        }
    }
}
