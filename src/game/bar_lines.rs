use crate::game::timing::{
    TimingControlPoint, TimingError, TimingTimeline, definitely_bigger,
};
use log::debug;
use serde::Serialize;

/// Hard ceiling on generated bar lines for one beatmap. At 60 BPM this is
/// over a week of music, so only corrupt timing data can reach it.
pub const MAX_BAR_LINES: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BarLine {
    pub start_time: f64,
    /// Index of the owning point in the beatmap's [`TimingTimeline`].
    pub control_point: usize,
    /// Beat number within the owning segment, starting at 0.
    pub beat_index: u32,
    /// First beat of a measure.
    pub major: bool,
}

impl BarLine {
    #[inline(always)]
    pub fn control_point<'a>(&self, timeline: &'a TimingTimeline) -> Option<&'a TimingControlPoint> {
        timeline.get(self.control_point)
    }
}

/// Where segment `i` stops emitting bar lines.
///
/// One beat short of the next point, so that point's own first bar line owns
/// the boundary. The last segment runs one full measure past the last object,
/// or emits nothing when there are no objects.
#[inline(always)]
fn segment_end(points: &[TimingControlPoint], i: usize, last_object_time: Option<f64>) -> Option<f64> {
    let point = &points[i];
    match points.get(i + 1) {
        Some(next) => Some(next.time - point.beat_length),
        None => last_object_time.map(|t| t + point.measure_length()),
    }
}

/// Number of beats `k >= 0` with `start + k * beat_length` definitely before `end`.
fn segment_len(start: f64, end: f64, beat_length: f64) -> u64 {
    if !definitely_bigger(end, start) {
        return 0;
    }
    let estimate = ((end - start) / beat_length).ceil();
    if !estimate.is_finite() || estimate > (MAX_BAR_LINES as f64) + 1.0 {
        // Already over the ceiling; the exact figure does not matter.
        return estimate.min(u64::MAX as f64) as u64;
    }
    // The division can be off by one in either direction near the boundary.
    let mut n = estimate as u64;
    while n > 0 && !definitely_bigger(end, start + (n - 1) as f64 * beat_length) {
        n -= 1;
    }
    while definitely_bigger(end, start + n as f64 * beat_length) {
        n += 1;
    }
    n
}

/// Total bar lines [`generate_bar_lines`] would emit, without allocating them.
pub fn count_bar_lines(
    timeline: &TimingTimeline,
    last_object_time: Option<f64>,
) -> Result<u64, TimingError> {
    if let Some(t) = last_object_time
        && !t.is_finite()
    {
        return Err(TimingError::NonFiniteEndTime(t));
    }
    let points = timeline.points();
    let mut total: u64 = 0;
    for (i, point) in points.iter().enumerate() {
        let Some(end) = segment_end(points, i, last_object_time) else { continue };
        total = total.saturating_add(segment_len(point.time, end, point.beat_length));
    }
    if total > MAX_BAR_LINES as u64 {
        return Err(TimingError::TooManyBarLines { count: total, limit: MAX_BAR_LINES });
    }
    Ok(total)
}

/// Builds the bar lines for every timing segment, in time order.
///
/// `last_object_time` is the latest end (or start) time of any gameplay
/// object, `None` when the beatmap has none. The whole timeline is checked
/// against [`MAX_BAR_LINES`] before anything is generated.
pub fn generate_bar_lines(
    timeline: &TimingTimeline,
    last_object_time: Option<f64>,
) -> Result<Vec<BarLine>, TimingError> {
    let total = count_bar_lines(timeline, last_object_time)?;
    let points = timeline.points();
    let mut out = Vec::with_capacity(total as usize);

    for (i, point) in points.iter().enumerate() {
        let Some(end) = segment_end(points, i, last_object_time) else { continue };
        let beats = segment_len(point.time, end, point.beat_length);
        for k in 0..beats {
            // Multiply instead of accumulating so drift cannot build up.
            let beat_index = k as u32;
            out.push(BarLine {
                start_time: point.time + k as f64 * point.beat_length,
                control_point: i,
                beat_index,
                major: beat_index % point.time_signature == 0,
            });
        }
    }

    debug!(
        "Generated {} bar lines across {} timing segments.",
        out.len(),
        points.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn timeline(points: &[(f64, f64, u32)]) -> TimingTimeline {
        TimingTimeline::new(
            points
                .iter()
                .map(|&(time, beat_length, sig)| TimingControlPoint::new(time, beat_length, sig))
                .collect(),
        )
        .expect("test timeline should be valid")
    }

    fn times(lines: &[BarLine]) -> Vec<f64> {
        lines.iter().map(|l| l.start_time).collect()
    }

    #[test]
    fn empty_timeline_yields_nothing() {
        let lines = generate_bar_lines(&TimingTimeline::default(), Some(5000.0)).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn single_point_runs_one_measure_past_last_object() {
        let tl = timeline(&[(0.0, 500.0, 4)]);
        let lines = generate_bar_lines(&tl, Some(1000.0)).unwrap();
        assert_eq!(times(&lines), vec![0.0, 500.0, 1000.0, 1500.0, 2000.0, 2500.0]);
        assert_eq!(
            lines.iter().map(|l| l.beat_index).collect::<Vec<_>>(),
            vec![0, 1, 2, 3, 4, 5]
        );
        assert!(lines.iter().all(|l| l.start_time < 3000.0));
    }

    #[test]
    fn segment_stops_one_beat_before_next_point() {
        let tl = timeline(&[(0.0, 500.0, 4), (2000.0, 1000.0, 4)]);
        let lines = generate_bar_lines(&tl, Some(3000.0)).unwrap();
        let first: Vec<_> = lines.iter().filter(|l| l.control_point == 0).collect();
        assert_eq!(
            first.iter().map(|l| (l.start_time, l.beat_index)).collect::<Vec<_>>(),
            vec![(0.0, 0), (500.0, 1), (1000.0, 2)]
        );
        // Second segment ends at 3000 + 4 * 1000.
        let second: Vec<_> = lines.iter().filter(|l| l.control_point == 1).collect();
        assert_eq!(
            second.iter().map(|l| l.start_time).collect::<Vec<_>>(),
            vec![2000.0, 3000.0, 4000.0, 5000.0, 6000.0]
        );
        assert_eq!(second[0].beat_index, 0);
    }

    #[test]
    fn beat_index_resets_per_segment_and_marks_measures() {
        let tl = timeline(&[(0.0, 100.0, 3), (1000.0, 100.0, 4)]);
        let lines = generate_bar_lines(&tl, Some(1000.0)).unwrap();
        for pair in lines.windows(2) {
            if pair[0].control_point != pair[1].control_point {
                assert_eq!(pair[1].beat_index, 0);
            }
        }
        let majors: Vec<_> = lines.iter().filter(|l| l.major).map(|l| l.start_time).collect();
        assert_eq!(majors, vec![0.0, 300.0, 600.0, 1000.0]);
        assert_eq!(lines[0].control_point(&tl).map(|p| p.time_signature), Some(3));
    }

    #[test]
    fn no_objects_leaves_final_segment_empty() {
        let tl = timeline(&[(0.0, 500.0, 4), (2000.0, 500.0, 4)]);
        let lines = generate_bar_lines(&tl, None).unwrap();
        assert_eq!(times(&lines), vec![0.0, 500.0, 1000.0]);
    }

    #[test]
    fn tiny_beat_length_over_many_beats_has_exact_count() {
        // 999.6 + 0.1 * 4 lands on 1000ms; the 10_000th beat sits on the end.
        let tl = timeline(&[(0.0, 0.1, 4)]);
        let lines = generate_bar_lines(&tl, Some(999.6)).unwrap();
        assert_eq!(lines.len(), 10_000);
        let last = lines.last().unwrap();
        assert_eq!(last.beat_index, 9_999);
        assert_abs_diff_eq!(last.start_time, 999.9, epsilon = 1e-6);
    }

    #[test]
    fn overlapping_points_produce_no_lines_for_the_short_segment() {
        // Next point arrives before one full beat has passed.
        let tl = timeline(&[(0.0, 500.0, 4), (400.0, 500.0, 4)]);
        let lines = generate_bar_lines(&tl, Some(400.0)).unwrap();
        assert!(lines.iter().all(|l| l.control_point == 1));
        assert_eq!(lines[0].start_time, 400.0);
    }

    #[test]
    fn rejects_runaway_timelines_before_generating() {
        let tl = timeline(&[(0.0, 1e-6, 4)]);
        let err = generate_bar_lines(&tl, Some(1.0e6)).unwrap_err();
        assert!(matches!(err, TimingError::TooManyBarLines { .. }));
        assert!(matches!(
            generate_bar_lines(&tl, Some(f64::INFINITY)),
            Err(TimingError::NonFiniteEndTime(_))
        ));
    }

    #[test]
    fn count_matches_generation() {
        let tl = timeline(&[(-250.0, 333.333, 4), (5000.0, 428.571, 7), (9000.0, 250.0, 4)]);
        let count = count_bar_lines(&tl, Some(12_345.0)).unwrap();
        let lines = generate_bar_lines(&tl, Some(12_345.0)).unwrap();
        assert_eq!(count as usize, lines.len());
    }

    fn arb_timeline() -> impl Strategy<Value = (Vec<TimingControlPoint>, Option<f64>)> {
        let point = (1.0f64..5000.0, 1.0f64..2000.0, 1u32..8);
        (
            prop::collection::vec(point, 1..6),
            prop::option::of(0.0f64..60_000.0),
        )
            .prop_map(|(raw, last)| {
                let mut time = 0.0;
                let points = raw
                    .into_iter()
                    .map(|(gap, beat_length, sig)| {
                        let p = TimingControlPoint::new(time, beat_length, sig);
                        time += gap;
                        p
                    })
                    .collect();
                (points, last)
            })
    }

    proptest! {
        #[test]
        fn generation_terminates_with_one_beat_spacing((points, last) in arb_timeline()) {
            let tl = TimingTimeline::new(points).unwrap();
            let lines = generate_bar_lines(&tl, last).unwrap();
            for pair in lines.windows(2) {
                prop_assert!(pair[0].start_time <= pair[1].start_time);
                if pair[0].control_point == pair[1].control_point {
                    let bl = tl.points()[pair[0].control_point].beat_length;
                    prop_assert!((pair[1].start_time - pair[0].start_time - bl).abs() < 1e-6);
                    prop_assert_eq!(pair[1].beat_index, pair[0].beat_index + 1);
                } else {
                    prop_assert_eq!(pair[1].beat_index, 0);
                }
            }
            for line in &lines {
                let points = tl.points();
                let end = segment_end(points, line.control_point, last).unwrap();
                prop_assert!(definitely_bigger(end, line.start_time));
            }
        }
    }
}
