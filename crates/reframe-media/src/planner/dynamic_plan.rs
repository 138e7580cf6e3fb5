//! Per-clip dynamic crop planning: smoothing and segmentation of
//! per-instant subject centers.

use std::path::Path;
use tracing::{debug, warn};

use super::PlannerConfig;
use crate::analyzer::FaceAnalyzer;
use crate::frames::sample_at;
use reframe_models::{CropSegment, DynamicCropPlan, VideoDimensions};

/// Derives a crop window that can move over one clip's duration, for
/// subjects that move across the frame.
///
/// Like the static planner, this never fails: sampling or analysis problems
/// collapse to a single geometrically-centered segment.
pub struct DynamicCropPlanner<'a> {
    config: &'a PlannerConfig,
    analyzer: &'a dyn FaceAnalyzer,
}

impl<'a> DynamicCropPlanner<'a> {
    pub fn new(config: &'a PlannerConfig, analyzer: &'a dyn FaceAnalyzer) -> Self {
        Self { config, analyzer }
    }

    /// Plan crop segments for the clip `[clip_start, clip_end]`.
    pub async fn plan(
        &self,
        video_path: &Path,
        dims: &VideoDimensions,
        clip_start: f64,
        clip_end: f64,
        active_speaker: bool,
    ) -> DynamicCropPlan {
        let (crop_width, crop_height) = self.config.crop_dims(dims);
        let duration = clip_end - clip_start;

        let count = sample_count(duration);
        let timestamps = clip_timestamps(clip_start, duration, count);

        let frames = match sample_at(video_path, &timestamps).await {
            Ok(frames) => frames,
            Err(e) => {
                warn!("Clip frame sampling failed, using centered segment: {}", e);
                return self.centered_plan(dims, clip_start, clip_end);
            }
        };

        let analysis = match self.analyzer.analyze(frames.paths(), active_speaker).await {
            Ok(a) if a.ok => a,
            Ok(a) => {
                warn!(error = ?a.error, "Analyzer reported failure, using centered segment");
                return self.centered_plan(dims, clip_start, clip_end);
            }
            Err(e) => {
                warn!("Analyzer invocation failed, using centered segment: {}", e);
                return self.centered_plan(dims, clip_start, clip_end);
            }
        };

        // Index-align reported centers with our timestamps; a shorter list
        // just means trailing frames had no estimate.
        let mut raw: Vec<Option<f64>> = analysis.frame_centers.clone();
        raw.resize(timestamps.len(), None);

        let smoothed = smooth_centers(&raw, dims.center_x(), self.config.smoothing_alpha);

        let jitter = self.config.jitter_threshold(crop_width);
        let segments = build_segments(
            &timestamps,
            &smoothed,
            clip_start,
            clip_end,
            jitter,
            self.config.min_segment_secs,
        );

        let segments = if segments.is_empty() {
            vec![CropSegment::new(clip_start, clip_end, dims.center_x())]
        } else {
            segments
        };

        debug!(
            segments = segments.len(),
            crop_width, crop_height, "Dynamic crop plan ready"
        );

        DynamicCropPlan {
            crop_width,
            crop_height,
            segments,
        }
    }

    fn centered_plan(
        &self,
        dims: &VideoDimensions,
        clip_start: f64,
        clip_end: f64,
    ) -> DynamicCropPlan {
        let (crop_width, crop_height) = self.config.crop_dims(dims);
        DynamicCropPlan {
            crop_width,
            crop_height,
            segments: vec![CropSegment::new(clip_start, clip_end, dims.center_x())],
        }
    }
}

/// Sample count scales with clip duration: one extra sample per ~10s,
/// clamped to `[3, 9]`.
fn sample_count(duration: f64) -> usize {
    (((duration / 10.0).round() as i64) + 2).clamp(3, 9) as usize
}

/// Timestamps evenly spaced strictly inside the clip range.
fn clip_timestamps(clip_start: f64, duration: f64, count: usize) -> Vec<f64> {
    let spacing = duration / (count as f64 + 1.0);
    (1..=count)
        .map(|i| clip_start + i as f64 * spacing)
        .collect()
}

/// Exponentially smooth per-instant centers.
///
/// Absent centers are filled by carry-forward from the previous smoothed
/// value (`fallback` seeds the first). `alpha` weights the new observation;
/// 0.6 damps single-frame detection noise without lagging far behind real
/// movement.
pub fn smooth_centers(raw: &[Option<f64>], fallback: f64, alpha: f64) -> Vec<f64> {
    let mut smoothed = Vec::with_capacity(raw.len());
    let mut prev: Option<f64> = None;

    for &value in raw {
        let filled = value.unwrap_or_else(|| prev.unwrap_or(fallback));
        let next = match prev {
            None => filled,
            Some(p) => p * (1.0 - alpha) + filled * alpha,
        };
        smoothed.push(next);
        prev = Some(next);
    }

    smoothed
}

/// One retained observation after jitter merging.
#[derive(Debug, Clone, Copy)]
struct Observation {
    time_sum: f64,
    center_sum: f64,
    count: usize,
}

impl Observation {
    fn new(time: f64, center: f64) -> Self {
        Self {
            time_sum: time,
            center_sum: center,
            count: 1,
        }
    }

    fn merge(&mut self, time: f64, center: f64) {
        self.time_sum += time;
        self.center_sum += center;
        self.count += 1;
    }

    fn time(&self) -> f64 {
        self.time_sum / self.count as f64
    }

    fn center(&self) -> f64 {
        self.center_sum / self.count as f64
    }
}

/// Turn smoothed per-instant centers into a small set of stable segments.
///
/// Consecutive samples whose centers differ by less than `jitter` merge into
/// one observation (averaging); encoding a new segment for negligible
/// movement buys nothing and costs a cut. Boundaries between retained
/// observations sit at the time midpoint; the first segment starts at
/// `clip_start` and the last ends at `clip_end`.
pub(crate) fn build_segments(
    timestamps: &[f64],
    centers: &[f64],
    clip_start: f64,
    clip_end: f64,
    jitter: f64,
    min_segment_secs: f64,
) -> Vec<CropSegment> {
    let mut observations: Vec<Observation> = Vec::new();
    for (&time, &center) in timestamps.iter().zip(centers) {
        match observations.last_mut() {
            Some(last) if (center - last.center()).abs() < jitter => {
                last.merge(time, center);
            }
            _ => observations.push(Observation::new(time, center)),
        }
    }

    if observations.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::with_capacity(observations.len());
    for (i, obs) in observations.iter().enumerate() {
        let start = if i == 0 {
            clip_start
        } else {
            (observations[i - 1].time() + obs.time()) / 2.0
        };
        let end = if i == observations.len() - 1 {
            clip_end
        } else {
            (obs.time() + observations[i + 1].time()) / 2.0
        };
        segments.push(CropSegment::new(start, end, obs.center()));
    }

    merge_short_segments(segments, min_segment_secs)
}

/// Merge segments shorter than `min_secs` into their predecessor, averaging
/// the center in and extending the end time. Very short segments produce
/// visually jittery, expensive-to-encode cuts.
pub fn merge_short_segments(segments: Vec<CropSegment>, min_secs: f64) -> Vec<CropSegment> {
    let mut merged: Vec<CropSegment> = Vec::with_capacity(segments.len());

    for segment in segments {
        match merged.last_mut() {
            Some(prev) if segment.duration() < min_secs => {
                prev.center_x = (prev.center_x + segment.center_x) / 2.0;
                prev.end_secs = segment.end_secs;
            }
            _ => merged.push(segment),
        }
    }

    // A too-short leading segment has no predecessor; fold it forward.
    if merged.len() >= 2 && merged[0].duration() < min_secs {
        let first = merged.remove(0);
        merged[0].center_x = (merged[0].center_x + first.center_x) / 2.0;
        merged[0].start_secs = first.start_secs;
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    const JITTER: f64 = 108.16; // 0.16 * 676
    const MIN_SEG: f64 = 0.9;

    fn assert_covers(segments: &[CropSegment], start: f64, end: f64) {
        assert!(!segments.is_empty());
        assert!((segments[0].start_secs - start).abs() < 1e-9);
        assert!((segments.last().unwrap().end_secs - end).abs() < 1e-9);
        for pair in segments.windows(2) {
            assert!(
                (pair[0].end_secs - pair[1].start_secs).abs() < 1e-9,
                "gap or overlap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
        for seg in segments {
            assert!(seg.end_secs > seg.start_secs);
        }
    }

    #[test]
    fn test_sample_count_scaling() {
        assert_eq!(sample_count(5.0), 3); // round(0.5)+2 = 3
        assert_eq!(sample_count(15.0), 4); // round(1.5)+2 = 4
        assert_eq!(sample_count(60.0), 8);
        assert_eq!(sample_count(300.0), 9); // clamped
        assert_eq!(sample_count(0.5), 3); // clamped
    }

    #[test]
    fn test_clip_timestamps_inside_range() {
        let ts = clip_timestamps(10.0, 15.0, 3);
        assert_eq!(ts.len(), 3);
        assert!(ts.iter().all(|&t| t > 10.0 && t < 25.0));
        // Spacing 15/4
        assert!((ts[0] - 13.75).abs() < 1e-9);
    }

    #[test]
    fn test_smoothing_constant_input_is_identity() {
        let raw = vec![Some(800.0); 6];
        let smoothed = smooth_centers(&raw, 960.0, 0.6);
        assert!(smoothed.iter().all(|&c| (c - 800.0).abs() < 1e-9));
    }

    #[test]
    fn test_smoothing_fills_gaps_with_carry_forward() {
        let raw = vec![Some(800.0), None, Some(800.0)];
        let smoothed = smooth_centers(&raw, 960.0, 0.6);
        // The gap repeats the previous smoothed value, so nothing moves
        assert!(smoothed.iter().all(|&c| (c - 800.0).abs() < 1e-9));
    }

    #[test]
    fn test_smoothing_all_absent_uses_fallback() {
        let raw = vec![None, None, None];
        let smoothed = smooth_centers(&raw, 960.0, 0.6);
        assert!(smoothed.iter().all(|&c| (c - 960.0).abs() < 1e-9));
    }

    #[test]
    fn test_smoothing_damps_jumps() {
        let raw = vec![Some(100.0), Some(1000.0)];
        let smoothed = smooth_centers(&raw, 960.0, 0.6);
        // 100*(1-0.6) + 1000*0.6 = 640
        assert!((smoothed[1] - 640.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_stable_subject_yields_one_segment() {
        let timestamps = [13.75, 17.5, 21.25];
        let centers = [800.0, 810.0, 795.0];
        let segments = build_segments(&timestamps, &centers, 10.0, 25.0, JITTER, MIN_SEG);
        assert_eq!(segments.len(), 1);
        assert_covers(&segments, 10.0, 25.0);
        // All three samples averaged in
        assert!((segments[0].center_x - 801.666_666).abs() < 1e-3);
    }

    #[test]
    fn test_moving_subject_yields_multiple_segments() {
        let timestamps = [12.0, 16.0, 20.0, 24.0];
        let centers = [400.0, 400.0, 1400.0, 1400.0];
        let segments = build_segments(&timestamps, &centers, 10.0, 26.0, JITTER, MIN_SEG);
        assert_eq!(segments.len(), 2);
        assert_covers(&segments, 10.0, 26.0);
        // Boundary at the midpoint between observation times (14, 22) -> 18
        assert!((segments[0].end_secs - 18.0).abs() < 1e-9);
        assert!((segments[0].center_x - 400.0).abs() < 1e-9);
        assert!((segments[1].center_x - 1400.0).abs() < 1e-9);
    }

    #[test]
    fn test_segment_coverage_many_moves() {
        let timestamps: Vec<f64> = (1..=8).map(|i| 10.0 + i as f64 * 2.0).collect();
        let centers = [200.0, 500.0, 800.0, 1100.0, 200.0, 1500.0, 700.0, 100.0];
        let segments = build_segments(&timestamps, &centers, 10.0, 28.0, JITTER, MIN_SEG);
        assert_covers(&segments, 10.0, 28.0);
    }

    #[test]
    fn test_empty_input_yields_no_segments() {
        let segments = build_segments(&[], &[], 10.0, 25.0, JITTER, MIN_SEG);
        assert!(segments.is_empty());
    }

    #[test]
    fn test_short_segments_merge_into_predecessor() {
        let segments = vec![
            CropSegment::new(0.0, 5.0, 400.0),
            CropSegment::new(5.0, 5.5, 1200.0),
            CropSegment::new(5.5, 10.0, 800.0),
        ];
        let merged = merge_short_segments(segments, MIN_SEG);
        assert_eq!(merged.len(), 2);
        // Middle segment averaged into the first and its end extended
        assert!((merged[0].end_secs - 5.5).abs() < 1e-9);
        assert!((merged[0].center_x - 800.0).abs() < 1e-9);
        assert_covers(&merged, 0.0, 10.0);
    }

    #[test]
    fn test_merge_idempotent_on_stable_segments() {
        // All pairwise durations >= min: feeding merged output back in
        // returns it unchanged.
        let segments = vec![
            CropSegment::new(0.0, 5.0, 400.0),
            CropSegment::new(5.0, 10.0, 1200.0),
            CropSegment::new(10.0, 16.0, 800.0),
        ];
        let once = merge_short_segments(segments.clone(), MIN_SEG);
        assert_eq!(once, segments);
        let twice = merge_short_segments(once.clone(), MIN_SEG);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_jitter_merge_idempotent() {
        // Observations whose centers all differ by more than the jitter
        // threshold are retained as-is by the jitter merge.
        let timestamps = [2.0, 6.0, 10.0];
        let centers = [200.0, 700.0, 1400.0];
        let segments = build_segments(&timestamps, &centers, 0.0, 12.0, JITTER, MIN_SEG);
        assert_eq!(segments.len(), 3);
        assert!((segments[0].center_x - 200.0).abs() < 1e-9);
        assert!((segments[1].center_x - 700.0).abs() < 1e-9);
        assert!((segments[2].center_x - 1400.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_leading_segment_folds_forward() {
        let segments = vec![
            CropSegment::new(0.0, 0.5, 400.0),
            CropSegment::new(0.5, 10.0, 1200.0),
        ];
        let merged = merge_short_segments(segments, MIN_SEG);
        assert_eq!(merged.len(), 1);
        assert_covers(&merged, 0.0, 10.0);
        assert!((merged[0].center_x - 800.0).abs() < 1e-9);
    }
}
