//! Filter graph compilation for multi-segment crops.
//!
//! A [`DynamicCropPlan`] becomes a trim -> crop -> concat graph the encoder
//! executes in one pass. The builder is pure: the same plan always produces
//! the same graph, and nothing here touches the filesystem, so graphs are
//! testable without an encoder.

use reframe_models::{clamp_crop_x, DynamicCropPlan, StaticCropPlan};

/// A compiled filter graph plus the labels of its final streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterGraph {
    /// The `-filter_complex` expression
    pub filter_complex: String,
    /// Label of the concatenated video stream (e.g. "[vout]")
    pub video_label: String,
    /// Label of the concatenated audio stream (e.g. "[aout]")
    pub audio_label: String,
}

/// Compile a dynamic plan into a segmented trim/crop/concat graph.
///
/// Each segment trims the source video to `[start, end)`, resets timestamps
/// to zero, and crops to the plan's window placed around that segment's
/// center; audio is trimmed over the same interval. The per-segment pairs
/// then concatenate, in order, into single video and audio streams.
pub fn build_segment_graph(plan: &DynamicCropPlan, frame_width: u32) -> FilterGraph {
    let mut parts = Vec::with_capacity(plan.segments.len() * 2 + 1);

    for (i, segment) in plan.segments.iter().enumerate() {
        let crop_x = clamp_crop_x(segment.center_x, plan.crop_width, frame_width);
        parts.push(format!(
            "[0:v]trim=start={:.3}:end={:.3},setpts=PTS-STARTPTS,crop={}:{}:{}:0[v{i}]",
            segment.start_secs, segment.end_secs, plan.crop_width, plan.crop_height, crop_x,
        ));
        parts.push(format!(
            "[0:a]atrim=start={:.3}:end={:.3},asetpts=PTS-STARTPTS[a{i}]",
            segment.start_secs, segment.end_secs,
        ));
    }

    let inputs: String = (0..plan.segments.len())
        .map(|i| format!("[v{i}][a{i}]"))
        .collect();
    parts.push(format!(
        "{}concat=n={}:v=1:a=1[vout][aout]",
        inputs,
        plan.segments.len()
    ));

    FilterGraph {
        filter_complex: parts.join(";"),
        video_label: "[vout]".to_string(),
        audio_label: "[aout]".to_string(),
    }
}

/// A plain `-vf` crop expression for a static crop window.
///
/// Single-segment plans use this instead of the trim/concat machinery; it is
/// an equivalent but cheaper encoding.
pub fn static_crop_filter(plan: &StaticCropPlan) -> String {
    format!(
        "crop={}:{}:{}:0",
        plan.crop_width, plan.crop_height, plan.crop_x
    )
}

/// Static-style crop filter for a single-segment dynamic plan.
pub fn single_segment_filter(plan: &DynamicCropPlan, frame_width: u32) -> String {
    let segment = &plan.segments[0];
    let crop_x = clamp_crop_x(segment.center_x, plan.crop_width, frame_width);
    format!(
        "crop={}:{}:{}:0",
        plan.crop_width, plan.crop_height, crop_x
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use reframe_models::CropSegment;

    fn two_segment_plan() -> DynamicCropPlan {
        DynamicCropPlan {
            crop_width: 676,
            crop_height: 1080,
            segments: vec![
                CropSegment::new(10.0, 18.0, 400.0),
                CropSegment::new(18.0, 25.0, 1400.0),
            ],
        }
    }

    #[test]
    fn test_graph_structure() {
        let graph = build_segment_graph(&two_segment_plan(), 1920);

        assert_eq!(graph.video_label, "[vout]");
        assert_eq!(graph.audio_label, "[aout]");

        let parts: Vec<&str> = graph.filter_complex.split(';').collect();
        // Two video chains, two audio chains, one concat
        assert_eq!(parts.len(), 5);
        assert!(parts[0].starts_with("[0:v]trim=start=10.000:end=18.000"));
        assert!(parts[1].starts_with("[0:a]atrim=start=10.000:end=18.000"));
        assert!(parts[4].ends_with("concat=n=2:v=1:a=1[vout][aout]"));
        assert!(parts[4].starts_with("[v0][a0][v1][a1]"));
    }

    #[test]
    fn test_graph_crops_are_clamped() {
        let plan = DynamicCropPlan {
            crop_width: 676,
            crop_height: 1080,
            segments: vec![
                CropSegment::new(0.0, 5.0, -200.0),
                CropSegment::new(5.0, 10.0, 5000.0),
            ],
        };
        let graph = build_segment_graph(&plan, 1920);
        assert!(graph.filter_complex.contains("crop=676:1080:0:0"));
        assert!(graph.filter_complex.contains("crop=676:1080:1244:0"));
    }

    #[test]
    fn test_graph_is_deterministic() {
        let plan = two_segment_plan();
        assert_eq!(
            build_segment_graph(&plan, 1920),
            build_segment_graph(&plan, 1920)
        );
    }

    #[test]
    fn test_graph_resets_timestamps() {
        let graph = build_segment_graph(&two_segment_plan(), 1920);
        assert!(graph.filter_complex.contains("setpts=PTS-STARTPTS"));
        assert!(graph.filter_complex.contains("asetpts=PTS-STARTPTS"));
    }

    #[test]
    fn test_static_crop_filter() {
        let plan = StaticCropPlan {
            crop_width: 676,
            crop_height: 1080,
            crop_x: 622,
            needs_crop: true,
            used_analyzer: true,
            multi_face_detected: false,
            active_speaker_mode: false,
        };
        assert_eq!(static_crop_filter(&plan), "crop=676:1080:622:0");
    }

    #[test]
    fn test_single_segment_filter_matches_static_form() {
        let plan = DynamicCropPlan {
            crop_width: 676,
            crop_height: 1080,
            segments: vec![CropSegment::new(10.0, 25.0, 960.0)],
        };
        assert_eq!(single_segment_filter(&plan, 1920), "crop=676:1080:622:0");
    }
}
