//! Integration tests for whole-sequence dehazing.
//!
//! Exercises defog-core frames and configuration flowing through the
//! defog-dehaze processor into in-memory sinks.

use defog_core::{DefogError, DehazeConfig, FilterKind, Frame, FrameRate, RationalTime};
use defog_dehaze::{
    estimate_atmospheric_light, FrameSequenceProcessor, MemorySink, MemorySource,
    ProcessorState,
};
use proptest::prelude::*;

// ── Helpers ────────────────────────────────────────────────────

fn run(frames: Vec<Frame>, config: DehazeConfig) -> defog_core::Result<(Vec<Frame>, MemorySink)> {
    let mut processor = FrameSequenceProcessor::new(config)?;
    let mut source = MemorySource::new(frames, FrameRate::FPS_24);
    let mut sink = MemorySink::new();
    processor.run(&mut source, &mut sink)?;
    let frames = sink.frames().to_vec();
    Ok((frames, sink))
}

fn within(a: u8, b: u8, tolerance: i32) -> bool {
    (a as i32 - b as i32).abs() <= tolerance
}

// ── Canonical scenarios ────────────────────────────────────────

#[test]
fn two_gray_frames_stay_gray() {
    let frames = vec![Frame::filled(4, 4, [128, 128, 128]); 2];
    let (out, sink) = run(frames, DehazeConfig::default()).unwrap();

    assert_eq!(out.len(), 2);
    assert_eq!(sink.spec().map(|s| s.dimensions()), Some((4, 4)));
    for frame in &out {
        assert_eq!(frame.dimensions(), (4, 4));
        for &c in frame.as_bytes() {
            assert!(within(c, 128, 1), "got {c}");
        }
    }
}

#[test]
fn gray_filter_gives_same_result_on_gray_frames() {
    let frames = vec![Frame::filled(6, 6, [90, 90, 90]); 2];
    let (color, _) = run(frames.clone(), DehazeConfig::default()).unwrap();
    let gray_config = DehazeConfig {
        filter: FilterKind::Gray,
        ..Default::default()
    };
    let (gray, _) = run(frames, gray_config).unwrap();
    for (a, b) in color.iter().zip(&gray) {
        for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
            assert!(within(*x, *y, 1));
        }
    }
}

#[test]
fn white_frame_light_is_white() {
    let frame = Frame::filled(10, 10, [255, 255, 255]);
    let mut processor = FrameSequenceProcessor::new(DehazeConfig::default()).unwrap();
    let out = processor
        .process_frames(vec![frame], FrameRate::FPS_20)
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(processor.light().unwrap().channels(), [255, 255, 255]);
}

#[test]
fn empty_input_produces_no_output() {
    let mut processor = FrameSequenceProcessor::new(DehazeConfig::default()).unwrap();
    let mut source = MemorySource::new(Vec::new(), FrameRate::FPS_24);
    let mut sink = MemorySink::new();

    let err = processor.run(&mut source, &mut sink).unwrap_err();
    assert!(matches!(err, DefogError::EmptySequence));
    assert!(sink.spec().is_none());
    assert!(sink.frames().is_empty());
    assert!(!sink.is_finished());
    assert!(processor.light().is_none());
}

#[test]
fn size_change_mid_sequence_is_rejected() {
    let frames = vec![
        Frame::filled(8, 8, [120, 130, 140]),
        Frame::filled(8, 8, [120, 130, 140]),
        Frame::filled(9, 8, [120, 130, 140]),
    ];
    let err = run(frames, DehazeConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        DefogError::DimensionMismatch {
            expected: (8, 8),
            got: (9, 8)
        }
    ));
}

#[test]
fn tiny_percentile_is_invalid_input() {
    // 2x2 pixels * 0.1 samples no pixel.
    let frames = vec![Frame::filled(2, 2, [50, 60, 70])];
    let err = run(frames, DehazeConfig::default()).unwrap_err();
    assert!(matches!(err, DefogError::InvalidInput(_)));
}

#[test]
fn report_describes_run() {
    let frames = vec![Frame::test_pattern(16, 12); 3];
    let config = DehazeConfig {
        guided_filter_radius: 4,
        ..Default::default()
    };
    let mut processor = FrameSequenceProcessor::new(config).unwrap();
    let mut source = MemorySource::new(frames, FrameRate::FPS_24);
    let mut sink = MemorySink::new();
    let report = processor.run(&mut source, &mut sink).unwrap();

    assert_eq!(processor.state(), ProcessorState::Done);
    assert_eq!(report.frames, 3);
    assert_eq!((report.width, report.height), (16, 12));
    assert_eq!(report.duration, RationalTime::new(1, 8));
    assert_eq!(Some(report.light), processor.light());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["frames"], 3);
}

#[test]
fn processor_is_reusable_after_failure() {
    let mut processor = FrameSequenceProcessor::new(DehazeConfig::default()).unwrap();
    assert!(processor
        .process_frames(Vec::new(), FrameRate::FPS_24)
        .is_err());
    assert_eq!(processor.state(), ProcessorState::Failed);

    let out = processor
        .process_frames(vec![Frame::filled(4, 4, [200, 200, 200])], FrameRate::FPS_24)
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(processor.state(), ProcessorState::Done);
}

// ── Properties ─────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn output_mirrors_input_shape(
        count in 1usize..5,
        width in 4u32..12,
        height in 4u32..12,
        seed in any::<u8>(),
    ) {
        let frames: Vec<Frame> = (0..count)
            .map(|i| {
                Frame::from_fn(width, height, |x, y| {
                    let v = seed.wrapping_add((x * 17 + y * 5 + i as u32 * 3) as u8);
                    [v, v.wrapping_mul(3), 255 - v]
                })
            })
            .collect();
        let config = DehazeConfig { guided_filter_radius: 3, ..Default::default() };
        match run(frames, config) {
            Ok((out, _)) => {
                prop_assert_eq!(out.len(), count);
                for frame in &out {
                    prop_assert_eq!(frame.dimensions(), (width, height));
                }
            }
            // A black-lit first frame is the only admissible failure.
            Err(e) => prop_assert!(
                matches!(e, DefogError::DegenerateLight { .. }),
                "unexpected error: {}",
                e
            ),
        }
    }

    #[test]
    fn white_frame_light_for_any_percentile(p in 0.01f64..=1.0) {
        let frame = Frame::filled(10, 10, [255, 255, 255]);
        let light = estimate_atmospheric_light(&frame, p).unwrap();
        prop_assert_eq!(light.channels(), [255, 255, 255]);
    }

    #[test]
    fn uniform_frame_light_is_its_color(rgb in proptest::array::uniform3(any::<u8>()), p in 0.05f64..=1.0) {
        let frame = Frame::filled(8, 8, rgb);
        let mut light = estimate_atmospheric_light(&frame, p).unwrap().channels();
        let mut want = rgb;
        light.sort_unstable();
        want.sort_unstable();
        prop_assert_eq!(light, want);
    }
}
