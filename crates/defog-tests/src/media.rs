//! Integration tests for configuration files and FFmpeg pipelines.
//!
//! Exercises defog-core configuration persistence together with the
//! defog-media argument builders fed by a processor's declared stream.

use defog_core::{DefogError, DehazeConfig, FilterKind, Frame, FrameRate};
use defog_dehaze::{FrameSequenceProcessor, MemorySink, MemorySource};
use defog_media::decoder::decode_args;
use defog_media::probe::probe_args;
use defog_media::{EncoderSettings, VideoCodec, VideoDecoder};
use std::path::{Path, PathBuf};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("defog-tests-{}-{}", std::process::id(), name))
}

// ── Configuration files ────────────────────────────────────────

#[test]
fn config_file_round_trip() {
    let path = temp_path("config.json");
    let config = DehazeConfig {
        omega: 0.8,
        guided_filter_radius: 20,
        filter: FilterKind::Gray,
        ..Default::default()
    };
    config.save_to_file(&path).unwrap();
    let loaded = DehazeConfig::load_from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn partial_config_keeps_defaults() {
    let config = DehazeConfig::from_json(br#"{ "gamma": 0.5, "filter": "gray" }"#).unwrap();
    assert_eq!(config.gamma, 0.5);
    assert_eq!(config.filter, FilterKind::Gray);
    assert_eq!(config.top_percentile, 0.1);
    assert_eq!(config.guided_filter_radius, 40);
}

#[test]
fn invalid_config_values_are_rejected() {
    assert!(matches!(
        DehazeConfig::from_json(br#"{ "tmin": 0.0 }"#),
        Err(DefogError::InvalidInput(_))
    ));
    assert!(matches!(
        DehazeConfig::from_json(b"not json"),
        Err(DefogError::Config(_))
    ));
    assert!(matches!(
        DehazeConfig::load_from_file(Path::new("/no/such/defog.json")),
        Err(DefogError::NotFound(_))
    ));
}

// ── FFmpeg pipelines ───────────────────────────────────────────

#[test]
fn encoder_args_follow_declared_stream() {
    let frames = vec![Frame::filled(20, 10, [150, 160, 170]); 2];
    let mut processor = FrameSequenceProcessor::new(DehazeConfig::default()).unwrap();
    let mut source = MemorySource::new(frames, FrameRate::FPS_23_976);
    let mut sink = MemorySink::new();
    processor.run(&mut source, &mut sink).unwrap();
    let spec = sink.spec().copied().unwrap();

    let args = EncoderSettings::h265().ffmpeg_args(&spec, Path::new("out.mp4"));
    assert!(args.windows(2).any(|w| w == ["-video_size", "20x10"]));
    assert!(args.windows(2).any(|w| w == ["-framerate", "24000/1001"]));
    assert!(args.windows(2).any(|w| w == ["-c:v", "libx265"]));
    assert!(args.windows(2).any(|w| w == ["-pixel_format", "rgb24"]));
}

#[test]
fn every_codec_has_a_preset() {
    for codec in [
        VideoCodec::H264,
        VideoCodec::H265,
        VideoCodec::Mpeg4,
        VideoCodec::Vp9,
    ] {
        let settings = EncoderSettings::for_codec(codec);
        assert_eq!(settings.codec, codec);
        assert_eq!(settings.pixel_format, "yuv420p");
    }
}

#[test]
fn decoder_and_probe_read_the_same_input() {
    let decode = decode_args("hazy.avi");
    let probe = probe_args("hazy.avi");
    assert!(decode.windows(2).any(|w| w == ["-i", "hazy.avi"]));
    assert!(probe.windows(2).any(|w| w == ["-i", "hazy.avi"]));
}

#[test]
fn decoder_rejects_missing_input() {
    let err = VideoDecoder::open(temp_path("missing.avi")).err().unwrap();
    assert!(matches!(err, DefogError::NotFound(_)));
    assert!(err.to_string().contains("missing.avi"));
}
