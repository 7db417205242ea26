//! Defog Media - FFmpeg integration for video I/O
//!
//! This crate handles:
//! - Media file probing
//! - Decoding any container to packed RGB24 frames
//! - Encoding packed RGB24 frames into a video file

pub mod decoder;
pub mod export;
pub mod probe;

pub use decoder::VideoDecoder;
pub use export::{EncoderSettings, VideoCodec, VideoEncoder};
pub use probe::{MediaProbe, VideoStreamInfo};

/// Resolve the FFmpeg binary used by decoders and encoders.
pub fn ffmpeg_binary() -> std::path::PathBuf {
    ffmpeg_sidecar::paths::ffmpeg_path()
}

/// Log the FFmpeg binary in use (call once at startup).
pub fn init() {
    tracing::info!(ffmpeg = %ffmpeg_binary().display(), "Defog Media initialized");
}
