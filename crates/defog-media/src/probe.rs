//! Media file probing to get metadata without full decode.

use defog_core::{DefogError, FrameRate, Result};
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Information about a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaProbe {
    /// File path
    pub path: String,
    /// Video streams of the first input
    pub video_streams: Vec<VideoStreamInfo>,
}

/// Information about a video stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    pub index: u32,
    pub codec: String,
    pub width: u32,
    pub height: u32,
    /// `None` when FFmpeg reports no usable rate.
    pub frame_rate: Option<FrameRate>,
    pub pixel_format: String,
}

impl MediaProbe {
    /// Probe a media file.
    ///
    /// Fails with `NotFound` for a missing file and `UnsupportedFormat` when
    /// FFmpeg finds no video stream.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy().to_string();

        if !path.exists() {
            return Err(DefogError::NotFound(format!(
                "File not found: {}",
                path_str
            )));
        }

        let mut command = FfmpegCommand::new();
        command.args(probe_args(&path_str));
        let mut child = command
            .spawn()
            .map_err(|e| DefogError::Decoder(format!("Failed to spawn ffmpeg: {e}")))?;
        let events = child
            .iter()
            .map_err(|e| DefogError::Decoder(format!("Failed to read ffmpeg output: {e}")))?;

        let mut video_streams = Vec::new();
        let mut last_error = None;
        for event in events {
            match event {
                FfmpegEvent::ParsedInputStream(stream) if stream.parent_index == 0 => {
                    if let Some(video) = stream.video_data() {
                        video_streams.push(VideoStreamInfo {
                            index: stream.stream_index,
                            codec: stream.format.clone(),
                            width: video.width,
                            height: video.height,
                            frame_rate: FrameRate::from_fps_f64(video.fps as f64),
                            pixel_format: video.pix_fmt.clone(),
                        });
                    }
                }
                FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, line) => {
                    warn!(line = %line, "ffmpeg error while probing");
                    last_error = Some(line);
                }
                FfmpegEvent::Error(e) => last_error = Some(e),
                _ => {}
            }
        }
        // The probe never writes output; its exit status carries no information.
        let _ = child.wait();

        if video_streams.is_empty() {
            return Err(DefogError::UnsupportedFormat(match last_error {
                Some(e) => format!("No video stream in {}: {}", path_str, e),
                None => format!("No video stream in {}", path_str),
            }));
        }

        debug!(path = %path_str, streams = video_streams.len(), "Probed media file");
        Ok(Self {
            path: path_str,
            video_streams,
        })
    }

    /// Check if the file has video.
    pub fn has_video(&self) -> bool {
        !self.video_streams.is_empty()
    }

    /// Get the primary video stream info.
    pub fn primary_video(&self) -> Option<&VideoStreamInfo> {
        self.video_streams.first()
    }
}

/// FFmpeg arguments that open `path` and stop before decoding any frame.
pub fn probe_args(path: &str) -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-i".into(),
        path.into(),
        "-frames:v".into(),
        "0".into(),
        "-f".into(),
        "null".into(),
        "-".into(),
    ]
}
