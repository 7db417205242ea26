//! Video decoder using FFmpeg via ffmpeg-sidecar.

use defog_core::{DefogError, Frame, FrameRate, Result};
use defog_dehaze::FrameSource;
use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel, OutputVideoFrame};
use ffmpeg_sidecar::iter::FfmpegIterator;
use std::path::Path;
use tracing::{debug, info, warn};

/// Rate assumed when FFmpeg reports none for the input stream.
pub const FALLBACK_FRAME_RATE: FrameRate = FrameRate::FPS_20;

/// Video decoder using FFmpeg.
///
/// Uses ffmpeg-sidecar to spawn FFmpeg as a subprocess that writes packed
/// `rgb24` frames to stdout. This approach works without system FFmpeg
/// development headers.
pub struct VideoDecoder {
    path: String,
    child: FfmpegChild,
    events: FfmpegIterator,
    frame_rate: Option<FrameRate>,
    frames_read: u64,
    last_error: Option<String>,
    exhausted: bool,
}

impl VideoDecoder {
    /// Open a video file for decoding.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy().to_string();

        if !path.exists() {
            return Err(DefogError::NotFound(format!(
                "File not found: {}",
                path_str
            )));
        }

        info!("Opening video file: {}", path_str);

        let mut command = FfmpegCommand::new();
        command.args(decode_args(&path_str));
        let mut child = command
            .spawn()
            .map_err(|e| DefogError::Decoder(format!("Failed to spawn ffmpeg: {e}")))?;
        let events = child
            .iter()
            .map_err(|e| DefogError::Decoder(format!("Failed to read ffmpeg output: {e}")))?;

        Ok(Self {
            path: path_str,
            child,
            events,
            frame_rate: None,
            frames_read: 0,
            last_error: None,
            exhausted: false,
        })
    }

    /// Get the file path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Frames decoded so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Decode the next frame.
    pub fn decode_frame(&mut self) -> Result<Option<Frame>> {
        if self.exhausted {
            return Ok(None);
        }

        for event in self.events.by_ref() {
            match event {
                FfmpegEvent::ParsedInputStream(stream) if stream.parent_index == 0 => {
                    if self.frame_rate.is_none() {
                        if let Some(video) = stream.video_data() {
                            self.frame_rate = FrameRate::from_fps_f64(video.fps as f64);
                            debug!(
                                width = video.width,
                                height = video.height,
                                fps = video.fps,
                                pix_fmt = %video.pix_fmt,
                                "Parsed input video stream"
                            );
                        }
                    }
                }
                FfmpegEvent::OutputFrame(frame) => {
                    let frame = frame_from_output(frame)?;
                    self.frames_read += 1;
                    return Ok(Some(frame));
                }
                FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, line) => {
                    warn!(line = %line, "ffmpeg error while decoding");
                    self.last_error = Some(line);
                }
                FfmpegEvent::Error(e) => {
                    warn!(error = %e, "ffmpeg decoder error");
                    self.last_error = Some(e);
                }
                _ => {}
            }
        }

        self.exhausted = true;
        let status = self
            .child
            .wait()
            .map_err(|e| DefogError::Decoder(format!("Failed to wait for ffmpeg: {e}")))?;
        if !status.success() {
            return Err(DefogError::Decoder(match self.last_error.take() {
                Some(e) => format!("ffmpeg exited with status {}: {}", status, e),
                None => format!("ffmpeg exited with status {}", status),
            }));
        }
        info!(frames = self.frames_read, path = %self.path, "Decoding finished");
        Ok(None)
    }
}

impl FrameSource for VideoDecoder {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.decode_frame()
    }

    fn frame_rate(&self) -> FrameRate {
        self.frame_rate.unwrap_or(FALLBACK_FRAME_RATE)
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        if !self.exhausted {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// FFmpeg arguments decoding the first video stream of `path` to raw
/// `rgb24` on stdout.
pub fn decode_args(path: &str) -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-i".into(),
        path.into(),
        "-map".into(),
        "0:v:0".into(),
        "-an".into(),
        "-sn".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgb24".into(),
        "-".into(),
    ]
}

/// Convert a frame emitted by FFmpeg, rejecting a truncated payload.
fn frame_from_output(output: OutputVideoFrame) -> Result<Frame> {
    let expected = Frame::byte_len(output.width, output.height);
    if output.data.len() < expected {
        return Err(DefogError::EndOfStream(format!(
            "frame {} has {} of {} bytes",
            output.frame_num,
            output.data.len(),
            expected
        )));
    }
    let mut data = output.data;
    data.truncate(expected);
    Frame::from_raw(output.width, output.height, data)
}
