//! Encoding dehazed frames to video files.
//!
//! Frames are piped as raw `rgb24` into an FFmpeg process. Supports codec
//! presets and reports the encoder's own diagnostics on failure.

use defog_core::{DefogError, Frame, Result};
use defog_dehaze::{FrameSink, StreamSpec};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

// ── Format presets ──────────────────────────────────────────────

/// Video codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    H265,
    Mpeg4,
    Vp9,
}

impl VideoCodec {
    /// FFmpeg encoder name.
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::H265 => "libx265",
            Self::Mpeg4 => "mpeg4",
            Self::Vp9 => "libvpx-vp9",
        }
    }

    /// File extension for this codec.
    pub fn extension(self) -> &'static str {
        match self {
            Self::H264 | Self::H265 | Self::Mpeg4 => "mp4",
            Self::Vp9 => "webm",
        }
    }
}

/// Encoder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderSettings {
    pub codec: VideoCodec,
    /// Constant rate factor (lower = better); `None` uses the encoder default.
    pub crf: Option<u32>,
    /// Output pixel format.
    pub pixel_format: String,
}

impl EncoderSettings {
    /// H.264 preset.
    pub fn h264() -> Self {
        Self {
            codec: VideoCodec::H264,
            crf: Some(18),
            pixel_format: "yuv420p".into(),
        }
    }

    /// H.265 preset.
    pub fn h265() -> Self {
        Self {
            codec: VideoCodec::H265,
            crf: Some(20),
            pixel_format: "yuv420p".into(),
        }
    }

    /// MPEG-4 Part 2, the `mp4v` fourcc.
    pub fn mpeg4() -> Self {
        Self {
            codec: VideoCodec::Mpeg4,
            crf: None,
            pixel_format: "yuv420p".into(),
        }
    }

    /// Web-optimized VP9.
    pub fn vp9() -> Self {
        Self {
            codec: VideoCodec::Vp9,
            crf: Some(30),
            pixel_format: "yuv420p".into(),
        }
    }

    /// Preset for a codec.
    pub fn for_codec(codec: VideoCodec) -> Self {
        match codec {
            VideoCodec::H264 => Self::h264(),
            VideoCodec::H265 => Self::h265(),
            VideoCodec::Mpeg4 => Self::mpeg4(),
            VideoCodec::Vp9 => Self::vp9(),
        }
    }

    /// Override the rate factor.
    pub fn with_crf(mut self, crf: u32) -> Self {
        self.crf = Some(crf);
        self
    }

    /// Build the FFmpeg command arguments for a stream written to `output`.
    pub fn ffmpeg_args(&self, spec: &StreamSpec, output: &Path) -> Vec<String> {
        let mut args = Vec::new();

        // Input from pipe (raw frames)
        args.extend_from_slice(&[
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pixel_format".into(),
            "rgb24".into(),
            "-video_size".into(),
            format!("{}x{}", spec.width, spec.height),
            "-framerate".into(),
            format!(
                "{}/{}",
                spec.frame_rate.numerator, spec.frame_rate.denominator
            ),
            "-i".into(),
            "pipe:0".into(),
        ]);

        // Video codec
        args.extend_from_slice(&["-c:v".into(), self.codec.ffmpeg_encoder().into()]);

        // Quality settings
        if let Some(crf) = self.crf {
            args.extend_from_slice(&["-crf".into(), crf.to_string()]);
            // libvpx-vp9 only honors CRF in constant quality mode.
            if self.codec == VideoCodec::Vp9 {
                args.extend_from_slice(&["-b:v".into(), "0".into()]);
            }
        }

        args.extend_from_slice(&["-pix_fmt".into(), self.pixel_format.clone()]);

        // Output
        args.push(output.to_string_lossy().into_owned());

        args
    }
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self::h264()
    }
}

// ── Encoder ─────────────────────────────────────────────────────

/// Writes frames to a video file through an FFmpeg process.
///
/// The process is spawned on [`FrameSink::begin`]. Dropping an encoder that
/// was not finished kills it.
pub struct VideoEncoder {
    output: PathBuf,
    settings: EncoderSettings,
    spec: Option<StreamSpec>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<Vec<String>>>,
    frames_written: u64,
}

/// Collect FFmpeg's diagnostics on a separate thread so a full stderr
/// pipe never blocks frame writes.
fn drain_stderr<R: Read + Send + 'static>(reader: R) -> JoinHandle<Vec<String>> {
    std::thread::spawn(move || {
        let mut lines = Vec::new();
        for line in BufReader::new(reader).lines().map_while(|line| line.ok()) {
            debug!(line = %line, "ffmpeg stderr");
            lines.push(line);
        }
        lines
    })
}

impl VideoEncoder {
    /// Prepare an encoder writing to `output`.
    pub fn create(output: impl Into<PathBuf>, settings: EncoderSettings) -> Self {
        Self {
            output: output.into(),
            settings,
            spec: None,
            child: None,
            stdin: None,
            stderr: None,
            frames_written: 0,
        }
    }

    /// Whether FFmpeg was spawned, and so may have created the output file.
    pub fn is_started(&self) -> bool {
        self.spec.is_some()
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Close stdin, wait for FFmpeg and turn a failed exit into an error.
    fn close(&mut self) -> Result<()> {
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child
            .wait()
            .map_err(|e| DefogError::Encoder(format!("Failed to wait for ffmpeg: {e}")))?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        if !status.success() {
            return Err(DefogError::Encoder(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.join("\n").trim()
            )));
        }
        Ok(())
    }
}

impl FrameSink for VideoEncoder {
    fn begin(&mut self, spec: &StreamSpec) -> Result<()> {
        if self.spec.is_some() {
            return Err(DefogError::Encoder("Encoder already started".into()));
        }

        let args = self.settings.ffmpeg_args(spec, &self.output);
        debug!(args = ?args, "Spawning ffmpeg encoder");
        let mut child = Command::new(crate::ffmpeg_binary())
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DefogError::Encoder(format!("Failed to spawn ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DefogError::Encoder("Failed to open ffmpeg stdin".into()))?;
        let stderr = child.stderr.take().map(drain_stderr);

        info!(
            output = %self.output.display(),
            codec = self.settings.codec.ffmpeg_encoder(),
            width = spec.width,
            height = spec.height,
            frame_rate = %spec.frame_rate,
            "Encoding started"
        );
        self.spec = Some(*spec);
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr = stderr;
        Ok(())
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let spec = self
            .spec
            .ok_or_else(|| DefogError::Encoder("Frame written before begin".into()))?;
        frame.ensure_dimensions(spec.dimensions())?;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| DefogError::Encoder("Encoder already finished".into()))?;

        if let Err(e) = stdin.write_all(frame.as_bytes()) {
            // A closed pipe means FFmpeg died; its exit status says why.
            warn!(error = %e, "Failed to write frame to ffmpeg");
            self.close()?;
            return Err(DefogError::Encoder(format!("Failed to write frame: {e}")));
        }
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.spec.is_none() {
            return Err(DefogError::Encoder("Encoder finished before begin".into()));
        }
        self.close()?;
        info!(
            frames = self.frames_written,
            output = %self.output.display(),
            "Encoding finished"
        );
        Ok(())
    }
}

impl Drop for VideoEncoder {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr.take() {
            let _ = handle.join();
        }
    }
}
