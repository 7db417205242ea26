//! Frame sources and sinks at the boundary of the dehazing core.

use defog_core::{DefogError, Frame, FrameRate, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Output stream geometry declared to a sink before its first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSpec {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
}

impl StreamSpec {
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// A lazy, finite, forward-only sequence of frames.
pub trait FrameSource {
    /// Next frame in order, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Nominal frame rate. Valid once the first frame has been read.
    fn frame_rate(&self) -> FrameRate;

    /// Total frame count, when the source knows it up front.
    fn frame_count_hint(&self) -> Option<u64> {
        None
    }
}

/// Consumer of frames written in order.
pub trait FrameSink {
    /// Declare the stream geometry. Called once, before any frame.
    fn begin(&mut self, spec: &StreamSpec) -> Result<()>;

    /// Write the next frame.
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and close the output.
    fn finish(&mut self) -> Result<()>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }

    fn frame_rate(&self) -> FrameRate {
        (**self).frame_rate()
    }

    fn frame_count_hint(&self) -> Option<u64> {
        (**self).frame_count_hint()
    }
}

impl<K: FrameSink + ?Sized> FrameSink for Box<K> {
    fn begin(&mut self, spec: &StreamSpec) -> Result<()> {
        (**self).begin(spec)
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        (**self).write_frame(frame)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Frames held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    frames: VecDeque<Frame>,
    frame_rate: FrameRate,
    total: u64,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>, frame_rate: FrameRate) -> Self {
        let total = frames.len() as u64;
        Self {
            frames: frames.into(),
            frame_rate,
            total,
        }
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front())
    }

    fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    fn frame_count_hint(&self) -> Option<u64> {
        Some(self.total)
    }
}

/// Collects written frames in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    spec: Option<StreamSpec>,
    frames: Vec<Frame>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declared stream geometry, once `begin` was called.
    pub fn spec(&self) -> Option<&StreamSpec> {
        self.spec.as_ref()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for MemorySink {
    fn begin(&mut self, spec: &StreamSpec) -> Result<()> {
        if self.spec.is_some() {
            return Err(DefogError::InvalidInput(
                "sink stream already declared".into(),
            ));
        }
        self.spec = Some(*spec);
        Ok(())
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let spec = self.spec.ok_or_else(|| {
            DefogError::InvalidInput("frame written before the stream was declared".into())
        })?;
        if self.finished {
            return Err(DefogError::InvalidInput("sink already finished".into()));
        }
        frame.ensure_dimensions(spec.dimensions())?;
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
