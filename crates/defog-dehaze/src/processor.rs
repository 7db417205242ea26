//! Frame sequence orchestration.
//!
//! Atmospheric light is estimated once, from the first frame, and threaded
//! by reference through every frame's transmission estimation and radiance
//! recovery. Frames are written in input order; the first error ends the run.

use crate::atmospheric::{estimate_atmospheric_light, AtmosphericLight};
use crate::filter::EdgeAwareFilter;
use crate::radiance::recover_scene_radiance;
use crate::sequence::{FrameSink, FrameSource, MemorySink, MemorySource, StreamSpec};
use crate::transmission::TransmissionEstimator;
use defog_core::{DefogError, DehazeConfig, Frame, FrameRate, RationalTime, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Lifecycle of one processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcessorState {
    Start,
    LightEstimated,
    Streaming,
    Done,
    Failed,
}

/// Handle for cancelling an in-progress run.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Create a new cancel handle.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress of a running sequence.
#[derive(Debug, Clone, Serialize)]
pub struct SequenceProgress {
    /// Frames written so far.
    pub frames_done: u64,
    /// Total frames, when the source knows it.
    pub total_frames: Option<u64>,
    /// Processing speed in frames per second.
    pub fps: f64,
    /// Media time covered by the written frames.
    pub media_time: RationalTime,
}

impl SequenceProgress {
    /// Completion fraction (0.0 to 1.0), when the total is known.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_frames {
            Some(0) | None => None,
            Some(total) => Some(self.frames_done as f64 / total as f64),
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct SequenceReport {
    pub frames: u64,
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    pub light: AtmosphericLight,
    pub duration: RationalTime,
}

/// Dehazes a frame sequence.
pub struct FrameSequenceProcessor {
    config: DehazeConfig,
    transmission: TransmissionEstimator,
    state: ProcessorState,
    light: Option<AtmosphericLight>,
    cancel: Option<CancelHandle>,
    progress_interval: u64,
}

impl FrameSequenceProcessor {
    /// Create a processor, validating `config`.
    pub fn new(config: DehazeConfig) -> Result<Self> {
        config.validate()?;
        let transmission = TransmissionEstimator::from_config(&config)?;
        Ok(Self {
            config,
            transmission,
            state: ProcessorState::Start,
            light: None,
            cancel: None,
            progress_interval: 10,
        })
    }

    /// Refine transmission with a custom edge-aware filter.
    pub fn with_filter(mut self, filter: Box<dyn EdgeAwareFilter>) -> Self {
        self.transmission.set_filter(filter);
        self
    }

    /// Stop before the next frame once `cancel` is signalled.
    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Report progress every `frames` frames (at least 1).
    pub fn with_progress_interval(mut self, frames: u64) -> Self {
        self.progress_interval = frames.max(1);
        self
    }

    pub fn config(&self) -> &DehazeConfig {
        &self.config
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    /// Light estimated by the current or last run.
    pub fn light(&self) -> Option<AtmosphericLight> {
        self.light
    }

    pub fn filter_name(&self) -> &str {
        self.transmission.filter_name()
    }

    /// Estimate atmospheric light from a reference frame.
    pub fn estimate_light(&self, frame: &Frame) -> Result<AtmosphericLight> {
        estimate_atmospheric_light(frame, self.config.top_percentile)
    }

    /// Dehaze one frame under a known light.
    pub fn dehaze_frame(&self, frame: &Frame, light: &AtmosphericLight) -> Result<Frame> {
        let map = self.transmission.estimate(frame, light)?;
        recover_scene_radiance(frame, light, &map, self.config.amplification)
    }

    /// Dehaze independent frames in parallel, keeping their order.
    pub fn dehaze_batch(&self, frames: &[Frame], light: &AtmosphericLight) -> Result<Vec<Frame>> {
        frames
            .par_iter()
            .map(|frame| self.dehaze_frame(frame, light))
            .collect()
    }

    /// Run the whole sequence from `source` into `sink`.
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<SequenceReport>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        self.run_with_progress(source, sink, |_| {})
    }

    /// Run the whole sequence, calling `on_progress` every
    /// `progress_interval` frames and once at the end.
    pub fn run_with_progress<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        mut on_progress: impl FnMut(&SequenceProgress),
    ) -> Result<SequenceReport>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        self.state = ProcessorState::Start;
        self.light = None;

        match self.drive(source, sink, &mut on_progress) {
            Ok(report) => {
                self.state = ProcessorState::Done;
                info!(
                    frames = report.frames,
                    duration = %report.duration,
                    "Dehazing complete"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(from = ?self.state, error = %e, "Dehazing failed");
                self.state = ProcessorState::Failed;
                Err(e)
            }
        }
    }

    /// Dehaze in-memory frames.
    pub fn process_frames(&mut self, frames: Vec<Frame>, frame_rate: FrameRate) -> Result<Vec<Frame>> {
        let mut source = MemorySource::new(frames, frame_rate);
        let mut sink = MemorySink::new();
        self.run(&mut source, &mut sink)?;
        Ok(sink.into_frames())
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(cancel) if cancel.is_cancelled() => Err(DefogError::Cancelled),
            _ => Ok(()),
        }
    }

    fn drive<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        on_progress: &mut dyn FnMut(&SequenceProgress),
    ) -> Result<SequenceReport>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        self.check_cancelled()?;
        let first = source.next_frame()?.ok_or(DefogError::EmptySequence)?;
        let dimensions = first.dimensions();

        let light = self.estimate_light(&first)?;
        self.light = Some(light);
        self.state = ProcessorState::LightEstimated;

        let frame_rate = source.frame_rate();
        if frame_rate.numerator == 0 || frame_rate.denominator == 0 {
            return Err(DefogError::InvalidInput(format!(
                "frame rate {}/{} is not a positive rate",
                frame_rate.numerator, frame_rate.denominator
            )));
        }

        let spec = StreamSpec {
            width: dimensions.0,
            height: dimensions.1,
            frame_rate,
        };
        info!(
            width = spec.width,
            height = spec.height,
            frame_rate = %spec.frame_rate,
            light = ?light.channels(),
            filter = self.transmission.filter_name(),
            "Atmospheric light estimated, streaming frames"
        );
        sink.begin(&spec)?;
        self.state = ProcessorState::Streaming;

        let total_frames = source.frame_count_hint();
        let started = Instant::now();
        let mut frames_done = 0u64;
        let progress = |frames_done: u64| {
            let elapsed = started.elapsed().as_secs_f64();
            SequenceProgress {
                frames_done,
                total_frames,
                fps: if elapsed > 0.0 {
                    frames_done as f64 / elapsed
                } else {
                    0.0
                },
                media_time: RationalTime::from_frames(frames_done as i64, spec.frame_rate),
            }
        };

        // The first frame was only peeked for light estimation; it is
        // dehazed like every other frame.
        let mut next = Some(first);
        while let Some(frame) = next {
            self.check_cancelled()?;
            frame.ensure_dimensions(dimensions)?;

            let dehazed = self.dehaze_frame(&frame, &light)?;
            sink.write_frame(&dehazed)?;
            frames_done += 1;
            debug!(frame = frames_done - 1, "Frame dehazed");

            if frames_done % self.progress_interval == 0 {
                on_progress(&progress(frames_done));
            }
            next = source.next_frame()?;
        }

        sink.finish()?;
        if frames_done % self.progress_interval != 0 {
            on_progress(&progress(frames_done));
        }

        Ok(SequenceReport {
            frames: frames_done,
            width: spec.width,
            height: spec.height,
            frame_rate: spec.frame_rate,
            light,
            duration: RationalTime::from_frames(frames_done as i64, spec.frame_rate),
        })
    }
}
