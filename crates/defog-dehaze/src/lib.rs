//! Defog Dehaze - dark-channel style haze removal for frame sequences
//!
//! Provides atmospheric light estimation, transmission estimation with
//! guided-filter refinement, scene radiance recovery, and the sequence
//! processor that drives them over a [`FrameSource`] into a [`FrameSink`].

pub mod atmospheric;
pub mod field;
pub mod filter;
pub mod processor;
pub mod radiance;
pub mod sequence;
pub mod transmission;

pub use atmospheric::{estimate_atmospheric_light, AtmosphericLight};
pub use field::{NormalizedFrame, ScalarField};
pub use filter::{
    filter_for, BoxBlurFilter, ColorGuidedFilter, EdgeAwareFilter, FilterRegistry,
    GrayGuidedFilter,
};
pub use processor::{
    CancelHandle, FrameSequenceProcessor, ProcessorState, SequenceProgress, SequenceReport,
};
pub use radiance::{recover_scene_radiance, synthesize_haze};
pub use sequence::{FrameSink, FrameSource, MemorySink, MemorySource, StreamSpec};
pub use transmission::{
    estimate_transmission, raw_transmission, TransmissionEstimator, TransmissionMap,
    TransmissionParams,
};
