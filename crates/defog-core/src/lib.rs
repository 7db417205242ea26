//! Defog Core - Foundation types for video dehazing
//!
//! This crate provides the fundamental types used throughout Defog:
//! - Packed RGB frames and their normalized color values
//! - Frame rates and media time
//! - Dehazing configuration
//! - The shared error type

pub mod color;
pub mod config;
pub mod error;
pub mod frame;
pub mod time;

pub use color::Color;
pub use config::{DehazeConfig, FilterKind};
pub use error::{DefogError, Result};
pub use frame::{Frame, CHANNELS};
pub use time::{FrameRate, RationalTime};
