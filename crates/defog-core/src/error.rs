//! Error types for Defog.

use thiserror::Error;

/// Main error type for Defog operations.
///
/// Every variant is terminal for a processing run: nothing is retried
/// internally and the first error encountered is surfaced to the caller.
#[derive(Error, Debug)]
pub enum DefogError {
    /// The input produced no frames to seed atmospheric-light estimation.
    #[error("Empty sequence: no frames available to estimate atmospheric light")]
    EmptySequence,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Atmospheric light luminance is zero, so transmission is undefined.
    #[error("Degenerate atmospheric light: luminance {luminance} is zero")]
    DegenerateLight { luminance: f32 },

    #[error("Dimension mismatch: expected {}x{}, got {}x{}", expected.0, expected.1, got.0, got.1)]
    DimensionMismatch {
        expected: (u32, u32),
        got: (u32, u32),
    },

    /// The input stream closed in the middle of a frame.
    #[error("End of stream: {0}")]
    EndOfStream(String),

    #[error("Processing cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for Defog operations.
pub type Result<T> = std::result::Result<T, DefogError>;
