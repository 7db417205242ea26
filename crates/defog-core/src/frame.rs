//! Packed RGB frame buffers.
//!
//! Frames are stored row-major with three interleaved 8-bit channels and no
//! row padding, the layout FFmpeg produces and accepts for `rgb24`.

use crate::color::Color;
use crate::error::{DefogError, Result};

/// Number of color channels in a frame.
pub const CHANNELS: usize = 3;

/// A video frame in CPU memory (packed RGB, 8 bits per channel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Create a black frame with the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; Self::byte_len(width, height)],
        }
    }

    /// Create a frame where every pixel has the same color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(Self::byte_len(width, height));
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap raw packed RGB bytes.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = Self::byte_len(width, height);
        if data.len() != expected {
            return Err(DefogError::InvalidInput(format!(
                "frame buffer of {} bytes does not match {}x{} rgb24 ({} bytes)",
                data.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a frame by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(Self::byte_len(width, height));
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Bytes needed for a packed frame of the given size.
    #[inline]
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * CHANNELS
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw packed bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// View the buffer as `[r, g, b]` pixels.
    #[inline]
    pub fn pixels(&self) -> &[[u8; 3]] {
        bytemuck::cast_slice(&self.data)
    }

    /// View the buffer as mutable `[r, g, b]` pixels.
    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [[u8; 3]] {
        bytemuck::cast_slice_mut(&mut self.data)
    }

    /// Get the pixel at `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.pixels()[(y * self.width + x) as usize]
    }

    /// Set the pixel at `(x, y)`; out-of-bounds writes are ignored.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) as usize;
            self.pixels_mut()[idx] = rgb;
        }
    }

    /// Check that this frame has the given dimensions.
    pub fn ensure_dimensions(&self, expected: (u32, u32)) -> Result<()> {
        if self.dimensions() != expected {
            return Err(DefogError::DimensionMismatch {
                expected,
                got: self.dimensions(),
            });
        }
        Ok(())
    }

    /// Create a test pattern frame (color bars over a vertical haze ramp).
    ///
    /// The top rows are blended toward a light gray veil, the bottom rows
    /// are clean bars.
    pub fn test_pattern(width: u32, height: u32) -> Self {
        const BARS: [[u8; 3]; 8] = [
            [255, 255, 255], // White
            [255, 255, 0],   // Yellow
            [0, 255, 255],   // Cyan
            [0, 255, 0],     // Green
            [255, 0, 255],   // Magenta
            [255, 0, 0],     // Red
            [0, 0, 255],     // Blue
            [0, 0, 0],       // Black
        ];
        let veil = Color::new(0.85, 0.87, 0.9);
        Self::from_fn(width, height, |x, y| {
            let bar = (x as usize * BARS.len()) / width.max(1) as usize;
            let haze = 1.0 - y as f32 / height.max(1) as f32;
            Color::from_rgb8(BARS[bar]).lerp(veil, haze * 0.7).to_rgb8()
        })
    }
}
