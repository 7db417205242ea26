//! Normalized RGB color values.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Rec. 601 luma weights for R, G and B.
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// RGB color with 32-bit float components, nominally in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new color from RGB components.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create a color from 8-bit RGB values.
    #[inline]
    pub fn from_rgb8(rgb: [u8; 3]) -> Self {
        Self {
            r: rgb[0] as f32 / 255.0,
            g: rgb[1] as f32 / 255.0,
            b: rgb[2] as f32 / 255.0,
        }
    }

    /// Convert to 8-bit RGB.
    ///
    /// Components are scaled by 255, clamped into [0, 255] and truncated,
    /// so out-of-range values saturate instead of wrapping.
    #[inline]
    pub fn to_rgb8(self) -> [u8; 3] {
        [
            (self.r * 255.0).clamp(0.0, 255.0) as u8,
            (self.g * 255.0).clamp(0.0, 255.0) as u8,
            (self.b * 255.0).clamp(0.0, 255.0) as u8,
        ]
    }

    /// Components as an array.
    #[inline]
    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Luminance (perceived brightness), Rec. 601 weights.
    #[inline]
    pub fn luminance(self) -> f32 {
        LUMA_WEIGHTS[0] * self.r + LUMA_WEIGHTS[1] * self.g + LUMA_WEIGHTS[2] * self.b
    }

    /// Linear interpolation between two colors.
    #[inline]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
        }
    }

    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb8_round_trip_within_truncation() {
        for v in [0u8, 1, 127, 128, 254, 255] {
            let back = Color::from_rgb8([v, v, v]).to_rgb8();
            for c in back {
                assert!((c as i32 - v as i32).abs() <= 1, "{v} came back as {c}");
            }
        }
        assert_eq!(Color::WHITE.to_rgb8(), [255, 255, 255]);
    }

    #[test]
    fn test_to_rgb8_saturates() {
        let c = Color::new(-0.5, 1.7, 0.5);
        assert_eq!(c.to_rgb8(), [0, 255, 127]);
    }

    #[test]
    fn test_luminance_of_gray_is_gray() {
        let gray = Color::new(0.5, 0.5, 0.5);
        assert!((gray.luminance() - 0.5).abs() < 1e-6);
        assert!((Color::WHITE.luminance() - 1.0).abs() < 1e-6);
        assert_eq!(Color::BLACK.luminance(), 0.0);
    }

    #[test]
    fn test_lerp_endpoints() {
        let a = Color::new(0.2, 0.4, 0.6);
        let b = Color::new(1.0, 0.0, 0.5);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
    }
}
