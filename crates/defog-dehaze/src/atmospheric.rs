//! Atmospheric light estimation.
//!
//! The atmospheric light is the color of the haze veil. It is estimated once
//! per clip from a reference frame and then reused for every frame.

use defog_core::{Color, DefogError, Frame, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Estimated haze color, one 8-bit value per output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AtmosphericLight {
    channels: [u8; 3],
}

impl AtmosphericLight {
    pub const fn new(channels: [u8; 3]) -> Self {
        Self { channels }
    }

    #[inline]
    pub fn channels(&self) -> [u8; 3] {
        self.channels
    }

    /// Light in [0, 1] working form.
    #[inline]
    pub fn normalized(&self) -> Color {
        Color::from_rgb8(self.channels)
    }

    /// Luminance of the normalized light.
    #[inline]
    pub fn luminance(&self) -> f32 {
        self.normalized().luminance()
    }
}

/// Estimate atmospheric light from `frame`.
///
/// `top_percentile` is the fraction of pixels, (0, 1], whose values decide
/// the estimate: each output value is the `floor(W * H * top_percentile)`-th
/// largest value of one channel, so it is always a value present in the frame.
///
/// Channels are ranked by their maximum value, brightest first, and output
/// slot `c` receives the value of the channel ranked `c`. Output slot 0 thus
/// holds the brightest channel rather than red. This permutation is probably
/// unintentional; it shifts the color balance of non-gray light.
///
/// Slots here are in RGB order. Implementations ranking over BGR buffers
/// (as OpenCV-backed ones do) write the brightest channel into the blue
/// slot instead, so the two agree on the ranking rule but not on which
/// color receives it.
pub fn estimate_atmospheric_light(frame: &Frame, top_percentile: f64) -> Result<AtmosphericLight> {
    if !top_percentile.is_finite() || top_percentile <= 0.0 || top_percentile > 1.0 {
        return Err(DefogError::InvalidInput(format!(
            "top_percentile {top_percentile} is outside (0, 1]"
        )));
    }

    let num_pixels = (frame.pixel_count() as f64 * top_percentile).floor() as usize;
    if num_pixels == 0 {
        return Err(DefogError::InvalidInput(format!(
            "top_percentile {} of a {}x{} frame samples no pixels",
            top_percentile,
            frame.width(),
            frame.height()
        )));
    }

    let histograms = channel_histograms(frame);
    let maxima = histograms.map(|hist| max_value(&hist));
    let ranking = rank_channels(maxima);

    let mut channels = [0u8; 3];
    for (slot, &channel) in ranking.iter().enumerate() {
        channels[slot] = kth_largest(&histograms[channel], num_pixels);
    }

    debug!(
        ?maxima,
        ?ranking,
        num_pixels,
        light = ?channels,
        "Estimated atmospheric light"
    );
    Ok(AtmosphericLight::new(channels))
}

fn channel_histograms(frame: &Frame) -> [[u32; 256]; 3] {
    let mut histograms = [[0u32; 256]; 3];
    for px in frame.pixels() {
        for (hist, &value) in histograms.iter_mut().zip(px) {
            hist[value as usize] += 1;
        }
    }
    histograms
}

fn max_value(hist: &[u32; 256]) -> u8 {
    hist.iter().rposition(|&count| count > 0).unwrap_or(0) as u8
}

/// Channel indices ordered by maximum value, descending.
///
/// A stable ascending sort reversed: among equal maxima the higher channel
/// index comes first.
fn rank_channels(maxima: [u8; 3]) -> [usize; 3] {
    let mut order = [0usize, 1, 2];
    order.sort_by_key(|&c| maxima[c]);
    order.reverse();
    order
}

/// The `k`-th largest value (1-based) counted in `hist`.
fn kth_largest(hist: &[u32; 256], k: usize) -> u8 {
    let mut seen = 0usize;
    for value in (0..256).rev() {
        seen += hist[value] as usize;
        if seen >= k {
            return value as u8;
        }
    }
    0
}
