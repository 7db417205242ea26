//! Scene radiance recovery: inverting the haze formation model
//! `I = J * t + A * (1 - t)` for the haze-free radiance `J`.

use crate::atmospheric::AtmosphericLight;
use crate::transmission::TransmissionMap;
use defog_core::{DefogError, Frame, Result, CHANNELS};
use rayon::prelude::*;

/// Recover the dehazed frame.
///
/// Per pixel and channel: `amplification * ((I - A) / t + A)`, with one
/// transmission value shared by the three channels of a pixel. The result is
/// scaled to [0, 255], clamped and truncated; overshoot saturates silently.
pub fn recover_scene_radiance(
    frame: &Frame,
    light: &AtmosphericLight,
    transmission: &TransmissionMap,
    amplification: f32,
) -> Result<Frame> {
    ensure_same_size(frame, transmission)?;
    let a = light.normalized().to_array();
    map_pixels(frame, transmission, |i, t, c| {
        amplification * ((i - a[c]) / t + a[c])
    })
}

/// Apply the haze formation model to a clean frame: `F * t + A * (1 - t)`,
/// rounded to the nearest 8-bit value.
///
/// The forward counterpart of [`recover_scene_radiance`], used to build
/// synthetic hazy footage with known light and transmission.
pub fn synthesize_haze(
    clean: &Frame,
    light: &AtmosphericLight,
    transmission: &TransmissionMap,
) -> Result<Frame> {
    ensure_same_size(clean, transmission)?;
    let a = light.normalized().to_array();
    // +0.5 / 255 turns the truncation in map_pixels into rounding.
    map_pixels(clean, transmission, |f, t, c| {
        f * t + a[c] * (1.0 - t) + 0.5 / 255.0
    })
}

fn ensure_same_size(frame: &Frame, transmission: &TransmissionMap) -> Result<()> {
    if frame.dimensions() != transmission.dimensions() {
        return Err(DefogError::DimensionMismatch {
            expected: frame.dimensions(),
            got: transmission.dimensions(),
        });
    }
    Ok(())
}

/// Evaluate `f(value, t, channel)` on normalized values for every sample,
/// writing `clamp(result * 255)` truncated to u8.
fn map_pixels(
    frame: &Frame,
    transmission: &TransmissionMap,
    f: impl Fn(f32, f32, usize) -> f32 + Sync,
) -> Result<Frame> {
    let (width, height) = frame.dimensions();
    if frame.is_empty() {
        return Ok(frame.clone());
    }
    let row_bytes = width as usize * CHANNELS;
    let mut out = vec![0u8; frame.as_bytes().len()];

    out.par_chunks_mut(row_bytes)
        .zip(frame.as_bytes().par_chunks(row_bytes))
        .zip(transmission.as_slice().par_chunks(width as usize))
        .for_each(|((dst, src), t_row)| {
            for ((dst_px, src_px), &t) in dst
                .chunks_exact_mut(CHANNELS)
                .zip(src.chunks_exact(CHANNELS))
                .zip(t_row)
            {
                for c in 0..CHANNELS {
                    let value = f(src_px[c] as f32 / 255.0, t, c);
                    dst_px[c] = (value * 255.0).clamp(0.0, 255.0) as u8;
                }
            }
        });

    Frame::from_raw(width, height, out)
}
