//! Single-channel f32 images and the normalized RGB guide.

use defog_core::{DefogError, Frame, Result};
use rayon::prelude::*;

/// A `width x height` grid of f32 values, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl ScalarField {
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0.0)
    }

    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    pub fn from_vec(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        if data.len() != width as usize * height as usize {
            return Err(DefogError::InvalidInput(format!(
                "{} values do not fill a {}x{} field",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Apply `f` to every value.
    pub fn map(&self, f: impl Fn(f32) -> f32 + Sync) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self.data.par_iter().map(|&v| f(v)).collect(),
        }
    }

    /// Combine two fields of equal size value by value.
    pub fn zip_map(&self, other: &Self, f: impl Fn(f32, f32) -> f32 + Sync) -> Self {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        Self {
            width: self.width,
            height: self.height,
            data: self
                .data
                .par_iter()
                .zip(other.data.par_iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }

    /// Smallest and largest value, or `None` for an empty field.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        if self.data.is_empty() {
            return None;
        }
        Some(self.data.iter().fold((f32::MAX, f32::MIN), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        }))
    }

    /// Mean value over all pixels.
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        (self.data.iter().map(|&v| v as f64).sum::<f64>() / self.data.len() as f64) as f32
    }

    /// Local mean over a `(2 * radius + 1)^2` window.
    ///
    /// Windows are clipped at the border and averaged over the pixels they
    /// cover. Uses a summed-area table, so the cost does not depend on
    /// `radius`.
    pub fn box_mean(&self, radius: u32) -> Self {
        if self.data.is_empty() || radius == 0 {
            return self.clone();
        }
        let w = self.width as usize;
        let h = self.height as usize;
        let r = radius as usize;

        // integral[(y + 1) * (w + 1) + (x + 1)] = sum of all values above and left of (x, y)
        let stride = w + 1;
        let mut integral = vec![0.0f64; stride * (h + 1)];
        for y in 0..h {
            let mut row_sum = 0.0f64;
            for x in 0..w {
                row_sum += self.data[y * w + x] as f64;
                integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
            }
        }

        let mut data = vec![0.0f32; w * h];
        data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
            let y0 = y.saturating_sub(r);
            let y1 = (y + r + 1).min(h);
            for (x, out) in row.iter_mut().enumerate() {
                let x0 = x.saturating_sub(r);
                let x1 = (x + r + 1).min(w);
                let sum = integral[y1 * stride + x1] - integral[y0 * stride + x1]
                    - integral[y1 * stride + x0]
                    + integral[y0 * stride + x0];
                let count = ((y1 - y0) * (x1 - x0)) as f64;
                *out = (sum / count) as f32;
            }
        });

        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

impl std::ops::Mul for &ScalarField {
    type Output = ScalarField;

    fn mul(self, rhs: Self) -> ScalarField {
        self.zip_map(rhs, |a, b| a * b)
    }
}

/// A frame converted to three f32 planes in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFrame {
    planes: [ScalarField; 3],
}

impl NormalizedFrame {
    pub fn from_frame(frame: &Frame) -> Self {
        let (width, height) = frame.dimensions();
        let n = frame.pixel_count();
        let mut r = Vec::with_capacity(n);
        let mut g = Vec::with_capacity(n);
        let mut b = Vec::with_capacity(n);
        for px in frame.pixels() {
            r.push(px[0] as f32 / 255.0);
            g.push(px[1] as f32 / 255.0);
            b.push(px[2] as f32 / 255.0);
        }
        let plane = |data| ScalarField {
            width,
            height,
            data,
        };
        Self {
            planes: [plane(r), plane(g), plane(b)],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.planes[0].width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.planes[0].height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        self.planes[0].dimensions()
    }

    /// Channel plane: 0 = R, 1 = G, 2 = B.
    #[inline]
    pub fn plane(&self, channel: usize) -> &ScalarField {
        &self.planes[channel]
    }

    #[inline]
    pub fn planes(&self) -> &[ScalarField; 3] {
        &self.planes
    }

    /// Rec. 601 luminance of every pixel.
    pub fn luminance(&self) -> ScalarField {
        let [wr, wg, wb] = defog_core::color::LUMA_WEIGHTS;
        let [r, g, b] = &self.planes;
        let data = r
            .data
            .par_iter()
            .zip(g.data.par_iter())
            .zip(b.data.par_iter())
            .map(|((&r, &g), &b)| wr * r + wg * g + wb * b)
            .collect();
        ScalarField {
            width: self.width(),
            height: self.height(),
            data,
        }
    }
}
