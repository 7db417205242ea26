//! Edge-aware smoothing of scalar fields.
//!
//! The raw transmission estimate is noisy and blocky; these filters smooth it
//! inside regions of uniform color while keeping the discontinuities that line
//! up with edges of the frame, which suppresses halos around objects.

use crate::field::{NormalizedFrame, ScalarField};
use defog_core::{DefogError, FilterKind, Result};
use glam::{DMat3, DVec3};
use rayon::prelude::*;

/// An edge-preserving filter that smooths `target` guided by `guide`.
pub trait EdgeAwareFilter: Send + Sync {
    /// Filter name.
    fn name(&self) -> &str;

    /// Smooth `target` with support `radius` and regularization `eps`
    /// (larger = smoother, less faithful to edges).
    fn smooth(
        &self,
        guide: &NormalizedFrame,
        target: &ScalarField,
        radius: u32,
        eps: f32,
    ) -> Result<ScalarField>;
}

fn check_inputs(guide: &NormalizedFrame, target: &ScalarField, eps: f32) -> Result<()> {
    if guide.dimensions() != target.dimensions() {
        return Err(DefogError::DimensionMismatch {
            expected: guide.dimensions(),
            got: target.dimensions(),
        });
    }
    if !eps.is_finite() || eps <= 0.0 {
        return Err(DefogError::InvalidInput(format!("eps {eps} must be > 0")));
    }
    Ok(())
}

/// Guided filter with the full RGB frame as guide.
///
/// Per window the output is a linear function of the guide color,
/// `q = a . I + b`, where `a = (Sigma + eps * U)^-1 cov(I, p)` solves a 3x3
/// system built from the guide's local color covariance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorGuidedFilter;

impl EdgeAwareFilter for ColorGuidedFilter {
    fn name(&self) -> &str {
        "color"
    }

    fn smooth(
        &self,
        guide: &NormalizedFrame,
        target: &ScalarField,
        radius: u32,
        eps: f32,
    ) -> Result<ScalarField> {
        check_inputs(guide, target, eps)?;
        if target.is_empty() {
            return Ok(target.clone());
        }
        let (width, height) = target.dimensions();
        let [ir, ig, ib] = guide.planes();

        let mean_i = [ir.box_mean(radius), ig.box_mean(radius), ib.box_mean(radius)];
        let mean_p = target.box_mean(radius);
        let mean_ip = [
            (ir * target).box_mean(radius),
            (ig * target).box_mean(radius),
            (ib * target).box_mean(radius),
        ];
        // Upper triangle of the local guide covariance
        let corr_rr = (ir * ir).box_mean(radius);
        let corr_rg = (ir * ig).box_mean(radius);
        let corr_rb = (ir * ib).box_mean(radius);
        let corr_gg = (ig * ig).box_mean(radius);
        let corr_gb = (ig * ib).box_mean(radius);
        let corr_bb = (ib * ib).box_mean(radius);

        let eps = eps as f64;
        let coefficients: Vec<(DVec3, f64)> = (0..target.len())
            .into_par_iter()
            .map(|i| {
                let mi = DVec3::new(
                    mean_i[0].as_slice()[i] as f64,
                    mean_i[1].as_slice()[i] as f64,
                    mean_i[2].as_slice()[i] as f64,
                );
                let mp = mean_p.as_slice()[i] as f64;
                let cov_ip = DVec3::new(
                    mean_ip[0].as_slice()[i] as f64,
                    mean_ip[1].as_slice()[i] as f64,
                    mean_ip[2].as_slice()[i] as f64,
                ) - mi * mp;

                let rr = corr_rr.as_slice()[i] as f64 - mi.x * mi.x + eps;
                let rg = corr_rg.as_slice()[i] as f64 - mi.x * mi.y;
                let rb = corr_rb.as_slice()[i] as f64 - mi.x * mi.z;
                let gg = corr_gg.as_slice()[i] as f64 - mi.y * mi.y + eps;
                let gb = corr_gb.as_slice()[i] as f64 - mi.y * mi.z;
                let bb = corr_bb.as_slice()[i] as f64 - mi.z * mi.z + eps;
                let sigma = DMat3::from_cols(
                    DVec3::new(rr, rg, rb),
                    DVec3::new(rg, gg, gb),
                    DVec3::new(rb, gb, bb),
                );

                let det = sigma.determinant();
                let a = if det.is_finite() && det > 0.0 {
                    sigma.inverse() * cov_ip
                } else {
                    DVec3::ZERO
                };
                (a, mp - a.dot(mi))
            })
            .collect();

        let plane = |f: &(dyn Fn(&(DVec3, f64)) -> f64 + Sync)| -> Result<ScalarField> {
            ScalarField::from_vec(
                width,
                height,
                coefficients.par_iter().map(|c| f(c) as f32).collect(),
            )
        };
        let mean_ar = plane(&|c| c.0.x)?.box_mean(radius);
        let mean_ag = plane(&|c| c.0.y)?.box_mean(radius);
        let mean_ab = plane(&|c| c.0.z)?.box_mean(radius);
        let mean_b = plane(&|c| c.1)?.box_mean(radius);

        let data = (0..target.len())
            .into_par_iter()
            .map(|i| {
                mean_ar.as_slice()[i] * ir.as_slice()[i]
                    + mean_ag.as_slice()[i] * ig.as_slice()[i]
                    + mean_ab.as_slice()[i] * ib.as_slice()[i]
                    + mean_b.as_slice()[i]
            })
            .collect();
        ScalarField::from_vec(width, height, data)
    }
}

/// Guided filter with the frame's luminance as guide.
///
/// Cheaper than [`ColorGuidedFilter`]; edges between colors of equal
/// luminance are not preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrayGuidedFilter;

impl EdgeAwareFilter for GrayGuidedFilter {
    fn name(&self) -> &str {
        "gray"
    }

    fn smooth(
        &self,
        guide: &NormalizedFrame,
        target: &ScalarField,
        radius: u32,
        eps: f32,
    ) -> Result<ScalarField> {
        check_inputs(guide, target, eps)?;
        if target.is_empty() {
            return Ok(target.clone());
        }
        let gray = guide.luminance();

        let mean_g = gray.box_mean(radius);
        let mean_p = target.box_mean(radius);
        let corr_gp = (&gray * target).box_mean(radius);
        let corr_gg = (&gray * &gray).box_mean(radius);

        let cov_gp = corr_gp.zip_map(&(&mean_g * &mean_p), |c, m| c - m);
        let var_g = corr_gg.zip_map(&(&mean_g * &mean_g), |c, m| c - m);

        let a = cov_gp.zip_map(&var_g, |cov, var| cov / (var + eps));
        let b = mean_p.zip_map(&(&a * &mean_g), |mp, am| mp - am);

        let mean_a = a.box_mean(radius);
        let mean_b = b.box_mean(radius);
        Ok((&mean_a * &gray).zip_map(&mean_b, |ag, b| ag + b))
    }
}

/// Box filter that ignores the guide; the edge-unaware baseline.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxBlurFilter;

impl EdgeAwareFilter for BoxBlurFilter {
    fn name(&self) -> &str {
        "box"
    }

    fn smooth(
        &self,
        guide: &NormalizedFrame,
        target: &ScalarField,
        radius: u32,
        eps: f32,
    ) -> Result<ScalarField> {
        check_inputs(guide, target, eps)?;
        Ok(target.box_mean(radius))
    }
}

/// Registry of available edge-aware filters.
pub struct FilterRegistry {
    filters: Vec<Box<dyn EdgeAwareFilter>>,
}

impl FilterRegistry {
    /// Create a registry with the built-in filters.
    pub fn new() -> Self {
        let mut reg = Self {
            filters: Vec::new(),
        };
        reg.register(Box::new(ColorGuidedFilter));
        reg.register(Box::new(GrayGuidedFilter));
        reg.register(Box::new(BoxBlurFilter));
        reg
    }

    /// Register a custom filter.
    pub fn register(&mut self, filter: Box<dyn EdgeAwareFilter>) {
        self.filters.push(filter);
    }

    /// Find a filter by name.
    pub fn find(&self, name: &str) -> Option<&dyn EdgeAwareFilter> {
        self.filters
            .iter()
            .find(|f| f.name() == name)
            .map(|f| f.as_ref())
    }

    /// Names of all registered filters.
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Boxed filter for a configured [`FilterKind`].
pub fn filter_for(kind: FilterKind) -> Box<dyn EdgeAwareFilter> {
    match kind {
        FilterKind::Color => Box::new(ColorGuidedFilter),
        FilterKind::Gray => Box::new(GrayGuidedFilter),
    }
}
