//! Transmission map estimation.
//!
//! Transmission is the fraction of scene radiance that reaches the camera:
//! 1.0 means no haze, values near 0 mean dense haze.

use crate::atmospheric::AtmosphericLight;
use crate::field::{NormalizedFrame, ScalarField};
use crate::filter::{filter_for, ColorGuidedFilter, EdgeAwareFilter};
use defog_core::{DefogError, DehazeConfig, Frame, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters for transmission estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransmissionParams {
    /// Lower bound of the final map.
    pub tmin: f32,
    /// Haze removal strength.
    pub omega: f32,
    /// Edge-aware filter support radius (pixels).
    pub radius: u32,
    /// Edge-aware filter regularization.
    pub eps: f32,
    /// Exponent applied after refinement.
    pub gamma: f32,
}

impl Default for TransmissionParams {
    fn default() -> Self {
        Self::from(&DehazeConfig::default())
    }
}

impl From<&DehazeConfig> for TransmissionParams {
    fn from(config: &DehazeConfig) -> Self {
        Self {
            tmin: config.tmin,
            omega: config.omega,
            radius: config.guided_filter_radius,
            eps: config.eps,
            gamma: config.gamma,
        }
    }
}

impl TransmissionParams {
    pub fn validate(&self) -> Result<()> {
        if !self.tmin.is_finite() || self.tmin <= 0.0 || self.tmin > 1.0 {
            return Err(DefogError::InvalidInput(format!(
                "tmin {} is outside (0, 1]",
                self.tmin
            )));
        }
        if !self.omega.is_finite() || !(0.0..=1.0).contains(&self.omega) {
            return Err(DefogError::InvalidInput(format!(
                "omega {} is outside [0, 1]",
                self.omega
            )));
        }
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(DefogError::InvalidInput(format!(
                "gamma {} must be > 0",
                self.gamma
            )));
        }
        Ok(())
    }
}

/// Per-pixel transmission with every value in `[tmin, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransmissionMap {
    field: ScalarField,
}

impl TransmissionMap {
    /// Wrap a field, clamping its values into `[tmin, 1.0]`.
    pub fn from_field(field: ScalarField, tmin: f32) -> Self {
        Self {
            field: field.map(|t| t.max(tmin).min(1.0)),
        }
    }

    /// A map with the same transmission everywhere.
    pub fn uniform(width: u32, height: u32, t: f32) -> Self {
        Self::from_field(ScalarField::filled(width, height, t), t.min(1.0))
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        self.field.dimensions()
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.field.get(x, y)
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        self.field.as_slice()
    }

    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.field.min_max()
    }
}

/// `t_raw = 1 - omega * lum(frame) / lum(light)`, before refinement.
pub fn raw_transmission(
    frame: &NormalizedFrame,
    light: &AtmosphericLight,
    omega: f32,
) -> Result<ScalarField> {
    let light_luminance = light.luminance();
    if light_luminance.is_nan() || light_luminance <= 0.0 {
        return Err(DefogError::DegenerateLight {
            luminance: light_luminance,
        });
    }
    Ok(frame
        .luminance()
        .map(|lum| 1.0 - omega * lum / light_luminance))
}

/// Estimates transmission maps with a configurable edge-aware filter.
pub struct TransmissionEstimator {
    params: TransmissionParams,
    filter: Box<dyn EdgeAwareFilter>,
}

impl TransmissionEstimator {
    /// Create an estimator refining with `filter`.
    pub fn new(params: TransmissionParams, filter: Box<dyn EdgeAwareFilter>) -> Result<Self> {
        params.validate()?;
        Ok(Self { params, filter })
    }

    /// Create an estimator from a dehazing configuration.
    pub fn from_config(config: &DehazeConfig) -> Result<Self> {
        Self::new(TransmissionParams::from(config), filter_for(config.filter))
    }

    /// Swap the refinement filter.
    pub fn set_filter(&mut self, filter: Box<dyn EdgeAwareFilter>) {
        self.filter = filter;
    }

    pub fn params(&self) -> &TransmissionParams {
        &self.params
    }

    pub fn filter_name(&self) -> &str {
        self.filter.name()
    }

    /// Estimate the transmission map of `frame` under `light`.
    pub fn estimate(&self, frame: &Frame, light: &AtmosphericLight) -> Result<TransmissionMap> {
        let guide = NormalizedFrame::from_frame(frame);
        self.estimate_normalized(&guide, light)
    }

    /// Same as [`estimate`](Self::estimate) for an already normalized frame.
    pub fn estimate_normalized(
        &self,
        frame: &NormalizedFrame,
        light: &AtmosphericLight,
    ) -> Result<TransmissionMap> {
        let p = &self.params;
        let raw = raw_transmission(frame, light, p.omega)?;
        let refined = self.filter.smooth(frame, &raw, p.radius, p.eps)?;

        // Refinement may overshoot [0, 1]; a negative base would make the
        // power NaN.
        let gamma = p.gamma;
        let shaped = refined.map(|t| t.clamp(0.0, 1.0).powf(gamma));
        let map = TransmissionMap::from_field(shaped, p.tmin);

        if let Some((lo, hi)) = map.min_max() {
            debug!(
                filter = self.filter.name(),
                min = lo,
                max = hi,
                "Estimated transmission map"
            );
        }
        Ok(map)
    }
}

impl Default for TransmissionEstimator {
    fn default() -> Self {
        Self {
            params: TransmissionParams::default(),
            filter: Box::new(ColorGuidedFilter),
        }
    }
}

/// Estimate a transmission map with the color guided filter.
pub fn estimate_transmission(
    frame: &Frame,
    light: &AtmosphericLight,
    params: &TransmissionParams,
) -> Result<TransmissionMap> {
    TransmissionEstimator::new(*params, Box::new(ColorGuidedFilter))?.estimate(frame, light)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::GrayGuidedFilter;
    use proptest::prelude::*;

    #[test]
    fn black_light_is_degenerate() {
        let frame = Frame::filled(4, 4, [100, 100, 100]);
        let result = estimate_transmission(
            &frame,
            &AtmosphericLight::new([0, 0, 0]),
            &TransmissionParams::default(),
        );
        assert!(matches!(result, Err(DefogError::DegenerateLight { .. })));
    }

    #[test]
    fn frame_equal_to_light_gives_one_minus_omega_before_refinement() {
        let frame = Frame::filled(4, 4, [128, 128, 128]);
        let light = AtmosphericLight::new([128, 128, 128]);
        let raw = raw_transmission(&NormalizedFrame::from_frame(&frame), &light, 0.95).unwrap();
        assert!(raw.as_slice().iter().all(|&t| (t - 0.05).abs() < 1e-5));

        // 0.05^0.7 = 0.123, above the 0.1 floor.
        let map = estimate_transmission(&frame, &light, &TransmissionParams::default()).unwrap();
        let expected = 0.05f32.powf(0.7);
        assert!(map.as_slice().iter().all(|&t| (t - expected).abs() < 1e-3));
    }

    #[test]
    fn black_frame_has_full_transmission() {
        let frame = Frame::filled(6, 6, [0, 0, 0]);
        let light = AtmosphericLight::new([200, 210, 220]);
        let map = estimate_transmission(&frame, &light, &TransmissionParams::default()).unwrap();
        assert!(map.as_slice().iter().all(|&t| (t - 1.0).abs() < 1e-5));
    }

    #[test]
    fn tmin_floor_applies() {
        let frame = Frame::filled(4, 4, [255, 255, 255]);
        let light = AtmosphericLight::new([255, 255, 255]);
        let params = TransmissionParams {
            tmin: 0.3,
            omega: 1.0,
            ..Default::default()
        };
        let map = estimate_transmission(&frame, &light, &params).unwrap();
        assert_eq!(map.min_max(), Some((0.3, 0.3)));
    }

    #[test]
    fn output_matches_frame_dimensions() {
        let frame = Frame::test_pattern(40, 24);
        let light = AtmosphericLight::new([230, 230, 230]);
        let estimator = TransmissionEstimator::new(
            TransmissionParams {
                radius: 5,
                ..Default::default()
            },
            Box::new(GrayGuidedFilter),
        )
        .unwrap();
        assert_eq!(estimator.filter_name(), "gray");
        let map = estimator.estimate(&frame, &light).unwrap();
        assert_eq!(map.dimensions(), (40, 24));
    }

    #[test]
    fn invalid_params_are_rejected() {
        for params in [
            TransmissionParams {
                tmin: 0.0,
                ..Default::default()
            },
            TransmissionParams {
                omega: 1.5,
                ..Default::default()
            },
            TransmissionParams {
                gamma: -1.0,
                ..Default::default()
            },
        ] {
            assert!(TransmissionEstimator::new(params, Box::new(ColorGuidedFilter)).is_err());
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn values_stay_within_tmin_and_one(
            data in proptest::collection::vec(any::<u8>(), 8 * 6 * 3),
            light in proptest::array::uniform3(1u8..=255),
            tmin in 0.01f32..=1.0,
            omega in 0.0f32..=1.0,
            radius in 0u32..6,
            eps in 0.0001f32..10.0,
            gamma in 0.1f32..3.0,
        ) {
            let frame = Frame::from_raw(8, 6, data).unwrap();
            let params = TransmissionParams { tmin, omega, radius, eps, gamma };
            let map = estimate_transmission(&frame, &AtmosphericLight::new(light), &params).unwrap();
            for &t in map.as_slice() {
                prop_assert!(t.is_finite());
                prop_assert!(t >= tmin && t <= 1.0, "t = {} outside [{}, 1]", t, tmin);
            }
        }
    }
}
