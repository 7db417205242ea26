//! Dehazing parameters with JSON persistence.
//!
//! Every field has a default, so a configuration file only needs to name the
//! parameters it overrides.

use crate::error::{DefogError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Edge-aware filter used to refine the transmission map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Guided filter with the full RGB frame as guide.
    #[default]
    Color,
    /// Guided filter with the frame's luminance as guide.
    Gray,
}

/// Parameters for one dehazing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DehazeConfig {
    /// Fraction of the brightest pixels that drive atmospheric light, (0, 1].
    pub top_percentile: f64,
    /// Lower bound of the transmission map.
    pub tmin: f32,
    /// Haze removal strength, [0, 1].
    pub omega: f32,
    /// Support radius of the edge-aware filter, in pixels.
    pub guided_filter_radius: u32,
    /// Regularization of the edge-aware filter (larger = smoother).
    pub eps: f32,
    /// Exponent applied to the refined transmission.
    pub gamma: f32,
    /// Gain applied to the recovered radiance.
    pub amplification: f32,
    pub filter: FilterKind,
}

impl Default for DehazeConfig {
    fn default() -> Self {
        Self {
            top_percentile: 0.1,
            tmin: 0.1,
            omega: 0.95,
            guided_filter_radius: 40,
            eps: 1.0,
            gamma: 0.7,
            amplification: 1.0,
            filter: FilterKind::Color,
        }
    }
}

impl DehazeConfig {
    /// Check every parameter is usable.
    pub fn validate(&self) -> Result<()> {
        if !self.top_percentile.is_finite()
            || self.top_percentile <= 0.0
            || self.top_percentile > 1.0
        {
            return Err(invalid("top_percentile", self.top_percentile, "(0, 1]"));
        }
        if !self.tmin.is_finite() || self.tmin <= 0.0 || self.tmin > 1.0 {
            return Err(invalid("tmin", self.tmin, "(0, 1]"));
        }
        if !self.omega.is_finite() || !(0.0..=1.0).contains(&self.omega) {
            return Err(invalid("omega", self.omega, "[0, 1]"));
        }
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(invalid("eps", self.eps, "> 0"));
        }
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(invalid("gamma", self.gamma, "> 0"));
        }
        if !self.amplification.is_finite() || self.amplification < 0.0 {
            return Err(invalid("amplification", self.amplification, ">= 0"));
        }
        Ok(())
    }

    /// Serialize to pretty JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| DefogError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Parse and validate a configuration from JSON bytes.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(data)
            .map_err(|e| DefogError::Config(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DefogError::NotFound(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }

    /// Save the configuration as JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

fn invalid(name: &str, value: impl std::fmt::Display, range: &str) -> DefogError {
    DefogError::InvalidInput(format!("{name} = {value} is outside {range}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DehazeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.guided_filter_radius, 40);
        assert_eq!(config.filter, FilterKind::Color);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = DehazeConfig::from_json(br#"{ "omega": 0.8, "filter": "gray" }"#).unwrap();
        assert_eq!(config.omega, 0.8);
        assert_eq!(config.filter, FilterKind::Gray);
        assert_eq!(config.tmin, 0.1);
        assert_eq!(config.gamma, 0.7);
    }

    #[test]
    fn json_round_trip() {
        let config = DehazeConfig {
            guided_filter_radius: 8,
            amplification: 1.2,
            ..Default::default()
        };
        let bytes = config.to_json().unwrap();
        assert_eq!(DehazeConfig::from_json(&bytes).unwrap(), config);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let cases = [
            DehazeConfig {
                top_percentile: 0.0,
                ..Default::default()
            },
            DehazeConfig {
                top_percentile: 1.5,
                ..Default::default()
            },
            DehazeConfig {
                tmin: 1.5,
                ..Default::default()
            },
            DehazeConfig {
                omega: -0.1,
                ..Default::default()
            },
            DehazeConfig {
                eps: 0.0,
                ..Default::default()
            },
            DehazeConfig {
                gamma: f32::NAN,
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(DefogError::InvalidInput(_))),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn malformed_json_is_config_error() {
        assert!(matches!(
            DehazeConfig::from_json(b"{ not json"),
            Err(DefogError::Config(_))
        ));
        assert!(matches!(
            DehazeConfig::from_json(br#"{ "omega": 2.0 }"#),
            Err(DefogError::InvalidInput(_))
        ));
    }
}
