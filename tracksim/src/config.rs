//! JSON configuration of a complete simulation
//!
//! A configuration bundles the telescope geometry, the run parameters and the
//! efficiency estimator settings, so that a run can be reproduced from a
//! single file:
//!
//! ```json
//! {
//!   "telescope": { "name": "...", "hit_requirement": "require_hit", "planes": [ ... ] },
//!   "run": { "n_events": 40000, "seed": 5, ... },
//!   "efficiency": { "dut": "dut", "central_eff": 0.89, ... }
//! }
//! ```

use crate::algo::efficiency::{EfficiencyParams, NumeratorSource};
use crate::hardware::telescope::{models, PlaneId, Telescope, TelescopeConfig, TelescopeError};
use crate::sims::tracking_run::RunParams;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Telescope error: {0}")]
    Telescope(#[from] TelescopeError),

    #[error("No DUT plane configured and the telescope has no masked single-pixel plane")]
    NoDut,
}

/// Estimator settings tied to a DUT plane of the telescope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EfficiencyConfig {
    /// Name of the DUT plane; the first masked single-pixel plane if unset
    pub dut: Option<String>,
    pub numerator: NumeratorSource,
    pub central_eff: f64,
    pub slide_bins: usize,
    pub extra_range: usize,
}

impl Default for EfficiencyConfig {
    fn default() -> Self {
        Self {
            dut: None,
            numerator: NumeratorSource::default(),
            central_eff: EfficiencyParams::DEFAULT_CENTRAL_EFF,
            slide_bins: EfficiencyParams::DEFAULT_SLIDE_BINS,
            extra_range: 0,
        }
    }
}

impl EfficiencyConfig {
    /// Resolve the DUT plane in `telescope`
    pub fn dut_id(&self, telescope: &Telescope) -> Result<PlaneId, ConfigError> {
        match &self.dut {
            Some(name) => Ok(telescope.plane_id(name)?),
            None => telescope.default_dut().ok_or(ConfigError::NoDut),
        }
    }

    /// Estimator parameters for the DUT pitch
    pub fn params(&self, pixel_width: f64) -> EfficiencyParams {
        EfficiencyParams {
            pixel_width,
            central_eff: self.central_eff,
            slide_bins: self.slide_bins,
            extra_range: self.extra_range,
        }
    }
}

/// Complete simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub telescope: TelescopeConfig,
    #[serde(default)]
    pub run: RunParams,
    #[serde(default)]
    pub efficiency: EfficiencyConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            telescope: models::DUT_SIX_PLANE.to_config(),
            run: RunParams::default(),
            efficiency: EfficiencyConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn build_telescope(&self) -> Result<Telescope, ConfigError> {
        Ok(Telescope::from_config(&self.telescope)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sim.json");

        let mut config = SimulationConfig::default();
        config.run.n_events = 1234;
        config.efficiency.dut = Some("dut".to_string());
        config.efficiency.extra_range = 3;
        config.save_to_file(&path).unwrap();

        let loaded = SimulationConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.build_telescope().unwrap(), *models::DUT_SIX_PLANE);
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let json = r#"{
            "telescope": {
                "name": "pair",
                "planes": [
                    { "name": "a", "offset": 0.0, "z": 0.0, "pixel_width": 50.0 },
                    { "name": "b", "offset": 0.0, "z": 100.0, "pixel_width": 50.0 }
                ]
            }
        }"#;
        let config: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.run, RunParams::default());
        assert_eq!(config.efficiency.central_eff, 0.89);

        let telescope = config.build_telescope().unwrap();
        assert_eq!(telescope.len(), 2);
        assert!(matches!(
            config.efficiency.dut_id(&telescope),
            Err(ConfigError::NoDut)
        ));
    }

    #[test]
    fn test_dut_resolution() {
        let config = SimulationConfig::default();
        let telescope = config.build_telescope().unwrap();
        let dut = config.efficiency.dut_id(&telescope).unwrap();
        assert_eq!(telescope.plane(dut).unwrap().name(), "dut");

        let named = EfficiencyConfig {
            dut: Some("missing".to_string()),
            ..EfficiencyConfig::default()
        };
        assert!(matches!(
            named.dut_id(&telescope),
            Err(ConfigError::Telescope(TelescopeError::UnknownPlane(_)))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = SimulationConfig::load_from_file(&dir.path().join("none.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
