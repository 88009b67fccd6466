//! Command-line arguments shared by the simulation binaries

use crate::config::SimulationConfig;
use crate::hardware::plane::HitRequirement;
use crate::hardware::telescope::{models, Telescope};
use crate::sims::tracking_run::RunParams;
use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Parse a fiducial range in format "min,max"
fn parse_fiducial_range(s: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 2 {
        return Err("Fiducial range must be in format 'min,max'".to_string());
    }

    let min = parts[0]
        .trim()
        .parse::<f64>()
        .map_err(|_| "Invalid minimum value".to_string())?;
    let max = parts[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| "Invalid maximum value".to_string())?;

    if min >= max {
        return Err("Fiducial minimum must be below maximum".to_string());
    }

    Ok((min, max))
}

/// Sweep range "start:stop:step" with an inclusive stop.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeArg(pub f64, pub f64, pub f64);

impl FromStr for RangeArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err("Range must be in format 'start:stop:step'".to_string());
        }

        let parse = |part: &str, what: &str| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid {what} value"))
        };
        let start = parse(parts[0], "start")?;
        let stop = parse(parts[1], "stop")?;
        let step = parse(parts[2], "step")?;

        if step == 0.0 {
            return Err("Step cannot be zero".to_string());
        }
        if step > 0.0 && start > stop {
            return Err("For positive step, start must not exceed stop".to_string());
        }
        if step < 0.0 && start < stop {
            return Err("For negative step, start must not be below stop".to_string());
        }

        Ok(RangeArg(start, stop, step))
    }
}

impl fmt::Display for RangeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.0, self.1, self.2)
    }
}

impl RangeArg {
    pub fn start(&self) -> f64 {
        self.0
    }

    pub fn stop(&self) -> f64 {
        self.1
    }

    pub fn step(&self) -> f64 {
        self.2
    }

    /// All sweep values, computed as `start + k * step` so rounding does not
    /// accumulate. A stop within a millionth of a step is included.
    pub fn values(&self) -> Vec<f64> {
        let (start, stop, step) = (self.0, self.1, self.2);
        let steps = ((stop - start) / step + 1e-6).floor();
        if !steps.is_finite() || steps < 0.0 {
            return Vec::new();
        }
        (0..=steps as usize)
            .map(|k| start + k as f64 * step)
            .collect()
    }
}

/// Predefined telescope geometries
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TelescopeModel {
    /// Three aligned 50 µm planes
    ThreePlane,
    /// Mixed 250/50 µm pitch planes with misalignments
    MixedSixPlane,
    /// Six 50 µm planes around a 33 µm single-pixel DUT
    DutSixPlane,
}

impl fmt::Display for TelescopeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelescopeModel::ThreePlane => write!(f, "three-plane"),
            TelescopeModel::MixedSixPlane => write!(f, "mixed-six-plane"),
            TelescopeModel::DutSixPlane => write!(f, "dut-six-plane"),
        }
    }
}

impl TelescopeModel {
    pub fn to_telescope(&self) -> &'static Telescope {
        match self {
            TelescopeModel::ThreePlane => &*models::THREE_PLANE,
            TelescopeModel::MixedSixPlane => &*models::MIXED_SIX_PLANE,
            TelescopeModel::DutSixPlane => &*models::DUT_SIX_PLANE,
        }
    }
}

/// Common arguments shared across simulation binaries
#[derive(Parser, Debug, Clone)]
pub struct SharedSimulationArgs {
    /// Predefined telescope geometry
    #[arg(long, value_enum, default_value_t = TelescopeModel::DutSixPlane)]
    pub telescope: TelescopeModel,

    /// JSON simulation config, replacing --telescope and the run options
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of simulated particles
    #[arg(short = 'n', long, default_value_t = 40_000)]
    pub events: usize,

    /// Master random seed
    #[arg(long, default_value_t = 5)]
    pub seed: u64,

    /// Fiducial intercept range (format: "min,max")
    #[arg(long, default_value = "75,525", value_parser = parse_fiducial_range)]
    pub fiducial: (f64, f64),

    /// One-sigma beam divergence in milliradians
    #[arg(long, default_value_t = 0.0)]
    pub angular_sigma_mrad: f64,

    /// Bins of each residual histogram
    #[arg(long, default_value_t = 1000)]
    pub residual_bins: usize,

    /// Residual histogram half range in pixel widths
    #[arg(long, default_value_t = 2.0)]
    pub half_range_pixels: f64,

    /// Override the telescope's single-pixel hit requirement
    #[arg(long, value_enum)]
    pub hit_requirement: Option<HitRequirement>,

    /// Run on a single thread
    #[arg(long, default_value_t = false)]
    pub serial: bool,
}

impl SharedSimulationArgs {
    pub fn to_run_params(&self) -> RunParams {
        RunParams {
            n_events: self.events,
            seed: self.seed,
            x_min: self.fiducial.0,
            x_max: self.fiducial.1,
            angular_sigma_rad: self.angular_sigma_mrad * 1e-3,
            residual_bins: self.residual_bins,
            half_range_pixels: self.half_range_pixels,
            parallel: !self.serial,
        }
    }

    /// Simulation configuration from `--config`, or the selected model with
    /// the command-line run parameters.
    pub fn load_config(&self) -> Result<SimulationConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => {
                log::info!("Loading simulation config from {}", path.display());
                SimulationConfig::load_from_file(path)?
            }
            None => SimulationConfig {
                telescope: self.telescope.to_telescope().to_config(),
                run: self.to_run_params(),
                ..SimulationConfig::default()
            },
        };

        if let Some(mode) = self.hit_requirement {
            config.telescope.hit_requirement = mode;
        }
        Ok(config)
    }
}
