//! Pixel telescope simulation and DUT hit-efficiency estimation
//!
//! This crate simulates a beam telescope made of pixelated tracking planes
//! with a device-under-test (DUT) embedded among them. Each simulated particle
//! follows a straight line, is digitized to pixel centers on every plane, and
//! is refitted from the unmasked planes with an error-weighted straight-line
//! fit. Residual distributions on the DUT are then turned into a
//! position-resolved efficiency curve with a sliding-window ratio of
//! integrals.
//!
//! Module layout:
//! - [`hardware`]: plane geometry, digitization rules, telescope definitions
//! - [`algo`]: weighted line fit, efficiency estimator, smeared box study
//! - [`sims`]: random source, trajectories, events and the simulation loop
//! - [`io`]: histogram export and efficiency plots
//! - [`config`]: JSON configuration of a complete run

pub mod algo;
pub mod config;
pub mod hardware;
pub mod io;
pub mod shared_args;
pub mod sims;

// Re-exports for easier access
pub use algo::efficiency::{EfficiencyEstimator, EfficiencyParams, EfficiencyReport, NumeratorSource};
pub use algo::line_fit::{FitPoint, LineFit};
pub use config::{EfficiencyConfig, SimulationConfig};
pub use hardware::plane::{HitRequirement, PixelHit, Plane, PlaneConfig};
pub use hardware::telescope::{PlaneId, Telescope, TelescopeConfig};
pub use sims::event::{DigitizedEvent, Event, EventError, FittedEvent};
pub use sims::random::RandomSource;
pub use sims::tracking_run::{RunParams, RunResult, TrackingRun};
pub use sims::trajectory::{TrackGenerator, Trajectory};
