//! Track reconstruction and efficiency extraction algorithms
//!
//! This module provides the error-weighted straight-line fit used to
//! reconstruct trajectories, the sliding-window efficiency estimator, and the
//! smeared box study used to calibrate its central window.

pub mod efficiency;
pub mod line_fit;
pub mod smear;

pub use efficiency::{EfficiencyEstimator, EfficiencyParams, EfficiencyReport, NumeratorSource};
pub use line_fit::{FitPoint, LineFit};
pub use smear::{SmearBoxParams, SmearBoxStudy};
