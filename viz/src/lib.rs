//! Histogram accumulation and text visualization for telescope simulations.
//!
//! This crate is the histogram sink of the workspace. Simulation code creates
//! named, equally binned histograms, fills them with weighted values, and asks
//! for bin-range integrals. The same histograms render to ASCII so that runs
//! can be inspected from a terminal or embedded in logs.
//!
//! # Core Modules
//!
//! ## Histogram (`histogram`)
//! - **Weighted fills**: `fill(value, weight)` with underflow/overflow tracking
//! - **Integrals**: inclusive bin-range integrals with clamping at the edges
//! - **Merging**: bin-by-bin summation of histograms with identical binning
//! - **Summary statistics**: weighted mean and RMS over bin centers
//! - **ASCII output**: linear or log10 bar rendering
//!
//! # Usage
//!
//! ```rust
//! use viz::histogram::Histogram;
//!
//! let mut residuals = Histogram::new("plane1", 100, -50.0, 50.0)?;
//! residuals.fill(-3.2, 1.0);
//! residuals.fill(4.9, 1.0);
//! residuals.fill(0.1, 2.0);
//!
//! assert_eq!(residuals.integral(0, 99), 4.0);
//! println!("{}", residuals.format()?);
//! # Ok::<(), viz::VizError>(())
//! ```

use std::fmt;
use thiserror::Error;

/// Error types for histogram and formatting operations.
#[derive(Debug, Error)]
pub enum VizError {
    /// Histogram creation or analysis error.
    ///
    /// Includes invalid binning, out-of-range bin access and merging
    /// histograms whose binning does not match.
    #[error("Histogram error: {0}")]
    HistogramError(String),

    /// Text formatting error.
    #[error("Formatting error: {0}")]
    FmtError(#[from] fmt::Error),
}

/// Standard Result type for all visualization operations.
pub type Result<T> = std::result::Result<T, VizError>;

pub mod histogram;
