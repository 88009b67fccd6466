//! Sliding-window DUT efficiency estimation
//!
//! The estimator compares two residual distributions with identical binning:
//! a truth distribution (every particle crossing, relative to the DUT pixel
//! center) and a reconstructed distribution (only particles the DUT
//! registered). Ratios of their integrals over windows one central-window wide
//! give a position-resolved efficiency curve.
//!
//! # Examples
//!
//! ```rust
//! use tracksim::algo::efficiency::{EfficiencyEstimator, EfficiencyParams};
//! use viz::histogram::Histogram;
//!
//! let mut truth = Histogram::new("truth", 100, -50.0, 50.0)?;
//! truth.add_all((0..100).map(|i| i as f64 - 49.5));
//! let reco = truth.empty_like("reco");
//!
//! let estimator = EfficiencyEstimator::new(EfficiencyParams::for_pixel_width(33.0))?;
//! let report = estimator.estimate(&truth, &reco)?;
//! assert_eq!(report.curve.max_efficiency, 0.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::sims::tracking_run::PlaneHistograms;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use viz::histogram::Histogram;
use viz::VizError;

#[derive(Debug, Error)]
pub enum EfficiencyError {
    #[error("Truth and reconstructed histograms have different binning")]
    BinningMismatch,

    #[error("Invalid efficiency parameters: {0}")]
    InvalidParams(String),

    #[error("Central window [-{half_width}, {half_width}] not inside histogram [{low}, {high}]")]
    WindowOutsideHistogram { half_width: f64, low: f64, high: f64 },

    #[error("Plane '{0}' has no truth residual histograms; only masked planes do")]
    NotMasked(String),

    #[error("Histogram error: {0}")]
    Histogram(#[from] VizError),
}

/// Which distribution of a masked plane serves as the numerator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum NumeratorSource {
    /// True crossing positions of events the DUT registered
    #[default]
    TruthHit,
    /// DUT hit minus fitted track position
    Residual,
}

impl fmt::Display for NumeratorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumeratorSource::TruthHit => write!(f, "truth-hit"),
            NumeratorSource::Residual => write!(f, "residual"),
        }
    }
}

/// Tuning of the sliding-window estimator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyParams {
    /// DUT pixel width
    pub pixel_width: f64,
    /// Fraction of the pixel width covered by the central window
    pub central_eff: f64,
    /// Window shifts scanned on each side of the central position
    pub slide_bins: usize,
    /// Extra bins added on both sides of the numerator window
    pub extra_range: usize,
}

impl EfficiencyParams {
    pub const DEFAULT_CENTRAL_EFF: f64 = 0.89;
    pub const DEFAULT_SLIDE_BINS: usize = 200;

    pub fn for_pixel_width(pixel_width: f64) -> Self {
        Self {
            pixel_width,
            central_eff: Self::DEFAULT_CENTRAL_EFF,
            slide_bins: Self::DEFAULT_SLIDE_BINS,
            extra_range: 0,
        }
    }

    pub fn validate(&self) -> Result<(), EfficiencyError> {
        if !self.pixel_width.is_finite() || self.pixel_width <= 0.0 {
            return Err(EfficiencyError::InvalidParams(format!(
                "pixel width must be positive, got {}",
                self.pixel_width
            )));
        }
        if !(self.central_eff > 0.0 && self.central_eff <= 1.0) {
            return Err(EfficiencyError::InvalidParams(format!(
                "central fraction must be in (0, 1], got {}",
                self.central_eff
            )));
        }
        Ok(())
    }

    /// Half width of the central window
    pub fn half_width(&self) -> f64 {
        self.central_eff * self.pixel_width / 2.0
    }
}

/// Central window `[-w, +w]` expressed in bins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CentralWindow {
    pub half_width: f64,
    pub low_bin: usize,
    pub high_bin: usize,
}

impl CentralWindow {
    pub fn range_bins(&self) -> usize {
        self.high_bin - self.low_bin
    }
}

/// Integrals of the reconstructed distribution for shifted windows
#[derive(Debug, Clone, PartialEq)]
pub struct WindowScan {
    /// Truth integral over the central window
    pub truth_integral: f64,
    /// Reconstructed integral over the central window
    pub central_reco_integral: f64,
    /// Ratio of the two, when the truth integral is positive
    pub central_efficiency: Option<f64>,
    pub max_integral: f64,
    pub mean_integral: f64,
    pub rms_integral: f64,
    /// `(shift, integral)` for every scanned shift
    pub integrals: Vec<(isize, f64)>,
}

/// Position-resolved efficiency
#[derive(Debug, Clone)]
pub struct EfficiencyCurve {
    /// Efficiency per bin, same binning as the inputs
    pub curve: Histogram,
    /// Largest efficiency over the defined bins, zero if none
    pub max_efficiency: f64,
    /// Bins with a positive denominator
    pub defined_bins: usize,
}

#[derive(Debug, Clone)]
pub struct EfficiencyReport {
    pub window: CentralWindow,
    pub scan: WindowScan,
    pub curve: EfficiencyCurve,
}

impl fmt::Display for EfficiencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Central window: +/-{:.3} (bins {}..={}, {} wide)",
            self.window.half_width,
            self.window.low_bin,
            self.window.high_bin,
            self.window.range_bins()
        )?;
        writeln!(f, "Truth hits in window: {:.1}", self.scan.truth_integral)?;
        match self.scan.central_efficiency {
            Some(eff) => writeln!(f, "Central efficiency: {:.4}", eff)?,
            None => writeln!(f, "Central efficiency: undefined")?,
        }
        writeln!(
            f,
            "Sliding window integral: max {:.1}, mean {:.1}, rms {:.1}",
            self.scan.max_integral, self.scan.mean_integral, self.scan.rms_integral
        )?;
        write!(
            f,
            "Max efficiency: {:.4} over {} defined bins",
            self.curve.max_efficiency, self.curve.defined_bins
        )
    }
}

#[derive(Debug, Clone)]
pub struct EfficiencyEstimator {
    params: EfficiencyParams,
}

impl EfficiencyEstimator {
    pub fn new(params: EfficiencyParams) -> Result<Self, EfficiencyError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &EfficiencyParams {
        &self.params
    }

    /// Locate the central window in the binning of `hist`.
    pub fn central_window(&self, hist: &Histogram) -> Result<CentralWindow, EfficiencyError> {
        let half_width = self.params.half_width();
        let outside = || EfficiencyError::WindowOutsideHistogram {
            half_width,
            low: hist.low_edge(),
            high: hist.high_edge(),
        };

        let low_bin = hist.find_bin(-half_width).ok_or_else(outside)?;
        let high_bin = hist.find_bin(half_width).ok_or_else(outside)?;

        Ok(CentralWindow {
            half_width,
            low_bin,
            high_bin,
        })
    }

    /// Integrate both distributions over the central window and scan the
    /// reconstructed integral over shifted windows.
    pub fn scan_window(
        &self,
        truth: &Histogram,
        reco: &Histogram,
    ) -> Result<WindowScan, EfficiencyError> {
        check_binning(truth, reco)?;
        let window = self.central_window(truth)?;
        let (low, high) = (window.low_bin as isize, window.high_bin as isize);

        let truth_integral = truth.integral(low, high);
        let central_reco_integral = reco.integral(low, high);
        let central_efficiency =
            (truth_integral > 0.0).then(|| central_reco_integral / truth_integral);

        let slide = self.params.slide_bins as isize;
        let integrals: Vec<(isize, f64)> = (-slide..=slide)
            .map(|i| (i, reco.integral(low + i, high + i)))
            .collect();

        let n = integrals.len() as f64;
        let max_integral = integrals.iter().map(|&(_, v)| v).fold(0.0, f64::max);
        let mean_integral = integrals.iter().map(|&(_, v)| v).sum::<f64>() / n;
        let rms_integral = (integrals
            .iter()
            .map(|&(_, v)| (v - mean_integral).powi(2))
            .sum::<f64>()
            / n)
            .sqrt();

        Ok(WindowScan {
            truth_integral,
            central_reco_integral,
            central_efficiency,
            max_integral,
            mean_integral,
            rms_integral,
            integrals,
        })
    }

    /// Ratio of window integrals at every bin position.
    ///
    /// Bins whose truth integral is zero stay at zero.
    pub fn efficiency_curve(
        &self,
        truth: &Histogram,
        reco: &Histogram,
    ) -> Result<EfficiencyCurve, EfficiencyError> {
        check_binning(truth, reco)?;
        let window = self.central_window(truth)?;
        let range = window.range_bins() as isize;
        let extra = self.params.extra_range as isize;
        let nbins = truth.num_bins();

        let mut curve = truth.empty_like(format!("efficiency_{}", reco.name()));
        let mut max_efficiency = 0.0f64;
        let mut defined_bins = 0;

        for i in 0..nbins as isize {
            let denominator = truth.integral(i, i + range);
            if denominator <= 0.0 {
                continue;
            }
            let numerator = reco.integral(i - extra, i + range + extra);
            let efficiency = numerator / denominator;

            let out = (i + range / 2) as usize;
            if out < nbins {
                curve.set_bin_content(out, efficiency)?;
                max_efficiency = max_efficiency.max(efficiency);
                defined_bins += 1;
            }
        }

        log::debug!(
            "Efficiency curve '{}': {} defined bins, max {:.4}",
            curve.name(),
            defined_bins,
            max_efficiency
        );

        Ok(EfficiencyCurve {
            curve,
            max_efficiency,
            defined_bins,
        })
    }

    pub fn estimate(
        &self,
        truth: &Histogram,
        reco: &Histogram,
    ) -> Result<EfficiencyReport, EfficiencyError> {
        Ok(EfficiencyReport {
            window: self.central_window(truth)?,
            scan: self.scan_window(truth, reco)?,
            curve: self.efficiency_curve(truth, reco)?,
        })
    }

    /// Estimate the efficiency of a masked plane from its run histograms.
    pub fn estimate_plane(
        &self,
        plane: &PlaneHistograms,
        numerator: NumeratorSource,
    ) -> Result<EfficiencyReport, EfficiencyError> {
        let not_masked = || EfficiencyError::NotMasked(plane.plane_name.clone());
        let truth = plane.truth_residual.as_ref().ok_or_else(not_masked)?;
        let reco = match numerator {
            NumeratorSource::TruthHit => plane.truth_hit_residual.as_ref().ok_or_else(not_masked)?,
            NumeratorSource::Residual => &plane.residual,
        };
        self.estimate(truth, reco)
    }
}

fn check_binning(truth: &Histogram, reco: &Histogram) -> Result<(), EfficiencyError> {
    if truth.same_binning(reco) {
        Ok(())
    } else {
        Err(EfficiencyError::BinningMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Flat truth distribution with `per_bin` entries in every bin
    fn flat(name: &str, per_bin: f64) -> Histogram {
        let mut h = Histogram::new(name, 200, -100.0, 100.0).unwrap();
        for bin in 0..h.num_bins() {
            h.set_bin_content(bin, per_bin).unwrap();
        }
        h
    }

    /// Box of `per_bin` entries over `[-half, half)`
    fn boxed(name: &str, half: f64, per_bin: f64) -> Histogram {
        let mut h = Histogram::new(name, 200, -100.0, 100.0).unwrap();
        for bin in 0..h.num_bins() {
            let c = h.bin_center(bin);
            if c > -half && c < half {
                h.set_bin_content(bin, per_bin).unwrap();
            }
        }
        h
    }

    fn estimator() -> EfficiencyEstimator {
        EfficiencyEstimator::new(EfficiencyParams {
            slide_bins: 20,
            ..EfficiencyParams::for_pixel_width(40.0)
        })
        .unwrap()
    }

    #[test]
    fn test_default_params() {
        let p = EfficiencyParams::for_pixel_width(33.0);
        assert_eq!(p.central_eff, 0.89);
        assert_eq!(p.slide_bins, 200);
        assert_eq!(p.extra_range, 0);
        assert_relative_eq!(p.half_width(), 0.89 * 16.5);
    }

    #[test]
    fn test_invalid_params() {
        assert!(EfficiencyEstimator::new(EfficiencyParams::for_pixel_width(0.0)).is_err());
        let p = EfficiencyParams {
            central_eff: 1.5,
            ..EfficiencyParams::for_pixel_width(33.0)
        };
        assert!(matches!(
            EfficiencyEstimator::new(p),
            Err(EfficiencyError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_central_window_bins() {
        // half width 17.8 on unit bins starting at -100
        let window = estimator().central_window(&flat("t", 1.0)).unwrap();
        assert_eq!(window.low_bin, 82);
        assert_eq!(window.high_bin, 117);
        assert_eq!(window.range_bins(), 35);
    }

    #[test]
    fn test_window_outside_histogram() {
        let narrow = Histogram::new("n", 10, -5.0, 5.0).unwrap();
        assert!(matches!(
            estimator().central_window(&narrow),
            Err(EfficiencyError::WindowOutsideHistogram { .. })
        ));
    }

    #[test]
    fn test_binning_mismatch() {
        let truth = flat("t", 1.0);
        let reco = Histogram::new("r", 100, -100.0, 100.0).unwrap();
        assert!(matches!(
            estimator().estimate(&truth, &reco),
            Err(EfficiencyError::BinningMismatch)
        ));
    }

    #[test]
    fn test_perfect_dut_is_fully_efficient() {
        let truth = boxed("t", 60.0, 7.0);
        let reco = truth.clone();

        let est = estimator();
        let curve = est.efficiency_curve(&truth, &reco).unwrap();
        let range = est.central_window(&truth).unwrap().range_bins() as isize;
        for i in 0..truth.num_bins() as isize {
            if truth.integral(i, i + range) > 0.0 {
                let out = (i + range / 2) as usize;
                if out < truth.num_bins() {
                    assert_eq!(curve.curve.bin_content(out), 1.0);
                }
            }
        }
        assert_eq!(curve.max_efficiency, 1.0);

        let scan = est.scan_window(&truth, &reco).unwrap();
        assert_eq!(scan.central_efficiency, Some(1.0));
    }

    #[test]
    fn test_box_response_curve() {
        let truth = flat("t", 10.0);
        let reco = boxed("r", 20.0, 10.0);
        let curve = estimator().efficiency_curve(&truth, &reco).unwrap();

        // Window centered on zero sees only box content
        let center = curve.curve.find_bin(0.5).unwrap();
        assert_relative_eq!(curve.curve.bin_content(center), 1.0);
        // Far from the box nothing was registered
        let far = curve.curve.find_bin(70.5).unwrap();
        assert_eq!(curve.curve.bin_content(far), 0.0);

        for &c in curve.curve.contents() {
            assert!((0.0..=1.0).contains(&c));
        }
    }

    #[test]
    fn test_zero_denominator_left_undefined() {
        let truth = boxed("t", 10.0, 5.0);
        let reco = boxed("r", 10.0, 5.0);
        let curve = estimator().efficiency_curve(&truth, &reco).unwrap();

        // Windows over [-80, -45] see no truth at all
        let empty = curve.curve.find_bin(-60.5).unwrap();
        assert_eq!(curve.curve.bin_content(empty), 0.0);
        assert!(curve.defined_bins < truth.num_bins());
    }

    #[test]
    fn test_extra_range_widens_numerator() {
        let truth = flat("t", 1.0);
        let reco = flat("r", 1.0);
        let est = EfficiencyEstimator::new(EfficiencyParams {
            extra_range: 2,
            slide_bins: 5,
            ..EfficiencyParams::for_pixel_width(40.0)
        })
        .unwrap();
        let curve = est.efficiency_curve(&truth, &reco).unwrap();
        let center = curve.curve.find_bin(0.5).unwrap();
        // 36 denominator bins against 40 numerator bins
        assert_relative_eq!(curve.curve.bin_content(center), 40.0 / 36.0);
    }

    #[test]
    fn test_window_scan_statistics() {
        let truth = flat("t", 1.0);
        let reco = flat("r", 2.0);
        let scan = estimator().scan_window(&truth, &reco).unwrap();

        assert_eq!(scan.integrals.len(), 41);
        assert_eq!(scan.truth_integral, 36.0);
        assert_eq!(scan.central_reco_integral, 72.0);
        assert_eq!(scan.central_efficiency, Some(2.0));
        // Every shifted window stays inside a flat histogram
        assert_eq!(scan.max_integral, 72.0);
        assert_relative_eq!(scan.mean_integral, 72.0);
        assert_relative_eq!(scan.rms_integral, 0.0);
    }

    /// Ten unit bins over `[-5, 5)` with content equal to the bin index
    fn ramp(name: &str) -> Histogram {
        let mut h = Histogram::new(name, 10, -5.0, 5.0).unwrap();
        for bin in 0..h.num_bins() {
            h.set_bin_content(bin, bin as f64).unwrap();
        }
        h
    }

    /// Window [-1, 1] on the ramp covers bins 4..=6
    fn ramp_estimator(slide_bins: usize) -> EfficiencyEstimator {
        EfficiencyEstimator::new(EfficiencyParams {
            pixel_width: 4.0,
            central_eff: 0.5,
            slide_bins,
            extra_range: 0,
        })
        .unwrap()
    }

    #[test]
    fn test_window_scan_on_ramp() {
        let truth = Histogram::new("t", 10, -5.0, 5.0)
            .map(|mut h| {
                for bin in 0..10 {
                    h.set_bin_content(bin, 1.0).unwrap();
                }
                h
            })
            .unwrap();
        let reco = ramp("r");
        let scan = ramp_estimator(2).scan_window(&truth, &reco).unwrap();

        assert_eq!(
            scan.integrals,
            vec![(-2, 9.0), (-1, 12.0), (0, 15.0), (1, 18.0), (2, 21.0)]
        );
        assert_eq!(scan.truth_integral, 3.0);
        assert_eq!(scan.central_reco_integral, 15.0);
        assert_eq!(scan.central_efficiency, Some(5.0));
        assert_eq!(scan.max_integral, 21.0);
        assert_relative_eq!(scan.mean_integral, 15.0);
        // Deviations -6, -3, 0, 3, 6 over five windows
        assert_relative_eq!(scan.rms_integral, 18.0f64.sqrt());
        assert!(scan.max_integral != scan.mean_integral);
    }

    #[test]
    fn test_window_scan_clamps_at_edges() {
        let reco = ramp("r");
        let scan = ramp_estimator(5).scan_window(&reco, &reco).unwrap();

        let values: Vec<f64> = scan.integrals.iter().map(|&(_, v)| v).collect();
        assert_eq!(
            values,
            vec![1.0, 3.0, 6.0, 9.0, 12.0, 15.0, 18.0, 21.0, 24.0, 17.0, 9.0]
        );
        assert_eq!(scan.max_integral, 24.0);
        assert_relative_eq!(scan.mean_integral, 135.0 / 11.0);
        assert_relative_eq!(scan.rms_integral, 7.0722364868279, epsilon = 1e-9);
    }

    #[test]
    fn test_curve_peak_matches_max_efficiency() {
        let truth = boxed("t", 30.0, 10.0);
        let reco = boxed("r", 20.0, 10.0);
        let curve = estimator().efficiency_curve(&truth, &reco).unwrap();
        let (_, peak) = curve.curve.max_bin().unwrap();
        assert_eq!(peak, curve.max_efficiency);
    }

    #[test]
    fn test_report_display() {
        let truth = flat("t", 1.0);
        let report = estimator().estimate(&truth, &truth).unwrap();
        let text = report.to_string();
        assert!(text.contains("Central efficiency: 1.0000"));
        assert!(text.contains("Max efficiency"));
    }
}
