//! Error-weighted straight-line fit
//!
//! Fits `x(z) = slope * z + intercept` to measured points with inverse-variance
//! weights `w = 1 / error²`, using the closed-form normal equations of the
//! two-parameter linear model:
//!
//! ```text
//! A = Σ w·z   B = Σ w   C = Σ w·x   D = Σ w·z²   E = Σ w·z·x
//! DEN = D·B − A²
//! slope     = (E·B − C·A) / DEN      slope_error     = sqrt(B / DEN)
//! intercept = (D·C − E·A) / DEN      intercept_error = sqrt(D / DEN)
//! covariance = −A / DEN
//! ```
//!
//! A fit with `DEN <= 0`, or with a positive `DEN` below
//! `DEGENERATE_TOLERANCE · D·B`, is degenerate: every parameter stays zero and
//! [`LineFit::is_degenerate`] reports it. Callers must check before trusting
//! the parameters.

/// Relative size of `DEN` against `D·B` below which the fit is degenerate.
///
/// Points sharing one z cancel exactly in exact arithmetic; rounding can leave
/// a tiny positive remainder that must not be read as a valid fit.
const DEGENERATE_TOLERANCE: f64 = 1e-12;

/// One measurement entering the fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitPoint {
    /// Longitudinal position
    pub z: f64,
    /// Measured lateral position
    pub x: f64,
    /// Measurement standard deviation
    pub error: f64,
}

impl FitPoint {
    pub fn new(z: f64, x: f64, error: f64) -> Self {
        Self { z, x, error }
    }

    /// Inverse-variance weight, or `None` for unusable errors
    fn weight(&self) -> Option<f64> {
        if self.error.is_finite() && self.error > 0.0 && self.x.is_finite() && self.z.is_finite()
        {
            Some(1.0 / (self.error * self.error))
        } else {
            None
        }
    }
}

/// Immutable result of a weighted straight-line fit
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineFit {
    slope: f64,
    slope_error: f64,
    intercept: f64,
    intercept_error: f64,
    covariance: f64,
    chi2: f64,
    ndof: usize,
    denominator: f64,
    points: usize,
}

impl LineFit {
    /// Fit a line through `points`.
    ///
    /// Points with a non-positive or non-finite error carry no weight and are
    /// skipped.
    pub fn from_points(points: &[FitPoint]) -> Self {
        let (mut a, mut b, mut c, mut d, mut e) = (0.0, 0.0, 0.0, 0.0, 0.0);
        let mut used = 0usize;

        for (p, w) in points.iter().filter_map(|p| p.weight().map(|w| (p, w))) {
            a += w * p.z;
            b += w;
            c += w * p.x;
            d += w * p.z * p.z;
            e += w * p.z * p.x;
            used += 1;
        }

        let den = d * b - a * a;
        if den <= DEGENERATE_TOLERANCE * d * b {
            return Self {
                denominator: den.min(0.0),
                points: used,
                ..Self::default()
            };
        }

        let slope = (e * b - c * a) / den;
        let intercept = (d * c - e * a) / den;

        let chi2 = points
            .iter()
            .filter_map(|p| p.weight().map(|w| w * (p.x - (slope * p.z + intercept)).powi(2)))
            .sum();

        Self {
            slope,
            slope_error: (b / den).sqrt(),
            intercept,
            intercept_error: (d / den).sqrt(),
            covariance: -a / den,
            chi2,
            ndof: used.saturating_sub(2),
            denominator: den,
            points: used,
        }
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn slope_error(&self) -> f64 {
        self.slope_error
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn intercept_error(&self) -> f64 {
        self.intercept_error
    }

    /// Covariance of slope and intercept
    pub fn covariance(&self) -> f64 {
        self.covariance
    }

    /// Weighted sum of squared residuals of the contributing points
    pub fn chi2(&self) -> f64 {
        self.chi2
    }

    /// Degrees of freedom, `points - 2` for a valid fit
    pub fn ndof(&self) -> usize {
        self.ndof
    }

    /// `DEN` of the normal equations for a valid fit.
    ///
    /// A degenerate fit reports `min(DEN, 0)`: a positive `DEN` inside the
    /// tolerance reads as `0.0`, a negative one is kept as computed. A valid
    /// fit always reports a positive value.
    pub fn denominator(&self) -> f64 {
        self.denominator
    }

    /// Number of points that carried weight
    pub fn points(&self) -> usize {
        self.points
    }

    pub fn is_degenerate(&self) -> bool {
        self.denominator <= 0.0
    }

    /// Fitted lateral position at `z`
    pub fn x_at(&self, z: f64) -> f64 {
        self.slope * z + self.intercept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_recovers_collinear_points() {
        let points: Vec<FitPoint> = [0.0, 50.0, 100.0, 445.0, 495.0, 545.0]
            .iter()
            .map(|&z| FitPoint::new(z, 120.0 + 0.003 * z, 14.43))
            .collect();
        let fit = LineFit::from_points(&points);

        assert!(!fit.is_degenerate());
        assert_relative_eq!(fit.slope(), 0.003, epsilon = 1e-10);
        assert_relative_eq!(fit.intercept(), 120.0, epsilon = 1e-9);
        assert_relative_eq!(fit.chi2(), 0.0, epsilon = 1e-12);
        assert_eq!(fit.ndof(), 4);
        assert_eq!(fit.points(), 6);
    }

    #[test]
    fn test_two_points_define_line() {
        let fit = LineFit::from_points(&[FitPoint::new(0.0, 1.0, 1.0), FitPoint::new(10.0, 3.0, 1.0)]);
        assert_relative_eq!(fit.slope(), 0.2);
        assert_relative_eq!(fit.intercept(), 1.0);
        assert_eq!(fit.ndof(), 0);
        assert_relative_eq!(fit.x_at(5.0), 2.0);
    }

    #[test]
    fn test_closed_form_errors() {
        // Unit weights at z = 0, 1, 2: A = 3, B = 3, D = 5, DEN = 6
        let points = [
            FitPoint::new(0.0, 0.0, 1.0),
            FitPoint::new(1.0, 1.0, 1.0),
            FitPoint::new(2.0, 2.0, 1.0),
        ];
        let fit = LineFit::from_points(&points);
        assert_relative_eq!(fit.denominator(), 6.0);
        assert_relative_eq!(fit.slope_error(), (3.0f64 / 6.0).sqrt());
        assert_relative_eq!(fit.intercept_error(), (5.0f64 / 6.0).sqrt());
        assert_relative_eq!(fit.covariance(), -0.5);
    }

    #[test]
    fn test_weights_pull_toward_precise_points() {
        let points = [
            FitPoint::new(0.0, 0.0, 0.1),
            FitPoint::new(10.0, 0.0, 0.1),
            FitPoint::new(5.0, 10.0, 100.0),
        ];
        let fit = LineFit::from_points(&points);
        assert!(fit.x_at(5.0).abs() < 0.01);
        assert!(fit.chi2() > 0.0);
    }

    #[test]
    fn test_identical_z_is_degenerate() {
        let points = [
            FitPoint::new(50.0, 10.0, 14.43),
            FitPoint::new(50.0, 60.0, 14.43),
            FitPoint::new(50.0, 35.0, 2.0),
        ];
        let fit = LineFit::from_points(&points);
        assert!(fit.is_degenerate());
        assert!(fit.denominator() <= 0.0);
        assert_eq!(fit.slope(), 0.0);
        assert_eq!(fit.intercept(), 0.0);
        assert_eq!(fit.slope_error(), 0.0);
        assert_eq!(fit.intercept_error(), 0.0);
        assert_eq!(fit.covariance(), 0.0);
        assert_eq!(fit.points(), 3);
    }

    #[test]
    fn test_tiny_positive_denominator_reads_as_zero() {
        // Dyadic z values keep every sum exact: DEN = 2^-24 against D·B ≈ 4.2e6
        let points = [
            FitPoint::new(1024.0, 5.0, 1.0),
            FitPoint::new(1024.0 + 2f64.powi(-12), 7.0, 1.0),
        ];
        let fit = LineFit::from_points(&points);
        assert!(fit.is_degenerate());
        assert_eq!(fit.denominator(), 0.0);
        assert_eq!(fit.slope(), 0.0);
        assert_eq!(fit.intercept(), 0.0);
        assert_eq!(fit.points(), 2);
    }

    #[test]
    fn test_single_and_empty_are_degenerate() {
        assert!(LineFit::from_points(&[]).is_degenerate());
        assert!(LineFit::from_points(&[FitPoint::new(0.0, 1.0, 1.0)]).is_degenerate());
    }

    #[test]
    fn test_unusable_errors_skipped() {
        let points = [
            FitPoint::new(0.0, 0.0, 1.0),
            FitPoint::new(10.0, 10.0, 1.0),
            FitPoint::new(5.0, 1000.0, 0.0),
            FitPoint::new(7.0, -50.0, f64::NAN),
        ];
        let fit = LineFit::from_points(&points);
        assert_eq!(fit.points(), 2);
        assert_relative_eq!(fit.slope(), 1.0);
    }
}
