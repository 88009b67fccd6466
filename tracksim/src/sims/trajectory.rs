//! True particle trajectories and their sampling.

use crate::sims::random::RandomSource;
use std::ops::Range;

/// Straight-line particle trajectory `x(z) = x_truth + x_slope * z`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trajectory {
    /// Lateral intercept at z = 0
    pub x_truth: f64,
    /// Angular slope dx/dz
    pub x_slope: f64,
}

impl Trajectory {
    pub fn new(x_truth: f64, x_slope: f64) -> Self {
        Self { x_truth, x_slope }
    }

    /// Lateral position at longitudinal position `z`
    pub fn x_at(&self, z: f64) -> f64 {
        self.x_truth + self.x_slope * z
    }
}

/// Samples trajectories over a fiducial range with a Gaussian angular spread.
///
/// The intercept is uniform over `x_range`. The lateral spread at the last
/// plane is `z_max * tan(angular_sigma)`; dividing it back by `z_max` gives the
/// standard deviation of the sampled slope.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackGenerator {
    x_range: Range<f64>,
    angular_sigma_rad: f64,
    z_max: f64,
}

impl TrackGenerator {
    pub fn new(x_range: Range<f64>, angular_sigma_rad: f64, z_max: f64) -> Self {
        Self {
            x_range,
            angular_sigma_rad,
            z_max,
        }
    }

    /// Fiducial range of the sampled intercept
    pub fn x_range(&self) -> &Range<f64> {
        &self.x_range
    }

    /// Lateral spread at the furthest plane
    pub fn spread(&self) -> f64 {
        self.z_max * self.angular_sigma_rad.tan()
    }

    /// Standard deviation of the sampled slope
    pub fn slope_sigma(&self) -> f64 {
        if self.z_max > 0.0 {
            self.spread() / self.z_max
        } else {
            self.angular_sigma_rad.tan()
        }
    }

    /// Draw one trajectory
    pub fn sample<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Trajectory {
        let width = self.x_range.end - self.x_range.start;
        let x_truth = self.x_range.start + rng.uniform() * width;

        let sigma = self.slope_sigma();
        let x_slope = if sigma > 0.0 { rng.gaus(0.0, sigma) } else { 0.0 };

        Trajectory { x_truth, x_slope }
    }
}
