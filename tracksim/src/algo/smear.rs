//! Smeared box study
//!
//! A single-pixel DUT seen by a perfect telescope responds as a box of the
//! pixel width. A finite track resolution smears the box edges, so the
//! efficiency measured in a window of a given central fraction drops below
//! one as the window approaches the edges. This study measures that drop for
//! a given resolution and is used to choose the central window fraction of the
//! efficiency estimator.

use crate::sims::random::RandomSource;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use viz::histogram::Histogram;

/// Parameters of the smeared box study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmearBoxParams {
    pub n_events: usize,
    /// Gaussian sigma added to every true position
    pub resolution: f64,
    /// Half width of the box
    pub half_width: f64,
    /// Histogram bins over `[-2 * half_width, 2 * half_width)`
    pub bins: usize,
    pub seed: u64,
}

impl Default for SmearBoxParams {
    fn default() -> Self {
        Self {
            n_events: 1_000_000,
            resolution: 8.5,
            half_width: 25.0,
            bins: 100,
            seed: 5,
        }
    }
}

/// Filled box and smeared distributions
#[derive(Debug, Clone)]
pub struct SmearBoxStudy {
    pub params: SmearBoxParams,
    pub box_hist: Histogram,
    pub smeared: Histogram,
}

impl SmearBoxStudy {
    /// Fill both distributions.
    ///
    /// Each event fills the rounded true position into the box histogram and
    /// the rounded smeared position into the smeared histogram, weighted so
    /// the box height is about one entry per unit of position.
    pub fn run(params: SmearBoxParams) -> viz::Result<Self> {
        let range = 2.0 * params.half_width;
        let mut box_hist = Histogram::new("box", params.bins, -range, range)?;
        let mut smeared = box_hist.empty_like("smear");

        let weight = if params.n_events > 0 {
            range / params.n_events as f64
        } else {
            0.0
        };
        let mut rng = StdRng::seed_from_u64(params.seed);

        for _ in 0..params.n_events {
            let a = rng.uniform() * range - params.half_width;
            box_hist.fill(a.round(), weight);
            let smeared_a = rng.gaus(a, params.resolution);
            smeared.fill(smeared_a.round(), weight);
        }

        log::debug!(
            "Smeared box: {} events, resolution {}",
            params.n_events,
            params.resolution
        );

        Ok(Self {
            params,
            box_hist,
            smeared,
        })
    }

    /// Smeared over box integral in the window covering `fraction` of the box.
    ///
    /// `None` when the window is empty or has no box content.
    pub fn central_efficiency(&self, fraction: f64) -> Option<f64> {
        let half = fraction * self.params.half_width;
        let low = self.box_hist.find_bin(-half)? as isize;
        let high = self.box_hist.find_bin(half)? as isize;

        let denominator = self.box_hist.integral(low, high);
        (denominator > 0.0).then(|| self.smeared.integral(low, high) / denominator)
    }
}
