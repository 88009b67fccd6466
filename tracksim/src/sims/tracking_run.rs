//! Simulation loop driving events through a telescope.
//!
//! Events are generated in fixed-size chunks. The master seed drives a
//! generator that hands out one seed per chunk; chunk `k` draws all of its
//! randomness from its own seed and fills its own set of histograms, which
//! are summed bin by bin at the end. The chunk layout only depends on the
//! event count, so a serial run and a parallel run with any number of
//! threads produce identical histograms.

use crate::hardware::telescope::{PlaneId, Telescope};
use crate::sims::event::{Event, EventError};
use crate::sims::trajectory::TrackGenerator;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use viz::histogram::Histogram;
use viz::VizError;

/// Number of events simulated from one seeded generator
pub const EVENTS_PER_CHUNK: usize = 4096;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid run parameters: {0}")]
    InvalidParams(String),

    #[error("Histogram error: {0}")]
    Histogram(#[from] VizError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),
}

/// Parameters of one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParams {
    /// Number of simulated particles
    pub n_events: usize,
    /// Master seed from which every chunk seed is drawn
    pub seed: u64,
    /// Lower edge of the fiducial intercept range
    pub x_min: f64,
    /// Upper edge (exclusive) of the fiducial intercept range
    pub x_max: f64,
    /// One-sigma angular spread of the beam in radians
    pub angular_sigma_rad: f64,
    /// Bins of every residual histogram
    pub residual_bins: usize,
    /// Residual histogram half range in units of the plane's pixel width
    pub half_range_pixels: f64,
    /// Distribute chunks over the rayon thread pool
    pub parallel: bool,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            n_events: 40_000,
            seed: 5,
            x_min: 75.0,
            x_max: 525.0,
            angular_sigma_rad: 0.0,
            residual_bins: 1000,
            half_range_pixels: 2.0,
            parallel: true,
        }
    }
}

impl RunParams {
    pub fn validate(&self) -> Result<(), RunError> {
        if !self.x_min.is_finite() || !self.x_max.is_finite() || self.x_min >= self.x_max {
            return Err(RunError::InvalidParams(format!(
                "fiducial range [{}, {}) must be finite and ascending",
                self.x_min, self.x_max
            )));
        }
        if !self.angular_sigma_rad.is_finite() || self.angular_sigma_rad < 0.0 {
            return Err(RunError::InvalidParams(format!(
                "angular sigma must be non-negative, got {}",
                self.angular_sigma_rad
            )));
        }
        if self.residual_bins == 0 {
            return Err(RunError::InvalidParams(
                "residual histograms need at least one bin".to_string(),
            ));
        }
        if !self.half_range_pixels.is_finite() || self.half_range_pixels <= 0.0 {
            return Err(RunError::InvalidParams(format!(
                "half range must be positive, got {}",
                self.half_range_pixels
            )));
        }
        Ok(())
    }

    /// Number of chunks the events are split into
    pub fn chunk_count(&self) -> usize {
        self.n_events.div_ceil(EVENTS_PER_CHUNK)
    }

    /// One generator seed per chunk, drawn in chunk order from the master seed.
    ///
    /// Chunk `k` of every run with the same master seed gets the same seed,
    /// whatever the total event count.
    pub fn chunk_seeds(&self) -> Vec<u64> {
        let mut master = StdRng::seed_from_u64(self.seed);
        (0..self.chunk_count()).map(|_| master.gen()).collect()
    }
}

/// Histograms and counters accumulated for one plane
#[derive(Debug, Clone)]
pub struct PlaneHistograms {
    pub plane: PlaneId,
    pub plane_name: String,
    /// Hit minus fitted position, for events where the plane registered a hit
    pub residual: Histogram,
    /// True position minus pixel-0 center, every event; masked planes only
    pub truth_residual: Option<Histogram>,
    /// True position minus pixel-0 center, events with a hit; masked planes only
    pub truth_hit_residual: Option<Histogram>,
    pub hits: u64,
    pub misses: u64,
}

impl PlaneHistograms {
    fn new(plane: PlaneId, telescope: &Telescope, params: &RunParams) -> Result<Self, RunError> {
        let p = telescope.plane(plane).map_err(|e| {
            RunError::InvalidParams(format!("telescope lookup failed: {e}"))
        })?;
        let half = params.half_range_pixels * p.pixel_width();
        let residual = Histogram::new(
            format!("residual_{}", p.name()),
            params.residual_bins,
            -half,
            half,
        )?;

        let (truth_residual, truth_hit_residual) = if p.is_masked() {
            (
                Some(residual.empty_like(format!("truth_residual_{}", p.name()))),
                Some(residual.empty_like(format!("truth_hit_residual_{}", p.name()))),
            )
        } else {
            (None, None)
        };

        Ok(Self {
            plane,
            plane_name: p.name().to_string(),
            residual,
            truth_residual,
            truth_hit_residual,
            hits: 0,
            misses: 0,
        })
    }

    /// Fraction of fitted events in which the plane registered a hit
    pub fn hit_fraction(&self) -> Option<f64> {
        let total = self.hits + self.misses;
        if total == 0 {
            None
        } else {
            Some(self.hits as f64 / total as f64)
        }
    }

    fn merge(&mut self, other: &PlaneHistograms) -> Result<(), RunError> {
        self.residual.merge(&other.residual)?;
        merge_optional(&mut self.truth_residual, &other.truth_residual)?;
        merge_optional(&mut self.truth_hit_residual, &other.truth_hit_residual)?;
        self.hits += other.hits;
        self.misses += other.misses;
        Ok(())
    }
}

fn merge_optional(dst: &mut Option<Histogram>, src: &Option<Histogram>) -> Result<(), RunError> {
    match (dst, src) {
        (Some(d), Some(s)) => d.merge(s)?,
        (None, None) => {}
        _ => {
            return Err(RunError::InvalidParams(
                "cannot merge results of different telescopes".to_string(),
            ))
        }
    }
    Ok(())
}

/// Accumulated output of a run
#[derive(Debug, Clone)]
pub struct RunResult {
    /// One entry per telescope plane, in telescope order
    pub planes: Vec<PlaneHistograms>,
    /// Simulated events, including degenerate ones
    pub events: u64,
    /// Events whose fit was degenerate and therefore not histogrammed
    pub degenerate_fits: u64,
}

impl RunResult {
    /// Empty result with the histogram layout of `telescope`
    pub fn empty(telescope: &Telescope, params: &RunParams) -> Result<Self, RunError> {
        let planes = telescope
            .ids()
            .map(|id| PlaneHistograms::new(id, telescope, params))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            planes,
            events: 0,
            degenerate_fits: 0,
        })
    }

    /// Histograms of plane `id`; `None` for handles of another telescope
    pub fn plane(&self, id: PlaneId) -> Option<&PlaneHistograms> {
        self.planes.get(id.index()).filter(|p| p.plane == id)
    }

    pub fn plane_by_name(&self, name: &str) -> Option<&PlaneHistograms> {
        self.planes.iter().find(|p| p.plane_name == name)
    }

    /// Events that produced a valid fit
    pub fn fitted_events(&self) -> u64 {
        self.events - self.degenerate_fits
    }

    /// Sum another result into this one
    pub fn merge(&mut self, other: &RunResult) -> Result<(), RunError> {
        if self.planes.len() != other.planes.len() {
            return Err(RunError::InvalidParams(format!(
                "cannot merge results with {} and {} planes",
                self.planes.len(),
                other.planes.len()
            )));
        }
        for (dst, src) in self.planes.iter_mut().zip(&other.planes) {
            dst.merge(src)?;
        }
        self.events += other.events;
        self.degenerate_fits += other.degenerate_fits;
        Ok(())
    }

    /// All histograms of the run, in plane order
    pub fn histograms(&self) -> Vec<&Histogram> {
        let mut out = Vec::new();
        for plane in &self.planes {
            out.push(&plane.residual);
            out.extend(plane.truth_residual.as_ref());
            out.extend(plane.truth_hit_residual.as_ref());
        }
        out
    }
}

/// A configured simulation over a fixed telescope
#[derive(Debug, Clone)]
pub struct TrackingRun<'a> {
    telescope: &'a Telescope,
    params: RunParams,
    generator: TrackGenerator,
}

impl<'a> TrackingRun<'a> {
    pub fn new(telescope: &'a Telescope, params: RunParams) -> Result<Self, RunError> {
        params.validate()?;
        let generator = TrackGenerator::new(
            params.x_min..params.x_max,
            params.angular_sigma_rad,
            telescope.z_max(),
        );
        Ok(Self {
            telescope,
            params,
            generator,
        })
    }

    pub fn params(&self) -> &RunParams {
        &self.params
    }

    pub fn telescope(&self) -> &'a Telescope {
        self.telescope
    }

    pub fn execute(&self) -> Result<RunResult, RunError> {
        self.execute_with_progress(|_| {})
    }

    /// Run all events, calling `progress` with the event count of every
    /// finished chunk.
    pub fn execute_with_progress<F>(&self, progress: F) -> Result<RunResult, RunError>
    where
        F: Fn(usize) + Sync + Send,
    {
        let template = RunResult::empty(self.telescope, &self.params)?;
        let chunks = self.params.chunk_count();

        log::debug!(
            "Simulating {} events in {} chunks of up to {} ({})",
            self.params.n_events,
            chunks,
            EVENTS_PER_CHUNK,
            if self.params.parallel { "parallel" } else { "serial" }
        );

        let seeds = self.params.chunk_seeds();
        let run_chunk = |chunk_idx: usize| -> Result<RunResult, RunError> {
            let mut result = template.clone();
            let count = self.chunk_events(chunk_idx);
            self.simulate_chunk(seeds[chunk_idx], count, &mut result)?;
            progress(count);
            Ok(result)
        };

        let result = if self.params.parallel {
            (0..chunks).into_par_iter().map(run_chunk).try_reduce(
                || template.clone(),
                |mut acc, chunk| {
                    acc.merge(&chunk)?;
                    Ok(acc)
                },
            )?
        } else {
            (0..chunks).try_fold(template.clone(), |mut acc, chunk_idx| {
                acc.merge(&run_chunk(chunk_idx)?)?;
                Ok::<_, RunError>(acc)
            })?
        };

        if result.degenerate_fits > 0 {
            log::warn!(
                "{} of {} events had a degenerate fit and were skipped",
                result.degenerate_fits,
                result.events
            );
        }

        Ok(result)
    }

    fn chunk_events(&self, chunk_idx: usize) -> usize {
        let start = chunk_idx * EVENTS_PER_CHUNK;
        EVENTS_PER_CHUNK.min(self.params.n_events.saturating_sub(start))
    }

    fn simulate_chunk(
        &self,
        chunk_seed: u64,
        count: usize,
        result: &mut RunResult,
    ) -> Result<(), RunError> {
        let mut rng = StdRng::seed_from_u64(chunk_seed);

        for _ in 0..count {
            let trajectory = self.generator.sample(&mut rng);
            let fitted = Event::new(trajectory)
                .digitize(self.telescope, &mut rng)
                .fit();
            result.events += 1;

            if fitted.fit().is_degenerate() {
                result.degenerate_fits += 1;
                continue;
            }

            for slot in result.planes.iter_mut() {
                let residual = fitted.residual(slot.plane)?;
                match residual {
                    Some(r) => {
                        slot.residual.add(r);
                        slot.hits += 1;
                    }
                    None => slot.misses += 1,
                }

                if let Some(truth) = slot.truth_residual.as_mut() {
                    let t = fitted.truth_residual(slot.plane)?;
                    truth.add(t);
                    if residual.is_some() {
                        if let Some(truth_hit) = slot.truth_hit_residual.as_mut() {
                            truth_hit.add(t);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
