//! One simulated particle crossing the telescope.
//!
//! An event moves through three stages, each its own type:
//!
//! 1. [`Event`] holds the true trajectory.
//! 2. [`DigitizedEvent`] adds one measured point per plane.
//! 3. [`FittedEvent`] adds the straight-line fit over the unmasked planes and
//!    answers residual queries.
//!
//! Residuals can only be asked for once a fit exists, and a fit only once the
//! hits exist.

use crate::algo::line_fit::{FitPoint, LineFit};
use crate::hardware::plane::PixelHit;
use crate::hardware::telescope::{PlaneId, Telescope};
use crate::sims::random::RandomSource;
use crate::sims::trajectory::Trajectory;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EventError {
    #[error("Plane index {index} out of range for an event with {planes} planes")]
    PlaneOutOfRange { index: usize, planes: usize },

    #[error("Plane handle {index} belongs to a different telescope than the event")]
    ForeignPlane { index: usize },
}

/// Digitized measurement on one plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasuredPoint {
    pub hit: PixelHit,
    /// Measurement error of the plane (pixel width / sqrt(12))
    pub error: f64,
    pub z: f64,
    pub masked: bool,
}

impl MeasuredPoint {
    /// Point usable by the fit: unmasked and carrying a hit
    fn fit_point(&self) -> Option<FitPoint> {
        if self.masked {
            return None;
        }
        self.hit
            .position()
            .map(|x| FitPoint::new(self.z, x, self.error))
    }
}

/// A particle with a known true trajectory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    trajectory: Trajectory,
}

impl Event {
    pub fn new(trajectory: Trajectory) -> Self {
        Self { trajectory }
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Digitize the trajectory on every plane of `telescope`, in order.
    ///
    /// `rng` is only drawn from for planes with a non-zero resolution.
    pub fn digitize<'a, R: RandomSource + ?Sized>(
        self,
        telescope: &'a Telescope,
        rng: &mut R,
    ) -> DigitizedEvent<'a> {
        let mode = telescope.hit_requirement();
        let points = telescope
            .planes()
            .iter()
            .map(|plane| MeasuredPoint {
                hit: plane.digitize_with(plane.true_x_at(&self.trajectory), mode, rng),
                error: plane.pixel_error(),
                z: plane.z(),
                masked: plane.is_masked(),
            })
            .collect();

        DigitizedEvent {
            telescope,
            trajectory: self.trajectory,
            points,
        }
    }
}

/// An event with one measured point per telescope plane
#[derive(Debug, Clone)]
pub struct DigitizedEvent<'a> {
    telescope: &'a Telescope,
    trajectory: Trajectory,
    points: Vec<MeasuredPoint>,
}

impl<'a> DigitizedEvent<'a> {
    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn telescope(&self) -> &'a Telescope {
        self.telescope
    }

    /// Measured points in telescope order
    pub fn points(&self) -> &[MeasuredPoint] {
        &self.points
    }

    /// Index behind `id`, rejecting handles of other telescopes
    fn checked_index(&self, id: PlaneId) -> Result<usize, EventError> {
        if self.telescope.owns(id) {
            Ok(id.index())
        } else {
            Err(EventError::ForeignPlane { index: id.index() })
        }
    }

    /// Measured point on plane `id`
    pub fn point(&self, id: PlaneId) -> Result<&MeasuredPoint, EventError> {
        self.point_at(self.checked_index(id)?)
    }

    /// Measured point on the plane at position `index`
    pub fn point_at(&self, index: usize) -> Result<&MeasuredPoint, EventError> {
        self.points.get(index).ok_or(EventError::PlaneOutOfRange {
            index,
            planes: self.points.len(),
        })
    }

    /// True position on plane `id` relative to the center of its pixel 0
    pub fn truth_residual(&self, id: PlaneId) -> Result<f64, EventError> {
        self.truth_residual_at(self.checked_index(id)?)
    }

    pub fn truth_residual_at(&self, index: usize) -> Result<f64, EventError> {
        let plane = self
            .telescope
            .planes()
            .get(index)
            .ok_or(EventError::PlaneOutOfRange {
                index,
                planes: self.points.len(),
            })?;
        Ok(plane.true_x_at(&self.trajectory) - plane.reference_x())
    }

    /// Fit a straight line through the unmasked planes that registered a hit.
    pub fn fit(self) -> FittedEvent<'a> {
        let fit_points: Vec<FitPoint> = self
            .points
            .iter()
            .filter_map(MeasuredPoint::fit_point)
            .collect();
        let fit = LineFit::from_points(&fit_points);

        FittedEvent { event: self, fit }
    }
}

/// An event with its reconstructed trajectory
#[derive(Debug, Clone)]
pub struct FittedEvent<'a> {
    event: DigitizedEvent<'a>,
    fit: LineFit,
}

impl<'a> FittedEvent<'a> {
    pub fn fit(&self) -> &LineFit {
        &self.fit
    }

    pub fn trajectory(&self) -> &Trajectory {
        self.event.trajectory()
    }

    pub fn points(&self) -> &[MeasuredPoint] {
        self.event.points()
    }

    pub fn point(&self, id: PlaneId) -> Result<&MeasuredPoint, EventError> {
        self.event.point(id)
    }

    /// Digitized hit on plane `id` minus the fitted position at its z.
    ///
    /// Defined for masked planes as well. `None` when the plane registered
    /// no hit.
    pub fn residual(&self, id: PlaneId) -> Result<Option<f64>, EventError> {
        self.residual_at(self.event.checked_index(id)?)
    }

    pub fn residual_at(&self, index: usize) -> Result<Option<f64>, EventError> {
        let point = self.event.point_at(index)?;
        Ok(point.hit.position().map(|x| x - self.fit.x_at(point.z)))
    }

    pub fn truth_residual(&self, id: PlaneId) -> Result<f64, EventError> {
        self.event.truth_residual(id)
    }

    pub fn truth_residual_at(&self, index: usize) -> Result<f64, EventError> {
        self.event.truth_residual_at(index)
    }
}
