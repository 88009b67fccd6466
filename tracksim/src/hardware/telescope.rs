//! Telescope: the ordered set of planes a run is simulated against.
//!
//! Planes keep their insertion order, which must match their physical order
//! along the beam. Each plane is addressed by a [`PlaneId`] issued by the
//! telescope; plain indices are only a derived lookup. The telescope also
//! carries the [`HitRequirement`] that governs single-pixel digitization.
//!
//! # Examples
//!
//! ```rust
//! use tracksim::hardware::plane::{HitRequirement, Plane};
//! use tracksim::hardware::telescope::Telescope;
//!
//! let planes = vec![
//!     Plane::new("ref0", 0.0, 0.0, 50.0)?,
//!     Plane::new("dut", 283.5, 50.0, 33.0)?.single_pixel().masked(),
//!     Plane::new("ref1", 0.0, 100.0, 50.0)?,
//! ];
//! let telescope = Telescope::new("demo", planes, HitRequirement::RequireHit)?;
//!
//! let dut = telescope.plane_id("dut")?;
//! assert_eq!(dut.index(), 1);
//! assert_eq!(telescope.z_max(), 100.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::hardware::plane::{HitRequirement, Plane, PlaneConfig, PlaneError};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Errors raised while assembling or querying a telescope
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TelescopeError {
    #[error("Telescope must contain at least one plane")]
    Empty,

    #[error("Duplicate plane name '{0}'")]
    DuplicateName(String),

    #[error("No plane named '{0}'")]
    UnknownPlane(String),

    #[error("Plane index {index} out of range for {planes} planes")]
    IndexOutOfRange { index: usize, planes: usize },

    #[error("Plane handle {index} belongs to a different telescope")]
    ForeignPlane { index: usize },

    #[error("Invalid plane '{name}': {source}")]
    Plane {
        name: String,
        #[source]
        source: PlaneError,
    },
}

static NEXT_LAYOUT: AtomicU64 = AtomicU64::new(0);

/// Stable handle to a plane of a telescope.
///
/// Handles are only issued by [`Telescope`] and carry the layout they were
/// issued for. Clones and offset copies keep the layout; any other telescope
/// rejects the handle, even one with identical geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaneId {
    layout: u64,
    index: usize,
}

impl PlaneId {
    /// Position of the plane along the beam
    pub fn index(self) -> usize {
        self.index
    }
}

/// Serializable telescope descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelescopeConfig {
    pub name: String,
    #[serde(default)]
    pub hit_requirement: HitRequirement,
    pub planes: Vec<PlaneConfig>,
}

/// Fixed detector geometry for a run
#[derive(Debug, Clone)]
pub struct Telescope {
    name: String,
    planes: Vec<Plane>,
    hit_requirement: HitRequirement,
    layout: u64,
}

impl PartialEq for Telescope {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.planes == other.planes
            && self.hit_requirement == other.hit_requirement
    }
}

impl Telescope {
    /// Assemble a telescope from planes in beam order.
    pub fn new(
        name: impl Into<String>,
        planes: Vec<Plane>,
        hit_requirement: HitRequirement,
    ) -> Result<Self, TelescopeError> {
        if planes.is_empty() {
            return Err(TelescopeError::Empty);
        }

        let mut seen = HashSet::new();
        for plane in &planes {
            if !seen.insert(plane.name()) {
                return Err(TelescopeError::DuplicateName(plane.name().to_string()));
            }
        }

        Ok(Self {
            name: name.into(),
            planes,
            hit_requirement,
            layout: NEXT_LAYOUT.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// Build a telescope from its descriptor.
    pub fn from_config(config: &TelescopeConfig) -> Result<Self, TelescopeError> {
        let planes = config
            .planes
            .iter()
            .map(|p| {
                Plane::from_config(p).map_err(|source| TelescopeError::Plane {
                    name: p.name.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(config.name.clone(), planes, config.hit_requirement)
    }

    /// Descriptor reproducing this telescope
    pub fn to_config(&self) -> TelescopeConfig {
        TelescopeConfig {
            name: self.name.clone(),
            hit_requirement: self.hit_requirement,
            planes: self.planes.iter().map(Plane::to_config).collect(),
        }
    }

    /// Copy with plane `id` moved to lateral offset `x`
    pub fn with_plane_offset(&self, id: PlaneId, x: f64) -> Result<Self, TelescopeError> {
        let plane = self.plane(id)?;
        let moved = plane.with_offset(x).map_err(|source| TelescopeError::Plane {
            name: plane.name().to_string(),
            source,
        })?;

        let mut telescope = self.clone();
        telescope.planes[id.index] = moved;
        Ok(telescope)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hit_requirement(&self) -> HitRequirement {
        self.hit_requirement
    }

    /// Planes in beam order
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    /// Always false; a telescope holds at least one plane
    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    /// Whether `id` was issued by this telescope or one of its copies
    pub fn owns(&self, id: PlaneId) -> bool {
        id.layout == self.layout && id.index < self.planes.len()
    }

    /// Plane behind a handle
    pub fn plane(&self, id: PlaneId) -> Result<&Plane, TelescopeError> {
        if id.layout != self.layout {
            return Err(TelescopeError::ForeignPlane { index: id.index });
        }
        self.planes
            .get(id.index)
            .ok_or(TelescopeError::IndexOutOfRange {
                index: id.index,
                planes: self.planes.len(),
            })
    }

    fn id(&self, index: usize) -> PlaneId {
        PlaneId {
            layout: self.layout,
            index,
        }
    }

    /// Handle of the plane called `name`
    pub fn plane_id(&self, name: &str) -> Result<PlaneId, TelescopeError> {
        self.planes
            .iter()
            .position(|p| p.name() == name)
            .map(|index| self.id(index))
            .ok_or_else(|| TelescopeError::UnknownPlane(name.to_string()))
    }

    /// Handles of all planes in beam order
    pub fn ids(&self) -> impl Iterator<Item = PlaneId> + '_ {
        (0..self.planes.len()).map(|index| self.id(index))
    }

    /// Handles and planes in beam order
    pub fn iter(&self) -> impl Iterator<Item = (PlaneId, &Plane)> + '_ {
        self.planes
            .iter()
            .enumerate()
            .map(|(i, p)| (self.id(i), p))
    }

    /// Planes excluded from the fit
    pub fn masked_planes(&self) -> impl Iterator<Item = (PlaneId, &Plane)> + '_ {
        self.iter().filter(|(_, p)| p.is_masked())
    }

    /// First masked single-pixel plane that applies the miss policy
    pub fn default_dut(&self) -> Option<PlaneId> {
        self.masked_planes()
            .find(|(_, p)| p.is_single_pixel() && !p.is_all_hits())
            .map(|(id, _)| id)
    }

    /// Number of planes that take part in the fit
    pub fn fit_plane_count(&self) -> usize {
        self.planes.iter().filter(|p| !p.is_masked()).count()
    }

    /// Largest plane z
    pub fn z_max(&self) -> f64 {
        self.planes
            .iter()
            .map(Plane::z)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Predefined telescope geometries.
///
/// Distances and pitches are in micrometers on a common lateral axis; the
/// fiducial beam range used with these models is `[75, 525)`.
pub mod models {
    use super::*;

    fn build(name: &str, planes: Vec<PlaneConfig>) -> Telescope {
        Telescope::from_config(&TelescopeConfig {
            name: name.to_string(),
            hit_requirement: HitRequirement::RequireHit,
            planes,
        })
        .expect("predefined telescope geometry is valid")
    }

    fn reference(name: &str, offset: f64, z: f64, pixel_width: f64) -> PlaneConfig {
        PlaneConfig {
            name: name.to_string(),
            offset,
            z,
            pixel_width,
            masked: false,
            pixel_count: crate::hardware::plane::DEFAULT_PIXEL_COUNT,
            all_hits: false,
            resolution: 0.0,
        }
    }

    fn dut(name: &str, center: f64, z: f64, pixel_width: f64, all_hits: bool) -> PlaneConfig {
        PlaneConfig {
            name: name.to_string(),
            offset: center - pixel_width / 2.0,
            z,
            pixel_width,
            masked: true,
            pixel_count: 1,
            all_hits,
            resolution: 0.0,
        }
    }

    /// Three aligned 50 µm planes at z = 0, 50, 100
    pub static THREE_PLANE: Lazy<Telescope> = Lazy::new(|| {
        build(
            "Three plane",
            vec![
                reference("plane0", 0.0, 0.0, 50.0),
                reference("plane1", 0.0, 50.0, 50.0),
                reference("plane2", 0.0, 100.0, 50.0),
            ],
        )
    });

    /// Six planes alternating 250 µm and 50 µm pitch in two arms, with the
    /// misalignments of the reference beam test setup
    pub static MIXED_SIX_PLANE: Lazy<Telescope> = Lazy::new(|| {
        build(
            "Mixed six plane",
            vec![
                reference("plane0", 0.0, 0.0, 250.0),
                reference("plane1", 0.0, 50.0, 50.0),
                reference("plane2", 15.0, 100.0, 250.0),
                reference("plane3", 0.0, 445.0, 50.0),
                reference("plane4", -4.5, 495.0, 250.0),
                reference("plane5", 10.0, 545.0, 50.0),
            ],
        )
    });

    /// Six aligned 50 µm reference planes with a 33 µm single-pixel DUT
    /// between the arms, plus an all-hits twin of the DUT for the reference
    /// distribution
    pub static DUT_SIX_PLANE: Lazy<Telescope> = Lazy::new(|| {
        build(
            "DUT six plane",
            vec![
                reference("plane0", 0.0, 0.0, 50.0),
                reference("plane1", 0.0, 50.0, 50.0),
                reference("plane2", 0.0, 100.0, 50.0),
                dut("dut", 300.0, 272.5, 33.0, false),
                dut("dut_all", 300.0, 272.5, 33.0, true),
                reference("plane3", 0.0, 445.0, 50.0),
                reference("plane4", 0.0, 495.0, 50.0),
                reference("plane5", 0.0, 545.0, 50.0),
            ],
        )
    });
}
