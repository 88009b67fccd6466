//! Detector plane geometry and pixel digitization.
//!
//! A plane sits at longitudinal position `z` with lateral alignment offset
//! `x` and reads out pixels of width `pixel_width`. Pixel `n` spans
//! `[x + n * pixel_width, x + (n + 1) * pixel_width)` and is reported at its
//! center. The measurement error of a binary pixel is the standard deviation
//! of a uniform distribution over its width, `pixel_width / sqrt(12)`.
//!
//! Single-pixel planes model the DUT. With [`HitRequirement::RequireHit`]
//! they either see the particle inside their footprint or report
//! [`PixelHit::NoHit`]. An `all_hits` plane always reports its nominal pixel,
//! which is how the "a hit would have been there" reference is built.

use crate::sims::random::RandomSource;
use crate::sims::trajectory::Trajectory;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failures for plane descriptors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlaneError {
    #[error("Pixel width must be positive and finite, got {0}")]
    InvalidPixelWidth(f64),

    #[error("Plane must span at least one pixel")]
    NoPixels,

    #[error("Resolution must be non-negative and finite, got {0}")]
    InvalidResolution(f64),

    #[error("Plane position must be finite (x = {x}, z = {z})")]
    NonFinitePosition { x: f64, z: f64 },
}

/// How single-pixel planes treat particles outside their footprint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum HitRequirement {
    /// Outside the footprint the pixel registers nothing
    #[default]
    RequireHit,
    /// Report the geometric pixel index like any other plane
    Geometric,
}

/// Outcome of digitizing one true position on one plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PixelHit {
    /// Pixel `index` fired; `x` is its center
    Hit { index: i64, x: f64 },
    /// The plane registered nothing
    NoHit,
}

impl PixelHit {
    /// Reported position, `None` for a miss
    pub fn position(&self) -> Option<f64> {
        match self {
            PixelHit::Hit { x, .. } => Some(*x),
            PixelHit::NoHit => None,
        }
    }

    /// Fired pixel index, `None` for a miss
    pub fn index(&self) -> Option<i64> {
        match self {
            PixelHit::Hit { index, .. } => Some(*index),
            PixelHit::NoHit => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, PixelHit::Hit { .. })
    }
}

/// Serializable plane descriptor, as found in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaneConfig {
    /// Unique plane name within a telescope
    pub name: String,
    /// Lateral alignment offset
    pub offset: f64,
    /// Longitudinal position
    pub z: f64,
    /// Pixel pitch along x
    pub pixel_width: f64,
    /// Excluded from the trajectory fit
    #[serde(default)]
    pub masked: bool,
    /// Number of pixels; 1 models a single-pixel DUT
    #[serde(default = "default_pixel_count")]
    pub pixel_count: u32,
    /// Always report the nominal pixel on a single-pixel plane
    #[serde(default)]
    pub all_hits: bool,
    /// Gaussian smearing of the true position before quantization
    #[serde(default)]
    pub resolution: f64,
}

fn default_pixel_count() -> u32 {
    DEFAULT_PIXEL_COUNT
}

/// Pixel count of a reference plane when none is given
pub const DEFAULT_PIXEL_COUNT: u32 = 12;

/// One detector layer. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    name: String,
    x: f64,
    z: f64,
    pixel_width: f64,
    pixel_count: u32,
    masked: bool,
    all_hits: bool,
    resolution: f64,
}

impl Plane {
    /// Create an unmasked multi-pixel reference plane.
    pub fn new(name: impl Into<String>, x: f64, z: f64, pixel_width: f64) -> Result<Self, PlaneError> {
        if !x.is_finite() || !z.is_finite() {
            return Err(PlaneError::NonFinitePosition { x, z });
        }
        if !pixel_width.is_finite() || pixel_width <= 0.0 {
            return Err(PlaneError::InvalidPixelWidth(pixel_width));
        }

        Ok(Self {
            name: name.into(),
            x,
            z,
            pixel_width,
            pixel_count: DEFAULT_PIXEL_COUNT,
            masked: false,
            all_hits: false,
            resolution: 0.0,
        })
    }

    /// Build a plane from its descriptor, validating every field.
    pub fn from_config(config: &PlaneConfig) -> Result<Self, PlaneError> {
        let mut plane = Self::new(
            config.name.clone(),
            config.offset,
            config.z,
            config.pixel_width,
        )?
        .with_pixel_count(config.pixel_count)?
        .with_resolution(config.resolution)?;
        plane.masked = config.masked;
        plane.all_hits = config.all_hits;
        Ok(plane)
    }

    /// Descriptor reproducing this plane
    pub fn to_config(&self) -> PlaneConfig {
        PlaneConfig {
            name: self.name.clone(),
            offset: self.x,
            z: self.z,
            pixel_width: self.pixel_width,
            masked: self.masked,
            pixel_count: self.pixel_count,
            all_hits: self.all_hits,
            resolution: self.resolution,
        }
    }

    /// Exclude the plane from the trajectory fit
    pub fn masked(mut self) -> Self {
        self.masked = true;
        self
    }

    /// Turn the plane into a single-pixel DUT
    pub fn single_pixel(mut self) -> Self {
        self.pixel_count = 1;
        self
    }

    /// Report the nominal pixel regardless of the particle position
    pub fn with_all_hits(mut self) -> Self {
        self.all_hits = true;
        self
    }

    pub fn with_pixel_count(mut self, pixel_count: u32) -> Result<Self, PlaneError> {
        if pixel_count == 0 {
            return Err(PlaneError::NoPixels);
        }
        self.pixel_count = pixel_count;
        Ok(self)
    }

    pub fn with_resolution(mut self, resolution: f64) -> Result<Self, PlaneError> {
        if !resolution.is_finite() || resolution < 0.0 {
            return Err(PlaneError::InvalidResolution(resolution));
        }
        self.resolution = resolution;
        Ok(self)
    }

    /// Copy of the plane moved to a new lateral offset
    pub fn with_offset(&self, x: f64) -> Result<Self, PlaneError> {
        if !x.is_finite() {
            return Err(PlaneError::NonFinitePosition { x, z: self.z });
        }
        Ok(Self { x, ..self.clone() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lateral alignment offset
    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn pixel_width(&self) -> f64 {
        self.pixel_width
    }

    /// Uniform-distribution standard deviation of a binary pixel
    pub fn pixel_error(&self) -> f64 {
        self.pixel_width / 12.0f64.sqrt()
    }

    pub fn pixel_count(&self) -> u32 {
        self.pixel_count
    }

    pub fn is_masked(&self) -> bool {
        self.masked
    }

    pub fn is_all_hits(&self) -> bool {
        self.all_hits
    }

    pub fn is_single_pixel(&self) -> bool {
        self.pixel_count == 1
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Center of pixel 0, the reference for truth residuals
    pub fn reference_x(&self) -> f64 {
        self.x + self.pixel_width / 2.0
    }

    /// Center of pixel `index`
    pub fn pixel_center(&self, index: i64) -> f64 {
        index as f64 * self.pixel_width + self.reference_x()
    }

    /// Index of the pixel containing `true_x`
    pub fn pixel_index(&self, true_x: f64) -> i64 {
        ((true_x - self.reference_x()) / self.pixel_width).round() as i64
    }

    /// True trajectory position at this plane's z
    pub fn true_x_at(&self, trajectory: &Trajectory) -> f64 {
        trajectory.x_at(self.z)
    }

    /// Quantize a true position to a pixel response.
    pub fn digitize(&self, true_x: f64, mode: HitRequirement) -> PixelHit {
        let index = self.pixel_index(true_x);

        if self.is_single_pixel() {
            if self.all_hits {
                return self.hit(0);
            }
            if mode == HitRequirement::RequireHit && index != 0 {
                return PixelHit::NoHit;
            }
        }

        self.hit(index)
    }

    /// Smear by the plane resolution, then quantize.
    pub fn digitize_with<R: RandomSource + ?Sized>(
        &self,
        true_x: f64,
        mode: HitRequirement,
        rng: &mut R,
    ) -> PixelHit {
        let measured = if self.resolution > 0.0 {
            rng.gaus(true_x, self.resolution)
        } else {
            true_x
        };
        self.digitize(measured, mode)
    }

    fn hit(&self, index: i64) -> PixelHit {
        PixelHit::Hit {
            index,
            x: self.pixel_center(index),
        }
    }
}
