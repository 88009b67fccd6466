//! Hardware module for plane and telescope configurations

pub mod plane;
pub mod telescope;

pub use plane::{HitRequirement, PixelHit, Plane, PlaneConfig};
pub use telescope::{PlaneId, Telescope, TelescopeConfig};
