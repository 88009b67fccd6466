//! Simulation of particles crossing the telescope

pub mod event;
pub mod random;
pub mod tracking_run;
pub mod trajectory;

pub use event::{DigitizedEvent, Event, EventError, FittedEvent, MeasuredPoint};
pub use random::RandomSource;
pub use tracking_run::{PlaneHistograms, RunError, RunParams, RunResult, TrackingRun};
pub use trajectory::{TrackGenerator, Trajectory};
