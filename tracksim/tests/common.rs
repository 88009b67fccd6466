//! Common utilities for tracksim integration tests

use tracksim::hardware::plane::{HitRequirement, Plane};
use tracksim::hardware::telescope::Telescope;
use tracksim::sims::tracking_run::RunParams;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Run parameters for a short serial run
pub fn quick_params(n_events: usize) -> RunParams {
    RunParams {
        n_events,
        parallel: false,
        ..RunParams::default()
    }
}

/// Two reference planes around a single-pixel DUT of the given pitch centered
/// on `center`
pub fn dut_between_pair(center: f64, pitch: f64, mode: HitRequirement) -> Telescope {
    let planes = vec![
        Plane::new("upstream", 0.0, 0.0, 50.0).unwrap(),
        Plane::new("dut", center - pitch / 2.0, 50.0, pitch)
            .unwrap()
            .single_pixel()
            .masked(),
        Plane::new("downstream", 0.0, 100.0, 50.0).unwrap(),
    ];
    Telescope::new("pair", planes, mode).unwrap()
}
