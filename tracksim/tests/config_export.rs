mod common;

use common::init_logging;
use tempfile::tempdir;
use test_helpers::artifact_dir;
use tracksim::algo::efficiency::EfficiencyEstimator;
use tracksim::config::SimulationConfig;
use tracksim::hardware::plane::HitRequirement;
use tracksim::io::histogram_export::{export_histograms, load_json, ExportFormat};
use tracksim::sims::tracking_run::TrackingRun;

fn small_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.run.n_events = 3_000;
    config.run.residual_bins = 200;
    config.efficiency.slide_bins = 20;
    config
}

#[test]
fn test_config_file_reproduces_run() {
    init_logging();

    let dir = tempdir().unwrap();
    let path = dir.path().join("simulation.json");
    let config = small_config();
    config.save_to_file(&path).unwrap();

    let loaded = SimulationConfig::load_from_file(&path).unwrap();
    let telescope_a = config.build_telescope().unwrap();
    let telescope_b = loaded.build_telescope().unwrap();

    let a = TrackingRun::new(&telescope_a, config.run.clone())
        .unwrap()
        .execute()
        .unwrap();
    let b = TrackingRun::new(&telescope_b, loaded.run.clone())
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(a.events, b.events);
    for (x, y) in a.planes.iter().zip(&b.planes) {
        assert_eq!(x.residual.contents(), y.residual.contents());
    }
}

#[test]
fn test_hit_requirement_from_config() {
    init_logging();

    let mut config = small_config();
    config.telescope.hit_requirement = HitRequirement::Geometric;
    let telescope = config.build_telescope().unwrap();
    assert_eq!(telescope.hit_requirement(), HitRequirement::Geometric);

    let result = TrackingRun::new(&telescope, config.run.clone())
        .unwrap()
        .execute()
        .unwrap();
    assert_eq!(result.plane_by_name("dut").unwrap().misses, 0);
}

#[test]
fn test_exported_histograms_reload() {
    init_logging();

    let config = small_config();
    let telescope = config.build_telescope().unwrap();
    let result = TrackingRun::new(&telescope, config.run.clone())
        .unwrap()
        .execute()
        .unwrap();

    let dut_id = config.efficiency.dut_id(&telescope).unwrap();
    let pixel_width = telescope.plane(dut_id).unwrap().pixel_width();
    let report = EfficiencyEstimator::new(config.efficiency.params(pixel_width))
        .unwrap()
        .estimate_plane(result.plane(dut_id).unwrap(), config.efficiency.numerator)
        .unwrap();

    let mut histograms = result.histograms();
    histograms.push(&report.curve.curve);

    let dir = tempdir().unwrap();
    let path = export_histograms(&histograms, dir.path(), "run", ExportFormat::Json).unwrap();
    let loaded = load_json(&path).unwrap();

    assert_eq!(loaded.len(), histograms.len());
    for (written, reloaded) in histograms.iter().zip(&loaded) {
        assert_eq!(written.name(), reloaded.name());
        assert_eq!(written.contents(), reloaded.contents());
        assert_eq!(written.entries(), reloaded.entries());
    }

    let artifacts = artifact_dir("config_export").unwrap();
    let csv = export_histograms(&histograms, &artifacts, "run", ExportFormat::Csv).unwrap();
    let rows = std::fs::read_to_string(csv).unwrap().lines().count();
    assert_eq!(rows, 1 + histograms.len() * 200);
}
