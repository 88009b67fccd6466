//! Simulate a telescope run and estimate the DUT efficiency
//!
//! Particles are generated over the fiducial range, digitized on every plane,
//! refitted from the unmasked planes and histogrammed per plane. The masked
//! DUT's truth and hit distributions are then turned into a sliding-window
//! efficiency curve.
//!
//! Usage:
//! ```
//! cargo run --release --bin dut_efficiency -- --events 100000 --plot
//! ```

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracksim::algo::efficiency::{EfficiencyEstimator, NumeratorSource};
use tracksim::io::efficiency_plot::{plot_efficiency, EfficiencyPlotConfig};
use tracksim::io::histogram_export::{export_histograms, ExportFormat};
use tracksim::shared_args::SharedSimulationArgs;
use tracksim::sims::tracking_run::TrackingRun;
use viz::histogram::{HistogramConfig, Scale};

#[derive(Parser, Debug)]
#[command(
    name = "DUT Efficiency",
    about = "Simulates a pixel telescope and estimates the DUT hit efficiency",
    long_about = None
)]
struct Args {
    #[command(flatten)]
    shared: SharedSimulationArgs,

    /// DUT plane name (default: first masked single-pixel plane)
    #[arg(long)]
    dut: Option<String>,

    /// Distribution used as efficiency numerator
    #[arg(long, value_enum)]
    numerator: Option<NumeratorSource>,

    /// Fraction of the DUT pixel width covered by the central window
    #[arg(long)]
    central_eff: Option<f64>,

    /// Window shifts scanned on each side of the center
    #[arg(long)]
    slide_bins: Option<usize>,

    /// Extra numerator bins on each side of the window
    #[arg(long)]
    extra_range: Option<usize>,

    /// Directory for exported histograms
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,

    /// Export format for histograms
    #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
    format: ExportFormat,

    /// Render the efficiency curve to a PNG
    #[arg(long, default_value_t = false)]
    plot: bool,

    /// Output path of the PNG plot
    #[arg(long, default_value = "plots/dut_efficiency.png")]
    plot_path: PathBuf,

    /// Print ASCII residual histograms of every plane
    #[arg(long, default_value_t = false)]
    print_histograms: bool,

    /// Write the effective configuration to this JSON file
    #[arg(long)]
    save_config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging from environment variables
    env_logger::init();

    let args = Args::parse();

    let mut config = args.shared.load_config()?;
    if let Some(dut) = &args.dut {
        config.efficiency.dut = Some(dut.clone());
    }
    if let Some(numerator) = args.numerator {
        config.efficiency.numerator = numerator;
    }
    if let Some(central_eff) = args.central_eff {
        config.efficiency.central_eff = central_eff;
    }
    if let Some(slide_bins) = args.slide_bins {
        config.efficiency.slide_bins = slide_bins;
    }
    if let Some(extra_range) = args.extra_range {
        config.efficiency.extra_range = extra_range;
    }

    if let Some(path) = &args.save_config {
        config.save_to_file(path)?;
        println!("Configuration saved to: {}", path.display());
    }

    let telescope = config.build_telescope()?;
    let dut_id = config.efficiency.dut_id(&telescope)?;
    let dut = telescope.plane(dut_id)?;

    println!("Telescope: {} ({} planes)", telescope.name(), telescope.len());
    for (id, plane) in telescope.iter() {
        println!(
            "  [{}] {:<10} x={:>8.2} z={:>8.2} pitch={:>6.1}{}{}",
            id.index(),
            plane.name(),
            plane.x(),
            plane.z(),
            plane.pixel_width(),
            if plane.is_masked() { " masked" } else { "" },
            if plane.is_all_hits() { " all-hits" } else { "" }
        );
    }
    println!("Using random seed: {}", config.run.seed);

    let run = TrackingRun::new(&telescope, config.run.clone())?;

    let pb = ProgressBar::new(config.run.n_events as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("█▉▊▋▌▍▎▏ "),
    );
    pb.set_message("Simulating events");
    let result = run.execute_with_progress(|n| pb.inc(n as u64))?;
    pb.finish_with_message("Simulation complete!");

    println!(
        "\nEvents: {}  fitted: {}  degenerate: {}",
        result.events,
        result.fitted_events(),
        result.degenerate_fits
    );
    println!(
        "{:<12} {:>9} {:>9} {:>10} {:>10}",
        "plane", "hits", "misses", "mean", "rms"
    );
    for plane in &result.planes {
        println!(
            "{:<12} {:>9} {:>9} {:>10.3} {:>10.3}",
            plane.plane_name,
            plane.hits,
            plane.misses,
            plane.residual.mean().unwrap_or(f64::NAN),
            plane.residual.rms().unwrap_or(f64::NAN)
        );
    }

    if args.print_histograms {
        for plane in &result.planes {
            let hist = plane.residual.clone().with_config(HistogramConfig {
                scale: Scale::Log10,
                max_bar_width: 60,
                ..HistogramConfig::default()
            });
            println!("\n{}", hist.format()?);
        }
    }

    let estimator = EfficiencyEstimator::new(config.efficiency.params(dut.pixel_width()))?;
    let dut_hists = result
        .plane(dut_id)
        .ok_or_else(|| format!("no histograms for plane '{}'", dut.name()))?;
    let report = estimator.estimate_plane(dut_hists, config.efficiency.numerator)?;

    println!(
        "\nEfficiency of '{}' ({} numerator)",
        dut.name(),
        config.efficiency.numerator
    );
    println!("{report}");
    if let Some((bin, eff)) = report.curve.curve.max_bin() {
        println!(
            "Peak efficiency {:.4} at residual {:.2}",
            eff,
            report.curve.curve.bin_center(bin)
        );
    }

    let mut histograms = result.histograms();
    histograms.push(&report.curve.curve);
    let path = export_histograms(&histograms, &args.output_dir, "dut_efficiency", args.format)?;
    println!("Histograms written to: {}", path.display());

    if args.plot {
        let truth = dut_hists
            .truth_residual
            .as_ref()
            .ok_or("DUT has no truth distribution")?;
        let reco = match config.efficiency.numerator {
            NumeratorSource::TruthHit => dut_hists
                .truth_hit_residual
                .as_ref()
                .ok_or("DUT has no truth-hit distribution")?,
            NumeratorSource::Residual => &dut_hists.residual,
        };
        let plot_config = EfficiencyPlotConfig {
            output_path: args.plot_path.clone(),
            title: format!("Efficiency of {}", dut.name()),
            ..EfficiencyPlotConfig::default()
        };
        plot_efficiency(&report.curve.curve, truth, reco, &plot_config)?;
        println!("Plot saved to: {}", args.plot_path.display());
    }

    Ok(())
}
