//! Misalignment scan for one telescope plane
//!
//! Moves a plane laterally over a range of offsets, reruns the simulation for
//! every offset and reports the mean and RMS of each plane's residual
//! distribution. A misaligned plane in the fit pulls the residuals of the
//! other planes, which this scan makes visible.
//!
//! Usage:
//! ```
//! cargo run --release --bin alignment_scan -- --telescope mixed-six-plane --plane plane2 --offsets=-20:20:5
//! ```

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use tracksim::shared_args::{RangeArg, SharedSimulationArgs};
use tracksim::sims::tracking_run::TrackingRun;

#[derive(Parser, Debug)]
#[command(
    name = "Alignment Scan",
    about = "Scans the lateral offset of one plane and reports residual shifts",
    long_about = None
)]
struct Args {
    #[command(flatten)]
    shared: SharedSimulationArgs,

    /// Plane to move
    #[arg(long, default_value = "plane2")]
    plane: String,

    /// Lateral offsets relative to the nominal position (format: start:stop:step)
    #[arg(long, default_value = "-20:20:5", allow_hyphen_values = true)]
    offsets: RangeArg,

    /// Output CSV file path
    #[arg(long, default_value = "alignment_scan.csv")]
    output_csv: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging from environment variables
    env_logger::init();

    let args = Args::parse();
    let config = args.shared.load_config()?;
    let nominal = config.build_telescope()?;
    let moved_id = nominal.plane_id(&args.plane)?;
    let nominal_x = nominal.plane(moved_id)?.x();

    let offsets = args.offsets.values();
    println!(
        "Scanning '{}' of {} over {} offsets ({})",
        args.plane,
        nominal.name(),
        offsets.len(),
        args.offsets
    );

    let pb = ProgressBar::new(offsets.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("█▉▊▋▌▍▎▏ "),
    );
    pb.set_message("Scanning offsets");

    let mut file = BufWriter::new(File::create(&args.output_csv)?);
    writeln!(file, "offset,plane,hits,misses,mean,rms")?;

    for &offset in &offsets {
        let telescope = nominal.with_plane_offset(moved_id, nominal_x + offset)?;
        let result = TrackingRun::new(&telescope, config.run.clone())?.execute()?;

        for plane in &result.planes {
            let mean = plane.residual.mean().unwrap_or(f64::NAN);
            let rms = plane.residual.rms().unwrap_or(f64::NAN);
            writeln!(
                file,
                "{},{},{},{},{},{}",
                offset, plane.plane_name, plane.hits, plane.misses, mean, rms
            )?;
            log::debug!(
                "offset {offset:+.2}: {} mean {mean:.3} rms {rms:.3}",
                plane.plane_name
            );
        }

        let moved = result
            .plane(moved_id)
            .and_then(|p| p.residual.mean())
            .unwrap_or(f64::NAN);
        pb.println(format!(
            "offset {:>+8.2}: mean residual of '{}' {:>+8.3}",
            offset, args.plane, moved
        ));
        pb.inc(1);
    }

    file.flush()?;
    pb.finish_with_message("Scan complete!");
    println!("Results written to: {}", args.output_csv);
    Ok(())
}
