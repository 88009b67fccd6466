//! Smeared box study over a range of track resolutions
//!
//! For each resolution a uniform box is smeared with a Gaussian and the
//! efficiency inside central windows of the box is reported. The result shows
//! which central fraction keeps the measured efficiency close to one for a
//! given telescope resolution.
//!
//! Usage:
//! ```
//! cargo run --release --bin smear_box -- --resolutions 2:12:2 --fractions 0.2,0.5,0.8
//! ```

use clap::Parser;
use rayon::prelude::*;
use tracksim::algo::smear::{SmearBoxParams, SmearBoxStudy};
use tracksim::shared_args::RangeArg;

#[derive(Parser, Debug)]
#[command(
    name = "Smeared Box",
    about = "Efficiency of central windows of a Gaussian-smeared box",
    long_about = None
)]
struct Args {
    /// Track resolutions to study (format: start:stop:step)
    #[arg(long, default_value = "8.5:8.5:1")]
    resolutions: RangeArg,

    /// Central window fractions of the box
    #[arg(long, value_delimiter = ',', default_value = "0.2,0.8")]
    fractions: Vec<f64>,

    /// Half width of the box
    #[arg(long, default_value_t = 25.0)]
    half_width: f64,

    /// Number of sampled positions per resolution
    #[arg(short = 'n', long, default_value_t = 1_000_000)]
    events: usize,

    /// Random seed for reproducible studies
    #[arg(long, default_value_t = 5)]
    seed: u64,

    /// Print the box and smeared histograms
    #[arg(long, default_value_t = false)]
    print_histograms: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging from environment variables
    env_logger::init();

    let args = Args::parse();
    let resolutions = args.resolutions.values();

    let studies = resolutions
        .par_iter()
        .map(|&resolution| {
            SmearBoxStudy::run(SmearBoxParams {
                n_events: args.events,
                resolution,
                half_width: args.half_width,
                seed: args.seed,
                ..SmearBoxParams::default()
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    print!("{:>10}", "reso");
    for fraction in &args.fractions {
        print!(" {:>12}", format!("eff {:.0}%", fraction * 100.0));
    }
    println!();

    for study in &studies {
        print!("{:>10.2}", study.params.resolution);
        for &fraction in &args.fractions {
            match study.central_efficiency(fraction) {
                Some(eff) => print!(" {:>12.4}", eff),
                None => print!(" {:>12}", "-"),
            }
        }
        println!();

        if args.print_histograms {
            println!("{}", study.box_hist.format()?);
            println!("{}", study.smeared.format()?);
        }
    }

    Ok(())
}
