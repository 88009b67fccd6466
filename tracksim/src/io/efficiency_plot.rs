//! PNG plots of the efficiency curve and the DUT residual distributions

use plotters::prelude::*;
use std::path::PathBuf;
use viz::histogram::Histogram;

/// Efficiency plot configuration
#[derive(Debug, Clone)]
pub struct EfficiencyPlotConfig {
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for EfficiencyPlotConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("plots/dut_efficiency.png"),
            width: 1200,
            height: 900,
            title: "DUT Efficiency".to_string(),
        }
    }
}

fn points(hist: &Histogram) -> Vec<(f64, f64)> {
    hist.contents()
        .iter()
        .enumerate()
        .map(|(bin, &c)| (hist.bin_center(bin), c))
        .collect()
}

/// Draw the efficiency curve above the truth and reconstructed distributions.
pub fn plot_efficiency(
    curve: &Histogram,
    truth: &Histogram,
    reco: &Histogram,
    config: &EfficiencyPlotConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = config.output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let root = BitMapBackend::new(&config.output_path, (config.width, config.height))
        .into_drawing_area();
    root.fill(&WHITE)?;
    let areas = root.split_evenly((2, 1));
    let x_range = curve.low_edge()..curve.high_edge();

    let y_max = curve
        .contents()
        .iter()
        .copied()
        .fold(1.0f64, f64::max)
        * 1.1;
    let mut upper = ChartBuilder::on(&areas[0])
        .caption(&config.title, ("sans-serif", 28).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range.clone(), 0.0..y_max)?;
    upper
        .configure_mesh()
        .x_desc("Position relative to pixel center")
        .y_desc("Efficiency")
        .y_label_formatter(&|y| format!("{y:.2}"))
        .axis_desc_style(("sans-serif", 18))
        .draw()?;
    upper
        .draw_series(LineSeries::new(points(curve), &BLUE))?
        .label(curve.name())
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
    upper
        .draw_series(LineSeries::new(
            vec![(curve.low_edge(), 1.0), (curve.high_edge(), 1.0)],
            BLACK.mix(0.5),
        ))?;
    upper
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    let counts_max = truth
        .contents()
        .iter()
        .chain(reco.contents())
        .copied()
        .fold(1.0f64, f64::max)
        * 1.1;
    let mut lower = ChartBuilder::on(&areas[1])
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, 0.0..counts_max)?;
    lower
        .configure_mesh()
        .x_desc("Residual")
        .y_desc("Entries")
        .axis_desc_style(("sans-serif", 18))
        .draw()?;
    lower
        .draw_series(LineSeries::new(points(truth), &BLACK))?
        .label(truth.name())
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK));
    lower
        .draw_series(LineSeries::new(points(reco), &RED))?
        .label(reco.name())
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
    lower
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    log::info!("Efficiency plot saved to {}", config.output_path.display());
    Ok(())
}
