//! Output of run histograms: file export and plots

pub mod efficiency_plot;
pub mod histogram_export;

pub use efficiency_plot::{plot_efficiency, EfficiencyPlotConfig};
pub use histogram_export::{export_histograms, ExportFormat};
