//! Named histogram export to JSON and CSV

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use viz::histogram::Histogram;

/// File format for exported histograms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Save histograms as a JSON array
pub fn save_json(histograms: &[&Histogram], path: &Path) -> io::Result<()> {
    let json = serde_json::to_string_pretty(histograms)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, json)
}

/// Load histograms written by [`save_json`]
pub fn load_json(path: &Path) -> io::Result<Vec<Histogram>> {
    let json = std::fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write one CSV row per regular bin of every histogram
pub fn write_csv<W: Write>(histograms: &[&Histogram], mut writer: W) -> io::Result<()> {
    writeln!(writer, "histogram,bin,low_edge,center,content")?;
    for hist in histograms {
        for (bin, content) in hist.contents().iter().enumerate() {
            writeln!(
                writer,
                "{},{},{},{},{}",
                hist.name(),
                bin,
                hist.bin_low_edge(bin),
                hist.bin_center(bin),
                content
            )?;
        }
    }
    writer.flush()
}

/// Write `histograms` to `dir/stem.<ext>` and return the path written.
pub fn export_histograms(
    histograms: &[&Histogram],
    dir: &Path,
    stem: &str,
    format: ExportFormat,
) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{stem}.{}", format.extension()));

    match format {
        ExportFormat::Json => save_json(histograms, &path)?,
        ExportFormat::Csv => write_csv(histograms, BufWriter::new(File::create(&path)?))?,
    }

    log::info!("Exported {} histograms to {}", histograms.len(), path.display());
    Ok(path)
}
