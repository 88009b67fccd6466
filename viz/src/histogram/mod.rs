//! Histogram accumulation and display
//!
//! This module provides named, equally binned 1D histograms with weighted
//! fills, bin-range integrals and ASCII rendering.

use crate::{Result, VizError};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::ops::Range;

/// Scale type for histogram display
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Scale {
    /// Linear scale
    #[default]
    Linear,
    /// Logarithmic scale (base 10)
    Log10,
}

/// Configuration for histogram display
#[derive(Debug, Clone)]
pub struct HistogramConfig {
    /// Title for the histogram, defaults to the histogram name
    pub title: Option<String>,
    /// Character to use for bars
    pub bar_char: char,
    /// Whether to show percentage
    pub show_percentage: bool,
    /// Whether to show bin contents
    pub show_counts: bool,
    /// Scale type
    pub scale: Scale,
    /// Whether to show empty bins
    pub show_empty_bins: bool,
    /// Maximum bar width in characters
    pub max_bar_width: usize,
    /// Restrict output to this range of bins
    pub bin_range: Option<Range<usize>>,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            title: None,
            bar_char: '#',
            show_percentage: true,
            show_counts: true,
            scale: Scale::Linear,
            show_empty_bins: false,
            max_bar_width: 40,
            bin_range: None,
        }
    }
}

/// Named histogram with equally spaced bins and weighted contents.
///
/// Regular bins are indexed `0..num_bins()`. Values below `low_edge()` go to
/// the underflow, values at or above `high_edge()` to the overflow, with the
/// exception that a value exactly on the upper edge lands in the last bin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Histogram {
    name: String,
    low: f64,
    high: f64,
    contents: Vec<f64>,
    underflow: f64,
    overflow: f64,
    entries: u64,
    #[serde(skip)]
    config: HistogramConfig,
}

impl Histogram {
    /// Create an empty histogram with `bins` equal bins spanning `[low, high)`.
    pub fn new(name: impl Into<String>, bins: usize, low: f64, high: f64) -> Result<Self> {
        if bins == 0 {
            return Err(VizError::HistogramError(
                "Histogram must have at least 1 bin".to_string(),
            ));
        }

        if !low.is_finite() || !high.is_finite() || low >= high {
            return Err(VizError::HistogramError(format!(
                "Histogram edges must be finite and ascending, got [{low}, {high})"
            )));
        }

        Ok(Self {
            name: name.into(),
            low,
            high,
            contents: vec![0.0; bins],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
            config: HistogramConfig::default(),
        })
    }

    /// Create an empty histogram sharing this histogram's binning.
    pub fn empty_like(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            low: self.low,
            high: self.high,
            contents: vec![0.0; self.contents.len()],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
            config: self.config.clone(),
        }
    }

    /// Set the display configuration for the histogram
    pub fn with_config(mut self, config: HistogramConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the display configuration in place
    pub fn set_config(&mut self, config: HistogramConfig) {
        self.config = config;
    }

    /// Histogram name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of regular bins
    pub fn num_bins(&self) -> usize {
        self.contents.len()
    }

    /// Lower edge of the first bin
    pub fn low_edge(&self) -> f64 {
        self.low
    }

    /// Upper edge of the last bin
    pub fn high_edge(&self) -> f64 {
        self.high
    }

    /// Width of every bin
    pub fn bin_width(&self) -> f64 {
        (self.high - self.low) / self.contents.len() as f64
    }

    /// Lower edge of bin `bin`
    pub fn bin_low_edge(&self, bin: usize) -> f64 {
        self.low + bin as f64 * self.bin_width()
    }

    /// Center of bin `bin`
    pub fn bin_center(&self, bin: usize) -> f64 {
        self.low + (bin as f64 + 0.5) * self.bin_width()
    }

    /// Find the regular bin containing `value`
    pub fn find_bin(&self, value: f64) -> Option<usize> {
        if value.is_nan() || value < self.low || value > self.high {
            return None;
        }

        // A value exactly on the upper edge belongs to the last bin
        let idx = ((value - self.low) / self.bin_width()).floor() as usize;
        Some(idx.min(self.contents.len() - 1))
    }

    /// Whether two histograms have identical binning
    pub fn same_binning(&self, other: &Histogram) -> bool {
        self.contents.len() == other.contents.len()
            && self.low == other.low
            && self.high == other.high
    }

    /// Add `value` with `weight`. NaN values are ignored.
    pub fn fill(&mut self, value: f64, weight: f64) {
        if value.is_nan() {
            return;
        }

        self.entries += 1;
        match self.find_bin(value) {
            Some(idx) => self.contents[idx] += weight,
            None if value < self.low => self.underflow += weight,
            None => self.overflow += weight,
        }
    }

    /// Add a value with unit weight
    pub fn add(&mut self, value: f64) {
        self.fill(value, 1.0);
    }

    /// Add multiple values with unit weight
    pub fn add_all<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = f64>,
    {
        for value in values {
            self.add(value);
        }
    }

    /// Content of regular bin `bin`, zero when out of range
    pub fn bin_content(&self, bin: usize) -> f64 {
        self.contents.get(bin).copied().unwrap_or(0.0)
    }

    /// Overwrite the content of regular bin `bin`
    pub fn set_bin_content(&mut self, bin: usize, value: f64) -> Result<()> {
        let nbins = self.contents.len();
        let slot = self.contents.get_mut(bin).ok_or_else(|| {
            VizError::HistogramError(format!("Bin {bin} out of range for {nbins} bins"))
        })?;
        *slot = value;
        Ok(())
    }

    /// Contents of the regular bins
    pub fn contents(&self) -> &[f64] {
        &self.contents
    }

    /// Summed weight below the first bin
    pub fn underflow(&self) -> f64 {
        self.underflow
    }

    /// Summed weight above the last bin
    pub fn overflow(&self) -> f64 {
        self.overflow
    }

    /// Number of fill calls, including under/overflow
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum over the regular bins
    pub fn sum(&self) -> f64 {
        self.contents.iter().sum()
    }

    /// Sum of bins `low_bin..=high_bin`.
    ///
    /// Indices are clamped to the regular bins; portions of the range outside
    /// the histogram contribute nothing.
    pub fn integral(&self, low_bin: isize, high_bin: isize) -> f64 {
        let last = self.contents.len() as isize - 1;
        let lo = low_bin.max(0);
        let hi = high_bin.min(last);
        if lo > hi {
            return 0.0;
        }
        self.contents[lo as usize..=hi as usize].iter().sum()
    }

    /// Add another histogram bin by bin
    pub fn merge(&mut self, other: &Histogram) -> Result<()> {
        if !self.same_binning(other) {
            return Err(VizError::HistogramError(format!(
                "Cannot merge '{}' into '{}': binning differs",
                other.name, self.name
            )));
        }

        for (dst, src) in self.contents.iter_mut().zip(&other.contents) {
            *dst += src;
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.entries += other.entries;
        Ok(())
    }

    /// Weighted mean of the bin centers, `None` for an empty histogram
    pub fn mean(&self) -> Option<f64> {
        let sum = self.sum();
        if sum <= 0.0 {
            return None;
        }

        let weighted: f64 = self
            .contents
            .iter()
            .enumerate()
            .map(|(i, c)| c * self.bin_center(i))
            .sum();
        Some(weighted / sum)
    }

    /// Weighted standard deviation of the bin centers
    pub fn rms(&self) -> Option<f64> {
        let mean = self.mean()?;
        let sum = self.sum();
        let var: f64 = self
            .contents
            .iter()
            .enumerate()
            .map(|(i, c)| c * (self.bin_center(i) - mean).powi(2))
            .sum::<f64>()
            / sum;
        Some(var.sqrt())
    }

    /// Bin with the largest content, first one on ties
    pub fn max_bin(&self) -> Option<(usize, f64)> {
        self.contents
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (i, c)| match best {
                Some((_, b)) if b >= c => best,
                _ => Some((i, c)),
            })
    }

    /// Format the histogram as a string
    pub fn format(&self) -> Result<String> {
        let mut output = String::new();

        let title = self.config.title.as_deref().unwrap_or(&self.name);
        writeln!(output, "{}", title)?;
        writeln!(output, "{}", "=".repeat(title.len()))?;

        let bins = self
            .config
            .bin_range
            .clone()
            .unwrap_or(0..self.contents.len());
        let bins = bins.start.min(self.contents.len())..bins.end.min(self.contents.len());

        let max_content = self.contents[bins.clone()]
            .iter()
            .copied()
            .fold(0.0f64, f64::max);
        let total = self.sum();

        let count_column_width = if self.config.show_counts {
            self.contents[bins.clone()]
                .iter()
                .map(|c| format_content(*c).len())
                .max()
                .unwrap_or(10)
                + 2
        } else {
            0
        };

        // Header
        let mut header = String::new();
        write!(header, "{:<19} ", "Range")?;

        if self.config.show_counts {
            write!(header, "| {:<width$} ", "Content", width = count_column_width)?;
        }

        if self.config.show_percentage {
            write!(header, "| {:<10} ", "Percentage")?;
        }

        write!(header, "| Bar")?;

        writeln!(output, "{}", header)?;
        writeln!(output, "{}", "-".repeat(header.len()))?;

        for i in bins {
            let content = self.contents[i];

            if content == 0.0 && !self.config.show_empty_bins {
                continue;
            }

            let percentage = if total > 0.0 {
                content / total * 100.0
            } else {
                0.0
            };

            let bar_length = match self.config.scale {
                Scale::Linear if max_content > 0.0 => {
                    ((content / max_content) * self.config.max_bar_width as f64).round() as usize
                }
                Scale::Linear => 0,
                Scale::Log10 => {
                    if content >= 1.0 {
                        (content.log10() * 10.0).round() as usize
                    } else {
                        0
                    }
                }
            };

            let bar = if content > 0.0 {
                self.config.bar_char.to_string().repeat(bar_length)
            } else {
                "".to_string()
            };

            let format_with_sign = |val: f64| -> String {
                let val_str = format!("{:.3}", val);
                if val_str.starts_with('-') {
                    val_str
                } else {
                    format!("+{}", val_str)
                }
            };

            write!(
                output,
                "{:<8} - {:<8}",
                format_with_sign(self.bin_low_edge(i)),
                format_with_sign(self.bin_low_edge(i + 1)),
            )?;

            if self.config.show_counts {
                write!(
                    output,
                    "| {:<width$} ",
                    format_content(content),
                    width = count_column_width
                )?;
            }

            if self.config.show_percentage {
                write!(output, "| {:5.2}%      ", percentage)?;
            }

            writeln!(output, "| {}", bar)?;
        }

        if self.config.scale == Scale::Log10 {
            writeln!(output)?;
            writeln!(
                output,
                "Note: Bar lengths use log10 scale (each {} represents a power of 10)",
                self.config.bar_char
            )?;
        }

        Ok(output)
    }
}

/// Integer contents print without decimals, fractional ones with four
fn format_content(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_histogram_creation() {
        let hist = Histogram::new("plane0", 5, 0.0, 5.0).unwrap();
        assert_eq!(hist.num_bins(), 5);
        assert_eq!(hist.entries(), 0);
        assert_eq!(hist.name(), "plane0");
        assert_relative_eq!(hist.bin_width(), 1.0);
    }

    #[test]
    fn test_histogram_rejects_bad_edges() {
        assert!(Histogram::new("h", 10, 1.0, 1.0).is_err());
        assert!(Histogram::new("h", 10, 2.0, 1.0).is_err());
        assert!(Histogram::new("h", 10, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_histogram_adding_values() {
        let mut hist = Histogram::new("h", 5, 0.0, 5.0).unwrap();

        hist.add(0.5);
        hist.add(1.5);
        hist.add(1.7);
        hist.add(5.0); // Exactly the upper edge, lands in the last bin

        assert_eq!(hist.contents(), &[1.0, 2.0, 0.0, 0.0, 1.0]);
        assert_eq!(hist.entries(), 4);
    }

    #[test]
    fn test_under_and_overflow() {
        let mut hist = Histogram::new("h", 10, -1.0, 1.0).unwrap();
        hist.fill(-3.0, 2.0);
        hist.fill(7.0, 0.5);
        hist.fill(f64::NAN, 1.0);

        assert_eq!(hist.underflow(), 2.0);
        assert_eq!(hist.overflow(), 0.5);
        assert_eq!(hist.sum(), 0.0);
        assert_eq!(hist.entries(), 2);
    }

    #[test]
    fn test_find_bin_and_centers() {
        let hist = Histogram::new("h", 100, -50.0, 50.0).unwrap();
        assert_eq!(hist.find_bin(-50.0), Some(0));
        assert_eq!(hist.find_bin(0.0), Some(50));
        assert_eq!(hist.find_bin(-0.1), Some(49));
        assert_eq!(hist.find_bin(50.5), None);
        assert_eq!(hist.find_bin(-50.5), None);
        assert_relative_eq!(hist.bin_center(50), 0.5);
    }

    #[test]
    fn test_integral_is_inclusive_and_clamped() {
        let mut hist = Histogram::new("h", 4, 0.0, 4.0).unwrap();
        hist.add_all(vec![0.5, 1.5, 1.5, 2.5, 3.5, 3.5, 3.5]);

        assert_eq!(hist.integral(1, 2), 3.0);
        assert_eq!(hist.integral(0, 3), 7.0);
        assert_eq!(hist.integral(-10, 0), 1.0);
        assert_eq!(hist.integral(3, 50), 3.0);
        assert_eq!(hist.integral(5, 9), 0.0);
        assert_eq!(hist.integral(2, 1), 0.0);
    }

    #[test]
    fn test_set_bin_content() {
        let mut hist = Histogram::new("h", 3, 0.0, 3.0).unwrap();
        hist.set_bin_content(1, 0.75).unwrap();
        assert_eq!(hist.bin_content(1), 0.75);
        assert!(hist.set_bin_content(3, 1.0).is_err());
        assert_eq!(hist.bin_content(99), 0.0);
    }

    #[test]
    fn test_merge_sums_bins() {
        let mut a = Histogram::new("a", 4, 0.0, 4.0).unwrap();
        let mut b = a.empty_like("b");
        a.add_all(vec![0.5, 1.5, 9.0]);
        b.add_all(vec![1.5, 3.5, -1.0]);

        a.merge(&b).unwrap();
        assert_eq!(a.contents(), &[1.0, 2.0, 0.0, 1.0]);
        assert_eq!(a.overflow(), 1.0);
        assert_eq!(a.underflow(), 1.0);
        assert_eq!(a.entries(), 6);
    }

    #[test]
    fn test_merge_rejects_different_binning() {
        let mut a = Histogram::new("a", 4, 0.0, 4.0).unwrap();
        let b = Histogram::new("b", 8, 0.0, 4.0).unwrap();
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn test_mean_and_rms() {
        let mut hist = Histogram::new("h", 4, 0.0, 4.0).unwrap();
        assert!(hist.mean().is_none());

        hist.fill(0.5, 1.0);
        hist.fill(2.5, 1.0);
        assert_relative_eq!(hist.mean().unwrap(), 1.5);
        assert_relative_eq!(hist.rms().unwrap(), 1.0);
    }

    #[test]
    fn test_max_bin() {
        let mut hist = Histogram::new("h", 4, 0.0, 4.0).unwrap();
        hist.add_all(vec![1.5, 2.5, 2.5]);
        assert_eq!(hist.max_bin(), Some((2, 2.0)));
    }

    #[test]
    fn test_histogram_format() {
        let mut hist = Histogram::new("residuals", 5, 0.0, 5.0).unwrap();
        hist.add_all(vec![0.5, 1.5, 1.7, 2.2, 3.0, 4.9]);

        let output = hist.format().unwrap();
        assert!(output.starts_with("residuals"));
        assert!(output.contains("Content"));
        assert!(output.contains("Percentage"));
    }

    #[test]
    fn test_histogram_format_fractional_contents() {
        let mut hist = Histogram::new("eff", 2, 0.0, 2.0).unwrap();
        hist.set_bin_content(0, 0.5).unwrap();
        hist.set_bin_content(1, 1.0).unwrap();

        let output = hist.format().unwrap();
        assert!(output.contains("0.5000"));
    }

    #[test]
    fn test_histogram_format_bin_range() {
        let mut hist = Histogram::new("h", 10, 0.0, 10.0).unwrap();
        hist.add_all(vec![0.5, 9.5]);
        hist.set_config(HistogramConfig {
            bin_range: Some(0..5),
            ..HistogramConfig::default()
        });

        let output = hist.format().unwrap();
        assert!(output.contains("+0.000"));
        assert!(!output.contains("+9.000"));
    }

    #[test]
    fn test_histogram_with_log_scale() {
        let mut hist = Histogram::new("h", 5, 0.0, 5.0).unwrap();
        hist.add_all(vec![0.5, 0.6, 0.7, 1.5, 1.7, 2.2, 3.0, 4.9]);

        let config = HistogramConfig {
            scale: Scale::Log10,
            ..HistogramConfig::default()
        };
        hist = hist.with_config(config);

        let output = hist.format().unwrap();
        assert!(output.contains("log10"));
    }
}
