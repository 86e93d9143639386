//! Chart rendering
//!
//! Charts are rasterized into RGB PNG images. No text is drawn into the
//! pixels; each chart carries a colour legend that the exporter prints next
//! to the image.

use crate::analyzer::word_frequencies;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::schemas::{ChartData, ChartImage, ChartKind, LegendEntry};
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use std::f64::consts::TAU;
use tracing::debug;

/// Bar charts and placeholders, 5 x 3.5 aspect
pub const CHART_WIDTH: u32 = 1000;
pub const CHART_HEIGHT: u32 = 700;

/// Pie charts are square
pub const PIE_SIZE: u32 = 700;

/// Words considered when building a word frequency chart
pub const MAX_CLOUD_WORDS: usize = 100;

/// Words drawn in a word frequency chart
pub const CLOUD_BARS: usize = 15;

const NO_DATA: &str = "No data available";
const NO_TEXT_DATA: &str = "No text data available";

/// Colours used when drawing charts
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub palette: Vec<[u8; 3]>,
    pub background: [u8; 3],
    pub axis: [u8; 3],
    pub placeholder: [u8; 3],
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            palette: vec![
                [31, 119, 180],
                [255, 127, 14],
                [44, 160, 44],
                [214, 39, 40],
                [148, 103, 189],
                [140, 86, 75],
                [227, 119, 194],
                [127, 127, 127],
                [188, 189, 34],
                [23, 190, 207],
            ],
            background: [255, 255, 255],
            axis: [60, 60, 60],
            placeholder: [235, 235, 235],
        }
    }
}

impl ChartStyle {
    fn color(&self, index: usize) -> [u8; 3] {
        if self.palette.is_empty() {
            return self.axis;
        }
        self.palette[index % self.palette.len()]
    }
}

/// Visualizer for survey analysis results
#[derive(Debug, Clone, Default)]
pub struct SurveyVisualizer {
    style: ChartStyle,
}

impl SurveyVisualizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(style: ChartStyle) -> Self {
        Self { style }
    }

    /// Render a chart for the given data
    pub fn create_chart(&self, chart: &ChartData) -> AnalyticsResult<ChartImage> {
        debug!(kind = ?chart.kind, title = %chart.title, "Rendering chart");

        match chart.kind {
            ChartKind::Pie => self.create_pie_chart(&chart.labels, &chart.values),
            ChartKind::WordCloud => self.create_word_chart(chart.text.as_deref().unwrap_or("")),
            ChartKind::Bar | ChartKind::Unknown => {
                self.create_bar_chart(&chart.labels, &chart.values)
            }
        }
    }

    /// Horizontal bars, one row per label
    pub fn create_bar_chart(&self, labels: &[String], values: &[u64]) -> AnalyticsResult<ChartImage> {
        if labels.is_empty() || values.is_empty() {
            return self.create_placeholder(NO_DATA);
        }
        if labels.len() != values.len() {
            return Err(AnalyticsError::Visualization(format!(
                "Chart has {} labels but {} values",
                labels.len(),
                values.len()
            )));
        }

        let mut img = self.canvas(CHART_WIDTH, CHART_HEIGHT, self.style.background);

        let margin = 40u32;
        let plot_width = CHART_WIDTH - 2 * margin;
        let plot_height = CHART_HEIGHT - 2 * margin;
        let rows = labels.len() as u32;
        let row_height = (plot_height / rows).max(1);
        let bar_height = (row_height * 7 / 10).max(1);
        let max_value = values.iter().copied().max().unwrap_or(0).max(1);

        let mut legend = Vec::with_capacity(labels.len());
        for (i, (label, value)) in labels.iter().zip(values).enumerate() {
            let color = self.style.color(i);
            let top = margin + i as u32 * row_height + (row_height - bar_height) / 2;
            let width = ((*value as f64 / max_value as f64) * plot_width as f64).round() as u32;
            fill_rect(&mut img, margin, top, width, bar_height, color);
            legend.push(LegendEntry {
                label: label.clone(),
                value: *value,
                color,
            });
        }

        // Value axis along the left edge
        fill_rect(&mut img, margin - 2, margin, 2, plot_height, self.style.axis);

        self.finish(img, legend, None)
    }

    /// Pie starting at 12 o'clock, sectors running counter-clockwise
    pub fn create_pie_chart(&self, labels: &[String], values: &[u64]) -> AnalyticsResult<ChartImage> {
        let total: u64 = values.iter().sum();
        if labels.is_empty() || values.is_empty() || total == 0 {
            return self.create_placeholder(NO_DATA);
        }
        if labels.len() != values.len() {
            return Err(AnalyticsError::Visualization(format!(
                "Chart has {} labels but {} values",
                labels.len(),
                values.len()
            )));
        }

        let mut img = self.canvas(PIE_SIZE, PIE_SIZE, self.style.background);

        // Cumulative sector end angles
        let mut bounds = Vec::with_capacity(values.len());
        let mut running = 0u64;
        for value in values {
            running += value;
            bounds.push(running as f64 / total as f64 * TAU);
        }

        let center = PIE_SIZE as f64 / 2.0;
        let radius = center - 20.0;
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let dx = x as f64 + 0.5 - center;
            let dy = center - (y as f64 + 0.5);
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            let mut angle = (-dx).atan2(dy);
            if angle < 0.0 {
                angle += TAU;
            }
            let sector = bounds
                .iter()
                .position(|end| angle < *end)
                .unwrap_or(bounds.len() - 1);
            *pixel = Rgb(self.style.color(sector));
        }

        let legend = labels
            .iter()
            .zip(values)
            .enumerate()
            .map(|(i, (label, value))| LegendEntry {
                label: label.clone(),
                value: *value,
                color: self.style.color(i),
            })
            .collect();

        self.finish(img, legend, None)
    }

    /// Most frequent words drawn as horizontal bars
    pub fn create_word_chart(&self, text: &str) -> AnalyticsResult<ChartImage> {
        if text.trim().is_empty() {
            return self.create_placeholder(NO_TEXT_DATA);
        }

        let words: Vec<(String, u64)> = word_frequencies(text)
            .into_iter()
            .take(MAX_CLOUD_WORDS)
            .take(CLOUD_BARS)
            .collect();
        let (labels, values): (Vec<String>, Vec<u64>) = words.into_iter().unzip();

        self.create_bar_chart(&labels, &values)
    }

    /// Blank framed image carrying a note instead of data
    pub fn create_placeholder(&self, note: &str) -> AnalyticsResult<ChartImage> {
        let mut img = self.canvas(CHART_WIDTH, CHART_HEIGHT, self.style.placeholder);
        let [w, h] = [CHART_WIDTH, CHART_HEIGHT];
        fill_rect(&mut img, 0, 0, w, 3, self.style.axis);
        fill_rect(&mut img, 0, h - 3, w, 3, self.style.axis);
        fill_rect(&mut img, 0, 0, 3, h, self.style.axis);
        fill_rect(&mut img, w - 3, 0, 3, h, self.style.axis);

        self.finish(img, Vec::new(), Some(note.to_string()))
    }

    fn canvas(&self, width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(color))
    }

    fn finish(
        &self,
        img: RgbImage,
        legend: Vec<LegendEntry>,
        note: Option<String>,
    ) -> AnalyticsResult<ChartImage> {
        let (width, height) = img.dimensions();
        let png = encode_png(&img)?;
        Ok(ChartImage {
            png_base64: B64.encode(png),
            width,
            height,
            legend,
            note,
        })
    }
}

fn fill_rect(img: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, color: [u8; 3]) {
    let x_end = (x + width).min(img.width());
    let y_end = (y + height).min(img.height());
    for py in y..y_end {
        for px in x..x_end {
            img.put_pixel(px, py, Rgb(color));
        }
    }
}

fn encode_png(img: &RgbImage) -> AnalyticsResult<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
        .map_err(|e| AnalyticsError::Visualization(format!("PNG encoding failed: {}", e)))?;
    Ok(out)
}
