//! Bar charts rasterized to scratch PNG files.
//!
//! A chart is drawn into an RGB [`image::RgbImage`] and saved under the
//! renderer's scratch directory, overwriting any file with the same name.  The
//! renderer never deletes what it writes; whoever embeds the image owns the
//! file afterwards.  PNGs are written without an alpha channel because the PDF
//! backend rejects transparent images.

mod glyphs;

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use image::{ImageFormat, Rgb, RgbImage};
use log::debug;

use crate::format;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([200, 200, 200]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);
const TEXT: Rgb<u8> = Rgb([40, 40, 40]);

const MARGIN_X: u32 = 24;
const MARGIN_TOP: u32 = 36;
const MARGIN_BOTTOM: u32 = 36;
const GRID_LINES: u32 = 5;
const DASH: u32 = 6;
const BAR_FRACTION: f64 = 0.4;
const TEXT_SCALE: u32 = 3;
const TEXT_GAP: i64 = 6;

/// Errors raised while drawing or saving a chart.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    /// Labels and values are empty or differ in length.
    #[error("chart needs matching, non-empty series (got {labels} labels and {values} values)")]
    InvalidSeries {
        /// Number of labels.
        labels: usize,
        /// Number of values.
        values: usize,
    },
    /// A value is NaN or infinite.
    #[error("chart value at position {index} is not finite")]
    NonFinite {
        /// Position of the offending value.
        index: usize,
    },
    /// The scratch directory could not be created.
    #[error("cannot create chart directory {}: {source}", path.display())]
    ScratchDir {
        /// Directory that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The image could not be encoded or written.
    #[error("cannot write chart {}: {source}", path.display())]
    Write {
        /// Target file.
        path: PathBuf,
        /// Encoder error.
        #[source]
        source: image::ImageError,
    },
    /// The file did not appear on disk after writing.
    #[error("chart {} not found after writing", .0.display())]
    Missing(PathBuf),
}

/// Drawing options for a single chart.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartOptions {
    file_name: String,
    width: u32,
    height: u32,
    bar_color: Rgb<u8>,
    value_decimals: u32,
    headroom: f64,
}

impl ChartOptions {
    /// Creates options writing to `file_name` inside the scratch directory.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            width: 600,
            height: 600,
            bar_color: Rgb([0xFF, 0x66, 0x00]),
            value_decimals: 2,
            headroom: 1.5,
        }
    }

    /// Sets the image size in pixels.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(2 * MARGIN_X + 1);
        self.height = height.max(MARGIN_TOP + MARGIN_BOTTOM + 1);
        self
    }

    /// Sets the bar fill color.
    pub fn with_bar_color(mut self, red: u8, green: u8, blue: u8) -> Self {
        self.bar_color = Rgb([red, green, blue]);
        self
    }

    /// Sets the decimals of the value labels.
    pub fn with_value_decimals(mut self, decimals: u32) -> Self {
        self.value_decimals = decimals;
        self
    }

    /// Sets how far the value axis extends past the largest bar, as a factor.
    pub fn with_headroom(mut self, headroom: f64) -> Self {
        if headroom.is_finite() && headroom >= 1.0 {
            self.headroom = headroom;
        }
        self
    }

    /// Returns the target file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Turns a labelled series into an image file.
pub trait ChartRenderer {
    /// Draws one bar per label and returns the path of the written file.
    ///
    /// `labels` and `values` are drawn in the order given; callers put the
    /// oldest point first.
    fn render_bar_chart(
        &self,
        labels: &[String],
        values: &[f64],
        options: &ChartOptions,
    ) -> Result<PathBuf, ChartError>;
}

/// [`ChartRenderer`] that writes PNG files with the `image` crate.
#[derive(Clone, Debug)]
pub struct RasterChartRenderer {
    scratch_dir: PathBuf,
    existence_checks: u32,
    check_interval: Duration,
}

impl RasterChartRenderer {
    /// Creates a renderer writing into `scratch_dir`.
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            existence_checks: 10,
            check_interval: Duration::from_millis(100),
        }
    }

    /// Sets how often and how long to wait for a written file to show up.
    pub fn with_existence_check(mut self, attempts: u32, interval: Duration) -> Self {
        self.existence_checks = attempts.max(1);
        self.check_interval = interval;
        self
    }

    /// Returns the scratch directory.
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    fn wait_for(&self, path: &Path) -> Result<(), ChartError> {
        for attempt in 1..=self.existence_checks {
            if path.exists() {
                return Ok(());
            }
            debug!(
                "Chart {} not visible yet (attempt {attempt}/{})",
                path.display(),
                self.existence_checks
            );
            thread::sleep(self.check_interval);
        }
        if path.exists() {
            Ok(())
        } else {
            Err(ChartError::Missing(path.to_path_buf()))
        }
    }
}

impl ChartRenderer for RasterChartRenderer {
    fn render_bar_chart(
        &self,
        labels: &[String],
        values: &[f64],
        options: &ChartOptions,
    ) -> Result<PathBuf, ChartError> {
        validate(labels, values)?;

        fs::create_dir_all(&self.scratch_dir).map_err(|source| ChartError::ScratchDir {
            path: self.scratch_dir.clone(),
            source,
        })?;

        let path = self.scratch_dir.join(&options.file_name);
        let canvas = draw_bar_chart(labels, values, options);
        canvas
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|source| ChartError::Write {
                path: path.clone(),
                source,
            })?;

        self.wait_for(&path)?;
        debug!("Wrote chart {} with {} bars", path.display(), values.len());
        Ok(path)
    }
}

fn validate(labels: &[String], values: &[f64]) -> Result<(), ChartError> {
    if labels.is_empty() || labels.len() != values.len() {
        return Err(ChartError::InvalidSeries {
            labels: labels.len(),
            values: values.len(),
        });
    }
    match values.iter().position(|value| !value.is_finite()) {
        Some(index) => Err(ChartError::NonFinite { index }),
        None => Ok(()),
    }
}

struct Canvas {
    image: RgbImage,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, BACKGROUND),
        }
    }

    fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x < 0 || y < 0 || x >= i64::from(self.image.width()) || y >= i64::from(self.image.height()) {
            return;
        }
        self.image.put_pixel(x as u32, y as u32, color);
    }

    fn hline(&mut self, x0: i64, x1: i64, y: i64, color: Rgb<u8>, dashed: bool) {
        for x in x0..=x1 {
            if dashed && ((x - x0) as u32 / DASH) % 2 == 1 {
                continue;
            }
            self.put(x, y, color);
        }
    }

    fn fill(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
        for y in y0.min(y1)..=y0.max(y1) {
            for x in x0.min(x1)..=x0.max(x1) {
                self.put(x, y, color);
            }
        }
    }

    fn text_centered(&mut self, text: &str, center_x: i64, top: i64) {
        let width = i64::from(glyphs::text_width(text, TEXT_SCALE));
        let mut pixels = Vec::new();
        glyphs::for_each_pixel(text, center_x - width / 2, top, TEXT_SCALE, |x, y| {
            pixels.push((x, y))
        });
        for (x, y) in pixels {
            self.put(x, y, TEXT);
        }
    }
}

fn draw_bar_chart(labels: &[String], values: &[f64], options: &ChartOptions) -> RgbImage {
    let mut canvas = Canvas::new(options.width, options.height);
    let text_height = i64::from(glyphs::GLYPH_HEIGHT * TEXT_SCALE);

    let left = i64::from(MARGIN_X);
    let right = i64::from(options.width.saturating_sub(MARGIN_X));
    let top = i64::from(MARGIN_TOP);
    let bottom = i64::from(options.height.saturating_sub(MARGIN_BOTTOM));

    let high = values.iter().copied().fold(0.0_f64, f64::max) * options.headroom;
    let low = values.iter().copied().fold(0.0_f64, f64::min) * options.headroom;
    let span = if high - low > f64::EPSILON { high - low } else { 1.0 };
    let to_y = |value: f64| bottom - ((value - low) / span * (bottom - top) as f64).round() as i64;

    for step in 0..=GRID_LINES {
        let y = top + (bottom - top) * i64::from(step) / i64::from(GRID_LINES);
        canvas.hline(left, right, y, GRID, true);
    }
    let zero = to_y(0.0);
    canvas.hline(left, right, zero, AXIS, false);

    let slot = (right - left) as f64 / values.len() as f64;
    let half_bar = ((slot * BAR_FRACTION) / 2.0).max(1.0);
    for (index, (label, value)) in labels.iter().zip(values).enumerate() {
        let center = left as f64 + slot * (index as f64 + 0.5);
        let x0 = (center - half_bar).round() as i64;
        let x1 = (center + half_bar).round() as i64;
        let y = to_y(*value);
        canvas.fill(x0, zero, x1, y, options.bar_color);

        let caption = format::grouped_f64(*value, options.value_decimals);
        let caption_top = if *value >= 0.0 {
            y - TEXT_GAP - text_height
        } else {
            y + TEXT_GAP
        };
        canvas.text_centered(&caption, center.round() as i64, caption_top);
        canvas.text_centered(label, center.round() as i64, bottom + TEXT_GAP + 4);
    }

    canvas.image
}
