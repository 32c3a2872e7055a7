//! Plot rendering for reduced fields and series.
//!
//! The pipeline hands a renderer a reduced field or series together with its
//! coordinate vectors; the renderer produces one raster image per plot and
//! returns a handle the transport can expose as a URL. [PngRenderer] is the
//! built-in implementation; anything else (different formats, remote
//! rendering) can slot in behind the [PlotRenderer] trait.

use crate::error::EvaluationError;
use crate::reduce::Reduced;

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_line_segment_mut;
use std::path::PathBuf;
use uuid::Uuid;

/// Handle of one rendered raster.
#[derive(Clone, Debug, PartialEq)]
pub struct Artifact {
    /// File name under the plot directory
    pub file_name: String,
    /// URL path the transport serves the file at
    pub url_path: String,
}

/// Renderer of reduced fields and series.
pub trait PlotRenderer {
    /// Render a lat x lon field to a raster.
    fn render_field(
        &self,
        metric: &str,
        reduced: &Reduced,
        lat: &[f64],
        lon: &[f64],
    ) -> Result<Artifact, EvaluationError>;

    /// Render one or more time series into a single raster.
    fn render_series(
        &self,
        series: &[(String, Vec<f64>)],
        time: &[f64],
    ) -> Result<Artifact, EvaluationError>;
}

/// Renders PNG rasters into a directory of UUID-named files.
#[derive(Clone, Debug)]
pub struct PngRenderer {
    dir: PathBuf,
    cell_size: u32,
}

/// Series chart width in pixels.
const SERIES_WIDTH: u32 = 640;
/// Series chart height in pixels.
const SERIES_HEIGHT: u32 = 320;
/// Series chart margin in pixels.
const SERIES_MARGIN: u32 = 32;

impl PngRenderer {
    /// Return a new PngRenderer writing under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        PngRenderer {
            dir: dir.into(),
            cell_size: 8,
        }
    }

    fn save(&self, image: RgbaImage, stem: &str) -> Result<Artifact, EvaluationError> {
        std::fs::create_dir_all(&self.dir)?;
        let file_name = format!("{}-{}.png", stem, Uuid::new_v4());
        image.save(self.dir.join(&file_name))?;
        Ok(Artifact {
            url_path: format!("/plots/{}", file_name),
            file_name,
        })
    }
}

impl PlotRenderer for PngRenderer {
    /// Render a field as a colour-ramped cell raster, north up.
    ///
    /// NaN cells are transparent.
    fn render_field(
        &self,
        metric: &str,
        reduced: &Reduced,
        lat: &[f64],
        lon: &[f64],
    ) -> Result<Artifact, EvaluationError> {
        let (rows, cols) = (lat.len(), lon.len());
        let (min, max) = finite_range(reduced.values.iter().copied());
        let span = if max > min { max - min } else { 1.0 };
        let image = RgbaImage::from_fn(
            cols as u32 * self.cell_size,
            rows as u32 * self.cell_size,
            |px, py| {
                let col = (px / self.cell_size) as usize;
                // Latitude ascends southwards in the array; flip so north is up.
                let row = rows - 1 - (py / self.cell_size) as usize;
                let value = reduced.values[[row, col]];
                if value.is_nan() {
                    Rgba([0, 0, 0, 0])
                } else {
                    ramp((value - min) / span)
                }
            },
        );
        self.save(image, &slug(metric))
    }

    /// Render the series of every computed metric into one polyline chart.
    fn render_series(
        &self,
        series: &[(String, Vec<f64>)],
        time: &[f64],
    ) -> Result<Artifact, EvaluationError> {
        let mut image = RgbaImage::from_pixel(SERIES_WIDTH, SERIES_HEIGHT, Rgba([255, 255, 255, 255]));
        let axis = Rgba([64, 64, 64, 255]);
        let left = SERIES_MARGIN as f32;
        let right = (SERIES_WIDTH - SERIES_MARGIN) as f32;
        let top = SERIES_MARGIN as f32;
        let bottom = (SERIES_HEIGHT - SERIES_MARGIN) as f32;
        draw_line_segment_mut(&mut image, (left, top), (left, bottom), axis);
        draw_line_segment_mut(&mut image, (left, bottom), (right, bottom), axis);

        let (min, max) = finite_range(series.iter().flat_map(|(_, values)| values.iter().copied()));
        let span = if max > min { max - min } else { 1.0 };
        let steps = time.len().saturating_sub(1).max(1) as f32;
        for (index, (_, values)) in series.iter().enumerate() {
            let colour = palette(index, series.len());
            let point = |step: usize, value: f64| {
                let x = left + (right - left) * step as f32 / steps;
                let y = bottom - (bottom - top) * ((value - min) / span) as f32;
                (x, y)
            };
            for step in 1..values.len() {
                let (prev, next) = (values[step - 1], values[step]);
                // NaN entries break the line rather than being drawn as zero.
                if prev.is_nan() || next.is_nan() {
                    continue;
                }
                draw_line_segment_mut(&mut image, point(step - 1, prev), point(step, next), colour);
            }
        }
        self.save(image, "series")
    }
}

/// Finite minimum and maximum of an iterator, or (0, 0) if none are finite.
fn finite_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in values.filter(|value| value.is_finite()) {
        min = min.min(value);
        max = max.max(value);
    }
    if min > max {
        (0.0, 0.0)
    } else {
        (min, max)
    }
}

/// Blue-to-red colour ramp over `t` in [0, 1].
fn ramp(t: f64) -> Rgba<u8> {
    let hue = 240.0 * (1.0 - t.clamp(0.0, 1.0)) as f32;
    let (r, g, b) = hsv_to_rgb(hue, 0.9, 0.9);
    Rgba([r, g, b, 255])
}

/// Distinct series colour per index.
fn palette(index: usize, total: usize) -> Rgba<u8> {
    let hue = 360.0 * index as f32 / total.max(1) as f32;
    let (r, g, b) = hsv_to_rgb(hue, 0.8, 0.7);
    Rgba([r, g, b, 255])
}

/// Convert HSV (h in degrees) to RGB bytes.
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let c = v * s;
    let h_prime = (h / 60.0) % 6.0;
    let x = c * (1.0 - ((h_prime % 2.0) - 1.0).abs());
    let (r, g, b) = match h_prime as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    (
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}

/// Reduce a metric identifier to a file name stem.
fn slug(metric: &str) -> String {
    let mut slug: String = metric
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    while slug.contains("--") {
        slug = slug.replace("--", "-");
    }
    slug.trim_matches('-').to_string()
}
