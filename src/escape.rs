// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The plain escape-time Mandelbrot, for when you want to see the
//! set the Buddhabrot is hiding in.  Every pixel is a seed; its color
//! depends only on how quickly that seed's orbit escaped.  Seeds that
//! never escape, and seeds that start outside the bailout radius, are
//! left black.
//!
//! The image is cut into bands of whole rows and each band is painted
//! by its own thread, straight into the image buffer.

use std::fmt;
use std::str::FromStr;

use image::RgbaImage;
use log::{debug, info};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::RenderConfig;
use crate::error::{ConfigError, Error};
use crate::evaluate::{evaluate_into, ComplexPoint, Fate, Orbit};
use crate::histogram::BandLayout;
use crate::planes::{Pixel, PlaneMapper};

/// One RGBA pixel.
pub type Color = [u8; 4];

const BLACK: Color = [0, 0, 0, 255];

/// How escape times become colors.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Palette {
    /// A continuous hue sweep over the normalized, fractional escape
    /// time.
    Smooth,
    /// A random color for every escape time.
    Random,
    /// Purple shading to white as escape times lengthen.
    Pretty,
    /// Five fixed colors, cycled, so neighbouring escape times are
    /// easy to tell apart.
    Pedagogical,
}

impl Palette {
    /// Every palette.
    pub const ALL: [Palette; 4] = [Palette::Smooth, Palette::Random, Palette::Pretty, Palette::Pedagogical];

    /// The name the palette is selected by.
    pub fn name(self) -> &'static str {
        match self {
            Palette::Smooth => "smooth",
            Palette::Random => "random",
            Palette::Pretty => "pretty",
            Palette::Pedagogical => "pedagogical",
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::Smooth
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Palette {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s {
            "smooth" => Ok(Palette::Smooth),
            "random" => Ok(Palette::Random),
            "pretty" => Ok(Palette::Pretty),
            "pedagogical" => Ok(Palette::Pedagogical),
            _ => Err(ConfigError::UnknownPalette(s.to_string())),
        }
    }
}

/// A table of colors indexed by escape time, wrapping around when
/// the escape time outruns the table.
#[derive(Clone, Debug, PartialEq)]
pub struct Gradient {
    colors: Vec<Color>,
}

impl Gradient {
    /// Black, yellow, blue, green, red.
    pub fn pedagogical() -> Self {
        Gradient {
            colors: vec![
                [0, 0, 0, 255],
                [255, 240, 0, 255],
                [0, 0, 255, 255],
                [0, 255, 0, 255],
                [255, 0, 0, 255],
            ],
        }
    }

    /// `len` entries: shades of purple for the first half, shades of
    /// gray brightening toward white for the second.
    pub fn pretty(len: usize) -> Self {
        let len = len.max(1);
        let colors = (0..len)
            .map(|n| {
                let val = (n as f64 / len as f64 * 255.0) as u8;
                if n < len / 2 {
                    [val.saturating_mul(2), 0, val.saturating_mul(2), 255]
                } else {
                    [val, val, val, 255]
                }
            })
            .collect();
        Gradient { colors }
    }

    /// `len` opaque colors drawn from `rng`.
    pub fn random(len: usize, rng: &mut StdRng) -> Self {
        let channel = Uniform::new(0u8, 255u8);
        let colors = (0..len.max(1))
            .map(|_| [channel.sample(rng), channel.sample(rng), channel.sample(rng), 255])
            .collect();
        Gradient { colors }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Always false; every constructor makes at least one entry.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// The color for an orbit that escaped after `iterations`.
    pub fn color_for(&self, iterations: u64) -> Color {
        self.colors[(iterations % self.colors.len() as u64) as usize]
    }
}

/// Convert hue (degrees, any range), saturation and value (both
/// 0..=1) to an opaque color.
pub fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> Color {
    let h = hue.rem_euclid(360.0) / 60.0;
    let sector = h.floor();
    let f = h - sector;
    let p = value * (1.0 - saturation);
    let q = value * (1.0 - f * saturation);
    let t = value * (1.0 - (1.0 - f) * saturation);
    let (r, g, b) = match sector as u8 {
        0 => (value, t, p),
        1 => (q, value, p),
        2 => (p, value, t),
        3 => (p, q, value),
        4 => (t, p, value),
        _ => (value, p, q),
    };
    let byte = |x: f64| (num::clamp(x, 0.0, 1.0) * 255.0).round() as u8;
    [byte(r), byte(g), byte(b), 255]
}

/// The fractional escape time of an orbit that escaped on iteration
/// `escaped_at` at `last`, normalized by the iteration cap.  Removes
/// the banding a whole-number escape time gives.
pub fn smooth_escape(escaped_at: u64, last: ComplexPoint, max_iterations: u64) -> f64 {
    (escaped_at as f64 - last.norm().ln().log2()) / max_iterations as f64
}

#[derive(Clone, Debug)]
enum Coloring {
    Smooth(u64),
    Table(Gradient),
}

impl Coloring {
    fn new(palette: Palette, config: &RenderConfig) -> Self {
        // Tables longer than this just repeat themselves to the eye.
        let len = config.max_iterations.min(1 << 16) as usize;
        match palette {
            Palette::Smooth => Coloring::Smooth(config.max_iterations),
            Palette::Pedagogical => Coloring::Table(Gradient::pedagogical()),
            Palette::Pretty => Coloring::Table(Gradient::pretty(len)),
            Palette::Random => {
                let mut rng = match config.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                Coloring::Table(Gradient::random(len, &mut rng))
            }
        }
    }

    fn color(&self, escaped_at: u64, last: ComplexPoint) -> Color {
        match self {
            Coloring::Smooth(max_iterations) => {
                hsv_to_rgb(smooth_escape(escaped_at, last, *max_iterations) * 360.0, 1.0, 1.0)
            }
            // Tables are indexed by completed iterations before the
            // escaping one.
            Coloring::Table(gradient) => gradient.color_for(escaped_at - 1),
        }
    }
}

/// Render the escape-time Mandelbrot through the camera in `config`,
/// using one thread per worker.
pub fn render_escape(config: &RenderConfig, palette: Palette) -> Result<RgbaImage, Error> {
    config.validate()?;
    let (width, height) = (config.width, config.height);
    let layout = BandLayout::new(height, config.workers);
    let mapper = PlaneMapper::new(config);
    let coloring = Coloring::new(palette, config);
    info!(
        "[-] Calculating escape times: {}x{}, {} bands, palette {}",
        width, height, layout.count, palette
    );

    let mut buffer = vec![0u8; width * height * 4];
    crossbeam::scope(|scope| {
        let mapper = &mapper;
        let coloring = &coloring;
        let painters: Vec<_> = buffer
            .chunks_mut(layout.rows_per_band * width * 4)
            .enumerate()
            .map(|(n, band)| {
                let first_row = n * layout.rows_per_band;
                scope.spawn(move |_| {
                    paint_band(band, first_row, width, mapper, coloring, config.max_iterations, config.bailout)
                })
            })
            .collect();
        painters
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Result<Vec<()>, _>>()
    })
    .map_err(|_| Error::WorkerPanicked)?
    .map_err(|_| Error::WorkerPanicked)?;

    info!("[!] Done.");
    RgbaImage::from_raw(width as u32, height as u32, buffer)
        .ok_or_else(|| Error::Image("image buffer has the wrong size".to_string()))
}

fn paint_band(
    band: &mut [u8],
    first_row: usize,
    width: usize,
    mapper: &PlaneMapper,
    coloring: &Coloring,
    max_iterations: u64,
    bailout: f64,
) {
    debug!("painting rows from {}", first_row);
    let mut orbit = Orbit::with_capacity(1024);
    for (i, pixel) in band.chunks_mut(4).enumerate() {
        let seed = mapper.pixel_to_point(Pixel(i % width, first_row + i / width));
        let fate = evaluate_into(seed, max_iterations, bailout, &mut orbit);
        let color = match (fate, orbit.points().last()) {
            (Fate::Escaped(n), Some(&last)) if n > 1 => coloring.color(n, last),
            _ => BLACK,
        };
        pixel.copy_from_slice(&color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::Complex;

    fn config(workers: usize) -> RenderConfig {
        RenderConfig {
            zoom: 8.0,
            offset: Complex::new(0.0, 0.0),
            max_iterations: 100,
            workers,
            seed: Some(3),
            ..RenderConfig::sized(32, 24)
        }
    }

    #[test]
    fn palette_names_round_trip() {
        for &palette in Palette::ALL.iter() {
            assert_eq!(palette.name().parse::<Palette>(), Ok(palette));
        }
        assert_eq!(
            "plaid".parse::<Palette>(),
            Err(ConfigError::UnknownPalette("plaid".to_string()))
        );
    }

    #[test]
    fn hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), [255, 0, 0, 255]);
        assert_eq!(hsv_to_rgb(60.0, 1.0, 1.0), [255, 255, 0, 255]);
        assert_eq!(hsv_to_rgb(120.0, 1.0, 1.0), [0, 255, 0, 255]);
        assert_eq!(hsv_to_rgb(240.0, 1.0, 1.0), [0, 0, 255, 255]);
        assert_eq!(hsv_to_rgb(360.0, 1.0, 1.0), [255, 0, 0, 255]);
        assert_eq!(hsv_to_rgb(-120.0, 1.0, 1.0), [0, 0, 255, 255]);
        assert_eq!(hsv_to_rgb(200.0, 0.0, 0.5), [128, 128, 128, 255]);
    }

    #[test]
    fn gradients_wrap() {
        let g = Gradient::pedagogical();
        assert_eq!(g.len(), 5);
        assert_eq!(g.color_for(0), [0, 0, 0, 255]);
        assert_eq!(g.color_for(1), [255, 240, 0, 255]);
        assert_eq!(g.color_for(6), g.color_for(1));
    }

    #[test]
    fn pretty_gradient_fades_purple_to_white() {
        let g = Gradient::pretty(10);
        assert_eq!(g.color_for(0), [0, 0, 0, 255]);
        assert_eq!(g.color_for(2), [102, 0, 102, 255]);
        assert_eq!(g.color_for(5), [127, 127, 127, 255]);
        assert_eq!(g.color_for(9), [229, 229, 229, 255]);
        assert_eq!(Gradient::pretty(0).len(), 1);
    }

    #[test]
    fn seeded_random_gradients_repeat() {
        let a = Gradient::random(50, &mut StdRng::seed_from_u64(7));
        let b = Gradient::random(50, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
    }

    #[test]
    fn smooth_escape_at_the_bailout_radius() {
        // ln|z| = ln 2 at |z| = 2, so log2(ln 2) is subtracted.
        let v = smooth_escape(5, Complex::new(2.0, 0.0), 10);
        assert!((v - (5.0 - 2f64.ln().log2()) / 10.0).abs() < 1e-12);
        assert!(v > 0.5);
    }

    #[test]
    fn escape_times_pick_gradient_colors() {
        let img = render_escape(&config(3), Palette::Pedagogical).unwrap();
        assert_eq!(img.dimensions(), (32, 24));
        // 0.5+0.5i escapes on iteration 5; entry 4 is red.
        assert_eq!(img.get_pixel(20, 16).0, [255, 0, 0, 255]);
        // The origin is in the cardioid.
        assert_eq!(img.get_pixel(16, 12).0, BLACK);
        // -2-1.5i starts outside the bailout radius.
        assert_eq!(img.get_pixel(0, 0).0, BLACK);
    }

    #[test]
    fn smooth_render_colors_escaping_seeds() {
        let img = render_escape(&config(2), Palette::Smooth).unwrap();
        let expected = hsv_to_rgb(smooth_escape(5, Complex::new(-1.6875, -0.25), 100) * 360.0, 1.0, 1.0);
        assert_eq!(img.get_pixel(20, 16).0, expected);
        assert_eq!(img.get_pixel(16, 12).0, BLACK);
    }

    #[test]
    fn band_count_does_not_change_the_image() {
        for &palette in Palette::ALL.iter() {
            let one = render_escape(&config(1), palette).unwrap();
            let many = render_escape(&config(7), palette).unwrap();
            assert_eq!(one.into_raw(), many.into_raw(), "{}", palette);
        }
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = RenderConfig { workers: 0, ..config(1) };
        match render_escape(&config, Palette::Smooth) {
            Err(Error::Config(ConfigError::NoWorkers)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
