// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tone mapping.  Visit counts span many orders of magnitude, with a
//! handful of cells near the center of the set seeing millions of
//! visits and the wisps at the edges seeing a few.  A response curve
//! compresses that range before it is scaled into a byte per channel.

use std::fmt;
use std::str::FromStr;

use image::{Pixel, Rgba, RgbaImage};
use log::info;
use num::clamp;

use crate::config::RenderConfig;
use crate::error::ConfigError;
use crate::histogram::{Count, HistogramSet};

/// The response curves.  `factor` controls the steepness of all but
/// `Linear`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResponseCurve {
    /// `1 - e^(-factor * x)`
    Exp,
    /// `ln(1 + factor * x)`
    Log,
    /// `sqrt(factor * x)`
    Sqrt,
    /// `x`
    Linear,
}

impl ResponseCurve {
    /// Every curve.
    pub const ALL: [ResponseCurve; 4] = [
        ResponseCurve::Exp,
        ResponseCurve::Log,
        ResponseCurve::Sqrt,
        ResponseCurve::Linear,
    ];

    /// The name the curve is selected by.
    pub fn name(self) -> &'static str {
        match self {
            ResponseCurve::Exp => "exp",
            ResponseCurve::Log => "log",
            ResponseCurve::Sqrt => "sqrt",
            ResponseCurve::Linear => "lin",
        }
    }

    /// Apply the curve to `x`.
    pub fn apply(self, x: f64, factor: f64) -> f64 {
        match self {
            ResponseCurve::Exp => -(-factor * x).exp_m1(),
            ResponseCurve::Log => (factor * x).ln_1p(),
            ResponseCurve::Sqrt => (factor * x).sqrt(),
            ResponseCurve::Linear => x,
        }
    }
}

impl Default for ResponseCurve {
    fn default() -> Self {
        ResponseCurve::Exp
    }
}

impl fmt::Display for ResponseCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResponseCurve {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s {
            "exp" => Ok(ResponseCurve::Exp),
            "log" => Ok(ResponseCurve::Log),
            "sqrt" => Ok(ResponseCurve::Sqrt),
            "lin" | "linear" => Ok(ResponseCurve::Linear),
            _ => Err(ConfigError::UnknownCurve(s.to_string())),
        }
    }
}

/// Maps the counts of one channel onto 0..=255.
#[derive(Copy, Clone, Debug)]
struct ChannelScale {
    curve: ResponseCurve,
    factor: f64,
    scale: f64,
}

impl ChannelScale {
    fn new(curve: ResponseCurve, factor: f64, exposure: f64, max: Count) -> Self {
        let top = curve.apply(max as f64, factor);
        let scale = if max == 0 || top <= 0.0 {
            0.0
        } else {
            255.0 * exposure / top
        };
        ChannelScale { curve, factor, scale }
    }

    fn value(&self, count: Count) -> u8 {
        if count == 0 || self.scale == 0.0 {
            return 0;
        }
        clamp(self.curve.apply(count as f64, self.factor) * self.scale, 0.0, 255.0) as u8
    }
}

/// Turn the histograms into an opaque image of the same size.  Red,
/// green and blue come from channels 0, 1 and 2, each scaled against
/// its own maximum.  Cells no orbit visited stay black.
pub fn compose(set: &HistogramSet, config: &RenderConfig) -> RgbaImage {
    let maxima = [set.channel(0).max(), set.channel(1).max(), set.channel(2).max()];
    info!("[i] Visitations: {} {} {}", maxima[0], maxima[1], maxima[2]);
    info!(
        "[i] Function: {}, factor: {:.2}, exposure: {:.2}",
        config.curve, config.factor, config.exposure
    );
    let scales: Vec<ChannelScale> = maxima
        .iter()
        .map(|&max| ChannelScale::new(config.curve, config.factor, config.exposure, max))
        .collect();

    let (width, height) = (set.width(), set.height());
    let mut img = RgbaImage::from_pixel(width as u32, height as u32, Rgba::from_channels(0, 0, 0, 255));
    let (r, g, b) = (set.channel(0).cells(), set.channel(1).cells(), set.channel(2).cells());
    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            if r[i] == 0 && g[i] == 0 && b[i] == 0 {
                continue;
            }
            img.put_pixel(
                x as u32,
                y as u32,
                Rgba::from_channels(scales[0].value(r[i]), scales[1].value(g[i]), scales[2].value(b[i]), 255),
            );
        }
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planes::{Pixel as Cell, PixelHit};

    fn config(curve: ResponseCurve, factor: f64, exposure: f64) -> RenderConfig {
        RenderConfig {
            curve,
            factor,
            exposure,
            ..RenderConfig::sized(4, 4)
        }
    }

    fn set() -> HistogramSet {
        let mut set = HistogramSet::new(4, 4);
        // Red: (0,0) x4, (1,0) x1.  Green: (1,0) x2.  Blue: (3,3) x1.
        set.accumulate(&PixelHit {
            pixels: vec![Cell(0, 0), Cell(0, 0), Cell(0, 0), Cell(0, 0), Cell(1, 0)],
            escaped_at: 30,
            channels: [true, false, false],
        });
        set.accumulate(&PixelHit {
            pixels: vec![Cell(1, 0), Cell(1, 0)],
            escaped_at: 300,
            channels: [false, true, false],
        });
        set.accumulate(&PixelHit {
            pixels: vec![Cell(3, 3)],
            escaped_at: 3000,
            channels: [false, false, true],
        });
        set
    }

    #[test]
    fn curve_names_round_trip() {
        for &curve in ResponseCurve::ALL.iter() {
            assert_eq!(curve.name().parse::<ResponseCurve>(), Ok(curve));
        }
        assert_eq!("linear".parse::<ResponseCurve>(), Ok(ResponseCurve::Linear));
        assert_eq!(
            "cubic".parse::<ResponseCurve>(),
            Err(ConfigError::UnknownCurve("cubic".to_string()))
        );
    }

    #[test]
    fn curves_match_their_formulas() {
        let x = 0.3;
        let factor = 10.0;
        let close = |a: f64, b: f64| (a - b).abs() < 1e-12;
        assert!(close(ResponseCurve::Exp.apply(x, factor), 1.0 - (-3.0f64).exp()));
        assert!(close(ResponseCurve::Log.apply(x, factor), 4.0f64.ln()));
        assert!(close(ResponseCurve::Sqrt.apply(x, factor), 3.0f64.sqrt()));
        assert!(close(ResponseCurve::Linear.apply(x, factor), 0.3));
        for &curve in ResponseCurve::ALL.iter() {
            assert_eq!(curve.apply(0.0, factor), 0.0);
        }
    }

    #[test]
    fn linear_scaling_against_channel_maximum() {
        let img = compose(&set(), &config(ResponseCurve::Linear, 1.0, 1.0));
        assert_eq!(img.get_pixel(0, 0).channels(), &[255, 0, 0, 255]);
        // 1/4 of red's maximum; all of green's.
        assert_eq!(img.get_pixel(1, 0).channels(), &[63, 255, 0, 255]);
        assert_eq!(img.get_pixel(3, 3).channels(), &[0, 0, 255, 255]);
    }

    #[test]
    fn unvisited_cells_are_opaque_black() {
        let img = compose(&set(), &config(ResponseCurve::Log, 10.0, 3.0));
        assert_eq!(img.dimensions(), (4, 4));
        assert_eq!(img.get_pixel(2, 2).channels(), &[0, 0, 0, 255]);
        assert_eq!(img.get_pixel(0, 3).channels(), &[0, 0, 0, 255]);
    }

    #[test]
    fn exposure_saturates() {
        let img = compose(&set(), &config(ResponseCurve::Sqrt, 1.0, 3.0));
        // sqrt(1)/sqrt(4) * 255 * 3 = 382.5, clamped.
        assert_eq!(img.get_pixel(1, 0).channels()[0], 255);
        let img = compose(&set(), &config(ResponseCurve::Sqrt, 1.0, 1.0));
        assert_eq!(img.get_pixel(1, 0).channels()[0], 127);
    }

    #[test]
    fn empty_histograms_compose_to_black() {
        let img = compose(&HistogramSet::new(2, 2), &config(ResponseCurve::Exp, 10.0, 3.0));
        for pixel in img.pixels() {
            assert_eq!(pixel.channels(), &[0, 0, 0, 255]);
        }
    }

    #[test]
    fn compose_is_repeatable() {
        let set = set();
        for &curve in ResponseCurve::ALL.iter() {
            let config = config(curve, 10.0, 3.0);
            let first = compose(&set, &config);
            let second = compose(&set, &config);
            assert_eq!(first.into_raw(), second.into_raw());
        }
    }
}
