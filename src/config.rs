// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The parameters by which a buddhabrot is generated.  Once a
//! `RenderConfig` has been validated it is only ever read.

use num::Complex;

use crate::error::ConfigError;
use crate::evaluate::ComplexPoint;
use crate::tone::ResponseCurve;

/// The number of color channels, and therefore histograms.
pub const CHANNELS: usize = 3;

/// The rectangle of the complex plane from which seeds are drawn.  No
/// escaping orbit can start outside [-2,2]x[-2,2], so that is the
/// default.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SampleRegion {
    /// Lower-left corner.
    pub min: ComplexPoint,
    /// Upper-right corner.
    pub max: ComplexPoint,
}

impl SampleRegion {
    /// A region from its lower-left and upper-right corners.
    pub fn new(min: ComplexPoint, max: ComplexPoint) -> Self {
        SampleRegion { min, max }
    }

    /// Extent along the real axis.
    pub fn width(&self) -> f64 {
        self.max.re - self.min.re
    }

    /// Extent along the imaginary axis.
    pub fn height(&self) -> f64 {
        self.max.im - self.min.im
    }

    fn is_valid(&self) -> bool {
        self.width() > 0.0 && self.height() > 0.0 && self.width().is_finite() && self.height().is_finite()
    }
}

impl Default for SampleRegion {
    fn default() -> Self {
        SampleRegion::new(Complex::new(-2.0, -2.0), Complex::new(2.0, 2.0))
    }
}

/// An inclusive range of orbit lengths routed to one color channel.
/// Only every `stride`th length inside the range counts; a stride of
/// one accepts all of them.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChannelRange {
    /// Shortest orbit accepted.
    pub low: u64,
    /// Longest orbit accepted.
    pub high: u64,
    /// Accept only lengths divisible by this.
    pub stride: u64,
}

impl ChannelRange {
    /// Every length from `low` to `high`, inclusive.
    pub fn new(low: u64, high: u64) -> Self {
        ChannelRange { low, high, stride: 1 }
    }

    /// The same range, thinned to multiples of `stride`.
    pub fn with_stride(self, stride: u64) -> Self {
        ChannelRange { stride, ..self }
    }

    /// Does an orbit of length `escaped_at` belong to this channel?
    pub fn contains(&self, escaped_at: u64) -> bool {
        escaped_at >= self.low && escaped_at <= self.high && escaped_at % self.stride == 0
    }

    fn is_valid(&self) -> bool {
        self.low <= self.high && self.stride > 0
    }
}

/// How the seeds are chosen.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SamplingMode {
    /// Uniformly at random over the region.
    Random,
    /// A regular lattice over the region.
    Grid,
}

/// Everything a render needs.  There is no other process-wide state.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    /// Output width in pixels.
    pub width: usize,
    /// Output height in pixels.
    pub height: usize,
    /// Pixels per unit of the complex plane.
    pub zoom: f64,
    /// Added to every orbit point before scaling; moves the camera.
    pub offset: ComplexPoint,
    /// The squared bailout radius.
    pub bailout: f64,
    /// Orbits that survive this many iterations are treated as bounded.
    pub max_iterations: u64,
    /// Total number of seeds to evaluate.
    pub samples: u64,
    /// Number of sampling threads.
    pub workers: usize,
    /// Number of accumulating threads, each owning a band of rows.
    pub shards: usize,
    /// Hits each accumulator's queue holds before its producers block.
    pub queue_depth: usize,
    /// Tone mapping response curve.
    pub curve: ResponseCurve,
    /// Steepness of the response curve.
    pub factor: f64,
    /// Overall brightness.
    pub exposure: f64,
    /// Orbits shorter than this are discarded outright.
    pub min_orbit_len: u64,
    /// Which orbit lengths feed which channel.  Ranges may overlap.
    pub channels: [ChannelRange; CHANNELS],
    /// Where seeds come from.
    pub region: SampleRegion,
    /// How seeds are drawn from the region.
    pub sampling: SamplingMode,
    /// Seed for the worker generators; entropy when absent.
    pub seed: Option<u64>,
}

impl RenderConfig {
    /// A default configuration for an image of the given size, with the
    /// zoom chosen so that the whole set fits.
    pub fn sized(width: usize, height: usize) -> Self {
        RenderConfig {
            width,
            height,
            zoom: (width.min(height) as f64) / 2.8,
            ..RenderConfig::default()
        }
    }

    /// Reject anything that can't be rendered.  Called before any work
    /// begins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyImage(self.width, self.height));
        }
        if self.samples == 0 {
            return Err(ConfigError::NoSamples);
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.shards == 0 {
            return Err(ConfigError::NoShards);
        }
        if self.queue_depth == 0 {
            return Err(ConfigError::NoQueue);
        }
        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            return Err(ConfigError::BadZoom(self.zoom));
        }
        if !(self.bailout.is_finite() && self.bailout > 0.0) {
            return Err(ConfigError::BadBailout(self.bailout));
        }
        if !(self.factor.is_finite() && self.factor > 0.0) {
            return Err(ConfigError::BadFactor(self.factor));
        }
        if !(self.exposure.is_finite() && self.exposure >= 0.0) {
            return Err(ConfigError::BadExposure(self.exposure));
        }
        if let Some(channel) = self.channels.iter().position(|c| !c.is_valid()) {
            return Err(ConfigError::BadChannelRange(channel));
        }
        if !self.region.is_valid() {
            return Err(ConfigError::BadRegion);
        }
        // A cell is hit at most once per iteration of every sample.
        if self.samples.checked_mul(self.max_iterations).is_none() {
            return Err(ConfigError::CounterOverflow(self.samples, self.max_iterations));
        }
        Ok(())
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            width: 1024,
            height: 1024,
            zoom: 1024.0 / 2.8,
            offset: Complex::new(0.4, 0.0),
            bailout: 4.0,
            max_iterations: 20_000,
            samples: 2_000_000,
            workers: num_cpus::get(),
            shards: 1,
            queue_depth: 1024,
            curve: ResponseCurve::Exp,
            factor: 10.0,
            exposure: 3.0,
            min_orbit_len: 20,
            channels: [
                ChannelRange::new(2_000, u64::max_value()),
                ChannelRange::new(200, 1_999),
                ChannelRange::new(20, 199),
            ],
            region: SampleRegion::default(),
            sampling: SamplingMode::Random,
            seed: None,
        }
    }
}
