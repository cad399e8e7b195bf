// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error types.  Configuration problems and unusable snapshots are
//! kept apart from each other so that a caller can tell "you asked
//! for something impossible" from "that file isn't ours."

use std::io;

use failure::Fail;

/// Everything that can be wrong with a `RenderConfig`.  All of these
/// are detected before any work begins.
#[derive(Debug, Fail, PartialEq)]
pub enum ConfigError {
    /// The output image has no pixels.
    #[fail(display = "image size must be positive, got {}x{}", _0, _1)]
    EmptyImage(usize, usize),

    /// Nothing to sample.
    #[fail(display = "the sample budget must be greater than zero")]
    NoSamples,

    /// Nobody to sample with.
    #[fail(display = "the worker count must be greater than zero")]
    NoWorkers,

    /// Nobody to accumulate with.
    #[fail(display = "the aggregator shard count must be greater than zero")]
    NoShards,

    /// Queues must hold at least one hit.
    #[fail(display = "the queue depth must be greater than zero")]
    NoQueue,

    /// Zoom must be a finite, positive scale factor.
    #[fail(display = "zoom must be finite and positive, got {}", _0)]
    BadZoom(f64),

    /// The bailout radius must be finite and positive.
    #[fail(display = "bailout radius squared must be finite and positive, got {}", _0)]
    BadBailout(f64),

    /// The response curve's steepness must be finite and positive.
    #[fail(display = "factor must be finite and positive, got {}", _0)]
    BadFactor(f64),

    /// Exposure must be finite and not negative.
    #[fail(display = "exposure must be finite and not negative, got {}", _0)]
    BadExposure(f64),

    /// The response curve selector didn't name a known curve.
    #[fail(display = "invalid color scaling function: {}", _0)]
    UnknownCurve(String),

    /// The palette selector didn't name a known palette.
    #[fail(display = "invalid palette: {}", _0)]
    UnknownPalette(String),

    /// A channel's iteration range is inverted, or its stride is zero.
    #[fail(display = "channel {} has an invalid iteration range", _0)]
    BadChannelRange(usize),

    /// The sampling region has no area.
    #[fail(display = "the sample region must have a positive width and height")]
    BadRegion,

    /// `samples * max_iterations` could exceed the counter type.
    #[fail(
        display = "{} samples of {} iterations could overflow a histogram cell",
        _0, _1
    )]
    CounterOverflow(u64, u64),
}

/// A snapshot that cannot be used with the current configuration.
/// None of these is ever papered over.
#[derive(Debug, Fail)]
pub enum SnapshotError {
    /// The snapshot file could not be opened.
    #[fail(display = "could not open snapshot: {}", _0)]
    Missing(#[cause] io::Error),

    /// Any other read or write failure.
    #[fail(display = "snapshot i/o failed: {}", _0)]
    Io(#[cause] io::Error),

    /// The data does not start with the snapshot magic bytes.
    #[fail(display = "incompatible snapshot: not a histogram snapshot")]
    NotASnapshot,

    /// The data ended before three full grids had been read.
    #[fail(
        display = "incompatible snapshot: expected {} bytes, found {}",
        expected, found
    )]
    Truncated {
        /// Bytes required by the configured dimensions.
        expected: u64,
        /// Bytes actually present.
        found: u64,
    },

    /// There was data left over after three full grids.
    #[fail(display = "incompatible snapshot: data continues past {} bytes", _0)]
    TrailingData(u64),

    /// The snapshot, or the histogram set being resumed, is not the
    /// shape the configuration describes.
    #[fail(
        display = "incompatible snapshot: histograms are {}x{}, configuration wants {}x{}",
        found_width, found_height, width, height
    )]
    DimensionMismatch {
        /// Configured width.
        width: usize,
        /// Configured height.
        height: usize,
        /// Width of the histograms offered.
        found_width: usize,
        /// Height of the histograms offered.
        found_height: usize,
    },
}

impl From<io::Error> for SnapshotError {
    fn from(err: io::Error) -> Self {
        SnapshotError::Io(err)
    }
}

/// The crate-level error.
#[derive(Debug, Fail)]
pub enum Error {
    /// The configuration was rejected.
    #[fail(display = "{}", _0)]
    Config(#[cause] ConfigError),

    /// A snapshot was rejected.
    #[fail(display = "{}", _0)]
    Snapshot(#[cause] SnapshotError),

    /// A worker or aggregator thread panicked.
    #[fail(display = "a render thread panicked")]
    WorkerPanicked,

    /// The image encoder failed.
    #[fail(display = "could not write image: {}", _0)]
    Image(String),
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<SnapshotError> for Error {
    fn from(err: SnapshotError) -> Self {
        Error::Snapshot(err)
    }
}
