#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Buddhabrot renderer
//!
//! The Buddhabrot (and the Nebulabrot) are variants of the Mandelbrot
//! set that explore "what's in the black heart" of the Mandelbrot.
//! The Mandelbrot takes a point on the complex plane and repeatedly
//! multiplies it by itself, measuring how quickly that number goes to
//! infinity.  This "velocity" is the number used to render the image.
//!
//! The Buddhabrot turns that around.  Each iteration creates a new
//! complex number that itself may be used as a coordinate on the
//! complex plane.  By picking a great many random seeds, following
//! the ones that escape, mapping every point of their orbits to the
//! nearest pixel and incrementing that pixel by one, we get a map of
//! where escaping orbits like to go.  Splitting the orbits by length
//! into three histograms, and toning each into one of red, green and
//! blue, gives the Nebulabrot.
//!
//! The pieces, in pipeline order:
//!
//! * [`sampler`] draws seeds;
//! * [`evaluate`] follows a seed's orbit until it escapes, cycles, or
//!   runs out of iterations;
//! * [`planes`] maps the orbit onto pixels and picks its channels;
//! * [`histogram`] counts the visits;
//! * [`tone`] turns the counts into an image.
//!
//! [`render`] runs the first four on a pool of threads, and
//! [`snapshot`] saves and restores the counts.  [`escape`] draws the
//! ordinary escape-time Mandelbrot through the same camera.

pub mod config;
pub mod error;
pub mod escape;
pub mod evaluate;
pub mod histogram;
pub mod planes;
pub mod render;
pub mod sampler;
pub mod snapshot;
pub mod tone;

pub use config::{ChannelRange, RenderConfig, SampleRegion, SamplingMode, CHANNELS};
pub use error::{ConfigError, Error, SnapshotError};
pub use escape::{render_escape, Palette};
pub use evaluate::{evaluate, ComplexPoint, Orbit};
pub use histogram::{Histogram, HistogramSet};
pub use planes::{Pixel, PixelHit, PlaneMapper};
pub use render::{accumulate, accumulate_from, render};
pub use tone::{compose, ResponseCurve};
