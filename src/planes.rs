// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the PlaneMapper struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0,
//! and the complex plane as seen through a camera: a zoom factor and
//! an offset, with the origin of the complex plane (after the offset)
//! landing in the middle of the image.
//!
//! Since the Buddhabrot tracks the progress of a complex number as it
//! orbits, we have to map those complex numbers back to the pixel
//! plane, and the PlaneMapper is also where an orbit is turned into
//! the list of pixels it touched.

use crate::config::{ChannelRange, RenderConfig, CHANNELS};
use crate::evaluate::{ComplexPoint, Orbit};

/// Describes the x, y of a point on the integral plane.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pixel(pub usize, pub usize);

/// The pixels one orbit visited, tagged with the orbit's length and
/// the channels it was routed to.  Pixels outside the image have
/// already been dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelHit {
    /// Visited pixels, in orbit order.  A pixel visited twice appears
    /// twice.
    pub pixels: Vec<Pixel>,
    /// The orbit's escape iteration.
    pub escaped_at: u64,
    /// Which histograms receive these pixels.
    pub channels: [bool; CHANNELS],
}

impl PixelHit {
    /// An empty hit with the same tags as this one.
    pub fn empty_like(&self) -> Self {
        PixelHit {
            pixels: Vec::new(),
            escaped_at: self.escaped_at,
            channels: self.channels,
        }
    }
}

/// Maps orbit points onto the image and decides which channels an
/// orbit feeds.
#[derive(Clone, Debug)]
pub struct PlaneMapper {
    width: usize,
    height: usize,
    zoom: f64,
    offset: ComplexPoint,
    min_orbit_len: u64,
    channels: [ChannelRange; CHANNELS],
}

impl PlaneMapper {
    /// A mapper for the camera and channel table in `config`.
    pub fn new(config: &RenderConfig) -> Self {
        PlaneMapper {
            width: config.width,
            height: config.height,
            zoom: config.zoom,
            offset: config.offset,
            min_orbit_len: config.min_orbit_len,
            channels: config.channels,
        }
    }

    /// Given a complex number, map it to the nearest pixel, or None if
    /// that pixel is off the image.
    pub fn point_to_pixel(&self, point: &ComplexPoint) -> Option<Pixel> {
        let left = (self.zoom * (point.re + self.offset.re)).round();
        let top = (self.zoom * (point.im + self.offset.im)).round();
        if !left.is_finite() || !top.is_finite() {
            return None;
        }
        let left = left as i64 + (self.width / 2) as i64;
        let top = top as i64 + (self.height / 2) as i64;
        if left < 0 || top < 0 || left >= self.width as i64 || top >= self.height as i64 {
            return None;
        }
        Some(Pixel(left as usize, top as usize))
    }

    /// The complex number at the center of `pixel`; the inverse of
    /// `point_to_pixel`.
    pub fn pixel_to_point(&self, pixel: Pixel) -> ComplexPoint {
        let left = pixel.0 as f64 - (self.width / 2) as f64;
        let top = pixel.1 as f64 - (self.height / 2) as f64;
        ComplexPoint::new(left / self.zoom - self.offset.re, top / self.zoom - self.offset.im)
    }

    /// The channels an orbit of this length feeds, or None if it is too
    /// short or feeds none of them.
    pub fn classify(&self, escaped_at: u64) -> Option<[bool; CHANNELS]> {
        if escaped_at < self.min_orbit_len {
            return None;
        }
        let mut routed = [false; CHANNELS];
        for (slot, range) in routed.iter_mut().zip(self.channels.iter()) {
            *slot = range.contains(escaped_at);
        }
        if routed.iter().any(|&r| r) {
            Some(routed)
        } else {
            None
        }
    }

    /// Turn an orbit into the pixels it visited.  Returns None for
    /// orbits that contribute nothing: empty, too short, unrouted, or
    /// entirely off the image.
    pub fn project(&self, orbit: &Orbit) -> Option<PixelHit> {
        if orbit.is_empty() {
            return None;
        }
        let channels = self.classify(orbit.escaped_at())?;
        let pixels: Vec<Pixel> = orbit
            .points()
            .iter()
            .filter_map(|z| self.point_to_pixel(z))
            .collect();
        if pixels.is_empty() {
            return None;
        }
        Some(PixelHit {
            pixels,
            escaped_at: orbit.escaped_at(),
            channels,
        })
    }
}
