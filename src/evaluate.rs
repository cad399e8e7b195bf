// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape evaluator.  Given a seed `c`, iterate `z = z*z + c`
//! from zero and record where `z` goes.  Only orbits that escape are
//! interesting to the Buddhabrot; everything else comes back empty.

use num::{Complex, Zero};

/// A single point on the complex plane.
pub type ComplexPoint = Complex<f64>;

/// The visited points of one seed's orbit, in order.  Non-empty only
/// if the orbit escaped, in which case it ends with the first point
/// outside the bailout radius.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Orbit {
    points: Vec<ComplexPoint>,
    escaped_at: u64,
}

impl Orbit {
    /// An empty orbit with room for `capacity` points.
    pub fn with_capacity(capacity: usize) -> Self {
        Orbit {
            points: Vec::with_capacity(capacity),
            escaped_at: 0,
        }
    }

    /// The visited points.
    pub fn points(&self) -> &[ComplexPoint] {
        &self.points
    }

    /// The number of iterations completed before escaping; zero if
    /// the orbit never escaped.
    pub fn escaped_at(&self) -> u64 {
        self.escaped_at
    }

    /// Number of points in the orbit.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True for orbits that never escaped.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn clear(&mut self) {
        self.points.clear();
        self.escaped_at = 0;
    }
}

/// Why an evaluation ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fate {
    /// Left the bailout radius on this iteration.
    Escaped(u64),
    /// Lies in the main cardioid or the period-2 bulb.
    InBulb,
    /// Came back exactly to a checkpoint on this iteration.
    Periodic(u64),
    /// Still bounded when the iteration cap ran out.
    Bounded,
}

const D4: f64 = 1.0 / 4.0;
const D16: f64 = D4 / 4.0;

/// True if `c` lies strictly inside the main cardioid or the period-2
/// bulb.  Points there never escape, so there's no point iterating
/// them.  A false answer promises nothing.
pub fn is_in_bulb(c: ComplexPoint) -> bool {
    let y = c.im * c.im;
    let x = c.re - D4;
    let q = x * x + y;
    q * (q + x) < y * D4 || (c.re + 1.0) * (c.re + 1.0) + y < D16
}

/// Evaluate `seed`, returning its orbit if it escapes within
/// `max_iterations`, or an empty orbit if it doesn't.  `bailout` is the
/// squared escape radius.
pub fn evaluate(seed: ComplexPoint, max_iterations: u64, bailout: f64) -> Orbit {
    let mut orbit = Orbit::default();
    evaluate_into(seed, max_iterations, bailout, &mut orbit);
    orbit
}

/// As `evaluate`, but reuses `orbit`'s storage.  The previous contents
/// are discarded.
pub fn evaluate_into(seed: ComplexPoint, max_iterations: u64, bailout: f64, orbit: &mut Orbit) -> Fate {
    orbit.clear();
    if is_in_bulb(seed) {
        return Fate::InBulb;
    }
    iterate(seed, max_iterations, bailout, orbit)
}

/// The classic iteration, with Brent-style cycle detection: the orbit
/// is checkpointed at every power-of-two iteration, and returning to
/// a checkpoint exactly means it is periodic.  The initial checkpoint
/// is z = 0, which is on every orbit.
fn iterate(seed: ComplexPoint, max_iterations: u64, bailout: f64, orbit: &mut Orbit) -> Fate {
    let mut z = ComplexPoint::zero();
    let mut saved = z;
    for i in 1..=max_iterations {
        z = z * z + seed;
        if z == saved {
            orbit.clear();
            return Fate::Periodic(i);
        }
        if i.is_power_of_two() {
            saved = z;
        }
        orbit.points.push(z);
        if z.norm_sqr() >= bailout {
            orbit.escaped_at = i;
            return Fate::Escaped(i);
        }
    }
    orbit.clear();
    Fate::Bounded
}
