//! Initial placement of new nodes on the canvas
//!
//! Points are drawn uniformly over the area of a disk: the angle is uniform
//! on [0, 2π) and the radius is `sqrt(u) * max_radius` with `u` uniform on
//! [0, 1). The square root keeps the areal density constant; a plain uniform
//! radius would crowd points near the center.

use super::node::Position;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;
use std::sync::Mutex;

/// Sample a point uniformly from the disk of `max_radius` around `center`.
///
/// A non-positive or non-finite radius yields the center itself.
pub fn sample_in_disk<R: Rng + ?Sized>(rng: &mut R, center: Position, max_radius: f64) -> Position {
    if !(max_radius.is_finite() && max_radius > 0.0) {
        return center;
    }
    let theta = rng.gen_range(0.0..TAU);
    let r = rng.gen::<f64>().sqrt() * max_radius;
    Position::new(center.x + r * theta.cos(), center.y + r * theta.sin())
}

/// Position generator for newly created nodes
pub struct SpatialPlacer {
    rng: Mutex<StdRng>,
    default_radius: f64,
}

impl SpatialPlacer {
    /// Placer seeded from OS entropy
    pub fn new(default_radius: f64) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            default_radius,
        }
    }

    /// Deterministic placer
    pub fn with_seed(default_radius: f64, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            default_radius,
        }
    }

    /// Radius used by [`place_default`](Self::place_default)
    pub fn default_radius(&self) -> f64 {
        self.default_radius
    }

    /// Sample a position within `max_radius` of `center`
    pub fn place(&self, center: Position, max_radius: f64) -> Position {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        sample_in_disk(&mut *rng, center, max_radius)
    }

    /// Sample a position within the default radius of `center`
    pub fn place_default(&self, center: Position) -> Position {
        self.place(center, self.default_radius)
    }
}

impl Default for SpatialPlacer {
    fn default() -> Self {
        Self::new(300.0)
    }
}
