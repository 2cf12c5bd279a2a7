//! Domain boundaries: periodic axes and reflecting planes

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::particle::Particle;
use crate::wrap_periodic;

/// Boundary behaviour along one axis
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Periodicity {
    /// Particles may leave the domain freely
    #[default]
    Open,
    /// Coordinates wrap into `[min, max)`
    Periodic { min: f64, max: f64 },
}

impl Periodicity {
    pub fn is_periodic(self) -> bool {
        matches!(self, Periodicity::Periodic { .. })
    }

    /// Length of the periodic interval (0 when open)
    pub fn extent(self) -> f64 {
        match self {
            Periodicity::Open => 0.0,
            Periodicity::Periodic { min, max } => max - min,
        }
    }

    /// Shifts at which ghost images of the domain are searched
    pub fn image_shifts(self) -> Vec<f64> {
        match self {
            Periodicity::Open => vec![0.0],
            Periodicity::Periodic { .. } => {
                let extent = self.extent();
                vec![-extent, 0.0, extent]
            }
        }
    }

    #[inline]
    pub fn wrap(self, x: f64) -> f64 {
        match self {
            Periodicity::Open => x,
            Periodicity::Periodic { min, max } => wrap_periodic(x, min, max),
        }
    }
}

/// A reflecting line, orthogonal to `offset` and passing through it
///
/// With `toward_origin` set the origin side is inside the domain (a lid at
/// `y = 0.9` is `offset = (0, 0.9)`); otherwise the far side is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub offset: DVec2,
    pub toward_origin: bool,
}

impl Reflection {
    /// Lid that keeps particles on the origin side of `offset`
    pub fn to_origin(offset: DVec2) -> Self {
        Self {
            offset,
            toward_origin: true,
        }
    }

    /// Wall that keeps particles on the far side of `offset`
    pub fn from_origin(offset: DVec2) -> Self {
        Self {
            offset,
            toward_origin: false,
        }
    }

    /// Unit normal pointing into the allowed half-plane
    pub fn inward_normal(&self) -> DVec2 {
        let n = self.offset.normalize_or_zero();
        if self.toward_origin { -n } else { n }
    }

    /// Signed distance of `pos` from the line, positive inside
    pub fn signed_distance(&self, pos: DVec2) -> f64 {
        (pos - self.offset).dot(self.inward_normal())
    }

    /// Clamp a particle that crossed the line back onto it and reverse its
    /// velocity component along the normal
    pub fn apply(&self, particle: &mut Particle) -> bool {
        let n = self.inward_normal();
        let depth = self.signed_distance(particle.pos);
        if depth >= 0.0 {
            return false;
        }
        particle.pos -= n * depth;
        let vn = particle.vel.dot(n);
        if vn < 0.0 {
            particle.vel -= 2.0 * vn * n;
        }
        true
    }
}

/// All boundary conditions of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Boundaries {
    #[serde(default)]
    pub x: Periodicity,
    #[serde(default)]
    pub y: Periodicity,
    #[serde(default)]
    pub reflections: Vec<Reflection>,
}

impl Boundaries {
    /// Wrap periodic coordinates, then resolve reflections
    pub fn apply(&self, particle: &mut Particle) {
        particle.pos.x = self.x.wrap(particle.pos.x);
        particle.pos.y = self.y.wrap(particle.pos.y);
        for reflection in &self.reflections {
            reflection.apply(particle);
        }
    }
}
