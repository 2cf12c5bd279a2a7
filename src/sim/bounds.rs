//! Bounding spheres for every tree cell
//!
//! Spheres are only used to prune the neighbour search, so they may be loose
//! but must never be smaller than the true extent of a cell's particles.

use glam::DVec2;

use super::particle::Particle;
use super::tree::Cell;
use crate::consts::SPHERE_SLACK;

/// A circle enclosing a set of points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: DVec2,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: DVec2, radius: f64) -> Self {
        Self { center, radius }
    }

    #[inline]
    pub fn contains(&self, point: DVec2, eps: f64) -> bool {
        self.center.distance(point) <= self.radius + eps
    }

    /// Ritter's approximate enclosing sphere
    ///
    /// Seeds with the farthest pair (n is at most a leaf's capacity), then
    /// grows once for every point left outside.
    pub fn ritter(points: impl Iterator<Item = DVec2> + Clone) -> Self {
        let mut first = None;
        let mut max_d2 = -1.0;
        let (mut a, mut b) = (DVec2::ZERO, DVec2::ZERO);
        for p in points.clone() {
            first.get_or_insert(p);
            for q in points.clone() {
                let d2 = p.distance_squared(q);
                if d2 > max_d2 {
                    max_d2 = d2;
                    a = p;
                    b = q;
                }
            }
        }
        if first.is_none() {
            return Self::new(DVec2::ZERO, 0.0);
        }

        let mut center = (a + b) * 0.5;
        let mut radius = 0.5 * a.distance(b);
        for p in points {
            let d = center.distance(p);
            if d > radius {
                let grown = 0.5 * (radius + d);
                center += (p - center) * ((grown - radius) / d);
                radius = grown;
            }
        }
        Self::new(center, radius)
    }

    /// Smallest sphere on the line through both centers enclosing both
    pub fn merge(a: Sphere, b: Sphere) -> Self {
        let d = a.center.distance(b.center);
        if d + b.radius <= a.radius {
            return a;
        }
        if d + a.radius <= b.radius {
            return b;
        }
        let radius = 0.5 * (a.radius + b.radius + d);
        // d > 0 here, otherwise one sphere would contain the other
        let center = a.center + (b.center - a.center) * ((radius - a.radius) / d);
        Self::new(center, radius * (1.0 + SPHERE_SLACK))
    }
}

impl Cell {
    /// Current bounding sphere
    #[inline]
    pub fn sphere(&self) -> Sphere {
        Sphere::new(self.center, self.radius)
    }

    /// Attach bounding spheres bottom-up to this cell and all descendants
    pub fn bounding_spheres(&mut self, particles: &[Particle]) {
        let sphere = if self.is_leaf() {
            let leaf = &particles[self.range.clone()];
            let mut sphere = Sphere::ritter(leaf.iter().map(|p| p.pos));
            // Absorb rounding from the incremental growth
            let extent = leaf
                .iter()
                .map(|p| sphere.center.distance(p.pos))
                .fold(0.0, f64::max);
            sphere.radius = sphere.radius.max(extent);
            sphere
        } else {
            if let Some(lower) = self.lower.as_deref_mut() {
                lower.bounding_spheres(particles);
            }
            if let Some(upper) = self.upper.as_deref_mut() {
                upper.bounding_spheres(particles);
            }
            match (self.lower.as_deref(), self.upper.as_deref()) {
                (Some(lower), Some(upper)) => Sphere::merge(lower.sphere(), upper.sphere()),
                (Some(only), None) | (None, Some(only)) => only.sphere(),
                (None, None) => unreachable!("internal cell without children"),
            }
        };
        self.center = sphere.center;
        self.radius = sphere.radius;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::tree::Axis;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    const EPS: f64 = 1e-9;

    fn uniform(n: usize, seed: u64) -> Vec<Particle> {
        let mut rng = Pcg32::seed_from_u64(seed);
        (0..n)
            .map(|_| Particle::at(DVec2::new(rng.random(), rng.random())))
            .collect()
    }

    fn check_cell(cell: &Cell, particles: &[Particle]) {
        for p in &particles[cell.range.clone()] {
            assert!(
                cell.sphere().contains(p.pos, EPS),
                "particle {:?} outside sphere {:?}",
                p.pos,
                cell.sphere()
            );
        }
        for child in cell.children() {
            check_cell(child, particles);
        }
    }

    #[test]
    fn test_ritter_two_points() {
        let s = Sphere::ritter([DVec2::ZERO, DVec2::new(2.0, 0.0)].into_iter());
        assert!((s.center - DVec2::new(1.0, 0.0)).length() < 1e-12);
        assert!((s.radius - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ritter_grows_for_outlier() {
        // Farthest pair spans the x axis; (1, 1.5) sits outside that circle
        let points = [
            DVec2::new(0.0, 0.0),
            DVec2::new(2.0, 0.0),
            DVec2::new(1.0, 1.5),
            DVec2::new(1.0, -0.2),
        ];
        let s = Sphere::ritter(points.into_iter());
        for p in points {
            assert!(s.contains(p, EPS));
        }
    }

    #[test]
    fn test_ritter_single_and_empty() {
        let s = Sphere::ritter([DVec2::new(0.3, 0.4)].into_iter());
        assert_eq!(s.radius, 0.0);
        assert_eq!(s.center, DVec2::new(0.3, 0.4));
        let s = Sphere::ritter(std::iter::empty());
        assert_eq!(s.radius, 0.0);
    }

    #[test]
    fn test_merge_disjoint() {
        let a = Sphere::new(DVec2::ZERO, 1.0);
        let b = Sphere::new(DVec2::new(4.0, 0.0), 1.0);
        let m = Sphere::merge(a, b);
        assert!((m.radius - 3.0).abs() < 1e-9);
        assert!((m.center - DVec2::new(2.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn test_merge_nested_keeps_outer() {
        let outer = Sphere::new(DVec2::ZERO, 10.0);
        let inner = Sphere::new(DVec2::new(1.0, 0.0), 1.0);
        assert_eq!(Sphere::merge(outer, inner), outer);
        assert_eq!(Sphere::merge(inner, outer), outer);
    }

    #[test]
    fn test_merge_encloses_both() {
        let a = Sphere::new(DVec2::new(0.1, 0.2), 0.3);
        let b = Sphere::new(DVec2::new(0.5, -0.1), 0.05);
        let m = Sphere::merge(a, b);
        assert!(m.center.distance(a.center) + a.radius <= m.radius + EPS);
        assert!(m.center.distance(b.center) + b.radius <= m.radius + EPS);
    }

    #[test]
    fn test_every_particle_inside_its_cells() {
        let mut ps = uniform(1000, 42);
        let mut root = Cell::build(&mut ps, Axis::Y, 0.5);
        root.bounding_spheres(&ps);
        check_cell(&root, &ps);
        for p in &ps {
            assert!(root.sphere().contains(p.pos, EPS));
        }
    }

    #[test]
    fn test_coincident_particles_have_zero_radius() {
        let mut ps = vec![Particle::at(DVec2::new(0.5, 0.5)); 40];
        let mut root = Cell::build(&mut ps, Axis::Y, 0.5);
        root.bounding_spheres(&ps);
        assert_eq!(root.radius, 0.0);
        assert_eq!(root.center, DVec2::new(0.5, 0.5));
    }
}
