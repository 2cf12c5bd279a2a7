//! Conserved-quantity summaries, recomputed on demand

use glam::DVec2;
use serde::Serialize;

use super::particle::Particle;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Diagnostics {
    pub step: u64,
    pub time: f64,
    pub count: usize,
    pub kinetic_energy: f64,
    pub internal_energy: f64,
    /// Kinetic plus internal
    pub total_energy: f64,
    pub total_density: f64,
    pub momentum: DVec2,
}

impl Diagnostics {
    pub fn compute(particles: &[Particle], mass: f64, step: u64, time: f64) -> Self {
        let mut d = Diagnostics {
            step,
            time,
            count: particles.len(),
            ..Default::default()
        };
        for p in particles {
            d.kinetic_energy += mass * p.specific_kinetic_energy();
            d.internal_energy += mass * p.e;
            d.total_density += p.rho;
            d.momentum += mass * p.vel;
        }
        d.total_energy = d.kinetic_energy + d.internal_energy;
        d
    }

    /// True if no summed quantity overflowed or went NaN
    pub fn is_finite(&self) -> bool {
        self.total_energy.is_finite() && self.total_density.is_finite() && self.momentum.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sums() {
        let ps = vec![
            Particle::new(DVec2::ZERO, DVec2::new(1.0, 0.0), 0.5),
            Particle::new(DVec2::ONE, DVec2::new(-1.0, 2.0), 0.25),
        ];
        let d = Diagnostics::compute(&ps, 2.0, 3, 0.5);
        assert_eq!(d.count, 2);
        assert_eq!(d.step, 3);
        // 2 * (0.5 + 2.5)
        assert!((d.kinetic_energy - 6.0).abs() < 1e-12);
        assert!((d.internal_energy - 1.5).abs() < 1e-12);
        assert!((d.total_energy - 7.5).abs() < 1e-12);
        assert_eq!(d.momentum, DVec2::new(0.0, 4.0));
        assert!(d.is_finite());
    }

    #[test]
    fn test_empty() {
        let d = Diagnostics::compute(&[], 1.0, 0, 0.0);
        assert_eq!(d.count, 0);
        assert_eq!(d.total_energy, 0.0);
    }
}
