//! Particle generation
//!
//! Start spawners run once at `t = 0`; sources are polled after every step and
//! may inject new particles. All randomness comes from per-spawner seeds.

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::particle::Particle;
use crate::error::{Error, Result};

/// Produces batches of particles
pub trait Spawner: Send {
    /// Particles to add at simulated time `time`
    fn spawn(&mut self, time: f64) -> Vec<Particle>;
}

fn default_energy() -> f64 {
    0.01
}

fn default_seed() -> u64 {
    12345678
}

/// Uniformly random particles inside an axis-aligned rectangle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformRect {
    pub lower_left: DVec2,
    pub upper_right: DVec2,
    pub count: usize,
    #[serde(default)]
    pub velocity: DVec2,
    /// Initial specific internal energy
    #[serde(default = "default_energy")]
    pub energy: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl UniformRect {
    pub fn new(lower_left: DVec2, upper_right: DVec2, count: usize, seed: u64) -> Self {
        Self {
            lower_left,
            upper_right,
            count,
            velocity: DVec2::ZERO,
            energy: default_energy(),
            seed,
        }
    }

    /// The unit square
    pub fn unit(count: usize, seed: u64) -> Self {
        Self::new(DVec2::ZERO, DVec2::ONE, count, seed)
    }

    fn validate(&self) -> Result<()> {
        let size = self.upper_right - self.lower_left;
        if !(size.x > 0.0 && size.y > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "rectangle spawner needs lower_left < upper_right, got {} .. {}",
                self.lower_left, self.upper_right
            )));
        }
        if !self.energy.is_finite() || self.energy < 0.0 {
            return Err(Error::InvalidConfig(
                "spawner energy must be finite and >= 0".into(),
            ));
        }
        Ok(())
    }
}

impl Spawner for UniformRect {
    fn spawn(&mut self, _time: f64) -> Vec<Particle> {
        let mut rng = Pcg32::seed_from_u64(self.seed);
        let size = self.upper_right - self.lower_left;
        (0..self.count)
            .map(|_| {
                let u = DVec2::new(rng.random(), rng.random());
                Particle::new(self.lower_left + u * size, self.velocity, self.energy)
            })
            .collect()
    }
}

/// Emits particles at a fixed rate from a point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSource {
    pub pos: DVec2,
    /// Particles per unit time
    pub rate: f64,
    #[serde(default)]
    pub velocity: DVec2,
    #[serde(default = "default_energy")]
    pub energy: f64,
    /// Half-width of the square the emission point is jittered in, so new
    /// particles never coincide exactly
    #[serde(default)]
    pub jitter: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(skip)]
    emitted: u64,
}

impl PointSource {
    pub fn new(pos: DVec2, rate: f64) -> Self {
        Self {
            pos,
            rate,
            velocity: DVec2::ZERO,
            energy: default_energy(),
            jitter: 0.0,
            seed: default_seed(),
            emitted: 0,
        }
    }

    /// Particles emitted so far
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn validate(&self) -> Result<()> {
        if !self.rate.is_finite() || self.rate < 0.0 {
            return Err(Error::InvalidConfig(
                "point source rate must be finite and >= 0".into(),
            ));
        }
        if !self.jitter.is_finite() || self.jitter < 0.0 {
            return Err(Error::InvalidConfig(
                "point source jitter must be finite and >= 0".into(),
            ));
        }
        Ok(())
    }
}

impl Spawner for PointSource {
    fn spawn(&mut self, time: f64) -> Vec<Particle> {
        let due = (self.rate * time.max(0.0)).floor() as u64;
        if due <= self.emitted {
            return Vec::new();
        }
        let mut rng = Pcg32::seed_from_u64(self.seed.wrapping_add(self.emitted));
        let batch = (due - self.emitted) as usize;
        self.emitted = due;
        (0..batch)
            .map(|_| {
                let jitter = if self.jitter > 0.0 {
                    DVec2::new(
                        rng.random_range(-self.jitter..self.jitter),
                        rng.random_range(-self.jitter..self.jitter),
                    )
                } else {
                    DVec2::ZERO
                };
                Particle::new(self.pos + jitter, self.velocity, self.energy)
            })
            .collect()
    }
}

/// One explicitly placed particle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleSeed {
    pub pos: DVec2,
    #[serde(default)]
    pub vel: DVec2,
    #[serde(default)]
    pub energy: f64,
}

/// Configured spawner, as stored in a [`SimulationConfig`](super::SimulationConfig)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SpawnerConfig {
    UniformRect(UniformRect),
    Point(PointSource),
    /// A literal particle list, emitted once at the first call
    Fixed {
        particles: Vec<ParticleSeed>,
        #[serde(skip)]
        done: bool,
    },
}

impl SpawnerConfig {
    pub fn fixed(particles: Vec<ParticleSeed>) -> Self {
        SpawnerConfig::Fixed {
            particles,
            done: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            SpawnerConfig::UniformRect(rect) => rect.validate(),
            SpawnerConfig::Point(point) => point.validate(),
            SpawnerConfig::Fixed { particles, .. } => {
                let finite = particles
                    .iter()
                    .all(|p| p.pos.is_finite() && p.vel.is_finite() && p.energy.is_finite());
                if finite {
                    Ok(())
                } else {
                    Err(Error::InvalidConfig("fixed particles must be finite".into()))
                }
            }
        }
    }
}

impl Spawner for SpawnerConfig {
    fn spawn(&mut self, time: f64) -> Vec<Particle> {
        match self {
            SpawnerConfig::UniformRect(rect) => rect.spawn(time),
            SpawnerConfig::Point(point) => point.spawn(time),
            SpawnerConfig::Fixed { particles, done } => {
                if *done {
                    return Vec::new();
                }
                *done = true;
                particles
                    .iter()
                    .map(|s| Particle::new(s.pos, s.vel, s.energy))
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_inside_bounds() {
        let mut rect = UniformRect::new(DVec2::new(0.2, 0.3), DVec2::new(0.4, 0.9), 500, 1);
        let ps = rect.spawn(0.0);
        assert_eq!(ps.len(), 500);
        for p in &ps {
            assert!(p.pos.x >= 0.2 && p.pos.x < 0.4);
            assert!(p.pos.y >= 0.3 && p.pos.y < 0.9);
            assert_eq!(p.e, 0.01);
            assert_eq!(p.e_pred, p.e);
        }
    }

    #[test]
    fn test_rect_is_deterministic() {
        let a = UniformRect::unit(100, 7).spawn(0.0);
        let b = UniformRect::unit(100, 7).spawn(0.0);
        let c = UniformRect::unit(100, 8).spawn(0.0);
        assert!(a.iter().zip(&b).all(|(p, q)| p.pos == q.pos));
        assert!(a.iter().zip(&c).any(|(p, q)| p.pos != q.pos));
    }

    #[test]
    fn test_rect_rejects_inverted_bounds() {
        let spawner = SpawnerConfig::UniformRect(UniformRect::new(DVec2::ONE, DVec2::ZERO, 10, 0));
        assert!(matches!(spawner.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_point_source_rate() {
        let mut src = PointSource::new(DVec2::new(0.5, 0.5), 100.0);
        assert!(src.spawn(0.0).is_empty());
        assert_eq!(src.spawn(0.05).len(), 5);
        assert!(src.spawn(0.055).is_empty());
        assert_eq!(src.spawn(0.1).len(), 5);
        assert_eq!(src.emitted(), 10);
    }

    #[test]
    fn test_point_source_jitter_bounded() {
        let mut src = PointSource::new(DVec2::new(0.5, 0.5), 1000.0);
        src.jitter = 0.01;
        let ps = src.spawn(1.0);
        assert_eq!(ps.len(), 1000);
        for p in &ps {
            assert!((p.pos - src.pos).abs().max_element() <= 0.01);
        }
        assert!(ps.windows(2).any(|w| w[0].pos != w[1].pos));
    }

    #[test]
    fn test_fixed_spawns_once() {
        let mut spawner = SpawnerConfig::fixed(vec![ParticleSeed {
            pos: DVec2::new(0.1, 0.2),
            vel: DVec2::X,
            energy: 0.5,
        }]);
        let first = spawner.spawn(0.0);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].vel, DVec2::X);
        assert!(spawner.spawn(1.0).is_empty());
    }

    #[test]
    fn test_spawner_json() {
        let json = r#"{"kind":"uniform_rect","lower_left":[0.0,0.0],"upper_right":[1.0,1.0],"count":10}"#;
        let spawner: SpawnerConfig = serde_json::from_str(json).unwrap();
        match spawner {
            SpawnerConfig::UniformRect(rect) => {
                assert_eq!(rect.count, 10);
                assert_eq!(rect.energy, 0.01);
                assert_eq!(rect.seed, 12345678);
            }
            other => panic!("unexpected spawner {other:?}"),
        }
    }
}
