//! Run configuration
//!
//! A config is immutable for the lifetime of a [`Simulation`](super::Simulation);
//! reconfiguring means building a new one.

use std::path::Path;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::boundary::{Boundaries, Periodicity};
use super::kernel::Kernel;
use super::spawner::SpawnerConfig;
use crate::consts::*;
use crate::error::{Error, Result};

fn default_dt() -> f64 {
    0.001
}

fn default_gamma() -> f64 {
    DEFAULT_GAMMA
}

fn default_mass() -> f64 {
    1.0
}

fn default_alpha() -> f64 {
    DEFAULT_VISCOSITY_ALPHA
}

fn default_beta() -> f64 {
    DEFAULT_VISCOSITY_BETA
}

fn default_split_fraction() -> f64 {
    DEFAULT_SPLIT_FRACTION
}

/// Everything needed to set up and advance a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Global time step
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Interpolation kernel used for density and forces
    #[serde(default)]
    pub kernel: Kernel,
    /// Mass of every particle
    #[serde(default = "default_mass")]
    pub particle_mass: f64,
    /// Adiabatic index
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Uniform external acceleration (gravity)
    #[serde(default)]
    pub acceleration: DVec2,
    #[serde(default)]
    pub boundaries: Boundaries,
    /// Run once at `t = 0`
    #[serde(default)]
    pub start: Vec<SpawnerConfig>,
    /// Polled after every step
    #[serde(default)]
    pub sources: Vec<SpawnerConfig>,
    #[serde(default = "default_alpha")]
    pub viscosity_alpha: f64,
    #[serde(default = "default_beta")]
    pub viscosity_beta: f64,
    /// Where cells split between their lower and upper bound
    #[serde(default = "default_split_fraction")]
    pub split_fraction: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: default_dt(),
            kernel: Kernel::default(),
            particle_mass: default_mass(),
            gamma: default_gamma(),
            acceleration: DVec2::ZERO,
            boundaries: Boundaries::default(),
            start: Vec::new(),
            sources: Vec::new(),
            viscosity_alpha: default_alpha(),
            viscosity_beta: default_beta(),
            split_fraction: default_split_fraction(),
        }
    }
}

impl SimulationConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Periodic on both axes over `[min, max)`
    pub fn with_periodic_box(mut self, min: f64, max: f64) -> Self {
        let periodic = Periodicity::Periodic { min, max };
        self.boundaries.x = periodic;
        self.boundaries.y = periodic;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "dt must be finite and > 0, got {}",
                self.dt
            )));
        }
        if !(self.particle_mass.is_finite() && self.particle_mass > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "particle_mass must be finite and > 0, got {}",
                self.particle_mass
            )));
        }
        if !(self.gamma.is_finite() && self.gamma > 1.0) {
            return Err(Error::InvalidConfig(format!(
                "gamma must be finite and > 1, got {}",
                self.gamma
            )));
        }
        if !self.acceleration.is_finite() {
            return Err(Error::InvalidConfig("acceleration must be finite".into()));
        }
        if !(self.viscosity_alpha >= 0.0 && self.viscosity_beta >= 0.0) {
            return Err(Error::InvalidConfig(
                "viscosity coefficients must be >= 0".into(),
            ));
        }
        if !(self.split_fraction > 0.0 && self.split_fraction < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "split_fraction must lie in (0, 1), got {}",
                self.split_fraction
            )));
        }
        for (name, axis) in [("x", self.boundaries.x), ("y", self.boundaries.y)] {
            if let Periodicity::Periodic { min, max } = axis {
                if !(min.is_finite() && max.is_finite() && min < max) {
                    return Err(Error::InvalidConfig(format!(
                        "periodic {name} interval needs min < max, got [{min}, {max})"
                    )));
                }
            }
        }
        if self
            .boundaries
            .reflections
            .iter()
            .any(|r| !r.offset.is_finite() || r.offset == DVec2::ZERO)
        {
            return Err(Error::InvalidConfig(
                "reflection offsets must be finite and non-zero".into(),
            ));
        }
        if !self.kernel.has_derivative() {
            return Err(Error::UnsupportedKernel(self.kernel.name()));
        }
        if self.start.is_empty() && self.sources.is_empty() {
            return Err(Error::NoSpawners);
        }
        for spawner in self.start.iter().chain(&self.sources) {
            spawner.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::spawner::UniformRect;

    fn valid() -> SimulationConfig {
        SimulationConfig {
            start: vec![SpawnerConfig::UniformRect(UniformRect::unit(100, 1))],
            ..Default::default()
        }
    }

    #[test]
    fn test_default_with_spawner_is_valid() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_no_spawners() {
        let config = SimulationConfig::default();
        assert!(matches!(config.validate(), Err(Error::NoSpawners)));
    }

    #[test]
    fn test_bad_dt() {
        for dt in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = SimulationConfig { dt, ..valid() };
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))), "dt = {dt}");
        }
    }

    #[test]
    fn test_top_hat_rejected_for_stepping() {
        let config = SimulationConfig {
            kernel: Kernel::TopHat,
            ..valid()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::UnsupportedKernel("top-hat"))
        ));
    }

    #[test]
    fn test_inverted_periodic_interval() {
        let config = valid().with_periodic_box(1.0, 0.0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_split_fraction_range() {
        for split_fraction in [0.0, 1.0, 1.5] {
            let config = SimulationConfig {
                split_fraction,
                ..valid()
            };
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_json_defaults_fill_in() {
        let json = r#"{
            "dt": 0.01,
            "kernel": "wendland_c2",
            "boundaries": {"x": {"kind": "periodic", "min": 0.0, "max": 1.0}},
            "start": [{"kind": "uniform_rect", "lower_left": [0, 0], "upper_right": [1, 1], "count": 50}]
        }"#;
        let config = SimulationConfig::from_json_str(json).unwrap();
        assert_eq!(config.dt, 0.01);
        assert_eq!(config.kernel, Kernel::WendlandC2);
        assert_eq!(config.gamma, DEFAULT_GAMMA);
        assert_eq!(config.split_fraction, 0.5);
        assert!(config.boundaries.x.is_periodic());
        assert!(!config.boundaries.y.is_periodic());
    }

    #[test]
    fn test_json_round_trip() {
        let config = valid().with_periodic_box(0.0, 1.0);
        let json = config.to_json().unwrap();
        assert_eq!(SimulationConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SimulationConfig::from_json_str("{ dt: "),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SimulationConfig::load("/nonexistent/sph2d.json"),
            Err(Error::Io(_))
        ));
    }
}
