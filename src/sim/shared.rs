//! Mutex-guarded simulation handle for concurrent readers
//!
//! Each `step()` holds the lock for its whole duration, so readers only ever
//! observe the state between two steps.

use std::sync::{Arc, Mutex, MutexGuard};

use glam::DVec2;
use serde::Serialize;

use super::config::SimulationConfig;
use super::diagnostics::Diagnostics;
use super::step::Simulation;
use crate::error::{Error, Result};

/// Read-only copy of the observable particle state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub step: u64,
    pub time: f64,
    pub ids: Vec<u32>,
    pub positions: Vec<DVec2>,
    pub densities: Vec<f64>,
    pub smoothing_lengths: Vec<f64>,
}

impl Snapshot {
    pub fn of(sim: &Simulation) -> Self {
        let ps = sim.particles();
        Self {
            step: sim.step_count(),
            time: sim.time(),
            ids: ps.iter().map(|p| p.id).collect(),
            positions: ps.iter().map(|p| p.pos).collect(),
            densities: ps.iter().map(|p| p.rho).collect(),
            smoothing_lengths: ps.iter().map(|p| p.smoothing_length()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Cloneable handle to a simulation shared between threads
#[derive(Clone)]
pub struct SharedSimulation {
    inner: Arc<Mutex<Simulation>>,
}

impl SharedSimulation {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        Ok(Self::from(Simulation::new(config)?))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Simulation>> {
        self.inner.lock().map_err(|_| Error::LockPoisoned)
    }

    /// Advance one step under the lock
    pub fn step(&self) -> Result<()> {
        self.lock()?.step();
        Ok(())
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot::of(&*self.lock()?))
    }

    pub fn diagnostics(&self) -> Result<Diagnostics> {
        Ok(self.lock()?.diagnostics())
    }

    /// Run `f` with exclusive access
    pub fn with<R>(&self, f: impl FnOnce(&mut Simulation) -> R) -> Result<R> {
        Ok(f(&mut *self.lock()?))
    }
}

impl From<Simulation> for SharedSimulation {
    fn from(sim: Simulation) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sim)),
        }
    }
}
