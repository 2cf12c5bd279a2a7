//! Leapfrog integrator
//!
//! One [`Simulation::step`] is drift(dt/2), force recompute, kick(dt),
//! drift(dt/2), boundary handling and source injection. Forces use the SPH
//! momentum and energy equations with Monaghan artificial viscosity.

use glam::DVec2;
use rayon::prelude::*;

use super::config::SimulationConfig;
use super::diagnostics::Diagnostics;
use super::kernel::Kernel;
use super::neighbors::{find_all_neighbors, image_offsets};
use super::particle::Particle;
use super::spawner::Spawner;
use super::tree::{Axis, Cell};
use crate::error::{Error, Result};

/// Integrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    /// Particles are spawned but no forces have been computed yet
    Seeded,
    /// Accelerations and energy rates describe the current particles
    Running,
}

/// A running SPH simulation
pub struct Simulation {
    particles: Vec<Particle>,
    root: Option<Cell>,
    config: SimulationConfig,
    sources: Vec<Box<dyn Spawner>>,
    offsets: Vec<DVec2>,
    step: u64,
    time: f64,
    phase: StepPhase,
    next_id: u32,
}

impl Simulation {
    /// Validate `config` and run its start spawners at `t = 0`
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let mut start = config.start.clone();
        let particles: Vec<Particle> = start.iter_mut().flat_map(|s| s.spawn(0.0)).collect();

        let sources = config
            .sources
            .iter()
            .cloned()
            .map(|s| Box::new(s) as Box<dyn Spawner>)
            .collect();
        let offsets = image_offsets(config.boundaries.x, config.boundaries.y);

        let mut sim = Self {
            particles: Vec::new(),
            root: None,
            config,
            sources,
            offsets,
            step: 0,
            time: 0.0,
            phase: StepPhase::Seeded,
            next_id: 0,
        };
        sim.replace_particles(particles)?;

        log::info!(
            "simulation ready: {} particles, kernel {}, dt {}, boundaries x={:?} y={:?}, {} reflections",
            sim.particles.len(),
            sim.config.kernel.name(),
            sim.config.dt,
            sim.config.boundaries.x,
            sim.config.boundaries.y,
            sim.config.boundaries.reflections.len()
        );
        Ok(sim)
    }

    /// Swap in a new particle array
    ///
    /// Ids are reassigned and the integrator restarts from [`StepPhase::Seeded`].
    pub fn replace_particles(&mut self, particles: Vec<Particle>) -> Result<()> {
        if particles.is_empty() {
            return Err(Error::EmptyParticleSet);
        }
        if particles.iter().any(|p| !p.pos.is_finite() || !p.vel.is_finite()) {
            return Err(Error::InvalidConfig(
                "particles must have finite position and velocity".into(),
            ));
        }
        self.particles = particles;
        for (id, p) in self.particles.iter_mut().enumerate() {
            p.id = id as u32;
        }
        self.next_id = self.particles.len() as u32;
        self.root = None;
        self.phase = StepPhase::Seeded;
        Ok(())
    }

    /// Register an extra source polled after every step
    pub fn add_source(&mut self, source: Box<dyn Spawner>) {
        self.sources.push(source);
    }

    fn next_particle_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Particles in tree order (the order changes on every rebuild)
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Tree from the latest force computation
    pub fn root(&self) -> Option<&Cell> {
        self.root.as_ref()
    }

    pub fn step_count(&self) -> u64 {
        self.step
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::compute(&self.particles, self.config.particle_mass, self.step, self.time)
    }

    /// Advance by one time step
    ///
    /// # Panics
    /// If the particle array is empty.
    pub fn step(&mut self) {
        assert!(
            !self.particles.is_empty(),
            "step() on a simulation without particles"
        );
        let dt = self.config.dt;
        let half = 0.5 * dt;

        if self.phase == StepPhase::Seeded {
            for p in &mut self.particles {
                p.vel_pred = p.vel;
                p.e_pred = p.e;
            }
            self.compute_forces();
            self.phase = StepPhase::Running;
        }

        for p in &mut self.particles {
            p.pos += p.vel * half;
            p.vel_pred = p.vel + p.acc * half;
            p.e_pred = p.e + p.e_dot * half;
        }

        self.compute_forces();

        for p in &mut self.particles {
            p.vel += p.acc * dt;
            p.e += p.e_dot * dt;
        }

        for p in &mut self.particles {
            p.pos += p.vel * half;
        }

        let boundaries = &self.config.boundaries;
        for p in &mut self.particles {
            boundaries.apply(p);
        }

        self.step += 1;
        self.time += dt;
        self.inject_sources();

        if log::log_enabled!(log::Level::Debug) {
            let d = self.diagnostics();
            log::debug!(
                "step {} t={:.5}: n={} E={:.6e} (kin {:.6e}, int {:.6e}) p=({:.3e}, {:.3e})",
                d.step,
                d.time,
                d.count,
                d.total_energy,
                d.kinetic_energy,
                d.internal_energy,
                d.momentum.x,
                d.momentum.y
            );
        }
    }

    /// Run `n` steps
    pub fn run(&mut self, n: u64) {
        for _ in 0..n {
            self.step();
        }
    }

    fn inject_sources(&mut self) {
        let time = self.time;
        let mut fresh: Vec<Particle> = self
            .sources
            .iter_mut()
            .flat_map(|s| s.spawn(time))
            .collect();
        if fresh.is_empty() {
            return;
        }
        log::trace!("step {}: {} particles injected", self.step, fresh.len());
        for p in &mut fresh {
            p.id = self.next_particle_id();
        }
        self.particles.append(&mut fresh);
    }

    /// Rebuild tree and neighbour sets, then density, sound speed and forces
    fn compute_forces(&mut self) {
        let mut root = Cell::build(&mut self.particles, Axis::Y, self.config.split_fraction);
        root.bounding_spheres(&self.particles);
        find_all_neighbors(&root, &mut self.particles, &self.offsets);

        let kernel = self.config.kernel;
        let mass = self.config.particle_mass;
        let gamma = self.config.gamma;
        self.particles.par_iter_mut().for_each(|p| {
            p.rho = kernel.density(p, mass);
            p.c = sound_speed(gamma, p.e_pred);
        });

        let law = ForceLaw {
            kernel,
            mass,
            gamma,
            alpha: self.config.viscosity_alpha,
            beta: self.config.viscosity_beta,
        };
        let rates: Vec<(DVec2, f64)> = {
            let particles = &self.particles;
            (0..particles.len())
                .into_par_iter()
                .map(|i| law.rates(particles, i))
                .collect()
        };
        let external = self.config.acceleration;
        for (p, (acc, e_dot)) in self.particles.iter_mut().zip(rates) {
            p.acc = acc + external;
            p.e_dot = e_dot;
        }

        self.root = Some(root);
    }
}

/// `c = sqrt(gamma (gamma - 1) e)`, zero for non-positive energy
#[inline]
pub fn sound_speed(gamma: f64, e: f64) -> f64 {
    (gamma * (gamma - 1.0) * e).max(0.0).sqrt()
}

/// Per-pair SPH equations for one run
#[derive(Debug, Clone, Copy)]
struct ForceLaw {
    kernel: Kernel,
    mass: f64,
    gamma: f64,
    alpha: f64,
    beta: f64,
}

impl ForceLaw {
    /// `P / rho^2`, written as `c^2 / (gamma rho)`
    #[inline]
    fn pressure_term(&self, p: &Particle) -> f64 {
        if p.rho > 0.0 {
            p.c * p.c / (self.gamma * p.rho)
        } else {
            0.0
        }
    }

    /// Monaghan viscosity, active only for approaching pairs
    #[inline]
    fn viscosity(&self, a: &Particle, b: &Particle, v_ab: DVec2, r_ab: DVec2, r: f64) -> f64 {
        let approach = v_ab.dot(r_ab);
        if approach >= 0.0 {
            return 0.0;
        }
        let w = approach / r;
        let v_sig = a.c + b.c - self.beta * w;
        let rho_bar = 0.5 * (a.rho + b.rho);
        if rho_bar > 0.0 {
            -0.5 * self.alpha * v_sig * w / rho_bar
        } else {
            0.0
        }
    }

    /// Acceleration (without the external term) and energy rate of `particles[i]`
    fn rates(&self, particles: &[Particle], i: usize) -> (DVec2, f64) {
        let a = &particles[i];
        let h = a.smoothing_length();
        if h <= 0.0 {
            return (DVec2::ZERO, 0.0);
        }
        let pa = self.pressure_term(a);

        let mut acc = DVec2::ZERO;
        let mut e_dot = 0.0;
        for n in a.neighbors.iter() {
            if n.distance == 0.0 {
                continue;
            }
            let b = &particles[n.index];
            let r_ab = a.pos - n.pos;
            let grad = r_ab * (self.kernel.dw_dr(n.distance, h) / n.distance);
            let v_ab = a.vel_pred - b.vel_pred;
            let pi_ab = self.viscosity(a, b, v_ab, r_ab, n.distance);

            acc -= self.mass * (pa + self.pressure_term(b) + pi_ab) * grad;
            e_dot += self.mass * (pa + 0.5 * pi_ab) * v_ab.dot(grad);
        }
        (acc, e_dot)
    }
}
