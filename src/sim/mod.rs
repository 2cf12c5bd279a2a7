//! Deterministic simulation module
//!
//! Everything that advances the particle state lives here:
//! - Fixed global timestep only
//! - Seeded RNG only (inside spawners)
//! - Parallel loops write results back in index order
//! - No I/O

pub mod boundary;
pub mod bounds;
pub mod config;
pub mod diagnostics;
pub mod kernel;
pub mod neighbors;
pub mod particle;
pub mod shared;
pub mod spawner;
pub mod step;
pub mod tree;

pub use boundary::{Boundaries, Periodicity, Reflection};
pub use bounds::Sphere;
pub use config::SimulationConfig;
pub use diagnostics::Diagnostics;
pub use kernel::Kernel;
pub use neighbors::{find_all_neighbors, find_neighbors, image_offsets};
pub use particle::{Neighbor, NeighborSet, Particle};
pub use shared::{SharedSimulation, Snapshot};
pub use spawner::{ParticleSeed, PointSource, Spawner, SpawnerConfig, UniformRect};
pub use step::{Simulation, StepPhase, sound_speed};
pub use tree::{Axis, Cell, partition};
