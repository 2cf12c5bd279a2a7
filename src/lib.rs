//! sph2d - 2-D smoothed particle hydrodynamics core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (tree, neighbour search, kernels, integrator)
//! - `error`: Construction-time error types

pub mod error;
pub mod sim;

pub use error::{Error, Result};
pub use sim::{SharedSimulation, Simulation, SimulationConfig, Snapshot};

/// Simulation constants
pub mod consts {
    /// Number of nearest neighbours every particle interacts with
    pub const NEIGHBOR_COUNT: usize = 32;
    /// Leaves are split while they hold more particles than this
    pub const MAX_PARTICLES_PER_CELL: usize = 8;
    /// Default split position between a cell's lower and upper bound (0.5 = midpoint)
    pub const DEFAULT_SPLIT_FRACTION: f64 = 0.5;

    /// Default adiabatic index (monatomic ideal gas)
    pub const DEFAULT_GAMMA: f64 = 5.0 / 3.0;
    /// Default artificial viscosity strength
    pub const DEFAULT_VISCOSITY_ALPHA: f64 = 1.0;
    /// Default signal velocity coefficient
    pub const DEFAULT_VISCOSITY_BETA: f64 = 2.0;

    /// Relative slack added to merged bounding spheres
    pub const SPHERE_SLACK: f64 = 1e-12;
}

/// Wrap a coordinate into the half-open interval `[min, max)`
#[inline]
pub fn wrap_periodic(x: f64, min: f64, max: f64) -> f64 {
    let extent = max - min;
    let wrapped = (x - min).rem_euclid(extent);
    // rem_euclid may round up to exactly `extent` for tiny negative inputs
    if wrapped >= extent {
        min
    } else {
        min + wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_periodic() {
        assert!((wrap_periodic(1.25, 0.0, 1.0) - 0.25).abs() < 1e-12);
        assert!((wrap_periodic(-0.25, 0.0, 1.0) - 0.75).abs() < 1e-12);
        assert!((wrap_periodic(0.5, 0.0, 1.0) - 0.5).abs() < 1e-12);
        assert_eq!(wrap_periodic(1.0, 0.0, 1.0), 0.0);
        assert!((wrap_periodic(0.9, 0.2, 0.8) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_wrap_tiny_negative_stays_in_range() {
        let x = wrap_periodic(-1e-20, 0.0, 1.0);
        assert!((0.0..1.0).contains(&x));
    }
}
