use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported while building or reconfiguring a simulation.
///
/// Only construction-time problems are represented here. Contract violations
/// inside a step (inconsistent tree, kernel argument outside `[0, 1]`) panic.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The configured spawners produced no particles.
    #[error("spawners produced an empty particle set")]
    EmptyParticleSet,

    /// Neither start spawners nor ongoing sources were configured.
    #[error("no spawners configured")]
    NoSpawners,

    /// The kernel cannot drive the force calculation.
    #[error("kernel `{0}` has no derivative and cannot be used for stepping")]
    UnsupportedKernel(&'static str),

    /// A previous step panicked while holding the simulation lock.
    #[error("simulation lock poisoned by a failed step")]
    LockPoisoned,

    /// Reading a config file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A config document could not be decoded.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
