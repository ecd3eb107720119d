//! Error types for the transport orchestrator.

use thiserror::Error;

/// Catch-all error for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A sampler was used before `update` validated it, or `update` itself
    /// rejected an out-of-range value.
    #[error("invalid sampler configuration: {0}")]
    Configuration(String),
    /// The sampler's stamped integrity hash no longer matches its current
    /// contents; some field was mutated after the last `update` call.
    #[error("sampler hash mismatch: configuration was mutated after `update`")]
    StaleSampler,
    /// I/O failure opening an output file, a material cache, or an entropy
    /// source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A neutrino, lepton, or decay engine reported a failure that is not a
    /// sampling fizzle (those are absorbed silently, see
    /// [`crate::transport`]).
    #[error("engine failure: {0}")]
    Engine(String),
    /// Error that does not originate in this crate.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
