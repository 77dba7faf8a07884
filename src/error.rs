//! Error types.
use thiserror::Error;

/// Errors produced by the solver.
#[derive(Error, Debug, Clone)]
pub enum SolverError {
    /// An invalid configuration parameter was supplied at construction time.
    #[error("invalid solver configuration: {0}")]
    Config(String),

    /// A contract was violated by the caller (e.g. duplicate literal while streaming a clause).
    ///
    /// In debug builds these are also caught by assertions; this variant exists so release
    /// builds can surface the problem instead of silently producing a wrong result.
    #[error("contract violation: {0}")]
    Contract(String),
}
