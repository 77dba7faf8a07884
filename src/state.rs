//! Miscellaneous solver state.

/// Solver status.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Status {
    /// No conclusion reached yet.
    Unknown,
    /// The formula is satisfiable; a model is available.
    Sat,
    /// The formula is unsatisfiable.
    Unsat,
    /// Solving was aborted by the cooperative stop flag.
    Interrupted,
    /// An input or configuration error occurred; see the logged message.
    Error,
}

impl Default for Status {
    fn default() -> Status {
        Status::Unknown
    }
}

/// Miscellaneous solver state: status plus the agility-driven restart bookkeeping of
/// `spec.md` §4.4.
///
/// Anything larger or any larger group of related state variables should be moved into a
/// separate part of [`Context`](crate::context::Context).
pub struct SolverState {
    pub status: Status,
    /// Moving average of polarity flips vs. the phase cache.
    pub agility: f64,
    /// Current restart threshold for `agility`.
    pub agility_threshold: f64,
    /// Number of conflicts seen so far.
    pub conflicts: u64,
    /// Number of restarts performed so far.
    pub restarts: u64,
    /// Root-level literals derived since reduceDB last ran (`spec.md` §4.8's growing-threshold
    /// trigger).
    pub root_lits_since_reduce: u64,
    /// Threshold on `root_lits_since_reduce` that triggers the next reduceDB pass; grown by
    /// `SolverConfig::clause_elimination_multiplier` every time reduceDB runs.
    pub next_reduce_at: u64,
    /// Cooperative interrupt flag; checked between decide/propagate/analyze/simplify phases.
    pub stop_requested: bool,
}

/// Initial `next_reduce_at`: reduceDB stays dormant until the search has derived a handful of
/// root-level units, rather than firing on the first one.
const INITIAL_REDUCE_THRESHOLD: u64 = 100;

impl Default for SolverState {
    fn default() -> SolverState {
        SolverState {
            status: Status::Unknown,
            agility: 1.0,
            agility_threshold: 0.4,
            conflicts: 0,
            restarts: 0,
            root_lits_since_reduce: 0,
            next_reduce_at: INITIAL_REDUCE_THRESHOLD,
            stop_requested: false,
        }
    }
}

impl SolverState {
    /// Reset the restart-triggering state (`spec.md` §4.7: `agility = 1`).
    pub fn reset_agility(&mut self) {
        self.agility = 1.0;
    }
}
