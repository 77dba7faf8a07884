//! A CDCL SAT solver core with selectable backtracking regimes.
//!
//! Implements the propagation/analysis/backtracking machinery of a NapSAT-style solver: a
//! two-watched-literal propagator, first-UIP conflict analysis with lazy reimplication, four
//! interchangeable backtracking regimes (NCB/WCB/RSCB/LSCB), a root-level simplifier, reduceDB,
//! and an optional resolution proof recorder. DIMACS parsing, compressed input, a CLI, and
//! rendering/observer hooks are out of scope; this crate is the solving core only.
#[macro_use]
mod lit;

mod analyze_conflict;
mod binary;
mod cdcl;
mod clause;
mod cnf;
mod config;
mod context;
mod decision;
mod error;
mod heap;
mod load;
mod proof;
mod propagate;
mod simplify;
mod solver;
mod state;
mod tmp;
mod trail;
mod watch;

pub use cnf::CnfFormula;
pub use config::{BacktrackRegime, SolverConfig};
pub use error::SolverError;
pub use lit::{Lit, Var};
pub use solver::Solver;
pub use state::Status;
