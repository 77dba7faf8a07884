//! The public solver handle (`spec.md` §6.1).
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use partial_ref::{IntoPartialRef, IntoPartialRefMut, PartialRef};

use crate::cdcl::{conflict_step, decide};
use crate::clause::ClauseHandle;
use crate::cnf::CnfFormula;
use crate::config::SolverConfig;
use crate::context::{config_changed, ensure_var_count, Context, ProofP, SolverConfigP, StateP, TrailP};
use crate::error::SolverError;
use crate::lit::Lit;
use crate::load::load_clause;
use crate::propagate::propagate as run_propagation;
use crate::state::Status;

/// A CDCL SAT solver instance.
///
/// Grounded on the teacher's `Solver { ctx: Box<Context> }` wrapper; DIMACS reading
/// (`add_dimacs_cnf`) is not carried over, as parsing is out of scope (`spec.md` §1).
pub struct Solver {
    ctx: Box<Context>,
    stop_flag: Option<Arc<AtomicBool>>,
    writing_clause: bool,
    clause_buffer: Vec<Lit>,
}

impl Default for Solver {
    fn default() -> Solver {
        Solver::new(SolverConfig::default()).expect("default configuration is always valid")
    }
}

impl Solver {
    /// Create a solver with the given configuration (`spec.md` §6.1 `create`).
    ///
    /// Fails fast if `config` violates any of `spec.md` §6.2's ranges (`spec.md` §7).
    pub fn new(config: SolverConfig) -> Result<Solver, SolverError> {
        config.validate()?;

        let mut ctx = Box::<Context>::default();
        {
            let mut ctx = ctx.into_partial_ref_mut();
            *ctx.part_mut(SolverConfigP) = config;
            config_changed(ctx.borrow());
            if config.build_proof {
                ctx.part_mut(ProofP).enable();
            }
        }

        Ok(Solver {
            ctx,
            stop_flag: None,
            writing_clause: false,
            clause_buffer: Vec::new(),
        })
    }

    /// A cooperative interrupt flag checked between solve steps (`spec.md` §5).
    ///
    /// Setting it mid-`solve()` is the only thread-safe interaction this crate supports; nothing
    /// else about a [`Solver`] may be touched from another thread.
    pub fn set_stop_flag(&mut self, flag: Arc<AtomicBool>) {
        self.stop_flag = Some(flag);
    }

    fn sync_stop_flag(&mut self) {
        if let Some(flag) = &self.stop_flag {
            let stop_requested = flag.load(Ordering::Relaxed);
            let mut ctx = self.ctx.into_partial_ref_mut();
            ctx.part_mut(StateP).stop_requested = stop_requested;
        }
    }

    /// Add every clause of `formula` (convenience over repeated [`Solver::add_clause`]).
    pub fn add_formula(&mut self, formula: &CnfFormula) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        ensure_var_count(ctx.borrow(), formula.var_count());
        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause);
        }
    }

    /// Add a clause to the formula (`spec.md` §6.1 `add_clause(lits[]) -> clause handle`).
    ///
    /// Returns `None` if the clause simplified away entirely (see [`load_clause`]'s doc comment).
    pub fn add_clause(&mut self, lits: &[Lit]) -> Option<ClauseHandle> {
        let var_count = lits.iter().map(|l| l.var().index() + 1).max().unwrap_or(0);
        let mut ctx = self.ctx.into_partial_ref_mut();
        ensure_var_count(ctx.borrow(), var_count);
        load_clause(ctx.borrow(), lits)
    }

    /// Begin streaming a clause literal by literal (`spec.md` §6.1 `start_clause`).
    ///
    /// Concurrent entry is forbidden: calling this again before [`Solver::finalize_clause`]
    /// panics, matching §5's "concurrent entry into this mode is forbidden".
    pub fn start_clause(&mut self) {
        assert!(!self.writing_clause, "already streaming a clause");
        self.writing_clause = true;
        self.clause_buffer.clear();
    }

    /// Add one literal to the clause being streamed (`spec.md` §6.1 `push_literal`).
    pub fn push_literal(&mut self, lit: Lit) -> Result<(), SolverError> {
        if !self.writing_clause {
            return Err(SolverError::Contract(
                "push_literal called without start_clause".into(),
            ));
        }
        if self.clause_buffer.contains(&!lit) {
            return Err(SolverError::Contract(
                "literal and its negation pushed into the same streamed clause".into(),
            ));
        }
        self.clause_buffer.push(lit);
        Ok(())
    }

    /// Finish streaming a clause and add it to the formula (`spec.md` §6.1 `finalize_clause`).
    pub fn finalize_clause(&mut self) -> Option<ClauseHandle> {
        assert!(self.writing_clause, "finalize_clause without start_clause");
        self.writing_clause = false;
        let lits = std::mem::take(&mut self.clause_buffer);
        self.add_clause(&lits)
    }

    /// Make one decision (`spec.md` §6.1 `decide()`).
    ///
    /// Returns whether a decision was made; requires `status() == Status::Unknown` and an empty
    /// propagation queue.
    pub fn decide(&mut self) -> bool {
        let mut ctx = self.ctx.into_partial_ref_mut();
        debug_assert!(ctx.part(TrailP).fully_propagated());
        decide(ctx.borrow(), None)
    }

    /// Force a specific decision literal (`spec.md` §6.1 `decide(ℓ)`).
    pub fn decide_literal(&mut self, lit: Lit) -> bool {
        let mut ctx = self.ctx.into_partial_ref_mut();
        debug_assert!(ctx.part(TrailP).fully_propagated());
        decide(ctx.borrow(), Some(lit))
    }

    /// Propagate every forced implication (`spec.md` §6.1 `propagate() -> may-decide`).
    ///
    /// Returns `true` ("may decide") if propagation completed without conflict; `false` if a
    /// conflict was found. Unlike [`Solver::solve`], a conflict here is not analyzed or learned
    /// from -- call `solve()` to run the full CDCL loop instead of stepping by hand.
    pub fn propagate(&mut self) -> bool {
        let mut ctx = self.ctx.into_partial_ref_mut();
        run_propagation(ctx.borrow()).is_ok()
    }

    /// Run the solver to completion (`spec.md` §6.1 `solve() -> SAT | UNSAT | UNDEF | ERROR`).
    pub fn solve(&mut self) -> Status {
        loop {
            {
                let ctx = self.ctx.into_partial_ref();
                if ctx.part(StateP).status != Status::Unknown {
                    break;
                }
            }
            self.sync_stop_flag();
            let mut ctx = self.ctx.into_partial_ref_mut();
            conflict_step(ctx.borrow());
        }

        let status = self.status();
        if status == Status::Error {
            log::error!("solver entered an error state");
        }
        status
    }

    /// Current solver status (`spec.md` §6.1 `status()`).
    pub fn status(&self) -> Status {
        let ctx = self.ctx.into_partial_ref();
        ctx.part(StateP).status
    }

    /// The literals currently on the trail, in assignment order (`spec.md` §6.1
    /// `partial_assignment()`).
    pub fn partial_assignment(&self) -> Vec<Lit> {
        let ctx = self.ctx.into_partial_ref();
        ctx.part(TrailP).trail().to_vec()
    }

    /// Whether `lit`'s variable currently has an assigned value (`spec.md` §6.1 `is_decided`).
    pub fn is_decided(&self, lit: Lit) -> bool {
        let ctx = self.ctx.into_partial_ref();
        ctx.part(TrailP).value(lit).is_some()
    }

    /// The model satisfying the formula, if `status() == Status::Sat`.
    pub fn model(&self) -> Option<Vec<Lit>> {
        if self.status() != Status::Sat {
            return None;
        }
        Some(self.partial_assignment())
    }

    /// Render the resolution proof (`spec.md` §6.1 `print_proof`, §6.4's textual form).
    ///
    /// `None` unless `build_proof` was enabled at construction.
    pub fn print_proof(&self) -> Option<String> {
        let ctx = self.ctx.into_partial_ref();
        if !ctx.part(ProofP).enabled() {
            return None;
        }
        Some(ctx.part(ProofP).format())
    }

    /// Verify the recorded proof (`spec.md` §6.1 `check_proof`).
    ///
    /// On `Status::Unsat`, additionally requires the empty clause to be reachable (`spec.md`
    /// §8 invariant 4); on any other status, every chain checking out is enough.
    ///
    /// `None` unless `build_proof` was enabled at construction.
    pub fn check_proof(&self) -> Option<bool> {
        let ctx = self.ctx.into_partial_ref();
        if !ctx.part(ProofP).enabled() {
            return None;
        }
        Some(if ctx.part(StateP).status == Status::Unsat {
            ctx.part(ProofP).check_unsat()
        } else {
            ctx.part(ProofP).check()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_satisfiable_formula() {
        let mut solver = Solver::default();
        solver.add_clause(&lits![1, 2]);
        solver.add_clause(&lits![-1, 3]);

        assert_eq!(solver.solve(), Status::Sat);
        let model = solver.model().unwrap();
        assert!(model.contains(&lit!(1)) || model.contains(&lit!(-1)));
    }

    #[test]
    fn solves_unsat_formula() {
        let mut solver = Solver::default();
        for clause in &[
            &lits![1, 2, 3][..],
            &lits![-1][..],
            &lits![1, -2][..],
            &lits![2, -3][..],
        ] {
            solver.add_clause(clause);
        }

        assert_eq!(solver.solve(), Status::Unsat);
        assert!(solver.model().is_none());
    }

    #[test]
    fn streaming_clause_rejects_tautology() {
        let mut solver = Solver::default();
        solver.start_clause();
        solver.push_literal(lit!(1)).unwrap();
        assert!(solver.push_literal(lit!(-1)).is_err());
    }

    #[test]
    fn streaming_clause_builds_formula() {
        let mut solver = Solver::default();
        solver.start_clause();
        solver.push_literal(lit!(1)).unwrap();
        solver.push_literal(lit!(2)).unwrap();
        solver.finalize_clause();

        assert_eq!(solver.status(), Status::Unknown);
    }

    #[test]
    fn rejects_invalid_configuration() {
        let mut config = SolverConfig::default();
        config.var_activity_decay = 1.5;
        assert!(Solver::new(config).is_err());
    }

    #[test]
    fn stop_flag_interrupts_solve() {
        let mut solver = Solver::default();
        let flag = Arc::new(AtomicBool::new(true));
        solver.set_stop_flag(flag);
        for clause in &[&lits![1, 2, 3][..], &lits![-1][..], &lits![1, -2][..], &lits![2, -3][..]] {
            solver.add_clause(clause);
        }

        assert_eq!(solver.solve(), Status::Interrupted);
    }
}
