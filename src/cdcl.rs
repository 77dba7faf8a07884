//! The conflict-driven clause-learning loop (`spec.md` §4, §5).
//!
//! Grounded on the teacher's `cdcl.rs` (`conflict_step`/`find_conflict`), with the incremental
//! assumption layer (`EnqueueAssumption`) dropped per `spec.md` §1's Non-goals and the
//! regime-dispatching backtrack/demotion logic added per `spec.md` §4.5/§4.6.
use partial_ref::{partial, PartialRef};

use crate::analyze_conflict::analyze_conflict;
use crate::clause::{
    assess_learned_clause, bump_clause_activity, decay_clause_activities, reduce_locals,
    reduce_mids, ClauseDb,
};
use crate::context::{
    AnalyzeConflictP, BinaryClausesP, ClauseActivityP, ClauseAllocP, ClauseDbP, Context, HeapP,
    ProofP, SolverConfigP, StateP, TmpDataP, TrailP, VarActivityP, WatchlistsP,
};
use crate::decision::make_decision;
use crate::lit::Lit;
use crate::propagate::{propagate, Conflict};
use crate::simplify::{clear_proved_units, simplify};
use crate::state::Status;
use crate::trail::{self, backtrack, Reason};

/// Find a conflict, learn a clause from it, and backtrack -- one iteration of the outer solve
/// loop. A no-op once `status` is no longer [`Status::Unknown`].
pub fn conflict_step(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut BinaryClausesP,
        mut ClauseActivityP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut HeapP,
        mut ProofP,
        mut StateP,
        mut TmpDataP,
        mut TrailP,
        mut VarActivityP,
        mut WatchlistsP,
        SolverConfigP,
    ),
) {
    if ctx.part(StateP).status != Status::Unknown {
        return;
    }
    if ctx.part(StateP).stop_requested {
        ctx.part_mut(StateP).status = Status::Interrupted;
        return;
    }

    let conflict = match find_conflict(ctx.borrow()) {
        Ok(()) => {
            ctx.part_mut(StateP).status = Status::Sat;
            return;
        }
        Err(conflict) => conflict,
    };

    ctx.part_mut(StateP).conflicts += 1;

    let regime = ctx.part(SolverConfigP).backtracking;
    let backtrack_to = analyze_conflict(ctx.borrow(), conflict);
    let backtrack_to = if regime.is_lazy() {
        apply_lazy_demotion(ctx.borrow(), backtrack_to)
    } else {
        backtrack_to
    };

    let (analyze, mut ctx) = ctx.split_part(AnalyzeConflictP);
    for &handle in analyze.involved() {
        bump_clause_activity(ctx.borrow(), handle);
    }
    decay_clause_activities(ctx.borrow());

    backtrack(ctx.borrow(), regime, backtrack_to);

    let clause = analyze.clause().to_vec();
    let proof_id = analyze.proof_id();

    match clause[..] {
        [] => {
            ctx.part_mut(StateP).status = Status::Unsat;
            return;
        }
        [lit] => {
            trail::imply(ctx.borrow(), lit, 0, Reason::Unit);
            if let Some(id) = proof_id {
                ctx.part_mut(ProofP).register_unit(id, lit);
            }
        }
        [lit_0, lit_1] => {
            let handle = ctx
                .part_mut(BinaryClausesP)
                .add_binary_clause([lit_0, lit_1]);
            trail::imply(ctx.borrow(), lit_0, backtrack_to, Reason::Binary(lit_1, handle));
            if let Some(id) = proof_id {
                ctx.part_mut(ProofP).register_handle(id, handle);
            }
        }
        ref lits => {
            let header = assess_learned_clause(ctx.borrow(), lits);
            let handle = ClauseDb::add_clause(ctx.borrow(), header, lits);
            ctx.part_mut(WatchlistsP)
                .watch_clause(handle, [lits[0], lits[1]]);
            trail::imply(ctx.borrow(), lits[0], backtrack_to, Reason::Long(handle));
            if let Some(id) = proof_id {
                ctx.part_mut(ProofP).register_handle(id, handle);
            }
        }
    }

    maybe_restart(ctx.borrow());
    maybe_reduce(ctx.borrow());
}

/// `LSCB`'s additional demotion: if the asserting literal carries a lazy reason recorded during
/// propagation (`spec.md` §4.5's "lazy reason" slot), its precomputed reimplication level is a
/// valid lower backtrack target, since that reason clause would have implied the same literal
/// there without any of the intervening decisions.
fn apply_lazy_demotion(
    ctx: partial!(Context, AnalyzeConflictP, TrailP),
    backtrack_to: u32,
) -> u32 {
    let clause = ctx.part(AnalyzeConflictP).clause();
    let asserting_var = match clause.first() {
        Some(lit) => lit.var(),
        None => return backtrack_to,
    };

    match ctx.part(TrailP).lazy_reason(asserting_var) {
        Some((_, reimpl_level)) => reimpl_level.min(backtrack_to),
        None => backtrack_to,
    }
}

fn maybe_restart(
    mut ctx: partial!(Context, mut HeapP, mut StateP, mut TrailP, SolverConfigP),
) {
    let restart = ctx.part(StateP).agility < ctx.part(StateP).agility_threshold;
    if !restart {
        return;
    }

    backtrack(ctx.borrow(), ctx.part(SolverConfigP).backtracking, 0);

    let state = ctx.part_mut(StateP);
    state.restarts += 1;
    state.reset_agility();
    let decay = ctx.part(SolverConfigP).agility_threshold_decay;
    ctx.part_mut(StateP).agility_threshold *= decay;
}

/// ReduceDB runs once `root_lits_since_reduce` exceeds `next_reduce_at`; that threshold then
/// grows by `clause_elimination_multiplier`, so later passes run less often as the formula's
/// learned-clause set matures (`spec.md` §4.8, `original_source/src/solver/NapSAT-purge.cpp`'s
/// `simplify_clause_set`).
fn maybe_reduce(
    mut ctx: partial!(Context, mut ClauseActivityP, mut ClauseAllocP, mut ClauseDbP, mut StateP, mut WatchlistsP, SolverConfigP),
) {
    if !ctx.part(SolverConfigP).delete_clauses {
        return;
    }
    if ctx.part(StateP).root_lits_since_reduce < ctx.part(StateP).next_reduce_at {
        return;
    }

    reduce_mids(ctx.borrow());
    reduce_locals(ctx.borrow());

    let multiplier = ctx.part(SolverConfigP).clause_elimination_multiplier;
    let next = (ctx.part(StateP).next_reduce_at as f64 * multiplier).ceil() as u64;
    let state = ctx.part_mut(StateP);
    state.root_lits_since_reduce = 0;
    state.next_reduce_at = next;
}

/// Propagate, simplify when new root-level units appear, and decide, until either a conflict or
/// a full (satisfying) assignment is found.
fn find_conflict(
    mut ctx: partial!(
        Context,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut HeapP,
        mut ProofP,
        mut StateP,
        mut TrailP,
        mut WatchlistsP,
        SolverConfigP,
    ),
) -> Result<(), Conflict> {
    loop {
        propagate(ctx.borrow())?;

        if ctx.part(TrailP).current_level() == 0 {
            let root_lits = ctx.part(TrailP).trail().len() as u64;
            let had_units = clear_proved_units(ctx.borrow());
            if had_units {
                ctx.part_mut(StateP).root_lits_since_reduce += root_lits;
                simplify(ctx.borrow());
            }
        }

        if !decide(ctx.borrow(), None) {
            return Ok(());
        }
    }
}

/// Make a single decision (`spec.md` §6.1 `decide()`/`decide(ℓ)`).
///
/// Returns whether a decision was made; `false` means every variable is already assigned (with
/// `forced: None`) -- the formula is satisfied under the current trail.
pub fn decide(
    mut ctx: partial!(Context, mut HeapP, mut StateP, mut TrailP, SolverConfigP),
    forced: Option<Lit>,
) -> bool {
    let lit = match forced {
        Some(lit) => lit,
        None => match make_decision(ctx.borrow()) {
            Some(lit) => lit,
            None => return false,
        },
    };

    ctx.part_mut(TrailP).new_decision_level();
    let level = ctx.part(TrailP).current_level();
    trail::imply(ctx.borrow(), lit, level, Reason::Decision);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use crate::context::{set_var_count, Context as Ctx};
    use crate::load::load_clause;

    fn run(ctx: partial!(Ctx, mut AnalyzeConflictP, mut BinaryClausesP, mut ClauseActivityP, mut ClauseAllocP, mut ClauseDbP, mut HeapP, mut ProofP, mut StateP, mut TmpDataP, mut TrailP, mut VarActivityP, mut WatchlistsP, SolverConfigP)) {
        let mut ctx = ctx;
        while ctx.part(StateP).status == Status::Unknown {
            conflict_step(ctx.borrow());
        }
    }

    #[test]
    fn solves_unsat_pigeonhole_like_formula() {
        let mut ctx = Ctx::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 3);
        for clause in &[
            &lits![1, 2, 3][..],
            &lits![-1][..],
            &lits![1, -2][..],
            &lits![2, -3][..],
        ] {
            load_clause(ctx.borrow(), clause);
        }

        run(ctx.borrow());

        assert_eq!(ctx.part(StateP).status, Status::Unsat);
    }

    #[test]
    fn solves_satisfiable_formula() {
        let mut ctx = Ctx::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 3);
        for clause in &[&lits![1, 2][..], &lits![-1, 3][..]] {
            load_clause(ctx.borrow(), clause);
        }

        run(ctx.borrow());

        assert_eq!(ctx.part(StateP).status, Status::Sat);
    }
}
