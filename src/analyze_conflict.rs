//! First-UIP conflict analysis and recursive clause minimization (`spec.md` §4.6).
//!
//! Grounded on the teacher's `analyze_conflict.rs`, restructured around this crate's [`Reason`]
//! and [`crate::trail::Trail`] (which holds level/reason directly) instead of the teacher's
//! separate `ImplGraph` context part. Resolution-chain recording follows the same clause-hash
//! bookkeeping the teacher interleaves into analysis, adapted to `crate::proof::Proof`'s
//! handle/unit registry (`spec.md` §4.9).
use std::mem::swap;

use partial_ref::{partial, split_borrow, PartialRef};
use vec_mut_scan::VecMutScan;

use crate::clause::ClauseHandle;
use crate::context::{AnalyzeConflictP, ClauseAllocP, Context, HeapP, ProofP, TrailP, VarActivityP};
use crate::decision::bump_var_activity;
use crate::lit::{Lit, Var, LIT_UNDEF};
use crate::propagate::Conflict;
use crate::trail::Reason;

/// Temporaries for conflict analysis, reused across conflicts to avoid reallocation.
#[derive(Default)]
pub struct AnalyzeConflict {
    /// The learned clause, once analysis finishes. Position 0 holds the asserting literal.
    clause: Vec<Lit>,
    /// Number of literals of the current clause still at the conflict's own level.
    current_level_count: usize,
    /// Whether each variable is present in the current (partially resolved) clause.
    var_flags: Vec<bool>,
    /// Variables with a set `var_flags` entry, to be cleared at the end of analysis.
    to_clean: Vec<Var>,
    /// Long clauses resolved into the learned clause, for activity bumping.
    involved: Vec<ClauseHandle>,
    /// Minimization DFS stack.
    stack: Vec<Lit>,
    /// Proof id of the learned clause's resolution chain, once analysis finishes (`spec.md`
    /// §4.9). `None` if proof recording is disabled.
    proof_id: Option<crate::proof::ProofClauseId>,
}

impl AnalyzeConflict {
    pub fn set_var_count(&mut self, count: usize) {
        self.var_flags.resize(count, false);
    }

    /// The learned clause.
    pub fn clause(&self) -> &[Lit] {
        &self.clause
    }

    /// Long clauses involved in the conflict, for clause-activity bumping.
    pub fn involved(&self) -> &[ClauseHandle] {
        &self.involved
    }

    /// Proof id of the learned clause's resolution chain, if proof recording is enabled.
    pub fn proof_id(&self) -> Option<crate::proof::ProofClauseId> {
        self.proof_id
    }
}

/// The literals of a reason, other than the literal it implies.
fn reason_lits(ctx: &partial!(Context, ClauseAllocP), lit: Lit, reason: Reason) -> Vec<Lit> {
    match reason {
        Reason::Decision | Reason::Unit => vec![],
        Reason::Binary(other, _handle) => vec![!other],
        Reason::Long(handle) => ctx
            .part(ClauseAllocP)
            .clause(handle)
            .lits()
            .iter()
            .copied()
            .filter(|&l| l != lit)
            .collect(),
    }
}

/// The proof id of the clause that justifies `reason`, if proof recording is enabled and the
/// reason names a clause the proof knows about.
fn reason_proof_id(
    ctx: partial!(Context, ProofP),
    true_lit: Lit,
    reason: Reason,
) -> Option<crate::proof::ProofClauseId> {
    match reason {
        Reason::Decision => None,
        Reason::Unit => ctx.part(ProofP).unit_id(true_lit),
        Reason::Binary(_, handle) | Reason::Long(handle) => ctx.part(ProofP).handle_id(handle),
    }
}

/// Add a literal to the clause under construction, bumping its variable's activity.
///
/// Literals fixed at level 0 are never added: they hold in every future state of the search, so
/// they would only ever inflate the learned clause.
fn add_literal(
    mut ctx: partial!(Context, mut AnalyzeConflictP, mut HeapP, mut VarActivityP, TrailP),
    lit: Lit,
) {
    let (analyze, mut ctx) = ctx.split_part_mut(AnalyzeConflictP);
    let lit_level = ctx.part(TrailP).lit_level(lit);

    if lit_level > 0 && !analyze.var_flags[lit.index()] {
        bump_var_activity(ctx.borrow(), lit.var());

        analyze.var_flags[lit.index()] = true;
        if lit_level == ctx.part(TrailP).current_level() {
            analyze.current_level_count += 1;
        } else {
            analyze.clause.push(lit);
            analyze.to_clean.push(lit.var());
        }
    }
}

/// Learn a new clause from `conflict`.
///
/// Returns the level to backtrack to so the learned clause becomes asserting (the second-highest
/// level among its literals), for the `NCB`/`WCB`/`RSCB` regimes. `LSCB`'s additional
/// lazy-reimplication demotion (`spec.md` §4.6) is applied by the caller on top of this result,
/// since it needs the solve loop's view of the lazy reasons recorded during propagation.
pub fn analyze_conflict(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut HeapP,
        mut VarActivityP,
        mut ProofP,
        ClauseAllocP,
        TrailP,
    ),
    conflict: Conflict,
) -> u32 {
    split_borrow!(lit_ctx = &(ClauseAllocP) ctx);

    {
        let analyze = ctx.part_mut(AnalyzeConflictP);
        analyze.clause.clear();
        analyze.involved.clear();
        analyze.current_level_count = 0;
        analyze.proof_id = None;
    }

    let conflict_lits = conflict.lits(&lit_ctx);
    let proof_seed = ctx.part(ProofP).handle_id(conflict.handle());

    if ctx.part(TrailP).current_level() == 0 {
        // Every literal of the conflicting clause is a falsified root-level unit: the conflict
        // clause resolved against each of their forcing units derives the empty clause directly
        // (`spec.md` §4.9, invariant 4's empty-clause reachability on UNSAT).
        if let Some(seed_id) = proof_seed {
            let unit_ids: Option<Vec<_>> =
                conflict_lits.iter().map(|&lit| ctx.part(ProofP).unit_id(!lit)).collect();
            if let Some(unit_ids) = unit_ids {
                ctx.part_mut(ProofP).start_resolution_chain();
                ctx.part_mut(ProofP).link_resolution(LIT_UNDEF, seed_id);
                for (&lit, unit_id) in conflict_lits.iter().zip(unit_ids) {
                    ctx.part_mut(ProofP).link_resolution(lit, unit_id);
                }
                let new_id = ctx.part(ProofP).next_id();
                ctx.part_mut(ProofP).finalize_resolution(new_id, &[]);
                ctx.part_mut(AnalyzeConflictP).proof_id = Some(new_id);
            }
        }
        return 0;
    }

    for &lit in conflict_lits.iter() {
        add_literal(ctx.borrow(), lit);
    }

    if let Conflict::Long(handle) = conflict {
        ctx.part_mut(AnalyzeConflictP).involved.push(handle);
    }

    // Seed the learned clause's resolution chain on the conflicting clause itself; each trail
    // literal resolved away below links in the clause that forced it. Aborted (not finalized) if
    // any reason along the way turns out not to be registered in the proof.
    let mut proof_active = proof_seed.is_some();
    if let Some(seed_id) = proof_seed {
        ctx.part_mut(ProofP).start_resolution_chain();
        ctx.part_mut(ProofP).link_resolution(LIT_UNDEF, seed_id);
    }

    // Resolve away every literal of the conflict's own level, walking the trail in reverse
    // chronological order, until exactly one (the first UIP) remains.
    split_borrow!(ctx_trail = &(TrailP) ctx);
    for &lit in ctx_trail.part(TrailP).trail().iter().rev() {
        let analyze = ctx.part_mut(AnalyzeConflictP);
        let lit_present = &mut analyze.var_flags[lit.index()];
        if !*lit_present {
            continue;
        }
        *lit_present = false;
        analyze.current_level_count -= 1;

        if analyze.current_level_count == 0 {
            analyze.clause.push(!lit);
            let end = analyze.clause.len() - 1;
            analyze.clause.swap(0, end);
            break;
        }

        let reason = ctx.part(TrailP).reason(lit.var());
        let lits = reason_lits(&lit_ctx, lit, reason);

        if proof_active {
            match reason_proof_id(ctx.borrow(), lit, reason) {
                Some(reason_id) => ctx.part_mut(ProofP).link_resolution(!lit, reason_id),
                None => {
                    ctx.part_mut(ProofP).abort_resolution_chain();
                    proof_active = false;
                }
            }
        }

        for &reason_lit in lits.iter() {
            add_literal(ctx.borrow(), reason_lit);
        }

        if let Reason::Long(handle) = reason {
            ctx.part_mut(AnalyzeConflictP).involved.push(handle);
        }
    }

    // Recorded before minimization: the self-subsumption pass below may drop further literals,
    // but doesn't link those removals into the proof (`DESIGN.md`), so the chain above derives
    // this pre-minimization clause, a sound superset of the one actually learned.
    let pre_minimization_clause = ctx.part(AnalyzeConflictP).clause().to_vec();

    minimize_clause(ctx.borrow());

    if proof_active {
        let new_id = ctx.part(ProofP).next_id();
        ctx.part_mut(ProofP).finalize_resolution(new_id, &pre_minimization_clause);
        ctx.part_mut(AnalyzeConflictP).proof_id = Some(new_id);
    }

    let analyze = ctx.part_mut(AnalyzeConflictP);
    for var in analyze.to_clean.drain(..) {
        analyze.var_flags[var.index()] = false;
    }

    // Move the highest-level literal besides the asserting one into position 1, so the two
    // watched literals are the two highest levels, matching the watch invariant after backtrack.
    let mut backtrack_to = 0;
    let analyze = ctx.part_mut(AnalyzeConflictP);
    if analyze.clause.len() > 1 {
        let (prefix, rest) = analyze.clause.split_at_mut(2);
        let lit_1 = &mut prefix[1];
        backtrack_to = ctx.part(TrailP).lit_level(*lit_1);
        for lit in rest.iter_mut() {
            let lit_level = ctx.part(TrailP).lit_level(*lit);
            if lit_level > backtrack_to {
                backtrack_to = lit_level;
                swap(lit_1, lit);
            }
        }
    }

    crate::decision::decay_var_activity(ctx.borrow());

    backtrack_to
}

/// A Bloom filter of decision levels, used to prune minimization's implication-graph search.
#[derive(Default)]
struct LevelAbstraction {
    bits: u64,
}

impl LevelAbstraction {
    fn add(&mut self, level: u32) {
        self.bits |= 1 << (level % 64);
    }

    fn test(&self, level: u32) -> bool {
        self.bits & (1 << (level % 64)) != 0
    }
}

/// Remove redundant literals from the clause under construction via recursive self-subsumption.
///
/// Requires `var_flags` to be set for exactly the clause's current literals; also sets further
/// flags transiently, listing them in `to_clean`. Not reflected in the proof recorder: the
/// resolution chain `analyze_conflict` finalizes covers the pre-minimization clause, of which the
/// minimized clause is always a subset.
///
/// For each literal but the asserting one, this runs a DFS over the implication graph (following
/// reasons in reverse) to check whether the literal is already implied by the rest of the clause.
/// The search aborts as soon as it reaches a literal at a decision level not present in the
/// clause (checked approximately via a Bloom filter) or a decision literal, since those can never
/// be implied by the clause. Literals shown redundant by one search stay marked for the rest, so
/// later searches don't redo that work.
fn minimize_clause(mut ctx: partial!(Context, mut AnalyzeConflictP, ClauseAllocP, TrailP)) {
    split_borrow!(lit_ctx = &(ClauseAllocP) ctx);
    let (analyze, ctx) = ctx.split_part_mut(AnalyzeConflictP);

    let mut involved_levels = LevelAbstraction::default();
    for &lit in analyze.clause.iter() {
        involved_levels.add(ctx.part(TrailP).lit_level(lit));
    }

    let mut scan = VecMutScan::new(&mut analyze.clause);
    scan.next(); // the asserting literal is always kept

    'next_lit: while let Some(lit) = scan.next() {
        if ctx.part(TrailP).reason(lit.var()) == Reason::Decision {
            continue;
        }

        analyze.stack.clear();
        analyze.stack.push(!*lit);

        let top = analyze.to_clean.len();

        while let Some(stack_lit) = analyze.stack.pop() {
            let reason = ctx.part(TrailP).reason(stack_lit.var());
            let lits = reason_lits(&lit_ctx, stack_lit, reason);

            for &reason_lit in lits.iter() {
                let reason_level = ctx.part(TrailP).lit_level(reason_lit);

                if !analyze.var_flags[reason_lit.index()] && reason_level > 0 {
                    let is_decision =
                        ctx.part(TrailP).reason(reason_lit.var()) == Reason::Decision;

                    if is_decision || !involved_levels.test(reason_level) {
                        for lit in analyze.to_clean.drain(top..) {
                            analyze.var_flags[lit.index()] = false;
                        }
                        continue 'next_lit;
                    } else {
                        analyze.var_flags[reason_lit.index()] = true;
                        analyze.to_clean.push(reason_lit.var());
                        analyze.stack.push(!reason_lit);
                    }
                }
            }
        }

        lit.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use crate::context::{set_var_count, Context as Ctx, TrailP};
    use crate::trail::Reason;

    fn decide(ctx: partial!(Ctx, mut TrailP), lit: Lit) {
        let mut ctx = ctx;
        ctx.part_mut(TrailP).new_decision_level();
        let level = ctx.part(TrailP).current_level();
        ctx.part_mut(TrailP).assign(lit, level, Reason::Decision);
    }

    #[test]
    fn learns_unit_clause_on_conflict_at_level_one() {
        let mut ctx = Ctx::default();
        let mut ctx = ctx.into_partial_ref_mut();
        set_var_count(ctx.borrow(), 10);

        decide(ctx.borrow(), lit!(1));

        let handle = crate::clause::ClauseDb::add_clause(
            ctx.borrow(),
            crate::clause::ClauseHeader::new(),
            &lits![-1, 2],
        );
        ctx.part_mut(TrailP).assign(lit!(2), 1, Reason::Long(handle));

        let clause2 = crate::clause::ClauseDb::add_clause(
            ctx.borrow(),
            crate::clause::ClauseHeader::new(),
            &lits![-1, -2],
        );

        let backtrack_to = analyze_conflict(ctx.borrow(), Conflict::Long(clause2));

        assert_eq!(backtrack_to, 0);
        assert_eq!(ctx.part(AnalyzeConflictP).clause(), &lits![-1][..]);
    }

    #[test]
    fn records_a_checkable_resolution_chain_when_proof_enabled() {
        let mut ctx = Ctx::default();
        let mut ctx = ctx.into_partial_ref_mut();
        set_var_count(ctx.borrow(), 10);
        ctx.part_mut(ProofP).enable();

        decide(ctx.borrow(), lit!(1));

        let handle_1 = crate::clause::ClauseDb::add_clause(
            ctx.borrow(),
            crate::clause::ClauseHeader::new(),
            &lits![-1, 2],
        );
        ctx.part_mut(ProofP).input_clause(0, &lits![-1, 2]);
        ctx.part_mut(ProofP).register_handle(0, handle_1);
        ctx.part_mut(TrailP).assign(lit!(2), 1, Reason::Long(handle_1));

        let handle_2 = crate::clause::ClauseDb::add_clause(
            ctx.borrow(),
            crate::clause::ClauseHeader::new(),
            &lits![-1, -2],
        );
        ctx.part_mut(ProofP).input_clause(1, &lits![-1, -2]);
        ctx.part_mut(ProofP).register_handle(1, handle_2);

        analyze_conflict(ctx.borrow(), Conflict::Long(handle_2));

        assert!(ctx.part(AnalyzeConflictP).proof_id().is_some());
        assert!(ctx.part(ProofP).check());
    }
}
