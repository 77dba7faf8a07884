//! The trail: ordered assigned literals, per-variable state, and per-regime backtracking.
use partial_ref::{partial, PartialRef};

use crate::clause::ClauseHandle;
use crate::config::BacktrackRegime;
use crate::context::{Context, HeapP, SolverConfigP, StateP, TrailP};
use crate::lit::{Lit, Var};

pub const LEVEL_ROOT: u32 = 0;
pub const LEVEL_UNDEF: u32 = u32::max_value();

/// The clause (if any) that forced a literal's assignment.
///
/// Modeled as a tagged variant rather than sentinel integers, per `spec.md` §9's "dynamic
/// dispatch on reason kinds" design note. `Reason::Lazy` here names the *lazy reason slot* of
/// §3/§4.5/§4.6 (LSCB only); the source's reserved-but-unreachable `CLAUSE_LAZY` primary-reason
/// marker is a distinct thing and is never constructed anywhere in this crate (`spec.md` §9, Open
/// Question 1).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Reason {
    /// The literal was chosen by the decision heuristic.
    Decision,
    /// The literal was forced by a unit clause added directly to the formula.
    Unit,
    /// The literal was implied by a binary clause: its other literal, plus the clause's handle
    /// (needed to look the clause up in the resolution proof, `spec.md` §4.9).
    Binary(Lit, ClauseHandle),
    /// The literal was implied by a clause of size >= 3.
    Long(ClauseHandle),
}

/// Per-variable assignment state.
#[derive(Copy, Clone)]
pub struct VarData {
    pub value: Option<bool>,
    pub level: u32,
    pub reason: Reason,
    /// LSCB-only: an alternative reason that would have implied this literal at a lower level
    /// (`spec.md` §4.3's "missed lower implication"/§4.5's "lazy reason"), paired with that
    /// reason's own reimplication level (`δ(C \ {lit})`) so `backtrack` can re-imply without
    /// re-deriving it -- binary-clause reasons have no arena storage to look levels up from later.
    pub lazy_reason: Option<(Reason, u32)>,
    /// Last assigned polarity, for phase saving and agility (`spec.md` §4.4).
    pub phase: bool,
    /// Conflict-analysis scratch flag.
    pub seen: bool,
    /// Literal enqueued but not yet propagated. Invariant: `waiting => value != None`.
    pub waiting: bool,
}

impl Default for VarData {
    fn default() -> VarData {
        VarData {
            value: None,
            level: LEVEL_UNDEF,
            reason: Reason::Decision,
            lazy_reason: None,
            phase: false,
            seen: false,
            waiting: false,
        }
    }
}

/// Ordered assigned literals, with a queue-head index splitting propagated (`τ`) from queued
/// (`ω`) entries, plus one `VarData` slot per variable.
#[derive(Default)]
pub struct Trail {
    vars: Vec<VarData>,
    trail: Vec<Lit>,
    /// Index such that `trail[..propagated]` is fully propagated.
    propagated: usize,
    /// Trail position of the decision that opened level `d` (`d >= 1`).
    decision_index: Vec<usize>,
}

impl Trail {
    pub fn set_var_count(&mut self, count: usize) {
        self.vars.resize(count, VarData::default());
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    pub fn var_data(&self, var: Var) -> &VarData {
        &self.vars[var.index()]
    }

    pub fn var_data_mut(&mut self, var: Var) -> &mut VarData {
        &mut self.vars[var.index()]
    }

    pub fn value(&self, lit: Lit) -> Option<bool> {
        self.vars[lit.var().index()].value.map(|v| v ^ lit.is_negative())
    }

    pub fn is_true(&self, lit: Lit) -> bool {
        self.value(lit) == Some(true)
    }

    pub fn is_false(&self, lit: Lit) -> bool {
        self.value(lit) == Some(false)
    }

    pub fn is_undef(&self, lit: Lit) -> bool {
        self.value(lit).is_none()
    }

    pub fn level(&self, var: Var) -> u32 {
        self.vars[var.index()].level
    }

    pub fn lit_level(&self, lit: Lit) -> u32 {
        self.level(lit.var())
    }

    pub fn reason(&self, var: Var) -> Reason {
        self.vars[var.index()].reason
    }

    pub fn lazy_reason(&self, var: Var) -> Option<(Reason, u32)> {
        self.vars[var.index()].lazy_reason
    }

    pub fn set_lazy_reason(&mut self, var: Var, lazy_reason: Option<(Reason, u32)>) {
        self.vars[var.index()].lazy_reason = lazy_reason;
    }

    pub fn phase(&self, var: Var) -> bool {
        self.vars[var.index()].phase
    }

    pub fn trail(&self) -> &[Lit] {
        &self.trail
    }

    pub fn propagated_len(&self) -> usize {
        self.propagated
    }

    pub fn queue(&self) -> &[Lit] {
        &self.trail[self.propagated..]
    }

    pub fn fully_propagated(&self) -> bool {
        self.propagated == self.trail.len()
    }

    /// Next literal to propagate, without removing it.
    pub fn queue_head(&self) -> Option<Lit> {
        self.trail.get(self.propagated).copied()
    }

    pub fn advance_queue(&mut self) {
        self.propagated += 1;
    }

    pub fn current_level(&self) -> u32 {
        self.decision_index.len() as u32
    }

    pub fn new_decision_level(&mut self) {
        self.decision_index.push(self.trail.len());
    }

    /// Trail position at which level `d` (`d >= 1`) began.
    pub fn decision_index(&self, level: u32) -> usize {
        self.decision_index[level as usize - 1]
    }

    /// Assign `lit` true, append it to the trail, and record its reason/level.
    ///
    /// The caller chooses `level` explicitly: decisions use `current_level() + 1` (after calling
    /// `new_decision_level`), implied literals use the max level of their reason's other
    /// literals (`spec.md` §8 invariant 2).
    pub fn assign(&mut self, lit: Lit, level: u32, reason: Reason) {
        let data = &mut self.vars[lit.var().index()];
        debug_assert!(data.value.is_none());
        data.value = Some(lit.is_positive());
        data.level = level;
        data.reason = reason;
        data.phase = lit.is_positive();
        self.trail.push(lit);
    }

    /// Mark a trail literal as queued-but-unpropagated again (RSCB re-queueing, `spec.md` §4.5).
    pub fn mark_waiting(&mut self, var: Var) {
        self.vars[var.index()].waiting = true;
    }

    /// Drop the (fully propagated, level-0) trail contents without touching `VarData`.
    ///
    /// Once every root-level literal has been folded into the formula by the simplifier, the
    /// trail no longer needs to remember the order they were derived in: their `value`/`level`
    /// stay fixed for the rest of the search. Must only be called at `current_level() == 0`.
    pub fn clear_root_trail(&mut self) {
        debug_assert_eq!(self.current_level(), 0);
        self.trail.clear();
        self.propagated = 0;
    }

    fn unassign(&mut self, var: Var) {
        let data = &mut self.vars[var.index()];
        data.value = None;
        data.level = LEVEL_UNDEF;
        data.lazy_reason = None;
        data.waiting = false;
    }
}

/// Bump a variable's activity and restore it to the heap if it was popped while assigned.
pub fn make_available(
    mut ctx: partial!(Context, mut HeapP),
    var: Var,
) {
    let heap = ctx.part_mut(HeapP);
    if !heap.contains(var.index() as u32) {
        let activity = heap.activity(var.index() as u32);
        heap.insert(var.index() as u32, activity);
    }
}

/// Assign `lit` and update the agility moving average (`spec.md` §4.4).
///
/// `NapSAT.cpp::imply_literal` updates agility on every implication, decisions included, not just
/// at decisions; this is the single call site every assignment during search should go through
/// (`Trail::assign` itself stays a plain, agility-agnostic primitive for tests and bulk loading).
pub fn imply(
    mut ctx: partial!(Context, mut TrailP, mut StateP, SolverConfigP),
    lit: Lit,
    level: u32,
    reason: Reason,
) {
    let flipped = ctx.part(TrailP).phase(lit.var()) != lit.is_positive();
    let decay = ctx.part(SolverConfigP).agility_decay;
    let threshold_multiplier = ctx.part(SolverConfigP).threshold_multiplier;

    ctx.part_mut(TrailP).assign(lit, level, reason);

    let state = ctx.part_mut(StateP);
    state.agility = state.agility * decay + if flipped { 1.0 - decay } else { 0.0 };
    state.agility_threshold *= threshold_multiplier;
}

/// LSCB's lazy-reason registration (`original_source/src/solver/NapSAT.cpp::reimply_literal`).
///
/// Records `reason` as a cheaper way to imply `lit` at `reimplication_level`, unless `lit` is
/// already at or below that level, or already has a lazy reason at least as good.
pub fn try_lazy_reimply(
    mut ctx: partial!(Context, mut TrailP),
    lit: Lit,
    reason: Reason,
    reimplication_level: u32,
) {
    let trail = ctx.part(TrailP);
    let var = lit.var();
    if trail.lit_level(lit) <= reimplication_level {
        return;
    }
    if let Some((_, existing_level)) = trail.lazy_reason(var) {
        if existing_level <= reimplication_level {
            return;
        }
    }
    ctx.part_mut(TrailP)
        .set_lazy_reason(var, Some((reason, reimplication_level)));
}

/// Undo all assignments above `level`, per the regime's compaction rule (`spec.md` §4.5).
///
/// `NCB` truncates the trail outright. `WCB`/`RSCB`/`LSCB` compact it in place, keeping literals
/// at or below `level` in order; `RSCB` additionally re-queues every kept literal at exactly
/// `level`. `LSCB` additionally collects every undone literal whose lazy reason now holds at
/// `level` or below ("LSCB lazy reimplication", `spec.md` §4.5) and re-implies them, in ascending
/// order of their reimplication level, once the compaction pass is done.
///
/// Grounded on `original_source/src/solver/NapSAT.cpp::backtrack`.
pub fn backtrack(
    mut ctx: partial!(Context, mut HeapP, mut StateP, mut TrailP, SolverConfigP),
    regime: BacktrackRegime,
    level: u32,
) {
    let trail = ctx.part(TrailP);
    if level >= trail.current_level() {
        return;
    }

    let cut = trail.decision_index(level + 1);

    match regime {
        BacktrackRegime::Ncb => {
            let trail = ctx.part_mut(TrailP);
            let removed: Vec<Var> = trail.trail[cut..].iter().map(|lit| lit.var()).collect();
            trail.trail.truncate(cut);
            trail.decision_index.truncate(level as usize);
            trail.propagated = trail.trail.len();
            for var in removed {
                trail.unassign(var);
                make_available(ctx.borrow(), var);
            }
        }
        BacktrackRegime::Wcb | BacktrackRegime::Rscb | BacktrackRegime::Lscb => {
            let trail = ctx.part_mut(TrailP);
            let old_propagated = trail.propagated;
            let mut kept = Vec::with_capacity(trail.trail.len());
            let mut new_propagated = 0usize;
            let mut removed = vec![];
            let mut to_reimply: Vec<(u32, Lit, Reason)> = vec![];

            for (position, &lit) in trail.trail.iter().enumerate() {
                let var = lit.var();
                let var_level = trail.vars[var.index()].level;
                if var_level <= level {
                    // Re-queue literals at the cut level for RSCB: their implying reason may no
                    // longer hold once the levels above are undone.
                    let requeue = regime.is_restoring() && var_level == level;
                    if requeue {
                        trail.vars[var.index()].waiting = true;
                    }
                    if !requeue && position < old_propagated && !trail.vars[var.index()].waiting {
                        new_propagated += 1;
                    }
                    kept.push(lit);
                } else {
                    if regime.is_lazy() {
                        if let Some((reason, reimpl_level)) = trail.vars[var.index()].lazy_reason {
                            if reimpl_level <= level {
                                to_reimply.push((reimpl_level, lit, reason));
                            }
                        }
                    }
                    trail.unassign(var);
                    removed.push(var);
                }
            }

            trail.trail = kept;
            trail.decision_index.truncate(level as usize);
            trail.propagated = new_propagated;

            for var in removed {
                make_available(ctx.borrow(), var);
            }

            to_reimply.sort_unstable_by_key(|&(reimpl_level, _, _)| reimpl_level);
            for (reimpl_level, lit, reason) in to_reimply {
                imply(ctx.borrow(), lit, reimpl_level, reason);
            }
        }
    }
}
