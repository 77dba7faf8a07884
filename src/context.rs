//! Central solver data structure.
//!
//! Defines [`Context`], which holds every piece of data used by the solver, plus the
//! cross-cutting notification functions (`set_var_count`, `config_changed`) that need to touch
//! several parts at once. Grounded on the teacher's `context.rs`, trimmed of the incremental
//! assumption/renaming machinery (`variables.rs`/`incremental.rs`) that `spec.md` §1 places out
//! of scope.
use partial_ref::{part, partial, PartialRef, PartialRefTarget};

use crate::analyze_conflict::AnalyzeConflict;
use crate::binary::BinaryClauses;
use crate::clause::{ClauseActivity, ClauseAlloc, ClauseDb};
use crate::config::{BacktrackRegime, SolverConfig};
use crate::decision::VarActivity;
use crate::heap::ActivityHeap;
use crate::proof::Proof;
use crate::state::SolverState;
use crate::tmp::TmpData;
use crate::trail::Trail;
use crate::watch::Watchlists;

/// Part declarations for the [`Context`] struct.
pub mod parts {
    use super::*;

    part!(pub AnalyzeConflictP: AnalyzeConflict);
    part!(pub BinaryClausesP: BinaryClauses);
    part!(pub ClauseActivityP: ClauseActivity);
    part!(pub ClauseAllocP: ClauseAlloc);
    part!(pub ClauseDbP: ClauseDb);
    part!(pub HeapP: ActivityHeap);
    part!(pub ProofP: Proof);
    part!(pub SolverConfigP: SolverConfig);
    part!(pub StateP: SolverState);
    part!(pub TmpDataP: TmpData);
    part!(pub TrailP: Trail);
    part!(pub VarActivityP: VarActivity);
    part!(pub WatchlistsP: Watchlists);
}

use parts::*;

/// Central solver data structure.
///
/// Most functions operating on several fields take `partial_ref` partial borrows rather than
/// `&mut Context`, documenting their data dependencies while still satisfying the borrow checker.
#[derive(PartialRefTarget, Default)]
pub struct Context {
    #[part(AnalyzeConflictP)]
    pub analyze_conflict: AnalyzeConflict,
    #[part(BinaryClausesP)]
    pub binary_clauses: BinaryClauses,
    #[part(ClauseActivityP)]
    pub clause_activity: ClauseActivity,
    #[part(ClauseAllocP)]
    pub clause_alloc: ClauseAlloc,
    #[part(ClauseDbP)]
    pub clause_db: ClauseDb,
    #[part(HeapP)]
    pub heap: ActivityHeap,
    #[part(ProofP)]
    pub proof: Proof,
    #[part(SolverConfigP)]
    pub solver_config: SolverConfig,
    #[part(StateP)]
    pub state: SolverState,
    #[part(TmpDataP)]
    pub tmp_data: TmpData,
    #[part(TrailP)]
    pub trail: Trail,
    #[part(VarActivityP)]
    pub var_activity: VarActivity,
    #[part(WatchlistsP)]
    pub watchlists: Watchlists,
}

/// Update structures for a new variable count.
pub fn set_var_count(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut BinaryClausesP,
        mut HeapP,
        mut TrailP,
        mut WatchlistsP,
    ),
    count: usize,
) {
    ctx.part_mut(AnalyzeConflictP).set_var_count(count);
    ctx.part_mut(BinaryClausesP).set_var_count(count);
    ctx.part_mut(HeapP).set_key_count(count);
    ctx.part_mut(TrailP).set_var_count(count);
    ctx.part_mut(WatchlistsP).set_var_count(count);

    for key in 0..count as u32 {
        if !ctx.part(HeapP).contains(key) {
            ctx.part_mut(HeapP).insert(key, 0.0);
        }
    }
}

/// Grow every per-variable structure to at least `count` variables, if not already that large.
///
/// Grounded on the teacher's `ensure_var_count`, with its `VariablesP.solver_watermark()` lookup
/// (this crate has no incremental renaming layer, see `DESIGN.md`) replaced by `Trail::var_count`.
pub fn ensure_var_count(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut BinaryClausesP,
        mut HeapP,
        mut TrailP,
        mut WatchlistsP,
    ),
    count: usize,
) {
    if count > ctx.part(TrailP).var_count() {
        set_var_count(ctx.borrow(), count);
    }
}

/// The solver configuration has changed: propagate decay rates to the parts that cache them.
pub fn config_changed(mut ctx: partial!(Context, mut VarActivityP, mut ClauseActivityP, SolverConfigP)) {
    let (config, mut ctx) = ctx.split_part(SolverConfigP);
    ctx.part_mut(VarActivityP).set_decay(config.var_activity_decay);
    ctx.part_mut(ClauseActivityP)
        .set_multiplier(config.clause_activity_multiplier);
}

/// The active backtracking regime, a convenience accessor used throughout the solve loop.
pub fn regime(ctx: partial!(Context, SolverConfigP)) -> BacktrackRegime {
    ctx.part(SolverConfigP).backtracking
}
