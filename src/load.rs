//! Loading clauses into the solver (`spec.md` §6.1 `add_clause`).
use partial_ref::{partial, PartialRef};

use crate::clause::{ClauseDb, ClauseHandle, ClauseHeader, Tier};
use crate::context::{
    BinaryClausesP, ClauseAllocP, ClauseDbP, Context, ProofP, StateP, TrailP, WatchlistsP,
};
use crate::lit::Lit;
use crate::state::Status;
use crate::trail::Reason;

/// Add a clause to the current formula.
///
/// Deduplicates literals, discards tautological clauses (`x v -x v ...`), and dispatches the
/// simplified clause among unit/binary/long storage. Unlike the teacher's `load_clause`, this
/// crate has no incremental assumption layer (`spec.md` §1 Non-goals), so there is no restart or
/// selector bookkeeping to do here beyond the simplification itself.
///
/// Returns the clause's handle (`spec.md` §6.1 `add_clause(lits[]) -> clause handle`), or `None`
/// if the clause simplified away entirely (tautology, already-satisfied, or became a root-level
/// unit with no arena/binary storage of its own).
pub fn load_clause(
    mut ctx: partial!(
        Context,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ProofP,
        mut StateP,
        mut TrailP,
        mut WatchlistsP,
    ),
    lits: &[Lit],
) -> Option<ClauseHandle> {
    if ctx.part(StateP).status == Status::Unsat {
        return None;
    }

    let mut sorted: Vec<Lit> = lits.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut last = None;
    for &lit in sorted.iter() {
        if last == Some(!lit) {
            return None;
        }
        last = Some(lit);
    }

    let mut simplified = Vec::with_capacity(sorted.len());
    for &lit in sorted.iter() {
        match ctx.part(TrailP).value(lit) {
            Some(true) => return None,
            Some(false) => (),
            None => simplified.push(lit),
        }
    }

    // `input_clause`/`register_unit`/`register_handle` are no-ops when proof recording is
    // disabled, so this never needs to branch on `ProofP::enabled`.
    let proof_id = ctx.part(ProofP).len() as u32;
    ctx.part_mut(ProofP).input_clause(proof_id, &simplified);

    match simplified[..] {
        [] => {
            ctx.part_mut(StateP).status = Status::Unsat;
            None
        }
        [lit] => {
            if ctx.part(TrailP).current_level() == 0 {
                ctx.part_mut(TrailP).assign(lit, 0, Reason::Unit);
                ctx.part_mut(ProofP).register_unit(proof_id, lit);
            }
            None
        }
        [lit_0, lit_1] => {
            let handle = ctx.part_mut(BinaryClausesP).add_binary_clause([lit_0, lit_1]);
            ctx.part_mut(ProofP).register_handle(proof_id, handle);
            Some(handle)
        }
        _ => {
            let mut header = ClauseHeader::new();
            header.set_tier(Tier::Irred);
            let handle = ClauseDb::add_clause(ctx.borrow(), header, &simplified);
            let watch_lits = [simplified[0], simplified[1]];
            ctx.part_mut(WatchlistsP).watch_clause(handle, watch_lits);
            ctx.part_mut(ProofP).register_handle(proof_id, handle);
            Some(handle)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use crate::clause::Tier;
    use crate::context::{set_var_count, Context as Ctx};

    #[test]
    fn unsat_on_empty_clause() {
        let mut ctx = Ctx::default();
        let mut ctx = ctx.into_partial_ref_mut();
        set_var_count(ctx.borrow(), 10);

        load_clause(ctx.borrow(), &[]);

        assert_eq!(ctx.part(StateP).status, Status::Unsat);
    }

    #[test]
    fn unit_clauses() {
        let mut ctx = Ctx::default();
        let mut ctx = ctx.into_partial_ref_mut();
        set_var_count(ctx.borrow(), 10);

        load_clause(ctx.borrow(), &lits![1]);
        assert_eq!(ctx.part(TrailP).trail().len(), 1);

        load_clause(ctx.borrow(), &lits![3, -3]);
        assert_eq!(ctx.part(TrailP).trail().len(), 1);

        load_clause(ctx.borrow(), &lits![-2]);
        assert_eq!(ctx.part(TrailP).trail().len(), 2);
    }

    #[test]
    fn binary_clauses() {
        let mut ctx = Ctx::default();
        let mut ctx = ctx.into_partial_ref_mut();
        set_var_count(ctx.borrow(), 10);

        load_clause(ctx.borrow(), &lits![1, 2]);
        assert_eq!(ctx.part(BinaryClausesP).count(), 1);

        load_clause(ctx.borrow(), &lits![-1, 3, 3]);
        assert_eq!(ctx.part(BinaryClausesP).count(), 2);
    }

    #[test]
    fn long_clauses() {
        let mut ctx = Ctx::default();
        let mut ctx = ctx.into_partial_ref_mut();
        set_var_count(ctx.borrow(), 10);

        load_clause(ctx.borrow(), &lits![1, 2, 3]);
        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Irred), 1);
    }
}
