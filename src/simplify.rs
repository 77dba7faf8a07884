//! Root-level simplification: drop satisfied clauses and falsified literals (`spec.md` §4.7).
//!
//! Grounded on the teacher's `simplify.rs` (`prove_units`/`simplify`), adapted to record each
//! shrunk clause's derivation via `crate::proof::Proof::remove_root_literals` (`spec.md` §4.9)
//! instead of the teacher's DRAT `ProofStep`/hash recording. `simplify_binary` rebuilds the whole
//! binary store from scratch rather than shrinking clauses one at a time, which doesn't fit
//! `remove_root_literals`'s single-clause shape; see `DESIGN.md` for why it stays unwired.
use partial_ref::{partial, PartialRef};

use crate::binary::BinaryClauses;
use crate::clause::{ClauseDb, ClauseHandle};
use crate::context::{BinaryClausesP, ClauseAllocP, ClauseDbP, Context, ProofP, TrailP, WatchlistsP};
use crate::lit::Lit;

/// Drop the trail's record of root-level assignments once they've been folded into the formula.
///
/// A no-op above level 0. Variables stay permanently assigned (`Trail::value` is unaffected); only
/// the ordered trail listing, which nothing needs any more, is dropped.
pub fn clear_proved_units(mut ctx: partial!(Context, mut TrailP)) -> bool {
    if ctx.part(TrailP).current_level() != 0 {
        return false;
    }
    let had_units = !ctx.part(TrailP).trail().is_empty();
    ctx.part_mut(TrailP).clear_root_trail();
    had_units
}

/// Shrink every clause against the root-level assignment, dropping falsified literals and
/// deleting satisfied clauses. Must only run at decision level 0, after a full propagation pass
/// (so neither watched literal of a long clause can be false).
pub fn simplify(
    mut ctx: partial!(
        Context,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ProofP,
        mut WatchlistsP,
        TrailP,
    ),
) {
    debug_assert_eq!(ctx.part(TrailP).current_level(), 0);

    simplify_binary(ctx.borrow());
    simplify_long(ctx.borrow());

    ClauseDb::collect_garbage(ctx.borrow());
}

fn simplify_binary(mut ctx: partial!(Context, mut BinaryClausesP, TrailP)) {
    let (binary_clauses, ctx) = ctx.split_part_mut(BinaryClausesP);
    let old = std::mem::take(binary_clauses);

    let mut rebuilt = BinaryClauses::default();
    rebuilt.set_var_count(old.var_count());

    let mut seen = std::collections::HashSet::new();
    for lit in old.all_lits() {
        for implication in old.implied(lit) {
            let a = !lit;
            let b = implication.lit;
            if ctx.part(TrailP).is_true(a) || ctx.part(TrailP).is_true(b) {
                continue;
            }
            let key = if a < b { (a, b) } else { (b, a) };
            if seen.insert(key) {
                rebuilt.add_binary_clause([a, b]);
            }
        }
    }

    *binary_clauses = rebuilt;
}

fn simplify_long(
    mut ctx: partial!(
        Context,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ProofP,
        mut WatchlistsP,
        TrailP,
    ),
) {
    let handles: Vec<_> = ctx.part(ClauseDbP).iter_handles().collect();
    let mut new_lits = Vec::new();
    let mut removed = Vec::new();

    for handle in handles {
        if ctx.part(ClauseAllocP).header(handle).deleted() {
            continue;
        }

        let capacity = ctx.part(ClauseAllocP).header(handle).len();
        let original: Vec<Lit> = ctx.part(ClauseAllocP).clause(handle).lits().to_vec();

        let satisfied = original.iter().any(|&lit| ctx.part(TrailP).is_true(lit));
        if satisfied {
            delete_long_clause(ctx.borrow(), handle, [original[0], original[1]], capacity);
            continue;
        }

        new_lits.clear();
        new_lits.push(original[0]);
        new_lits.push(original[1]);
        removed.clear();
        for &lit in &original[2..] {
            if ctx.part(TrailP).is_false(lit) {
                removed.push(lit);
            } else {
                new_lits.push(lit);
            }
        }

        if new_lits.len() == original.len() {
            continue;
        }

        let proof_id = ctx.part_mut(ProofP).remove_root_literals(handle, &new_lits, &removed);

        match new_lits[..] {
            // A watched literal can't be false by the propagator's invariant, so both survive:
            // shrinking can only ever produce binary or larger clauses.
            [] | [_] => unreachable!("watched literals cannot both be falsified"),
            [lit_0, lit_1] => {
                delete_long_clause(ctx.borrow(), handle, [lit_0, lit_1], capacity);
                let binary_handle = ctx.part_mut(BinaryClausesP).add_binary_clause([lit_0, lit_1]);
                if let Some(id) = proof_id {
                    ctx.part_mut(ProofP).register_handle(id, binary_handle);
                }
            }
            ref lits => {
                let clause = ctx.part_mut(ClauseAllocP).clause_mut(handle);
                clause.lits_mut()[..lits.len()].copy_from_slice(lits);
                clause.header_mut().set_len(lits.len());
            }
        }
    }
}

fn delete_long_clause(
    mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP, mut WatchlistsP),
    handle: ClauseHandle,
    watched_lits: [Lit; 2],
    capacity: usize,
) {
    ctx.part_mut(WatchlistsP).unwatch_clause(handle, watched_lits);
    ClauseDb::delete_clause(ctx.borrow(), handle);
    ctx.part_mut(ClauseAllocP).free_clause(handle, capacity);
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use crate::clause::{ClauseDb, ClauseHeader, Tier};
    use crate::context::{set_var_count, Context as Ctx};
    use crate::trail::Reason;

    #[test]
    fn drops_satisfied_and_shrinks_falsified() {
        let mut ctx = Ctx::default();
        let mut ctx = ctx.into_partial_ref_mut();
        set_var_count(ctx.borrow(), 10);

        ctx.part_mut(TrailP).assign(lit!(1), 0, Reason::Unit);
        ctx.part_mut(TrailP).assign(lit!(-2), 0, Reason::Unit);

        let mut header = ClauseHeader::new();
        header.set_tier(Tier::Irred);
        let satisfied = ClauseDb::add_clause(ctx.borrow(), header, &lits![1, 3, 4]);

        let mut header = ClauseHeader::new();
        header.set_tier(Tier::Irred);
        let shrinks = ClauseDb::add_clause(ctx.borrow(), header, &lits![3, 4, 2]);

        ctx.part_mut(crate::context::WatchlistsP)
            .watch_clause(satisfied, [lit!(1), lit!(3)]);
        ctx.part_mut(crate::context::WatchlistsP)
            .watch_clause(shrinks, [lit!(3), lit!(4)]);

        simplify(ctx.borrow());

        assert!(ctx.part(ClauseAllocP).header(satisfied).deleted());
        assert!(!ctx.part(ClauseAllocP).header(shrinks).deleted());
        assert_eq!(ctx.part(ClauseAllocP).clause(shrinks).lits(), &lits![3, 4][..]);
    }
}
