//! ReduceDB: periodic deletion of low-activity learned clauses (`spec.md` §4.8).
use std::mem::replace;

use partial_ref::{partial, PartialRef};
use vec_mut_scan::VecMutScan;

use crate::context::{ClauseActivityP, ClauseAllocP, ClauseDbP, Context, WatchlistsP};
use crate::watch::Watchlists;

use super::db::Tier;
use super::ClauseDb;

/// Remove deleted and duplicate entries from a tier's `by_tier` list.
///
/// Side effect: sets the mark bit on every surviving clause of `tier`, used to detect duplicates.
pub fn dedup_and_mark_by_tier(mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP), tier: Tier) {
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let by_tier = &mut ctx.part_mut(ClauseDbP).by_tier[tier as usize];

    by_tier.retain(|&handle| {
        let header = alloc.header_mut(handle);
        let retain = !header.deleted() && !header.mark() && header.tier() == tier;
        if retain {
            header.set_mark(true);
        }
        retain
    });
}

/// Unwatch and free a clause's slot. Returns `false` if the clause is currently a reason on the
/// trail and must not be deleted yet.
fn try_delete_clause(
    mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP, mut WatchlistsP),
    handle: super::ClauseHandle,
) -> bool {
    let header = ctx.part(ClauseAllocP).header(handle);
    if header.active() {
        return false;
    }

    let capacity = header.len();
    let lits = {
        let lits = ctx.part(ClauseAllocP).clause(handle).lits();
        [lits[0], lits[1]]
    };
    ctx.part_mut(WatchlistsP).unwatch_clause(handle, lits);
    ClauseDb::delete_clause(ctx.borrow(), handle);
    ctx.part_mut(ClauseAllocP).free_clause(handle, capacity);
    true
}

/// Delete the lowest-activity half of the local tier.
///
/// Grounded on the teacher's `clause/reduce.rs::reduce_locals`, generalized from a pure
/// glue-based sort to the activity-threshold rule of `spec.md` §4.8: a clause below
/// `clause_elimination_multiplier * average_activity` is a deletion candidate.
pub fn reduce_locals(
    mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP, mut WatchlistsP, ClauseActivityP),
) {
    dedup_and_mark_by_tier(ctx.borrow(), Tier::Local);

    let mut locals = replace(&mut ctx.part_mut(ClauseDbP).by_tier[Tier::Local as usize], vec![]);

    locals.sort_unstable_by(|&a, &b| {
        let a = ctx.part(ClauseAllocP).header(a).activity();
        let b = ctx.part(ClauseAllocP).header(b).activity();
        a.partial_cmp(&b).unwrap()
    });

    let mut to_delete = locals.len() / 2;
    let mut scan = VecMutScan::new(&mut locals);

    if to_delete > 0 {
        while let Some(handle) = scan.next() {
            ctx.part_mut(ClauseAllocP).header_mut(*handle).set_mark(false);

            if try_delete_clause(ctx.borrow(), *handle) {
                handle.remove();
                to_delete -= 1;
                if to_delete == 0 {
                    break;
                }
            }
        }
    }

    while let Some(handle) = scan.next() {
        ctx.part_mut(ClauseAllocP).header_mut(*handle).set_mark(false);
    }

    drop(scan);

    let db = ctx.part_mut(ClauseDbP);
    db.count_by_tier[Tier::Local as usize] = locals.len();
    db.by_tier[Tier::Local as usize] = locals;
}

/// Demote inactive mid-tier clauses to the local tier, clearing the activity flag on the rest.
///
/// Grounded on the teacher's `clause/reduce.rs::reduce_mids`.
pub fn reduce_mids(mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP)) {
    dedup_and_mark_by_tier(ctx.borrow(), Tier::Mid);

    let mut mids = replace(&mut ctx.part_mut(ClauseDbP).by_tier[Tier::Mid as usize], vec![]);

    mids.retain(|&handle| {
        let header = ctx.part_mut(ClauseAllocP).header_mut(handle);
        header.set_mark(false);

        if header.active() {
            header.set_active(false);
            true
        } else {
            ClauseDb::set_tier(ctx.borrow(), handle, Tier::Local);
            false
        }
    });

    let db = ctx.part_mut(ClauseDbP);
    db.count_by_tier[Tier::Mid as usize] = mids.len();
    db.by_tier[Tier::Mid as usize] = mids;
}
