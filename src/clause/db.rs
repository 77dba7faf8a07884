//! Database for arena-allocated (size >= 3) clauses.
use std::mem::transmute;

use partial_ref::{partial, PartialRef};

use super::{header::HEADER_LEN, ClauseAlloc, ClauseHandle, ClauseHeader};

use crate::context::{ClauseAllocP, ClauseDbP, Context};
use crate::lit::Lit;

/// Partitions of the clause database.
///
/// Follows the four-tier scheme from Chanseok Oh, "Between SAT and UNSAT: The Fundamental
/// Difference in CDCL SAT" -- used here purely as a promotion/demotion heuristic feeding the
/// reduceDB candidate set; actual deletion is driven by activity vs. threshold per
/// `spec.md` §4.8 (see `clause/reduce.rs`).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Tier {
    Irred = 0,
    Core = 1,
    Mid = 2,
    Local = 3,
}

impl Tier {
    pub const fn count() -> usize {
        4
    }

    /// # Safety
    /// `index` must be `< Tier::count()`.
    pub unsafe fn from_index(index: usize) -> Tier {
        debug_assert!(index < Tier::count());
        transmute(index as u8)
    }
}

/// Database for long (size >= 3) clauses.
///
/// Removal from `clauses`/`by_tier` is delayed; the header's `deleted`/`tier` fields must be
/// checked when iterating. `by_tier` may contain duplicate or stale entries.
#[derive(Default)]
pub struct ClauseDb {
    clauses: Vec<ClauseHandle>,
    pub(super) by_tier: [Vec<ClauseHandle>; Tier::count()],
    pub(super) count_by_tier: [usize; Tier::count()],
    garbage_size: usize,
}

impl ClauseDb {
    pub fn add_clause(
        mut ctx: partial!(Context, mut ClauseDbP, mut ClauseAllocP),
        header: ClauseHeader,
        lits: &[Lit],
    ) -> ClauseHandle {
        let tier = header.tier();
        let handle = ctx.part_mut(ClauseAllocP).add_clause(header, lits);

        let db = ctx.part_mut(ClauseDbP);
        db.clauses.push(handle);
        db.by_tier[tier as usize].push(handle);
        db.count_by_tier[tier as usize] += 1;

        handle
    }

    pub fn set_tier(
        mut ctx: partial!(Context, mut ClauseDbP, mut ClauseAllocP),
        handle: ClauseHandle,
        tier: Tier,
    ) {
        let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
        let db = ctx.part_mut(ClauseDbP);

        let old_tier = alloc.header(handle).tier();
        if old_tier != tier {
            db.count_by_tier[old_tier as usize] -= 1;
            db.count_by_tier[tier as usize] += 1;
            alloc.header_mut(handle).set_tier(tier);
            db.by_tier[tier as usize].push(handle);
        }
    }

    /// Mark a clause deleted. Does not touch watch lists; callers must unwatch first.
    pub fn delete_clause(
        mut ctx: partial!(Context, mut ClauseDbP, mut ClauseAllocP),
        handle: ClauseHandle,
    ) {
        let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
        let db = ctx.part_mut(ClauseDbP);

        let header = alloc.header_mut(handle);
        debug_assert!(!header.deleted(), "delete_clause on an already deleted clause");
        header.set_deleted(true);

        db.count_by_tier[header.tier() as usize] -= 1;
        db.garbage_size += header.len() + HEADER_LEN;
    }

    pub fn count_by_tier(&self, tier: Tier) -> usize {
        self.count_by_tier[tier as usize]
    }

    /// Perform a garbage collection if a large-enough fraction of the arena is garbage.
    pub fn collect_garbage(mut ctx: partial!(Context, mut ClauseDbP, mut ClauseAllocP)) {
        let alloc = ctx.part(ClauseAllocP);
        let db = ctx.part(ClauseDbP);

        if db.garbage_size * 2 > alloc.buffer_size() {
            Self::collect_garbage_now(ctx.borrow());
        }
    }

    /// Unconditionally rebuild the arena, dropping deleted clauses.
    pub fn collect_garbage_now(mut ctx: partial!(Context, mut ClauseDbP, mut ClauseAllocP)) {
        let (db, mut ctx) = ctx.split_part_mut(ClauseDbP);
        let alloc = ctx.part(ClauseAllocP);

        let current_size = alloc.buffer_size() - db.garbage_size;
        let mut new_alloc = ClauseAlloc::with_capacity(current_size * 2);

        let mut new_clauses = vec![];
        let mut new_by_tier: [Vec<_>; Tier::count()] = Default::default();

        for &handle in db.clauses.iter() {
            let clause = alloc.clause(handle);
            if clause.header().deleted() {
                continue;
            }
            let header = *clause.header();
            let new_handle = new_alloc.add_clause(header, clause.lits());
            new_clauses.push(new_handle);
            new_by_tier[header.tier() as usize].push(new_handle);
        }

        *ctx.part_mut(ClauseAllocP) = new_alloc;
        db.clauses = new_clauses;
        db.by_tier = new_by_tier;
        db.garbage_size = 0;
    }

    /// Iterate all non-deleted clause handles (used by the root simplifier).
    pub fn iter_handles(&self) -> impl Iterator<Item = ClauseHandle> + '_ {
        self.clauses.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partial_ref::IntoPartialRefMut;

    use crate::cnf::strategy::*;
    use crate::context::Context;

    #[test]
    fn set_tiers_and_deletes() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let clauses = cnf_formula![
            1, 2, 3;
            4, -5, 6;
        ];

        let mut handles = vec![];
        for clause in clauses.iter() {
            let mut header = ClauseHeader::new();
            header.set_tier(Tier::Irred);
            handles.push(ClauseDb::add_clause(ctx.borrow(), header, clause));
        }

        ClauseDb::set_tier(ctx.borrow(), handles[0], Tier::Core);
        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Core), 1);
        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Irred), 1);
    }
}
