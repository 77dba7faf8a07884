//! Two-watched-literal unit propagation (`spec.md` §4.3).
//!
//! Grounded on the teacher's `prop/long.rs`/`prop/binary.rs` watch-scanning structure, combined
//! with the per-regime acceptance conditions from
//! `original_source/src/solver/NapSAT.cpp::propagate_lit`/`propagate_binary_clauses`/
//! `search_replacement`. The teacher's version is safe-but-unsafe-internally (raw pointers into
//! the watch list to dodge reallocation during the scan); this crate keeps the same
//! watch-rewriting algorithm but expressed with indices and a write cursor into the same `Vec`;
//! it is functionally equivalent, just not dependent on pointer arithmetic.
//!
//! Every regime shares the same scan; what differs is which skip/acceptance checks are
//! level-gated. NCB never retains a literal above the current propagation level, so its checks
//! are unconditional; WCB/RSCB/LSCB may, so a blocker or cached first literal is only skipped
//! when it holds at or below the level of the literal being propagated (`δ(b) ≤ δ(c1)`); LSCB
//! additionally may find a *true* replacement whose level is too high to accept outright, which
//! is recorded as a lazy reason (`trail::try_lazy_reimply`) instead of being skipped.
use partial_ref::{partial, PartialRef};

use crate::clause::ClauseHandle;
use crate::context::{BinaryClausesP, ClauseAllocP, Context, SolverConfigP, StateP, TrailP, WatchlistsP};
use crate::lit::Lit;
use crate::trail::{self, Reason, LEVEL_UNDEF};
use crate::watch::Watch;

/// Outcome of propagating a single literal: either no conflict, or the clause that conflicted.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Conflict {
    /// A binary clause whose both literals are falsified. Binary clauses have no arena storage,
    /// so the literals are carried directly rather than looked up through the handle.
    Binary(ClauseHandle, [Lit; 2]),
    Long(ClauseHandle),
}

impl Conflict {
    /// The literals of the conflicting clause.
    pub fn lits(
        self,
        ctx: &partial!(Context, ClauseAllocP),
    ) -> Vec<Lit> {
        match self {
            Conflict::Binary(_, lits) => lits.to_vec(),
            Conflict::Long(handle) => ctx.part(ClauseAllocP).clause(handle).lits().to_vec(),
        }
    }

    /// The clause handle of the conflicting clause, for activity bumping.
    pub fn handle(self) -> ClauseHandle {
        match self {
            Conflict::Binary(handle, _) => handle,
            Conflict::Long(handle) => handle,
        }
    }
}

/// Propagate every binary clause triggered by `lit` becoming false.
///
/// Binary implication lists are keyed by the literal whose assignment to *true* unblocks them
/// (`binary.rs::add_binary_clause` stores each side under the other's negation), so the lookup
/// below queries with `lit` itself, not `!lit`.
pub fn propagate_binary(
    mut ctx: partial!(Context, mut TrailP, mut StateP, BinaryClausesP, SolverConfigP),
    lit: Lit,
) -> Result<(), Conflict> {
    let false_lit = !lit;
    let lvl = ctx.part(TrailP).lit_level(false_lit);
    let lazy = ctx.part(SolverConfigP).backtracking.is_lazy();
    let implications: Vec<_> = ctx.part(BinaryClausesP).implied(lit).to_vec();

    for implication in implications {
        let other = implication.lit;
        match ctx.part(TrailP).value(other) {
            Some(true) => {
                // LSCB: `other` is already true, but at a level above the one this clause would
                // otherwise have implied it at -- record the cheaper reason as a lazy one
                // (`NapSAT.cpp::reimply_literal`, `spec.md` §4.3 step 1).
                if lazy && ctx.part(TrailP).lit_level(other) > lvl {
                    trail::try_lazy_reimply(
                        ctx.borrow(),
                        other,
                        Reason::Binary(false_lit, implication.handle),
                        lvl,
                    );
                }
            }
            Some(false) => {
                return Err(Conflict::Binary(implication.handle, [false_lit, other]));
            }
            None => {
                trail::imply(
                    ctx.borrow(),
                    other,
                    lvl,
                    Reason::Binary(false_lit, implication.handle),
                );
            }
        }
    }
    Ok(())
}

/// Propagate every long (size >= 3) clause watched by `lit` becoming false.
///
/// As with binary clauses, the watchlist queried here (`watch.rs::watch_clause` stores each
/// watched literal under the other's negation) is indexed by `lit`, the literal that just became
/// true, not by `false_lit`.
pub fn propagate_long(
    mut ctx: partial!(
        Context,
        mut TrailP,
        mut StateP,
        mut WatchlistsP,
        mut ClauseAllocP,
        SolverConfigP,
    ),
    lit: Lit,
) -> Result<(), Conflict> {
    let false_lit = !lit;
    let regime = ctx.part(SolverConfigP).backtracking;
    let chronological = regime.is_chronological();
    let lazy = regime.is_lazy();
    let lvl = ctx.part(TrailP).lit_level(false_lit);

    let watches = std::mem::take(ctx.part_mut(WatchlistsP).watched_by_mut(lit));
    let mut kept = Vec::with_capacity(watches.len());
    let mut conflict = None;

    let mut watches = watches.into_iter();
    while let Some(watch) = watches.next() {
        // NCB: a true blocker always skips the clause untouched. WCB/RSCB/LSCB additionally
        // require `δ(b) ≤ δ(c1)` (`spec.md` §4.3); above that level the clause may still need to
        // be revisited once backtracking undoes the blocker.
        if ctx.part(TrailP).is_true(watch.blocking) {
            let skip = !chronological || ctx.part(TrailP).lit_level(watch.blocking) <= lvl;
            if skip {
                kept.push(watch);
                continue;
            }
        }

        let clause = ctx.part_mut(ClauseAllocP).clause_mut(watch.handle);
        let lits = clause.lits_mut();
        if lits[0] == false_lit {
            lits.swap(0, 1);
        }
        let c2 = lits[0];

        // Same check against the clause's cached first literal: every regime but LSCB accepts a
        // true `c2` unconditionally, LSCB needs `δ(c2) ≤ δ(c1)` too (`spec.md` §4.3's
        // "otherwise, under LSCB" arm).
        if ctx.part(TrailP).is_true(c2) {
            let skip = !lazy || ctx.part(TrailP).lit_level(c2) <= lvl;
            if skip {
                kept.push(Watch { handle: watch.handle, blocking: c2 });
                continue;
            }
        }

        // `search_replacement`: scan the clause's tail for a non-false literal; chronological
        // regimes also track the highest-level falsified literal seen, in case none is found, so
        // that literal can become the new `c1` (`δ(c1)` then tracks `δ(C \ {c2})`).
        let low_sat_lvl = if ctx.part(TrailP).is_true(c2) {
            ctx.part(TrailP).lit_level(c2)
        } else {
            LEVEL_UNDEF
        };
        let clause = ctx.part(ClauseAllocP).clause(watch.handle);
        let lits = clause.lits();
        let mut high_idx = 1usize;
        let mut high_lvl = ctx.part(TrailP).lit_level(lits[1]);
        let mut found = None;
        for k in 2..lits.len() {
            if !ctx.part(TrailP).is_false(lits[k]) {
                found = Some(k);
                break;
            }
            let k_lvl = ctx.part(TrailP).lit_level(lits[k]);
            if chronological && k_lvl > high_lvl {
                high_lvl = k_lvl;
                high_idx = k;
            }
            if low_sat_lvl <= high_lvl {
                found = Some(k);
                break;
            }
        }
        let replacement_idx = found.unwrap_or(high_idx);
        let clause = ctx.part(ClauseAllocP).clause(watch.handle);
        let replacement = clause.lits()[replacement_idx];
        let replacement_lvl = ctx.part(TrailP).lit_level(replacement);

        // A satisfied replacement at or below the propagation level becomes the new cached
        // blocker; the watch stays where it is.
        if ctx.part(TrailP).is_true(replacement) && replacement_lvl <= lvl {
            kept.push(Watch { handle: watch.handle, blocking: replacement });
            continue;
        }

        if !ctx.part(TrailP).is_false(replacement) {
            // Undefined, or satisfied above the level: move the watch onto `replacement`.
            let clause = ctx.part_mut(ClauseAllocP).clause_mut(watch.handle);
            let lits = clause.lits_mut();
            lits[1] = replacement;
            lits[replacement_idx] = false_lit;
            ctx.part_mut(WatchlistsP)
                .add_watch(!replacement, Watch { handle: watch.handle, blocking: c2 });
            continue;
        }

        // No non-false replacement: `replacement` is the highest-level falsified literal among
        // `C \ {c2}`. Chronological regimes re-watch on it (swapping it into the `c1` slot) so
        // that `δ(c1)` reflects `δ(C \ {c2})` for the checks above and for backtrack's
        // watch-validity bookkeeping; NCB has nothing to gain from this and leaves `c1` in place.
        if replacement_idx != 1 {
            let clause = ctx.part_mut(ClauseAllocP).clause_mut(watch.handle);
            let lits = clause.lits_mut();
            lits[1] = replacement;
            lits[replacement_idx] = false_lit;
            ctx.part_mut(WatchlistsP)
                .add_watch(!replacement, Watch { handle: watch.handle, blocking: c2 });
        } else {
            kept.push(Watch { handle: watch.handle, blocking: c2 });
        }

        if ctx.part(TrailP).is_false(c2) {
            let clause = ctx.part_mut(ClauseAllocP).clause_mut(watch.handle);
            let lits = clause.lits_mut();
            if ctx.part(TrailP).lit_level(lits[0]) < ctx.part(TrailP).lit_level(lits[1]) {
                lits.swap(0, 1);
            }
            conflict = Some(Conflict::Long(watch.handle));
            break;
        }

        if ctx.part(TrailP).is_undef(c2) {
            trail::imply(ctx.borrow(), c2, replacement_lvl, Reason::Long(watch.handle));
            continue;
        }

        // `c2` is true, but at a level above `replacement_lvl`: a missed lower implication, only
        // reachable under LSCB (every other regime's skip check above already absorbed a true
        // `c2`, `spec.md` §4.3 step 2).
        trail::try_lazy_reimply(ctx.borrow(), c2, Reason::Long(watch.handle), replacement_lvl);
    }

    for watch in watches {
        kept.push(watch);
    }
    *ctx.part_mut(WatchlistsP).watched_by_mut(lit) = kept;

    match conflict {
        Some(conflict) => Err(conflict),
        None => Ok(()),
    }
}

/// Drain the propagation queue, alternating binary and long propagation for each dequeued
/// literal, stopping at the first conflict.
pub fn propagate(
    mut ctx: partial!(
        Context,
        mut TrailP,
        mut StateP,
        mut WatchlistsP,
        mut ClauseAllocP,
        BinaryClausesP,
        SolverConfigP,
    ),
) -> Result<(), Conflict> {
    loop {
        let lit = match ctx.part(TrailP).queue_head() {
            Some(lit) => lit,
            None => return Ok(()),
        };

        propagate_binary(ctx.borrow(), lit)?;
        propagate_long(ctx.borrow(), lit)?;

        ctx.part_mut(TrailP).advance_queue();
    }
}
