//! Watchlists to detect long (size >= 3) clauses that became unit.
//!
//! Each long clause has exactly two watches, kept in the watchlists of two of its literals.
//! Whenever a watch moves to a different literal, the clause's own literals are permuted so the
//! watched pair occupies positions 0 and 1. When a clause is not unit, the watched literals point
//! at two non-false literals; when a clause is unit and propagating, the implied (true) literal is
//! watched at position 0 and the other watch is the literal with the highest decision level,
//! kept at position 1 (needed so weak/lazy regimes can find the right demotion level,
//! `spec.md` §4.3/§4.5).
//!
//! As in the teacher, each watch additionally stores a *blocking literal*: some literal of the
//! clause other than the watched one. If the blocking literal is true the clause is already
//! satisfied and the watch can be skipped without touching the clause arena.
use crate::clause::ClauseHandle;
use crate::lit::Lit;

/// A watch on a long clause.
#[derive(Copy, Clone)]
pub struct Watch {
    pub handle: ClauseHandle,
    pub blocking: Lit,
}

/// Watchlists indexed by literal.
#[derive(Default)]
pub struct Watchlists {
    watches: Vec<Vec<Watch>>,
}

impl Watchlists {
    pub fn set_var_count(&mut self, count: usize) {
        self.watches.resize(count * 2, vec![]);
    }

    /// Start watching a clause. `lits` must be the first two literals of the clause.
    pub fn watch_clause(&mut self, handle: ClauseHandle, lits: [Lit; 2]) {
        for i in 0..2 {
            let watch = Watch {
                handle,
                blocking: lits[i ^ 1],
            };
            self.watches[(!lits[i]).code()].push(watch);
        }
    }

    /// Watches triggered by `lit` becoming false.
    pub fn watched_by_mut(&mut self, lit: Lit) -> &mut Vec<Watch> {
        &mut self.watches[lit.code()]
    }

    pub fn add_watch(&mut self, lit: Lit, watch: Watch) {
        self.watches[lit.code()].push(watch);
    }

    /// Remove every watch on `handle`. Used when a clause is deleted by reduceDB or simplification
    /// (`spec.md` §4.8); callers must already know which two literals it was watched on, since a
    /// freed clause's storage may already have been reused by the time this runs.
    pub fn unwatch_clause(&mut self, handle: ClauseHandle, lits: [Lit; 2]) {
        for i in 0..2 {
            let list = &mut self.watches[(!lits[i]).code()];
            if let Some(position) = list.iter().position(|watch| watch.handle == handle) {
                list.swap_remove(position);
            }
        }
    }
}
