//! Binary clauses.
//!
//! Binary clauses never enter the clause arena (`spec.md` §4.2): both literals are stored
//! directly in a per-literal implication list, avoiding a watch-list lookup for the most common
//! clause size. Each entry also carries the clause's own [`ClauseHandle`], a deviation from the
//! teacher's `binary.rs` needed so binary clauses can still be named as a conflict/reason source
//! and recorded in a resolution proof (`spec.md` §4.9), even though they hold no arena storage.
use crate::clause::ClauseHandle;
use crate::lit::Lit;

/// The other literal of a binary clause, paired with a handle identifying the clause itself.
#[derive(Copy, Clone)]
pub struct BinaryImplication {
    pub lit: Lit,
    pub handle: ClauseHandle,
}

/// Binary clauses, indexed by the literal whose falsity would make them unit.
#[derive(Default)]
pub struct BinaryClauses {
    by_lit: Vec<Vec<BinaryImplication>>,
    count: usize,
    next_handle: u32,
}

impl BinaryClauses {
    pub fn set_var_count(&mut self, count: usize) {
        self.by_lit.resize(count * 2, vec![]);
    }

    /// Add a binary clause, returning a handle that identifies it for proof recording.
    pub fn add_binary_clause(&mut self, lits: [Lit; 2]) -> ClauseHandle {
        let handle = ClauseHandle::from_binary_index(self.next_handle);
        self.next_handle += 1;

        for i in 0..2 {
            self.by_lit[(!lits[i]).code()].push(BinaryImplication {
                lit: lits[i ^ 1],
                handle,
            });
        }
        self.count += 1;
        handle
    }

    /// Implications of a given literal becoming false.
    pub fn implied(&self, lit: Lit) -> &[BinaryImplication] {
        &self.by_lit[lit.code()]
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn var_count(&self) -> usize {
        self.by_lit.len() / 2
    }

    /// Every literal with a non-empty implication list, for root-level simplification.
    pub fn all_lits(&self) -> impl Iterator<Item = Lit> + '_ {
        (0..self.by_lit.len() as u32).map(Lit::from_code)
    }
}
