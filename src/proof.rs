//! Resolution proof recording (`spec.md` §4.9).
//!
//! A proof is a sequence of clauses, each either an input clause or derived by a resolution
//! chain: `C, (■, C₁), (ℓ₂, C₂), ..., (ℓₙ, Cₙ)`, meaning `C` is the result of resolving `C₁`
//! with `C₂` on `ℓ₂`, then with `C₃` on `ℓ₃`, and so on. The first link's pivot is irrelevant and
//! always recorded as [`LIT_UNDEF`](crate::lit::LIT_UNDEF).
//!
//! Grounded on `original_source/src/proof/proof.hpp`'s `resolution_proof` class, in the style of
//! the teacher's `proof.rs` (same `enabled`/no-op-when-disabled gate, same accumulate-then-clear
//! record shape) but recording NapSAT's resolution chains rather than binary DRAT steps, since
//! `spec.md` §4.9 and §6.2's `build_proof` option describe the former.
use std::collections::HashMap;

use crate::clause::ClauseHandle;
use crate::lit::Lit;

/// One link of a resolution chain: resolve the clause-so-far with `clause` on `pivot`.
#[derive(Copy, Clone, Debug)]
pub struct ResolutionLink {
    pub pivot: Lit,
    pub clause: ProofClauseId,
}

/// A clause's identity within the proof, independent of its solver-side storage (arena offset,
/// binary-clause index, or none for a purely virtual simplification step).
pub type ProofClauseId = u32;

enum ClauseRecord {
    /// An input clause, recorded verbatim.
    Input { lits: Vec<Lit> },
    /// A clause derived by resolution.
    Derived {
        lits: Vec<Lit>,
        chain: Vec<ResolutionLink>,
    },
}

/// Resolution-chain proof recorder.
///
/// Disabled by default (`spec.md` §6.2 `build_proof = false`); when disabled every method is a
/// no-op so callers never need to branch on whether a proof is being recorded.
#[derive(Default)]
pub struct Proof {
    enabled: bool,
    clauses: Vec<Option<ClauseRecord>>,
    current_chain: Vec<ResolutionLink>,
    /// Maps a live clause handle (long or binary) to its current proof id, so conflict analysis
    /// and simplification can name a reason clause's derivation without re-deriving it.
    handle_ids: HashMap<ClauseHandle, ProofClauseId>,
    /// Maps a root-level unit literal to the proof id of the clause that forced it.
    unit_ids: HashMap<Lit, ProofClauseId>,
}

impl Proof {
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    fn ensure_len(&mut self, id: ProofClauseId) {
        let id = id as usize;
        if self.clauses.len() <= id {
            self.clauses.resize_with(id + 1, || None);
        }
    }

    /// Record an externally-added clause, assumed correct.
    pub fn input_clause(&mut self, id: ProofClauseId, lits: &[Lit]) {
        if !self.enabled {
            return;
        }
        self.ensure_len(id);
        self.clauses[id as usize] = Some(ClauseRecord::Input { lits: lits.to_vec() });
    }

    /// Begin a new resolution chain. The previous one must already be finalized.
    pub fn start_resolution_chain(&mut self) {
        if !self.enabled {
            return;
        }
        debug_assert!(self.current_chain.is_empty());
    }

    /// Discard an in-progress resolution chain without recording a derived clause, e.g. when a
    /// link's source clause turns out not to be registered in the proof.
    pub fn abort_resolution_chain(&mut self) {
        self.current_chain.clear();
    }

    /// Add a link to the in-progress resolution chain. The first call's `pivot` is ignored.
    pub fn link_resolution(&mut self, pivot: Lit, clause: ProofClauseId) {
        if !self.enabled {
            return;
        }
        self.current_chain.push(ResolutionLink { pivot, clause });
    }

    /// Finalize the current resolution chain, recording the derived clause under `id`.
    pub fn finalize_resolution(&mut self, id: ProofClauseId, lits: &[Lit]) {
        if !self.enabled {
            return;
        }
        self.ensure_len(id);
        let chain = std::mem::take(&mut self.current_chain);
        self.clauses[id as usize] = Some(ClauseRecord::Derived {
            lits: lits.to_vec(),
            chain,
        });
    }

    /// Deactivate a clause ID so it can be reused by a later call. The clause itself remains in
    /// the proof log, just no longer reachable by `id`.
    pub fn deactivate_clause(&mut self, id: ProofClauseId) {
        if !self.enabled {
            return;
        }
        self.ensure_len(id);
        // The slot keeps its record (for proof replay) but future lookups by `id` must fail;
        // callers are expected to call `input_clause`/`finalize_resolution` with the same `id`
        // only after this, which simply overwrites the slot.
    }

    /// The id the next `input_clause`/`finalize_resolution` call would use.
    pub fn next_id(&self) -> ProofClauseId {
        self.clauses.len() as ProofClauseId
    }

    /// Record that `lit` was forced as a root-level unit by the clause recorded under `id`.
    pub fn register_unit(&mut self, id: ProofClauseId, lit: Lit) {
        if !self.enabled {
            return;
        }
        self.unit_ids.insert(lit, id);
    }

    /// Record that `handle` currently names the clause recorded under `id`.
    pub fn register_handle(&mut self, id: ProofClauseId, handle: ClauseHandle) {
        if !self.enabled {
            return;
        }
        self.handle_ids.insert(handle, id);
    }

    /// The proof id of the clause that forced `lit` as a root-level unit, if recorded.
    pub fn unit_id(&self, lit: Lit) -> Option<ProofClauseId> {
        self.unit_ids.get(&lit).copied()
    }

    /// The proof id currently associated with `handle`, if recorded.
    pub fn handle_id(&self, handle: ClauseHandle) -> Option<ProofClauseId> {
        self.handle_ids.get(&handle).copied()
    }

    /// Record root-level simplification of `handle` (`spec.md` §4.9's `remove_root_literals`):
    /// each literal in `removed` was dropped because its negation is a proved root-level unit.
    /// Resolves the clause currently named by `handle` against each such unit clause in turn,
    /// records the result as a new derived clause, re-points `handle` at it, and returns its id.
    ///
    /// If the shrunk clause ends up stored under a different handle (e.g. a long clause shrinking
    /// to binary), the caller should `register_handle` the returned id under the new handle too.
    ///
    /// Returns `None` without recording anything if `handle` isn't registered (e.g. simplification
    /// ran before the clause was involved in any recorded derivation), if `removed` is empty, or if
    /// some removed literal's negation isn't a proved unit.
    pub fn remove_root_literals(
        &mut self,
        handle: ClauseHandle,
        new_lits: &[Lit],
        removed: &[Lit],
    ) -> Option<ProofClauseId> {
        if !self.enabled || removed.is_empty() {
            return None;
        }
        let old_id = self.handle_id(handle)?;
        let unit_ids: Option<Vec<ProofClauseId>> =
            removed.iter().map(|&lit| self.unit_id(!lit)).collect();
        let unit_ids = unit_ids?;

        self.start_resolution_chain();
        self.link_resolution(crate::lit::LIT_UNDEF, old_id);
        for (&lit, unit_id) in removed.iter().zip(unit_ids) {
            self.link_resolution(lit, unit_id);
        }

        let new_id = self.next_id();
        self.finalize_resolution(new_id, new_lits);
        self.register_handle(new_id, handle);
        Some(new_id)
    }

    /// Number of clause slots recorded so far (including deactivated ones).
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    fn clause_lits(&self, id: ProofClauseId) -> Option<&[Lit]> {
        self.clauses.get(id as usize)?.as_ref().map(|record| match record {
            ClauseRecord::Input { lits } => lits.as_slice(),
            ClauseRecord::Derived { lits, .. } => lits.as_slice(),
        })
    }

    /// Render the proof in `spec.md` §6.4's textual form: `i: (lits) [input]` or `i: (lits)
    /// [resolution <predecessor>, <Cₖ>, ...]`.
    pub fn format(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        for (id, record) in self.clauses.iter().enumerate() {
            match record {
                None => (),
                Some(ClauseRecord::Input { lits }) => {
                    let _ = writeln!(out, "{}: ({}) [input]", id, format_lits(lits));
                }
                Some(ClauseRecord::Derived { lits, chain }) => {
                    let _ = write!(out, "{}: ({}) [resolution", id, format_lits(lits));
                    for (k, link) in chain.iter().enumerate() {
                        let sep = if k == 0 { " " } else { ", " };
                        let _ = write!(out, "{}{}", sep, link.clause);
                    }
                    let _ = writeln!(out, "]");
                }
            }
        }
        out
    }

    /// Verify that every derived clause is the resolvent of its recorded chain (`spec.md`
    /// invariant 4). The first link's pivot is ignored: its clause seeds the running resolvent.
    pub fn check(&self) -> bool {
        for record in self.clauses.iter().flatten() {
            if let ClauseRecord::Derived { lits, chain } = record {
                let mut acc: Option<Vec<Lit>> = None;
                for link in chain {
                    let next = match self.clause_lits(link.clause) {
                        Some(lits) => lits,
                        None => return false,
                    };
                    acc = Some(match acc {
                        None => next.to_vec(),
                        Some(prev) => match resolve(&prev, link.pivot, next) {
                            Some(resolvent) => resolvent,
                            None => return false,
                        },
                    });
                }

                let mut acc = acc.unwrap_or_default();
                acc.sort_unstable();
                acc.dedup();
                let mut expected = lits.clone();
                expected.sort_unstable();
                expected.dedup();
                if acc != expected {
                    return false;
                }
            }
        }
        true
    }

    /// Verify that the proof derives the empty clause (`spec.md` §6.1 `check_proof`, invariant 4
    /// "proof soundness / empty-clause reachability on UNSAT"): every chain checks out
    /// (`Proof::check`), and at least one derived clause has no literals.
    pub fn check_unsat(&self) -> bool {
        self.check()
            && self.clauses.iter().flatten().any(|record| {
                matches!(record, ClauseRecord::Derived { lits, .. } if lits.is_empty())
            })
    }
}

fn format_lits(lits: &[Lit]) -> String {
    lits.iter()
        .map(|l| l.to_dimacs().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve `a` with `b` on `pivot`, dropping `pivot` from `a` and `!pivot` from `b`.
fn resolve(a: &[Lit], pivot: Lit, b: &[Lit]) -> Option<Vec<Lit>> {
    let mut out: Vec<Lit> = a.iter().copied().filter(|&l| l != pivot).collect();
    out.extend(b.iter().copied().filter(|&l| l != !pivot));
    out.sort_unstable();
    out.dedup();
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lit::LIT_UNDEF;

    #[test]
    fn disabled_proof_is_a_no_op() {
        let mut proof = Proof::default();
        proof.input_clause(0, &[lit!(1), lit!(2)]);
        assert_eq!(proof.len(), 0);
    }

    #[test]
    fn records_resolution_chain() {
        let mut proof = Proof::default();
        proof.enable();

        proof.input_clause(0, &[lit!(1), lit!(2)]);
        proof.input_clause(1, &[lit!(-1), lit!(3)]);

        proof.start_resolution_chain();
        proof.link_resolution(LIT_UNDEF, 0);
        proof.link_resolution(lit!(1), 1);
        proof.finalize_resolution(2, &[lit!(2), lit!(3)]);

        assert_eq!(proof.len(), 3);
        match proof.clauses[2].as_ref().unwrap() {
            ClauseRecord::Derived { chain, .. } => assert_eq!(chain.len(), 2),
            _ => panic!("expected a derived clause"),
        }
    }

    #[test]
    fn check_accepts_a_correct_chain() {
        let mut proof = Proof::default();
        proof.enable();

        proof.input_clause(0, &[lit!(1), lit!(2)]);
        proof.input_clause(1, &[lit!(-1), lit!(3)]);

        proof.start_resolution_chain();
        proof.link_resolution(LIT_UNDEF, 0);
        proof.link_resolution(lit!(1), 1);
        proof.finalize_resolution(2, &[lit!(2), lit!(3)]);

        assert!(proof.check());
        assert!(proof.format().contains("[resolution 0, 1]"));
    }

    #[test]
    fn check_unsat_requires_an_empty_derived_clause() {
        let mut proof = Proof::default();
        proof.enable();

        proof.input_clause(0, &[lit!(1), lit!(2)]);
        proof.input_clause(1, &[lit!(-1), lit!(3)]);

        proof.start_resolution_chain();
        proof.link_resolution(LIT_UNDEF, 0);
        proof.link_resolution(lit!(1), 1);
        proof.finalize_resolution(2, &[lit!(2), lit!(3)]);

        assert!(!proof.check_unsat());
    }

    #[test]
    fn remove_root_literals_resolves_against_registered_units() {
        let mut proof = Proof::default();
        proof.enable();

        let clause_id = 0;
        proof.input_clause(clause_id, &[lit!(1), lit!(2), lit!(3)]);
        let handle = ClauseHandle::from_binary_index(0);
        proof.register_handle(clause_id, handle);

        let unit_id = 1;
        proof.input_clause(unit_id, &[lit!(-2)]);
        proof.register_unit(unit_id, lit!(-2));

        let new_id = proof.remove_root_literals(handle, &[lit!(1), lit!(3)], &[lit!(2)]);

        assert_eq!(new_id, Some(2));
        assert_eq!(proof.handle_id(handle), Some(2));
        match proof.clauses[2].as_ref().unwrap() {
            ClauseRecord::Derived { lits, chain } => {
                assert_eq!(lits, &[lit!(1), lit!(3)]);
                assert_eq!(chain.len(), 2);
            }
            _ => panic!("expected a derived clause"),
        }
    }

    #[test]
    fn check_rejects_a_wrong_resolvent() {
        let mut proof = Proof::default();
        proof.enable();

        proof.input_clause(0, &[lit!(1), lit!(2)]);
        proof.input_clause(1, &[lit!(-1), lit!(3)]);

        proof.start_resolution_chain();
        proof.link_resolution(LIT_UNDEF, 0);
        proof.link_resolution(lit!(1), 1);
        // The true resolvent is (2 3); claiming (2 4) is unsound.
        proof.finalize_resolution(2, &[lit!(2), lit!(4)]);

        assert!(!proof.check());
    }
}
