//! Clause storage: arena, header, activity, tier database, assessment and reduction.
use std::slice;

use crate::lit::Lit;

pub mod activity;
pub mod alloc;
pub mod assess;
pub mod db;
pub mod header;
pub mod reduce;

pub use activity::{bump_clause_activity, decay_clause_activities, ClauseActivity};
pub use alloc::{ClauseAlloc, ClauseHandle};
pub use assess::assess_learned_clause;
pub use db::{ClauseDb, Tier};
pub use header::ClauseHeader;
pub use reduce::{reduce_locals, reduce_mids};

/// A clause, stored as a header followed by its literals.
///
/// This is a view into a [`ClauseAlloc`]'s buffer and thus must have a representation compatible
/// with a slice of [`crate::lit::LitIdx`] values.
#[repr(transparent)]
pub struct Clause {
    data: [crate::lit::LitIdx],
}

impl Clause {
    /// The clause's header.
    pub fn header(&self) -> &ClauseHeader {
        unsafe { &*(self.data.as_ptr() as *const ClauseHeader) }
    }

    /// Mutable reference to the clause's header.
    pub fn header_mut(&mut self) -> &mut ClauseHeader {
        unsafe { &mut *(self.data.as_mut_ptr() as *mut ClauseHeader) }
    }

    /// The clause's literals.
    pub fn lits(&self) -> &[Lit] {
        unsafe {
            let lit_ptr = self.data.as_ptr().add(header::HEADER_LEN) as *const Lit;
            slice::from_raw_parts(lit_ptr, self.data.len() - header::HEADER_LEN)
        }
    }

    /// Mutable slice of the clause's literals.
    pub fn lits_mut(&mut self) -> &mut [Lit] {
        unsafe {
            let lit_ptr = self.data.as_mut_ptr().add(header::HEADER_LEN) as *mut Lit;
            slice::from_raw_parts_mut(lit_ptr, self.data.len() - header::HEADER_LEN)
        }
    }
}
