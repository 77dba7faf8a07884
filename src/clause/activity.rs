//! Clause activity bumping and decay (`spec.md` §4.8, §6.2).
use partial_ref::{partial, PartialRef};

use crate::config::SolverConfig;
use crate::context::{ClauseActivityP, ClauseAllocP, ClauseDbP, Context};

use super::ClauseHandle;

/// Global metadata used for bumping and decaying clause activities.
///
/// Individual clause activities are stored in the clause header; this tracks the shared bump
/// increment and its decay rate.
pub struct ClauseActivity {
    bump: f32,
    inv_decay: f32,
}

impl Default for ClauseActivity {
    fn default() -> ClauseActivity {
        ClauseActivity {
            bump: 1.0,
            inv_decay: 1.0 / SolverConfig::default().clause_activity_multiplier as f32,
        }
    }
}

impl ClauseActivity {
    /// `spec.md` §6.2: `clause_activity_multiplier` ages clauses (bigger => faster aging).
    pub fn set_multiplier(&mut self, multiplier: f64) {
        assert!(multiplier > 1.0);
        self.inv_decay = 1.0 / multiplier as f32;
    }
}

fn rescale_limit() -> f32 {
    std::f32::MAX / 16.0
}

/// Bump a clause's activity; rescale everything if it would overflow.
pub fn bump_clause_activity(
    mut ctx: partial!(Context, mut ClauseActivityP, mut ClauseAllocP, mut ClauseDbP),
    handle: ClauseHandle,
) {
    let bump = ctx.part(ClauseActivityP).bump;
    let header = ctx.part_mut(ClauseAllocP).header_mut(handle);
    let activity = header.activity() + bump;
    header.set_activity(activity);

    if activity > rescale_limit() {
        rescale_clause_activities(ctx.borrow());
    }
}

fn rescale_clause_activities(
    mut ctx: partial!(Context, mut ClauseActivityP, mut ClauseAllocP, mut ClauseDbP),
) {
    let rescale_factor = 1.0 / rescale_limit();

    let db = ctx.part(ClauseDbP);
    let handles: Vec<_> = db.iter_handles().collect();
    let alloc = ctx.part_mut(ClauseAllocP);
    for handle in handles {
        let header = alloc.header_mut(handle);
        if !header.deleted() {
            let activity = header.activity() * rescale_factor;
            header.set_activity(activity);
        }
    }
    ctx.part_mut(ClauseActivityP).bump *= rescale_factor;
}

/// Age the bump increment once per learned clause (`decay_clause_activities` in `spec.md` §4.6
/// step 8: "Decay variable-activity increment" -- the clause-side analogue).
pub fn decay_clause_activities(
    mut ctx: partial!(Context, mut ClauseActivityP, mut ClauseAllocP, mut ClauseDbP),
) {
    let activities = ctx.part_mut(ClauseActivityP);
    activities.bump *= activities.inv_decay;
    if activities.bump >= rescale_limit() {
        rescale_clause_activities(ctx.borrow());
    }
}
