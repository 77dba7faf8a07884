//! Variable activity bumping/decay (VSIDS) and decision making (`spec.md` §4.1, §4.4).
use partial_ref::{partial, PartialRef};

use crate::config::SolverConfig;
use crate::context::{Context, HeapP, SolverConfigP, TrailP};
use crate::lit::{Lit, Var};

const ACTIVITY_RESCALE_LIMIT: f64 = 1e100;
const ACTIVITY_RESCALE_FACTOR: f64 = 1e-100;

/// Shared bump increment for variable activity, decayed once per conflict.
pub struct VarActivity {
    bump: f64,
    inv_decay: f64,
}

impl Default for VarActivity {
    fn default() -> VarActivity {
        VarActivity {
            bump: 1.0,
            inv_decay: 1.0 / SolverConfig::default().var_activity_decay,
        }
    }
}

impl VarActivity {
    pub fn set_decay(&mut self, decay: f64) {
        assert!(decay > 0.0 && decay < 1.0);
        self.inv_decay = 1.0 / decay;
    }
}

/// Bump `var`'s activity by the current increment, rescaling everything if it would overflow
/// `spec.md` §3's `1e100` threshold.
pub fn bump_var_activity(
    mut ctx: partial!(Context, mut HeapP, mut crate::context::VarActivityP),
    var: Var,
) {
    let bump = ctx.part(crate::context::VarActivityP).bump;
    let heap = ctx.part_mut(HeapP);
    let activity = heap.activity(var.index() as u32) + bump;
    heap.set_activity(var.index() as u32, activity);

    if activity > ACTIVITY_RESCALE_LIMIT {
        let activities = ctx.part_mut(crate::context::VarActivityP);
        activities.bump *= ACTIVITY_RESCALE_FACTOR;
        ctx.part_mut(HeapP).normalize(ACTIVITY_RESCALE_FACTOR);
    }
}

/// Age the bump increment once per conflict (`spec.md` §4.6 step 8).
pub fn decay_var_activity(mut ctx: partial!(Context, mut HeapP, mut crate::context::VarActivityP)) {
    let activities = ctx.part_mut(crate::context::VarActivityP);
    activities.bump *= activities.inv_decay;
    if activities.bump > ACTIVITY_RESCALE_LIMIT {
        activities.bump *= ACTIVITY_RESCALE_FACTOR;
        ctx.part_mut(HeapP).normalize(ACTIVITY_RESCALE_FACTOR);
    }
}

/// Pick the next decision literal: the highest-activity unassigned variable, assigned its saved
/// phase (`spec.md` §4.4).
pub fn make_decision(mut ctx: partial!(Context, mut HeapP, TrailP)) -> Option<Lit> {
    loop {
        if ctx.part(HeapP).empty() {
            return None;
        }
        let key = ctx.part_mut(HeapP).pop();
        let var = Var::from_index(key as usize);
        if ctx.part(TrailP).value(var.positive()).is_none() {
            let phase = ctx.part(TrailP).phase(var);
            return Some(Lit::from_var(var, phase));
        }
    }
}
