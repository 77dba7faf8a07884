//! Glue (literal block distance) computation and tier assignment for learned clauses.
use partial_ref::{partial, PartialRef};

use crate::context::{Context, TmpDataP, TrailP};
use crate::lit::Lit;

use super::{ClauseHeader, Tier};

/// Number of distinct decision levels among `lits`.
///
/// Grounded on `original_source/src/solver/NapSAT.cpp`'s glue computation and the teacher's
/// `glue.rs::compute_glue`.
pub fn compute_glue(mut ctx: partial!(Context, mut TmpDataP, TrailP), lits: &[Lit]) -> usize {
    let (tmp_data, ctx) = ctx.split_part_mut(TmpDataP);
    let trail = ctx.part(TrailP);

    let level_count = trail.current_level() as usize + 1;
    tmp_data.ensure_level_count(level_count);
    let flags = &mut tmp_data.flags;

    let mut glue = 0;
    for &lit in lits {
        let level = trail.lit_level(lit) as usize;
        let flag = &mut flags[level];
        if !*flag {
            *flag = true;
            glue += 1;
        }
    }
    for &lit in lits {
        let level = trail.lit_level(lit) as usize;
        flags[level] = false;
    }
    glue
}

/// Assess a newly learned clause and build its header (`spec.md` §4.6 step 7, §4.8).
///
/// Called while the clause is still in conflict, so the computed glue is one higher than it will
/// be once the asserting literal is backtracked to its implying level.
pub fn assess_learned_clause(
    mut ctx: partial!(Context, mut TmpDataP, TrailP),
    lits: &[Lit],
) -> ClauseHeader {
    let glue = compute_glue(ctx.borrow(), lits).saturating_sub(1);

    let mut header = ClauseHeader::new();
    header.set_learned(true);
    header.set_glue(glue);
    header.set_tier(select_tier(glue));
    header.set_active(true);
    header
}

/// Tier for a redundant clause of a given glue level.
fn select_tier(glue: usize) -> Tier {
    if glue <= 2 {
        Tier::Core
    } else if glue <= 6 {
        Tier::Mid
    } else {
        Tier::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_thresholds() {
        assert_eq!(select_tier(0), Tier::Core);
        assert_eq!(select_tier(2), Tier::Core);
        assert_eq!(select_tier(3), Tier::Mid);
        assert_eq!(select_tier(6), Tier::Mid);
        assert_eq!(select_tier(7), Tier::Local);
    }
}
