//! Solver configuration.
use crate::error::SolverError;

/// Selectable backtracking regime.
///
/// Ordered `Ncb < Wcb < Rscb < Lscb`: each regime implies the propagation invariants of the ones
/// before it (`spec.md` §6.2: "lscb > rscb > wcb > ncb; higher implies lower").
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum BacktrackRegime {
    /// Non-chronological backtracking.
    Ncb,
    /// Weak chronological backtracking.
    Wcb,
    /// Restoring strong chronological backtracking (WCB plus level-`d` re-queueing).
    Rscb,
    /// Strong chronological backtracking with lazy reimplication.
    Lscb,
}

impl Default for BacktrackRegime {
    fn default() -> BacktrackRegime {
        BacktrackRegime::Ncb
    }
}

impl BacktrackRegime {
    /// Whether this regime may retain trail literals above the backtrack target (WCB/RSCB/LSCB).
    pub fn is_chronological(self) -> bool {
        self != BacktrackRegime::Ncb
    }

    /// Whether this regime uses the lazy-reimplication scheme.
    pub fn is_lazy(self) -> bool {
        self == BacktrackRegime::Lscb
    }

    /// Whether this regime re-queues level-`d` literals on backtrack to `d`.
    pub fn is_restoring(self) -> bool {
        matches!(self, BacktrackRegime::Rscb | BacktrackRegime::Lscb)
    }
}

/// Configurable parameters used during solving.
///
/// Field names and defaults follow `SPEC_FULL.md` §6.2's cross-check between `spec.md` §6.2 and
/// the original `SAT-options.hpp`.
#[derive(Copy, Clone, Debug)]
pub struct SolverConfig {
    /// Active backtracking regime.
    pub backtracking: BacktrackRegime,
    /// Enables reduceDB (periodic deletion of low-activity learned clauses).
    pub delete_clauses: bool,
    /// Multiplicative decay for the VSIDS decision heuristic, applied every conflict.
    pub var_activity_decay: f64,
    /// Growth factor for the reduceDB threshold after each simplification pass.
    pub clause_elimination_multiplier: f64,
    /// Multiplier applied to the clause activity bump increment (ages older clauses faster).
    pub clause_activity_multiplier: f64,
    /// Decay factor applied to the reduceDB activity threshold after each deletion round.
    pub clause_activity_threshold_decay: f64,
    /// Decay factor for the agility moving average.
    pub agility_decay: f64,
    /// Agility threshold below which a restart is triggered.
    pub agility_threshold: f64,
    /// Multiplier applied to the agility threshold at each implication.
    pub threshold_multiplier: f64,
    /// Decay factor applied to the agility threshold at each restart.
    pub agility_threshold_decay: f64,
    /// Enables resolution proof recording.
    pub build_proof: bool,
}

impl Default for SolverConfig {
    fn default() -> SolverConfig {
        SolverConfig {
            backtracking: BacktrackRegime::Ncb,
            delete_clauses: true,
            var_activity_decay: 0.95,
            clause_elimination_multiplier: 1.5,
            clause_activity_multiplier: 1.001,
            clause_activity_threshold_decay: 0.85,
            agility_decay: 0.9999,
            agility_threshold: 0.4,
            threshold_multiplier: 1.0,
            agility_threshold_decay: 1.0,
            build_proof: false,
        }
    }
}

impl SolverConfig {
    /// Validate the configuration, failing fast on out-of-range parameters.
    ///
    /// See `spec.md` §7 ("Configuration error — invalid parameter ranges. Fail fast at
    /// construction.").
    pub fn validate(&self) -> Result<(), SolverError> {
        fn in_open01(name: &str, value: f64) -> Result<(), SolverError> {
            if value > 0.0 && value < 1.0 {
                Ok(())
            } else {
                Err(SolverError::Config(format!(
                    "{} must be in (0, 1), got {}",
                    name, value
                )))
            }
        }

        in_open01("var_activity_decay", self.var_activity_decay)?;
        in_open01(
            "clause_activity_threshold_decay",
            self.clause_activity_threshold_decay,
        )?;
        in_open01("agility_decay", self.agility_decay)?;
        in_open01("agility_threshold", self.agility_threshold)?;

        if self.clause_elimination_multiplier <= 1.0 {
            return Err(SolverError::Config(
                "clause_elimination_multiplier must be > 1".into(),
            ));
        }
        if self.clause_activity_multiplier <= 1.0 {
            return Err(SolverError::Config(
                "clause_activity_multiplier must be > 1".into(),
            ));
        }
        if self.threshold_multiplier < 1.0 {
            return Err(SolverError::Config(
                "threshold_multiplier must be >= 1".into(),
            ));
        }
        // `<=` rather than `<`: the default (multiplier = decay = 1.0) is the "disabled" point
        // where the agility threshold never moves, and must validate as well as any other choice.
        if !(self.agility_threshold_decay <= 1.0
            && self.agility_threshold_decay <= 2.0 - self.threshold_multiplier)
        {
            return Err(SolverError::Config(format!(
                "agility_threshold_decay must be <= 1 and <= 2 - threshold_multiplier, got {}",
                self.agility_threshold_decay
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SolverConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_decay() {
        let mut config = SolverConfig::default();
        config.var_activity_decay = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn regime_ordering() {
        assert!(!BacktrackRegime::Ncb.is_chronological());
        assert!(BacktrackRegime::Wcb.is_chronological());
        assert!(BacktrackRegime::Rscb.is_restoring());
        assert!(BacktrackRegime::Lscb.is_restoring());
        assert!(BacktrackRegime::Lscb.is_lazy());
        assert!(!BacktrackRegime::Rscb.is_lazy());
    }
}
