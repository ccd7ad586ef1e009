//! Outcome providers for simulated stages.

use parking_lot::Mutex;
use stagerunner_core::executor::{OutcomeProvider, StageOutcome};
use stagerunner_core::{PipelineRun, StageKind};
use std::collections::{HashSet, VecDeque};

/// Fails each stage independently with probability `failure_rate`.
#[derive(Debug, Clone, Copy)]
pub struct RandomOutcome {
    failure_rate: f64,
}

impl RandomOutcome {
    /// `failure_rate` is clamped to `[0, 1]`.
    pub fn new(failure_rate: f64) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }
}

impl OutcomeProvider for RandomOutcome {
    fn outcome(&self, _run: &PipelineRun, _stage: StageKind) -> StageOutcome {
        if rand::random::<f64>() < self.failure_rate {
            StageOutcome::Fail
        } else {
            StageOutcome::Succeed
        }
    }
}

/// Always fails the listed stage kinds and succeeds everything else.
#[derive(Debug, Clone, Default)]
pub struct FixedOutcome {
    failing: HashSet<StageKind>,
}

impl FixedOutcome {
    pub fn succeed() -> Self {
        Self::default()
    }

    pub fn failing(stages: impl IntoIterator<Item = StageKind>) -> Self {
        Self {
            failing: stages.into_iter().collect(),
        }
    }
}

impl OutcomeProvider for FixedOutcome {
    fn outcome(&self, _run: &PipelineRun, stage: StageKind) -> StageOutcome {
        if self.failing.contains(&stage) {
            StageOutcome::Fail
        } else {
            StageOutcome::Succeed
        }
    }
}

/// Hands out a fixed sequence of outcomes, one per stage invocation, then
/// succeeds once the script is exhausted.
#[derive(Debug, Default)]
pub struct ScriptedOutcome {
    script: Mutex<VecDeque<StageOutcome>>,
}

impl ScriptedOutcome {
    pub fn new(script: impl IntoIterator<Item = StageOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

impl OutcomeProvider for ScriptedOutcome {
    fn outcome(&self, _run: &PipelineRun, _stage: StageKind) -> StageOutcome {
        self.script
            .lock()
            .pop_front()
            .unwrap_or(StageOutcome::Succeed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagerunner_core::ResourceId;

    fn run() -> PipelineRun {
        PipelineRun::new(ResourceId::new(), "main")
    }

    #[test]
    fn test_random_outcome_extremes() {
        let run = run();
        let never = RandomOutcome::new(0.0);
        let always = RandomOutcome::new(1.0);
        for kind in StageKind::ALL {
            for _ in 0..50 {
                assert_eq!(never.outcome(&run, kind), StageOutcome::Succeed);
                assert_eq!(always.outcome(&run, kind), StageOutcome::Fail);
            }
        }
    }

    #[test]
    fn test_random_outcome_clamps_rate() {
        assert_eq!(RandomOutcome::new(7.5).failure_rate(), 1.0);
        assert_eq!(RandomOutcome::new(-1.0).failure_rate(), 0.0);
    }

    #[test]
    fn test_fixed_outcome() {
        let run = run();
        let outcome = FixedOutcome::failing([StageKind::Build]);
        assert_eq!(outcome.outcome(&run, StageKind::Run), StageOutcome::Succeed);
        assert_eq!(outcome.outcome(&run, StageKind::Build), StageOutcome::Fail);
        assert_eq!(
            FixedOutcome::succeed().outcome(&run, StageKind::Build),
            StageOutcome::Succeed
        );
    }

    #[test]
    fn test_scripted_outcome_runs_out() {
        let run = run();
        let outcome = ScriptedOutcome::new([StageOutcome::Fail, StageOutcome::Succeed]);
        assert_eq!(outcome.outcome(&run, StageKind::Run), StageOutcome::Fail);
        assert_eq!(outcome.outcome(&run, StageKind::Run), StageOutcome::Succeed);
        assert_eq!(outcome.remaining(), 0);
        assert_eq!(outcome.outcome(&run, StageKind::Build), StageOutcome::Succeed);
    }
}
