mod policy;
mod rewards;
mod rules;

pub use rewards::{
    RewardCredit, RewardPolicy, DEFAULT_ADVANCED_XP, DEFAULT_BEGINNER_XP,
    DEFAULT_INTERMEDIATE_XP,
};
pub use rules::{ScoreBreakdown, ScoreContribution, ScoringMode};

use super::domain::{Bindings, Grade, ResolvedOutcome, ScenarioDefinition};
use serde::{Deserialize, Serialize};

/// Deterministic 0-100 scorer. A pure function of the scenario and bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreEngine;

impl ScoreEngine {
    pub fn compute_score(&self, scenario: &ScenarioDefinition, bindings: &Bindings) -> u8 {
        rules::score_breakdown(scenario, bindings).total
    }

    pub fn breakdown(&self, scenario: &ScenarioDefinition, bindings: &Bindings) -> ScoreBreakdown {
        rules::score_breakdown(scenario, bindings)
    }

    pub fn mode(&self, scenario: &ScenarioDefinition) -> ScoringMode {
        rules::scoring_mode(scenario)
    }
}

/// Two-layer resolution: authored rules in declaration order, then score bands.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomeResolver;

impl OutcomeResolver {
    pub fn resolve_immediate(
        &self,
        scenario: &ScenarioDefinition,
        bindings: &Bindings,
    ) -> Vec<String> {
        policy::immediate_outcomes(scenario, bindings)
    }

    pub fn resolve_final(
        &self,
        scenario: &ScenarioDefinition,
        bindings: &Bindings,
        score: u8,
    ) -> ResolvedOutcome {
        policy::final_outcome(scenario, bindings, score)
    }

    pub fn next_steps(&self, score: u8) -> Vec<String> {
        policy::next_steps(score)
    }
}

/// Stateless evaluator combining the scorer and resolver for session completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluationEngine {
    scorer: ScoreEngine,
    resolver: OutcomeResolver,
}

impl EvaluationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scorer(&self) -> &ScoreEngine {
        &self.scorer
    }

    pub fn resolver(&self) -> &OutcomeResolver {
        &self.resolver
    }

    pub fn evaluate(&self, scenario: &ScenarioDefinition, bindings: &Bindings) -> EvaluationOutcome {
        let breakdown = self.scorer.breakdown(scenario, bindings);
        let score = breakdown.total;
        let outcome = self.resolver.resolve_final(scenario, bindings, score);

        EvaluationOutcome {
            score,
            grade: scenario.scoring.grade_for(score),
            breakdown,
            outcome,
            next_steps: self.resolver.next_steps(score),
        }
    }
}

/// Evaluation output describing the score, its composition, and the winning outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub score: u8,
    pub grade: Grade,
    pub breakdown: ScoreBreakdown,
    pub outcome: ResolvedOutcome,
    pub next_steps: Vec<String>,
}
