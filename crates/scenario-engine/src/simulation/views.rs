use chrono::{DateTime, Utc};
use serde::Serialize;

use super::constraints::ConstraintViolation;
use super::domain::{
    Bindings, Decision, Difficulty, Grade, ImpactWeight, OutcomeType, ResolvedOutcome,
    ScenarioDefinition, ScenarioId, SessionId, SessionStatus, SimulationSession, UserId,
};
use super::evaluation::{EvaluationOutcome, RewardCredit, ScoreBreakdown};
use super::progress::progress_percent;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandle {
    pub session_id: SessionId,
    pub scenario_id: ScenarioId,
    pub user_id: UserId,
    pub started_at: DateTime<Utc>,
    pub bindings: Bindings,
    /// First declared variable, the natural first decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_variable: Option<String>,
}

impl SessionHandle {
    pub(crate) fn new(session: &SimulationSession, scenario: &ScenarioDefinition) -> Self {
        Self {
            session_id: session.id.clone(),
            scenario_id: session.scenario_id.clone(),
            user_id: session.user_id.clone(),
            started_at: session.started_at,
            bindings: session.bindings.clone(),
            next_variable: scenario.variables.first().map(|variable| variable.name.clone()),
        }
    }
}

/// Result of a single decision. Rejections carry the violation and change nothing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<ConstraintViolation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_index: Option<u32>,
    pub immediate_outcomes: Vec<String>,
    pub progress_percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_variable: Option<String>,
}

impl DecisionOutcome {
    pub(crate) fn rejected(violation: ConstraintViolation, progress_percent: u8) -> Self {
        Self {
            accepted: false,
            violation: Some(violation),
            step_index: None,
            immediate_outcomes: Vec::new(),
            progress_percent,
            next_variable: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub session_id: SessionId,
    pub score: u8,
    pub grade: Grade,
    pub grade_label: &'static str,
    pub outcome_type: OutcomeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_id: Option<String>,
    /// Fixed score authored on the winning outcome; equals `score` for band fallbacks.
    pub outcome_score: u8,
    pub message: String,
    pub recommendations: Vec<String>,
    pub next_steps: Vec<String>,
    pub breakdown: ScoreBreakdown,
    pub insights: SimulationInsights,
    pub reward: Option<RewardCredit>,
}

impl CompletionResult {
    pub(crate) fn new(
        session_id: SessionId,
        scenario: &ScenarioDefinition,
        evaluation: EvaluationOutcome,
        reward: Option<RewardCredit>,
    ) -> Self {
        let insights = SimulationInsights::new(scenario, &evaluation);
        let outcome_id = evaluation.outcome.outcome_id().map(str::to_string);
        let result = evaluation.outcome.result;
        Self {
            session_id,
            score: evaluation.score,
            grade: evaluation.grade,
            grade_label: evaluation.grade.label(),
            outcome_type: result.outcome_type,
            outcome_id,
            outcome_score: result.score,
            message: result.message,
            recommendations: result.recommendations,
            next_steps: evaluation.next_steps,
            breakdown: evaluation.breakdown,
            insights,
            reward,
        }
    }
}

const EXCELLENT_STRENGTHS: [&str; 2] = ["Comprehensive planning", "Realistic approach"];
const BASELINE_STRENGTH: &str = "Good foundation";
const PRACTICE_STEPS: [&str; 3] = [
    "Implement this strategy in your financial plan",
    "Review and adjust regularly",
    "Monitor progress towards goals",
];

/// Learner-facing debrief attached to every completion.
///
/// Strengths follow the grade tier: an excellent score earns the full list, anything else the
/// baseline. Improvements are only listed for a failing score and name each scoring
/// contribution that fell short of the scenario's passing score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationInsights {
    /// Descriptions of the scenario's high-impact variables, in declaration order.
    pub key_decisions: Vec<String>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub real_world_application: String,
    pub next_steps: Vec<String>,
}

impl SimulationInsights {
    pub fn new(scenario: &ScenarioDefinition, evaluation: &EvaluationOutcome) -> Self {
        let key_decisions = scenario
            .variables
            .iter()
            .filter(|variable| variable.impact_weight == ImpactWeight::High)
            .map(|variable| {
                if variable.description.is_empty() {
                    variable.name.clone()
                } else {
                    variable.description.clone()
                }
            })
            .collect();

        let strengths = match evaluation.grade {
            Grade::Excellent => EXCELLENT_STRENGTHS.iter().map(|item| item.to_string()).collect(),
            Grade::Pass | Grade::Fail => vec![BASELINE_STRENGTH.to_string()],
        };

        let improvements = match evaluation.grade {
            Grade::Fail => evaluation
                .breakdown
                .contributions
                .iter()
                .filter(|part| part.points < scenario.scoring.passing_score)
                .map(|part| format!("Strengthen {}", part.source))
                .collect(),
            Grade::Pass | Grade::Excellent => Vec::new(),
        };

        Self {
            key_decisions,
            strengths,
            improvements,
            real_world_application: scenario.real_world_application.clone(),
            next_steps: PRACTICE_STEPS.iter().map(|step| step.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub scenario_id: ScenarioId,
    pub user_id: UserId,
    pub status: SessionStatus,
    pub status_label: &'static str,
    pub bindings: Bindings,
    pub decisions: Vec<Decision>,
    pub progress_percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ResolvedOutcome>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    pub(crate) fn new(session: SimulationSession, scenario: Option<&ScenarioDefinition>) -> Self {
        let progress_percent = scenario
            .map(|scenario| progress_percent(scenario, &session.decisions))
            .unwrap_or_default();
        Self {
            session_id: session.id,
            scenario_id: session.scenario_id,
            user_id: session.user_id,
            status: session.status,
            status_label: session.status.label(),
            bindings: session.bindings,
            decisions: session.decisions,
            progress_percent,
            final_score: session.final_score,
            outcome: session.outcome,
            started_at: session.started_at,
            ended_at: session.ended_at,
        }
    }
}

/// Catalog listing entry; the full definition is served by the scenario detail route.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    pub id: ScenarioId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub duration: u32,
    pub variable_count: usize,
    /// Present when the listing was requested on behalf of a learner.
    #[serde(flatten)]
    pub progress: Option<ScenarioProgress>,
}

impl ScenarioSummary {
    /// Attaches the learner's attempts at this scenario, taken from their session history.
    pub fn with_progress(mut self, sessions: &[SessionSnapshot]) -> Self {
        self.progress = Some(ScenarioProgress::from_sessions(&self.id, sessions));
        self
    }
}

impl From<&ScenarioDefinition> for ScenarioSummary {
    fn from(scenario: &ScenarioDefinition) -> Self {
        Self {
            id: scenario.id.clone(),
            title: scenario.title.clone(),
            description: scenario.description.clone(),
            category: scenario.category.clone(),
            difficulty: scenario.difficulty,
            duration: scenario.duration_minutes,
            variable_count: scenario.variables.len(),
            progress: None,
        }
    }
}

/// One learner's standing on one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioProgress {
    pub is_completed: bool,
    pub best_score: Option<u8>,
    pub attempts: usize,
}

impl ScenarioProgress {
    pub fn from_sessions(scenario_id: &ScenarioId, sessions: &[SessionSnapshot]) -> Self {
        let attempts: Vec<&SessionSnapshot> = sessions
            .iter()
            .filter(|session| &session.scenario_id == scenario_id)
            .collect();
        Self {
            is_completed: attempts
                .iter()
                .any(|session| session.status == SessionStatus::Completed),
            best_score: attempts.iter().filter_map(|session| session.final_score).max(),
            attempts: attempts.len(),
        }
    }
}

/// A learner's sessions, newest first, with aggregate scores over the completed ones.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserHistory {
    pub user_id: UserId,
    pub total_sessions: usize,
    pub completed_sessions: usize,
    /// Mean of completed scores rounded to one decimal place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_score: Option<u8>,
    pub sessions: Vec<SessionSnapshot>,
}

impl UserHistory {
    pub(crate) fn new(user_id: UserId, sessions: Vec<SessionSnapshot>) -> Self {
        let scores: Vec<u8> = sessions
            .iter()
            .filter(|session| session.status == SessionStatus::Completed)
            .filter_map(|session| session.final_score)
            .collect();
        let average_score = (!scores.is_empty()).then(|| {
            let total: f64 = scores.iter().map(|score| f64::from(*score)).sum();
            (total / scores.len() as f64 * 10.0).round() / 10.0
        });

        Self {
            user_id,
            total_sessions: sessions.len(),
            completed_sessions: scores.len(),
            average_score,
            best_score: scores.iter().copied().max(),
            sessions,
        }
    }
}
