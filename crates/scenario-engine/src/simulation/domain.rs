use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::condition::ConditionTree;

/// Calendar format accepted for `date` variables.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Identifier wrapper for authored scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(pub String);

/// Opaque handle for a learner's simulation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

/// Identifier of the learner owning a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

macro_rules! display_id {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })*
    };
}

display_id!(ScenarioId, SessionId, UserId);

impl From<&str> for ScenarioId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Value bound to a scenario variable. Numeric kinds carry numbers; choices and dates carry text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScenarioValue {
    Number(f64),
    Text(String),
}

impl ScenarioValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScenarioValue::Number(value) => Some(*value),
            ScenarioValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ScenarioValue::Number(_) => None,
            ScenarioValue::Text(value) => Some(value),
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        self.as_text()
            .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok())
    }

    /// Numeric projection used by comparisons. Dates compare by day ordinal; other text is
    /// not comparable.
    pub(crate) fn comparable(&self) -> Option<f64> {
        match self {
            ScenarioValue::Number(value) if value.is_finite() => Some(*value),
            ScenarioValue::Number(_) => None,
            ScenarioValue::Text(_) => self
                .as_date()
                .map(|date| f64::from(date.num_days_from_ce())),
        }
    }
}

impl fmt::Display for ScenarioValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioValue::Number(value) => write!(f, "{value}"),
            ScenarioValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<f64> for ScenarioValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for ScenarioValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for ScenarioValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ScenarioValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Variable name to current value. Ordered so every traversal is deterministic.
pub type Bindings = BTreeMap<String, ScenarioValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    Number,
    Percentage,
    Currency,
    Choice,
    Date,
}

impl VariableType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Percentage => "percentage",
            Self::Currency => "currency",
            Self::Choice => "choice",
            Self::Date => "date",
        }
    }

    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Number | Self::Percentage | Self::Currency)
    }
}

/// How strongly a variable influences the scenario, surfaced to learners as a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactWeight {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VariableConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

/// Condition paired with the points it awards when it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBand {
    pub when: ConditionTree,
    pub points: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub variable_type: VariableType,
    #[serde(default)]
    pub description: String,
    pub default_value: ScenarioValue,
    #[serde(default)]
    pub constraints: VariableConstraints,
    #[serde(default, rename = "impact")]
    pub impact_weight: ImpactWeight,
    /// Legacy per-variable scoring buckets, only consulted when no criterion declares bands.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub score_bands: Vec<ScoreBand>,
    #[serde(default)]
    pub base_points: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeType {
    Success,
    Warning,
    Failure,
}

impl OutcomeType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Failure => "failure",
        }
    }
}

/// Authored result attached to an outcome rule. `score` is the rule's fixed score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeResult {
    #[serde(rename = "type")]
    pub outcome_type: OutcomeType,
    pub message: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRule {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "conditions")]
    pub condition: ConditionTree,
    pub result: OutcomeResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringCriterion {
    pub name: String,
    pub weight: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bands: Vec<ScoreBand>,
    /// Points awarded when no band holds.
    #[serde(default)]
    pub baseline: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringSpec {
    pub criteria: Vec<ScoringCriterion>,
    pub passing_score: u8,
    pub excellent_score: u8,
}

impl ScoringSpec {
    pub fn grade_for(&self, score: u8) -> Grade {
        if score >= self.excellent_score {
            Grade::Excellent
        } else if score >= self.passing_score {
            Grade::Pass
        } else {
            Grade::Fail
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Excellent,
    Pass,
    Fail,
}

impl Grade {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }
}

/// Immutable authored scenario. Shared read-only across every session that plays it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDefinition {
    pub id: ScenarioId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub difficulty: Difficulty,
    #[serde(default, rename = "duration")]
    pub duration_minutes: u32,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub real_world_application: String,
    pub variables: Vec<VariableSpec>,
    pub outcomes: Vec<OutcomeRule>,
    pub scoring: ScoringSpec,
}

impl ScenarioDefinition {
    pub fn variable(&self, name: &str) -> Option<&VariableSpec> {
        self.variables.iter().find(|variable| variable.name == name)
    }

    pub fn default_bindings(&self) -> Bindings {
        self.variables
            .iter()
            .map(|variable| (variable.name.clone(), variable.default_value.clone()))
            .collect()
    }

    /// Variable declared immediately after `name`, used to hint the next step.
    pub fn next_variable_after(&self, name: &str) -> Option<&VariableSpec> {
        let index = self
            .variables
            .iter()
            .position(|variable| variable.name == name)?;
        self.variables.get(index + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

impl SessionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

/// One recorded learner choice. `step_index` is 1-based and matches its position in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub step_index: u32,
    pub variable: String,
    pub value: ScenarioValue,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Which resolution layer produced the final outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeSource {
    Rule { outcome_id: String },
    ScoreBand { grade: Grade },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedOutcome {
    pub source: OutcomeSource,
    pub result: OutcomeResult,
}

impl ResolvedOutcome {
    pub fn outcome_id(&self) -> Option<&str> {
        match &self.source {
            OutcomeSource::Rule { outcome_id } => Some(outcome_id),
            OutcomeSource::ScoreBand { .. } => None,
        }
    }
}

/// Mutable per-learner attempt at a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSession {
    pub id: SessionId,
    pub scenario_id: ScenarioId,
    pub user_id: UserId,
    pub bindings: Bindings,
    pub decisions: Vec<Decision>,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ResolvedOutcome>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl SimulationSession {
    pub fn new(
        id: SessionId,
        scenario: &ScenarioDefinition,
        user_id: UserId,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            scenario_id: scenario.id.clone(),
            user_id,
            bindings: scenario.default_bindings(),
            decisions: Vec::new(),
            status: SessionStatus::InProgress,
            final_score: None,
            outcome: None,
            started_at,
            ended_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    pub(crate) fn next_step_index(&self) -> u32 {
        u32::try_from(self.decisions.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::library::ScenarioLibrary;

    #[test]
    fn values_deserialize_untagged() {
        let number: ScenarioValue = serde_json::from_str("50000").expect("number parses");
        let text: ScenarioValue = serde_json::from_str("\"moderate\"").expect("text parses");
        assert_eq!(number, ScenarioValue::Number(50_000.0));
        assert_eq!(text, ScenarioValue::from("moderate"));
    }

    #[test]
    fn dates_compare_by_day_ordinal() {
        let earlier = ScenarioValue::from("2025-01-01").comparable().expect("date");
        let later = ScenarioValue::from("2025-01-31").comparable().expect("date");
        assert_eq!(later - earlier, 30.0);
        assert!(ScenarioValue::from("aggressive").comparable().is_none());
        assert!(ScenarioValue::Number(f64::NAN).comparable().is_none());
    }

    #[test]
    fn grade_follows_scoring_thresholds() {
        let scenario = ScenarioLibrary::standard().sip_calculator();
        assert_eq!(scenario.scoring.grade_for(85), Grade::Excellent);
        assert_eq!(scenario.scoring.grade_for(70), Grade::Pass);
        assert_eq!(scenario.scoring.grade_for(69), Grade::Fail);
    }

    #[test]
    fn new_session_starts_from_defaults() {
        let scenario = ScenarioLibrary::standard().sip_calculator();
        let session = SimulationSession::new(
            SessionId::from("sim-000001"),
            &scenario,
            UserId::from("learner-1"),
            Utc::now(),
        );

        assert_eq!(session.status, SessionStatus::InProgress);
        assert_eq!(session.bindings.len(), scenario.variables.len());
        assert_eq!(
            session.bindings.get("monthlyIncome"),
            Some(&ScenarioValue::Number(50_000.0))
        );
        assert_eq!(session.next_step_index(), 1);
    }

    #[test]
    fn next_variable_follows_declaration_order() {
        let scenario = ScenarioLibrary::standard().sip_calculator();
        let next = scenario
            .next_variable_after("monthlyIncome")
            .expect("next variable");
        assert_eq!(next.name, "monthlyExpense");
        assert!(scenario.next_variable_after("existingInvestments").is_none());
        assert!(scenario.next_variable_after("unknown").is_none());
    }
}
