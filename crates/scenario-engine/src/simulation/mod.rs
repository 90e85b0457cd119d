//! Scenario simulation: authored scenarios, learner sessions, and deterministic grading.
//!
//! A learner starts a session against a [`ScenarioDefinition`], records decisions one variable
//! at a time, and completes the session to receive a 0-100 score, a resolved outcome, and an
//! experience-point reward. Scenario content is validated before any session can use it.

pub mod condition;
pub mod constraints;
pub mod domain;
pub mod evaluation;
pub mod library;
pub mod memory;
pub mod progress;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;
pub mod views;

#[cfg(test)]
mod tests;

pub use condition::{
    ArithmeticOp, Comparison, ComparisonOperator, ConditionError, ConditionTree,
    DerivedExpression, ExpressionError, MissingBindingPolicy, Operand, MISSING_BINDING_POLICY,
};
pub use constraints::{validate_binding, ConstraintViolation, ViolationReason};
pub use domain::{
    Bindings, Decision, Difficulty, Grade, ImpactWeight, OutcomeResult, OutcomeRule,
    OutcomeSource, OutcomeType, ResolvedOutcome, ScenarioDefinition, ScenarioId, ScenarioValue,
    ScoreBand, ScoringCriterion, ScoringSpec, SessionId, SessionStatus, SimulationSession,
    UserId, VariableConstraints, VariableSpec, VariableType,
};
pub use evaluation::{
    EvaluationEngine, EvaluationOutcome, OutcomeResolver, RewardCredit, RewardPolicy,
    ScoreBreakdown, ScoreContribution, ScoreEngine, ScoringMode,
};
pub use library::ScenarioLibrary;
pub use memory::{InMemoryRewardLedger, InMemoryScenarioCatalog, InMemorySessionStore, LedgerEntry};
pub use progress::progress_percent;
pub use repository::{
    CatalogError, LedgerError, PersistenceStore, RewardLedger, ScenarioCatalog, ScenarioFilter,
    StoreError,
};
pub use router::simulation_router;
pub use service::{ErrorKind, SessionManager, SimulationError};
pub use validation::{
    load_scenario_json, validate_scenario, EvaluationError, ScenarioIssue, ScenarioWarning,
};
pub use views::{
    CompletionResult, DecisionOutcome, ScenarioProgress, ScenarioSummary, SessionHandle,
    SessionSnapshot, SimulationInsights, UserHistory,
};
