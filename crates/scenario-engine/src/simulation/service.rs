use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::constraints::{validate_binding, ConstraintViolation};
use super::domain::{
    Bindings, Decision, ScenarioDefinition, ScenarioId, ScenarioValue, SessionId, SessionStatus,
    SimulationSession, UserId,
};
use super::evaluation::{EvaluationEngine, RewardCredit, RewardPolicy};
use super::progress::progress_percent;
use super::repository::{
    CatalogError, PersistenceStore, RewardLedger, ScenarioCatalog, ScenarioFilter, StoreError,
};
use super::validation::{validate_scenario, EvaluationError};
use super::views::{
    CompletionResult, DecisionOutcome, ScenarioSummary, SessionHandle, SessionSnapshot, UserHistory,
};

/// Session lifecycle owner composing the catalog, store, ledger, and evaluation engine.
///
/// Mutations of one session are serialised through a per-session lock held across
/// load, check, mutate, and save, so a session completes at most once.
pub struct SessionManager<C, S, L> {
    catalog: Arc<C>,
    store: Arc<S>,
    ledger: Arc<L>,
    engine: EvaluationEngine,
    rewards: RewardPolicy,
    sequence: AtomicU64,
    locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<C, S, L> SessionManager<C, S, L>
where
    C: ScenarioCatalog + 'static,
    S: PersistenceStore + 'static,
    L: RewardLedger + 'static,
{
    pub fn new(catalog: Arc<C>, store: Arc<S>, ledger: Arc<L>, rewards: RewardPolicy) -> Self {
        Self {
            catalog,
            store,
            ledger,
            engine: EvaluationEngine::new(),
            rewards,
            sequence: AtomicU64::new(1),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn reward_policy(&self) -> RewardPolicy {
        self.rewards
    }

    pub fn list_scenarios(
        &self,
        filter: &ScenarioFilter,
    ) -> Result<Vec<Arc<ScenarioDefinition>>, SimulationError> {
        Ok(self.catalog.list(filter)?)
    }

    /// Listing entries for `filter`, annotated with the learner's attempts when one is given.
    pub fn scenario_summaries(
        &self,
        filter: &ScenarioFilter,
        learner: Option<&UserId>,
    ) -> Result<Vec<ScenarioSummary>, SimulationError> {
        let summaries = self
            .list_scenarios(filter)?
            .into_iter()
            .map(|scenario| ScenarioSummary::from(scenario.as_ref()));

        match learner {
            Some(user_id) => {
                let history = self.user_history(user_id)?;
                Ok(summaries
                    .map(|summary| summary.with_progress(&history.sessions))
                    .collect())
            }
            None => Ok(summaries.collect()),
        }
    }

    pub fn scenario(&self, scenario_id: &ScenarioId) -> Result<Arc<ScenarioDefinition>, SimulationError> {
        self.catalog
            .get(scenario_id)?
            .ok_or_else(|| SimulationError::ScenarioNotFound(scenario_id.clone()))
    }

    /// Opens a session seeded with the scenario's default bindings.
    pub fn start(
        &self,
        scenario_id: &ScenarioId,
        user_id: UserId,
    ) -> Result<SessionHandle, SimulationError> {
        let scenario = self.scenario(scenario_id)?;
        validate_scenario(&scenario)?;

        let session_id = self.allocate_session_id()?;
        let session = SimulationSession::new(session_id, &scenario, user_id, Utc::now());
        self.store.save(session.clone())?;

        info!(
            session_id = %session.id,
            scenario_id = %scenario.id,
            user_id = %session.user_id,
            "simulation session started"
        );
        Ok(SessionHandle::new(&session, &scenario))
    }

    /// Records one decision. Constraint violations come back as a rejected outcome and leave
    /// the session untouched.
    pub fn decide(
        &self,
        session_id: &SessionId,
        variable: &str,
        value: ScenarioValue,
        reasoning: Option<String>,
    ) -> Result<DecisionOutcome, SimulationError> {
        self.with_session_lock(session_id, || {
            let mut session = self.load_in_progress(session_id)?;
            let scenario = self.scenario(&session.scenario_id)?;

            if let Err(violation) = validate_binding(&scenario, variable, &value) {
                warn!(
                    session_id = %session.id,
                    variable,
                    %violation,
                    "decision rejected"
                );
                let progress = progress_percent(&scenario, &session.decisions);
                return Ok(DecisionOutcome::rejected(violation, progress));
            }

            let step_index = session.next_step_index();
            session.decisions.push(Decision {
                step_index,
                variable: variable.to_string(),
                value: value.clone(),
                timestamp: Utc::now(),
                reasoning,
            });
            session.bindings.insert(variable.to_string(), value);

            let immediate_outcomes = self
                .engine
                .resolver()
                .resolve_immediate(&scenario, &session.bindings);
            let progress = progress_percent(&scenario, &session.decisions);
            let next_variable = scenario
                .next_variable_after(variable)
                .map(|next| next.name.clone());

            self.store.save(session)?;

            debug!(
                session_id = %session_id,
                variable,
                step_index,
                progress,
                ?immediate_outcomes,
                "decision recorded"
            );

            Ok(DecisionOutcome {
                accepted: true,
                violation: None,
                step_index: Some(step_index),
                immediate_outcomes,
                progress_percent: progress,
                next_variable,
            })
        })
    }

    /// Seals the session with its final score and outcome, then credits the reward once.
    pub fn complete(
        &self,
        session_id: &SessionId,
        final_bindings: Bindings,
    ) -> Result<CompletionResult, SimulationError> {
        self.with_session_lock(session_id, || {
            let mut session = self.load_in_progress(session_id)?;
            let scenario = self.scenario(&session.scenario_id)?;

            for (name, value) in &final_bindings {
                validate_binding(&scenario, name, value).map_err(|violation| {
                    SimulationError::Validation {
                        scenario_id: scenario.id.clone(),
                        violation,
                    }
                })?;
            }
            session.bindings.extend(final_bindings);

            let evaluation = self.engine.evaluate(&scenario, &session.bindings);

            session.status = SessionStatus::Completed;
            session.final_score = Some(evaluation.score);
            session.outcome = Some(evaluation.outcome.clone());
            session.ended_at = Some(Utc::now());
            let user_id = session.user_id.clone();
            self.store.save(session)?;

            info!(
                session_id = %session_id,
                scenario_id = %scenario.id,
                score = evaluation.score,
                grade = evaluation.grade.label(),
                outcome = evaluation.outcome.result.outcome_type.label(),
                "simulation session completed"
            );

            let reward = self.credit_reward(&scenario, &user_id, evaluation.score);
            Ok(CompletionResult::new(
                session_id.clone(),
                &scenario,
                evaluation,
                reward,
            ))
        })
    }

    pub fn status(&self, session_id: &SessionId) -> Result<SessionSnapshot, SimulationError> {
        let session = self
            .store
            .load(session_id)?
            .ok_or_else(|| SimulationError::SessionNotFound(session_id.clone()))?;
        let scenario = self.catalog.get(&session.scenario_id)?;
        Ok(SessionSnapshot::new(session, scenario.as_deref()))
    }

    /// Every session the learner has opened, newest first.
    pub fn user_history(&self, user_id: &UserId) -> Result<UserHistory, SimulationError> {
        let mut sessions = self.store.sessions_for(user_id)?;
        sessions.sort_by(|left, right| {
            right
                .started_at
                .cmp(&left.started_at)
                .then_with(|| right.id.0.cmp(&left.id.0))
        });

        let snapshots = sessions
            .into_iter()
            .map(|session| {
                let scenario = self.catalog.get(&session.scenario_id)?;
                Ok::<_, SimulationError>(SessionSnapshot::new(session, scenario.as_deref()))
            })
            .collect::<Result<Vec<_>, SimulationError>>()?;

        debug!(user_id = %user_id, sessions = snapshots.len(), "loaded learner history");
        Ok(UserHistory::new(user_id.clone(), snapshots))
    }

    fn credit_reward(
        &self,
        scenario: &ScenarioDefinition,
        user_id: &UserId,
        score: u8,
    ) -> Option<RewardCredit> {
        let amount = self.rewards.amount_for(scenario.difficulty, score);
        let reason = self.rewards.reason_for(scenario);

        match self.ledger.credit(user_id, amount, &reason) {
            Ok(()) => {
                info!(user_id = %user_id, amount, "reward credited");
                Some(RewardCredit { amount, reason })
            }
            Err(err) => {
                error!(user_id = %user_id, amount, error = %err, "reward credit failed");
                None
            }
        }
    }

    fn load_in_progress(&self, session_id: &SessionId) -> Result<SimulationSession, SimulationError> {
        let session = self
            .store
            .load(session_id)?
            .ok_or_else(|| SimulationError::InvalidState {
                session_id: session_id.clone(),
                reason: "does not exist",
            })?;
        if session.is_completed() {
            return Err(SimulationError::InvalidState {
                session_id: session_id.clone(),
                reason: "is already completed",
            });
        }
        Ok(session)
    }

    fn allocate_session_id(&self) -> Result<SessionId, SimulationError> {
        loop {
            let next = self.sequence.fetch_add(1, Ordering::Relaxed);
            let candidate = SessionId(format!("sim-{next:06}"));
            if self.store.load(&candidate)?.is_none() {
                return Ok(candidate);
            }
        }
    }

    /// Runs `operation` while holding the session's lock. The table entry is dropped by the
    /// last holder, so it only ever contains sessions with a call in flight.
    fn with_session_lock<T>(&self, session_id: &SessionId, operation: impl FnOnce() -> T) -> T {
        let entry = Arc::clone(lock(&self.locks).entry(session_id.clone()).or_default());
        let result = {
            let _guard = lock(&entry);
            operation()
        };

        let mut locks = lock(&self.locks);
        // One reference is the table's, the other is ours.
        if Arc::strong_count(&entry) == 2 {
            locks.remove(session_id);
        }
        result
    }

    #[cfg(test)]
    pub(crate) fn active_locks(&self) -> usize {
        lock(&self.locks).len()
    }
}

/// Coarse failure category shared by logs and the HTTP mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidState,
    Evaluation,
    Unavailable,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::InvalidState => "invalid_state",
            Self::Evaluation => "evaluation",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Error raised by the session manager.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("scenario '{scenario_id}' rejected {violation}")]
    Validation {
        scenario_id: ScenarioId,
        violation: ConstraintViolation,
    },
    #[error("scenario '{0}' not found")]
    ScenarioNotFound(ScenarioId),
    #[error("session '{0}' not found")]
    SessionNotFound(SessionId),
    #[error("session '{session_id}' {reason}")]
    InvalidState {
        session_id: SessionId,
        reason: &'static str,
    },
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SimulationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimulationError::Validation { .. } => ErrorKind::Validation,
            SimulationError::ScenarioNotFound(_) | SimulationError::SessionNotFound(_) => {
                ErrorKind::NotFound
            }
            SimulationError::InvalidState { .. } => ErrorKind::InvalidState,
            SimulationError::Evaluation(_) => ErrorKind::Evaluation,
            SimulationError::Catalog(_) | SimulationError::Store(_) => ErrorKind::Unavailable,
        }
    }
}
