use std::sync::Arc;

use serde::Deserialize;

use super::domain::{Difficulty, ScenarioDefinition, ScenarioId, SessionId, SimulationSession, UserId};

/// Read-only source of authored scenarios.
pub trait ScenarioCatalog: Send + Sync {
    fn get(&self, id: &ScenarioId) -> Result<Option<Arc<ScenarioDefinition>>, CatalogError>;
    fn list(&self, filter: &ScenarioFilter) -> Result<Vec<Arc<ScenarioDefinition>>, CatalogError>;
}

/// Storage abstraction for sessions so the manager can be exercised in isolation.
pub trait PersistenceStore: Send + Sync {
    fn load(&self, id: &SessionId) -> Result<Option<SimulationSession>, StoreError>;
    fn save(&self, session: SimulationSession) -> Result<(), StoreError>;
    /// Every session owned by `user_id`, in no particular order.
    fn sessions_for(&self, user_id: &UserId) -> Result<Vec<SimulationSession>, StoreError>;
}

/// Outbound experience-point ledger.
pub trait RewardLedger: Send + Sync {
    fn credit(&self, user_id: &UserId, amount: u32, reason: &str) -> Result<(), LedgerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("scenario catalog unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("reward ledger unavailable: {0}")]
    Unavailable(String),
}

/// Optional category and difficulty narrowing for scenario listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScenarioFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl ScenarioFilter {
    pub fn matches(&self, scenario: &ScenarioDefinition) -> bool {
        let category = self
            .category
            .as_deref()
            .map_or(true, |category| scenario.category.eq_ignore_ascii_case(category));
        let difficulty = self
            .difficulty
            .map_or(true, |difficulty| scenario.difficulty == difficulty);
        category && difficulty
    }
}
