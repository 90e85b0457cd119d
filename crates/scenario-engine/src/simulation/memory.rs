//! Process-local collaborators backing the service binary and the test suites.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use super::domain::{ScenarioDefinition, ScenarioId, SessionId, SimulationSession, UserId};
use super::repository::{
    CatalogError, LedgerError, PersistenceStore, RewardLedger, ScenarioCatalog, ScenarioFilter,
    StoreError,
};
use super::validation::{validate_scenario, EvaluationError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Catalog holding validated scenarios in registration order.
#[derive(Debug, Default)]
pub struct InMemoryScenarioCatalog {
    scenarios: Mutex<Vec<Arc<ScenarioDefinition>>>,
}

impl InMemoryScenarioCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers a scenario, replacing any previous one with the same id.
    pub fn register(&self, scenario: ScenarioDefinition) -> Result<(), EvaluationError> {
        for warning in validate_scenario(&scenario)? {
            warn!(scenario_id = %scenario.id, ?warning, "registered scenario with warning");
        }

        let mut scenarios = lock(&self.scenarios);
        let scenario = Arc::new(scenario);
        match scenarios.iter().position(|existing| existing.id == scenario.id) {
            Some(index) => scenarios[index] = scenario,
            None => scenarios.push(scenario),
        }
        Ok(())
    }

    pub fn with_scenarios(
        scenarios: impl IntoIterator<Item = ScenarioDefinition>,
    ) -> Result<Self, EvaluationError> {
        let catalog = Self::new();
        for scenario in scenarios {
            catalog.register(scenario)?;
        }
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        lock(&self.scenarios).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScenarioCatalog for InMemoryScenarioCatalog {
    fn get(&self, id: &ScenarioId) -> Result<Option<Arc<ScenarioDefinition>>, CatalogError> {
        Ok(lock(&self.scenarios)
            .iter()
            .find(|scenario| &scenario.id == id)
            .cloned())
    }

    fn list(&self, filter: &ScenarioFilter) -> Result<Vec<Arc<ScenarioDefinition>>, CatalogError> {
        Ok(lock(&self.scenarios)
            .iter()
            .filter(|scenario| filter.matches(scenario))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<SessionId, SimulationSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PersistenceStore for InMemorySessionStore {
    fn load(&self, id: &SessionId) -> Result<Option<SimulationSession>, StoreError> {
        Ok(lock(&self.sessions).get(id).cloned())
    }

    fn save(&self, session: SimulationSession) -> Result<(), StoreError> {
        lock(&self.sessions).insert(session.id.clone(), session);
        Ok(())
    }

    fn sessions_for(&self, user_id: &UserId) -> Result<Vec<SimulationSession>, StoreError> {
        Ok(lock(&self.sessions)
            .values()
            .filter(|session| &session.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// One ledger entry as recorded by [`InMemoryRewardLedger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub user_id: UserId,
    pub amount: u32,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct InMemoryRewardLedger {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl InMemoryRewardLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credits(&self) -> Vec<LedgerEntry> {
        lock(&self.entries).clone()
    }

    pub fn total_for(&self, user_id: &UserId) -> u64 {
        lock(&self.entries)
            .iter()
            .filter(|entry| &entry.user_id == user_id)
            .map(|entry| u64::from(entry.amount))
            .sum()
    }
}

impl RewardLedger for InMemoryRewardLedger {
    fn credit(&self, user_id: &UserId, amount: u32, reason: &str) -> Result<(), LedgerError> {
        lock(&self.entries).push(LedgerEntry {
            user_id: user_id.clone(),
            amount,
            reason: reason.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::domain::Difficulty;
    use crate::simulation::library::ScenarioLibrary;
    use chrono::Utc;

    #[test]
    fn catalog_rejects_invalid_scenarios() {
        let catalog = InMemoryScenarioCatalog::new();
        let mut scenario = ScenarioLibrary::standard().sip_calculator();
        scenario.scoring.criteria.clear();

        assert!(catalog.register(scenario).is_err());
        assert!(catalog.is_empty());
    }

    #[test]
    fn catalog_replaces_by_id_and_filters() {
        let catalog =
            InMemoryScenarioCatalog::with_scenarios(ScenarioLibrary::standard().into_scenarios())
                .expect("library registers");
        let mut updated = ScenarioLibrary::standard().sip_calculator();
        updated.title = "SIP Planner v2".to_string();
        catalog.register(updated).expect("re-register");

        assert_eq!(catalog.len(), 2);
        let sip = catalog
            .get(&ScenarioId::from("sip-calculator"))
            .expect("catalog available")
            .expect("scenario present");
        assert_eq!(sip.title, "SIP Planner v2");

        let filter = ScenarioFilter {
            category: None,
            difficulty: Some(Difficulty::Intermediate),
        };
        let listed = catalog.list(&filter).expect("catalog available");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, ScenarioId::from("tax-optimization"));
    }

    #[test]
    fn store_overwrites_on_save() {
        let store = InMemorySessionStore::new();
        let scenario = ScenarioLibrary::standard().sip_calculator();
        let mut session = SimulationSession::new(
            SessionId::from("sim-000001"),
            &scenario,
            UserId::from("learner-1"),
            Utc::now(),
        );
        store.save(session.clone()).expect("save");
        session.final_score = Some(42);
        store.save(session).expect("save");

        let loaded = store
            .load(&SessionId::from("sim-000001"))
            .expect("store available")
            .expect("session present");
        assert_eq!(loaded.final_score, Some(42));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_lists_sessions_per_user() {
        let store = InMemorySessionStore::new();
        let scenario = ScenarioLibrary::standard().sip_calculator();
        let owners = [
            ("sim-000001", "learner-1"),
            ("sim-000002", "learner-2"),
            ("sim-000003", "learner-1"),
        ];
        for (id, user) in owners {
            let session =
                SimulationSession::new(SessionId::from(id), &scenario, UserId::from(user), Utc::now());
            store.save(session).expect("save");
        }

        let mut owned: Vec<String> = store
            .sessions_for(&UserId::from("learner-1"))
            .expect("store available")
            .into_iter()
            .map(|session| session.id.0)
            .collect();
        owned.sort();
        assert_eq!(owned, ["sim-000001", "sim-000003"]);
        assert!(store
            .sessions_for(&UserId::from("nobody"))
            .expect("store available")
            .is_empty());
    }

    #[test]
    fn ledger_totals_per_user() {
        let ledger = InMemoryRewardLedger::new();
        let learner = UserId::from("learner-1");
        ledger.credit(&learner, 100, "first").expect("credit");
        ledger.credit(&learner, 50, "second").expect("credit");
        ledger
            .credit(&UserId::from("learner-2"), 10, "other")
            .expect("credit");

        assert_eq!(ledger.total_for(&learner), 150);
        assert_eq!(ledger.credits().len(), 3);
    }
}
