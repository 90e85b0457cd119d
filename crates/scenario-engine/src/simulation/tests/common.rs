use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;

use crate::simulation::domain::{
    Bindings, ScenarioDefinition, ScenarioId, ScenarioValue, SessionId, SimulationSession, UserId,
};
use crate::simulation::library::ScenarioLibrary;
use crate::simulation::memory::{InMemoryRewardLedger, InMemoryScenarioCatalog, InMemorySessionStore};
use crate::simulation::repository::{
    CatalogError, LedgerError, PersistenceStore, RewardLedger, ScenarioCatalog, ScenarioFilter,
    StoreError,
};
use crate::simulation::{simulation_router, RewardPolicy, SessionManager};

pub(super) type MemoryManager =
    SessionManager<InMemoryScenarioCatalog, InMemorySessionStore, InMemoryRewardLedger>;

pub(super) fn sip_id() -> ScenarioId {
    ScenarioId::from("sip-calculator")
}

pub(super) fn tax_id() -> ScenarioId {
    ScenarioId::from("tax-optimization")
}

pub(super) fn learner() -> UserId {
    UserId::from("learner-1")
}

pub(super) fn catalog() -> InMemoryScenarioCatalog {
    InMemoryScenarioCatalog::with_scenarios(ScenarioLibrary::standard().into_scenarios())
        .expect("standard library validates")
}

pub(super) fn build_manager() -> (
    MemoryManager,
    Arc<InMemorySessionStore>,
    Arc<InMemoryRewardLedger>,
) {
    let store = Arc::new(InMemorySessionStore::new());
    let ledger = Arc::new(InMemoryRewardLedger::new());
    let manager = SessionManager::new(
        Arc::new(catalog()),
        store.clone(),
        ledger.clone(),
        RewardPolicy::default(),
    );
    (manager, store, ledger)
}

pub(super) fn bindings(pairs: &[(&str, f64)]) -> Bindings {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), ScenarioValue::Number(*value)))
        .collect()
}

/// Bindings for the SIP scenario with the given income, expense, and emergency fund.
pub(super) fn sip_bindings(income: f64, expense: f64, fund: f64) -> Bindings {
    bindings(&[
        ("monthlyIncome", income),
        ("monthlyExpense", expense),
        ("emergencyFund", fund),
    ])
}

pub(super) fn sip_scenario() -> ScenarioDefinition {
    ScenarioLibrary::standard().sip_calculator()
}

pub(super) fn tax_scenario() -> ScenarioDefinition {
    ScenarioLibrary::standard().tax_optimization()
}

pub(super) struct UnavailableCatalog;

impl ScenarioCatalog for UnavailableCatalog {
    fn get(&self, _id: &ScenarioId) -> Result<Option<Arc<ScenarioDefinition>>, CatalogError> {
        Err(CatalogError::Unavailable("catalog offline".to_string()))
    }

    fn list(&self, _filter: &ScenarioFilter) -> Result<Vec<Arc<ScenarioDefinition>>, CatalogError> {
        Err(CatalogError::Unavailable("catalog offline".to_string()))
    }
}

pub(super) struct UnavailableStore;

impl PersistenceStore for UnavailableStore {
    fn load(&self, _id: &SessionId) -> Result<Option<SimulationSession>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn save(&self, _session: SimulationSession) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn sessions_for(&self, _user_id: &UserId) -> Result<Vec<SimulationSession>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }
}

pub(super) struct FailingLedger;

impl RewardLedger for FailingLedger {
    fn credit(&self, _user_id: &UserId, _amount: u32, _reason: &str) -> Result<(), LedgerError> {
        Err(LedgerError::Unavailable("ledger offline".to_string()))
    }
}

pub(super) fn router_with_manager(manager: MemoryManager) -> axum::Router {
    simulation_router(Arc::new(manager))
}

pub(super) fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

pub(super) fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
