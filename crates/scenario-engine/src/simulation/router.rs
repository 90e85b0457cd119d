use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{Bindings, Difficulty, ScenarioId, ScenarioValue, SessionId, UserId};
use super::repository::{PersistenceStore, RewardLedger, ScenarioCatalog, ScenarioFilter};
use super::service::{ErrorKind, SessionManager, SimulationError};

type SharedManager<C, S, L> = Arc<SessionManager<C, S, L>>;

/// Router builder exposing scenario browsing and the session lifecycle over HTTP.
pub fn simulation_router<C, S, L>(manager: SharedManager<C, S, L>) -> Router
where
    C: ScenarioCatalog + 'static,
    S: PersistenceStore + 'static,
    L: RewardLedger + 'static,
{
    Router::new()
        .route(
            "/api/v1/simulations/scenarios",
            get(list_scenarios_handler::<C, S, L>),
        )
        .route(
            "/api/v1/simulations/scenarios/:scenario_id",
            get(scenario_handler::<C, S, L>),
        )
        .route(
            "/api/v1/simulations/sessions",
            post(start_handler::<C, S, L>),
        )
        .route(
            "/api/v1/simulations/sessions/:session_id",
            get(status_handler::<C, S, L>),
        )
        .route(
            "/api/v1/simulations/sessions/:session_id/decisions",
            post(decide_handler::<C, S, L>),
        )
        .route(
            "/api/v1/simulations/sessions/:session_id/complete",
            post(complete_handler::<C, S, L>),
        )
        .route(
            "/api/v1/simulations/users/:user_id/sessions",
            get(history_handler::<C, S, L>),
        )
        .with_state(manager)
}

/// Listing query: the catalog filter plus an optional learner whose attempts are attached.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListScenariosQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub scenario_id: ScenarioId,
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub variable: String,
    pub value: ScenarioValue,
    #[serde(default)]
    pub reasoning: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    #[serde(default)]
    pub final_bindings: Bindings,
}

pub(crate) fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::Evaluation => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(error: SimulationError) -> Response {
    let kind = error.kind();
    let payload = json!({
        "error": error.to_string(),
        "kind": kind.label(),
    });
    (status_for(kind), axum::Json(payload)).into_response()
}

pub(crate) async fn list_scenarios_handler<C, S, L>(
    State(manager): State<SharedManager<C, S, L>>,
    Query(query): Query<ListScenariosQuery>,
) -> Response
where
    C: ScenarioCatalog + 'static,
    S: PersistenceStore + 'static,
    L: RewardLedger + 'static,
{
    let filter = ScenarioFilter {
        category: query.category,
        difficulty: query.difficulty,
    };
    match manager.scenario_summaries(&filter, query.user_id.as_ref()) {
        Ok(summaries) => {
            let payload = json!({
                "total": summaries.len(),
                "scenarios": summaries,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn scenario_handler<C, S, L>(
    State(manager): State<SharedManager<C, S, L>>,
    Path(scenario_id): Path<String>,
) -> Response
where
    C: ScenarioCatalog + 'static,
    S: PersistenceStore + 'static,
    L: RewardLedger + 'static,
{
    match manager.scenario(&ScenarioId(scenario_id)) {
        Ok(scenario) => (StatusCode::OK, axum::Json(scenario.as_ref())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn start_handler<C, S, L>(
    State(manager): State<SharedManager<C, S, L>>,
    axum::Json(request): axum::Json<StartSessionRequest>,
) -> Response
where
    C: ScenarioCatalog + 'static,
    S: PersistenceStore + 'static,
    L: RewardLedger + 'static,
{
    match manager.start(&request.scenario_id, request.user_id) {
        Ok(handle) => (StatusCode::CREATED, axum::Json(handle)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<C, S, L>(
    State(manager): State<SharedManager<C, S, L>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: ScenarioCatalog + 'static,
    S: PersistenceStore + 'static,
    L: RewardLedger + 'static,
{
    match manager.status(&SessionId(session_id)) {
        Ok(snapshot) => (StatusCode::OK, axum::Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn decide_handler<C, S, L>(
    State(manager): State<SharedManager<C, S, L>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<DecisionRequest>,
) -> Response
where
    C: ScenarioCatalog + 'static,
    S: PersistenceStore + 'static,
    L: RewardLedger + 'static,
{
    let id = SessionId(session_id);
    match manager.decide(&id, &request.variable, request.value, request.reasoning) {
        Ok(outcome) if outcome.accepted => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Ok(outcome) => (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn complete_handler<C, S, L>(
    State(manager): State<SharedManager<C, S, L>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<CompleteRequest>,
) -> Response
where
    C: ScenarioCatalog + 'static,
    S: PersistenceStore + 'static,
    L: RewardLedger + 'static,
{
    let id = SessionId(session_id);
    match manager.complete(&id, request.final_bindings) {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_handler<C, S, L>(
    State(manager): State<SharedManager<C, S, L>>,
    Path(user_id): Path<String>,
) -> Response
where
    C: ScenarioCatalog + 'static,
    S: PersistenceStore + 'static,
    L: RewardLedger + 'static,
{
    match manager.user_history(&UserId(user_id)) {
        Ok(history) => (StatusCode::OK, axum::Json(history)).into_response(),
        Err(error) => error_response(error),
    }
}
