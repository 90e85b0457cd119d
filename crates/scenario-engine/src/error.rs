use crate::config::ConfigError;
use crate::simulation::{EvaluationError, SimulationError};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Scenario(EvaluationError),
    Simulation(SimulationError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Scenario(err) => write!(f, "scenario error: {}", err),
            AppError::Simulation(err) => write!(f, "simulation error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Scenario(err) => Some(err),
            AppError::Simulation(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Simulation(err) => crate::simulation::router::status_for(err.kind()),
            AppError::Scenario(_)
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<EvaluationError> for AppError {
    fn from(value: EvaluationError) -> Self {
        Self::Scenario(value)
    }
}

impl From<SimulationError> for AppError {
    fn from(value: SimulationError) -> Self {
        Self::Simulation(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{ScenarioId, SessionId};

    #[test]
    fn simulation_errors_keep_their_status() {
        let missing: AppError = SimulationError::ScenarioNotFound(ScenarioId::from("nope")).into();
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let sealed: AppError = SimulationError::InvalidState {
            session_id: SessionId::from("sim-000001"),
            reason: "is already completed",
        }
        .into();
        assert_eq!(sealed.to_string(), "simulation error: session 'sim-000001' is already completed");
        assert_eq!(sealed.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn io_errors_are_internal() {
        let error: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "scenario file").into();
        assert!(std::error::Error::source(&error).is_some());
        assert_eq!(error.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
