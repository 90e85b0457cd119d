use metrics_exporter_prometheus::PrometheusHandle;
use scenario_engine::config::SimulationConfig;
use scenario_engine::error::AppError;
use scenario_engine::simulation::{
    load_scenario_json, Difficulty, InMemoryRewardLedger, InMemoryScenarioCatalog,
    InMemorySessionStore, ScenarioLibrary, ScenarioValue, SessionManager,
};
use std::io;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type InMemorySessionManager =
    SessionManager<InMemoryScenarioCatalog, InMemorySessionStore, InMemoryRewardLedger>;

/// Catalog seeded with the built-in library plus any scenarios authored in `scenario_file`.
pub(crate) fn build_catalog(scenario_file: Option<&Path>) -> Result<InMemoryScenarioCatalog, AppError> {
    let catalog = InMemoryScenarioCatalog::with_scenarios(ScenarioLibrary::standard().into_scenarios())?;

    if let Some(path) = scenario_file {
        ensure_json(path)?;
        let raw = std::fs::read_to_string(path)?;
        let scenario = load_scenario_json(&raw)?;
        info!(scenario_id = %scenario.id, path = %path.display(), "registered authored scenario");
        catalog.register(scenario)?;
    }

    Ok(catalog)
}

pub(crate) fn build_manager(
    config: &SimulationConfig,
) -> Result<Arc<InMemorySessionManager>, AppError> {
    let catalog = build_catalog(config.scenario_file.as_deref())?;
    Ok(Arc::new(SessionManager::new(
        Arc::new(catalog),
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemoryRewardLedger::new()),
        config.rewards,
    )))
}

fn ensure_json(path: &Path) -> Result<(), AppError> {
    let guessed = mime_guess::from_path(path).first_or_octet_stream();
    if guessed.essence_str() == "application/json" {
        Ok(())
    } else {
        Err(AppError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "scenario file '{}' must be JSON (detected {})",
                path.display(),
                guessed.essence_str()
            ),
        )))
    }
}

/// Parses `name=value` pairs from the command line. Numeric values bind as numbers.
pub(crate) fn parse_assignment(raw: &str) -> Result<(String, ScenarioValue), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in '{raw}'"));
    }

    let value = value.trim();
    let value = match value.parse::<f64>() {
        Ok(number) if number.is_finite() => ScenarioValue::Number(number),
        _ => ScenarioValue::Text(value.to_string()),
    };
    Ok((name.to_string(), value))
}

pub(crate) fn parse_difficulty(raw: &str) -> Result<Difficulty, String> {
    Difficulty::parse(raw).ok_or_else(|| {
        format!("unknown difficulty '{raw}' (expected beginner, intermediate, or advanced)")
    })
}
