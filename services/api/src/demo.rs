use crate::infra::{build_manager, parse_assignment, parse_difficulty, InMemorySessionManager};
use chrono::SecondsFormat;
use clap::Args;
use scenario_engine::config::AppConfig;
use scenario_engine::error::AppError;
use scenario_engine::simulation::{
    Bindings, CompletionResult, Difficulty, ScenarioFilter, ScenarioId, ScenarioSummary,
    ScenarioValue, SessionId, UserId,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct ScenariosArgs {
    /// Only list scenarios in this category (case-insensitive)
    #[arg(long)]
    pub(crate) category: Option<String>,
    /// Only list scenarios at this difficulty
    #[arg(long, value_parser = parse_difficulty)]
    pub(crate) difficulty: Option<Difficulty>,
    /// Register an extra authored scenario from a JSON file
    #[arg(long)]
    pub(crate) scenario_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Scenario to play
    #[arg(long, default_value = "sip-calculator")]
    pub(crate) scenario: String,
    /// Learner credited with the reward
    #[arg(long, default_value = "demo-learner")]
    pub(crate) user: String,
    /// Decision to record, as NAME=VALUE. Repeat for several decisions.
    #[arg(long = "set", value_parser = parse_assignment)]
    pub(crate) set: Vec<(String, ScenarioValue)>,
    /// Register an extra authored scenario from a JSON file
    #[arg(long)]
    pub(crate) scenario_file: Option<PathBuf>,
}

pub(crate) fn run_scenario_listing(args: ScenariosArgs) -> Result<(), AppError> {
    let ScenariosArgs {
        category,
        difficulty,
        scenario_file,
    } = args;

    let manager = demo_manager(scenario_file)?;
    let filter = ScenarioFilter {
        category,
        difficulty,
    };
    let summaries = manager.scenario_summaries(&filter, None)?;

    for line in scenario_lines(&summaries) {
        println!("{line}");
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        scenario,
        user,
        set,
        scenario_file,
    } = args;

    let manager = demo_manager(scenario_file)?;
    let handle = manager.start(&ScenarioId::from(scenario.as_str()), UserId::from(user.as_str()))?;
    println!(
        "Started {} on '{}' at {}",
        handle.session_id,
        handle.scenario_id,
        handle.started_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );

    play(&manager, &handle.session_id, set)
}

fn demo_manager(scenario_file: Option<PathBuf>) -> Result<Arc<InMemorySessionManager>, AppError> {
    let mut simulation = AppConfig::load()?.simulation;
    if scenario_file.is_some() {
        simulation.scenario_file = scenario_file;
    }
    build_manager(&simulation)
}

fn play(
    manager: &InMemorySessionManager,
    session_id: &SessionId,
    decisions: Vec<(String, ScenarioValue)>,
) -> Result<(), AppError> {
    for (variable, value) in decisions {
        let outcome = manager.decide(session_id, &variable, value.clone(), None)?;
        match outcome.violation {
            Some(violation) => println!("- {variable} = {value}: rejected ({violation})"),
            None => {
                let triggered = if outcome.immediate_outcomes.is_empty() {
                    String::new()
                } else {
                    format!(" | signals: {}", outcome.immediate_outcomes.join(", "))
                };
                println!(
                    "- {variable} = {value}: recorded ({}% complete){triggered}",
                    outcome.progress_percent
                );
            }
        }
    }

    let result = manager.complete(session_id, Bindings::new())?;
    for line in completion_lines(&result) {
        println!("{line}");
    }
    Ok(())
}

pub(crate) fn scenario_lines(summaries: &[ScenarioSummary]) -> Vec<String> {
    if summaries.is_empty() {
        return vec!["No scenarios match the filter".to_string()];
    }

    summaries
        .iter()
        .map(|summary| {
            format!(
                "{:<20} {:<13} {:<16} {:>3} min  {} ({} variables)",
                summary.id.0,
                summary.difficulty.label(),
                summary.category,
                summary.duration,
                summary.title,
                summary.variable_count
            )
        })
        .collect()
}

pub(crate) fn completion_lines(result: &CompletionResult) -> Vec<String> {
    let mut lines = vec![
        format!(
            "\nScore {} / 100 ({}) | outcome {} [{}]",
            result.score,
            result.grade_label,
            result.outcome_id.as_deref().unwrap_or("score band"),
            result.outcome_type.label()
        ),
        format!("  {}", result.message),
    ];

    for part in &result.breakdown.contributions {
        lines.push(format!("  - {}: {} points", part.source, part.points));
    }
    if !result.recommendations.is_empty() {
        lines.push("Recommendations:".to_string());
        lines.extend(result.recommendations.iter().map(|item| format!("  - {item}")));
    }
    lines.push("Next steps:".to_string());
    lines.extend(result.next_steps.iter().map(|step| format!("  - {step}")));
    lines.push(format!("In practice: {}", result.insights.real_world_application));

    lines.push(match &result.reward {
        Some(reward) => format!("Reward: {} XP ({})", reward.amount, reward.reason),
        None => "Reward: not credited (ledger unavailable)".to_string(),
    });
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenario_engine::config::SimulationConfig;

    fn numbers(pairs: &[(&str, f64)]) -> Vec<(String, ScenarioValue)> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), ScenarioValue::Number(*value)))
            .collect()
    }

    #[test]
    fn scenario_lines_render_each_summary() {
        let manager = build_manager(&SimulationConfig::default()).expect("manager builds");
        let summaries = manager
            .scenario_summaries(&ScenarioFilter::default(), None)
            .expect("lists");

        let lines = scenario_lines(&summaries);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("sip-calculator"));
        assert!(lines[1].contains("intermediate"));
        assert_eq!(scenario_lines(&[]), ["No scenarios match the filter"]);
    }

    #[test]
    fn demo_plays_a_session_to_completion() {
        let manager = build_manager(&SimulationConfig::default()).expect("manager builds");
        let handle = manager
            .start(&ScenarioId::from("sip-calculator"), UserId::from("demo-learner"))
            .expect("session starts");

        play(
            &manager,
            &handle.session_id,
            numbers(&[
                ("monthlyIncome", 80_000.0),
                ("monthlyExpense", 35_000.0),
                ("emergencyFund", 250_000.0),
                ("age", 5.0),
            ]),
        )
        .expect("demo completes");

        let snapshot = manager.status(&handle.session_id).expect("status loads");
        assert_eq!(snapshot.decisions.len(), 3);
        assert_eq!(snapshot.final_score, Some(100));
    }

    #[test]
    fn completion_lines_report_outcome_and_reward() {
        let manager = build_manager(&SimulationConfig::default()).expect("manager builds");
        let handle = manager
            .start(&ScenarioId::from("sip-calculator"), UserId::from("demo-learner"))
            .expect("session starts");
        let result = manager
            .complete(&handle.session_id, Bindings::new())
            .expect("completes");

        let lines = completion_lines(&result);
        assert!(lines[0].contains("emergency_fund_missing"));
        assert!(lines[0].contains("[warning]"));
        assert!(lines.iter().any(|line| line.starts_with("Next steps:")));
        assert!(lines
            .iter()
            .any(|line| line.starts_with("In practice: Create a personalized SIP strategy")));
        assert!(lines
            .last()
            .is_some_and(|line| line.starts_with("Reward: ")));
    }

    #[test]
    fn uncredited_rewards_are_reported_as_such() {
        let manager = build_manager(&SimulationConfig::default()).expect("manager builds");
        let handle = manager
            .start(&ScenarioId::from("sip-calculator"), UserId::from("demo-learner"))
            .expect("session starts");
        let mut result = manager
            .complete(&handle.session_id, Bindings::new())
            .expect("completes");
        result.reward = None;

        let lines = completion_lines(&result);
        assert_eq!(
            lines.last().map(String::as_str),
            Some("Reward: not credited (ledger unavailable)")
        );
    }

    #[test]
    fn invalid_configuration_stops_the_demo() {
        std::env::set_var("SIM_XP_BEGINNER", "lots");
        let outcome = demo_manager(None);
        std::env::remove_var("SIM_XP_BEGINNER");

        let error = outcome.err().expect("bad xp is reported");
        assert!(matches!(error, AppError::Config(_)));
        assert!(error.to_string().contains("SIM_XP_BEGINNER"));
    }
}
