use std::collections::BTreeSet;

use super::domain::{Decision, ScenarioDefinition};

/// Share of declared variables that have received at least one decision, 0-100.
pub fn progress_percent(scenario: &ScenarioDefinition, decisions: &[Decision]) -> u8 {
    let total = scenario.variables.len();
    if total == 0 {
        return 0;
    }

    let decided = decisions
        .iter()
        .map(|decision| decision.variable.as_str())
        .filter(|name| scenario.variable(name).is_some())
        .collect::<BTreeSet<_>>()
        .len();

    let percent = (decided * 100 + total / 2) / total;
    u8::try_from(percent.min(100)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::domain::ScenarioValue;
    use crate::simulation::library::ScenarioLibrary;
    use chrono::Utc;

    fn decision(step_index: u32, variable: &str) -> Decision {
        Decision {
            step_index,
            variable: variable.to_string(),
            value: ScenarioValue::Number(1.0),
            timestamp: Utc::now(),
            reasoning: None,
        }
    }

    #[test]
    fn no_decisions_is_zero() {
        let scenario = ScenarioLibrary::standard().sip_calculator();
        assert_eq!(progress_percent(&scenario, &[]), 0);
    }

    #[test]
    fn repeated_decisions_count_once() {
        let scenario = ScenarioLibrary::standard().sip_calculator();
        assert_eq!(scenario.variables.len(), 8);

        let decisions = vec![
            decision(1, "monthlyIncome"),
            decision(2, "monthlyIncome"),
            decision(3, "monthlyExpense"),
        ];
        assert_eq!(progress_percent(&scenario, &decisions), 25);
    }

    #[test]
    fn rounds_to_nearest_percent() {
        let scenario = ScenarioLibrary::standard().tax_optimization();
        assert_eq!(scenario.variables.len(), 6);
        let decisions = vec![decision(1, "annualIncome")];
        assert_eq!(progress_percent(&scenario, &decisions), 17);

        let all: Vec<Decision> = scenario
            .variables
            .iter()
            .enumerate()
            .map(|(index, variable)| decision(index as u32 + 1, &variable.name))
            .collect();
        assert_eq!(progress_percent(&scenario, &all), 100);
    }

    #[test]
    fn undeclared_variables_are_ignored() {
        let scenario = ScenarioLibrary::standard().sip_calculator();
        let decisions = vec![decision(1, "somethingElse")];
        assert_eq!(progress_percent(&scenario, &decisions), 0);
    }
}
