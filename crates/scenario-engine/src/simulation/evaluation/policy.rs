use super::super::condition::MISSING_BINDING_POLICY;
use super::super::domain::{
    Bindings, Grade, OutcomeResult, OutcomeSource, OutcomeType, ResolvedOutcome,
    ScenarioDefinition,
};

/// Ids of every outcome rule that currently holds, in authoring order. Advisory only.
pub(crate) fn immediate_outcomes(scenario: &ScenarioDefinition, bindings: &Bindings) -> Vec<String> {
    scenario
        .outcomes
        .iter()
        .filter(|rule| {
            rule.condition
                .holds_in(scenario, bindings, MISSING_BINDING_POLICY)
        })
        .map(|rule| rule.id.clone())
        .collect()
}

/// First authored rule that holds wins; otherwise the score band decides.
pub(crate) fn final_outcome(
    scenario: &ScenarioDefinition,
    bindings: &Bindings,
    score: u8,
) -> ResolvedOutcome {
    let matched = scenario.outcomes.iter().find(|rule| {
        rule.condition
            .holds_in(scenario, bindings, MISSING_BINDING_POLICY)
    });

    if let Some(rule) = matched {
        return ResolvedOutcome {
            source: OutcomeSource::Rule {
                outcome_id: rule.id.clone(),
            },
            result: rule.result.clone(),
        };
    }

    let grade = scenario.scoring.grade_for(score);
    ResolvedOutcome {
        source: OutcomeSource::ScoreBand { grade },
        result: score_band_result(grade, score),
    }
}

fn score_band_result(grade: Grade, score: u8) -> OutcomeResult {
    match grade {
        Grade::Excellent => OutcomeResult {
            outcome_type: OutcomeType::Success,
            message: "Excellent performance! You've mastered this scenario.".to_string(),
            recommendations: vec![
                "Apply these strategies in real life".to_string(),
                "Try more advanced scenarios".to_string(),
            ],
            score,
        },
        Grade::Pass => OutcomeResult {
            outcome_type: OutcomeType::Success,
            message: "Good job! You've successfully completed this scenario.".to_string(),
            recommendations: vec![
                "Review areas for improvement".to_string(),
                "Practice with similar scenarios".to_string(),
            ],
            score,
        },
        Grade::Fail => OutcomeResult {
            outcome_type: OutcomeType::Failure,
            message: "You need to improve your strategy. Try again with different decisions."
                .to_string(),
            recommendations: vec![
                "Study the concepts again".to_string(),
                "Focus on the learning objectives".to_string(),
                "Try with a different approach".to_string(),
            ],
            score,
        },
    }
}

/// Follow-up guidance keyed off the computed score.
pub(crate) fn next_steps(score: u8) -> Vec<String> {
    let steps: &[&str] = if score >= 90 {
        &[
            "Try more advanced scenarios",
            "Mentor other learners",
            "Apply in real-world situations",
        ]
    } else if score >= 70 {
        &[
            "Review the scenario once more",
            "Try similar scenarios",
            "Practice the concepts",
        ]
    } else {
        &[
            "Study the learning objectives",
            "Review the scenario with guidance",
            "Start with beginner-level scenarios",
        ]
    };
    steps.iter().map(|step| step.to_string()).collect()
}
