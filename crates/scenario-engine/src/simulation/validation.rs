//! Load-time checks for authored scenarios.
//!
//! Anything that could make grading misbehave mid-session is rejected here. That covers
//! references to undeclared variables, comparisons that can never hold, defaults that break
//! their own constraints, and scoring weights that do not add up.

use std::collections::BTreeSet;

use tracing::warn;

use super::condition::{Comparison, ConditionTree, Operand};
use super::constraints::{self, ViolationReason};
use super::domain::{ScenarioDefinition, ScenarioId, ScoreBand, VariableType};

const WEIGHT_TOLERANCE: f64 = 1e-6;
const MAX_POINTS: u8 = 100;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScenarioIssue {
    #[error("scenario declares no variables")]
    NoVariables,
    #[error("variable '{0}' is declared more than once")]
    DuplicateVariable(String),
    #[error("outcome '{0}' is declared more than once")]
    DuplicateOutcome(String),
    #[error("{location} references undeclared variable '{variable}'")]
    UndeclaredReference { location: String, variable: String },
    #[error("default value for '{variable}' is invalid: {reason}")]
    InvalidDefault {
        variable: String,
        reason: ViolationReason,
    },
    #[error("choice variable '{0}' declares no choices")]
    MissingChoices(String),
    #[error("variable '{0}' declares min greater than max")]
    InvertedBounds(String),
    #[error("criterion '{name}' weight {weight} is outside [0, 1]")]
    WeightOutOfRange { name: String, weight: f64 },
    #[error("criteria weights sum to {0}, expected 1.0")]
    WeightSum(f64),
    #[error("passing score {passing} exceeds excellent score {excellent}")]
    InvertedThresholds { passing: u8, excellent: u8 },
    #[error("excellent score {0} exceeds 100")]
    ThresholdOutOfRange(u8),
    #[error(
        "{location} compares {} variable '{variable}' against a value it cannot be ordered with",
        .variable_type.label()
    )]
    IncomparableOperand {
        location: String,
        variable: String,
        variable_type: VariableType,
    },
    #[error("{location} awards {points} points, above the 100 point ceiling")]
    PointsOutOfRange { location: String, points: u8 },
}

/// Non-fatal authoring concerns reported alongside a valid scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioWarning {
    /// Criteria bands and per-variable buckets are both declared; criteria win.
    CompetingScoringInputs,
}

/// Failure to accept authored scenario content.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("scenario content could not be parsed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("scenario '{scenario_id}' failed validation: {}", summarize(.issues))]
    Invalid {
        scenario_id: ScenarioId,
        issues: Vec<ScenarioIssue>,
    },
}

impl EvaluationError {
    pub fn issues(&self) -> &[ScenarioIssue] {
        match self {
            EvaluationError::Malformed(_) => &[],
            EvaluationError::Invalid { issues, .. } => issues,
        }
    }
}

fn summarize(issues: &[ScenarioIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validates every structural rule and returns any non-fatal warnings.
pub fn validate_scenario(
    scenario: &ScenarioDefinition,
) -> Result<Vec<ScenarioWarning>, EvaluationError> {
    let mut issues = Vec::new();

    check_variables(scenario, &mut issues);
    check_outcomes(scenario, &mut issues);
    check_scoring(scenario, &mut issues);

    if !issues.is_empty() {
        return Err(EvaluationError::Invalid {
            scenario_id: scenario.id.clone(),
            issues,
        });
    }

    let mut warnings = Vec::new();
    let criteria_banded = scenario
        .scoring
        .criteria
        .iter()
        .any(|criterion| !criterion.bands.is_empty());
    let variables_banded = scenario
        .variables
        .iter()
        .any(|variable| !variable.score_bands.is_empty());
    if criteria_banded && variables_banded {
        warn!(
            scenario_id = %scenario.id,
            "scenario declares both criteria bands and variable buckets; criteria take precedence"
        );
        warnings.push(ScenarioWarning::CompetingScoringInputs);
    }

    Ok(warnings)
}

/// Parses authored JSON and validates it in one step.
pub fn load_scenario_json(raw: &str) -> Result<ScenarioDefinition, EvaluationError> {
    let scenario: ScenarioDefinition = serde_json::from_str(raw)?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}

fn check_variables(scenario: &ScenarioDefinition, issues: &mut Vec<ScenarioIssue>) {
    if scenario.variables.is_empty() {
        issues.push(ScenarioIssue::NoVariables);
    }

    let mut seen = BTreeSet::new();
    for variable in &scenario.variables {
        if !seen.insert(variable.name.as_str()) {
            issues.push(ScenarioIssue::DuplicateVariable(variable.name.clone()));
        }

        if variable.variable_type == VariableType::Choice
            && variable
                .constraints
                .choices
                .as_ref()
                .map_or(true, Vec::is_empty)
        {
            issues.push(ScenarioIssue::MissingChoices(variable.name.clone()));
        }

        if let (Some(min), Some(max)) = (variable.constraints.min, variable.constraints.max) {
            if min > max {
                issues.push(ScenarioIssue::InvertedBounds(variable.name.clone()));
            }
        }

        if let Err(violation) = constraints::validate(variable, &variable.default_value) {
            issues.push(ScenarioIssue::InvalidDefault {
                variable: variable.name.clone(),
                reason: violation.reason,
            });
        }

        check_bands(
            scenario,
            &format!("variable '{}'", variable.name),
            &variable.score_bands,
            issues,
        );
        check_points(
            &format!("variable '{}' base", variable.name),
            variable.base_points,
            issues,
        );
    }
}

fn check_outcomes(scenario: &ScenarioDefinition, issues: &mut Vec<ScenarioIssue>) {
    let mut seen = BTreeSet::new();
    for outcome in &scenario.outcomes {
        if !seen.insert(outcome.id.as_str()) {
            issues.push(ScenarioIssue::DuplicateOutcome(outcome.id.clone()));
        }
        let location = format!("outcome '{}'", outcome.id);
        check_references(scenario, &location, &outcome.condition, issues);
        check_points(&location, outcome.result.score, issues);
    }
}

fn check_scoring(scenario: &ScenarioDefinition, issues: &mut Vec<ScenarioIssue>) {
    let scoring = &scenario.scoring;

    let mut total = 0.0;
    for criterion in &scoring.criteria {
        if !(0.0..=1.0).contains(&criterion.weight) {
            issues.push(ScenarioIssue::WeightOutOfRange {
                name: criterion.name.clone(),
                weight: criterion.weight,
            });
        }
        total += criterion.weight;

        let location = format!("criterion '{}'", criterion.name);
        check_bands(scenario, &location, &criterion.bands, issues);
        check_points(&format!("{location} baseline"), criterion.baseline, issues);
    }
    if (total - 1.0).abs() > WEIGHT_TOLERANCE {
        issues.push(ScenarioIssue::WeightSum(total));
    }

    if scoring.passing_score > scoring.excellent_score {
        issues.push(ScenarioIssue::InvertedThresholds {
            passing: scoring.passing_score,
            excellent: scoring.excellent_score,
        });
    }
    if scoring.excellent_score > MAX_POINTS {
        issues.push(ScenarioIssue::ThresholdOutOfRange(scoring.excellent_score));
    }
}

fn check_bands(
    scenario: &ScenarioDefinition,
    location: &str,
    bands: &[ScoreBand],
    issues: &mut Vec<ScenarioIssue>,
) {
    for (index, band) in bands.iter().enumerate() {
        let location = format!("{location} band {index}");
        check_references(scenario, &location, &band.when, issues);
        check_points(&location, band.points, issues);
    }
}

fn check_references(
    scenario: &ScenarioDefinition,
    location: &str,
    condition: &ConditionTree,
    issues: &mut Vec<ScenarioIssue>,
) {
    let undeclared: BTreeSet<&str> = condition
        .referenced_variables()
        .filter(|name| scenario.variable(name).is_none())
        .collect();
    for variable in undeclared {
        issues.push(ScenarioIssue::UndeclaredReference {
            location: location.to_string(),
            variable: variable.to_string(),
        });
    }

    for comparison in condition.clauses() {
        check_comparable(scenario, location, comparison, issues);
    }
}

/// Ordering class of one side of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderClass {
    Numeric,
    Date,
}

/// Choices never order, dates only order against dates, and derived expressions are numeric.
fn check_comparable(
    scenario: &ScenarioDefinition,
    location: &str,
    comparison: &Comparison,
    issues: &mut Vec<ScenarioIssue>,
) {
    let mut incomparable = |variable: &str, variable_type: VariableType| {
        issues.push(ScenarioIssue::IncomparableOperand {
            location: location.to_string(),
            variable: variable.to_string(),
            variable_type,
        });
    };
    let ordering_of = |variable_type: VariableType| match variable_type {
        VariableType::Date => Some(OrderClass::Date),
        VariableType::Choice => None,
        _ => Some(OrderClass::Numeric),
    };

    let Some(field) = scenario.variable(&comparison.field) else {
        return;
    };
    let left = ordering_of(field.variable_type);
    if left.is_none() {
        incomparable(&field.name, field.variable_type);
    }

    let right = match &comparison.operand {
        Operand::Literal(_) => Some(OrderClass::Numeric),
        Operand::Variable(name) => match scenario.variable(name) {
            Some(operand) => {
                let ordering = ordering_of(operand.variable_type);
                if ordering.is_none() {
                    incomparable(&operand.name, operand.variable_type);
                }
                ordering
            }
            None => return,
        },
        Operand::Derived(expr) => match scenario.variable(&expr.variable) {
            Some(operand) if operand.variable_type.is_numeric() => Some(OrderClass::Numeric),
            Some(operand) => {
                incomparable(&operand.name, operand.variable_type);
                None
            }
            None => return,
        },
    };

    if let (Some(left), Some(right)) = (left, right) {
        if left != right {
            let dated = if left == OrderClass::Date {
                Some(field)
            } else {
                comparison
                    .operand
                    .referenced_variable()
                    .and_then(|name| scenario.variable(name))
            };
            if let Some(dated) = dated {
                incomparable(&dated.name, dated.variable_type);
            }
        }
    }
}

fn check_points(location: &str, points: u8, issues: &mut Vec<ScenarioIssue>) {
    if points > MAX_POINTS {
        issues.push(ScenarioIssue::PointsOutOfRange {
            location: location.to_string(),
            points,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::condition::{Comparison, ComparisonOperator, Operand};
    use crate::simulation::condition::ArithmeticOp;
    use crate::simulation::domain::{
        ImpactWeight, ScenarioValue, VariableConstraints, VariableSpec,
    };
    use crate::simulation::library::ScenarioLibrary;
    use serde_json::json;

    fn date_variable(name: &str, default: &str) -> VariableSpec {
        VariableSpec {
            name: name.to_string(),
            variable_type: VariableType::Date,
            description: String::new(),
            default_value: ScenarioValue::from(default),
            constraints: VariableConstraints::default(),
            impact_weight: ImpactWeight::Low,
            score_bands: Vec::new(),
            base_points: 0,
        }
    }

    fn with_first_rule(comparison: Comparison) -> ScenarioDefinition {
        let mut scenario = ScenarioLibrary::standard().sip_calculator();
        scenario.variables.push(date_variable("startOn", "2026-01-01"));
        scenario.variables.push(date_variable("goalOn", "2036-01-01"));
        scenario.outcomes[0].condition = ConditionTree::all([comparison]);
        scenario
    }

    fn incomparable(variable: &str, variable_type: VariableType) -> ScenarioIssue {
        ScenarioIssue::IncomparableOperand {
            location: "outcome 'insufficient_income'".to_string(),
            variable: variable.to_string(),
            variable_type,
        }
    }

    #[test]
    fn standard_library_is_valid() {
        for scenario in ScenarioLibrary::standard().scenarios() {
            let warnings = validate_scenario(scenario).expect("library scenario validates");
            assert!(warnings.is_empty(), "{} has warnings", scenario.id);
        }
    }

    #[test]
    fn undeclared_references_are_reported() {
        let mut scenario = ScenarioLibrary::standard().sip_calculator();
        scenario.outcomes[0].condition = ConditionTree::all([Comparison::new(
            "monthlyExpense",
            ComparisonOperator::GreaterThan,
            Operand::variable("monthlySalary"),
        )]);

        let error = validate_scenario(&scenario).expect_err("undeclared reference");
        assert_eq!(
            error.issues(),
            [ScenarioIssue::UndeclaredReference {
                location: "outcome 'insufficient_income'".to_string(),
                variable: "monthlySalary".to_string(),
            }]
        );
        assert!(error.to_string().contains("sip-calculator"));
    }

    #[test]
    fn choice_variables_cannot_be_ordered() {
        let scenario = with_first_rule(Comparison::new(
            "riskTolerance",
            ComparisonOperator::GreaterThan,
            Operand::literal(0.0),
        ));
        let error = validate_scenario(&scenario).expect_err("choice on the left");
        assert_eq!(
            error.issues(),
            [incomparable("riskTolerance", VariableType::Choice)]
        );
        assert!(error.to_string().contains("choice variable 'riskTolerance'"));

        let scenario = with_first_rule(Comparison::new(
            "monthlyIncome",
            ComparisonOperator::GreaterThan,
            Operand::variable("investmentGoal"),
        ));
        let error = validate_scenario(&scenario).expect_err("choice on the right");
        assert_eq!(
            error.issues(),
            [incomparable("investmentGoal", VariableType::Choice)]
        );
    }

    #[test]
    fn dates_only_order_against_dates() {
        let cases = [
            Comparison::new(
                "startOn",
                ComparisonOperator::GreaterThan,
                Operand::literal(5.0),
            ),
            Comparison::new(
                "monthlyIncome",
                ComparisonOperator::LessThan,
                Operand::variable("startOn"),
            ),
            Comparison::new(
                "monthlyIncome",
                ComparisonOperator::GreaterOrEqual,
                Operand::derived("startOn", ArithmeticOp::Add, 30.0),
            ),
        ];
        for comparison in cases {
            let scenario = with_first_rule(comparison.clone());
            let error = validate_scenario(&scenario).expect_err("date mixed with numbers");
            assert_eq!(
                error.issues(),
                [incomparable("startOn", VariableType::Date)],
                "{comparison:?}"
            );
        }

        let scenario = with_first_rule(Comparison::new(
            "goalOn",
            ComparisonOperator::GreaterThan,
            Operand::variable("startOn"),
        ));
        assert!(validate_scenario(&scenario).expect("dates compare").is_empty());
    }

    #[test]
    fn score_bands_are_checked_for_comparability() {
        let mut scenario = ScenarioLibrary::standard().sip_calculator();
        scenario.scoring.criteria[1].bands[0].when = ConditionTree::all([Comparison::new(
            "investmentGoal",
            ComparisonOperator::GreaterOrEqual,
            Operand::literal(1.0),
        )]);

        let error = validate_scenario(&scenario).expect_err("band never holds");
        assert!(matches!(
            error.issues(),
            [ScenarioIssue::IncomparableOperand { location, variable, .. }]
                if location.ends_with("band 0") && variable == "investmentGoal"
        ));
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut scenario = ScenarioLibrary::standard().sip_calculator();
        scenario.scoring.criteria[0].weight = 0.5;

        let error = validate_scenario(&scenario).expect_err("weights off");
        assert!(matches!(error.issues(), [ScenarioIssue::WeightSum(total)] if (*total - 1.2).abs() < 1e-9));
    }

    #[test]
    fn defaults_must_satisfy_constraints() {
        let mut scenario = ScenarioLibrary::standard().sip_calculator();
        scenario.variables[0].default_value = ScenarioValue::Number(1.0);
        scenario.variables[3].constraints.choices = Some(Vec::new());

        let error = validate_scenario(&scenario).expect_err("bad defaults");
        let issues = error.issues();
        assert!(issues.iter().any(|issue| matches!(
            issue,
            ScenarioIssue::InvalidDefault { variable, .. } if variable == "monthlyIncome"
        )));
        assert!(issues
            .iter()
            .any(|issue| matches!(issue, ScenarioIssue::MissingChoices(name) if name == "investmentGoal")));
    }

    #[test]
    fn duplicates_and_thresholds_are_reported() {
        let mut scenario = ScenarioLibrary::standard().sip_calculator();
        let duplicate = scenario.variables[1].clone();
        scenario.variables.push(duplicate);
        let outcome = scenario.outcomes[0].clone();
        scenario.outcomes.push(outcome);
        scenario.scoring.passing_score = 95;

        let issues = validate_scenario(&scenario)
            .expect_err("invalid scenario")
            .issues()
            .to_vec();
        assert!(issues.contains(&ScenarioIssue::DuplicateVariable("monthlyExpense".to_string())));
        assert!(issues.contains(&ScenarioIssue::DuplicateOutcome(
            "insufficient_income".to_string()
        )));
        assert!(issues.contains(&ScenarioIssue::InvertedThresholds {
            passing: 95,
            excellent: 85
        }));
    }

    #[test]
    fn competing_scoring_inputs_warn() {
        let mut scenario = ScenarioLibrary::standard().sip_calculator();
        let bands = ScenarioLibrary::standard().tax_optimization().variables[2]
            .score_bands
            .clone();
        scenario.variables[0].score_bands = bands
            .into_iter()
            .map(|mut band| {
                band.when = ConditionTree::all([Comparison::new(
                    "monthlyIncome",
                    ComparisonOperator::GreaterThan,
                    Operand::literal(0.0),
                )]);
                band
            })
            .collect();

        let warnings = validate_scenario(&scenario).expect("still valid");
        assert_eq!(warnings, vec![ScenarioWarning::CompetingScoringInputs]);
    }

    #[test]
    fn load_rejects_malformed_expressions() {
        let raw = json!({
            "id": "broken",
            "title": "Broken",
            "category": "investment",
            "difficulty": "beginner",
            "variables": [
                { "name": "a", "type": "number", "defaultValue": 1 }
            ],
            "outcomes": [
                {
                    "id": "bad",
                    "conditions": { "a": { "$gt": { "$expression": "a ** 2" } } },
                    "result": { "type": "failure", "message": "bad", "score": 0 }
                }
            ],
            "scoring": {
                "criteria": [{ "name": "All", "weight": 1.0 }],
                "passingScore": 50,
                "excellentScore": 80
            }
        })
        .to_string();

        match load_scenario_json(&raw) {
            Err(EvaluationError::Malformed(error)) => {
                assert!(error.to_string().contains("a ** 2"), "{error}");
            }
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn load_accepts_authored_json() {
        let raw = json!({
            "id": "budget-basics",
            "title": "Budget Basics",
            "category": "debt_management",
            "difficulty": "beginner",
            "variables": [
                { "name": "income", "type": "currency", "defaultValue": 3000,
                  "constraints": { "min": 0, "max": 20000 }, "impact": "high" },
                { "name": "spend", "type": "currency", "defaultValue": 2500,
                  "constraints": { "min": 0, "max": 20000 } }
            ],
            "outcomes": [
                {
                    "id": "overspending",
                    "conditions": { "spend": { "$gt": "income" } },
                    "result": { "type": "failure", "message": "Spending exceeds income.", "score": 0 }
                }
            ],
            "scoring": {
                "criteria": [
                    { "name": "Savings", "weight": 1.0,
                      "bands": [ { "when": { "income": { "$gte": { "$expression": "spend * 1.2" } } }, "points": 100 } ],
                      "baseline": 40 }
                ],
                "passingScore": 60,
                "excellentScore": 90
            }
        })
        .to_string();

        let scenario = load_scenario_json(&raw).expect("loads");
        assert_eq!(scenario.id, ScenarioId::from("budget-basics"));
        assert_eq!(scenario.variables.len(), 2);
        assert_eq!(scenario.scoring.criteria[0].bands.len(), 1);
    }
}
