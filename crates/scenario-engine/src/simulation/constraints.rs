use serde::Serialize;

use super::domain::{ScenarioDefinition, ScenarioValue, VariableSpec, VariableType};

/// Value rejected by a variable's declared constraints.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ConstraintViolation {
    pub field: String,
    pub reason: ViolationReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ViolationReason {
    #[error("variable is not declared by this scenario")]
    UndeclaredVariable,
    #[error("expected a {expected} value")]
    TypeMismatch { expected: &'static str },
    #[error("value must be a finite number")]
    NonFinite,
    #[error("value must be at least {min}")]
    BelowMinimum { min: f64, found: f64 },
    #[error("value must be at most {max}")]
    AboveMaximum { max: f64, found: f64 },
    #[error("value must be one of: {}", .choices.join(", "))]
    NotAChoice { choices: Vec<String> },
    #[error("'{raw}' is not a valid YYYY-MM-DD date")]
    InvalidDate { raw: String },
}

impl ConstraintViolation {
    fn new(field: &str, reason: ViolationReason) -> Self {
        Self {
            field: field.to_string(),
            reason,
        }
    }
}

/// Checks `value` against the type, range, and choice constraints of `spec`.
pub fn validate(spec: &VariableSpec, value: &ScenarioValue) -> Result<(), ConstraintViolation> {
    let violation = |reason| ConstraintViolation::new(&spec.name, reason);

    match spec.variable_type {
        VariableType::Number | VariableType::Percentage | VariableType::Currency => {
            let number = value.as_number().ok_or_else(|| {
                violation(ViolationReason::TypeMismatch {
                    expected: spec.variable_type.label(),
                })
            })?;
            if !number.is_finite() {
                return Err(violation(ViolationReason::NonFinite));
            }
            if let Some(min) = spec.constraints.min {
                if number < min {
                    return Err(violation(ViolationReason::BelowMinimum { min, found: number }));
                }
            }
            if let Some(max) = spec.constraints.max {
                if number > max {
                    return Err(violation(ViolationReason::AboveMaximum { max, found: number }));
                }
            }
            Ok(())
        }
        VariableType::Choice => {
            let choice = value.as_text().ok_or_else(|| {
                violation(ViolationReason::TypeMismatch {
                    expected: spec.variable_type.label(),
                })
            })?;
            let choices = spec.constraints.choices.as_deref().unwrap_or_default();
            if choices.iter().any(|allowed| allowed == choice) {
                Ok(())
            } else {
                Err(violation(ViolationReason::NotAChoice {
                    choices: choices.to_vec(),
                }))
            }
        }
        VariableType::Date => {
            let raw = value.as_text().ok_or_else(|| {
                violation(ViolationReason::TypeMismatch {
                    expected: spec.variable_type.label(),
                })
            })?;
            match value.as_date() {
                Some(_) => Ok(()),
                None => Err(violation(ViolationReason::InvalidDate {
                    raw: raw.to_string(),
                })),
            }
        }
    }
}

/// Looks up `name` in the scenario and validates `value` against it.
pub fn validate_binding(
    scenario: &ScenarioDefinition,
    name: &str,
    value: &ScenarioValue,
) -> Result<(), ConstraintViolation> {
    let spec = scenario
        .variable(name)
        .ok_or_else(|| ConstraintViolation::new(name, ViolationReason::UndeclaredVariable))?;
    validate(spec, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::domain::{ImpactWeight, VariableConstraints};
    use crate::simulation::library::ScenarioLibrary;

    fn spec(variable_type: VariableType, constraints: VariableConstraints) -> VariableSpec {
        VariableSpec {
            name: "field".to_string(),
            variable_type,
            description: String::new(),
            default_value: ScenarioValue::Number(0.0),
            constraints,
            impact_weight: ImpactWeight::Medium,
            score_bands: Vec::new(),
            base_points: 0,
        }
    }

    fn bounded(variable_type: VariableType) -> VariableSpec {
        spec(
            variable_type,
            VariableConstraints {
                min: Some(10.0),
                max: Some(20.0),
                choices: None,
            },
        )
    }

    #[test]
    fn bounds_are_inclusive_for_every_numeric_type() {
        for variable_type in [
            VariableType::Number,
            VariableType::Percentage,
            VariableType::Currency,
        ] {
            let spec = bounded(variable_type);
            assert!(validate(&spec, &10.0.into()).is_ok());
            assert!(validate(&spec, &20.0.into()).is_ok());
            assert!(validate(&spec, &15.5.into()).is_ok());

            let below = validate(&spec, &9.999.into()).expect_err("below min");
            assert!(matches!(
                below.reason,
                ViolationReason::BelowMinimum { min, .. } if min == 10.0
            ));
            let above = validate(&spec, &20.001.into()).expect_err("above max");
            assert!(matches!(
                above.reason,
                ViolationReason::AboveMaximum { max, .. } if max == 20.0
            ));
        }
    }

    #[test]
    fn unbounded_numbers_accept_any_finite_value() {
        let spec = spec(VariableType::Number, VariableConstraints::default());
        assert!(validate(&spec, &(-1e12).into()).is_ok());
        assert_eq!(
            validate(&spec, &f64::INFINITY.into()).map_err(|v| v.reason),
            Err(ViolationReason::NonFinite)
        );
        assert_eq!(
            validate(&spec, &f64::NAN.into()).map_err(|v| v.reason),
            Err(ViolationReason::NonFinite)
        );
    }

    #[test]
    fn numeric_variables_reject_text() {
        let spec = bounded(VariableType::Currency);
        let violation = validate(&spec, &"15".into()).expect_err("text rejected");
        assert_eq!(violation.field, "field");
        assert_eq!(
            violation.reason,
            ViolationReason::TypeMismatch {
                expected: "currency"
            }
        );
    }

    #[test]
    fn choices_must_be_declared_members() {
        let spec = spec(
            VariableType::Choice,
            VariableConstraints {
                min: None,
                max: None,
                choices: Some(vec!["conservative".to_string(), "moderate".to_string()]),
            },
        );
        assert!(validate(&spec, &"moderate".into()).is_ok());

        let violation = validate(&spec, &"reckless".into()).expect_err("not a member");
        assert_eq!(
            violation.to_string(),
            "field: value must be one of: conservative, moderate"
        );
        assert!(validate(&spec, &1.0.into()).is_err());
    }

    #[test]
    fn dates_must_parse() {
        let spec = spec(VariableType::Date, VariableConstraints::default());
        assert!(validate(&spec, &"2026-03-31".into()).is_ok());
        assert_eq!(
            validate(&spec, &"2026-02-30".into()).map_err(|v| v.reason),
            Err(ViolationReason::InvalidDate {
                raw: "2026-02-30".to_string()
            })
        );
        assert!(validate(&spec, &"next tuesday".into()).is_err());
        assert!(validate(&spec, &20260331.0.into()).is_err());
    }

    #[test]
    fn undeclared_variables_are_rejected() {
        let scenario = ScenarioLibrary::standard().sip_calculator();
        let violation =
            validate_binding(&scenario, "lotteryWinnings", &1.0.into()).expect_err("undeclared");
        assert_eq!(violation.field, "lotteryWinnings");
        assert_eq!(violation.reason, ViolationReason::UndeclaredVariable);
        assert!(validate_binding(&scenario, "monthlyIncome", &10_000.0.into()).is_ok());
    }

    #[test]
    fn violations_serialize_with_a_code() {
        let violation = ConstraintViolation::new(
            "age",
            ViolationReason::BelowMinimum {
                min: 18.0,
                found: 16.0,
            },
        );
        let value = serde_json::to_value(&violation).expect("serializes");
        assert_eq!(value["field"], "age");
        assert_eq!(value["reason"]["code"], "below_minimum");
        assert_eq!(value["reason"]["min"], 18.0);
    }
}
