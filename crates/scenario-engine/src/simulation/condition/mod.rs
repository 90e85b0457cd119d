//! Declarative condition trees: an AND of comparisons, interpreted against a binding set.
//!
//! Authored JSON keeps the `$gt` / `$lt` / `$gte` / `$lte` vocabulary:
//!
//! ```json
//! { "monthlyExpense": { "$gt": "monthlyIncome" },
//!   "emergencyFund":  { "$gte": { "$expression": "monthlyExpense * 6" } } }
//! ```
//!
//! A number is a literal, a string names another variable, and `$expression` holds a
//! [`DerivedExpression`]. Evaluation cost is one lookup per comparison.

mod expression;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use expression::{ArithmeticOp, DerivedExpression, ExpressionError};

use super::domain::{Bindings, ScenarioDefinition, ScenarioValue};

/// How a comparison treats a variable with no binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingBindingPolicy {
    /// The comparison is false.
    FailClosed,
    /// The scenario's declared default stands in for the missing binding.
    ScenarioDefault,
}

/// Policy used for both in-session hints and final resolution.
pub const MISSING_BINDING_POLICY: MissingBindingPolicy = MissingBindingPolicy::FailClosed;

const EXPRESSION_KEY: &str = "$expression";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ComparisonOperator {
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
}

impl ComparisonOperator {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::GreaterThan => "$gt",
            Self::LessThan => "$lt",
            Self::GreaterOrEqual => "$gte",
            Self::LessOrEqual => "$lte",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "$gt" => Some(Self::GreaterThan),
            "$lt" => Some(Self::LessThan),
            "$gte" => Some(Self::GreaterOrEqual),
            "$lte" => Some(Self::LessOrEqual),
            _ => None,
        }
    }

    fn apply(self, left: f64, right: f64) -> bool {
        match self {
            Self::GreaterThan => left > right,
            Self::LessThan => left < right,
            Self::GreaterOrEqual => left >= right,
            Self::LessOrEqual => left <= right,
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(f64),
    Variable(String),
    Derived(DerivedExpression),
}

impl Operand {
    pub fn literal(value: f64) -> Self {
        Self::Literal(value)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    pub fn derived(variable: impl Into<String>, op: ArithmeticOp, constant: f64) -> Self {
        Self::Derived(DerivedExpression::new(variable, op, constant))
    }

    /// Variable this operand reads, if any.
    pub fn referenced_variable(&self) -> Option<&str> {
        match self {
            Operand::Literal(_) => None,
            Operand::Variable(name) => Some(name),
            Operand::Derived(expr) => Some(&expr.variable),
        }
    }

    fn resolve(&self, scope: &Scope<'_>) -> Option<f64> {
        match self {
            Operand::Literal(value) => value.is_finite().then_some(*value),
            Operand::Variable(name) => scope.value(name).and_then(ScenarioValue::comparable),
            Operand::Derived(expr) => scope
                .value(&expr.variable)
                .and_then(ScenarioValue::as_number)
                .filter(|value| value.is_finite())
                .and_then(|value| expr.apply(value)),
        }
    }

    fn from_json(value: &Value) -> Result<Self, ConditionError> {
        match value {
            Value::Number(number) => number
                .as_f64()
                .filter(|value| value.is_finite())
                .map(Operand::Literal)
                .ok_or_else(|| ConditionError::UnsupportedOperand(value.to_string())),
            Value::String(name) if expression::is_identifier(name) => {
                Ok(Operand::Variable(name.clone()))
            }
            Value::Object(map) if map.len() == 1 => match map.get(EXPRESSION_KEY) {
                Some(Value::String(raw)) => Ok(Operand::Derived(raw.parse()?)),
                _ => Err(ConditionError::UnsupportedOperand(value.to_string())),
            },
            _ => Err(ConditionError::UnsupportedOperand(value.to_string())),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Operand::Literal(value) => serde_json::Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Operand::Variable(name) => Value::String(name.clone()),
            Operand::Derived(expr) => {
                let mut map = serde_json::Map::new();
                map.insert(EXPRESSION_KEY.to_string(), Value::String(expr.to_string()));
                Value::Object(map)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub field: String,
    pub operator: ComparisonOperator,
    pub operand: Operand,
}

impl Comparison {
    pub fn new(field: impl Into<String>, operator: ComparisonOperator, operand: Operand) -> Self {
        Self {
            field: field.into(),
            operator,
            operand,
        }
    }

    fn holds(&self, scope: &Scope<'_>) -> bool {
        let Some(left) = scope.value(&self.field).and_then(ScenarioValue::comparable) else {
            return false;
        };
        let Some(right) = self.operand.resolve(scope) else {
            return false;
        };
        self.operator.apply(left, right)
    }
}

/// Implicit AND of comparisons. An empty tree holds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawConditionTree", into = "RawConditionTree")]
pub struct ConditionTree {
    clauses: Vec<Comparison>,
}

impl ConditionTree {
    pub fn all(clauses: impl IntoIterator<Item = Comparison>) -> Self {
        Self {
            clauses: clauses.into_iter().collect(),
        }
    }

    pub fn clauses(&self) -> &[Comparison] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Every variable the tree reads, fields and operands alike.
    pub fn referenced_variables(&self) -> impl Iterator<Item = &str> + '_ {
        self.clauses.iter().flat_map(|clause| {
            std::iter::once(clause.field.as_str()).chain(clause.operand.referenced_variable())
        })
    }

    /// Evaluates against `bindings` alone; unbound variables make their comparison false.
    pub fn holds(&self, bindings: &Bindings) -> bool {
        let scope = Scope {
            bindings,
            scenario: None,
            policy: MissingBindingPolicy::FailClosed,
        };
        self.evaluate(&scope)
    }

    /// Evaluates with an explicit missing-binding policy. `ScenarioDefault` falls back to the
    /// scenario's declared defaults.
    pub fn holds_in(
        &self,
        scenario: &ScenarioDefinition,
        bindings: &Bindings,
        policy: MissingBindingPolicy,
    ) -> bool {
        let scope = Scope {
            bindings,
            scenario: Some(scenario),
            policy,
        };
        self.evaluate(&scope)
    }

    fn evaluate(&self, scope: &Scope<'_>) -> bool {
        self.clauses.iter().all(|clause| clause.holds(scope))
    }
}

struct Scope<'a> {
    bindings: &'a Bindings,
    scenario: Option<&'a ScenarioDefinition>,
    policy: MissingBindingPolicy,
}

impl<'a> Scope<'a> {
    fn value(&self, name: &str) -> Option<&'a ScenarioValue> {
        if let Some(value) = self.bindings.get(name) {
            return Some(value);
        }
        match self.policy {
            MissingBindingPolicy::FailClosed => None,
            MissingBindingPolicy::ScenarioDefault => self
                .scenario
                .and_then(|scenario| scenario.variable(name))
                .map(|variable| &variable.default_value),
        }
    }
}

/// Errors raised while reading authored condition JSON.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionError {
    #[error("'{0}' is not a valid variable name")]
    InvalidField(String),
    #[error("field '{0}' declares no comparison operators")]
    EmptyOperators(String),
    #[error("unknown comparison operator '{0}' (expected $gt, $lt, $gte, or $lte)")]
    UnknownOperator(String),
    #[error("unsupported comparison operand {0}")]
    UnsupportedOperand(String),
    #[error(transparent)]
    Expression(#[from] ExpressionError),
}

type RawConditionTree = BTreeMap<String, BTreeMap<String, Value>>;

impl TryFrom<RawConditionTree> for ConditionTree {
    type Error = ConditionError;

    fn try_from(raw: RawConditionTree) -> Result<Self, Self::Error> {
        let mut clauses = Vec::new();
        for (field, operators) in raw {
            if !expression::is_identifier(&field) {
                return Err(ConditionError::InvalidField(field));
            }
            if operators.is_empty() {
                return Err(ConditionError::EmptyOperators(field));
            }
            for (symbol, operand) in operators {
                let operator = ComparisonOperator::from_symbol(&symbol)
                    .ok_or_else(|| ConditionError::UnknownOperator(symbol.clone()))?;
                clauses.push(Comparison::new(
                    field.clone(),
                    operator,
                    Operand::from_json(&operand)?,
                ));
            }
        }
        Ok(Self { clauses })
    }
}

impl From<ConditionTree> for RawConditionTree {
    fn from(tree: ConditionTree) -> Self {
        let mut raw = RawConditionTree::new();
        for clause in tree.clauses {
            raw.entry(clause.field)
                .or_default()
                .insert(clause.operator.symbol().to_string(), clause.operand.to_json());
        }
        raw
    }
}
