use super::condition::{ArithmeticOp, Comparison, ComparisonOperator, ConditionTree, Operand};
use super::domain::{
    Difficulty, ImpactWeight, OutcomeResult, OutcomeRule, OutcomeType, ScenarioDefinition,
    ScenarioId, ScenarioValue, ScoreBand, ScoringCriterion, ScoringSpec, VariableConstraints,
    VariableSpec, VariableType,
};

/// Built-in scenario catalog shipped with the engine.
#[derive(Debug)]
pub struct ScenarioLibrary {
    scenarios: Vec<ScenarioDefinition>,
}

impl ScenarioLibrary {
    pub fn standard() -> Self {
        Self {
            scenarios: vec![sip_calculator(), tax_optimization()],
        }
    }

    pub fn scenarios(&self) -> &[ScenarioDefinition] {
        &self.scenarios
    }

    pub fn get(&self, id: &ScenarioId) -> Option<&ScenarioDefinition> {
        self.scenarios.iter().find(|scenario| &scenario.id == id)
    }

    pub fn into_scenarios(self) -> Vec<ScenarioDefinition> {
        self.scenarios
    }

    pub fn sip_calculator(&self) -> ScenarioDefinition {
        sip_calculator()
    }

    pub fn tax_optimization(&self) -> ScenarioDefinition {
        tax_optimization()
    }
}

fn sip_calculator() -> ScenarioDefinition {
    ScenarioDefinition {
        id: ScenarioId::from("sip-calculator"),
        title: "SIP Investment Strategy Planner".to_string(),
        description: "Plan your systematic investment plan for long-term wealth creation"
            .to_string(),
        category: "investment".to_string(),
        difficulty: Difficulty::Beginner,
        duration_minutes: 20,
        learning_objectives: strings(&[
            "Understand SIP benefits and mechanics",
            "Calculate optimal SIP amounts",
            "Plan for different investment goals",
            "Factor in inflation and tax implications",
        ]),
        real_world_application: "Create a personalized SIP strategy for your financial goals"
            .to_string(),
        variables: vec![
            numeric(
                "monthlyIncome",
                VariableType::Currency,
                "Your monthly take-home income",
                50_000.0,
                (10_000.0, 500_000.0),
                ImpactWeight::High,
            ),
            numeric(
                "monthlyExpense",
                VariableType::Currency,
                "Your monthly essential expenses",
                30_000.0,
                (5_000.0, 300_000.0),
                ImpactWeight::High,
            ),
            numeric(
                "emergencyFund",
                VariableType::Currency,
                "Current emergency fund amount",
                100_000.0,
                (0.0, 1_000_000.0),
                ImpactWeight::Medium,
            ),
            choice(
                "investmentGoal",
                "Primary investment goal",
                "wealth_creation",
                &[
                    "wealth_creation",
                    "retirement",
                    "home_purchase",
                    "child_education",
                    "vacation",
                ],
                ImpactWeight::High,
            ),
            numeric(
                "goalAmount",
                VariableType::Currency,
                "Target amount for your goal",
                5_000_000.0,
                (100_000.0, 100_000_000.0),
                ImpactWeight::High,
            ),
            numeric(
                "timeHorizon",
                VariableType::Number,
                "Investment time horizon (years)",
                10.0,
                (1.0, 30.0),
                ImpactWeight::High,
            ),
            choice(
                "riskTolerance",
                "Your risk tolerance level",
                "moderate",
                &["conservative", "moderate", "aggressive"],
                ImpactWeight::Medium,
            ),
            numeric(
                "existingInvestments",
                VariableType::Currency,
                "Current investment portfolio value",
                0.0,
                (0.0, 10_000_000.0),
                ImpactWeight::Medium,
            ),
        ],
        outcomes: vec![
            OutcomeRule {
                id: "insufficient_income".to_string(),
                title: "Insufficient Income".to_string(),
                description: "Monthly expenses exceed income".to_string(),
                condition: ConditionTree::all([compare(
                    "monthlyExpense",
                    ComparisonOperator::GreaterThan,
                    Operand::variable("monthlyIncome"),
                )]),
                result: OutcomeResult {
                    outcome_type: OutcomeType::Failure,
                    message: "Your expenses exceed your income. Focus on expense management first."
                        .to_string(),
                    recommendations: strings(&[
                        "Track and categorize all expenses",
                        "Identify areas for cost reduction",
                        "Consider increasing income sources",
                        "Build emergency fund before investing",
                    ]),
                    score: 0,
                },
            },
            OutcomeRule {
                id: "emergency_fund_missing".to_string(),
                title: "No Emergency Fund".to_string(),
                description: "Insufficient emergency fund coverage".to_string(),
                condition: ConditionTree::all([compare(
                    "emergencyFund",
                    ComparisonOperator::LessThan,
                    Operand::derived("monthlyExpense", ArithmeticOp::Multiply, 6.0),
                )]),
                result: OutcomeResult {
                    outcome_type: OutcomeType::Warning,
                    message: "Your emergency fund is below the recommended 6 months of expenses."
                        .to_string(),
                    recommendations: strings(&[
                        "Build emergency fund of 6 months expenses first",
                        "Consider high-yield savings account",
                        "Start SIP only after emergency fund is complete",
                        "Automate emergency fund contributions",
                    ]),
                    score: 60,
                },
            },
            OutcomeRule {
                id: "realistic_plan".to_string(),
                title: "Realistic Investment Plan".to_string(),
                description: "Well-balanced investment strategy".to_string(),
                condition: ConditionTree::all([
                    compare(
                        "monthlyIncome",
                        ComparisonOperator::GreaterThan,
                        Operand::variable("monthlyExpense"),
                    ),
                    compare(
                        "emergencyFund",
                        ComparisonOperator::GreaterOrEqual,
                        Operand::derived("monthlyExpense", ArithmeticOp::Multiply, 6.0),
                    ),
                ]),
                result: OutcomeResult {
                    outcome_type: OutcomeType::Success,
                    message: "Great! You have a solid foundation for SIP investments.".to_string(),
                    recommendations: strings(&[
                        "Start SIP with 20-30% of surplus income",
                        "Diversify across equity and debt funds",
                        "Review and rebalance annually",
                        "Increase SIP amount with salary hikes",
                    ]),
                    score: 90,
                },
            },
        ],
        scoring: ScoringSpec {
            criteria: vec![
                ScoringCriterion {
                    name: "Financial Planning".to_string(),
                    weight: 0.3,
                    description: "Overall financial planning approach".to_string(),
                    bands: vec![
                        band(
                            [compare(
                                "emergencyFund",
                                ComparisonOperator::GreaterOrEqual,
                                Operand::derived("monthlyExpense", ArithmeticOp::Multiply, 6.0),
                            )],
                            100,
                        ),
                        band(
                            [compare(
                                "emergencyFund",
                                ComparisonOperator::GreaterOrEqual,
                                Operand::derived("monthlyExpense", ArithmeticOp::Multiply, 3.0),
                            )],
                            60,
                        ),
                    ],
                    baseline: 20,
                },
                ScoringCriterion {
                    name: "Risk Assessment".to_string(),
                    weight: 0.25,
                    description: "Appropriate risk tolerance selection".to_string(),
                    bands: vec![
                        band(
                            [compare(
                                "timeHorizon",
                                ComparisonOperator::GreaterOrEqual,
                                Operand::literal(10.0),
                            )],
                            100,
                        ),
                        band(
                            [compare(
                                "timeHorizon",
                                ComparisonOperator::GreaterOrEqual,
                                Operand::literal(5.0),
                            )],
                            70,
                        ),
                    ],
                    baseline: 40,
                },
                ScoringCriterion {
                    name: "Goal Alignment".to_string(),
                    weight: 0.25,
                    description: "Investment aligned with goals".to_string(),
                    bands: vec![
                        band(
                            [compare(
                                "monthlyIncome",
                                ComparisonOperator::GreaterOrEqual,
                                Operand::derived("monthlyExpense", ArithmeticOp::Add, 10_000.0),
                            )],
                            100,
                        ),
                        band(
                            [compare(
                                "monthlyIncome",
                                ComparisonOperator::GreaterThan,
                                Operand::variable("monthlyExpense"),
                            )],
                            60,
                        ),
                    ],
                    baseline: 0,
                },
                ScoringCriterion {
                    name: "Practical Feasibility".to_string(),
                    weight: 0.2,
                    description: "Realistic and achievable plan".to_string(),
                    bands: vec![
                        band(
                            [compare(
                                "monthlyExpense",
                                ComparisonOperator::LessOrEqual,
                                Operand::derived("monthlyIncome", ArithmeticOp::Multiply, 0.6),
                            )],
                            100,
                        ),
                        band(
                            [compare(
                                "monthlyExpense",
                                ComparisonOperator::LessThan,
                                Operand::variable("monthlyIncome"),
                            )],
                            50,
                        ),
                    ],
                    baseline: 0,
                },
            ],
            passing_score: 70,
            excellent_score: 85,
        },
    }
}

fn tax_optimization() -> ScenarioDefinition {
    let mut variables = vec![
        numeric(
            "annualIncome",
            VariableType::Currency,
            "Your annual taxable income",
            800_000.0,
            (250_000.0, 5_000_000.0),
            ImpactWeight::High,
        ),
        numeric(
            "age",
            VariableType::Number,
            "Your current age",
            30.0,
            (18.0, 65.0),
            ImpactWeight::Medium,
        ),
        numeric(
            "currentInvestments",
            VariableType::Currency,
            "Current tax-saving investments",
            100_000.0,
            (0.0, 150_000.0),
            ImpactWeight::High,
        ),
        numeric(
            "insurancePremium",
            VariableType::Currency,
            "Annual life insurance premium",
            25_000.0,
            (0.0, 100_000.0),
            ImpactWeight::Medium,
        ),
        numeric(
            "healthInsurance",
            VariableType::Currency,
            "Annual health insurance premium",
            15_000.0,
            (0.0, 50_000.0),
            ImpactWeight::Medium,
        ),
        numeric(
            "otherDeductions",
            VariableType::Currency,
            "Other eligible deductions (80E, 80G, etc.)",
            50_000.0,
            (0.0, 200_000.0),
            ImpactWeight::Low,
        ),
    ];

    // Summed buckets; the maxima add up to exactly 100.
    for variable in &mut variables {
        let (bands, base) = match variable.name.as_str() {
            "annualIncome" | "age" => (Vec::new(), 10),
            "currentInvestments" => (
                vec![
                    at_least("currentInvestments", 150_000.0, 30),
                    at_least("currentInvestments", 100_000.0, 20),
                ],
                10,
            ),
            "insurancePremium" => (vec![above("insurancePremium", 0.0, 15)], 0),
            "healthInsurance" => (
                vec![
                    at_least("healthInsurance", 25_000.0, 25),
                    above("healthInsurance", 0.0, 20),
                ],
                0,
            ),
            "otherDeductions" => (vec![above("otherDeductions", 0.0, 10)], 5),
            _ => (Vec::new(), 0),
        };
        variable.score_bands = bands;
        variable.base_points = base;
    }

    ScenarioDefinition {
        id: ScenarioId::from("tax-optimization"),
        title: "Tax Optimization Strategy".to_string(),
        description: "Optimize your investments for maximum tax savings".to_string(),
        category: "tax_planning".to_string(),
        difficulty: Difficulty::Intermediate,
        duration_minutes: 25,
        learning_objectives: strings(&[
            "Understand Section 80C and 80D benefits",
            "Calculate tax savings from different investments",
            "Optimize portfolio for tax efficiency",
            "Plan for long-term capital gains",
        ]),
        real_world_application: "Create a tax-efficient investment portfolio".to_string(),
        variables,
        outcomes: vec![OutcomeRule {
            id: "tax_optimized".to_string(),
            title: "Tax-Optimized Portfolio".to_string(),
            description: "Well-optimized tax-saving strategy".to_string(),
            condition: ConditionTree::all([
                compare(
                    "currentInvestments",
                    ComparisonOperator::GreaterOrEqual,
                    Operand::literal(150_000.0),
                ),
                compare(
                    "insurancePremium",
                    ComparisonOperator::GreaterThan,
                    Operand::literal(0.0),
                ),
                compare(
                    "healthInsurance",
                    ComparisonOperator::GreaterThan,
                    Operand::literal(0.0),
                ),
            ]),
            result: OutcomeResult {
                outcome_type: OutcomeType::Success,
                message: "Excellent tax optimization strategy!".to_string(),
                recommendations: strings(&[
                    "Maximize ELSS for equity exposure",
                    "Consider PPF for safe long-term returns",
                    "Maintain health insurance for 80D benefits",
                    "Plan ELSS investments early in financial year",
                ]),
                score: 95,
            },
        }],
        scoring: ScoringSpec {
            criteria: vec![
                criterion("Tax Efficiency", 0.4, "Maximizing tax savings"),
                criterion(
                    "Investment Diversification",
                    0.3,
                    "Balanced portfolio approach",
                ),
                criterion("Long-term Planning", 0.3, "Sustainable tax strategy"),
            ],
            passing_score: 75,
            excellent_score: 90,
        },
    }
}

fn numeric(
    name: &str,
    variable_type: VariableType,
    description: &str,
    default_value: f64,
    (min, max): (f64, f64),
    impact_weight: ImpactWeight,
) -> VariableSpec {
    VariableSpec {
        name: name.to_string(),
        variable_type,
        description: description.to_string(),
        default_value: ScenarioValue::Number(default_value),
        constraints: VariableConstraints {
            min: Some(min),
            max: Some(max),
            choices: None,
        },
        impact_weight,
        score_bands: Vec::new(),
        base_points: 0,
    }
}

fn choice(
    name: &str,
    description: &str,
    default_value: &str,
    choices: &[&str],
    impact_weight: ImpactWeight,
) -> VariableSpec {
    VariableSpec {
        name: name.to_string(),
        variable_type: VariableType::Choice,
        description: description.to_string(),
        default_value: ScenarioValue::from(default_value),
        constraints: VariableConstraints {
            min: None,
            max: None,
            choices: Some(strings(choices)),
        },
        impact_weight,
        score_bands: Vec::new(),
        base_points: 0,
    }
}

fn criterion(name: &str, weight: f64, description: &str) -> ScoringCriterion {
    ScoringCriterion {
        name: name.to_string(),
        weight,
        description: description.to_string(),
        bands: Vec::new(),
        baseline: 0,
    }
}

fn compare(field: &str, operator: ComparisonOperator, operand: Operand) -> Comparison {
    Comparison::new(field, operator, operand)
}

fn band<const N: usize>(clauses: [Comparison; N], points: u8) -> ScoreBand {
    ScoreBand {
        when: ConditionTree::all(clauses),
        points,
    }
}

fn at_least(field: &str, threshold: f64, points: u8) -> ScoreBand {
    band(
        [compare(
            field,
            ComparisonOperator::GreaterOrEqual,
            Operand::literal(threshold),
        )],
        points,
    )
}

fn above(field: &str, threshold: f64, points: u8) -> ScoreBand {
    band(
        [compare(
            field,
            ComparisonOperator::GreaterThan,
            Operand::literal(threshold),
        )],
        points,
    )
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
