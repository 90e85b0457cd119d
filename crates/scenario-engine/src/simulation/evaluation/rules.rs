use serde::{Deserialize, Serialize};

use super::super::condition::MISSING_BINDING_POLICY;
use super::super::domain::{Bindings, ScenarioDefinition, ScoreBand};

const MAX_SCORE: u8 = 100;

/// Which declared input produced the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Weighted `ScoringSpec.criteria` bands.
    Criteria,
    /// Summed per-variable buckets, used when no criterion declares bands.
    VariableBands,
}

/// Discrete contribution to a score, kept for audits and learner insights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreContribution {
    pub source: String,
    pub weight: f64,
    pub points: u8,
    /// Index of the band that matched; `None` when the baseline applied.
    pub band: Option<usize>,
    pub weighted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub mode: ScoringMode,
    pub contributions: Vec<ScoreContribution>,
    pub total: u8,
}

pub(crate) fn scoring_mode(scenario: &ScenarioDefinition) -> ScoringMode {
    let criteria_banded = scenario
        .scoring
        .criteria
        .iter()
        .any(|criterion| !criterion.bands.is_empty());
    let variables_banded = scenario
        .variables
        .iter()
        .any(|variable| !variable.score_bands.is_empty());

    if !criteria_banded && variables_banded {
        ScoringMode::VariableBands
    } else {
        ScoringMode::Criteria
    }
}

fn first_matching_band(
    scenario: &ScenarioDefinition,
    bands: &[ScoreBand],
    bindings: &Bindings,
) -> Option<(usize, u8)> {
    bands
        .iter()
        .enumerate()
        .find(|(_, band)| band.when.holds_in(scenario, bindings, MISSING_BINDING_POLICY))
        .map(|(index, band)| (index, band.points.min(MAX_SCORE)))
}

fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, f64::from(MAX_SCORE)) as u8
}

pub(crate) fn score_breakdown(scenario: &ScenarioDefinition, bindings: &Bindings) -> ScoreBreakdown {
    let mode = scoring_mode(scenario);

    let contributions: Vec<ScoreContribution> = match mode {
        ScoringMode::Criteria => scenario
            .scoring
            .criteria
            .iter()
            .map(|criterion| {
                let (band, points) = match first_matching_band(scenario, &criterion.bands, bindings)
                {
                    Some((index, points)) => (Some(index), points),
                    None => (None, criterion.baseline.min(MAX_SCORE)),
                };
                ScoreContribution {
                    source: criterion.name.clone(),
                    weight: criterion.weight,
                    points,
                    band,
                    weighted: criterion.weight * f64::from(points),
                }
            })
            .collect(),
        ScoringMode::VariableBands => scenario
            .variables
            .iter()
            .map(|variable| {
                let (band, points) =
                    match first_matching_band(scenario, &variable.score_bands, bindings) {
                        Some((index, points)) => (Some(index), points),
                        None => (None, variable.base_points.min(MAX_SCORE)),
                    };
                ScoreContribution {
                    source: variable.name.clone(),
                    weight: 1.0,
                    points,
                    band,
                    weighted: f64::from(points),
                }
            })
            .collect(),
    };

    let raw: f64 = contributions.iter().map(|part| part.weighted).sum();

    ScoreBreakdown {
        mode,
        total: clamp_score(raw),
        contributions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_rounds_and_bounds() {
        assert_eq!(clamp_score(99.5), 100);
        assert_eq!(clamp_score(100.000_000_1), 100);
        assert_eq!(clamp_score(140.0), 100);
        assert_eq!(clamp_score(-3.0), 0);
        assert_eq!(clamp_score(f64::NAN), 0);
        assert_eq!(clamp_score(42.4), 42);
    }
}
