use serde::{Deserialize, Serialize};

use super::super::domain::{Difficulty, ScenarioDefinition};

pub const DEFAULT_BEGINNER_XP: u32 = 100;
pub const DEFAULT_INTERMEDIATE_XP: u32 = 150;
pub const DEFAULT_ADVANCED_XP: u32 = 200;

/// Base XP per difficulty, scaled by how well the learner scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPolicy {
    pub beginner_xp: u32,
    pub intermediate_xp: u32,
    pub advanced_xp: u32,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            beginner_xp: DEFAULT_BEGINNER_XP,
            intermediate_xp: DEFAULT_INTERMEDIATE_XP,
            advanced_xp: DEFAULT_ADVANCED_XP,
        }
    }
}

impl RewardPolicy {
    pub fn base_for(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Beginner => self.beginner_xp,
            Difficulty::Intermediate => self.intermediate_xp,
            Difficulty::Advanced => self.advanced_xp,
        }
    }

    /// 1.5x at 90+, 1x at 70+, half credit below. Rounded down.
    pub fn amount_for(&self, difficulty: Difficulty, score: u8) -> u32 {
        let base = u64::from(self.base_for(difficulty));
        let scaled = match score {
            90..=u8::MAX => base * 3 / 2,
            70..=89 => base,
            _ => base / 2,
        };
        u32::try_from(scaled).unwrap_or(u32::MAX)
    }

    pub fn reason_for(&self, scenario: &ScenarioDefinition) -> String {
        format!("Completed {} simulation", scenario.title)
    }
}

/// XP credited to the learner once a session completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardCredit {
    pub amount: u32,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_scale_with_score_and_difficulty() {
        let policy = RewardPolicy::default();
        assert_eq!(policy.amount_for(Difficulty::Beginner, 95), 150);
        assert_eq!(policy.amount_for(Difficulty::Beginner, 90), 150);
        assert_eq!(policy.amount_for(Difficulty::Intermediate, 70), 150);
        assert_eq!(policy.amount_for(Difficulty::Intermediate, 89), 150);
        assert_eq!(policy.amount_for(Difficulty::Advanced, 69), 100);
        assert_eq!(policy.amount_for(Difficulty::Advanced, 0), 100);
    }

    #[test]
    fn odd_bases_round_down() {
        let policy = RewardPolicy {
            beginner_xp: 15,
            intermediate_xp: 15,
            advanced_xp: 15,
        };
        assert_eq!(policy.amount_for(Difficulty::Beginner, 99), 22);
        assert_eq!(policy.amount_for(Difficulty::Beginner, 10), 7);
    }
}
