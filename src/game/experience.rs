//! Experience and player leveling.
//!
//! `level = floor(1 + sqrt(experience / 100))`. Monotonic and deterministic;
//! used by quest claims and any future experience source.

use crate::game::errors::GameError;
use crate::game::store::GameStore;

/// Result of an experience grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExperienceGain {
    pub old_level: u32,
    pub new_level: u32,
    pub level_up: bool,
    pub experience: u64,
}

/// Pure level curve.
pub fn level_for_experience(experience: u64) -> u32 {
    (1.0 + (experience as f64 / 100.0).sqrt()).floor() as u32
}

/// Add experience to a player and recompute the level. The level never
/// decreases: the curve is monotonic in experience.
pub fn grant_experience(
    store: &GameStore,
    player_id: &str,
    amount: u64,
) -> Result<ExperienceGain, GameError> {
    if amount == 0 {
        return Err(GameError::Validation(
            "experience amount must be positive".to_string(),
        ));
    }
    let mut old_level = 1;
    let player = store.update_player(player_id, |p| {
        old_level = p.level;
        p.experience += amount;
        let new_level = level_for_experience(p.experience);
        if new_level > p.level {
            p.level = new_level;
        }
        Ok(())
    })?;
    Ok(ExperienceGain {
        old_level,
        new_level: player.level,
        level_up: player.level > old_level,
        experience: player.experience,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::store::GameStoreBuilder;
    use crate::game::types::PlayerRecord;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn level_curve_matches_contract() {
        assert_eq!(level_for_experience(0), 1);
        assert_eq!(level_for_experience(99), 1);
        assert_eq!(level_for_experience(100), 2);
        assert_eq!(level_for_experience(400), 3); // floor(1 + sqrt(4))
        assert_eq!(level_for_experience(900), 4);
    }

    #[test]
    fn level_is_monotonic_in_experience() {
        let mut last = 0;
        for xp in (0..5_000).step_by(37) {
            let level = level_for_experience(xp);
            assert!(level >= last);
            last = level;
        }
    }

    #[test]
    fn grant_reports_level_up() {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path()).open().expect("store");
        store
            .put_player(PlayerRecord::new("alice", "Alice", Utc::now()))
            .expect("player");

        let gain = grant_experience(&store, "alice", 50).expect("grant");
        assert!(!gain.level_up);
        assert_eq!(gain.new_level, 1);

        let gain = grant_experience(&store, "alice", 350).expect("grant");
        assert!(gain.level_up);
        assert_eq!(gain.old_level, 1);
        assert_eq!(gain.new_level, 3);
        assert_eq!(gain.experience, 400);
    }
}
