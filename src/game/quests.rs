//! Quest progression: instance lifecycle, daily reset, progress advance,
//! exactly-once claims, and login streak handling.
//!
//! Instance lifecycle per player and template:
//! `Active(progress < target)` -> `Completed(progress == target, claimed = false)`
//! -> `Claimed`. Claimed is terminal; daily instances are additionally
//! retired and replaced wholesale at the reset boundary.

use std::collections::HashMap;

use chrono::{DateTime, Days, Utc};
use log::{debug, info};

use crate::game::errors::GameError;
use crate::game::experience::{self, ExperienceGain};
use crate::game::store::GameStore;
use crate::game::types::{
    ObjectiveType, QuestClass, QuestHistoryEntry, QuestInstance, QuestReward, QuestTemplate,
    WalletRecord,
};
use crate::game::wallet;

/// A live quest instance joined with its immutable template.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestView {
    pub template: QuestTemplate,
    pub progress: u64,
    pub completed: bool,
    pub claimed: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Counts reported after (re)initializing a player's quest sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestSetSummary {
    pub daily: usize,
    pub special: usize,
}

/// Aggregate statistics over a player's live quest sets and history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuestStats {
    pub total: usize,
    pub completed: usize,
    pub claimed: usize,
    pub pending: usize,
    /// Completed as a rounded percentage of total.
    pub completion_rate: u32,
    /// History entries plus currently claimed instances.
    pub total_completed_ever: usize,
}

/// Result of a successful claim.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimOutcome {
    pub reward: QuestReward,
    pub wallet: WalletRecord,
    pub experience: Option<ExperienceGain>,
}

/// Result of a login event.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginSummary {
    pub streak: u32,
    /// True when this was the first login of a new calendar day.
    pub new_day: bool,
    /// Completed-but-unclaimed quests to surface to the player.
    pub completed_unclaimed: Vec<QuestView>,
}

/// Remaining time before the daily set retires, clamped to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetCountdown {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub formatted: String,
}

impl ResetCountdown {
    fn from_seconds(total: i64) -> Self {
        let total = total.max(0);
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;
        Self {
            hours,
            minutes,
            seconds,
            formatted: format!("{}h {}m {}s", hours, minutes, seconds),
        }
    }
}

/// Shared expiry for a day's worth of daily quests: the last millisecond of
/// the current calendar day.
pub fn end_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_milli_opt(23, 59, 59, 999)
        .expect("valid end-of-day time")
        .and_utc()
}

/// Populate both quest sets from the current template catalog. Daily
/// instances share one end-of-day expiry; special instances never expire.
pub fn initialize_quests(
    store: &GameStore,
    player_id: &str,
    now: DateTime<Utc>,
) -> Result<QuestSetSummary, GameError> {
    let daily_templates = store.list_quest_templates(Some(QuestClass::Daily))?;
    let special_templates = store.list_quest_templates(Some(QuestClass::Special))?;
    let expiry = end_of_day(now);

    let player = store.update_player(player_id, |p| {
        p.daily_quests = daily_templates
            .iter()
            .map(|t| QuestInstance::fresh(&t.id, Some(expiry)))
            .collect();
        p.special_quests = special_templates
            .iter()
            .map(|t| QuestInstance::fresh(&t.id, None))
            .collect();
        Ok(())
    })?;
    info!(
        "initialized quests for {}: {} daily, {} special",
        player_id,
        player.daily_quests.len(),
        player.special_quests.len()
    );
    Ok(QuestSetSummary {
        daily: player.daily_quests.len(),
        special: player.special_quests.len(),
    })
}

/// Replace the whole daily set when the shared expiry has passed (or no
/// daily instances exist). Returns true when a reset was performed.
pub fn check_and_reset_daily(
    store: &GameStore,
    player_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, GameError> {
    let player = store.get_player(player_id)?;
    let reset_needed = match player.daily_quests.first() {
        // All daily instances share one expiry, so the first one decides.
        Some(first) => first.expires_at.is_some_and(|expiry| expiry < now),
        None => true,
    };
    if !reset_needed {
        return Ok(false);
    }

    let daily_templates = store.list_quest_templates(Some(QuestClass::Daily))?;
    let expiry = end_of_day(now);
    store.update_player(player_id, |p| {
        p.daily_quests = daily_templates
            .iter()
            .map(|t| QuestInstance::fresh(&t.id, Some(expiry)))
            .collect();
        Ok(())
    })?;
    info!("daily quests reset for {}", player_id);
    Ok(true)
}

/// All live quest instances joined with their templates, daily first.
pub fn get_active_quests(store: &GameStore, player_id: &str) -> Result<Vec<QuestView>, GameError> {
    let player = store.get_player(player_id)?;
    let templates = template_index(store)?;
    let views = player
        .quest_instances()
        .filter_map(|instance| view_for(&templates, instance))
        .collect();
    Ok(views)
}

/// Daily subset of [`get_active_quests`].
pub fn get_daily_quests(store: &GameStore, player_id: &str) -> Result<Vec<QuestView>, GameError> {
    Ok(get_active_quests(store, player_id)?
        .into_iter()
        .filter(|v| v.template.class == QuestClass::Daily)
        .collect())
}

/// Special subset of [`get_active_quests`].
pub fn get_special_quests(store: &GameStore, player_id: &str) -> Result<Vec<QuestView>, GameError> {
    Ok(get_active_quests(store, player_id)?
        .into_iter()
        .filter(|v| v.template.class == QuestClass::Special)
        .collect())
}

/// Quests whose reward is waiting to be claimed.
pub fn get_completed_unclaimed(
    store: &GameStore,
    player_id: &str,
) -> Result<Vec<QuestView>, GameError> {
    Ok(get_active_quests(store, player_id)?
        .into_iter()
        .filter(|v| v.completed && !v.claimed)
        .collect())
}

pub fn quest_stats(store: &GameStore, player_id: &str) -> Result<QuestStats, GameError> {
    let player = store.get_player(player_id)?;
    let total = player.daily_quests.len() + player.special_quests.len();
    let completed = player.quest_instances().filter(|q| q.completed).count();
    let claimed = player.quest_instances().filter(|q| q.claimed).count();
    let completion_rate = if total > 0 {
        ((completed as f64 / total as f64) * 100.0).round() as u32
    } else {
        0
    };
    Ok(QuestStats {
        total,
        completed,
        claimed,
        pending: total - completed,
        completion_rate,
        total_completed_ever: player.quest_history.len() + claimed,
    })
}

/// Add `amount` to every active, not-yet-completed instance whose template
/// objective matches, clamping to the target. Returns the instances that
/// transitioned to completed in this call, for completion notices.
///
/// Threshold objectives (`FRIEND_COUNT`) are not advanced here; see
/// [`record_friend_count`].
pub fn advance(
    store: &GameStore,
    player_id: &str,
    objective_type: ObjectiveType,
    amount: u64,
) -> Result<Vec<QuestView>, GameError> {
    if amount == 0 {
        return Err(GameError::Validation(
            "advance amount must be positive".to_string(),
        ));
    }
    if objective_type.is_threshold() {
        return Err(GameError::Validation(format!(
            "{:?} is threshold-style; report the count instead",
            objective_type
        )));
    }

    let templates = template_index(store)?;
    let mut completed_ids: Vec<String> = Vec::new();
    let player = store.update_player(player_id, |p| {
        completed_ids.clear();
        for instance in p.quest_instances_mut() {
            let Some(template) = templates.get(&instance.quest_id) else {
                continue;
            };
            if template.objective.objective_type != objective_type || instance.completed {
                continue;
            }
            instance.progress = (instance.progress + amount).min(template.objective.target);
            if instance.progress >= template.objective.target {
                instance.completed = true;
                completed_ids.push(instance.quest_id.clone());
            }
        }
        Ok(())
    })?;

    if !completed_ids.is_empty() {
        debug!(
            "player {} completed {} quest(s) via {:?}",
            player_id,
            completed_ids.len(),
            objective_type
        );
    }
    Ok(collect_views(&player, &templates, &completed_ids))
}

/// Threshold-style handling for `FRIEND_COUNT`: any matching instance whose
/// target is already met by the running count completes immediately, with
/// progress set to the count rather than incremented.
pub fn record_friend_count(
    store: &GameStore,
    player_id: &str,
    friend_count: u64,
) -> Result<Vec<QuestView>, GameError> {
    let templates = template_index(store)?;
    let mut completed_ids: Vec<String> = Vec::new();
    let player = store.update_player(player_id, |p| {
        completed_ids.clear();
        for instance in p.quest_instances_mut() {
            let Some(template) = templates.get(&instance.quest_id) else {
                continue;
            };
            if template.objective.objective_type != ObjectiveType::FriendCount
                || instance.completed
                || template.objective.target > friend_count
            {
                continue;
            }
            instance.progress = friend_count;
            instance.completed = true;
            completed_ids.push(instance.quest_id.clone());
        }
        Ok(())
    })?;
    Ok(collect_views(&player, &templates, &completed_ids))
}

/// Claim a completed quest's reward exactly once: flip `claimed`, append the
/// history entry with a reward snapshot, credit the wallet, grant
/// experience. A second claim fails with `InvalidState` and credits nothing.
pub fn claim(
    store: &GameStore,
    player_id: &str,
    quest_id: &str,
    now: DateTime<Utc>,
) -> Result<ClaimOutcome, GameError> {
    let template = store.get_quest_template(quest_id)?;
    let reward = template.reward;

    // The claimed flag flips inside one CAS update; whoever loses the race
    // sees claimed == true and aborts before any credit happens.
    store.update_player(player_id, |p| {
        let Some(instance) = p.find_quest_mut(quest_id) else {
            return Err(GameError::NotFound(format!("quest: {}", quest_id)));
        };
        if !instance.completed {
            return Err(GameError::InvalidState(format!(
                "quest not completed: {}",
                quest_id
            )));
        }
        if instance.claimed {
            return Err(GameError::InvalidState(format!(
                "quest already claimed: {}",
                quest_id
            )));
        }
        instance.claimed = true;
        p.quest_history.push(QuestHistoryEntry {
            quest_id: quest_id.to_string(),
            claimed_at: now,
            reward,
        });
        Ok(())
    })?;

    let wallet = if reward.crystals > 0 || reward.tokens > 0 {
        wallet::credit_soft(store, player_id, reward.crystals, reward.tokens)?
    } else {
        store.get_wallet(player_id)?
    };
    let experience = if reward.experience > 0 {
        Some(experience::grant_experience(
            store,
            player_id,
            reward.experience,
        )?)
    } else {
        None
    };

    info!("player {} claimed quest {}", player_id, quest_id);
    Ok(ClaimOutcome {
        reward,
        wallet,
        experience,
    })
}

/// Login handling: calendar-date streak update plus `LOGIN` quest progress
/// on the first login of a new day. Same-day repeats change nothing.
pub fn handle_login(
    store: &GameStore,
    player_id: &str,
    now: DateTime<Utc>,
) -> Result<LoginSummary, GameError> {
    let mut new_day = false;
    let player = store.update_player(player_id, |p| {
        new_day = false;
        let today = now.date_naive();
        let last_date = p.last_login.date_naive();
        if today > last_date {
            new_day = true;
            let yesterday = today
                .checked_sub_days(Days::new(1))
                .expect("valid yesterday");
            p.login_streak = if last_date == yesterday {
                p.login_streak + 1
            } else {
                1
            };
            p.last_login = now;
        }
        Ok(())
    })?;

    if new_day {
        advance(store, player_id, ObjectiveType::Login, 1)?;
    }

    Ok(LoginSummary {
        streak: player.login_streak,
        new_day,
        completed_unclaimed: get_completed_unclaimed(store, player_id)?,
    })
}

/// Quest progress fed by a resource collection: both the per-collection and
/// running-total objectives advance by the collected amounts.
pub fn handle_resource_collection(
    store: &GameStore,
    player_id: &str,
    crystals: u64,
    tokens: u64,
) -> Result<Vec<QuestView>, GameError> {
    let mut completed = Vec::new();
    if crystals > 0 {
        completed.extend(advance(
            store,
            player_id,
            ObjectiveType::CollectCrystals,
            crystals,
        )?);
        completed.extend(advance(
            store,
            player_id,
            ObjectiveType::TotalCrystals,
            crystals,
        )?);
    }
    if tokens > 0 {
        completed.extend(advance(
            store,
            player_id,
            ObjectiveType::CollectTokens,
            tokens,
        )?);
        completed.extend(advance(
            store,
            player_id,
            ObjectiveType::TotalDragoncoin,
            tokens,
        )?);
    }
    Ok(completed)
}

/// Time remaining before the daily set retires, or `None` when the player
/// has no daily instances.
pub fn time_until_reset(
    store: &GameStore,
    player_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<ResetCountdown>, GameError> {
    let player = store.get_player(player_id)?;
    let Some(expiry) = player.daily_quests.first().and_then(|q| q.expires_at) else {
        return Ok(None);
    };
    Ok(Some(ResetCountdown::from_seconds(
        (expiry - now).num_seconds(),
    )))
}

fn template_index(store: &GameStore) -> Result<HashMap<String, QuestTemplate>, GameError> {
    // One catalog read per call instead of a store round-trip per template.
    Ok(store
        .list_quest_templates(None)?
        .into_iter()
        .map(|t| (t.id.clone(), t))
        .collect())
}

fn view_for(
    templates: &HashMap<String, QuestTemplate>,
    instance: &QuestInstance,
) -> Option<QuestView> {
    templates.get(&instance.quest_id).map(|template| QuestView {
        template: template.clone(),
        progress: instance.progress,
        completed: instance.completed,
        claimed: instance.claimed,
        expires_at: instance.expires_at,
    })
}

fn collect_views(
    player: &crate::game::types::PlayerRecord,
    templates: &HashMap<String, QuestTemplate>,
    quest_ids: &[String],
) -> Vec<QuestView> {
    player
        .quest_instances()
        .filter(|i| quest_ids.contains(&i.quest_id))
        .filter_map(|i| view_for(templates, i))
        .collect()
}
