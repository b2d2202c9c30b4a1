//! Quest lifecycle against the shipped catalog: initialization, login
//! streaks, collection-driven progress, claims, and the daily reset.

mod common;

use chrono::{Duration, Utc};
use dragonkeep::game::{self, GameError, ObjectiveType, QuestClass};

#[test]
fn shipped_catalog_initializes_both_quest_sets() {
    let (_dir, store) = common::open_seeded_store();
    let now = Utc::now();
    game::initialize_player(&store, "alice", "Alice", now).expect("register");
    let summary = game::initialize_quests(&store, "alice", now).expect("init quests");
    assert_eq!(summary.daily, 5);
    assert_eq!(summary.special, 6);

    let daily = game::get_daily_quests(&store, "alice").expect("daily");
    assert!(daily.iter().all(|q| q.template.class == QuestClass::Daily));
    assert!(daily.iter().all(|q| q.expires_at.is_some()));
    let special = game::get_special_quests(&store, "alice").expect("special");
    assert!(special.iter().all(|q| q.expires_at.is_none()));
}

#[test]
fn collection_progress_flows_into_quests_and_claims() {
    let (_dir, store) = common::open_seeded_store();
    let t0 = Utc::now();
    game::initialize_player(&store, "alice", "Alice", t0).expect("register");
    game::initialize_quests(&store, "alice", t0).expect("init quests");

    // 20 minutes of starter accrual: 120 crystals, 60 tokens.
    let later = t0 + Duration::minutes(20);
    let summary = game::collect_all(&store, "alice", later).expect("collect");
    assert_eq!(summary.crystals, 120);
    assert_eq!(summary.tokens, 60);

    let completed =
        game::handle_resource_collection(&store, "alice", summary.crystals, summary.tokens)
            .expect("progress");
    let ids: Vec<&str> = completed.iter().map(|q| q.template.id.as_str()).collect();
    assert!(ids.contains(&"daily_collect_crystals")); // target 100
    assert!(ids.contains(&"daily_collect_tokens")); // target 50

    let before = store.get_wallet("alice").expect("wallet");
    let outcome = game::claim(&store, "alice", "daily_collect_crystals", later).expect("claim");
    assert_eq!(outcome.reward.crystals, 50);
    assert_eq!(outcome.wallet.crystals, before.crystals + 50);
    assert_eq!(outcome.wallet.tokens, before.tokens + 30);
    let gain = outcome.experience.expect("experience");
    assert_eq!(gain.experience, 15);

    // Second claim is rejected and credits nothing.
    let err = game::claim(&store, "alice", "daily_collect_crystals", later).unwrap_err();
    assert!(matches!(err, GameError::InvalidState(_)));
    assert_eq!(
        store.get_wallet("alice").expect("wallet").crystals,
        outcome.wallet.crystals
    );
}

#[test]
fn login_streak_and_daily_reset_across_days() {
    let (_dir, store) = common::open_seeded_store();
    let day1 = Utc::now();
    game::initialize_player(&store, "alice", "Alice", day1).expect("register");
    game::initialize_quests(&store, "alice", day1).expect("init quests");

    let day2 = day1 + Duration::days(1);
    assert!(game::check_and_reset_daily(&store, "alice", day2).expect("reset"));
    let login = game::handle_login(&store, "alice", day2).expect("login");
    assert!(login.new_day);
    assert_eq!(login.streak, 2);
    assert!(login
        .completed_unclaimed
        .iter()
        .any(|q| q.template.id == "daily_login"));

    // The reset wiped yesterday's progress but kept special quests.
    let daily = game::get_daily_quests(&store, "alice").expect("daily");
    assert!(daily
        .iter()
        .filter(|q| q.template.id != "daily_login")
        .all(|q| q.progress == 0 && !q.completed));
    assert_eq!(game::get_special_quests(&store, "alice").expect("special").len(), 6);

    // Skipping two days resets the streak.
    let day5 = day2 + Duration::days(3);
    game::check_and_reset_daily(&store, "alice", day5).expect("reset");
    let login = game::handle_login(&store, "alice", day5).expect("login");
    assert_eq!(login.streak, 1);
}

#[test]
fn friend_invites_complete_at_the_threshold() {
    let (_dir, store) = common::open_seeded_store();
    let now = Utc::now();
    game::initialize_player(&store, "alice", "Alice", now).expect("register");
    game::initialize_quests(&store, "alice", now).expect("init quests");

    assert!(game::record_friend_count(&store, "alice", 2)
        .expect("record")
        .is_empty());
    let completed = game::record_friend_count(&store, "alice", 3).expect("record");
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].template.id, "special_invite_friends");
    assert_eq!(completed[0].progress, 3);
}

#[test]
fn upgrade_quests_track_merges_and_level_ups() {
    let (_dir, store) = common::open_seeded_store();
    let now = Utc::now();
    game::initialize_player(&store, "alice", "Alice", now).expect("register");
    game::initialize_quests(&store, "alice", now).expect("init quests");

    game::purchase_dragon(&store, "alice", 1, 50, now).expect("purchase");
    let dragons = game::get_dragons(&store, "alice").expect("dragons");
    game::merge_dragons(&store, "alice", &dragons[0].id, &dragons[1].id, now).expect("merge");

    let completed =
        game::advance(&store, "alice", ObjectiveType::UpgradeDragon, 1).expect("advance");
    assert!(completed
        .iter()
        .any(|q| q.template.id == "daily_upgrade_dragon"));
}

#[test]
fn stats_and_countdown_summarize_the_day() {
    let (_dir, store) = common::open_seeded_store();
    let now = Utc::now();
    game::initialize_player(&store, "alice", "Alice", now).expect("register");
    game::initialize_quests(&store, "alice", now).expect("init quests");

    let stats = game::quest_stats(&store, "alice").expect("stats");
    assert_eq!(stats.total, 11);
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.pending, 11);

    let countdown = game::time_until_reset(&store, "alice", now)
        .expect("countdown")
        .expect("present");
    assert!(countdown.hours < 24);
    assert!(countdown.hours >= 0);
}
