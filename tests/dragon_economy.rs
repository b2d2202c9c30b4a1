//! End-to-end dragon economy flow: registration, accrual, merging,
//! leveling, and shop purchases against a real store.

mod common;

use chrono::{Duration, Utc};
use dragonkeep::game::{
    self, Currency, GameError, STARTING_CRYSTALS, STARTING_TOKENS,
};

#[test]
fn registration_grants_starter_dragon_and_wallet() {
    let (_dir, store) = common::open_store();
    let now = Utc::now();
    let starter = game::initialize_player(&store, "alice", "Alice", now).expect("register");
    assert_eq!(starter.tier, 1);
    assert!((starter.crystal_rate - 0.1).abs() < 1e-9);
    assert!((starter.token_rate - 0.05).abs() < 1e-9);

    let wallet = store.get_wallet("alice").expect("wallet");
    assert_eq!(wallet.crystals, STARTING_CRYSTALS);
    assert_eq!(wallet.tokens, STARTING_TOKENS);
}

#[test]
fn accrual_collects_into_the_wallet() {
    let (_dir, store) = common::open_store();
    let t0 = Utc::now();
    game::initialize_player(&store, "alice", "Alice", t0).expect("register");

    // 100 seconds at the starter rates: 10 crystals, 5 tokens.
    let later = t0 + Duration::seconds(100);
    let summary = game::collect_all(&store, "alice", later).expect("collect");
    assert_eq!(summary.dragon_count, 1);
    assert_eq!(summary.crystals, 10);
    assert_eq!(summary.tokens, 5);
    assert_eq!(summary.totals.crystals, STARTING_CRYSTALS + 10);

    // Immediately collecting again yields nothing.
    let again = game::collect_all(&store, "alice", later).expect("collect");
    assert_eq!(again.crystals, 0);
    assert_eq!(again.tokens, 0);
}

#[test]
fn merge_consumes_sources_and_boosts_rates() {
    let (_dir, store) = common::open_store();
    let now = Utc::now();
    game::initialize_player(&store, "alice", "Alice", now).expect("register");
    game::purchase_dragon(&store, "alice", 1, 50, now).expect("purchase");

    let dragons = game::get_dragons(&store, "alice").expect("dragons");
    assert_eq!(dragons.len(), 2);
    let outcome = game::merge_dragons(&store, "alice", &dragons[0].id, &dragons[1].id, now)
        .expect("merge");

    assert_eq!(outcome.result.tier, 2);
    // Result rates come from the first source dragon, scaled by 1.2.
    assert!((outcome.result.crystal_rate - dragons[0].crystal_rate * 1.2).abs() < 1e-9);

    let remaining = game::get_dragons(&store, "alice").expect("dragons");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, outcome.result.id);

    let merges = store.list_merges("alice").expect("merges");
    assert_eq!(merges.len(), 1);
    assert_eq!(merges[0].tier_after, 2);
}

#[test]
fn mismatched_tiers_cannot_merge() {
    let (_dir, store) = common::open_store();
    let now = Utc::now();
    game::initialize_player(&store, "alice", "Alice", now).expect("register");
    game::purchase_dragon(&store, "alice", 2, 50, now).expect("purchase");

    let dragons = game::get_dragons(&store, "alice").expect("dragons");
    let err = game::merge_dragons(&store, "alice", &dragons[0].id, &dragons[1].id, now)
        .unwrap_err();
    assert!(matches!(err, GameError::InvalidState(_)));
    assert_eq!(game::get_dragons(&store, "alice").expect("dragons").len(), 2);
}

#[test]
fn level_up_snaps_rates_to_the_tier_curve() {
    let (_dir, store) = common::open_store();
    let now = Utc::now();
    game::initialize_player(&store, "alice", "Alice", now).expect("register");
    let dragons = game::get_dragons(&store, "alice").expect("dragons");

    let leveled = game::level_up_dragon(&store, "alice", &dragons[0].id).expect("level up");
    assert_eq!(leveled.tier, 2);
    // rate = base * (1 + tier * 0.2)
    assert!((leveled.crystal_rate - 0.1 * 1.4).abs() < 1e-9);
    assert!((leveled.token_rate - 0.05 * 1.4).abs() < 1e-9);
}

#[test]
fn purchases_debit_and_leave_an_audit_trail() {
    let (_dir, store) = common::open_store();
    let now = Utc::now();
    game::initialize_player(&store, "alice", "Alice", now).expect("register");

    game::purchase_dragon(&store, "alice", 1, 60, now).expect("purchase");
    let wallet = store.get_wallet("alice").expect("wallet");
    assert_eq!(wallet.crystals, STARTING_CRYSTALS - 60);

    let purchases = store.list_purchases("alice").expect("purchases");
    assert_eq!(purchases.len(), 1);
    assert!(purchases[0].reference.starts_with("TX-"));

    // Can't afford a second one at this price.
    let err = game::purchase_dragon(&store, "alice", 1, 500, now).unwrap_err();
    assert!(matches!(err, GameError::InsufficientFunds));
    assert_eq!(game::get_dragons(&store, "alice").expect("dragons").len(), 2);
}

#[test]
fn shop_catalog_drives_dragon_purchases() {
    let (_dir, store) = common::open_seeded_store();
    let now = Utc::now();
    game::initialize_player(&store, "alice", "Alice", now).expect("register");

    let items = store.list_shop_items().expect("shop items");
    assert_eq!(items.len(), 3);

    // Tier and price come straight from the seeded entry.
    let dragon =
        game::purchase_from_shop(&store, "alice", "shop_dragon_tier_1", now).expect("buy");
    assert_eq!(dragon.tier, 1);
    let wallet = store.get_wallet("alice").expect("wallet");
    assert_eq!(wallet.crystals, STARTING_CRYSTALS - 100);

    let err = game::purchase_from_shop(&store, "alice", "no_such_item", now).unwrap_err();
    assert!(matches!(err, GameError::NotFound(_)));
}

#[test]
fn skin_purchase_requires_premium_and_is_once_only() {
    let (_dir, store) = common::open_seeded_store();
    let now = Utc::now();
    game::initialize_player(&store, "alice", "Alice", now).expect("register");

    // No premium balance yet.
    let err = game::purchase_skin(&store, "alice", "skin_fire", 50, now).unwrap_err();
    assert!(matches!(err, GameError::InsufficientFunds));

    game::wallet::top_up_premium(&store, "alice", 100).expect("top up");
    let player = game::purchase_skin(&store, "alice", "skin_fire", 50, now).expect("buy skin");
    assert!(player.owned_skins.contains(&"skin_fire".to_string()));

    let err = game::purchase_skin(&store, "alice", "skin_fire", 50, now).unwrap_err();
    assert!(matches!(err, GameError::InvalidState(_)));

    // Applying an owned skin sticks to the dragon.
    let dragons = game::get_dragons(&store, "alice").expect("dragons");
    let dragon = game::apply_skin(&store, "alice", &dragons[0].id, "skin_fire").expect("apply");
    assert_eq!(dragon.active_skin, "skin_fire");

    // Premium credit also left an audit record.
    let purchases = store.list_purchases("alice").expect("purchases");
    assert_eq!(purchases.len(), 2);

    let wallet = store.get_wallet("alice").expect("wallet");
    assert_eq!(wallet.balance(Currency::Premium), 50);
}
