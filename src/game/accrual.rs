//! Time-based resource accrual.
//!
//! Accrual is always computed on demand from `last_collection`, so a missed
//! housekeeping tick never loses resources. Per-dragon fractional amounts are
//! carried as floats and truncated once at the aggregate boundary when a
//! batch collection credits the wallet; remainders below one unit are lost
//! there by design, which keeps collection totals reproducible.

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::game::errors::GameError;
use crate::game::store::GameStore;
use crate::game::types::{DragonRecord, WalletRecord};
use crate::game::wallet;

/// Bounded attempts for the per-dragon collection swap. A loser re-reads the
/// record and recomputes, so a second concurrent collect yields zero.
const COLLECT_MAX_ATTEMPTS: usize = 4;

/// Resources generated by one dragon since its last collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accrued {
    pub crystals: f64,
    pub tokens: f64,
    pub elapsed_seconds: i64,
}

impl Accrued {
    pub const ZERO: Accrued = Accrued {
        crystals: 0.0,
        tokens: 0.0,
        elapsed_seconds: 0,
    };
}

/// Outcome of a batch collection across all of a player's dragons.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectSummary {
    /// Whole crystals credited (aggregate truncation applied).
    pub crystals: u64,
    /// Whole tokens credited (aggregate truncation applied).
    pub tokens: u64,
    /// Dragons whose accrual made it into the credited aggregate.
    pub dragon_count: usize,
    /// Dragons skipped because they vanished or stayed contended mid-batch.
    /// Their accrual is still pending and realizes on the next collection.
    pub skipped: usize,
    /// Wallet totals after crediting.
    pub totals: WalletRecord,
}

/// Summed per-second generation rates with minute/hour projections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationRates {
    pub crystals_per_second: f64,
    pub tokens_per_second: f64,
    pub crystals_per_minute: f64,
    pub tokens_per_minute: f64,
    pub crystals_per_hour: f64,
    pub tokens_per_hour: f64,
}

/// Pure accrual computation. Elapsed seconds are floored and clamped to zero
/// to guard against clock skew, so the result is never negative.
pub fn accrued(dragon: &DragonRecord, now: DateTime<Utc>) -> Accrued {
    let elapsed_seconds = (now - dragon.last_collection).num_seconds().max(0);
    Accrued {
        crystals: elapsed_seconds as f64 * dragon.crystal_rate,
        tokens: elapsed_seconds as f64 * dragon.token_rate,
        elapsed_seconds,
    }
}

/// Realize one dragon's accrual: returns the accrued amounts and advances
/// `last_collection` to `now`. Atomic per dragon: of two concurrent collects
/// only one applies against a given read; the other recomputes from the
/// updated timestamp and yields zero.
pub fn collect_dragon(
    store: &GameStore,
    player_id: &str,
    dragon_id: &str,
    now: DateTime<Utc>,
) -> Result<Accrued, GameError> {
    let mut current = store.get_dragon(player_id, dragon_id)?;
    for _ in 0..COLLECT_MAX_ATTEMPTS {
        let pending = accrued(&current, now);
        let mut replacement = current.clone();
        replacement.last_collection = now;
        if store.swap_dragon(&current, &replacement)? {
            return Ok(pending);
        }
        // Lost the race; recompute from whatever the winner wrote.
        current = store.get_dragon(player_id, dragon_id)?;
    }
    Err(GameError::Conflict(format!(
        "collection contended for dragon {}",
        dragon_id
    )))
}

/// Collect across all of a player's dragons, truncate the aggregate to whole
/// units, and credit the wallet once. A player with no dragons gets a
/// zero-amount summary, not an error.
pub fn collect_all(
    store: &GameStore,
    player_id: &str,
    now: DateTime<Utc>,
) -> Result<CollectSummary, GameError> {
    if !store.player_exists(player_id)? {
        return Err(GameError::NotFound(format!("player: {}", player_id)));
    }
    let dragons = store.list_dragons(player_id)?;
    collect_listed(store, player_id, &dragons, now)
}

/// Batch-collect a fixed list of dragons. Realized accrual is always
/// credited: a dragon that disappears mid-batch (merged away) or stays
/// contended is skipped rather than aborting the batch, since the preceding
/// dragons have already advanced `last_collection`. Storage failures still
/// abort.
fn collect_listed(
    store: &GameStore,
    player_id: &str,
    dragons: &[DragonRecord],
    now: DateTime<Utc>,
) -> Result<CollectSummary, GameError> {
    if dragons.is_empty() {
        return Ok(CollectSummary {
            crystals: 0,
            tokens: 0,
            dragon_count: 0,
            skipped: 0,
            totals: store.get_wallet(player_id)?,
        });
    }

    let mut total_crystals = 0.0_f64;
    let mut total_tokens = 0.0_f64;
    let mut collected = 0_usize;
    let mut skipped = 0_usize;
    for dragon in dragons {
        match collect_dragon(store, player_id, &dragon.id, now) {
            Ok(pending) => {
                total_crystals += pending.crystals;
                total_tokens += pending.tokens;
                collected += 1;
            }
            Err(err @ (GameError::NotFound(_) | GameError::Conflict(_))) => {
                warn!(
                    "skipping dragon {} during batch collection for {}: {}",
                    dragon.id, player_id, err
                );
                skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    // Truncation happens here, on the aggregate, not per dragon.
    let crystals = total_crystals.floor() as u64;
    let tokens = total_tokens.floor() as u64;

    let totals = wallet::credit_soft(store, player_id, crystals, tokens)?;
    debug!(
        "collected {} crystals, {} tokens across {} dragons for {} ({} skipped)",
        crystals, tokens, collected, player_id, skipped
    );
    Ok(CollectSummary {
        crystals,
        tokens,
        dragon_count: collected,
        skipped,
        totals,
    })
}

/// Summed generation rates over all of a player's dragons.
pub fn generation_rates(store: &GameStore, player_id: &str) -> Result<GenerationRates, GameError> {
    if !store.player_exists(player_id)? {
        return Err(GameError::NotFound(format!("player: {}", player_id)));
    }
    let dragons = store.list_dragons(player_id)?;
    let crystals_per_second: f64 = dragons.iter().map(|d| d.crystal_rate).sum();
    let tokens_per_second: f64 = dragons.iter().map(|d| d.token_rate).sum();
    Ok(GenerationRates {
        crystals_per_second,
        tokens_per_second,
        crystals_per_minute: crystals_per_second * 60.0,
        tokens_per_minute: tokens_per_second * 60.0,
        crystals_per_hour: crystals_per_second * 3600.0,
        tokens_per_hour: tokens_per_second * 3600.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::store::GameStoreBuilder;
    use crate::game::types::{DragonElement, PlayerRecord};
    use chrono::Duration;
    use tempfile::TempDir;

    fn setup() -> (TempDir, GameStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path()).open().expect("store");
        let now = Utc::now();
        store
            .put_player(PlayerRecord::new("alice", "Alice", now))
            .expect("player");
        store
            .put_wallet(WalletRecord::new("alice", 0, 0, now))
            .expect("wallet");
        (dir, store)
    }

    fn dragon_collected_at(player: &str, rate_c: f64, rate_t: f64, at: DateTime<Utc>) -> DragonRecord {
        let mut dragon = DragonRecord::new(player, "Test", 1, DragonElement::Basic, rate_c, rate_t, at);
        dragon.last_collection = at;
        dragon
    }

    #[test]
    fn accrued_is_monotonic_and_non_negative() {
        let t0 = Utc::now();
        let dragon = dragon_collected_at("alice", 0.1, 0.05, t0);
        let a1 = accrued(&dragon, t0 + Duration::seconds(100));
        let a2 = accrued(&dragon, t0 + Duration::seconds(200));
        assert!(a2.crystals >= a1.crystals);
        assert!(a1.crystals >= 0.0 && a1.tokens >= 0.0);
        assert_eq!(a1.elapsed_seconds, 100);
    }

    #[test]
    fn clock_skew_clamps_to_zero() {
        let t0 = Utc::now();
        let dragon = dragon_collected_at("alice", 0.1, 0.05, t0);
        let a = accrued(&dragon, t0 - Duration::seconds(30));
        assert_eq!(a, Accrued::ZERO);
    }

    #[test]
    fn collect_then_accrue_yields_zero() {
        let (_dir, store) = setup();
        let t0 = Utc::now();
        let dragon = dragon_collected_at("alice", 0.1, 0.05, t0);
        store.put_dragon(dragon.clone()).expect("put");

        let later = t0 + Duration::seconds(60);
        let pending = collect_dragon(&store, "alice", &dragon.id, later).expect("collect");
        assert!(pending.crystals > 0.0);

        let refreshed = store.get_dragon("alice", &dragon.id).expect("get");
        let after = accrued(&refreshed, later);
        assert_eq!(after, Accrued::ZERO);
    }

    #[test]
    fn collect_all_truncates_at_the_aggregate() {
        let (_dir, store) = setup();
        let t0 = Utc::now();
        // Two dragons each accruing 0.7 crystals over 7s at 0.1/s: per-dragon
        // flooring would credit 0, aggregate flooring credits 1.
        store
            .put_dragon(dragon_collected_at("alice", 0.1, 0.05, t0))
            .expect("put");
        store
            .put_dragon(dragon_collected_at("alice", 0.1, 0.05, t0))
            .expect("put");

        let summary = collect_all(&store, "alice", t0 + Duration::seconds(7)).expect("collect");
        assert_eq!(summary.dragon_count, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.crystals, 1); // floor(0.7 + 0.7)
        assert_eq!(summary.tokens, 0); // floor(0.35 + 0.35)
        assert_eq!(summary.totals.crystals, 1);
    }

    #[test]
    fn batch_collection_skips_dragons_consumed_mid_flight() {
        let (_dir, store) = setup();
        let t0 = Utc::now();
        let live = dragon_collected_at("alice", 0.1, 0.05, t0);
        store.put_dragon(live.clone()).expect("put");
        // Listed at batch start but gone by collection time, as when a merge
        // consumes it between the listing and the per-dragon swap.
        let ghost = dragon_collected_at("alice", 0.1, 0.05, t0);

        let summary = collect_listed(
            &store,
            "alice",
            &[live.clone(), ghost],
            t0 + Duration::seconds(60),
        )
        .expect("collect");

        // The live dragon's realized accrual still lands in the wallet.
        assert_eq!(summary.dragon_count, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.crystals, 6); // floor(60 * 0.1)
        assert_eq!(summary.totals.crystals, 6);
        let refreshed = store.get_dragon("alice", &live.id).expect("get");
        assert_eq!(refreshed.last_collection, t0 + Duration::seconds(60));
    }

    #[test]
    fn collect_all_without_dragons_is_a_noop() {
        let (_dir, store) = setup();
        let summary = collect_all(&store, "alice", Utc::now()).expect("collect");
        assert_eq!(summary.dragon_count, 0);
        assert_eq!(summary.crystals, 0);
        assert_eq!(summary.tokens, 0);
    }

    #[test]
    fn collect_all_for_unknown_player_fails() {
        let (_dir, store) = setup();
        assert!(matches!(
            collect_all(&store, "nobody", Utc::now()),
            Err(GameError::NotFound(_))
        ));
    }

    #[test]
    fn generation_rates_sum_across_dragons() {
        let (_dir, store) = setup();
        let t0 = Utc::now();
        store
            .put_dragon(dragon_collected_at("alice", 0.1, 0.05, t0))
            .expect("put");
        store
            .put_dragon(dragon_collected_at("alice", 0.3, 0.15, t0))
            .expect("put");
        let rates = generation_rates(&store, "alice").expect("rates");
        assert!((rates.crystals_per_second - 0.4).abs() < 1e-9);
        assert!((rates.tokens_per_hour - 0.2 * 3600.0).abs() < 1e-6);
    }
}
