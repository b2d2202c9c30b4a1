//! Wallet ledger: the only path through which balances change.
//!
//! Balances are unsigned; a debit that would go below zero is rejected with
//! `InsufficientFunds` before anything is written. Every mutation runs
//! through the store's compare-and-swap update so two concurrent spends
//! cannot both apply against the same read.

use log::debug;

use crate::game::errors::GameError;
use crate::game::store::GameStore;
use crate::game::types::{Currency, PurchaseKind, PurchaseRecord, WalletRecord};

/// Credit a single currency. `amount` must be positive.
pub fn credit(
    store: &GameStore,
    player_id: &str,
    currency: Currency,
    amount: u64,
) -> Result<WalletRecord, GameError> {
    if amount == 0 {
        return Err(GameError::Validation(
            "credit amount must be positive".to_string(),
        ));
    }
    let wallet = store.update_wallet(player_id, |w| {
        apply_credit(w, currency, amount);
        Ok(())
    })?;
    debug!("credited {} {} to {}", amount, currency, player_id);
    Ok(wallet)
}

/// Credit crystals and tokens together in one atomic wallet update. Either
/// amount may be zero; used by collection and quest claims.
pub fn credit_soft(
    store: &GameStore,
    player_id: &str,
    crystals: u64,
    tokens: u64,
) -> Result<WalletRecord, GameError> {
    store.update_wallet(player_id, |w| {
        w.crystals += crystals;
        w.tokens += tokens;
        Ok(())
    })
}

/// Debit a single currency. Fails with `InsufficientFunds` when the balance
/// cannot cover `amount`; the wallet is untouched in that case.
pub fn debit(
    store: &GameStore,
    player_id: &str,
    currency: Currency,
    amount: u64,
) -> Result<WalletRecord, GameError> {
    if amount == 0 {
        return Err(GameError::Validation(
            "debit amount must be positive".to_string(),
        ));
    }
    let wallet = store.update_wallet(player_id, |w| {
        let balance = match currency {
            Currency::Crystals => &mut w.crystals,
            Currency::Tokens => &mut w.tokens,
            Currency::Premium => &mut w.premium,
        };
        *balance = balance
            .checked_sub(amount)
            .ok_or(GameError::InsufficientFunds)?;
        Ok(())
    })?;
    debug!("debited {} {} from {}", amount, currency, player_id);
    Ok(wallet)
}

/// Opaque premium top-up. Payment processing happens upstream; the engine
/// only records the resulting balance change and an audit entry.
pub fn top_up_premium(
    store: &GameStore,
    player_id: &str,
    amount: u64,
) -> Result<WalletRecord, GameError> {
    let wallet = credit(store, player_id, Currency::Premium, amount)?;
    let record = PurchaseRecord::new(
        player_id,
        PurchaseKind::PremiumTopUp,
        Currency::Premium,
        amount,
        "premium_top_up",
        chrono::Utc::now(),
    );
    store.append_purchase(&record)?;
    Ok(wallet)
}

fn apply_credit(wallet: &mut WalletRecord, currency: Currency, amount: u64) {
    match currency {
        Currency::Crystals => wallet.crystals += amount,
        Currency::Tokens => wallet.tokens += amount,
        Currency::Premium => wallet.premium += amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::store::GameStoreBuilder;
    use chrono::Utc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, GameStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path()).open().expect("store");
        store
            .put_wallet(WalletRecord::new("alice", 100, 50, Utc::now()))
            .expect("wallet");
        (dir, store)
    }

    #[test]
    fn credit_and_debit_round_trip() {
        let (_dir, store) = setup();
        credit(&store, "alice", Currency::Crystals, 40).expect("credit");
        let wallet = debit(&store, "alice", Currency::Crystals, 90).expect("debit");
        assert_eq!(wallet.crystals, 50);
    }

    #[test]
    fn debit_never_goes_negative() {
        let (_dir, store) = setup();
        let err = debit(&store, "alice", Currency::Tokens, 51).unwrap_err();
        assert!(matches!(err, GameError::InsufficientFunds));
        // Balance untouched after the failed debit.
        assert_eq!(store.get_wallet("alice").expect("get").tokens, 50);
    }

    #[test]
    fn zero_amounts_are_rejected() {
        let (_dir, store) = setup();
        assert!(matches!(
            credit(&store, "alice", Currency::Crystals, 0),
            Err(GameError::Validation(_))
        ));
        assert!(matches!(
            debit(&store, "alice", Currency::Crystals, 0),
            Err(GameError::Validation(_))
        ));
    }

    #[test]
    fn top_up_premium_records_audit_entry() {
        let (_dir, store) = setup();
        let wallet = top_up_premium(&store, "alice", 500).expect("top up");
        assert_eq!(wallet.premium, 500);
        let purchases = store.list_purchases("alice").expect("purchases");
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].kind, PurchaseKind::PremiumTopUp);
        assert!(purchases[0].reference.starts_with("TX-"));
    }

    #[test]
    fn unknown_wallet_is_not_found() {
        let (_dir, store) = setup();
        assert!(matches!(
            credit(&store, "nobody", Currency::Tokens, 5),
            Err(GameError::NotFound(_))
        ));
    }
}
