use std::path::{Path, PathBuf};

use chrono::Utc;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{IVec, Transactional};

use crate::game::errors::GameError;
use crate::game::types::{
    DragonRecord, MergeRecord, PlayerRecord, PurchaseRecord, QuestClass, QuestTemplate,
    ShopItemRecord, SkinRecord, WalletRecord, DRAGON_SCHEMA_VERSION, PLAYER_SCHEMA_VERSION,
    WALLET_SCHEMA_VERSION,
};

const TREE_PLAYERS: &str = "players";
const TREE_DRAGONS: &str = "dragons";
const TREE_WALLETS: &str = "wallets";
const TREE_MERGES: &str = "merges";
const TREE_PURCHASES: &str = "purchases";
const TREE_CATALOG: &str = "catalog";

/// Bounded optimistic-retry budget for compare-and-swap updates. When the
/// budget is exhausted the operation surfaces `Conflict` so the caller can
/// retry once at its own level.
const CAS_MAX_ATTEMPTS: usize = 8;

fn next_timestamp_nanos() -> i64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros() * 1000)
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct GameStoreBuilder {
    path: PathBuf,
}

impl GameStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open(self) -> Result<GameStore, GameError> {
        GameStore::open(self.path)
    }
}

/// Sled-backed persistence for players, dragons, wallets, audit trails and
/// the read-only template catalog.
///
/// Every engine operation receives a `&GameStore` explicitly; there is no
/// process-global connection state.
pub struct GameStore {
    _db: sled::Db,
    players: sled::Tree,
    dragons: sled::Tree,
    wallets: sled::Tree,
    merges: sled::Tree,
    purchases: sled::Tree,
    catalog: sled::Tree,
}

impl GameStore {
    /// Open (or create) the game store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GameError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let players = db.open_tree(TREE_PLAYERS)?;
        let dragons = db.open_tree(TREE_DRAGONS)?;
        let wallets = db.open_tree(TREE_WALLETS)?;
        let merges = db.open_tree(TREE_MERGES)?;
        let purchases = db.open_tree(TREE_PURCHASES)?;
        let catalog = db.open_tree(TREE_CATALOG)?;
        Ok(Self {
            _db: db,
            players,
            dragons,
            wallets,
            merges,
            purchases,
            catalog,
        })
    }

    fn player_key(player_id: &str) -> Vec<u8> {
        format!("players:{}", player_id).into_bytes()
    }

    fn dragon_key(player_id: &str, dragon_id: &str) -> Vec<u8> {
        format!("{}:{}", player_id, dragon_id).into_bytes()
    }

    fn dragon_prefix(player_id: &str) -> Vec<u8> {
        format!("{}:", player_id).into_bytes()
    }

    fn wallet_key(player_id: &str) -> Vec<u8> {
        player_id.as_bytes().to_vec()
    }

    fn quest_template_key(quest_id: &str) -> Vec<u8> {
        format!("quests:{}", quest_id).into_bytes()
    }

    fn skin_key(skin_id: &str) -> Vec<u8> {
        format!("skins:{}", skin_id).into_bytes()
    }

    fn shop_item_key(item_id: &str) -> Vec<u8> {
        format!("shop:{}", item_id).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, GameError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, GameError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Insert or overwrite a player record. For read-modify-write cycles that
    /// must not lose a race, prefer [`GameStore::update_player`].
    pub fn put_player(&self, mut player: PlayerRecord) -> Result<(), GameError> {
        player.schema_version = PLAYER_SCHEMA_VERSION;
        let key = Self::player_key(&player.player_id);
        let bytes = Self::serialize(&player)?;
        self.players.insert(key, bytes)?;
        self.players.flush()?;
        Ok(())
    }

    pub fn get_player(&self, player_id: &str) -> Result<PlayerRecord, GameError> {
        let key = Self::player_key(player_id);
        let Some(bytes) = self.players.get(&key)? else {
            return Err(GameError::NotFound(format!("player: {}", player_id)));
        };
        let record: PlayerRecord = Self::deserialize(bytes)?;
        if record.schema_version != PLAYER_SCHEMA_VERSION {
            return Err(GameError::SchemaMismatch {
                entity: "player",
                expected: PLAYER_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    pub fn player_exists(&self, player_id: &str) -> Result<bool, GameError> {
        Ok(self.players.contains_key(Self::player_key(player_id))?)
    }

    /// List all player ids currently stored.
    pub fn list_player_ids(&self) -> Result<Vec<String>, GameError> {
        let mut ids = Vec::new();
        for entry in self.players.scan_prefix(b"players:") {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(player_id) = text.strip_prefix("players:") {
                ids.push(player_id.to_string());
            }
        }
        Ok(ids)
    }

    /// Atomically read-modify-write a player record. The closure may reject
    /// the update by returning an error, which aborts without writing.
    /// Lost CAS races are retried up to a small bound, then surfaced as
    /// `Conflict`.
    pub fn update_player<F>(&self, player_id: &str, mut apply: F) -> Result<PlayerRecord, GameError>
    where
        F: FnMut(&mut PlayerRecord) -> Result<(), GameError>,
    {
        let key = Self::player_key(player_id);
        for _ in 0..CAS_MAX_ATTEMPTS {
            let Some(old_bytes) = self.players.get(&key)? else {
                return Err(GameError::NotFound(format!("player: {}", player_id)));
            };
            let mut record: PlayerRecord = Self::deserialize(old_bytes.clone())?;
            if record.schema_version != PLAYER_SCHEMA_VERSION {
                return Err(GameError::SchemaMismatch {
                    entity: "player",
                    expected: PLAYER_SCHEMA_VERSION,
                    found: record.schema_version,
                });
            }
            apply(&mut record)?;
            let new_bytes = Self::serialize(&record)?;
            match self
                .players
                .compare_and_swap(&key, Some(old_bytes), Some(new_bytes))?
            {
                Ok(()) => {
                    self.players.flush()?;
                    return Ok(record);
                }
                Err(_) => continue,
            }
        }
        Err(GameError::Conflict(format!(
            "player update contended: {}",
            player_id
        )))
    }

    // ------------------------------------------------------------------
    // Dragons
    // ------------------------------------------------------------------

    pub fn put_dragon(&self, mut dragon: DragonRecord) -> Result<(), GameError> {
        dragon.schema_version = DRAGON_SCHEMA_VERSION;
        let key = Self::dragon_key(&dragon.player_id, &dragon.id);
        let bytes = Self::serialize(&dragon)?;
        self.dragons.insert(key, bytes)?;
        self.dragons.flush()?;
        Ok(())
    }

    pub fn get_dragon(&self, player_id: &str, dragon_id: &str) -> Result<DragonRecord, GameError> {
        let key = Self::dragon_key(player_id, dragon_id);
        let Some(bytes) = self.dragons.get(&key)? else {
            return Err(GameError::NotFound(format!("dragon: {}", dragon_id)));
        };
        let record: DragonRecord = Self::deserialize(bytes)?;
        if record.schema_version != DRAGON_SCHEMA_VERSION {
            return Err(GameError::SchemaMismatch {
                entity: "dragon",
                expected: DRAGON_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// All dragons owned by a player, in stable key order.
    pub fn list_dragons(&self, player_id: &str) -> Result<Vec<DragonRecord>, GameError> {
        let mut dragons = Vec::new();
        for entry in self.dragons.scan_prefix(Self::dragon_prefix(player_id)) {
            let (_, value) = entry?;
            dragons.push(Self::deserialize::<DragonRecord>(value)?);
        }
        Ok(dragons)
    }

    /// Conditionally replace a dragon record if it has not changed since
    /// `expected` was read. Returns `Ok(false)` when the swap lost a race so
    /// the caller can re-read and recompute.
    pub fn swap_dragon(
        &self,
        expected: &DragonRecord,
        replacement: &DragonRecord,
    ) -> Result<bool, GameError> {
        let key = Self::dragon_key(&expected.player_id, &expected.id);
        let old_bytes = Self::serialize(expected)?;
        let new_bytes = Self::serialize(replacement)?;
        match self
            .dragons
            .compare_and_swap(key, Some(old_bytes), Some(new_bytes))?
        {
            Ok(()) => {
                self.dragons.flush()?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    /// Atomically read-modify-write a dragon record. Same CAS contract as
    /// [`GameStore::update_player`]: the closure sees a fresh read on every
    /// attempt, so a competing write (e.g. a collection advancing
    /// `last_collection`) is never overwritten with stale state.
    pub fn update_dragon<F>(
        &self,
        player_id: &str,
        dragon_id: &str,
        mut apply: F,
    ) -> Result<DragonRecord, GameError>
    where
        F: FnMut(&mut DragonRecord) -> Result<(), GameError>,
    {
        for _ in 0..CAS_MAX_ATTEMPTS {
            let current = self.get_dragon(player_id, dragon_id)?;
            let mut replacement = current.clone();
            apply(&mut replacement)?;
            if self.swap_dragon(&current, &replacement)? {
                return Ok(replacement);
            }
        }
        Err(GameError::Conflict(format!(
            "dragon update contended: {}",
            dragon_id
        )))
    }

    /// Apply a merge as one logical transaction: remove both source dragons,
    /// insert the result, and append the audit record. A partial application
    /// is impossible; if either source vanished the whole merge aborts with
    /// `Conflict`.
    pub fn apply_merge(
        &self,
        source_a: &DragonRecord,
        source_b: &DragonRecord,
        result: &DragonRecord,
        record: &MergeRecord,
    ) -> Result<(), GameError> {
        let key_a = Self::dragon_key(&source_a.player_id, &source_a.id);
        let key_b = Self::dragon_key(&source_b.player_id, &source_b.id);
        let result_key = Self::dragon_key(&result.player_id, &result.id);
        let merge_key =
            format!("{}:{:020}", record.player_id, next_timestamp_nanos()).into_bytes();
        let result_bytes = Self::serialize(result)?;
        let record_bytes = Self::serialize(record)?;

        let outcome: Result<(), TransactionError<GameError>> = (&self.dragons, &self.merges)
            .transaction(|(dragons, merges)| {
                if dragons.get(&key_a)?.is_none() || dragons.get(&key_b)?.is_none() {
                    return Err(ConflictableTransactionError::Abort(GameError::Conflict(
                        "source dragon changed during merge".to_string(),
                    )));
                }
                dragons.remove(key_a.as_slice())?;
                dragons.remove(key_b.as_slice())?;
                dragons.insert(result_key.as_slice(), result_bytes.clone())?;
                merges.insert(merge_key.as_slice(), record_bytes.clone())?;
                Ok(())
            });

        match outcome {
            Ok(()) => {
                self.dragons.flush()?;
                self.merges.flush()?;
                Ok(())
            }
            Err(TransactionError::Abort(err)) => Err(err),
            Err(TransactionError::Storage(err)) => Err(GameError::Sled(err)),
        }
    }

    /// Merge history for a player, oldest first.
    pub fn list_merges(&self, player_id: &str) -> Result<Vec<MergeRecord>, GameError> {
        let prefix = format!("{}:", player_id);
        let mut records = Vec::new();
        for entry in self.merges.scan_prefix(prefix.as_bytes()) {
            let (_, value) = entry?;
            records.push(Self::deserialize::<MergeRecord>(value)?);
        }
        Ok(records)
    }

    // ------------------------------------------------------------------
    // Wallets
    // ------------------------------------------------------------------

    pub fn put_wallet(&self, mut wallet: WalletRecord) -> Result<(), GameError> {
        wallet.schema_version = WALLET_SCHEMA_VERSION;
        let key = Self::wallet_key(&wallet.player_id);
        let bytes = Self::serialize(&wallet)?;
        self.wallets.insert(key, bytes)?;
        self.wallets.flush()?;
        Ok(())
    }

    pub fn get_wallet(&self, player_id: &str) -> Result<WalletRecord, GameError> {
        let key = Self::wallet_key(player_id);
        let Some(bytes) = self.wallets.get(&key)? else {
            return Err(GameError::NotFound(format!("wallet: {}", player_id)));
        };
        let record: WalletRecord = Self::deserialize(bytes)?;
        if record.schema_version != WALLET_SCHEMA_VERSION {
            return Err(GameError::SchemaMismatch {
                entity: "wallet",
                expected: WALLET_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// Atomically read-modify-write a wallet. Same CAS contract as
    /// [`GameStore::update_player`].
    pub fn update_wallet<F>(&self, player_id: &str, mut apply: F) -> Result<WalletRecord, GameError>
    where
        F: FnMut(&mut WalletRecord) -> Result<(), GameError>,
    {
        let key = Self::wallet_key(player_id);
        for _ in 0..CAS_MAX_ATTEMPTS {
            let Some(old_bytes) = self.wallets.get(&key)? else {
                return Err(GameError::NotFound(format!("wallet: {}", player_id)));
            };
            let mut record: WalletRecord = Self::deserialize(old_bytes.clone())?;
            apply(&mut record)?;
            record.last_updated = Utc::now();
            let new_bytes = Self::serialize(&record)?;
            match self
                .wallets
                .compare_and_swap(&key, Some(old_bytes), Some(new_bytes))?
            {
                Ok(()) => {
                    self.wallets.flush()?;
                    return Ok(record);
                }
                Err(_) => continue,
            }
        }
        Err(GameError::Conflict(format!(
            "wallet update contended: {}",
            player_id
        )))
    }

    /// All wallets in stable key order. Leaderboards sort a snapshot of this.
    pub fn list_wallets(&self) -> Result<Vec<WalletRecord>, GameError> {
        let mut wallets = Vec::new();
        for entry in self.wallets.iter() {
            let (_, value) = entry?;
            wallets.push(Self::deserialize::<WalletRecord>(value)?);
        }
        Ok(wallets)
    }

    // ------------------------------------------------------------------
    // Purchase audit
    // ------------------------------------------------------------------

    pub fn append_purchase(&self, record: &PurchaseRecord) -> Result<(), GameError> {
        let key = format!("{}:{:020}", record.player_id, next_timestamp_nanos()).into_bytes();
        let bytes = Self::serialize(record)?;
        self.purchases.insert(key, bytes)?;
        self.purchases.flush()?;
        Ok(())
    }

    pub fn list_purchases(&self, player_id: &str) -> Result<Vec<PurchaseRecord>, GameError> {
        let prefix = format!("{}:", player_id);
        let mut records = Vec::new();
        for entry in self.purchases.scan_prefix(prefix.as_bytes()) {
            let (_, value) = entry?;
            records.push(Self::deserialize::<PurchaseRecord>(value)?);
        }
        Ok(records)
    }

    // ------------------------------------------------------------------
    // Template catalog (read-only at runtime; written by seeding)
    // ------------------------------------------------------------------

    pub fn put_quest_template(&self, template: QuestTemplate) -> Result<(), GameError> {
        let key = Self::quest_template_key(&template.id);
        let bytes = Self::serialize(&template)?;
        self.catalog.insert(key, bytes)?;
        self.catalog.flush()?;
        Ok(())
    }

    pub fn get_quest_template(&self, quest_id: &str) -> Result<QuestTemplate, GameError> {
        let key = Self::quest_template_key(quest_id);
        let Some(bytes) = self.catalog.get(&key)? else {
            return Err(GameError::NotFound(format!("quest template: {}", quest_id)));
        };
        Self::deserialize(bytes)
    }

    /// All quest templates, optionally filtered by class.
    pub fn list_quest_templates(
        &self,
        class: Option<QuestClass>,
    ) -> Result<Vec<QuestTemplate>, GameError> {
        let mut templates = Vec::new();
        for entry in self.catalog.scan_prefix(b"quests:") {
            let (_, value) = entry?;
            let template: QuestTemplate = Self::deserialize(value)?;
            if class.is_none() || class == Some(template.class) {
                templates.push(template);
            }
        }
        Ok(templates)
    }

    pub fn put_skin(&self, skin: SkinRecord) -> Result<(), GameError> {
        let key = Self::skin_key(&skin.id);
        let bytes = Self::serialize(&skin)?;
        self.catalog.insert(key, bytes)?;
        self.catalog.flush()?;
        Ok(())
    }

    pub fn get_skin(&self, skin_id: &str) -> Result<SkinRecord, GameError> {
        let key = Self::skin_key(skin_id);
        let Some(bytes) = self.catalog.get(&key)? else {
            return Err(GameError::NotFound(format!("skin: {}", skin_id)));
        };
        Self::deserialize(bytes)
    }

    pub fn put_shop_item(&self, item: ShopItemRecord) -> Result<(), GameError> {
        let key = Self::shop_item_key(&item.id);
        let bytes = Self::serialize(&item)?;
        self.catalog.insert(key, bytes)?;
        self.catalog.flush()?;
        Ok(())
    }

    pub fn get_shop_item(&self, item_id: &str) -> Result<ShopItemRecord, GameError> {
        let key = Self::shop_item_key(item_id);
        let Some(bytes) = self.catalog.get(&key)? else {
            return Err(GameError::NotFound(format!("shop item: {}", item_id)));
        };
        Self::deserialize(bytes)
    }

    pub fn list_shop_items(&self) -> Result<Vec<ShopItemRecord>, GameError> {
        let mut items = Vec::new();
        for entry in self.catalog.scan_prefix(b"shop:") {
            let (_, value) = entry?;
            items.push(Self::deserialize::<ShopItemRecord>(value)?);
        }
        Ok(items)
    }
}
