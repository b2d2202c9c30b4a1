use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PLAYER_SCHEMA_VERSION: u8 = 1;
pub const DRAGON_SCHEMA_VERSION: u8 = 1;
pub const WALLET_SCHEMA_VERSION: u8 = 1;
pub const CATALOG_SCHEMA_VERSION: u8 = 1;

/// Historical ceiling on dragon tiers. Merging or leveling past this is
/// rejected with a validation error.
pub const MAX_DRAGON_TIER: u32 = 100;

/// Per-second rates of the starter dragon; also the base the level-up
/// multiplier is recomputed from.
pub const BASE_CRYSTAL_RATE: f64 = 0.1;
pub const BASE_TOKEN_RATE: f64 = 0.05;

/// Rate growth applied to the first input dragon's rates on merge.
pub const MERGE_RATE_MULTIPLIER: f64 = 1.2;

// ============================================================================
// Player
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerRecord {
    /// Stable external id (the presentation layer's account id).
    pub player_id: String,
    pub username: String,
    pub experience: u64,
    pub level: u32,
    pub login_streak: u32,
    pub last_login: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
    /// Cosmetic skin ids the player has purchased.
    #[serde(default)]
    pub owned_skins: Vec<String>,
    /// Live daily quest instances. All share one expiry timestamp.
    #[serde(default)]
    pub daily_quests: Vec<QuestInstance>,
    /// Live special quest instances (never expire).
    #[serde(default)]
    pub special_quests: Vec<QuestInstance>,
    /// Append-only record of claimed quests.
    #[serde(default)]
    pub quest_history: Vec<QuestHistoryEntry>,
    pub schema_version: u8,
}

impl PlayerRecord {
    pub fn new(player_id: &str, username: &str, now: DateTime<Utc>) -> Self {
        Self {
            player_id: player_id.to_string(),
            username: username.to_string(),
            experience: 0,
            level: 1,
            login_streak: 1,
            last_login: now,
            registered_at: now,
            owned_skins: Vec::new(),
            daily_quests: Vec::new(),
            special_quests: Vec::new(),
            quest_history: Vec::new(),
            schema_version: PLAYER_SCHEMA_VERSION,
        }
    }

    pub fn owns_skin(&self, skin_id: &str) -> bool {
        self.owned_skins.iter().any(|s| s == skin_id)
    }

    /// Iterate daily then special instances, mutably.
    pub fn quest_instances_mut(&mut self) -> impl Iterator<Item = &mut QuestInstance> {
        self.daily_quests
            .iter_mut()
            .chain(self.special_quests.iter_mut())
    }

    /// Iterate daily then special instances.
    pub fn quest_instances(&self) -> impl Iterator<Item = &QuestInstance> {
        self.daily_quests.iter().chain(self.special_quests.iter())
    }

    /// Locate a live instance by template id, daily set first.
    pub fn find_quest_mut(&mut self, quest_id: &str) -> Option<&mut QuestInstance> {
        if let Some(pos) = self.daily_quests.iter().position(|q| q.quest_id == quest_id) {
            return self.daily_quests.get_mut(pos);
        }
        self.special_quests
            .iter_mut()
            .find(|q| q.quest_id == quest_id)
    }
}

// ============================================================================
// Dragon
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DragonElement {
    Basic,
    Fire,
    Water,
    Earth,
    Air,
    Lightning,
    Ice,
    Shadow,
    Light,
}

impl DragonElement {
    /// Elements a shop-bought or freshly created dragon can roll.
    pub const ROLLABLE: [DragonElement; 4] = [
        DragonElement::Fire,
        DragonElement::Water,
        DragonElement::Earth,
        DragonElement::Air,
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DragonRecord {
    pub id: String,
    /// Owning player's id. Dragons are only ever mutated by their owner.
    pub player_id: String,
    pub name: String,
    pub tier: u32,
    pub element: DragonElement,
    /// Crystals generated per second.
    pub crystal_rate: f64,
    /// Tokens generated per second.
    pub token_rate: f64,
    /// Invariant: `last_collection <= now`. Accrual is computed from here.
    pub last_collection: DateTime<Utc>,
    pub active_skin: String,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl DragonRecord {
    pub fn new(
        player_id: &str,
        name: &str,
        tier: u32,
        element: DragonElement,
        crystal_rate: f64,
        token_rate: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            player_id: player_id.to_string(),
            name: name.to_string(),
            tier,
            element,
            crystal_rate,
            token_rate,
            last_collection: now,
            active_skin: "default".to_string(),
            created_at: now,
            schema_version: DRAGON_SCHEMA_VERSION,
        }
    }

    /// The starter dragon every player begins with.
    pub fn starter(player_id: &str, now: DateTime<Utc>) -> Self {
        Self::new(
            player_id,
            "Baby Dragon",
            1,
            DragonElement::Basic,
            BASE_CRYSTAL_RATE,
            BASE_TOKEN_RATE,
            now,
        )
    }
}

// ============================================================================
// Wallet
// ============================================================================

/// The two soft currencies plus the real-money-backed premium balance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    Crystals,
    Tokens,
    Premium,
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Crystals => write!(f, "crystals"),
            Currency::Tokens => write!(f, "tokens"),
            Currency::Premium => write!(f, "premium"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletRecord {
    pub player_id: String,
    pub crystals: u64,
    pub tokens: u64,
    pub premium: u64,
    pub last_updated: DateTime<Utc>,
    pub schema_version: u8,
}

impl WalletRecord {
    pub fn new(player_id: &str, crystals: u64, tokens: u64, now: DateTime<Utc>) -> Self {
        Self {
            player_id: player_id.to_string(),
            crystals,
            tokens,
            premium: 0,
            last_updated: now,
            schema_version: WALLET_SCHEMA_VERSION,
        }
    }

    pub fn balance(&self, currency: Currency) -> u64 {
        match currency {
            Currency::Crystals => self.crystals,
            Currency::Tokens => self.tokens,
            Currency::Premium => self.premium,
        }
    }
}

// ============================================================================
// Quest catalog (read-only templates)
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestClass {
    Daily,
    Special,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectiveType {
    Login,
    CollectCrystals,
    CollectTokens,
    TotalCrystals,
    TotalDragoncoin,
    UpgradeDragon,
    DragonLevelUp,
    ShareGame,
    AddToHomescreen,
    SubscribeChannels,
    /// Threshold-style: completes once a running friend count meets the
    /// target rather than being incremented.
    FriendCount,
}

impl ObjectiveType {
    pub fn is_threshold(&self) -> bool {
        matches!(self, ObjectiveType::FriendCount)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestDifficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for QuestDifficulty {
    fn default() -> Self {
        Self::Easy
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestObjective {
    #[serde(rename = "type")]
    pub objective_type: ObjectiveType,
    /// Always >= 1; validated when the catalog is loaded.
    pub target: u64,
}

/// Closed reward tuple. No open-ended metadata bag: the claim contract is
/// exactly these three amounts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestReward {
    #[serde(default)]
    pub crystals: u64,
    #[serde(default)]
    pub tokens: u64,
    #[serde(default)]
    pub experience: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestTemplate {
    pub id: String,
    pub class: QuestClass,
    pub title: String,
    pub description: String,
    pub objective: QuestObjective,
    pub reward: QuestReward,
    #[serde(default)]
    pub difficulty: QuestDifficulty,
    #[serde(default = "default_catalog_schema")]
    pub schema_version: u8,
}

fn default_catalog_schema() -> u8 {
    CATALOG_SCHEMA_VERSION
}

// ============================================================================
// Quest instances and history
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestInstance {
    pub quest_id: String,
    pub progress: u64,
    pub completed: bool,
    pub claimed: bool,
    /// Non-null only for daily instances. All of a player's daily instances
    /// share exactly one expiry value; reset is keyed off the first one.
    pub expires_at: Option<DateTime<Utc>>,
}

impl QuestInstance {
    pub fn fresh(quest_id: &str, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            quest_id: quest_id.to_string(),
            progress: 0,
            completed: false,
            claimed: false,
            expires_at,
        }
    }
}

/// Write-once record of a claimed quest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestHistoryEntry {
    pub quest_id: String,
    pub claimed_at: DateTime<Utc>,
    /// Snapshot of the reward at claim time; templates may change later.
    pub reward: QuestReward,
}

// ============================================================================
// Merge audit
// ============================================================================

/// Append-only audit record of a merge: both inputs, the result, and rate
/// snapshots before/after.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeRecord {
    pub id: String,
    pub player_id: String,
    pub source_dragon_a: String,
    pub source_dragon_b: String,
    pub result_dragon: String,
    pub tier_before: u32,
    pub tier_after: u32,
    pub crystal_rate_a: f64,
    pub token_rate_a: f64,
    pub crystal_rate_b: f64,
    pub token_rate_b: f64,
    pub crystal_rate_result: f64,
    pub token_rate_result: f64,
    pub merged_at: DateTime<Utc>,
}

// ============================================================================
// Purchase audit
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseKind {
    Dragon,
    Skin,
    ShopItem,
    PremiumTopUp,
}

/// Append-only audit of a completed purchase or top-up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseRecord {
    pub id: String,
    pub player_id: String,
    pub kind: PurchaseKind,
    pub currency: Currency,
    pub amount: u64,
    pub item_id: String,
    /// Opaque reference code for support lookups.
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

impl PurchaseRecord {
    pub fn new(
        player_id: &str,
        kind: PurchaseKind,
        currency: Currency,
        amount: u64,
        item_id: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            player_id: player_id.to_string(),
            kind,
            currency,
            amount,
            item_id: item_id.to_string(),
            reference: generate_reference_code(),
            created_at: now,
        }
    }
}

/// Short human-quotable reference code, e.g. `TX-9F3A2C`.
pub fn generate_reference_code() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("TX-{}", raw[..6].to_ascii_uppercase())
}

// ============================================================================
// Cosmetic and shop catalogs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkinRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Premium-currency price.
    pub price: u64,
    #[serde(default = "default_catalog_schema")]
    pub schema_version: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShopItemRecord {
    pub id: String,
    pub name: String,
    /// Tier of the dragon this entry sells.
    pub tier: u32,
    /// Crystal price.
    pub price: u64,
    #[serde(default = "default_catalog_schema")]
    pub schema_version: u8,
}
