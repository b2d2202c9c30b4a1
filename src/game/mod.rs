//! Dragon economy data model and game services.
//! Covers the persistent records (players, dragons, wallets, catalog), the
//! Sled-backed store, and the free-function services layered on top:
//! accrual, merging, quest progression, wallet ledger, and leaderboards.

pub mod accrual;
pub mod catalog;
pub mod dragons;
pub mod errors;
pub mod experience;
pub mod leaderboard;
pub mod quests;
pub mod store;
pub mod types;
pub mod wallet;

pub use accrual::{
    accrued, collect_all, collect_dragon, generation_rates, Accrued, CollectSummary,
    GenerationRates,
};
pub use catalog::{
    load_quest_templates_from_json, load_shop_items_from_json, load_skins_from_json, seed_catalog,
    SeedSummary,
};
pub use dragons::{
    apply_skin, create_dragon, get_dragons, initialize_player, level_up_dragon, merge_dragons,
    purchase_dragon, purchase_from_shop, purchase_skin, rename_dragon, MergeOutcome,
    STARTING_CRYSTALS, STARTING_TOKENS,
};
pub use errors::GameError;
pub use experience::{grant_experience, level_for_experience, ExperienceGain};
pub use leaderboard::{leaderboard, rank, LeaderboardEntry, Metric, RankSummary};
pub use quests::{
    advance, check_and_reset_daily, claim, get_active_quests, get_completed_unclaimed,
    get_daily_quests, get_special_quests, handle_login, handle_resource_collection,
    initialize_quests, quest_stats, record_friend_count, time_until_reset, ClaimOutcome,
    LoginSummary, QuestSetSummary, QuestStats, QuestView, ResetCountdown,
};
pub use store::{GameStore, GameStoreBuilder};
pub use types::*;
