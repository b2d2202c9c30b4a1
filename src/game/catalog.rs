//! Catalog seed loaders for data-driven content.
//!
//! Quest templates, skins, and shop dragons live in JSON files under
//! data/seeds/, so content can change without recompiling. Loaders validate
//! the seed shape; [`seed_catalog`] writes everything into the store.

use std::fs;
use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::game::errors::GameError;
use crate::game::store::GameStore;
use crate::game::types::{
    QuestClass, QuestDifficulty, QuestObjective, QuestReward, QuestTemplate, ShopItemRecord,
    SkinRecord, CATALOG_SCHEMA_VERSION, MAX_DRAGON_TIER,
};

/// Counts of catalog records written by [`seed_catalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedSummary {
    pub quests: usize,
    pub skins: usize,
    pub shop_items: usize,
}

/// Load quest templates from a JSON seed file.
pub fn load_quest_templates_from_json<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<QuestTemplate>, GameError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let seeds: Vec<QuestSeed> = parse_seed_file(path, &contents)?;

    let mut templates = Vec::with_capacity(seeds.len());
    for seed in seeds {
        if seed.objective.target == 0 {
            return Err(GameError::Validation(format!(
                "quest {}: objective target must be at least 1",
                seed.id
            )));
        }
        templates.push(QuestTemplate {
            id: seed.id,
            class: seed.class,
            title: seed.title,
            description: seed.description,
            objective: seed.objective,
            reward: seed.reward,
            difficulty: seed.difficulty,
            schema_version: CATALOG_SCHEMA_VERSION,
        });
    }
    Ok(templates)
}

/// Load dragon skins from a JSON seed file.
pub fn load_skins_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<SkinRecord>, GameError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let seeds: Vec<SkinSeed> = parse_seed_file(path, &contents)?;
    Ok(seeds
        .into_iter()
        .map(|seed| SkinRecord {
            id: seed.id,
            name: seed.name,
            description: seed.description,
            price: seed.price,
            schema_version: CATALOG_SCHEMA_VERSION,
        })
        .collect())
}

/// Load purchasable shop dragons from a JSON seed file.
pub fn load_shop_items_from_json<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<ShopItemRecord>, GameError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let seeds: Vec<ShopItemSeed> = parse_seed_file(path, &contents)?;

    let mut items = Vec::with_capacity(seeds.len());
    for seed in seeds {
        if seed.tier == 0 || seed.tier > MAX_DRAGON_TIER {
            return Err(GameError::Validation(format!(
                "shop item {}: tier {} out of range",
                seed.id, seed.tier
            )));
        }
        items.push(ShopItemRecord {
            id: seed.id,
            name: seed.name,
            tier: seed.tier,
            price: seed.price,
            schema_version: CATALOG_SCHEMA_VERSION,
        });
    }
    Ok(items)
}

/// Load every seed file under `dir` (quests.json, skins.json, shop.json) and
/// write the records into the catalog. Missing files are skipped so a
/// deployment can ship a partial catalog.
pub fn seed_catalog<P: AsRef<Path>>(store: &GameStore, dir: P) -> Result<SeedSummary, GameError> {
    let dir = dir.as_ref();
    let mut summary = SeedSummary::default();

    let quests_path = dir.join("quests.json");
    if quests_path.exists() {
        for template in load_quest_templates_from_json(&quests_path)? {
            store.put_quest_template(template)?;
            summary.quests += 1;
        }
    }

    let skins_path = dir.join("skins.json");
    if skins_path.exists() {
        for skin in load_skins_from_json(&skins_path)? {
            store.put_skin(skin)?;
            summary.skins += 1;
        }
    }

    let shop_path = dir.join("shop.json");
    if shop_path.exists() {
        for item in load_shop_items_from_json(&shop_path)? {
            store.put_shop_item(item)?;
            summary.shop_items += 1;
        }
    }

    info!(
        "seeded catalog from {}: {} quests, {} skins, {} shop items",
        dir.display(),
        summary.quests,
        summary.skins,
        summary.shop_items
    );
    Ok(summary)
}

fn parse_seed_file<T: serde::de::DeserializeOwned>(
    path: &Path,
    contents: &str,
) -> Result<T, GameError> {
    serde_json::from_str(contents).map_err(|e| {
        GameError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("failed to parse {}: {}", path.display(), e),
        ))
    })
}

// Seed structures matching the JSON file shapes.

#[derive(Debug, Deserialize)]
struct QuestSeed {
    id: String,
    class: QuestClass,
    title: String,
    description: String,
    objective: QuestObjective,
    reward: QuestReward,
    #[serde(default)]
    difficulty: QuestDifficulty,
}

#[derive(Debug, Deserialize)]
struct SkinSeed {
    id: String,
    name: String,
    description: String,
    price: u64,
}

#[derive(Debug, Deserialize)]
struct ShopItemSeed {
    id: String,
    name: String,
    tier: u32,
    price: u64,
}
