//! Binary entrypoint for the Dragonkeep CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml`
//! - `seed` - load catalog seeds (quests, skins, shop) into the database
//! - `register <player> [--name <display>]` - create a player with the starter dragon
//! - `status <player>` - print a player's dragons, wallet, and quest summary
//! - `collect <player>` - realize pending accrual for one player
//! - `login <player>` - record a login (streak + quest progress)
//! - `shop` - list the seeded shop catalog
//! - `buy <player> <item>` - purchase a dragon through a shop catalog entry
//! - `top [--metric crystals|tokens] [--limit N]` - print a leaderboard
//! - `tick` - run the housekeeping loop (batch collection and daily resets)
use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::{info, warn};

use dragonkeep::config::Config;
use dragonkeep::game::{self, GameError, GameStore, GameStoreBuilder, Metric};

#[derive(Parser)]
#[command(name = "dragonkeep")]
#[command(about = "Idle dragon economy and quest progression engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter configuration file
    Init,
    /// Load catalog seed files into the database
    Seed,
    /// Register a new player with the starter dragon and wallet
    Register {
        player: String,
        /// Display name; defaults to the player id
        #[arg(long)]
        name: Option<String>,
    },
    /// Show a player's dragons, wallet, and quest summary
    Status { player: String },
    /// Collect pending resources across all of a player's dragons
    Collect { player: String },
    /// Record a login for streak and quest progress
    Login { player: String },
    /// List the seeded shop catalog
    Shop,
    /// Purchase a dragon through a shop catalog entry
    Buy { player: String, item: String },
    /// Print a leaderboard
    Top {
        #[arg(long, default_value = "crystals")]
        metric: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Run the housekeeping loop: periodic batch collection and daily resets
    Tick,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Init => {
            Config::create_default(&cli.config).await?;
            println!("Wrote starter configuration to {}", cli.config);
            Ok(())
        }
        Commands::Seed => {
            let config = require_config(config, &cli.config)?;
            let store = open_store(&config)?;
            let summary = game::seed_catalog(&store, &config.storage.seeds_dir)?;
            println!(
                "Seeded {} quests, {} skins, {} shop items",
                summary.quests, summary.skins, summary.shop_items
            );
            Ok(())
        }
        Commands::Register { player, name } => {
            let config = require_config(config, &cli.config)?;
            let store = open_store(&config)?;
            let now = Utc::now();
            let display = name.unwrap_or_else(|| player.clone());
            let starter = game::initialize_player(&store, &player, &display, now)?;
            game::initialize_quests(&store, &player, now)?;
            println!(
                "Registered {} with starter dragon {} (tier {})",
                player, starter.name, starter.tier
            );
            Ok(())
        }
        Commands::Status { player } => {
            let config = require_config(config, &cli.config)?;
            let store = open_store(&config)?;
            print_status(&store, &player)
        }
        Commands::Collect { player } => {
            let config = require_config(config, &cli.config)?;
            let store = open_store(&config)?;
            let summary = with_conflict_retry(|| game::collect_all(&store, &player, Utc::now()))?;
            let completed =
                game::handle_resource_collection(&store, &player, summary.crystals, summary.tokens)?;
            println!(
                "Collected {} crystals, {} tokens from {} dragons",
                summary.crystals, summary.tokens, summary.dragon_count
            );
            for quest in completed {
                println!("Quest completed: {}", quest.template.title);
            }
            Ok(())
        }
        Commands::Login { player } => {
            let config = require_config(config, &cli.config)?;
            let store = open_store(&config)?;
            let now = Utc::now();
            game::check_and_reset_daily(&store, &player, now)?;
            let summary = game::handle_login(&store, &player, now)?;
            println!(
                "Login recorded for {}: streak {} ({})",
                player,
                summary.streak,
                if summary.new_day { "new day" } else { "same day" }
            );
            for quest in summary.completed_unclaimed {
                println!("Reward waiting: {}", quest.template.title);
            }
            Ok(())
        }
        Commands::Shop => {
            let config = require_config(config, &cli.config)?;
            let store = open_store(&config)?;
            for item in store.list_shop_items()? {
                println!(
                    "{:<24} {:<20} tier {:>3} {:>6} crystals",
                    item.id, item.name, item.tier, item.price
                );
            }
            Ok(())
        }
        Commands::Buy { player, item } => {
            let config = require_config(config, &cli.config)?;
            let store = open_store(&config)?;
            let dragon = game::purchase_from_shop(&store, &player, &item, Utc::now())?;
            let wallet = store.get_wallet(&player)?;
            println!(
                "Bought {} (tier {}, {:?}); {} crystals remaining",
                dragon.name, dragon.tier, dragon.element, wallet.crystals
            );
            Ok(())
        }
        Commands::Top { metric, limit } => {
            let config = require_config(config, &cli.config)?;
            let store = open_store(&config)?;
            let metric = match metric.as_str() {
                "crystals" => Metric::Crystals,
                "tokens" => Metric::Tokens,
                other => return Err(anyhow!("unknown metric: {}", other)),
            };
            for entry in game::leaderboard(&store, metric, limit)? {
                println!("{:>3}. {:<20} {}", entry.rank, entry.username, entry.balance);
            }
            Ok(())
        }
        Commands::Tick => {
            let config = require_config(config, &cli.config)?;
            let store = open_store(&config)?;
            run_tick_loop(&store, config.server.tick_interval_secs).await
        }
    }
}

fn require_config(config: Option<Config>, path: &str) -> Result<Config> {
    config.ok_or_else(|| anyhow!("no configuration at {}; run `dragonkeep init` first", path))
}

/// Retry an engine operation once when it loses a concurrency race. Anything
/// other than a `Conflict` surfaces immediately.
fn with_conflict_retry<T>(
    mut op: impl FnMut() -> Result<T, GameError>,
) -> Result<T, GameError> {
    match op() {
        Err(e) if e.is_retryable() => {
            warn!("retrying after conflict: {}", e);
            op()
        }
        other => other,
    }
}

fn open_store(config: &Config) -> Result<GameStore> {
    let path = std::path::Path::new(&config.storage.data_dir).join("game");
    Ok(GameStoreBuilder::new(path).open()?)
}

fn print_status(store: &GameStore, player: &str) -> Result<()> {
    let now = Utc::now();
    let dragons = game::get_dragons(store, player)?;
    let wallet = store.get_wallet(player)?;
    let rates = game::generation_rates(store, player)?;
    let stats = game::quest_stats(store, player)?;

    println!("Player: {}", player);
    println!(
        "Wallet: {} crystals, {} tokens, {} premium",
        wallet.crystals, wallet.tokens, wallet.premium
    );
    println!(
        "Generation: {:.2} crystals/min, {:.2} tokens/min",
        rates.crystals_per_minute, rates.tokens_per_minute
    );
    println!("Dragons ({}):", dragons.len());
    for dragon in &dragons {
        let pending = game::accrued(dragon, now);
        println!(
            "  {} (tier {}, {:?}) pending {:.1} crystals",
            dragon.name, dragon.tier, dragon.element, pending.crystals
        );
    }
    println!(
        "Quests: {}/{} completed, {} claimed ({}% completion)",
        stats.completed, stats.total, stats.claimed, stats.completion_rate
    );
    if let Some(countdown) = game::time_until_reset(store, player, now)? {
        println!("Daily reset in {}", countdown.formatted);
    }
    Ok(())
}

/// Housekeeping loop: every tick, reset expired daily quest sets and run a
/// batch collection for every player so wallet totals stay fresh for
/// leaderboards. Accrual itself is computed on demand, so a missed tick
/// never loses resources.
async fn run_tick_loop(store: &GameStore, interval_secs: u64) -> Result<()> {
    info!("housekeeping loop started ({}s interval)", interval_secs);
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
    loop {
        interval.tick().await;
        let now = Utc::now();
        let players = store.list_player_ids()?;
        for player in &players {
            if let Err(e) = game::check_and_reset_daily(store, player, now) {
                warn!("daily reset failed for {}: {}", player, e);
            }
            match with_conflict_retry(|| game::collect_all(store, player, now)) {
                Ok(summary) if summary.crystals > 0 || summary.tokens > 0 => {
                    if let Err(e) = game::handle_resource_collection(
                        store,
                        player,
                        summary.crystals,
                        summary.tokens,
                    ) {
                        warn!("quest progress failed for {}: {}", player, e);
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("collection failed for {}: {}", player, e),
            }
        }
        info!("tick complete: {} players processed", players.len());
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    let level = match verbosity {
        0 => config
            .as_ref()
            .map(|c| c.logging.level.as_str())
            .unwrap_or("info")
            .parse()
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(level);
    let _ = builder.try_init();
}
