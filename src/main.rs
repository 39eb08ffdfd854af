//! manifold-bots
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the selected agent with its persisted state, and runs its
//! polling loop until Ctrl-C.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use manifold_bots::config::AppConfig;
use manifold_bots::engine::agent::{run_loop, ReplyAgent, SpreadAgent};
use manifold_bots::engine::executor::Executor;
use manifold_bots::engine::responder::{Responder, ResponderConfig};
use manifold_bots::engine::scanner::{MarketScanner, ScanConfig};
use manifold_bots::llm::openai::OpenAiClient;
use manifold_bots::llm::CompletionBackend;
use manifold_bots::platforms::manifold::ManifoldClient;
use manifold_bots::platforms::{CommentFilter, MarketSource};
use manifold_bots::storage::{JsonStateStore, ReplyState, SpreadState};
use manifold_bots::strategy::kelly::{KellyCalculator, KellyConfig};
use manifold_bots::strategy::QuotePlanner;

/// Manifold Markets bots.
#[derive(Parser, Debug)]
#[command(name = "manifold-bots")]
#[command(about = "Spread-closing limit-order bot and mention-reply bot for Manifold Markets")]
#[command(version)]
struct Cli {
    /// Path to the TOML config file (missing file means defaults).
    #[arg(short, long, default_value = "config.toml", env = "MANIFOLD_BOTS_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Quote both sides of wide binary markets.
    Spread {
        /// Log orders instead of submitting them.
        #[arg(long)]
        dry_run: bool,

        /// Run a single cycle and exit.
        #[arg(long)]
        once: bool,
    },

    /// Answer comments that mention the configured tag.
    Reply {
        /// Run a single cycle and exit.
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let mut cfg = AppConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    cfg.apply_env().context("applying environment overrides")?;
    if let Command::Spread { dry_run: true, .. } = cli.command {
        cfg.spread.dry_run = true;
    }
    cfg.validate().context("invalid configuration")?;

    init_logging();

    let api_key = AppConfig::resolve_secret(&cfg.manifold.api_key_env)?;
    let manifold = Arc::new(ManifoldClient::new(&cfg.manifold, api_key)?);
    info!(platform = manifold.name(), base_url = manifold.base_url(), "Manifold client ready");

    match cli.command {
        Command::Spread { once, .. } => run_spread(&cfg, manifold, once).await,
        Command::Reply { once } => run_reply(&cfg, manifold, once).await,
    }
}

async fn run_spread(cfg: &AppConfig, manifold: Arc<ManifoldClient>, once: bool) -> Result<()> {
    let s = &cfg.spread;

    let bankroll = if s.bankroll > 0.0 {
        s.bankroll
    } else {
        manifold
            .fetch_balance()
            .await
            .context("no bankroll configured and the account balance could not be read")?
    };

    info!(
        bankroll = format!("M{bankroll:.2}"),
        min_spread = s.min_spread,
        tick = s.spread_tick,
        min_trade = s.min_trade,
        max_trade = s.max_trade,
        cooldown_secs = s.cooldown_secs,
        dry_run = s.dry_run,
        state = %s.state_path.display(),
        "Spread bot starting up"
    );
    if s.dry_run {
        warn!("DRY RUN: orders are logged, not submitted");
    }

    let scanner = MarketScanner::new(ScanConfig {
        page_size: s.market_batch_limit,
        max_candidates: s.max_markets_per_loop,
        bets_per_market: s.bets_per_market,
        min_spread: s.min_spread,
    });
    let kelly = KellyCalculator::new(KellyConfig {
        bankroll,
        min_trade: s.min_trade,
        max_trade: s.max_trade,
    });
    let executor = Executor::new(
        QuotePlanner::new(s.spread_tick, kelly),
        s.cooldown_secs as f64,
        s.dry_run,
    );

    let mut agent = SpreadAgent::new(
        manifold,
        scanner,
        executor,
        Box::new(JsonStateStore::<SpreadState>::new(&s.state_path)),
    )
    .with_retention(s.retention_secs());

    run_loop(&mut agent, Duration::from_secs(s.poll_interval_secs), once).await?;
    Ok(())
}

async fn run_reply(cfg: &AppConfig, manifold: Arc<ManifoldClient>, once: bool) -> Result<()> {
    let r = &cfg.reply;

    let me = manifold.me().await.context("resolving the bot's own account")?;
    let llm_key = AppConfig::resolve_secret(&cfg.llm.api_key_env)?;
    let llm = Arc::new(OpenAiClient::new(&cfg.llm, llm_key)?);

    info!(
        user = %me.username,
        tag = %r.mention_tag,
        model = %llm.model_name(),
        contract_id = ?r.contract_id,
        user_filter = ?r.user_id,
        state = %r.state_path.display(),
        "Reply bot starting up"
    );

    let responder = Responder::new(ResponderConfig {
        mention_tag: r.mention_tag.clone(),
        system_prompt: r.system_prompt.clone(),
        batch_limit: r.comment_batch_limit,
        filter: CommentFilter {
            contract_id: r.contract_id.clone(),
            user_id: r.user_id.clone(),
        },
        own_user_id: Some(me.id).filter(|id| !id.is_empty()),
    });

    let mut agent = ReplyAgent::new(
        manifold,
        llm,
        responder,
        Box::new(JsonStateStore::<ReplyState>::new(&r.state_path)),
    );

    run_loop(&mut agent, Duration::from_secs(r.poll_interval_secs), once).await?;
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("manifold_bots=info"));

    let json_logging = std::env::var("MANIFOLD_BOTS_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
