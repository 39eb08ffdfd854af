//! Configuration loading from TOML with environment overrides.
//!
//! Reads `config.toml` (every field has a default, so the file and any of
//! its sections are optional) and then applies the flat environment
//! overrides the bots have always honoured (`MIN_SPREAD`, `DRY_RUN`, ...).
//! Secrets are referenced by env-var name and resolved at startup.

use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AgentError, Result};

const SECONDS_PER_DAY: u64 = 86_400;
/// A century; anything longer is a typo.
const MAX_RETENTION_DAYS: u64 = 36_500;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub manifold: ManifoldConfig,
    pub spread: SpreadConfig,
    pub reply: ReplyConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ManifoldConfig {
    pub base_url: String,
    /// Name of the env var holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for ManifoldConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.manifold.markets/v0".to_string(),
            api_key_env: "MANIFOLD_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SpreadConfig {
    pub state_path: PathBuf,
    pub poll_interval_secs: u64,
    /// Markets requested per page.
    pub market_batch_limit: u32,
    /// Candidate cap per cycle.
    pub max_markets_per_loop: usize,
    /// Bets requested per market when deriving quotes.
    pub bets_per_market: u32,
    pub min_spread: f64,
    /// Offset from mid for both legs. Negative values quote inside the mid.
    pub spread_tick: f64,
    /// Sizing bankroll; `0` means read the account balance at startup.
    pub bankroll: f64,
    pub min_trade: f64,
    pub max_trade: f64,
    pub cooldown_secs: u64,
    pub dry_run: bool,
    /// Prune cooldown entries older than this many days (`0` keeps all).
    pub state_retention_days: u64,
}

impl SpreadConfig {
    /// Retention window in seconds; `0` disables pruning.
    pub fn retention_secs(&self) -> f64 {
        self.state_retention_days.saturating_mul(SECONDS_PER_DAY) as f64
    }
}

impl Default for SpreadConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from(".manifold_spread_state.json"),
            poll_interval_secs: 60,
            market_batch_limit: 200,
            max_markets_per_loop: 100,
            bets_per_market: 200,
            min_spread: 0.02,
            spread_tick: 0.002,
            bankroll: 0.0,
            min_trade: 1.0,
            max_trade: 50.0,
            cooldown_secs: 600,
            dry_run: false,
            state_retention_days: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReplyConfig {
    pub state_path: PathBuf,
    pub poll_interval_secs: u64,
    pub comment_batch_limit: u32,
    pub mention_tag: String,
    /// Only watch this market's comments.
    pub contract_id: Option<String>,
    /// Only watch comments by this user.
    pub user_id: Option<String>,
    pub system_prompt: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from(".manifold_tag_state.json"),
            poll_interval_secs: 30,
            comment_batch_limit: 50,
            mention_tag: "@TrumpGPT".to_string(),
            contract_id: None,
            user_id: None,
            system_prompt: "You are a witty commenter on a prediction market site. \
                Reply to the user's comment in at most three sentences."
                .to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions endpoint.
    pub api_url: String,
    pub model: String,
    pub api_key_env: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: 300,
            timeout_secs: 120,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
            .map_err(|e| AgentError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| AgentError::Config(e.to_string()))
    }

    /// Apply the process environment on top of the file values.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (testable without touching
    /// the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MANIFOLD_BASE_URL") {
            self.manifold.base_url = v;
        }

        let s = &mut self.spread;
        if let Some(v) = lookup("STATE_PATH") {
            s.state_path = PathBuf::from(v);
        }
        override_parsed(&lookup, "POLL_INTERVAL_SECONDS", &mut s.poll_interval_secs)?;
        override_parsed(&lookup, "MARKET_BATCH_LIMIT", &mut s.market_batch_limit)?;
        override_parsed(&lookup, "MAX_MARKETS_PER_LOOP", &mut s.max_markets_per_loop)?;
        override_parsed(&lookup, "MIN_SPREAD", &mut s.min_spread)?;
        override_parsed(&lookup, "SPREAD_TICK", &mut s.spread_tick)?;
        override_parsed(&lookup, "BANKROLL", &mut s.bankroll)?;
        override_parsed(&lookup, "MIN_TRADE", &mut s.min_trade)?;
        override_parsed(&lookup, "MAX_TRADE", &mut s.max_trade)?;
        override_parsed(&lookup, "COOLDOWN_SECONDS", &mut s.cooldown_secs)?;
        if let Some(v) = lookup("DRY_RUN") {
            s.dry_run = parse_flag(&v);
        }

        let r = &mut self.reply;
        if let Some(v) = lookup("REPLY_STATE_PATH") {
            r.state_path = PathBuf::from(v);
        }
        override_parsed(&lookup, "REPLY_POLL_INTERVAL_SECONDS", &mut r.poll_interval_secs)?;
        override_parsed(&lookup, "COMMENT_BATCH_LIMIT", &mut r.comment_batch_limit)?;
        if let Some(v) = lookup("MENTION_TAG") {
            r.mention_tag = v;
        }

        if let Some(v) = lookup("LLM_MODEL") {
            self.llm.model = v;
        }
        Ok(())
    }

    /// Reject settings no cycle could run with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.spread;
        if s.min_trade <= 0.0 || s.min_trade > s.max_trade {
            return Err(AgentError::Config(format!(
                "trade bounds must satisfy 0 < min_trade <= max_trade (got {} / {})",
                s.min_trade, s.max_trade
            )));
        }
        if s.market_batch_limit == 0 || s.max_markets_per_loop == 0 || s.bets_per_market == 0 {
            return Err(AgentError::Config("page sizes must be positive".into()));
        }
        if !(0.0..1.0).contains(&s.min_spread) {
            return Err(AgentError::Config(format!("min_spread out of range: {}", s.min_spread)));
        }
        if s.spread_tick.abs() >= 0.5 {
            return Err(AgentError::Config(format!("spread_tick out of range: {}", s.spread_tick)));
        }
        if s.state_retention_days > MAX_RETENTION_DAYS {
            return Err(AgentError::Config(format!(
                "state_retention_days must be at most {MAX_RETENTION_DAYS} (got {})",
                s.state_retention_days
            )));
        }
        if s.bankroll < 0.0 {
            return Err(AgentError::Config("bankroll cannot be negative".into()));
        }
        if self.reply.mention_tag.trim().is_empty() {
            return Err(AgentError::Config("mention_tag cannot be empty".into()));
        }
        if self.reply.comment_batch_limit == 0 {
            return Err(AgentError::Config("comment_batch_limit must be positive".into()));
        }
        Ok(())
    }

    /// Resolve an environment variable name to a secret.
    pub fn resolve_secret(env_name: &str) -> Result<SecretString> {
        match std::env::var(env_name) {
            Ok(v) if !v.trim().is_empty() => Ok(SecretString::new(v)),
            _ => Err(AgentError::Config(format!("environment variable not set: {env_name}"))),
        }
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| AgentError::Config(format!("invalid {key}={raw:?}: {e}")))?;
    }
    Ok(())
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}
