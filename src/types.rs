//! Shared types for both agents.
//!
//! Wire types mirror the Manifold JSON payloads (camelCase, lenient
//! defaults); domain types such as [`MarketQuote`] are built from them and
//! never leave the process.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Outcome and probability convention
// ---------------------------------------------------------------------------

/// Side of a binary market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Yes,
    No,
}

impl Outcome {
    /// Parse the wire outcome. Anything other than `YES`/`NO` (multi-choice
    /// answer ids, missing values) is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "YES" => Some(Outcome::Yes),
            "NO" => Some(Outcome::No),
            _ => None,
        }
    }

    /// The opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Outcome::Yes => Outcome::No,
            Outcome::No => Outcome::Yes,
        }
    }

    /// Convert an order's limit probability (expressed in this outcome's
    /// terms) to the canonical YES-side price.
    ///
    /// A NO order at `p` is an offer to sell YES at `1 - p`.
    pub fn yes_price(&self, limit_prob: f64) -> f64 {
        match self {
            Outcome::Yes => limit_prob,
            Outcome::No => 1.0 - limit_prob,
        }
    }

    /// Inverse of [`Outcome::yes_price`]: the limit probability to submit
    /// for an order on this outcome that should rest at `yes_price`.
    pub fn limit_prob_from_yes_price(&self, yes_price: f64) -> f64 {
        match self {
            Outcome::Yes => yes_price,
            Outcome::No => 1.0 - yes_price,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Yes => write!(f, "YES"),
            Outcome::No => write!(f, "NO"),
        }
    }
}

/// Convert a Manifold timestamp (ms since epoch) to `DateTime<Utc>`.
pub fn ms_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}

// ---------------------------------------------------------------------------
// Markets
// ---------------------------------------------------------------------------

/// Manifold `LiteMarket`, as returned by `GET /markets`.
/// Only the fields the scanner needs are deserialized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub question: String,
    /// "BINARY", "MULTIPLE_CHOICE", ...
    #[serde(default)]
    pub outcome_type: String,
    #[serde(default)]
    pub is_resolved: bool,
    #[serde(default)]
    pub is_closed: bool,
    /// Close timestamp (ms since epoch).
    #[serde(default)]
    pub close_time: Option<i64>,
    /// Created timestamp (ms since epoch). Doubles as the pagination cursor.
    #[serde(default)]
    pub created_time: Option<i64>,
    /// Lifetime volume in mana.
    #[serde(default)]
    pub volume: f64,
}

impl Market {
    pub fn is_binary(&self) -> bool {
        self.outcome_type == "BINARY"
    }

    /// Closed either explicitly or because its close time has passed.
    pub fn is_closed_at(&self, now: DateTime<Utc>) -> bool {
        self.is_closed || self.close_time.is_some_and(|ms| ms <= now.timestamp_millis())
    }

    /// The contract id, if present and non-empty.
    pub fn contract_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Best YES bid/ask for one binary market, recomputed every scan.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketQuote {
    pub contract_id: String,
    pub question: String,
    pub yes_bid: f64,
    pub yes_ask: f64,
    pub volume: f64,
}

impl MarketQuote {
    pub fn spread(&self) -> f64 {
        self.yes_ask - self.yes_bid
    }

    pub fn mid(&self) -> f64 {
        (self.yes_bid + self.yes_ask) / 2.0
    }
}

impl fmt::Display for MarketQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (bid: {:.3} | ask: {:.3} | spread: {:.3} | vol: {:.0}) {}",
            self.contract_id,
            self.yes_bid,
            self.yes_ask,
            self.spread(),
            self.volume,
            self.question,
        )
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// A bet as returned by `GET /bets`. Limit orders carry `limitProb`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrder {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub contract_id: String,
    /// Raw wire outcome; see [`OpenOrder::outcome`].
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub limit_prob: Option<f64>,
    #[serde(default)]
    pub is_cancelled: bool,
    #[serde(default)]
    pub is_filled: Option<bool>,
    #[serde(default)]
    pub amount: f64,
}

impl OpenOrder {
    pub fn outcome(&self) -> Option<Outcome> {
        Outcome::parse(&self.outcome)
    }

    /// Resting limit order: not cancelled, not filled, has a limit.
    pub fn is_open(&self) -> bool {
        !self.is_cancelled && self.is_filled != Some(true) && self.limit_prob.is_some()
    }
}

/// Body of `POST /bet`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub contract_id: String,
    pub outcome: Outcome,
    pub amount: f64,
    pub limit_prob: f64,
}

impl fmt::Display for OrderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} M{:.2} @ {:.3}",
            self.contract_id, self.outcome, self.amount, self.limit_prob,
        )
    }
}

/// Acknowledgement for a submitted (or simulated) order.
#[derive(Debug, Clone)]
pub struct OrderReceipt {
    pub order_id: String,
    pub request: OrderRequest,
    pub simulated: bool,
    pub timestamp: DateTime<Utc>,
}

impl OrderReceipt {
    /// Receipt for an order that was never sent.
    pub fn dry_run(request: OrderRequest) -> Self {
        Self {
            order_id: format!("dry-run-{}", uuid::Uuid::new_v4()),
            request,
            simulated: true,
            timestamp: Utc::now(),
        }
    }
}

/// Authenticated user, from `GET /me`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub balance: Option<f64>,
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// A comment as returned by `GET /comments`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub contract_id: String,
    /// Plain text, present on older comments.
    #[serde(default)]
    pub text: Option<String>,
    /// Rich-text (TipTap) document.
    #[serde(default)]
    pub content: Option<serde_json::Value>,
    #[serde(default)]
    pub created_time: i64,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_username: Option<String>,
}

impl Comment {
    /// The comment as plain text: `text` if present, otherwise the
    /// flattened `content` document.
    pub fn plain_text(&self) -> String {
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            return text.to_string();
        }
        let mut out = String::new();
        if let Some(doc) = &self.content {
            flatten_rich_text(doc, &mut out);
        }
        out.trim().to_string()
    }

    pub fn mentions(&self, tag: &str) -> bool {
        self.plain_text().contains(tag)
    }
}

fn flatten_rich_text(node: &serde_json::Value, out: &mut String) {
    if let Some(text) = node.get("text").and_then(|t| t.as_str()) {
        out.push_str(text);
    }
    // Mentions store the handle in attrs rather than text.
    if node.get("type").and_then(|t| t.as_str()) == Some("mention") {
        if let Some(label) = node
            .get("attrs")
            .and_then(|a| a.get("label"))
            .and_then(|l| l.as_str())
        {
            out.push('@');
            out.push_str(label);
        }
    }
    if let Some(children) = node.get("content").and_then(|c| c.as_array()) {
        for child in children {
            flatten_rich_text(child, out);
        }
        if node.get("type").and_then(|t| t.as_str()) == Some("paragraph") {
            out.push('\n');
        }
    }
}

/// Body of `POST /comment` for a threaded reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentReply {
    pub contract_id: String,
    pub markdown: String,
    pub reply_to_comment_id: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
