//! Manifold Markets REST integration.
//!
//! API docs: https://docs.manifold.markets/api
//! Base URL: https://api.manifold.markets/v0/
//! Auth: `Authorization: Key {key}` on every request.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{CommentFilter, CommentSource, MarketSource};
use crate::config::ManifoldConfig;
use crate::error::{AgentError, Result};
use crate::types::{
    ms_to_datetime, Comment, CommentReply, Market, OpenOrder, OrderReceipt, OrderRequest,
    UserProfile,
};

const PLATFORM_NAME: &str = "manifold";
const USER_AGENT: &str = "manifold-bots/0.1.0";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

/// Response from `POST /bet`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BetResponse {
    #[serde(default)]
    bet_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    created_time: Option<i64>,
}

/// Response from `POST /comment`.
#[derive(Debug, Deserialize)]
struct CreatedComment {
    #[serde(default)]
    id: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Manifold Markets platform client.
pub struct ManifoldClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
}

impl ManifoldClient {
    pub fn new(config: &ManifoldConfig, api_key: SecretString) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Platform name for logging.
    pub fn name(&self) -> &str {
        PLATFORM_NAME
    }

    /// The authenticated user.
    pub async fn me(&self) -> Result<UserProfile> {
        self.request_json::<UserProfile, ()>(Method::GET, "/me", &[], None).await
    }

    /// Send one JSON request and decode the JSON answer.
    ///
    /// Non-2xx answers become [`AgentError::Transport`] carrying the status
    /// and body; undecodable bodies become [`AgentError::MalformedResponse`].
    async fn request_json<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let endpoint = format!("{method} {path}");
        let url = format!("{}{path}", self.base_url);

        debug!(endpoint = %endpoint, query = ?query, "Manifold request");

        let mut req = self
            .http
            .request(method, &url)
            .header("Authorization", format!("Key {}", self.api_key.expose_secret()))
            .header("Accept", "application/json");
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(AgentError::Transport {
                endpoint,
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| AgentError::malformed(endpoint, e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl MarketSource for ManifoldClient {
    async fn fetch_markets(&self, limit: u32, before: Option<i64>) -> Result<Vec<Market>> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(before) = before {
            query.push(("before", before.to_string()));
        }
        self.request_json::<Vec<Market>, ()>(Method::GET, "/markets", &query, None)
            .await
    }

    async fn fetch_orders(&self, contract_id: &str, limit: u32) -> Result<Vec<OpenOrder>> {
        let query = [
            ("contractId", contract_id.to_string()),
            ("limit", limit.to_string()),
        ];
        self.request_json::<Vec<OpenOrder>, ()>(Method::GET, "/bets", &query, None)
            .await
    }

    async fn fetch_balance(&self) -> Result<f64> {
        self.me()
            .await?
            .balance
            .ok_or_else(|| AgentError::malformed("GET /me", "profile has no balance"))
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderReceipt> {
        let bet: BetResponse = self
            .request_json(Method::POST, "/bet", &[], Some(order))
            .await?;

        let order_id = bet
            .bet_id
            .or(bet.id)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let timestamp = bet.created_time.map(ms_to_datetime).unwrap_or_else(Utc::now);

        info!(
            order_id = %order_id,
            contract_id = %order.contract_id,
            outcome = %order.outcome,
            amount = order.amount,
            limit_prob = order.limit_prob,
            "Manifold limit order placed"
        );

        Ok(OrderReceipt {
            order_id,
            request: order.clone(),
            simulated: false,
            timestamp,
        })
    }
}

#[async_trait]
impl CommentSource for ManifoldClient {
    async fn fetch_comments(&self, filter: &CommentFilter, limit: u32) -> Result<Vec<Comment>> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(contract_id) = &filter.contract_id {
            query.push(("contractId", contract_id.clone()));
        }
        if let Some(user_id) = &filter.user_id {
            query.push(("userId", user_id.clone()));
        }
        self.request_json::<Vec<Comment>, ()>(Method::GET, "/comments", &query, None)
            .await
    }

    async fn post_reply(&self, reply: &CommentReply) -> Result<Option<String>> {
        let created: CreatedComment = self
            .request_json(Method::POST, "/comment", &[], Some(reply))
            .await?;
        Ok(created.id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
