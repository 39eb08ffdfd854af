//! Mock platform for integration testing.
//!
//! One in-memory object plays Manifold (markets, books, comments) and the
//! completion backend. Everything it receives is recorded so tests can
//! assert on exactly what went over the "wire".

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use uuid::Uuid;

use manifold_bots::error::{AgentError, Result};
use manifold_bots::llm::CompletionBackend;
use manifold_bots::platforms::{CommentFilter, CommentSource, MarketSource};
use manifold_bots::types::*;

#[derive(Default)]
pub struct MockPlatform {
    markets: Vec<Market>,
    books: HashMap<String, Vec<OpenOrder>>,
    comments: Mutex<Vec<Comment>>,
    completions: Mutex<VecDeque<Result<String>>>,
    balance: f64,

    pub orders: Mutex<Vec<OrderRequest>>,
    pub replies: Mutex<Vec<CommentReply>>,
    pub prompts: Mutex<Vec<(String, String)>>,
    pub market_pages: Mutex<Vec<Option<i64>>>,
    /// If set, order submission fails with this status.
    reject_orders: Mutex<Option<u16>>,
}

impl MockPlatform {
    pub fn new(balance: f64) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }

    /// Add an open binary market whose book holds `yes_limit` (a YES bid)
    /// and `no_limit` (a NO order at that limitProb).
    pub fn with_market(mut self, id: &str, created_ms: i64, yes_limit: f64, no_limit: f64) -> Self {
        self.markets.push(Market {
            id: Some(id.to_string()),
            question: format!("Will {id} happen?"),
            outcome_type: "BINARY".to_string(),
            created_time: Some(created_ms),
            volume: 100.0,
            ..Default::default()
        });
        self.books.insert(
            id.to_string(),
            vec![limit_order(id, "YES", yes_limit), limit_order(id, "NO", no_limit)],
        );
        self
    }

    pub fn with_comment(self, comment: Comment) -> Self {
        self.comments.lock().unwrap().push(comment);
        self
    }

    pub fn queue_completion(&self, answer: Result<String>) {
        self.completions.lock().unwrap().push_back(answer);
    }

    pub fn reject_orders(&self, status: u16) {
        *self.reject_orders.lock().unwrap() = Some(status);
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    pub fn reply_count(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

pub fn limit_order(contract_id: &str, outcome: &str, limit_prob: f64) -> OpenOrder {
    OpenOrder {
        id: Some(Uuid::new_v4().to_string()),
        contract_id: contract_id.to_string(),
        outcome: outcome.to_string(),
        limit_prob: Some(limit_prob),
        is_filled: Some(false),
        amount: 10.0,
        ..Default::default()
    }
}

pub fn comment(id: &str, text: &str, created_ms: i64) -> Comment {
    Comment {
        id: id.to_string(),
        contract_id: "market-1".to_string(),
        text: Some(text.to_string()),
        created_time: created_ms,
        user_id: Some("user-1".to_string()),
        user_username: Some("alice".to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl MarketSource for MockPlatform {
    async fn fetch_markets(&self, limit: u32, before: Option<i64>) -> Result<Vec<Market>> {
        self.market_pages.lock().unwrap().push(before);
        let mut page: Vec<Market> = self
            .markets
            .iter()
            .filter(|m| match (before, m.created_time) {
                (Some(b), Some(t)) => t < b,
                _ => true,
            })
            .cloned()
            .collect();
        page.sort_by(|a, b| b.created_time.cmp(&a.created_time));
        page.truncate(limit as usize);
        Ok(page)
    }

    async fn fetch_orders(&self, contract_id: &str, limit: u32) -> Result<Vec<OpenOrder>> {
        let mut book = self.books.get(contract_id).cloned().unwrap_or_default();
        book.truncate(limit as usize);
        Ok(book)
    }

    async fn fetch_balance(&self) -> Result<f64> {
        Ok(self.balance)
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderReceipt> {
        if let Some(status) = *self.reject_orders.lock().unwrap() {
            return Err(AgentError::Transport {
                endpoint: "POST /bet".to_string(),
                status,
                body: "rejected".to_string(),
            });
        }
        self.orders.lock().unwrap().push(order.clone());
        Ok(OrderReceipt {
            order_id: Uuid::new_v4().to_string(),
            request: order.clone(),
            simulated: false,
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
impl CommentSource for MockPlatform {
    async fn fetch_comments(&self, filter: &CommentFilter, limit: u32) -> Result<Vec<Comment>> {
        let comments = self.comments.lock().unwrap();
        Ok(comments
            .iter()
            .filter(|c| filter.contract_id.as_deref().map_or(true, |id| c.contract_id == id))
            .filter(|c| filter.user_id.is_none() || c.user_id == filter.user_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn post_reply(&self, reply: &CommentReply) -> Result<Option<String>> {
        self.replies.lock().unwrap().push(reply.clone());
        Ok(Some(format!("reply-{}", reply.reply_to_comment_id)))
    }
}

#[async_trait]
impl CompletionBackend for MockPlatform {
    async fn complete(&self, system: &str, user_message: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), user_message.to_string()));
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("Tremendous question.".to_string()))
    }

    fn model_name(&self) -> String {
        "mock-model".to_string()
    }
}
