//! Platform integrations.
//!
//! The engines talk to the market through two narrow traits so cycles can
//! be exercised against in-memory fakes:
//! - [`MarketSource`]: markets, resting orders, balance, order submission
//! - [`CommentSource`]: recent comments and threaded replies
//!
//! [`manifold::ManifoldClient`] implements both over the Manifold REST API.

pub mod manifold;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Comment, CommentReply, Market, OpenOrder, OrderReceipt, OrderRequest};

/// Read markets and their books; submit limit orders.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// One page of markets, newest first, created strictly before `before`
    /// (ms since epoch) when given.
    async fn fetch_markets(&self, limit: u32, before: Option<i64>) -> Result<Vec<Market>>;

    /// Recent bets on one contract; limit orders among them form the book.
    async fn fetch_orders(&self, contract_id: &str, limit: u32) -> Result<Vec<OpenOrder>>;

    /// Mana balance of the authenticated account.
    async fn fetch_balance(&self) -> Result<f64>;

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderReceipt>;
}

/// Which comments to watch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentFilter {
    pub contract_id: Option<String>,
    pub user_id: Option<String>,
}

/// Read recent comments; post threaded replies.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentSource: Send + Sync {
    async fn fetch_comments(&self, filter: &CommentFilter, limit: u32) -> Result<Vec<Comment>>;

    /// Post a reply; returns the new comment's id when the platform reports
    /// one.
    async fn post_reply(&self, reply: &CommentReply) -> Result<Option<String>>;
}
