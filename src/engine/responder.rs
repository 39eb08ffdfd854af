//! Mention responder.
//!
//! Reads the newest comments, answers the ones carrying the mention tag
//! with a completion, and records every handled comment id so nothing is
//! answered twice, across restarts included.

use std::fmt;
use tracing::{debug, info};

use crate::error::Result;
use crate::llm::CompletionBackend;
use crate::platforms::{CommentFilter, CommentSource};
use crate::storage::{ReplyState, StateStore};
use crate::types::{Comment, CommentReply};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ResponderConfig {
    pub mention_tag: String,
    pub system_prompt: String,
    pub batch_limit: u32,
    pub filter: CommentFilter,
    /// Comments by this user (the bot itself) are never answered.
    pub own_user_id: Option<String>,
}

/// Counts for one pass over a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyReport {
    pub fetched: usize,
    pub already_processed: usize,
    pub skipped_untagged: usize,
    pub skipped_own: usize,
    pub replied: usize,
}

impl fmt::Display for ReplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetched={} seen={} untagged={} own={} replied={}",
            self.fetched, self.already_processed, self.skipped_untagged, self.skipped_own, self.replied,
        )
    }
}

// ---------------------------------------------------------------------------
// Responder
// ---------------------------------------------------------------------------

pub struct Responder {
    config: ResponderConfig,
}

impl Responder {
    pub fn new(config: ResponderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResponderConfig {
        &self.config
    }

    /// The user turn sent to the completion backend.
    pub fn build_prompt(comment: &Comment) -> String {
        let text = comment.plain_text();
        match comment.user_username.as_deref() {
            Some(user) if !user.is_empty() => format!("Comment from @{user}:\n\n{text}"),
            _ => text,
        }
    }

    fn is_own(&self, comment: &Comment) -> bool {
        match (&self.config.own_user_id, &comment.user_id) {
            (Some(own), Some(author)) => own == author,
            _ => false,
        }
    }

    /// One pass: fetch, newest first, handle every unseen comment.
    ///
    /// State is saved after each handled comment. A failed completion or
    /// post aborts the pass and leaves that comment unprocessed.
    pub async fn run_once(
        &self,
        comments: &dyn CommentSource,
        llm: &dyn CompletionBackend,
        state: &mut ReplyState,
        store: &dyn StateStore<ReplyState>,
    ) -> Result<ReplyReport> {
        let mut batch = comments
            .fetch_comments(&self.config.filter, self.config.batch_limit)
            .await?;
        batch.sort_by(|a, b| b.created_time.cmp(&a.created_time));

        let mut report = ReplyReport {
            fetched: batch.len(),
            ..Default::default()
        };

        for comment in &batch {
            if state.is_processed(&comment.id) {
                report.already_processed += 1;
                continue;
            }

            if self.is_own(comment) {
                report.skipped_own += 1;
            } else if !comment.mentions(&self.config.mention_tag) {
                debug!(comment_id = %comment.id, "No mention, skipping");
                report.skipped_untagged += 1;
            } else {
                self.reply_to(comments, llm, comment).await?;
                report.replied += 1;
            }

            state.mark_processed(&comment.id);
            store.save(state)?;
        }

        Ok(report)
    }

    async fn reply_to(
        &self,
        comments: &dyn CommentSource,
        llm: &dyn CompletionBackend,
        comment: &Comment,
    ) -> Result<()> {
        let prompt = Self::build_prompt(comment);
        let text = llm.complete(&self.config.system_prompt, &prompt).await?;

        let reply = CommentReply {
            contract_id: comment.contract_id.clone(),
            markdown: text,
            reply_to_comment_id: comment.id.clone(),
        };
        let reply_id = comments.post_reply(&reply).await?;

        info!(
            comment_id = %comment.id,
            contract_id = %comment.contract_id,
            reply_id = reply_id.as_deref().unwrap_or("?"),
            model = %llm.model_name(),
            "Replied to mention"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
