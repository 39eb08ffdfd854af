//! Polling agents and the loop that drives them.
//!
//! Each bot is a [`PollingAgent`]: one `run_cycle` per tick, then
//! `persist`. The loop never exits on a recoverable error; it logs it,
//! flushes state and sleeps until the next tick or Ctrl-C.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::executor::{ExecutionReport, Executor};
use super::responder::{ReplyReport, Responder};
use super::scanner::{MarketScanner, ScanResult};
use crate::error::{AgentError, Recovery, Result};
use crate::llm::CompletionBackend;
use crate::platforms::{CommentSource, MarketSource};
use crate::storage::{ReplyState, SpreadState, StateStore};

/// A bot driven by [`run_loop`].
#[async_trait]
pub trait PollingAgent: Send {
    type Report: fmt::Display + Send;

    fn name(&self) -> &'static str;

    /// One full pass. Errors abandon the rest of the pass.
    async fn run_cycle(&mut self) -> Result<Self::Report>;

    /// Write in-memory state to durable storage.
    fn persist(&mut self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Spread agent
// ---------------------------------------------------------------------------

/// Summary of one spread cycle.
#[derive(Debug, Clone)]
pub struct SpreadCycleReport {
    pub cycle: u64,
    pub scan: ScanResult,
    pub execution: ExecutionReport,
}

impl fmt::Display for SpreadCycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycle={} {} ordered={} legs={} simulated={} cooldown={} no_edge={} committed=M{:.2}",
            self.cycle,
            self.scan,
            self.execution.markets_ordered,
            self.execution.legs_submitted(),
            self.execution.legs_simulated(),
            self.execution.cooldown_skips,
            self.execution.no_edge_skips,
            self.execution.total_committed,
        )
    }
}

pub struct SpreadAgent {
    source: Arc<dyn MarketSource>,
    scanner: MarketScanner,
    executor: Executor,
    store: Box<dyn StateStore<SpreadState>>,
    state: SpreadState,
    /// Cooldown entries older than this are dropped on persist.
    retention_secs: Option<f64>,
    cycles: u64,
}

impl SpreadAgent {
    /// Builds the agent and restores its state from `store`.
    pub fn new(
        source: Arc<dyn MarketSource>,
        scanner: MarketScanner,
        executor: Executor,
        store: Box<dyn StateStore<SpreadState>>,
    ) -> Self {
        let state = store.load();
        info!(markets_tracked = state.last_order_times.len(), "Spread state restored");
        Self {
            source,
            scanner,
            executor,
            store,
            state,
            retention_secs: None,
            cycles: 0,
        }
    }

    /// Enable pruning. Never prunes inside the cooldown window.
    pub fn with_retention(mut self, retention_secs: f64) -> Self {
        if retention_secs > 0.0 {
            self.retention_secs = Some(retention_secs.max(self.executor.cooldown_secs()));
        }
        self
    }

    pub fn state(&self) -> &SpreadState {
        &self.state
    }

    /// Run a cycle against an explicit clock.
    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> Result<SpreadCycleReport> {
        self.cycles += 1;
        let now_secs = now.timestamp_millis() as f64 / 1000.0;
        debug!(cycle = self.cycles, "Starting spread cycle");

        let scan = self.scanner.scan(self.source.as_ref(), now).await?;
        let execution = self
            .executor
            .execute_batch(self.source.as_ref(), &scan.candidates, &mut self.state, now_secs)
            .await?;

        Ok(SpreadCycleReport {
            cycle: self.cycles,
            scan,
            execution,
        })
    }
}

#[async_trait]
impl PollingAgent for SpreadAgent {
    type Report = SpreadCycleReport;

    fn name(&self) -> &'static str {
        "spread"
    }

    async fn run_cycle(&mut self) -> Result<SpreadCycleReport> {
        self.run_cycle_at(Utc::now()).await
    }

    fn persist(&mut self) -> Result<()> {
        if let Some(max_age) = self.retention_secs {
            let now = Utc::now().timestamp_millis() as f64 / 1000.0;
            let pruned = self.state.prune_older_than(now, max_age);
            if pruned > 0 {
                debug!(pruned, "Pruned stale cooldown entries");
            }
        }
        self.store.save(&self.state)
    }
}

// ---------------------------------------------------------------------------
// Reply agent
// ---------------------------------------------------------------------------

pub struct ReplyAgent {
    comments: Arc<dyn CommentSource>,
    llm: Arc<dyn CompletionBackend>,
    responder: Responder,
    store: Box<dyn StateStore<ReplyState>>,
    state: ReplyState,
}

impl ReplyAgent {
    pub fn new(
        comments: Arc<dyn CommentSource>,
        llm: Arc<dyn CompletionBackend>,
        responder: Responder,
        store: Box<dyn StateStore<ReplyState>>,
    ) -> Self {
        let state = store.load();
        info!(processed = state.processed_comment_ids.len(), "Reply state restored");
        Self {
            comments,
            llm,
            responder,
            store,
            state,
        }
    }

    pub fn state(&self) -> &ReplyState {
        &self.state
    }
}

#[async_trait]
impl PollingAgent for ReplyAgent {
    type Report = ReplyReport;

    fn name(&self) -> &'static str {
        "reply"
    }

    async fn run_cycle(&mut self) -> Result<ReplyReport> {
        self.responder
            .run_once(
                self.comments.as_ref(),
                self.llm.as_ref(),
                &mut self.state,
                self.store.as_ref(),
            )
            .await
    }

    fn persist(&mut self) -> Result<()> {
        self.store.save(&self.state)
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Drive `agent` until Ctrl-C, a fatal error, or after one cycle if `once`.
///
/// State is persisted after every cycle, failed ones included. Returns the
/// number of cycles run.
pub async fn run_loop<A: PollingAgent>(agent: &mut A, interval: Duration, once: bool) -> Result<u64> {
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let name = agent.name();
    let mut cycles = 0u64;

    info!(agent = name, interval_secs = interval.as_secs(), once, "Entering main loop. Press Ctrl+C to stop.");

    loop {
        cycles += 1;
        let fatal = match agent.run_cycle().await {
            Ok(report) => {
                info!(agent = name, %report, "Cycle complete");
                None
            }
            Err(e) => {
                log_cycle_error(name, &e);
                (e.recovery() == Recovery::Fatal).then_some(e)
            }
        };

        if let Err(e) = agent.persist() {
            error!(agent = name, error = %e, "Failed to save state");
        }

        if let Some(e) = fatal {
            return Err(e);
        }
        if once {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = &mut shutdown => {
                info!(agent = name, "Shutdown signal received.");
                break;
            }
        }
    }

    info!(agent = name, cycles, "Shut down cleanly.");
    Ok(cycles)
}

fn log_cycle_error(agent: &str, err: &AgentError) {
    match err {
        AgentError::Transport {
            endpoint,
            status,
            body,
        } => warn!(agent, %endpoint, status = *status, %body, "Upstream rejected request, cycle abandoned"),
        e if e.is_upstream() => warn!(agent, error = %e, "Upstream failure, cycle abandoned"),
        e => error!(agent, error = %e, "Cycle failed"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
