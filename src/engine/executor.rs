//! Order placement.
//!
//! Walks ranked candidates, enforces the per-market cooldown, prices and
//! sizes both legs, and submits the legs with positive Kelly fraction
//! (or simulates them in dry-run). The market's last-order time is
//! recorded whenever at least one leg goes out, so a market is never
//! re-quoted inside its cooldown window.

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::platforms::MarketSource;
use crate::storage::SpreadState;
use crate::strategy::{QuotePlan, QuotePlanner};
use crate::types::{MarketQuote, OrderReceipt};

// ---------------------------------------------------------------------------
// Execution result
// ---------------------------------------------------------------------------

/// What happened to one candidate.
#[derive(Debug, Clone)]
pub enum Decision {
    /// Ordered too recently.
    Cooldown { remaining_secs: f64 },
    /// Neither leg had a positive Kelly fraction after the tick.
    NoEdge { plan: QuotePlan },
    /// At least one leg submitted (or simulated).
    Placed { receipts: Vec<OrderReceipt> },
}

/// Result of executing a ranked batch.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub cooldown_skips: usize,
    pub no_edge_skips: usize,
    pub markets_ordered: usize,
    pub receipts: Vec<OrderReceipt>,
    pub total_committed: f64,
}

impl ExecutionReport {
    pub fn legs_submitted(&self) -> usize {
        self.receipts.iter().filter(|r| !r.simulated).count()
    }

    pub fn legs_simulated(&self) -> usize {
        self.receipts.iter().filter(|r| r.simulated).count()
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct Executor {
    planner: QuotePlanner,
    cooldown_secs: f64,
    dry_run: bool,
}

impl Executor {
    pub fn new(planner: QuotePlanner, cooldown_secs: f64, dry_run: bool) -> Self {
        Self {
            planner,
            cooldown_secs,
            dry_run,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn cooldown_secs(&self) -> f64 {
        self.cooldown_secs
    }

    /// Handle one candidate at time `now` (Unix seconds).
    ///
    /// If a submission fails after an earlier leg went out, the market is
    /// still stamped before the error is returned.
    pub async fn process(
        &self,
        source: &dyn MarketSource,
        quote: &MarketQuote,
        state: &mut SpreadState,
        now: f64,
    ) -> Result<Decision> {
        if state.in_cooldown(&quote.contract_id, now, self.cooldown_secs) {
            let elapsed = state
                .seconds_since_order(&quote.contract_id, now)
                .unwrap_or(self.cooldown_secs);
            let remaining_secs = self.cooldown_secs - elapsed;
            debug!(contract_id = %quote.contract_id, remaining_secs, "Cooldown active");
            return Ok(Decision::Cooldown { remaining_secs });
        }

        let plan = self.planner.plan(quote);
        if !plan.has_edge() {
            debug!(contract_id = %quote.contract_id, spread = quote.spread(), "No edge after tick");
            return Ok(Decision::NoEdge { plan });
        }

        info!(
            contract_id = %quote.contract_id,
            spread = format!("{:.3}", quote.spread()),
            yes_price = format!("{:.3}", plan.yes.price),
            yes_amount = format!("M{:.2}", plan.yes.sized.amount),
            no_price = format!("{:.3}", plan.no.price),
            no_amount = format!("M{:.2}", plan.no.sized.amount),
            dry_run = self.dry_run,
            "Placing orders"
        );

        let mut receipts = Vec::new();
        for leg in plan.active_legs() {
            let request = leg.to_request(&quote.contract_id);
            if self.dry_run {
                info!(order = %request, "[DRY RUN] Would place order");
                receipts.push(OrderReceipt::dry_run(request));
                continue;
            }
            match source.place_order(&request).await {
                Ok(receipt) => receipts.push(receipt),
                Err(e) => {
                    if !receipts.is_empty() {
                        state.record_order(&quote.contract_id, now);
                    }
                    warn!(order = %request, error = %e, "Order submission failed");
                    return Err(e);
                }
            }
        }

        state.record_order(&quote.contract_id, now);
        Ok(Decision::Placed { receipts })
    }

    /// Process ranked candidates strictly in order. The first submission
    /// error abandons the rest of the batch.
    pub async fn execute_batch(
        &self,
        source: &dyn MarketSource,
        quotes: &[MarketQuote],
        state: &mut SpreadState,
        now: f64,
    ) -> Result<ExecutionReport> {
        let mut report = ExecutionReport::default();

        for quote in quotes {
            match self.process(source, quote, state, now).await? {
                Decision::Cooldown { .. } => report.cooldown_skips += 1,
                Decision::NoEdge { .. } => report.no_edge_skips += 1,
                Decision::Placed { receipts } => {
                    report.markets_ordered += 1;
                    report.total_committed += receipts.iter().map(|r| r.request.amount).sum::<f64>();
                    report.receipts.extend(receipts);
                }
            }
        }

        if !quotes.is_empty() {
            info!(
                candidates = quotes.len(),
                ordered = report.markets_ordered,
                cooldown = report.cooldown_skips,
                no_edge = report.no_edge_skips,
                committed = format!("M{:.2}", report.total_committed),
                "Batch execution complete"
            );
        }

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
