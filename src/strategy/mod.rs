//! Quote extraction, Kelly sizing, and two-sided order planning.

pub mod kelly;
pub mod quotes;

use tracing::debug;

use crate::types::{MarketQuote, OrderRequest, Outcome};
use kelly::{clamp, KellyCalculator, SizedLeg};

/// Limit prices never rest outside this band.
pub const MIN_PRICE: f64 = 0.01;
pub const MAX_PRICE: f64 = 0.99;

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// One side of a two-sided quote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegPlan {
    pub outcome: Outcome,
    /// Price paid for this outcome, in the outcome's own terms.
    pub price: f64,
    /// Probability the outcome is worth (mid for YES, `1 - mid` for NO).
    pub true_prob: f64,
    pub sized: SizedLeg,
}

impl LegPlan {
    /// Where this leg rests on the YES axis.
    pub fn yes_price(&self) -> f64 {
        self.outcome.yes_price(self.price)
    }

    /// Wire order for this leg; the limit goes through the same convention
    /// the quote extractor reads back.
    pub fn to_request(&self, contract_id: &str) -> OrderRequest {
        OrderRequest {
            contract_id: contract_id.to_string(),
            outcome: self.outcome,
            amount: self.sized.amount,
            limit_prob: self.outcome.limit_prob_from_yes_price(self.yes_price()),
        }
    }
}

/// Both legs for one market, before the "any edge?" decision.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotePlan {
    pub mid: f64,
    pub yes: LegPlan,
    pub no: LegPlan,
}

impl QuotePlan {
    /// Legs with a positive Kelly fraction, YES first.
    pub fn active_legs(&self) -> impl Iterator<Item = &LegPlan> {
        [&self.yes, &self.no].into_iter().filter(|leg| leg.sized.has_edge())
    }

    pub fn has_edge(&self) -> bool {
        self.yes.sized.has_edge() || self.no.sized.has_edge()
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// Straddles the mid of a quote by a fixed tick and sizes both legs.
pub struct QuotePlanner {
    tick: f64,
    kelly: KellyCalculator,
}

impl QuotePlanner {
    pub fn new(tick: f64, kelly: KellyCalculator) -> Self {
        Self { tick, kelly }
    }

    pub fn kelly(&self) -> &KellyCalculator {
        &self.kelly
    }

    /// Price and size both legs for a quote.
    ///
    /// `yes_price = clamp(mid + tick)`, `no_price = clamp(1 - mid + tick)`;
    /// the YES leg assumes the outcome is worth `mid`, the NO leg `1 - mid`.
    pub fn plan(&self, quote: &MarketQuote) -> QuotePlan {
        let mid = quote.mid();
        let yes_price = clamp(mid + self.tick, MIN_PRICE, MAX_PRICE);
        let no_price = clamp(1.0 - mid + self.tick, MIN_PRICE, MAX_PRICE);

        let yes = LegPlan {
            outcome: Outcome::Yes,
            price: yes_price,
            true_prob: mid,
            sized: self.kelly.size_leg(mid, yes_price),
        };
        let no = LegPlan {
            outcome: Outcome::No,
            price: no_price,
            true_prob: 1.0 - mid,
            sized: self.kelly.size_leg(1.0 - mid, no_price),
        };

        debug!(
            contract_id = %quote.contract_id,
            mid = format!("{:.4}", mid),
            yes_price = format!("{:.4}", yes_price),
            no_price = format!("{:.4}", no_price),
            yes_fraction = yes.sized.fraction,
            no_fraction = no.sized.fraction,
            "Quote planned"
        );

        QuotePlan { mid, yes, no }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
