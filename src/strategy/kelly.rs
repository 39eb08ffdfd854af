//! Kelly criterion position sizing.
//!
//! Full-Kelly stake fraction for a binary contract paying 1 at cost
//! `price`, converted to a mana amount and clamped to the configured
//! trade bounds.

use tracing::debug;

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Kelly stake fraction for buying at `price` with true win probability
/// `true_prob`.
///
/// `f* = (p - price) / (1 - price)`, zero when there is no positive edge
/// or the price is degenerate, capped at the full bankroll.
pub fn kelly_fraction(true_prob: f64, price: f64) -> f64 {
    if price <= 0.0 || price >= 1.0 {
        return 0.0;
    }
    let edge = true_prob - price;
    if edge <= 0.0 {
        return 0.0;
    }
    (edge / (1.0 - price)).min(1.0)
}

/// `max(lo, min(value, hi))`.
pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    lo.max(value.min(hi))
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Sizing configuration.
#[derive(Debug, Clone)]
pub struct KellyConfig {
    /// Mana available for sizing.
    pub bankroll: f64,
    /// Smallest stake worth placing.
    pub min_trade: f64,
    /// Largest stake per leg.
    pub max_trade: f64,
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            bankroll: 0.0,
            min_trade: 1.0,
            max_trade: 50.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Kelly calculator
// ---------------------------------------------------------------------------

/// One sized leg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizedLeg {
    /// Raw Kelly fraction in `[0, 1]`.
    pub fraction: f64,
    /// `fraction × bankroll` clamped to `[min_trade, max_trade]`.
    pub amount: f64,
}

impl SizedLeg {
    pub fn has_edge(&self) -> bool {
        self.fraction > 0.0
    }
}

pub struct KellyCalculator {
    config: KellyConfig,
}

impl KellyCalculator {
    pub fn new(config: KellyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KellyConfig {
        &self.config
    }

    /// Size a leg bought at `price` believing the outcome has probability
    /// `true_prob`.
    ///
    /// The amount is clamped even when the fraction is zero; callers must
    /// check [`SizedLeg::has_edge`] before submitting anything.
    pub fn size_leg(&self, true_prob: f64, price: f64) -> SizedLeg {
        let fraction = kelly_fraction(true_prob, price);
        let amount = clamp(
            fraction * self.config.bankroll,
            self.config.min_trade,
            self.config.max_trade,
        );

        debug!(
            true_prob = format!("{:.4}", true_prob),
            price = format!("{:.4}", price),
            kelly = format!("{:.2}%", fraction * 100.0),
            amount = format!("M{:.2}", amount),
            "Leg sized"
        );

        SizedLeg { fraction, amount }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
