//! Best YES bid/ask from a market's resting limit orders.

use crate::types::{OpenOrder, Outcome};

/// Derive `(best_yes_bid, best_yes_ask)` from a market's orders.
///
/// YES orders bid for YES at their limit; NO orders, converted through
/// [`Outcome::yes_price`], offer YES. Returns `None` when either side of
/// the book is empty. A crossed book is returned unchanged.
pub fn extract_best_quotes<'a, I>(orders: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = &'a OpenOrder>,
{
    let mut best_bid: Option<f64> = None;
    let mut best_ask: Option<f64> = None;

    for order in orders {
        if !order.is_open() {
            continue;
        }
        let (Some(outcome), Some(limit_prob)) = (order.outcome(), order.limit_prob) else {
            continue;
        };
        if !limit_prob.is_finite() {
            continue;
        }
        let price = outcome.yes_price(limit_prob);
        match outcome {
            Outcome::Yes => best_bid = Some(best_bid.map_or(price, |b| b.max(price))),
            Outcome::No => best_ask = Some(best_ask.map_or(price, |a| a.min(price))),
        }
    }

    Some((best_bid?, best_ask?))
}
