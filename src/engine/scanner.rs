//! Market scanner.
//!
//! Pages through the newest markets, keeps open binary contracts whose
//! resting limit orders form a quote with a wide enough YES spread, and
//! ranks the survivors widest-spread first.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

use crate::error::Result;
use crate::platforms::MarketSource;
use crate::strategy::quotes::extract_best_quotes;
use crate::types::{Market, MarketQuote};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Markets requested per page.
    pub page_size: u32,
    /// Stop once this many candidates are collected.
    pub max_candidates: usize,
    /// Bets requested per market.
    pub bets_per_market: u32,
    /// Minimum `ask - bid` to keep a market.
    pub min_spread: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            page_size: 200,
            max_candidates: 100,
            bets_per_market: 200,
            min_spread: 0.02,
        }
    }
}

// ---------------------------------------------------------------------------
// Scan result
// ---------------------------------------------------------------------------

/// Why a market was dropped before becoming a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ResolvedOrClosed,
    NotBinary,
    MissingId,
    Duplicate,
    NoQuote,
    Crossed,
    NarrowSpread,
}

/// Everything one scan produced.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub pages: usize,
    pub markets_seen: usize,
    pub skipped: Vec<(String, SkipReason)>,
    /// Ranked: widest spread first, ties by volume.
    pub candidates: Vec<MarketQuote>,
}

impl ScanResult {
    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.iter().filter(|(_, r)| *r == reason).count()
    }
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pages={} seen={} candidates={} no_quote={} crossed={} narrow={}",
            self.pages,
            self.markets_seen,
            self.candidates.len(),
            self.skipped_for(SkipReason::NoQuote),
            self.skipped_for(SkipReason::Crossed),
            self.skipped_for(SkipReason::NarrowSpread),
        )
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

pub struct MarketScanner {
    config: ScanConfig,
}

impl MarketScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Static eligibility, checked before any order book is fetched.
    fn precheck(market: &Market, now: DateTime<Utc>) -> std::result::Result<&str, SkipReason> {
        if market.is_resolved || market.is_closed_at(now) {
            return Err(SkipReason::ResolvedOrClosed);
        }
        if !market.is_binary() {
            return Err(SkipReason::NotBinary);
        }
        market.contract_id().ok_or(SkipReason::MissingId)
    }

    /// Quote a market from its book, or say why it is not a candidate.
    fn quote_from_book(
        &self,
        market: &Market,
        contract_id: &str,
        book: Option<(f64, f64)>,
    ) -> std::result::Result<MarketQuote, SkipReason> {
        let (yes_bid, yes_ask) = book.ok_or(SkipReason::NoQuote)?;
        if yes_ask <= yes_bid {
            return Err(SkipReason::Crossed);
        }
        if yes_ask - yes_bid < self.config.min_spread {
            return Err(SkipReason::NarrowSpread);
        }
        Ok(MarketQuote {
            contract_id: contract_id.to_string(),
            question: market.question.clone(),
            yes_bid,
            yes_ask,
            volume: market.volume.max(0.0),
        })
    }

    /// Run one full scan.
    ///
    /// Any fetch error aborts the scan; partial results are discarded.
    pub async fn scan(&self, source: &dyn MarketSource, now: DateTime<Utc>) -> Result<ScanResult> {
        let mut result = ScanResult::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut before: Option<i64> = None;

        'pages: while result.candidates.len() < self.config.max_candidates {
            let page = source.fetch_markets(self.config.page_size, before).await?;
            result.pages += 1;
            if page.is_empty() {
                break;
            }

            for market in &page {
                result.markets_seen += 1;

                let contract_id = match Self::precheck(market, now) {
                    Ok(id) => id,
                    Err(reason) => {
                        let id = market.id.clone().unwrap_or_default();
                        result.skipped.push((id, reason));
                        continue;
                    }
                };
                if !seen.insert(contract_id.to_string()) {
                    result.skipped.push((contract_id.to_string(), SkipReason::Duplicate));
                    continue;
                }

                let orders = source
                    .fetch_orders(contract_id, self.config.bets_per_market)
                    .await?;
                match self.quote_from_book(market, contract_id, extract_best_quotes(&orders)) {
                    Ok(quote) => {
                        debug!(quote = %quote, "Spread candidate");
                        result.candidates.push(quote);
                        if result.candidates.len() >= self.config.max_candidates {
                            break 'pages;
                        }
                    }
                    Err(reason) => result.skipped.push((contract_id.to_string(), reason)),
                }
            }

            // The cursor must move strictly backwards or paging would loop.
            let next = page.last().and_then(|m| m.created_time);
            match (next, before) {
                (None, _) => break,
                (Some(n), Some(b)) if n >= b => break,
                (Some(n), _) => before = Some(n),
            }
        }

        rank_candidates(&mut result.candidates);

        info!(
            pages = result.pages,
            seen = result.markets_seen,
            candidates = result.candidates.len(),
            "Market scan complete"
        );

        Ok(result)
    }
}

/// Sort descending by `(spread, volume)`.
pub fn rank_candidates(candidates: &mut [MarketQuote]) {
    candidates.sort_by(|a, b| {
        b.spread()
            .total_cmp(&a.spread())
            .then_with(|| b.volume.total_cmp(&a.volume))
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
