//! Spread agent: scan → plan → order, across cycles and restarts.

use chrono::{Duration, Utc};
use std::sync::Arc;

use manifold_bots::engine::agent::{PollingAgent, SpreadAgent};
use manifold_bots::engine::executor::Executor;
use manifold_bots::engine::scanner::{MarketScanner, ScanConfig, SkipReason};
use manifold_bots::error::AgentError;
use manifold_bots::storage::{JsonStateStore, SpreadState, StateStore};
use manifold_bots::strategy::kelly::{KellyCalculator, KellyConfig};
use manifold_bots::strategy::QuotePlanner;
use manifold_bots::types::Outcome;

use crate::mock_platform::MockPlatform;

const T0: i64 = 1_700_000_000_000;

fn temp_state_path() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("manifold-bots-spread-{}.json", uuid::Uuid::new_v4()))
}

fn agent(
    platform: &Arc<MockPlatform>,
    page_size: u32,
    tick: f64,
    dry_run: bool,
    store: JsonStateStore<SpreadState>,
) -> SpreadAgent {
    let scanner = MarketScanner::new(ScanConfig {
        page_size,
        ..ScanConfig::default()
    });
    let kelly = KellyCalculator::new(KellyConfig {
        bankroll: 1000.0,
        min_trade: 1.0,
        max_trade: 50.0,
    });
    let executor = Executor::new(QuotePlanner::new(tick, kelly), 600.0, dry_run);
    SpreadAgent::new(platform.clone(), scanner, executor, Box::new(store))
}

#[tokio::test]
async fn test_crossed_book_excluded_and_positive_tick_places_nothing() {
    let platform = Arc::new(
        MockPlatform::new(1000.0)
            .with_market("crossed", T0, 0.60, 0.55)
            .with_market("wide", T0 - 1, 0.40, 0.50),
    );
    let path = temp_state_path();
    let mut spread = agent(&platform, 200, 0.002, false, JsonStateStore::new(&path));

    let report = spread.run_cycle().await.unwrap();

    assert_eq!(report.scan.candidates.len(), 1);
    assert_eq!(report.scan.candidates[0].contract_id, "wide");
    assert!((report.scan.candidates[0].spread() - 0.10).abs() < 1e-9);
    assert_eq!(report.scan.skipped_for(SkipReason::Crossed), 1);
    assert_eq!(report.execution.no_edge_skips, 1);
    assert_eq!(platform.order_count(), 0);
    assert!(spread.state().last_order_times.is_empty());
}

#[tokio::test]
async fn test_negative_tick_orders_widest_market_first() {
    let platform = Arc::new(
        MockPlatform::new(1000.0)
            .with_market("narrower", T0, 0.40, 0.50)
            .with_market("widest", T0 - 1, 0.30, 0.50),
    );
    let mut spread = agent(&platform, 200, -0.02, false, JsonStateStore::new(temp_state_path()));

    let report = spread.run_cycle().await.unwrap();

    assert_eq!(report.execution.markets_ordered, 2);
    let orders = platform.orders.lock().unwrap();
    assert_eq!(orders.len(), 4);
    assert_eq!(orders[0].contract_id, "widest");
    assert_eq!(orders[0].outcome, Outcome::Yes);
    assert_eq!(orders[1].contract_id, "widest");
    assert_eq!(orders[1].outcome, Outcome::No);
    assert_eq!(orders[2].contract_id, "narrower");
    for order in orders.iter() {
        assert!(order.amount >= 1.0 && order.amount <= 50.0);
        assert!(order.limit_prob >= 0.01 && order.limit_prob <= 0.99);
    }
}

#[tokio::test]
async fn test_cooldown_spans_cycles() {
    let platform = Arc::new(MockPlatform::new(1000.0).with_market("m", T0, 0.40, 0.50));
    let mut spread = agent(&platform, 200, -0.02, false, JsonStateStore::new(temp_state_path()));
    let start = Utc::now();

    spread.run_cycle_at(start).await.unwrap();
    assert_eq!(platform.order_count(), 2);

    let during = spread.run_cycle_at(start + Duration::seconds(300)).await.unwrap();
    assert_eq!(during.execution.cooldown_skips, 1);
    assert_eq!(platform.order_count(), 2);

    let after = spread.run_cycle_at(start + Duration::seconds(601)).await.unwrap();
    assert_eq!(after.execution.markets_ordered, 1);
    assert_eq!(platform.order_count(), 4);
}

#[tokio::test]
async fn test_dry_run_submits_nothing_but_stamps_state() {
    let platform = Arc::new(MockPlatform::new(1000.0).with_market("m", T0, 0.40, 0.50));
    let mut spread = agent(&platform, 200, -0.02, true, JsonStateStore::new(temp_state_path()));

    let report = spread.run_cycle().await.unwrap();

    assert_eq!(report.execution.legs_simulated(), 2);
    assert_eq!(platform.order_count(), 0);
    assert!(spread.state().last_order_times.contains_key("m"));
}

#[tokio::test]
async fn test_persisted_cooldown_survives_restart() {
    let platform = Arc::new(MockPlatform::new(1000.0).with_market("m", T0, 0.40, 0.50));
    let path = temp_state_path();
    let start = Utc::now();

    let mut first = agent(&platform, 200, -0.02, false, JsonStateStore::new(&path));
    first.run_cycle_at(start).await.unwrap();
    first.persist().unwrap();

    let on_disk = JsonStateStore::<SpreadState>::new(&path).read().unwrap().unwrap();
    let stamped = first.state().last_order_times["m"];
    assert!((on_disk.last_order_times["m"] - stamped).abs() < 1e-3);

    let mut restarted = agent(&platform, 200, -0.02, false, JsonStateStore::new(&path));
    let report = restarted
        .run_cycle_at(start + Duration::seconds(60))
        .await
        .unwrap();

    assert_eq!(report.execution.cooldown_skips, 1);
    assert_eq!(platform.order_count(), 2);

    JsonStateStore::<SpreadState>::new(&path).delete().unwrap();
}

#[tokio::test]
async fn test_rejected_order_abandons_cycle_without_stamp() {
    let platform = Arc::new(MockPlatform::new(1000.0).with_market("m", T0, 0.40, 0.50));
    platform.reject_orders(400);
    let path = temp_state_path();
    let mut spread = agent(&platform, 200, -0.02, false, JsonStateStore::new(&path));

    let err = spread.run_cycle().await.unwrap_err();
    assert!(matches!(err, AgentError::Transport { status: 400, .. }));

    spread.persist().unwrap();
    let store = JsonStateStore::<SpreadState>::new(&path);
    assert!(store.load().last_order_times.is_empty());
    store.delete().unwrap();
}

#[tokio::test]
async fn test_scanner_pages_by_created_time() {
    let platform = Arc::new(
        MockPlatform::new(1000.0)
            .with_market("a", T0, 0.40, 0.50)
            .with_market("b", T0 - 10, 0.40, 0.50)
            .with_market("c", T0 - 20, 0.40, 0.50),
    );
    let mut spread = agent(&platform, 1, 0.002, false, JsonStateStore::new(temp_state_path()));

    let report = spread.run_cycle().await.unwrap();

    assert_eq!(report.scan.candidates.len(), 3);
    let pages = platform.market_pages.lock().unwrap();
    assert_eq!(
        *pages,
        vec![None, Some(T0), Some(T0 - 10), Some(T0 - 20)]
    );
}
