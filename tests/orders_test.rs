mod common;

use std::sync::Arc;

use common::{insert_order, order_state, setup_db, test_config, FakeContract, NOW};
use tonbag_provider::application::orders::analyzer::AnalyzeOutcome;
use tonbag_provider::application::orders::{OrderAnalyzer, OrderRefresher};
use tonbag_provider::domain::contract::{format_op, OP_PLACE_STORAGE_ORDER};
use tonbag_provider::domain::models::{NewTransaction, OrderState, OutMessage, TransactionDetail};
use tonbag_provider::infrastructure::persistence::repositories::{
    Repositories, LAST_ORDER_UPDATE_ID,
};
use tonbag_provider::utils::FixedClock;

const BAG: &str = "EQAiRfFdxEf5dmSb2cEpq8pjhyHts6hmoI1woHqLRPRwZKuw";

async fn insert_placement(repositories: &Repositories, lt: i64, order_address: Option<&str>) {
    let transaction = NewTransaction {
        address: BAG.to_string(),
        tx_hash: format!("{:064x}", lt),
        lt,
        op_code: format_op(Some(OP_PLACE_STORAGE_ORDER)),
        exit_code: 0,
        detail: TransactionDetail {
            in_message: None,
            out_message: order_address.map(|dest| OutMessage {
                dest: Some(dest.to_string()),
                value: "100000000".to_string(),
            }),
        },
        is_order_placement: true,
    };
    assert!(repositories.transaction.insert_if_absent(&transaction).await.unwrap());
}

#[tokio::test]
async fn test_analyzer_creates_order_and_clears_flag() {
    let (conn, repositories) = setup_db().await;
    let contract = Arc::new(FakeContract::new());
    contract.set_state("EQorderA", order_state(3, false, 0));
    insert_placement(&repositories, 10, Some("EQorderA")).await;

    let analyzer = OrderAnalyzer::new(conn, repositories.clone(), contract, test_config().poll);
    assert_eq!(analyzer.process_batch().await.unwrap(), 1);

    let order = repositories.order.find_by_address("EQorderA").await.unwrap().unwrap();
    assert_eq!(order.state, OrderState::NotStarted);
    assert_eq!(order.max_storage_providers, 3);
    assert_eq!(order.torrent_hash, "11".repeat(32));
    assert!(repositories
        .transaction
        .find_order_placements(0, 10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_analyzer_reentry_with_existing_order() {
    let (conn, repositories) = setup_db().await;
    let contract = Arc::new(FakeContract::new());
    let state = order_state(3, true, (NOW + 86_400) as u32);
    contract.set_state("EQorderA", state.clone());

    // Simulates a crash after the order insert but before the flag was cleared
    insert_order(&conn, "EQorderA", &state).await;
    insert_placement(&repositories, 10, Some("EQorderA")).await;

    let analyzer = OrderAnalyzer::new(conn, repositories.clone(), contract, test_config().poll);
    let flagged = repositories.transaction.find_order_placements(0, 10).await.unwrap();
    assert_eq!(analyzer.analyze(&flagged[0]).await.unwrap(), AnalyzeOutcome::AlreadyKnown);
    assert!(repositories
        .transaction
        .find_order_placements(0, 10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_analyzer_defers_inactive_contract() {
    let (conn, repositories) = setup_db().await;
    let contract = Arc::new(FakeContract::new());
    contract.set_state("EQorderB", order_state(1, false, 0));
    insert_placement(&repositories, 10, Some("EQorderA")).await;
    insert_placement(&repositories, 20, Some("EQorderB")).await;
    insert_placement(&repositories, 30, None).await;

    let analyzer =
        OrderAnalyzer::new(conn, repositories.clone(), contract.clone(), test_config().poll);
    assert_eq!(analyzer.process_batch().await.unwrap(), 3);

    assert!(repositories.order.find_by_address("EQorderA").await.unwrap().is_none());
    assert!(repositories.order.find_by_address("EQorderB").await.unwrap().is_some());
    let flagged = repositories.transaction.find_order_placements(0, 10).await.unwrap();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].lt, 10);

    // Cursor is past the deferred row until an empty batch resets it
    assert_eq!(analyzer.process_batch().await.unwrap(), 0);
    contract.set_state("EQorderA", order_state(1, false, 0));
    assert_eq!(analyzer.process_batch().await.unwrap(), 1);
    assert!(repositories.order.find_by_address("EQorderA").await.unwrap().is_some());
}

#[tokio::test]
async fn test_refresher_updates_and_invalidates() {
    let (conn, repositories) = setup_db().await;
    let contract = Arc::new(FakeContract::new());
    let clock = Arc::new(FixedClock::new(NOW));

    let waiting = order_state(2, false, 0);
    let gone = order_state(2, false, 0);
    let live_id = insert_order(&conn, "EQlive", &waiting).await;
    let gone_id = insert_order(&conn, "EQgone", &gone).await;

    let started = order_state(2, true, (NOW + 86_400) as u32);
    contract.set_state("EQlive", started);

    let refresher = OrderRefresher::new(repositories.clone(), contract, clock, test_config().poll);
    assert_eq!(refresher.process_batch().await.unwrap(), 2);
    assert_eq!(
        repositories.config.get(LAST_ORDER_UPDATE_ID).await.unwrap(),
        Some(gone_id.to_string())
    );

    let live = repositories.order.find_by_id(live_id).await.unwrap().unwrap();
    assert_eq!(live.state, OrderState::Started);
    assert_eq!(live.period_finish, NOW + 86_400);
    let gone = repositories.order.find_by_id(gone_id).await.unwrap().unwrap();
    assert_eq!(gone.state, OrderState::Invalid);

    // Nothing after the cursor: it resets to the start
    assert_eq!(refresher.process_batch().await.unwrap(), 0);
    assert_eq!(
        repositories.config.get(LAST_ORDER_UPDATE_ID).await.unwrap(),
        Some("0".to_string())
    );

    // Invalid orders are no longer refreshed
    assert_eq!(refresher.process_batch().await.unwrap(), 1);
}

#[tokio::test]
async fn test_refresher_skips_finished_orders() {
    let (conn, repositories) = setup_db().await;
    let contract = Arc::new(FakeContract::new());
    let clock = Arc::new(FixedClock::new(NOW));
    insert_order(&conn, "EQdone", &order_state(2, true, (NOW - 10) as u32)).await;

    let refresher = OrderRefresher::new(repositories, contract, clock, test_config().poll);
    assert_eq!(refresher.process_batch().await.unwrap(), 0);
}
