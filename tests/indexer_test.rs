mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{setup_db, test_config, FakeChain};
use tonbag_provider::application::indexer::TransactionIndexer;
use tonbag_provider::domain::contract::ops::OP_REGISTER_AS_STORAGE_PROVIDER;
use tonbag_provider::domain::contract::{format_op, OP_PLACE_STORAGE_ORDER};
use tonbag_provider::domain::errors::AgentError;
use tonbag_provider::domain::models::{ChainTransaction, OutMessage, TransactionDetail};
use tonbag_provider::infrastructure::ton::{
    AccountState, AccountStatus, TransactionId, TransactionLookup,
};

const BAG: &str = "EQAiRfFdxEf5dmSb2cEpq8pjhyHts6hmoI1woHqLRPRwZKuw";

fn hash(lt: u64) -> String {
    format!("{:064x}", lt)
}

fn chain_tx(lt: u64, prev_lt: u64, op_code: String, exit_code: i32) -> ChainTransaction {
    ChainTransaction {
        hash: hash(lt),
        lt,
        prev_lt,
        prev_hash: if prev_lt == 0 { String::new() } else { hash(prev_lt) },
        op_code,
        exit_code,
        detail: TransactionDetail {
            in_message: None,
            out_message: Some(OutMessage {
                dest: Some(format!("EQorder{}", lt)),
                value: "100000000".to_string(),
            }),
        },
    }
}

fn account(head: u64) -> AccountState {
    AccountState {
        status: AccountStatus::Active,
        balance: 1_000_000_000,
        data: None,
        last_transaction: Some(TransactionId {
            lt: head,
            hash: hash(head),
        }),
    }
}

fn placement() -> String {
    format_op(Some(OP_PLACE_STORAGE_ORDER))
}

#[tokio::test]
async fn test_indexing_is_idempotent() {
    let (_conn, repositories) = setup_db().await;
    let chain = Arc::new(FakeChain::new(account(300)));
    chain.add(300, TransactionLookup::Found(chain_tx(300, 200, placement(), 0)));
    chain.add(200, TransactionLookup::Found(chain_tx(200, 100, "none".to_string(), 0)));
    chain.add(100, TransactionLookup::Found(chain_tx(100, 0, placement(), 0)));

    let indexer = TransactionIndexer::new(
        chain.clone(),
        repositories.transaction.clone(),
        BAG.to_string(),
        test_config().poll,
    );

    assert_eq!(indexer.run_iteration().await.unwrap(), 3);
    assert_eq!(repositories.transaction.count_for_address(BAG).await.unwrap(), 3);

    // Second pass stops at the already stored head
    let lookups = chain.lookups.load(Ordering::SeqCst);
    assert_eq!(indexer.run_iteration().await.unwrap(), 0);
    assert_eq!(chain.lookups.load(Ordering::SeqCst), lookups + 1);
    assert_eq!(repositories.transaction.count_for_address(BAG).await.unwrap(), 3);

    // A new head is stored and the walk stops at the old one
    chain.add(400, TransactionLookup::Found(chain_tx(400, 300, "none".to_string(), 0)));
    *chain.account.lock().unwrap() = Some(account(400));
    assert_eq!(indexer.run_iteration().await.unwrap(), 1);
    assert_eq!(repositories.transaction.count_for_address(BAG).await.unwrap(), 4);

    let flagged = repositories.transaction.find_order_placements(0, 10).await.unwrap();
    let lts: Vec<i64> = flagged.iter().map(|tx| tx.lt).collect();
    assert_eq!(lts, vec![300, 100]);
}

#[tokio::test]
async fn test_order_placement_flag() {
    let (_conn, repositories) = setup_db().await;
    let chain = Arc::new(FakeChain::new(account(30)));
    chain.add(30, TransactionLookup::Found(chain_tx(30, 20, placement(), 0)));
    chain.add(20, TransactionLookup::Found(chain_tx(20, 10, placement(), 37)));
    chain.add(
        10,
        TransactionLookup::Found(chain_tx(
            10,
            0,
            format_op(Some(OP_REGISTER_AS_STORAGE_PROVIDER)),
            0,
        )),
    );

    let indexer = TransactionIndexer::new(
        chain,
        repositories.transaction.clone(),
        BAG.to_string(),
        test_config().poll,
    );
    assert_eq!(indexer.run_iteration().await.unwrap(), 3);

    for (lt, flagged) in [(30, true), (20, false), (10, false)] {
        let record = repositories
            .transaction
            .find(BAG, &hash(lt as u64), lt)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.is_order_placement, flagged, "lt {}", lt);
    }
}

#[tokio::test]
async fn test_expired_ancestor_stops_walk() {
    let (_conn, repositories) = setup_db().await;
    let chain = Arc::new(FakeChain::new(account(300)));
    chain.add(300, TransactionLookup::Found(chain_tx(300, 200, placement(), 0)));
    chain.add(200, TransactionLookup::Expired);

    let indexer = TransactionIndexer::new(
        chain,
        repositories.transaction.clone(),
        BAG.to_string(),
        test_config().poll,
    );
    assert_eq!(indexer.run_iteration().await.unwrap(), 1);
}

#[tokio::test]
async fn test_inactive_contract_is_fatal() {
    let (_conn, repositories) = setup_db().await;
    let chain = Arc::new(FakeChain::new(AccountState::nonexistent()));

    let indexer = TransactionIndexer::new(
        chain,
        repositories.transaction.clone(),
        BAG.to_string(),
        test_config().poll,
    );
    let err = indexer.run_iteration().await.unwrap_err();
    assert!(matches!(err, AgentError::ContractInactive(address) if address == BAG));
}

#[tokio::test]
async fn test_unreachable_node_is_not_fatal() {
    let (_conn, repositories) = setup_db().await;
    let chain = Arc::new(FakeChain::default());

    let indexer = TransactionIndexer::new(
        chain,
        repositories.transaction.clone(),
        BAG.to_string(),
        test_config().poll,
    );
    assert_eq!(indexer.run_iteration().await.unwrap(), 0);
}
