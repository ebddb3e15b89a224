use rust_decimal_macros::dec;
use std::sync::Arc;
use txnledger::application::engine::TransferEngine;
use txnledger::config::LedgerConfig;
use txnledger::domain::account::{AccountId, Balance};
use txnledger::domain::schema::SchemaViolation;
use txnledger::domain::transfer::{ErrorReason, TransferStatus};
use txnledger::error::LedgerError;
use txnledger::infrastructure::in_memory::{InMemoryAccountStore, InMemoryTransferStore};

async fn engine() -> TransferEngine {
    TransferEngine::open(
        Arc::new(InMemoryAccountStore::new()),
        Arc::new(InMemoryTransferStore::new()),
        &LedgerConfig::default(),
    )
    .await
    .unwrap()
}

fn id(raw: &str) -> AccountId {
    AccountId::from(raw)
}

#[tokio::test]
async fn test_transfer_between_new_accounts() {
    let engine = engine().await;
    engine.create("acc1", dec!(100.0)).await.unwrap();
    engine.create("acc2", dec!(0.0)).await.unwrap();

    engine
        .transfer(&id("acc1"), &id("acc2"), dec!(30.0))
        .await
        .unwrap();

    assert_eq!(
        engine.get(&id("acc1")).await.unwrap().balance,
        Balance(dec!(70.0))
    );
    assert_eq!(
        engine.get(&id("acc2")).await.unwrap().balance,
        Balance(dec!(30.0))
    );
}

#[tokio::test]
async fn test_insufficient_funds_leaves_balance_unchanged() {
    let engine = engine().await;
    engine.create("acc2", dec!(0.0)).await.unwrap();
    engine.create("acc3", dec!(10.0)).await.unwrap();

    let result = engine.transfer(&id("acc3"), &id("acc2"), dec!(50.0)).await;
    assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));

    assert_eq!(
        engine.get(&id("acc3")).await.unwrap().balance,
        Balance(dec!(10.0))
    );
    assert_eq!(
        engine.get(&id("acc2")).await.unwrap().balance,
        Balance(dec!(0.0))
    );

    let journal = engine.transfers().await.unwrap();
    assert_eq!(journal[0].status, TransferStatus::Aborted);
    assert_eq!(journal[0].error_reason, Some(ErrorReason::InsufficientFunds));
}

#[tokio::test]
async fn test_duplicate_create_keeps_stored_balance() {
    let engine = engine().await;
    engine.create("acc1", dec!(100.0)).await.unwrap();

    let result = engine.create("acc1", dec!(5.0)).await;
    assert!(matches!(result, Err(LedgerError::DuplicateKey(_))));
    assert_eq!(
        engine.get(&id("acc1")).await.unwrap().balance,
        Balance(dec!(100.0))
    );
}

#[tokio::test]
async fn test_create_succeeds_once_per_identifier() {
    let engine = engine().await;
    for i in 0..20 {
        let account = format!("acc{i}");
        engine.create(account.as_str(), dec!(1)).await.unwrap();
        assert!(matches!(
            engine.create(account.as_str(), dec!(1)).await,
            Err(LedgerError::DuplicateKey(_))
        ));
    }
    assert_eq!(engine.accounts().await.unwrap().len(), 20);
}

#[tokio::test]
async fn test_apply_delta_never_stores_negative_balance() {
    let engine = engine().await;
    engine.create("acc1", dec!(1.0)).await.unwrap();

    for delta in [dec!(-0.5), dec!(-0.6), dec!(2.0), dec!(-2.5), dec!(-0.0001)] {
        let before = engine.get(&id("acc1")).await.unwrap().balance;
        match engine.apply_delta(&id("acc1"), delta).await {
            Ok(account) => assert_eq!(account.balance, Balance(before.0 + delta)),
            Err(LedgerError::InsufficientFunds { .. }) => {
                assert_eq!(engine.get(&id("acc1")).await.unwrap().balance, before);
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
        assert!(!engine.get(&id("acc1")).await.unwrap().balance.is_negative());
    }
    // 1.0 - 0.5 + 2.0 - 2.5, with the -0.6 and -0.0001 rejected
    assert_eq!(
        engine.get(&id("acc1")).await.unwrap().balance,
        Balance(dec!(0.0))
    );
}

#[tokio::test]
async fn test_transfers_conserve_total() {
    let engine = engine().await;
    engine.create("a", dec!(50)).await.unwrap();
    engine.create("b", dec!(25)).await.unwrap();
    engine.create("c", dec!(0)).await.unwrap();

    let moves = [
        ("a", "b", dec!(10)),
        ("b", "c", dec!(30)),
        ("c", "a", dec!(31)),
        ("a", "c", dec!(0.25)),
        ("c", "b", dec!(100)),
    ];
    for (from, to, amount) in moves {
        let _ = engine.transfer(&id(from), &id(to), amount).await;
        let total: rust_decimal::Decimal = engine
            .accounts()
            .await
            .unwrap()
            .iter()
            .map(|a| a.balance.value())
            .sum();
        assert_eq!(total, dec!(75));
    }
}

#[tokio::test]
async fn test_missing_source_account() {
    let engine = engine().await;
    engine.create("acc2", dec!(0)).await.unwrap();

    let result = engine.transfer(&id("ghost"), &id("acc2"), dec!(1)).await;
    assert!(matches!(result, Err(LedgerError::NotFound(missing)) if missing.as_str() == "ghost"));
    assert_eq!(
        engine.get(&id("acc2")).await.unwrap().balance,
        Balance(dec!(0))
    );
}

#[tokio::test]
async fn test_journal_ids_increase() {
    let engine = engine().await;
    engine.create("acc1", dec!(10)).await.unwrap();
    engine.create("acc2", dec!(0)).await.unwrap();

    let first = engine
        .transfer(&id("acc1"), &id("acc2"), dec!(1))
        .await
        .unwrap();
    let _ = engine.transfer(&id("acc1"), &id("acc2"), dec!(100)).await;
    let third = engine
        .transfer(&id("acc1"), &id("acc2"), dec!(1))
        .await
        .unwrap();

    assert!(first.id < third.id);
    let stored = engine.transfer_by_id(third.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TransferStatus::Committed);
    assert_eq!(stored.error_reason, None);
    assert_eq!(stored.net_amount(), dec!(0));
}

#[tokio::test]
async fn test_balance_overflow_is_rejected_and_journalled() {
    let engine = engine().await;
    engine
        .create("big", rust_decimal::Decimal::MAX)
        .await
        .unwrap();
    engine.create("small", dec!(1)).await.unwrap();

    let deposit = engine.deposit(&id("big"), dec!(1)).await;
    assert!(matches!(
        deposit,
        Err(LedgerError::Invalid(SchemaViolation::OutOfRange { .. }))
    ));

    // the debit from `small` is staged first and must not land
    let transfer = engine.transfer(&id("small"), &id("big"), dec!(1)).await;
    assert!(matches!(transfer, Err(LedgerError::Invalid(_))));

    assert_eq!(
        engine.get(&id("big")).await.unwrap().balance,
        Balance(rust_decimal::Decimal::MAX)
    );
    assert_eq!(
        engine.get(&id("small")).await.unwrap().balance,
        Balance(dec!(1))
    );

    let journal = engine.transfers().await.unwrap();
    assert_eq!(journal.len(), 2);
    for transfer in journal {
        assert_eq!(transfer.status, TransferStatus::Aborted);
        assert_eq!(transfer.error_reason, Some(ErrorReason::Invalid));
    }
}
