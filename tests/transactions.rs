//! Transaction lifecycle integration tests over the mock driver.

mod common;

use common::MockDriver;
use trellis::dialect::Dialect;
use trellis::error::TrellisError;
use trellis::txn::{Transaction, with_transaction};
use trellis::value::Value;

#[tokio::test]
async fn successful_work_commits_and_releases_once() {
    let driver = MockDriver::new(Dialect::Postgres);
    let log = driver.log_handle();

    let result: i32 = with_transaction(Box::new(driver), |tx| {
        Box::pin(async move {
            tx.execute("UPDATE \"accounts\" SET \"balance\" = $1", &[Value::Int(100)])
                .await?;
            Ok(7)
        })
    })
    .await
    .unwrap();

    assert_eq!(result, 7);
    let log = log.lock().unwrap();
    assert_eq!(
        log.executes,
        vec![
            "BEGIN".to_string(),
            "UPDATE \"accounts\" SET \"balance\" = $1".to_string(),
            "COMMIT".to_string(),
        ]
    );
    assert_eq!(log.closes, 1);
}

#[tokio::test]
async fn failing_work_rolls_back_and_reraises_original() {
    let driver = MockDriver::new(Dialect::Postgres);
    let log = driver.log_handle();

    let err = with_transaction::<(), _>(Box::new(driver), |_tx| {
        Box::pin(async move { Err(TrellisError::Execution("unit of work failed".to_string())) })
    })
    .await
    .unwrap_err();

    // The original error surfaces unchanged, not the rollback's outcome.
    assert!(matches!(err, TrellisError::Execution(msg) if msg == "unit of work failed"));
    let log = log.lock().unwrap();
    assert_eq!(log.executes, vec!["BEGIN".to_string(), "ROLLBACK".to_string()]);
    assert_eq!(log.closes, 1);
}

#[tokio::test]
async fn inner_rollback_is_never_followed_by_commit() {
    let driver = MockDriver::new(Dialect::MySql);
    let log = driver.log_handle();

    with_transaction(Box::new(driver), |tx| {
        Box::pin(async move {
            tx.rollback().await?;
            Ok(())
        })
    })
    .await
    .unwrap();

    let log = log.lock().unwrap();
    assert_eq!(
        log.executes,
        vec!["START TRANSACTION".to_string(), "ROLLBACK".to_string()]
    );
    assert_eq!(log.closes, 1);
}

#[tokio::test]
async fn commit_failure_still_releases_exactly_once() {
    let driver = MockDriver::new(Dialect::Postgres).fail_on("COMMIT");
    let log = driver.log_handle();

    let mut tx = Transaction::begin(Box::new(driver)).await.unwrap();
    assert!(tx.commit().await.is_err());
    assert!(!tx.is_active());

    let log = log.lock().unwrap();
    assert_eq!(log.closes, 1);
}

#[tokio::test]
async fn operations_on_inactive_handle_are_rejected() {
    let driver = MockDriver::new(Dialect::Postgres);
    let log = driver.log_handle();

    let mut tx = Transaction::begin(Box::new(driver)).await.unwrap();
    assert!(tx.is_active());
    tx.commit().await.unwrap();
    assert!(!tx.is_active());

    assert!(matches!(
        tx.execute("SELECT 1", &[]).await,
        Err(TrellisError::InactiveTransaction)
    ));
    assert!(matches!(
        tx.fetch("SELECT 1", &[]).await,
        Err(TrellisError::InactiveTransaction)
    ));
    // A second commit (or rollback) cannot release twice.
    assert!(matches!(
        tx.commit().await,
        Err(TrellisError::InactiveTransaction)
    ));
    assert!(matches!(
        tx.rollback().await,
        Err(TrellisError::InactiveTransaction)
    ));
    assert_eq!(log.lock().unwrap().closes, 1);
}

#[tokio::test]
async fn failed_begin_releases_and_never_activates() {
    let driver = MockDriver::new(Dialect::MySql).fail_on("START TRANSACTION");
    let log = driver.log_handle();

    let err = Transaction::begin(Box::new(driver)).await.unwrap_err();
    assert!(matches!(err, TrellisError::Execution(_)));

    let log = log.lock().unwrap();
    assert_eq!(log.executes, vec!["START TRANSACTION".to_string()]);
    assert_eq!(log.closes, 1);
}

#[tokio::test]
async fn work_runs_queries_through_the_handle() {
    let driver = MockDriver::new(Dialect::Postgres)
        .respond(vec![common::row(serde_json::json!({"id": 1}))]);
    let log = driver.log_handle();

    let rows = with_transaction(Box::new(driver), |tx| {
        Box::pin(async move { tx.fetch("SELECT * FROM \"users\"", &[]).await })
    })
    .await
    .unwrap();

    assert_eq!(rows.len(), 1);
    let log = log.lock().unwrap();
    assert_eq!(log.fetches.len(), 1);
    assert_eq!(log.executes, vec!["BEGIN".to_string(), "COMMIT".to_string()]);
    assert_eq!(log.closes, 1);
}
