mod common;

use common::*;
use rust_decimal_macros::dec;
use std::time::{Duration, Instant};
use wash_pay::domain::error::PipelineError;
use wash_pay::domain::settlement::CallbackOutcome;
use wash_pay::domain::user::UserRole;
use wash_pay::services::payment_pipeline::{initiate_payment, reconcile_callback};

const DB: &str = "wash_pay_test_concurrency";

// 10 identical callbacks race. The row lock serializes them: exactly one
// settles, the rest are recorded as anomalies.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_callbacks_settle_once() {
    let pool = setup_pool(DB).await;
    let user = seed_user(&pool, UserRole::User).await;
    let product = seed_product(&pool, dec!(900), 5).await;
    let order = seed_order(&pool, &user, &product, 1).await;
    let initiated = initiate_payment(&pool, &settings(), order.id, &user).await.unwrap();
    let data = signed_callback(
        initiated.form.field("transaction_uuid").unwrap(),
        "COMPLETE",
        "900.0",
    );

    let mut handles = Vec::new();
    for _ in 0..10 {
        let pool = pool.clone();
        let data = data.clone();
        handles.push(tokio::spawn(async move {
            reconcile_callback(&pool, &esewa_config(), Some(&data)).await
        }));
    }

    for h in handles {
        let outcome = h.await.unwrap();
        assert!(
            matches!(outcome, CallbackOutcome::Paid { order_id, .. } if order_id == order.id),
            "unexpected outcome: {outcome:?}"
        );
    }

    let payment = get_payment(&pool, order.id).await.unwrap();
    let audits = get_audit_entries(&pool, payment.id).await;
    let settled = audits.iter().filter(|a| a.action == "status_changed").count();
    let anomalies = audits.iter().filter(|a| a.action == "callback_received").count();
    assert_eq!(settled, 1, "exactly 1 settlement");
    assert_eq!(anomalies, 9, "9 anomalies");
}

// Success and failure callbacks for the same attempt race. Whichever wins,
// payment and order agree and only one transition is recorded.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn conflicting_callbacks_leave_payment_and_order_consistent() {
    let pool = setup_pool(DB).await;
    let user = seed_user(&pool, UserRole::User).await;
    let product = seed_product(&pool, dec!(900), 5).await;
    let order = seed_order(&pool, &user, &product, 1).await;
    let initiated = initiate_payment(&pool, &settings(), order.id, &user).await.unwrap();
    let uuid = initiated.form.field("transaction_uuid").unwrap().to_string();

    let mut handles = Vec::new();
    for i in 0..6 {
        let pool = pool.clone();
        let status = if i % 2 == 0 { "COMPLETE" } else { "CANCELED" };
        let data = signed_callback(&uuid, status, "900.0");
        handles.push(tokio::spawn(async move {
            reconcile_callback(&pool, &esewa_config(), Some(&data)).await
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let payment = get_payment(&pool, order.id).await.unwrap();
    let (order_status, payment_status) = get_order_statuses(&pool, order.id).await;
    assert_eq!(payment_status, payment.status);
    match payment.status.as_str() {
        "SUCCESS" => assert_eq!(order_status, "PAID"),
        "FAILED" => assert_eq!(order_status, "FAILED"),
        other => panic!("unexpected payment status {other}"),
    }

    let audits = get_audit_entries(&pool, payment.id).await;
    assert_eq!(audits.iter().filter(|a| a.action == "status_changed").count(), 1);
}

// Concurrent checkouts of the same product each take their quantity out of
// stock exactly once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_decrement_stock_exactly() {
    let pool = setup_pool(DB).await;
    let product = seed_product(&pool, dec!(100), 20).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = pool.clone();
        let product = product.clone();
        handles.push(tokio::spawn(async move {
            let user = seed_user(&pool, UserRole::User).await;
            seed_order(&pool, &user, &product, 2).await
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(get_stock(&pool, product.id).await, 4);
}

// A transaction holding the order row does not stall checkout forever:
// the lock wait gives up after the configured timeout.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn initiation_gives_up_on_a_held_order_lock() {
    let pool = setup_pool(DB).await;
    let user = seed_user(&pool, UserRole::User).await;
    let product = seed_product(&pool, dec!(900), 5).await;
    let order = seed_order(&pool, &user, &product, 1).await;

    let mut holder = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM orders WHERE id = $1 FOR UPDATE")
        .bind(order.id)
        .execute(&mut *holder)
        .await
        .unwrap();

    let started = Instant::now();
    let result = tokio::time::timeout(
        Duration::from_secs(15),
        initiate_payment(&pool, &settings(), order.id, &user),
    )
    .await
    .expect("lock wait should be bounded");

    assert!(matches!(result, Err(PipelineError::Database(_))), "got {result:?}");
    assert!(started.elapsed() >= Duration::from_secs(4));
    holder.rollback().await.unwrap();
    assert!(get_payment(&pool, order.id).await.is_none());
}
