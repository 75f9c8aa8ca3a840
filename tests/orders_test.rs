mod common;

use common::*;
use rust_decimal_macros::dec;
use uuid::Uuid;
use wash_pay::adapters::identity::webhook::IdentityEvent;
use wash_pay::domain::catalog::{NewCategory, NewProduct};
use wash_pay::domain::error::PipelineError;
use wash_pay::domain::money::MoneyAmount;
use wash_pay::domain::order::{NewOrder, NewOrderItem, OrderFilter, OrderStatus};
use wash_pay::domain::payment::PaymentStatus;
use wash_pay::domain::user::UserRole;
use wash_pay::infra::postgres::user_repo;
use wash_pay::services::identity_sync::{SyncResult, apply_identity_event};
use wash_pay::services::payment_pipeline::{initiate_payment, reconcile_callback};
use wash_pay::services::{admin_orders, catalog, checkout};

const DB: &str = "wash_pay_test_orders";

// ── Checkout ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_order_stores_items_and_decrements_stock() {
    let pool = setup_pool(DB).await;
    let user = seed_user(&pool, UserRole::User).await;
    let wash = seed_product(&pool, dec!(1200), 5).await;
    let wax = seed_product(&pool, dec!(450.50), 3).await;

    let order = NewOrder::new(
        user.id,
        vec![
            NewOrderItem {
                product_id: wash.id,
                quantity: 2,
                price: wash.price,
            },
            NewOrderItem {
                product_id: wax.id,
                quantity: 1,
                price: wax.price,
            },
        ],
        Some(MoneyAmount::new(dec!(2850.50)).unwrap()),
    )
    .unwrap();
    let order = checkout::create_order(&pool, &user, order).await.unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.total_amount.value(), dec!(2850.50));
    assert_eq!(order.items.len(), 2);
    assert_eq!(get_stock(&pool, wash.id).await, 3);
    assert_eq!(get_stock(&pool, wax.id).await, 2);

    let mine = checkout::list_orders(&pool, &user).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, order.id);
}

#[tokio::test]
async fn create_order_with_unknown_product_writes_nothing() {
    let pool = setup_pool(DB).await;
    let user = seed_user(&pool, UserRole::User).await;
    let wash = seed_product(&pool, dec!(1200), 5).await;

    let order = NewOrder::new(
        user.id,
        vec![
            NewOrderItem {
                product_id: wash.id,
                quantity: 1,
                price: wash.price,
            },
            NewOrderItem {
                product_id: Uuid::now_v7(),
                quantity: 1,
                price: wash.price,
            },
        ],
        Some(MoneyAmount::new(dec!(2400)).unwrap()),
    )
    .unwrap();
    let err = checkout::create_order(&pool, &user, order).await.unwrap_err();

    assert!(matches!(err, PipelineError::NotFound(_)), "got {err:?}");
    assert_eq!(get_stock(&pool, wash.id).await, 5);
    assert!(checkout::list_orders(&pool, &user).await.unwrap().is_empty());
}

#[test]
fn new_order_requires_items_and_total() {
    let user_id = Uuid::now_v7();
    let err = NewOrder::new(user_id, vec![], Some(MoneyAmount::new(dec!(10)).unwrap())).unwrap_err();
    assert_eq!(err.to_string(), "validation: Items and total amount are required");

    let item = NewOrderItem {
        product_id: Uuid::now_v7(),
        quantity: 1,
        price: MoneyAmount::new(dec!(10)).unwrap(),
    };
    assert!(NewOrder::new(user_id, vec![item.clone()], None).is_err());

    let zero = NewOrderItem { quantity: 0, ..item };
    assert!(NewOrder::new(user_id, vec![zero], Some(MoneyAmount::new(dec!(10)).unwrap())).is_err());
}

// ── Catalog ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_category_is_a_conflict() {
    let pool = setup_pool(DB).await;
    let name = format!("Interior {}", Uuid::new_v4().simple());

    catalog::create_category(&pool, NewCategory::new(Some(name.clone())).unwrap())
        .await
        .unwrap();
    let err = catalog::create_category(&pool, NewCategory::new(Some(name)).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn product_needs_existing_category() {
    let pool = setup_pool(DB).await;
    let product = NewProduct::new(
        Some("Ceramic Coat".into()),
        None,
        Some(MoneyAmount::new(dec!(9000)).unwrap()),
        Some(Uuid::now_v7()),
        None,
        vec!["https://cdn.example.com/coat.png".into()],
    )
    .unwrap();
    let err = catalog::create_product(&pool, product).await.unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)), "got {err:?}");
}

// ── Admin orders ───────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_refund_cascades_to_successful_payment() {
    let pool = setup_pool(DB).await;
    let user = seed_user(&pool, UserRole::User).await;
    let product = seed_product(&pool, dec!(700), 5).await;
    let order = seed_order(&pool, &user, &product, 1).await;
    let initiated = initiate_payment(&pool, &settings(), order.id, &user).await.unwrap();
    let data = signed_callback(initiated.form.field("transaction_uuid").unwrap(), "COMPLETE", "700");
    assert!(reconcile_callback(&pool, &esewa_config(), Some(&data)).await.is_paid());

    let detail = admin_orders::update_status(&pool, order.id, "REFUNDED", "admin:test")
        .await
        .unwrap();

    assert_eq!(detail.status, OrderStatus::Refunded);
    assert_eq!(detail.payment_status, PaymentStatus::Refunded);
    assert_eq!(detail.payment.unwrap().status, PaymentStatus::Refunded);

    let order_audits = get_audit_entries(&pool, order.id).await;
    assert_eq!(order_audits.len(), 1);
    assert_eq!(order_audits[0].entity_type, "order");
    assert_eq!(order_audits[0].detail["old_status"], "PAID");
    assert_eq!(order_audits[0].detail["new_status"], "REFUNDED");
}

#[tokio::test]
async fn admin_refund_of_unpaid_payment_is_a_conflict() {
    let pool = setup_pool(DB).await;
    let user = seed_user(&pool, UserRole::User).await;
    let product = seed_product(&pool, dec!(700), 5).await;
    let order = seed_order(&pool, &user, &product, 1).await;
    initiate_payment(&pool, &settings(), order.id, &user).await.unwrap();

    let err = admin_orders::update_status(&pool, order.id, "REFUNDED", "admin:test")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Conflict(_)), "got {err:?}");
    assert_eq!(
        get_order_statuses(&pool, order.id).await,
        ("PENDING".to_string(), "PENDING".to_string())
    );
}

#[tokio::test]
async fn admin_status_validation() {
    let pool = setup_pool(DB).await;
    let user = seed_user(&pool, UserRole::User).await;
    let product = seed_product(&pool, dec!(700), 5).await;
    let order = seed_order(&pool, &user, &product, 1).await;

    for bad in ["FAILED", "LOST", ""] {
        let err = admin_orders::update_status(&pool, order.id, bad, "admin:test")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)), "{bad}: got {err:?}");
    }

    let err = admin_orders::update_status(&pool, Uuid::now_v7(), "SHIPPED", "admin:test")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)));

    let detail = admin_orders::update_status(&pool, order.id, "SHIPPED", "admin:test")
        .await
        .unwrap();
    assert_eq!(detail.status, OrderStatus::Shipped);
    assert_eq!(detail.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn admin_listing_filters_and_paginates() {
    let pool = setup_pool(DB).await;
    let user = seed_user(&pool, UserRole::User).await;
    let product = seed_product(&pool, dec!(300), 50).await;
    for _ in 0..3 {
        seed_order(&pool, &user, &product, 1).await;
    }
    let shipped = seed_order(&pool, &user, &product, 1).await;
    admin_orders::update_status(&pool, shipped.id, "DELIVERED", "admin:test")
        .await
        .unwrap();

    // Search by the user's unique email scopes the listing to this test.
    let filter = OrderFilter::new(Some(1), Some(2), Some("ALL"), Some(user.email.clone())).unwrap();
    let page = admin_orders::list_orders(&pool, &filter).await.unwrap();
    assert_eq!(page.total_orders, 4);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.current_page, 1);
    assert_eq!(page.orders.len(), 2);

    let filter =
        OrderFilter::new(None, None, Some("DELIVERED"), Some(user.email.clone())).unwrap();
    let page = admin_orders::list_orders(&pool, &filter).await.unwrap();
    assert_eq!(page.total_orders, 1);
    assert_eq!(page.orders[0].id, shipped.id);
    assert_eq!(page.orders[0].user.email, user.email);
}

// ── Identity sync ──────────────────────────────────────────────────────────

fn identity_event(event_type: &str, external_id: &str) -> IdentityEvent {
    serde_json::from_value(serde_json::json!({
        "type": event_type,
        "data": {
            "id": external_id,
            "email_addresses": [{"id": "idn_1", "email_address": "ram@example.com"}],
            "primary_email_address_id": "idn_1",
            "first_name": "Ram",
            "last_name": "Thapa",
            "phone_numbers": []
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn identity_events_upsert_and_delete_users() {
    let pool = setup_pool(DB).await;
    let external_id = format!("user_{}", Uuid::new_v4().simple());

    let result = apply_identity_event(&pool, &identity_event("user.created", &external_id))
        .await
        .unwrap();
    assert_eq!(result, SyncResult::Upserted);
    let user = user_repo::find_by_external_id(&pool, &external_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.name, "Ram Thapa");
    assert_eq!(user.email, "ram@example.com");
    assert_eq!(user.role, UserRole::User);

    let result = apply_identity_event(&pool, &identity_event("session.created", &external_id))
        .await
        .unwrap();
    assert_eq!(result, SyncResult::Ignored);

    let result = apply_identity_event(&pool, &identity_event("user.deleted", &external_id))
        .await
        .unwrap();
    assert_eq!(result, SyncResult::Deleted);
    assert!(user_repo::find_by_external_id(&pool, &external_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn identity_update_keeps_role_and_delete_keeps_customers() {
    let pool = setup_pool(DB).await;
    let admin = seed_user(&pool, UserRole::Admin).await;
    let product = seed_product(&pool, dec!(300), 5).await;
    seed_order(&pool, &admin, &product, 1).await;

    apply_identity_event(&pool, &identity_event("user.updated", &admin.external_id))
        .await
        .unwrap();
    let reloaded = user_repo::find_by_external_id(&pool, &admin.external_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.role, UserRole::Admin);
    assert_eq!(reloaded.name, "Ram Thapa");

    let result = apply_identity_event(&pool, &identity_event("user.deleted", &admin.external_id))
        .await
        .unwrap();
    assert_eq!(result, SyncResult::Retained);
}
