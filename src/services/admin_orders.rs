use {
    crate::{
        domain::{
            audit::NewAuditEntry,
            error::PipelineError,
            order::{AdminOrderDetail, OrderFilter, OrderPage, OrderStatus},
            payment::PaymentStatus,
        },
        infra::postgres::{audit_repo::insert_audit_entry, order_repo, payment_repo},
    },
    sqlx::PgPool,
    uuid::Uuid,
};

pub async fn list_orders(pool: &PgPool, filter: &OrderFilter) -> Result<OrderPage, PipelineError> {
    let (orders, total) = order_repo::list_admin(pool, filter).await?;
    Ok(OrderPage::new(orders, total, filter))
}

pub async fn get_order(pool: &PgPool, id: Uuid) -> Result<AdminOrderDetail, PipelineError> {
    order_repo::get_admin_detail(pool, id)
        .await?
        .ok_or_else(|| PipelineError::NotFound("Order not found".into()))
}

/// Administrative status change. Refunding an order also refunds its
/// payment, which must have succeeded.
pub async fn update_status(
    pool: &PgPool,
    id: Uuid,
    status: &str,
    actor: &str,
) -> Result<AdminOrderDetail, PipelineError> {
    let status = OrderStatus::try_from(status)
        .ok()
        .filter(OrderStatus::settable_by_admin)
        .ok_or_else(|| PipelineError::Validation("Invalid order status".into()))?;

    let mut tx = pool.begin().await?;

    sqlx::query!("SET LOCAL lock_timeout = '5s'")
        .execute(&mut *tx)
        .await?;

    let order = order_repo::find_header_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| PipelineError::NotFound("Order not found".into()))?;

    let mut payment_status = order.payment_status;

    if status == OrderStatus::Refunded {
        if let Some(payment) = payment_repo::find_by_order_for_update(&mut tx, id).await? {
            if !payment.status.can_transition_to(&PaymentStatus::Refunded) {
                return Err(PipelineError::Conflict(format!(
                    "payment is {} and cannot be refunded",
                    payment.status
                )));
            }
            payment_repo::set_status(&mut tx, payment.id, PaymentStatus::Refunded).await?;
            let audit = payment.audit_entry(
                actor,
                "status_changed",
                serde_json::json!({
                    "old_status": payment.status.as_str(),
                    "new_status": PaymentStatus::Refunded.as_str(),
                    "refund": true,
                }),
            );
            insert_audit_entry(&mut tx, &audit).await?;
            payment_status = PaymentStatus::Refunded;
        }
    }

    order_repo::set_statuses(&mut tx, id, status, payment_status).await?;
    let audit = NewAuditEntry::new(
        "order",
        id,
        "status_changed",
        actor,
        serde_json::json!({
            "old_status": order.status.as_str(),
            "new_status": status.as_str(),
        }),
    );
    insert_audit_entry(&mut tx, &audit).await?;
    tx.commit().await?;

    tracing::info!(order_id = %id, from = %order.status, to = %status, "order status updated");

    get_order(pool, id).await
}
