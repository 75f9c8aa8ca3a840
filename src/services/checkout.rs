use {
    crate::{
        domain::{error::PipelineError, order::{NewOrder, Order}, user::User},
        infra::postgres::{catalog_repo, order_repo},
    },
    sqlx::PgPool,
};

/// Create an order with its line items and take the ordered quantities out
/// of stock, all in one transaction.
pub async fn create_order(
    pool: &PgPool,
    user: &User,
    order: NewOrder,
) -> Result<Order, PipelineError> {
    let product_ids = order.product_ids();

    let mut tx = pool.begin().await?;

    sqlx::query!("SET LOCAL lock_timeout = '5s'")
        .execute(&mut *tx)
        .await?;

    let products = catalog_repo::find_products_for_update(&mut tx, &product_ids).await?;
    if products.len() != product_ids.len() {
        return Err(PipelineError::NotFound(
            "One or more products not found".into(),
        ));
    }

    order_repo::insert_order(&mut tx, &order).await?;

    for item in order.items() {
        let quantity = i32::try_from(item.quantity)
            .map_err(|_| PipelineError::Validation("quantity too large".into()))?;
        catalog_repo::decrement_stock(&mut tx, item.product_id, quantity).await?;
    }

    tx.commit().await?;

    tracing::info!(
        order_id = %order.id(),
        user_id = %user.id,
        items = order.items().len(),
        total = %order.total_amount(),
        "order created"
    );

    order_repo::get_order(pool, order.id())
        .await?
        .ok_or_else(|| PipelineError::NotFound(format!("order {} vanished", order.id())))
}

pub async fn list_orders(pool: &PgPool, user: &User) -> Result<Vec<Order>, PipelineError> {
    order_repo::list_for_user(pool, user.id).await
}
