use {
    super::payment_repo,
    crate::domain::{
        error::PipelineError,
        money::MoneyAmount,
        order::{
            AdminOrderDetail, AdminOrderItem, AdminOrderSummary, NewOrder, Order, OrderFilter,
            OrderItem, OrderStatus, PaymentSummary, ProductSummary, UserSummary,
        },
        payment::{PaymentMethod, PaymentStatus},
    },
    chrono::{DateTime, Utc},
    rust_decimal::Decimal,
    sqlx::{Postgres, QueryBuilder},
    std::collections::HashMap,
    uuid::Uuid,
};

struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    total_amount: Decimal,
    status: String,
    payment_status: String,
    payment_method: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    product_name: String,
    product_description: Option<String>,
    product_images: Vec<String>,
    quantity: i32,
    price: Decimal,
}

#[derive(sqlx::FromRow)]
struct AdminOrderRow {
    id: Uuid,
    total_amount: Decimal,
    status: String,
    payment_status: String,
    payment_method: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_id: Uuid,
    user_name: String,
    user_email: String,
    user_phone: Option<String>,
    payment_id: Option<Uuid>,
    payment_row_status: Option<String>,
    payment_row_method: Option<String>,
    payment_transaction_id: Option<String>,
}

/// Order fields the payment flow reads before changing state.
#[derive(Debug, Clone)]
pub struct OrderHeader {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: MoneyAmount,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
}

impl TryFrom<&OrderRow> for OrderHeader {
    type Error = PipelineError;

    fn try_from(row: &OrderRow) -> Result<Self, Self::Error> {
        Ok(OrderHeader {
            id: row.id,
            user_id: row.user_id,
            total_amount: MoneyAmount::new(row.total_amount)?,
            status: OrderStatus::try_from(row.status.as_str())?,
            payment_status: PaymentStatus::try_from(row.payment_status.as_str())?,
        })
    }
}

impl AdminOrderRow {
    fn payment(&self) -> Result<Option<PaymentSummary>, PipelineError> {
        match (
            self.payment_id,
            &self.payment_row_status,
            &self.payment_row_method,
            &self.payment_transaction_id,
        ) {
            (Some(id), Some(status), Some(method), Some(transaction_id)) => {
                Ok(Some(PaymentSummary {
                    id,
                    status: PaymentStatus::try_from(status.as_str())?,
                    method: PaymentMethod::try_from(method.as_str())?,
                    transaction_id: transaction_id.clone(),
                }))
            }
            _ => Ok(None),
        }
    }

    fn user(&self) -> UserSummary {
        UserSummary {
            id: self.user_id,
            name: self.user_name.clone(),
            email: self.user_email.clone(),
            phone: self.user_phone.clone(),
        }
    }
}

const ADMIN_SELECT: &str = r#"
    SELECT o.id, o.total_amount, o.status, o.payment_status, o.payment_method,
           o.created_at, o.updated_at,
           u.id AS user_id, u.name AS user_name, u.email AS user_email, u.phone AS user_phone,
           pay.id AS payment_id, pay.status AS payment_row_status,
           pay.method AS payment_row_method, pay.transaction_id AS payment_transaction_id
    FROM orders o
    JOIN users u ON u.id = o.user_id
    LEFT JOIN payments pay ON pay.order_id = o.id
"#;

pub async fn insert_order(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    order: &NewOrder,
) -> Result<(), PipelineError> {
    sqlx::query!(
        r#"
        INSERT INTO orders (id, user_id, total_amount, status, payment_status, payment_method)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
        order.id(),
        order.user_id(),
        order.total_amount().value(),
        OrderStatus::Pending.as_str(),
        PaymentStatus::Pending.as_str(),
        PaymentMethod::Esewa.as_str(),
    )
    .execute(&mut **tx)
    .await?;

    for item in order.items() {
        let quantity = i32::try_from(item.quantity)
            .map_err(|_| PipelineError::Validation("quantity too large".into()))?;
        sqlx::query!(
            r#"
            INSERT INTO order_items (id, order_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4, $5)
            "#,
            Uuid::now_v7(),
            order.id(),
            item.product_id,
            quantity,
            item.price.value(),
        )
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

pub async fn find_header_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
) -> Result<Option<OrderHeader>, PipelineError> {
    sqlx::query_as!(
        OrderRow,
        r#"
        SELECT id, user_id, total_amount, status, payment_status, payment_method,
               created_at, updated_at
        FROM orders
        WHERE id = $1
        FOR UPDATE
        "#,
        id,
    )
    .fetch_optional(&mut **tx)
    .await?
    .as_ref()
    .map(OrderHeader::try_from)
    .transpose()
}

/// Writes the order status together with its payment status mirror.
pub async fn set_statuses(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    status: OrderStatus,
    payment_status: PaymentStatus,
) -> Result<(), PipelineError> {
    sqlx::query!(
        "UPDATE orders SET status = $2, payment_status = $3, updated_at = now() WHERE id = $1",
        id,
        status.as_str(),
        payment_status.as_str(),
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn load_items(
    pool: &sqlx::PgPool,
    order_ids: &[Uuid],
) -> Result<Vec<OrderItemRow>, PipelineError> {
    Ok(sqlx::query_as!(
        OrderItemRow,
        r#"
        SELECT i.id, i.order_id, i.product_id, p.name AS product_name,
               p.description AS product_description, p.images AS product_images,
               i.quantity, i.price
        FROM order_items i
        JOIN products p ON p.id = i.product_id
        WHERE i.order_id = ANY($1)
        ORDER BY i.order_id, i.id
        "#,
        order_ids,
    )
    .fetch_all(pool)
    .await?)
}

fn assemble(rows: Vec<OrderRow>, items: Vec<OrderItemRow>) -> Result<Vec<Order>, PipelineError> {
    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(OrderItem {
            id: item.id,
            product_id: item.product_id,
            product_name: item.product_name,
            quantity: item.quantity,
            price: MoneyAmount::new(item.price)?,
        });
    }

    rows.into_iter()
        .map(|row| {
            Ok(Order {
                id: row.id,
                user_id: row.user_id,
                total_amount: MoneyAmount::new(row.total_amount)?,
                status: OrderStatus::try_from(row.status.as_str())?,
                payment_status: PaymentStatus::try_from(row.payment_status.as_str())?,
                payment_method: PaymentMethod::try_from(row.payment_method.as_str())?,
                created_at: row.created_at,
                updated_at: row.updated_at,
                items: by_order.remove(&row.id).unwrap_or_default(),
            })
        })
        .collect()
}

pub async fn get_order(pool: &sqlx::PgPool, id: Uuid) -> Result<Option<Order>, PipelineError> {
    let Some(row) = sqlx::query_as!(
        OrderRow,
        r#"
        SELECT id, user_id, total_amount, status, payment_status, payment_method,
               created_at, updated_at
        FROM orders
        WHERE id = $1
        "#,
        id,
    )
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };
    let items = load_items(pool, &[id]).await?;
    Ok(assemble(vec![row], items)?.pop())
}

pub async fn list_for_user(pool: &sqlx::PgPool, user_id: Uuid) -> Result<Vec<Order>, PipelineError> {
    let rows = sqlx::query_as!(
        OrderRow,
        r#"
        SELECT id, user_id, total_amount, status, payment_status, payment_method,
               created_at, updated_at
        FROM orders
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
        user_id,
    )
    .fetch_all(pool)
    .await?;
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let items = load_items(pool, &ids).await?;
    assemble(rows, items)
}

fn search_pattern(search: &str) -> String {
    let escaped = search
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Appends the WHERE clause for the admin listing. Only the filters that
/// are set become conditions.
fn push_admin_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        qb.push(" AND o.status = ").push_bind(status.as_str());
    }
    if let Some(search) = filter.search.as_deref() {
        let pattern = search_pattern(search);
        qb.push(" AND (o.id::text ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// One page of orders for the admin listing plus the total match count.
pub async fn list_admin(
    pool: &sqlx::PgPool,
    filter: &OrderFilter,
) -> Result<(Vec<AdminOrderSummary>, i64), PipelineError> {
    let mut count = QueryBuilder::<Postgres>::new(
        "SELECT COUNT(*) FROM orders o JOIN users u ON u.id = o.user_id",
    );
    push_admin_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut page = QueryBuilder::<Postgres>::new(ADMIN_SELECT);
    push_admin_filter(&mut page, filter);
    page.push(" ORDER BY o.created_at DESC LIMIT ")
        .push_bind(i64::from(filter.limit))
        .push(" OFFSET ")
        .push_bind(filter.offset());
    let rows: Vec<AdminOrderRow> = page.build_query_as().fetch_all(pool).await?;

    let orders = rows
        .into_iter()
        .map(|row| {
            Ok(AdminOrderSummary {
                id: row.id,
                total_amount: MoneyAmount::new(row.total_amount)?,
                status: OrderStatus::try_from(row.status.as_str())?,
                payment_status: PaymentStatus::try_from(row.payment_status.as_str())?,
                payment_method: PaymentMethod::try_from(row.payment_method.as_str())?,
                created_at: row.created_at,
                payment: row.payment()?,
                user: UserSummary {
                    phone: None,
                    ..row.user()
                },
            })
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    Ok((orders, total))
}

pub async fn get_admin_detail(
    pool: &sqlx::PgPool,
    id: Uuid,
) -> Result<Option<AdminOrderDetail>, PipelineError> {
    let Some(row) = sqlx::query_as!(
        AdminOrderRow,
        r#"
        SELECT o.id, o.total_amount, o.status, o.payment_status, o.payment_method,
               o.created_at, o.updated_at,
               u.id AS user_id, u.name AS user_name, u.email AS user_email,
               u.phone AS user_phone,
               pay.id AS "payment_id?", pay.status AS "payment_row_status?",
               pay.method AS "payment_row_method?",
               pay.transaction_id AS "payment_transaction_id?"
        FROM orders o
        JOIN users u ON u.id = o.user_id
        LEFT JOIN payments pay ON pay.order_id = o.id
        WHERE o.id = $1
        "#,
        id,
    )
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    let items = load_items(pool, &[id])
        .await?
        .into_iter()
        .map(|item| {
            Ok(AdminOrderItem {
                id: item.id,
                quantity: item.quantity,
                price: MoneyAmount::new(item.price)?,
                product: ProductSummary {
                    id: item.product_id,
                    name: item.product_name,
                    description: item.product_description,
                    images: item.product_images,
                },
            })
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    let payment = payment_repo::find_by_order(pool, id).await?;

    Ok(Some(AdminOrderDetail {
        id: row.id,
        total_amount: MoneyAmount::new(row.total_amount)?,
        status: OrderStatus::try_from(row.status.as_str())?,
        payment_status: PaymentStatus::try_from(row.payment_status.as_str())?,
        payment_method: PaymentMethod::try_from(row.payment_method.as_str())?,
        created_at: row.created_at,
        updated_at: row.updated_at,
        user: row.user(),
        items,
        payment,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_pattern_escapes_wildcards() {
        assert_eq!(search_pattern(" 50%_off "), "%50\\%\\_off%");
    }

    #[test]
    fn admin_filter_binds_only_what_is_set() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM orders o");
        push_admin_filter(&mut qb, &OrderFilter::new(None, None, None, None).unwrap());
        assert_eq!(qb.sql(), "SELECT 1 FROM orders o WHERE TRUE");

        let filter = OrderFilter::new(None, None, Some("PAID"), Some("ram".into())).unwrap();
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM orders o");
        push_admin_filter(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM orders o WHERE TRUE AND o.status = $1 \
             AND (o.id::text ILIKE $2 OR u.email ILIKE $3 OR u.name ILIKE $4)"
        );
    }
}
