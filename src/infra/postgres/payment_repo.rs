use {
    crate::domain::{
        error::PipelineError,
        money::MoneyAmount,
        payment::{Payment, PaymentAttempt, PaymentMethod, PaymentStatus},
    },
    chrono::{DateTime, Utc},
    rust_decimal::Decimal,
    uuid::Uuid,
};

struct PaymentRow {
    id: Uuid,
    order_id: Uuid,
    user_id: Uuid,
    amount: Decimal,
    status: String,
    method: String,
    transaction_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = PipelineError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.id,
            order_id: row.order_id,
            user_id: row.user_id,
            amount: MoneyAmount::new(row.amount)?,
            status: PaymentStatus::try_from(row.status.as_str())?,
            method: PaymentMethod::try_from(row.method.as_str())?,
            transaction_id: row.transaction_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Payment for an order, row-locked for the rest of the transaction.
pub async fn find_by_order_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    order_id: Uuid,
) -> Result<Option<Payment>, PipelineError> {
    sqlx::query_as!(
        PaymentRow,
        r#"
        SELECT id, order_id, user_id, amount, status, method, transaction_id,
               created_at, updated_at
        FROM payments
        WHERE order_id = $1
        FOR UPDATE
        "#,
        order_id,
    )
    .fetch_optional(&mut **tx)
    .await?
    .map(Payment::try_from)
    .transpose()
}

pub async fn find_by_order(
    pool: &sqlx::PgPool,
    order_id: Uuid,
) -> Result<Option<Payment>, PipelineError> {
    sqlx::query_as!(
        PaymentRow,
        r#"
        SELECT id, order_id, user_id, amount, status, method, transaction_id,
               created_at, updated_at
        FROM payments
        WHERE order_id = $1
        "#,
        order_id,
    )
    .fetch_optional(pool)
    .await?
    .map(Payment::try_from)
    .transpose()
}

/// Payment whose current attempt carries `transaction_uuid`, row-locked.
/// Still matches after settlement replaced `transaction_id`.
pub async fn find_by_transaction_uuid_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    transaction_uuid: &str,
) -> Result<Option<Payment>, PipelineError> {
    sqlx::query_as!(
        PaymentRow,
        r#"
        SELECT id, order_id, user_id, amount, status, method, transaction_id,
               created_at, updated_at
        FROM payments
        WHERE transaction_uuid = $1
        FOR UPDATE
        "#,
        transaction_uuid,
    )
    .fetch_optional(&mut **tx)
    .await?
    .map(Payment::try_from)
    .transpose()
}

pub async fn insert_attempt(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    attempt: &PaymentAttempt,
) -> Result<Payment, PipelineError> {
    let row = sqlx::query_as!(
        PaymentRow,
        r#"
        INSERT INTO payments
            (id, order_id, user_id, amount, status, method, transaction_id, transaction_uuid)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        RETURNING id, order_id, user_id, amount, status, method, transaction_id,
                  created_at, updated_at
        "#,
        attempt.id,
        attempt.order_id,
        attempt.user_id,
        attempt.amount.value(),
        PaymentStatus::Pending.as_str(),
        attempt.method.as_str(),
        attempt.transaction_uuid.as_str(),
    )
    .fetch_one(&mut **tx)
    .await?;
    Payment::try_from(row)
}

/// Overwrites the stored attempt of payment `id` with `attempt`.
pub async fn replace_attempt(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    attempt: &PaymentAttempt,
) -> Result<Payment, PipelineError> {
    let row = sqlx::query_as!(
        PaymentRow,
        r#"
        UPDATE payments
        SET amount = $2, status = $3, method = $4,
            transaction_id = $5, transaction_uuid = $5, updated_at = now()
        WHERE id = $1
        RETURNING id, order_id, user_id, amount, status, method, transaction_id,
                  created_at, updated_at
        "#,
        id,
        attempt.amount.value(),
        PaymentStatus::Pending.as_str(),
        attempt.method.as_str(),
        attempt.transaction_uuid.as_str(),
    )
    .fetch_one(&mut **tx)
    .await?;
    Payment::try_from(row)
}

pub async fn settle(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    status: PaymentStatus,
    transaction_id: &str,
) -> Result<(), PipelineError> {
    sqlx::query!(
        "UPDATE payments SET status = $2, transaction_id = $3, updated_at = now() WHERE id = $1",
        id,
        status.as_str(),
        transaction_id,
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn set_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    status: PaymentStatus,
) -> Result<(), PipelineError> {
    sqlx::query!(
        "UPDATE payments SET status = $2, updated_at = now() WHERE id = $1",
        id,
        status.as_str(),
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}
