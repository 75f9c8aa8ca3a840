use {
    crate::domain::{
        error::PipelineError,
        user::{ExternalProfile, User, UserRole},
    },
    uuid::Uuid,
};

struct UserRow {
    id: Uuid,
    external_id: String,
    email: String,
    name: String,
    phone: Option<String>,
    role: String,
}

impl TryFrom<UserRow> for User {
    type Error = PipelineError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            external_id: row.external_id,
            email: row.email,
            name: row.name,
            phone: row.phone,
            role: UserRole::try_from(row.role.as_str())?,
        })
    }
}

pub async fn find_by_external_id(
    pool: &sqlx::PgPool,
    external_id: &str,
) -> Result<Option<User>, PipelineError> {
    sqlx::query_as!(
        UserRow,
        "SELECT id, external_id, email, name, phone, role FROM users WHERE external_id = $1",
        external_id,
    )
    .fetch_optional(pool)
    .await?
    .map(User::try_from)
    .transpose()
}

/// Creates or refreshes the local user for an external identity. The role
/// of an existing user is kept.
pub async fn upsert_profile(
    pool: &sqlx::PgPool,
    profile: &ExternalProfile,
) -> Result<User, PipelineError> {
    let row = sqlx::query_as!(
        UserRow,
        r#"
        INSERT INTO users (id, external_id, email, name, phone)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (external_id) DO UPDATE
        SET email = EXCLUDED.email, name = EXCLUDED.name, phone = EXCLUDED.phone,
            updated_at = now()
        RETURNING id, external_id, email, name, phone, role
        "#,
        Uuid::now_v7(),
        &profile.external_id,
        &profile.email,
        &profile.name,
        profile.phone.as_deref(),
    )
    .fetch_one(pool)
    .await?;
    User::try_from(row)
}

/// Removes a user that has no orders and no appointments. Their vehicles
/// go with them. Returns whether a row was deleted.
pub async fn delete_by_external_id(
    pool: &sqlx::PgPool,
    external_id: &str,
) -> Result<bool, PipelineError> {
    let result = sqlx::query!(
        r#"
        DELETE FROM users u
        WHERE u.external_id = $1
          AND NOT EXISTS (SELECT 1 FROM orders o WHERE o.user_id = u.id)
          AND NOT EXISTS (SELECT 1 FROM appointments a WHERE a.user_id = u.id)
        "#,
        external_id,
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
