use {
    crate::{
        adapters::identity::webhook::IdentityEvent,
        domain::error::PipelineError,
        infra::postgres::user_repo,
    },
    sqlx::PgPool,
};

#[derive(Debug, PartialEq, Eq)]
pub enum SyncResult {
    Upserted,
    Deleted,
    /// User still owns orders or appointments, so the local record is kept.
    Retained,
    Ignored,
}

pub async fn apply_identity_event(
    pool: &PgPool,
    event: &IdentityEvent,
) -> Result<SyncResult, PipelineError> {
    match event.event_type.as_str() {
        "user.created" | "user.updated" => {
            let user = user_repo::upsert_profile(pool, &event.data.profile()).await?;
            tracing::info!(user_id = %user.id, external_id = %user.external_id, "user synced");
            Ok(SyncResult::Upserted)
        }
        "user.deleted" => {
            if user_repo::delete_by_external_id(pool, &event.data.id).await? {
                tracing::info!(external_id = %event.data.id, "user deleted");
                Ok(SyncResult::Deleted)
            } else {
                tracing::info!(external_id = %event.data.id, "user not deleted, kept");
                Ok(SyncResult::Retained)
            }
        }
        other => {
            tracing::debug!(event_type = %other, "identity event ignored");
            Ok(SyncResult::Ignored)
        }
    }
}
