use {
    super::errors::ApiError,
    crate::{
        AppState,
        adapters::identity::webhook::{self, IdentityEvent, SignedHeaders},
        domain::error::PipelineError,
        services::identity_sync::{self, SyncResult},
    },
    axum::{
        Json,
        body::Bytes,
        extract::State,
        http::HeaderMap,
    },
    secrecy::ExposeSecret,
};

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, PipelineError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| PipelineError::WebhookSignature(format!("missing {name} header")))
}

#[tracing::instrument(name = "identity_webhook", skip_all)]
pub async fn identity_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let secret = state
        .settings
        .identity_webhook_secret
        .as_ref()
        .ok_or_else(|| PipelineError::WebhookSignature("webhook secret not configured".into()))?;

    let signed = SignedHeaders {
        id: header(&headers, "svix-id")?,
        timestamp: header(&headers, "svix-timestamp")?,
        signature: header(&headers, "svix-signature")?,
    };
    webhook::verify(
        secret.expose_secret(),
        &signed,
        &body,
        chrono::Utc::now().timestamp(),
    )?;

    let event: IdentityEvent = serde_json::from_slice(&body)
        .map_err(|e| PipelineError::Validation(format!("invalid identity event: {e}")))?;

    let status = match identity_sync::apply_identity_event(&state.pool, &event).await? {
        SyncResult::Upserted => "synced",
        SyncResult::Deleted => "deleted",
        SyncResult::Retained => "retained",
        SyncResult::Ignored => "ignored",
    };
    tracing::info!(event_type = %event.event_type, status, "identity event");
    Ok(Json(serde_json::json!({ "status": status })))
}
