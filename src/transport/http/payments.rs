use {
    super::{auth::CurrentUser, errors::ApiError, extract::JsonBody},
    crate::{
        AppState,
        config::app_url,
        domain::settlement::{CallbackOutcome, FailureReason},
        services::payment_pipeline::{initiate_payment, reconcile_callback},
    },
    axum::{
        extract::{RawQuery, State},
        response::{Html, Redirect},
    },
    serde::Deserialize,
    url::Url,
    uuid::Uuid,
};

pub const SUCCESS_PAGE: &str = "/dashboard/user/orders/success";
pub const FAILURE_PAGE: &str = "/dashboard/user/orders/failed";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    pub order_id: Uuid,
}

#[tracing::instrument(name = "esewa_initiate", skip_all)]
pub async fn initiate(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody<InitiatePaymentRequest>,
) -> Result<Html<String>, ApiError> {
    let initiated = initiate_payment(&state.pool, &state.settings, body.order_id, &user).await?;
    Ok(Html(initiated.form.to_html()))
}

/// Gateway success return. Always answers with a redirect.
pub async fn success(State(state): State<AppState>, RawQuery(query): RawQuery) -> Redirect {
    let data = data_param(query.as_deref());
    let outcome = reconcile_callback(&state.pool, &state.settings.esewa, data.as_deref()).await;
    Redirect::to(redirect_url(&state.settings.app_base_url, &outcome).as_str())
}

/// Gateway failure return. A payload, when present, is reconciled like any
/// other callback; without one nothing is known and nothing changes.
pub async fn failure(State(state): State<AppState>, RawQuery(query): RawQuery) -> Redirect {
    let outcome = match data_param(query.as_deref()) {
        Some(data) => reconcile_callback(&state.pool, &state.settings.esewa, Some(&data)).await,
        None => {
            tracing::info!("gateway reported failure without payload");
            CallbackOutcome::failed(FailureReason::PaymentFailed)
        }
    };
    Redirect::to(redirect_url(&state.settings.app_base_url, &outcome).as_str())
}

fn data_param(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(k, _)| k == "data")
        .map(|(_, v)| v.into_owned())
}

pub fn redirect_url(base: &Url, outcome: &CallbackOutcome) -> Url {
    match outcome {
        CallbackOutcome::Paid {
            order_id,
            reference,
        } => {
            let mut url = app_url(base, SUCCESS_PAGE);
            url.query_pairs_mut()
                .append_pair("order_id", &order_id.to_string())
                .append_pair("reference", reference.as_deref().unwrap_or(""));
            url
        }
        CallbackOutcome::Failed {
            reason,
            gateway_status,
        } => {
            let mut url = app_url(base, FAILURE_PAGE);
            {
                let mut pairs = url.query_pairs_mut();
                pairs.append_pair("reason", &reason.to_string());
                if let Some(status) = gateway_status {
                    pairs.append_pair("status", status);
                }
            }
            url
        }
    }
}
