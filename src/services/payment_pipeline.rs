use {
    crate::{
        adapters::esewa::{
            callback::{CallbackFields, GatewayCallback},
            form::PaymentForm,
            signature,
        },
        config::{EsewaConfig, Settings, app_url},
        domain::{
            error::PipelineError,
            order::OrderStatus,
            payment::{Payment, PaymentAttempt, PaymentStatus, SettlementAction},
            settlement::{CallbackOutcome, FailureReason},
            user::User,
        },
        infra::postgres::{audit_repo::insert_audit_entry, order_repo, payment_repo},
    },
    rust_decimal::Decimal,
    secrecy::ExposeSecret,
    sqlx::PgPool,
    std::str::FromStr,
    uuid::Uuid,
};

pub const SUCCESS_PATH: &str = "/api/payments/esewa/success";
pub const FAILURE_PATH: &str = "/api/payments/esewa/failure";

const GATEWAY_ACTOR: &str = "gateway:esewa";

#[derive(Debug)]
pub struct InitiatedPayment {
    pub payment: Payment,
    pub form: PaymentForm,
}

/// Start (or restart) checkout for an order: find-or-create its payment
/// with a fresh transaction uuid and build the signed gateway form.
///
/// Conflict policy: an existing PENDING or FAILED attempt is overwritten;
/// a payment that already succeeded or was refunded is never replaced.
pub async fn initiate_payment(
    pool: &PgPool,
    settings: &Settings,
    order_id: Uuid,
    user: &User,
) -> Result<InitiatedPayment, PipelineError> {
    let actor = format!("user:{}", user.id);
    let mut tx = pool.begin().await?;

    sqlx::query!("SET LOCAL lock_timeout = '5s'")
        .execute(&mut *tx)
        .await?;

    // Locking the order serializes concurrent attempts for it.
    let order = order_repo::find_header_for_update(&mut tx, order_id)
        .await?
        .filter(|o| o.user_id == user.id)
        .ok_or_else(|| PipelineError::NotFound("Order not found".into()))?;

    if !matches!(order.status, OrderStatus::Pending | OrderStatus::Failed) {
        return Err(PipelineError::Conflict(format!(
            "order {order_id} is {} and cannot be paid",
            order.status
        )));
    }

    let attempt = PaymentAttempt::new(order.id, order.user_id, order.total_amount);

    let (payment, action, previous) =
        match payment_repo::find_by_order_for_update(&mut tx, order_id).await? {
            None => {
                let payment = payment_repo::insert_attempt(&mut tx, &attempt).await?;
                (payment, "attempt_created", None)
            }
            Some(existing) if existing.status.accepts_new_attempt() => {
                let payment = payment_repo::replace_attempt(&mut tx, existing.id, &attempt).await?;
                (payment, "attempt_replaced", Some(existing))
            }
            Some(existing) => {
                return Err(PipelineError::Conflict(format!(
                    "payment for order {order_id} is already {}",
                    existing.status
                )));
            }
        };

    if order.status != OrderStatus::Pending || order.payment_status != PaymentStatus::Pending {
        order_repo::set_statuses(&mut tx, order.id, OrderStatus::Pending, PaymentStatus::Pending)
            .await?;
    }

    let audit = payment.audit_entry(
        &actor,
        action,
        serde_json::json!({
            "transaction_uuid": attempt.transaction_uuid.as_str(),
            "amount": payment.amount.to_string(),
            "previous_transaction_id": previous.as_ref().map(|p| p.transaction_id.as_str()),
            "previous_status": previous.as_ref().map(|p| p.status.as_str()),
        }),
    );
    insert_audit_entry(&mut tx, &audit).await?;
    tx.commit().await?;

    let success_url = app_url(&settings.app_base_url, SUCCESS_PATH);
    let failure_url = app_url(&settings.app_base_url, FAILURE_PATH);
    let form = PaymentForm::build(
        &settings.esewa,
        payment.amount,
        &attempt.transaction_uuid,
        &success_url,
        &failure_url,
    );

    tracing::info!(
        payment_id = %payment.id,
        order_id = %order_id,
        transaction_uuid = %attempt.transaction_uuid,
        amount = %payment.amount,
        action,
        "payment initiated"
    );

    Ok(InitiatedPayment { payment, form })
}

/// Turn a gateway return into a terminal outcome. Never fails: decoding,
/// signature, lookup and storage problems all become failure reasons.
#[tracing::instrument(
    name = "esewa_callback",
    skip_all,
    fields(transaction_uuid = tracing::field::Empty, order_id = tracing::field::Empty)
)]
pub async fn reconcile_callback(
    pool: &PgPool,
    config: &EsewaConfig,
    data: Option<&str>,
) -> CallbackOutcome {
    let Some(data) = data.filter(|d| !d.trim().is_empty()) else {
        tracing::warn!("gateway return without data");
        return CallbackOutcome::failed(FailureReason::NoData);
    };

    let callback = match GatewayCallback::decode(data) {
        Ok(cb) => cb,
        Err(e) => {
            tracing::warn!(error = %e, "undecodable gateway payload");
            return CallbackOutcome::failed(FailureReason::InvalidResponse);
        }
    };

    match callback.signature() {
        Some(sig) => {
            let secret = config.secret_key.expose_secret().as_bytes();
            if !signature::verify(callback.fields(), &sig, secret) {
                tracing::warn!("gateway payload signature mismatch");
                return CallbackOutcome::failed(FailureReason::InvalidSignature);
            }
        }
        None if config.require_signature => {
            tracing::warn!("gateway payload carries no signature, rejected");
            return CallbackOutcome::failed(FailureReason::InvalidSignature);
        }
        None => {
            tracing::warn!("gateway payload carries no signature, accepted unverified");
        }
    }

    let fields = match callback.settlement() {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(error = %e, "gateway payload incomplete");
            return CallbackOutcome::failed(FailureReason::InvalidResponse);
        }
    };

    tracing::Span::current().record(
        "transaction_uuid",
        tracing::field::display(&fields.transaction_uuid),
    );

    match settle(pool, &fields).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "failed to settle gateway callback");
            CallbackOutcome::failed(FailureReason::ServerError)
        }
    }
}

/// Apply a verified callback. Payment, order mirror and audit row are
/// written in one transaction.
pub async fn settle(
    pool: &PgPool,
    fields: &CallbackFields,
) -> Result<CallbackOutcome, PipelineError> {
    let mut tx = pool.begin().await?;

    sqlx::query!("SET LOCAL lock_timeout = '5s'")
        .execute(&mut *tx)
        .await?;

    let Some(payment) =
        payment_repo::find_by_transaction_uuid_for_update(&mut tx, fields.transaction_uuid.as_str())
            .await?
    else {
        tx.rollback().await?;
        tracing::warn!("no payment for transaction");
        return Ok(CallbackOutcome::failed(FailureReason::PaymentNotFound));
    };

    tracing::Span::current().record("order_id", tracing::field::display(payment.order_id));

    if let Some(reported) = &fields.total_amount {
        let matches = Decimal::from_str(reported)
            .map(|v| v == payment.amount.value() || v.to_string() == payment.amount.gateway_amount())
            .unwrap_or(false);
        if !matches {
            tracing::warn!(
                reported = %reported,
                stored = %payment.amount,
                "gateway total differs from stored amount"
            );
        }
    }

    let gateway_status = fields.status.as_str().to_string();
    let reference = fields.transaction_code.as_ref().map(|c| c.as_str().to_string());

    match payment.decide(&fields.status) {
        SettlementAction::Settle {
            payment: payment_status,
            order: order_status,
        } => {
            let transaction_id = reference
                .as_deref()
                .unwrap_or(fields.transaction_uuid.as_str());

            payment_repo::settle(&mut tx, payment.id, payment_status, transaction_id).await?;
            order_repo::set_statuses(&mut tx, payment.order_id, order_status, payment_status)
                .await?;

            let audit = payment.audit_entry(
                GATEWAY_ACTOR,
                "status_changed",
                serde_json::json!({
                    "old_status": payment.status.as_str(),
                    "new_status": payment_status.as_str(),
                    "order_status": order_status.as_str(),
                    "gateway_status": gateway_status,
                    "transaction_uuid": fields.transaction_uuid.as_str(),
                    "transaction_code": reference,
                    "total_amount": fields.total_amount,
                }),
            );
            insert_audit_entry(&mut tx, &audit).await?;
            tx.commit().await?;

            tracing::info!(
                payment_id = %payment.id,
                from = %payment.status,
                to = %payment_status,
                "payment settled"
            );

            Ok(match payment_status {
                PaymentStatus::Success => CallbackOutcome::Paid {
                    order_id: payment.order_id,
                    reference,
                },
                _ => CallbackOutcome::Failed {
                    reason: FailureReason::PaymentFailed,
                    gateway_status: Some(gateway_status),
                },
            })
        }
        SettlementAction::AlreadySettled { current } => {
            let audit = payment.audit_entry(
                GATEWAY_ACTOR,
                "callback_received",
                serde_json::json!({
                    "current_status": current.as_str(),
                    "gateway_status": gateway_status,
                    "anomaly": true,
                }),
            );
            insert_audit_entry(&mut tx, &audit).await?;
            tx.commit().await?;

            tracing::warn!(
                payment_id = %payment.id,
                current = %current,
                gateway_status = %gateway_status,
                "callback for settled payment, no state change"
            );

            Ok(match current {
                PaymentStatus::Success => CallbackOutcome::Paid {
                    order_id: payment.order_id,
                    reference: Some(payment.transaction_id.clone()),
                },
                _ => CallbackOutcome::Failed {
                    reason: FailureReason::PaymentFailed,
                    gateway_status: Some(gateway_status),
                },
            })
        }
    }
}
