use {derive_more::Display, uuid::Uuid};

/// Machine-readable reason carried by the failure redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FailureReason {
    #[display("no_data")]
    NoData,
    #[display("invalid_response")]
    InvalidResponse,
    #[display("invalid_signature")]
    InvalidSignature,
    #[display("payment_not_found")]
    PaymentNotFound,
    #[display("payment_failed")]
    PaymentFailed,
    #[display("server_error")]
    ServerError,
}

/// Terminal result of handling one gateway return. Every branch ends in a
/// browser redirect; none is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Paid {
        order_id: Uuid,
        reference: Option<String>,
    },
    Failed {
        reason: FailureReason,
        gateway_status: Option<String>,
    },
}

impl CallbackOutcome {
    pub fn failed(reason: FailureReason) -> Self {
        Self::Failed {
            reason,
            gateway_status: None,
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Paid { .. })
    }
}
