use {
    super::audit::NewAuditEntry,
    super::error::PipelineError,
    super::id::TransactionUuid,
    super::money::MoneyAmount,
    super::order::OrderStatus,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Refunded => "REFUNDED",
        }
    }

    /// Gateway callbacks move PENDING to SUCCESS or FAILED exactly once.
    /// REFUNDED is an administrative step from SUCCESS only.
    pub fn can_transition_to(&self, next: &PaymentStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Success)
                | (Self::Pending, Self::Failed)
                | (Self::Success, Self::Refunded)
        )
    }

    /// Whether a new checkout attempt may replace the stored one.
    pub fn accepts_new_attempt(&self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            "REFUNDED" => Ok(Self::Refunded),
            other => Err(PipelineError::Validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Esewa,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Esewa => "ESEWA",
        }
    }
}

impl TryFrom<&str> for PaymentMethod {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "ESEWA" => Ok(Self::Esewa),
            other => Err(PipelineError::Validation(format!(
                "unknown payment method: {other}"
            ))),
        }
    }
}

/// Outcome reported by the gateway. Only `COMPLETE` counts as paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayStatus {
    Complete,
    Other(String),
}

impl GatewayStatus {
    pub fn from_wire(status: &str) -> Self {
        match status {
            "COMPLETE" => Self::Complete,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Complete => "COMPLETE",
            Self::Other(s) => s,
        }
    }

    pub fn payment_status(&self) -> PaymentStatus {
        match self {
            Self::Complete => PaymentStatus::Success,
            Self::Other(_) => PaymentStatus::Failed,
        }
    }

    pub fn order_status(&self) -> OrderStatus {
        match self {
            Self::Complete => OrderStatus::Paid,
            Self::Other(_) => OrderStatus::Failed,
        }
    }
}

/// Stored payment row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub amount: MoneyAmount,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What to do with a stored payment when a verified callback arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementAction {
    /// Move payment and order to their settled states.
    Settle {
        payment: PaymentStatus,
        order: OrderStatus,
    },
    /// Payment already left PENDING; nothing is written except an anomaly
    /// audit row.
    AlreadySettled { current: PaymentStatus },
}

impl Payment {
    pub fn decide(&self, gateway: &GatewayStatus) -> SettlementAction {
        let target = gateway.payment_status();
        if self.status.can_transition_to(&target) {
            SettlementAction::Settle {
                payment: target,
                order: gateway.order_status(),
            }
        } else {
            SettlementAction::AlreadySettled {
                current: self.status,
            }
        }
    }

    pub fn audit_entry(&self, actor: &str, action: &str, detail: serde_json::Value) -> NewAuditEntry {
        NewAuditEntry::new("payment", self.id, action, actor, detail)
    }
}

/// A fresh checkout attempt for an order. Either inserted or written over
/// the order's existing pending/failed payment.
#[derive(Debug, Clone)]
pub struct PaymentAttempt {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub amount: MoneyAmount,
    pub method: PaymentMethod,
    pub transaction_uuid: TransactionUuid,
}

impl PaymentAttempt {
    pub fn new(order_id: Uuid, user_id: Uuid, amount: MoneyAmount) -> Self {
        Self {
            id: Uuid::now_v7(),
            order_id,
            user_id,
            amount,
            method: PaymentMethod::Esewa,
            transaction_uuid: TransactionUuid::generate(),
        }
    }
}
