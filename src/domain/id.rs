use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::PipelineError;

/// Locally generated token that identifies one payment attempt until the
/// gateway assigns its own reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionUuid(String);

impl TransactionUuid {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Result<Self, PipelineError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(PipelineError::Validation(
                "transaction_uuid must not be empty".into(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Permanent reference code assigned by the gateway (`transaction_code`).
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayReference(String);

impl GatewayReference {
    pub fn new(code: impl Into<String>) -> Result<Self, PipelineError> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(PipelineError::Validation(
                "transaction_code must not be empty".into(),
            ));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
