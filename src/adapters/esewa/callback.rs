use {
    super::signature::field_text,
    crate::domain::{
        id::{GatewayReference, TransactionUuid},
        payment::GatewayStatus,
    },
    base64::{Engine, engine::general_purpose::STANDARD as BASE64},
    serde_json::{Map, Value},
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("missing field: {0}")]
    MissingField(&'static str),
}

/// Decoded `data` parameter of a gateway return. Keeps the raw field map so
/// the signature can be checked over exactly what was received.
#[derive(Debug, Clone)]
pub struct GatewayCallback {
    fields: Map<String, Value>,
}

impl GatewayCallback {
    pub fn decode(data: &str) -> Result<Self, DecodeError> {
        // Form decoding of the query string turns '+' into ' '.
        let normalized: String = data.trim().replace(' ', "+");
        let bytes = BASE64.decode(normalized.as_bytes())?;
        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(DecodeError::NotAnObject),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .and_then(field_text)
            .filter(|v| !v.is_empty())
    }

    pub fn signature(&self) -> Option<String> {
        self.text("signature")
    }

    /// Fields the reconciler acts on. `transaction_uuid` and `status` are
    /// required; the rest are carried when present.
    pub fn settlement(&self) -> Result<CallbackFields, DecodeError> {
        let transaction_uuid = self
            .text("transaction_uuid")
            .and_then(|v| TransactionUuid::new(v).ok())
            .ok_or(DecodeError::MissingField("transaction_uuid"))?;
        let status = self
            .text("status")
            .map(|s| GatewayStatus::from_wire(&s))
            .ok_or(DecodeError::MissingField("status"))?;

        Ok(CallbackFields {
            transaction_uuid,
            status,
            total_amount: self.text("total_amount"),
            transaction_code: self
                .text("transaction_code")
                .and_then(|c| GatewayReference::new(c).ok()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CallbackFields {
    pub transaction_uuid: TransactionUuid,
    pub status: GatewayStatus,
    pub total_amount: Option<String>,
    pub transaction_code: Option<GatewayReference>,
}

/// Encodes a field map the way the gateway does. Used to build callbacks
/// in tests and local simulations.
pub fn encode(fields: &Map<String, Value>) -> String {
    BASE64.encode(Value::Object(fields.clone()).to_string())
}
