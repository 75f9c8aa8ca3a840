//! HMAC-SHA256 signatures over an ordered `name=value,...` field string,
//! base64-encoded, as used on both legs of the eSewa handshake.

use {
    base64::{Engine, engine::general_purpose::STANDARD as BASE64},
    hmac::{Hmac, Mac},
    serde_json::{Map, Value},
    sha2::Sha256,
};

type HmacSha256 = Hmac<Sha256>;

/// Field list signed on outbound payment requests, in signing order.
pub const SIGNED_FIELD_NAMES: &str = "total_amount,transaction_uuid,product_code";

/// Joins fields as `name1=value1,name2=value2` in the order given.
pub fn signing_message<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    fields
        .into_iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn mac_for(message: &str, secret: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    mac
}

/// Signs `fields` in exactly the given order. Deterministic.
pub fn sign<'a, I>(fields: I, secret: &[u8]) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let message = signing_message(fields);
    BASE64.encode(mac_for(&message, secret).finalize().into_bytes())
}

/// Verifies `signature` against the fields named by the payload's own
/// `signed_field_names`. Never panics; every malformed input is `false`.
pub fn verify(payload: &Map<String, Value>, signature: &str, secret: &[u8]) -> bool {
    let Some(names) = payload.get("signed_field_names").and_then(Value::as_str) else {
        return false;
    };

    let mut fields = Vec::new();
    for name in names.split(',') {
        match payload.get(name).and_then(field_text) {
            Some(value) => fields.push((name, value)),
            None => return false,
        }
    }

    let Ok(expected) = BASE64.decode(signature.trim()) else {
        return false;
    };

    let message = signing_message(fields.iter().map(|(n, v)| (*n, v.as_str())));
    mac_for(&message, secret).verify_slice(&expected).is_ok()
}

/// Text form of a signed value: strings verbatim, numbers and booleans as
/// their JSON text. Anything else cannot be signed.
pub fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
