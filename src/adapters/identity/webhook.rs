use {
    crate::domain::{error::PipelineError, user::ExternalProfile},
    base64::{Engine, engine::general_purpose::STANDARD as BASE64},
    hmac::{Hmac, Mac},
    serde::Deserialize,
    sha2::Sha256,
};

type HmacSha256 = Hmac<Sha256>;

/// Allowed clock skew between the provider and us.
pub const TIMESTAMP_TOLERANCE_SECS: u64 = 300;

pub struct SignedHeaders<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

/// Checks a svix-style signature: HMAC-SHA256 over `{id}.{timestamp}.{body}`
/// keyed with the base64 secret after `whsec_`. The header may list several
/// space-separated `v1,<base64>` candidates; any match is accepted.
pub fn verify(
    secret: &str,
    headers: &SignedHeaders<'_>,
    body: &[u8],
    now: i64,
) -> Result<(), PipelineError> {
    let key = decode_key(secret)?;

    let ts: i64 = headers
        .timestamp
        .parse()
        .map_err(|_| PipelineError::WebhookSignature("invalid timestamp header".into()))?;
    if now.abs_diff(ts) > TIMESTAMP_TOLERANCE_SECS {
        return Err(PipelineError::WebhookSignature(
            "timestamp outside tolerance".into(),
        ));
    }

    let mut mac = HmacSha256::new_from_slice(&key).expect("HMAC can take key of any size");
    mac.update(headers.id.as_bytes());
    mac.update(b".");
    mac.update(headers.timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);

    let matched = headers
        .signature
        .split_whitespace()
        .filter_map(|entry| entry.split_once(','))
        .filter(|(version, _)| *version == "v1")
        .filter_map(|(_, sig)| BASE64.decode(sig).ok())
        .any(|sig| mac.clone().verify_slice(&sig).is_ok());

    if matched {
        Ok(())
    } else {
        Err(PipelineError::WebhookSignature(
            "no matching signature".into(),
        ))
    }
}

/// Signature header value for `body`, in the same format `verify` reads.
pub fn sign(secret: &str, id: &str, timestamp: i64, body: &[u8]) -> Result<String, PipelineError> {
    let key = decode_key(secret)?;
    let mut mac = HmacSha256::new_from_slice(&key).expect("HMAC can take key of any size");
    mac.update(format!("{id}.{timestamp}.").as_bytes());
    mac.update(body);
    Ok(format!("v1,{}", BASE64.encode(mac.finalize().into_bytes())))
}

fn decode_key(secret: &str) -> Result<Vec<u8>, PipelineError> {
    BASE64
        .decode(secret.strip_prefix("whsec_").unwrap_or(secret))
        .map_err(|_| PipelineError::Config("identity webhook secret is not base64".into()))
}

#[derive(Debug, Deserialize)]
pub struct IdentityEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: UserData,
}

#[derive(Debug, Deserialize)]
pub struct UserData {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    pub primary_email_address_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_numbers: Vec<PhoneNumber>,
}

#[derive(Debug, Deserialize)]
pub struct EmailAddress {
    pub id: String,
    pub email_address: String,
}

#[derive(Debug, Deserialize)]
pub struct PhoneNumber {
    pub phone_number: String,
}

impl UserData {
    pub fn profile(&self) -> ExternalProfile {
        let email = self
            .email_addresses
            .iter()
            .find(|e| Some(&e.id) == self.primary_email_address_id.as_ref())
            .map(|e| e.email_address.clone())
            .unwrap_or_default();

        let first = self.first_name.as_deref().filter(|s| !s.is_empty());
        let last = self.last_name.as_deref().filter(|s| !s.is_empty());
        let name = match (first, last) {
            (Some(f), Some(l)) => format!("{f} {l}"),
            (Some(f), None) => f.to_string(),
            _ => email
                .split('@')
                .next()
                .filter(|s| !s.is_empty())
                .unwrap_or("User")
                .to_string(),
        };

        ExternalProfile {
            external_id: self.id.clone(),
            email,
            name,
            phone: self.phone_numbers.first().map(|p| p.phone_number.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

    #[test]
    fn signed_body_verifies() {
        let body = br#"{"type":"user.created"}"#;
        let sig = sign(SECRET, "msg_1", 1_700_000_000, body).unwrap();
        let headers = SignedHeaders {
            id: "msg_1",
            timestamp: "1700000000",
            signature: &format!("v1,bogus {sig}"),
        };
        assert!(verify(SECRET, &headers, body, 1_700_000_010).is_ok());
    }

    #[test]
    fn stale_or_tampered_is_rejected() {
        let body = br#"{"type":"user.created"}"#;
        let sig = sign(SECRET, "msg_1", 1_700_000_000, body).unwrap();
        let headers = SignedHeaders {
            id: "msg_1",
            timestamp: "1700000000",
            signature: &sig,
        };
        assert!(verify(SECRET, &headers, body, 1_700_001_000).is_err());
        assert!(verify(SECRET, &headers, b"{}", 1_700_000_000).is_err());
    }

    #[test]
    fn extreme_timestamps_are_rejected_without_overflow() {
        for (timestamp, now) in [
            ("-9223372036854775808", 1_700_000_000),
            ("9223372036854775807", 1_700_000_000),
            ("9223372036854775807", i64::MIN),
        ] {
            let headers = SignedHeaders {
                id: "msg_1",
                timestamp,
                signature: "v1,AAAA",
            };
            let err = verify(SECRET, &headers, b"{}", now).unwrap_err();
            assert!(
                matches!(&err, PipelineError::WebhookSignature(m) if m == "timestamp outside tolerance"),
                "{timestamp}: got {err:?}"
            );
        }
    }

    #[test]
    fn profile_falls_back_to_email_local_part() {
        let data: UserData = serde_json::from_value(serde_json::json!({
            "id": "user_1",
            "email_addresses": [{"id": "e1", "email_address": "ram@example.com"}],
            "primary_email_address_id": "e1",
            "first_name": null,
            "last_name": "Thapa",
            "phone_numbers": []
        }))
        .unwrap();
        let p = data.profile();
        assert_eq!(p.name, "ram");
        assert_eq!(p.email, "ram@example.com");
        assert_eq!(p.phone, None);
    }
}
