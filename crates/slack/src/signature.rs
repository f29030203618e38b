//! Slack request signing (`X-Slack-Signature`, version `v0`).

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const SIGNATURE_VERSION: &str = "v0";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing `{0}` header")]
    MissingHeader(&'static str),
    #[error("request timestamp `{0}` is not a unix time")]
    MalformedTimestamp(String),
    #[error("request timestamp is {age_secs}s away from now (allowed {max_age_secs}s)")]
    Stale { age_secs: u64, max_age_secs: u64 },
    #[error("signature is not a `v0=` hex digest")]
    MalformedSignature,
    #[error("signature mismatch")]
    Mismatch,
    #[error("signing secret is empty")]
    EmptySecret,
}

#[derive(Clone, Debug)]
pub struct SignatureVerifier {
    secret: SecretString,
    max_age_secs: u64,
}

impl SignatureVerifier {
    pub fn new(secret: SecretString, max_age_secs: u64) -> Self {
        Self { secret, max_age_secs }
    }

    /// Checks a request against its timestamp and signature headers.
    ///
    /// Timestamps further than `max_age_secs` from `now`, in either
    /// direction, are rejected before any MAC work happens.
    pub fn verify(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        let timestamp = timestamp
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(SignatureError::MissingHeader(TIMESTAMP_HEADER))?;
        let signature = signature
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(SignatureError::MissingHeader(SIGNATURE_HEADER))?;

        let sent_at = timestamp
            .parse::<i64>()
            .map_err(|_| SignatureError::MalformedTimestamp(timestamp.to_owned()))?;
        let age_secs = now.timestamp().abs_diff(sent_at);
        if age_secs > self.max_age_secs {
            return Err(SignatureError::Stale { age_secs, max_age_secs: self.max_age_secs });
        }

        let digest = signature
            .strip_prefix(SIGNATURE_VERSION)
            .and_then(|rest| rest.strip_prefix('='))
            .ok_or(SignatureError::MalformedSignature)?;
        let expected = hex::decode(digest).map_err(|_| SignatureError::MalformedSignature)?;

        self.mac(timestamp, body)?.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
    }

    /// Produces the `v0=` header value Slack would send for `body`.
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> Result<String, SignatureError> {
        let digest = self.mac(timestamp, body)?.finalize().into_bytes();
        Ok(format!("{SIGNATURE_VERSION}={}", hex::encode(digest)))
    }

    fn mac(&self, timestamp: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
        let secret = self.secret.expose_secret();
        if secret.is_empty() {
            return Err(SignatureError::EmptySecret);
        }

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| SignatureError::EmptySecret)?;
        mac.update(SIGNATURE_VERSION.as_bytes());
        mac.update(b":");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        Ok(mac)
    }
}
