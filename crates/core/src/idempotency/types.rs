//! Idempotency keys and cached-response records.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use kudi_shared::types::UserId;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::IdempotencyError;

/// Longest key accepted, in bytes.
pub const MAX_KEY_LEN: usize = 255;

/// A validated client-supplied idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Validates a raw header value.
    ///
    /// Keys are 1 to 255 visible ASCII characters.
    ///
    /// # Errors
    ///
    /// Returns `MissingKey` for an absent value and `InvalidKey` otherwise.
    pub fn parse(raw: Option<&str>) -> Result<Self, IdempotencyError> {
        let raw = raw.ok_or(IdempotencyError::MissingKey)?;
        if raw.is_empty() {
            return Err(IdempotencyError::InvalidKey("key is empty".to_string()));
        }
        if raw.len() > MAX_KEY_LEN {
            return Err(IdempotencyError::InvalidKey(format!(
                "key is longer than {MAX_KEY_LEN} characters"
            )));
        }
        if !raw.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(IdempotencyError::InvalidKey(
                "key must contain visible ASCII characters only".to_string(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored response for one `(key, actor)` pair.
///
/// Records are never mutated. An expired record counts as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyRecord {
    /// The client key.
    pub key: String,
    /// The actor the key is scoped to.
    pub actor_id: UserId,
    /// Exact JSON text of the first successful response.
    pub cached_response: String,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
    /// When the record stops being honoured.
    pub expires_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    /// Builds a record for `response`, valid for `ttl` from `now`.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the response cannot be encoded.
    pub fn new<T: Serialize>(
        key: &IdempotencyKey,
        actor_id: UserId,
        response: &T,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, IdempotencyError> {
        Ok(Self {
            key: key.as_str().to_string(),
            actor_id,
            cached_response: encode_response(response)?,
            created_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        })
    }

    /// Returns true if the record is no longer honoured at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Decodes the cached response.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the stored text does not match `T`.
    pub fn response<T: DeserializeOwned>(&self) -> Result<T, IdempotencyError> {
        decode_response(&self.cached_response)
    }
}

/// Encodes a response as the JSON text that gets cached.
///
/// # Errors
///
/// Returns `Serialization` if encoding fails.
pub fn encode_response<T: Serialize>(response: &T) -> Result<String, IdempotencyError> {
    serde_json::to_string(response).map_err(|e| IdempotencyError::Serialization(e.to_string()))
}

/// Decodes cached JSON text.
///
/// # Errors
///
/// Returns `Serialization` if the text does not match `T`.
pub fn decode_response<T: DeserializeOwned>(cached: &str) -> Result<T, IdempotencyError> {
    serde_json::from_str(cached).map_err(|e| IdempotencyError::Serialization(e.to_string()))
}

/// Converts a TTL in seconds to a chrono duration, saturating on overflow.
#[must_use]
pub fn ttl_from_secs(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Receipt {
        trace_id: String,
        amount_paid: i64,
    }

    #[rstest]
    #[case("repay-123")]
    #[case("a")]
    #[case("0190b3a2-7c1e-7000-8000-000000000000")]
    fn test_valid_keys(#[case] raw: &str) {
        let key = IdempotencyKey::parse(Some(raw)).unwrap();
        assert_eq!(key.as_str(), raw);
    }

    #[rstest]
    #[case("")]
    #[case("has space")]
    #[case("tab\there")]
    #[case("naïve")]
    fn test_invalid_keys(#[case] raw: &str) {
        assert!(matches!(
            IdempotencyKey::parse(Some(raw)),
            Err(IdempotencyError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_missing_key() {
        assert!(matches!(
            IdempotencyKey::parse(None),
            Err(IdempotencyError::MissingKey)
        ));
    }

    #[test]
    fn test_key_length_limit() {
        let ok = "k".repeat(MAX_KEY_LEN);
        assert!(IdempotencyKey::parse(Some(&ok)).is_ok());

        let too_long = "k".repeat(MAX_KEY_LEN + 1);
        assert!(IdempotencyKey::parse(Some(&too_long)).is_err());
    }

    #[test]
    fn test_record_expiry_boundary() {
        let key = IdempotencyKey::parse(Some("k1")).unwrap();
        let now = Utc::now();
        let record = IdempotencyRecord::new(
            &key,
            UserId::new(),
            &Receipt {
                trace_id: "t".into(),
                amount_paid: 1,
            },
            now,
            Duration::seconds(60),
        )
        .unwrap();

        assert!(!record.is_expired(now));
        assert!(!record.is_expired(now + Duration::seconds(59)));
        assert!(record.is_expired(now + Duration::seconds(60)));
    }

    #[test]
    fn test_cached_response_round_trips_exact_text() {
        let receipt = Receipt {
            trace_id: "abc".into(),
            amount_paid: 50_000,
        };
        let key = IdempotencyKey::parse(Some("k2")).unwrap();
        let record =
            IdempotencyRecord::new(&key, UserId::new(), &receipt, Utc::now(), Duration::hours(24))
                .unwrap();

        assert_eq!(
            record.cached_response,
            r#"{"trace_id":"abc","amount_paid":50000}"#
        );
        let decoded: Receipt = record.response().unwrap();
        assert_eq!(decoded, receipt);
        assert_eq!(encode_response(&decoded).unwrap(), record.cached_response);
    }

    #[test]
    fn test_decode_mismatch_is_serialization_error() {
        let result: Result<Receipt, _> = decode_response("{\"unexpected\":true}");
        assert!(matches!(result, Err(IdempotencyError::Serialization(_))));
    }

    #[test]
    fn test_ttl_from_secs() {
        assert_eq!(ttl_from_secs(86_400), Duration::hours(24));
        assert_eq!(ttl_from_secs(u64::MAX), Duration::MAX);
    }
}
