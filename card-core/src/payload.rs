//! Daily log payloads carried in the page query string.
//!
//! Two encodings are accepted:
//!
//! - legacy: a URL-encoded JSON object under `data`
//! - secure: an encrypted envelope split across `secure` (ciphertext),
//!   `t` (timestamp) and `u` (user id)
//!
//! Decryption is delegated to a [`PayloadDecryptor`]. Whatever goes wrong,
//! [`load_daily_log`] falls back to the built-in sample data.

use chrono::NaiveDate;
use percent_encoding::percent_decode_str;
use serde::Deserialize;

use crate::{CardError, CardResult, DailyLogData};

/// Encrypted payload parameters taken from the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureRequest {
    /// Base64 ciphertext.
    pub ciphertext: String,
    /// Timestamp the payload key was derived with.
    pub timestamp: i64,
    /// User the payload was issued to.
    pub user_id: String,
}

/// Which payload form, if any, the query string carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadSource {
    /// No payload parameters present.
    None,
    /// Plain JSON under `data`.
    Legacy(String),
    /// Encrypted envelope.
    Secure(SecureRequest),
    /// Parameters present but unusable.
    Malformed(String),
}

impl PayloadSource {
    /// Classify a query string (with or without the leading `?`).
    ///
    /// The secure form wins when all three of its keys are present.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);

        let mut secure = None;
        let mut timestamp = None;
        let mut user_id = None;
        let mut data = None;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "secure" => &mut secure,
                "t" => &mut timestamp,
                "u" => &mut user_id,
                "data" => &mut data,
                _ => continue,
            };
            if slot.is_none() && !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }

        if let (Some(ciphertext), Some(timestamp), Some(user_id)) = (secure, timestamp, user_id) {
            return match timestamp.trim().parse::<i64>() {
                Ok(timestamp) => Self::Secure(SecureRequest {
                    ciphertext: percent_decode_lossy(&ciphertext),
                    timestamp,
                    user_id,
                }),
                Err(_) => Self::Malformed(format!("timestamp '{timestamp}' is not an integer")),
            };
        }

        match data {
            Some(raw) => Self::Legacy(raw),
            None => Self::None,
        }
    }
}

/// Decrypts secure payloads. Implemented outside this crate.
pub trait PayloadDecryptor {
    /// Decrypt a secure request into its JSON envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the ciphertext cannot be decrypted.
    fn decrypt(&self, request: &SecureRequest) -> CardResult<serde_json::Value>;
}

/// Decrypted secure envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureEnvelope {
    /// User the payload belongs to.
    pub user_id: String,
    /// Issuing session.
    pub session_id: String,
    /// Issue time in epoch milliseconds.
    pub timestamp: i64,
    /// Expiry time in epoch milliseconds.
    pub expires_at: i64,
    /// Flat daily log payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl SecureEnvelope {
    /// Check structure, freshness and ownership.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is empty, the envelope has
    /// expired, its timestamp lies in the future, or it was issued to a
    /// different user.
    pub fn validate(&self, expected_user: &str, now_ms: i64) -> CardResult<()> {
        if self.user_id.is_empty()
            || self.session_id.is_empty()
            || self.timestamp == 0
            || self.expires_at == 0
        {
            return Err(CardError::Decode("envelope is missing required fields".to_string()));
        }
        if now_ms > self.expires_at {
            return Err(CardError::Expired(format!("expired at {}", self.expires_at)));
        }
        if self.timestamp > now_ms {
            return Err(CardError::Expired(format!(
                "timestamp {} is in the future",
                self.timestamp
            )));
        }
        if self.user_id != expected_user {
            return Err(CardError::Unauthorized {
                expected: expected_user.to_string(),
                found: self.user_id.clone(),
            });
        }
        Ok(())
    }
}

/// Where the displayed data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    /// Built-in sample.
    Sample,
    /// Legacy `data` parameter.
    Legacy,
    /// Decrypted secure envelope.
    Secure,
}

/// Result of resolving the page's payload.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedLog {
    /// Data to display.
    pub data: DailyLogData,
    /// Where it came from.
    pub origin: DataOrigin,
}

/// Resolve the daily log for a query string, never failing.
///
/// Decode, decryption and validation failures are logged and replaced by
/// [`DailyLogData::sample`].
#[must_use]
pub fn load_daily_log(
    query: &str,
    decryptor: Option<&dyn PayloadDecryptor>,
    today: NaiveDate,
    now_ms: i64,
) -> LoadedLog {
    match try_load(PayloadSource::from_query(query), decryptor, today, now_ms) {
        Ok(Some(loaded)) => {
            tracing::info!("Loaded daily log from {:?} payload", loaded.origin);
            loaded
        }
        Ok(None) => {
            tracing::debug!("No payload in query, using sample data");
            sample(today)
        }
        Err(e) => {
            tracing::warn!("Failed to load payload, using sample data: {e}");
            sample(today)
        }
    }
}

fn sample(today: NaiveDate) -> LoadedLog {
    LoadedLog {
        data: DailyLogData::sample(today),
        origin: DataOrigin::Sample,
    }
}

fn try_load(
    source: PayloadSource,
    decryptor: Option<&dyn PayloadDecryptor>,
    today: NaiveDate,
    now_ms: i64,
) -> CardResult<Option<LoadedLog>> {
    match source {
        PayloadSource::None => Ok(None),
        PayloadSource::Malformed(reason) => Err(CardError::Decode(reason)),
        PayloadSource::Legacy(raw) => {
            tracing::warn!("Using legacy unencrypted payload format");
            let value = parse_legacy(&raw)?;
            Ok(Some(LoadedLog {
                data: DailyLogData::from_payload(&value, today)?,
                origin: DataOrigin::Legacy,
            }))
        }
        PayloadSource::Secure(request) => {
            let decryptor = decryptor.ok_or_else(|| {
                CardError::Decryption("no decryptor available for secure payload".to_string())
            })?;
            let envelope: SecureEnvelope = serde_json::from_value(decryptor.decrypt(&request)?)?;
            envelope.validate(&request.user_id, now_ms)?;
            tracing::debug!(
                "Secure payload for session {} expires at {}",
                envelope.session_id,
                envelope.expires_at
            );
            Ok(Some(LoadedLog {
                data: DailyLogData::from_payload(&envelope.data, today)?,
                origin: DataOrigin::Secure,
            }))
        }
    }
}

/// The query layer already decoded once; producers sometimes encode twice.
fn parse_legacy(raw: &str) -> CardResult<serde_json::Value> {
    serde_json::from_str(raw).or_else(|_| Ok(serde_json::from_str(&percent_decode_lossy(raw))?))
}

fn percent_decode_lossy(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}
