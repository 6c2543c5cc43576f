//! Transaction domain model

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::result::{Error, Result};

/// Transaction fields as entered by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPayload {
    /// Amount, keeping the scale it was typed with
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub tx_type: String,
}

impl TransactionPayload {
    /// Validate raw form input
    ///
    /// This runs before any network call or queue write; a rejected payload
    /// never leaves the client.
    pub fn parse(amount: &str, tx_type: &str) -> Result<Self> {
        let amount = amount.trim();
        let tx_type = tx_type.trim();

        if amount.is_empty() {
            return Err(Error::validation("Amount is required"));
        }
        if tx_type.is_empty() {
            return Err(Error::validation("Transaction type is required"));
        }

        let amount = Decimal::from_str(amount)
            .map_err(|_| Error::validation(format!("Invalid amount: {}", amount)))?;
        if amount <= Decimal::ZERO {
            return Err(Error::validation("Amount must be greater than zero"));
        }

        Ok(Self {
            amount,
            tx_type: tx_type.to_string(),
        })
    }
}

/// A transaction captured on this client, waiting to be (or being) submitted
///
/// Built only through [`QueuedTransaction::capture`], which fixes the
/// timestamp string and hashes over exactly that string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedTransaction {
    pub user_id: String,
    pub payload: TransactionPayload,
    /// RFC 3339 UTC instant with millisecond precision
    pub timestamp: String,
    /// Lowercase hex SHA-256, tamper evidence only
    pub integrity_hash: String,
}

impl QueuedTransaction {
    /// Capture a transaction at the given instant
    pub fn capture(
        user_id: impl Into<String>,
        payload: TransactionPayload,
        captured_at: DateTime<Utc>,
    ) -> Self {
        let user_id = user_id.into();
        let timestamp = captured_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        let integrity_hash = Self::compute_integrity_hash(&user_id, &payload, &timestamp);

        Self {
            user_id,
            payload,
            timestamp,
            integrity_hash,
        }
    }

    /// Hash over user, amount, type and the persisted timestamp
    pub fn compute_integrity_hash(
        user_id: &str,
        payload: &TransactionPayload,
        timestamp: &str,
    ) -> String {
        let input = format!(
            "{}|{}|{}|{}",
            user_id, payload.amount, payload.tx_type, timestamp
        );
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Recompute the hash and compare with the stored one
    pub fn verify_integrity(&self) -> bool {
        !self.integrity_hash.is_empty()
            && Self::compute_integrity_hash(&self.user_id, &self.payload, &self.timestamp)
                == self.integrity_hash
    }

    /// Body for `POST /transaction`
    pub fn to_submission(&self) -> TransactionSubmission<'_> {
        TransactionSubmission {
            user_id: &self.user_id,
            data: &self.payload,
            timestamp: &self.timestamp,
            hash: &self.integrity_hash,
        }
    }
}

/// Wire form of a transaction submission
#[derive(Debug, Serialize)]
pub struct TransactionSubmission<'a> {
    pub user_id: &'a str,
    pub data: &'a TransactionPayload,
    pub timestamp: &'a str,
    pub hash: &'a str,
}

/// A queued transaction together with its store-assigned sequence number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    pub seq: i64,
    pub transaction: QueuedTransaction,
}
