//! Server-side records shown by the client
//!
//! The API returns table rows as positional arrays; every struct here also
//! accepts keyed objects, so either shape deserializes.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// Server verdict for a submitted transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    #[serde(default)]
    pub status: Option<String>,
    /// Absent or false means the transaction was accepted normally
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub fraud_flag: bool,
}

/// A transaction as stored by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerTransaction {
    pub id: i64,
    pub user_id: Option<String>,
    /// Encrypted payload, opaque to the client
    pub data: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub fraud_flag: bool,
    pub timestamp: Option<String>,
}

/// One block of the server's ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerBlock {
    pub id: i64,
    pub block_hash: String,
    #[serde(default)]
    pub prev_hash: Option<String>,
    pub data: Option<String>,
    pub timestamp: Option<String>,
}

/// Accept `true`/`false`, `0`/`1` or null
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    match value {
        None | Some(JsonValue::Null) => Ok(false),
        Some(JsonValue::Bool(b)) => Ok(b),
        Some(JsonValue::Number(n)) => Ok(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
        Some(other) => Err(D::Error::custom(format!(
            "expected boolean or number for fraud_flag, got {}",
            other
        ))),
    }
}
