//! Request and response documents
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::TransactionFormat;

/// Incoming signing request
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    /// Base64 wire bytes of the unsigned transaction
    pub transaction: String,
    /// Base58 secret key (64-byte keypair or 32-byte seed)
    pub private_key: String,
    /// Opaque caller data, echoed back untouched
    #[serde(default)]
    pub metadata: Value,
}

impl std::fmt::Debug for SignRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignRequest")
            .field("transaction_len", &self.transaction.len())
            .field("private_key", &"<redacted>")
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Outgoing response. Absent fields are omitted from the JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_before: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_change: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_valid_block_height: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_format: Option<TransactionFormat>,
    /// Set on every pipeline response, `failed` when the request never reached the chain
    pub confirmation_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<Value>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}
