//! Error types for the signing pipeline
//!
//! Every fatal condition aborts the pipeline immediately. Each variant carries
//! enough structured detail to diagnose the failure without re-running it:
//! both decode errors, the observed balance, the unmatched signer accounts, or
//! the node's rejection payload.
//!
//! Confirmation timeouts and on-chain execution failures are not errors here.
//! They are terminal [`ConfirmationOutcome`](crate::types::ConfirmationOutcome)s
//! reported alongside the submitted signature.

use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::ledger::{LedgerError, NodeRejection};
use crate::wallet::KeyMaterialError;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The transaction field is not valid base64
    #[error("Invalid transaction encoding: {0}")]
    InvalidEncoding(String),

    /// The private key could not be imported
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(#[from] KeyMaterialError),

    /// Neither wire format parsed. No network call has been made.
    #[error("Malformed transaction (versioned: {versioned}; legacy: {legacy})")]
    MalformedTransaction { versioned: String, legacy: String },

    /// Balance below the reserve floor. Nothing has been signed or sent.
    #[error("Insufficient funds: balance {balance} lamports, required {required}")]
    InsufficientFunds { balance: u64, required: u64 },

    /// The transaction needs signatures from keys this request does not hold
    #[error("Additional signers required: {}", format_keys(.unmatched))]
    AdditionalSignersRequired { unmatched: Vec<Pubkey> },

    /// The node refused the transaction
    #[error("Submission rejected: {0}")]
    SubmissionRejected(NodeRejection),

    /// Signing or serialization failed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The request budget ran out while a ledger call was still outstanding
    #[error("Request budget exhausted during {stage}")]
    BudgetExhausted { stage: &'static str },

    /// Ledger access failed (after retries, where retries apply)
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

fn format_keys(keys: &[Pubkey]) -> String {
    keys.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PipelineError {
    /// Check if this error is potentially retryable by the caller
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Ledger(err) => err.is_retryable(),
            Self::BudgetExhausted { .. } => true,

            Self::InvalidEncoding(_) => false,
            Self::InvalidKeyMaterial(_) => false,
            Self::MalformedTransaction { .. } => false,
            Self::InsufficientFunds { .. } => false,
            Self::AdditionalSignersRequired { .. } => false,
            Self::SubmissionRejected(_) => false,
            Self::Signing(_) => false,
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidEncoding(_) => "encoding",
            Self::InvalidKeyMaterial(_) => "key_material",
            Self::MalformedTransaction { .. } => "malformed_transaction",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::AdditionalSignersRequired { .. } => "additional_signers",
            Self::SubmissionRejected(_) => "submission_rejected",
            Self::Signing(_) => "signing",
            Self::BudgetExhausted { .. } => "budget_exhausted",
            Self::Ledger(_) => "ledger",
        }
    }

    /// Structured diagnostics for the response `errorDetail` field
    pub fn detail(&self) -> Value {
        match self {
            Self::MalformedTransaction { versioned, legacy } => json!({
                "kind": self.category(),
                "versionedError": versioned,
                "legacyError": legacy,
            }),
            Self::InsufficientFunds { balance, required } => json!({
                "kind": self.category(),
                "balance": balance,
                "required": required,
            }),
            Self::AdditionalSignersRequired { unmatched } => json!({
                "kind": self.category(),
                "unmatchedSigners": unmatched.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
            }),
            Self::SubmissionRejected(rejection) => json!({
                "kind": self.category(),
                "rejection": rejection,
            }),
            Self::BudgetExhausted { stage } => json!({
                "kind": self.category(),
                "stage": stage,
            }),
            Self::Ledger(err) => json!({
                "kind": self.category(),
                "endpoint": err.endpoint(),
                "retryable": err.is_retryable(),
            }),
            _ => json!({ "kind": self.category() }),
        }
    }
}

impl From<bincode::Error> for PipelineError {
    fn from(err: bincode::Error) -> Self {
        Self::Signing(format!("Serialization failed: {}", err))
    }
}
