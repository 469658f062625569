//! Structured logging bound to one signing request

use solana_sdk::pubkey::Pubkey;
use uuid::Uuid;

use crate::types::{ConfirmationOutcome, TransactionFormat};

/// Structured logger for pipeline events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    request_id: String,
}

impl StructuredLogger {
    /// Logger with a fresh request id
    pub fn new_request() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn new(request_id: String) -> Self {
        Self { request_id }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn log_request_received(&self, wallet: &Pubkey, payload_len: usize) {
        tracing::info!(
            request_id = %self.request_id,
            wallet = %wallet,
            payload_len = %payload_len,
            "Signing request received"
        );
    }

    pub fn log_decoded(&self, format: TransactionFormat, accounts: usize, signers: usize) {
        tracing::debug!(
            request_id = %self.request_id,
            format = %format,
            accounts = %accounts,
            required_signers = %signers,
            "Transaction decoded"
        );
    }

    pub fn log_stage(&self, stage: &str, latency_ms: u64) {
        tracing::debug!(
            request_id = %self.request_id,
            stage = %stage,
            latency_ms = %latency_ms,
            "Stage complete"
        );
    }

    pub fn log_submitted(&self, signature: &str, last_valid_block_height: u64) {
        tracing::info!(
            request_id = %self.request_id,
            signature = %signature,
            last_valid_block_height = %last_valid_block_height,
            "Transaction submitted"
        );
    }

    pub fn log_outcome(&self, signature: &str, outcome: &ConfirmationOutcome, latency_ms: u64) {
        tracing::info!(
            request_id = %self.request_id,
            signature = %signature,
            outcome = %outcome.as_status(),
            latency_ms = %latency_ms,
            "Request settled"
        );
    }

    pub fn log_failure(&self, category: &str, error: &str, latency_ms: u64) {
        tracing::warn!(
            request_id = %self.request_id,
            category = %category,
            error = %error,
            latency_ms = %latency_ms,
            "Signing request failed"
        );
    }
}
