//! Submitter
use solana_sdk::signature::Signature;
use tracing::{info, warn};

use super::errors::PipelineError;
use crate::envelope::TransactionEnvelope;
use crate::ledger::{retry_with_backoff, LedgerClient, LedgerError, RetryConfig, SubmitOptions};

/// Sends a signed envelope to the node
#[derive(Debug, Clone)]
pub struct Submitter {
    options: SubmitOptions,
    retry: RetryConfig,
}

impl Submitter {
    pub fn new(options: SubmitOptions, retry: RetryConfig) -> Self {
        Self { options, retry }
    }

    /// Serialize in the envelope's own format and submit.
    ///
    /// Transient ledger errors are retried with backoff. A node rejection is
    /// surfaced as [`PipelineError::SubmissionRejected`] on first sight.
    pub async fn submit<L>(
        &self,
        ledger: &L,
        envelope: &TransactionEnvelope,
    ) -> Result<Signature, PipelineError>
    where
        L: LedgerClient + ?Sized,
    {
        let wire_bytes = envelope.to_wire_bytes()?;

        let result = retry_with_backoff("send_transaction", &self.retry, || {
            ledger.submit(&wire_bytes, &self.options)
        })
        .await;

        match result {
            Ok(signature) => {
                info!(
                    signature = %signature,
                    bytes = wire_bytes.len(),
                    skip_preflight = self.options.skip_preflight,
                    "Transaction submitted"
                );
                Ok(signature)
            }
            Err(LedgerError::Rejected(rejection)) => {
                warn!(
                    code = rejection.code,
                    message = %rejection.message,
                    logs = rejection.logs.len(),
                    "Node rejected transaction"
                );
                Err(PipelineError::SubmissionRejected(rejection))
            }
            Err(err) => Err(err.into()),
        }
    }
}
