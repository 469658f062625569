//! Signing pipeline
//!
//! One request flows strictly in order:
//!
//! ```text
//! base64 -> decode -> refresh blockhash -> balance guard -> sign -> submit -> confirm
//! ```
//!
//! Any fatal stage error aborts the request with a structured error response.
//! Once a signature exists the request reports it, whatever the confirmation
//! outcome turns out to be.

use serde_json::json;
use solana_sdk::commitment_config::CommitmentConfig;
use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use zeroize::Zeroizing;

use crate::config::{Config, ExplorerConfig};
use crate::ledger::{LedgerClient, RetryConfig};
use crate::metrics::{Metrics, Timer};
use crate::structured_logging::StructuredLogger;
use crate::types::ConfirmationOutcome;
use crate::wallet::KeyMaterial;

// Submodules
pub mod confirm;
pub mod decoder;
pub mod errors;
pub mod inspector;
pub mod output;
pub mod preflight;
pub mod refresh;
pub mod signer;
pub mod submit;

// Re-exports for convenience
pub use confirm::{requery_balance, ConfirmationTracker};
pub use decoder::{decode_base64_transaction, decode_transaction, DecodeStrategy};
pub use errors::PipelineError;
pub use inspector::{inspect_account_roles, AccountRoleEntry, AccountRoleReport};
pub use output::{SignRequest, SignResponse};
pub use preflight::check_balance_sufficient;
pub use refresh::refresh_validity_token;
pub use signer::sign_envelope;
pub use submit::Submitter;

/// Runs signing requests against one ledger client.
///
/// Stateless between requests; the same pipeline can serve any number of them.
pub struct SigningPipeline<'a, L: LedgerClient + ?Sized> {
    ledger: &'a L,
    metrics: &'a Metrics,
    commitment: CommitmentConfig,
    retry: RetryConfig,
    min_balance: u64,
    submitter: Submitter,
    tracker: ConfirmationTracker,
    request_budget: Duration,
    response_margin: Duration,
    explorer: ExplorerConfig,
}

impl<'a, L: LedgerClient + ?Sized> SigningPipeline<'a, L> {
    pub fn new(ledger: &'a L, metrics: &'a Metrics, config: &Config) -> Self {
        Self {
            ledger,
            metrics,
            commitment: config.rpc.commitment.to_commitment_config(),
            retry: config.submission.retry_config(),
            min_balance: config.preflight.min_balance_lamports,
            submitter: Submitter::new(
                config.submission.submit_options(),
                config.submission.retry_config(),
            ),
            tracker: ConfirmationTracker::from_config(&config.confirmation),
            request_budget: config.pipeline.request_budget(),
            response_margin: config.pipeline.response_margin(),
            explorer: config.explorer.clone(),
        }
    }

    /// Execute one request end to end and build its response
    pub async fn execute(&self, request: SignRequest) -> SignResponse {
        let started = Instant::now();
        let deadline = started + self.request_budget;
        let logger = StructuredLogger::new_request();
        self.metrics.requests_total.inc();

        let mut response = SignResponse {
            metadata: request.metadata.clone(),
            ..SignResponse::default()
        };

        let result = self.run(request, &logger, deadline, &mut response).await;
        let latency_ms = started.elapsed().as_millis() as u64;
        self.metrics
            .request_latency
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(outcome) => {
                self.metrics.record_outcome(outcome.as_status());
                response.confirmation_status = Some(outcome.as_status().to_string());
                if let ConfirmationOutcome::Failed(detail) = &outcome {
                    response.success = false;
                    response.error = Some(format!("Transaction failed on chain: {}", detail));
                    response.error_detail = Some(json!({
                        "kind": "on_chain_failure",
                        "error": detail,
                    }));
                    self.metrics.requests_failed.inc();
                } else {
                    response.success = true;
                    self.metrics.requests_success.inc();
                }
                if let Some(signature) = &response.signature {
                    logger.log_outcome(signature, &outcome, latency_ms);
                }
            }
            Err(err) => {
                logger.log_failure(err.category(), &err.to_string(), latency_ms);
                self.metrics.record_error(err.category());
                self.metrics.requests_failed.inc();
                response.success = false;
                response.confirmation_status = Some("failed".to_string());
                response.error = Some(err.to_string());
                response.error_detail = Some(err.detail());
            }
        }

        response
    }

    async fn run(
        &self,
        request: SignRequest,
        logger: &StructuredLogger,
        deadline: Instant,
        response: &mut SignResponse,
    ) -> Result<ConfirmationOutcome, PipelineError> {
        let SignRequest {
            transaction,
            private_key,
            ..
        } = request;
        let secret = Zeroizing::new(private_key);
        // Every ledger call must settle before this, leaving the margin for the response
        let ledger_deadline = deadline
            .checked_sub(self.response_margin)
            .unwrap_or_else(Instant::now);

        let timer = Timer::new("decode");
        let mut envelope = decode_base64_transaction(&transaction)?;
        let format = envelope.format().to_string();
        self.metrics
            .decode_format
            .with_label_values(&[format.as_str()])
            .inc();
        response.transaction_format = Some(envelope.format());
        logger.log_decoded(
            envelope.format(),
            envelope.account_keys().len(),
            envelope.num_required_signatures(),
        );
        logger.log_stage("decode", timer.finish(self.metrics));

        let key = KeyMaterial::from_base58(&secret)?;
        drop(secret);
        let wallet = key.pubkey();
        response.wallet = Some(wallet.to_string());
        logger.log_request_received(&wallet, transaction.len());

        let timer = Timer::new("refresh");
        let token = within_budget(
            "refresh",
            ledger_deadline,
            refresh_validity_token(&mut envelope, self.ledger, self.commitment, &self.retry),
        )
        .await?;
        response.last_valid_block_height = Some(token.last_valid_block_height);
        logger.log_stage("refresh", timer.finish(self.metrics));

        let timer = Timer::new("preflight");
        let before = within_budget(
            "preflight",
            ledger_deadline,
            check_balance_sufficient(
                self.ledger,
                &wallet,
                self.min_balance,
                self.commitment,
                &self.retry,
            ),
        )
        .await?;
        response.balance_before = Some(before.lamports);
        logger.log_stage("preflight", timer.finish(self.metrics));

        let timer = Timer::new("sign");
        let signature = sign_envelope(&mut envelope, &key)?;
        drop(key);
        logger.log_stage("sign", timer.finish(self.metrics));

        let timer = Timer::new("submit");
        let accepted = within_budget(
            "submit",
            ledger_deadline,
            self.submitter.submit(self.ledger, &envelope),
        )
        .await?;
        if accepted != signature {
            tracing::warn!(
                local = %signature,
                node = %accepted,
                "Node reported a different signature than the one produced locally"
            );
        }
        self.metrics.submissions_total.inc();
        let signature_text = accepted.to_string();
        logger.log_submitted(&signature_text, token.last_valid_block_height);
        response.explorer_url = Some(self.explorer.transaction_url(&signature_text));
        response.signature = Some(signature_text);
        logger.log_stage("submit", timer.finish(self.metrics));

        let timer = Timer::new("confirm");
        let outcome = self
            .tracker
            .wait_for_outcome(self.ledger, &accepted, Some(ledger_deadline))
            .await;
        logger.log_stage("confirm", timer.finish(self.metrics));

        if let Some(after) =
            requery_balance(self.ledger, &wallet, self.commitment, ledger_deadline).await
        {
            response.balance_after = Some(after.lamports);
            response.balance_change = Some(before.change_to(&after));
        }

        Ok(outcome)
    }
}

/// Run one ledger-bound stage, abandoning it once `deadline` passes
async fn within_budget<T, F>(
    stage: &'static str,
    deadline: Instant,
    stage_future: F,
) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    timeout_at(deadline, stage_future)
        .await
        .map_err(|_| PipelineError::BudgetExhausted { stage })?
}
