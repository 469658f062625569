//! Confirmation tracker
//!
//! Polls the node for the submitted signature until it settles, the local
//! timeout elapses, or the caller's request budget is about to run out.
//! Every end state is a [`ConfirmationOutcome`]; nothing here is an error.

use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature};
use std::time::Duration;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::config::ConfirmationConfig;
use crate::ledger::LedgerClient;
use crate::types::{BalanceSnapshot, ConfirmationOutcome, SignatureState};

#[derive(Debug, Clone)]
pub struct ConfirmationTracker {
    commitment: CommitmentConfig,
    timeout: Duration,
    poll_interval: Duration,
}

impl ConfirmationTracker {
    pub fn new(commitment: CommitmentConfig, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            commitment,
            timeout,
            poll_interval,
        }
    }

    pub fn from_config(config: &ConfirmationConfig) -> Self {
        Self::new(
            config.commitment.to_commitment_config(),
            config.timeout(),
            config.poll_interval(),
        )
    }

    /// Poll until the signature reaches a terminal state.
    ///
    /// `budget_deadline` is the instant by which the caller needs an answer.
    /// When the next poll would land past it (and before the local timeout),
    /// the tracker stops and reports [`ConfirmationOutcome::Pending`]. A poll
    /// still outstanding at either limit is abandoned.
    pub async fn wait_for_outcome<L>(
        &self,
        ledger: &L,
        signature: &Signature,
        budget_deadline: Option<Instant>,
    ) -> ConfirmationOutcome
    where
        L: LedgerClient + ?Sized,
    {
        let started = Instant::now();
        let give_up_at = started + self.timeout;
        let mut polls: u32 = 0;

        let budget_first = budget_deadline.is_some_and(|deadline| deadline < give_up_at);
        let poll_limit = match budget_deadline {
            Some(deadline) if budget_first => deadline,
            _ => give_up_at,
        };

        loop {
            polls += 1;
            let status = match timeout_at(
                poll_limit,
                ledger.get_signature_status(signature, self.commitment),
            )
            .await
            {
                Ok(status) => status,
                Err(_) if budget_first => {
                    info!(
                        signature = %signature,
                        polls,
                        "Request budget exhausted during status poll, reporting pending"
                    );
                    return ConfirmationOutcome::Pending;
                }
                Err(_) => {
                    warn!(
                        signature = %signature,
                        polls,
                        timeout_secs = self.timeout.as_secs(),
                        "Confirmation timed out during status poll"
                    );
                    return ConfirmationOutcome::TimedOut;
                }
            };

            match status {
                Ok(Some(SignatureState::Landed)) => {
                    info!(
                        signature = %signature,
                        polls,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Transaction confirmed"
                    );
                    return ConfirmationOutcome::Confirmed;
                }
                Ok(Some(SignatureState::Errored(detail))) => {
                    warn!(signature = %signature, error = %detail, "Transaction failed on chain");
                    return ConfirmationOutcome::Failed(detail);
                }
                Ok(Some(SignatureState::Processing)) | Ok(None) => {
                    debug!(signature = %signature, polls, "Not yet at requested commitment");
                }
                Err(err) => {
                    warn!(signature = %signature, error = %err, "Status poll failed, continuing");
                }
            }

            let now = Instant::now();
            if now >= give_up_at {
                warn!(
                    signature = %signature,
                    polls,
                    timeout_secs = self.timeout.as_secs(),
                    "Confirmation timed out"
                );
                return ConfirmationOutcome::TimedOut;
            }

            let wake = (now + self.poll_interval).min(give_up_at);
            if let Some(deadline) = budget_deadline {
                if wake > deadline {
                    info!(
                        signature = %signature,
                        polls,
                        "Request budget exhausted before confirmation, reporting pending"
                    );
                    return ConfirmationOutcome::Pending;
                }
            }

            sleep_until(wake).await;
        }
    }
}

/// Read the balance once more after settlement.
///
/// Failure is logged and yields `None`; it never changes the request outcome.
/// Skipped once `deadline` has passed, and abandoned if still outstanding at it.
pub async fn requery_balance<L>(
    ledger: &L,
    wallet: &Pubkey,
    commitment: CommitmentConfig,
    deadline: Instant,
) -> Option<BalanceSnapshot>
where
    L: LedgerClient + ?Sized,
{
    if Instant::now() >= deadline {
        debug!(wallet = %wallet, "No budget left for post-submission balance query");
        return None;
    }

    match timeout_at(deadline, ledger.get_balance(wallet, commitment)).await {
        Ok(Ok(lamports)) => Some(BalanceSnapshot {
            wallet: *wallet,
            lamports,
        }),
        Ok(Err(err)) => {
            warn!(wallet = %wallet, error = %err, "Post-submission balance query failed");
            None
        }
        Err(_) => {
            warn!(wallet = %wallet, "Post-submission balance query outlived the request budget");
            None
        }
    }
}
