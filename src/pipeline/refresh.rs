//! Validity refresher
//!
//! Quotes from the routing service carry a blockhash that may already be stale
//! by the time the request reaches us, so the blockhash is always replaced.

use solana_sdk::commitment_config::CommitmentConfig;
use tracing::{debug, info};

use super::errors::PipelineError;
use crate::envelope::TransactionEnvelope;
use crate::ledger::{retry_with_backoff, LedgerClient, RetryConfig};
use crate::types::ValidityToken;

/// Fetch the latest blockhash and overwrite the envelope's blockhash with it.
///
/// The overwrite is unconditional and applies to both variants.
pub async fn refresh_validity_token<L>(
    envelope: &mut TransactionEnvelope,
    ledger: &L,
    commitment: CommitmentConfig,
    retry: &RetryConfig,
) -> Result<ValidityToken, PipelineError>
where
    L: LedgerClient + ?Sized,
{
    let token = retry_with_backoff("get_latest_blockhash", retry, || {
        ledger.get_latest_validity_token(commitment)
    })
    .await?;

    debug!(
        previous = %envelope.recent_blockhash(),
        fresh = %token.blockhash,
        "Replacing recent blockhash"
    );
    envelope.set_recent_blockhash(token.blockhash);

    info!(
        blockhash = %token.blockhash,
        last_valid_block_height = token.last_valid_block_height,
        format = %envelope.format(),
        "Validity token refreshed"
    );

    Ok(token)
}
