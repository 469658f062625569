//! Preflight balance guard
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use tracing::{info, warn};

use super::errors::PipelineError;
use crate::ledger::{retry_with_backoff, LedgerClient, RetryConfig};
use crate::types::BalanceSnapshot;

/// Refuse to sign unless `wallet` holds at least `required` lamports.
///
/// Runs before any signature is produced, so a failure here leaves nothing
/// signed and nothing sent. The returned snapshot is the `balanceBefore`
/// reported to the caller.
pub async fn check_balance_sufficient<L>(
    ledger: &L,
    wallet: &Pubkey,
    required: u64,
    commitment: CommitmentConfig,
    retry: &RetryConfig,
) -> Result<BalanceSnapshot, PipelineError>
where
    L: LedgerClient + ?Sized,
{
    let lamports = retry_with_backoff("get_balance", retry, || {
        ledger.get_balance(wallet, commitment)
    })
    .await?;

    if lamports < required {
        warn!(
            wallet = %wallet,
            balance = lamports,
            required = required,
            "Insufficient balance for swap"
        );
        return Err(PipelineError::InsufficientFunds {
            balance: lamports,
            required,
        });
    }

    info!(wallet = %wallet, balance = lamports, "Balance check passed");
    Ok(BalanceSnapshot {
        wallet: *wallet,
        lamports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockLedger;
    use crate::types::MIN_RESERVE_LAMPORTS;

    async fn check(balance: u64) -> Result<BalanceSnapshot, PipelineError> {
        let ledger = MockLedger::new().with_balance(balance);
        check_balance_sufficient(
            &ledger,
            &Pubkey::new_unique(),
            MIN_RESERVE_LAMPORTS,
            CommitmentConfig::confirmed(),
            &RetryConfig::none(),
        )
        .await
    }

    #[tokio::test]
    async fn test_below_floor_rejected() {
        match check(4_000_000).await {
            Err(PipelineError::InsufficientFunds { balance, required }) => {
                assert_eq!(balance, 4_000_000);
                assert_eq!(required, 5_000_000);
            }
            other => panic!("Expected InsufficientFunds, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exact_floor_accepted() {
        let snapshot = check(MIN_RESERVE_LAMPORTS).await.unwrap();
        assert_eq!(snapshot.lamports, MIN_RESERVE_LAMPORTS);
    }

    #[tokio::test]
    async fn test_one_below_floor_rejected() {
        assert!(matches!(
            check(MIN_RESERVE_LAMPORTS - 1).await,
            Err(PipelineError::InsufficientFunds { .. })
        ));
    }

    #[tokio::test]
    async fn test_snapshot_names_wallet() {
        let wallet = Pubkey::new_unique();
        let ledger = MockLedger::new().with_balance(10_000_000);
        let snapshot = check_balance_sufficient(
            &ledger,
            &wallet,
            MIN_RESERVE_LAMPORTS,
            CommitmentConfig::confirmed(),
            &RetryConfig::none(),
        )
        .await
        .unwrap();
        assert_eq!(snapshot.wallet, wallet);
        assert_eq!(ledger.balance_calls(), 1);
    }
}
