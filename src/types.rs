//! Common types shared by the ledger client and the signing pipeline

use serde::{Deserialize, Serialize};
use solana_sdk::{hash::Hash, pubkey::Pubkey};

/// Minimum balance (in lamports) the signer must hold before anything is signed.
/// Covers the network fee plus a safety margin for rent and priority fees.
pub const MIN_RESERVE_LAMPORTS: u64 = 5_000_000;

/// Fresh recent blockhash and the last block height at which it is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityToken {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Account balance observed at a point in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub wallet: Pubkey,
    pub lamports: u64,
}

impl BalanceSnapshot {
    /// Signed lamport change from `self` to `later`
    pub fn change_to(&self, later: &BalanceSnapshot) -> i64 {
        later.lamports as i64 - self.lamports as i64
    }
}

/// Which of the two wire formats a transaction was decoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionFormat {
    Legacy,
    Versioned,
}

impl std::fmt::Display for TransactionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionFormat::Legacy => write!(f, "legacy"),
            TransactionFormat::Versioned => write!(f, "versioned"),
        }
    }
}

/// State of a submitted signature as reported by the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureState {
    /// Known to the node but not yet at the requested commitment
    Processing,
    /// Reached the requested commitment and executed without error
    Landed,
    /// Reached the requested commitment with an execution error
    Errored(String),
}

/// Terminal classification of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Confirmed,
    Failed(String),
    /// Local confirmation timeout elapsed; the transaction may still land
    TimedOut,
    /// The caller's request budget ran out before the timeout did
    Pending,
}

impl ConfirmationOutcome {
    /// Wire name used in the response `confirmationStatus` field
    pub fn as_status(&self) -> &'static str {
        match self {
            ConfirmationOutcome::Confirmed => "confirmed",
            ConfirmationOutcome::Failed(_) => "failed",
            ConfirmationOutcome::TimedOut => "timeout",
            ConfirmationOutcome::Pending => "pending",
        }
    }
}
