//! Ledger node access
//!
//! The signing pipeline talks to the RPC node only through the [`LedgerClient`]
//! trait. The production implementation wraps the nonblocking `RpcClient`;
//! tests substitute a recording double (see `test_utils`).

use async_trait::async_trait;
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    pubkey::Pubkey,
    signature::Signature,
};

use crate::types::{SignatureState, ValidityToken};

// Submodules
pub mod ledger_errors;
pub mod retry;
pub mod rpc_ledger;

// Re-exports for convenience
pub use ledger_errors::{LedgerError, LedgerResult, NodeRejection};
pub use retry::{retry_with_backoff, RetryConfig};
pub use rpc_ledger::RpcLedgerClient;

/// Options forwarded to the node's `sendTransaction` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Skip node-side simulation before accepting the transaction
    pub skip_preflight: bool,
    /// Commitment used for the node-side simulation
    pub preflight_commitment: CommitmentLevel,
    /// Node-side rebroadcast limit; `None` leaves it to the node
    pub node_max_retries: Option<usize>,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            skip_preflight: true,
            preflight_commitment: CommitmentLevel::Confirmed,
            node_max_retries: None,
        }
    }
}

/// Operations the pipeline needs from a ledger node
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Endpoint label used in logs and errors
    fn endpoint(&self) -> &str;

    /// Balance in lamports
    async fn get_balance(&self, pubkey: &Pubkey, commitment: CommitmentConfig) -> LedgerResult<u64>;

    /// Latest blockhash together with its expiry height
    async fn get_latest_validity_token(
        &self,
        commitment: CommitmentConfig,
    ) -> LedgerResult<ValidityToken>;

    /// Submit serialized transaction bytes; returns the signature the node accepted
    async fn submit(&self, wire_bytes: &[u8], options: &SubmitOptions) -> LedgerResult<Signature>;

    /// Current status of a signature, `None` if the node has not seen it
    async fn get_signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> LedgerResult<Option<SignatureState>>;
}
