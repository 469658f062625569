//! Swap Signer Library
//!
//! Signs and submits unsigned swap transactions produced by the Jupiter
//! routing service, in either Solana wire format, and reports their
//! settlement status.

pub mod config;
pub mod envelope;
pub mod ledger;
pub mod metrics;
pub mod pipeline;
pub mod structured_logging;
pub mod types;
pub mod wallet;

pub mod test_utils;

// Re-export commonly used types
pub use envelope::TransactionEnvelope;
pub use pipeline::{PipelineError, SignRequest, SignResponse, SigningPipeline};
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
