//! Key material for one signing request
//!
//! The secret key arrives base58-encoded in the request. It is imported once,
//! owned by the request, and dropped when the request completes.

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    signer::keypair::keypair_from_seed,
};
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyMaterialError {
    #[error("Private key is not valid base58")]
    InvalidBase58,

    #[error("Invalid keypair length: expected 32 or 64 bytes, got {0}")]
    InvalidLength(usize),

    #[error("Invalid keypair: all-zero key rejected")]
    AllZero,

    #[error("Invalid keypair bytes: {0}")]
    InvalidBytes(String),
}

/// Signing key for a single request. `Debug` never prints the secret.
pub struct KeyMaterial {
    keypair: Keypair,
}

impl KeyMaterial {
    /// Import from a base58 string holding either a 64-byte keypair
    /// (secret || public) or a 32-byte secret seed
    pub fn from_base58(encoded: &str) -> Result<Self, KeyMaterialError> {
        let bytes = Zeroizing::new(
            bs58::decode(encoded.trim())
                .into_vec()
                .map_err(|_| KeyMaterialError::InvalidBase58)?,
        );
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyMaterialError> {
        if bytes.iter().all(|&b| b == 0) {
            return Err(if bytes.is_empty() {
                KeyMaterialError::InvalidLength(0)
            } else {
                KeyMaterialError::AllZero
            });
        }

        let keypair = match bytes.len() {
            64 => Keypair::try_from(bytes)
                .map_err(|e| KeyMaterialError::InvalidBytes(e.to_string()))?,
            32 => keypair_from_seed(bytes)
                .map_err(|e| KeyMaterialError::InvalidBytes(e.to_string()))?,
            other => return Err(KeyMaterialError::InvalidLength(other)),
        };

        Ok(Self { keypair })
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Sign arbitrary message bytes
    pub fn sign_message(&self, message: &[u8]) -> Signature {
        self.keypair.sign_message(message)
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("pubkey", &self.keypair.pubkey())
            .finish_non_exhaustive()
    }
}
