//! Wire decoder
//!
//! Classifies an opaque byte buffer as a versioned or a legacy transaction.
//! Strategies are tried in a fixed order and their errors are accumulated;
//! the first strategy that succeeds decides the envelope variant.

use base64::{prelude::BASE64_STANDARD, Engine};
use bincode::Options;
use solana_sdk::{
    message::VersionedMessage,
    packet::PACKET_DATA_SIZE,
    transaction::{Transaction, VersionedTransaction},
};
use tracing::debug;

use super::errors::PipelineError;
use crate::envelope::TransactionEnvelope;

/// One way of reading the wire bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// Self-describing format: message starts with the version prefix
    Versioned,
    /// Implicit format: no version prefix
    Legacy,
}

/// Evaluation order. Versioned must come first: a legacy buffer can never
/// carry the version prefix, so it is rejected there and falls through.
pub const DECODE_ORDER: [DecodeStrategy; 2] = [DecodeStrategy::Versioned, DecodeStrategy::Legacy];

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_limit(PACKET_DATA_SIZE as u64)
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

impl DecodeStrategy {
    pub fn decode(self, bytes: &[u8]) -> Result<TransactionEnvelope, String> {
        let envelope = match self {
            DecodeStrategy::Versioned => {
                let tx: VersionedTransaction =
                    wire_options().deserialize(bytes).map_err(|e| e.to_string())?;
                if let VersionedMessage::Legacy(_) = tx.message {
                    return Err("missing version prefix".to_string());
                }
                TransactionEnvelope::Versioned(tx)
            }
            DecodeStrategy::Legacy => {
                let tx: Transaction =
                    wire_options().deserialize(bytes).map_err(|e| e.to_string())?;
                TransactionEnvelope::Legacy(tx)
            }
        };

        if !envelope.has_consistent_slots() {
            return Err(format!(
                "signature slot count {} does not match {} required signers",
                envelope.signatures().len(),
                envelope.num_required_signatures()
            ));
        }
        Ok(envelope)
    }
}

/// Decode raw transaction bytes into exactly one envelope variant.
///
/// On total failure both underlying parse errors are returned.
pub fn decode_transaction(bytes: &[u8]) -> Result<TransactionEnvelope, PipelineError> {
    let mut versioned_error = String::new();
    let mut legacy_error = String::new();

    for strategy in DECODE_ORDER {
        match strategy.decode(bytes) {
            Ok(envelope) => {
                debug!(
                    format = %envelope.format(),
                    accounts = envelope.account_keys().len(),
                    instructions = envelope.instructions().len(),
                    required_signers = envelope.num_required_signatures(),
                    "Transaction decoded"
                );
                return Ok(envelope);
            }
            Err(err) => {
                debug!(strategy = ?strategy, error = %err, "Decode strategy failed");
                match strategy {
                    DecodeStrategy::Versioned => versioned_error = err,
                    DecodeStrategy::Legacy => legacy_error = err,
                }
            }
        }
    }

    Err(PipelineError::MalformedTransaction {
        versioned: versioned_error,
        legacy: legacy_error,
    })
}

/// Decode the base64 request field, then the transaction bytes
pub fn decode_base64_transaction(encoded: &str) -> Result<TransactionEnvelope, PipelineError> {
    let bytes = BASE64_STANDARD
        .decode(encoded.trim())
        .map_err(|e| PipelineError::InvalidEncoding(e.to_string()))?;
    decode_transaction(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionFormat;
    use proptest::prelude::*;
    use solana_sdk::{
        hash::Hash,
        instruction::{AccountMeta, Instruction},
        message::{v0, Message},
        pubkey::Pubkey,
        signature::{Keypair, Signature},
        signer::Signer,
    };

    fn instruction(payer: &Pubkey) -> Instruction {
        Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[0xe5, 0x17, 0xcb, 0x97, 1, 2, 3],
            vec![
                AccountMeta::new(*payer, true),
                AccountMeta::new(Pubkey::new_unique(), false),
                AccountMeta::new_readonly(Pubkey::new_unique(), false),
            ],
        )
    }

    fn unsigned_v0(payer: &Pubkey) -> VersionedTransaction {
        let message =
            v0::Message::try_compile(payer, &[instruction(payer)], &[], Hash::new_unique())
                .unwrap();
        VersionedTransaction {
            signatures: vec![Signature::default()],
            message: VersionedMessage::V0(message),
        }
    }

    fn unsigned_legacy(payer: &Pubkey) -> Transaction {
        Transaction::new_unsigned(Message::new(&[instruction(payer)], Some(payer)))
    }

    #[test]
    fn test_versioned_decodes_exact_structure() {
        let payer = Keypair::new().pubkey();
        let tx = unsigned_v0(&payer);
        let bytes = bincode::serialize(&tx).unwrap();

        let env = decode_transaction(&bytes).unwrap();
        assert_eq!(env.format(), TransactionFormat::Versioned);
        assert_eq!(env, TransactionEnvelope::Versioned(tx.clone()));
        assert_eq!(env.account_keys(), tx.message.static_account_keys());
        assert_eq!(env.instructions(), tx.message.instructions());
        assert!(env.is_unsigned());
    }

    #[test]
    fn test_versioned_is_first_strategy_and_decodes_v0() {
        let payer = Keypair::new().pubkey();
        let bytes = bincode::serialize(&unsigned_v0(&payer)).unwrap();
        assert_eq!(DECODE_ORDER[0], DecodeStrategy::Versioned);
        assert!(DECODE_ORDER[0].decode(&bytes).is_ok());
        assert_eq!(
            decode_transaction(&bytes).unwrap().format(),
            TransactionFormat::Versioned
        );
    }

    #[test]
    fn test_legacy_falls_through() {
        let payer = Keypair::new().pubkey();
        let tx = unsigned_legacy(&payer);
        let bytes = bincode::serialize(&tx).unwrap();

        assert_eq!(
            DecodeStrategy::Versioned.decode(&bytes).unwrap_err(),
            "missing version prefix"
        );
        let env = decode_transaction(&bytes).unwrap();
        assert_eq!(env, TransactionEnvelope::Legacy(tx));
    }

    #[test]
    fn test_garbage_reports_both_errors() {
        let err = decode_transaction(&[0xff; 7]).unwrap_err();
        match err {
            PipelineError::MalformedTransaction { versioned, legacy } => {
                assert!(!versioned.is_empty());
                assert!(!legacy.is_empty());
            }
            other => panic!("Expected MalformedTransaction, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let payer = Keypair::new().pubkey();
        let mut bytes = bincode::serialize(&unsigned_v0(&payer)).unwrap();
        bytes.extend_from_slice(&[0, 0, 0]);
        assert!(matches!(
            decode_transaction(&bytes),
            Err(PipelineError::MalformedTransaction { .. })
        ));
    }

    #[test]
    fn test_slot_count_mismatch_rejected() {
        let payer = Keypair::new().pubkey();
        let mut tx = unsigned_v0(&payer);
        tx.signatures.push(Signature::default());
        let bytes = bincode::serialize(&tx).unwrap();
        let err = DecodeStrategy::Versioned.decode(&bytes).unwrap_err();
        assert!(err.contains("signature slot count"));
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(
            decode_base64_transaction("not base64 !!"),
            Err(PipelineError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_base64_roundtrip_entry_point() {
        let payer = Keypair::new().pubkey();
        let bytes = bincode::serialize(&unsigned_v0(&payer)).unwrap();
        let encoded = BASE64_STANDARD.encode(&bytes);
        let env = decode_base64_transaction(&encoded).unwrap();
        assert!(env.is_v0());
    }

    proptest! {
        #[test]
        fn prop_arbitrary_bytes_never_panic(
            bytes in proptest::collection::vec(any::<u8>(), 0..512)
        ) {
            match decode_transaction(&bytes) {
                Ok(env) => prop_assert!(env.has_consistent_slots()),
                Err(PipelineError::MalformedTransaction { versioned, legacy }) => {
                    prop_assert!(!versioned.is_empty());
                    prop_assert!(!legacy.is_empty());
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }
}
