//! Transaction envelope over the two Solana wire formats
//!
//! A Jupiter swap transaction arrives either as a legacy `Transaction` or as a
//! `VersionedTransaction` carrying a v0 message. Both share the same layout at
//! the level the signing pipeline cares about:
//!
//! - an ordered list of static account keys, whose signer/writable roles are
//!   derived from the message header
//! - compiled instructions referencing those keys by index
//! - a 32-byte recent blockhash
//! - one 64-byte signature slot per required signer, in account-key order
//!
//! `TransactionEnvelope` gives a single API over both, so later stages only
//! branch on the variant where the signing convention actually differs.

use solana_sdk::{
    hash::Hash,
    instruction::CompiledInstruction,
    message::{MessageHeader, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, VersionedTransaction},
};

use crate::types::TransactionFormat;

/// A decoded transaction in exactly one of the two wire formats
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionEnvelope {
    Legacy(Transaction),
    Versioned(VersionedTransaction),
}

/// Role of one static account key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountRole {
    pub index: usize,
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl TransactionEnvelope {
    pub fn format(&self) -> TransactionFormat {
        match self {
            TransactionEnvelope::Legacy(_) => TransactionFormat::Legacy,
            TransactionEnvelope::Versioned(_) => TransactionFormat::Versioned,
        }
    }

    #[inline]
    #[must_use]
    pub fn header(&self) -> &MessageHeader {
        match self {
            TransactionEnvelope::Legacy(tx) => &tx.message.header,
            TransactionEnvelope::Versioned(tx) => tx.message.header(),
        }
    }

    /// Static account keys. Addresses loaded from lookup tables are not included.
    #[inline]
    #[must_use]
    pub fn account_keys(&self) -> &[Pubkey] {
        match self {
            TransactionEnvelope::Legacy(tx) => &tx.message.account_keys,
            TransactionEnvelope::Versioned(tx) => tx.message.static_account_keys(),
        }
    }

    pub fn instructions(&self) -> &[CompiledInstruction] {
        match self {
            TransactionEnvelope::Legacy(tx) => &tx.message.instructions,
            TransactionEnvelope::Versioned(tx) => tx.message.instructions(),
        }
    }

    pub fn recent_blockhash(&self) -> &Hash {
        match self {
            TransactionEnvelope::Legacy(tx) => &tx.message.recent_blockhash,
            TransactionEnvelope::Versioned(tx) => tx.message.recent_blockhash(),
        }
    }

    pub fn set_recent_blockhash(&mut self, blockhash: Hash) {
        match self {
            TransactionEnvelope::Legacy(tx) => tx.message.recent_blockhash = blockhash,
            TransactionEnvelope::Versioned(tx) => tx.message.set_recent_blockhash(blockhash),
        }
    }

    pub fn signatures(&self) -> &[Signature] {
        match self {
            TransactionEnvelope::Legacy(tx) => &tx.signatures,
            TransactionEnvelope::Versioned(tx) => &tx.signatures,
        }
    }

    pub(crate) fn signatures_mut(&mut self) -> &mut Vec<Signature> {
        match self {
            TransactionEnvelope::Legacy(tx) => &mut tx.signatures,
            TransactionEnvelope::Versioned(tx) => &mut tx.signatures,
        }
    }

    pub fn num_required_signatures(&self) -> usize {
        self.header().num_required_signatures as usize
    }

    /// Required signers are always the first N static keys
    pub fn required_signers(&self) -> &[Pubkey] {
        let keys = self.account_keys();
        &keys[..self.num_required_signatures().min(keys.len())]
    }

    pub fn signer_index(&self, pubkey: &Pubkey) -> Option<usize> {
        self.required_signers().iter().position(|k| k == pubkey)
    }

    pub fn is_signer(&self, index: usize) -> bool {
        index < self.num_required_signatures()
    }

    /// Writability derived from the header layout:
    /// `[writable signed | readonly signed | writable unsigned | readonly unsigned]`
    pub fn is_writable(&self, index: usize) -> bool {
        let header = self.header();
        let num_keys = self.account_keys().len();
        let num_signed = header.num_required_signatures as usize;
        if index >= num_keys {
            return false;
        }
        if index < num_signed {
            index < num_signed.saturating_sub(header.num_readonly_signed_accounts as usize)
        } else {
            let num_unsigned = num_keys - num_signed;
            let writable_unsigned =
                num_unsigned.saturating_sub(header.num_readonly_unsigned_accounts as usize);
            index - num_signed < writable_unsigned
        }
    }

    pub fn account_roles(&self) -> Vec<AccountRole> {
        self.account_keys()
            .iter()
            .enumerate()
            .map(|(index, pubkey)| AccountRole {
                index,
                pubkey: *pubkey,
                is_signer: self.is_signer(index),
                is_writable: self.is_writable(index),
            })
            .collect()
    }

    /// Serialized message: the exact bytes every signature commits to.
    /// For versioned messages this includes the version prefix.
    pub fn message_data(&self) -> Vec<u8> {
        match self {
            TransactionEnvelope::Legacy(tx) => tx.message.serialize(),
            TransactionEnvelope::Versioned(tx) => tx.message.serialize(),
        }
    }

    /// Wire bytes in the format the envelope was decoded from
    pub fn to_wire_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        match self {
            TransactionEnvelope::Legacy(tx) => bincode::serialize(tx),
            TransactionEnvelope::Versioned(tx) => bincode::serialize(tx),
        }
    }

    /// Slot count must equal the number of required signers
    pub fn has_consistent_slots(&self) -> bool {
        self.signatures().len() == self.num_required_signatures()
            && self.num_required_signatures() <= self.account_keys().len()
    }

    pub fn is_unsigned(&self) -> bool {
        self.signatures().iter().all(|s| *s == Signature::default())
    }

    /// True if the slot at `index` holds a signature that verifies against its key
    pub fn verify_slot(&self, index: usize) -> bool {
        match (self.signatures().get(index), self.account_keys().get(index)) {
            (Some(sig), Some(key)) => sig.verify(key.as_ref(), &self.message_data()),
            _ => false,
        }
    }

    pub fn is_v0(&self) -> bool {
        matches!(
            self,
            TransactionEnvelope::Versioned(VersionedTransaction {
                message: VersionedMessage::V0(_),
                ..
            })
        )
    }
}
