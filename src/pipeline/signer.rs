//! Signer
//!
//! Exactly one key signs. The signature goes into the slot whose index matches
//! the key's position among the required signers; every other slot keeps its
//! default value.
//!
//! Legacy transactions get the signing key installed as fee payer before
//! signing. Versioned messages are signed as delivered: the routing service
//! already compiled them for the requesting wallet.

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    message::Message,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};
use tracing::{debug, info, warn};

use super::errors::PipelineError;
use crate::envelope::TransactionEnvelope;
use crate::wallet::KeyMaterial;

/// Sign `envelope` in place with `key` and return the produced signature.
///
/// Never retries: a failure here is deterministic.
pub fn sign_envelope(
    envelope: &mut TransactionEnvelope,
    key: &KeyMaterial,
) -> Result<Signature, PipelineError> {
    let signer = key.pubkey();

    if let TransactionEnvelope::Legacy(_) = envelope {
        if envelope.account_keys().first() != Some(&signer) {
            let rebuilt = rebuild_with_fee_payer(envelope, &signer)?;
            debug!(
                fee_payer = %signer,
                accounts = rebuilt.message.account_keys.len(),
                "Recompiled legacy message with signer as fee payer"
            );
            *envelope = TransactionEnvelope::Legacy(rebuilt);
        }
    }

    let unmatched: Vec<Pubkey> = envelope
        .required_signers()
        .iter()
        .filter(|k| **k != signer)
        .copied()
        .collect();

    let index = match envelope.signer_index(&signer) {
        Some(index) if unmatched.is_empty() => index,
        _ => {
            warn!(
                signer = %signer,
                unmatched = unmatched.len(),
                "Transaction requires signatures this request cannot provide"
            );
            return Err(PipelineError::AdditionalSignersRequired { unmatched });
        }
    };

    let signature = key.sign_message(&envelope.message_data());
    let slot = envelope
        .signatures_mut()
        .get_mut(index)
        .ok_or_else(|| PipelineError::Signing(format!("No signature slot at index {}", index)))?;
    *slot = signature;

    if !envelope.verify_slot(index) {
        return Err(PipelineError::Signing(
            "Produced signature does not verify against the message".to_string(),
        ));
    }

    info!(
        signature = %signature,
        slot = index,
        format = %envelope.format(),
        "Transaction signed"
    );
    Ok(signature)
}

/// Decompile the legacy message and compile it again with `payer` first.
/// The blockhash already on the message is kept; all slots are reset.
fn rebuild_with_fee_payer(
    envelope: &TransactionEnvelope,
    payer: &Pubkey,
) -> Result<Transaction, PipelineError> {
    let roles = envelope.account_roles();
    let out_of_range =
        |index: u8| PipelineError::Signing(format!("Account index {} out of range", index));

    let instructions = envelope
        .instructions()
        .iter()
        .map(|ix| {
            let program_id = roles
                .get(ix.program_id_index as usize)
                .ok_or_else(|| out_of_range(ix.program_id_index))?
                .pubkey;
            let accounts = ix
                .accounts
                .iter()
                .map(|&i| {
                    roles
                        .get(i as usize)
                        .map(|role| AccountMeta {
                            pubkey: role.pubkey,
                            is_signer: role.is_signer,
                            is_writable: role.is_writable,
                        })
                        .ok_or_else(|| out_of_range(i))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Instruction {
                program_id,
                accounts,
                data: ix.data.clone(),
            })
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    let message =
        Message::new_with_blockhash(&instructions, Some(payer), envelope.recent_blockhash());
    Ok(Transaction::new_unsigned(message))
}
