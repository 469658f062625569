//! Account-role inspector
//!
//! Read-only diagnostic: shows which static accounts a transaction expects to
//! sign and whether a given key can satisfy them on its own.

use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use crate::envelope::TransactionEnvelope;
use crate::types::TransactionFormat;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRoleEntry {
    pub index: usize,
    pub pubkey: String,
    pub is_signer: bool,
    pub is_writable: bool,
    pub matches_reference: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRoleReport {
    pub transaction_format: TransactionFormat,
    pub reference: String,
    pub required_signatures: usize,
    pub accounts: Vec<AccountRoleEntry>,
    pub unmatched_signers: Vec<String>,
    pub needs_additional_signers: bool,
}

/// Build the role report for `envelope` against `reference`
pub fn inspect_account_roles(
    envelope: &TransactionEnvelope,
    reference: &Pubkey,
) -> AccountRoleReport {
    let accounts: Vec<AccountRoleEntry> = envelope
        .account_roles()
        .into_iter()
        .map(|role| AccountRoleEntry {
            index: role.index,
            pubkey: role.pubkey.to_string(),
            is_signer: role.is_signer,
            is_writable: role.is_writable,
            matches_reference: role.pubkey == *reference,
        })
        .collect();

    let unmatched_signers: Vec<String> = envelope
        .required_signers()
        .iter()
        .filter(|k| *k != reference)
        .map(|k| k.to_string())
        .collect();

    AccountRoleReport {
        transaction_format: envelope.format(),
        reference: reference.to_string(),
        required_signatures: envelope.num_required_signatures(),
        needs_additional_signers: !unmatched_signers.is_empty(),
        accounts,
        unmatched_signers,
    }
}
