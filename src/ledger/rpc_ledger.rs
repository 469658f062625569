//! `LedgerClient` over the Solana JSON-RPC API
use async_trait::async_trait;
use base64::{prelude::BASE64_STANDARD, Engine};
use solana_client::{
    nonblocking::rpc_client::RpcClient, rpc_config::RpcSendTransactionConfig,
    rpc_request::RpcRequest,
};
use solana_sdk::{
    commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
};
use solana_transaction_status::UiTransactionEncoding;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{LedgerClient, LedgerError, LedgerResult, SubmitOptions};
use crate::config::RpcConfig;
use crate::types::{SignatureState, ValidityToken};

/// Ledger client backed by a single RPC endpoint.
///
/// Built once per process and shared by reference with every pipeline stage.
pub struct RpcLedgerClient {
    client: RpcClient,
    endpoint: String,
}

impl std::fmt::Debug for RpcLedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedgerClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl RpcLedgerClient {
    pub fn new(url: impl Into<String>, timeout: Duration, commitment: CommitmentConfig) -> Self {
        let endpoint = url.into();
        Self {
            client: RpcClient::new_with_timeout_and_commitment(
                endpoint.clone(),
                timeout,
                commitment,
            ),
            endpoint,
        }
    }

    pub fn from_config(config: &RpcConfig) -> Self {
        Self::new(
            config.url.clone(),
            Duration::from_secs(config.timeout_secs),
            config.commitment.to_commitment_config(),
        )
    }

    fn map_err(&self, err: solana_client::client_error::ClientError) -> LedgerError {
        LedgerError::from_client_error(err, &self.endpoint)
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn get_balance(
        &self,
        pubkey: &Pubkey,
        commitment: CommitmentConfig,
    ) -> LedgerResult<u64> {
        self.client
            .get_balance_with_commitment(pubkey, commitment)
            .await
            .map(|response| response.value)
            .map_err(|e| self.map_err(e))
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn get_latest_validity_token(
        &self,
        commitment: CommitmentConfig,
    ) -> LedgerResult<ValidityToken> {
        let (blockhash, last_valid_block_height) = self
            .client
            .get_latest_blockhash_with_commitment(commitment)
            .await
            .map_err(|e| self.map_err(e))?;

        Ok(ValidityToken {
            blockhash,
            last_valid_block_height,
        })
    }

    #[instrument(skip(self, wire_bytes), fields(endpoint = %self.endpoint, len = wire_bytes.len()))]
    async fn submit(&self, wire_bytes: &[u8], options: &SubmitOptions) -> LedgerResult<Signature> {
        let encoded = BASE64_STANDARD.encode(wire_bytes);
        let config = RpcSendTransactionConfig {
            skip_preflight: options.skip_preflight,
            preflight_commitment: Some(options.preflight_commitment),
            encoding: Some(UiTransactionEncoding::Base64),
            max_retries: options.node_max_retries,
            ..RpcSendTransactionConfig::default()
        };

        let signature: String = self
            .client
            .send(RpcRequest::SendTransaction, serde_json::json!([encoded, config]))
            .await
            .map_err(|e| self.map_err(e))?;

        debug!(signature = %signature, "Node accepted transaction");

        Signature::from_str(&signature).map_err(|e| {
            LedgerError::InvalidResponse(format!("Unparseable signature '{}': {}", signature, e))
        })
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> LedgerResult<Option<SignatureState>> {
        let response = self
            .client
            .get_signature_statuses(&[*signature])
            .await
            .map_err(|e| self.map_err(e))?;

        let status = response.value.into_iter().next().flatten();
        // An execution error is final at any commitment
        Ok(status.map(|status| {
            if let Some(err) = status.err {
                SignatureState::Errored(err.to_string())
            } else if status.satisfies_commitment(commitment) {
                SignatureState::Landed
            } else {
                SignatureState::Processing
            }
        }))
    }
}
