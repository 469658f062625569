//! Configuration module for the swap signer
//!
//! This module handles configuration loading from TOML files and
//! environment variables, and provides structured configuration types.

use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use std::time::Duration;

use crate::ledger::{RetryConfig, SubmitOptions};
use crate::types::MIN_RESERVE_LAMPORTS;

/// Environment variable overriding `rpc.url`
pub const ENV_RPC_URL: &str = "SWAP_SIGNER_RPC_URL";
/// Environment variable overriding `submission.skip_preflight`
pub const ENV_SKIP_PREFLIGHT: &str = "SWAP_SIGNER_SKIP_PREFLIGHT";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint configuration
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Submission policy
    #[serde(default)]
    pub submission: SubmissionConfig,

    /// Confirmation polling
    #[serde(default)]
    pub confirmation: ConfirmationConfig,

    /// Balance guard applied before signing
    #[serde(default)]
    pub preflight: PreflightConfig,

    /// Whole-request limits
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Block explorer links in responses
    #[serde(default)]
    pub explorer: ExplorerConfig,

    /// Logging output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Commitment level as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn to_level(self) -> CommitmentLevel {
        match self {
            Commitment::Processed => CommitmentLevel::Processed,
            Commitment::Confirmed => CommitmentLevel::Confirmed,
            Commitment::Finalized => CommitmentLevel::Finalized,
        }
    }

    pub fn to_commitment_config(self) -> CommitmentConfig {
        CommitmentConfig {
            commitment: self.to_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// RPC endpoint URL
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Commitment for balance and blockhash reads
    #[serde(default = "default_commitment")]
    pub commitment: Commitment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Skip node-side simulation before accepting the transaction
    #[serde(default = "default_true")]
    pub skip_preflight: bool,

    /// Commitment used for node-side simulation
    #[serde(default = "default_commitment")]
    pub preflight_commitment: Commitment,

    /// Client-side retries for transient submission failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff between retries in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Node-side rebroadcast limit (omitted from the request when unset)
    #[serde(default)]
    pub node_max_retries: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    /// Commitment that counts as settled
    #[serde(default = "default_commitment")]
    pub commitment: Commitment,

    /// Give up polling after this many seconds
    #[serde(default = "default_confirm_timeout")]
    pub timeout_secs: u64,

    /// Delay between status polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightConfig {
    /// Reserve floor in lamports
    #[serde(default = "default_min_balance")]
    pub min_balance_lamports: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Wall-clock budget for one request, end to end
    #[serde(default = "default_request_budget")]
    pub request_budget_secs: u64,

    /// Time kept in reserve to build the response once the budget is nearly spent
    #[serde(default = "default_response_margin_ms")]
    pub response_margin_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Explorer base URL; `/tx/<signature>` is appended
    #[serde(default = "default_explorer_url")]
    pub base_url: String,

    /// Optional `?cluster=` query value (devnet, testnet)
    #[serde(default)]
    pub cluster: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of the human-readable format
    #[serde(default)]
    pub json: bool,

    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

// Default value functions
fn default_rpc_url() -> String { "https://api.mainnet-beta.solana.com".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_commitment() -> Commitment { Commitment::Confirmed }
fn default_true() -> bool { true }
fn default_max_retries() -> u32 { 3 }
fn default_retry_backoff_ms() -> u64 { 250 }
fn default_confirm_timeout() -> u64 { 30 }
fn default_poll_interval_ms() -> u64 { 1000 }
fn default_min_balance() -> u64 { MIN_RESERVE_LAMPORTS }
fn default_request_budget() -> u64 { 55 }
fn default_response_margin_ms() -> u64 { 1500 }
fn default_explorer_url() -> String { "https://solscan.io".to_string() }
fn default_log_filter() -> String { "swap_signer=info,warn".to_string() }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            timeout_secs: default_rpc_timeout(),
            commitment: default_commitment(),
        }
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            skip_preflight: default_true(),
            preflight_commitment: default_commitment(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            node_max_retries: None,
        }
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            commitment: default_commitment(),
            timeout_secs: default_confirm_timeout(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            min_balance_lamports: default_min_balance(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            request_budget_secs: default_request_budget(),
            response_margin_ms: default_response_margin_ms(),
        }
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: default_explorer_url(),
            cluster: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            filter: default_log_filter(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            submission: SubmissionConfig::default(),
            confirmation: ConfirmationConfig::default(),
            preflight: PreflightConfig::default(),
            pipeline: PipelineConfig::default(),
            explorer: ExplorerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SubmissionConfig {
    pub fn submit_options(&self) -> SubmitOptions {
        SubmitOptions {
            skip_preflight: self.skip_preflight,
            preflight_commitment: self.preflight_commitment.to_level(),
            node_max_retries: self.node_max_retries,
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            base_backoff_ms: self.retry_backoff_ms,
            ..RetryConfig::default()
        }
    }
}

impl ConfirmationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl PipelineConfig {
    pub fn request_budget(&self) -> Duration {
        Duration::from_secs(self.request_budget_secs)
    }

    pub fn response_margin(&self) -> Duration {
        Duration::from_millis(self.response_margin_ms)
    }
}

impl ExplorerConfig {
    pub fn transaction_url(&self, signature: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        match &self.cluster {
            Some(cluster) => format!("{}/tx/{}?cluster={}", base, signature, cluster),
            None => format!("{}/tx/{}", base, signature),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `SWAP_SIGNER_*` environment overrides on top of file values
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Ok(url) = std::env::var(ENV_RPC_URL) {
            if !url.trim().is_empty() {
                self.rpc.url = url;
            }
        }
        if let Ok(raw) = std::env::var(ENV_SKIP_PREFLIGHT) {
            self.submission.skip_preflight = raw
                .trim()
                .parse::<bool>()
                .map_err(|_| {
                    anyhow::anyhow!("{} must be true or false, got '{}'", ENV_SKIP_PREFLIGHT, raw)
                })?;
        }
        Ok(())
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc.url.trim().is_empty() {
            anyhow::bail!("rpc.url must not be empty");
        }
        if self.confirmation.poll_interval_ms == 0 {
            anyhow::bail!("confirmation.poll_interval_ms must be greater than zero");
        }
        if self.pipeline.response_margin() >= self.pipeline.request_budget() {
            anyhow::bail!(
                "pipeline.response_margin_ms ({}) must be below the request budget ({}s)",
                self.pipeline.response_margin_ms,
                self.pipeline.request_budget_secs
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert!(config.submission.skip_preflight);
        assert_eq!(config.preflight.min_balance_lamports, 5_000_000);
        assert_eq!(config.confirmation.commitment, Commitment::Confirmed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[rpc]
url = "https://rpc.example.org"

[submission]
skip_preflight = false
max_retries = 5

[confirmation]
commitment = "finalized"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.rpc.url, "https://rpc.example.org");
        assert_eq!(config.rpc.timeout_secs, 30);
        assert!(!config.submission.skip_preflight);
        assert_eq!(config.submission.retry_config().max_retries, 5);
        assert_eq!(config.confirmation.commitment, Commitment::Finalized);
        assert_eq!(config.preflight.min_balance_lamports, MIN_RESERVE_LAMPORTS);
    }

    #[test]
    fn test_validate_rejects_margin_above_budget() {
        let mut config = Config::default();
        config.pipeline.request_budget_secs = 1;
        config.pipeline.response_margin_ms = 2000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explorer_url() {
        let mut explorer = ExplorerConfig::default();
        assert_eq!(explorer.transaction_url("abc"), "https://solscan.io/tx/abc");
        explorer.cluster = Some("devnet".to_string());
        explorer.base_url = "https://explorer.solana.com/".to_string();
        assert_eq!(
            explorer.transaction_url("abc"),
            "https://explorer.solana.com/tx/abc?cluster=devnet"
        );
    }

    #[test]
    fn test_submit_options_mapping() {
        let submission = SubmissionConfig {
            skip_preflight: false,
            preflight_commitment: Commitment::Processed,
            node_max_retries: Some(2),
            ..SubmissionConfig::default()
        };
        let options = submission.submit_options();
        assert!(!options.skip_preflight);
        assert_eq!(options.preflight_commitment, CommitmentLevel::Processed);
        assert_eq!(options.node_max_retries, Some(2));
    }
}
