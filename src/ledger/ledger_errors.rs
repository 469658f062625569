use serde::Serialize;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_request::{RpcError, RpcResponseErrorData};
use thiserror::Error;

/// Structured rejection payload returned by the node for `sendTransaction`
/// (typically a preflight simulation failure). Carried verbatim to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRejection {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation_error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,
}

impl std::fmt::Display for NodeRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)?;
        if let Some(err) = &self.simulation_error {
            write!(f, ": {}", err)?;
        }
        Ok(())
    }
}

/// Ledger node error types
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Transport-level errors (network, connection)
    #[error("Transport error: {message} (endpoint: {endpoint})")]
    Transport { endpoint: String, message: String },

    #[error("Timeout (endpoint: {endpoint})")]
    Timeout { endpoint: String },

    #[error("Rate limit exceeded (endpoint: {endpoint})")]
    RateLimited { endpoint: String },

    #[error("Blockhash not found (endpoint: {endpoint})")]
    BlockhashNotFound { endpoint: String },

    /// Node refused the transaction, usually a failed preflight simulation
    #[error("Transaction rejected by node: {0}")]
    Rejected(NodeRejection),

    /// Other RPC response errors (from the RPC server)
    #[error("RPC response error: {message} (endpoint: {endpoint}, code: {code:?})")]
    RpcResponse {
        endpoint: String,
        message: String,
        code: Option<i64>,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Check if this error is retryable (network or node-busy conditions)
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::Transport { .. } => true,
            LedgerError::Timeout { .. } => true,
            LedgerError::RateLimited { .. } => true,
            LedgerError::BlockhashNotFound { .. } => true,

            LedgerError::Rejected(_) => false,
            LedgerError::InvalidResponse(_) => false,
            LedgerError::Internal(_) => false,

            // Retry on server errors (5xx) and the node-behind code
            LedgerError::RpcResponse { code, .. } => match code {
                Some(c) => (500..600).contains(c) || *c == NODE_UNHEALTHY_CODE,
                None => false,
            },
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            LedgerError::Transport { endpoint, .. } => Some(endpoint),
            LedgerError::Timeout { endpoint } => Some(endpoint),
            LedgerError::RateLimited { endpoint } => Some(endpoint),
            LedgerError::BlockhashNotFound { endpoint } => Some(endpoint),
            LedgerError::RpcResponse { endpoint, .. } => Some(endpoint),
            _ => None,
        }
    }

    /// Create from ClientError with endpoint context
    pub fn from_client_error(err: ClientError, endpoint: &str) -> Self {
        // Structured kinds first, message matching as a fallback
        match err.kind() {
            ClientErrorKind::RpcError(RpcError::RpcResponseError {
                code,
                message,
                data,
            }) => {
                if let RpcResponseErrorData::SendTransactionPreflightFailure(sim) = data {
                    return LedgerError::Rejected(NodeRejection {
                        code: *code,
                        message: message.clone(),
                        simulation_error: sim.err.as_ref().map(|e| format!("{:?}", e)),
                        logs: sim.logs.clone().unwrap_or_default(),
                    });
                }
                if *code == NODE_UNHEALTHY_CODE || *code == PREFLIGHT_FAILURE_CODE {
                    return Self::classify_message(&err, endpoint, Some(*code));
                }
                return LedgerError::RpcResponse {
                    endpoint: endpoint.to_string(),
                    message: message.clone(),
                    code: Some(*code),
                };
            }
            ClientErrorKind::Io(e) => {
                return LedgerError::Transport {
                    endpoint: endpoint.to_string(),
                    message: e.to_string(),
                };
            }
            _ => {}
        }
        Self::classify_message(&err, endpoint, None)
    }

    fn classify_message(err: &ClientError, endpoint: &str, code: Option<i64>) -> Self {
        let err_str = err.to_string().to_lowercase();

        if err_str.contains("blockhash not found") {
            LedgerError::BlockhashNotFound {
                endpoint: endpoint.to_string(),
            }
        } else if err_str.contains("rate limit")
            || err_str.contains("too many requests")
            || err_str.contains("429")
        {
            LedgerError::RateLimited {
                endpoint: endpoint.to_string(),
            }
        } else if err_str.contains("timeout") || err_str.contains("timed out") {
            LedgerError::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else if err_str.contains("connection")
            || err_str.contains("error sending request")
            || err_str.contains("dns")
        {
            LedgerError::Transport {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            }
        } else {
            LedgerError::RpcResponse {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
                code,
            }
        }
    }
}

/// JSON-RPC code the node returns while it is behind the cluster
const NODE_UNHEALTHY_CODE: i64 = -32005;
/// JSON-RPC code for preflight failures; without simulation data it is classified by message
const PREFLIGHT_FAILURE_CODE: i64 = -32002;

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
