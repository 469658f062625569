//! End-to-end pipeline tests against the in-memory ledger

use serde_json::json;
use std::time::Duration;

use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
};

use swap_signer::config::Config;
use swap_signer::ledger::{LedgerError, NodeRejection};
use swap_signer::metrics::Metrics;
use swap_signer::pipeline::decode_transaction;
use swap_signer::test_utils::{
    encode_legacy, encode_versioned, unsigned_legacy, unsigned_v0, MockLedger,
};
use swap_signer::types::{SignatureState, TransactionFormat};
use swap_signer::{SignRequest, SignResponse, SigningPipeline, TransactionEnvelope};

fn request(transaction: String, keypair: &Keypair) -> SignRequest {
    serde_json::from_value(json!({
        "transaction": transaction,
        "privateKey": bs58::encode(keypair.to_bytes()).into_string(),
        "metadata": { "quoteId": "q-17", "inAmount": "1000000" }
    }))
    .unwrap()
}

async fn run(ledger: &MockLedger, config: &Config, request: SignRequest) -> SignResponse {
    let metrics = Metrics::new().unwrap();
    SigningPipeline::new(ledger, &metrics, config)
        .execute(request)
        .await
}

#[tokio::test(start_paused = true)]
async fn test_insufficient_balance_never_signs_or_submits() {
    let keypair = Keypair::new();
    let tx = encode_versioned(&unsigned_v0(&keypair.pubkey(), &[]));
    let ledger = MockLedger::new().with_balance(4_000_000).panic_on_submit();

    let response = run(&ledger, &Config::default(), request(tx, &keypair)).await;

    assert!(!response.success);
    assert!(response.signature.is_none());
    assert_eq!(response.confirmation_status.as_deref(), Some("failed"));
    let detail = response.error_detail.unwrap();
    assert_eq!(detail["kind"], "insufficient_funds");
    assert_eq!(detail["balance"], 4_000_000);
    assert_eq!(detail["required"], 5_000_000);
    assert_eq!(ledger.submit_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_versioned_happy_path() {
    let keypair = Keypair::new();
    let tx = encode_versioned(&unsigned_v0(&keypair.pubkey(), &[]));
    let fresh = Hash::new_unique();
    let ledger = MockLedger::new()
        .with_blockhash(fresh, 2_500)
        .with_balance_results(vec![Ok(10_000_000), Ok(9_995_000)]);

    let response = run(&ledger, &Config::default(), request(tx, &keypair)).await;

    assert!(response.success, "unexpected failure: {:?}", response.error);
    assert_eq!(response.confirmation_status.as_deref(), Some("confirmed"));
    assert_eq!(response.transaction_format, Some(TransactionFormat::Versioned));
    assert_eq!(response.wallet, Some(keypair.pubkey().to_string()));
    assert_eq!(response.last_valid_block_height, Some(2_500));
    assert_eq!(response.balance_before, Some(10_000_000));
    assert_eq!(response.balance_after, Some(9_995_000));
    assert_eq!(response.balance_change, Some(-5_000));
    assert_eq!(response.metadata["quoteId"], "q-17");

    let signature = response.signature.clone().unwrap();
    assert_eq!(
        response.explorer_url,
        Some(format!("https://solscan.io/tx/{}", signature))
    );

    // What reached the node is signed, refreshed, and still versioned
    let sent = ledger.submitted().await;
    assert_eq!(sent.len(), 1);
    let envelope = decode_transaction(&sent[0]).unwrap();
    assert!(matches!(envelope, TransactionEnvelope::Versioned(_)));
    assert_eq!(*envelope.recent_blockhash(), fresh);
    assert_eq!(envelope.signatures()[0].to_string(), signature);
    assert!(envelope.verify_slot(0));
}

#[tokio::test(start_paused = true)]
async fn test_legacy_payer_reassigned_and_signed() {
    let keypair = Keypair::new();
    let original_payer = Pubkey::new_unique();
    let tx = encode_legacy(&unsigned_legacy(&original_payer, &keypair.pubkey()));
    let ledger = MockLedger::new();

    let response = run(&ledger, &Config::default(), request(tx, &keypair)).await;

    assert!(response.success, "unexpected failure: {:?}", response.error);
    assert_eq!(response.transaction_format, Some(TransactionFormat::Legacy));

    let sent = ledger.submitted().await;
    let envelope = decode_transaction(&sent[0]).unwrap();
    assert!(matches!(envelope, TransactionEnvelope::Legacy(_)));
    assert_eq!(envelope.account_keys()[0], keypair.pubkey());
    assert_eq!(envelope.num_required_signatures(), 1);
    assert!(envelope.verify_slot(0));
}

#[tokio::test(start_paused = true)]
async fn test_never_terminal_status_times_out_with_signature() {
    let keypair = Keypair::new();
    let tx = encode_versioned(&unsigned_v0(&keypair.pubkey(), &[]));
    let ledger = MockLedger::new().with_statuses(vec![Ok(Some(SignatureState::Processing))]);

    let response = run(&ledger, &Config::default(), request(tx, &keypair)).await;

    assert!(response.success);
    assert!(response.signature.is_some());
    assert_eq!(response.confirmation_status.as_deref(), Some("timeout"));
    assert!(response.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_request_budget_reports_pending() {
    let keypair = Keypair::new();
    let tx = encode_versioned(&unsigned_v0(&keypair.pubkey(), &[]));
    let ledger = MockLedger::new().with_statuses(vec![Ok(None)]);
    let mut config = Config::default();
    config.pipeline.request_budget_secs = 10;
    config.pipeline.response_margin_ms = 1_500;

    let started = tokio::time::Instant::now();
    let response = run(&ledger, &config, request(tx, &keypair)).await;

    assert!(response.success);
    assert_eq!(response.confirmation_status.as_deref(), Some("pending"));
    assert!(started.elapsed() < Duration::from_secs(10));
}

fn short_budget() -> Config {
    let mut config = Config::default();
    config.pipeline.request_budget_secs = 10;
    config.pipeline.response_margin_ms = 1_500;
    config
}

#[tokio::test(start_paused = true)]
async fn test_hanging_status_poll_answers_pending_within_budget() {
    let keypair = Keypair::new();
    let tx = encode_versioned(&unsigned_v0(&keypair.pubkey(), &[]));
    let ledger = MockLedger::new().with_status_delay(Duration::from_secs(30));

    let started = tokio::time::Instant::now();
    let response = run(&ledger, &short_budget(), request(tx, &keypair)).await;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(response.success);
    assert_eq!(response.confirmation_status.as_deref(), Some("pending"));
    assert!(response.signature.is_some());
    assert!(response.balance_after.is_none());
    assert_eq!(ledger.status_calls(), 1);
    assert_eq!(ledger.balance_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_submission_fails_within_budget() {
    let keypair = Keypair::new();
    let tx = encode_versioned(&unsigned_v0(&keypair.pubkey(), &[]));
    let ledger = MockLedger::new().with_submit_delay(Duration::from_secs(60));

    let started = tokio::time::Instant::now();
    let response = run(&ledger, &short_budget(), request(tx, &keypair)).await;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!response.success);
    assert!(response.signature.is_none());
    assert_eq!(response.confirmation_status.as_deref(), Some("failed"));
    let detail = response.error_detail.unwrap();
    assert_eq!(detail["kind"], "budget_exhausted");
    assert_eq!(detail["stage"], "submit");
    assert_eq!(ledger.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_balance_read_stops_before_signing() {
    let keypair = Keypair::new();
    let tx = encode_versioned(&unsigned_v0(&keypair.pubkey(), &[]));
    let ledger = MockLedger::new()
        .with_balance_delays(vec![Duration::from_secs(60)])
        .panic_on_submit();

    let started = tokio::time::Instant::now();
    let response = run(&ledger, &short_budget(), request(tx, &keypair)).await;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!response.success);
    let detail = response.error_detail.unwrap();
    assert_eq!(detail["kind"], "budget_exhausted");
    assert_eq!(detail["stage"], "preflight");
    assert_eq!(ledger.submit_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_balance_requery_is_cut_at_budget() {
    let keypair = Keypair::new();
    let tx = encode_versioned(&unsigned_v0(&keypair.pubkey(), &[]));
    let ledger = MockLedger::new()
        .with_balance_delays(vec![Duration::ZERO, Duration::from_secs(60)]);

    let started = tokio::time::Instant::now();
    let response = run(&ledger, &short_budget(), request(tx, &keypair)).await;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(response.success);
    assert_eq!(response.confirmation_status.as_deref(), Some("confirmed"));
    assert_eq!(response.balance_before, Some(10_000_000));
    assert!(response.balance_after.is_none());
    assert!(response.balance_change.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_on_chain_failure_keeps_signature() {
    let keypair = Keypair::new();
    let tx = encode_versioned(&unsigned_v0(&keypair.pubkey(), &[]));
    let ledger = MockLedger::new().with_statuses(vec![Ok(Some(SignatureState::Errored(
        "InstructionError(2, Custom(6001))".to_string(),
    )))]);

    let response = run(&ledger, &Config::default(), request(tx, &keypair)).await;

    assert!(!response.success);
    assert!(response.signature.is_some());
    assert_eq!(response.confirmation_status.as_deref(), Some("failed"));
    assert!(response.error.unwrap().contains("Custom(6001)"));
}

#[tokio::test(start_paused = true)]
async fn test_foreign_signer_rejected_before_submission() {
    let keypair = Keypair::new();
    let cosigner = Pubkey::new_unique();
    let tx = encode_versioned(&unsigned_v0(&keypair.pubkey(), &[cosigner]));
    let ledger = MockLedger::new().panic_on_submit();

    let response = run(&ledger, &Config::default(), request(tx, &keypair)).await;

    assert!(!response.success);
    let detail = response.error_detail.unwrap();
    assert_eq!(detail["kind"], "additional_signers");
    assert_eq!(detail["unmatchedSigners"], json!([cosigner.to_string()]));
    assert_eq!(ledger.submit_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_garbage_bytes_report_both_decode_errors_without_network() {
    use base64::{prelude::BASE64_STANDARD, Engine};

    let keypair = Keypair::new();
    let ledger = MockLedger::new().panic_on_submit();
    let garbage = BASE64_STANDARD.encode([0xde, 0xad, 0xbe, 0xef, 0x01]);

    let response = run(&ledger, &Config::default(), request(garbage, &keypair)).await;

    assert!(!response.success);
    let detail = response.error_detail.unwrap();
    assert_eq!(detail["kind"], "malformed_transaction");
    assert!(!detail["versionedError"].as_str().unwrap().is_empty());
    assert!(!detail["legacyError"].as_str().unwrap().is_empty());
    assert_eq!(ledger.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_base64_rejected_without_network() {
    let keypair = Keypair::new();
    let ledger = MockLedger::new();

    let response = run(&ledger, &Config::default(), request("%%%".to_string(), &keypair)).await;

    assert!(!response.success);
    assert_eq!(response.error_detail.unwrap()["kind"], "encoding");
    assert_eq!(ledger.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_key_rejected_without_network() {
    let keypair = Keypair::new();
    let tx = encode_versioned(&unsigned_v0(&keypair.pubkey(), &[]));
    let ledger = MockLedger::new();
    let request: SignRequest = serde_json::from_value(json!({
        "transaction": tx,
        "privateKey": "not-a-key",
    }))
    .unwrap();

    let response = run(&ledger, &Config::default(), request).await;

    assert!(!response.success);
    assert_eq!(response.error_detail.unwrap()["kind"], "key_material");
    assert_eq!(ledger.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_balance_requery_failure_is_not_fatal() {
    let keypair = Keypair::new();
    let tx = encode_versioned(&unsigned_v0(&keypair.pubkey(), &[]));
    let ledger = MockLedger::new().with_balance_results(vec![
        Ok(10_000_000),
        Err(LedgerError::Internal("node restarting".to_string())),
    ]);

    let response = run(&ledger, &Config::default(), request(tx, &keypair)).await;

    assert!(response.success);
    assert_eq!(response.balance_before, Some(10_000_000));
    assert!(response.balance_after.is_none());
    assert!(response.balance_change.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_node_rejection_surfaces_logs() {
    let keypair = Keypair::new();
    let tx = encode_versioned(&unsigned_v0(&keypair.pubkey(), &[]));
    let ledger = MockLedger::new().with_submit_errors(vec![LedgerError::Rejected(NodeRejection {
        code: -32002,
        message: "Transaction simulation failed".to_string(),
        simulation_error: Some("InstructionError(2, Custom(6001))".to_string()),
        logs: vec!["Program log: slippage tolerance exceeded".to_string()],
    })]);
    let mut config = Config::default();
    config.submission.skip_preflight = false;

    let response = run(&ledger, &config, request(tx, &keypair)).await;

    assert!(!response.success);
    assert!(response.signature.is_none());
    let detail = response.error_detail.unwrap();
    assert_eq!(detail["kind"], "submission_rejected");
    assert_eq!(
        detail["rejection"]["logs"][0],
        "Program log: slippage tolerance exceeded"
    );
    assert_eq!(ledger.submit_calls(), 1);
    assert!(!ledger.last_submit_options().await.unwrap().skip_preflight);
}

#[tokio::test(start_paused = true)]
async fn test_metrics_follow_outcomes() {
    let keypair = Keypair::new();
    let ledger = MockLedger::new();
    let metrics = Metrics::new().unwrap();
    let config = Config::default();
    let pipeline = SigningPipeline::new(&ledger, &metrics, &config);

    let ok = pipeline
        .execute(request(encode_versioned(&unsigned_v0(&keypair.pubkey(), &[])), &keypair))
        .await;
    let bad = pipeline.execute(request("%%%".to_string(), &keypair)).await;

    assert!(ok.success && !bad.success);
    assert_eq!(metrics.requests_total.get(), 2);
    assert_eq!(metrics.requests_success.get(), 1);
    assert_eq!(metrics.requests_failed.get(), 1);
    assert_eq!(metrics.submissions_total.get(), 1);
    let text = metrics.export_text().unwrap();
    assert!(text.contains("category=\"encoding\""));
    assert!(text.contains("format=\"versioned\""));
}

#[tokio::test(start_paused = true)]
async fn test_signature_in_response_parses() {
    let keypair = Keypair::new();
    let tx = encode_versioned(&unsigned_v0(&keypair.pubkey(), &[]));
    let ledger = MockLedger::new();

    let response = run(&ledger, &Config::default(), request(tx, &keypair)).await;
    let signature: Signature = response.signature.unwrap().parse().unwrap();
    assert_ne!(signature, Signature::default());
}
