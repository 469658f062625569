//! Test Utilities Module
//!
//! A scriptable in-memory [`LedgerClient`] plus builders for unsigned swap
//! transactions in both wire formats.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use base64::{prelude::BASE64_STANDARD, Engine};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    message::{v0, Message, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, VersionedTransaction},
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::ledger::{LedgerClient, LedgerError, LedgerResult, SubmitOptions};
use crate::pipeline::decoder::decode_transaction;
use crate::types::{SignatureState, ValidityToken};

/// Script of responses: entries are consumed in order, the last one repeats
#[derive(Debug)]
struct Script<T: Clone> {
    queue: VecDeque<T>,
}

impl<T: Clone> Script<T> {
    fn new(items: Vec<T>) -> Self {
        Self {
            queue: items.into(),
        }
    }

    fn next(&mut self) -> Option<T> {
        if self.queue.len() > 1 {
            self.queue.pop_front()
        } else {
            self.queue.front().cloned()
        }
    }
}

/// Mock ledger for testing
///
/// Records every call and answers from scripted responses. No network.
/// `submit` answers with the first signature found in the submitted bytes,
/// the same thing a real node returns.
#[derive(Clone)]
pub struct MockLedger {
    balances: Arc<Mutex<Script<LedgerResult<u64>>>>,
    blockhash: Arc<Mutex<LedgerResult<ValidityToken>>>,
    submit_errors: Arc<Mutex<VecDeque<LedgerError>>>,
    statuses: Arc<Mutex<Script<LedgerResult<Option<SignatureState>>>>>,
    panic_on_submit: bool,

    balance_delays: Arc<Mutex<Script<Duration>>>,
    submit_delay: Duration,
    status_delay: Duration,

    submitted: Arc<Mutex<Vec<Vec<u8>>>>,
    submit_options: Arc<Mutex<Option<SubmitOptions>>>,

    balance_calls: Arc<AtomicUsize>,
    blockhash_calls: Arc<AtomicUsize>,
    submit_calls: Arc<AtomicUsize>,
    status_calls: Arc<AtomicUsize>,
}

impl MockLedger {
    /// 10,000,000 lamports, a fresh blockhash and immediate confirmation
    pub fn new() -> Self {
        Self {
            balances: Arc::new(Mutex::new(Script::new(vec![Ok(10_000_000)]))),
            blockhash: Arc::new(Mutex::new(Ok(ValidityToken {
                blockhash: Hash::new_unique(),
                last_valid_block_height: 1_000,
            }))),
            submit_errors: Arc::new(Mutex::new(VecDeque::new())),
            statuses: Arc::new(Mutex::new(Script::new(vec![Ok(Some(SignatureState::Landed))]))),
            panic_on_submit: false,
            balance_delays: Arc::new(Mutex::new(Script::new(vec![Duration::ZERO]))),
            submit_delay: Duration::ZERO,
            status_delay: Duration::ZERO,
            submitted: Arc::new(Mutex::new(Vec::new())),
            submit_options: Arc::new(Mutex::new(None)),
            balance_calls: Arc::new(AtomicUsize::new(0)),
            blockhash_calls: Arc::new(AtomicUsize::new(0)),
            submit_calls: Arc::new(AtomicUsize::new(0)),
            status_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_balance(self, lamports: u64) -> Self {
        self.with_balance_results(vec![Ok(lamports)])
    }

    /// Successive balance answers; the last one repeats
    pub fn with_balance_results(mut self, results: Vec<LedgerResult<u64>>) -> Self {
        self.balances = Arc::new(Mutex::new(Script::new(results)));
        self
    }

    pub fn with_blockhash(mut self, blockhash: Hash, last_valid_block_height: u64) -> Self {
        self.blockhash = Arc::new(Mutex::new(Ok(ValidityToken {
            blockhash,
            last_valid_block_height,
        })));
        self
    }

    pub fn fail_blockhash(mut self, err: LedgerError) -> Self {
        self.blockhash = Arc::new(Mutex::new(Err(err)));
        self
    }

    /// Errors returned by the first submissions, in order, before success
    pub fn with_submit_errors(mut self, errors: Vec<LedgerError>) -> Self {
        self.submit_errors = Arc::new(Mutex::new(errors.into()));
        self
    }

    /// Successive status answers; the last one repeats
    pub fn with_statuses(mut self, statuses: Vec<LedgerResult<Option<SignatureState>>>) -> Self {
        self.statuses = Arc::new(Mutex::new(Script::new(statuses)));
        self
    }

    /// Any submission is a test failure
    pub fn panic_on_submit(mut self) -> Self {
        self.panic_on_submit = true;
        self
    }

    /// Delay before each balance answer, in call order; the last one repeats
    pub fn with_balance_delays(mut self, delays: Vec<Duration>) -> Self {
        self.balance_delays = Arc::new(Mutex::new(Script::new(delays)));
        self
    }

    /// Delay before every submission answer
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    /// Delay before every status answer
    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }

    pub fn blockhash_calls(&self) -> usize {
        self.blockhash_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Total ledger calls of any kind
    pub fn total_calls(&self) -> usize {
        self.balance_calls() + self.blockhash_calls() + self.submit_calls() + self.status_calls()
    }

    /// Wire bytes of every submission attempt
    pub async fn submitted(&self) -> Vec<Vec<u8>> {
        self.submitted.lock().await.clone()
    }

    pub async fn last_submit_options(&self) -> Option<SubmitOptions> {
        *self.submit_options.lock().await
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    fn endpoint(&self) -> &str {
        "mock"
    }

    async fn get_balance(
        &self,
        _pubkey: &Pubkey,
        _commitment: CommitmentConfig,
    ) -> LedgerResult<u64> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.balance_delays.lock().await.next().unwrap_or(Duration::ZERO);
        pause(delay).await;
        self.balances
            .lock()
            .await
            .next()
            .unwrap_or_else(|| Err(LedgerError::Internal("No balance scripted".to_string())))
    }

    async fn get_latest_validity_token(
        &self,
        _commitment: CommitmentConfig,
    ) -> LedgerResult<ValidityToken> {
        self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
        self.blockhash.lock().await.clone()
    }

    async fn submit(&self, wire_bytes: &[u8], options: &SubmitOptions) -> LedgerResult<Signature> {
        if self.panic_on_submit {
            panic!("MockLedger::submit called but this test forbids submission");
        }
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().await.push(wire_bytes.to_vec());
        *self.submit_options.lock().await = Some(*options);
        pause(self.submit_delay).await;

        if let Some(err) = self.submit_errors.lock().await.pop_front() {
            return Err(err);
        }

        let envelope = decode_transaction(wire_bytes)
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;
        envelope
            .signatures()
            .first()
            .copied()
            .ok_or_else(|| {
                LedgerError::InvalidResponse("Transaction has no signatures".to_string())
            })
    }

    async fn get_signature_status(
        &self,
        _signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> LedgerResult<Option<SignatureState>> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        pause(self.status_delay).await;
        self.statuses.lock().await.next().unwrap_or(Ok(None))
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Swap-shaped instruction: each of `signers` as a writable signer, plus a
/// writable pool account and a read-only program account
pub fn swap_instruction(signers: &[Pubkey]) -> Instruction {
    let mut accounts: Vec<AccountMeta> =
        signers.iter().map(|k| AccountMeta::new(*k, true)).collect();
    accounts.push(AccountMeta::new(Pubkey::new_unique(), false));
    accounts.push(AccountMeta::new_readonly(Pubkey::new_unique(), false));
    Instruction::new_with_bytes(
        Pubkey::new_unique(),
        &[0xe5, 0x17, 0xcb, 0x97, 1, 0, 0, 0],
        accounts,
    )
}

/// Unsigned v0 transaction paid by `payer`, with `extra_signers` also required
pub fn unsigned_v0(payer: &Pubkey, extra_signers: &[Pubkey]) -> VersionedTransaction {
    let mut signers = vec![*payer];
    signers.extend_from_slice(extra_signers);
    let message =
        v0::Message::try_compile(payer, &[swap_instruction(&signers)], &[], Hash::new_unique())
            .expect("v0 message compiles");
    VersionedTransaction {
        signatures: vec![Signature::default(); message.header.num_required_signatures as usize],
        message: VersionedMessage::V0(message),
    }
}

/// Unsigned legacy transaction with `payer` as fee payer and `user` as the
/// instruction signer
pub fn unsigned_legacy(payer: &Pubkey, user: &Pubkey) -> Transaction {
    let message = Message::new_with_blockhash(
        &[swap_instruction(&[*user])],
        Some(payer),
        &Hash::new_unique(),
    );
    Transaction::new_unsigned(message)
}

pub fn encode_versioned(tx: &VersionedTransaction) -> String {
    BASE64_STANDARD.encode(bincode::serialize(tx).expect("serialize versioned transaction"))
}

pub fn encode_legacy(tx: &Transaction) -> String {
    BASE64_STANDARD.encode(bincode::serialize(tx).expect("serialize legacy transaction"))
}
