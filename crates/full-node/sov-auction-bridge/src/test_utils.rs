//! Fixtures shared by unit and integration tests.

use std::sync::{Arc, Mutex, PoisonError};

use ethers_core::abi::Token;
use ethers_core::rand::rngs::StdRng;
use ethers_core::rand::SeedableRng;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, TransactionRequest, U256};
use ethers_signers::{LocalWallet, Signer};

use crate::abi::{parse_function, SignatureTable, DEFAULT_BID_FUNCTION};
use crate::bid::{BidExtractor, BidInfo};
use crate::pool::{ExecutionPool, PoolError};
use crate::recovery::{RecoveryError, SenderRecovery};
use crate::settlement::{AuctionSettlement, SettlementError};
use crate::tx::EvmTransaction;

/// Denomination used by test extractors.
pub const TEST_DENOM: &str = "abera";

/// Chain id test transactions are signed for.
pub const TEST_CHAIN_ID: u64 = 80085;

/// ETH transactions signer used in tests.
pub struct TestSigner {
    wallet: LocalWallet,
}

impl TestSigner {
    /// Creates a new signer.
    pub fn new(wallet: LocalWallet) -> Self {
        Self {
            wallet: wallet.with_chain_id(TEST_CHAIN_ID),
        }
    }

    /// Creates a new signer with a random private key, seeded so runs are reproducible.
    pub fn new_random() -> Self {
        Self::new_seeded(22)
    }

    /// Creates a signer whose key is derived from `seed`.
    pub fn new_seeded(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new(LocalWallet::new(&mut rng))
    }

    /// Address of the transaction signer.
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Chain id the signer signs for.
    pub fn chain_id(&self) -> u64 {
        self.wallet.chain_id()
    }

    /// Signs a legacy call to `to` with the given value, data and nonce.
    pub fn sign_call(&self, to: Address, value: U256, data: Vec<u8>, nonce: u64) -> EvmTransaction {
        let request = self.request(to, data, nonce).value(value).gas_price(1u64);
        self.sign(request)
    }

    /// Signs a legacy call with no value paying `gas_price` per gas.
    pub fn sign_priced_call(
        &self,
        to: Address,
        gas_price: u64,
        data: Vec<u8>,
        nonce: u64,
    ) -> EvmTransaction {
        let request = self.request(to, data, nonce).gas_price(gas_price);
        self.sign(request)
    }

    fn request(&self, to: Address, data: Vec<u8>, nonce: u64) -> TransactionRequest {
        TransactionRequest::new()
            .to(to)
            .data(data)
            .nonce(nonce)
            .gas(1_000_000u64)
            .chain_id(self.chain_id())
    }

    fn sign(&self, request: TransactionRequest) -> EvmTransaction {
        let tx = TypedTransaction::Legacy(request);
        let signature = self
            .wallet
            .sign_transaction_sync(&tx)
            .expect("Signing a well-formed transaction must succeed");
        EvmTransaction::from_signed(tx, signature)
    }
}

/// Encodes a call to the default place-bid function.
pub fn encode_place_bid(bid: u64, transactions: &[Vec<u8>], timeout: u64) -> Vec<u8> {
    let function = parse_function(DEFAULT_BID_FUNCTION).expect("Default bid function must parse");
    function
        .encode_input(&[
            Token::Uint(U256::from(bid)),
            Token::Array(transactions.iter().cloned().map(Token::Bytes).collect()),
            Token::Uint(U256::from(timeout)),
        ])
        .expect("Tokens match the default bid function")
}

/// Signature table for the default place-bid function.
pub fn default_signature_table() -> SignatureTable {
    let function = parse_function(DEFAULT_BID_FUNCTION).expect("Default bid function must parse");
    SignatureTable::with_place_bid(function).expect("Default bid function has all bid fields")
}

/// Extractor over the default table, pricing bids in [`TEST_DENOM`].
pub fn bid_extractor() -> BidExtractor {
    bid_extractor_with_recovery(Arc::new(crate::recovery::EcdsaRecovery))
}

/// Extractor over the default table with a custom sender recovery.
pub fn bid_extractor_with_recovery(recovery: Arc<dyn SenderRecovery>) -> BidExtractor {
    BidExtractor::new(TEST_DENOM, default_signature_table(), recovery)
}

/// Sender recovery that always fails.
#[derive(Debug, Default)]
pub struct FailingRecovery;

impl SenderRecovery for FailingRecovery {
    fn recover_sender(&self, _tx: &EvmTransaction) -> Result<Address, RecoveryError> {
        Err(RecoveryError("invalid signature".to_string()))
    }
}

/// Execution pool that records what it admits, or refuses everything.
#[derive(Debug, Default)]
pub struct RecordingPool {
    refusal: Option<PoolError>,
    admitted: Mutex<Vec<EvmTransaction>>,
}

impl RecordingPool {
    /// A pool refusing every transaction with `error`.
    pub fn refusing(error: PoolError) -> Self {
        Self {
            refusal: Some(error),
            admitted: Mutex::default(),
        }
    }

    /// Transactions admitted so far, in admission order.
    pub fn admitted(&self) -> Vec<EvmTransaction> {
        self.admitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ExecutionPool for RecordingPool {
    fn admit(&self, tx: EvmTransaction) -> Result<(), PoolError> {
        if let Some(error) = &self.refusal {
            return Err(error.clone());
        }
        self.admitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        Ok(())
    }
}

/// Settlement that records submitted bids, or refuses everything.
#[derive(Debug, Default)]
pub struct RecordingSettlement {
    refusal: Option<SettlementError>,
    bids: Mutex<Vec<BidInfo>>,
}

impl RecordingSettlement {
    /// A settlement refusing every bid with `error`.
    pub fn refusing(error: SettlementError) -> Self {
        Self {
            refusal: Some(error),
            bids: Mutex::default(),
        }
    }

    /// Bids handed over so far, in submission order.
    pub fn bids(&self) -> Vec<BidInfo> {
        self.bids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuctionSettlement for RecordingSettlement {
    fn submit_bid(&self, bid: BidInfo) -> Result<(), SettlementError> {
        if let Some(error) = &self.refusal {
            return Err(error.clone());
        }
        self.bids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(bid);
        Ok(())
    }
}
