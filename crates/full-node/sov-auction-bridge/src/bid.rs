//! Classification of EVM transactions and extraction of bid information.

use std::fmt;
use std::sync::Arc;

use ethers_core::types::U256;

use crate::abi::{split_selector, DecodeError, DecodedCall, PlaceBidCall, SignatureTable};
use crate::address::{to_consensus_address, ConsensusAddress};
use crate::config::AuctionConfig;
use crate::recovery::{EcdsaRecovery, RecoveryError, SenderRecovery};
use crate::tx::EvmTransaction;

/// An amount of a single denomination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    /// Denomination.
    pub denom: String,
    /// Amount.
    pub amount: U256,
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// The auction-relevant content of a bid transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidInfo {
    /// Account charged for the bid.
    pub bidder: ConsensusAddress,
    /// Offered bid.
    pub bid: Coin,
    /// Ordered bundle of opaque transactions.
    pub transactions: Vec<Vec<u8>>,
    /// Settlement timeout, interpreted by the auction.
    pub timeout: u64,
}

/// Outcome of classifying a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Not a place-bid call; admitted through the ordinary path.
    Ordinary,
    /// A place-bid call with its extracted bid.
    Bid(BidInfo),
}

/// A transaction claims to place a bid but its content cannot be extracted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// The call data does not decode against the place-bid layout.
    #[error("transaction must be a valid bid transaction: {reason}")]
    MalformedPayload {
        /// Decoder diagnostic.
        reason: String,
    },
    /// A place-bid argument has the wrong shape.
    #[error("invalid {field} type: expected {expected}")]
    InvalidFieldType {
        /// Offending argument.
        field: &'static str,
        /// Required shape.
        expected: &'static str,
    },
    /// The bid's signature does not yield a sender.
    #[error(transparent)]
    SenderRecoveryFailed(#[from] RecoveryError),
}

/// Turns EVM transactions into [`Classification`]s.
///
/// The extractor is a pure function of its configuration and input, and can
/// be shared between any number of admission workers.
#[derive(Clone)]
pub struct BidExtractor {
    denom: String,
    table: SignatureTable,
    recovery: Arc<dyn SenderRecovery>,
}

impl fmt::Debug for BidExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BidExtractor")
            .field("denom", &self.denom)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl BidExtractor {
    /// Creates an extractor pricing bids in `denom`.
    pub fn new(
        denom: impl Into<String>,
        table: SignatureTable,
        recovery: Arc<dyn SenderRecovery>,
    ) -> Self {
        Self {
            denom: denom.into(),
            table,
            recovery,
        }
    }

    /// Creates an extractor from configuration, recovering senders with ECDSA.
    pub fn from_config(config: &AuctionConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            config.evm_denom.clone(),
            config.signature_table()?,
            Arc::new(EcdsaRecovery),
        ))
    }

    /// Denomination bids are priced in.
    pub fn denom(&self) -> &str {
        &self.denom
    }

    /// Decides whether `tx` is a bid transaction and, if so, extracts its bid.
    pub fn extract_bid(&self, tx: &EvmTransaction) -> Result<Classification, ExtractError> {
        let Some((selector, args)) = split_selector(tx.input()) else {
            return Ok(Classification::Ordinary);
        };

        let call = match self.table.decode(selector, args) {
            Ok(DecodedCall::PlaceBid(call)) => call,
            Err(DecodeError::UnknownSelector(_)) => {
                tracing::trace!(tx_hash = ?tx.hash(), "Not a bid transaction");
                return Ok(Classification::Ordinary);
            }
            Err(DecodeError::MalformedPayload { reason, .. }) => {
                return Err(ExtractError::MalformedPayload { reason })
            }
            Err(DecodeError::InvalidFieldType {
                field, expected, ..
            }) => return Err(ExtractError::InvalidFieldType { field, expected }),
        };

        let sender = self.recovery.recover_sender(tx)?;
        let PlaceBidCall {
            bid,
            transactions,
            timeout,
        } = call;

        Ok(Classification::Bid(BidInfo {
            bidder: to_consensus_address(&sender),
            bid: Coin {
                denom: self.denom.clone(),
                amount: bid,
            },
            transactions,
            timeout,
        }))
    }
}
