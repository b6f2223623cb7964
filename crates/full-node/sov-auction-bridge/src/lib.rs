#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod abi;
pub mod address;
mod bid;
mod bridge;
pub mod config;
mod pool;
mod recovery;
mod settlement;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
mod tx;
mod validator;

pub use bid::{BidExtractor, BidInfo, Classification, Coin, ExtractError};
pub use bridge::{Admission, AdmissionBridge, AdmissionError, AdmissionReport, SettlementStatus};
pub use pool::{ExecutionPool, FairTxPool, PoolCursor, PoolError, PooledTx};
pub use recovery::{EcdsaRecovery, RecoveryError, SenderRecovery};
pub use settlement::{AuctionSettlement, ChannelSettlement, SettlementError};
pub use tx::{ConsensusMsg, ConsensusTx, EnvelopeError, EvmTransaction, RlpEvmTransaction, TxDecodeError};
pub use validator::{validate_bid, ValidationError};
