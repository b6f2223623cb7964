use std::sync::Arc;

use ethers_core::types::H256;
use tokio::sync::mpsc;

use crate::address::Bech32Codec;
use crate::bid::{BidExtractor, BidInfo, Classification, ExtractError};
use crate::config::AuctionBridgeConfig;
use crate::pool::{ExecutionPool, PoolError};
use crate::settlement::{AuctionSettlement, SettlementError};
use crate::tx::{ConsensusTx, EnvelopeError, EvmTransaction};
use crate::validator::{validate_bid, ValidationError};

/// Terminal state of an admitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Not a bid transaction; forwarded to the execution pool unchanged.
    Ordinary {
        /// Hash of the admitted transaction.
        tx_hash: H256,
    },
    /// A validated bid transaction.
    Bid {
        /// Hash of the admitted transaction.
        tx_hash: H256,
        /// The bid that was handed to the settlement mechanism.
        bid: BidInfo,
        /// The settlement mechanism's answer.
        settlement: SettlementStatus,
    },
}

impl Admission {
    /// Hash of the admitted transaction.
    pub fn tx_hash(&self) -> H256 {
        match self {
            Admission::Ordinary { tx_hash } | Admission::Bid { tx_hash, .. } => *tx_hash,
        }
    }
}

/// What the settlement mechanism did with an admitted bid.
///
/// A refusal does not undo the admission into the execution pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementStatus {
    /// The bid was accepted for later bundle execution.
    Accepted,
    /// The bid was refused.
    Refused(SettlementError),
}

/// Why a transaction was not admitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    /// The consensus envelope does not carry exactly one EVM transaction.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    /// The transaction claims to be a bid but its bid cannot be extracted.
    #[error(transparent)]
    Extract(#[from] ExtractError),
    /// The extracted bid breaks a bid invariant.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The execution pool refused the transaction.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl AdmissionError {
    /// Stable name of the rejection kind, suitable for submitter-facing reports.
    pub fn reason(&self) -> &'static str {
        match self {
            AdmissionError::Envelope(_) => "InvalidEnvelope",
            AdmissionError::Extract(ExtractError::MalformedPayload { .. }) => "MalformedPayload",
            AdmissionError::Extract(ExtractError::InvalidFieldType { .. }) => "InvalidFieldType",
            AdmissionError::Extract(ExtractError::SenderRecoveryFailed(_)) => {
                "SenderRecoveryFailed"
            }
            AdmissionError::Validation(ValidationError::NonZeroValueBid { .. }) => {
                "NonZeroValueBid"
            }
            AdmissionError::Validation(ValidationError::EmptyBundle) => "EmptyBundle",
            AdmissionError::Validation(ValidationError::EmptyBundleEntry { .. }) => {
                "EmptyBundleEntry"
            }
            AdmissionError::Pool(_) => "PoolError",
        }
    }
}

/// Counts of terminal states reached by [`AdmissionBridge::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionReport {
    /// Ordinary transactions admitted.
    pub ordinary: usize,
    /// Bid transactions admitted.
    pub bids: usize,
    /// Admitted bids the settlement mechanism refused.
    pub settlement_refused: usize,
    /// Transactions rejected.
    pub rejected: usize,
    /// Consensus transactions without an EVM transaction.
    pub skipped: usize,
}

/// Moves transactions from the consensus-ordered mempool into the execution
/// pool, classifying and validating bid transactions on the way.
///
/// Clones share the same extractor, pool and settlement, so any number of
/// submitters can call [`AdmissionBridge::admit`] concurrently.
pub struct AdmissionBridge<P: ExecutionPool, S: AuctionSettlement>(Arc<Inner<P, S>>);

impl<P, S> Clone for AdmissionBridge<P, S>
where
    P: ExecutionPool,
    S: AuctionSettlement,
{
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

struct Inner<P: ExecutionPool, S: AuctionSettlement> {
    extractor: BidExtractor,
    codec: Bech32Codec,
    pool: P,
    settlement: S,
}

impl<P, S> AdmissionBridge<P, S>
where
    P: ExecutionPool,
    S: AuctionSettlement,
{
    /// Creates a bridge over an already constructed pool and settlement.
    pub fn new(extractor: BidExtractor, codec: Bech32Codec, pool: P, settlement: S) -> Self {
        Self(Arc::new(Inner {
            extractor,
            codec,
            pool,
            settlement,
        }))
    }

    /// Creates a bridge whose extractor and address codec come from `config`.
    pub fn from_config(config: &AuctionBridgeConfig, pool: P, settlement: S) -> anyhow::Result<Self> {
        let extractor = BidExtractor::from_config(&config.auction)?;
        let codec = config.address.codec()?;
        Ok(Self::new(extractor, codec, pool, settlement))
    }

    /// The execution pool transactions are admitted into.
    pub fn pool(&self) -> &P {
        &self.0.pool
    }

    /// The settlement mechanism bids are handed to.
    pub fn settlement(&self) -> &S {
        &self.0.settlement
    }

    /// Classifies `tx` and admits it into the execution pool if it passes.
    ///
    /// A rejected transaction leaves the pool and the settlement untouched.
    pub fn admit(&self, tx: EvmTransaction) -> Result<Admission, AdmissionError> {
        let tx_hash = tx.hash();
        let result = self.admit_inner(tx);
        if let Err(e) = &result {
            tracing::warn!(
                tx_hash = %tx_hash,
                reason = e.reason(),
                error = %e,
                "Transaction rejected"
            );
            sov_metrics::update_metrics(|metrics| metrics.txs_rejected.inc());
        }
        result
    }

    fn admit_inner(&self, tx: EvmTransaction) -> Result<Admission, AdmissionError> {
        let tx_hash = tx.hash();

        let bid = match self.0.extractor.extract_bid(&tx)? {
            Classification::Ordinary => {
                self.0.pool.admit(tx)?;
                tracing::debug!(tx_hash = %tx_hash, "Ordinary transaction admitted");
                sov_metrics::update_metrics(|metrics| metrics.ordinary_txs_admitted.inc());
                return Ok(Admission::Ordinary { tx_hash });
            }
            Classification::Bid(bid) => bid,
        };

        validate_bid(&tx, &bid)?;
        self.0.pool.admit(tx)?;

        let bidder = self.0.codec.encode(&bid.bidder);
        tracing::info!(
            tx_hash = %tx_hash,
            bidder = %bidder,
            bid = %bid.bid,
            bundle_len = bid.transactions.len(),
            timeout = bid.timeout,
            "Bid transaction admitted"
        );
        sov_metrics::update_metrics(|metrics| metrics.bid_txs_admitted.inc());

        let settlement = match self.0.settlement.submit_bid(bid.clone()) {
            Ok(()) => {
                sov_metrics::update_metrics(|metrics| metrics.bids_settled.inc());
                SettlementStatus::Accepted
            }
            Err(e) => {
                tracing::warn!(
                    tx_hash = %tx_hash,
                    bidder = %bidder,
                    error = %e,
                    "Settlement refused an admitted bid"
                );
                sov_metrics::update_metrics(|metrics| metrics.bids_refused_by_settlement.inc());
                SettlementStatus::Refused(e)
            }
        };

        Ok(Admission::Bid {
            tx_hash,
            bid,
            settlement,
        })
    }

    /// Unwraps a consensus transaction and admits the EVM transaction it carries.
    ///
    /// Returns `Ok(None)` when the envelope holds no EVM transaction.
    pub fn admit_consensus_tx(
        &self,
        tx: &ConsensusTx,
    ) -> Result<Option<Admission>, AdmissionError> {
        let evm_tx = match tx.evm_transaction() {
            Ok(Some(evm_tx)) => evm_tx,
            Ok(None) => {
                tracing::trace!("Skipping consensus transaction without EVM message");
                sov_metrics::update_metrics(|metrics| metrics.non_evm_txs_skipped.inc());
                return Ok(None);
            }
            Err(e) => {
                let e = AdmissionError::from(e);
                tracing::warn!(reason = e.reason(), error = %e, "Transaction rejected");
                sov_metrics::update_metrics(|metrics| metrics.txs_rejected.inc());
                return Err(e);
            }
        };

        self.admit(evm_tx).map(Some)
    }

    /// Admits the consensus mempool stream in order until it closes.
    pub async fn run(&self, mut receiver: mpsc::Receiver<ConsensusTx>) -> AdmissionReport {
        let mut report = AdmissionReport::default();
        while let Some(tx) = receiver.recv().await {
            match self.admit_consensus_tx(&tx) {
                Ok(None) => report.skipped += 1,
                Ok(Some(Admission::Ordinary { .. })) => report.ordinary += 1,
                Ok(Some(Admission::Bid { settlement, .. })) => {
                    report.bids += 1;
                    if let SettlementStatus::Refused(_) = settlement {
                        report.settlement_refused += 1;
                    }
                }
                Err(_) => report.rejected += 1,
            }
        }
        tracing::info!(?report, "Consensus mempool stream closed");
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ethers_core::abi::Token;
    use ethers_core::types::{Address, U256};

    use super::*;
    use crate::test_utils::{
        bid_extractor, bid_extractor_with_recovery, encode_place_bid, FailingRecovery,
        RecordingPool, RecordingSettlement, TestSigner,
    };
    use crate::tx::{ConsensusMsg, RlpEvmTransaction};

    type TestBridge = AdmissionBridge<RecordingPool, RecordingSettlement>;

    fn bridge() -> TestBridge {
        bridge_with(RecordingPool::default(), RecordingSettlement::default())
    }

    fn bridge_with(pool: RecordingPool, settlement: RecordingSettlement) -> TestBridge {
        AdmissionBridge::new(
            bid_extractor(),
            Bech32Codec::new("cosmos").unwrap(),
            pool,
            settlement,
        )
    }

    fn bid_contract() -> Address {
        Address::from([0xb1; 20])
    }

    fn bid_tx(value: u64, bundle: &[Vec<u8>]) -> EvmTransaction {
        let data = encode_place_bid(100, bundle, 1000);
        TestSigner::new_random().sign_call(bid_contract(), U256::from(value), data, 0)
    }

    #[test]
    fn valid_bid_is_admitted_and_settled() {
        let bridge = bridge();
        let tx = bid_tx(0, &[b"tx1".to_vec(), b"tx2".to_vec()]);

        let Admission::Bid {
            tx_hash,
            bid,
            settlement,
        } = bridge.admit(tx.clone()).unwrap()
        else {
            panic!("expected a bid admission");
        };

        assert_eq!(tx_hash, tx.hash());
        assert_eq!(bid.bid.amount, U256::from(100));
        assert_eq!(bid.transactions.len(), 2);
        assert_eq!(settlement, SettlementStatus::Accepted);
        assert_eq!(bridge.pool().admitted(), vec![tx]);
        assert_eq!(bridge.settlement().bids(), vec![bid]);
    }

    #[test]
    fn bid_with_value_is_rejected_without_side_effects() {
        let bridge = bridge();
        let err = bridge
            .admit(bid_tx(1, &[b"tx1".to_vec(), b"tx2".to_vec()]))
            .unwrap_err();

        assert_eq!(err.reason(), "NonZeroValueBid");
        assert!(bridge.pool().admitted().is_empty());
        assert!(bridge.settlement().bids().is_empty());
    }

    #[test]
    fn bid_with_empty_bundle_is_rejected() {
        let err = bridge().admit(bid_tx(0, &[])).unwrap_err();
        assert_eq!(
            err,
            AdmissionError::Validation(ValidationError::EmptyBundle)
        );
    }

    #[test]
    fn bid_with_empty_entry_is_rejected() {
        let err = bridge()
            .admit(bid_tx(0, &[b"tx1".to_vec(), vec![]]))
            .unwrap_err();
        assert_eq!(
            err,
            AdmissionError::Validation(ValidationError::EmptyBundleEntry { index: 1 })
        );
        assert_eq!(err.reason(), "EmptyBundleEntry");
    }

    #[test]
    fn unrelated_call_takes_ordinary_path() {
        let bridge = bridge();
        let transfer =
            crate::abi::parse_function("function transfer(address to, uint256 amount)").unwrap();
        let data = transfer
            .encode_input(&[Token::Address(Address::from([2; 20])), Token::Uint(5.into())])
            .unwrap();
        // Attached value would fail bid validation, so admission proves the
        // validator never ran.
        let tx = TestSigner::new_random().sign_call(bid_contract(), U256::from(9), data, 0);

        assert_eq!(
            bridge.admit(tx.clone()),
            Ok(Admission::Ordinary {
                tx_hash: tx.hash()
            })
        );
        assert_eq!(bridge.pool().admitted()[0].raw(), tx.raw());
        assert!(bridge.settlement().bids().is_empty());
    }

    #[test]
    fn unrecoverable_bid_sender_is_rejected() {
        let bridge = AdmissionBridge::new(
            bid_extractor_with_recovery(Arc::new(FailingRecovery)),
            Bech32Codec::new("cosmos").unwrap(),
            RecordingPool::default(),
            RecordingSettlement::default(),
        );

        let err = bridge.admit(bid_tx(0, &[b"tx".to_vec()])).unwrap_err();
        assert_eq!(err.reason(), "SenderRecoveryFailed");
        assert!(bridge.pool().admitted().is_empty());
    }

    #[test]
    fn pool_refusal_is_passed_through() {
        let refusal = PoolError::Rejected("nonce too low".to_string());
        let bridge = bridge_with(
            RecordingPool::refusing(refusal.clone()),
            RecordingSettlement::default(),
        );

        let err = bridge.admit(bid_tx(0, &[b"tx".to_vec()])).unwrap_err();
        assert_eq!(err, AdmissionError::Pool(refusal));
        assert_eq!(err.to_string(), "nonce too low");
        assert!(bridge.settlement().bids().is_empty());
    }

    #[test]
    fn settlement_refusal_keeps_admission() {
        let bridge = bridge_with(
            RecordingPool::default(),
            RecordingSettlement::refusing(SettlementError::Closed),
        );
        let tx = bid_tx(0, &[b"tx".to_vec()]);

        let Admission::Bid { settlement, .. } = bridge.admit(tx.clone()).unwrap() else {
            panic!("expected a bid admission");
        };
        assert_eq!(settlement, SettlementStatus::Refused(SettlementError::Closed));
        assert_eq!(bridge.pool().admitted(), vec![tx]);
    }

    #[test]
    fn consensus_envelopes_are_unwrapped_or_skipped() {
        let bridge = bridge();
        let tx = bid_tx(0, &[b"tx".to_vec()]);

        let admission = bridge
            .admit_consensus_tx(&ConsensusTx::wrap(&tx))
            .unwrap()
            .unwrap();
        assert_eq!(admission.tx_hash(), tx.hash());

        let other = ConsensusTx {
            messages: vec![ConsensusMsg::Other {
                type_url: "/cosmos.bank.v1beta1.MsgSend".to_string(),
                value: vec![1],
            }],
        };
        assert_eq!(bridge.admit_consensus_tx(&other), Ok(None));

        let broken = ConsensusTx {
            messages: vec![ConsensusMsg::EvmTransaction(RlpEvmTransaction {
                rlp: vec![0xc0],
            })],
        };
        let err = bridge.admit_consensus_tx(&broken).unwrap_err();
        assert_eq!(err.reason(), "InvalidEnvelope");
    }

    #[tokio::test]
    async fn run_reports_every_terminal_state() {
        let bridge = bridge();
        let signer = TestSigner::new_random();
        let (sender, receiver) = mpsc::channel(8);

        let ordinary = signer.sign_call(Address::from([1; 20]), U256::zero(), vec![], 0);
        let bid = bid_tx(0, &[b"tx".to_vec()]);
        let rejected = bid_tx(0, &[]);

        for tx in [&ordinary, &bid, &rejected] {
            sender.send(ConsensusTx::wrap(tx)).await.unwrap();
        }
        sender.send(ConsensusTx::default()).await.unwrap();
        drop(sender);

        let report = bridge.run(receiver).await;
        assert_eq!(
            report,
            AdmissionReport {
                ordinary: 1,
                bids: 1,
                settlement_refused: 0,
                rejected: 1,
                skipped: 1,
            }
        );
        let admitted: Vec<_> = bridge
            .pool()
            .admitted()
            .iter()
            .map(|tx| tx.raw().to_vec())
            .collect();
        assert_eq!(admitted, vec![ordinary.raw().to_vec(), bid.raw().to_vec()]);
    }
}
