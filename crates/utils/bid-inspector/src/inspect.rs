use serde::Serialize;
use sov_auction_bridge::address::Bech32Codec;
use sov_auction_bridge::config::AuctionBridgeConfig;
use sov_auction_bridge::{
    validate_bid, AdmissionError, BidExtractor, BidInfo, Classification, EvmTransaction,
};

/// Classifies raw transactions without admitting them anywhere.
pub(crate) struct Inspector {
    extractor: BidExtractor,
    codec: Bech32Codec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum VerdictKind {
    Ordinary,
    Bid,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Verdict {
    pub(crate) tx_hash: Option<String>,
    pub(crate) verdict: VerdictKind,
    pub(crate) reason: Option<&'static str>,
    pub(crate) error: Option<String>,
    pub(crate) bid: Option<BidView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct BidView {
    pub(crate) bidder: String,
    pub(crate) amount: String,
    pub(crate) denom: String,
    pub(crate) transactions: Vec<String>,
    pub(crate) timeout: u64,
}

impl Verdict {
    fn rejected(tx_hash: Option<String>, reason: &'static str, error: String) -> Self {
        Self {
            tx_hash,
            verdict: VerdictKind::Rejected,
            reason: Some(reason),
            error: Some(error),
            bid: None,
        }
    }
}

impl Inspector {
    pub(crate) fn new(extractor: BidExtractor, codec: Bech32Codec) -> Self {
        Self { extractor, codec }
    }

    pub(crate) fn from_config(config: &AuctionBridgeConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            BidExtractor::from_config(&config.auction)?,
            config.address.codec()?,
        ))
    }

    /// Classifies a hex-encoded raw transaction, with or without `0x` prefix.
    pub(crate) fn inspect(&self, raw_hex: &str) -> Verdict {
        let raw_hex = raw_hex.strip_prefix("0x").unwrap_or(raw_hex);
        let raw = match hex::decode(raw_hex) {
            Ok(raw) => raw,
            Err(e) => return Verdict::rejected(None, "InvalidHex", e.to_string()),
        };
        let tx = match EvmTransaction::decode(&raw) {
            Ok(tx) => tx,
            Err(e) => return Verdict::rejected(None, "InvalidTransaction", e.to_string()),
        };
        let tx_hash = Some(format!("{:?}", tx.hash()));

        match self.classify(&tx) {
            Ok(Classification::Ordinary) => Verdict {
                tx_hash,
                verdict: VerdictKind::Ordinary,
                reason: None,
                error: None,
                bid: None,
            },
            Ok(Classification::Bid(bid)) => Verdict {
                tx_hash,
                verdict: VerdictKind::Bid,
                reason: None,
                error: None,
                bid: Some(self.view(&bid)),
            },
            Err(e) => {
                tracing::debug!(tx_hash = ?tx.hash(), error = %e, "Transaction would be rejected");
                Verdict::rejected(tx_hash, e.reason(), e.to_string())
            }
        }
    }

    fn classify(&self, tx: &EvmTransaction) -> Result<Classification, AdmissionError> {
        let classification = self.extractor.extract_bid(tx)?;
        if let Classification::Bid(bid) = &classification {
            validate_bid(tx, bid)?;
        }
        Ok(classification)
    }

    fn view(&self, bid: &BidInfo) -> BidView {
        BidView {
            bidder: self.codec.encode(&bid.bidder),
            amount: bid.bid.amount.to_string(),
            denom: bid.bid.denom.clone(),
            transactions: bid
                .transactions
                .iter()
                .map(|tx| format!("0x{}", hex::encode(tx)))
                .collect(),
            timeout: bid.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use ethers_core::types::{Address, U256};
    use sov_auction_bridge::address::to_consensus_address;
    use sov_auction_bridge::test_utils::{bid_extractor, encode_place_bid, TestSigner, TEST_DENOM};

    use super::*;

    fn inspector() -> Inspector {
        Inspector::new(bid_extractor(), Bech32Codec::new("cosmos").unwrap())
    }

    fn to_hex(tx: &EvmTransaction) -> String {
        format!("0x{}", hex::encode(tx.raw()))
    }

    #[test]
    fn reports_bid_details() {
        let signer = TestSigner::new_random();
        let tx = signer.sign_call(
            Address::from([0xb1; 20]),
            U256::zero(),
            encode_place_bid(100, &[b"tx1".to_vec()], 1000),
            0,
        );

        let verdict = inspector().inspect(&to_hex(&tx));

        assert_eq!(verdict.verdict, VerdictKind::Bid);
        let bid = verdict.bid.unwrap();
        assert_eq!(
            bid,
            BidView {
                bidder: Bech32Codec::new("cosmos")
                    .unwrap()
                    .encode(&to_consensus_address(&signer.address())),
                amount: "100".to_string(),
                denom: TEST_DENOM.to_string(),
                transactions: vec![format!("0x{}", hex::encode(b"tx1"))],
                timeout: 1000,
            }
        );
    }

    #[test]
    fn reports_rejection_reason() {
        let tx = TestSigner::new_random().sign_call(
            Address::from([0xb1; 20]),
            U256::zero(),
            encode_place_bid(1, &[b"tx1".to_vec(), vec![]], 1),
            0,
        );

        let verdict = inspector().inspect(&to_hex(&tx));
        assert_eq!(verdict.verdict, VerdictKind::Rejected);
        assert_eq!(verdict.reason, Some("EmptyBundleEntry"));
        assert_eq!(verdict.tx_hash, Some(format!("{:?}", tx.hash())));
    }

    #[test]
    fn ordinary_transaction_serializes_as_json_line() {
        let tx =
            TestSigner::new_random().sign_call(Address::from([1; 20]), U256::zero(), vec![], 0);

        let verdict = inspector().inspect(hex::encode(tx.raw()).as_str());
        let json: serde_json::Value = serde_json::to_value(&verdict).unwrap();

        assert_eq!(json["verdict"], "ordinary");
        assert!(json["reason"].is_null());
        assert!(json["bid"].is_null());
    }

    #[test]
    fn garbage_input_is_rejected() {
        assert_eq!(inspector().inspect("0xzz").reason, Some("InvalidHex"));
        assert_eq!(
            inspector().inspect("0xff0013").reason,
            Some("InvalidTransaction")
        );
    }
}
