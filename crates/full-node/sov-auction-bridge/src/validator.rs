//! Structural checks on extracted bids.
//!
//! The execution pool has no chance to validate bids itself, so these checks
//! run before admission. Bundle entries are opaque here: whether each one is
//! an executable transaction is decided by whoever executes the bundle.

use ethers_core::types::U256;

use crate::bid::BidInfo;
use crate::tx::EvmTransaction;

/// A bid violates an admission invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Native value was attached to the bid call.
    #[error("a bid transaction must not send any {denom} to the bid contract (sent {value})")]
    NonZeroValueBid {
        /// Denomination of the attached value.
        denom: String,
        /// Attached value.
        value: U256,
    },
    /// The bundle has no transactions.
    #[error("bundle of transactions must not be empty")]
    EmptyBundle,
    /// A bundle entry has no bytes.
    #[error("transaction bundle must not contain empty transactions (entry {index} is empty)")]
    EmptyBundleEntry {
        /// Position of the empty entry.
        index: usize,
    },
}

/// Checks `bid`, extracted from `tx`, reporting the first violated invariant.
pub fn validate_bid(tx: &EvmTransaction, bid: &BidInfo) -> Result<(), ValidationError> {
    let value = tx.value();
    if !value.is_zero() {
        return Err(ValidationError::NonZeroValueBid {
            denom: bid.bid.denom.clone(),
            value,
        });
    }

    if bid.transactions.is_empty() {
        return Err(ValidationError::EmptyBundle);
    }

    if let Some(index) = bid.transactions.iter().position(|tx| tx.is_empty()) {
        return Err(ValidationError::EmptyBundleEntry { index });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use ethers_core::types::Address;
    use proptest::prelude::*;

    use super::*;
    use crate::address::ConsensusAddress;
    use crate::bid::Coin;
    use crate::test_utils::TestSigner;

    fn bid_with(transactions: Vec<Vec<u8>>) -> BidInfo {
        BidInfo {
            bidder: ConsensusAddress::new([1; 20]),
            bid: Coin {
                denom: "abera".to_string(),
                amount: U256::from(100),
            },
            transactions,
            timeout: 1000,
        }
    }

    fn tx_with_value(value: u64) -> EvmTransaction {
        TestSigner::new_random().sign_call(Address::from([2; 20]), U256::from(value), vec![], 0)
    }

    #[test]
    fn accepts_well_formed_bid() {
        let bid = bid_with(vec![b"tx1".to_vec(), b"tx2".to_vec()]);
        assert_eq!(validate_bid(&tx_with_value(0), &bid), Ok(()));
    }

    #[test]
    fn rejects_attached_value() {
        let bid = bid_with(vec![b"tx1".to_vec()]);
        assert_eq!(
            validate_bid(&tx_with_value(1), &bid),
            Err(ValidationError::NonZeroValueBid {
                denom: "abera".to_string(),
                value: U256::one(),
            })
        );
    }

    #[test]
    fn rejects_empty_bundle() {
        assert_eq!(
            validate_bid(&tx_with_value(0), &bid_with(vec![])),
            Err(ValidationError::EmptyBundle)
        );
    }

    #[test]
    fn reports_first_empty_entry() {
        let bid = bid_with(vec![b"tx1".to_vec(), vec![], vec![]]);
        assert_eq!(
            validate_bid(&tx_with_value(0), &bid),
            Err(ValidationError::EmptyBundleEntry { index: 1 })
        );
    }

    proptest! {
        #[test]
        fn attached_value_fails_regardless_of_bundle(
            value in 1u64..,
            bundle in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..8), 0..4),
        ) {
            let err = validate_bid(&tx_with_value(value), &bid_with(bundle)).unwrap_err();
            let is_value_error = matches!(err, ValidationError::NonZeroValueBid { .. });
            prop_assert!(is_value_error);
        }
    }
}
