//! Execution-to-consensus address mapping.
//!
//! The execution pool identifies accounts by 20-byte EVM addresses while the
//! auction accounts for bids in the consensus address space. The two are kept
//! as distinct types; the only conversion is [`to_consensus_address`].

use core::fmt;

use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Hrp};
use borsh::{BorshDeserialize, BorshSerialize};
use ethers_core::types::Address;

/// Width of a consensus account address.
pub const CONSENSUS_ADDRESS_LEN: usize = 20;

// BIP-173 caps a bech32 string at 90 characters: the prefix, the `1`
// separator, 32 data characters for a 20-byte address and a 6-character checksum.
const MAX_BECH32_LEN: usize = 90;
const ENCODED_ADDRESS_LEN: usize = 1 + (CONSENSUS_ADDRESS_LEN * 8).div_ceil(5) + 6;

/// An account address in the consensus (auction accounting) address space.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize)]
pub struct ConsensusAddress([u8; CONSENSUS_ADDRESS_LEN]);

impl ConsensusAddress {
    /// Creates a new address containing the given bytes.
    pub const fn new(addr: [u8; CONSENSUS_ADDRESS_LEN]) -> Self {
        Self(addr)
    }

    /// Exposes the inner bytes of the address.
    pub const fn as_bytes(&self) -> &[u8; CONSENSUS_ADDRESS_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for ConsensusAddress {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Address> for ConsensusAddress {
    fn from(addr: Address) -> Self {
        Self(addr.0)
    }
}

impl fmt::Debug for ConsensusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConsensusAddress(0x{})", hex::encode(self.0))
    }
}

/// Maps an execution-side sender to the account that the auction charges.
///
/// The mapping keeps the account's 20 key-derived bytes, so it is total,
/// deterministic and injective.
pub fn to_consensus_address(addr: &Address) -> ConsensusAddress {
    ConsensusAddress::from(*addr)
}

/// A bech32 address parse error.
#[derive(Debug, thiserror::Error)]
pub enum Bech32ParseError {
    /// Bech32 decoding error represented via [bech32::primitives::decode::CheckedHrpstringError].
    #[error("Bech32 error: {0}")]
    Bech32(#[from] bech32::primitives::decode::CheckedHrpstringError),
    /// The configured "Human-Readable Part" is not a valid prefix.
    #[error("Invalid HRP: {0}")]
    InvalidHrp(#[from] bech32::primitives::hrp::Error),
    /// The configured "Human-Readable Part" does not leave room for an address.
    #[error("HRP too long: {0}")]
    HrpTooLong(String),
    /// The provided "Human-Readable Part" is not the configured one.
    #[error("Wrong HRP: {0}")]
    WrongHRP(String),
    /// The payload is not a consensus address.
    #[error("Wrong address length: {0}")]
    WrongLength(usize),
}

/// Renders and parses [`ConsensusAddress`]es with a configured bech32 prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bech32Codec {
    hrp: Hrp,
}

impl Bech32Codec {
    /// Creates a codec for the given human readable prefix.
    pub fn new(prefix: &str) -> Result<Self, Bech32ParseError> {
        let hrp = Hrp::parse(prefix)?;
        if prefix.len() + ENCODED_ADDRESS_LEN > MAX_BECH32_LEN {
            return Err(Bech32ParseError::HrpTooLong(prefix.to_string()));
        }
        Ok(Self { hrp })
    }

    /// Returns the human readable prefix.
    pub fn prefix(&self) -> &str {
        self.hrp.as_str()
    }

    /// Encodes `addr` as a bech32 string.
    pub fn encode(&self, addr: &ConsensusAddress) -> String {
        bech32::encode::<Bech32>(self.hrp, addr.as_ref())
            .expect("Prefix length is validated at construction")
    }

    /// Parses a bech32 string produced with this codec's prefix.
    pub fn decode(&self, s: &str) -> Result<ConsensusAddress, Bech32ParseError> {
        let hrp_string = CheckedHrpstring::new::<Bech32>(s)?;

        if hrp_string.hrp().as_str() != self.hrp.as_str() {
            return Err(Bech32ParseError::WrongHRP(hrp_string.hrp().to_string()));
        }

        let bytes: Vec<u8> = hrp_string.byte_iter().collect();
        let addr: [u8; CONSENSUS_ADDRESS_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| Bech32ParseError::WrongLength(bytes.len()))?;
        Ok(ConsensusAddress::new(addr))
    }
}
