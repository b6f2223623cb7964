//! Bridge configuration.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::abi::{function_from_abi_json, parse_function, SignatureTable, DEFAULT_BID_FUNCTION};
use crate::address::Bech32Codec;
use crate::pool::FairTxPool;

/// Admission bridge configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct AuctionBridgeConfig {
    /// Bid recognition.
    pub auction: AuctionConfig,
    /// Consensus address rendering.
    pub address: AddressConfig,
    /// In-memory execution pool.
    #[serde(default)]
    pub pool: TxPoolConfig,
}

/// How bid transactions are recognized and priced.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct AuctionConfig {
    /// Denomination of the EVM's native token; bids are priced in it.
    pub evm_denom: String,
    /// Human-readable signature of the place-bid function.
    #[serde(default = "default_bid_function")]
    pub bid_function: String,
    /// JSON ABI of the bid contract. Takes precedence over `bid_function`.
    #[serde(default)]
    pub contract_abi_path: Option<PathBuf>,
    /// Name of the place-bid method inside `contract_abi_path`.
    #[serde(default = "default_bid_method")]
    pub bid_method: String,
}

/// Consensus address settings.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct AddressConfig {
    /// Bech32 human readable prefix of consensus account addresses.
    pub bech32_prefix: String,
}

/// In-memory execution pool settings.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct TxPoolConfig {
    /// Maximum number of transactions held before the oldest are evicted.
    #[serde(default = "default_max_txs_count")]
    pub max_txs_count: usize,
    /// Minimum gas price (in wei) accepted by the pool.
    #[serde(default)]
    pub min_gas_price: u64,
}

impl Default for TxPoolConfig {
    fn default() -> Self {
        Self {
            max_txs_count: default_max_txs_count(),
            min_gas_price: 0,
        }
    }
}

fn default_bid_function() -> String {
    DEFAULT_BID_FUNCTION.to_string()
}

fn default_bid_method() -> String {
    "bid".to_string()
}

fn default_max_txs_count() -> usize {
    4096
}

impl AuctionBridgeConfig {
    /// Reads the configuration from a toml file.
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        from_toml_path(path)
    }
}

impl AuctionConfig {
    /// Resolves the place-bid function into a [`SignatureTable`].
    pub fn signature_table(&self) -> anyhow::Result<SignatureTable> {
        let function = match &self.contract_abi_path {
            Some(path) => {
                let abi_json = std::fs::read_to_string(path)?;
                function_from_abi_json(&abi_json, &self.bid_method)?
            }
            None => parse_function(&self.bid_function)?,
        };
        SignatureTable::with_place_bid(function)
    }
}

impl AddressConfig {
    /// Builds the bech32 codec for consensus addresses.
    pub fn codec(&self) -> anyhow::Result<Bech32Codec> {
        Ok(Bech32Codec::new(&self.bech32_prefix)?)
    }
}

impl TxPoolConfig {
    /// Creates an empty pool with these settings.
    pub fn build_pool(&self) -> anyhow::Result<FairTxPool> {
        FairTxPool::new(self)
    }
}

/// Reads toml file as a specific type.
pub fn from_toml_path<P: AsRef<Path>, R: DeserializeOwned>(path: P) -> anyhow::Result<R> {
    let mut contents = String::new();
    {
        let mut file = File::open(path)?;
        file.read_to_string(&mut contents)?;
    }
    tracing::debug!(
        size_in_bytes = contents.len(),
        contents,
        "Parsing config file"
    );

    let result: R = toml::from_str(&contents)?;

    Ok(result)
}
