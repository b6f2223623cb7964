//! Transaction representations on both sides of the bridge.

use borsh::{BorshDeserialize, BorshSerialize};
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, Bytes, Signature, H256, U256};
use ethers_core::utils::keccak256;
use ethers_core::utils::rlp::Rlp;

/// A signed EVM transaction as admitted into the execution pool.
///
/// Keeps the exact bytes it was decoded from so that forwarding never
/// re-encodes the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmTransaction {
    inner: TypedTransaction,
    signature: Signature,
    raw: Bytes,
    hash: H256,
}

/// Error that happened while decoding a raw EVM transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TxDecodeError {
    /// Raw transaction is empty.
    #[error("Empty raw transaction")]
    EmptyRawTx,
    /// RLP decoding has failed.
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),
}

impl EvmTransaction {
    /// Decodes an EIP-2718 envelope (or a legacy RLP list) carrying a signed transaction.
    pub fn decode(raw: &[u8]) -> Result<Self, TxDecodeError> {
        if raw.is_empty() {
            return Err(TxDecodeError::EmptyRawTx);
        }

        let (inner, signature) = TypedTransaction::decode_signed(&Rlp::new(raw))
            .map_err(|e| TxDecodeError::DeserializationFailed(e.to_string()))?;

        Ok(Self {
            inner,
            signature,
            raw: Bytes::from(raw.to_vec()),
            hash: H256(keccak256(raw)),
        })
    }

    /// Assembles a transaction from its unsigned body and signature.
    pub fn from_signed(inner: TypedTransaction, signature: Signature) -> Self {
        let raw = inner.rlp_signed(&signature);
        let hash = H256(keccak256(&raw));
        Self {
            inner,
            signature,
            raw,
            hash,
        }
    }

    /// Keccak hash of the raw transaction; the pool's identity for it.
    pub fn hash(&self) -> H256 {
        self.hash
    }

    /// The bytes this transaction was decoded from.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Call destination, `None` for contract creation.
    pub fn to(&self) -> Option<Address> {
        self.inner.to_addr().copied()
    }

    /// Native value attached to the call.
    pub fn value(&self) -> U256 {
        self.inner.value().copied().unwrap_or_default()
    }

    /// Call data.
    pub fn input(&self) -> &[u8] {
        self.inner.data().map(|data| &data[..]).unwrap_or_default()
    }

    /// Declared chain identifier.
    pub fn chain_id(&self) -> Option<u64> {
        self.inner.chain_id().map(|id| id.as_u64())
    }

    /// Gas price, or the fee cap for dynamic-fee transactions.
    pub fn gas_price(&self) -> U256 {
        self.inner.gas_price().unwrap_or_default()
    }

    /// The transaction signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The hash the sender signed.
    pub fn sighash(&self) -> H256 {
        self.inner.sighash()
    }
}

/// RLP encoded EVM transaction as carried inside a consensus transaction.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RlpEvmTransaction {
    /// Rlp data.
    pub rlp: Vec<u8>,
}

/// A message of a consensus transaction.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum ConsensusMsg {
    /// A wrapped EVM transaction.
    EvmTransaction(RlpEvmTransaction),
    /// Any other message, opaque to the bridge.
    Other {
        /// Message type identifier.
        type_url: String,
        /// Encoded message.
        value: Vec<u8>,
    },
}

/// A transaction as ordered by the consensus mempool.
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ConsensusTx {
    /// Messages in execution order.
    pub messages: Vec<ConsensusMsg>,
}

/// Error returned when a consensus transaction cannot be unwrapped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    /// EVM transactions must travel alone in their consensus transaction.
    #[error("invalid transaction: {evm_messages} EVM message(s) among {total_messages} message(s)")]
    MixedMessages {
        /// Number of EVM messages found.
        evm_messages: usize,
        /// Total number of messages.
        total_messages: usize,
    },
    /// The wrapped EVM transaction does not decode.
    #[error(transparent)]
    Decode(#[from] TxDecodeError),
}

impl ConsensusTx {
    /// Wraps an EVM transaction for broadcast to consensus peers.
    pub fn wrap(tx: &EvmTransaction) -> Self {
        Self {
            messages: vec![ConsensusMsg::EvmTransaction(RlpEvmTransaction {
                rlp: tx.raw().to_vec(),
            })],
        }
    }

    /// Returns the EVM transaction carried by this consensus transaction.
    ///
    /// `Ok(None)` means the transaction carries no EVM message at all.
    pub fn evm_transaction(&self) -> Result<Option<EvmTransaction>, EnvelopeError> {
        let evm_txs: Vec<&RlpEvmTransaction> = self
            .messages
            .iter()
            .filter_map(|msg| match msg {
                ConsensusMsg::EvmTransaction(tx) => Some(tx),
                ConsensusMsg::Other { .. } => None,
            })
            .collect();

        match (evm_txs.as_slice(), self.messages.len()) {
            ([], _) => Ok(None),
            ([tx], 1) => Ok(Some(EvmTransaction::decode(&tx.rlp)?)),
            (evm_txs, total_messages) => Err(EnvelopeError::MixedMessages {
                evm_messages: evm_txs.len(),
                total_messages,
            }),
        }
    }
}
