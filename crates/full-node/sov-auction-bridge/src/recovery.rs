use ethers_core::types::Address;

use crate::tx::EvmTransaction;

/// Recovers the sender of a signed EVM transaction.
pub trait SenderRecovery: Send + Sync {
    /// Returns the address whose key signed `tx`, using the chain id `tx` declares.
    fn recover_sender(&self, tx: &EvmTransaction) -> Result<Address, RecoveryError>;
}

/// Sender recovery failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to recover transaction sender: {0}")]
pub struct RecoveryError(pub String);

/// secp256k1 public key recovery over the transaction's signing hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaRecovery;

impl SenderRecovery for EcdsaRecovery {
    fn recover_sender(&self, tx: &EvmTransaction) -> Result<Address, RecoveryError> {
        tx.signature()
            .recover(tx.sighash())
            .map_err(|e| RecoveryError(e.to_string()))
    }
}
