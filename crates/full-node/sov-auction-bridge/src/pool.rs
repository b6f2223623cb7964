use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ethers_core::types::{H256, U256};

use crate::config::TxPoolConfig;
use crate::tx::EvmTransaction;

/// The execution-side transaction pool the bridge admits into.
///
/// Implementations own their ordering, capacity and eviction; the bridge only
/// reports their verdict.
pub trait ExecutionPool: Send + Sync {
    /// Inserts `tx`. Admission must be idempotent per transaction hash.
    fn admit(&self, tx: EvmTransaction) -> Result<(), PoolError>;
}

/// Reasons an execution pool refuses a transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The transaction is already in the pool.
    #[error("already known: {0:?}")]
    AlreadyKnown(H256),
    /// The transaction pays less than the pool's minimum gas price.
    #[error("transaction underpriced: gas price {gas_price} is below minimum {minimum}")]
    Underpriced {
        /// Offered gas price.
        gas_price: U256,
        /// Pool minimum.
        minimum: U256,
    },
    /// Any other refusal from a pool implementation, reported verbatim.
    #[error("{0}")]
    Rejected(String),
}

/// A transaction held by [`FairTxPool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PooledTx {
    /// The admitted transaction.
    pub tx: EvmTransaction,
    /// An incremental counter used to order transactions by insertion time.
    pub incremental_id: u64,
}

/// In-memory [`ExecutionPool`] serving the best-paying transactions first.
///
/// All state sits behind a single lock, which is the only synchronization
/// point on the admission path.
#[derive(Debug)]
pub struct FairTxPool {
    max_txs_count: usize,
    min_gas_price: U256,
    state: Mutex<PoolState>,
}

#[derive(Debug, Default)]
struct PoolState {
    next_incr_id: u64,
    txs_ordered_by_price: BTreeMap<PoolCursor, Arc<PooledTx>>,
    txs_ordered_by_incremental_id: BTreeMap<u64, Arc<PooledTx>>,
    txs_by_hash: HashMap<H256, Arc<PooledTx>>,
}

impl FairTxPool {
    /// Creates an empty pool.
    ///
    /// A pool that can hold no transaction would evict every admission right
    /// after accepting it, so `max_txs_count` must be at least 1.
    pub fn new(config: &TxPoolConfig) -> anyhow::Result<Self> {
        if config.max_txs_count == 0 {
            anyhow::bail!("`max_txs_count` of the execution pool must be at least 1");
        }
        Ok(Self {
            max_txs_count: config.max_txs_count,
            min_gas_price: U256::from(config.min_gas_price),
            state: Mutex::new(PoolState {
                // 0 is reserved as a special value for the cursor.
                next_incr_id: 1,
                ..Default::default()
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of transactions in the pool.
    pub fn len(&self) -> usize {
        self.state().txs_by_hash.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a transaction with `hash` is in the pool.
    pub fn contains(&self, hash: &H256) -> bool {
        self.state().txs_by_hash.contains_key(hash)
    }

    /// Fetches the next transaction after `cursor`, if any, and advances the
    /// cursor past it.
    pub fn next(&self, cursor: &mut PoolCursor) -> Option<Arc<PooledTx>> {
        let state = self.state();
        let (next_cursor, tx) = state
            .txs_ordered_by_price
            // The lower bound is excluded so the last transaction is not
            // fetched twice.
            .range((Bound::Excluded(*cursor), Bound::Unbounded))
            .next()?;

        *cursor = *next_cursor;
        Some(tx.clone())
    }

    /// Removes the given transactions, e.g. once they are included in a block.
    /// Unknown hashes are ignored.
    pub fn remove(&self, hashes: &[H256]) {
        let mut state = self.state();
        for hash in hashes {
            state.remove(hash);
        }
    }
}

impl PoolState {
    fn remove(&mut self, hash: &H256) {
        let Some(tx) = self.txs_by_hash.remove(hash) else {
            return;
        };
        self.txs_ordered_by_incremental_id.remove(&tx.incremental_id);
        self.txs_ordered_by_price.remove(&PoolCursor::of(&tx));
    }

    fn evict(&mut self, max_txs_count: usize) {
        while self.txs_by_hash.len() > max_txs_count {
            // We always evict the oldest transaction first.
            let Some(hash) = self
                .txs_ordered_by_incremental_id
                .first_key_value()
                .map(|(_, tx)| tx.tx.hash())
            else {
                return;
            };
            tracing::debug!(tx_hash = ?hash, "Evicting transaction from execution pool");
            self.remove(&hash);
        }
    }
}

impl ExecutionPool for FairTxPool {
    fn admit(&self, tx: EvmTransaction) -> Result<(), PoolError> {
        let hash = tx.hash();
        let gas_price = tx.gas_price();
        if gas_price < self.min_gas_price {
            return Err(PoolError::Underpriced {
                gas_price,
                minimum: self.min_gas_price,
            });
        }

        let mut state = self.state();
        if state.txs_by_hash.contains_key(&hash) {
            return Err(PoolError::AlreadyKnown(hash));
        }

        let pooled = Arc::new(PooledTx {
            tx,
            incremental_id: state.next_incr_id,
        });
        state.next_incr_id += 1;

        state
            .txs_ordered_by_incremental_id
            .insert(pooled.incremental_id, pooled.clone());
        state
            .txs_ordered_by_price
            .insert(PoolCursor::of(&pooled), pooled.clone());
        state.txs_by_hash.insert(hash, pooled);

        state.evict(self.max_txs_count);
        Ok(())
    }
}

/// An opaque cursor for [`FairTxPool`] iteration.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PoolCursor {
    gas_price: U256,
    incremental_id: u64,
}

impl PoolCursor {
    /// A cursor positioned before every transaction.
    pub fn start() -> Self {
        Self {
            gas_price: U256::MAX,
            incremental_id: 0,
        }
    }

    fn of(tx: &PooledTx) -> Self {
        Self {
            gas_price: tx.tx.gas_price(),
            incremental_id: tx.incremental_id,
        }
    }
}

impl Default for PoolCursor {
    fn default() -> Self {
        Self::start()
    }
}

impl PartialOrd for PoolCursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PoolCursor {
    fn cmp(&self, other: &Self) -> Ordering {
        // Transactions in the pool are ordered:
        // 1. from highest to lowest gas price, and
        // 2. by least recent to most recent after that.
        let price_ordering = self.gas_price.cmp(&other.gas_price).reverse();
        let temporal_ordering = self.incremental_id.cmp(&other.incremental_id);

        price_ordering.then(temporal_ordering)
    }
}
