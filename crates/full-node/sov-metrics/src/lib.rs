//! Prometheus metrics for the auction-aware admission bridge.

#![deny(missing_docs)]

use std::sync::OnceLock;

use prometheus::{register_int_counter_with_registry, IntCounter};

/// Applies a function to the global [`Metrics`] instance if and only if the
/// `native` feature is enabled.
pub fn update_metrics<F>(f: F)
where
    F: FnOnce(&Metrics),
{
    if cfg!(feature = "native") {
        static METRICS: OnceLock<Metrics> = OnceLock::new();

        f(OnceLock::get_or_init(&METRICS, || {
            Metrics::new(prometheus::default_registry())
                .expect("failed to create new metrics; metric names must be unique")
        }));
    }
}

/// Prometheus metrics for transaction admission.
///
/// Values of this type are only accessible through the [`update_metrics`] function.
#[derive(Debug)]
pub struct Metrics {
    /// Number of ordinary (non-bid) transactions admitted into the execution pool.
    pub ordinary_txs_admitted: IntCounter,
    /// Number of bid transactions admitted into the execution pool.
    pub bid_txs_admitted: IntCounter,
    /// Number of transactions rejected by the bridge or the execution pool.
    pub txs_rejected: IntCounter,
    /// Number of bids accepted by the settlement mechanism.
    pub bids_settled: IntCounter,
    /// Number of bids refused by the settlement mechanism after admission.
    pub bids_refused_by_settlement: IntCounter,
    /// Number of consensus transactions that carried no EVM transaction.
    pub non_evm_txs_skipped: IntCounter,
}

impl Metrics {
    fn new(registry: &prometheus::Registry) -> prometheus::Result<Self> {
        let ordinary_txs_admitted = register_int_counter_with_registry!(
            "ordinary_txs_admitted",
            "Number of ordinary transactions admitted into the execution pool",
            registry,
        )?;

        let bid_txs_admitted = register_int_counter_with_registry!(
            "bid_txs_admitted",
            "Number of bid transactions admitted into the execution pool",
            registry,
        )?;

        let txs_rejected = register_int_counter_with_registry!(
            "txs_rejected",
            "Number of transactions rejected at admission",
            registry,
        )?;

        let bids_settled = register_int_counter_with_registry!(
            "bids_settled",
            "Number of bids accepted by the settlement mechanism",
            registry,
        )?;

        let bids_refused_by_settlement = register_int_counter_with_registry!(
            "bids_refused_by_settlement",
            "Number of admitted bids refused by the settlement mechanism",
            registry,
        )?;

        let non_evm_txs_skipped = register_int_counter_with_registry!(
            "non_evm_txs_skipped",
            "Number of consensus transactions without an EVM transaction",
            registry,
        )?;

        Ok(Self {
            ordinary_txs_admitted,
            bid_txs_admitted,
            txs_rejected,
            bids_settled,
            bids_refused_by_settlement,
            non_evm_txs_skipped,
        })
    }
}
