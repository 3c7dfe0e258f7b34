//! Prometheus metrics for the ledger
//!
//! # Metrics
//!
//! - `parcel_ledger_transactions_total` - Committed transactions
//! - `parcel_ledger_transactions_rejected_total` - Rejected transactions
//! - `parcel_ledger_execution_duration_seconds` - Histogram of execution latencies
//! - `parcel_ledger_lamports_transferred_total` - Lamports moved by committed transactions
//! - `parcel_ledger_journal_height` - Slot of the latest journal entry

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
///
/// Each collector owns its registry, so several ledgers can live in one
/// process.
#[derive(Clone)]
pub struct Metrics {
    /// Committed transactions
    pub transactions_total: IntCounter,

    /// Rejected transactions
    pub transactions_rejected: IntCounter,

    /// Execution duration histogram
    pub execution_duration: Histogram,

    /// Lamports moved by committed transactions
    pub lamports_transferred: IntCounter,

    /// Latest journal slot
    pub journal_height: IntGauge,

    registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("transactions_total", &self.transactions_total.get())
            .field("transactions_rejected", &self.transactions_rejected.get())
            .field("journal_height", &self.journal_height.get())
            .finish()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transactions_total = IntCounter::new(
            "parcel_ledger_transactions_total",
            "Committed transactions",
        )?;
        registry.register(Box::new(transactions_total.clone()))?;

        let transactions_rejected = IntCounter::new(
            "parcel_ledger_transactions_rejected_total",
            "Rejected transactions",
        )?;
        registry.register(Box::new(transactions_rejected.clone()))?;

        let execution_duration = Histogram::with_opts(
            HistogramOpts::new(
                "parcel_ledger_execution_duration_seconds",
                "Histogram of execution latencies",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500]),
        )?;
        registry.register(Box::new(execution_duration.clone()))?;

        let lamports_transferred = IntCounter::new(
            "parcel_ledger_lamports_transferred_total",
            "Lamports moved by committed transactions",
        )?;
        registry.register(Box::new(lamports_transferred.clone()))?;

        let journal_height = IntGauge::new(
            "parcel_ledger_journal_height",
            "Slot of the latest journal entry",
        )?;
        registry.register(Box::new(journal_height.clone()))?;

        Ok(Self {
            transactions_total,
            transactions_rejected,
            execution_duration,
            lamports_transferred,
            journal_height,
            registry,
        })
    }

    /// Record a committed transaction
    pub fn record_commit(&self, slot: u64, lamports_moved: u64, duration_seconds: f64) {
        self.transactions_total.inc();
        self.lamports_transferred.inc_by(lamports_moved);
        self.execution_duration.observe(duration_seconds);
        self.journal_height.set(slot as i64);
    }

    /// Record a rejected transaction
    pub fn record_rejection(&self) {
        self.transactions_rejected.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
