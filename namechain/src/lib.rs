//! Namechain library crate.
//!
//! This crate provides the core building blocks for the name-registration
//! virtual chain:
//!
//! - strongly-typed domain types (`types`),
//! - the wire codec for embedded operations (`codec`),
//! - the name database and acceptance rules (`db`),
//! - the consensus-hash tape (`consensus`),
//! - block sources (`source`),
//! - crash-consistent snapshot stores (`storage`),
//! - the virtual-chain driver (`driver`),
//! - the operation constructor (`tx`),
//! - Prometheus-based metrics (`metrics`),
//! - and a top-level node configuration (`config`).
//!
//! Higher-level binaries compose these pieces into indexer nodes and
//! query endpoints.

pub mod codec;
pub mod config;
pub mod consensus;
pub mod db;
pub mod driver;
pub mod metrics;
pub mod source;
pub mod storage;
pub mod tx;
pub mod types;

// Re-export top-level configuration types.
pub use config::{
    BlockchainNodeConfig, ChainConfig, MetricsConfig, UtxoProviderConfig, UtxoProviderKind,
};

// Re-export the database surface.
pub use db::{
    ChainState, NameDb, NameRecord, NamespaceRecord, NamespaceState, OpContext, Outcome,
    RejectReason, ValidationRules, name_price,
};

// Re-export the consensus tape.
pub use consensus::{ConsensusEntry, ConsensusTape};

// Re-export the driver surface.
pub use driver::{ChainDriver, DriverError, PendingOp, StateHandle, extract_operations};

// Re-export block sources and snapshot stores.
pub use source::{BlockSource, HttpBlockSource, MemoryBlockSource, SourceError};
pub use storage::{FsSnapshotStore, MemorySnapshotStore, SnapshotStore, StorageError};

// Re-export the operation constructor.
pub use tx::{HttpUtxoProvider, StaticUtxoProvider, TxBuilder, TxError, Utxo, UtxoProvider};

// Re-export metrics registry and exporter.
pub use metrics::{EngineMetrics, MetricsRegistry, run_prometheus_http_server};

// Re-export domain types at the crate root for convenience.
pub use types::*;

/// Type alias for the default block source used by a "typical" node.
pub type DefaultBlockSource = HttpBlockSource;

/// Type alias for the default snapshot store backend.
pub type DefaultSnapshotStore = FsSnapshotStore;

/// Type alias for the default driver stack.
///
/// This uses:
///
/// - [`DefaultBlockSource`] (JSON-RPC over HTTP),
/// - [`DefaultSnapshotStore`] (file-per-height snapshots + pointer file).
pub type DefaultChainDriver = ChainDriver<DefaultBlockSource, DefaultSnapshotStore>;
