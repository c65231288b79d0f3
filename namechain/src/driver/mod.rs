//! Virtual-chain driver.
//!
//! The driver wires together:
//!
//! - a [`BlockSource`](crate::source::BlockSource) for ordered blocks,
//! - the codec for extracting embedded operations,
//! - the [`NameDb`](crate::db::NameDb) acceptance rules and the
//!   [`ConsensusTape`](crate::consensus::ConsensusTape),
//! - a [`SnapshotStore`](crate::storage::SnapshotStore) for
//!   crash-consistent persistence, and
//! - a [`StateHandle`] that publishes each committed snapshot to readers.
//!
//! Processing is strictly sequential per block; the endpoint reads only
//! through the published snapshot pointer.

mod engine;
mod error;
mod extract;
mod handle;

pub use engine::ChainDriver;
pub use error::DriverError;
pub use extract::{PendingOp, extract_operations};
pub use handle::StateHandle;
