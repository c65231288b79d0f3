//! Top-level configuration for a registrar node.
//!
//! This module aggregates configuration for:
//!
//! - the blockchain node connection (`BlockchainNodeConfig`),
//! - the UTXO provider used by the operation constructor,
//! - the working directory and snapshot retention,
//! - virtual-chain parameters (start block, consensus window, TTLs),
//! - the metrics exporter (enable flag + listen address).
//!
//! The goal is a single `ChainConfig` struct that higher-level binaries
//! can construct from defaults, config files, or environment variables as
//! needed.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::db::ValidationRules;

/// Connection parameters for the blockchain node.
#[derive(Clone, Debug)]
pub struct BlockchainNodeConfig {
    /// Hostname of the node's JSON-RPC endpoint.
    pub host: String,
    /// Port of the JSON-RPC endpoint.
    pub port: u16,
    /// Basic-auth user; empty disables authentication.
    pub user: String,
    /// Basic-auth password.
    pub password: String,
    /// Whether to connect over HTTPS.
    pub use_tls: bool,
}

impl BlockchainNodeConfig {
    /// Returns the base URL for the node's JSON-RPC endpoint.
    pub fn url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

impl Default for BlockchainNodeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8332,
            user: String::new(),
            password: String::new(),
            use_tls: false,
        }
    }
}

/// Which UTXO provider the operation constructor talks to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UtxoProviderKind {
    /// Query the blockchain node itself.
    Node,
    /// Query a dedicated indexing service.
    Remote,
}

/// Configuration for the UTXO provider.
#[derive(Clone, Debug)]
pub struct UtxoProviderConfig {
    /// Provider flavor.
    pub kind: UtxoProviderKind,
    /// Endpoint of the remote provider; ignored for [`UtxoProviderKind::Node`].
    pub endpoint: String,
    /// Opaque credential string passed as a bearer token, if non-empty.
    pub credentials: String,
}

impl Default for UtxoProviderConfig {
    fn default() -> Self {
        Self {
            kind: UtxoProviderKind::Node,
            endpoint: String::new(),
            credentials: String::new(),
        }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        // Safe to unwrap: this is a fixed, valid address literal.
        let addr: SocketAddr = "127.0.0.1:9898"
            .parse()
            .expect("hard-coded metrics listen address should parse");
        Self {
            enabled: true,
            listen_addr: addr,
        }
    }
}

/// Top-level configuration for a registrar node.
#[derive(Clone, Debug)]
pub struct ChainConfig {
    /// Blockchain node connection.
    pub node: BlockchainNodeConfig,
    /// UTXO provider for the operation constructor.
    pub utxo_provider: UtxoProviderConfig,
    /// Directory for snapshots and other node state.
    pub working_dir: PathBuf,
    /// How long to wait before re-polling an unavailable node.
    pub reindex_frequency: Duration,
    /// First block height that can contain name operations.
    pub start_block: u64,
    /// Consensus window `W`: how many recent consensus hashes stay valid.
    pub consensus_window: u64,
    /// Blocks a name preorder stays consumable.
    pub preorder_ttl: u64,
    /// Blocks a namespace preorder stays consumable.
    pub ns_preorder_ttl: u64,
    /// Request timeout for blockchain node and UTXO provider calls.
    pub rpc_timeout: Duration,
    /// Metrics exporter settings.
    pub metrics: MetricsConfig,
}

impl ChainConfig {
    /// Returns the TTL parameters in the shape the name database wants.
    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules {
            preorder_ttl: self.preorder_ttl,
            ns_preorder_ttl: self.ns_preorder_ttl,
        }
    }

    /// Returns the snapshot directory under the working directory.
    pub fn snapshot_dir(&self) -> PathBuf {
        self.working_dir.join("snapshots")
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            node: BlockchainNodeConfig::default(),
            utxo_provider: UtxoProviderConfig::default(),
            working_dir: PathBuf::from("data/namechain"),
            reindex_frequency: Duration::from_secs(300),
            start_block: 100,
            consensus_window: 144,
            preorder_ttl: 144,
            ns_preorder_ttl: 144,
            rpc_timeout: Duration::from_secs(10),
            metrics: MetricsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_url_respects_tls_flag() {
        let mut cfg = BlockchainNodeConfig::default();
        assert_eq!(cfg.url(), "http://127.0.0.1:8332");

        cfg.use_tls = true;
        cfg.host = "node.example".to_string();
        assert_eq!(cfg.url(), "https://node.example:8332");
    }

    #[test]
    fn validation_rules_mirror_the_ttls() {
        let cfg = ChainConfig {
            preorder_ttl: 10,
            ns_preorder_ttl: 20,
            ..ChainConfig::default()
        };
        let rules = cfg.validation_rules();
        assert_eq!(rules.preorder_ttl, 10);
        assert_eq!(rules.ns_preorder_ttl, 20);
    }
}
