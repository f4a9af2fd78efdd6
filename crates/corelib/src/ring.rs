//! Consistent hash ring router.
//!
//! The ring shards key/value entries across a dynamic set of cache nodes.
//! Each server owns `replication_factor` token positions: the parent token
//! (hash of `"{server}-0"`), which carries the only backing-store handle,
//! and `replication_factor - 1` aliases that resolve to the parent in one
//! hop. Keys route to the nearest token clockwise.
//!
//! # Membership changes and existing keys
//!
//! Keys are NOT migrated when servers join or leave. An entry previously
//! placed on server X whose key now hashes to server Y is simply unreachable
//! until it is re-inserted or ages out of X's LRU. Callers that need
//! rebalancing must layer a hand-off protocol on top.

use crate::error::{Error, Result};
use crate::store::{CacheStore, NodeProvisioner};
use crate::token::Md5Token;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// A server's virtual nodes, in the diagnostic enumeration shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub server: String,
    pub virtual_nodes: Vec<VirtualNodeEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualNodeEntry {
    pub virtual_node: VirtualNodeInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualNodeInfo {
    pub name: String,
    pub hash: u128,
}

/// Mutable ring state, guarded by the single exclusion region.
struct RingState {
    /// All token positions, kept sorted for binary-search routing.
    sorted_tokens: Vec<Md5Token>,
    /// Every token (parent and alias) resolves to its parent token.
    virtual_node_map: HashMap<Md5Token, Md5Token>,
    /// Parent token to all tokens it owns (itself first).
    server_virtual_node_map: HashMap<Md5Token, Vec<Md5Token>>,
    /// Parent token to the backing store it carries.
    backends: HashMap<Md5Token, Arc<dyn CacheStore>>,
    /// Server names currently in the ring.
    servers: HashSet<String>,
}

/// Consistent hash ring over a set of cache nodes.
///
/// # Thread safety
///
/// All methods take `&self`; state lives behind one `RwLock` so operations
/// against a single ring are linearizable. Backend calls (`put_entry`,
/// `get_entry`) resolve the handle under the lock, then await the store with
/// the lock released.
pub struct HashRing {
    replication_factor: usize,
    provisioner: Arc<dyn NodeProvisioner>,
    inner: RwLock<RingState>,
}

impl HashRing {
    /// Create an empty ring.
    ///
    /// # Arguments
    /// * `replication_factor` - token positions per server (parent + aliases)
    /// * `provisioner` - builds the backing store for each joining server
    pub fn new(replication_factor: usize, provisioner: Arc<dyn NodeProvisioner>) -> Self {
        Self {
            replication_factor: replication_factor.max(1),
            provisioner,
            inner: RwLock::new(RingState {
                sorted_tokens: Vec::new(),
                virtual_node_map: HashMap::new(),
                server_virtual_node_map: HashMap::new(),
                backends: HashMap::new(),
                servers: HashSet::new(),
            }),
        }
    }

    /// Create a ring pre-populated with `servers`.
    pub fn with_servers<S: AsRef<str>>(
        replication_factor: usize,
        provisioner: Arc<dyn NodeProvisioner>,
        servers: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let ring = Self::new(replication_factor, provisioner);
        for server in servers {
            ring.add_server(server.as_ref())?;
        }
        Ok(ring)
    }

    /// Add a server and its virtual nodes to the ring.
    ///
    /// Inserts the parent token `H("{server}-0")` carrying the freshly
    /// provisioned backing store, plus `replication_factor - 1` alias tokens
    /// that only reference the parent. Re-adding a present server is a no-op.
    pub fn add_server(&self, server: &str) -> Result<()> {
        if server.is_empty() {
            return Err(Error::InvalidArgument("server name is empty".into()));
        }
        let parent_token = Md5Token::for_virtual_node(server, 0);
        debug!(server, parent = %parent_token, "adding server to the hash ring");

        // Provision outside the lock; node construction may be expensive.
        let backend = self.provisioner.provision(server, parent_token.0)?;

        let mut state = self.inner.write();
        if !state.servers.insert(server.to_string()) {
            warn!(server, "server already present in the hash ring");
            return Ok(());
        }

        state.virtual_node_map.insert(parent_token, parent_token);
        state
            .server_virtual_node_map
            .insert(parent_token, vec![parent_token]);
        state.backends.insert(parent_token, backend);
        insert_sorted(&mut state.sorted_tokens, parent_token);

        for i in 1..self.replication_factor {
            let alias = Md5Token::for_virtual_node(server, i);
            debug!(server, index = i, alias = %alias, "adding virtual node");
            state.virtual_node_map.insert(alias, parent_token);
            if let Some(tokens) = state.server_virtual_node_map.get_mut(&parent_token) {
                tokens.push(alias);
            }
            insert_sorted(&mut state.sorted_tokens, alias);
        }
        Ok(())
    }

    /// Remove a server and all of its virtual nodes.
    ///
    /// Exact reverse of [`add_server`](Self::add_server). Returns `false`
    /// without mutation when the server is unknown.
    pub fn remove_server(&self, server: &str) -> bool {
        let mut state = self.inner.write();
        if !state.servers.contains(server) {
            warn!(server, "attempted to remove a server not in the hash ring");
            return false;
        }
        let parent_token = Md5Token::for_virtual_node(server, 0);
        debug!(server, parent = %parent_token, "removing server from the hash ring");

        let tokens = state
            .server_virtual_node_map
            .remove(&parent_token)
            .unwrap_or_default();
        for token in tokens {
            state.virtual_node_map.remove(&token);
            if let Ok(pos) = state.sorted_tokens.binary_search(&token) {
                state.sorted_tokens.remove(pos);
            }
        }
        state.backends.remove(&parent_token);
        state.servers.remove(server);
        true
    }

    /// Find the cache node responsible for `key`.
    ///
    /// # Algorithm
    ///
    /// 1. Hash the key to a ring position.
    /// 2. Binary-search the sorted tokens for the smallest token >= the
    ///    position, wrapping to the first token past the top of the ring.
    /// 3. Resolve that token to its parent and return the parent's handle.
    ///
    /// Returns `None` on an empty ring.
    pub fn route(&self, key: &str) -> Option<Arc<dyn CacheStore>> {
        let state = self.inner.read();
        if state.sorted_tokens.is_empty() {
            return None;
        }
        let hash = Md5Token::from_key(key);
        let idx = state.sorted_tokens.partition_point(|t| *t < hash) % state.sorted_tokens.len();
        let token = state.sorted_tokens[idx];
        let parent = state.virtual_node_map[&token];
        debug!(key, hash = %hash, token = %token, parent = %parent, "routed key");
        Some(Arc::clone(&state.backends[&parent]))
    }

    /// Put an entry into the cache node responsible for `key`.
    pub async fn put_entry(&self, key: &str, value: &str) -> Result<()> {
        let Some(store) = self.route(key) else {
            error!(key, "no servers available to put key");
            return Err(Error::NoServersAvailable);
        };
        debug!(key, instance_no = %store.instance_no(), "putting entry");
        store.put(key, value).await
    }

    /// Get the entry for `key` from its cache node.
    ///
    /// `Ok(None)` means the responsible node does not hold the key;
    /// `Err(NoServersAvailable)` means the ring is empty.
    pub async fn get_entry(&self, key: &str) -> Result<Option<String>> {
        let Some(store) = self.route(key) else {
            return Err(Error::NoServersAvailable);
        };
        debug!(key, instance_no = %store.instance_no(), "getting entry");
        store.get(key).await
    }

    /// Diagnostic enumeration of servers and their virtual nodes.
    ///
    /// Exposes internal placement; meant for monitoring surfaces, not for
    /// routing decisions.
    pub fn servers(&self) -> Vec<ServerInfo> {
        let state = self.inner.read();
        let mut names: Vec<&String> = state.servers.iter().collect();
        names.sort();
        names
            .into_iter()
            .map(|server| ServerInfo {
                server: server.clone(),
                virtual_nodes: (0..self.replication_factor)
                    .map(|i| VirtualNodeEntry {
                        virtual_node: VirtualNodeInfo {
                            name: format!("{}-{}", server, i),
                            hash: Md5Token::for_virtual_node(server, i).0,
                        },
                    })
                    .collect(),
            })
            .collect()
    }

    /// Describe the ring in a human-readable format.
    ///
    /// # Format
    ///
    /// ```text
    /// Ring Description:
    ///   Servers: 2
    ///   Total Tokens: 4
    ///   Server svr1 (2 virtual nodes)
    ///   Server svr2 (2 virtual nodes)
    /// ```
    pub fn describe(&self) -> String {
        let mut description = String::new();
        description.push_str("Ring Description:\n");
        description.push_str(&format!("  Servers: {}\n", self.server_count()));
        description.push_str(&format!("  Total Tokens: {}\n", self.token_count()));
        for info in self.servers() {
            description.push_str(&format!(
                "  Server {} ({} virtual nodes)\n",
                info.server,
                info.virtual_nodes.len()
            ));
        }
        description
    }

    /// Number of servers in the ring.
    pub fn server_count(&self) -> usize {
        self.inner.read().servers.len()
    }

    /// Number of token positions (all servers' virtual nodes).
    pub fn token_count(&self) -> usize {
        self.inner.read().sorted_tokens.len()
    }
}

fn insert_sorted(tokens: &mut Vec<Md5Token>, token: Md5Token) {
    let pos = tokens.partition_point(|t| *t < token);
    tokens.insert(pos, token);
}
