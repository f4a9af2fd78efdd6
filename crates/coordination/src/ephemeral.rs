//! Hierarchical ephemeral-node registry.
//!
//! Clients create sequential children under a parent path; the child with
//! the smallest sequence among live children is the current lock owner, which
//! makes each parent a first-come-first-served queue. A waiter's TTL clock
//! starts only when it becomes the owner, not when it joins the queue.

use crate::cleaner::ExpirySweep;
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One node in the namespace.
///
/// A *parent* node is a synthesized container carrying only the
/// next-sequence counter; it has no client and never expires on its own.
/// A *child* node carries a client id, a 0-based sequence, and (once it is
/// the owner) the instant its session clock started.
#[derive(Debug, Clone)]
pub struct EphemeralNode {
    path: String,
    client_id: Option<String>,
    session_ttl: Duration,
    sequence: u64,
    is_parent: bool,
    owned_since: Option<Instant>,
}

impl EphemeralNode {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn is_parent(&self) -> bool {
        self.is_parent
    }

    /// When this node became the owner; `None` while queued (or a parent).
    pub fn owned_since(&self) -> Option<Instant> {
        self.owned_since
    }

    /// A node is expired once its session clock has run past the TTL.
    /// Queued children and parents never expire on their own.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.owned_since {
            Some(since) => now.saturating_duration_since(since) > self.session_ttl,
            None => false,
        }
    }
}

/// Registry of ephemeral nodes, one exclusion region per instance.
#[derive(Default)]
pub struct EphemeralNodeManager {
    nodes: RwLock<HashMap<String, EphemeralNode>>,
}

impl EphemeralNodeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sequential child under `parent_path` and return its path.
    ///
    /// The parent is synthesized on first use. The child takes the parent's
    /// next sequence number and the path `"{parent_path}/{seq}"`. Its session
    /// clock starts immediately when the parent has no live children;
    /// otherwise the child waits with an unset clock until hand-off promotes
    /// it. A create by the current owner enqueues a fresh waiter and does NOT
    /// restart the owner's clock.
    pub fn create(
        &self,
        parent_path: &str,
        client_id: &str,
        session_ttl: Duration,
    ) -> Result<String> {
        if parent_path.is_empty() || parent_path == "/" {
            warn!(client_id, "refusing to create node without a parent path");
            return Err(Error::InvalidPath {
                client_id: client_id.to_string(),
            });
        }
        let mut nodes = self.nodes.write();
        let seq = match nodes.entry(parent_path.to_string()) {
            Entry::Occupied(mut entry) => {
                let parent = entry.get_mut();
                let seq = parent.sequence;
                parent.sequence += 1;
                seq
            }
            Entry::Vacant(entry) => {
                debug!(parent_path, "synthesizing parent node");
                entry.insert(EphemeralNode {
                    path: parent_path.to_string(),
                    client_id: None,
                    session_ttl,
                    sequence: 1,
                    is_parent: true,
                    owned_since: None,
                });
                0
            }
        };
        let path = format!("{}/{}", parent_path, seq);
        let owned_since = if current_owner(&nodes, parent_path).is_none() {
            Some(Instant::now())
        } else {
            None
        };
        debug!(
            path = %path,
            client_id,
            owner = owned_since.is_some(),
            "creating ephemeral node"
        );
        nodes.insert(
            path.clone(),
            EphemeralNode {
                path: path.clone(),
                client_id: Some(client_id.to_string()),
                session_ttl,
                sequence: seq,
                is_parent: false,
                owned_since,
            },
        );
        Ok(path)
    }

    /// Client currently owning `parent_path`: the minimum-sequence child.
    /// `None` for an absent or childless parent.
    pub fn owner(&self, parent_path: &str) -> Option<String> {
        let nodes = self.nodes.read();
        current_owner(&nodes, parent_path).and_then(|node| node.client_id.clone())
    }

    /// Snapshot of the node at `path`.
    pub fn get(&self, path: &str) -> Option<EphemeralNode> {
        self.nodes.read().get(path).cloned()
    }

    /// Snapshot of every node in the namespace. Diagnostic surface.
    pub fn nodes(&self) -> Vec<EphemeralNode> {
        self.nodes.read().values().cloned().collect()
    }

    /// Delete the node at `path`.
    ///
    /// A parent with children refuses deletion. Deleting the owner child
    /// hands ownership to the next minimum-sequence sibling, starting that
    /// client's session clock.
    pub fn delete(&self, path: &str) -> bool {
        let mut nodes = self.nodes.write();
        let Some(node) = nodes.get(path) else {
            return false;
        };
        if node.is_parent {
            if has_children(&nodes, path) {
                warn!(path, "cannot delete a parent node that still has children");
                return false;
            }
            debug!(path, "deleting parent node");
            nodes.remove(path);
            return true;
        }
        let parent_path = parent_path_of(path).to_string();
        let was_owner = current_owner(&nodes, &parent_path)
            .map(|owner| owner.path.as_str() == path)
            .unwrap_or(false);
        debug!(path, was_owner, "deleting child node");
        nodes.remove(path);
        if was_owner {
            promote_next_owner(&mut nodes, &parent_path);
        }
        true
    }

    /// Number of nodes in the namespace, parents included.
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}

impl ExpirySweep for EphemeralNodeManager {
    /// Delete every child past its TTL, handing ownership off after each
    /// deletion, then drop parents left without children.
    fn sweep(&self) {
        let now = Instant::now();
        let mut nodes = self.nodes.write();

        let expired: Vec<String> = nodes
            .values()
            .filter(|node| node.is_expired(now))
            .map(|node| node.path.clone())
            .collect();
        for path in expired {
            debug!(path = %path, "cleaning up expired ephemeral node");
            if nodes.remove(&path).is_some() {
                // Hand off immediately so the next owner's clock starts at
                // this sweep, not at its own creation.
                promote_next_owner(&mut nodes, parent_path_of(&path));
            }
        }

        let childless: Vec<String> = nodes
            .values()
            .filter(|node| node.is_parent && !has_children(&nodes, &node.path))
            .map(|node| node.path.clone())
            .collect();
        for path in childless {
            debug!(path = %path, "removing childless parent node");
            nodes.remove(&path);
        }
    }
}

/// Everything before the last `/`, or empty for top-level paths.
fn parent_path_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) if idx > 0 => &path[..idx],
        _ => "",
    }
}

fn has_children(nodes: &HashMap<String, EphemeralNode>, path: &str) -> bool {
    nodes.values().any(|node| parent_path_of(&node.path) == path)
}

fn current_owner<'a>(
    nodes: &'a HashMap<String, EphemeralNode>,
    parent_path: &str,
) -> Option<&'a EphemeralNode> {
    nodes
        .values()
        .filter(|node| !node.is_parent && parent_path_of(&node.path) == parent_path)
        .min_by_key(|node| node.sequence)
}

fn promote_next_owner(nodes: &mut HashMap<String, EphemeralNode>, parent_path: &str) {
    let next = nodes
        .values()
        .filter(|node| !node.is_parent && parent_path_of(&node.path) == parent_path)
        .min_by_key(|node| node.sequence)
        .map(|node| node.path.clone());
    if let Some(path) = next {
        if let Some(node) = nodes.get_mut(&path) {
            debug!(path = %path, client_id = ?node.client_id, "new lock owner after hand-off");
            node.owned_since = Some(Instant::now());
        }
    }
}
