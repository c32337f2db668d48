//! Stable node identifiers
//!
//! Every non-Paper node is identified by a truncated SHA-256 digest of
//! `"{kind}:{normalized name}"`. The digest is stable across runs and
//! processes, so the embedding step and the graph store can join on it.
//!
//! Truncation to [`ID_HEX_WIDTH`] hex characters trades collision resistance
//! for short identifiers. Collisions are detected (registry reverse map,
//! validator duplicate checks), never silently repaired.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::graph::NodeKind;

/// Number of hex characters kept from the digest
pub const ID_HEX_WIDTH: usize = 16;

/// Graph-wide node identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Strip surrounding whitespace; `None` when nothing is left.
///
/// Matching is exact after this step: case and inner whitespace are kept.
pub fn normalize(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Derive the identifier for an already-normalized name.
///
/// `name` must be non-empty and normalized (see [`normalize`]).
pub fn generate_id(kind: NodeKind, name: &str) -> NodeId {
    debug_assert!(!name.is_empty(), "generate_id called with an empty name");
    let digest = Sha256::digest(format!("{}:{}", kind.as_str(), name).as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(ID_HEX_WIDTH);
    NodeId(hex)
}
