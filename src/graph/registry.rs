//! Entity Registry
//!
//! Per-kind deduplicating store used during one construction pass. It owns
//! the node collections while they are being built and the name → id index
//! the relation resolver probes. The index is dropped with the registry once
//! the pass finishes; nothing of it is persisted.

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

use super::{Node, NodeAttrs, NodeKind};
use crate::identity::{generate_id, normalize, NodeId};

/// Outcome of a registration attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// A new node was created
    Created(NodeId),
    /// The natural key was already registered for this kind
    Existing(NodeId),
    /// Empty natural key, nothing registered
    Skipped,
}

impl Registration {
    pub fn id(&self) -> Option<&NodeId> {
        match self {
            Self::Created(id) | Self::Existing(id) => Some(id),
            Self::Skipped => None,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Deduplicating node store for a single construction pass
#[derive(Debug, Default)]
pub struct EntityRegistry {
    /// Nodes per kind in creation order
    nodes: BTreeMap<NodeKind, Vec<Node>>,

    /// Index: kind -> normalized name -> id (also serves as the seen-set)
    by_name: HashMap<NodeKind, HashMap<String, NodeId>>,

    /// Paper ids already registered
    papers: HashSet<String>,

    /// Reverse index: generated id -> (kind, name), for collision detection
    owners: HashMap<NodeId, (NodeKind, String)>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a Paper under its verbatim `paper_id`.
    ///
    /// Empty ids are skipped; a repeated id keeps the first occurrence and
    /// drops this one.
    pub fn register_paper(&mut self, attrs: NodeAttrs) -> Registration {
        debug_assert_eq!(attrs.kind(), NodeKind::Paper);
        let paper_id = attrs.natural_key().to_string();
        if paper_id.is_empty() {
            return Registration::Skipped;
        }
        let id = NodeId::from(paper_id.clone());
        if !self.papers.insert(paper_id) {
            debug!(paper_id = %id, "duplicate paper record dropped");
            return Registration::Existing(id);
        }
        self.nodes
            .entry(NodeKind::Paper)
            .or_default()
            .push(Node::new(id.clone(), attrs));
        Registration::Created(id)
    }

    /// Register a non-Paper entity.
    ///
    /// The natural key is normalized first and stored normalized on the node.
    /// Extra attributes of a repeated mention (e.g. a different `method_type`)
    /// are ignored: the first mention wins.
    pub fn register(&mut self, attrs: NodeAttrs) -> Registration {
        let kind = attrs.kind();
        if kind == NodeKind::Paper {
            return self.register_paper(attrs);
        }
        let Some(name) = normalize(attrs.natural_key()).map(str::to_string) else {
            return Registration::Skipped;
        };

        let index = self.by_name.entry(kind).or_default();
        if let Some(existing) = index.get(&name) {
            return Registration::Existing(existing.clone());
        }

        let id = generate_id(kind, &name);
        if let Some((owner_kind, owner_name)) = self.owners.get(&id) {
            warn!(
                %id,
                kind = %kind,
                name = %name,
                owner_kind = %owner_kind,
                owner_name = %owner_name,
                "identifier collision: truncated hash already assigned"
            );
        } else {
            self.owners.insert(id.clone(), (kind, name.clone()));
        }

        index.insert(name.clone(), id.clone());
        self.nodes
            .entry(kind)
            .or_default()
            .push(Node::new(id.clone(), with_natural_key(attrs, name)));
        Registration::Created(id)
    }

    /// Look up the id registered for a normalized name under one kind
    pub fn lookup(&self, kind: NodeKind, normalized_name: &str) -> Option<&NodeId> {
        self.by_name.get(&kind)?.get(normalized_name)
    }

    /// Whether a Paper with this verbatim id has been registered
    pub fn has_paper(&self, paper_id: &str) -> bool {
        self.papers.contains(paper_id)
    }

    /// Number of nodes registered for a kind
    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.get(&kind).map(Vec::len).unwrap_or(0)
    }

    /// Consume the registry, keeping only the node collections
    pub fn into_nodes(self) -> BTreeMap<NodeKind, Vec<Node>> {
        self.nodes
    }
}

/// Replace the natural key of `attrs` with its normalized form
fn with_natural_key(attrs: NodeAttrs, key: String) -> NodeAttrs {
    match attrs {
        NodeAttrs::Task { .. } => NodeAttrs::Task { name: key },
        NodeAttrs::ImagingModality { .. } => NodeAttrs::ImagingModality { name: key },
        NodeAttrs::AnatomicalStructure { .. } => NodeAttrs::AnatomicalStructure { name: key },
        NodeAttrs::Method { method_type, .. } => NodeAttrs::Method { name: key, method_type },
        NodeAttrs::Dataset { .. } => NodeAttrs::Dataset { name: key },
        NodeAttrs::Metric { .. } => NodeAttrs::Metric { name: key },
        NodeAttrs::Innovation { innovation_type, .. } => NodeAttrs::Innovation {
            description: key,
            innovation_type,
        },
        paper @ NodeAttrs::Paper { .. } => paper,
    }
}
