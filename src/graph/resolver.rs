//! Relation Resolver
//!
//! Maps the free-text endpoints of a declared relation onto registered node
//! ids. Resolution is lossy on purpose: a relation whose endpoints cannot be
//! matched is dropped, and the reason is handed back as an [`EdgeDrop`] so
//! the caller can log and count it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::{Edge, EntityRegistry, NodeKind};
use crate::error::{GraphError, Result};
use crate::identity::{normalize, NodeId};
use crate::record::RelationRecord;

// =============================================================================
// Resolution Policy
// =============================================================================

/// Ordered list of kinds probed when matching an endpoint by name
///
/// When the same normalized name is registered under several kinds, the kind
/// listed first wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<NodeKind>", into = "Vec<NodeKind>")]
pub struct ResolutionPolicy {
    priority: Vec<NodeKind>,
}

impl ResolutionPolicy {
    /// Build a policy; rejects Paper entries and repeated kinds
    pub fn new(priority: Vec<NodeKind>) -> Result<Self> {
        let mut seen = HashSet::new();
        for kind in &priority {
            if *kind == NodeKind::Paper {
                return Err(GraphError::InvalidPolicy(
                    "Paper cannot be matched by name".to_string(),
                ));
            }
            if !seen.insert(*kind) {
                return Err(GraphError::InvalidPolicy(format!("{} listed twice", kind)));
            }
        }
        Ok(Self { priority })
    }

    pub fn priority(&self) -> &[NodeKind] {
        &self.priority
    }
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            priority: NodeKind::ENTITIES.to_vec(),
        }
    }
}

impl TryFrom<Vec<NodeKind>> for ResolutionPolicy {
    type Error = GraphError;

    fn try_from(priority: Vec<NodeKind>) -> Result<Self> {
        Self::new(priority)
    }
}

impl From<ResolutionPolicy> for Vec<NodeKind> {
    fn from(policy: ResolutionPolicy) -> Self {
        policy.priority
    }
}

// =============================================================================
// Drop Reasons
// =============================================================================

/// Why a declared relation did not become an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDrop {
    /// Relation has no type
    MissingType,
    /// `from` or `to` is empty
    MissingEndpoint,
    /// `from` matched neither the paper nor any registered name
    UnresolvedFrom(String),
    /// `to` matched no registered name
    UnresolvedTo(String),
}

impl EdgeDrop {
    /// Stable label used for counting drops
    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingType => "missing_type",
            Self::MissingEndpoint => "missing_endpoint",
            Self::UnresolvedFrom(_) => "unresolved_from",
            Self::UnresolvedTo(_) => "unresolved_to",
        }
    }
}

impl fmt::Display for EdgeDrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingType => write!(f, "relation has no type"),
            Self::MissingEndpoint => write!(f, "relation has an empty endpoint"),
            Self::UnresolvedFrom(text) => write!(f, "unresolved source '{}'", text),
            Self::UnresolvedTo(text) => write!(f, "unresolved target '{}'", text),
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves relation endpoints against a registry snapshot
pub struct RelationResolver<'a> {
    registry: &'a EntityRegistry,
    policy: &'a ResolutionPolicy,
}

impl<'a> RelationResolver<'a> {
    pub fn new(registry: &'a EntityRegistry, policy: &'a ResolutionPolicy) -> Self {
        Self { registry, policy }
    }

    /// Find the id a piece of text names, probing kinds in priority order
    pub fn resolve_name(&self, text: &str) -> Option<(NodeKind, &'a NodeId)> {
        let name = normalize(text)?;
        self.policy
            .priority()
            .iter()
            .find_map(|&kind| self.registry.lookup(kind, name).map(|id| (kind, id)))
    }

    /// Turn a declared relation into an edge.
    ///
    /// `paper_id` is the current record's raw id: a `from` equal to it
    /// resolves to that Paper. `to` never resolves to a Paper.
    pub fn resolve(
        &self,
        relation: &RelationRecord,
        paper_id: &str,
    ) -> std::result::Result<Edge, EdgeDrop> {
        if relation.relation.is_empty() {
            return Err(EdgeDrop::MissingType);
        }
        if relation.from.is_empty() || relation.to.is_empty() {
            return Err(EdgeDrop::MissingEndpoint);
        }

        let from_id = if relation.from == paper_id {
            NodeId::from(paper_id)
        } else {
            self.resolve_name(&relation.from)
                .map(|(_, id)| id.clone())
                .ok_or_else(|| EdgeDrop::UnresolvedFrom(relation.from.clone()))?
        };

        let to_id = self
            .resolve_name(&relation.to)
            .map(|(_, id)| id.clone())
            .ok_or_else(|| EdgeDrop::UnresolvedTo(relation.to.clone()))?;

        Ok(Edge {
            from_id,
            to_id,
            relation: relation.relation.clone(),
            value: relation.value,
            note: relation.note.clone().filter(|note| !note.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeAttrs;

    fn relation(kind: &str, from: &str, to: &str) -> RelationRecord {
        RelationRecord {
            relation: kind.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            value: None,
            note: None,
        }
    }

    fn registry() -> EntityRegistry {
        let mut registry = EntityRegistry::new();
        registry.register(NodeAttrs::Task { name: "Segmentation".to_string() });
        registry.register(NodeAttrs::Method {
            name: "U-Net".to_string(),
            method_type: "CNN".to_string(),
        });
        registry.register(NodeAttrs::Dataset { name: "BraTS".to_string() });
        registry
    }

    #[test]
    fn test_paper_source_and_named_target() {
        let registry = registry();
        let policy = ResolutionPolicy::default();
        let resolver = RelationResolver::new(&registry, &policy);

        let edge = resolver.resolve(&relation("USES", "P1", " U-Net "), "P1").unwrap();
        assert_eq!(edge.from_id.as_str(), "P1");
        assert_eq!(Some(&edge.to_id), registry.lookup(NodeKind::Method, "U-Net"));
        assert_eq!(edge.relation, "USES");
    }

    #[test]
    fn test_paper_match_is_raw_text() {
        let registry = registry();
        let policy = ResolutionPolicy::default();
        let resolver = RelationResolver::new(&registry, &policy);

        let dropped = resolver.resolve(&relation("USES", " P1", "U-Net"), "P1").unwrap_err();
        assert_eq!(dropped, EdgeDrop::UnresolvedFrom(" P1".to_string()));
    }

    #[test]
    fn test_unresolved_and_empty_relations_are_dropped() {
        let registry = registry();
        let policy = ResolutionPolicy::default();
        let resolver = RelationResolver::new(&registry, &policy);

        assert_eq!(
            resolver.resolve(&relation("USES", "P1", "ResNet"), "P1").unwrap_err(),
            EdgeDrop::UnresolvedTo("ResNet".to_string())
        );
        assert_eq!(
            resolver.resolve(&relation("", "P1", "U-Net"), "P1").unwrap_err(),
            EdgeDrop::MissingType
        );
        assert_eq!(
            resolver.resolve(&relation("USES", "P1", ""), "P1").unwrap_err(),
            EdgeDrop::MissingEndpoint
        );
        // Targets never resolve to papers.
        assert!(resolver.resolve(&relation("CITES", "U-Net", "P1"), "P1").is_err());
    }

    #[test]
    fn test_priority_breaks_ties_between_kinds() {
        let mut registry = EntityRegistry::new();
        let dataset = registry.register(NodeAttrs::Dataset { name: "CT".to_string() });
        let modality = registry.register(NodeAttrs::ImagingModality { name: "CT".to_string() });

        let default_policy = ResolutionPolicy::default();
        let resolver = RelationResolver::new(&registry, &default_policy);
        let (kind, id) = resolver.resolve_name("CT").unwrap();
        assert_eq!(kind, NodeKind::ImagingModality);
        assert_eq!(Some(id), modality.id());

        let dataset_first =
            ResolutionPolicy::new(vec![NodeKind::Dataset, NodeKind::ImagingModality]).unwrap();
        let resolver = RelationResolver::new(&registry, &dataset_first);
        let (kind, id) = resolver.resolve_name("CT").unwrap();
        assert_eq!(kind, NodeKind::Dataset);
        assert_eq!(Some(id), dataset.id());
    }

    #[test]
    fn test_value_and_note_are_carried() {
        let registry = registry();
        let policy = ResolutionPolicy::default();
        let resolver = RelationResolver::new(&registry, &policy);

        let mut declared = relation("EVALUATED_ON", "U-Net", "BraTS");
        declared.value = Some(0.87);
        declared.note = Some("validation set".to_string());
        let edge = resolver.resolve(&declared, "P9").unwrap();
        assert_eq!(edge.value, Some(0.87));
        assert_eq!(edge.note.as_deref(), Some("validation set"));
    }

    #[test]
    fn test_policy_validation() {
        assert!(ResolutionPolicy::new(vec![NodeKind::Paper]).is_err());
        assert!(ResolutionPolicy::new(vec![NodeKind::Task, NodeKind::Task]).is_err());
        assert_eq!(ResolutionPolicy::default().priority().len(), 7);
        assert_eq!(ResolutionPolicy::default().priority()[0], NodeKind::Task);
    }
}
