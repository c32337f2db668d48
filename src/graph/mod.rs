//! Paper Knowledge Graph
//!
//! Typed node and edge collections built from paper records. The data model
//! here is shared by every stage:
//! - construction (registry, resolver, builder)
//! - validation (integrity, diagnostics)
//! - reporting (analysis, statistics)
//!
//! Validation and reporting only ever look at a [`KnowledgeGraph`], never at
//! construction state, so a graph read back from disk is checked exactly like
//! a freshly built one.

pub mod registry;
pub mod resolver;
pub mod builder;
pub mod integrity;
pub mod diagnostics;
pub mod analysis;
pub mod statistics;

pub use registry::{EntityRegistry, Registration};
pub use resolver::{EdgeDrop, RelationResolver, ResolutionPolicy};
pub use builder::{build_graph, ingest_record, BuildOutput, BuildStats};
pub use integrity::{
    CoverageStats, DuplicateGroup, DuplicateRecord, IdCollision, IntegrityReport,
    IntegrityValidator, InvalidEdge, InvalidEdgeKind, OrphanStats, RelationIntegrity,
};
pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics, Severity};
pub use analysis::{component_count, degree_stats, DegreeStats, NodeDegree};
pub use statistics::{PaperStats, RelationStats, StatisticsReport, YearRange};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::identity::NodeId;

// =============================================================================
// Node Kinds
// =============================================================================

/// The eight node types of the graph
///
/// Declaration order is the canonical order for files and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Paper,
    Task,
    ImagingModality,
    AnatomicalStructure,
    Method,
    Dataset,
    Metric,
    Innovation,
}

impl NodeKind {
    pub const ALL: [NodeKind; 8] = [
        NodeKind::Paper,
        NodeKind::Task,
        NodeKind::ImagingModality,
        NodeKind::AnatomicalStructure,
        NodeKind::Method,
        NodeKind::Dataset,
        NodeKind::Metric,
        NodeKind::Innovation,
    ];

    /// Kinds whose identity is derived from a name (everything but Paper)
    pub const ENTITIES: [NodeKind; 7] = [
        NodeKind::Task,
        NodeKind::ImagingModality,
        NodeKind::AnatomicalStructure,
        NodeKind::Method,
        NodeKind::Dataset,
        NodeKind::Metric,
        NodeKind::Innovation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paper => "Paper",
            Self::Task => "Task",
            Self::ImagingModality => "ImagingModality",
            Self::AnatomicalStructure => "AnatomicalStructure",
            Self::Method => "Method",
            Self::Dataset => "Dataset",
            Self::Metric => "Metric",
            Self::Innovation => "Innovation",
        }
    }

    /// File stem of this kind's node table (e.g. `nodes_Task`)
    pub fn table_name(&self) -> String {
        format!("nodes_{}", self.as_str())
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown node kind '{}'", s))
    }
}

// =============================================================================
// Nodes
// =============================================================================

/// Type-specific node attributes, tagged by the `type` column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeAttrs {
    Paper {
        paper_id: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        doi: String,
        #[serde(default)]
        year: Option<i32>,
        #[serde(default)]
        category: String,
        #[serde(default, with = "pipe_joined")]
        authors: Vec<String>,
    },
    Task {
        name: String,
    },
    ImagingModality {
        name: String,
    },
    AnatomicalStructure {
        name: String,
    },
    Method {
        name: String,
        #[serde(default)]
        method_type: String,
    },
    Dataset {
        name: String,
    },
    Metric {
        name: String,
    },
    Innovation {
        description: String,
        #[serde(default)]
        innovation_type: String,
    },
}

impl NodeAttrs {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Paper { .. } => NodeKind::Paper,
            Self::Task { .. } => NodeKind::Task,
            Self::ImagingModality { .. } => NodeKind::ImagingModality,
            Self::AnatomicalStructure { .. } => NodeKind::AnatomicalStructure,
            Self::Method { .. } => NodeKind::Method,
            Self::Dataset { .. } => NodeKind::Dataset,
            Self::Metric { .. } => NodeKind::Metric,
            Self::Innovation { .. } => NodeKind::Innovation,
        }
    }

    /// The field this kind deduplicates on
    pub fn natural_key(&self) -> &str {
        match self {
            Self::Paper { paper_id, .. } => paper_id,
            Self::Innovation { description, .. } => description,
            Self::Task { name }
            | Self::ImagingModality { name }
            | Self::AnatomicalStructure { name }
            | Self::Method { name, .. }
            | Self::Dataset { name }
            | Self::Metric { name } => name,
        }
    }

    /// Text handed to the embedding model for this node
    pub fn embedding_text(&self) -> String {
        match self {
            Self::Paper { title, category, .. } => join_words(title, category),
            Self::Method { name, method_type } => join_words(name, method_type),
            Self::Innovation { description, innovation_type } => {
                join_words(description, innovation_type)
            }
            Self::Task { name }
            | Self::ImagingModality { name }
            | Self::AnatomicalStructure { name }
            | Self::Dataset { name }
            | Self::Metric { name } => name.trim().to_string(),
        }
    }
}

/// A resolved graph vertex
///
/// Serializes to one flat row: `id`, `type`, the type-specific columns and an
/// `embedding` column holding comma-joined numbers (empty when absent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(flatten)]
    pub attrs: NodeAttrs,
    #[serde(default, with = "embedding_column")]
    pub embedding: Option<Vec<f32>>,
}

impl Node {
    /// Create a node without an embedding
    pub fn new(id: NodeId, attrs: NodeAttrs) -> Self {
        Self {
            id,
            attrs,
            embedding: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.attrs.kind()
    }

    pub fn natural_key(&self) -> &str {
        self.attrs.natural_key()
    }

    pub fn has_embedding(&self) -> bool {
        self.embedding.as_ref().is_some_and(|v| !v.is_empty())
    }
}

// =============================================================================
// Edges
// =============================================================================

/// A directed, typed relation between two node identifiers
///
/// Parallel edges are legal; nothing deduplicates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from_id: NodeId,
    pub to_id: NodeId,
    #[serde(rename = "type")]
    pub relation: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Edge {
    pub fn new(from_id: NodeId, to_id: NodeId, relation: impl Into<String>) -> Self {
        Self {
            from_id,
            to_id,
            relation: relation.into(),
            value: None,
            note: None,
        }
    }
}

// =============================================================================
// Graph
// =============================================================================

/// Materialized node collections (one per kind) plus the edge collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeGraph {
    nodes: BTreeMap<NodeKind, Vec<Node>>,
    edges: Vec<Edge>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a graph from prepared collections
    pub fn from_parts(nodes: BTreeMap<NodeKind, Vec<Node>>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Append a node to its kind's collection (no deduplication)
    pub fn push_node(&mut self, node: Node) {
        self.nodes.entry(node.kind()).or_default().push(node);
    }

    pub fn push_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    /// Nodes of one kind, in creation order
    pub fn nodes(&self, kind: NodeKind) -> &[Node] {
        self.nodes.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All nodes, kinds in canonical order
    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        NodeKind::ALL.into_iter().flat_map(move |kind| self.nodes(kind).iter())
    }

    pub fn all_nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut().flat_map(|nodes| nodes.iter_mut())
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.values().map(Vec::len).sum()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Node count for every kind, including empty ones
    pub fn node_counts(&self) -> BTreeMap<NodeKind, usize> {
        NodeKind::ALL
            .into_iter()
            .map(|kind| (kind, self.nodes(kind).len()))
            .collect()
    }
}

// =============================================================================
// Flat column encodings
// =============================================================================

fn join_words(head: &str, tail: &str) -> String {
    format!("{} {}", head, tail).trim().to_string()
}

/// `authors` as a single `|`-joined column
mod pipe_joined {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&values.join("|"))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let joined = String::deserialize(deserializer)?;
        if joined.is_empty() {
            return Ok(Vec::new());
        }
        Ok(joined.split('|').map(str::to_string).collect())
    }
}

/// `embedding` as comma-joined numbers, empty string when absent
mod embedding_column {
    use super::*;
    use serde::de::Error;

    pub fn serialize<S: Serializer>(
        embedding: &Option<Vec<f32>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let joined = embedding
            .as_ref()
            .map(|values| values.iter().map(f32::to_string).collect::<Vec<_>>().join(","))
            .unwrap_or_default();
        serializer.serialize_str(&joined)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<f32>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let joined = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        let joined = joined.trim();
        if joined.is_empty() {
            return Ok(None);
        }
        joined
            .split(',')
            .map(|part| part.trim().parse::<f32>().map_err(D::Error::custom))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper() -> Node {
        Node::new(
            NodeId::from("P1"),
            NodeAttrs::Paper {
                paper_id: "P1".to_string(),
                title: "Brain tumor segmentation".to_string(),
                doi: "10.1000/x".to_string(),
                year: Some(2021),
                category: "Segmentation".to_string(),
                authors: vec!["A".to_string(), "B".to_string()],
            },
        )
    }

    #[test]
    fn test_node_kind_round_trips_through_str() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.as_str().parse::<NodeKind>().unwrap(), kind);
        }
        assert!("Author".parse::<NodeKind>().is_err());
        assert_eq!(NodeKind::Task.table_name(), "nodes_Task");
    }

    #[test]
    fn test_natural_keys() {
        assert_eq!(paper().natural_key(), "P1");
        let innovation = NodeAttrs::Innovation {
            description: "Attention gates".to_string(),
            innovation_type: "architecture".to_string(),
        };
        assert_eq!(innovation.natural_key(), "Attention gates");
        let method = NodeAttrs::Method {
            name: "U-Net".to_string(),
            method_type: "CNN".to_string(),
        };
        assert_eq!(method.natural_key(), "U-Net");
    }

    #[test]
    fn test_embedding_text() {
        assert_eq!(paper().attrs.embedding_text(), "Brain tumor segmentation Segmentation");
        let method = NodeAttrs::Method {
            name: "U-Net".to_string(),
            method_type: String::new(),
        };
        assert_eq!(method.embedding_text(), "U-Net");
    }

    #[test]
    fn test_node_serializes_as_flat_row() {
        let mut node = paper();
        node.embedding = Some(vec![0.5, -1.0]);
        let row = serde_json::to_value(&node).unwrap();
        assert_eq!(row["id"], "P1");
        assert_eq!(row["type"], "Paper");
        assert_eq!(row["authors"], "A|B");
        assert_eq!(row["year"], 2021);
        assert_eq!(row["embedding"], "0.5,-1");

        let back: Node = serde_json::from_value(row).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_empty_embedding_column_reads_as_absent() {
        let row = r#"{"id": "abc", "type": "Task", "name": "Segmentation", "embedding": ""}"#;
        let node: Node = serde_json::from_str(row).unwrap();
        assert_eq!(node.kind(), NodeKind::Task);
        assert!(node.embedding.is_none());
        assert!(!node.has_embedding());
    }

    #[test]
    fn test_node_counts_cover_every_kind() {
        let mut graph = KnowledgeGraph::new();
        graph.push_node(paper());
        let counts = graph.node_counts();
        assert_eq!(counts.len(), 8);
        assert_eq!(counts[&NodeKind::Paper], 1);
        assert_eq!(counts[&NodeKind::Task], 0);
    }
}
