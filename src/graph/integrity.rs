//! Integrity Validator
//!
//! Re-derives every finding from the materialized collections:
//! - duplicate natural keys per kind
//! - orphan nodes (no incident edge)
//! - edges pointing at unknown ids
//! - nodes without an embedding
//!
//! plus two cross-checks: identifiers shared by different entities, and (when
//! the input records are supplied) records that share a `paper_id`. The
//! latter is the only place a dropped duplicate paper becomes visible, since
//! the graph itself keeps just the first occurrence.
//!
//! Findings are diagnostic output; validation never fails.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::{DiagnosticCode, DiagnosticItem, Diagnostics, KnowledgeGraph, NodeKind};
use crate::identity::NodeId;
use crate::record::PaperRecord;

/// Default cap on serialized invalid-edge details
pub const DEFAULT_MAX_DETAILS: usize = 20;

// =============================================================================
// Findings
// =============================================================================

/// Node rows of one kind sharing a natural key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub key: String,
    /// One entry per row, so repeated ids show up repeated
    pub ids: Vec<NodeId>,
    pub count: usize,
}

/// Input records sharing a `paper_id`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateRecord {
    pub paper_id: String,
    /// Zero-based positions of the records in the input
    pub records: Vec<usize>,
}

/// An identifier carried by more than one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdCollision {
    pub id: NodeId,
    /// Distinct kinds involved; a single entry for a same-kind clash
    pub kinds: Vec<NodeKind>,
    /// Natural key of each entity, in row order
    pub keys: Vec<String>,
}

/// Orphan counts for one kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrphanStats {
    pub total: usize,
    pub orphan: usize,
    pub connected: usize,
    pub percentage: f64,
    #[serde(skip)]
    pub ids: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidEdgeKind {
    MissingFrom,
    MissingTo,
}

/// An edge endpoint that matches no node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidEdge {
    #[serde(rename = "type")]
    pub kind: InvalidEdgeKind,
    pub from_id: NodeId,
    pub to_id: NodeId,
    pub rel_type: String,
}

/// Referential integrity of the edge collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationIntegrity {
    pub total_relations: usize,
    pub relation_types: BTreeMap<String, usize>,
    /// One per missing endpoint; an edge missing both counts twice
    pub invalid_relations: usize,
    pub missing_from: usize,
    pub missing_to: usize,
    /// First invalid entries, capped
    pub invalid_details: Vec<InvalidEdge>,
    #[serde(skip)]
    pub invalid: Vec<InvalidEdge>,
}

/// Embedding coverage for one kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageStats {
    pub total: usize,
    pub with_embedding: usize,
    pub empty_embedding: usize,
    pub coverage: f64,
    #[serde(skip)]
    pub missing: Vec<NodeId>,
}

// =============================================================================
// Report
// =============================================================================

/// Aggregated result of all checks
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub generated_at: DateTime<Utc>,
    /// Only kinds with at least one duplicate group
    pub duplicates: BTreeMap<NodeKind, Vec<DuplicateGroup>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub duplicate_records: Vec<DuplicateRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub id_collisions: Vec<IdCollision>,
    pub orphans: BTreeMap<NodeKind, OrphanStats>,
    pub relations: RelationIntegrity,
    pub embeddings: BTreeMap<NodeKind, CoverageStats>,
}

impl IntegrityReport {
    /// Number of duplicate groups across kinds
    pub fn total_duplicates(&self) -> usize {
        self.duplicates.values().map(Vec::len).sum()
    }

    pub fn total_orphans(&self) -> usize {
        self.orphans.values().map(|o| o.orphan).sum()
    }

    pub fn total_missing_embeddings(&self) -> usize {
        self.embeddings.values().map(|c| c.empty_embedding).sum()
    }

    /// No duplicates, collisions, orphans or invalid relations.
    ///
    /// Embedding coverage is not part of this; graphs are routinely checked
    /// before the embedding step has run.
    pub fn is_clean(&self) -> bool {
        self.total_duplicates() == 0
            && self.duplicate_records.is_empty()
            && self.id_collisions.is_empty()
            && self.total_orphans() == 0
            && self.relations.invalid_relations == 0
    }

    /// One coded item per finding
    pub fn diagnostics(&self) -> Diagnostics {
        let mut diags = Diagnostics::new();

        for (kind, groups) in &self.duplicates {
            for group in groups {
                let ids: Vec<&str> = group.ids.iter().map(NodeId::as_str).collect();
                diags.push(
                    DiagnosticItem::new(
                        &group.key,
                        DiagnosticCode::DuplicateNode,
                        format!("{} {} rows share the key '{}'", group.count, kind, group.key),
                    )
                    .with_kind(*kind)
                    .with_context(format!("ids: {}", ids.join(", "))),
                );
            }
        }

        for duplicate in &self.duplicate_records {
            let positions: Vec<String> = duplicate.records.iter().map(usize::to_string).collect();
            diags.push(
                DiagnosticItem::new(
                    &duplicate.paper_id,
                    DiagnosticCode::DuplicateRecord,
                    format!(
                        "paper_id appears in {} input records; only the first was kept",
                        duplicate.records.len()
                    ),
                )
                .with_kind(NodeKind::Paper)
                .with_context(format!("records: {}", positions.join(", "))),
            );
        }

        for collision in &self.id_collisions {
            let kinds: Vec<&str> = collision.kinds.iter().map(NodeKind::as_str).collect();
            let mut item = DiagnosticItem::new(
                collision.id.as_str(),
                DiagnosticCode::IdCollision,
                format!("identifier is carried by {} different entities", collision.keys.len()),
            )
            .with_context(format!("kinds: {}", kinds.join(", ")))
            .with_context(format!("keys: {}", collision.keys.join(", ")));
            if let [kind] = collision.kinds[..] {
                item = item.with_kind(kind);
            }
            diags.push(item);
        }

        for invalid in &self.relations.invalid {
            let (code, subject, side) = match invalid.kind {
                InvalidEdgeKind::MissingFrom => {
                    (DiagnosticCode::MissingFrom, &invalid.from_id, "source")
                }
                InvalidEdgeKind::MissingTo => (DiagnosticCode::MissingTo, &invalid.to_id, "target"),
            };
            diags.push(
                DiagnosticItem::new(
                    subject.as_str(),
                    code,
                    format!("{} edge references an unknown {}", invalid.rel_type, side),
                )
                .with_context(format!("{} -> {}", invalid.from_id, invalid.to_id)),
            );
        }

        for (kind, orphans) in &self.orphans {
            for id in &orphans.ids {
                let item = DiagnosticItem::new(id.as_str(), DiagnosticCode::OrphanNode, "no edges");
                diags.push(item.with_kind(*kind));
            }
        }

        for (kind, coverage) in &self.embeddings {
            for id in &coverage.missing {
                let code = DiagnosticCode::MissingEmbedding;
                let item = DiagnosticItem::new(id.as_str(), code, "no embedding");
                diags.push(item.with_kind(*kind));
            }
        }

        diags
    }
}

// =============================================================================
// Validator
// =============================================================================

/// Runs all integrity checks over a graph
pub struct IntegrityValidator<'a> {
    graph: &'a KnowledgeGraph,
    records: Option<&'a [PaperRecord]>,
    max_details: usize,
}

impl<'a> IntegrityValidator<'a> {
    pub fn new(graph: &'a KnowledgeGraph) -> Self {
        Self {
            graph,
            records: None,
            max_details: DEFAULT_MAX_DETAILS,
        }
    }

    /// Also audit the input records for repeated `paper_id`s
    pub fn with_records(mut self, records: &'a [PaperRecord]) -> Self {
        self.records = Some(records);
        self
    }

    /// Cap on serialized invalid-edge details
    pub fn with_max_details(mut self, max_details: usize) -> Self {
        self.max_details = max_details;
        self
    }

    pub fn validate(&self) -> IntegrityReport {
        IntegrityReport {
            generated_at: Utc::now(),
            duplicates: self.check_duplicates(),
            duplicate_records: self.records.map(audit_records).unwrap_or_default(),
            id_collisions: self.check_id_collisions(),
            orphans: self.check_orphans(),
            relations: self.check_relations(),
            embeddings: self.check_embeddings(),
        }
    }

    /// Group rows by natural key per kind; empty keys are ignored
    pub fn check_duplicates(&self) -> BTreeMap<NodeKind, Vec<DuplicateGroup>> {
        let mut duplicates = BTreeMap::new();

        for kind in NodeKind::ALL {
            let mut order: Vec<&str> = Vec::new();
            let mut by_key: HashMap<&str, Vec<NodeId>> = HashMap::new();

            for node in self.graph.nodes(kind) {
                let key = node.natural_key();
                if key.is_empty() {
                    continue;
                }
                let ids = by_key.entry(key).or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                });
                ids.push(node.id.clone());
            }

            let groups: Vec<DuplicateGroup> = order
                .into_iter()
                .filter_map(|key| {
                    let ids = by_key.remove(key)?;
                    (ids.len() > 1).then(|| DuplicateGroup {
                        key: key.to_string(),
                        count: ids.len(),
                        ids,
                    })
                })
                .collect();

            if !groups.is_empty() {
                duplicates.insert(kind, groups);
            }
        }

        duplicates
    }

    /// Identifiers carried by more than one (kind, natural key) entity.
    ///
    /// Covers cross-kind clashes and same-kind clashes with different keys.
    /// Rows repeating one kind and key belong to [`Self::check_duplicates`]
    /// and are not reported again here. Empty ids are skipped.
    pub fn check_id_collisions(&self) -> Vec<IdCollision> {
        let mut order: Vec<&NodeId> = Vec::new();
        let mut entities: HashMap<&NodeId, Vec<(NodeKind, &str)>> = HashMap::new();

        for node in self.graph.all_nodes() {
            if node.id.is_empty() {
                continue;
            }
            let seen = entities.entry(&node.id).or_insert_with(|| {
                order.push(&node.id);
                Vec::new()
            });
            let entity = (node.kind(), node.natural_key());
            if !seen.contains(&entity) {
                seen.push(entity);
            }
        }

        order
            .into_iter()
            .filter_map(|id| {
                let seen = entities.remove(id)?;
                if seen.len() < 2 {
                    return None;
                }
                let mut kinds: Vec<NodeKind> = Vec::new();
                for (kind, _) in &seen {
                    if !kinds.contains(kind) {
                        kinds.push(*kind);
                    }
                }
                Some(IdCollision {
                    id: id.clone(),
                    kinds,
                    keys: seen.iter().map(|(_, key)| key.to_string()).collect(),
                })
            })
            .collect()
    }

    pub fn check_orphans(&self) -> BTreeMap<NodeKind, OrphanStats> {
        let connected: HashSet<&str> = self
            .graph
            .edges()
            .iter()
            .flat_map(|e| [e.from_id.as_str(), e.to_id.as_str()])
            .collect();

        NodeKind::ALL
            .into_iter()
            .map(|kind| {
                let nodes = self.graph.nodes(kind);
                let ids: Vec<NodeId> = nodes
                    .iter()
                    .filter(|n| !n.id.is_empty() && !connected.contains(n.id.as_str()))
                    .map(|n| n.id.clone())
                    .collect();
                let total = nodes.len();
                let orphan = ids.len();
                let stats = OrphanStats {
                    total,
                    orphan,
                    connected: total - orphan,
                    percentage: percentage(orphan, total),
                    ids,
                };
                (kind, stats)
            })
            .collect()
    }

    pub fn check_relations(&self) -> RelationIntegrity {
        let known: HashSet<&str> = self.graph.all_nodes().map(|n| n.id.as_str()).collect();
        let mut relation_types: BTreeMap<String, usize> = BTreeMap::new();
        let mut invalid = Vec::new();

        for edge in self.graph.edges() {
            *relation_types.entry(edge.relation.clone()).or_default() += 1;

            for (kind, id) in [
                (InvalidEdgeKind::MissingFrom, &edge.from_id),
                (InvalidEdgeKind::MissingTo, &edge.to_id),
            ] {
                if !known.contains(id.as_str()) {
                    invalid.push(InvalidEdge {
                        kind,
                        from_id: edge.from_id.clone(),
                        to_id: edge.to_id.clone(),
                        rel_type: edge.relation.clone(),
                    });
                }
            }
        }

        let missing_from = invalid
            .iter()
            .filter(|i| i.kind == InvalidEdgeKind::MissingFrom)
            .count();
        RelationIntegrity {
            total_relations: self.graph.edge_count(),
            relation_types,
            invalid_relations: invalid.len(),
            missing_from,
            missing_to: invalid.len() - missing_from,
            invalid_details: invalid.iter().take(self.max_details).cloned().collect(),
            invalid,
        }
    }

    pub fn check_embeddings(&self) -> BTreeMap<NodeKind, CoverageStats> {
        NodeKind::ALL
            .into_iter()
            .map(|kind| {
                let nodes = self.graph.nodes(kind);
                let missing: Vec<NodeId> = nodes
                    .iter()
                    .filter(|n| !n.has_embedding())
                    .map(|n| n.id.clone())
                    .collect();
                let total = nodes.len();
                let with_embedding = total - missing.len();
                let stats = CoverageStats {
                    total,
                    with_embedding,
                    empty_embedding: missing.len(),
                    coverage: percentage(with_embedding, total),
                    missing,
                };
                (kind, stats)
            })
            .collect()
    }
}

/// Records sharing a non-empty `paper_id`, in first-seen order
fn audit_records(records: &[PaperRecord]) -> Vec<DuplicateRecord> {
    let mut order: Vec<&str> = Vec::new();
    let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        if record.paper_id.is_empty() {
            continue;
        }
        positions
            .entry(record.paper_id.as_str())
            .or_insert_with(|| {
                order.push(record.paper_id.as_str());
                Vec::new()
            })
            .push(index);
    }

    order
        .into_iter()
        .filter_map(|paper_id| {
            let records = positions.remove(paper_id)?;
            (records.len() > 1).then(|| DuplicateRecord {
                paper_id: paper_id.to_string(),
                records,
            })
        })
        .collect()
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}
