//! Graph Assembler
//!
//! One forward pass over the records, in input order. Each record registers
//! its Paper, then its entity mentions, then resolves its relations against
//! everything registered so far (earlier records included, later ones not).

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::{
    Edge, EdgeDrop, EntityRegistry, KnowledgeGraph, NodeAttrs, Registration, RelationResolver,
    ResolutionPolicy,
};
use crate::record::PaperRecord;

/// Counters collected during a construction pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub records: usize,
    /// Records without a `paper_id` (no Paper node)
    pub papers_without_id: usize,
    /// Records whose `paper_id` was already taken (dropped)
    pub duplicate_papers: usize,
    pub nodes_created: usize,
    pub edges_retained: usize,
    /// Dropped relations by reason label
    pub edges_dropped: BTreeMap<String, usize>,
}

impl BuildStats {
    pub fn total_dropped(&self) -> usize {
        self.edges_dropped.values().sum()
    }

    fn record_drop(&mut self, drop: &EdgeDrop) {
        *self.edges_dropped.entry(drop.label().to_string()).or_default() += 1;
    }
}

/// Result of a construction pass
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub graph: KnowledgeGraph,
    pub stats: BuildStats,
}

/// Build the graph from records in a single pass
pub fn build_graph(records: &[PaperRecord], policy: &ResolutionPolicy) -> BuildOutput {
    let mut registry = EntityRegistry::new();
    let mut edges = Vec::new();
    let mut stats = BuildStats::default();

    for record in records {
        ingest_record(&mut registry, policy, record, &mut edges, &mut stats);
    }

    let graph = KnowledgeGraph::from_parts(registry.into_nodes(), edges);
    info!(
        records = stats.records,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        dropped_edges = stats.total_dropped(),
        duplicate_papers = stats.duplicate_papers,
        "graph construction finished"
    );

    BuildOutput { graph, stats }
}

/// Process one record against the shared registry
pub fn ingest_record(
    registry: &mut EntityRegistry,
    policy: &ResolutionPolicy,
    record: &PaperRecord,
    edges: &mut Vec<Edge>,
    stats: &mut BuildStats,
) {
    stats.records += 1;

    match registry.register_paper(paper_attrs(record)) {
        Registration::Created(_) => stats.nodes_created += 1,
        Registration::Existing(_) => stats.duplicate_papers += 1,
        Registration::Skipped => stats.papers_without_id += 1,
    }

    for attrs in entity_mentions(record) {
        if registry.register(attrs).is_created() {
            stats.nodes_created += 1;
        }
    }

    let resolver = RelationResolver::new(registry, policy);
    for relation in &record.relations {
        match resolver.resolve(relation, &record.paper_id) {
            Ok(edge) => {
                stats.edges_retained += 1;
                edges.push(edge);
            }
            Err(drop) => {
                debug!(paper_id = %record.paper_id, reason = %drop, "relation dropped");
                stats.record_drop(&drop);
            }
        }
    }
}

fn paper_attrs(record: &PaperRecord) -> NodeAttrs {
    NodeAttrs::Paper {
        paper_id: record.paper_id.clone(),
        title: record.title.clone(),
        doi: record.doi.clone(),
        year: record.year,
        category: record.category.clone(),
        authors: record.authors.clone(),
    }
}

/// Entity mentions of a record, in registration order
fn entity_mentions(record: &PaperRecord) -> impl Iterator<Item = NodeAttrs> + '_ {
    let tasks = record.tasks.iter().map(|name| NodeAttrs::Task { name: name.clone() });
    let modalities = record
        .imaging_modalities
        .iter()
        .map(|name| NodeAttrs::ImagingModality { name: name.clone() });
    let structures = record
        .anatomical_structures
        .iter()
        .map(|name| NodeAttrs::AnatomicalStructure { name: name.clone() });
    let methods = record.methods.iter().map(|m| NodeAttrs::Method {
        name: m.name.clone(),
        method_type: m.method_type.clone(),
    });
    let datasets = record.datasets.iter().map(|name| NodeAttrs::Dataset { name: name.clone() });
    let metrics = record.metrics.iter().map(|m| NodeAttrs::Metric { name: m.name.clone() });
    let innovations = record.innovations.iter().map(|i| NodeAttrs::Innovation {
        description: i.description.clone(),
        innovation_type: i.innovation_type.clone(),
    });

    tasks
        .chain(modalities)
        .chain(structures)
        .chain(methods)
        .chain(datasets)
        .chain(metrics)
        .chain(innovations)
}
