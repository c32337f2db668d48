//! Statistics report
//!
//! Descriptive counts over a finished graph: nodes per kind, relations per
//! type, paper years and categories, and connectivity.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::analysis::{component_count, degree_stats, DegreeStats};
use super::{KnowledgeGraph, NodeAttrs, NodeKind};

/// Relation totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationStats {
    pub total: usize,
    /// Count per relation type, most frequent first
    pub by_type: Vec<(String, usize)>,
}

impl RelationStats {
    /// Share of `count` in the total, in percent
    pub fn percentage(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearRange {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

/// Paper-level statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaperStats {
    pub total_papers: usize,
    pub year_range: YearRange,
    pub year_distribution: BTreeMap<i32, usize>,
    /// Most frequent non-empty categories, capped
    pub top_categories: Vec<(String, usize)>,
}

/// Full statistics over one graph
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsReport {
    pub generated_at: DateTime<Utc>,
    pub node_counts: BTreeMap<NodeKind, usize>,
    pub total_nodes: usize,
    pub relations: RelationStats,
    pub papers: PaperStats,
    /// Absent when the graph has no edges
    pub connectivity: Option<DegreeStats>,
    pub components: usize,
}

impl StatisticsReport {
    pub fn compute(graph: &KnowledgeGraph, top_nodes: usize, top_categories: usize) -> Self {
        let node_counts = graph.node_counts();
        Self {
            generated_at: Utc::now(),
            total_nodes: node_counts.values().sum(),
            node_counts,
            relations: relation_stats(graph),
            papers: paper_stats(graph, top_categories),
            connectivity: degree_stats(graph.edges(), top_nodes),
            components: component_count(graph),
        }
    }
}

fn relation_stats(graph: &KnowledgeGraph) -> RelationStats {
    RelationStats {
        total: graph.edge_count(),
        by_type: rank_counts(graph.edges().iter().map(|e| e.relation.as_str())),
    }
}

fn paper_stats(graph: &KnowledgeGraph, top_categories: usize) -> PaperStats {
    let papers = graph.nodes(NodeKind::Paper);
    let mut year_distribution: BTreeMap<i32, usize> = BTreeMap::new();
    let mut categories = Vec::new();

    for paper in papers {
        if let NodeAttrs::Paper { year, category, .. } = &paper.attrs {
            if let Some(year) = year {
                *year_distribution.entry(*year).or_default() += 1;
            }
            if !category.is_empty() {
                categories.push(category.as_str());
            }
        }
    }

    let mut top = rank_counts(categories);
    top.truncate(top_categories);

    PaperStats {
        total_papers: papers.len(),
        year_range: YearRange {
            min: year_distribution.keys().next().copied(),
            max: year_distribution.keys().next_back().copied(),
        },
        year_distribution,
        top_categories: top,
    }
}

/// Count occurrences, most frequent first; ties keep first-seen order
fn rank_counts<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        let count = counts.entry(label).or_insert_with(|| {
            order.push(label);
            0
        });
        *count += 1;
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|label| (label.to_string(), counts[label]))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node};
    use crate::identity::NodeId;

    fn paper(id: &str, year: Option<i32>, category: &str) -> Node {
        Node::new(
            NodeId::from(id),
            NodeAttrs::Paper {
                paper_id: id.to_string(),
                title: String::new(),
                doi: String::new(),
                year,
                category: category.to_string(),
                authors: Vec::new(),
            },
        )
    }

    fn sample() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        graph.push_node(paper("P1", Some(2021), "Segmentation"));
        graph.push_node(paper("P2", Some(2019), "Detection"));
        graph.push_node(paper("P3", None, "Detection"));
        graph.push_node(paper("P4", Some(2021), ""));
        let segmentation = NodeAttrs::Task { name: "Segmentation".to_string() };
        graph.push_node(Node::new(NodeId::from("t1"), segmentation));
        graph.push_edge(Edge::new(NodeId::from("P1"), NodeId::from("t1"), "ADDRESSES"));
        graph.push_edge(Edge::new(NodeId::from("P2"), NodeId::from("t1"), "USES"));
        graph.push_edge(Edge::new(NodeId::from("P3"), NodeId::from("t1"), "USES"));
        graph
    }

    #[test]
    fn test_node_and_relation_counts() {
        let report = StatisticsReport::compute(&sample(), 10, 10);
        assert_eq!(report.total_nodes, 5);
        assert_eq!(report.node_counts[&NodeKind::Paper], 4);
        assert_eq!(report.node_counts[&NodeKind::Metric], 0);
        assert_eq!(report.relations.total, 3);
        assert_eq!(
            report.relations.by_type,
            vec![("USES".to_string(), 2), ("ADDRESSES".to_string(), 1)]
        );
        assert!((report.relations.percentage(2) - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_paper_stats() {
        let report = StatisticsReport::compute(&sample(), 10, 1);
        let papers = &report.papers;
        assert_eq!(papers.total_papers, 4);
        assert_eq!(papers.year_range, YearRange { min: Some(2019), max: Some(2021) });
        assert_eq!(papers.year_distribution[&2021], 2);
        assert_eq!(papers.top_categories, vec![("Detection".to_string(), 2)]);
    }

    #[test]
    fn test_connectivity_and_components() {
        let report = StatisticsReport::compute(&sample(), 1, 10);
        let connectivity = report.connectivity.unwrap();
        assert_eq!(connectivity.max_degree, 3);
        assert_eq!(connectivity.top_nodes[0].id.as_str(), "t1");
        // P1, P2, P3 and t1 form one component; P4 is isolated.
        assert_eq!(report.components, 2);
    }

    #[test]
    fn test_empty_graph() {
        let report = StatisticsReport::compute(&KnowledgeGraph::new(), 10, 10);
        assert_eq!(report.total_nodes, 0);
        assert!(report.connectivity.is_none());
        assert_eq!(report.papers.year_range, YearRange { min: None, max: None });
    }
}
