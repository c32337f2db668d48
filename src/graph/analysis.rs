//! Connectivity Analyzer
//!
//! Undirected degree summary over the edge collection, and a weakly connected
//! component count over the whole graph.

use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;
use std::collections::HashMap;

use super::{Edge, KnowledgeGraph};
use crate::identity::NodeId;

/// Degree of one identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDegree {
    pub id: NodeId,
    pub degree: usize,
}

/// Degree summary over every identifier touched by an edge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegreeStats {
    pub nodes_with_relations: usize,
    pub min_degree: usize,
    pub max_degree: usize,
    pub mean_degree: f64,
    /// Element at `len / 2` of the ascending degrees
    pub median_degree: usize,
    pub top_nodes: Vec<NodeDegree>,
}

/// Summarize undirected degrees; `None` when there are no edges.
///
/// Every edge adds one to each endpoint, so a self-loop adds two. Ties in the
/// top list keep the order in which identifiers first appear in `edges`.
pub fn degree_stats(edges: &[Edge], top_n: usize) -> Option<DegreeStats> {
    if edges.is_empty() {
        return None;
    }

    let mut order: Vec<&NodeId> = Vec::new();
    let mut degrees: HashMap<&NodeId, usize> = HashMap::new();
    for edge in edges {
        for id in [&edge.from_id, &edge.to_id] {
            let degree = degrees.entry(id).or_insert_with(|| {
                order.push(id);
                0
            });
            *degree += 1;
        }
    }

    let mut ranked: Vec<NodeDegree> = order
        .into_iter()
        .map(|id| NodeDegree {
            id: id.clone(),
            degree: degrees[id],
        })
        .collect();

    let mut sorted: Vec<usize> = ranked.iter().map(|n| n.degree).collect();
    sorted.sort_unstable();

    // Stable sort keeps first-seen order among equal degrees.
    ranked.sort_by(|a, b| b.degree.cmp(&a.degree));
    ranked.truncate(top_n);

    let count = sorted.len();
    Some(DegreeStats {
        nodes_with_relations: count,
        min_degree: sorted[0],
        max_degree: sorted[count - 1],
        mean_degree: sorted.iter().sum::<usize>() as f64 / count as f64,
        median_degree: sorted[count / 2],
        top_nodes: ranked,
    })
}

/// Number of weakly connected components.
///
/// Every node is a vertex (ids shared between rows collapse into one); edges
/// with an endpoint that matches no node are ignored.
pub fn component_count(graph: &KnowledgeGraph) -> usize {
    let mut ungraph: UnGraph<(), ()> = UnGraph::new_undirected();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();

    for node in graph.all_nodes() {
        index
            .entry(node.id.as_str())
            .or_insert_with(|| ungraph.add_node(()));
    }

    for edge in graph.edges() {
        let from = index.get(edge.from_id.as_str());
        let to = index.get(edge.to_id.as_str());
        if let (Some(&from), Some(&to)) = (from, to) {
            ungraph.add_edge(from, to, ());
        }
    }

    connected_components(&ungraph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeAttrs};

    fn edge(from: &str, to: &str) -> Edge {
        Edge::new(NodeId::from(from), NodeId::from(to), "USES")
    }

    #[test]
    fn test_empty_edges_give_no_stats() {
        assert!(degree_stats(&[], 10).is_none());
    }

    #[test]
    fn test_degree_summary() {
        let edges = vec![edge("P1", "a"), edge("P1", "b"), edge("P2", "a"), edge("P1", "c")];
        let stats = degree_stats(&edges, 2).unwrap();

        // P1=3, a=2, b=1, P2=1, c=1
        assert_eq!(stats.nodes_with_relations, 5);
        assert_eq!(stats.min_degree, 1);
        assert_eq!(stats.max_degree, 3);
        assert_eq!(stats.median_degree, 1);
        assert!((stats.mean_degree - 1.6).abs() < 1e-9);
        assert_eq!(
            stats.top_nodes,
            vec![
                NodeDegree { id: NodeId::from("P1"), degree: 3 },
                NodeDegree { id: NodeId::from("a"), degree: 2 },
            ]
        );
    }

    #[test]
    fn test_self_loop_counts_twice_and_ties_keep_first_seen_order() {
        let edges = vec![edge("x", "y"), edge("z", "z")];
        let stats = degree_stats(&edges, 10).unwrap();
        let ids: Vec<&str> = stats.top_nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "x", "y"]);
        assert_eq!(stats.top_nodes[0].degree, 2);
        assert_eq!(stats.median_degree, 1);
    }

    #[test]
    fn test_component_count_ignores_dangling_edges() {
        let mut graph = KnowledgeGraph::new();
        for (id, name) in [("a", "Segmentation"), ("b", "Detection"), ("c", "Registration")] {
            let attrs = NodeAttrs::Task { name: name.to_string() };
            graph.push_node(Node::new(NodeId::from(id), attrs));
        }
        graph.push_edge(edge("a", "b"));
        graph.push_edge(edge("c", "ghost"));

        assert_eq!(component_count(&graph), 2);
        assert_eq!(component_count(&KnowledgeGraph::new()), 0);
    }
}
