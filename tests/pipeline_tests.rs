//! Pipeline Tests
//!
//! Records in, graph built, exported, read back, validated and summarized.

use paper_graph::graph::{
    build_graph, DiagnosticCode, Edge, IntegrityValidator, KnowledgeGraph, Node, NodeAttrs,
    NodeKind, ResolutionPolicy, StatisticsReport,
};
use paper_graph::{generate_id, parse_records, read_graph, write_graph, NodeId};
use tempfile::TempDir;

fn sample_records() -> Vec<paper_graph::PaperRecord> {
    parse_records(include_str!("fixtures/papers.json")).unwrap()
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_build_from_fixture() {
    let records = sample_records();
    let output = build_graph(&records, &ResolutionPolicy::default());
    let graph = &output.graph;

    assert_eq!(graph.node_count(), 16);
    assert_eq!(graph.nodes(NodeKind::Paper).len(), 2);
    assert_eq!(graph.nodes(NodeKind::Task).len(), 4);
    assert_eq!(graph.nodes(NodeKind::Metric).len(), 1);
    assert_eq!(graph.edge_count(), 13);

    let stats = &output.stats;
    assert_eq!(stats.records, 4);
    assert_eq!(stats.duplicate_papers, 1);
    assert_eq!(stats.papers_without_id, 1);
    assert_eq!(stats.edges_dropped["unresolved_to"], 1);
    assert_eq!(stats.edges_dropped["missing_type"], 1);
    assert_eq!(stats.edges_dropped["missing_endpoint"], 1);
}

#[test]
fn test_first_paper_record_wins() {
    let output = build_graph(&sample_records(), &ResolutionPolicy::default());
    let paper = &output.graph.nodes(NodeKind::Paper)[0];
    match &paper.attrs {
        NodeAttrs::Paper { title, authors, .. } => {
            assert_eq!(title, "Residual attention U-Net for brain tumor segmentation");
            assert_eq!(authors.len(), 2);
        }
        other => panic!("expected a paper, got {:?}", other),
    }
}

#[test]
fn test_edges_carry_generated_ids_and_values() {
    let output = build_graph(&sample_records(), &ResolutionPolicy::default());
    let unet = generate_id(NodeKind::Method, "U-Net");
    let brats = generate_id(NodeKind::Dataset, "BraTS 2021");
    assert_eq!(unet.as_str(), "769fa5482764495b");
    assert_eq!(brats.as_str(), "26c8dd596e4569fd");

    let evaluated: Vec<&Edge> = output
        .graph
        .edges()
        .iter()
        .filter(|e| e.relation == "EVALUATED_ON")
        .collect();
    assert_eq!(evaluated.len(), 2);
    assert_eq!(evaluated[0].from_id, unet);
    assert_eq!(evaluated[0].to_id, brats);
    assert_eq!(evaluated[0].value, Some(0.89));
    assert_eq!(evaluated[0].note.as_deref(), Some("Dice on validation"));
    // Numeric strings are accepted as values.
    assert_eq!(evaluated[1].value, Some(0.74));

    // P002 reaches the U-Net registered by P001.
    assert!(output
        .graph
        .edges()
        .iter()
        .any(|e| e.from_id.as_str() == "P002" && e.to_id == unet));
}

#[test]
fn test_duplicate_paper_scenario() {
    let records = parse_records(include_str!("fixtures/duplicate_paper.json")).unwrap();
    let output = build_graph(&records, &ResolutionPolicy::default());
    let graph = &output.graph;

    assert_eq!(graph.nodes(NodeKind::Paper).len(), 1);
    let tasks: Vec<&str> = graph.nodes(NodeKind::Task).iter().map(|n| n.natural_key()).collect();
    assert_eq!(tasks, vec!["Segmentation", "segmentation"]);
    assert_eq!(graph.edge_count(), 1);
    assert_eq!(graph.edges()[0].from_id.as_str(), "P1");
    assert_eq!(graph.edges()[0].to_id.as_str(), "aacc4d2055fe2337");

    let report = IntegrityValidator::new(graph).with_records(&records).validate();
    let diagnostics = report.diagnostics();
    let duplicates: Vec<&str> = diagnostics
        .all()
        .iter()
        .filter(|d| {
            matches!(d.code, DiagnosticCode::DuplicateNode | DiagnosticCode::DuplicateRecord)
        })
        .map(|d| d.subject.as_str())
        .collect();
    assert_eq!(duplicates, vec!["P1"]);
    assert_eq!(report.duplicate_records[0].records, vec![0, 1]);
}

#[test]
fn test_numeric_paper_id_builds_a_paper() {
    let json = r#"[{
        "paper_id": 42,
        "title": "Numeric id",
        "tasks": ["Segmentation"],
        "relations": [{"type": "ADDRESSES", "from": 42, "to": "Segmentation"}]
    }]"#;
    let output = build_graph(&parse_records(json).unwrap(), &ResolutionPolicy::default());

    assert_eq!(output.stats.papers_without_id, 0);
    assert_eq!(output.graph.nodes(NodeKind::Paper)[0].id.as_str(), "42");
    assert_eq!(output.graph.edge_count(), 1);
    assert_eq!(output.graph.edges()[0].from_id.as_str(), "42");
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_planted_defects_are_found_exactly() {
    let paper = Node::new(
        NodeId::from("P1"),
        NodeAttrs::Paper {
            paper_id: "P1".to_string(),
            title: "Planted".to_string(),
            doi: String::new(),
            year: Some(2020),
            category: String::new(),
            authors: Vec::new(),
        },
    );
    let connected = generate_id(NodeKind::Task, "Segmentation");
    let orphan = generate_id(NodeKind::Task, "Denoising");

    let mut graph = KnowledgeGraph::new();
    graph.push_node(paper.clone());
    graph.push_node(paper);
    let segmentation = NodeAttrs::Task { name: "Segmentation".to_string() };
    graph.push_node(Node::new(connected.clone(), segmentation));
    let denoising = NodeAttrs::Task { name: "Denoising".to_string() };
    graph.push_node(Node::new(orphan.clone(), denoising));
    for node in graph.all_nodes_mut() {
        node.embedding = Some(vec![0.6, 0.8]);
    }
    graph.push_edge(Edge::new(NodeId::from("P1"), connected, "ADDRESSES"));
    graph.push_edge(Edge::new(NodeId::from("P1"), NodeId::from("ffffffffffffffff"), "USES"));

    let report = IntegrityValidator::new(&graph).validate();
    let diagnostics = report.diagnostics();
    let found: Vec<(DiagnosticCode, &str)> = diagnostics
        .all()
        .iter()
        .map(|d| (d.code, d.subject.as_str()))
        .collect();

    assert_eq!(
        found,
        vec![
            (DiagnosticCode::DuplicateNode, "P1"),
            (DiagnosticCode::MissingTo, "ffffffffffffffff"),
            (DiagnosticCode::OrphanNode, orphan.as_str()),
        ]
    );
    assert!(!report.is_clean());
}

#[test]
fn test_fixture_quality_report() {
    let records = sample_records();
    let graph = build_graph(&records, &ResolutionPolicy::default()).graph;
    let report = IntegrityValidator::new(&graph).with_records(&records).validate();

    assert!(report.duplicates.is_empty());
    assert_eq!(report.duplicate_records.len(), 1);
    assert_eq!(report.duplicate_records[0].paper_id, "P001");
    assert_eq!(report.relations.invalid_relations, 0);
    assert_eq!(report.total_orphans(), 1);
    assert_eq!(
        report.orphans[&NodeKind::Task].ids,
        vec![generate_id(NodeKind::Task, "Registration")]
    );
    assert_eq!(report.total_missing_embeddings(), 16);

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["generated_at"].is_string());
    assert_eq!(json["relations"]["relation_types"]["ADDRESSES"], 3);
    assert_eq!(json["orphans"]["Task"]["orphan"], 1);
}

#[test]
fn test_tampered_export_reports_reused_id() {
    let graph = build_graph(&sample_records(), &ResolutionPolicy::default()).graph;
    let dir = TempDir::new().unwrap();
    write_graph(dir.path(), &graph, 50).unwrap();

    // Another task row reusing the Segmentation identifier.
    let segmentation = generate_id(NodeKind::Task, "Segmentation");
    let row = serde_json::json!({
        "id": segmentation.as_str(),
        "type": "Task",
        "name": "Denoising",
        "embedding": "",
    });
    let path = dir.path().join("nodes_Task.jsonl");
    let mut tasks = std::fs::read_to_string(&path).unwrap();
    tasks.push_str(&format!("{}\n", row));
    std::fs::write(&path, tasks).unwrap();

    let back = read_graph(dir.path()).unwrap();
    let report = IntegrityValidator::new(&back).validate();
    assert!(report.duplicates.is_empty());
    assert_eq!(report.id_collisions.len(), 1);
    assert_eq!(report.id_collisions[0].id, segmentation);
    assert_eq!(report.id_collisions[0].kinds, vec![NodeKind::Task]);
    assert_eq!(report.id_collisions[0].keys, vec!["Segmentation", "Denoising"]);
    assert_eq!(report.diagnostics().with_code(DiagnosticCode::IdCollision).count(), 1);
}

// =============================================================================
// Export and Reporting
// =============================================================================

#[test]
fn test_export_round_trip_preserves_graph() {
    let graph = build_graph(&sample_records(), &ResolutionPolicy::default()).graph;
    let dir = TempDir::new().unwrap();

    let summary = write_graph(dir.path(), &graph, 5).unwrap();
    assert_eq!(summary.nodes, 16);
    assert_eq!(summary.edges, 13);

    let back = read_graph(dir.path()).unwrap();
    assert_eq!(back, graph);

    let papers = std::fs::read_to_string(dir.path().join("nodes_Paper.jsonl")).unwrap();
    let first: serde_json::Value = serde_json::from_str(papers.lines().next().unwrap()).unwrap();
    assert_eq!(first["id"], "P001");
    assert_eq!(first["authors"], "Li Wei|Maria Rossi");
    assert_eq!(first["embedding"], "");
}

#[test]
fn test_statistics_over_exported_graph() {
    let graph = build_graph(&sample_records(), &ResolutionPolicy::default()).graph;
    let dir = TempDir::new().unwrap();
    write_graph(dir.path(), &graph, 50).unwrap();
    let graph = read_graph(dir.path()).unwrap();

    let report = StatisticsReport::compute(&graph, 3, 10);
    assert_eq!(report.total_nodes, 16);
    assert_eq!(report.relations.total, 13);
    assert_eq!(report.relations.by_type[0], ("ADDRESSES".to_string(), 3));
    assert_eq!(report.relations.by_type[1], ("USES".to_string(), 3));
    assert_eq!(report.relations.by_type[2], ("EVALUATED_ON".to_string(), 2));

    assert_eq!(report.papers.year_range.min, Some(2021));
    assert_eq!(report.papers.year_range.max, Some(2022));

    let connectivity = report.connectivity.unwrap();
    assert_eq!(connectivity.top_nodes.len(), 3);
    assert_eq!(connectivity.top_nodes[0].id.as_str(), "P001");
    assert_eq!(connectivity.top_nodes[0].degree, 5);
    assert_eq!(connectivity.top_nodes[1].id, generate_id(NodeKind::Method, "U-Net"));
    assert_eq!(connectivity.top_nodes[1].degree, 4);

    // Main cluster, CT-Lung, and the isolated Registration task.
    assert_eq!(report.components, 3);
}
