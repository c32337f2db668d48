//! Embedding attachment
//!
//! The embedding model itself is out of reach of this crate; it sits behind
//! the [`Embedder`] trait. This module decides what text each node is
//! embedded from, batches it per kind, and attaches the resulting vectors.
//! [`CommandEmbedder`] plugs in any model that can be run as a program.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::{debug, info};

use crate::error::{GraphError, Result};
use crate::graph::{KnowledgeGraph, NodeKind};
use crate::identity::NodeId;

/// Default number of texts per model call
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Lower bound on the norm used when normalizing
const MIN_NORM: f32 = 1e-12;

/// Black-box text embedding model
pub trait Embedder {
    /// One vector per input text, in input order
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embedder backed by an external program.
///
/// Every batch spawns the program once. The texts go to its stdin as a JSON
/// array of strings, and it must answer on stdout with a JSON array holding
/// one array of numbers per text, then exit 0. The program has to read all
/// of stdin before it writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEmbedder {
    program: String,
    args: Vec<String>,
}

impl CommandEmbedder {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Build from `[program, args...]`
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| GraphError::Embedding("empty embedding command".to_string()))?;
        Ok(Self::new(program.as_str(), args.iter().map(String::as_str)))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Embedder for CommandEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let input = serde_json::to_vec(texts)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                GraphError::Embedding(format!("failed to start '{}': {}", self.program, e))
            })?;

        // stdin is closed at the end of this match.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&input),
            None => Ok(()),
        };
        let output = child.wait_with_output()?;

        if !output.status.success() {
            return Err(GraphError::Embedding(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        written.map_err(|e| {
            GraphError::Embedding(format!("failed to write to '{}': {}", self.program, e))
        })?;

        debug!(program = %self.program, texts = texts.len(), "batch embedded");
        serde_json::from_slice(&output.stdout).map_err(|e| {
            GraphError::Embedding(format!("'{}' returned invalid vectors: {}", self.program, e))
        })
    }
}

/// Scale a vector to unit L2 norm; near-zero vectors stay near zero
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt().max(MIN_NORM);
    for value in vector.iter_mut() {
        *value /= norm;
    }
}

/// Embed every node of the graph, kind by kind, overwriting existing vectors.
///
/// Nodes with empty text are sent as a single space. Returns the number of
/// nodes embedded.
pub fn embed_graph(
    graph: &mut KnowledgeGraph,
    embedder: &dyn Embedder,
    batch_size: usize,
    normalize: bool,
) -> Result<usize> {
    let batch_size = batch_size.max(1);

    // Texts are computed up front; the graph is only mutated once a whole
    // kind has been embedded.
    let mut vectors: HashMap<NodeKind, std::vec::IntoIter<Vec<f32>>> = HashMap::new();
    for kind in NodeKind::ALL {
        let texts: Vec<String> = graph
            .nodes(kind)
            .iter()
            .map(|node| {
                let text = node.attrs.embedding_text();
                if text.is_empty() {
                    " ".to_string()
                } else {
                    text
                }
            })
            .collect();
        if texts.is_empty() {
            continue;
        }

        let mut embedded = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size) {
            let mut batch_vectors = embedder.embed(batch)?;
            if batch_vectors.len() != batch.len() {
                return Err(GraphError::Embedding(format!(
                    "model returned {} vectors for {} texts",
                    batch_vectors.len(),
                    batch.len()
                )));
            }
            if normalize {
                batch_vectors.iter_mut().for_each(|v| l2_normalize(v));
            }
            embedded.extend(batch_vectors);
        }
        debug!(kind = %kind, nodes = embedded.len(), "kind embedded");
        vectors.insert(kind, embedded.into_iter());
    }

    let mut total = 0;
    for node in graph.all_nodes_mut() {
        // Vectors come back in node order within each kind.
        if let Some(vector) = vectors.get_mut(&node.kind()).and_then(Iterator::next) {
            node.embedding = Some(vector);
            total += 1;
        }
    }

    info!(nodes = total, "embeddings attached");
    Ok(total)
}

/// Outcome of [`apply_embeddings`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Nodes that received a vector
    pub matched: usize,
    /// Vectors whose id matched no node
    pub unmatched: usize,
}

/// Attach precomputed vectors by node id.
///
/// Every node row carrying a listed id gets the vector. Nodes not in the map
/// keep what they had.
pub fn apply_embeddings(
    graph: &mut KnowledgeGraph,
    vectors: &HashMap<NodeId, Vec<f32>>,
) -> ApplySummary {
    let mut summary = ApplySummary::default();
    let mut used: HashSet<&NodeId> = HashSet::new();

    for node in graph.all_nodes_mut() {
        if let Some((id, vector)) = vectors.get_key_value(&node.id) {
            node.embedding = Some(vector.clone());
            summary.matched += 1;
            used.insert(id);
        }
    }

    summary.unmatched = vectors.len() - used.len();
    debug!(
        matched = summary.matched,
        unmatched = summary.unmatched,
        "precomputed embeddings applied"
    );
    summary
}
