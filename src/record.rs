//! Input paper records
//!
//! Records are semi-structured: any field may be missing or carry the wrong
//! JSON shape. A bad field falls back to its default instead of rejecting the
//! record, so a malformed record only contributes fewer nodes and edges. The
//! only hard failure is a document that is not a JSON array.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{GraphError, Result};

/// One publication with its extracted entities and declared relations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub paper_id: String,
    #[serde(deserialize_with = "lenient")]
    pub title: String,
    #[serde(deserialize_with = "lenient")]
    pub doi: String,
    #[serde(deserialize_with = "lenient_year")]
    pub year: Option<i32>,
    #[serde(deserialize_with = "lenient")]
    pub category: String,
    #[serde(deserialize_with = "lenient_strings")]
    pub authors: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub tasks: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub imaging_modalities: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub anatomical_structures: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub datasets: Vec<String>,
    #[serde(deserialize_with = "lenient_entries")]
    pub methods: Vec<MethodMention>,
    #[serde(deserialize_with = "lenient_entries")]
    pub metrics: Vec<MetricMention>,
    #[serde(deserialize_with = "lenient_entries")]
    pub innovations: Vec<InnovationMention>,
    #[serde(deserialize_with = "lenient_entries")]
    pub relations: Vec<RelationRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodMention {
    #[serde(deserialize_with = "lenient")]
    pub name: String,
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub method_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricMention {
    #[serde(deserialize_with = "lenient")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InnovationMention {
    #[serde(deserialize_with = "lenient")]
    pub description: String,
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub innovation_type: String,
}

/// A declared edge, endpoints still as free text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationRecord {
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub relation: String,
    #[serde(deserialize_with = "lenient_id")]
    pub from: String,
    #[serde(deserialize_with = "lenient")]
    pub to: String,
    #[serde(deserialize_with = "lenient_number")]
    pub value: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub note: Option<String>,
}

/// Parse a JSON document holding an array of records
pub fn parse_records(content: &str) -> Result<Vec<PaperRecord>> {
    let document: serde_json::Value = serde_json::from_str(content)?;
    let serde_json::Value::Array(items) = document else {
        return Err(GraphError::InvalidInput(
            "expected a JSON array of paper records".to_string(),
        ));
    };

    Ok(items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => record,
            Err(e) => {
                // Only reachable when the record itself is not an object.
                debug!(index, error = %e, "record is not an object, treating as empty");
                PaperRecord::default()
            }
        })
        .collect())
}

/// Read and parse a records file
pub fn load_records(path: &Path) -> Result<Vec<PaperRecord>> {
    let content = fs::read_to_string(path)?;
    parse_records(&content)
}

// =============================================================================
// Lenient field deserializers
// =============================================================================

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        debug!(error = %e, "field has unexpected shape, using default");
        T::default()
    }))
}

/// Keep the string entries of a list, skip everything else
fn lenient_strings<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Keep the object entries of a list, skip everything else
fn lenient_entries<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Identifiers may arrive as numbers; they keep their JSON spelling
fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        other => {
            debug!(value = %other, "identifier has unexpected shape, using default");
            String::new()
        }
    })
}

fn lenient_year<'de, D>(deserializer: D) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        serde_json::Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                s.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() {
        let json = r#"[{
            "paper_id": "P1",
            "title": "Brain tumor segmentation",
            "doi": "10.1000/x",
            "year": 2021,
            "category": "Segmentation",
            "authors": ["A. Author", "B. Author"],
            "tasks": ["Segmentation"],
            "imaging_modalities": ["MRI"],
            "anatomical_structures": ["Brain"],
            "datasets": ["BraTS 2021"],
            "methods": [{"name": "U-Net", "type": "CNN"}],
            "metrics": [{"name": "Dice"}],
            "innovations": [{"description": "Attention gates", "type": "architecture"}],
            "relations": [{
                "type": "EVALUATED_ON",
                "from": "U-Net",
                "to": "BraTS 2021",
                "value": 0.91,
                "note": "test split"
            }]
        }]"#;

        let records = parse_records(json).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.paper_id, "P1");
        assert_eq!(record.year, Some(2021));
        assert_eq!(record.authors, vec!["A. Author", "B. Author"]);
        assert_eq!(record.methods[0].method_type, "CNN");
        assert_eq!(record.innovations[0].innovation_type, "architecture");
        assert_eq!(record.relations[0].relation, "EVALUATED_ON");
        assert_eq!(record.relations[0].value, Some(0.91));
        assert_eq!(record.relations[0].note.as_deref(), Some("test split"));
    }

    #[test]
    fn test_malformed_fields_fall_back_to_defaults() {
        let json = r#"[{
            "paper_id": "P2",
            "year": "unknown",
            "tasks": "Segmentation",
            "datasets": ["LIDC", 42, null],
            "methods": [{"name": "ResNet"}, "not-an-object"],
            "relations": [{"type": "USES", "from": "P2", "to": "LIDC", "value": "0.5"}]
        }]"#;

        let records = parse_records(json).unwrap();
        let record = &records[0];
        assert_eq!(record.year, None);
        assert!(record.tasks.is_empty());
        assert_eq!(record.datasets, vec!["LIDC"]);
        assert_eq!(record.methods.len(), 1);
        assert_eq!(record.methods[0].method_type, "");
        assert_eq!(record.relations[0].value, Some(0.5));
        assert!(record.title.is_empty());
    }

    #[test]
    fn test_year_as_digit_string() {
        let records = parse_records(r#"[{"paper_id": "P3", "year": " 2019 "}]"#).unwrap();
        assert_eq!(records[0].year, Some(2019));
    }

    #[test]
    fn test_numeric_paper_id_is_kept() {
        let json = r#"[{
            "paper_id": 42,
            "relations": [{"type": "ADDRESSES", "from": 42, "to": "Segmentation"}]
        }, {
            "paper_id": ["P5"]
        }]"#;

        let records = parse_records(json).unwrap();
        assert_eq!(records[0].paper_id, "42");
        assert_eq!(records[0].relations[0].from, "42");
        assert_eq!(records[1].paper_id, "");
    }

    #[test]
    fn test_non_object_record_is_empty() {
        let records = parse_records(r#"[42, {"paper_id": "P4"}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], PaperRecord::default());
        assert_eq!(records[1].paper_id, "P4");
    }

    #[test]
    fn test_non_array_document_is_rejected() {
        let err = parse_records(r#"{"paper_id": "P1"}"#).unwrap_err();
        assert!(matches!(err, GraphError::InvalidInput(_)));
    }
}
