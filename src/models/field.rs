//! Extraction field model — the atomic unit of an extraction record.
//!
//! A field carries a value, a confidence level, a "why missing" reason,
//! verbatim supporting quotes, and citations anchored to normalized PDF
//! coordinates. Producer output arrives as loose JSON; `FieldNode::from_value`
//! is the single migration point that turns it into the tagged form, so
//! consumers match on the enum instead of probing for a `value` key.

use std::collections::BTreeMap;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::enums::{Confidence, MissingReason};

/// A citation anchored to a PDF page, normalized to page width/height
/// (origin top-left, coordinates in [0,1]). Created by the extraction
/// producer, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub page: u32,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub text: String,
}

/// A single extracted datum with its confidence metadata.
///
/// After `normalize`, exactly one of {non-null value, missing_reason} holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub confidence: Option<Confidence>,
    #[serde(default)]
    pub missing_reason: Option<MissingReason>,
    #[serde(default)]
    pub quotes: Vec<String>,
    #[serde(default)]
    pub source_locations: Vec<SourceLocation>,
}

impl ExtractedField {
    /// Build a field from a raw producer dict (a JSON object carrying a
    /// `value` key). Unknown confidence/missing_reason strings are treated
    /// as absent and resolved by `normalize`.
    pub fn from_raw(map: &Map<String, Value>) -> Self {
        let value = map.get("value").cloned().unwrap_or(Value::Null);
        let confidence = map
            .get("confidence")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok());
        let missing_reason = map
            .get("missing_reason")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok());
        let quotes = map
            .get("quotes")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        let source_locations = map
            .get("source_locations")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let mut field = Self {
            value,
            confidence,
            missing_reason,
            quotes,
            source_locations,
        };
        field.normalize();
        field
    }

    /// Enforce the confidence-metadata rules: an extracted value without a
    /// valid confidence defaults to low; a missing value always carries a
    /// reason (not_reported when the producer gave none); an extracted
    /// value never carries one.
    pub fn normalize(&mut self) {
        if self.confidence.is_none() && !self.value.is_null() {
            self.confidence = Some(Confidence::Low);
        }
        if self.value.is_null() {
            if self.missing_reason.is_none() {
                self.missing_reason = Some(MissingReason::NotReported);
            }
        } else {
            self.missing_reason = None;
        }
    }

    pub fn is_missing(&self) -> bool {
        self.value.is_null()
    }

    /// A field needs reviewer attention when the producer rated it low or
    /// could not tell whether the datum is absent. `unclear` wins over any
    /// confidence rating.
    pub fn needs_review(&self) -> bool {
        self.missing_reason == Some(MissingReason::Unclear)
            || self.confidence == Some(Confidence::Low)
    }
}

/// Tagged form of stored extraction data.
///
/// Serializes back to the exact wire shape it was migrated from; the
/// `Legacy` arm preserves pre-metadata scalars verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldNode {
    Field(ExtractedField),
    Group(BTreeMap<String, FieldNode>),
    List(Vec<FieldNode>),
    Legacy(Value),
}

impl FieldNode {
    /// The migration step: raw JSON → tagged tree. An object carrying a
    /// `value` key is a field (normalized on the way in); any other object
    /// is a group; arrays recurse; everything else is a legacy scalar.
    pub fn from_value(raw: Value) -> Self {
        match raw {
            Value::Object(map) => {
                if map.contains_key("value") {
                    FieldNode::Field(ExtractedField::from_raw(&map))
                } else {
                    FieldNode::Group(
                        map.into_iter()
                            .map(|(k, v)| (k, FieldNode::from_value(v)))
                            .collect(),
                    )
                }
            }
            Value::Array(items) => {
                FieldNode::List(items.into_iter().map(FieldNode::from_value).collect())
            }
            other => FieldNode::Legacy(other),
        }
    }

    pub fn as_field(&self) -> Option<&ExtractedField> {
        match self {
            FieldNode::Field(f) => Some(f),
            _ => None,
        }
    }

    pub fn child(&self, key: &str) -> Option<&FieldNode> {
        match self {
            FieldNode::Group(children) => children.get(key),
            _ => None,
        }
    }

    /// The raw datum behind a node: a field's value or a legacy scalar.
    pub fn raw_value(&self) -> Option<&Value> {
        match self {
            FieldNode::Field(f) => Some(&f.value),
            FieldNode::Legacy(v) => Some(v),
            _ => None,
        }
    }

    /// Visit every `ExtractedField` in the tree, building dot-delimited
    /// paths with `[i]` suffixes for list elements.
    pub fn walk_fields<'a>(&'a self, prefix: &str, visit: &mut dyn FnMut(&str, &'a ExtractedField)) {
        match self {
            FieldNode::Field(f) => visit(prefix, f),
            FieldNode::Group(children) => {
                for (key, child) in children {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    child.walk_fields(&path, visit);
                }
            }
            FieldNode::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    item.walk_fields(&format!("{prefix}[{i}]"), visit);
                }
            }
            FieldNode::Legacy(_) => {}
        }
    }

    fn node_at_mut(&mut self, segments: &[PathSegment]) -> Option<&mut FieldNode> {
        let mut node = self;
        for segment in segments {
            node = match node {
                FieldNode::Group(children) => children.get_mut(&segment.key)?,
                _ => return None,
            };
            if let Some(index) = segment.index {
                node = match node {
                    FieldNode::List(items) => items.get_mut(index)?,
                    _ => return None,
                };
            }
        }
        Some(node)
    }

    /// Replace the value of the field addressed by `segments` (path relative
    /// to this node). Correcting a legacy scalar migrates it to the field
    /// form. The field is re-normalized afterwards.
    pub fn set_field_value(
        &mut self,
        segments: &[PathSegment],
        value: Value,
    ) -> Result<(), FieldPathError> {
        let node = self
            .node_at_mut(segments)
            .ok_or_else(|| FieldPathError::Unresolved(join_segments(segments)))?;
        match node {
            FieldNode::Field(field) => {
                field.value = value;
                field.normalize();
            }
            FieldNode::Legacy(_) => {
                let mut field = ExtractedField {
                    value,
                    confidence: None,
                    missing_reason: None,
                    quotes: Vec::new(),
                    source_locations: Vec::new(),
                };
                field.normalize();
                *node = FieldNode::Field(field);
            }
            _ => return Err(FieldPathError::Unresolved(join_segments(segments))),
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for FieldNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // All deserialization funnels through the explicit migration so
        // stored legacy shapes keep working.
        let raw = Value::deserialize(deserializer)?;
        Ok(FieldNode::from_value(raw))
    }
}

// ---------------------------------------------------------------------------
// Field paths
// ---------------------------------------------------------------------------

/// One segment of a dot-delimited field path, e.g. `outcomes[0]` or
/// `sample_size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub key: String,
    pub index: Option<usize>,
}

#[derive(Debug, Error)]
pub enum FieldPathError {
    #[error("empty field path")]
    Empty,
    #[error("malformed path segment: {0}")]
    MalformedSegment(String),
    #[error("path does not resolve to a field: {0}")]
    Unresolved(String),
}

/// Parse a dot-delimited path (`population.sample_size`,
/// `outcomes[0].p_value`) into segments.
pub fn parse_field_path(path: &str) -> Result<Vec<PathSegment>, FieldPathError> {
    if path.trim().is_empty() {
        return Err(FieldPathError::Empty);
    }
    let mut segments = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            return Err(FieldPathError::MalformedSegment(path.to_string()));
        }
        if let Some(open) = part.find('[') {
            let key = &part[..open];
            let rest = &part[open..];
            if key.is_empty() || !rest.ends_with(']') {
                return Err(FieldPathError::MalformedSegment(part.to_string()));
            }
            let index: usize = rest[1..rest.len() - 1]
                .parse()
                .map_err(|_| FieldPathError::MalformedSegment(part.to_string()))?;
            segments.push(PathSegment {
                key: key.to_string(),
                index: Some(index),
            });
        } else {
            segments.push(PathSegment {
                key: part.to_string(),
                index: None,
            });
        }
    }
    Ok(segments)
}

fn join_segments(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(|s| match s.index {
            Some(i) => format!("{}[{i}]", s.key),
            None => s.key.clone(),
        })
        .collect::<Vec<_>>()
        .join(".")
}
