//! Extraction record — one versioned snapshot of the structured data
//! extracted from an article, with derived completeness and review state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::enums::{ExtractionStatus, WarningSeverity};
use super::field::{parse_field_path, FieldNode, FieldPathError};
use super::review::ReviewStatus;

/// The ten fixed sections of an extraction record, in display order.
pub const SECTION_NAMES: [&str; 10] = [
    "study_design",
    "population",
    "intervention",
    "comparator",
    "outcomes",
    "setting",
    "follow_up",
    "funding",
    "limitations",
    "conclusions",
];

/// A warning produced by the numerical validator, anchored to a field path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub field_path: String,
    pub severity: WarningSeverity,
    pub check_name: String,
    pub message: String,
}

/// Per-section completeness tallies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionStats {
    pub total: u32,
    pub extracted: u32,
    pub missing: u32,
    pub low_confidence: u32,
}

impl SectionStats {
    /// Percent of countable fields extracted; 0 when the section is empty.
    pub fn pct_complete(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.extracted as f32 / self.total as f32 * 100.0
        }
    }

    /// Fully extracted, but at least one field still needs review.
    pub fn complete_with_caveats(&self) -> bool {
        self.total > 0 && self.extracted == self.total && self.low_confidence > 0
    }
}

/// Tallies of why fields are missing, keyed by the four defined reasons.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingReasonCounts {
    pub not_reported: u32,
    pub explicitly_absent: u32,
    pub not_applicable: u32,
    pub unclear: u32,
}

/// Aggregate counts over an extraction record. Derived data: recomputed
/// from scratch on every record change, never patched incrementally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletenessSummary {
    pub total_fields: u32,
    pub extracted: u32,
    pub missing: u32,
    pub low_confidence: u32,
    pub medium_confidence: u32,
    pub high_confidence: u32,
    pub by_section: BTreeMap<String, SectionStats>,
    pub missing_reasons: MissingReasonCounts,
}

/// One version of the structured extraction for an article.
///
/// Versions are monotonic per article; a correction or re-extraction
/// produces the next version rather than mutating a past one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub id: Uuid,
    pub article_id: Uuid,
    pub extracted_by: Option<Uuid>,
    pub template_id: Option<Uuid>,
    pub version: i64,
    pub status: ExtractionStatus,

    pub study_design: Option<FieldNode>,
    pub population: Option<FieldNode>,
    pub intervention: Option<FieldNode>,
    pub comparator: Option<FieldNode>,
    pub outcomes: Option<FieldNode>,
    pub setting: Option<FieldNode>,
    pub follow_up: Option<FieldNode>,
    pub funding: Option<FieldNode>,
    pub limitations: Option<FieldNode>,
    pub conclusions: Option<FieldNode>,

    /// Template-defined extra fields, same per-field shape as sections.
    pub custom_fields: Option<FieldNode>,

    pub completeness_summary: Option<CompletenessSummary>,
    pub validation_warnings: Vec<ValidationWarning>,
    /// Sparse map: a field path absent here is `pending`.
    pub field_review_status: BTreeMap<String, ReviewStatus>,
    /// Narrative synthesis, carried verbatim.
    pub synthesis: Option<Value>,

    pub raw_llm_response: Option<Value>,
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
    pub model_used: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExtractionRecord {
    /// The named sections in fixed order, applicable or not.
    pub fn sections(&self) -> impl Iterator<Item = (&'static str, Option<&FieldNode>)> {
        SECTION_NAMES
            .into_iter()
            .map(move |name| (name, self.section(name)))
    }

    pub fn section(&self, name: &str) -> Option<&FieldNode> {
        match name {
            "study_design" => self.study_design.as_ref(),
            "population" => self.population.as_ref(),
            "intervention" => self.intervention.as_ref(),
            "comparator" => self.comparator.as_ref(),
            "outcomes" => self.outcomes.as_ref(),
            "setting" => self.setting.as_ref(),
            "follow_up" => self.follow_up.as_ref(),
            "funding" => self.funding.as_ref(),
            "limitations" => self.limitations.as_ref(),
            "conclusions" => self.conclusions.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn section_mut(&mut self, name: &str) -> Option<&mut Option<FieldNode>> {
        match name {
            "study_design" => Some(&mut self.study_design),
            "population" => Some(&mut self.population),
            "intervention" => Some(&mut self.intervention),
            "comparator" => Some(&mut self.comparator),
            "outcomes" => Some(&mut self.outcomes),
            "setting" => Some(&mut self.setting),
            "follow_up" => Some(&mut self.follow_up),
            "funding" => Some(&mut self.funding),
            "limitations" => Some(&mut self.limitations),
            "conclusions" => Some(&mut self.conclusions),
            "custom_fields" => Some(&mut self.custom_fields),
            _ => None,
        }
    }

    /// Replace the value of the field addressed by a full dot-delimited
    /// path whose first segment names a section (or `custom_fields`).
    pub fn set_field_value(&mut self, field_path: &str, value: Value) -> Result<(), FieldPathError> {
        let segments = parse_field_path(field_path)?;
        let (head, rest) = segments
            .split_first()
            .ok_or(FieldPathError::Empty)?;
        let slot = self
            .section_mut(&head.key)
            .ok_or_else(|| FieldPathError::Unresolved(field_path.to_string()))?;
        let node = slot
            .as_mut()
            .ok_or_else(|| FieldPathError::Unresolved(field_path.to_string()))?;
        // A leading index (e.g. outcomes[0]) selects into a list section.
        let target = match head.index {
            Some(i) => match node {
                FieldNode::List(items) => items
                    .get_mut(i)
                    .ok_or_else(|| FieldPathError::Unresolved(field_path.to_string()))?,
                _ => return Err(FieldPathError::Unresolved(field_path.to_string())),
            },
            None => node,
        };
        if rest.is_empty() {
            return Err(FieldPathError::Unresolved(field_path.to_string()));
        }
        target.set_field_value(rest, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::Confidence;
    use serde_json::json;

    fn empty_record(article_id: Uuid) -> ExtractionRecord {
        let now = Utc::now();
        ExtractionRecord {
            id: Uuid::new_v4(),
            article_id,
            extracted_by: None,
            template_id: None,
            version: 1,
            status: ExtractionStatus::Completed,
            study_design: None,
            population: None,
            intervention: None,
            comparator: None,
            outcomes: None,
            setting: None,
            follow_up: None,
            funding: None,
            limitations: None,
            conclusions: None,
            custom_fields: None,
            completeness_summary: None,
            validation_warnings: Vec::new(),
            field_review_status: BTreeMap::new(),
            synthesis: None,
            raw_llm_response: None,
            prompt_tokens: None,
            completion_tokens: None,
            model_used: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn section_lookup_covers_all_names() {
        let record = empty_record(Uuid::new_v4());
        for (name, node) in record.sections() {
            assert!(SECTION_NAMES.contains(&name));
            assert!(node.is_none());
        }
    }

    #[test]
    fn set_field_value_routes_through_section() {
        let mut record = empty_record(Uuid::new_v4());
        record.population = Some(FieldNode::from_value(json!({
            "sample_size": {"value": null, "missing_reason": "unclear"}
        })));
        record
            .set_field_value("population.sample_size", json!(240))
            .unwrap();
        let field = record
            .population
            .as_ref()
            .unwrap()
            .child("sample_size")
            .unwrap()
            .as_field()
            .unwrap();
        assert_eq!(field.value, json!(240));
        assert_eq!(field.missing_reason, None);
    }

    #[test]
    fn set_field_value_with_list_section_index() {
        let mut record = empty_record(Uuid::new_v4());
        record.outcomes = Some(FieldNode::from_value(json!([
            {"name": {"value": "mortality", "confidence": "high"}}
        ])));
        record
            .set_field_value("outcomes[0].name", json!("all-cause mortality"))
            .unwrap();
        let outcomes = record.outcomes.as_ref().unwrap();
        let item = match outcomes {
            FieldNode::List(items) => &items[0],
            _ => panic!(),
        };
        let field = item.child("name").unwrap().as_field().unwrap();
        assert_eq!(field.value, json!("all-cause mortality"));
        assert_eq!(field.confidence, Some(Confidence::High));
    }

    #[test]
    fn set_field_value_rejects_unknown_section() {
        let mut record = empty_record(Uuid::new_v4());
        let err = record.set_field_value("abstract.text", json!("x")).unwrap_err();
        assert!(matches!(err, FieldPathError::Unresolved(_)));
    }

    #[test]
    fn section_stats_pct_and_caveats() {
        let stats = SectionStats {
            total: 4,
            extracted: 4,
            missing: 0,
            low_confidence: 1,
        };
        assert!((stats.pct_complete() - 100.0).abs() < f32::EPSILON);
        assert!(stats.complete_with_caveats());

        let empty = SectionStats::default();
        assert_eq!(empty.pct_complete(), 0.0);
        assert!(!empty.complete_with_caveats());
    }
}
