//! Completeness aggregation over an extraction record.
//!
//! Walks every section's field tree and tallies extracted/missing counts
//! with confidence buckets, per section and overall. Pure and
//! deterministic: the summary is recomputed from scratch on every record
//! change, never patched incrementally.

use crate::models::enums::{Confidence, MissingReason};
use crate::models::{
    CompletenessSummary, ExtractedField, ExtractionRecord, FieldNode, SectionStats,
};

/// Keys skipped while walking a group: citation payloads attached at the
/// section level, not countable fields.
const SKIPPED_KEYS: [&str; 2] = ["quotes", "source_locations"];

/// Compute the completeness summary for a record.
///
/// Countable fields are `Field` nodes; legacy scalars are preserved in the
/// record but tallied nowhere (they carry no confidence metadata).
/// `custom_fields` is excluded — only the ten named sections count.
pub fn compute_summary(record: &ExtractionRecord) -> CompletenessSummary {
    let mut summary = CompletenessSummary::default();

    for (name, node) in record.sections() {
        let Some(node) = node else { continue };
        let mut section = SectionStats::default();
        count_node(node, &mut summary, &mut section);
        if section.total > 0 {
            summary.by_section.insert(name.to_string(), section);
        }
    }

    summary
}

fn count_node(node: &FieldNode, summary: &mut CompletenessSummary, section: &mut SectionStats) {
    match node {
        FieldNode::Field(field) => count_field(field, summary, section),
        FieldNode::Group(children) => {
            for (key, child) in children {
                if SKIPPED_KEYS.contains(&key.as_str()) {
                    continue;
                }
                count_node(child, summary, section);
            }
        }
        FieldNode::List(items) => {
            for item in items {
                count_node(item, summary, section);
            }
        }
        FieldNode::Legacy(_) => {}
    }
}

fn count_field(field: &ExtractedField, summary: &mut CompletenessSummary, section: &mut SectionStats) {
    summary.total_fields += 1;
    section.total += 1;

    if field.is_missing() {
        summary.missing += 1;
        section.missing += 1;
        match field.missing_reason {
            Some(MissingReason::NotReported) => summary.missing_reasons.not_reported += 1,
            Some(MissingReason::ExplicitlyAbsent) => summary.missing_reasons.explicitly_absent += 1,
            Some(MissingReason::NotApplicable) => summary.missing_reasons.not_applicable += 1,
            Some(MissingReason::Unclear) => summary.missing_reasons.unclear += 1,
            None => {}
        }
        // "Unclear" is a needs-review signal: it lands in the low bucket
        // even though the field has no extracted value to rate.
        if field.missing_reason == Some(MissingReason::Unclear) {
            summary.low_confidence += 1;
            section.low_confidence += 1;
        }
    } else {
        summary.extracted += 1;
        section.extracted += 1;
        match field.confidence {
            Some(Confidence::High) => summary.high_confidence += 1,
            Some(Confidence::Medium) => summary.medium_confidence += 1,
            Some(Confidence::Low) => {
                summary.low_confidence += 1;
                section.low_confidence += 1;
            }
            // Extracted but unrated (legacy annotation): counted as
            // extracted, bucketed nowhere.
            None => {}
        }
    }
}
