//! Numerical cross-validation for extracted data.
//!
//! Deterministic consistency checks on extracted numerical values to catch
//! transcription errors and hallucinated numbers. Warnings are advisory
//! and anchored to field paths; a malformed or legacy-shaped field is
//! simply not checkable and never aborts a run.

use serde_json::Value;

use crate::models::enums::WarningSeverity;
use crate::models::{ExtractionRecord, FieldNode, ValidationWarning};

/// Run all validation checks on a record. Returns the combined warnings.
pub fn validate_record(record: &ExtractionRecord) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    warnings.extend(check_sample_size_consistency(record));
    warnings.extend(check_events_vs_sample_size(record));
    warnings.extend(check_ci_consistency(record));
    warnings.extend(check_effect_size_plausibility(record));
    warnings
}

/// Ratio measures whose null effect is 1.0 rather than 0.0.
const RATIO_MEASURES: [&str; 3] = ["OR", "RR", "HR"];

fn outcome_items(record: &ExtractionRecord) -> &[FieldNode] {
    match record.outcomes.as_ref() {
        Some(FieldNode::List(items)) => items,
        _ => &[],
    }
}

/// Intervention + control sample sizes should be close to the population
/// total; more than 5% relative discrepancy is flagged.
fn check_sample_size_consistency(record: &ExtractionRecord) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let Some(population) = record.population.as_ref() else {
        return warnings;
    };
    let Some(total_n) = field_float(population, "sample_size") else {
        return warnings;
    };

    for (i, outcome) in outcome_items(record).iter().enumerate() {
        let n_int = field_float(outcome, "sample_size_intervention");
        let n_ctrl = field_float(outcome, "sample_size_control");

        if let (Some(n_int), Some(n_ctrl)) = (n_int, n_ctrl) {
            let combined = n_int + n_ctrl;
            if total_n > 0.0 && ((combined - total_n).abs() / total_n) > 0.05 {
                warnings.push(ValidationWarning {
                    field_path: format!("outcomes[{i}].sample_size"),
                    severity: WarningSeverity::Warning,
                    check_name: "sample_size_consistency".to_string(),
                    message: format!(
                        "Intervention ({}) + Control ({}) = {}, but total sample size is {} \
                         (discrepancy: {:.0}%)",
                        n_int as i64,
                        n_ctrl as i64,
                        combined as i64,
                        total_n as i64,
                        (combined - total_n).abs() / total_n * 100.0
                    ),
                });
            }
        }
    }

    warnings
}

/// Event counts can never exceed the arm's sample size or go negative.
fn check_events_vs_sample_size(record: &ExtractionRecord) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for (i, outcome) in outcome_items(record).iter().enumerate() {
        let checks = [
            ("events_intervention", "sample_size_intervention", "intervention"),
            ("events_control", "sample_size_control", "control"),
        ];
        for (events_key, n_key, group_name) in checks {
            let events = field_float(outcome, events_key);
            let n = field_float(outcome, n_key);
            if let (Some(events), Some(n)) = (events, n) {
                if events > n {
                    warnings.push(ValidationWarning {
                        field_path: format!("outcomes[{i}].{events_key}"),
                        severity: WarningSeverity::Error,
                        check_name: "events_exceed_sample_size".to_string(),
                        message: format!(
                            "Events in {group_name} ({}) exceed sample size ({})",
                            events as i64, n as i64
                        ),
                    });
                }
            }
            if let Some(events) = events {
                if events < 0.0 {
                    warnings.push(ValidationWarning {
                        field_path: format!("outcomes[{i}].{events_key}"),
                        severity: WarningSeverity::Error,
                        check_name: "negative_events".to_string(),
                        message: format!("Negative event count ({events}) in {group_name}"),
                    });
                }
            }
        }
    }

    warnings
}

/// CI bounds must be ordered, and the interval should agree with the
/// reported p-value about crossing the null.
fn check_ci_consistency(record: &ExtractionRecord) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for (i, outcome) in outcome_items(record).iter().enumerate() {
        let ci_lower = field_float(outcome, "ci_lower");
        let ci_upper = field_float(outcome, "ci_upper");

        if let (Some(lower), Some(upper)) = (ci_lower, ci_upper) {
            if lower > upper {
                warnings.push(ValidationWarning {
                    field_path: format!("outcomes[{i}].ci_lower"),
                    severity: WarningSeverity::Error,
                    check_name: "ci_bounds_inverted".to_string(),
                    message: format!(
                        "CI lower bound ({lower}) is greater than upper bound ({upper})"
                    ),
                });
            }
        }

        let p_value = field_value(outcome, "p_value").and_then(parse_p_value);
        let effect_measure = field_str(outcome, "effect_measure");

        if let (Some(lower), Some(upper), Some(p)) = (ci_lower, ci_upper, p_value) {
            let null_value = match effect_measure.as_deref() {
                Some(m) if RATIO_MEASURES.contains(&m) => 1.0,
                _ => 0.0,
            };
            let ci_crosses_null = lower <= null_value && null_value <= upper;
            let p_nonsig = p > 0.05;

            if ci_crosses_null && !p_nonsig {
                warnings.push(ValidationWarning {
                    field_path: format!("outcomes[{i}].p_value"),
                    severity: WarningSeverity::Warning,
                    check_name: "ci_pvalue_disagreement".to_string(),
                    message: format!(
                        "CI [{lower}, {upper}] crosses null ({null_value}) but p-value ({p}) \
                         suggests significance"
                    ),
                });
            } else if !ci_crosses_null && p_nonsig {
                warnings.push(ValidationWarning {
                    field_path: format!("outcomes[{i}].p_value"),
                    severity: WarningSeverity::Warning,
                    check_name: "ci_pvalue_disagreement".to_string(),
                    message: format!(
                        "CI [{lower}, {upper}] does not cross null ({null_value}) but p-value \
                         ({p}) suggests non-significance"
                    ),
                });
            }
        }
    }

    warnings
}

/// Flag implausible effect sizes and negative sample sizes.
fn check_effect_size_plausibility(record: &ExtractionRecord) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for (i, outcome) in outcome_items(record).iter().enumerate() {
        let effect = field_float(outcome, "effect_size");
        let measure = field_str(outcome, "effect_measure");

        if let (Some(effect), Some(measure)) = (effect, measure.as_deref()) {
            if RATIO_MEASURES.contains(&measure) {
                if effect <= 0.0 {
                    warnings.push(ValidationWarning {
                        field_path: format!("outcomes[{i}].effect_size"),
                        severity: WarningSeverity::Error,
                        check_name: "negative_ratio_measure".to_string(),
                        message: format!("{measure} of {effect} is invalid (must be > 0)"),
                    });
                } else if effect > 100.0 {
                    warnings.push(ValidationWarning {
                        field_path: format!("outcomes[{i}].effect_size"),
                        severity: WarningSeverity::Warning,
                        check_name: "extreme_effect_size".to_string(),
                        message: format!(
                            "{measure} of {effect} is extremely large — verify accuracy"
                        ),
                    });
                }
            }
        }

        for field in ["sample_size_intervention", "sample_size_control"] {
            if let Some(n) = field_float(outcome, field) {
                if n < 0.0 {
                    warnings.push(ValidationWarning {
                        field_path: format!("outcomes[{i}].{field}"),
                        severity: WarningSeverity::Error,
                        check_name: "negative_sample_size".to_string(),
                        message: format!("Negative sample size: {n}"),
                    });
                }
            }
        }
    }

    warnings
}

// ---------------------------------------------------------------------------
// Value access
// ---------------------------------------------------------------------------

/// Raw datum behind a named entry of a group: a field's value or a legacy
/// scalar. Anything else is not checkable.
fn field_value<'a>(group: &'a FieldNode, key: &str) -> Option<&'a Value> {
    group.child(key)?.raw_value()
}

fn field_float(group: &FieldNode, key: &str) -> Option<f64> {
    field_value(group, key).and_then(to_f64)
}

fn field_str(group: &FieldNode, key: &str) -> Option<String> {
    field_value(group, key)?.as_str().map(str::to_owned)
}

fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse a p-value from loose string forms ("p < 0.05", "=0.03", 0.2).
fn parse_p_value(raw: &Value) -> Option<f64> {
    let s = match raw {
        Value::Number(n) => return n.as_f64(),
        Value::String(s) => s,
        _ => return None,
    };
    let cleaned: String = s
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, 'p' | '=' | '<' | '>'))
        .collect();
    cleaned.trim().parse().ok()
}
