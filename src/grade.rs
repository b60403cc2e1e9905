//! GRADE assessment workflow: domain overrides with auditable rationale,
//! plus the certainty roll-up offered as an opt-in policy.
//!
//! An override never rewrites the assessor's judgment — the original
//! rating and rationale stay on the domain and the human rating is stored
//! alongside. `overall_certainty` is NOT recomputed on override; whether
//! and when to re-derive it from the domain ratings is the calling
//! orchestration's policy (`compute_overall_certainty`).

use chrono::Utc;
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::enums::{CertaintyLevel, DomainRating};
use crate::models::{GradeAssessment, GradeDomainKey};

#[derive(Debug, Error)]
pub enum GradeError {
    #[error("override reason must not be empty")]
    EmptyReason,
    #[error("domain {0:?} was not assessed for this outcome")]
    DomainNotAssessed(GradeDomainKey),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// A validated domain-override request.
#[derive(Debug, Clone)]
pub struct GradeOverride {
    pub domain: GradeDomainKey,
    pub new_rating: DomainRating,
    pub reason: String,
    pub overridden_by: Uuid,
}

/// Apply an override to one domain of an in-memory assessment.
///
/// The domain keeps its original `rating`/`rationale`; the human decision
/// lands in `override_rating`/`override_reason` with `overridden` set, and
/// the assessment-level audit fields are updated.
pub fn apply_override(
    assessment: &mut GradeAssessment,
    request: &GradeOverride,
) -> Result<(), GradeError> {
    if request.reason.trim().is_empty() {
        return Err(GradeError::EmptyReason);
    }
    let domain = assessment
        .domain_mut(request.domain)
        .ok_or(GradeError::DomainNotAssessed(request.domain))?;

    domain.overridden = true;
    domain.override_rating = Some(request.new_rating);
    domain.override_reason = Some(request.reason.clone());

    assessment.is_overridden = true;
    assessment.overridden_by = Some(request.overridden_by);
    assessment.override_reason = Some(request.reason.clone());
    assessment.updated_at = Utc::now();
    Ok(())
}

/// Load, override, persist.
pub fn override_domain(
    conn: &Connection,
    assessment_id: Uuid,
    request: &GradeOverride,
) -> Result<GradeAssessment, GradeError> {
    let mut assessment = repository::get_grade_assessment(conn, assessment_id)?;
    apply_override(&mut assessment, request)?;
    repository::update_grade_assessment(conn, &assessment)?;

    tracing::info!(
        assessment_id = %assessment.id,
        domain = request.domain.as_str(),
        new_rating = request.new_rating.as_str(),
        "GRADE domain overridden"
    );
    Ok(assessment)
}

/// Standard GRADE roll-up: RCTs start high, observational designs low;
/// each serious concern −1, very serious −2; each applicable upgrade
/// factor +1; clamped to the four-level scale.
///
/// Overridden domains contribute their effective (human) rating.
pub fn compute_overall_certainty(
    study_design: &str,
    assessment: &GradeAssessment,
) -> CertaintyLevel {
    const RCT_KEYWORDS: [&str; 4] = ["rct", "randomized", "randomised", "random"];

    let design = study_design.to_lowercase();
    let mut level: i32 = if RCT_KEYWORDS.iter().any(|kw| design.contains(kw)) {
        4
    } else {
        2
    };

    for key in GradeDomainKey::ALL {
        if let Some(domain) = assessment.domain(key) {
            level += match domain.effective_rating() {
                DomainRating::NoSerious => 0,
                DomainRating::Serious => -1,
                DomainRating::VerySerious => -2,
            };
        }
    }

    for (_, factor) in assessment.upgrade_factors() {
        if factor.is_some_and(|f| f.applicable) {
            level += 1;
        }
    }

    match level.clamp(1, 4) {
        4 => CertaintyLevel::High,
        3 => CertaintyLevel::Moderate,
        2 => CertaintyLevel::Low,
        _ => CertaintyLevel::VeryLow,
    }
}

/// Human-readable justification for an overall rating.
pub fn build_overall_rationale(assessment: &GradeAssessment, overall: CertaintyLevel) -> String {
    let mut parts = Vec::new();

    for key in GradeDomainKey::ALL {
        if let Some(domain) = assessment.domain(key) {
            let rating = domain.effective_rating();
            if rating != DomainRating::NoSerious {
                parts.push(format!(
                    "Downgraded for {} ({}): {}",
                    key.as_str().replace('_', " "),
                    rating.as_str().replace('_', " "),
                    domain.rationale
                ));
            }
        }
    }

    for (name, factor) in assessment.upgrade_factors() {
        if let Some(factor) = factor {
            if factor.applicable {
                parts.push(format!(
                    "Upgraded for {}: {}",
                    name.replace('_', " "),
                    factor.rationale
                ));
            }
        }
    }

    if parts.is_empty() {
        parts.push("No serious concerns across any GRADE domain.".to_string());
    }

    format!(
        "Overall certainty: {}. {}",
        overall.as_str().to_uppercase(),
        parts.join(" ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{
        insert_article, insert_extraction, insert_grade_assessment,
    };
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::ExtractionStatus;
    use crate::models::{Article, ExtractionRecord, GradeDomain, UpgradeFactor};
    use std::collections::BTreeMap;

    fn assessment_with(
        extraction_id: Uuid,
        domains: impl IntoIterator<Item = (GradeDomainKey, DomainRating)>,
    ) -> GradeAssessment {
        let mut assessment = GradeAssessment::new(extraction_id, "all-cause mortality");
        for (key, rating) in domains {
            let domain = GradeDomain::new(rating, "assessor rationale");
            match key {
                GradeDomainKey::RiskOfBias => assessment.risk_of_bias = Some(domain),
                GradeDomainKey::Inconsistency => assessment.inconsistency = Some(domain),
                GradeDomainKey::Indirectness => assessment.indirectness = Some(domain),
                GradeDomainKey::Imprecision => assessment.imprecision = Some(domain),
                GradeDomainKey::PublicationBias => assessment.publication_bias = Some(domain),
            }
        }
        assessment
    }

    fn seeded_assessment(conn: &Connection) -> GradeAssessment {
        let article = Article::new("Trial", None);
        insert_article(conn, &article).unwrap();
        let now = Utc::now();
        let record = ExtractionRecord {
            id: Uuid::new_v4(),
            article_id: article.id,
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
        };
        insert_extraction(conn, &record).unwrap();

        let assessment = assessment_with(
            record.id,
            [(GradeDomainKey::RiskOfBias, DomainRating::Serious)],
        );
        insert_grade_assessment(conn, &assessment).unwrap();
        assessment
    }

    #[test]
    fn override_retains_original_judgment() {
        let conn = open_memory_database().unwrap();
        let assessment = seeded_assessment(&conn);
        let reviewer = Uuid::new_v4();

        let updated = override_domain(
            &conn,
            assessment.id,
            &GradeOverride {
                domain: GradeDomainKey::RiskOfBias,
                new_rating: DomainRating::NoSerious,
                reason: "re-reviewed trial registry".to_string(),
                overridden_by: reviewer,
            },
        )
        .unwrap();

        let domain = updated.risk_of_bias.as_ref().unwrap();
        assert!(domain.overridden);
        // Original assessor output untouched.
        assert_eq!(domain.rating, DomainRating::Serious);
        assert_eq!(domain.rationale, "assessor rationale");
        // Human decision recorded alongside.
        assert_eq!(domain.override_rating, Some(DomainRating::NoSerious));
        assert_eq!(domain.effective_rating(), DomainRating::NoSerious);

        assert!(updated.is_overridden);
        assert_eq!(updated.overridden_by, Some(reviewer));
        assert_eq!(
            updated.override_reason.as_deref(),
            Some("re-reviewed trial registry")
        );
    }

    #[test]
    fn override_does_not_recompute_overall_certainty() {
        let conn = open_memory_database().unwrap();
        let mut assessment = seeded_assessment(&conn);
        assessment.overall_certainty = Some(CertaintyLevel::Moderate);
        repository::update_grade_assessment(&conn, &assessment).unwrap();

        let updated = override_domain(
            &conn,
            assessment.id,
            &GradeOverride {
                domain: GradeDomainKey::RiskOfBias,
                new_rating: DomainRating::NoSerious,
                reason: "allocation was concealed after all".to_string(),
                overridden_by: Uuid::new_v4(),
            },
        )
        .unwrap();
        assert_eq!(updated.overall_certainty, Some(CertaintyLevel::Moderate));
    }

    #[test]
    fn empty_reason_rejected() {
        let mut assessment = assessment_with(
            Uuid::new_v4(),
            [(GradeDomainKey::Imprecision, DomainRating::Serious)],
        );
        let err = apply_override(
            &mut assessment,
            &GradeOverride {
                domain: GradeDomainKey::Imprecision,
                new_rating: DomainRating::NoSerious,
                reason: "   ".to_string(),
                overridden_by: Uuid::new_v4(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, GradeError::EmptyReason));
        assert!(!assessment.is_overridden);
    }

    #[test]
    fn unassessed_domain_rejected() {
        let mut assessment = assessment_with(Uuid::new_v4(), []);
        let err = apply_override(
            &mut assessment,
            &GradeOverride {
                domain: GradeDomainKey::Indirectness,
                new_rating: DomainRating::Serious,
                reason: "population differs from target".to_string(),
                overridden_by: Uuid::new_v4(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, GradeError::DomainNotAssessed(_)));
    }

    #[test]
    fn rct_with_no_concerns_is_high() {
        let assessment = assessment_with(Uuid::new_v4(), []);
        assert_eq!(
            compute_overall_certainty("Randomized controlled trial", &assessment),
            CertaintyLevel::High
        );
    }

    #[test]
    fn downgrades_stack() {
        let assessment = assessment_with(
            Uuid::new_v4(),
            [
                (GradeDomainKey::RiskOfBias, DomainRating::Serious),
                (GradeDomainKey::Imprecision, DomainRating::VerySerious),
            ],
        );
        // 4 - 1 - 2 = 1
        assert_eq!(
            compute_overall_certainty("RCT", &assessment),
            CertaintyLevel::VeryLow
        );
    }

    #[test]
    fn observational_upgrades_apply() {
        let mut assessment = assessment_with(Uuid::new_v4(), []);
        assessment.large_effect = Some(UpgradeFactor {
            applicable: true,
            rationale: "RR > 5 across cohorts".to_string(),
        });
        // 2 + 1 = 3
        assert_eq!(
            compute_overall_certainty("prospective cohort", &assessment),
            CertaintyLevel::Moderate
        );
    }

    #[test]
    fn certainty_clamped_to_scale() {
        let assessment = assessment_with(
            Uuid::new_v4(),
            [
                (GradeDomainKey::RiskOfBias, DomainRating::VerySerious),
                (GradeDomainKey::Inconsistency, DomainRating::VerySerious),
                (GradeDomainKey::Imprecision, DomainRating::VerySerious),
            ],
        );
        assert_eq!(
            compute_overall_certainty("case series", &assessment),
            CertaintyLevel::VeryLow
        );
    }

    #[test]
    fn roll_up_uses_effective_ratings() {
        let mut assessment = assessment_with(
            Uuid::new_v4(),
            [(GradeDomainKey::RiskOfBias, DomainRating::VerySerious)],
        );
        apply_override(
            &mut assessment,
            &GradeOverride {
                domain: GradeDomainKey::RiskOfBias,
                new_rating: DomainRating::NoSerious,
                reason: "blinding adequate on closer read".to_string(),
                overridden_by: Uuid::new_v4(),
            },
        )
        .unwrap();
        assert_eq!(
            compute_overall_certainty("RCT", &assessment),
            CertaintyLevel::High
        );
    }

    #[test]
    fn rationale_mentions_each_concern() {
        let mut assessment = assessment_with(
            Uuid::new_v4(),
            [(GradeDomainKey::PublicationBias, DomainRating::Serious)],
        );
        assessment.dose_response = Some(UpgradeFactor {
            applicable: true,
            rationale: "graded response across doses".to_string(),
        });
        let overall = compute_overall_certainty("cohort", &assessment);
        let rationale = build_overall_rationale(&assessment, overall);
        assert!(rationale.starts_with("Overall certainty: LOW."));
        assert!(rationale.contains("Downgraded for publication bias (serious)"));
        assert!(rationale.contains("Upgraded for dose response"));
    }

    #[test]
    fn clean_assessment_rationale_notes_no_concerns() {
        let assessment = assessment_with(Uuid::new_v4(), []);
        let rationale = build_overall_rationale(&assessment, CertaintyLevel::High);
        assert!(rationale.contains("No serious concerns across any GRADE domain."));
    }
}
