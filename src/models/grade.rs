//! GRADE assessment model — five downgrade domains and three upgrade
//! factors per outcome, each independently overridable with rationale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DatabaseError;

use super::enums::{CertaintyLevel, DomainRating};
use super::field::SourceLocation;

/// The five GRADE downgrade domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeDomainKey {
    RiskOfBias,
    Inconsistency,
    Indirectness,
    Imprecision,
    PublicationBias,
}

impl GradeDomainKey {
    pub const ALL: [GradeDomainKey; 5] = [
        GradeDomainKey::RiskOfBias,
        GradeDomainKey::Inconsistency,
        GradeDomainKey::Indirectness,
        GradeDomainKey::Imprecision,
        GradeDomainKey::PublicationBias,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GradeDomainKey::RiskOfBias => "risk_of_bias",
            GradeDomainKey::Inconsistency => "inconsistency",
            GradeDomainKey::Indirectness => "indirectness",
            GradeDomainKey::Imprecision => "imprecision",
            GradeDomainKey::PublicationBias => "publication_bias",
        }
    }
}

impl std::str::FromStr for GradeDomainKey {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "risk_of_bias" => Ok(GradeDomainKey::RiskOfBias),
            "inconsistency" => Ok(GradeDomainKey::Inconsistency),
            "indirectness" => Ok(GradeDomainKey::Indirectness),
            "imprecision" => Ok(GradeDomainKey::Imprecision),
            "publication_bias" => Ok(GradeDomainKey::PublicationBias),
            _ => Err(DatabaseError::InvalidEnum {
                field: "GradeDomainKey".into(),
                value: s.into(),
            }),
        }
    }
}

/// One assessed downgrade domain.
///
/// `rating` and `rationale` always hold the assessor's original judgment.
/// A human override never rewrites them: it lands in `override_rating` /
/// `override_reason` with the `overridden` flag set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeDomain {
    pub rating: DomainRating,
    pub rationale: String,
    #[serde(default)]
    pub quotes: Vec<String>,
    #[serde(default)]
    pub source_locations: Vec<SourceLocation>,
    #[serde(default)]
    pub overridden: bool,
    #[serde(default)]
    pub override_rating: Option<DomainRating>,
    #[serde(default)]
    pub override_reason: Option<String>,
}

impl GradeDomain {
    pub fn new(rating: DomainRating, rationale: impl Into<String>) -> Self {
        Self {
            rating,
            rationale: rationale.into(),
            quotes: Vec::new(),
            source_locations: Vec::new(),
            overridden: false,
            override_rating: None,
            override_reason: None,
        }
    }

    /// The rating in force: the human override when present, otherwise the
    /// original assessment.
    pub fn effective_rating(&self) -> DomainRating {
        self.override_rating.unwrap_or(self.rating)
    }
}

/// One of the three upgrade factors (large effect, dose-response,
/// residual confounding working against the effect).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeFactor {
    pub applicable: bool,
    pub rationale: String,
}

/// GRADE certainty assessment for one outcome of one extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeAssessment {
    pub id: Uuid,
    pub extraction_id: Uuid,
    pub outcome_name: String,

    pub risk_of_bias: Option<GradeDomain>,
    pub inconsistency: Option<GradeDomain>,
    pub indirectness: Option<GradeDomain>,
    pub imprecision: Option<GradeDomain>,
    pub publication_bias: Option<GradeDomain>,

    pub large_effect: Option<UpgradeFactor>,
    pub dose_response: Option<UpgradeFactor>,
    pub residual_confounding: Option<UpgradeFactor>,

    pub overall_certainty: Option<CertaintyLevel>,
    pub overall_rationale: Option<String>,

    pub is_overridden: bool,
    pub overridden_by: Option<Uuid>,
    pub override_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GradeAssessment {
    /// An empty assessment shell for one outcome; domains and factors are
    /// filled in by the assessment producer.
    pub fn new(extraction_id: Uuid, outcome_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            extraction_id,
            outcome_name: outcome_name.into(),
            risk_of_bias: None,
            inconsistency: None,
            indirectness: None,
            imprecision: None,
            publication_bias: None,
            large_effect: None,
            dose_response: None,
            residual_confounding: None,
            overall_certainty: None,
            overall_rationale: None,
            is_overridden: false,
            overridden_by: None,
            override_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn domain(&self, key: GradeDomainKey) -> Option<&GradeDomain> {
        match key {
            GradeDomainKey::RiskOfBias => self.risk_of_bias.as_ref(),
            GradeDomainKey::Inconsistency => self.inconsistency.as_ref(),
            GradeDomainKey::Indirectness => self.indirectness.as_ref(),
            GradeDomainKey::Imprecision => self.imprecision.as_ref(),
            GradeDomainKey::PublicationBias => self.publication_bias.as_ref(),
        }
    }

    pub fn domain_mut(&mut self, key: GradeDomainKey) -> Option<&mut GradeDomain> {
        match key {
            GradeDomainKey::RiskOfBias => self.risk_of_bias.as_mut(),
            GradeDomainKey::Inconsistency => self.inconsistency.as_mut(),
            GradeDomainKey::Indirectness => self.indirectness.as_mut(),
            GradeDomainKey::Imprecision => self.imprecision.as_mut(),
            GradeDomainKey::PublicationBias => self.publication_bias.as_mut(),
        }
    }

    /// The three upgrade factors in canonical order, with their wire names.
    pub fn upgrade_factors(&self) -> [(&'static str, Option<&UpgradeFactor>); 3] {
        [
            ("large_effect", self.large_effect.as_ref()),
            ("dose_response", self.dose_response.as_ref()),
            ("residual_confounding", self.residual_confounding.as_ref()),
        ]
    }
}
