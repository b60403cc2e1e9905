use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Serde uses snake_case so JSON and SQLite share the same wire strings.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Confidence {
    High => "high",
    Medium => "medium",
    Low => "low",
});

str_enum!(MissingReason {
    NotReported => "not_reported",
    ExplicitlyAbsent => "explicitly_absent",
    NotApplicable => "not_applicable",
    Unclear => "unclear",
});

str_enum!(ReviewState {
    Pending => "pending",
    NeedsReview => "needs_review",
    Verified => "verified",
});

str_enum!(DomainRating {
    NoSerious => "no_serious",
    Serious => "serious",
    VerySerious => "very_serious",
});

str_enum!(CertaintyLevel {
    High => "high",
    Moderate => "moderate",
    Low => "low",
    VeryLow => "very_low",
});

str_enum!(WarningSeverity {
    Warning => "warning",
    Error => "error",
});

str_enum!(ArticleStatus {
    Pending => "pending",
    Extracted => "extracted",
});

str_enum!(ExtractionStatus {
    Pending => "pending",
    Completed => "completed",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn round_trip_all_confidences() {
        for c in [Confidence::High, Confidence::Medium, Confidence::Low] {
            assert_eq!(Confidence::from_str(c.as_str()).unwrap(), c);
        }
    }

    #[test]
    fn missing_reason_wire_strings() {
        assert_eq!(MissingReason::NotReported.as_str(), "not_reported");
        assert_eq!(MissingReason::ExplicitlyAbsent.as_str(), "explicitly_absent");
        assert_eq!(MissingReason::NotApplicable.as_str(), "not_applicable");
        assert_eq!(MissingReason::Unclear.as_str(), "unclear");
    }

    #[test]
    fn invalid_enum_value_rejected() {
        let err = ReviewState::from_str("approved").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&DomainRating::VerySerious).unwrap();
        assert_eq!(json, "\"very_serious\"");
        let back: CertaintyLevel = serde_json::from_str("\"very_low\"").unwrap();
        assert_eq!(back, CertaintyLevel::VeryLow);
    }
}
