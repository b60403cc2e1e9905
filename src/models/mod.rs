pub mod article;
pub mod correction;
pub mod enums;
pub mod extraction;
pub mod field;
pub mod grade;
pub mod review;

pub use article::Article;
pub use correction::{Correction, ValueEnvelope};
pub use extraction::{
    CompletenessSummary, ExtractionRecord, MissingReasonCounts, SectionStats, ValidationWarning,
    SECTION_NAMES,
};
pub use field::{ExtractedField, FieldNode, SourceLocation};
pub use grade::{GradeAssessment, GradeDomain, GradeDomainKey, UpgradeFactor};
pub use review::ReviewStatus;
