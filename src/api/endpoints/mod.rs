pub mod articles;
pub mod corrections;
pub mod extractions;
pub mod grade;
pub mod health;
pub mod review;
