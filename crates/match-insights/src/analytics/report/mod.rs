mod insights;
mod summary;
pub mod views;

pub use views::{ResultInsights, ResultSummary};

pub(crate) use insights::{generate_insights, student_narrative};
