//! Match-result analytics: aggregate statistics over a lottery run, quartile
//! classification of individual outcomes, and the run bookkeeping that keeps
//! stale aggregates away from readers.

pub mod aggregate;
pub mod classify;
pub mod domain;
pub mod import;
pub mod lottery;
pub mod report;
pub mod router;
pub mod runs;

pub use aggregate::{AggregateStats, ResultAggregator, TOP_CHOICES};
pub use classify::{
    AheadComparison, Classification, Comparison, OutcomeBand, OutcomeClassifier, Polarity,
    Quartiles, SameSchoolComparison, SkipReason, StudentOutcome,
};
pub use domain::{
    AdmissionPolicy, AnalyticsError, DataIntegrityError, Dbn, Placement, RankBin, RankBins,
    RankingStrategy, ResultSnapshot, School, SchoolOutcome, SelectionStrategy, Student,
    StudentId,
};
pub use import::{ImportError, SnapshotImporter};
pub use lottery::LotteryNumber;
pub use report::{ResultInsights, ResultSummary};
pub use router::analytics_router;
pub use runs::{
    AnalyticsSession, PendingRun, RepositoryError, RunRepository, RunService, RunServiceError,
    RunTicket, RunView, StudentOutcomeView,
};
