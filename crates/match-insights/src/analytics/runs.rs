use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::aggregate::ResultAggregator;
use super::classify::{OutcomeClassifier, StudentOutcome};
use super::domain::{AnalyticsError, ResultSnapshot, StudentId};
use super::report::{ResultInsights, ResultSummary};

/// Generation handed out when a run begins. Later tickets supersede earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RunTicket(u64);

impl RunTicket {
    pub const fn new(generation: u64) -> Self {
        Self(generation)
    }

    pub const fn generation(self) -> u64 {
        self.0
    }

    pub fn run_id(self) -> String {
        format!("run-{:06}", self.0)
    }
}

/// A published run: the aggregator plus the views derived from it.
#[derive(Debug)]
pub struct AnalyticsSession {
    pub ticket: RunTicket,
    pub received_at: DateTime<Utc>,
    pub aggregator: ResultAggregator,
    pub summary: ResultSummary,
    pub insights: ResultInsights,
}

impl AnalyticsSession {
    pub fn build(ticket: RunTicket, snapshot: ResultSnapshot) -> Result<Self, AnalyticsError> {
        let aggregator = ResultAggregator::new(Arc::new(snapshot))?;
        let summary = aggregator.summary();
        let insights = summary.insights(aggregator.snapshot().schools.len());
        Ok(Self {
            ticket,
            received_at: Utc::now(),
            aggregator,
            summary,
            insights,
        })
    }

    pub fn run_id(&self) -> String {
        self.ticket.run_id()
    }

    pub fn view(&self) -> RunView {
        RunView {
            run_id: self.run_id(),
            received_at: self.received_at,
            summary: self.summary.clone(),
            insights: self.insights.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunView {
    pub run_id: String,
    pub received_at: DateTime<Utc>,
    pub summary: ResultSummary,
    pub insights: ResultInsights,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentOutcomeView {
    pub run_id: String,
    pub outcome: StudentOutcome,
    pub narrative: Vec<String>,
}

/// Holds the current run. Implementations must only accept a publish whose
/// ticket is still the latest one handed out by `begin`.
pub trait RunRepository: Send + Sync {
    fn begin(&self) -> Result<RunTicket, RepositoryError>;
    fn publish(
        &self,
        ticket: RunTicket,
        session: Arc<AnalyticsSession>,
    ) -> Result<bool, RepositoryError>;
    fn current(&self) -> Result<Option<Arc<AnalyticsSession>>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("run repository unavailable: {0}")]
    Unavailable(String),
}

/// A run whose aggregates are built but not yet visible.
#[derive(Debug)]
pub struct PendingRun {
    session: Arc<AnalyticsSession>,
}

impl PendingRun {
    pub fn ticket(&self) -> RunTicket {
        self.session.ticket
    }
}

pub struct RunService<R> {
    repository: Arc<R>,
}

impl<R> RunService<R>
where
    R: RunRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Begin a run and publish it once its aggregates are ready.
    pub fn submit(
        &self,
        snapshot: ResultSnapshot,
    ) -> Result<Arc<AnalyticsSession>, RunServiceError> {
        let pending = self.prepare(snapshot)?;
        self.commit(pending)
    }

    pub fn prepare(&self, snapshot: ResultSnapshot) -> Result<PendingRun, RunServiceError> {
        let ticket = self.repository.begin()?;
        let session = AnalyticsSession::build(ticket, snapshot)?;
        Ok(PendingRun {
            session: Arc::new(session),
        })
    }

    pub fn commit(&self, pending: PendingRun) -> Result<Arc<AnalyticsSession>, RunServiceError> {
        let ticket = pending.ticket();
        let session = pending.session;
        if !self.repository.publish(ticket, Arc::clone(&session))? {
            warn!(run_id = %ticket.run_id(), "discarding superseded run");
            return Err(RunServiceError::Superseded(ticket.run_id()));
        }

        info!(
            run_id = %ticket.run_id(),
            students = session.summary.total_students,
            "run published"
        );
        Ok(session)
    }

    pub fn current(&self) -> Result<Arc<AnalyticsSession>, RunServiceError> {
        self.repository
            .current()?
            .ok_or(RunServiceError::NoActiveRun)
    }

    /// Drill-down for one student against the current run.
    pub fn student_outcome(
        &self,
        student_id: &StudentId,
    ) -> Result<StudentOutcomeView, RunServiceError> {
        let session = self.current()?;
        let outcome = OutcomeClassifier::student_outcome(&session.aggregator, student_id)?;
        let narrative = outcome.narrative();
        Ok(StudentOutcomeView {
            run_id: session.run_id(),
            outcome,
            narrative,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunServiceError {
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("run {0} was superseded by a newer submission")]
    Superseded(String),
    #[error("no run has been published yet")]
    NoActiveRun,
}
