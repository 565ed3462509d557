use match_insights::analytics::{AnalyticsSession, RepositoryError, RunRepository, RunTicket};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct RunSlot {
    generation: u64,
    current: Option<Arc<AnalyticsSession>>,
}

/// Keeps only the latest published run.
#[derive(Default, Clone)]
pub(crate) struct InMemoryRunRepository {
    slot: Arc<Mutex<RunSlot>>,
}

impl InMemoryRunRepository {
    fn lock(&self) -> Result<MutexGuard<'_, RunSlot>, RepositoryError> {
        self.slot
            .lock()
            .map_err(|_| RepositoryError::Unavailable("run repository mutex poisoned".to_string()))
    }
}

impl RunRepository for InMemoryRunRepository {
    fn begin(&self) -> Result<RunTicket, RepositoryError> {
        let mut guard = self.lock()?;
        guard.generation += 1;
        Ok(RunTicket::new(guard.generation))
    }

    fn publish(
        &self,
        ticket: RunTicket,
        session: Arc<AnalyticsSession>,
    ) -> Result<bool, RepositoryError> {
        let mut guard = self.lock()?;
        if ticket.generation() != guard.generation {
            return Ok(false);
        }
        guard.current = Some(session);
        Ok(true)
    }

    fn current(&self) -> Result<Option<Arc<AnalyticsSession>>, RepositoryError> {
        Ok(self.lock()?.current.clone())
    }
}
