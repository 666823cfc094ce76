use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use harvest_logging::harvest_error;
use harvester_core::Record;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::RecordOutcome;

/// Work done for one record. Implementations must never fail the batch:
/// every error is folded into the returned outcome.
#[async_trait::async_trait]
pub trait RecordJob: Send + Sync + 'static {
    async fn process(&self, record: Record) -> RecordOutcome;

    /// Called instead of a result when `process` panicked for `record`.
    /// Must still account for the record (e.g. write its empty row).
    fn abandoned(&self, record: Record, reason: &str) -> RecordOutcome;
}

/// Runs one task per record with at most `max_concurrency` running at once.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    max_concurrency: usize,
}

impl Dispatcher {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Returns once every task has finished. Outcomes arrive in completion
    /// order, not input order.
    pub async fn run<J: RecordJob>(&self, records: Vec<Record>, job: Arc<J>) -> Vec<RecordOutcome> {
        let slots = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut outcomes = Vec::with_capacity(records.len());

        for record in records {
            // Admission: wait for a free slot before the task exists.
            let permit = Arc::clone(&slots)
                .acquire_owned()
                .await
                .expect("admission semaphore is never closed");
            let job = Arc::clone(&job);
            tasks.spawn(async move {
                let fallback = record.clone();
                let outcome = match AssertUnwindSafe(job.process(record)).catch_unwind().await {
                    Ok(outcome) => outcome,
                    Err(payload) => {
                        let reason = panic_message(payload.as_ref());
                        harvest_error!("record {} panicked: {}", fallback.identifier, reason);
                        job.abandoned(fallback, &reason)
                    }
                };
                drop(permit);
                outcome
            });
            // Reap finished tasks as we go so completed outcomes do not pile up.
            while let Some(joined) = tasks.try_join_next() {
                collect(joined, &mut outcomes);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            collect(joined, &mut outcomes);
        }
        outcomes
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn collect(joined: Result<RecordOutcome, tokio::task::JoinError>, outcomes: &mut Vec<RecordOutcome>) {
    match joined {
        Ok(outcome) => outcomes.push(outcome),
        Err(err) => harvest_error!("record task aborted: {}", err),
    }
}
