use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use harvester_core::Record;
use harvester_engine::{Dispatcher, FailureKind, RecordJob, RecordOutcome};

#[derive(Default)]
struct CountingJob {
    active: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait::async_trait]
impl RecordJob for CountingJob {
    async fn process(&self, record: Record) -> RecordOutcome {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        RecordOutcome {
            index: record.index,
            identifier: record.identifier,
            email: String::new(),
            via: None,
            failure: None,
        }
    }

    fn abandoned(&self, record: Record, _reason: &str) -> RecordOutcome {
        panic!("record {} was not expected to panic", record.identifier);
    }
}

/// Panics on even identifiers and records which records were abandoned.
#[derive(Default)]
struct FlakyJob {
    abandoned: Mutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
impl RecordJob for FlakyJob {
    async fn process(&self, record: Record) -> RecordOutcome {
        tokio::task::yield_now().await;
        if record.index % 2 == 1 {
            panic!("parser blew up on {}", record.identifier);
        }
        RecordOutcome {
            index: record.index,
            identifier: record.identifier,
            email: "ok@site.example".into(),
            via: None,
            failure: None,
        }
    }

    fn abandoned(&self, record: Record, reason: &str) -> RecordOutcome {
        self.abandoned
            .lock()
            .unwrap()
            .push((record.identifier.clone(), reason.to_string()));
        RecordOutcome {
            index: record.index,
            identifier: record.identifier,
            email: String::new(),
            via: None,
            failure: Some(FailureKind::Aborted),
        }
    }
}

fn records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|index| Record {
            index,
            identifier: (index + 1).to_string(),
            ..Record::default()
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_tasks_never_exceed_ceiling() {
    let job = Arc::new(CountingJob::default());
    let outcomes = Dispatcher::new(3).run(records(20), job.clone()).await;

    assert_eq!(outcomes.len(), 20);
    let peak = job.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency {peak}");
    assert!(peak >= 1);
    assert_eq!(job.active.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn ceiling_of_one_serializes_and_completes() {
    let job = Arc::new(CountingJob::default());
    let outcomes = Dispatcher::new(1).run(records(5), job.clone()).await;

    assert_eq!(outcomes.len(), 5);
    assert_eq!(job.peak.load(Ordering::SeqCst), 1);
    let mut indices: Vec<usize> = outcomes.iter().map(|o| o.index).collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
}

#[test]
fn zero_ceiling_is_clamped() {
    assert_eq!(Dispatcher::new(0).max_concurrency(), 1);
}

#[tokio::test]
async fn empty_input_completes_immediately() {
    let outcomes = Dispatcher::new(4)
        .run(Vec::new(), Arc::new(CountingJob::default()))
        .await;
    assert!(outcomes.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn panicking_record_is_still_accounted_for() {
    let job = Arc::new(FlakyJob::default());
    let outcomes = Dispatcher::new(2).run(records(4), job.clone()).await;

    assert_eq!(outcomes.len(), 4);
    let aborted = outcomes
        .iter()
        .filter(|o| o.failure == Some(FailureKind::Aborted))
        .count();
    assert_eq!(aborted, 2);

    let mut abandoned = job.abandoned.lock().unwrap().clone();
    abandoned.sort();
    assert_eq!(
        abandoned,
        vec![
            ("2".to_string(), "parser blew up on 2".to_string()),
            ("4".to_string(), "parser blew up on 4".to_string()),
        ]
    );
}
