//! Reconciler - PENDING タスクのポーリングと状態遷移
//!
//! # フロー（1 tick）
//! 1. TaskQueue から PENDING の task_id をスナップショット
//! 2. JobService::job_status() を全タスク分並行に発行
//! 3. 応答が届いた順に状態遷移を適用し PresentationSink に通知
//!
//! # 排他
//! - tick 同士は重ならない：`tick()` は実行中ずっと pass ロックを持つ
//! - [`ReconcilerHandle`] は各 tick の完了を待ってから次を予約する

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::materializer::Materializer;
use super::status::TickReport;
use crate::domain::TaskId;
use crate::error::{QueueError, ServiceError};
use crate::ports::{Clock, JobService, JobStatus, PresentationSink};
use crate::queue::SharedQueue;

pub struct Reconciler {
    queue: SharedQueue,
    service: Arc<dyn JobService>,
    sink: Arc<dyn PresentationSink>,
    clock: Arc<dyn Clock>,
    materializer: Materializer,
    query_timeout: Duration,
    pass: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        queue: SharedQueue,
        service: Arc<dyn JobService>,
        sink: Arc<dyn PresentationSink>,
        clock: Arc<dyn Clock>,
        materializer: Materializer,
        query_timeout: Duration,
    ) -> Self {
        Self {
            queue,
            service,
            sink,
            clock,
            materializer,
            query_timeout,
            pass: Mutex::new(()),
        }
    }

    /// PENDING の全タスクに対して 1 回分の照合を行う
    pub async fn tick(&self) -> TickReport {
        let _pass = self.pass.lock().await;
        let mut report = TickReport::default();

        let pending = self.queue.lock().await.pending_ids();
        if pending.is_empty() {
            return report;
        }

        let mut in_flight: FuturesUnordered<_> = pending
            .into_iter()
            .map(|task_id| self.query(task_id))
            .collect();
        report.polled = in_flight.len();

        while let Some((task_id, outcome)) = in_flight.next().await {
            self.apply(&task_id, outcome, &mut report).await;
        }

        report
    }

    async fn query(&self, task_id: TaskId) -> (TaskId, Result<JobStatus, ServiceError>) {
        let status = self.service.job_status(&task_id);
        let outcome = match tokio::time::timeout(self.query_timeout, status).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ServiceError::Unavailable(format!(
                "no answer within {:?}",
                self.query_timeout
            ))),
        };
        (task_id, outcome)
    }

    async fn apply(
        &self,
        task_id: &TaskId,
        outcome: Result<JobStatus, ServiceError>,
        report: &mut TickReport,
    ) {
        let status = match outcome {
            Ok(status) => status,
            Err(e) => {
                // 一時的なエラーは PENDING 扱い、次の tick で再試行
                warn!(%task_id, error = %e, "status query failed, will retry");
                report.transient_errors += 1;
                return;
            }
        };

        match status {
            JobStatus::Pending => {
                report.still_pending += 1;
            }
            JobStatus::Success(raw) => {
                // Decode outside the queue lock.
                let decoded = self.materializer.decode(&raw);

                let mut queue = self.queue.lock().await;
                let now = self.clock.now();
                let applied = match decoded {
                    Ok(containers) => queue.complete(task_id, containers, now),
                    Err(e) => {
                        warn!(%task_id, error = %e, "job succeeded with an unusable result");
                        let diagnostic = serde_json::json!({
                            "error": e.to_string(),
                            "result": raw,
                        });
                        queue.fail(task_id, diagnostic, now)
                    }
                };
                match applied {
                    Ok(task) if task.containers().is_some() => {
                        let count = task.containers().map_or(0, |c| c.len());
                        info!(%task_id, containers = count, "task completed");
                        report.succeeded += 1;
                        self.sink.on_task_completed(task);
                    }
                    Ok(task) => {
                        report.failed += 1;
                        self.sink.on_task_failed(task);
                    }
                    Err(e) => ignore_stale(task_id, e),
                }
            }
            JobStatus::Failure(diagnostic) => {
                let mut queue = self.queue.lock().await;
                let now = self.clock.now();
                match queue.fail(task_id, diagnostic, now) {
                    Ok(task) => {
                        info!(%task_id, "task failed");
                        report.failed += 1;
                        self.sink.on_task_failed(task);
                    }
                    Err(e) => ignore_stale(task_id, e),
                }
            }
        }
    }
}

fn ignore_stale(task_id: &TaskId, err: QueueError) {
    debug!(%task_id, error = %err, "ignoring status for a task that is no longer pending");
}

/// 周期ループのハンドル
/// - `request_shutdown()` または handle を drop するとループが止まる
/// - `shutdown_and_join()` で終了を待てる
pub struct ReconcilerHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ReconcilerHandle {
    /// `period` ごとに tick するループを起動
    pub fn spawn(reconciler: Arc<Reconciler>, period: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(reconcile_loop(reconciler, period, shutdown_rx));
        Self { shutdown_tx, join }
    }

    /// 次の tick を予約しない（実行中の tick は最後まで走る）
    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}

async fn reconcile_loop(
    reconciler: Arc<Reconciler>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // has_changed() が Err = handle が drop 済み
        if *shutdown_rx.borrow() || shutdown_rx.has_changed().is_err() {
            break;
        }

        tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                // Err: the handle was dropped
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        let report = reconciler.tick().await;
        if !report.is_noop() {
            debug!(?report, "reconciliation tick");
        }
    }
    debug!("reconciliation loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainEvent, LatLng, TaskResult, TaskState};
    use crate::impls::{InMemoryJobService, RecordingSink};
    use crate::ports::{SystemClock, UlidGenerator};
    use crate::queue::TaskQueue;
    use crate::app::submission::Submitter;

    struct Fixture {
        queue: SharedQueue,
        service: Arc<InMemoryJobService>,
        sink: Arc<RecordingSink>,
        submitter: Submitter,
        reconciler: Arc<Reconciler>,
    }

    fn fixture() -> Fixture {
        fixture_with_timeout(Duration::from_secs(10))
    }

    fn fixture_with_timeout(query_timeout: Duration) -> Fixture {
        let queue = TaskQueue::new().shared();
        let service = Arc::new(InMemoryJobService::new());
        let sink = Arc::new(RecordingSink::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let submitter = Submitter::new(queue.clone(), service.clone(), sink.clone(), clock.clone());
        let reconciler = Arc::new(Reconciler::new(
            queue.clone(),
            service.clone(),
            sink.clone(),
            clock,
            Materializer::new(Arc::new(UlidGenerator::new(SystemClock))),
            query_timeout,
        ));
        Fixture {
            queue,
            service,
            sink,
            submitter,
            reconciler,
        }
    }

    async fn state_of(queue: &SharedQueue, id: &TaskId) -> TaskState {
        queue.lock().await.get(id).unwrap().state()
    }

    #[tokio::test]
    async fn empty_queue_tick_is_noop() {
        let f = fixture();
        let report = f.reconciler.tick().await;
        assert!(report.is_noop());
        assert_eq!(f.service.total_status_calls(), 0);
    }

    #[tokio::test]
    async fn pending_three_times_then_success() {
        let f = fixture();
        let id = f.submitter.submit(None).await.unwrap();
        assert_eq!(state_of(&f.queue, &id).await, TaskState::Pending);
        assert_eq!(f.sink.events().len(), 1);

        f.service.push_status(&id, JobStatus::Pending);
        f.service.push_status(&id, JobStatus::Pending);
        f.service.push_status(&id, JobStatus::Pending);
        f.service
            .push_status(&id, JobStatus::Success(serde_json::json!([[1.5, 40.2]])));

        for _ in 0..3 {
            let report = f.reconciler.tick().await;
            assert_eq!(report.still_pending, 1);
            assert_eq!(state_of(&f.queue, &id).await, TaskState::Pending);
            assert_eq!(f.sink.events().len(), 1);
        }

        let report = f.reconciler.tick().await;
        assert_eq!(report.succeeded, 1);

        let queue = f.queue.lock().await;
        let task = queue.get(&id).unwrap();
        assert_eq!(task.state(), TaskState::Success);
        let containers = task.containers().unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].location, LatLng { lng: 1.5, lat: 40.2 });

        let events = f.sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], DomainEvent::TaskCreated(_)));
        assert!(matches!(&events[1], DomainEvent::TaskCompleted(t) if t.id() == &id));
    }

    #[tokio::test]
    async fn failure_is_terminal_and_never_polled_again() {
        let f = fixture();
        let id = f.submitter.submit(None).await.unwrap();

        f.service.push_status(&id, JobStatus::Pending);
        f.service
            .push_status(&id, JobStatus::Failure(serde_json::json!({"exc_type": "MemoryError"})));

        f.reconciler.tick().await;
        let report = f.reconciler.tick().await;
        assert_eq!(report.failed, 1);
        assert_eq!(state_of(&f.queue, &id).await, TaskState::Failure);
        assert_eq!(f.service.status_calls(&id), 2);

        // The service would now claim success; it must not be asked.
        f.service
            .push_status(&id, JobStatus::Success(serde_json::json!([[0.0, 0.0]])));
        for _ in 0..3 {
            assert!(f.reconciler.tick().await.is_noop());
        }
        assert_eq!(f.service.status_calls(&id), 2);
        assert_eq!(state_of(&f.queue, &id).await, TaskState::Failure);

        let failed: Vec<_> = f
            .sink
            .events()
            .into_iter()
            .filter(|e| matches!(e, DomainEvent::TaskFailed(_)))
            .collect();
        assert_eq!(failed.len(), 1);
        assert!(matches!(
            failed[0].task().result(),
            Some(TaskResult::Failure(d)) if d["exc_type"] == "MemoryError"
        ));
    }

    #[tokio::test]
    async fn tasks_resolve_independently_and_keep_order() {
        let f = fixture();
        let first = f.submitter.submit(None).await.unwrap();
        let second = f.submitter.submit(None).await.unwrap();

        f.service.push_status(&first, JobStatus::Pending);
        f.service
            .push_status(&second, JobStatus::Success(serde_json::json!([[2.0, 41.0]])));

        let report = f.reconciler.tick().await;
        assert_eq!(report.polled, 2);
        assert_eq!(report.still_pending, 1);
        assert_eq!(report.succeeded, 1);

        assert_eq!(state_of(&f.queue, &first).await, TaskState::Pending);
        assert_eq!(state_of(&f.queue, &second).await, TaskState::Success);

        let queue = f.queue.lock().await;
        let order: Vec<_> = queue.iter().map(|t| t.id().clone()).collect();
        assert_eq!(order, vec![first, second]);
    }

    #[tokio::test]
    async fn transient_error_keeps_task_pending() {
        let f = fixture();
        let id = f.submitter.submit(None).await.unwrap();
        let other = f.submitter.submit(None).await.unwrap();

        f.service.push_error(&id, "connection reset");
        f.service
            .push_status(&other, JobStatus::Success(serde_json::json!([])));

        let report = f.reconciler.tick().await;
        assert_eq!(report.transient_errors, 1);
        assert_eq!(report.succeeded, 1);
        assert_eq!(state_of(&f.queue, &id).await, TaskState::Pending);

        f.service
            .push_status(&id, JobStatus::Success(serde_json::json!([[1.0, 1.0]])));
        f.reconciler.tick().await;
        assert_eq!(state_of(&f.queue, &id).await, TaskState::Success);
    }

    #[tokio::test]
    async fn unusable_success_payload_becomes_failure() {
        let f = fixture();
        let id = f.submitter.submit(None).await.unwrap();
        f.service
            .push_status(&id, JobStatus::Success(serde_json::json!("not a layout")));

        let report = f.reconciler.tick().await;
        assert_eq!(report.failed, 1);

        let queue = f.queue.lock().await;
        let task = queue.get(&id).unwrap();
        assert_eq!(task.state(), TaskState::Failure);
        match task.result() {
            Some(TaskResult::Failure(d)) => assert_eq!(d["result"], "not a layout"),
            other => panic!("unexpected result {other:?}"),
        }
        assert!(matches!(f.sink.events().last(), Some(DomainEvent::TaskFailed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_query_does_not_hold_back_other_tasks() {
        let f = fixture_with_timeout(Duration::from_secs(5));
        let slow = f.submitter.submit(None).await.unwrap();
        let fast = f.submitter.submit(None).await.unwrap();

        f.service.set_delay(&slow, Duration::from_secs(60));
        f.service
            .push_status(&fast, JobStatus::Success(serde_json::json!([[3.0, 3.0]])));

        let reconciler = f.reconciler.clone();
        let tick = tokio::spawn(async move { reconciler.tick().await });

        // fast の応答は slow のタイムアウトを待たずに反映される
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(state_of(&f.queue, &fast).await, TaskState::Success);
        assert!(!tick.is_finished());

        let report = tick.await.unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.transient_errors, 1);
        assert_eq!(state_of(&f.queue, &slow).await, TaskState::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_ticks_are_serialized() {
        let f = fixture();
        let id = f.submitter.submit(None).await.unwrap();
        f.service.set_delay(&id, Duration::from_secs(1));
        f.service
            .push_status(&id, JobStatus::Success(serde_json::json!([[1.0, 2.0]])));

        let (a, b) = tokio::join!(f.reconciler.tick(), f.reconciler.tick());

        // The second pass starts after the first one resolved the task.
        assert_eq!(a.polled + b.polled, 1);
        assert_eq!(f.service.status_calls(&id), 1);
        let completed = f
            .sink
            .events()
            .into_iter()
            .filter(|e| matches!(e, DomainEvent::TaskCompleted(_)))
            .count();
        assert_eq!(completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_loop_polls_until_shutdown() {
        let f = fixture();
        let id = f.submitter.submit(None).await.unwrap();
        f.service.push_status(&id, JobStatus::Pending);
        f.service
            .push_status(&id, JobStatus::Success(serde_json::json!([[1.0, 2.0]])));

        let handle = ReconcilerHandle::spawn(f.reconciler.clone(), Duration::from_millis(2000));

        // First tick fires immediately, the second after one period.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(state_of(&f.queue, &id).await, TaskState::Success);
        assert_eq!(f.service.status_calls(&id), 2);

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(f.service.status_calls(&id), 2);

        handle.shutdown_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_loop() {
        let f = fixture();
        let id = f.submitter.submit(None).await.unwrap();

        let handle = ReconcilerHandle::spawn(f.reconciler.clone(), Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(f.service.status_calls(&id) >= 3);
        drop(handle);

        let calls = f.service.status_calls(&id);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(f.service.status_calls(&id), calls);
        assert_eq!(Arc::strong_count(&f.reconciler), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn handle_dropped_mid_tick_lets_that_tick_finish_and_nothing_more() {
        let f = fixture();
        let id = f.submitter.submit(None).await.unwrap();
        f.service.set_delay(&id, Duration::from_secs(1));

        let handle = ReconcilerHandle::spawn(f.reconciler.clone(), Duration::from_millis(100));

        // 最初の tick は 1s の照会の途中
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(f.service.status_calls(&id), 1);
        drop(handle);

        // ticker は遅延分の tick を溜めているが、次の pass は始まらない
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(f.service.status_calls(&id), 1);
        assert_eq!(Arc::strong_count(&f.reconciler), 1);
        assert_eq!(state_of(&f.queue, &id).await, TaskState::Pending);
    }
}
