use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use domain::{HubError, HubResult};
use hub_scheduler::{
    AliveNotifier, AliveNotifyTask, AsyncTaskRunner, ErrorHandler, RunnerParams, Task,
};

#[derive(Default)]
struct CountingTask {
    runs: AtomicUsize,
    fail: bool,
}

impl CountingTask {
    fn failing() -> Self {
        Self {
            runs: AtomicUsize::new(0),
            fail: true,
        }
    }

    fn count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Task for CountingTask {
    async fn run(&self) -> HubResult<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(HubError::failed("task failed"));
        }

        Ok(())
    }
}

#[derive(Default)]
struct CollectingHandler {
    errors: Mutex<Vec<String>>,
}

impl ErrorHandler for CollectingHandler {
    fn handle_error(&self, err: &HubError) {
        self.errors
            .lock()
            .expect("handler lock")
            .push(err.to_string());
    }
}

#[derive(Default)]
struct CountingNotifier {
    notified: AtomicUsize,
}

#[async_trait]
impl AliveNotifier for CountingNotifier {
    async fn notify_alive(&self) {
        self.notified.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test(start_paused = true)]
async fn runner_runs_task_on_interval() {
    let task = Arc::new(CountingTask::default());
    let runner = AsyncTaskRunner::new(
        CancellationToken::new(),
        task.clone(),
        None,
        RunnerParams::with_interval(Duration::from_millis(100)),
    );

    runner.start();
    tokio::time::sleep(Duration::from_millis(350)).await;

    assert!(task.count() >= 3, "count={}", task.count());

    runner.stop().await.expect("stop");
}

#[tokio::test(start_paused = true)]
async fn runner_awake_triggers_out_of_schedule_run() {
    let task = Arc::new(CountingTask::default());
    let runner = AsyncTaskRunner::new(
        CancellationToken::new(),
        task.clone(),
        None,
        RunnerParams::with_interval(Duration::from_secs(3600)),
    );

    runner.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(task.count(), 1);

    runner.awake();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(task.count(), 2);

    runner.stop().await.expect("stop");
}

#[tokio::test(start_paused = true)]
async fn runner_exits_on_success() {
    let task = Arc::new(CountingTask::default());
    let runner = AsyncTaskRunner::new(
        CancellationToken::new(),
        task.clone(),
        None,
        RunnerParams {
            update_interval: Duration::from_millis(100),
            exit_on_success: true,
        },
    );

    runner.start();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(task.count(), 1);

    runner.stop().await.expect("stop");
}

#[tokio::test(start_paused = true)]
async fn runner_retries_until_success_with_exit_on_success() {
    let task = Arc::new(CountingTask::failing());
    let handler = Arc::new(CollectingHandler::default());
    let runner = AsyncTaskRunner::new(
        CancellationToken::new(),
        task.clone(),
        Some(handler.clone()),
        RunnerParams {
            update_interval: Duration::from_millis(100),
            exit_on_success: true,
        },
    );

    runner.start();
    tokio::time::sleep(Duration::from_millis(350)).await;

    assert!(task.count() >= 3);
    assert_eq!(handler.errors.lock().expect("errors").len(), task.count());

    runner.stop().await.expect("stop");
}

#[tokio::test]
async fn runner_stop_before_start_is_safe() {
    let runner = AsyncTaskRunner::new(
        CancellationToken::new(),
        Arc::new(CountingTask::default()),
        None,
        RunnerParams::with_interval(Duration::from_millis(100)),
    );

    runner.stop().await.expect("stop");
    runner.stop().await.expect("stop twice");
}

#[tokio::test(start_paused = true)]
async fn runner_stop_is_a_join_point() {
    let task = Arc::new(CountingTask::default());
    let runner = AsyncTaskRunner::new(
        CancellationToken::new(),
        task.clone(),
        None,
        RunnerParams::with_interval(Duration::from_millis(50)),
    );

    runner.start();
    tokio::time::sleep(Duration::from_millis(120)).await;
    runner.stop().await.expect("stop");

    let stopped_at = task.count();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(task.count(), stopped_at);
}

#[tokio::test(start_paused = true)]
async fn runner_parent_cancellation_stops_the_loop() {
    let cancel = CancellationToken::new();
    let task = Arc::new(CountingTask::default());
    let runner = AsyncTaskRunner::new(
        cancel.child_token(),
        task.clone(),
        None,
        RunnerParams::with_interval(Duration::from_millis(50)),
    );

    runner.start();
    tokio::time::sleep(Duration::from_millis(120)).await;

    cancel.cancel();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let stopped_at = task.count();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(task.count(), stopped_at);

    runner.stop().await.expect("stop");
}

#[tokio::test(start_paused = true)]
async fn alive_notify_task_reports_success_only() {
    let notifier = Arc::new(CountingNotifier::default());

    let ok_task = AliveNotifyTask::new(Arc::new(CountingTask::default()), notifier.clone());
    ok_task.run().await.expect("run");
    assert_eq!(notifier.notified.load(Ordering::SeqCst), 1);

    let failing = AliveNotifyTask::new(Arc::new(CountingTask::failing()), notifier.clone());
    failing.run().await.expect_err("failed run");
    assert_eq!(notifier.notified.load(Ordering::SeqCst), 1);
}
