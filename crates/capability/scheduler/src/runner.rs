//! 异步周期任务执行器

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use async_trait::async_trait;
use domain::HubResult;

use crate::{Awakener, ErrorHandler, Starter, Stopper, Task};

/// 执行器配置。
#[derive(Debug, Clone)]
pub struct RunnerParams {
    /// 任务执行间隔。
    pub update_interval: Duration,
    /// 首次成功后结束执行。
    pub exit_on_success: bool,
}

impl RunnerParams {
    pub fn with_interval(update_interval: Duration) -> Self {
        Self {
            update_interval,
            exit_on_success: false,
        }
    }
}

struct RunnerInner {
    cancel: CancellationToken,
    awake: Notify,
    task: Arc<dyn Task>,
    handler: Option<Arc<dyn ErrorHandler>>,
    params: RunnerParams,
}

impl RunnerInner {
    /// 执行一轮任务，返回是否成功。
    async fn run_task(&self) -> bool {
        match self.task.run().await {
            Ok(()) => true,
            Err(err) => {
                if let Some(handler) = &self.handler {
                    handler.handle_error(&err);
                }

                false
            }
        }
    }

    async fn run_loop(&self) {
        let mut ticker = tokio::time::interval(self.params.update_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => return,
                _ = self.awake.notified() => {}
                _ = ticker.tick() => {}
            }

            let ok = self.run_task().await;

            if self.params.exit_on_success && ok {
                return;
            }
        }
    }
}

/// 在独立 tokio 任务中周期执行 Task。
///
/// 任务串行执行：一轮未结束前不会开始下一轮，慢任务顺延后续 tick。
/// awake() 在两次 tick 之间幂等（单槽信号）。stop() 为汇合语义：返回时
/// 执行体必已结束；未 start 先 stop 亦安全。
pub struct AsyncTaskRunner {
    inner: Arc<RunnerInner>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncTaskRunner {
    /// 创建执行器。
    ///
    /// cancel 取消后执行体完成当前一轮并退出。
    pub fn new(
        cancel: CancellationToken,
        task: Arc<dyn Task>,
        handler: Option<Arc<dyn ErrorHandler>>,
        params: RunnerParams,
    ) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                cancel,
                awake: Notify::new(),
                task,
                handler,
                params,
            }),
            handle: Mutex::new(None),
        }
    }

    /// 启动执行体，重复调用无效果。
    pub fn start(&self) {
        let mut handle = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if handle.is_some() {
            return;
        }

        let inner = self.inner.clone();
        *handle = Some(tokio::spawn(async move {
            inner.run_loop().await;
        }));
    }

    /// 停止执行体并等待其结束。
    pub async fn stop(&self) -> HubResult<()> {
        self.inner.cancel.cancel();

        let handle = {
            let mut guard = self.handle.lock().unwrap_or_else(|e| e.into_inner());
            guard.take()
        };

        if let Some(handle) = handle {
            let _ = handle.await;
        }

        Ok(())
    }

    /// 触发一次计划外执行。
    pub fn awake(&self) {
        self.inner.awake.notify_one();
    }
}

#[async_trait]
impl Starter for AsyncTaskRunner {
    async fn start(&self) -> HubResult<()> {
        AsyncTaskRunner::start(self);

        Ok(())
    }
}

#[async_trait]
impl Stopper for AsyncTaskRunner {
    async fn stop(&self) -> HubResult<()> {
        AsyncTaskRunner::stop(self).await
    }
}

impl Awakener for AsyncTaskRunner {
    fn awake(&self) {
        AsyncTaskRunner::awake(self);
    }
}
