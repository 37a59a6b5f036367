//! 周期任务调度
//!
//! 定义执行单元与生命周期接口：
//! - Task：单次操作循环
//! - ErrorHandler：任务错误上报
//! - Awakener：计划外唤醒
//! - AliveNotifier：存活通知
//! - Starter / Stopper：启动与汇合式停止
//!
//! AsyncTaskRunner 在独立的 tokio 任务中按周期驱动 Task，支持外部唤醒、
//! 取消与成功即退出。

pub mod runner;

use std::sync::Arc;

use async_trait::async_trait;

use domain::{HubError, HubResult};

pub use runner::{AsyncTaskRunner, RunnerParams};

/// 执行单元：单次操作循环。
#[async_trait]
pub trait Task: Send + Sync {
    /// 执行一轮操作。
    async fn run(&self) -> HubResult<()>;
}

/// 任务错误上报接口。
pub trait ErrorHandler: Send + Sync {
    /// 处理一次 run() 产生的错误。
    fn handle_error(&self, err: &HubError);
}

/// 计划外唤醒接口。
pub trait Awakener: Send + Sync {
    /// 唤醒一次执行，两次 tick 之间的重复唤醒会合并。
    fn awake(&self);
}

/// 存活通知接口：表明一次操作正常完成。
#[async_trait]
pub trait AliveNotifier: Send + Sync {
    async fn notify_alive(&self);
}

/// 启动接口。
#[async_trait]
pub trait Starter: Send + Sync {
    async fn start(&self) -> HubResult<()>;
}

/// 汇合式停止接口：返回即表示对应执行体已结束。
#[async_trait]
pub trait Stopper: Send + Sync {
    async fn stop(&self) -> HubResult<()>;
}

/// 按注册顺序启动所有成员。
#[derive(Default)]
pub struct FanoutStarter {
    starters: Vec<(String, Arc<dyn Starter>)>,
}

impl FanoutStarter {
    pub fn add(&mut self, id: impl Into<String>, starter: Arc<dyn Starter>) {
        self.starters.push((id.into(), starter));
    }

    /// 启动全部成员，任一失败立即返回。
    pub async fn start(&self) -> HubResult<()> {
        for (id, starter) in &self.starters {
            starter
                .start()
                .await
                .map_err(|err| HubError::failed(format!("failed to start {id}: {err}")))?;
        }

        Ok(())
    }
}

/// 按注册的逆序停止所有成员（LIFO 拆除）。
#[derive(Default)]
pub struct FanoutStopper {
    stoppers: Vec<(String, Arc<dyn Stopper>)>,
}

impl FanoutStopper {
    pub fn add(&mut self, id: impl Into<String>, stopper: Arc<dyn Stopper>) {
        self.stoppers.push((id.into(), stopper));
    }

    /// 逆序停止全部成员，单个失败只记录日志。
    pub async fn stop(&self) -> HubResult<()> {
        for (id, stopper) in self.stoppers.iter().rev() {
            if let Err(err) = stopper.stop().await {
                tracing::error!(id = %id, err = %err, "failed to stop");
            }
        }

        Ok(())
    }
}

/// 闭包适配的 Stopper。
pub struct FuncStopper<F>
where
    F: Fn() -> HubResult<()> + Send + Sync,
{
    func: F,
}

impl<F> FuncStopper<F>
where
    F: Fn() -> HubResult<()> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> Stopper for FuncStopper<F>
where
    F: Fn() -> HubResult<()> + Send + Sync,
{
    async fn stop(&self) -> HubResult<()> {
        (self.func)()
    }
}

/// 包装 Task：每次成功执行后发出一次存活通知。
pub struct AliveNotifyTask {
    task: Arc<dyn Task>,
    notifier: Arc<dyn AliveNotifier>,
}

impl AliveNotifyTask {
    pub fn new(task: Arc<dyn Task>, notifier: Arc<dyn AliveNotifier>) -> Self {
        Self { task, notifier }
    }
}

#[async_trait]
impl Task for AliveNotifyTask {
    async fn run(&self) -> HubResult<()> {
        self.task.run().await?;
        self.notifier.notify_alive().await;

        Ok(())
    }
}
