//! InfluxDB 子系统组装

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use domain::{HubError, HubResult, SystemClock};
use hub_scheduler::{AsyncTaskRunner, ErrorHandler, RunnerParams, Starter, Stopper, Task};
use hub_storage::ClockRestorer;

use crate::client::{InfluxClient, InfluxParams};
use crate::handler::InfluxDataHandler;

const RESTORE_UPDATE_INTERVAL: Duration = Duration::from_secs(5);

/// InfluxDB 子系统：客户端 + 数据落地 + 持久化时间恢复。
///
/// 恢复执行器成功一次即退出；非 NoData 的读取错误按恢复间隔重试。
pub struct InfluxPipeline {
    handler: Arc<InfluxDataHandler>,
    restorer: Arc<ClockRestorer>,
    restore_runner: AsyncTaskRunner,
}

impl InfluxPipeline {
    pub fn new(cancel: CancellationToken, params: InfluxParams) -> HubResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| HubError::failed(format!("failed to build influxdb client: {err}")))?;

        let client = Arc::new(InfluxClient::new(client, params));
        let restorer = Arc::new(ClockRestorer::new(client.clone()));

        let restore_task = Arc::new(RestoreTask {
            restorer: restorer.clone(),
        });

        let restore_runner = AsyncTaskRunner::new(
            cancel,
            restore_task.clone(),
            Some(restore_task),
            RunnerParams {
                update_interval: RESTORE_UPDATE_INTERVAL,
                exit_on_success: true,
            },
        );

        Ok(Self {
            handler: Arc::new(InfluxDataHandler::new(client)),
            restorer,
            restore_runner,
        })
    }

    /// 数据落地端。
    pub fn data_handler(&self) -> Arc<InfluxDataHandler> {
        self.handler.clone()
    }

    /// 最近一次持久化 UNIX 时间的时钟视图。
    pub fn system_clock(&self) -> Arc<dyn SystemClock> {
        self.restorer.clone()
    }
}

#[async_trait]
impl Starter for InfluxPipeline {
    async fn start(&self) -> HubResult<()> {
        self.restore_runner.start();

        Ok(())
    }
}

#[async_trait]
impl Stopper for InfluxPipeline {
    async fn stop(&self) -> HubResult<()> {
        self.restore_runner.stop().await
    }
}

struct RestoreTask {
    restorer: Arc<ClockRestorer>,
}

#[async_trait]
impl Task for RestoreTask {
    async fn run(&self) -> HubResult<()> {
        self.restorer.run().await
    }
}

impl ErrorHandler for RestoreTask {
    fn handle_error(&self, err: &HubError) {
        self.restorer.handle_error(err);
    }
}
