//! 单设备轮询任务

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use domain::{payload_timestamp, ClockSynchronizer, HubError, HubResult, Payload};
use hub_net::Fetcher;

use crate::verifier::TimeVerifier;
use crate::DataHandler;

/// 设备时间校准接口。
#[async_trait]
pub trait TimeSynchronizer: Send + Sync {
    /// 为设备校准一次 UNIX 时间。
    async fn synchronize(&self) -> HubResult<()>;
}

#[async_trait]
impl TimeSynchronizer for ClockSynchronizer {
    async fn synchronize(&self) -> HubResult<()> {
        ClockSynchronizer::synchronize(self).await
    }
}

/// 主动抓取单个设备的注册与遥测数据。
///
/// 抓取顺序固定：注册 → 遥测；注册失败立即结束本轮，不再抓取遥测。
/// 设备标识不匹配在本轮内不可恢复，但不拆除流水线，下一轮会重新尝试。
pub struct PollDevice {
    registration_fetcher: Arc<dyn Fetcher>,
    telemetry_fetcher: Arc<dyn Fetcher>,
    data_handler: Arc<dyn DataHandler>,
    synchronizer: Arc<dyn TimeSynchronizer>,
    verifier: Box<dyn TimeVerifier>,
    device_id: Mutex<String>,
}

impl PollDevice {
    /// 组装一轮抓取所需的全部协作方。
    pub fn new(
        registration_fetcher: Arc<dyn Fetcher>,
        telemetry_fetcher: Arc<dyn Fetcher>,
        data_handler: Arc<dyn DataHandler>,
        synchronizer: Arc<dyn TimeSynchronizer>,
        verifier: Box<dyn TimeVerifier>,
    ) -> Self {
        Self {
            registration_fetcher,
            telemetry_fetcher,
            data_handler,
            synchronizer,
            verifier,
            device_id: Mutex::new(String::new()),
        }
    }

    fn current_device_id(&self) -> String {
        self.device_id
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn fetch_registration(&self) -> HubResult<Payload> {
        let buf = self.registration_fetcher.fetch().await?;

        let payload: Payload = serde_json::from_slice(&buf)
            .map_err(|err| HubError::failed(format!("invalid registration JSON: {err}")))?;

        self.parse_device_id(&payload)?;
        self.validate_timestamp(&payload).await?;

        Ok(payload)
    }

    async fn fetch_telemetry(&self) -> HubResult<Payload> {
        let buf = self.telemetry_fetcher.fetch().await?;

        let payload: Payload = serde_json::from_slice(&buf)
            .map_err(|err| HubError::failed(format!("invalid telemetry JSON: {err}")))?;

        self.validate_timestamp(&payload).await?;

        Ok(payload)
    }

    async fn validate_timestamp(&self, payload: &Payload) -> HubResult<()> {
        let timestamp = payload_timestamp(payload)?;

        if !self.verifier.verify(timestamp) {
            tracing::info!(
                device_id = %self.current_device_id(),
                timestamp,
                "poll-device: start syncing time for device"
            );

            self.synchronizer.synchronize().await?;

            return Err(HubError::failed("poll-device: invalid timestamp"));
        }

        Ok(())
    }

    fn parse_device_id(&self, payload: &Payload) -> HubResult<()> {
        let value = payload
            .get("device_id")
            .ok_or_else(|| HubError::failed("poll-device: missing device_id field"))?;

        let device_id = value
            .as_str()
            .ok_or_else(|| HubError::failed("poll-device: invalid type for device_id"))?;

        let mut current = self.device_id.lock().unwrap_or_else(|e| e.into_inner());

        if !current.is_empty() && *current != device_id {
            return Err(HubError::failed(format!(
                "poll-device: device ID mismatch: want={current} got={device_id}"
            )));
        }

        *current = device_id.to_string();

        Ok(())
    }
}

#[async_trait]
impl hub_scheduler::Task for PollDevice {
    async fn run(&self) -> HubResult<()> {
        let registration = self
            .fetch_registration()
            .await
            .map_err(|err| HubError::failed(format!("fetching registration failed: {err}")))?;

        let telemetry = self
            .fetch_telemetry()
            .await
            .map_err(|err| HubError::failed(format!("fetching telemetry failed: {err}")))?;

        let device_id = self.current_device_id();

        self.data_handler
            .handle_registration(&device_id, &registration)
            .await
            .map_err(|err| HubError::failed(format!("handling registration failed: {err}")))?;

        self.data_handler
            .handle_telemetry(&device_id, &telemetry)
            .await
            .map_err(|err| HubError::failed(format!("handling telemetry failed: {err}")))?;

        Ok(())
    }
}
