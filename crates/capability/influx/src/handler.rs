//! 设备数据写入 measurement

use std::sync::Arc;

use async_trait::async_trait;

use domain::{payload_timestamp, HubResult, Payload};
use hub_device::DataHandler;

use crate::client::InfluxClient;

/// 把注册 / 遥测数据写入 InfluxDB。
///
/// measurement 固定为 telemetry / registration，device_id 作为 tag，
/// 负载字段原样透传，时间取负载自带的 timestamp。
pub struct InfluxDataHandler {
    client: Arc<InfluxClient>,
}

impl InfluxDataHandler {
    pub fn new(client: Arc<InfluxClient>) -> Self {
        Self { client }
    }

    async fn handle_data(
        &self,
        measurement: &str,
        device_id: &str,
        payload: &Payload,
    ) -> HubResult<()> {
        let timestamp = payload_timestamp(payload)?;
        let line = crate::line::encode_point(measurement, device_id, payload, timestamp)?;

        self.client.write_point(&line).await
    }
}

#[async_trait]
impl DataHandler for InfluxDataHandler {
    async fn handle_telemetry(&self, device_id: &str, payload: &Payload) -> HubResult<()> {
        self.handle_data("telemetry", device_id, payload).await
    }

    async fn handle_registration(&self, device_id: &str, payload: &Payload) -> HubResult<()> {
        self.handle_data("registration", device_id, payload).await
    }
}
