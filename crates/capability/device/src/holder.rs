//! 设备唯一标识持有者

use std::sync::Arc;
use std::sync::RwLock;

use async_trait::async_trait;

use domain::{HubResult, Payload};

use crate::DataHandler;

/// 持有设备上报的唯一标识。
///
/// 标识极少变化，读多写少，读写锁保证公共读取不被写入饿死。
pub struct IdHolder {
    handler: Arc<dyn DataHandler>,
    id: RwLock<String>,
}

impl IdHolder {
    /// 包装底层数据处理器。
    pub fn new(handler: Arc<dyn DataHandler>) -> Self {
        Self {
            handler,
            id: RwLock::new(String::new()),
        }
    }

    /// 返回设备唯一标识，尚未观测到时为空串。
    ///
    /// 可被多任务并发调用。
    pub fn get(&self) -> String {
        self.id.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl DataHandler for IdHolder {
    async fn handle_telemetry(&self, device_id: &str, payload: &Payload) -> HubResult<()> {
        self.handler.handle_telemetry(device_id, payload).await
    }

    /// 记录设备标识并透传注册数据。
    async fn handle_registration(&self, device_id: &str, payload: &Payload) -> HubResult<()> {
        let changed = {
            let id = self.id.read().unwrap_or_else(|e| e.into_inner());
            *id != device_id
        };

        if changed {
            let mut id = self.id.write().unwrap_or_else(|e| e.into_inner());
            *id = device_id.to_string();
        }

        self.handler.handle_registration(device_id, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct NoopHandler;

    #[async_trait]
    impl DataHandler for NoopHandler {
        async fn handle_telemetry(&self, _device_id: &str, _payload: &Payload) -> HubResult<()> {
            Ok(())
        }

        async fn handle_registration(&self, _device_id: &str, _payload: &Payload) -> HubResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn empty_until_first_registration() {
        let holder = IdHolder::new(Arc::new(NoopHandler));
        assert_eq!(holder.get(), "");
    }

    #[tokio::test]
    async fn registration_pins_device_id() {
        let holder = IdHolder::new(Arc::new(NoopHandler));
        let payload = Payload::new();

        holder
            .handle_registration("0xABCD", &payload)
            .await
            .expect("registration");
        assert_eq!(holder.get(), "0xABCD");

        holder
            .handle_registration("0xABCD", &payload)
            .await
            .expect("repeat registration");
        assert_eq!(holder.get(), "0xABCD");
    }

    #[tokio::test]
    async fn telemetry_does_not_touch_id() {
        let holder = IdHolder::new(Arc::new(NoopHandler));

        holder
            .handle_telemetry("0xABCD", &Payload::new())
            .await
            .expect("telemetry");
        assert_eq!(holder.get(), "");
    }
}
