//! 局域网自动发现注入

use std::sync::Arc;

use async_trait::async_trait;

use domain::{HubError, HubResult};
use hub_mdns::{DiscoveredService, ServiceHandler};

use crate::Store;

const TXT_MODE: &str = "autodiscovery_mode";
const TXT_URI: &str = "autodiscovery_uri";
const TXT_DESC: &str = "autodiscovery_desc";

/// 根据 mDNS TXT 记录自动注册设备。
///
/// 识别的记录（三者缺一不可）：
/// - autodiscovery_mode=1
/// - autodiscovery_uri=<uri>
/// - autodiscovery_desc=<desc>
pub struct StoreMdnsHandler {
    store: Arc<dyn Store>,
}

impl StoreMdnsHandler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ServiceHandler for StoreMdnsHandler {
    /// 处理一个发现的服务。
    ///
    /// 格式非法的 TXT 记录被跳过；必需字段缺失时静默忽略整个服务；
    /// mode 不为 1 视为非法通告（InvalidArg）。重复发现已注册的设备
    /// 是正常情况，DeviceExists 被吞掉。
    async fn handle_service(&self, service: &DiscoveredService) -> HubResult<()> {
        let mut mode = None;
        let mut uri = None;
        let mut desc = None;

        for record in &service.txt_records {
            let (key, value) = match record.split_once('=') {
                Some(pair) => pair,
                None => continue,
            };

            if key.is_empty() || value.is_empty() {
                continue;
            }

            match key {
                TXT_MODE => mode = Some(value),
                TXT_URI => uri = Some(value),
                TXT_DESC => desc = Some(value),
                _ => {}
            }
        }

        let (mode, uri, desc) = match (mode, uri, desc) {
            (Some(mode), Some(uri), Some(desc)) => (mode, uri, desc),
            _ => return Ok(()),
        };

        if mode.parse::<i64>() != Ok(1) {
            return Err(HubError::InvalidArg(format!(
                "unexpected autodiscovery mode: {mode}"
            )));
        }

        match self.store.add(uri, desc).await {
            Ok(()) => Ok(()),
            Err(HubError::DeviceExists) => Ok(()),
            Err(err) => Err(err),
        }
    }
}
