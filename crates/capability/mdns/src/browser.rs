//! 周期 mDNS 浏览任务

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};

use domain::{HubError, HubResult};
use hub_scheduler::{ErrorHandler, Stopper, Task};

use crate::service::{DiscoveredService, ServiceHandler};

/// 浏览参数。
#[derive(Debug, Clone)]
pub struct BrowserParams {
    /// 要查找的 mDNS 服务名，如 "_http._tcp.local."。
    pub service: String,
    /// 单次浏览的时长。
    pub timeout: Duration,
}

/// 在局域网上周期查找 mDNS 服务。
///
/// 每次 run() 执行一次有界时长的浏览，把解析完成的服务交给下游处理器；
/// 浏览错误只记录日志，下一个周期继续。
pub struct MdnsBrowser {
    daemon: ServiceDaemon,
    handler: Arc<dyn ServiceHandler>,
    params: BrowserParams,
}

impl MdnsBrowser {
    pub fn new(handler: Arc<dyn ServiceHandler>, params: BrowserParams) -> HubResult<Self> {
        let daemon = ServiceDaemon::new()
            .map_err(|err| HubError::failed(format!("failed to create mDNS daemon: {err}")))?;

        Ok(Self {
            daemon,
            handler,
            params,
        })
    }

    async fn browse_once(&self) -> HubResult<()> {
        let receiver = self
            .daemon
            .browse(&self.params.service)
            .map_err(|err| HubError::failed(format!("mDNS browse failed: {err}")))?;

        let deadline = tokio::time::Instant::now() + self.params.timeout;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }

            match tokio::time::timeout(remaining, receiver.recv_async()).await {
                Ok(Ok(ServiceEvent::ServiceResolved(info))) => {
                    let service = discovered_from(&info);
                    self.handler.handle_service(&service).await?;
                }
                Ok(Ok(_)) => {}
                Ok(Err(_)) | Err(_) => break,
            }
        }

        let _ = self.daemon.stop_browse(&self.params.service);

        Ok(())
    }
}

fn discovered_from(info: &ServiceInfo) -> DiscoveredService {
    let service = info.get_type().to_string();

    let instance = info
        .get_fullname()
        .strip_suffix(&format!(".{service}"))
        .unwrap_or(info.get_fullname())
        .to_string();

    let txt_records = info
        .get_properties()
        .iter()
        .map(|property| format!("{}={}", property.key(), property.val_str()))
        .collect();

    DiscoveredService {
        instance,
        service,
        hostname: info.get_hostname().to_string(),
        port: info.get_port(),
        txt_records,
        addresses: info.get_addresses().iter().copied().collect(),
    }
}

#[async_trait]
impl Task for MdnsBrowser {
    async fn run(&self) -> HubResult<()> {
        self.browse_once().await
    }
}

impl ErrorHandler for MdnsBrowser {
    fn handle_error(&self, err: &HubError) {
        tracing::error!(
            service = %self.params.service,
            err = %err,
            "mdns-browser: browsing failed"
        );
    }
}

#[async_trait]
impl Stopper for MdnsBrowser {
    async fn stop(&self) -> HubResult<()> {
        let _ = self.daemon.shutdown();

        Ok(())
    }
}
