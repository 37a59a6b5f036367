//! mDNS 服务通告

use std::collections::HashMap;

use async_trait::async_trait;
use mdns_sd::{ServiceDaemon, ServiceInfo};

use domain::{HubError, HubResult};
use hub_scheduler::{Starter, Stopper};

use crate::service::HTTP_TCP_SERVICE;

/// 通告参数。
#[derive(Debug, Clone)]
pub struct ResponderParams {
    /// 服务实例名，如 "Device Hub"。
    pub instance: String,
    /// 主机名（不含 .local 后缀），如 "devhub"。
    pub hostname: String,
    /// HTTP 服务端口。
    pub port: u16,
}

/// 把 Hub 自身通告为局域网上的 _http._tcp 服务。
pub struct MdnsResponder {
    daemon: ServiceDaemon,
    params: ResponderParams,
}

impl MdnsResponder {
    pub fn new(params: ResponderParams) -> HubResult<Self> {
        let daemon = ServiceDaemon::new()
            .map_err(|err| HubError::failed(format!("failed to create mDNS daemon: {err}")))?;

        Ok(Self { daemon, params })
    }
}

#[async_trait]
impl Starter for MdnsResponder {
    async fn start(&self) -> HubResult<()> {
        let mut txt_records = HashMap::new();
        txt_records.insert("api".to_string(), "/api/v1".to_string());

        let info = ServiceInfo::new(
            HTTP_TCP_SERVICE,
            &self.params.instance,
            &format!("{}.local.", self.params.hostname),
            "",
            self.params.port,
            txt_records,
        )
        .map_err(|err| HubError::failed(format!("invalid mDNS service info: {err}")))?
        .enable_addr_auto();

        self.daemon
            .register(info)
            .map_err(|err| HubError::failed(format!("mDNS register failed: {err}")))?;

        tracing::info!(
            instance = %self.params.instance,
            hostname = %self.params.hostname,
            port = self.params.port,
            "mDNS service registered"
        );

        Ok(())
    }
}

#[async_trait]
impl Stopper for MdnsResponder {
    async fn stop(&self) -> HubResult<()> {
        let _ = self.daemon.shutdown();

        Ok(())
    }
}
