//! 发现结果模型与分发

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;

use domain::{HubError, HubResult};
use hub_net::ResolveHandler;

/// HTTP over TCP 的 mDNS 服务名。
pub const HTTP_TCP_SERVICE: &str = "_http._tcp.local.";

/// 局域网上发现的单个 mDNS 服务。
#[derive(Debug, Clone)]
pub struct DiscoveredService {
    /// 服务实例名，如 "Bonsai GrowLab Firmware"。
    pub instance: String,
    /// 服务名，如 "_http._tcp.local."。
    pub service: String,
    /// 主机名，如 "bonsai-growlab.local."。
    pub hostname: String,
    /// 服务端口。
    pub port: u16,
    /// TXT 记录，形如 "api_version=v1"。
    pub txt_records: Vec<String>,
    /// 已解析的主机地址。
    pub addresses: Vec<IpAddr>,
}

/// mDNS 服务处理接口。
#[async_trait]
pub trait ServiceHandler: Send + Sync {
    /// 处理一个发现的服务。
    async fn handle_service(&self, service: &DiscoveredService) -> HubResult<()>;
}

/// 把发现的服务分发给全部下游处理器。
///
/// 处理器可以在浏览开始后继续注册（发现流水线的组装存在环：浏览器的
/// 执行器同时又是注册表的唤醒器）。
#[derive(Default)]
pub struct FanoutServiceHandler {
    handlers: std::sync::RwLock<Vec<Arc<dyn ServiceHandler>>>,
}

impl FanoutServiceHandler {
    pub fn add(&self, handler: Arc<dyn ServiceHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(handler);
    }
}

#[async_trait]
impl ServiceHandler for FanoutServiceHandler {
    /// 单个处理器失败只记录日志，不影响其余处理器。
    async fn handle_service(&self, service: &DiscoveredService) -> HubResult<()> {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        for handler in &handlers {
            if let Err(err) = handler.handle_service(service).await {
                tracing::error!(
                    instance = %service.instance,
                    hostname = %service.hostname,
                    err = %err,
                    "fanout-service-handler: failed to handle mDNS service"
                );
            }
        }

        Ok(())
    }
}

/// 把发现结果转成 host → addr 回灌给解析缓存。
pub struct ResolveServiceHandler {
    handler: Arc<dyn ResolveHandler>,
}

impl ResolveServiceHandler {
    pub fn new(handler: Arc<dyn ResolveHandler>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl ServiceHandler for ResolveServiceHandler {
    /// 无地址的服务报错给调用方；多地址取第一个并记录日志。
    async fn handle_service(&self, service: &DiscoveredService) -> HubResult<()> {
        let addr = match service.addresses.first() {
            Some(addr) => *addr,
            None => {
                return Err(HubError::failed(format!(
                    "ignore service: instance={} service={} hostname={}: IP address not found",
                    service.instance, service.service, service.hostname
                )))
            }
        };

        if service.addresses.len() > 1 {
            tracing::warn!(
                hostname = %service.hostname,
                count = service.addresses.len(),
                "multiple addresses resolved, using the first one"
            );
        }

        let hostname = service.hostname.trim_end_matches('.');
        self.handler.handle_resolve(hostname, addr);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingResolveHandler {
        resolved: Mutex<Vec<(String, IpAddr)>>,
    }

    impl ResolveHandler for RecordingResolveHandler {
        fn handle_resolve(&self, host: &str, addr: IpAddr) {
            self.resolved
                .lock()
                .expect("resolved lock")
                .push((host.to_string(), addr));
        }
    }

    fn service(addresses: Vec<IpAddr>) -> DiscoveredService {
        DiscoveredService {
            instance: "Bonsai GrowLab Firmware".to_string(),
            service: HTTP_TCP_SERVICE.to_string(),
            hostname: "bonsai-growlab.local.".to_string(),
            port: 80,
            txt_records: Vec::new(),
            addresses,
        }
    }

    #[tokio::test]
    async fn resolve_handler_strips_trailing_dot() {
        let handler = Arc::new(RecordingResolveHandler::default());
        let service_handler = ResolveServiceHandler::new(handler.clone());

        service_handler
            .handle_service(&service(vec!["192.168.1.10".parse().expect("addr")]))
            .await
            .expect("handle");

        let resolved = handler.resolved.lock().expect("resolved");
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, "bonsai-growlab.local");
    }

    #[tokio::test]
    async fn resolve_handler_rejects_service_without_address() {
        let handler = Arc::new(RecordingResolveHandler::default());
        let service_handler = ResolveServiceHandler::new(handler.clone());

        service_handler
            .handle_service(&service(Vec::new()))
            .await
            .expect_err("no address");

        assert!(handler.resolved.lock().expect("resolved").is_empty());
    }

    #[tokio::test]
    async fn resolve_handler_uses_first_of_multiple_addresses() {
        let handler = Arc::new(RecordingResolveHandler::default());
        let service_handler = ResolveServiceHandler::new(handler.clone());

        service_handler
            .handle_service(&service(vec![
                "192.168.1.10".parse().expect("addr"),
                "192.168.1.11".parse().expect("addr"),
            ]))
            .await
            .expect("handle");

        let resolved = handler.resolved.lock().expect("resolved");
        assert_eq!(resolved[0].1, "192.168.1.10".parse::<IpAddr>().expect("addr"));
    }
}
