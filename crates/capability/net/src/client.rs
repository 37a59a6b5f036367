//! 面向设备的 HTTP 客户端构造
//!
//! .local 主机不经过系统 DNS：resolve 客户端把 DNS 步骤接到
//! ResolveStore 上，由 mDNS 浏览回灌的地址完成解析。

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use domain::{HubError, HubResult};

use crate::resolve::Resolver;

/// 通用 HTTP 客户端。
pub fn new_default_client() -> HubResult<reqwest::Client> {
    reqwest::Client::builder()
        .build()
        .map_err(|err| HubError::failed(format!("failed to build HTTP client: {err}")))
}

/// DNS 步骤接入自定义解析器的 HTTP 客户端。
///
/// cancel 取消后挂起的解析等待会随之失败，保证停机时不残留阻塞请求。
pub fn new_resolve_client(
    resolver: Arc<dyn Resolver>,
    cancel: CancellationToken,
) -> HubResult<reqwest::Client> {
    reqwest::Client::builder()
        .dns_resolver(Arc::new(StoreDnsResolver { resolver, cancel }))
        .build()
        .map_err(|err| HubError::failed(format!("failed to build HTTP client: {err}")))
}

struct StoreDnsResolver {
    resolver: Arc<dyn Resolver>,
    cancel: CancellationToken,
}

impl reqwest::dns::Resolve for StoreDnsResolver {
    fn resolve(&self, name: reqwest::dns::Name) -> reqwest::dns::Resolving {
        let resolver = self.resolver.clone();
        let cancel = self.cancel.clone();

        Box::pin(async move {
            let addr = resolver
                .resolve(&cancel, name.as_str())
                .await
                .map_err(|err| -> Box<dyn std::error::Error + Send + Sync> {
                    Box::new(HubError::failed(format!(
                        "failed to resolve host={}: {err}",
                        name.as_str()
                    )))
                })?;

            // 端口由请求本身决定，这里只提供地址。
            let addrs: reqwest::dns::Addrs =
                Box::new(std::iter::once(SocketAddr::new(addr, 0)));

            Ok(addrs)
        })
    }
}
