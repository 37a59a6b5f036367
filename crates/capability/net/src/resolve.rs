//! 主机解析缓存

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use domain::{HubError, HubResult};

/// 主机名解析接口。
#[async_trait]
pub trait Resolver: Send + Sync {
    /// 解析主机名，cancel 取消后返回 Timeout。
    async fn resolve(&self, cancel: &CancellationToken, host: &str) -> HubResult<IpAddr>;
}

/// 解析结果回灌接口。
pub trait ResolveHandler: Send + Sync {
    /// 处理一次 host → addr 的解析结果。
    fn handle_resolve(&self, host: &str, addr: IpAddr);
}

#[derive(Default)]
struct ResolveState {
    known_hosts: HashSet<String>,
    resolved_addrs: HashMap<String, IpAddr>,
}

/// 已知主机名到观测地址的缓存。
///
/// 地址只为已知主机缓存；remove 同时删除成员资格与缓存地址。任何状态
/// 变更都触发一次单槽信号，突发变更会合并。
#[derive(Default)]
pub struct ResolveStore {
    update: Notify,
    state: Mutex<ResolveState>,
}

impl ResolveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册主机为已知主机。
    pub fn add(&self, host: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.known_hosts.insert(host.to_string());
    }

    /// 删除主机及其缓存地址。
    ///
    /// 等待该主机的 resolve 调用在下一次信号后看到 NoData。
    pub fn remove(&self, host: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.known_hosts.remove(host);
        state.resolved_addrs.remove(host);
    }

    /// 查询缓存地址。
    ///
    /// 未知主机返回 NoData；已知但尚未解析的主机返回 Timeout 以区分
    /// 两种未命中（调用方据此决定继续等待还是放弃）。
    fn get_addr(&self, host: &str) -> HubResult<IpAddr> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(addr) = state.resolved_addrs.get(host) {
            return Ok(*addr);
        }

        if state.known_hosts.contains(host) {
            Err(HubError::Timeout)
        } else {
            Err(HubError::NoData)
        }
    }
}

impl ResolveHandler for ResolveStore {
    /// 缓存已知主机的解析结果，未知主机被静默丢弃。
    ///
    /// 相同地址的重复回灌幂等，地址变更对下一次 resolve 可见。
    fn handle_resolve(&self, host: &str, addr: IpAddr) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

            if !state.known_hosts.contains(host) {
                return;
            }

            match state.resolved_addrs.get(host) {
                None => {
                    tracing::info!(host = %host, addr = %addr, "resolve-store: addr resolved");
                    state.resolved_addrs.insert(host.to_string(), addr);
                }
                Some(current) if *current != addr => {
                    tracing::info!(
                        host = %host,
                        cur = %current,
                        new = %addr,
                        "resolve-store: addr changed"
                    );
                    state.resolved_addrs.insert(host.to_string(), addr);
                }
                Some(_) => {}
            }
        }

        self.update.notify_one();
    }
}

#[async_trait]
impl Resolver for ResolveStore {
    /// 解析主机地址。
    ///
    /// 已有缓存立即返回；否则阻塞等待状态变更信号。信号到来后：已知但
    /// 仍未解析的主机继续等待，未知主机返回 NoData。取消返回 Timeout。
    async fn resolve(&self, cancel: &CancellationToken, host: &str) -> HubResult<IpAddr> {
        let notified = self.update.notified();
        if let Ok(addr) = self.get_addr(host) {
            return Ok(addr);
        }

        tokio::pin!(notified);

        loop {
            tokio::select! {
                _ = &mut notified => {}
                _ = cancel.cancelled() => return Err(HubError::Timeout),
            }

            match self.get_addr(host) {
                Ok(addr) => return Ok(addr),
                Err(HubError::NoData) => return Err(HubError::NoData),
                Err(_) => {}
            }

            notified.set(self.update.notified());
        }
    }
}
