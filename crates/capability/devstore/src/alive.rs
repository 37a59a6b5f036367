//! 不活跃设备回收

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use domain::{HubResult, MonotonicClock};
use hub_scheduler::{AliveNotifier, Task};

use crate::{AliveMonitor, DeviceView, Store};

/// 基于存活通知回收不活跃设备的监控器。
///
/// 对外同时充当注册表（代理内层 Store）：经由它注册的设备自动纳入
/// 监控。没有任何存活记录的设备按监控器构建时刻起算，整整一个不活跃
/// 窗口内无通知即被回收。
pub struct StoreAliveMonitor {
    clock: Arc<dyn MonotonicClock>,
    store: Arc<dyn Store>,
    inactive_interval: Duration,
    created_at: Instant,
    last_alive: Arc<Mutex<HashMap<String, Instant>>>,
}

impl StoreAliveMonitor {
    pub fn new(
        clock: Arc<dyn MonotonicClock>,
        store: Arc<dyn Store>,
        inactive_interval: Duration,
    ) -> Self {
        let created_at = clock.now();

        Self {
            clock,
            store,
            inactive_interval,
            created_at,
            last_alive: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 扫描一次，回收超过不活跃窗口的设备。
    ///
    /// 到期设备在锁外调用内层 remove：remove 会汇合对应流水线，而该
    /// 流水线可能正阻塞在存活通知上，持锁等待会互相卡死。
    pub async fn run(&self) -> HubResult<()> {
        let devices = self.store.get_desc().await;
        let registered: HashSet<&str> = devices.iter().map(|view| view.uri.as_str()).collect();

        let now = self.clock.now();

        let due: Vec<String> = {
            let mut last_alive = self.last_alive.lock().await;

            // 已注销设备的残留记录在此清理。
            last_alive.retain(|uri, _| registered.contains(uri.as_str()));

            devices
                .iter()
                .filter(|view| {
                    let last = *last_alive
                        .entry(view.uri.clone())
                        .or_insert(self.created_at);

                    now.duration_since(last) >= self.inactive_interval
                })
                .map(|view| view.uri.clone())
                .collect()
        };

        for uri in due {
            match self.store.remove(&uri).await {
                Ok(()) => tracing::info!(uri = %uri, "inactive device removed"),
                Err(err) => {
                    tracing::error!(uri = %uri, err = %err, "failed to remove inactive device")
                }
            }

            self.last_alive.lock().await.remove(&uri);
        }

        Ok(())
    }
}

#[async_trait]
impl Task for StoreAliveMonitor {
    async fn run(&self) -> HubResult<()> {
        StoreAliveMonitor::run(self).await
    }
}

impl AliveMonitor for StoreAliveMonitor {
    fn monitor(&self, uri: &str) -> Arc<dyn AliveNotifier> {
        Arc::new(UriAliveNotifier {
            clock: self.clock.clone(),
            last_alive: self.last_alive.clone(),
            uri: uri.to_string(),
        })
    }
}

#[async_trait]
impl Store for StoreAliveMonitor {
    async fn add(&self, uri: &str, desc: &str) -> HubResult<()> {
        self.store.add(uri, desc).await
    }

    async fn remove(&self, uri: &str) -> HubResult<()> {
        self.store.remove(uri).await
    }

    async fn get_desc(&self) -> Vec<DeviceView> {
        self.store.get_desc().await
    }
}

struct UriAliveNotifier {
    clock: Arc<dyn MonotonicClock>,
    last_alive: Arc<Mutex<HashMap<String, Instant>>>,
    uri: String,
}

#[async_trait]
impl AliveNotifier for UriAliveNotifier {
    async fn notify_alive(&self) {
        let now = self.clock.now();

        let mut last_alive = self.last_alive.lock().await;
        last_alive.insert(self.uri.clone(), now);
    }
}
