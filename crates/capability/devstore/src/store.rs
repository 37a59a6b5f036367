//! 持久化设备注册表

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use domain::{ClockSynchronizer, HubError, HubResult, SystemClock};
use hub_device::{BasicTimeVerifier, DataHandler, DriftTimeVerifier, IdHolder, PollDevice, TimeVerifier};
use hub_net::{new_default_client, new_resolve_client, HttpSystemClock, ResolveStore, UrlFetcher};
use hub_scheduler::{
    AliveNotifyTask, AsyncTaskRunner, FanoutStopper, FuncStopper, RunnerParams, Starter, Stopper,
    Task,
};
use hub_storage::BlobStore;

use crate::error_handler::LogErrorHandler;
use crate::{AliveMonitor, DeviceView, Store};

/// 注册表配置。
#[derive(Debug, Clone)]
pub struct StoreParams {
    /// 从设备抓取数据的间隔。
    pub fetch_interval: Duration,
    /// 等待设备响应的上限。
    pub fetch_timeout: Duration,
    /// 本地与设备时间允许的最大偏差（秒），0 表示不检查偏差。
    pub max_clock_drift: i64,
}

/// 持久化的设备记录。
///
/// blob 自含 URI，是恢复时的事实来源。
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct DeviceRecord {
    uri: String,
    desc: String,
    ts: i64,
}

/// 设备注册表。
///
/// 为每个设备维护一条轮询流水线，并把注册信息持久化到 blob 存储。
/// 重建时从持久化存储恢复全部流水线（不启动），损坏的记录被清除。
pub struct DeviceStore {
    cancel: CancellationToken,
    local_clock: Arc<dyn SystemClock>,
    remote_last_clock: Arc<dyn SystemClock>,
    data_handler: Arc<dyn DataHandler>,
    db: Arc<dyn BlobStore>,
    resolve_store: Arc<ResolveStore>,
    params: StoreParams,
    alive_monitor: std::sync::Mutex<Option<Arc<dyn AliveMonitor>>>,
    nodes: Mutex<HashMap<String, DeviceNode>>,
}

impl DeviceStore {
    /// 构建注册表并从持久化存储恢复设备。
    ///
    /// 恢复出的流水线处于未启动状态，由 start() 统一启动。
    pub async fn new(
        cancel: CancellationToken,
        local_clock: Arc<dyn SystemClock>,
        remote_last_clock: Arc<dyn SystemClock>,
        data_handler: Arc<dyn DataHandler>,
        db: Arc<dyn BlobStore>,
        resolve_store: Arc<ResolveStore>,
        params: StoreParams,
    ) -> HubResult<Self> {
        let store = Self {
            cancel,
            local_clock,
            remote_last_clock,
            data_handler,
            db,
            resolve_store,
            params,
            alive_monitor: std::sync::Mutex::new(None),
            nodes: Mutex::new(HashMap::new()),
        };

        store.restore().await?;

        Ok(store)
    }

    /// 设置活跃度监控，必须在 start() 之前调用。
    pub fn set_alive_monitor(&self, monitor: Arc<dyn AliveMonitor>) {
        let mut slot = self
            .alive_monitor
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *slot = Some(monitor);
    }

    /// 启动全部已恢复的流水线。
    pub async fn start(&self) -> HubResult<()> {
        let nodes = self.nodes.lock().await;

        for node in nodes.values() {
            node.start()?;
        }

        Ok(())
    }

    /// 停止全部流水线并清空注册表。
    ///
    /// 未 start 先 stop 亦安全；stop 之后注册表即作废。
    pub async fn stop(&self) -> HubResult<()> {
        let mut nodes = self.nodes.lock().await;

        for node in nodes.values() {
            if let Err(err) = node.stop().await {
                tracing::error!(uri = %node.uri, err = %err, "failed to stop device");
            }
        }

        nodes.clear();

        Ok(())
    }

    async fn restore(&self) -> HubResult<()> {
        let mut records: Vec<(String, Vec<u8>)> = Vec::new();

        self.db
            .for_each(&mut |key, blob| {
                records.push((key.to_string(), blob.to_vec()));
                Ok(())
            })
            .await?;

        let mut unrestored = Vec::new();

        {
            let mut nodes = self.nodes.lock().await;

            for (key, blob) in records {
                if let Err(err) = self.restore_node(&mut nodes, &key, &blob) {
                    tracing::error!(uri = %key, err = %err, "failed to restore device");
                    unrestored.push(key);
                }
            }
        }

        for uri in unrestored {
            match self.db.remove(&uri).await {
                Ok(()) => tracing::error!(uri = %uri, "unrestored device removed"),
                Err(err) => {
                    tracing::error!(uri = %uri, err = %err, "failed to remove unrestored device")
                }
            }
        }

        Ok(())
    }

    fn restore_node(
        &self,
        nodes: &mut HashMap<String, DeviceNode>,
        key: &str,
        blob: &[u8],
    ) -> HubResult<()> {
        let record: DeviceRecord = serde_json::from_slice(blob)
            .map_err(|err| HubError::failed(format!("invalid device record: {err}")))?;

        if record.uri != key {
            return Err(HubError::failed(format!(
                "device record collision: key={key} uri={}",
                record.uri
            )));
        }

        let created_at = Utc
            .timestamp_opt(record.ts, 0)
            .single()
            .ok_or_else(|| HubError::failed("invalid creation timestamp"))?;

        let node = self.make_node(&record.uri, &record.desc, created_at)?;
        nodes.insert(record.uri.clone(), node);

        tracing::info!(uri = %record.uri, desc = %record.desc, "device restored");

        Ok(())
    }

    fn make_node(&self, uri: &str, desc: &str, created_at: DateTime<Utc>) -> HubResult<DeviceNode> {
        let url = reqwest::Url::parse(uri)
            .map_err(|err| HubError::InvalidArg(format!("invalid device URI: {err}")))?;

        match url.scheme() {
            "http" | "https" => {}
            _ => return Err(HubError::NotSupported),
        }

        let host = url
            .host_str()
            .ok_or_else(|| HubError::InvalidArg("device URI without host".to_string()))?
            .to_string();

        let cancel = self.cancel.child_token();
        let mut stopper = FanoutStopper::default();
        let holder = Arc::new(IdHolder::new(self.data_handler.clone()));

        let client = self.make_http_client(&mut stopper, &cancel, &host, desc)?;

        let remote_curr_clock = Arc::new(HttpSystemClock::new(
            client.clone(),
            format!("{uri}/system/time"),
            self.params.fetch_timeout,
        ));

        let synchronizer = Arc::new(ClockSynchronizer::new(
            self.local_clock.clone(),
            self.remote_last_clock.clone(),
            remote_curr_clock,
            self.params.max_clock_drift,
        ));

        let verifier: Box<dyn TimeVerifier> = if self.params.max_clock_drift == 0 {
            Box::new(BasicTimeVerifier)
        } else {
            Box::new(DriftTimeVerifier::new(
                || Utc::now().timestamp(),
                self.params.max_clock_drift,
            ))
        };

        let poll_device: Arc<dyn Task> = Arc::new(PollDevice::new(
            Arc::new(UrlFetcher::new(
                client.clone(),
                format!("{uri}/registration"),
                self.params.fetch_timeout,
            )),
            Arc::new(UrlFetcher::new(
                client,
                format!("{uri}/telemetry"),
                self.params.fetch_timeout,
            )),
            holder.clone(),
            synchronizer,
            verifier,
        ));

        let monitor = self
            .alive_monitor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        let task: Arc<dyn Task> = match monitor {
            Some(monitor) => Arc::new(AliveNotifyTask::new(poll_device, monitor.monitor(uri))),
            None => poll_device,
        };

        let runner = Arc::new(AsyncTaskRunner::new(
            cancel.clone(),
            task,
            Some(Arc::new(LogErrorHandler::new(uri, desc))),
            RunnerParams::with_interval(self.params.fetch_interval),
        ));

        stopper.add(desc, runner.clone());

        Ok(DeviceNode {
            uri: uri.to_string(),
            desc: desc.to_string(),
            created_at: format_rfc1123(created_at),
            cancel,
            stopper,
            holder,
            runner,
        })
    }

    fn make_http_client(
        &self,
        stopper: &mut FanoutStopper,
        cancel: &CancellationToken,
        host: &str,
        desc: &str,
    ) -> HubResult<reqwest::Client> {
        if !host.ends_with(".local") {
            return new_default_client();
        }

        self.resolve_store.add(host);

        let resolve_store = self.resolve_store.clone();
        let unregister_host = host.to_string();

        stopper.add(
            format!("resolve-store-{desc}"),
            Arc::new(FuncStopper::new(move || {
                resolve_store.remove(&unregister_host);

                Ok(())
            })),
        );

        new_resolve_client(self.resolve_store.clone(), cancel.clone())
    }
}

#[async_trait]
impl Store for DeviceStore {
    /// 注册设备并持久化。
    ///
    /// 顺序：构建流水线 → 写入 blob → 放入注册表 → 启动流水线。
    /// 写入失败时丢弃流水线；启动失败时回滚已写入的 blob。
    async fn add(&self, uri: &str, desc: &str) -> HubResult<()> {
        let mut nodes = self.nodes.lock().await;

        if nodes.contains_key(uri) {
            return Err(HubError::DeviceExists);
        }

        let now = Utc::now();
        let node = self.make_node(uri, desc, now)?;

        let record = DeviceRecord {
            uri: uri.to_string(),
            desc: desc.to_string(),
            ts: now.timestamp(),
        };
        let blob = serde_json::to_vec(&record)
            .map_err(|err| HubError::failed(format!("failed to encode device record: {err}")))?;

        if let Err(err) = self.db.write(uri, &blob).await {
            node.cancel.cancel();

            return Err(HubError::failed(format!(
                "failed to persist device information: uri={uri} err={err}"
            )));
        }

        nodes.insert(uri.to_string(), node);

        let started = match nodes.get(uri) {
            Some(node) => node.start(),
            None => Ok(()),
        };

        if let Err(err) = started {
            if let Some(node) = nodes.remove(uri) {
                node.cancel.cancel();
            }
            let _ = self.db.remove(uri).await;

            return Err(err);
        }

        tracing::info!(uri = %uri, desc = %desc, "device added");

        Ok(())
    }

    /// 注销设备。
    ///
    /// 顺序：查找 → 删除 blob → 停止流水线（取消并汇合）→ 移出注册表。
    async fn remove(&self, uri: &str) -> HubResult<()> {
        let mut nodes = self.nodes.lock().await;

        if !nodes.contains_key(uri) {
            return Err(HubError::NoData);
        }

        self.db.remove(uri).await?;

        if let Some(node) = nodes.get(uri) {
            node.stop()
                .await
                .map_err(|err| HubError::failed(format!("failed to stop device: uri={uri} err={err}")))?;
        }

        nodes.remove(uri);

        tracing::info!(uri = %uri, "device removed");

        Ok(())
    }

    async fn get_desc(&self) -> Vec<DeviceView> {
        let nodes = self.nodes.lock().await;

        nodes
            .values()
            .map(|node| DeviceView {
                uri: node.uri.clone(),
                desc: node.desc.clone(),
                id: node.holder.get(),
                created_at: node.created_at.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl Starter for DeviceStore {
    async fn start(&self) -> HubResult<()> {
        DeviceStore::start(self).await
    }
}

#[async_trait]
impl Stopper for DeviceStore {
    async fn stop(&self) -> HubResult<()> {
        DeviceStore::stop(self).await
    }
}

/// 单个设备的流水线：执行器 + 数据持有者 + 拆除钩子。
struct DeviceNode {
    uri: String,
    desc: String,
    created_at: String,
    cancel: CancellationToken,
    stopper: FanoutStopper,
    holder: Arc<IdHolder>,
    runner: Arc<AsyncTaskRunner>,
}

impl DeviceNode {
    fn start(&self) -> HubResult<()> {
        self.runner.start();

        Ok(())
    }

    async fn stop(&self) -> HubResult<()> {
        self.cancel.cancel();

        self.stopper.stop().await
    }
}

fn format_rfc1123(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_record_round_trip() {
        let record = DeviceRecord {
            uri: "http://192.168.4.1:17321".to_string(),
            desc: "room-plant-zamioculcas".to_string(),
            ts: 1733215816,
        };

        let blob = serde_json::to_vec(&record).expect("encode");
        let decoded: DeviceRecord = serde_json::from_slice(&blob).expect("decode");

        assert_eq!(decoded.uri, record.uri);
        assert_eq!(decoded.desc, record.desc);
        assert_eq!(decoded.ts, record.ts);
    }

    #[test]
    fn rfc1123_formatting() {
        let timestamp = Utc.timestamp_opt(1733215816, 0).single().expect("timestamp");
        assert_eq!(format_rfc1123(timestamp), "Tue, 03 Dec 2024 08:50:16 GMT");
    }
}
