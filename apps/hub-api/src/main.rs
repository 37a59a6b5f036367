//! Device Hub：设备发现、注册、轮询与数据落地的常驻服务。
//!
//! 启动顺序：配置 → 日志 → 取消根 → 解析缓存 → mDNS 浏览 → 时序库
//! 流水线 → 持久化存储 → 设备注册表 → 活跃度监控 → HTTP 控制面 →
//! mDNS 通告。停机按注册的逆序拆除，根取消扇出到所有流水线。

mod handlers;
mod routes;

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use domain::{HubResult, LocalMonotonicClock, LocalSystemClock, SystemClock};
use hub_config::AppConfig;
use hub_devstore::{AwakeStore, DeviceStore, Store, StoreAliveMonitor, StoreMdnsHandler, StoreParams};
use hub_influx::{InfluxParams, InfluxPipeline};
use hub_mdns::{
    BrowserParams, FanoutServiceHandler, MdnsBrowser, MdnsResponder, ResolveServiceHandler,
    ResponderParams, HTTP_TCP_SERVICE,
};
use hub_net::ResolveStore;
use hub_scheduler::{AsyncTaskRunner, FanoutStarter, FanoutStopper, RunnerParams, Stopper};
use hub_storage::{BlobStore, NoopStore, SqliteStore};

/// HTTP 控制面共享状态。
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub system_clock: Arc<dyn SystemClock>,
    pub time_valid_since: i64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    hub_telemetry::init_tracing_file(&config.log_path)?;

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let mut starter = FanoutStarter::default();
    let mut stopper = FanoutStopper::default();

    let local_clock: Arc<dyn SystemClock> = Arc::new(LocalSystemClock::new());
    let resolve_store = Arc::new(ResolveStore::new());

    // 发现结果的分发：解析回灌始终在场，自动发现按配置追加。
    let service_handler = Arc::new(FanoutServiceHandler::default());
    service_handler.add(Arc::new(ResolveServiceHandler::new(resolve_store.clone())));

    let browser = Arc::new(MdnsBrowser::new(
        service_handler.clone(),
        BrowserParams {
            service: HTTP_TCP_SERVICE.to_string(),
            timeout: config.mdns_browse_timeout,
        },
    )?);
    let browser_runner = Arc::new(AsyncTaskRunner::new(
        cancel.child_token(),
        browser.clone(),
        Some(browser.clone()),
        RunnerParams::with_interval(config.mdns_browse_interval),
    ));
    starter.add("mdns-browser-runner", browser_runner.clone());
    stopper.add("mdns-browser-runner", browser_runner.clone());
    stopper.add("mdns-browser", browser.clone());

    let influx = Arc::new(InfluxPipeline::new(
        cancel.child_token(),
        InfluxParams {
            url: config.influxdb_url.clone(),
            org: config.influxdb_org.clone(),
            token: config.influxdb_token.clone(),
            bucket: config.influxdb_bucket.clone(),
        },
    )?);
    starter.add("influxdb-pipeline", influx.clone());
    stopper.add("influxdb-pipeline", influx.clone());

    let db = open_blob_store(&config).await?;
    stopper.add("blob-store", Arc::new(BlobStoreCloser { db: db.clone() }));

    let device_store = Arc::new(
        DeviceStore::new(
            cancel.child_token(),
            local_clock.clone(),
            influx.system_clock(),
            influx.data_handler(),
            db,
            resolve_store,
            StoreParams {
                fetch_interval: config.fetch_interval,
                fetch_timeout: config.fetch_timeout,
                max_clock_drift: config.max_clock_drift_seconds,
            },
        )
        .await?,
    );
    starter.add("device-store", device_store.clone());
    stopper.add("device-store", device_store.clone());

    // 手工注册的设备立即触发一轮 mDNS 浏览。
    let awake_store: Arc<dyn Store> = Arc::new(AwakeStore::new(
        browser_runner.clone(),
        device_store.clone(),
    ));

    let store: Arc<dyn Store> = if config.monitor_inactive_disable {
        awake_store
    } else {
        let monitor = Arc::new(StoreAliveMonitor::new(
            Arc::new(LocalMonotonicClock),
            awake_store,
            config.monitor_inactive_max_interval,
        ));
        device_store.set_alive_monitor(monitor.clone());

        let monitor_runner = Arc::new(AsyncTaskRunner::new(
            cancel.child_token(),
            monitor.clone(),
            None,
            RunnerParams::with_interval(config.monitor_inactive_update_interval),
        ));
        starter.add("device-alive-monitor-runner", monitor_runner.clone());
        stopper.add("device-alive-monitor-runner", monitor_runner);

        monitor
    };

    if !config.mdns_autodiscovery_disable {
        service_handler.add(Arc::new(StoreMdnsHandler::new(store.clone())));
    }

    let state = AppState {
        store,
        system_clock: local_clock,
        time_valid_since: config.time_valid_since,
    };

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port)).await?;
    let port = listener.local_addr()?.port();

    let app = routes::create_api_router().with_state(state);
    let server_cancel = cancel.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_cancel.cancelled_owned())
            .await
    });

    if !config.mdns_server_disable {
        let responder = Arc::new(MdnsResponder::new(ResponderParams {
            instance: config.mdns_server_instance.clone(),
            hostname: config.mdns_server_hostname.clone(),
            port,
        })?);
        starter.add("mdns-responder", responder.clone());
        stopper.add("mdns-responder", responder);
    }

    starter.start().await?;
    tracing::info!(port, "device hub started");

    cancel.cancelled().await;
    tracing::info!("shutting down");

    stopper.stop().await?;
    server.await??;

    Ok(())
}

async fn open_blob_store(config: &AppConfig) -> HubResult<Arc<dyn BlobStore>> {
    match &config.cache_dir {
        Some(dir) => {
            let path = Path::new(dir).join("devhub.db");
            Ok(Arc::new(SqliteStore::open(path).await?))
        }
        None => Ok(Arc::new(NoopStore)),
    }
}

struct BlobStoreCloser {
    db: Arc<dyn BlobStore>,
}

#[async_trait::async_trait]
impl Stopper for BlobStoreCloser {
    async fn stop(&self) -> HubResult<()> {
        self.db.close().await
    }
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!(err = %err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    cancel.cancel();
}
