//! 时钟抽象与三方时间校准
//!
//! 三个逻辑时钟：
//! - Local：本进程墙钟
//! - RemoteLast：时序库中最近一次持久化的 UNIX 时间
//! - RemoteCurr：设备自报的当前 UNIX 时间（可通过设备 HTTP API 写回）
//!
//! ClockSynchronizer 在三者之间做单向校准：只把本地时间下发给设备，
//! 绝不回拨任何一方。

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::error::{HubError, HubResult};

/// UNIX 时间读写接口。
#[async_trait]
pub trait SystemClock: Send + Sync {
    /// 读取 UNIX 时间（秒）。
    async fn get_timestamp(&self) -> HubResult<i64>;

    /// 设置 UNIX 时间（秒）。
    async fn set_timestamp(&self, timestamp: i64) -> HubResult<()>;
}

/// 单调时钟读数接口。
pub trait MonotonicClock: Send + Sync {
    /// 返回当前单调时钟读数。
    fn now(&self) -> Instant;
}

/// 本地墙钟。
///
/// set_timestamp 以偏移量形式记录校正值，不触碰操作系统时钟。
#[derive(Default)]
pub struct LocalSystemClock {
    offset: AtomicI64,
}

impl LocalSystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn wall_timestamp() -> HubResult<i64> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| HubError::failed(format!("system time before epoch: {err}")))?;

        Ok(elapsed.as_secs() as i64)
    }
}

#[async_trait]
impl SystemClock for LocalSystemClock {
    async fn get_timestamp(&self) -> HubResult<i64> {
        Ok(Self::wall_timestamp()? + self.offset.load(Ordering::Relaxed))
    }

    async fn set_timestamp(&self, timestamp: i64) -> HubResult<()> {
        let offset = timestamp - Self::wall_timestamp()?;
        self.offset.store(offset, Ordering::Relaxed);

        Ok(())
    }
}

/// 本地单调时钟。
#[derive(Default)]
pub struct LocalMonotonicClock;

impl MonotonicClock for LocalMonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// 三方时间校准器。
///
/// max_drift 为本地与设备时间允许的最大偏差（秒），0 表示仅在设备时钟
/// 未设置（-1）时下发校正。
pub struct ClockSynchronizer {
    local: Arc<dyn SystemClock>,
    remote_last: Arc<dyn SystemClock>,
    remote_curr: Arc<dyn SystemClock>,
    max_drift: i64,
}

impl ClockSynchronizer {
    pub fn new(
        local: Arc<dyn SystemClock>,
        remote_last: Arc<dyn SystemClock>,
        remote_curr: Arc<dyn SystemClock>,
        max_drift: i64,
    ) -> Self {
        Self {
            local,
            remote_last,
            remote_curr,
            max_drift,
        }
    }

    /// 校准一次。
    ///
    /// 拒绝任何形式的时间回退：持久化时间或设备时间超前本地时，返回
    /// InvalidState 而非回拨。
    pub async fn synchronize(&self) -> HubResult<()> {
        let local_ts = self.local.get_timestamp().await?;
        let remote_last_ts = self.remote_last.get_timestamp().await?;

        if remote_last_ts > local_ts {
            tracing::error!(
                local = local_ts,
                persisted = remote_last_ts,
                "refusing to synchronize: local clock behind persisted timestamp"
            );

            return Err(HubError::InvalidState);
        }

        let remote_curr_ts = self.remote_curr.get_timestamp().await?;

        if remote_curr_ts > local_ts {
            tracing::error!(
                local = local_ts,
                device = remote_curr_ts,
                "refusing to synchronize: device clock ahead of local"
            );

            return Err(HubError::InvalidState);
        }

        if remote_curr_ts == -1 || self.drift_exceeded(local_ts, remote_curr_ts) {
            self.remote_curr.set_timestamp(local_ts).await?;

            tracing::info!(local = local_ts, device = remote_curr_ts, "device clock set");
        }

        Ok(())
    }

    fn drift_exceeded(&self, local_ts: i64, remote_curr_ts: i64) -> bool {
        self.max_drift > 0 && (local_ts - remote_curr_ts).abs() > self.max_drift
    }
}
