//! 持久化时间恢复
//!
//! 启动时从时序库读取最近一次持久化的 UNIX 时间，此后只接受单调递增
//! 的更新。读取结果为 NoData 表示尚无任何持久化数据，视为恢复成功，
//! 值为 -1。

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use domain::{HubError, HubResult, SystemClock};

/// 从持久化存储读取 UNIX 时间。
#[async_trait]
pub trait SystemClockReader: Send + Sync {
    /// 读取最近一次持久化的 UNIX 时间，无数据返回 NoData。
    async fn read_timestamp(&self) -> HubResult<i64>;
}

struct RestorerState {
    restored: bool,
    timestamp: i64,
}

/// 持久化时间恢复器。
///
/// 实现 SystemClock：get_timestamp 在恢复完成前返回 InvalidState；
/// set_timestamp 只向前推进，并同时钉住恢复状态，防止慢恢复覆盖
/// 已经观测到的新值。
pub struct ClockRestorer {
    reader: Arc<dyn SystemClockReader>,
    state: Mutex<RestorerState>,
}

impl ClockRestorer {
    pub fn new(reader: Arc<dyn SystemClockReader>) -> Self {
        Self {
            reader,
            state: Mutex::new(RestorerState {
                restored: false,
                timestamp: -1,
            }),
        }
    }

    /// 执行一次恢复。
    ///
    /// 非 NoData 的读取错误原样返回，交给执行器重试。
    pub async fn run(&self) -> HubResult<()> {
        let timestamp = match self.reader.read_timestamp().await {
            Ok(timestamp) => timestamp,
            Err(HubError::NoData) => -1,
            Err(err) => return Err(err),
        };

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if state.restored {
            tracing::info!(
                restored = state.timestamp,
                persisted = timestamp,
                "timestamp already restored"
            );
        } else {
            state.restored = true;
            state.timestamp = timestamp;

            tracing::info!(value = timestamp, "timestamp restored");
        }

        Ok(())
    }

    /// 处理 run() 的错误，NoData 不算错误。
    pub fn handle_error(&self, err: &HubError) {
        if !err.is_no_data() {
            tracing::error!(err = %err, "failed to restore timestamp");
        }
    }
}

#[async_trait]
impl SystemClock for ClockRestorer {
    async fn get_timestamp(&self) -> HubResult<i64> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if !state.restored {
            return Err(HubError::InvalidState);
        }

        Ok(state.timestamp)
    }

    async fn set_timestamp(&self, timestamp: i64) -> HubResult<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if timestamp > state.timestamp {
            state.timestamp = timestamp;
        }

        if !state.restored {
            state.restored = true;

            tracing::info!(value = timestamp, "skip timestamp restoring");
        }

        Ok(())
    }
}
