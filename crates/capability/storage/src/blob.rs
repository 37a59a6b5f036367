//! 键值 blob 存储接口

use async_trait::async_trait;

use domain::{HubError, HubResult};

/// 遍历回调：key + blob，返回错误则中断遍历。
pub type ForEachFn<'a> = &'a mut (dyn FnMut(&str, &[u8]) -> HubResult<()> + Send);

/// 键值 blob 数据库。
///
/// 实现必须线程安全。
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 读取 blob，不存在返回 NoData。
    async fn read(&self, key: &str) -> HubResult<Vec<u8>>;

    /// 写入 blob。
    async fn write(&self, key: &str, blob: &[u8]) -> HubResult<()>;

    /// 删除 blob，不存在视为成功。
    async fn remove(&self, key: &str) -> HubResult<()>;

    /// 遍历所有数据。
    async fn for_each(&self, f: ForEachFn<'_>) -> HubResult<()>;

    /// 释放底层资源。
    async fn close(&self) -> HubResult<()>;
}

/// 不持久化任何数据的数据库。
///
/// 显式支持的配置：未指定缓存目录时设备注册只存在于内存。
#[derive(Debug, Default)]
pub struct NoopStore;

#[async_trait]
impl BlobStore for NoopStore {
    async fn read(&self, _key: &str) -> HubResult<Vec<u8>> {
        Err(HubError::NoData)
    }

    async fn write(&self, _key: &str, _blob: &[u8]) -> HubResult<()> {
        Ok(())
    }

    async fn remove(&self, _key: &str) -> HubResult<()> {
        Ok(())
    }

    async fn for_each(&self, _f: ForEachFn<'_>) -> HubResult<()> {
        Ok(())
    }

    async fn close(&self) -> HubResult<()> {
        Ok(())
    }
}
