//! 注册后唤醒发现周期的装饰器

use std::sync::Arc;

use async_trait::async_trait;

use domain::HubResult;
use hub_scheduler::Awakener;

use crate::{DeviceView, Store};

/// 把"操作员手工注册设备"与"立即触发一轮发现"耦合起来。
///
/// 注册成功后唤醒 mDNS 浏览执行器，新注册的 .local 主机无须等待
/// 下一个浏览周期即可完成解析。
pub struct AwakeStore {
    awakener: Arc<dyn Awakener>,
    store: Arc<dyn Store>,
}

impl AwakeStore {
    pub fn new(awakener: Arc<dyn Awakener>, store: Arc<dyn Store>) -> Self {
        Self { awakener, store }
    }
}

#[async_trait]
impl Store for AwakeStore {
    async fn add(&self, uri: &str, desc: &str) -> HubResult<()> {
        self.store.add(uri, desc).await?;
        self.awakener.awake();

        Ok(())
    }

    async fn remove(&self, uri: &str) -> HubResult<()> {
        self.store.remove(uri).await
    }

    async fn get_desc(&self) -> Vec<DeviceView> {
        self.store.get_desc().await
    }
}
