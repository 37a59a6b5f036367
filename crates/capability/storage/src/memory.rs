//! 内存 blob 存储实现
//!
//! 仅用于测试和不落盘的本地运行。

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use domain::{HubError, HubResult};

use crate::blob::{BlobStore, ForEachFn};

/// 内存 blob 存储。
///
/// 使用 RwLock + BTreeMap 提供线程安全的内存存储，遍历顺序稳定。
#[derive(Default)]
pub struct MemoryStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前存储的条目数。
    pub fn len(&self) -> usize {
        self.blobs.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn read(&self, key: &str) -> HubResult<Vec<u8>> {
        self.blobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
            .ok_or(HubError::NoData)
    }

    async fn write(&self, key: &str, blob: &[u8]) -> HubResult<()> {
        self.blobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), blob.to_vec());

        Ok(())
    }

    async fn remove(&self, key: &str) -> HubResult<()> {
        self.blobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);

        Ok(())
    }

    async fn for_each(&self, f: ForEachFn<'_>) -> HubResult<()> {
        let snapshot: Vec<(String, Vec<u8>)> = self
            .blobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        for (key, blob) in snapshot {
            f(&key, &blob)?;
        }

        Ok(())
    }

    async fn close(&self) -> HubResult<()> {
        Ok(())
    }
}
