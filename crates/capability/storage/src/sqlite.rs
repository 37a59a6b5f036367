//! SQLite blob 存储实现
//!
//! 单表 blobs(key TEXT PRIMARY KEY, value BLOB)，数据库文件不存在时
//! 自动创建。

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use domain::{HubError, HubResult};

use crate::blob::{BlobStore, ForEachFn};

/// SQLite blob 存储。
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// 打开数据库并准备表结构。
    pub async fn open(path: impl AsRef<Path>) -> HubResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query("CREATE TABLE IF NOT EXISTS blobs (key TEXT PRIMARY KEY, value BLOB NOT NULL)")
            .execute(&pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl BlobStore for SqliteStore {
    async fn read(&self, key: &str) -> HubResult<Vec<u8>> {
        let row = sqlx::query("SELECT value FROM blobs WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(row.get::<Vec<u8>, _>(0)),
            None => Err(HubError::NoData),
        }
    }

    async fn write(&self, key: &str, blob: &[u8]) -> HubResult<()> {
        sqlx::query("INSERT INTO blobs (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET value = excluded.value")
            .bind(key)
            .bind(blob)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> HubResult<()> {
        sqlx::query("DELETE FROM blobs WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn for_each(&self, f: ForEachFn<'_>) -> HubResult<()> {
        let rows = sqlx::query("SELECT key, value FROM blobs ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        for row in rows {
            let key: String = row.get(0);
            let value: Vec<u8> = row.get(1);

            f(&key, &value)?;
        }

        Ok(())
    }

    async fn close(&self) -> HubResult<()> {
        self.pool.close().await;

        Ok(())
    }
}

fn map_sqlx_error(err: sqlx::Error) -> HubError {
    HubError::failed(format!("sqlite: {err}"))
}
