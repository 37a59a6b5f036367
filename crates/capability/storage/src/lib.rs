//! 持久化层
//!
//! 本模块提供设备注册信息的持久化抽象与实现：
//!
//! - `blob`：键值 blob 存储接口与 NoopStore
//! - `memory`：内存实现（测试与演示）
//! - `sqlite`：SQLite 实现（生产环境使用）
//! - `restorer`：从时序库恢复最近一次持久化的 UNIX 时间
//!
//! 设计原则：
//! - 所有接口返回 HubError，数据不存在统一用 NoData 表达
//! - 实现必须可被多任务并发使用

pub mod blob;
pub mod memory;
pub mod restorer;
pub mod sqlite;

pub use blob::{BlobStore, NoopStore};
pub use memory::MemoryStore;
pub use restorer::{ClockRestorer, SystemClockReader};
pub use sqlite::SqliteStore;
