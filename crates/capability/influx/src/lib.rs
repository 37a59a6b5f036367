//! InfluxDB v2 落地端
//!
//! 设备数据的时序存储子系统：
//! - `line`：Line Protocol 编码
//! - `client`：v2 HTTP API 写入与 Flux 查询
//! - `handler`：注册 / 遥测数据写入 measurement
//! - `pipeline`：客户端 + 时间恢复器 + 执行器的组装
//!
//! 参考：
//! - <https://docs.influxdata.com/influxdb/v2/reference/syntax/line-protocol/>
//! - <https://docs.influxdata.com/influxdb/v2/api/>

pub mod client;
pub mod handler;
pub mod line;
pub mod pipeline;

pub use client::{InfluxClient, InfluxParams};
pub use handler::InfluxDataHandler;
pub use pipeline::InfluxPipeline;
