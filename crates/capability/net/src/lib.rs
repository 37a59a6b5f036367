//! 网络层：主机解析缓存与面向设备的 HTTP 客户端。
//!
//! - ResolveStore：已知主机名 → 当前观测到的网络地址
//! - Resolver / ResolveHandler：解析查询与解析结果回灌接口
//! - HttpClient：DNS 步骤可接入 ResolveStore 的 reqwest 封装
//! - UrlFetcher：带超时的单 URL 抓取
//! - HttpSystemClock：设备 /system/time 契约的客户端

pub mod client;
pub mod fetcher;
pub mod remote_clock;
pub mod resolve;

pub use client::{new_default_client, new_resolve_client};
pub use fetcher::{Fetcher, UrlFetcher};
pub use remote_clock::HttpSystemClock;
pub use resolve::{ResolveHandler, ResolveStore, Resolver};
