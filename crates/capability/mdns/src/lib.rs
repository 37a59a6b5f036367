//! mDNS 发现与通告
//!
//! - DiscoveredService：一次浏览发现的局域网服务
//! - ServiceHandler / FanoutServiceHandler：发现结果的分发
//! - ResolveServiceHandler：把发现结果回灌给主机解析缓存
//! - MdnsBrowser：周期浏览任务
//! - MdnsResponder：把 Hub 自身通告为 _http._tcp 服务

pub mod browser;
pub mod responder;
pub mod service;

pub use browser::{BrowserParams, MdnsBrowser};
pub use responder::{MdnsResponder, ResponderParams};
pub use service::{
    DiscoveredService, FanoutServiceHandler, ResolveServiceHandler, ServiceHandler,
    HTTP_TCP_SERVICE,
};
