// 代理解析分子模块
//
// 持有按配置版本构建的不可变快照，对每个请求选出唯一的上游代理

mod engine;
mod snapshot;

pub use engine::ProxyResolver;
pub use snapshot::RoutingSnapshot;
