// 代理路由核心
//
// 按主机名模式与容器身份为每个请求挑选上游代理；
// 对没有逐请求回调的浏览器，生成决策等价的 PAC 脚本。

pub mod atoms;
pub mod molecules;

pub use atoms::{
    ConfigFormat, EngineSettings, ManualClock, ProxyAuth, ProxyConfig, ProxyDefinition, ProxyType,
    RegexPatternCache, RoutingConfig, TieBreak, load_config, validate_config,
};
pub use molecules::{
    MatchType, PacSandbox, PacScriptCompiler, ProxyDescriptor, ProxyResolver, RequestDetails,
    RequestHook, ResolutionResult, ResolveOptions, RoutingRequest, extract_routes,
};
