// 分子层模块入口：由原子组合出的路由服务

pub mod pac_compiler;
pub mod pac_sandbox;
pub mod request_hook;
pub mod resolver;
pub mod shared_types;

pub use pac_compiler::{CompileOptions, PacRoute, PacScriptCompiler, extract_routes};
pub use pac_sandbox::PacSandbox;
pub use request_hook::{RequestDetails, RequestHook, descriptor_for};
pub use resolver::{ProxyResolver, RoutingSnapshot};
pub use shared_types::{
    DescriptorType, MatchType, ProxyDescriptor, ResolutionResult, ResolveOptions, RoutingRequest,
};
