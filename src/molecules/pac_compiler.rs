// PAC 脚本生成分子模块
//
// 把按优先级排序的模式路由表编码为唯一的数据字面量，拼接到固定模板中，
// 供没有逐请求代理回调的浏览器使用

mod compiler;
mod template;

pub use compiler::{CompileOptions, PacRoute, PacScriptCompiler, extract_routes};
