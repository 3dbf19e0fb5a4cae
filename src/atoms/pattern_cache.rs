// 主机名模式匹配原子模块
//
// 通配、字面量、正则三类模式分别走不同的快速路径，正则带有容量与过期上限的缓存

mod cache;
mod classifier;
mod dialect;
mod validator;

pub use cache::{PatternCacheStats, RegexPatternCache, is_matchable_pattern};
pub use classifier::{PatternKind, classify_pattern};
pub use validator::validate_pattern;
