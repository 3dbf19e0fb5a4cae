// L4 原子层模块入口

pub mod clock;
pub mod config_loader;
pub mod expiring_lru;
pub mod js_literal;
pub mod logger;
pub mod pattern_cache;
pub mod shared_types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config_loader::{fingerprint, load_config, validate_config};
pub use expiring_lru::{EntryTimes, ExpiringLru};
pub use js_literal::to_js_literal;
pub use logger::init;
pub use pattern_cache::{
    PatternCacheStats, PatternKind, RegexPatternCache, classify_pattern, is_matchable_pattern,
    validate_pattern,
};
pub use shared_types::{
    ConfigFormat, EngineSettings, ProxyAuth, ProxyConfig, ProxyDefinition, ProxyType,
    RoutingConfig, TieBreak,
};
