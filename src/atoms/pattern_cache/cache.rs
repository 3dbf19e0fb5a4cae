// 正则模式缓存
//
// 通配模式记录在独立的小集合里，字面量不经过正则引擎，
// 其余模式编译为大小写不敏感的匹配器，按 LRU 与固定过期时间淘汰。
// 编译失败的模式缓存为"永不匹配"，日志只在编译时输出一次。

use anyhow::{Context, Result, bail};
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::classifier::{PatternKind, classify_pattern, literal_matches};
use super::dialect::rust_only_construct;
use crate::atoms::clock::{Clock, SystemClock};
use crate::atoms::expiring_lru::{EntryTimes, ExpiringLru};

// 编译产物上限，保证单个模式的匹配开销有界
const COMPILED_SIZE_LIMIT: usize = 1 << 20;
const DFA_SIZE_LIMIT: usize = 2 << 20;

// PAC 脚本无法同样理解的写法也按编译失败处理，两边都视为永不匹配
pub(crate) fn build_matcher(pattern: &str) -> Result<Regex> {
    if let Some(construct) = rust_only_construct(pattern) {
        bail!("匹配模式使用了 PAC 脚本不支持的{}：{}", construct, pattern);
    }
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(COMPILED_SIZE_LIMIT)
        .dfa_size_limit(DFA_SIZE_LIMIT)
        .build()
        .with_context(|| format!("无法编译匹配模式：{}", pattern))
}

// 模式是否有可能匹配任何主机；编译失败的正则在两种环境中都永不匹配
pub fn is_matchable_pattern(pattern: &str) -> bool {
    classify_pattern(pattern) != PatternKind::Regex || build_matcher(pattern).is_ok()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub compilations: u64,
    pub compile_failures: u64,
    pub evictions: u64,
    pub universal_patterns: usize,
    pub literal_patterns: usize,
    pub compiled_patterns: usize,
}

struct CacheState {
    literals: HashSet<String>,
    // None 表示编译失败
    compiled: ExpiringLru<String, Option<Regex>>,
    stats: PatternCacheStats,
}

pub struct RegexPatternCache {
    // 依次对应 "*" 和 ".*"，通配路径只读这两个标志，不加锁
    universal_seen: [AtomicBool; 2],
    state: Mutex<CacheState>,
    clock: Arc<dyn Clock>,
}

impl RegexPatternCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self::with_clock(capacity, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            universal_seen: [AtomicBool::new(false), AtomicBool::new(false)],
            state: Mutex::new(CacheState {
                literals: HashSet::new(),
                compiled: ExpiringLru::new(capacity, ttl),
                stats: PatternCacheStats::default(),
            }),
            clock,
        }
    }

    // 判断主机名是否匹配模式；任何失败都按不匹配处理
    pub fn test(&self, hostname: &str, pattern: &str) -> bool {
        match classify_pattern(pattern) {
            PatternKind::Universal => {
                let seen = &self.universal_seen[usize::from(pattern != "*")];
                if !seen.load(Ordering::Relaxed) {
                    seen.store(true, Ordering::Relaxed);
                }
                true
            }
            PatternKind::Literal => {
                self.remember_literal(pattern);
                literal_matches(hostname, pattern)
            }
            PatternKind::Regex => match self.matcher(pattern) {
                Some(matcher) => matcher.is_match(hostname),
                None => false,
            },
        }
    }

    // 任一模式匹配即返回 true
    pub fn matches_any(&self, hostname: &str, patterns: &[String]) -> bool {
        patterns.iter().any(|pattern| self.test(hostname, pattern))
    }

    pub fn stats(&self) -> PatternCacheStats {
        let state = self.lock();
        PatternCacheStats {
            universal_patterns: self
                .universal_seen
                .iter()
                .filter(|seen| seen.load(Ordering::Relaxed))
                .count(),
            literal_patterns: state.literals.len(),
            compiled_patterns: state.compiled.len(),
            ..state.stats
        }
    }

    pub fn entry_times(&self, pattern: &str) -> Option<EntryTimes> {
        self.lock().compiled.entry_times(pattern)
    }

    pub fn clear(&self) {
        for seen in &self.universal_seen {
            seen.store(false, Ordering::Relaxed);
        }
        let mut state = self.lock();
        state.literals.clear();
        state.compiled.clear();
        log::debug!("正则模式缓存已清空");
    }

    // 取出（必要时编译）匹配器；克隆后在锁外执行匹配
    fn matcher(&self, pattern: &str) -> Option<Regex> {
        let now = self.clock.now();
        let mut state = self.lock();

        if let Some(cached) = state.compiled.get(pattern, now).cloned() {
            state.stats.hits += 1;
            return cached;
        }
        state.stats.misses += 1;

        let compiled = match build_matcher(pattern) {
            Ok(matcher) => {
                state.stats.compilations += 1;
                Some(matcher)
            }
            Err(e) => {
                state.stats.compile_failures += 1;
                log::warn!("匹配模式编译失败，该模式将不再匹配任何主机：{:#}", e);
                None
            }
        };

        if let Some(evicted) = state.compiled.insert(pattern.to_string(), compiled.clone(), now)
        {
            state.stats.evictions += 1;
            log::debug!("正则缓存已满，淘汰最久未使用的模式：{}", evicted);
        }
        compiled
    }

    // 字面量按小写记录，与比较语义一致
    fn remember_literal(&self, pattern: &str) {
        let key: Cow<'_, str> = if pattern.chars().any(char::is_uppercase) {
            Cow::Owned(pattern.to_lowercase())
        } else {
            Cow::Borrowed(pattern)
        };

        let mut state = self.lock();
        let capacity = state.compiled.capacity();
        if state.literals.len() < capacity && !state.literals.contains(key.as_ref()) {
            state.literals.insert(key.into_owned());
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
