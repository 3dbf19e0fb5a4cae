// 路由快照：一个配置版本对应一份
//
// 启用的代理按路由方式拆成两组，各自按优先级升序稳定排序，
// 扫描时第一个命中即为该组的胜者。结果缓存挂在快照上，
// 换快照即整体失效。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::atoms::expiring_lru::ExpiringLru;
use crate::atoms::pattern_cache::RegexPatternCache;
use crate::atoms::shared_types::{EngineSettings, ProxyConfig, ProxyDefinition, TieBreak};
use crate::molecules::shared_types::MatchType;

type ResultKey = (String, Option<String>);

// 缓存只记代理 id，不持有定义本身
#[derive(Debug, Clone)]
struct CachedDecision {
    proxy_id: Option<String>,
    match_type: MatchType,
}

struct PatternRoute {
    proxy: Arc<ProxyDefinition>,
    // 模式列表只有一个通配项
    matches_all: bool,
}

pub struct RoutingSnapshot {
    fingerprint: u64,
    proxy_enabled: bool,
    container_proxies: Vec<Arc<ProxyDefinition>>,
    pattern_routes: Vec<PatternRoute>,
    by_id: HashMap<String, Arc<ProxyDefinition>>,
    results: Mutex<ExpiringLru<ResultKey, CachedDecision>>,
}

impl RoutingSnapshot {
    pub(crate) fn build(config: &ProxyConfig, fingerprint: u64, settings: &EngineSettings) -> Self {
        let mut container_proxies = Vec::new();
        let mut pattern_proxies = Vec::new();
        let mut by_id = HashMap::new();

        for proxy in config.enabled_proxies() {
            let proxy = Arc::new(proxy.clone());
            by_id
                .entry(proxy.id.clone())
                .or_insert_with(|| Arc::clone(&proxy));

            if proxy.is_container_mode() {
                if !proxy.active_containers().is_empty() {
                    container_proxies.push(proxy);
                }
            } else if !proxy.active_patterns().is_empty() {
                pattern_proxies.push(proxy);
            }
        }

        container_proxies.sort_by_key(|proxy| proxy.priority);
        pattern_proxies.sort_by_key(|proxy| proxy.priority);

        let pattern_routes = pattern_proxies
            .into_iter()
            .map(|proxy| PatternRoute {
                matches_all: matches!(proxy.active_patterns(), [only] if only == "*" || only == ".*"),
                proxy,
            })
            .collect();

        Self {
            fingerprint,
            proxy_enabled: config.proxy_enabled,
            container_proxies,
            pattern_routes,
            by_id,
            results: Mutex::new(ExpiringLru::new(
                settings.result_cache_capacity,
                settings.result_cache_ttl(),
            )),
        }
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn proxy_enabled(&self) -> bool {
        self.proxy_enabled
    }

    // 总开关打开且至少有一个可路由的代理
    pub fn is_active(&self) -> bool {
        self.proxy_enabled && (!self.container_proxies.is_empty() || !self.pattern_routes.is_empty())
    }

    pub fn container_proxies(&self) -> &[Arc<ProxyDefinition>] {
        &self.container_proxies
    }

    pub fn pattern_proxies(&self) -> impl Iterator<Item = &Arc<ProxyDefinition>> {
        self.pattern_routes.iter().map(|route| &route.proxy)
    }

    pub fn proxy(&self, id: &str) -> Option<&Arc<ProxyDefinition>> {
        self.by_id.get(id)
    }

    pub fn cached_results(&self) -> usize {
        self.results().len()
    }

    pub(crate) fn container_candidate(&self, container_id: &str) -> Option<&Arc<ProxyDefinition>> {
        self.container_proxies
            .iter()
            .find(|proxy| proxy.active_containers().iter().any(|c| c == container_id))
    }

    pub(crate) fn pattern_candidate(
        &self,
        hostname: &str,
        patterns: &RegexPatternCache,
    ) -> Option<&Arc<ProxyDefinition>> {
        self.pattern_routes
            .iter()
            .find(|route| route_matches(route, hostname, patterns))
            .map(|route| &route.proxy)
    }

    // 两种模式下全部命中的代理，按优先级排序并按 id 去重
    pub(crate) fn all_matches(
        &self,
        hostname: &str,
        container_id: Option<&str>,
        patterns: &RegexPatternCache,
        tie_break: TieBreak,
    ) -> Vec<Arc<ProxyDefinition>> {
        let container_hits = container_id.into_iter().flat_map(|container_id| {
            self.container_proxies
                .iter()
                .filter(move |proxy| proxy.active_containers().iter().any(|c| c == container_id))
        });
        let pattern_hits = self
            .pattern_routes
            .iter()
            .filter(|route| route_matches(route, hostname, patterns))
            .map(|route| &route.proxy);

        let container_rank = match tie_break {
            TieBreak::PreferContainer => 0,
            TieBreak::PreferPattern => 1,
        };
        let mut ranked: Vec<(i64, u8, &Arc<ProxyDefinition>)> = container_hits
            .map(|proxy| (proxy.priority, container_rank, proxy))
            .chain(pattern_hits.map(|proxy| (proxy.priority, 1 - container_rank, proxy)))
            .collect();
        ranked.sort_by_key(|(priority, rank, _)| (*priority, *rank));

        let mut seen = HashSet::new();
        ranked
            .into_iter()
            .filter(|(_, _, proxy)| seen.insert(proxy.id.clone()))
            .map(|(_, _, proxy)| Arc::clone(proxy))
            .collect()
    }

    pub(crate) fn cached_decision(
        &self,
        hostname: &str,
        container_id: Option<&str>,
        now: Instant,
    ) -> Option<(Option<Arc<ProxyDefinition>>, MatchType)> {
        let key = (hostname.to_string(), container_id.map(str::to_string));
        let decision = self.results().get(&key, now).cloned()?;

        match decision.proxy_id {
            None => Some((None, decision.match_type)),
            Some(id) => {
                let proxy = self.by_id.get(&id)?;
                Some((Some(Arc::clone(proxy)), decision.match_type))
            }
        }
    }

    pub(crate) fn remember_decision(
        &self,
        hostname: &str,
        container_id: Option<&str>,
        proxy: Option<&Arc<ProxyDefinition>>,
        match_type: MatchType,
        now: Instant,
    ) {
        let key = (hostname.to_string(), container_id.map(str::to_string));
        let decision = CachedDecision {
            proxy_id: proxy.map(|proxy| proxy.id.clone()),
            match_type,
        };
        self.results().insert(key, decision, now);
    }

    fn results(&self) -> MutexGuard<'_, ExpiringLru<ResultKey, CachedDecision>> {
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn route_matches(route: &PatternRoute, hostname: &str, patterns: &RegexPatternCache) -> bool {
    route.matches_all || patterns.matches_any(hostname, route.proxy.active_patterns())
}
