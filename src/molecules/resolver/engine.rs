// 代理解析引擎
//
// 每个实例持有自己的配置快照，通过 configure 显式更新。
// 指纹不变时不重建；换快照在一次写锁内完成，结果缓存随旧快照整体丢弃。

use std::sync::{Arc, RwLock};

use super::snapshot::RoutingSnapshot;
use crate::atoms::clock::{Clock, SystemClock};
use crate::atoms::config_loader::fingerprint;
use crate::atoms::pattern_cache::RegexPatternCache;
use crate::atoms::shared_types::{EngineSettings, ProxyConfig, ProxyDefinition, TieBreak};
use crate::molecules::shared_types::{
    MatchType, ResolutionResult, ResolveOptions, RoutingRequest,
};

pub struct ProxyResolver {
    settings: EngineSettings,
    clock: Arc<dyn Clock>,
    patterns: RegexPatternCache,
    snapshot: RwLock<Arc<RoutingSnapshot>>,
}

impl ProxyResolver {
    pub fn new(settings: EngineSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: EngineSettings, clock: Arc<dyn Clock>) -> Self {
        let patterns = RegexPatternCache::with_clock(
            settings.regex_cache_capacity,
            settings.regex_cache_ttl(),
            Arc::clone(&clock),
        );
        let empty = ProxyConfig::default();
        let snapshot = RoutingSnapshot::build(&empty, fingerprint(&empty), &settings);

        Self {
            settings,
            clock,
            patterns,
            snapshot: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn pattern_cache(&self) -> &RegexPatternCache {
        &self.patterns
    }

    pub fn snapshot(&self) -> Arc<RoutingSnapshot> {
        let guard = self
            .snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    pub fn fingerprint(&self) -> u64 {
        self.snapshot().fingerprint()
    }

    // 应用新配置，返回是否重建了快照
    pub fn configure(&self, config: &ProxyConfig) -> bool {
        let next_fingerprint = fingerprint(config);
        if next_fingerprint == self.fingerprint() {
            log::debug!("代理配置指纹未变化，沿用当前路由快照");
            return false;
        }

        let snapshot = RoutingSnapshot::build(config, next_fingerprint, &self.settings);
        log::info!(
            "路由快照已重建：容器代理 {} 个，模式代理 {} 个，总开关 {}",
            snapshot.container_proxies().len(),
            snapshot.pattern_proxies().count(),
            snapshot.proxy_enabled()
        );

        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(snapshot);
        true
    }

    pub fn resolve_request(
        &self,
        request: &RoutingRequest,
        options: ResolveOptions,
    ) -> ResolutionResult {
        self.resolve(&request.hostname, request.container_id.as_deref(), options)
    }

    pub fn resolve(
        &self,
        hostname: &str,
        container_id: Option<&str>,
        options: ResolveOptions,
    ) -> ResolutionResult {
        let snapshot = self.snapshot();
        let hostname = hostname.trim();
        if hostname.is_empty() || !snapshot.is_active() {
            return ResolutionResult::no_match();
        }

        let hostname = hostname.to_lowercase();
        let container_id = container_id.filter(|id| !id.is_empty());
        let now = self.clock.now();
        let use_cache = self.settings.result_cache_enabled && !options.bypass_cache;

        if use_cache && !options.include_all_matches {
            if let Some((selected_proxy, match_type)) =
                snapshot.cached_decision(&hostname, container_id, now)
            {
                return ResolutionResult {
                    selected_proxy,
                    match_type,
                    all_matches: None,
                };
            }
        }

        let container_hit = container_id.and_then(|id| snapshot.container_candidate(id));
        let pattern_hit = snapshot.pattern_candidate(&hostname, &self.patterns);
        let (selected_proxy, match_type) =
            arbitrate(container_hit, pattern_hit, self.settings.tie_break);

        if use_cache {
            snapshot.remember_decision(
                &hostname,
                container_id,
                selected_proxy.as_ref(),
                match_type,
                now,
            );
        }

        let all_matches = options.include_all_matches.then(|| {
            snapshot.all_matches(
                &hostname,
                container_id,
                &self.patterns,
                self.settings.tie_break,
            )
        });

        log::debug!(
            "代理解析：{}（容器 {:?}）-> {:?} {:?}",
            hostname,
            container_id,
            selected_proxy.as_deref().map(|proxy| proxy.id.as_str()),
            match_type
        );

        ResolutionResult {
            selected_proxy,
            match_type,
            all_matches,
        }
    }
}

// 容器候选与模式候选的裁决：数值小者胜，相同时按规则
fn arbitrate(
    container_hit: Option<&Arc<ProxyDefinition>>,
    pattern_hit: Option<&Arc<ProxyDefinition>>,
    tie_break: TieBreak,
) -> (Option<Arc<ProxyDefinition>>, MatchType) {
    let container = |proxy: &Arc<ProxyDefinition>| (Some(Arc::clone(proxy)), MatchType::Container);
    let pattern = |proxy: &Arc<ProxyDefinition>| (Some(Arc::clone(proxy)), MatchType::Pattern);

    match (container_hit, pattern_hit) {
        (Some(c), Some(p)) if c.priority < p.priority => container(c),
        (Some(c), Some(p)) if c.priority > p.priority => pattern(p),
        (Some(c), Some(p)) => match tie_break {
            TieBreak::PreferContainer => container(c),
            TieBreak::PreferPattern => pattern(p),
        },
        (Some(c), None) => container(c),
        (None, Some(p)) => pattern(p),
        (None, None) => (None, MatchType::None),
    }
}
