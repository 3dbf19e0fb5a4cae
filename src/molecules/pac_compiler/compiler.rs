// PAC 脚本编译器

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::template::{self, ROUTES_ASSIGNMENT};
use crate::atoms::js_literal::to_js_literal;
use crate::atoms::pattern_cache::is_matchable_pattern;
use crate::atoms::shared_types::{EngineSettings, ProxyConfig, ProxyDefinition};
use crate::molecules::pac_sandbox::PacSandbox;

// 脚本数据表中的一条路由
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PacRoute {
    pub patterns: Vec<String>,
    pub proxy: String,
    pub priority: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    // 目标平台支持且需要时才在指令中内联认证信息
    pub inline_credentials: bool,
    pub result_cache_limit: usize,
    pub regex_cache_limit: usize,
    // 生成后在内置 JS 引擎中加载一次，失败则退回直连脚本
    pub verify: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::from_settings(&EngineSettings::default())
    }
}

impl CompileOptions {
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            inline_credentials: settings.pac_inline_credentials,
            result_cache_limit: settings.pac_result_cache_capacity,
            regex_cache_limit: settings.pac_regex_cache_capacity,
            verify: settings.pac_verify_script,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PacScriptCompiler {
    options: CompileOptions,
}

impl PacScriptCompiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    // 总开关关闭时直接输出直连脚本
    pub fn compile_config(&self, config: &ProxyConfig) -> String {
        if !config.proxy_enabled {
            log::info!("代理总开关已关闭，生成直连 PAC 脚本");
            return Self::direct_script();
        }

        let enabled: Vec<ProxyDefinition> = config.enabled_proxies().cloned().collect();
        self.compile(&enabled)
    }

    pub fn compile(&self, proxies: &[ProxyDefinition]) -> String {
        let routes = self.build_routes(proxies);
        if routes.is_empty() {
            log::info!("没有可用于 PAC 的模式代理，生成直连脚本");
            return Self::direct_script();
        }

        let literal = match to_js_literal(&routes) {
            Ok(literal) => literal,
            Err(e) => {
                log::error!("PAC 路由表编码失败，退回直连脚本：{:#}", e);
                return Self::direct_script();
            }
        };

        let script = template::render(
            &literal,
            self.options.result_cache_limit,
            self.options.regex_cache_limit,
        );

        if self.options.verify {
            if let Err(e) = PacSandbox::load(&script) {
                log::error!("生成的 PAC 脚本无法加载，退回直连脚本：{:#}", e);
                return Self::direct_script();
            }
        }

        log::info!(
            "PAC 脚本生成完成：{} 条路由，{} 字节",
            routes.len(),
            script.len()
        );
        script
    }

    // 容器模式代理在 PAC 环境中无法识别容器身份，直接丢弃。
    // 进程内永不匹配的模式也不写入脚本，避免 JS 引擎对其另作解释。
    pub fn build_routes(&self, proxies: &[ProxyDefinition]) -> Vec<PacRoute> {
        let mut eligible: Vec<&ProxyDefinition> = proxies
            .iter()
            .filter(|proxy| proxy.enabled)
            .filter(|proxy| !proxy.is_container_mode())
            .collect();
        eligible.sort_by_key(|proxy| proxy.priority);

        eligible
            .into_iter()
            .filter_map(|proxy| {
                let patterns: Vec<String> = proxy
                    .active_patterns()
                    .iter()
                    .filter(|pattern| {
                        let matchable = is_matchable_pattern(pattern);
                        if !matchable {
                            log::warn!(
                                "代理 {} 的模式 {} 无法编译，不写入 PAC 脚本",
                                proxy.id,
                                pattern
                            );
                        }
                        matchable
                    })
                    .cloned()
                    .collect();
                if patterns.is_empty() {
                    return None;
                }
                Some(PacRoute {
                    patterns,
                    proxy: proxy.pac_directive(self.options.inline_credentials),
                    priority: proxy.priority,
                })
            })
            .collect()
    }

    pub fn direct_script() -> String {
        template::direct()
    }
}

// 从生成的脚本中取回路由表；直连脚本返回空表
pub fn extract_routes(script: &str) -> Result<Vec<PacRoute>> {
    let Some(assignment) = script
        .lines()
        .find_map(|line| line.strip_prefix(ROUTES_ASSIGNMENT))
    else {
        return Ok(Vec::new());
    };

    let literal = assignment
        .strip_suffix(';')
        .context("PAC 路由表赋值语句不完整")?;
    serde_json::from_str(literal).context("解析 PAC 路由表失败")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::atoms::shared_types::ProxyType;

    fn compiler() -> PacScriptCompiler {
        PacScriptCompiler::default()
    }

    #[test]
    fn container_mode_and_empty_pattern_proxies_are_dropped() {
        let proxies = vec![
            ProxyDefinition::new("c", ProxyType::Http, "c.proxy", 80).with_containers(["work"]),
            ProxyDefinition::new("empty", ProxyType::Http, "e.proxy", 80),
            ProxyDefinition::new("off", ProxyType::Http, "o.proxy", 80)
                .with_patterns(["*"])
                .disabled(),
        ];
        let script = compiler().compile(&proxies);
        assert_eq!(script, PacScriptCompiler::direct_script());
        assert!(extract_routes(&script).unwrap().is_empty());
    }

    #[test]
    fn routes_are_sorted_by_priority_with_directives() {
        let proxies = vec![
            ProxyDefinition::new("b", ProxyType::Socks5, "10.0.0.2", 1080)
                .with_priority(5)
                .with_patterns([".*"]),
            ProxyDefinition::new("a", ProxyType::Https, "secure.proxy", 443)
                .with_priority(1)
                .with_patterns([r"example\.com", "intranet"]),
            ProxyDefinition::new("c", ProxyType::Socks4, "10.0.0.3", 1080)
                .with_priority(5)
                .with_patterns(["legacy"]),
        ];

        let routes = extract_routes(&compiler().compile(&proxies)).unwrap();
        let directives: Vec<&str> = routes.iter().map(|route| route.proxy.as_str()).collect();
        assert_eq!(
            directives,
            vec!["HTTPS secure.proxy:443", "SOCKS5 10.0.0.2:1080", "SOCKS4 10.0.0.3:1080"]
        );
        assert_eq!(routes[0].patterns, vec![r"example\.com", "intranet"]);
    }

    #[test]
    fn credentials_are_inlined_only_when_requested() {
        let proxies = vec![
            ProxyDefinition::new("a", ProxyType::Http, "p", 3128)
                .with_patterns(["*"])
                .with_auth("user", "pw"),
        ];

        let plain = extract_routes(&compiler().compile(&proxies)).unwrap();
        assert_eq!(plain[0].proxy, "PROXY p:3128");

        let inline = PacScriptCompiler::new(CompileOptions {
            inline_credentials: true,
            ..CompileOptions::default()
        });
        let routes = extract_routes(&inline.compile(&proxies)).unwrap();
        assert_eq!(routes[0].proxy, "PROXY user:pw@p:3128");
    }

    #[test]
    fn unmatchable_patterns_are_left_out_of_the_script() {
        let proxies = vec![
            ProxyDefinition::new("mixed", ProxyType::Http, "m.proxy", 80)
                .with_priority(1)
                .with_patterns([r"example\.com|{", r"^ok\.example$", r"\Aexample\.com"]),
            ProxyDefinition::new("broken", ProxyType::Http, "b.proxy", 80)
                .with_priority(2)
                .with_patterns(["(unclosed", r"^(?P<n>x)$"]),
        ];

        let routes = extract_routes(&compiler().compile(&proxies)).unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].proxy, "PROXY m.proxy:80");
        assert_eq!(routes[0].patterns, vec![r"^ok\.example$"]);
    }

    #[test]
    fn disabled_master_switch_yields_direct_script() {
        let config = ProxyConfig::new(
            vec![ProxyDefinition::new("a", ProxyType::Http, "p", 80).with_patterns(["*"])],
            false,
        );
        assert_eq!(compiler().compile_config(&config), PacScriptCompiler::direct_script());
    }

    #[test]
    fn pattern_list_round_trips_through_the_script() {
        let patterns = vec![
            r"^(www\.)?example\.com$".to_string(),
            "intranet".to_string(),
            r"\.corp\.internal$".to_string(),
            "*".to_string(),
        ];
        let proxies =
            vec![ProxyDefinition::new("a", ProxyType::Http, "p", 80).with_patterns(patterns.clone())];

        let routes = extract_routes(&compiler().compile(&proxies)).unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].patterns, patterns);
    }
}
