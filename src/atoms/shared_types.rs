// 原子层共享类型定义
// 代理定义、路由配置与引擎参数，供分子层共同使用

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::atoms::config_loader::deserialize_patterns;

// 配置文本格式
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    Json = 0,
    Yaml = 1,
}

// 上游代理协议
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    Http,
    Https,
    Socks4,
    Socks5,
}

impl ProxyType {
    pub fn scheme(self) -> &'static str {
        match self {
            ProxyType::Http => "http",
            ProxyType::Https => "https",
            ProxyType::Socks4 => "socks4",
            ProxyType::Socks5 => "socks5",
        }
    }

    // PAC 指令关键字
    pub fn pac_keyword(self) -> &'static str {
        match self {
            ProxyType::Http => "PROXY",
            ProxyType::Https => "HTTPS",
            ProxyType::Socks4 => "SOCKS4",
            ProxyType::Socks5 => "SOCKS5",
        }
    }

    pub fn is_socks(self) -> bool {
        matches!(self, ProxyType::Socks4 | ProxyType::Socks5)
    }
}

// 代理认证信息
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ProxyAuth {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// 路由方式：容器模式只看 containers，模式匹配只看 patterns
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutingConfig {
    pub use_container_mode: bool,
    #[serde(deserialize_with = "deserialize_patterns")]
    pub patterns: Vec<String>,
    pub containers: Vec<String>,
}

// 代理定义
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyDefinition {
    pub id: String,
    // 展示用字段，不参与路由
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub priority: i64,
    pub proxy_type: ProxyType,
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<ProxyAuth>,
    #[serde(default, rename = "proxyDNS", skip_serializing_if = "Option::is_none")]
    pub proxy_dns: Option<bool>,
    #[serde(default)]
    pub routing_config: RoutingConfig,
}

fn default_enabled() -> bool {
    true
}

impl ProxyDefinition {
    pub fn new(
        id: impl Into<String>,
        proxy_type: ProxyType,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            color: None,
            enabled: true,
            priority: 0,
            proxy_type,
            host: host.into(),
            port,
            auth: None,
            proxy_dns: None,
            routing_config: RoutingConfig::default(),
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.routing_config.use_container_mode = false;
        self.routing_config.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_containers<I, S>(mut self, containers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.routing_config.use_container_mode = true;
        self.routing_config.containers = containers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(ProxyAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_container_mode(&self) -> bool {
        self.routing_config.use_container_mode
    }

    // 当前生效的模式列表；容器模式下恒为空
    pub fn active_patterns(&self) -> &[String] {
        if self.is_container_mode() {
            &[]
        } else {
            &self.routing_config.patterns
        }
    }

    // 当前生效的容器列表；模式匹配下恒为空
    pub fn active_containers(&self) -> &[String] {
        if self.is_container_mode() {
            &self.routing_config.containers
        } else {
            &[]
        }
    }

    // 用户名为空视为未配置认证
    pub fn credentials(&self) -> Option<&ProxyAuth> {
        self.auth.as_ref().filter(|auth| !auth.username.is_empty())
    }

    // SOCKS 默认经代理解析 DNS；HTTP 类代理本身就在代理端解析
    pub fn resolves_dns_via_proxy(&self) -> bool {
        self.proxy_type.is_socks() && self.proxy_dns.unwrap_or(true)
    }

    // 统计聚合键：指向同一物理上游的定义共享同一个键
    pub fn aggregation_key(&self) -> String {
        format!(
            "{}://{}:{}",
            self.proxy_type.scheme(),
            self.host.to_lowercase(),
            self.port
        )
    }

    // PAC 指令，例如 "PROXY 10.0.0.1:8080"
    pub fn pac_directive(&self, inline_credentials: bool) -> String {
        let keyword = self.proxy_type.pac_keyword();
        match self.credentials().filter(|_| inline_credentials) {
            Some(auth) => format!(
                "{} {}:{}@{}:{}",
                keyword,
                urlencoding::encode(&auth.username),
                urlencoding::encode(&auth.password),
                self.host,
                self.port
            ),
            None => format!("{} {}:{}", keyword, self.host, self.port),
        }
    }
}

// 完整代理配置
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    #[serde(default)]
    pub proxies: Vec<ProxyDefinition>,
    #[serde(default)]
    pub proxy_enabled: bool,
}

impl ProxyConfig {
    pub fn new(proxies: Vec<ProxyDefinition>, proxy_enabled: bool) -> Self {
        Self {
            proxies,
            proxy_enabled,
        }
    }

    pub fn enabled_proxies(&self) -> impl Iterator<Item = &ProxyDefinition> {
        self.proxies.iter().filter(|proxy| proxy.enabled)
    }
}

// 容器匹配与模式匹配优先级相同时的裁决规则
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TieBreak {
    #[default]
    PreferContainer,
    PreferPattern,
}

// 引擎参数
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    pub regex_cache_capacity: usize,
    pub regex_cache_ttl_ms: u64,
    pub result_cache_enabled: bool,
    pub result_cache_capacity: usize,
    pub result_cache_ttl_ms: u64,
    pub pac_result_cache_capacity: usize,
    pub pac_regex_cache_capacity: usize,
    pub tie_break: TieBreak,
    pub pac_inline_credentials: bool,
    pub pac_verify_script: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            regex_cache_capacity: 1000,
            regex_cache_ttl_ms: 10 * 60 * 1000,
            result_cache_enabled: true,
            result_cache_capacity: 1000,
            result_cache_ttl_ms: 5_000,
            pac_result_cache_capacity: 500,
            pac_regex_cache_capacity: 200,
            tie_break: TieBreak::PreferContainer,
            pac_inline_credentials: false,
            pac_verify_script: true,
        }
    }
}

impl EngineSettings {
    pub fn regex_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.regex_cache_ttl_ms)
    }

    pub fn result_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.result_cache_ttl_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_list_is_ignored() {
        let mut proxy = ProxyDefinition::new("p", ProxyType::Http, "h", 80)
            .with_containers(["work"]);
        proxy.routing_config.patterns = vec![".*".to_string()];

        assert!(proxy.active_patterns().is_empty());
        assert_eq!(proxy.active_containers(), ["work".to_string()]);
    }

    #[test]
    fn pac_directive_inlines_encoded_credentials_only_on_request() {
        let proxy = ProxyDefinition::new("p", ProxyType::Socks5, "10.0.0.1", 1080)
            .with_auth("user@corp", "p:ss");

        assert_eq!(proxy.pac_directive(false), "SOCKS5 10.0.0.1:1080");
        assert_eq!(
            proxy.pac_directive(true),
            "SOCKS5 user%40corp:p%3Ass@10.0.0.1:1080"
        );
    }

    #[test]
    fn empty_username_means_no_credentials() {
        let proxy = ProxyDefinition::new("p", ProxyType::Http, "h", 80).with_auth("", "secret");
        assert!(proxy.credentials().is_none());
        assert_eq!(proxy.pac_directive(true), "PROXY h:80");
    }

    #[test]
    fn aggregation_key_groups_by_endpoint() {
        let a = ProxyDefinition::new("a", ProxyType::Socks5, "Proxy.Example", 1080);
        let b = ProxyDefinition::new("b", ProxyType::Socks5, "proxy.example", 1080);
        assert_eq!(a.aggregation_key(), "socks5://proxy.example:1080");
        assert_eq!(a.aggregation_key(), b.aggregation_key());
    }

    #[test]
    fn socks_defaults_to_remote_dns() {
        let socks = ProxyDefinition::new("s", ProxyType::Socks5, "h", 1080);
        let http = ProxyDefinition::new("h", ProxyType::Http, "h", 8080);
        assert!(socks.resolves_dns_via_proxy());
        assert!(!http.resolves_dns_via_proxy());
    }
}
