// 配置加载与校验
//
// 在加载边界把模式值统一成字符串（裸字符串或 {value} 包装），
// 计算只覆盖路由相关字段的指纹，并在保存配置时校验模式。

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::atoms::pattern_cache::validate_pattern;
use crate::atoms::shared_types::{ConfigFormat, ProxyConfig};

#[derive(Deserialize)]
#[serde(untagged)]
enum PatternEntry {
    Plain(String),
    Wrapped { value: String },
}

impl PatternEntry {
    fn into_string(self) -> String {
        match self {
            PatternEntry::Plain(value) | PatternEntry::Wrapped { value } => value,
        }
    }
}

pub(crate) fn deserialize_patterns<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<PatternEntry>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries
        .into_iter()
        .map(|entry| entry.into_string().trim().to_string())
        .filter(|pattern| !pattern.is_empty())
        .collect())
}

pub fn load_config(content: &str, format: ConfigFormat) -> Result<ProxyConfig> {
    let config: ProxyConfig = match format {
        ConfigFormat::Json => serde_json::from_str(content).context("解析 JSON 代理配置失败")?,
        ConfigFormat::Yaml => {
            serde_yaml_ng::from_str(content).context("解析 YAML 代理配置失败")?
        }
    };

    log::debug!(
        "代理配置加载完成：{} 个代理，总开关 {}",
        config.proxies.len(),
        config.proxy_enabled
    );
    Ok(config)
}

// 路由指纹：名称、颜色等展示字段以及未生效的列表都不参与计算
pub fn fingerprint(config: &ProxyConfig) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.proxy_enabled.hash(&mut hasher);
    config.proxies.len().hash(&mut hasher);

    for proxy in &config.proxies {
        proxy.id.hash(&mut hasher);
        proxy.enabled.hash(&mut hasher);
        proxy.priority.hash(&mut hasher);
        proxy.proxy_type.hash(&mut hasher);
        proxy.host.hash(&mut hasher);
        proxy.port.hash(&mut hasher);
        proxy.auth.hash(&mut hasher);
        proxy.proxy_dns.hash(&mut hasher);
        proxy.routing_config.use_container_mode.hash(&mut hasher);
        proxy.active_patterns().hash(&mut hasher);
        proxy.active_containers().hash(&mut hasher);
    }

    hasher.finish()
}

// 保存前的配置校验，返回第一处问题
pub fn validate_config(config: &ProxyConfig) -> Result<()> {
    let mut seen_ids = HashSet::new();

    for proxy in &config.proxies {
        if proxy.id.is_empty() {
            bail!("代理 id 不能为空");
        }
        if !seen_ids.insert(proxy.id.as_str()) {
            bail!("代理 id 重复：{}", proxy.id);
        }
        if proxy.host.trim().is_empty() {
            bail!("代理 {} 缺少主机地址", proxy.id);
        }
        if proxy.port == 0 {
            bail!("代理 {} 端口无效", proxy.id);
        }

        for pattern in proxy.active_patterns() {
            validate_pattern(pattern)
                .with_context(|| format!("代理 {} 的匹配模式无效", proxy.id))?;
        }
    }

    Ok(())
}
