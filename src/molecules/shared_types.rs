// 分子层共享类型定义
// 从 atoms 层重新导出基础类型，并添加解析结果与浏览器代理描述

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use crate::atoms::shared_types::{ProxyDefinition, ProxyType};

// 命中方式
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Container,
    Pattern,
    None,
}

// 单次路由请求
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRequest {
    pub hostname: String,
    pub container_id: Option<String>,
}

impl RoutingRequest {
    pub fn new(hostname: &str, container_id: Option<&str>) -> Self {
        Self {
            hostname: hostname.trim().to_lowercase(),
            container_id: container_id.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    // 额外计算两种模式下全部命中的代理（诊断用）
    pub include_all_matches: bool,
    // 跳过短时结果缓存，直接按当前快照计算
    pub bypass_cache: bool,
}

impl ResolveOptions {
    pub fn with_all_matches() -> Self {
        Self {
            include_all_matches: true,
            bypass_cache: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    pub selected_proxy: Option<Arc<ProxyDefinition>>,
    pub match_type: MatchType,
    pub all_matches: Option<Vec<Arc<ProxyDefinition>>>,
}

impl ResolutionResult {
    pub fn no_match() -> Self {
        Self {
            selected_proxy: None,
            match_type: MatchType::None,
            all_matches: None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.selected_proxy.is_some()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_proxy.as_deref().map(|proxy| proxy.id.as_str())
    }
}

// 浏览器逐请求代理接口使用的协议标签
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorType {
    Direct,
    Http,
    Https,
    // SOCKS5
    Socks,
    Socks4,
}

// 返回给浏览器的代理描述
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyDescriptor {
    #[serde(rename = "type")]
    pub descriptor_type: DescriptorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, rename = "proxyDNS", skip_serializing_if = "Option::is_none")]
    pub proxy_dns: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_authorization_header: Option<String>,
}

impl ProxyDescriptor {
    pub fn direct() -> Self {
        Self {
            descriptor_type: DescriptorType::Direct,
            host: None,
            port: None,
            proxy_dns: None,
            username: None,
            password: None,
            proxy_authorization_header: None,
        }
    }

    pub fn is_direct(&self) -> bool {
        self.descriptor_type == DescriptorType::Direct
    }

    // 按 PAC 指令语法输出，用于和生成脚本的结果对照
    pub fn to_pac_directive(&self) -> String {
        let keyword = match self.descriptor_type {
            DescriptorType::Direct => return "DIRECT".to_string(),
            DescriptorType::Http => "PROXY",
            DescriptorType::Https => "HTTPS",
            DescriptorType::Socks => "SOCKS5",
            DescriptorType::Socks4 => "SOCKS4",
        };

        match (&self.host, self.port) {
            (Some(host), Some(port)) => format!("{} {}:{}", keyword, host, port),
            _ => "DIRECT".to_string(),
        }
    }
}
