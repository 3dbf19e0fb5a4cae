// 进程内逐请求代理回调
//
// 对每个请求执行与 PAC 脚本相同的快速路径和解析逻辑，
// 并把胜出的代理翻译成浏览器代理接口的描述结构。
// 这里的任何失败都退化为直连，否则会中断全部浏览。

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use url::Url;

use crate::atoms::shared_types::{ProxyDefinition, ProxyType};
use crate::molecules::resolver::ProxyResolver;
use crate::molecules::shared_types::{
    DescriptorType, MatchType, ProxyDescriptor, ResolutionResult, ResolveOptions,
};

const PROXIED_SCHEMES: &[&str] = &["http", "https", "ws", "wss"];

// 浏览器传入的请求上下文
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetails {
    pub url: String,
    #[serde(default, alias = "cookieStoreId")]
    pub container_id: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

impl RequestDetails {
    pub fn new(url: impl Into<String>, container_id: Option<&str>) -> Self {
        Self {
            url: url.into(),
            container_id: container_id.map(str::to_string),
            request_id: None,
        }
    }
}

pub struct RequestHook {
    resolver: Arc<ProxyResolver>,
}

impl RequestHook {
    pub fn new(resolver: Arc<ProxyResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Arc<ProxyResolver> {
        &self.resolver
    }

    pub fn on_request(&self, details: &RequestDetails) -> ProxyDescriptor {
        self.on_request_detailed(details).0
    }

    // 同时返回解析结果，供流量统计与标签页徽标使用
    pub fn on_request_detailed(
        &self,
        details: &RequestDetails,
    ) -> (ProxyDescriptor, ResolutionResult) {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.decide(details)));
        match outcome {
            Ok(Ok(decision)) => decision,
            Ok(Err(reason)) => {
                log::warn!(
                    "请求 {} 代理决策失败，按直连处理：{}",
                    details.request_id.as_deref().unwrap_or("-"),
                    reason
                );
                (ProxyDescriptor::direct(), ResolutionResult::no_match())
            }
            Err(_) => {
                log::error!(
                    "请求 {} 代理决策发生内部错误，按直连处理",
                    details.request_id.as_deref().unwrap_or("-")
                );
                (ProxyDescriptor::direct(), ResolutionResult::no_match())
            }
        }
    }

    fn decide(&self, details: &RequestDetails) -> Result<(ProxyDescriptor, ResolutionResult), String> {
        let url = Url::parse(&details.url).map_err(|e| format!("无法解析 URL {}：{}", details.url, e))?;

        if !PROXIED_SCHEMES.contains(&url.scheme()) {
            return Ok((ProxyDescriptor::direct(), ResolutionResult::no_match()));
        }

        let host = request_host(&url).ok_or_else(|| format!("URL 缺少主机名：{}", details.url))?;
        if is_loopback_host(&host) {
            return Ok((ProxyDescriptor::direct(), ResolutionResult::no_match()));
        }

        let result = self.resolver.resolve(
            &host,
            details.container_id.as_deref(),
            ResolveOptions::default(),
        );

        let descriptor = match (&result.selected_proxy, result.match_type) {
            (Some(proxy), MatchType::Container | MatchType::Pattern) => descriptor_for(proxy)?,
            _ => ProxyDescriptor::direct(),
        };
        Ok((descriptor, result))
    }
}

// 把代理定义翻译为浏览器描述。
// 认证只附加在平台支持的组合上：SOCKS5 用户名密码，HTTP(S) 授权头，SOCKS4 不支持。
pub fn descriptor_for(proxy: &ProxyDefinition) -> Result<ProxyDescriptor, String> {
    if proxy.host.trim().is_empty() {
        return Err(format!("代理 {} 缺少主机地址", proxy.id));
    }
    if proxy.port == 0 {
        return Err(format!("代理 {} 端口无效", proxy.id));
    }

    let mut descriptor = ProxyDescriptor {
        descriptor_type: match proxy.proxy_type {
            ProxyType::Http => DescriptorType::Http,
            ProxyType::Https => DescriptorType::Https,
            ProxyType::Socks4 => DescriptorType::Socks4,
            ProxyType::Socks5 => DescriptorType::Socks,
        },
        host: Some(proxy.host.clone()),
        port: Some(proxy.port),
        proxy_dns: proxy
            .proxy_type
            .is_socks()
            .then(|| proxy.resolves_dns_via_proxy()),
        username: None,
        password: None,
        proxy_authorization_header: None,
    };

    if let Some(auth) = proxy.credentials() {
        match proxy.proxy_type {
            ProxyType::Socks5 => {
                descriptor.username = Some(auth.username.clone());
                descriptor.password = Some(auth.password.clone());
            }
            ProxyType::Http | ProxyType::Https => {
                let token = STANDARD.encode(format!("{}:{}", auth.username, auth.password));
                descriptor.proxy_authorization_header = Some(format!("Basic {}", token));
            }
            ProxyType::Socks4 => {}
        }
    }

    Ok(descriptor)
}

// IPv6 主机去掉方括号，与 PAC 入参形式一致
fn request_host(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let host = host
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

// 与生成脚本中的 isLoopback 逐条对应
pub(crate) fn is_loopback_host(host: &str) -> bool {
    if host == "localhost" || host == "::1" || host == "[::1]" {
        return true;
    }
    if host.len() > 10 && host.ends_with(".localhost") {
        return true;
    }

    let octets: Vec<&str> = host.split('.').collect();
    octets.len() == 4
        && octets[0] == "127"
        && octets[1..]
            .iter()
            .all(|octet| (1..=3).contains(&octet.len()) && octet.bytes().all(|b| b.is_ascii_digit()))
}
