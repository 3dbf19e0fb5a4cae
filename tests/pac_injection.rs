#![allow(clippy::unwrap_used)]

// 用户可编辑的字段只能作为数据出现在生成的脚本里

use proxy_router::atoms::is_matchable_pattern;
use proxy_router::molecules::CompileOptions;
use proxy_router::{
    PacSandbox, PacScriptCompiler, ProxyConfig, ProxyDefinition, ProxyType, extract_routes,
};

const HOSTILE: &[&str] = &[
    r#""; globalThis.pwned = 1; //"#,
    r#"'; globalThis.pwned = 1; //"#,
    r#"\"; globalThis.pwned = 1; //"#,
    "\\",
    "line\nbreak\r\nglobalThis.pwned = 1;",
    "sep\u{2028}globalThis.pwned = 1;\u{2029}",
    "</script><script>globalThis.pwned = 1</script>",
    "<!-- globalThis.pwned = 1 -->",
    "${globalThis.pwned = 1}",
    "`; globalThis.pwned = 1; `",
    "]}]; globalThis.pwned = 1; var PROXY_ROUTES = [{\"patterns\":[\"*\"],\"proxy\":\"PROXY evil:1\",\"priority\":0}]; //",
    "\u{0}\u{1}\u{1f}\u{7f}",
    "ümlaut 漢字 🚀",
];

fn hostile_config() -> ProxyConfig {
    let proxies = HOSTILE
        .iter()
        .enumerate()
        .map(|(i, hostile)| {
            ProxyDefinition::new(
                format!("p{}", i),
                ProxyType::Http,
                format!("h{}{}", i, hostile),
                8000 + i as u16,
            )
            .with_priority(i as i64)
            .with_patterns([hostile.to_string(), format!("^exact{}$", i)])
            .with_auth(*hostile, *hostile)
        })
        .collect();
    ProxyConfig::new(proxies, true)
}

fn inline_compiler() -> PacScriptCompiler {
    PacScriptCompiler::new(CompileOptions {
        inline_credentials: true,
        ..CompileOptions::default()
    })
}

fn benign_script() -> String {
    let config = ProxyConfig::new(
        vec![ProxyDefinition::new("ok", ProxyType::Http, "ok.proxy", 80).with_patterns(["*"])],
        true,
    );
    PacScriptCompiler::default().compile_config(&config)
}

fn is_data_line(line: &str) -> bool {
    line.starts_with("var PROXY_ROUTES = ")
}

#[test]
fn hostile_values_round_trip_through_the_data_literal() {
    let config = hostile_config();
    let script = inline_compiler().compile_config(&config);
    assert_ne!(script, PacScriptCompiler::direct_script());

    let routes = extract_routes(&script).unwrap();
    assert_eq!(routes.len(), HOSTILE.len());
    for (route, proxy) in routes.iter().zip(&config.proxies) {
        let matchable: Vec<String> = proxy
            .routing_config
            .patterns
            .iter()
            .filter(|pattern| is_matchable_pattern(pattern))
            .cloned()
            .collect();
        assert_eq!(route.patterns, matchable);
        assert_eq!(route.proxy, proxy.pac_directive(true));
        assert_eq!(route.priority, proxy.priority);
    }

    // 可编译的恶意字符串原样作为数据保留下来
    let hostile_patterns = routes.iter().flat_map(|route| &route.patterns);
    assert!(hostile_patterns.filter(|pattern| pattern.contains("pwned")).count() >= 4);
    assert!(routes.iter().any(|route| route.patterns[0] == "ümlaut 漢字 🚀"));
}

#[test]
fn only_the_data_line_differs_from_the_template() {
    let hostile = inline_compiler().compile_config(&hostile_config());
    let benign = benign_script();

    let hostile_logic: Vec<&str> = hostile.lines().filter(|line| !is_data_line(line)).collect();
    let benign_logic: Vec<&str> = benign.lines().filter(|line| !is_data_line(line)).collect();
    assert_eq!(hostile_logic, benign_logic);
    assert_eq!(hostile.lines().filter(|line| is_data_line(line)).count(), 1);

    assert!(hostile.is_ascii());
    assert!(!hostile.contains("</script"));
    assert!(!hostile.contains("<!--"));
    assert!(!hostile.contains('`'));
    assert!(!hostile.contains('\u{2028}'));
}

#[test]
fn loading_and_calling_has_no_side_effects() {
    let script = inline_compiler().compile_config(&hostile_config());
    let mut sandbox = PacSandbox::load(&script).unwrap();

    for host in ["exact0", "exact3", "example.com", "evil", "h1"] {
        sandbox.find_proxy(&format!("https://{}/", host), host).unwrap();
    }
    for hostile in HOSTILE {
        sandbox.find_proxy("https://x/", hostile).unwrap();
    }

    assert_eq!(sandbox.evaluate("typeof globalThis.pwned").unwrap(), "undefined");
    assert_eq!(
        sandbox.evaluate("PROXY_ROUTES.length").unwrap(),
        HOSTILE.len().to_string()
    );
}

#[test]
fn script_resolves_to_the_hostile_directive_verbatim() {
    let config = hostile_config();
    let script = inline_compiler().compile_config(&config);
    let mut sandbox = PacSandbox::load(&script).unwrap();

    // 第 4 个代理的 ^exact4$ 模式匹配，返回其完整指令
    let expected = config.proxies[4].pac_directive(true);
    let directive = sandbox.find_proxy("https://exact4/", "exact4").unwrap();
    assert_eq!(directive, expected);
}
