// PAC 脚本模板
//
// 模板是固定文本，用户数据只出现在 ROUTES_ASSIGNMENT 这一行的字面量中。
// 匹配规则必须与 atoms::pattern_cache 以及 request_hook 的快速路径保持一致。

pub(crate) const ROUTES_ASSIGNMENT: &str = "var PROXY_ROUTES = ";

const HEADER: &str = "// Generated proxy auto-config. Do not edit.\n";

const MATCHER_BODY: &str = r#"var resultCache = new Map();
var regexCache = new Map();
var REGEX_META = /[\\^$.*+?()[\]{}|]/;
var LOOPBACK_V4 = /^127\.\d{1,3}\.\d{1,3}\.\d{1,3}$/;

function touch(cache, key, value, limit) {
  if (cache.has(key)) {
    cache.delete(key);
  } else if (cache.size >= limit) {
    cache.delete(cache.keys().next().value);
  }
  cache.set(key, value);
  return value;
}

function isUniversal(pattern) {
  return pattern === "*" || pattern === ".*";
}

function compilePattern(pattern) {
  if (regexCache.has(pattern)) {
    return touch(regexCache, pattern, regexCache.get(pattern), REGEX_CACHE_LIMIT);
  }
  var compiled = null;
  try {
    compiled = new RegExp(pattern, "i");
  } catch (e) {
    compiled = null;
  }
  return touch(regexCache, pattern, compiled, REGEX_CACHE_LIMIT);
}

function testPattern(host, pattern) {
  if (isUniversal(pattern)) {
    return true;
  }
  if (!REGEX_META.test(pattern)) {
    return host === pattern.toLowerCase();
  }
  var matcher = compilePattern(pattern);
  if (matcher === null) {
    return false;
  }
  try {
    return matcher.test(host);
  } catch (e) {
    return false;
  }
}

function routeFor(host) {
  for (var i = 0; i < PROXY_ROUTES.length; i++) {
    var route = PROXY_ROUTES[i];
    var patterns = route.patterns;
    if (patterns.length === 1 && isUniversal(patterns[0])) {
      return route.proxy;
    }
    for (var j = 0; j < patterns.length; j++) {
      if (testPattern(host, patterns[j])) {
        return route.proxy;
      }
    }
  }
  return "DIRECT";
}

function isLoopback(host) {
  if (host === "localhost" || host === "::1" || host === "[::1]") {
    return true;
  }
  if (host.length > 10 && host.slice(-10) === ".localhost") {
    return true;
  }
  return LOOPBACK_V4.test(host);
}

function FindProxyForURL(url, host) {
  var scheme = String(url).split(":", 1)[0].toLowerCase();
  if (scheme !== "http" && scheme !== "https" && scheme !== "ws" && scheme !== "wss") {
    return "DIRECT";
  }
  var name = String(host).toLowerCase();
  if (name === "" || isLoopback(name)) {
    return "DIRECT";
  }
  if (resultCache.has(name)) {
    return touch(resultCache, name, resultCache.get(name), RESULT_CACHE_LIMIT);
  }
  return touch(resultCache, name, routeFor(name), RESULT_CACHE_LIMIT);
}
"#;

const DIRECT_SCRIPT: &str = r#"// Generated proxy auto-config. Do not edit.
function FindProxyForURL(url, host) {
  return "DIRECT";
}
"#;

// routes_literal 必须已经过 js_literal 编码
pub(crate) fn render(routes_literal: &str, result_cache_limit: usize, regex_cache_limit: usize) -> String {
    let mut script = String::with_capacity(HEADER.len() + routes_literal.len() + MATCHER_BODY.len() + 128);
    script.push_str(HEADER);
    script.push_str(ROUTES_ASSIGNMENT);
    script.push_str(routes_literal);
    script.push_str(";\n");
    script.push_str(&format!(
        "var RESULT_CACHE_LIMIT = {};\nvar REGEX_CACHE_LIMIT = {};\n",
        result_cache_limit.max(1),
        regex_cache_limit.max(1)
    ));
    script.push_str(MATCHER_BODY);
    script
}

pub(crate) fn direct() -> String {
    DIRECT_SCRIPT.to_string()
}
