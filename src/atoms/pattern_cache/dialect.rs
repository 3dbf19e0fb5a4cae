// 正则方言检查
//
// 进程内使用 regex 引擎，PAC 脚本使用 JS RegExp（"i" 标志，无 "u" 标志）。
// 下列写法 regex 能编译，但 JS 要么报错、要么按字面量理解，两边结果会不同，
// 因此在编译匹配器之前统一拒绝。

const RUST_ONLY_ESCAPES: &[char] = &['A', 'z', 'Z', 'p', 'P', 'Q', 'E', 'U', 'a', 'e', '<', '>'];
// 后面紧跟 "{" 时才是 regex 专有写法，例如 \x{41}、\b{start}
const BRACED_ESCAPES: &[char] = &['x', 'u', 'b', 'B'];
const INLINE_FLAGS: &[char] = &['i', 'm', 's', 'x', 'u', 'U', 'R', '-'];

// 返回第一个只有 regex 支持的写法；两边都能理解时返回 None
pub(crate) fn rust_only_construct(pattern: &str) -> Option<&'static str> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut in_class = false;
    let mut i = 0;

    while let Some(&c) = chars.get(i) {
        let next = chars.get(i + 1).copied();
        match c {
            '\\' => {
                let Some(escaped) = next else {
                    return None;
                };
                if RUST_ONLY_ESCAPES.contains(&escaped) {
                    return Some("转义序列");
                }
                if BRACED_ESCAPES.contains(&escaped) && chars.get(i + 2) == Some(&'{') {
                    return Some("花括号转义");
                }
                i += 2;
                continue;
            }
            '[' if in_class => return Some("嵌套字符类"),
            '[' => {
                in_class = true;
                i += 1;
                if chars.get(i) == Some(&'^') {
                    i += 1;
                }
                // JS 中 [] 是空字符类，regex 把紧随的 ] 当作字面量
                if chars.get(i) == Some(&']') {
                    return Some("以 ] 开头的字符类");
                }
                continue;
            }
            ']' if in_class => in_class = false,
            '&' | '-' | '~' if in_class && next == Some(c) => return Some("字符类集合运算"),
            '(' if !in_class && next == Some('?') => {
                let marker = chars.get(i + 2).copied();
                if marker.is_some_and(|m| INLINE_FLAGS.contains(&m) || m == 'P') {
                    return Some("内联标志或 (?P 分组");
                }
            }
            '{' if !in_class && next == Some(',') => return Some("省略下界的重复次数"),
            _ => {}
        }
        i += 1;
    }
    None
}
