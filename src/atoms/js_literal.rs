// 脚本数据字面量编码
//
// 生成脚本中唯一承载用户数据的位置。先序列化为 JSON，再把所有非 ASCII 可打印字符
// 以及 < > & ' ` 改写为 \uXXXX，保证输出只含 ASCII，
// 在任何 JS 引擎、任何嵌入位置都只能被解析为数据。

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write;

pub fn to_js_literal<T>(value: &T) -> Result<String>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string(value).context("序列化脚本数据失败")?;
    Ok(escape_json_for_script(&json))
}

// 这些字符在 JSON 中只会出现在字符串内部，改写后语义不变
fn escape_json_for_script(json: &str) -> String {
    let mut out = String::with_capacity(json.len() + json.len() / 8);
    let mut units = [0u16; 2];

    for ch in json.chars() {
        match ch {
            '<' | '>' | '&' | '\'' | '`' => push_unit(&mut out, ch as u16),
            ' '..='~' => out.push(ch),
            _ => {
                for unit in ch.encode_utf16(&mut units) {
                    push_unit(&mut out, *unit);
                }
            }
        }
    }
    out
}

fn push_unit(out: &mut String, unit: u16) {
    let _ = write!(out, "\\u{:04x}", unit);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn output_is_printable_ascii() {
        let literal = to_js_literal(&["a\u{2028}b\u{2029}c", "😀", "\u{0}\u{7f}", "é"]).unwrap();
        assert!(literal.chars().all(|c| (' '..='~').contains(&c)));
        assert!(literal.contains(r"\u2028"));
        assert!(literal.contains(r"\u2029"));
        assert!(literal.contains(r"\ud83d\ude00"));
        assert!(literal.contains(r"\u007f"));
    }

    #[test]
    fn markup_and_quote_characters_are_escaped() {
        let literal = to_js_literal("</script><!--'`${x}&").unwrap();
        assert!(!literal.contains('<'));
        assert!(!literal.contains('>'));
        assert!(!literal.contains('\''));
        assert!(!literal.contains('`'));
        assert!(!literal.contains('&'));
    }

    #[test]
    fn escaped_literal_parses_back_to_the_original() {
        let original = vec![
            "\"; alert(1); //".to_string(),
            "back\\slash\nnew\rline\ttab".to_string(),
            "</script><script>globalThis.pwned = 1</script>".to_string(),
            "${globalThis.pwned = 1}`".to_string(),
            "混合 content 🚀".to_string(),
        ];
        let literal = to_js_literal(&original).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&literal).unwrap();
        assert_eq!(parsed, original);
    }
}
