// 保存配置时的模式校验
//
// 匹配阶段无法中断正则执行，所以复杂度上限放在这里：
// 限制长度，并以与运行时相同的方言检查和编译上限试编译一次。

use anyhow::{Result, bail};

use super::cache::build_matcher;
use super::classifier::{PatternKind, classify_pattern};

pub(crate) const MAX_PATTERN_LEN: usize = 512;

pub fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern.trim().is_empty() {
        bail!("匹配模式不能为空");
    }
    if pattern.len() > MAX_PATTERN_LEN {
        bail!(
            "匹配模式过长（{} 字节，上限 {}）",
            pattern.len(),
            MAX_PATTERN_LEN
        );
    }

    if classify_pattern(pattern) == PatternKind::Regex {
        build_matcher(pattern)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_patterns() {
        assert!(validate_pattern("*").is_ok());
        assert!(validate_pattern("localhost").is_ok());
        assert!(validate_pattern(r"^(www\.)?example\.(com|org)$").is_ok());
    }

    #[test]
    fn rejects_broken_or_oversized_patterns() {
        assert!(validate_pattern("   ").is_err());
        assert!(validate_pattern("[a-").is_err());
        assert!(validate_pattern(&"a".repeat(MAX_PATTERN_LEN + 1)).is_err());
        // 展开后超过编译上限
        assert!(validate_pattern(r"(\w{100}){100}").is_err());
    }

    #[test]
    fn rejects_inline_flags_but_not_groups() {
        assert!(validate_pattern(r"(?i)example\.com").is_err());
        assert!(validate_pattern(r"^(?-u:\w)+$").is_err());
        assert!(validate_pattern(r"^(?:www\.)?example\.com$").is_ok());
        assert!(validate_pattern(r"\(?i\)").is_ok());
    }

    #[test]
    fn rejects_syntax_the_script_reads_differently() {
        for pattern in [
            r"\Aexample\.com",
            r"^[[a-z]]+\.com$",
            r"^[[:alpha:]]+\.net$",
            r"^(?P<n>example)\.com$",
            r"\p{L}+\.org$",
            r"^a{,3}\.io$",
        ] {
            assert!(validate_pattern(pattern).is_err(), "{}", pattern);
        }
    }
}
