// 模式分类

// 生成的 PAC 脚本使用同一组字符判断字面量，两边必须保持一致
pub(crate) const REGEX_META_CHARS: &[char] = &[
    '\\', '^', '$', '.', '*', '+', '?', '(', ')', '[', ']', '{', '}', '|',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    // "*" 或 ".*"，匹配一切
    Universal,
    // 不含正则元字符，按大小写不敏感的完全相等比较
    Literal,
    Regex,
}

pub fn classify_pattern(pattern: &str) -> PatternKind {
    if is_universal(pattern) {
        PatternKind::Universal
    } else if pattern.contains(REGEX_META_CHARS) {
        PatternKind::Regex
    } else {
        PatternKind::Literal
    }
}

pub(crate) fn is_universal(pattern: &str) -> bool {
    pattern == "*" || pattern == ".*"
}

// 与 JS 的 toLowerCase() 比较语义一致，且不分配内存
pub(crate) fn literal_matches(hostname: &str, pattern: &str) -> bool {
    hostname
        .chars()
        .flat_map(char::to_lowercase)
        .eq(pattern.chars().flat_map(char::to_lowercase))
}
