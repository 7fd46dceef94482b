//! 生成内容的清洗：渲染器信任富文本，所以外部生成的标记在接收时清洗
//!
//! 富文本走白名单（ammonia）：只保留常见排版标签与安全属性，
//! 实体编码后的 javascript: 等协议在解析后同样会被去掉。

use std::collections::HashSet;
use std::sync::OnceLock;

use ammonia::Builder;

/// 生成内容允许出现的标签
const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "blockquote", "br", "code", "em", "h2", "h3", "h4", "hr", "i", "img", "li", "ol",
    "p", "pre", "span", "strong", "u", "ul",
];

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

fn cleaner() -> &'static Builder<'static> {
    static BUILDER: OnceLock<Builder<'static>> = OnceLock::new();
    BUILDER.get_or_init(|| {
        let mut builder = Builder::default();
        builder
            .tags(ALLOWED_TAGS.iter().copied().collect::<HashSet<_>>())
            .url_schemes(ALLOWED_SCHEMES.iter().copied().collect::<HashSet<_>>())
            .link_rel(None);
        builder
    })
}

/// 清洗富文本标记；返回清洗后的文本
pub fn sanitize_markup(markup: &str) -> String {
    cleaner().clean(markup).to_string()
}

/// 链接字段：只放行相对地址与白名单协议，其余替换为 `#`
///
/// 浏览器解析 URL 时会忽略其中的空白与控制字符，判断协议前先去掉它们。
pub fn sanitize_url(url: &str) -> String {
    let compact: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    let scheme = compact
        .split_once(':')
        .map(|(scheme, _)| scheme)
        .filter(|scheme| !scheme.contains(|c| matches!(c, '/' | '?' | '#')));
    match scheme {
        Some(scheme) if !ALLOWED_SCHEMES.contains(&scheme) => "#".to_string(),
        _ => url.to_string(),
    }
}
