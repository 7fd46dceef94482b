//! HTML 片段拼接辅助

use crate::schema::{default_palette, SectionCommon, SectionKind};

/// 纯文本转义（标题、按钮文字、属性值）
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// 空串与纯空白视为缺失
pub fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// `<section>` 开标签，颜色缺失时用该种类的默认配色
pub fn open_section(kind: SectionKind, common: &SectionCommon) -> String {
    let (default_bg, default_fg) = default_palette(kind);
    let background = present(&common.background_color).unwrap_or(default_bg);
    let color = present(&common.text_color).unwrap_or(default_fg);
    format!(
        "<section class=\"section section-{}\" style=\"background-color:{};color:{}\">\n",
        kind,
        escape(background),
        escape(color)
    )
}

pub fn close_section() -> &'static str {
    "</section>\n"
}

/// 纯文本元素；字段缺失时输出空串
pub fn text_element(tag: &str, class: &str, field: &Option<String>) -> String {
    match present(field) {
        Some(text) => format!("<{tag} class=\"{class}\">{}</{tag}>\n", escape(text)),
        None => String::new(),
    }
}

/// 富文本元素：内容按已清洗的标记原样插入
pub fn markup_element(class: &str, field: &Option<String>) -> String {
    match present(field) {
        Some(_) => format!(
            "<div class=\"{class}\">{}</div>\n",
            field.as_deref().unwrap_or_default()
        ),
        None => String::new(),
    }
}

/// 链接按钮；文字或地址任一缺失都不输出
pub fn link_button(class: &str, text: &Option<String>, href: &Option<String>) -> String {
    match (present(text), present(href)) {
        (Some(text), Some(href)) => format!(
            "<a class=\"{class}\" href=\"{}\">{}</a>\n",
            escape(href),
            escape(text)
        ),
        _ => String::new(),
    }
}
