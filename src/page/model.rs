//! 页面聚合：有序区块列表 + 页面元信息

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::schema::Section;

/// 页面 ID（UUID 字符串）
pub type PageId = String;

/// 不能作为页面 slug 的路径（与站点其他路由冲突）
const RESERVED_SLUGS: [&str; 4] = ["api", "admin", "health", "static"];

/// SEO 附属信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaTags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// None 表示尚未保存
    #[serde(default)]
    pub id: Option<PageId>,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub meta_tags: MetaTags,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Page {
    /// 新建空白页面（未发布）
    pub fn new(title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            slug: slug.into(),
            description: String::new(),
            is_published: false,
            sections: Vec::new(),
            meta_tags: MetaTags::default(),
            created_at: None,
            updated_at: None,
        }
    }

    /// 用生成结果预填充的新页面；slug 由标题推导
    pub fn pre_populated(
        title: impl Into<String>,
        sections: Vec<Section>,
        meta_tags: MetaTags,
    ) -> Self {
        let title = title.into();
        let mut page = Self::new(title.clone(), slugify(&title));
        page.description = meta_tags.description.clone().unwrap_or_default();
        page.sections = sections;
        page.meta_tags = meta_tags;
        page
    }

    /// 标题与 slug 校验，返回可直接展示给运营者的描述
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is required".to_string());
        }
        validate_slug(&self.slug)
    }
}

fn slug_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").ok())
        .as_ref()
}

pub fn validate_slug(slug: &str) -> Result<(), String> {
    if slug.is_empty() {
        return Err("slug is required".to_string());
    }
    let well_formed = slug_pattern().map(|re| re.is_match(slug)).unwrap_or(false);
    if !well_formed {
        return Err(format!(
            "slug {:?} must use lowercase letters, digits and single hyphens",
            slug
        ));
    }
    if RESERVED_SLUGS.contains(&slug) {
        return Err(format!("slug {:?} is reserved", slug));
    }
    Ok(())
}

/// 标题 → slug：小写 ASCII 字母数字，其余字符折叠为单个连字符
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c.to_ascii_lowercase());
            pending_hyphen = false;
        } else {
            pending_hyphen = true;
        }
    }
    slug
}
