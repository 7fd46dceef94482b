//! 内容生成适配器：标题 + 简介 → 候选区块列表与 SEO 元信息
//!
//! 适配器不强制模式（提示词中的模式仅作参考），但会对回复做防御性处理：
//! - 从回复文本中提取第一个合法信封，失败时把原始回复随错误返回（生成已产生费用，不能静默丢弃）
//! - 条目数量与请求不符时只记录警告，原样接受
//! - 非法颜色替换为该种类默认配色；富文本与链接按配置清洗

pub mod extract;
pub mod prompt;
pub mod sanitize;

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::GenerationSection;
use crate::core::PageError;
use crate::llm::{CompletionRequest, LlmClient, Message};
use crate::page::MetaTags;
use crate::schema::{default_palette, Section, SectionCommon, SectionKind};

pub use extract::extract_first;
pub use sanitize::{sanitize_markup, sanitize_url};

/// 单次生成参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationOptions {
    /// None 时使用客户端默认模型
    pub model: Option<String>,
    pub max_tokens: u32,
    pub features_count: usize,
    pub testimonials_count: usize,
    pub cta_link: String,
    pub temperature: f32,
}

impl GenerationOptions {
    pub fn from_config(section: &GenerationSection) -> Self {
        Self {
            model: None,
            max_tokens: section.max_tokens,
            features_count: section.features_count,
            testimonials_count: section.testimonials_count,
            cta_link: section.cta_link.clone(),
            temperature: section.temperature,
        }
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::from_config(&GenerationSection::default())
    }
}

/// 接受生成结果时发现的问题（不阻断）；`section` 为区块在回复中的下标
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GenerationWarning {
    /// 条目数量与请求不一致
    #[serde(rename_all = "camelCase")]
    CountMismatch {
        section: usize,
        section_type: SectionKind,
        requested: usize,
        returned: usize,
    },
    /// 非法颜色已替换为默认值
    #[serde(rename_all = "camelCase")]
    InvalidColor {
        section: usize,
        field: String,
        value: String,
    },
    /// 富文本或链接被清洗过
    MarkupSanitized { section: usize },
    /// 已知种类但字段类型不符，整个区块被丢弃
    #[serde(rename_all = "camelCase")]
    SchemaMismatch {
        section: usize,
        section_type: SectionKind,
        reason: String,
    },
}

/// 生成结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPage {
    pub sections: Vec<Section>,
    pub meta_tags: MetaTags,
    pub warnings: Vec<GenerationWarning>,
}

/// 生成服务回复的信封
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    sections: Vec<Section>,
    #[serde(default)]
    meta_tags: MetaTags,
}

/// 页面生成器：持有可选的 LLM 客户端（未配置密钥时为 None）
#[derive(Clone)]
pub struct PageGenerator {
    llm: Option<Arc<dyn LlmClient>>,
    sanitize: bool,
}

impl PageGenerator {
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self {
            llm,
            sanitize: true,
        }
    }

    pub fn with_sanitize(mut self, sanitize: bool) -> Self {
        self.sanitize = sanitize;
        self
    }

    pub fn is_available(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn generate(
        &self,
        title: &str,
        brief: &str,
        options: &GenerationOptions,
    ) -> Result<GeneratedPage, PageError> {
        let llm = self.llm.as_ref().ok_or(PageError::GenerationUnavailable)?;
        if title.trim().is_empty() {
            return Err(PageError::InvalidInput("title must not be empty".to_string()));
        }
        if brief.trim().is_empty() {
            return Err(PageError::InvalidInput("brief must not be empty".to_string()));
        }

        let request = CompletionRequest {
            messages: vec![
                Message::system(prompt::system_prompt()),
                Message::user(prompt::user_prompt(title, brief, options)),
            ],
            model: options.model.clone(),
            max_tokens: Some(options.max_tokens),
            temperature: Some(options.temperature),
        };

        tracing::info!(
            "Generating page {:?} (features={}, testimonials={})",
            title.trim(),
            options.features_count,
            options.testimonials_count
        );
        let raw = llm.complete(&request).await.map_err(PageError::Llm)?;

        let envelope: Envelope = extract_first(&raw).map_err(|reason| {
            tracing::warn!("Generation response could not be parsed: {}", reason);
            PageError::MalformedResponse {
                reason,
                raw: raw.clone(),
            }
        })?;

        Ok(self.accept(envelope, options))
    }

    fn accept(&self, envelope: Envelope, options: &GenerationOptions) -> GeneratedPage {
        let Envelope {
            sections: candidates,
            mut meta_tags,
        } = envelope;
        let mut sections = Vec::with_capacity(candidates.len());
        let mut warnings = Vec::new();

        for (index, mut section) in candidates.into_iter().enumerate() {
            if let Some(warning) = check_schema(index, &section) {
                tracing::warn!("Generated section rejected: {:?}", warning);
                warnings.push(warning);
                continue;
            }
            if let Some(warning) = check_count(index, &section, options) {
                tracing::warn!("Generated section count mismatch: {:?}", warning);
                warnings.push(warning);
            }
            warnings.extend(fix_colors(index, &mut section));
            if self.sanitize && sanitize_section(&mut section) {
                warnings.push(GenerationWarning::MarkupSanitized { section: index });
            }
            sections.push(section);
        }
        if self.sanitize {
            if let Some(image) = meta_tags.og_image.as_mut() {
                *image = sanitize_url(image);
            }
        }

        tracing::info!(
            "Generated {} sections with {} warnings",
            sections.len(),
            warnings.len()
        );
        GeneratedPage {
            sections,
            meta_tags,
            warnings,
        }
    }
}

/// 已知种类的区块必须能按其模式解码；未知种类原样保留（渲染时跳过）
fn check_schema(index: usize, section: &Section) -> Option<GenerationWarning> {
    let Section::Unrecognized(raw) = section else {
        return None;
    };
    let (section_type, reason) = raw.schema_error()?;
    Some(GenerationWarning::SchemaMismatch {
        section: index,
        section_type,
        reason,
    })
}

fn check_count(
    index: usize,
    section: &Section,
    options: &GenerationOptions,
) -> Option<GenerationWarning> {
    let (kind, requested, returned) = match section {
        Section::Features(s) => (SectionKind::Features, options.features_count, s.items.len()),
        Section::Testimonials(s) => (
            SectionKind::Testimonials,
            options.testimonials_count,
            s.items.len(),
        ),
        _ => return None,
    };
    (requested != returned).then_some(GenerationWarning::CountMismatch {
        section: index,
        section_type: kind,
        requested,
        returned,
    })
}

fn color_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(#([0-9a-f]{3}|[0-9a-f]{4}|[0-9a-f]{6}|[0-9a-f]{8})|rgba?\(\s*[0-9.%\s,/]+\)|hsla?\(\s*[0-9.%deg\s,/]+\)|[a-z]+)$",
        )
        .ok()
    })
    .as_ref()
}

pub fn is_valid_color(value: &str) -> bool {
    color_pattern()
        .map(|re| re.is_match(value.trim()))
        .unwrap_or(false)
}

fn fix_colors(index: usize, section: &mut Section) -> Vec<GenerationWarning> {
    let Some(kind) = section.kind() else {
        return Vec::new();
    };
    let (default_bg, default_fg) = default_palette(kind);
    let Some(common) = section.common_mut() else {
        return Vec::new();
    };

    let mut warnings = Vec::new();
    for (field, slot, fallback) in [
        ("backgroundColor", &mut common.background_color, default_bg),
        ("textColor", &mut common.text_color, default_fg),
    ] {
        if let Some(value) = slot.as_ref().filter(|v| !is_valid_color(v)) {
            warnings.push(GenerationWarning::InvalidColor {
                section: index,
                field: field.to_string(),
                value: value.clone(),
            });
            *slot = Some(fallback.to_string());
        }
    }
    warnings
}

fn sanitize_field(field: &mut Option<String>, clean: fn(&str) -> String) -> bool {
    match field.as_mut() {
        Some(value) => {
            let cleaned = clean(value);
            let changed = cleaned != *value;
            *value = cleaned;
            changed
        }
        None => false,
    }
}

fn sanitize_common(common: &mut SectionCommon) -> bool {
    sanitize_field(&mut common.content, sanitize_markup)
}

/// 清洗一个区块的富文本与链接，返回是否有改动
fn sanitize_section(section: &mut Section) -> bool {
    match section {
        Section::Hero(s) => {
            let mut changed = sanitize_common(&mut s.common);
            changed |= sanitize_field(&mut s.button_link, sanitize_url);
            changed |= sanitize_field(&mut s.image_url, sanitize_url);
            for image in s.images.iter_mut() {
                let cleaned = sanitize_url(image);
                changed |= cleaned != *image;
                *image = cleaned;
            }
            changed
        }
        Section::Features(s) => {
            let mut changed = sanitize_common(&mut s.common);
            for item in s.items.iter_mut() {
                changed |= sanitize_field(&mut item.content, sanitize_markup);
            }
            changed
        }
        Section::Testimonials(s) => {
            let mut changed = sanitize_common(&mut s.common);
            for item in s.items.iter_mut() {
                changed |= sanitize_field(&mut item.content, sanitize_markup);
            }
            changed
        }
        Section::Content(s) => sanitize_common(&mut s.common),
        Section::Cta(s) => {
            let mut changed = sanitize_common(&mut s.common);
            changed |= sanitize_field(&mut s.button_link, sanitize_url);
            changed
        }
        Section::Unrecognized(_) => false,
    }
}
