//! 区块类型定义
//!
//! Section 是封闭的和类型：每种区块一个变体，外加 Unrecognized 原样保留未知 / 字段不合法的记录。
//! 线上格式为 camelCase JSON，`type` 字段作为标签。

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::de::{self, Deserializer};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 区块种类（不含 Unrecognized）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Hero,
    Features,
    Content,
    Testimonials,
    Cta,
}

impl SectionKind {
    pub const ALL: [SectionKind; 5] = [
        SectionKind::Hero,
        SectionKind::Features,
        SectionKind::Content,
        SectionKind::Testimonials,
        SectionKind::Cta,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Hero => "hero",
            SectionKind::Features => "features",
            SectionKind::Content => "content",
            SectionKind::Testimonials => "testimonials",
            SectionKind::Cta => "cta",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown section kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for SectionKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// 列表字段：null 与缺失同样视为空列表
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// 所有区块共有的可选字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SectionCommon {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// 富文本（已是 HTML 标记）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    /// 展示顺序；允许缺失、重复、不连续
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

/// Hero 展示方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HeroStyle {
    #[default]
    Default,
    Carousel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeroSection {
    #[serde(flatten)]
    pub common: SectionCommon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<HeroStyle>,
    /// 仅 style = carousel 时有意义
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub images: Vec<String>,
}

impl HeroSection {
    pub fn is_carousel(&self) -> bool {
        self.style == Some(HeroStyle::Carousel)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeatureItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeaturesSection {
    #[serde(flatten)]
    pub common: SectionCommon,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub items: Vec<FeatureItem>,
}

/// 客户评价：content 为评价正文，title 为署名，subtitle 为身份 / 公司
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialsSection {
    #[serde(flatten)]
    pub common: SectionCommon,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub items: Vec<TestimonialItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentSection {
    #[serde(flatten)]
    pub common: SectionCommon,
}

/// CTA：button_text 与 button_link 同时存在时才渲染链接
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CtaSection {
    #[serde(flatten)]
    pub common: SectionCommon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_link: Option<String>,
}

/// 无法识别的记录：保留原始 JSON 对象（含 type），序列化时原样写回
#[derive(Debug, Clone, PartialEq)]
pub struct RawSection {
    pub kind: String,
    pub fields: Map<String, Value>,
}

impl RawSection {
    /// type 是已知种类但字段不合法时，返回该种类与解码错误；真正未知的种类返回 None
    pub fn schema_error(&self) -> Option<(SectionKind, String)> {
        let known = self.kind.parse::<SectionKind>().ok()?;
        decode_known(known, Value::Object(self.fields.clone()))
            .err()
            .map(|e| (known, e.to_string()))
    }
}

fn decode_known(kind: SectionKind, body: Value) -> Result<Section, serde_json::Error> {
    match kind {
        SectionKind::Hero => serde_json::from_value(body).map(Section::Hero),
        SectionKind::Features => serde_json::from_value(body).map(Section::Features),
        SectionKind::Content => serde_json::from_value(body).map(Section::Content),
        SectionKind::Testimonials => serde_json::from_value(body).map(Section::Testimonials),
        SectionKind::Cta => serde_json::from_value(body).map(Section::Cta),
    }
}

/// 单个页面区块
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Hero(HeroSection),
    Features(FeaturesSection),
    Content(ContentSection),
    Testimonials(TestimonialsSection),
    Cta(CtaSection),
    Unrecognized(RawSection),
}

/// 记录不满足通用容器约束（对象 + 字符串 type）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SectionShapeError {
    #[error("section must be a JSON object")]
    NotAnObject,
    #[error("section is missing a string \"type\" field")]
    MissingType,
}

impl Section {
    /// 从 JSON 值解码。已知种类但字段类型不符时降级为 Unrecognized，不丢数据
    pub fn from_value(value: Value) -> Result<Self, SectionShapeError> {
        let Value::Object(fields) = value else {
            return Err(SectionShapeError::NotAnObject);
        };
        let kind = match fields.get("type") {
            Some(Value::String(k)) => k.clone(),
            _ => return Err(SectionShapeError::MissingType),
        };
        let Ok(known) = kind.parse::<SectionKind>() else {
            return Ok(Section::Unrecognized(RawSection { kind, fields }));
        };

        match decode_known(known, Value::Object(fields.clone())) {
            Ok(section) => Ok(section),
            Err(e) => {
                tracing::debug!("section of kind {} kept opaque: {}", kind, e);
                Ok(Section::Unrecognized(RawSection { kind, fields }))
            }
        }
    }

    pub fn kind(&self) -> Option<SectionKind> {
        match self {
            Section::Hero(_) => Some(SectionKind::Hero),
            Section::Features(_) => Some(SectionKind::Features),
            Section::Content(_) => Some(SectionKind::Content),
            Section::Testimonials(_) => Some(SectionKind::Testimonials),
            Section::Cta(_) => Some(SectionKind::Cta),
            Section::Unrecognized(_) => None,
        }
    }

    /// `type` 字段的原始字符串
    pub fn type_name(&self) -> &str {
        match self {
            Section::Unrecognized(raw) => &raw.kind,
            other => other.kind().map(|k| k.as_str()).unwrap_or_default(),
        }
    }

    pub fn common(&self) -> Option<&SectionCommon> {
        match self {
            Section::Hero(s) => Some(&s.common),
            Section::Features(s) => Some(&s.common),
            Section::Content(s) => Some(&s.common),
            Section::Testimonials(s) => Some(&s.common),
            Section::Cta(s) => Some(&s.common),
            Section::Unrecognized(_) => None,
        }
    }

    pub fn common_mut(&mut self) -> Option<&mut SectionCommon> {
        match self {
            Section::Hero(s) => Some(&mut s.common),
            Section::Features(s) => Some(&mut s.common),
            Section::Content(s) => Some(&mut s.common),
            Section::Testimonials(s) => Some(&mut s.common),
            Section::Cta(s) => Some(&mut s.common),
            Section::Unrecognized(_) => None,
        }
    }

    pub fn order(&self) -> Option<i64> {
        match self {
            Section::Unrecognized(raw) => raw.fields.get("order").and_then(Value::as_i64),
            other => other.common().and_then(|c| c.order),
        }
    }

    pub fn set_order(&mut self, order: i64) {
        match self {
            Section::Unrecognized(raw) => {
                raw.fields.insert("order".to_string(), Value::from(order));
            }
            other => {
                if let Some(common) = other.common_mut() {
                    common.order = Some(order);
                }
            }
        }
    }
}

impl Serialize for Section {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let body = match self {
            Section::Hero(s) => serde_json::to_value(s),
            Section::Features(s) => serde_json::to_value(s),
            Section::Content(s) => serde_json::to_value(s),
            Section::Testimonials(s) => serde_json::to_value(s),
            Section::Cta(s) => serde_json::to_value(s),
            Section::Unrecognized(raw) => return raw.fields.serialize(serializer),
        }
        .map_err(ser::Error::custom)?;

        let mut map = Map::new();
        map.insert("type".to_string(), Value::String(self.type_name().to_string()));
        if let Value::Object(fields) = body {
            map.extend(fields);
        }
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Section {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Section::from_value(value).map_err(de::Error::custom)
    }
}
