//! 结构化模型与文本视图之间的两个纯投影
//!
//! - `to_text`：区块列表 → 缩进 JSON 文本（整体重新生成，从不局部合并）
//! - `from_text`：文本 → 区块列表；只要求是对象数组且每个对象带字符串 type

use serde_json::Value;
use thiserror::Error;

use crate::schema::Section;

/// 文本视图解析失败（仅在文本编辑器本地呈现，不向模型传播）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", self.describe())]
pub struct ParseError {
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub message: String,
}

impl ParseError {
    fn message(message: impl Into<String>) -> Self {
        Self {
            line: None,
            column: None,
            message: message.into(),
        }
    }

    fn describe(&self) -> String {
        match (self.line, self.column) {
            (Some(line), Some(column)) => {
                format!("line {}, column {}: {}", line, column, self.message)
            }
            _ => self.message.clone(),
        }
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        Self {
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        }
    }
}

pub fn to_text(sections: &[Section]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(sections)
}

pub fn from_text(text: &str) -> Result<Vec<Section>, ParseError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(records) = value else {
        return Err(ParseError::message("expected a JSON array of sections"));
    };
    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            Section::from_value(record)
                .map_err(|e| ParseError::message(format!("section #{}: {}", i + 1, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        defaults_for, FeatureItem, FeaturesSection, HeroSection, HeroStyle, SectionCommon,
        SectionKind, TestimonialItem, TestimonialsSection,
    };

    #[test]
    fn test_round_trip_preserves_every_schema_field() {
        let sections = vec![
            Section::Hero(HeroSection {
                common: SectionCommon {
                    title: Some("Hi".into()),
                    subtitle: Some("there".into()),
                    content: Some("<p>x</p>".into()),
                    background_color: Some("#000".into()),
                    text_color: Some("#fff".into()),
                    order: Some(4),
                },
                button_text: Some("Go".into()),
                button_link: Some("/go".into()),
                image_url: Some("/hero.png".into()),
                style: Some(HeroStyle::Carousel),
                images: vec!["/1.png".into(), "/2.png".into()],
            }),
            Section::Features(FeaturesSection {
                common: SectionCommon::default(),
                items: vec![FeatureItem {
                    title: Some("Fast".into()),
                    content: None,
                    icon: Some("bolt".into()),
                }],
            }),
            Section::Testimonials(TestimonialsSection {
                common: SectionCommon {
                    order: Some(-2),
                    ..Default::default()
                },
                items: vec![TestimonialItem {
                    content: Some("Great".into()),
                    title: Some("Ann".into()),
                    subtitle: Some("CTO".into()),
                }],
            }),
            defaults_for(SectionKind::Content),
            defaults_for(SectionKind::Cta),
        ];

        let text = to_text(&sections).unwrap();
        assert_eq!(from_text(&text).unwrap(), sections);
    }

    #[test]
    fn test_syntax_error_reports_position() {
        let err = from_text("{not valid json").unwrap_err();
        assert_eq!(err.line, Some(1));
        assert!(err.column.is_some());
    }

    #[test]
    fn test_top_level_must_be_array() {
        let err = from_text(r#"{"type": "hero"}"#).unwrap_err();
        assert!(err.message.contains("array"));
        assert_eq!(err.to_string(), err.message);
    }

    #[test]
    fn test_display_includes_position() {
        let err = from_text("[\n  {\"type\": \"hero\",\n}").unwrap_err();
        let shown = err.to_string();
        assert!(shown.starts_with(&format!("line {}, column ", err.line.unwrap())));
        assert!(shown.ends_with(&err.message));
        let _: &dyn std::error::Error = &err;
    }

    #[test]
    fn test_record_without_type_is_rejected() {
        let err = from_text(r#"[{"type": "hero"}, {"title": "orphan"}]"#).unwrap_err();
        assert!(err.message.contains("#2"));
    }

    #[test]
    fn test_empty_array_is_valid() {
        assert!(from_text("[]").unwrap().is_empty());
    }
}
