//! 生成提示词：模式仅作提示，真正的校验在回复解析阶段

use super::GenerationOptions;
use crate::schema::advisory_schema;

pub fn system_prompt() -> String {
    let schema = serde_json::to_string_pretty(&advisory_schema()).unwrap_or_default();
    format!(
        r##"You are a website copywriter and page designer.
Reply with a single JSON object and nothing else, shaped as:
{{
  "sections": [ ...section objects... ],
  "metaTags": {{ "description": "...", "keywords": "...", "ogTitle": "...", "ogDescription": "..." }}
}}
Every section object has a "type" field, one of: hero, features, content, testimonials, cta.
Use camelCase field names. Colors are CSS hex values such as "#1f2937".
Rich text goes in "content" as simple HTML (p, h3, ul, li, strong, em, a). Never include scripts.
Give each section an integer "order" starting at 0.
Field reference per section type (JSON Schema):
{schema}"##
    )
}

pub fn user_prompt(title: &str, brief: &str, options: &GenerationOptions) -> String {
    format!(
        r#"Create a landing page titled "{title}".

Brief:
{brief}

Requirements:
- Start with a hero section.
- Include one features section with exactly {features} items (each with title, content and an icon name).
- Include one testimonials section with exactly {testimonials} items (content = quote, title = name, subtitle = role).
- Include at least one content section.
- End with a cta section whose buttonLink is "{cta_link}".
- Any hero buttonLink should also be "{cta_link}".
- Fill metaTags for search engines and social previews."#,
        title = title.trim(),
        brief = brief.trim(),
        features = options.features_count,
        testimonials = options.testimonials_count,
        cta_link = options.cta_link,
    )
}
