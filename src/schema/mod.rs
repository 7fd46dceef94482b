//! 区块模式：区块种类、字段、默认值与展示顺序

pub mod defaults;
pub mod order;
pub mod section;

pub use defaults::{blank_feature, blank_testimonial, default_palette, defaults_for};
pub use order::{display_order, is_dense, normalize_orders, sort_by_order};
pub use section::{
    ContentSection, CtaSection, FeatureItem, FeaturesSection, HeroSection, HeroStyle, RawSection,
    Section, SectionCommon, SectionKind, SectionShapeError, TestimonialItem, TestimonialsSection,
    UnknownKind,
};

/// 各区块种类的 JSON Schema（仅作提示用途，生成提示词中引用）
pub fn advisory_schema() -> serde_json::Value {
    serde_json::json!({
        "hero": schemars::schema_for!(HeroSection),
        "features": schemars::schema_for!(FeaturesSection),
        "content": schemars::schema_for!(ContentSection),
        "testimonials": schemars::schema_for!(TestimonialsSection),
        "cta": schemars::schema_for!(CtaSection),
    })
}
