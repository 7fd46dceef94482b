//! 区块默认值：新建区块、渲染回退与生成内容纠正都从这里取值

use super::section::{
    ContentSection, CtaSection, FeatureItem, FeaturesSection, HeroSection, HeroStyle, Section,
    SectionCommon, SectionKind, TestimonialItem, TestimonialsSection,
};

/// (背景色, 文字色)
pub fn default_palette(kind: SectionKind) -> (&'static str, &'static str) {
    match kind {
        SectionKind::Hero => ("#1f2937", "#ffffff"),
        SectionKind::Features => ("#ffffff", "#1f2937"),
        SectionKind::Content => ("#ffffff", "#374151"),
        SectionKind::Testimonials => ("#f9fafb", "#1f2937"),
        SectionKind::Cta => ("#2563eb", "#ffffff"),
    }
}

fn blank_common(kind: SectionKind) -> SectionCommon {
    let (background, text) = default_palette(kind);
    SectionCommon {
        title: Some(String::new()),
        subtitle: Some(String::new()),
        content: Some(String::new()),
        background_color: Some(background.to_string()),
        text_color: Some(text.to_string()),
        order: Some(0),
    }
}

/// 返回字段齐全的空白区块，永不失败
pub fn defaults_for(kind: SectionKind) -> Section {
    let common = blank_common(kind);
    match kind {
        SectionKind::Hero => Section::Hero(HeroSection {
            common,
            button_text: Some(String::new()),
            button_link: Some(String::new()),
            image_url: Some(String::new()),
            style: Some(HeroStyle::Default),
            images: Vec::new(),
        }),
        SectionKind::Features => Section::Features(FeaturesSection {
            common,
            items: Vec::new(),
        }),
        SectionKind::Content => Section::Content(ContentSection {
            common: SectionCommon {
                subtitle: None,
                ..common
            },
        }),
        SectionKind::Testimonials => Section::Testimonials(TestimonialsSection {
            common,
            items: Vec::new(),
        }),
        SectionKind::Cta => Section::Cta(CtaSection {
            common,
            button_text: Some(String::new()),
            button_link: Some(String::new()),
        }),
    }
}

pub fn blank_feature() -> FeatureItem {
    FeatureItem {
        title: Some(String::new()),
        content: Some(String::new()),
        icon: Some(String::new()),
    }
}

pub fn blank_testimonial() -> TestimonialItem {
    TestimonialItem {
        content: Some(String::new()),
        title: Some(String::new()),
        subtitle: Some(String::new()),
    }
}
