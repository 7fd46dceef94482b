//! 各种类区块的渲染器
//!
//! 每个渲染器只读取本种类关心的字段，缺失字段一律回退为「不输出」，不会失败。

use super::html::{
    close_section, escape, link_button, markup_element, open_section, present, text_element,
};
use crate::schema::{
    ContentSection, CtaSection, FeaturesSection, HeroSection, SectionKind, TestimonialsSection,
};

pub fn render_hero(hero: &HeroSection) -> String {
    let mut html = open_section(SectionKind::Hero, &hero.common);
    html.push_str("<div class=\"hero-inner\">\n");
    html.push_str(&text_element("h1", "hero-title", &hero.common.title));
    html.push_str(&text_element("p", "hero-subtitle", &hero.common.subtitle));
    html.push_str(&markup_element("hero-content", &hero.common.content));
    html.push_str(&link_button("hero-button", &hero.button_text, &hero.button_link));
    html.push_str("</div>\n");

    if hero.is_carousel() {
        html.push_str(&render_carousel(&hero.images));
    } else if let Some(url) = present(&hero.image_url) {
        html.push_str(&format!(
            "<div class=\"hero-image\"><img src=\"{}\" alt=\"\"></div>\n",
            escape(url)
        ));
    }

    html.push_str(close_section());
    html
}

/// 轮播：仅在多于一张图时输出左右箭头与圆点指示器
fn render_carousel(images: &[String]) -> String {
    let slides: Vec<&str> = images
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let mut html = format!(
        "<div class=\"hero-carousel\" data-slides=\"{}\">\n",
        slides.len()
    );
    for (i, url) in slides.iter().enumerate() {
        let active = if i == 0 { " active" } else { "" };
        html.push_str(&format!(
            "<div class=\"hero-slide{}\"><img src=\"{}\" alt=\"\"></div>\n",
            active,
            escape(url)
        ));
    }
    if slides.len() > 1 {
        html.push_str("<button class=\"carousel-prev\" aria-label=\"Previous\">&#8249;</button>\n");
        html.push_str("<button class=\"carousel-next\" aria-label=\"Next\">&#8250;</button>\n");
        html.push_str("<div class=\"carousel-dots\">\n");
        for i in 0..slides.len() {
            html.push_str(&format!(
                "<button class=\"carousel-dot\" data-index=\"{}\"></button>\n",
                i
            ));
        }
        html.push_str("</div>\n");
    }
    html.push_str("</div>\n");
    html
}

pub fn render_features(features: &FeaturesSection) -> String {
    let mut html = open_section(SectionKind::Features, &features.common);
    html.push_str(&text_element("h2", "section-title", &features.common.title));
    html.push_str(&text_element("p", "section-subtitle", &features.common.subtitle));
    html.push_str(&markup_element("section-content", &features.common.content));

    if !features.items.is_empty() {
        html.push_str("<div class=\"features-grid\">\n");
        for item in &features.items {
            html.push_str("<div class=\"feature\">\n");
            if let Some(icon) = present(&item.icon) {
                html.push_str(&format!(
                    "<span class=\"feature-icon\">{}</span>\n",
                    escape(icon)
                ));
            }
            html.push_str(&text_element("h3", "feature-title", &item.title));
            html.push_str(&markup_element("feature-content", &item.content));
            html.push_str("</div>\n");
        }
        html.push_str("</div>\n");
    }

    html.push_str(close_section());
    html
}

pub fn render_content(content: &ContentSection) -> String {
    let mut html = open_section(SectionKind::Content, &content.common);
    html.push_str(&text_element("h2", "section-title", &content.common.title));
    html.push_str(&markup_element("section-content", &content.common.content));
    html.push_str(close_section());
    html
}

pub fn render_testimonials(testimonials: &TestimonialsSection) -> String {
    let mut html = open_section(SectionKind::Testimonials, &testimonials.common);
    html.push_str(&text_element("h2", "section-title", &testimonials.common.title));
    html.push_str(&text_element("p", "section-subtitle", &testimonials.common.subtitle));

    if !testimonials.items.is_empty() {
        html.push_str("<div class=\"testimonials-list\">\n");
        for item in &testimonials.items {
            html.push_str("<blockquote class=\"testimonial\">\n");
            html.push_str(&markup_element("testimonial-content", &item.content));
            if present(&item.title).is_some() || present(&item.subtitle).is_some() {
                html.push_str("<footer>\n");
                html.push_str(&text_element("cite", "testimonial-author", &item.title));
                html.push_str(&text_element("span", "testimonial-role", &item.subtitle));
                html.push_str("</footer>\n");
            }
            html.push_str("</blockquote>\n");
        }
        html.push_str("</div>\n");
    }

    html.push_str(close_section());
    html
}

pub fn render_cta(cta: &CtaSection) -> String {
    let mut html = open_section(SectionKind::Cta, &cta.common);
    html.push_str(&text_element("h2", "cta-title", &cta.common.title));
    html.push_str(&text_element("p", "cta-subtitle", &cta.common.subtitle));
    html.push_str(&markup_element("cta-content", &cta.common.content));
    html.push_str(&link_button("cta-button", &cta.button_text, &cta.button_link));
    html.push_str(close_section());
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FeatureItem, HeroStyle, SectionCommon};

    fn carousel(images: &[&str]) -> HeroSection {
        HeroSection {
            style: Some(HeroStyle::Carousel),
            images: images.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_carousel_has_no_navigation() {
        let html = render_hero(&carousel(&[]));
        assert!(html.contains("data-slides=\"0\""));
        assert!(!html.contains("carousel-prev"));
        assert!(!html.contains("carousel-dot"));
    }

    #[test]
    fn test_single_image_carousel_has_no_navigation() {
        let html = render_hero(&carousel(&["/a.png"]));
        assert!(html.contains("/a.png"));
        assert!(!html.contains("carousel-next"));
        assert!(!html.contains("carousel-dots"));
    }

    #[test]
    fn test_multi_image_carousel_has_arrows_and_dots() {
        let html = render_hero(&carousel(&["/a.png", "/b.png", "/c.png"]));
        assert!(html.contains("carousel-prev"));
        assert!(html.contains("carousel-next"));
        assert_eq!(html.matches("class=\"carousel-dot\"").count(), 3);
    }

    #[test]
    fn test_cta_without_button_text_omits_link() {
        let cta = CtaSection {
            common: SectionCommon {
                title: Some("Join".into()),
                ..Default::default()
            },
            button_text: None,
            button_link: Some("/signup".into()),
        };
        let html = render_cta(&cta);
        assert!(html.contains("Join"));
        assert!(!html.contains("<a "));
    }

    #[test]
    fn test_missing_colors_fall_back_to_palette() {
        let html = render_content(&ContentSection::default());
        assert!(html.contains("background-color:#ffffff"));
    }

    #[test]
    fn test_feature_title_is_escaped_but_content_is_markup() {
        let features = FeaturesSection {
            items: vec![FeatureItem {
                title: Some("<Fast>".into()),
                content: Some("<em>very</em>".into()),
                icon: None,
            }],
            ..Default::default()
        };
        let html = render_features(&features);
        assert!(html.contains("&lt;Fast&gt;"));
        assert!(html.contains("<em>very</em>"));
        assert!(!html.contains("feature-icon"));
    }
}
