//! 渲染分发：按展示顺序遍历区块，按种类选择渲染器，输出自包含的 HTML 片段
//!
//! 渲染永不失败：无法识别的区块静默跳过，缺失字段由各渲染器回退。
//! 富文本字段按可信标记插入，清洗责任在接收内容的一方（编辑器 / 生成适配器）。

pub mod blocks;
pub mod html;

use crate::schema::{display_order, Section, SectionKind};

/// 单个已渲染区块
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBlock {
    pub kind: SectionKind,
    pub html: String,
}

/// 渲染结果：按展示顺序排列的区块片段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub blocks: Vec<RenderedBlock>,
}

impl Document {
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn to_html(&self) -> String {
        let mut html = String::from("<div class=\"page-sections\">\n");
        for block in &self.blocks {
            html.push_str(&block.html);
        }
        html.push_str("</div>\n");
        html
    }
}

/// 单个区块分发；Unrecognized 返回 None
pub fn render_section(section: &Section) -> Option<RenderedBlock> {
    let (kind, html) = match section {
        Section::Hero(s) => (SectionKind::Hero, blocks::render_hero(s)),
        Section::Features(s) => (SectionKind::Features, blocks::render_features(s)),
        Section::Content(s) => (SectionKind::Content, blocks::render_content(s)),
        Section::Testimonials(s) => (SectionKind::Testimonials, blocks::render_testimonials(s)),
        Section::Cta(s) => (SectionKind::Cta, blocks::render_cta(s)),
        Section::Unrecognized(raw) => {
            tracing::debug!("skipping unrecognized section type {:?}", raw.kind);
            return None;
        }
    };
    Some(RenderedBlock { kind, html })
}

pub fn render(sections: &[Section]) -> Document {
    let blocks = display_order(sections)
        .into_iter()
        .filter_map(|i| render_section(&sections[i]))
        .collect();
    Document { blocks }
}
