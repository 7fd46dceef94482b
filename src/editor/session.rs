//! 编辑会话：可视化区块编辑器与结构化文本编辑器共享同一份区块列表
//!
//! 状态机：
//! - `Synced`：文本与结构一致（初始状态，也是唯一允许保存的状态）
//! - `TextDirty`：文本已修改、尚未解析
//! - `TextInvalid`：解析失败；保留运营者的文本，结构保持上一次有效值
//!
//! 可视化操作总是整体重新生成文本；文本提交成功时整体替换结构，不做字段级合并。
//! 可视化操作中的 `pos` 一律指展示顺序中的位置（按 order 稳定排序后）。

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use super::projection::{from_text, to_text, ParseError};
use crate::render::{render, Document};
use crate::schema::{
    blank_feature, blank_testimonial, defaults_for, display_order, normalize_orders,
    sort_by_order, HeroStyle, Section, SectionKind,
};

/// 文本视图与结构的同步状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Synced,
    TextDirty,
    TextInvalid(ParseError),
}

/// 需要等待网络的操作；进行中时禁止重复触发同一操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingAction {
    Save,
    Generate,
}

impl fmt::Display for PendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingAction::Save => f.write_str("save"),
            PendingAction::Generate => f.write_str("generation"),
        }
    }
}

/// 可视化表单中的区块字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionField {
    Title,
    Subtitle,
    Content,
    BackgroundColor,
    TextColor,
    ButtonText,
    ButtonLink,
    ImageUrl,
}

/// features / testimonials 条目字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Title,
    Subtitle,
    Content,
    Icon,
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("No section at position {0}")]
    OutOfRange(usize),

    #[error("No item {item} in section at position {pos}")]
    ItemOutOfRange { pos: usize, item: usize },

    #[error("Field {field} does not apply to {kind} sections")]
    FieldNotApplicable { field: String, kind: String },

    #[error("Section kind cannot change in place ({from} -> {to}); delete and recreate instead")]
    KindChange { from: String, to: String },

    #[error("Structured text has pending or invalid edits; fix the text before saving")]
    NotSynced,

    #[error("A {0} is already in progress")]
    Busy(PendingAction),

    #[error("Failed to serialize sections: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// 单次编辑会话（单用户）
#[derive(Debug, Clone)]
pub struct EditorSession {
    /// 唯一真相源
    sections: Vec<Section>,
    /// 文本编辑器当前内容（可能尚未解析或解析失败）
    text: String,
    state: SyncState,
    in_flight: HashSet<PendingAction>,
}

impl EditorSession {
    /// 从已存储的列表载入；不做 order 归一化
    pub fn new(sections: Vec<Section>) -> Result<Self, EditorError> {
        let text = to_text(&sections)?;
        Ok(Self {
            sections,
            text,
            state: SyncState::Synced,
            in_flight: HashSet::new(),
        })
    }

    pub fn empty() -> Self {
        Self {
            sections: Vec::new(),
            text: "[]".to_string(),
            state: SyncState::Synced,
            in_flight: HashSet::new(),
        }
    }

    /// 最近一次有效的区块列表（预览、渲染以此为准）
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn is_synced(&self) -> bool {
        self.state == SyncState::Synced
    }

    pub fn parse_error(&self) -> Option<&ParseError> {
        match &self.state {
            SyncState::TextInvalid(e) => Some(e),
            _ => None,
        }
    }

    /// 可视化编辑器的表单列表（展示顺序）
    pub fn blocks(&self) -> Vec<&Section> {
        display_order(&self.sections)
            .into_iter()
            .map(|i| &self.sections[i])
            .collect()
    }

    pub fn preview(&self) -> Document {
        render(&self.sections)
    }

    // ---- 结构化文本编辑器 ----

    /// 记录键入内容，不解析
    pub fn edit_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.state = SyncState::TextDirty;
    }

    /// 解析当前文本：成功则整体替换结构；失败则保留文本、结构不变
    pub fn commit_text(&mut self) -> Result<(), ParseError> {
        match from_text(&self.text) {
            Ok(sections) => {
                self.sections = sections;
                self.state = SyncState::Synced;
                Ok(())
            }
            Err(e) => {
                tracing::debug!("structured text rejected: {}", e);
                self.state = SyncState::TextInvalid(e.clone());
                Err(e)
            }
        }
    }

    /// 键入即提交（文本编辑器的常规路径）
    pub fn input_text(&mut self, text: impl Into<String>) -> Result<(), ParseError> {
        self.edit_text(text);
        self.commit_text()
    }

    // ---- 可视化区块编辑器 ----

    /// 整体替换（如采用生成结果），等同一次可视化修改
    pub fn replace_sections(&mut self, sections: Vec<Section>) -> Result<(), EditorError> {
        self.sections = sections;
        self.resync()
    }

    /// 追加一个默认区块，返回其展示位置
    pub fn add_section(&mut self, kind: SectionKind) -> Result<usize, EditorError> {
        let mut section = defaults_for(kind);
        let next = self
            .sections
            .iter()
            .filter_map(Section::order)
            .max()
            .map(|max| max.saturating_add(1))
            .unwrap_or(0);
        section.set_order(next);
        self.sections.push(section);
        self.resync()?;
        let index = self.sections.len() - 1;
        Ok(display_order(&self.sections)
            .iter()
            .position(|&i| i == index)
            .unwrap_or(index))
    }

    pub fn remove_section(&mut self, pos: usize) -> Result<Section, EditorError> {
        let index = self.index_at(pos)?;
        let removed = self.sections.remove(index);
        self.resync()?;
        Ok(removed)
    }

    /// 任意修改一个区块；不允许改变区块种类
    pub fn update_section(
        &mut self,
        pos: usize,
        edit: impl FnOnce(&mut Section),
    ) -> Result<(), EditorError> {
        let index = self.index_at(pos)?;
        let before = self.sections[index].clone();
        edit(&mut self.sections[index]);
        if std::mem::discriminant(&before) != std::mem::discriminant(&self.sections[index])
            || before.type_name() != self.sections[index].type_name()
        {
            let to = self.sections[index].type_name().to_string();
            self.sections[index] = before;
            return Err(EditorError::KindChange {
                from: self.sections[index].type_name().to_string(),
                to,
            });
        }
        self.resync()
    }

    pub fn set_field(
        &mut self,
        pos: usize,
        field: SectionField,
        value: impl Into<String>,
    ) -> Result<(), EditorError> {
        let index = self.index_at(pos)?;
        let section = &mut self.sections[index];
        let kind = section.type_name().to_string();
        let slot = field_slot(section, field).ok_or(EditorError::FieldNotApplicable {
            field: format!("{:?}", field),
            kind,
        })?;
        *slot = Some(value.into());
        self.resync()
    }

    pub fn set_hero_style(&mut self, pos: usize, style: HeroStyle) -> Result<(), EditorError> {
        let hero = self.hero_at(pos, "style")?;
        hero.style = Some(style);
        self.resync()
    }

    pub fn add_image(&mut self, pos: usize, url: impl Into<String>) -> Result<(), EditorError> {
        let hero = self.hero_at(pos, "images")?;
        hero.images.push(url.into());
        self.resync()
    }

    pub fn remove_image(&mut self, pos: usize, image: usize) -> Result<String, EditorError> {
        let hero = self.hero_at(pos, "images")?;
        if image >= hero.images.len() {
            return Err(EditorError::ItemOutOfRange { pos, item: image });
        }
        let removed = hero.images.remove(image);
        self.resync()?;
        Ok(removed)
    }

    /// 向 features / testimonials 追加空白条目，返回条目下标
    pub fn add_item(&mut self, pos: usize) -> Result<usize, EditorError> {
        let index = self.index_at(pos)?;
        let added = match &mut self.sections[index] {
            Section::Features(s) => {
                s.items.push(blank_feature());
                s.items.len() - 1
            }
            Section::Testimonials(s) => {
                s.items.push(blank_testimonial());
                s.items.len() - 1
            }
            other => {
                return Err(EditorError::FieldNotApplicable {
                    field: "items".to_string(),
                    kind: other.type_name().to_string(),
                })
            }
        };
        self.resync()?;
        Ok(added)
    }

    pub fn remove_item(&mut self, pos: usize, item: usize) -> Result<(), EditorError> {
        let index = self.index_at(pos)?;
        let len = match &self.sections[index] {
            Section::Features(s) => s.items.len(),
            Section::Testimonials(s) => s.items.len(),
            other => {
                return Err(EditorError::FieldNotApplicable {
                    field: "items".to_string(),
                    kind: other.type_name().to_string(),
                })
            }
        };
        if item >= len {
            return Err(EditorError::ItemOutOfRange { pos, item });
        }
        match &mut self.sections[index] {
            Section::Features(s) => {
                s.items.remove(item);
            }
            Section::Testimonials(s) => {
                s.items.remove(item);
            }
            _ => {}
        }
        self.resync()
    }

    pub fn set_item_field(
        &mut self,
        pos: usize,
        item: usize,
        field: ItemField,
        value: impl Into<String>,
    ) -> Result<(), EditorError> {
        let index = self.index_at(pos)?;
        let section = &mut self.sections[index];
        let kind = section.type_name().to_string();
        let not_applicable = || EditorError::FieldNotApplicable {
            field: format!("items[].{:?}", field),
            kind: kind.clone(),
        };
        let slot = match section {
            Section::Features(s) => {
                let entry = s
                    .items
                    .get_mut(item)
                    .ok_or(EditorError::ItemOutOfRange { pos, item })?;
                match field {
                    ItemField::Title => &mut entry.title,
                    ItemField::Content => &mut entry.content,
                    ItemField::Icon => &mut entry.icon,
                    ItemField::Subtitle => return Err(not_applicable()),
                }
            }
            Section::Testimonials(s) => {
                let entry = s
                    .items
                    .get_mut(item)
                    .ok_or(EditorError::ItemOutOfRange { pos, item })?;
                match field {
                    ItemField::Title => &mut entry.title,
                    ItemField::Subtitle => &mut entry.subtitle,
                    ItemField::Content => &mut entry.content,
                    ItemField::Icon => return Err(not_applicable()),
                }
            }
            _ => return Err(not_applicable()),
        };
        *slot = Some(value.into());
        self.resync()
    }

    /// 上移一位；已在顶端时不变。返回新的展示位置
    pub fn move_up(&mut self, pos: usize) -> Result<usize, EditorError> {
        self.index_at(pos)?;
        if pos == 0 {
            return Ok(pos);
        }
        self.swap_with(pos, pos - 1)
    }

    /// 下移一位；已在末尾时不变。返回新的展示位置
    pub fn move_down(&mut self, pos: usize) -> Result<usize, EditorError> {
        self.index_at(pos)?;
        if pos + 1 >= self.sections.len() {
            return Ok(pos);
        }
        self.swap_with(pos, pos + 1)
    }

    // ---- 保存 ----

    /// 仅在 Synced 时允许：返回 order 已归一化为 0..n 的副本
    pub fn prepare_save(&self) -> Result<Vec<Section>, EditorError> {
        if !self.is_synced() {
            return Err(EditorError::NotSynced);
        }
        let mut sections = self.sections.clone();
        normalize_orders(&mut sections);
        Ok(sections)
    }

    /// 开始一次保存：要求 Synced 且没有进行中的保存，占住 Save 并返回待存储的区块。
    /// 存储完成（无论成败）后调用 `finish(PendingAction::Save)`；期间会话可继续编辑。
    pub fn begin_save(&mut self) -> Result<Vec<Section>, EditorError> {
        let sections = self.prepare_save()?;
        self.begin(PendingAction::Save)?;
        Ok(sections)
    }

    /// 标记操作开始；同一操作进行中时拒绝
    pub fn begin(&mut self, action: PendingAction) -> Result<(), EditorError> {
        if !self.in_flight.insert(action) {
            return Err(EditorError::Busy(action));
        }
        Ok(())
    }

    pub fn finish(&mut self, action: PendingAction) {
        self.in_flight.remove(&action);
    }

    pub fn is_busy(&self, action: PendingAction) -> bool {
        self.in_flight.contains(&action)
    }

    // ---- 内部 ----

    fn resync(&mut self) -> Result<(), EditorError> {
        self.text = to_text(&self.sections)?;
        self.state = SyncState::Synced;
        Ok(())
    }

    fn index_at(&self, pos: usize) -> Result<usize, EditorError> {
        display_order(&self.sections)
            .get(pos)
            .copied()
            .ok_or(EditorError::OutOfRange(pos))
    }

    fn hero_at(
        &mut self,
        pos: usize,
        field: &str,
    ) -> Result<&mut crate::schema::HeroSection, EditorError> {
        let index = self.index_at(pos)?;
        match &mut self.sections[index] {
            Section::Hero(hero) => Ok(hero),
            other => Err(EditorError::FieldNotApplicable {
                field: field.to_string(),
                kind: other.type_name().to_string(),
            }),
        }
    }

    /// 交换两个相邻展示位置的 order，再对整个列表稳定排序。
    /// order 有缺失或并列时先归一化，否则交换不会改变顺序。
    fn swap_with(&mut self, pos: usize, neighbour: usize) -> Result<usize, EditorError> {
        if !strictly_ordered(&self.sections) {
            normalize_orders(&mut self.sections);
        }
        let display = display_order(&self.sections);
        let (a, b) = (display[pos], display[neighbour]);
        let (order_a, order_b) = (self.sections[a].order(), self.sections[b].order());
        if let (Some(order_a), Some(order_b)) = (order_a, order_b) {
            self.sections[a].set_order(order_b);
            self.sections[b].set_order(order_a);
        }
        sort_by_order(&mut self.sections);
        self.resync()?;
        Ok(neighbour)
    }
}

/// 展示顺序上 order 全部存在且严格递增
fn strictly_ordered(sections: &[Section]) -> bool {
    let orders: Vec<Option<i64>> = display_order(sections)
        .into_iter()
        .map(|i| sections[i].order())
        .collect();
    orders.iter().all(Option::is_some) && orders.windows(2).all(|w| w[0] < w[1])
}

fn field_slot(section: &mut Section, field: SectionField) -> Option<&mut Option<String>> {
    match field {
        SectionField::Title => section.common_mut().map(|c| &mut c.title),
        SectionField::Content => section.common_mut().map(|c| &mut c.content),
        SectionField::BackgroundColor => section.common_mut().map(|c| &mut c.background_color),
        SectionField::TextColor => section.common_mut().map(|c| &mut c.text_color),
        SectionField::Subtitle => match section {
            Section::Content(_) | Section::Unrecognized(_) => None,
            other => other.common_mut().map(|c| &mut c.subtitle),
        },
        SectionField::ButtonText => match section {
            Section::Hero(s) => Some(&mut s.button_text),
            Section::Cta(s) => Some(&mut s.button_text),
            _ => None,
        },
        SectionField::ButtonLink => match section {
            Section::Hero(s) => Some(&mut s.button_link),
            Section::Cta(s) => Some(&mut s.button_link),
            _ => None,
        },
        SectionField::ImageUrl => match section {
            Section::Hero(s) => Some(&mut s.image_url),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(value: serde_json::Value) -> EditorSession {
        EditorSession::new(serde_json::from_value(value).unwrap()).unwrap()
    }

    fn titles(session: &EditorSession) -> Vec<String> {
        session
            .blocks()
            .iter()
            .map(|s| s.common().and_then(|c| c.title.clone()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_visual_edit_regenerates_text() {
        let mut s = session(json!([{"type": "content", "title": "Old", "order": 0}]));
        s.set_field(0, SectionField::Title, "New").unwrap();
        assert!(s.is_synced());
        assert_eq!(from_text(s.text()).unwrap(), s.sections());
        assert!(s.text().contains("\"New\""));
    }

    #[test]
    fn test_invalid_text_keeps_structure_and_text() {
        let mut s = session(json!([
            {"type": "hero", "title": "A", "order": 0},
            {"type": "cta", "title": "B", "order": 1}
        ]));
        let before = s.sections().to_vec();

        let err = s.input_text("{not valid json").unwrap_err();
        assert_eq!(s.parse_error(), Some(&err));
        assert_eq!(s.text(), "{not valid json");
        assert_eq!(s.sections(), before.as_slice());
        assert!(matches!(s.prepare_save(), Err(EditorError::NotSynced)));
    }

    #[test]
    fn test_valid_text_replaces_structure_wholesale() {
        let mut s = session(json!([{"type": "hero", "title": "A"}]));
        s.input_text(r#"[{"type": "cta", "title": "Only"}]"#).unwrap();
        assert!(s.is_synced());
        assert_eq!(titles(&s), vec!["Only"]);
    }

    #[test]
    fn test_edit_text_then_commit_state_transitions() {
        let mut s = EditorSession::empty();
        s.edit_text("[");
        assert_eq!(s.state(), &SyncState::TextDirty);
        assert!(s.commit_text().is_err());
        assert!(matches!(s.state(), SyncState::TextInvalid(_)));
        s.edit_text("[]");
        assert_eq!(s.state(), &SyncState::TextDirty);
        s.commit_text().unwrap();
        assert_eq!(s.state(), &SyncState::Synced);
    }

    #[test]
    fn test_visual_edit_while_text_invalid_resyncs() {
        let mut s = session(json!([{"type": "content", "title": "A", "order": 0}]));
        let _ = s.input_text("oops");
        s.set_field(0, SectionField::Title, "B").unwrap();
        assert!(s.is_synced());
        assert_eq!(from_text(s.text()).unwrap(), s.sections());
    }

    #[test]
    fn test_add_section_appends_after_highest_order() {
        let mut s = session(json!([
            {"type": "content", "title": "A", "order": 4},
            {"type": "content", "title": "B", "order": 1}
        ]));
        let pos = s.add_section(SectionKind::Cta).unwrap();
        assert_eq!(pos, 2);
        assert_eq!(s.blocks()[2].order(), Some(5));
        assert_eq!(s.blocks()[2].kind(), Some(SectionKind::Cta));
    }

    #[test]
    fn test_add_section_after_max_order_does_not_overflow() {
        let mut s = session(json!([{"type": "content", "order": i64::MAX}]));
        let pos = s.add_section(SectionKind::Cta).unwrap();
        assert_eq!(pos, 1);
        assert_eq!(s.blocks()[1].kind(), Some(SectionKind::Cta));
        assert_eq!(s.blocks()[1].order(), Some(i64::MAX));
    }

    #[test]
    fn test_move_swaps_orders_and_resorts() {
        let mut s = session(json!([
            {"type": "content", "title": "A", "order": 0},
            {"type": "content", "title": "B", "order": 10},
            {"type": "content", "title": "C", "order": 20}
        ]));
        assert_eq!(s.move_up(2).unwrap(), 1);
        assert_eq!(titles(&s), vec!["A", "C", "B"]);
        let orders: Vec<_> = s.sections().iter().map(Section::order).collect();
        assert_eq!(orders, vec![Some(0), Some(10), Some(20)]);

        assert_eq!(s.move_down(0).unwrap(), 1);
        assert_eq!(titles(&s), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_move_with_tied_orders_still_moves() {
        let mut s = session(json!([
            {"type": "content", "title": "A"},
            {"type": "content", "title": "B"}
        ]));
        s.move_down(0).unwrap();
        assert_eq!(titles(&s), vec!["B", "A"]);
    }

    #[test]
    fn test_move_at_edges_is_noop() {
        let mut s = session(json!([
            {"type": "content", "title": "A", "order": 0},
            {"type": "content", "title": "B", "order": 1}
        ]));
        assert_eq!(s.move_up(0).unwrap(), 0);
        assert_eq!(s.move_down(1).unwrap(), 1);
        assert_eq!(titles(&s), vec!["A", "B"]);
        assert!(matches!(s.move_up(5), Err(EditorError::OutOfRange(5))));
    }

    #[test]
    fn test_kind_cannot_change_in_place() {
        let mut s = session(json!([{"type": "hero", "title": "A"}]));
        let err = s
            .update_section(0, |section| *section = defaults_for(SectionKind::Cta))
            .unwrap_err();
        assert!(matches!(err, EditorError::KindChange { .. }));
        assert_eq!(s.sections()[0].kind(), Some(SectionKind::Hero));
    }

    #[test]
    fn test_field_not_applicable() {
        let mut s = session(json!([{"type": "content"}]));
        assert!(matches!(
            s.set_field(0, SectionField::ButtonText, "x"),
            Err(EditorError::FieldNotApplicable { .. })
        ));
        assert!(matches!(
            s.add_item(0),
            Err(EditorError::FieldNotApplicable { .. })
        ));
    }

    #[test]
    fn test_items_and_images() {
        let mut s = session(json!([
            {"type": "features", "order": 0},
            {"type": "hero", "order": 1}
        ]));
        let item = s.add_item(0).unwrap();
        s.set_item_field(0, item, ItemField::Icon, "star").unwrap();
        assert!(s.set_item_field(0, item, ItemField::Subtitle, "x").is_err());
        assert!(s.text().contains("\"star\""));

        s.set_hero_style(1, HeroStyle::Carousel).unwrap();
        s.add_image(1, "/a.png").unwrap();
        s.add_image(1, "/b.png").unwrap();
        assert_eq!(s.remove_image(1, 0).unwrap(), "/a.png");
        let block = s.blocks()[1].clone();
        let Section::Hero(hero) = block else {
            panic!("expected hero");
        };
        assert_eq!(hero.images, vec!["/b.png".to_string()]);

        s.remove_item(0, 0).unwrap();
        assert!(matches!(
            s.remove_item(0, 0),
            Err(EditorError::ItemOutOfRange { .. })
        ));
    }

    #[test]
    fn test_prepare_save_normalizes_without_touching_session() {
        let s = session(json!([
            {"type": "content", "title": "A", "order": 5},
            {"type": "content", "title": "B", "order": 5},
            {"type": "content", "title": "C", "order": 2}
        ]));
        let saved = s.prepare_save().unwrap();
        let orders: Vec<_> = saved.iter().map(Section::order).collect();
        assert_eq!(orders, vec![Some(1), Some(2), Some(0)]);
        assert_eq!(s.sections()[0].order(), Some(5));
    }

    #[test]
    fn test_in_flight_action_rejects_duplicate() {
        let mut s = EditorSession::empty();
        s.begin(PendingAction::Save).unwrap();
        assert!(matches!(
            s.begin(PendingAction::Save),
            Err(EditorError::Busy(PendingAction::Save))
        ));
        // 保存进行中仍可继续编辑
        s.begin(PendingAction::Generate).unwrap();
        s.add_section(SectionKind::Content).unwrap();
        s.set_field(0, SectionField::Title, "x").unwrap();
        s.finish(PendingAction::Save);
        assert!(!s.is_busy(PendingAction::Save));
        s.begin(PendingAction::Save).unwrap();
    }

    #[test]
    fn test_begin_save_requires_sync_and_rejects_second_save() {
        let mut s = session(json!([{"type": "content", "title": "A", "order": 3}]));
        s.edit_text("[");
        assert!(matches!(s.begin_save(), Err(EditorError::NotSynced)));
        assert!(!s.is_busy(PendingAction::Save));

        s.input_text(r#"[{"type": "content", "title": "A", "order": 3}]"#)
            .unwrap();
        let staged = s.begin_save().unwrap();
        assert_eq!(staged[0].order(), Some(0));
        assert!(s.is_busy(PendingAction::Save));
        assert!(matches!(
            s.begin_save(),
            Err(EditorError::Busy(PendingAction::Save))
        ));
        s.finish(PendingAction::Save);
        assert!(s.begin_save().is_ok());
    }
}
