//! 编辑器：结构化文本投影与编辑会话（可视化 / 文本两种编辑面共享一个模型）

pub mod projection;
pub mod session;

pub use projection::{from_text, to_text, ParseError};
pub use session::{
    EditorError, EditorSession, ItemField, PendingAction, SectionField, SyncState,
};
