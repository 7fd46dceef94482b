//! Pagesmith - 区块化页面组合引擎
//!
//! 模块划分：
//! - **schema**: 区块种类、字段、默认值与展示顺序
//! - **render**: 区块列表 → HTML 片段（永不失败，未知区块跳过）
//! - **editor**: 编辑会话（可视化 / 结构化文本双编辑面，单一数据源）
//! - **generation**: 借助 LLM 生成初始区块列表与 SEO 信息
//! - **page**: 页面聚合、存储（内存 / SQLite）与服务
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 对外错误类型
//! - **observability**: 日志初始化

pub mod config;
pub mod core;
pub mod editor;
pub mod generation;
pub mod llm;
pub mod observability;
pub mod page;
pub mod render;
pub mod schema;

pub use core::PageError;
pub use editor::EditorSession;
pub use generation::{GeneratedPage, GenerationOptions, PageGenerator};
pub use page::{Page, PageService, PageStore};
pub use render::{render, Document};
pub use schema::{Section, SectionKind};
