//! 面向运营者的错误类型
//!
//! 所有错误都同步返回给调用方并附带可操作的描述，不做自动重试；渲染路径不产生错误。

use thiserror::Error;

use crate::editor::{EditorError, ParseError};
use crate::page::StoreError;

/// 页面组合引擎对外的错误
#[derive(Error, Debug)]
pub enum PageError {
    /// 标题 / slug 缺失或格式不对，在进入存储前拦截
    #[error("Validation error: {0}")]
    Validation(String),

    /// 目标 slug 已被其他页面占用，运营者应改名而非重试
    #[error("Slug \"{0}\" is already used by another page; choose a different slug")]
    SlugConflict(String),

    #[error("Page not found: {0}")]
    NotFound(String),

    #[error("Content generation is unavailable: no API key configured")]
    GenerationUnavailable,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 生成服务的回复无法解析；raw 保留原始回复供人工恢复
    #[error("Generation response could not be parsed: {reason}")]
    MalformedResponse { reason: String, raw: String },

    #[error("Structured text is not valid: {0}")]
    Parse(#[from] ParseError),

    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for PageError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => PageError::NotFound(id),
            StoreError::SlugConflict(slug) => PageError::SlugConflict(slug),
            StoreError::Validation(msg) => PageError::Validation(msg),
            StoreError::Backend(msg) => PageError::Storage(msg),
        }
    }
}

impl PageError {
    /// 原始生成回复（仅 MalformedResponse 有）
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            PageError::MalformedResponse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
