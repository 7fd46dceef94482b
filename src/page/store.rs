//! 页面存储抽象层
//!
//! 定义统一的页面存储接口，支持内存和 SQLite 两种实现。
//! 没有乐观并发令牌：两次保存并发时后到者覆盖先到者。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;

use super::model::{Page, PageId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Page not found: {0}")]
    NotFound(String),

    #[error("Slug already in use: {0}")]
    SlugConflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// 页面存储接口
#[async_trait]
pub trait PageStore: Send + Sync {
    async fn load_page(&self, id: &str) -> Result<Page, StoreError>;

    /// 新页面（id 为 None）分配 ID；已有页面按 ID 更新。返回存储后的页面
    async fn save_page(&self, page: Page) -> Result<Page, StoreError>;

    /// 硬删除，无软删除 / 版本
    async fn delete_page(&self, id: &str) -> Result<(), StoreError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Page>, StoreError>;

    /// 按更新时间倒序
    async fn list_pages(&self) -> Result<Vec<Page>, StoreError>;
}

/// 保存前的通用准备：校验、分配 ID、维护时间戳
pub(crate) fn stamp_for_save(mut page: Page, existing: Option<&Page>) -> Result<Page, StoreError> {
    page.validate().map_err(StoreError::Validation)?;
    let now = Utc::now();
    if page.id.is_none() {
        page.id = Some(uuid::Uuid::new_v4().to_string());
    }
    page.created_at = existing.and_then(|p| p.created_at).or(Some(now));
    page.updated_at = Some(now);
    Ok(page)
}

/// 内存页面存储
#[derive(Debug, Default)]
pub struct MemoryPageStore {
    pages: RwLock<HashMap<PageId, Page>>,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PageStore for MemoryPageStore {
    async fn load_page(&self, id: &str) -> Result<Page, StoreError> {
        self.pages
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn save_page(&self, page: Page) -> Result<Page, StoreError> {
        let mut pages = self.pages.write().await;

        let existing = match &page.id {
            Some(id) => Some(
                pages
                    .get(id)
                    .ok_or_else(|| StoreError::NotFound(id.clone()))?,
            ),
            None => None,
        };
        let conflict = pages
            .values()
            .any(|other| other.slug == page.slug && other.id != page.id);
        if conflict {
            return Err(StoreError::SlugConflict(page.slug));
        }

        let page = stamp_for_save(page, existing)?;
        if let Some(id) = &page.id {
            pages.insert(id.clone(), page.clone());
        }
        Ok(page)
    }

    async fn delete_page(&self, id: &str) -> Result<(), StoreError> {
        self.pages
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Page>, StoreError> {
        Ok(self
            .pages
            .read()
            .await
            .values()
            .find(|p| p.slug == slug)
            .cloned())
    }

    async fn list_pages(&self) -> Result<Vec<Page>, StoreError> {
        let mut pages: Vec<Page> = self.pages.read().await.values().cloned().collect();
        pages.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_assigns_id_and_timestamps() {
        let store = MemoryPageStore::new();
        let saved = store.save_page(Page::new("About", "about")).await.unwrap();
        let id = saved.id.clone().unwrap();
        assert!(saved.created_at.is_some());
        assert_eq!(store.load_page(&id).await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_update_keeps_created_at() {
        let store = MemoryPageStore::new();
        let mut saved = store.save_page(Page::new("About", "about")).await.unwrap();
        let created = saved.created_at;
        saved.title = "About us".into();
        let updated = store.save_page(saved).await.unwrap();
        assert_eq!(updated.created_at, created);
        assert_eq!(updated.title, "About us");
        assert_eq!(store.list_pages().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_slug_conflict() {
        let store = MemoryPageStore::new();
        store.save_page(Page::new("A", "same")).await.unwrap();
        let err = store.save_page(Page::new("B", "same")).await.unwrap_err();
        assert_eq!(err, StoreError::SlugConflict("same".into()));
    }

    #[tokio::test]
    async fn test_validation_and_not_found() {
        let store = MemoryPageStore::new();
        assert!(matches!(
            store.save_page(Page::new("", "x")).await,
            Err(StoreError::Validation(_))
        ));
        let mut ghost = Page::new("Ghost", "ghost");
        ghost.id = Some("missing".into());
        assert_eq!(
            store.save_page(ghost).await.unwrap_err(),
            StoreError::NotFound("missing".into())
        );
        assert!(matches!(
            store.delete_page("missing").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_and_find_by_slug() {
        let store = MemoryPageStore::new();
        let saved = store.save_page(Page::new("About", "about")).await.unwrap();
        assert!(store.find_by_slug("about").await.unwrap().is_some());
        store.delete_page(saved.id.as_deref().unwrap()).await.unwrap();
        assert!(store.find_by_slug("about").await.unwrap().is_none());
    }
}
