//! 页面服务：保存前校验与 order 归一化、加载为编辑会话、删除通知、公开访问

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::model::Page;
use super::store::PageStore;
use crate::core::PageError;
use crate::editor::{EditorSession, PendingAction};
use crate::render::{render, Document};
use crate::schema::normalize_orders;

/// 页面生命周期监听器；删除时用于失效派生产物（站点地图、缓存等）
pub trait PageListener: Send + Sync {
    fn page_saved(&self, _page: &Page) {}

    fn page_deleted(&self, page: &Page);
}

pub struct PageService {
    store: Arc<dyn PageStore>,
    listeners: Vec<Arc<dyn PageListener>>,
}

impl PageService {
    pub fn new(store: Arc<dyn PageStore>) -> Self {
        Self {
            store,
            listeners: Vec::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn PageListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// 校验 → 归一化 order → 存储
    pub async fn save(&self, mut page: Page) -> Result<Page, PageError> {
        page.validate().map_err(PageError::Validation)?;
        normalize_orders(&mut page.sections);
        let saved = self.store.save_page(page).await?;
        info!(id = ?saved.id, slug = %saved.slug, sections = saved.sections.len(), "Page saved");
        for listener in &self.listeners {
            listener.page_saved(&saved);
        }
        Ok(saved)
    }

    /// 用编辑会话的区块列表保存；文本视图未同步或已有保存进行中时拒绝。
    /// 只在取快照和收尾时锁会话，存储期间运营者可以继续编辑。
    pub async fn save_session(
        &self,
        mut page: Page,
        session: &RwLock<EditorSession>,
    ) -> Result<Page, PageError> {
        page.sections = session.write().await.begin_save()?;
        let result = self.save(page).await;
        session.write().await.finish(PendingAction::Save);
        result
    }

    pub async fn load(&self, id: &str) -> Result<Page, PageError> {
        Ok(self.store.load_page(id).await?)
    }

    /// 加载页面并以其区块列表建立编辑会话
    pub async fn open(&self, id: &str) -> Result<(Page, EditorSession), PageError> {
        let page = self.store.load_page(id).await?;
        let session = EditorSession::new(page.sections.clone())?;
        debug!(id, sections = page.sections.len(), "Editor session opened");
        Ok((page, session))
    }

    pub async fn list(&self) -> Result<Vec<Page>, PageError> {
        Ok(self.store.list_pages().await?)
    }

    /// 硬删除并通知监听器
    pub async fn delete(&self, id: &str) -> Result<Page, PageError> {
        let page = self.store.load_page(id).await?;
        self.store.delete_page(id).await?;
        info!(id, slug = %page.slug, "Page deleted");
        for listener in &self.listeners {
            listener.page_deleted(&page);
        }
        Ok(page)
    }

    /// 公开访问：未发布与不存在对外不可区分
    pub async fn public_page(&self, slug: &str) -> Result<Page, PageError> {
        match self.store.find_by_slug(slug).await? {
            Some(page) if page.is_published => Ok(page),
            Some(_) => {
                debug!(slug, "Unpublished page requested");
                Err(PageError::NotFound(slug.to_string()))
            }
            None => Err(PageError::NotFound(slug.to_string())),
        }
    }

    pub async fn render_public(&self, slug: &str) -> Result<(Page, Document), PageError> {
        let page = self.public_page(slug).await?;
        let document = render(&page.sections);
        if document.len() < page.sections.len() {
            warn!(
                slug,
                skipped = page.sections.len() - document.len(),
                "Unrecognized sections skipped"
            );
        }
        Ok((page, document))
    }
}
