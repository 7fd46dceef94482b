//! SQLite 页面存储
//!
//! 区块列表与 meta 以 JSON 文本存放；slug 上有唯一约束，冲突映射为 SlugConflict

#![cfg(feature = "async-sqlite")]

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use super::model::{MetaTags, Page};
use super::store::{stamp_for_save, PageStore, StoreError};
use crate::schema::Section;

const PAGE_COLUMNS: &str =
    "id, title, slug, description, is_published, sections, meta_tags, created_at, updated_at";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

pub struct SqlitePageStore {
    pool: SqlitePool,
}

impl SqlitePageStore {
    /// 打开（不存在则创建）数据库文件并建表
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;
        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    /// 进程内数据库；单连接，否则每个连接各自一份空库
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    async fn init_tables(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS pages (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                is_published INTEGER NOT NULL DEFAULT 0,
                sections TEXT NOT NULL,
                meta_tags TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Page>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PAGE_COLUMNS} FROM pages WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| page_from_row(&r)).transpose()
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Backend(format!("bad timestamp {:?}: {}", raw, e)))
}

fn page_from_row(row: &SqliteRow) -> Result<Page, StoreError> {
    let sections: String = row.try_get("sections")?;
    let meta_tags: String = row.try_get("meta_tags")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    let sections: Vec<Section> = serde_json::from_str(&sections)
        .map_err(|e| StoreError::Backend(format!("corrupt sections column: {}", e)))?;
    let meta_tags: MetaTags = serde_json::from_str(&meta_tags)
        .map_err(|e| StoreError::Backend(format!("corrupt meta_tags column: {}", e)))?;

    Ok(Page {
        id: Some(row.try_get("id")?),
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        is_published: row.try_get::<i64, _>("is_published")? != 0,
        sections,
        meta_tags,
        created_at: Some(parse_time(&created_at)?),
        updated_at: Some(parse_time(&updated_at)?),
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Backend(e.to_string()))
}

#[async_trait]
impl PageStore for SqlitePageStore {
    async fn load_page(&self, id: &str) -> Result<Page, StoreError> {
        self.fetch_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn save_page(&self, page: Page) -> Result<Page, StoreError> {
        let existing = match &page.id {
            Some(id) => Some(
                self.fetch_by_id(id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(id.clone()))?,
            ),
            None => None,
        };
        let page = stamp_for_save(page, existing.as_ref())?;
        let id = page.id.clone().unwrap_or_default();
        let created_at = page.created_at.unwrap_or_else(Utc::now).to_rfc3339();
        let updated_at = page.updated_at.unwrap_or_else(Utc::now).to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO pages (id, title, slug, description, is_published, sections, meta_tags, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                slug = excluded.slug,
                description = excluded.description,
                is_published = excluded.is_published,
                sections = excluded.sections,
                meta_tags = excluded.meta_tags,
                updated_at = excluded.updated_at",
        )
        .bind(&id)
        .bind(&page.title)
        .bind(&page.slug)
        .bind(&page.description)
        .bind(page.is_published as i64)
        .bind(to_json(&page.sections)?)
        .bind(to_json(&page.meta_tags)?)
        .bind(&created_at)
        .bind(&updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(page),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::SlugConflict(page.slug))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_page(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM pages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Page>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PAGE_COLUMNS} FROM pages WHERE slug = ?"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| page_from_row(&r)).transpose()
    }

    async fn list_pages(&self) -> Result<Vec<Page>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages ORDER BY updated_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(page_from_row).collect()
    }
}
