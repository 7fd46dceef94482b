//! 页面聚合、存储与服务

pub mod model;
pub mod service;
#[cfg(feature = "async-sqlite")]
pub mod sqlite;
pub mod store;

pub use model::{slugify, validate_slug, MetaTags, Page, PageId};
pub use service::{PageListener, PageService};
#[cfg(feature = "async-sqlite")]
pub use sqlite::SqlitePageStore;
pub use store::{MemoryPageStore, PageStore, StoreError};

use std::path::Path;
use std::sync::Arc;

use crate::config::AppConfig;

/// 按配置打开页面存储：设置了 database_path 用 SQLite，否则用内存
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn PageStore>, StoreError> {
    match &config.app.database_path {
        Some(path) => open_sqlite(path).await,
        None => {
            tracing::info!("Page store: in-memory");
            Ok(Arc::new(MemoryPageStore::new()))
        }
    }
}

#[cfg(feature = "async-sqlite")]
async fn open_sqlite(path: &Path) -> Result<Arc<dyn PageStore>, StoreError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .map_err(|e| StoreError::Backend(format!("{}: {}", dir.display(), e)))?;
    }
    tracing::info!("Page store: SQLite at {}", path.display());
    Ok(Arc::new(SqlitePageStore::new(path).await?))
}

#[cfg(not(feature = "async-sqlite"))]
async fn open_sqlite(path: &Path) -> Result<Arc<dyn PageStore>, StoreError> {
    tracing::warn!(
        "database_path {} ignored: built without async-sqlite, using in-memory store",
        path.display()
    );
    Ok(Arc::new(MemoryPageStore::new()))
}
