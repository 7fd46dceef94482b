//! Pagesmith Web 服务
//!
//! 启动: cargo run --bin pagesmith-web --features web
//! 公开页面: GET /{slug}（仅已发布）
//! 管理接口: /api/*，需请求头 x-admin-token

#![cfg(feature = "web")]

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tower::ServiceBuilder;

use pagesmith::config::{load_config, AppConfig};
use pagesmith::editor::{from_text, to_text};
use pagesmith::generation::{GeneratedPage, GenerationOptions, PageGenerator};
use pagesmith::llm::create_llm_from_config;
use pagesmith::page::{open_store, Page, PageListener, PageService};
use pagesmith::render::{html::escape, render, Document};
use pagesmith::PageError;

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

struct AppState {
    pages: PageService,
    generator: PageGenerator,
    generation: GenerationOptions,
    admin_token: Option<String>,
}

/// 删除页面时记录日志；站点地图等派生产物在此失效
struct DeletionLog;

impl PageListener for DeletionLog {
    fn page_deleted(&self, page: &Page) {
        tracing::info!("Derived artifacts for /{} invalidated", page.slug);
    }
}

/// PageError → HTTP 响应
struct ApiError(PageError);

impl From<PageError> for ApiError {
    fn from(e: PageError) -> Self {
        Self(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    column: Option<usize>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PageError::Validation(_) | PageError::InvalidInput(_) | PageError::Editor(_) => {
                StatusCode::BAD_REQUEST
            }
            PageError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PageError::SlugConflict(_) => StatusCode::CONFLICT,
            PageError::NotFound(_) => StatusCode::NOT_FOUND,
            PageError::GenerationUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            PageError::MalformedResponse { .. } | PageError::Llm(_) => StatusCode::BAD_GATEWAY,
            PageError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("{}", self.0);
        }
        let (line, column) = match &self.0 {
            PageError::Parse(e) => (e.line, e.column),
            _ => (None, None),
        };
        let body = ErrorBody {
            error: self.0.to_string(),
            raw: self.0.raw_response().map(str::to_string),
            line,
            column,
        };
        (status, Json(body)).into_response()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pagesmith::observability::init();

    let cfg = load_config(None).unwrap_or_default();
    let state = Arc::new(build_state(&cfg).await?);
    if state.admin_token.is_none() {
        tracing::warn!("web.admin_token not set: admin API will reject every request");
    }
    if !state.generator.is_available() {
        tracing::warn!("Content generation unavailable: no API key configured");
    }

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&cfg.web.bind).await?;
    tracing::info!("Pagesmith Web: http://{}", cfg.web.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let store = open_store(cfg).await?;
    let pages = PageService::new(store).with_listener(Arc::new(DeletionLog));
    let generator = PageGenerator::new(create_llm_from_config(&cfg.llm))
        .with_sanitize(cfg.generation.sanitize_markup);
    Ok(AppState {
        pages,
        generator,
        generation: GenerationOptions::from_config(&cfg.generation),
        admin_token: cfg.web.admin_token.clone().filter(|t| !t.is_empty()),
    })
}

fn router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/pages", get(api_pages_list).post(api_pages_save))
        .route("/pages/:id", get(api_page_get).delete(api_page_delete))
        .route("/generate", post(api_generate))
        .route("/preview", post(api_preview))
        .layer(ServiceBuilder::new().layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_admin,
        )));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api", admin)
        .route("/:slug", get(public_page))
        .with_state(state)
}

/// 管理接口鉴权：未配置令牌时一律拒绝
async fn require_admin(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    match (&state.admin_token, presented) {
        (Some(expected), Some(given)) if token_matches(expected, given) => {
            Ok(next.run(request).await)
        }
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// 常量时间比较
fn token_matches(expected: &str, given: &str) -> bool {
    expected.as_bytes().ct_eq(given.as_bytes()).into()
}

/// GET /{slug}：渲染已发布页面；未发布与不存在同样返回 404
async fn public_page(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Html<String>, StatusCode> {
    match state.pages.render_public(&slug).await {
        Ok((page, document)) => Ok(Html(page_document(&page, &document))),
        Err(PageError::NotFound(_)) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Public render of /{} failed: {}", slug, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// 完整 HTML 文档：head 中带 SEO 元信息，body 为区块片段
fn page_document(page: &Page, document: &Document) -> String {
    let mut head = format!("<title>{}</title>", escape(&page.title));
    let meta = &page.meta_tags;
    let description = meta
        .description
        .as_deref()
        .or(Some(page.description.as_str()).filter(|d| !d.is_empty()));
    let named = [("description", description), ("keywords", meta.keywords.as_deref())];
    for (name, value) in named {
        if let Some(value) = value {
            head.push_str(&format!(
                r#"<meta name="{}" content="{}">"#,
                name,
                escape(value)
            ));
        }
    }
    let og = [
        ("og:title", meta.og_title.as_deref()),
        ("og:description", meta.og_description.as_deref()),
        ("og:image", meta.og_image.as_deref()),
    ];
    for (property, value) in og {
        if let Some(value) = value {
            head.push_str(&format!(
                r#"<meta property="{}" content="{}">"#,
                property,
                escape(value)
            ));
        }
    }
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">{}</head><body>{}</body></html>",
        head,
        document.to_html()
    )
}

/// GET /api/pages
async fn api_pages_list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Page>>, ApiError> {
    Ok(Json(state.pages.list().await?))
}

/// POST /api/pages：新建（无 id）或更新；order 在保存时归一化
async fn api_pages_save(
    State(state): State<Arc<AppState>>,
    Json(page): Json<Page>,
) -> Result<(StatusCode, Json<Page>), ApiError> {
    let status = if page.id.is_none() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let saved = state.pages.save(page).await?;
    Ok((status, Json(saved)))
}

#[derive(Serialize)]
struct PageWithText {
    page: Page,
    /// 结构化文本视图（编辑器文本编辑面的初始内容）
    text: String,
}

/// GET /api/pages/{id}
async fn api_page_get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PageWithText>, ApiError> {
    let (page, session) = state.pages.open(&id).await?;
    let text = session.text().to_string();
    Ok(Json(PageWithText { page, text }))
}

/// DELETE /api/pages/{id}
async fn api_page_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.pages.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 生成请求；未给出的参数沿用配置中的 [generation]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    title: String,
    brief: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    features_count: Option<usize>,
    #[serde(default)]
    testimonials_count: Option<usize>,
    #[serde(default)]
    cta_link: Option<String>,
}

impl GenerateRequest {
    fn options(&self, base: &GenerationOptions) -> GenerationOptions {
        GenerationOptions {
            model: self.model.clone().or_else(|| base.model.clone()),
            max_tokens: self.max_tokens.unwrap_or(base.max_tokens),
            temperature: self.temperature.unwrap_or(base.temperature),
            features_count: self.features_count.unwrap_or(base.features_count),
            testimonials_count: self.testimonials_count.unwrap_or(base.testimonials_count),
            cta_link: self.cta_link.clone().unwrap_or_else(|| base.cta_link.clone()),
        }
    }
}

#[derive(Serialize)]
struct GenerateResponse {
    /// 预填充的新页面（未保存、未发布）
    page: Page,
    text: String,
    #[serde(flatten)]
    generated: GeneratedPage,
}

/// POST /api/generate：结果仅作为新页面的初始内容，不自动保存
async fn api_generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let options = req.options(&state.generation);

    let generated = state
        .generator
        .generate(&req.title, &req.brief, &options)
        .await?;
    let page = Page::pre_populated(
        req.title.trim(),
        generated.sections.clone(),
        generated.meta_tags.clone(),
    );
    let text = to_text(&generated.sections)
        .map_err(|e| PageError::InvalidInput(e.to_string()))?;
    Ok(Json(GenerateResponse {
        page,
        text,
        generated,
    }))
}

#[derive(Debug, Deserialize)]
struct PreviewRequest {
    text: String,
}

#[derive(Serialize)]
struct PreviewResponse {
    html: String,
    rendered: usize,
    skipped: usize,
}

/// POST /api/preview：渲染结构化文本；解析失败返回 422 与位置
async fn api_preview(Json(req): Json<PreviewRequest>) -> Result<Json<PreviewResponse>, ApiError> {
    let sections = from_text(&req.text).map_err(PageError::from)?;
    let document = render(&sections);
    Ok(Json(PreviewResponse {
        html: document.to_html(),
        rendered: document.len(),
        skipped: sections.len() - document.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request as HttpRequest;
    use pagesmith::llm::MockLlmClient;
    use pagesmith::page::MemoryPageStore;
    use tower::ServiceExt;

    fn test_state(llm: Option<Arc<MockLlmClient>>) -> Arc<AppState> {
        let llm = llm.map(|m| m as Arc<dyn pagesmith::llm::LlmClient>);
        Arc::new(AppState {
            pages: PageService::new(Arc::new(MemoryPageStore::new())),
            generator: PageGenerator::new(llm),
            generation: GenerationOptions::default(),
            admin_token: Some("secret".into()),
        })
    }

    fn admin(method: &str, uri: &str, body: Option<serde_json::Value>) -> HttpRequest<Body> {
        let builder = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header(ADMIN_TOKEN_HEADER, "secret")
            .header("content-type", "application/json");
        match body {
            Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_admin_requires_token() {
        let app = router(test_state(None));
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/pages")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router(test_state(None))
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/pages")
                    .header(ADMIN_TOKEN_HEADER, "secreT")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_token_matches() {
        assert!(token_matches("secret", "secret"));
        assert!(!token_matches("secret", "secre"));
        assert!(!token_matches("secret", "secret2"));
        assert!(!token_matches("secret", ""));
    }

    #[tokio::test]
    async fn test_publish_flow() {
        let state = test_state(None);
        let page = serde_json::json!({
            "title": "Home",
            "slug": "home",
            "isPublished": true,
            "sections": [
                {"type": "hero", "title": "Welcome", "order": 3},
                {"type": "pricing", "tiers": []}
            ]
        });
        let response = router(state.clone())
            .oneshot(admin("POST", "/api/pages", Some(page)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let saved = json_body(response).await;
        assert_eq!(saved["sections"][0]["order"], 0);

        let response = router(state)
            .oneshot(HttpRequest::builder().uri("/home").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("<title>Home</title>"));
        assert!(html.contains("Welcome"));
        assert!(!html.contains("pricing"));
    }

    #[tokio::test]
    async fn test_unpublished_page_is_not_public() {
        let state = test_state(None);
        state.pages.save(Page::new("Draft", "draft")).await.unwrap();
        let response = router(state)
            .oneshot(HttpRequest::builder().uri("/draft").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_slug_conflict_is_409() {
        let state = test_state(None);
        state.pages.save(Page::new("One", "same")).await.unwrap();
        let response = router(state)
            .oneshot(admin(
                "POST",
                "/api/pages",
                Some(serde_json::json!({"title": "Two", "slug": "same"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_preview_reports_parse_position() {
        let response = router(test_state(None))
            .oneshot(admin(
                "POST",
                "/api/preview",
                Some(serde_json::json!({"text": "[\n  {\"type\": \"hero\",\n}"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert!(body["line"].as_u64().unwrap() >= 2);
    }

    #[tokio::test]
    async fn test_generate_without_key_is_unavailable() {
        let response = router(test_state(None))
            .oneshot(admin(
                "POST",
                "/api/generate",
                Some(serde_json::json!({"title": "Bakery", "brief": "Bread"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_generate_malformed_returns_raw() {
        let mock = Arc::new(MockLlmClient::with_responses(["no json here"]));
        let response = router(test_state(Some(mock)))
            .oneshot(admin(
                "POST",
                "/api/generate",
                Some(serde_json::json!({"title": "Bakery", "brief": "Bread"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["raw"], "no json here");
    }

    #[tokio::test]
    async fn test_generate_prefills_unsaved_page() {
        let mock = Arc::new(MockLlmClient::new());
        let state = test_state(Some(mock));
        let response = router(state.clone())
            .oneshot(admin(
                "POST",
                "/api/generate",
                Some(serde_json::json!({"title": "Corner Bakery", "brief": "Bread"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["page"]["slug"], "corner-bakery");
        assert_eq!(body["page"]["isPublished"], false);
        assert!(body["sections"].as_array().is_some());
        assert!(state.pages.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_accepts_camel_case_overrides() {
        let mock = Arc::new(MockLlmClient::with_responses([r#"{"sections": []}"#]));
        let response = router(test_state(Some(mock.clone())))
            .oneshot(admin(
                "POST",
                "/api/generate",
                Some(serde_json::json!({
                    "title": "Bakery",
                    "brief": "Bread",
                    "model": "deepseek-reasoner",
                    "maxTokens": 1500,
                    "temperature": 0.25,
                    "featuresCount": 5,
                    "testimonialsCount": 1,
                    "ctaLink": "/order"
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let requests = mock.requests();
        let request = &requests[0];
        assert_eq!(request.model.as_deref(), Some("deepseek-reasoner"));
        assert_eq!(request.max_tokens, Some(1500));
        assert_eq!(request.temperature, Some(0.25));
        let prompt = &request.messages[1].content;
        assert!(prompt.contains("exactly 5 items"));
        assert!(prompt.contains("exactly 1 items"));
        assert!(prompt.contains("\"/order\""));
    }

    #[tokio::test]
    async fn test_generate_defaults_come_from_config() {
        let mock = Arc::new(MockLlmClient::with_responses([r#"{"sections": []}"#]));
        let response = router(test_state(Some(mock.clone())))
            .oneshot(admin(
                "POST",
                "/api/generate",
                Some(serde_json::json!({"title": "Bakery", "brief": "Bread"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let defaults = GenerationOptions::default();
        let request = &mock.requests()[0];
        assert_eq!(request.model, None);
        assert_eq!(request.max_tokens, Some(defaults.max_tokens));
        assert!(request.messages[1]
            .content
            .contains(&format!("exactly {} items", defaults.features_count)));
    }
}
