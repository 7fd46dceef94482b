//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `PAGESMITH__*` 覆盖（双下划线表示嵌套，如 `PAGESMITH__LLM__PROVIDER=openai`）。
//! API Key 不进配置文件，只从环境变量读取（DEEPSEEK_API_KEY / OPENAI_API_KEY）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub generation: GenerationSection,
    #[serde(default)]
    pub web: WebSection,
}

/// [app] 段：应用名、页面数据库
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// SQLite 文件路径；未设置时使用内存存储
    pub database_path: Option<PathBuf>,
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：deepseek / openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次生成请求超时（秒）；生成较慢，默认比普通对话长
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    120
}

/// [generation] 段：页面生成的默认参数（单次请求可覆盖）
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationSection {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_features_count")]
    pub features_count: usize,
    #[serde(default = "default_testimonials_count")]
    pub testimonials_count: usize,
    #[serde(default = "default_cta_link")]
    pub cta_link: String,
    /// 是否清洗生成内容中的脚本与事件属性
    #[serde(default = "default_sanitize_markup")]
    pub sanitize_markup: bool,
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            features_count: default_features_count(),
            testimonials_count: default_testimonials_count(),
            cta_link: default_cta_link(),
            sanitize_markup: default_sanitize_markup(),
        }
    }
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_features_count() -> usize {
    3
}

fn default_testimonials_count() -> usize {
    2
}

fn default_cta_link() -> String {
    "/contact".to_string()
}

fn default_sanitize_markup() -> bool {
    true
}

/// [web] 段：监听地址与管理员令牌
#[derive(Debug, Clone, Deserialize)]
pub struct WebSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// 管理接口令牌（请求头 x-admin-token）；未设置时管理接口全部拒绝
    pub admin_token: Option<String>,
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            admin_token: None,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// 从 config 目录加载配置，环境变量 PAGESMITH__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 PAGESMITH__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("PAGESMITH")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
