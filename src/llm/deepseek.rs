//! DeepSeek 后端（OpenAI 兼容接口）

use super::OpenAiClient;

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";

/// 密钥取自 DEEPSEEK_API_KEY，其次 OPENAI_API_KEY；都没有时返回 None
pub fn create_deepseek_client(model: &str, base_url: Option<&str>) -> Option<OpenAiClient> {
    let api_key = ["DEEPSEEK_API_KEY", "OPENAI_API_KEY"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|key| !key.trim().is_empty())?;
    let model = if model.trim().is_empty() {
        DEEPSEEK_CHAT
    } else {
        model
    };
    Some(OpenAiClient::new(
        Some(base_url.unwrap_or(DEEPSEEK_BASE_URL)),
        model,
        &api_key,
    ))
}
