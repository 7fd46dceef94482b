//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）

pub mod deepseek;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;
use std::time::Duration;

pub use deepseek::{create_deepseek_client, DEEPSEEK_BASE_URL, DEEPSEEK_CHAT};
pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use traits::{CompletionRequest, LlmClient, Message, Role, Usage};

use crate::config::LlmSection;

/// 按配置创建客户端；缺少 API Key 时返回 None（生成功能不可用）
pub fn create_llm_from_config(section: &LlmSection) -> Option<Arc<dyn LlmClient>> {
    let client = match section.provider.as_str() {
        "mock" => {
            tracing::info!("LLM provider mock: canned responses only");
            return Some(Arc::new(MockLlmClient::new()));
        }
        "openai" => std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(|key| OpenAiClient::new(section.base_url.as_deref(), &section.model, &key)),
        "deepseek" => create_deepseek_client(&section.model, section.base_url.as_deref()),
        other => {
            tracing::warn!("Unknown LLM provider {:?}, content generation disabled", other);
            return None;
        }
    };

    match client {
        Some(client) => {
            tracing::info!(
                "LLM provider {} ready (model {})",
                section.provider,
                client.model()
            );
            let timeout = Duration::from_secs(section.timeouts.request);
            Some(Arc::new(client.with_timeout(timeout)))
        }
        None => {
            tracing::warn!(
                "No API key for provider {}, content generation disabled",
                section.provider
            );
            None
        }
    }
}
