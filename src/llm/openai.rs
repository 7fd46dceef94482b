//! OpenAI 兼容的 Chat Completions 客户端（DeepSeek、OpenAI、自建代理等）

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, FinishReason,
};
use async_openai::Client;
use async_trait::async_trait;

use super::traits::{CompletionRequest, LlmClient, Message, Role, Usage};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
    usage: Mutex<Usage>,
}

impl OpenAiClient {
    /// api_key 由调用方从环境变量取得
    pub fn new(base_url: Option<&str>, model: &str, api_key: &str) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = base_url {
            config = config.with_api_base(url);
        }
        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            timeout: DEFAULT_TIMEOUT,
            usage: Mutex::new(Usage::default()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, request: &CompletionRequest) -> Result<CreateChatCompletionRequest, String> {
        let messages = request
            .messages
            .iter()
            .map(convert_message)
            .collect::<Result<Vec<_>, _>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(request.model.as_deref().unwrap_or(&self.model))
            .messages(messages);
        if let Some(max_tokens) = request.max_tokens {
            args.max_completion_tokens(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            args.temperature(temperature);
        }
        args.build().map_err(|e| format!("invalid completion request: {}", e))
    }

    fn record_usage(&self, prompt_tokens: u64, completion_tokens: u64) {
        if let Ok(mut usage) = self.usage.lock() {
            usage.requests += 1;
            usage.prompt_tokens += prompt_tokens;
            usage.completion_tokens += completion_tokens;
        }
    }
}

fn convert_message(message: &Message) -> Result<ChatCompletionRequestMessage, String> {
    let content = message.content.clone();
    let converted = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()
            .map(ChatCompletionRequestMessage::System),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map(ChatCompletionRequestMessage::User),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()
            .map(ChatCompletionRequestMessage::Assistant),
    };
    converted.map_err(|e| format!("invalid {:?} message: {}", message.role, e))
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, String> {
        let api_request = self.build_request(request)?;
        let started = Instant::now();

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(api_request))
            .await
            .map_err(|_| format!("generation service did not answer within {}s", self.timeout.as_secs()))?
            .map_err(|e| format!("generation service error: {}", e))?;

        let (prompt_tokens, completion_tokens) = response
            .usage
            .as_ref()
            .map(|u| (u.prompt_tokens as u64, u.completion_tokens as u64))
            .unwrap_or_default();
        self.record_usage(prompt_tokens, completion_tokens);
        tracing::debug!(
            model = %response.model,
            prompt_tokens,
            completion_tokens,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Completion received"
        );

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| "generation service returned no choices".to_string())?;
        if matches!(choice.finish_reason, Some(FinishReason::Length)) {
            // 被 max_tokens 截断的回复通常是不完整的 JSON
            tracing::warn!("Completion truncated at max_tokens; raise generation.max_tokens");
        }
        Ok(choice.message.content.unwrap_or_default())
    }

    fn usage(&self) -> Usage {
        self.usage.lock().map(|u| *u).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_to_client_model() {
        let client = OpenAiClient::new(None, "deepseek-chat", "sk-test");
        let request = CompletionRequest {
            messages: vec![Message::system("s"), Message::user("u")],
            ..Default::default()
        };
        let built = client.build_request(&request).unwrap();
        assert_eq!(built.model, "deepseek-chat");
        assert_eq!(built.messages.len(), 2);
    }

    #[test]
    fn test_request_overrides() {
        let client = OpenAiClient::new(Some("http://localhost:9/v1"), "base", "sk-test")
            .with_timeout(Duration::from_secs(5));
        let request = CompletionRequest {
            messages: vec![Message::user("u")],
            model: Some("other".into()),
            max_tokens: Some(1000),
            temperature: Some(0.3),
        };
        let built = client.build_request(&request).unwrap();
        assert_eq!(built.model, "other");
        assert_eq!(built.max_completion_tokens, Some(1000));
        assert_eq!(built.temperature, Some(0.3));
        assert_eq!(client.usage(), Usage::default());
    }
}
