//! Mock LLM 客户端（用于测试与离线演示，无需 API）
//!
//! 依次返回预置回复；预置回复用完后返回一个最小的合法页面信封。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::traits::{CompletionRequest, LlmClient};

const FALLBACK_RESPONSE: &str = r##"{
  "sections": [
    {"type": "hero", "title": "Welcome", "subtitle": "Generated offline", "order": 0},
    {"type": "content", "title": "About", "content": "<p>Placeholder content.</p>", "order": 1}
  ],
  "metaTags": {"description": "Generated offline", "keywords": "demo"}
}"##;

/// Mock 客户端：按顺序回放预置回复，并记录收到的请求
#[derive(Debug, Default)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 已收到的请求（测试断言用）
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let next = self
            .responses
            .lock()
            .map_err(|e| e.to_string())?
            .pop_front();
        Ok(next.unwrap_or_else(|| FALLBACK_RESPONSE.to_string()))
    }
}
