/// LLM API 客户端
///
/// 封装所有与模型端点相关的调用逻辑
///
/// ## 技术栈
/// - 使用 `async-openai` crate 进行 API 调用
/// - 兼容 OpenAI API 的服务（如 Gemini 的 OpenAI 兼容端点）
use std::future::Future;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::LlmError;

/// 一次生成请求
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub api_key: &'a str,
    pub model: &'a str,
    pub system_message: Option<&'a str>,
    pub prompt: &'a str,
}

/// 模型端点
///
/// 只约定"发送提示词，返回文本"，不关心密钥轮换和解析
pub trait ModelEndpoint: Send + Sync {
    fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;
}

/// OpenAI 兼容端点
pub struct OpenAiEndpoint {
    api_base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiEndpoint {
    /// 创建新的端点
    pub fn new(config: &Config) -> Self {
        Self {
            api_base_url: config.llm_api_base_url.clone(),
            temperature: 0.7,
            max_tokens: 8192,
        }
    }

    fn build_messages(
        system_message: Option<&str>,
        prompt: &str,
    ) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        Ok(messages)
    }
}

impl ModelEndpoint for OpenAiEndpoint {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, LlmError> {
        debug!("调用 LLM API，模型: {}", request.model);
        debug!("用户消息长度: {} 字符", request.prompt.len());

        // 每个密钥一个客户端
        let openai_config = OpenAIConfig::new()
            .with_api_key(request.api_key)
            .with_api_base(&self.api_base_url);
        let client = Client::with_config(openai_config);

        let messages = Self::build_messages(request.system_message, request.prompt)
            .map_err(|e| LlmError::transport(format!("构建消息失败: {}", e)))?;

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(request.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| LlmError::transport(format!("构建请求失败: {}", e)))?;

        let response = client.chat().create(chat_request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            classify_error(&e.to_string())
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LlmError::malformed("LLM 返回内容为空"))?;

        let content = content.trim();
        if content.is_empty() {
            return Err(LlmError::malformed("LLM 返回内容为空"));
        }

        Ok(content.to_string())
    }
}

/// 根据错误信息判断是限流还是普通传输错误
pub fn classify_error(message: &str) -> LlmError {
    let lower = message.to_lowercase();
    let is_quota = ["429", "rate limit", "rate_limit", "quota", "resource_exhausted", "too many requests"]
        .iter()
        .any(|marker| lower.contains(marker));

    if is_quota {
        LlmError::quota(message)
    } else {
        LlmError::transport(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_quota_errors() {
        assert!(matches!(
            classify_error("status 429: Resource has been exhausted (e.g. check quota)."),
            LlmError::QuotaExhausted { .. }
        ));
        assert!(matches!(
            classify_error("RESOURCE_EXHAUSTED"),
            LlmError::QuotaExhausted { .. }
        ));
        assert!(matches!(
            classify_error("Rate limit reached for requests"),
            LlmError::QuotaExhausted { .. }
        ));
    }

    #[test]
    fn test_classify_transport_errors() {
        assert!(matches!(
            classify_error("error sending request: connection refused"),
            LlmError::Transport { .. }
        ));
    }

    /// 测试真实 API 调用（需要 GEMINI_KEY）
    #[tokio::test]
    #[ignore]
    async fn test_generate_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let config = Config::from_env();
        let endpoint = OpenAiEndpoint::new(&config);
        let key = config.api_keys.first().cloned().unwrap_or_default();

        let result = endpoint
            .generate(GenerationRequest {
                api_key: &key,
                model: &config.llm_model_name,
                system_message: Some("Answer in one short sentence."),
                prompt: "What is the capital of Kerala?",
            })
            .await;

        match result {
            Ok(response) => {
                println!("LLM 响应: {}", response);
                assert!(!response.is_empty());
            }
            Err(e) => panic!("测试失败: {}", e),
        }
    }
}
