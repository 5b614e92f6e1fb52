//! 出题服务 - 业务能力层
//!
//! 负责"向模型要题"的能力：构建提示词、按密钥轮换重试、解析校验。
//!
//! ## 重试策略
//! - 每次调用最多尝试 `N` 次（`N` 为密钥数量），每个密钥一次
//! - 限流、返回格式错误、网络错误一律换下一个密钥，等待退避时间后重试
//! - 成功的密钥保持为当前密钥，下次调用从它开始
//! - `N` 次都失败时返回 `ExhaustedAllCredentials`，不再继续

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::clients::{GenerationRequest, ModelEndpoint};
use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError, LlmError};
use crate::infrastructure::{mask_key, BackoffPolicy, KeyPool};
use crate::models::{QuestionRecord, QuizRequest};
use crate::services::response_parser;
use crate::utils::truncate_text;

const QUESTION_SYSTEM_MESSAGE: &str = "You are an experienced Kerala PSC exam setter. \
    You reply with raw JSON only, never with commentary or markdown.";

/// 出题服务
///
/// 职责：
/// - 持有模型端点和共享的密钥池
/// - 提供带轮换重试的文本生成能力
/// - 只返回完整通过校验的题目列表
/// - 不持有答题会话
pub struct QuestionSource<E> {
    endpoint: E,
    key_pool: Arc<KeyPool>,
    model_name: String,
    backoff: BackoffPolicy,
    max_question_count: usize,
}

impl<E: ModelEndpoint> QuestionSource<E> {
    /// 创建新的出题服务
    pub fn new(config: &Config, endpoint: E, key_pool: Arc<KeyPool>) -> Self {
        Self {
            endpoint,
            key_pool,
            model_name: config.llm_model_name.clone(),
            backoff: config.backoff_policy(),
            max_question_count: config.max_question_count,
        }
    }

    /// 替换退避策略
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn key_pool(&self) -> &KeyPool {
        &self.key_pool
    }

    pub fn max_question_count(&self) -> usize {
        self.max_question_count
    }

    /// 生成一批题目
    ///
    /// 返回的每道题都满足：恰好 4 个不重复选项，答案是其中之一。
    pub async fn fetch_questions(&self, request: &QuizRequest) -> AppResult<Vec<QuestionRecord>> {
        request
            .validate(self.max_question_count)
            .map_err(AppError::InvalidRequest)?;

        info!(
            "🤖 正在生成 {} 道题 | 主题: {} | 语言: {} | 级别: {}",
            request.count, request.topic, request.language, request.level
        );

        let prompt = build_question_prompt(request);
        let questions = self
            .call_with_rotation(Some(QUESTION_SYSTEM_MESSAGE), &prompt, response_parser::parse_questions)
            .await?;

        if questions.len() != request.count {
            warn!(
                "⚠️ 请求 {} 道题，模型返回了 {} 道",
                request.count,
                questions.len()
            );
        }
        info!("✓ 题目生成完成，共 {} 道", questions.len());

        Ok(questions)
    }

    /// 生成自由文本，沿用同一套轮换重试
    pub async fn generate_text(&self, system_message: Option<&str>, prompt: &str) -> AppResult<String> {
        self.call_with_rotation(system_message, prompt, |text| {
            let text = text.trim();
            if text.is_empty() {
                Err(LlmError::malformed("LLM 返回内容为空"))
            } else {
                Ok(text.to_string())
            }
        })
        .await
    }

    /// 带密钥轮换的调用
    ///
    /// `decode` 失败与调用失败一样计入同一个尝试预算。
    async fn call_with_rotation<T, F>(
        &self,
        system_message: Option<&str>,
        prompt: &str,
        decode: F,
    ) -> AppResult<T>
    where
        F: Fn(&str) -> Result<T, LlmError>,
    {
        let attempts = self.key_pool.len();
        if attempts == 0 {
            return Err(ConfigError::NoCredentials.into());
        }

        for attempt in 1..=attempts {
            let credential = self.key_pool.current_credential()?;
            debug!(
                "尝试 {}/{}，使用密钥 #{} ({})",
                attempt,
                attempts,
                credential.slot,
                mask_key(credential.key)
            );

            let request = GenerationRequest {
                api_key: credential.key,
                model: &self.model_name,
                system_message,
                prompt,
            };

            let outcome = match self.endpoint.generate(request).await {
                Ok(text) => decode(&text).map_err(|e| {
                    debug!("原始返回: {}", truncate_text(&text, 200));
                    e
                }),
                Err(e) => Err(e),
            };

            let error = match outcome {
                Ok(value) => {
                    debug!("密钥 #{} 调用成功", credential.slot);
                    return Ok(value);
                }
                Err(e) if e.is_retryable() => e,
                Err(e) => return Err(e.into()),
            };

            let next_slot = self.key_pool.rotate_from(credential.slot)?;
            warn!(
                "LLM 调用失败 (尝试 {}/{}): {}，切换到密钥 #{}",
                attempt, attempts, error, next_slot
            );

            if attempt < attempts {
                let delay = self.backoff.delay(attempt - 1);
                if !delay.is_zero() {
                    debug!("等待 {:?} 后重试...", delay);
                    sleep(delay).await;
                }
            }
        }

        warn!("❌ 所有 {} 个密钥均尝试失败", attempts);
        Err(LlmError::ExhaustedAllCredentials { attempts }.into())
    }
}

/// 构建出题提示词
fn build_question_prompt(request: &QuizRequest) -> String {
    format!(
        r#"Generate {count} REAL Kerala PSC questions (2021-2025) on '{topic}' for {level} level.
Language: {language}.
Format as a JSON list of dictionaries:
[{{
  "question": "...",
  "options": ["A", "B", "C", "D"],
  "answer": "Exact correct string, copied from options",
  "explanation": "Brief context/fact in {language}",
  "sub_topic": "Specific sub-area"
}}]
Every question must have exactly 4 different options.
Return ONLY the raw JSON."#,
        count = request.count,
        topic = request.topic.trim(),
        level = request.level,
        language = request.language,
    )
}
