use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 答题会话错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 文档生成错误
    #[error("文档错误: {0}")]
    Document(#[from] DocumentError),
    /// 出题请求参数不合法
    #[error("请求参数错误: {0}")]
    InvalidRequest(String),
}

impl AppError {
    /// 展示给用户的提示文本
    pub fn user_message(&self) -> String {
        match self {
            AppError::Llm(LlmError::ExhaustedAllCredentials { .. }) => {
                "The question service is busy right now. Please try again later.".to_string()
            }
            AppError::Config(ConfigError::NoCredentials) => {
                "No API keys are configured. Set GEMINI_KEY or GEMINI_KEYS.".to_string()
            }
            AppError::InvalidRequest(reason) => format!("Invalid quiz settings: {}", reason),
            other => other.to_string(),
        }
    }

    /// 是否为所有密钥都已耗尽的终止错误
    pub fn is_exhausted(&self) -> bool {
        matches!(self, AppError::Llm(LlmError::ExhaustedAllCredentials { .. }))
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 没有可用的 API 密钥
    #[error("没有可用的 API 密钥")]
    NoCredentials,
    /// 读取密钥文件失败
    #[error("读取密钥文件失败 ({path}): {source}")]
    SecretsReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 密钥文件 TOML 解析失败
    #[error("密钥文件解析失败 ({path}): {source}")]
    SecretsParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// LLM 服务错误
///
/// 前三种是单次尝试的失败，会触发换密钥重试；
/// `ExhaustedAllCredentials` 是终止错误。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    /// 当前密钥额度耗尽或被限流
    #[error("API 额度耗尽或请求被限流: {message}")]
    QuotaExhausted { message: String },
    /// 返回内容无法解析或校验失败
    #[error("LLM 返回格式错误: {reason}")]
    MalformedResponse { reason: String },
    /// 网络或服务端错误
    #[error("LLM API 调用失败: {message}")]
    Transport { message: String },
    /// 所有密钥都已尝试失败
    #[error("所有 {attempts} 个 API 密钥均尝试失败")]
    ExhaustedAllCredentials { attempts: usize },
}

impl LlmError {
    /// 是否应该换密钥重试
    pub fn is_retryable(&self) -> bool {
        !matches!(self, LlmError::ExhaustedAllCredentials { .. })
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        LlmError::MalformedResponse {
            reason: reason.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        LlmError::Transport {
            message: message.into(),
        }
    }

    pub fn quota(message: impl Into<String>) -> Self {
        LlmError::QuotaExhausted {
            message: message.into(),
        }
    }
}

/// 答题会话错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// 当前没有进行中的测验
    #[error("当前没有进行中的测验")]
    NotInProgress,
    /// 题目列表为空
    #[error("题目列表不能为空")]
    EmptyQuestionSet,
    /// 还没到最后一题
    #[error("只能在最后一题提交 (当前: {index}, 共 {total} 题)")]
    NotAtLastQuestion { index: usize, total: usize },
    /// 选项不属于当前题目
    #[error("选项不属于当前题目: {option}")]
    UnknownOption { option: String },
    /// 测验尚未结束
    #[error("测验尚未结束")]
    NotFinished,
}

/// 文档生成错误
#[derive(Debug, Error)]
pub enum DocumentError {
    /// 读取字体文件失败
    #[error("读取字体失败 ({path}): {source}")]
    FontReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// PDF 生成失败
    #[error("PDF 生成失败: {0}")]
    Pdf(String),
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
