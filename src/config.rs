use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::infrastructure::BackoffPolicy;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    /// API 密钥列表，按顺序轮换
    pub api_keys: Vec<String>,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    // --- 出题配置 ---
    /// 单次最多生成的题目数量
    pub max_question_count: usize,
    /// 默认题目数量
    pub default_question_count: usize,
    // --- 重试配置 ---
    pub backoff_initial_ms: u64,
    pub backoff_multiplier: f64,
    pub backoff_max_ms: u64,
    // --- 文档配置 ---
    /// 复习笔记使用的字体文件
    pub font_path: Option<String>,
    /// 复习笔记 PDF 输出路径
    pub notes_output_path: String,
    /// 密钥文件路径
    pub secrets_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-3-flash-preview".to_string(),
            max_question_count: 50,
            default_question_count: 10,
            backoff_initial_ms: 1500,
            backoff_multiplier: 1.5,
            backoff_max_ms: 30_000,
            font_path: Some("NotoSansMalayalam-Regular.ttf".to_string()),
            notes_output_path: "PSC_Revision_Notes.pdf".to_string(),
            secrets_file: ".streamlit/secrets.toml".to_string(),
            verbose_logging: false,
        }
    }
}

/// 密钥文件格式
///
/// ```toml
/// GEMINI_KEY = "..."
/// GEMINI_KEYS = ["...", "..."]
/// ```
#[derive(Debug, Default, Deserialize)]
struct Secrets {
    #[serde(rename = "GEMINI_KEY")]
    gemini_key: Option<String>,
    #[serde(rename = "GEMINI_KEYS", default)]
    gemini_keys: Vec<String>,
}

impl Secrets {
    fn into_keys(self) -> Vec<String> {
        let mut keys = self.gemini_keys;
        if let Some(key) = self.gemini_key {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        let api_keys = select_env_keys(
            std::env::var("GEMINI_KEYS").ok(),
            std::env::var("GEMINI_KEY").ok(),
        )
        .unwrap_or(default.api_keys);
        Self {
            api_keys,
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            max_question_count: std::env::var("MAX_QUESTION_COUNT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_question_count),
            default_question_count: std::env::var("DEFAULT_QUESTION_COUNT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.default_question_count),
            backoff_initial_ms: std::env::var("BACKOFF_INITIAL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.backoff_initial_ms),
            backoff_multiplier: std::env::var("BACKOFF_MULTIPLIER").ok().and_then(|v| v.parse().ok()).unwrap_or(default.backoff_multiplier),
            backoff_max_ms: std::env::var("BACKOFF_MAX_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.backoff_max_ms),
            font_path: std::env::var("FONT_PATH").ok().or(default.font_path),
            notes_output_path: std::env::var("NOTES_OUTPUT_PATH").unwrap_or(default.notes_output_path),
            secrets_file: std::env::var("SECRETS_FILE").unwrap_or(default.secrets_file),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// 读取环境变量，未配置密钥时再读取密钥文件
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_env();
        if config.api_keys.is_empty() {
            let path = config.secrets_file.clone();
            if Path::new(&path).exists() {
                config.api_keys = load_secrets_file(&path)?;
                info!("从密钥文件加载了 {} 个 API 密钥: {}", config.api_keys.len(), path);
            } else {
                debug!("密钥文件不存在: {}", path);
            }
        }
        Ok(config)
    }

    /// 启动前检查，没有密钥时直接失败
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_keys.iter().all(|k| k.trim().is_empty()) {
            return Err(ConfigError::NoCredentials);
        }
        Ok(())
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.backoff_initial_ms),
            self.backoff_multiplier,
            Duration::from_millis(self.backoff_max_ms),
        )
    }
}

/// 解析逗号分隔的密钥列表
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// `GEMINI_KEYS` 优先；解析为空时回落到 `GEMINI_KEY`
fn select_env_keys(keys: Option<String>, key: Option<String>) -> Option<Vec<String>> {
    [keys, key]
        .into_iter()
        .flatten()
        .map(|v| parse_key_list(&v))
        .find(|list| !list.is_empty())
}

fn load_secrets_file(path: &str) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::SecretsReadFailed {
        path: path.to_string(),
        source,
    })?;
    parse_secrets(&content).map_err(|source| ConfigError::SecretsParseFailed {
        path: path.to_string(),
        source,
    })
}

fn parse_secrets(content: &str) -> Result<Vec<String>, toml::de::Error> {
    let secrets: Secrets = toml::from_str(content)?;
    Ok(secrets.into_keys())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_list() {
        assert_eq!(parse_key_list("a, b,,c "), vec!["a", "b", "c"]);
        assert!(parse_key_list(" , ").is_empty());
    }

    #[test]
    fn test_empty_key_list_falls_back_to_single_key() {
        let some = |v: &str| Some(v.to_string());
        assert_eq!(select_env_keys(some(" , ,"), some("k1")), Some(vec!["k1".to_string()]));
        assert_eq!(select_env_keys(some(""), some("k1")), Some(vec!["k1".to_string()]));
        assert_eq!(
            select_env_keys(some("a,b"), some("k1")),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(select_env_keys(None, some("k1")), Some(vec!["k1".to_string()]));
        assert_eq!(select_env_keys(some(","), None), None);
        assert_eq!(select_env_keys(None, None), None);
    }

    #[test]
    fn test_parse_secrets_single_and_list() {
        let keys = parse_secrets(r#"GEMINI_KEY = "k1""#).unwrap();
        assert_eq!(keys, vec!["k1"]);

        let keys = parse_secrets(
            r#"
GEMINI_KEYS = ["k1", "k2"]
GEMINI_KEY = "k2"
"#,
        )
        .unwrap();
        assert_eq!(keys, vec!["k1", "k2"]);
    }

    #[test]
    fn test_parse_secrets_invalid() {
        assert!(parse_secrets("GEMINI_KEYS = 42").is_err());
    }

    #[test]
    fn test_validate_requires_keys() {
        let mut config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::NoCredentials)));

        config.api_keys = vec!["  ".to_string()];
        assert!(config.validate().is_err());

        config.api_keys = vec!["key".to_string()];
        assert!(config.validate().is_ok());
    }
}
