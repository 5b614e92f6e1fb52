/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::workflow::Score;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug 或 info
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config, key_count: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 PSC Tutor 启动");
    info!("🤖 模型: {} | 端点: {}", config.llm_model_name, config.llm_api_base_url);
    info!("🔑 已加载 {} 个 API 密钥", key_count);
    info!("📊 单次最多 {} 道题", config.max_question_count);
    info!("{}", "=".repeat(60));
}

/// 打印测验统计信息
pub fn log_quiz_summary(score: &Score, missed_topics: &[String]) {
    info!("\n{}", "=".repeat(60));
    info!("📊 测验统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 得分: {} ({:.1}%)", score, score.percentage());
    info!("❌ 错题主题: {}", if missed_topics.is_empty() { "无".to_string() } else { missed_topics.join(", ") });
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("abc", 3), "abc");
        assert_eq!(truncate_text("പെരിയാർ", 2), "പെ...");
    }
}
