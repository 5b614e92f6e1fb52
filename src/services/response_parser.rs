//! LLM 返回内容解析
//!
//! 模型返回的是"近似 JSON"：常带 markdown 代码块或前后说明文字。
//! 这里只剥掉外层装饰，然后严格解析；任何一道题不合格，整批作废。

use regex::Regex;
use tracing::debug;

use crate::error::LlmError;
use crate::models::QuestionRecord;

/// 去掉代码块标记和数组前后的说明文字
pub fn strip_decoration(raw: &str) -> Result<String, LlmError> {
    let fence = Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```")
        .map_err(|e| LlmError::malformed(format!("正则构建失败: {}", e)))?;

    let body = match fence.captures(raw).and_then(|cap| cap.get(1)) {
        Some(inner) => inner.as_str().to_string(),
        // 没有成对的代码块时，去掉残留的标记
        None => raw.replace("```json", "").replace("```", ""),
    };

    let body = body.trim();
    match (body.find('['), body.rfind(']')) {
        (Some(start), Some(end)) if start < end => Ok(body[start..=end].to_string()),
        _ => Err(LlmError::malformed("返回内容中没有 JSON 数组")),
    }
}

/// 解析并校验题目列表
pub fn parse_questions(raw: &str) -> Result<Vec<QuestionRecord>, LlmError> {
    let body = strip_decoration(raw)?;
    debug!("待解析 JSON 长度: {} 字符", body.len());

    let records: Vec<QuestionRecord> = serde_json::from_str(&body)
        .map_err(|e| LlmError::malformed(format!("JSON 解析失败: {}", e)))?;

    if records.is_empty() {
        return Err(LlmError::malformed("题目列表为空"));
    }

    for (idx, record) in records.iter().enumerate() {
        record
            .validate()
            .map_err(|reason| LlmError::malformed(format!("第 {} 题不合格: {}", idx + 1, reason)))?;
    }

    Ok(records)
}
