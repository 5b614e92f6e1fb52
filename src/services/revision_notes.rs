//! 复习笔记服务 - 业务能力层
//!
//! 根据答错的题目生成复习笔记。失败时降级为固定提示，不影响成绩展示。

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::ModelEndpoint;
use crate::models::{Language, QuestionRecord};
use crate::services::QuestionSource;

/// 全部答对时的提示
pub const NO_MISTAKES_MESSAGE: &str = "Perfect Score! You're ready for the exam!";
/// 生成失败时的降级提示
pub const NOTES_FALLBACK_MESSAGE: &str =
    "Revision notes could not be generated right now. Please try again later.";
/// 没有子主题时使用的标签
pub const GENERIC_TOPIC_LABEL: &str = "General";

const NOTES_SYSTEM_MESSAGE: &str = "You are a Kerala PSC coach who writes concise, high-yield revision notes.";

/// 复习笔记服务
pub struct RevisionNotesService<E> {
    source: Arc<QuestionSource<E>>,
}

impl<E: ModelEndpoint> RevisionNotesService<E> {
    pub fn new(source: Arc<QuestionSource<E>>) -> Self {
        Self { source }
    }

    /// 生成复习笔记
    ///
    /// 没有错题时直接返回固定提示，不调用模型。
    pub async fn generate_notes(&self, missed: &[&QuestionRecord], language: Language) -> String {
        if missed.is_empty() {
            return NO_MISTAKES_MESSAGE.to_string();
        }

        let topics = collect_topics(missed);
        info!("📝 正在生成复习笔记，涉及 {} 个主题", topics.len());

        let prompt = build_notes_prompt(&topics, language);
        match self.source.generate_text(Some(NOTES_SYSTEM_MESSAGE), &prompt).await {
            Ok(notes) => {
                info!("✓ 复习笔记生成完成");
                notes
            }
            Err(e) => {
                warn!("⚠️ 复习笔记生成失败，使用降级提示: {}", e);
                NOTES_FALLBACK_MESSAGE.to_string()
            }
        }
    }
}

/// 收集错题的子主题，去重并保持首次出现的顺序
pub fn collect_topics(missed: &[&QuestionRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    missed
        .iter()
        .map(|q| {
            q.sub_topic
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(GENERIC_TOPIC_LABEL)
                .to_string()
        })
        .filter(|topic| seen.insert(topic.clone()))
        .collect()
}

fn build_notes_prompt(topics: &[String], language: Language) -> String {
    format!(
        "The student got these topics wrong: {}.\n\
         Provide high-yield bulleted revision notes in {} for these specific areas based on Kerala PSC trends.\n\
         Cover exactly these topics and nothing else.",
        topics.join(", "),
        language
    )
}
