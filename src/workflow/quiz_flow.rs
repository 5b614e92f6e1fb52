//! 测验流程 - 流程层
//!
//! 核心职责：定义"一次测验"的完整处理流程
//!
//! 流程顺序：
//! 1. 出题 → 装入会话
//! 2. （用户答题，由界面驱动会话）
//! 3. 计分 → 复习笔记 → PDF

use std::sync::Arc;

use tracing::{error, info};

use crate::clients::ModelEndpoint;
use crate::error::{AppResult, SessionError};
use crate::models::{Language, QuizRequest};
use crate::services::revision_notes::collect_topics;
use crate::services::{DocumentRenderer, QuestionSource, RenderedDocument, RevisionNotesService};
use crate::workflow::quiz_session::{QuizSession, Score, SessionPhase};

/// 测验结果
#[derive(Debug, Clone)]
pub struct QuizReport {
    pub score: Score,
    pub missed_topics: Vec<String>,
    pub notes: String,
    /// 有错题且 PDF 生成成功时才有
    pub document: Option<RenderedDocument>,
}

impl QuizReport {
    pub fn is_perfect(&self) -> bool {
        self.score.total > 0 && self.score.correct == self.score.total
    }
}

/// 测验流程
///
/// - 编排出题、计分、笔记和文档生成
/// - 不持有会话，会话由调用方按用户隔离并显式传入
pub struct QuizFlow<E, R> {
    source: Arc<QuestionSource<E>>,
    notes: RevisionNotesService<E>,
    renderer: R,
}

impl<E: ModelEndpoint, R: DocumentRenderer> QuizFlow<E, R> {
    /// 创建新的测验流程
    pub fn new(source: Arc<QuestionSource<E>>, renderer: R) -> Self {
        Self {
            notes: RevisionNotesService::new(Arc::clone(&source)),
            source,
            renderer,
        }
    }

    pub fn source(&self) -> &QuestionSource<E> {
        &self.source
    }

    /// 开始新测验
    ///
    /// 成功时整体替换会话内容，返回题目数量；失败时会话保持不变。
    pub async fn start_quiz(&self, session: &mut QuizSession, request: &QuizRequest) -> AppResult<usize> {
        let questions = self.source.fetch_questions(request).await?;
        let count = questions.len();
        session.start(questions)?;
        info!("🚀 新测验开始，共 {} 题", count);
        Ok(count)
    }

    /// 汇总已提交的测验
    pub async fn complete(&self, session: &QuizSession, language: Language) -> AppResult<QuizReport> {
        if session.phase() != SessionPhase::Finished {
            return Err(SessionError::NotFinished.into());
        }

        let score = session.score();
        let missed = session.missed_questions();
        info!("🏆 测验完成，得分 {} ({:.1}%)", score, score.percentage());

        let missed_topics = collect_topics(&missed);
        let notes = self.notes.generate_notes(&missed, language).await;

        let document = if missed.is_empty() {
            None
        } else {
            match self.renderer.render(&notes) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    error!("❌ PDF 生成失败: {}", e);
                    None
                }
            }
        };

        Ok(QuizReport {
            score,
            missed_topics,
            notes,
            document,
        })
    }
}
