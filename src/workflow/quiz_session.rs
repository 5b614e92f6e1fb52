//! 答题会话
//!
//! 一个用户会话的全部状态：题目、当前位置、已选答案、是否已提交。
//!
//! 状态流转：`Empty → InProgress → Finished → Empty`

use std::collections::BTreeMap;
use std::fmt;

use crate::error::SessionError;
use crate::models::QuestionRecord;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Empty,
    InProgress,
    Finished,
}

/// 选择答案的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// 本次选择已记录
    Recorded { correct: bool },
    /// 这道题已经答过，本次选择被忽略
    AlreadyAnswered { recorded: String },
}

/// 得分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

impl Score {
    /// 正确率，分母为 0 时返回 0.0
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }

    pub fn percentage(&self) -> f64 {
        self.ratio() * 100.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.correct, self.total)
    }
}

/// 答题会话
///
/// 只属于一个用户，不跨会话共享，也不持久化。
#[derive(Debug, Clone, Default)]
pub struct QuizSession {
    questions: Vec<QuestionRecord>,
    current_index: usize,
    answers: BTreeMap<usize, String>,
    finished: bool,
}

impl QuizSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.questions.is_empty() {
            SessionPhase::Empty
        } else if self.finished {
            SessionPhase::Finished
        } else {
            SessionPhase::InProgress
        }
    }

    /// 装入一批新题目，整体替换之前的状态
    pub fn start(&mut self, questions: Vec<QuestionRecord>) -> Result<(), SessionError> {
        if questions.is_empty() {
            return Err(SessionError::EmptyQuestionSet);
        }
        self.questions = questions;
        self.current_index = 0;
        self.answers.clear();
        self.finished = false;
        Ok(())
    }

    /// 回到 Empty 状态
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&QuestionRecord> {
        self.questions.get(self.current_index)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_last_question(&self) -> bool {
        !self.questions.is_empty() && self.current_index + 1 == self.questions.len()
    }

    pub fn answer_for(&self, index: usize) -> Option<&str> {
        self.answers.get(&index).map(String::as_str)
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        if self.phase() == SessionPhase::InProgress {
            Ok(())
        } else {
            Err(SessionError::NotInProgress)
        }
    }

    /// 下一题，到最后一题后不再前进
    pub fn next(&mut self) -> Result<usize, SessionError> {
        self.go_to(self.current_index.saturating_add(1))
    }

    /// 上一题，到第一题后不再后退
    pub fn previous(&mut self) -> Result<usize, SessionError> {
        self.go_to(self.current_index.saturating_sub(1))
    }

    /// 跳到指定题目，超出范围时取边界
    pub fn go_to(&mut self, index: usize) -> Result<usize, SessionError> {
        self.ensure_in_progress()?;
        self.current_index = index.min(self.questions.len() - 1);
        Ok(self.current_index)
    }

    /// 为当前题目选择答案，每题只记录第一次选择
    pub fn select_answer(&mut self, option: &str) -> Result<AnswerOutcome, SessionError> {
        self.ensure_in_progress()?;
        let index = self.current_index;

        if let Some(recorded) = self.answers.get(&index) {
            return Ok(AnswerOutcome::AlreadyAnswered {
                recorded: recorded.clone(),
            });
        }

        let question = &self.questions[index];
        if !question.has_option(option) {
            return Err(SessionError::UnknownOption {
                option: option.to_string(),
            });
        }

        let correct = question.is_correct(option);
        self.answers.insert(index, option.to_string());
        Ok(AnswerOutcome::Recorded { correct })
    }

    /// 提交测验，只能在最后一题进行，提交后不可撤销
    pub fn finish(&mut self) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        if !self.is_last_question() {
            return Err(SessionError::NotAtLastQuestion {
                index: self.current_index,
                total: self.questions.len(),
            });
        }
        self.finished = true;
        Ok(())
    }

    fn correct_count(&self) -> usize {
        self.answers
            .iter()
            .filter(|(idx, selected)| {
                self.questions
                    .get(**idx)
                    .map(|q| q.is_correct(selected))
                    .unwrap_or(false)
            })
            .count()
    }

    /// 总分：答对数 / 题目总数
    pub fn score(&self) -> Score {
        Score {
            correct: self.correct_count(),
            total: self.questions.len(),
        }
    }

    /// 进行中的得分：答对数 / 已答题数
    pub fn partial_score(&self) -> Score {
        Score {
            correct: self.correct_count(),
            total: self.answers.len(),
        }
    }

    /// 未答或答错的题目
    pub fn missed_questions(&self) -> Vec<&QuestionRecord> {
        self.questions
            .iter()
            .enumerate()
            .filter(|(idx, q)| self.answer_for(*idx) != Some(q.answer.as_str()))
            .map(|(_, q)| q)
            .collect()
    }
}
