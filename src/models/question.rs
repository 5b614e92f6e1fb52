use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 每道题固定的选项数量
pub const OPTION_COUNT: usize = 4;

/// 一道选择题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    pub options: Vec<String>,
    /// 必须与某个选项完全一致
    pub answer: String,
    pub explanation: String,
    #[serde(default, alias = "subTopic", skip_serializing_if = "Option::is_none")]
    pub sub_topic: Option<String>,
}

impl QuestionRecord {
    /// 校验题目结构，返回失败原因
    pub fn validate(&self) -> Result<(), String> {
        if self.question.trim().is_empty() {
            return Err("题干为空".to_string());
        }
        if self.options.len() != OPTION_COUNT {
            return Err(format!(
                "选项数量为 {}，应为 {}",
                self.options.len(),
                OPTION_COUNT
            ));
        }
        let distinct: HashSet<&str> = self.options.iter().map(String::as_str).collect();
        if distinct.len() != self.options.len() {
            return Err("选项存在重复".to_string());
        }
        if !self.options.contains(&self.answer) {
            return Err(format!("答案 '{}' 不在选项中", self.answer));
        }
        Ok(())
    }

    pub fn is_correct(&self, selected: &str) -> bool {
        self.answer == selected
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// 题目语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    English,
    Malayalam,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::English, Language::Malayalam];

    pub fn label(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Malayalam => "Malayalam",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|l| l.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("不支持的语言: {}", s))
    }
}

/// 考试级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExamLevel {
    #[default]
    Sslc,
    PlusTwo,
    Degree,
}

impl ExamLevel {
    pub const ALL: [ExamLevel; 3] = [ExamLevel::Sslc, ExamLevel::PlusTwo, ExamLevel::Degree];

    pub fn label(&self) -> &'static str {
        match self {
            ExamLevel::Sslc => "10th/SSLC",
            ExamLevel::PlusTwo => "Plus Two",
            ExamLevel::Degree => "Degree",
        }
    }
}

impl fmt::Display for ExamLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExamLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ExamLevel::ALL
            .into_iter()
            .find(|l| l.label().eq_ignore_ascii_case(s))
            .or_else(|| match s.to_ascii_lowercase().as_str() {
                "10th" | "sslc" => Some(ExamLevel::Sslc),
                "plus2" | "plustwo" => Some(ExamLevel::PlusTwo),
                _ => None,
            })
            .ok_or_else(|| format!("不支持的考试级别: {}", s))
    }
}

/// 出题请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRequest {
    pub topic: String,
    pub language: Language,
    pub count: usize,
    pub level: ExamLevel,
}

impl QuizRequest {
    pub fn new(topic: impl Into<String>, language: Language, count: usize, level: ExamLevel) -> Self {
        Self {
            topic: topic.into(),
            language,
            count,
            level,
        }
    }

    /// 检查题目数量和主题，返回失败原因
    pub fn validate(&self, max_count: usize) -> Result<(), String> {
        if self.topic.trim().is_empty() {
            return Err("主题不能为空".to_string());
        }
        if self.count == 0 || self.count > max_count {
            return Err(format!(
                "题目数量 {} 超出范围 [1, {}]",
                self.count, max_count
            ));
        }
        Ok(())
    }
}
