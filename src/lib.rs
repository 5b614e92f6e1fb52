//! # PSC Tutor
//!
//! 一个用 LLM 出题、计分并生成复习笔记的考试练习工具
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（API 密钥），只暴露能力
//! - `KeyPool` - 进程内共享的密钥池，提供取当前密钥和轮换
//! - `BackoffPolicy` - 重试等待时间
//!
//! ### ② 客户端（Clients）
//! - `clients/` - `ModelEndpoint` 约定"提示词进、文本出"，`OpenAiEndpoint` 是实际实现
//!
//! ### ③ 业务能力层（Services）
//! - `QuestionSource` - 出题能力，带密钥轮换重试
//! - `response_parser` - 把模型输出解析成题目并校验
//! - `RevisionNotesService` - 复习笔记，失败时降级
//! - `PdfRenderer` - 笔记排版为 PDF
//!
//! ### ④ 流程层（Workflow）
//! - `QuizSession` - 单个用户的答题状态机
//! - `QuizFlow` - 出题 → 答题 → 计分 → 笔记 → PDF
//!
//! ### ⑤ 界面（App）
//! - `App` - 终端交互界面

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use clients::{GenerationRequest, ModelEndpoint, OpenAiEndpoint};
pub use config::Config;
pub use error::{AppError, AppResult, ConfigError, LlmError, SessionError};
pub use infrastructure::{BackoffPolicy, KeyPool};
pub use models::{ExamLevel, Language, QuestionRecord, QuizRequest};
pub use services::{DocumentRenderer, PdfRenderer, QuestionSource, RenderedDocument, RevisionNotesService};
pub use workflow::{QuizFlow, QuizReport, QuizSession, Score, SessionPhase};
