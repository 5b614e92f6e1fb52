//! 终端界面
//!
//! 收集出题设置，逐题展示并记录答案，最后展示成绩、复习笔记并保存 PDF。

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{self, AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{error, info, warn};

use crate::clients::OpenAiEndpoint;
use crate::config::Config;
use crate::infrastructure::KeyPool;
use crate::models::{ExamLevel, Language, QuizRequest};
use crate::services::{PdfRenderer, QuestionSource, RenderedDocument};
use crate::utils::logging;
use crate::workflow::{AnswerOutcome, QuizFlow, QuizReport, QuizSession, SessionPhase};

const DEFAULT_TOPIC: &str = "General Knowledge";

/// 用户在答题页的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Select(usize),
    Next,
    Previous,
    Finish,
    Quit,
}

impl Command {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "n" | "next" => Some(Command::Next),
            "p" | "prev" | "previous" => Some(Command::Previous),
            "f" | "finish" => Some(Command::Finish),
            "q" | "quit" => Some(Command::Quit),
            other => other
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=4).contains(n))
                .map(|n| Command::Select(n - 1)),
        }
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    flow: QuizFlow<OpenAiEndpoint, PdfRenderer>,
    input: Lines<BufReader<Stdin>>,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        config.validate().context("启动失败")?;

        let key_pool = Arc::new(KeyPool::new(config.api_keys.clone()));
        logging::log_startup(&config, key_pool.len());

        let endpoint = OpenAiEndpoint::new(&config);
        let source = Arc::new(QuestionSource::new(&config, endpoint, key_pool));
        let flow = QuizFlow::new(source, PdfRenderer::new(&config));

        Ok(Self {
            config,
            flow,
            input: BufReader::new(io::stdin()).lines(),
        })
    }

    /// 运行应用主逻辑
    pub async fn run(mut self) -> Result<()> {
        let mut session = QuizSession::new();

        loop {
            let Some(request) = self.read_settings().await? else {
                break;
            };

            println!("\nPreparing your quiz...");
            if let Err(e) = self.flow.start_quiz(&mut session, &request).await {
                warn!("出题失败: {}", e);
                println!("{}", e.user_message());
                if !self.confirm("Try again?").await? {
                    break;
                }
                continue;
            }

            if !self.play(&mut session).await? {
                break;
            }

            let report = self.flow.complete(&session, request.language).await?;
            self.show_report(&report).await?;

            session.reset();
            if !self.confirm("Start a new quiz?").await? {
                break;
            }
        }

        info!("👋 程序结束");
        Ok(())
    }

    /// 答题循环，返回 false 表示用户中途退出
    async fn play(&mut self, session: &mut QuizSession) -> Result<bool> {
        while session.phase() == SessionPhase::InProgress {
            render_question(session);

            let Some(line) = self.read_line("> ").await? else {
                return Ok(false);
            };
            let Some(command) = Command::parse(&line) else {
                println!("Use 1-4 to answer, n/p to move, f to finish, q to quit.");
                continue;
            };

            match command {
                Command::Select(choice) => {
                    let Some(option) = session
                        .current_question()
                        .and_then(|q| q.options.get(choice))
                        .cloned()
                    else {
                        continue;
                    };
                    match session.select_answer(&option)? {
                        AnswerOutcome::Recorded { correct } => {
                            println!("{}", if correct { "Correct!" } else { "Wrong." });
                        }
                        AnswerOutcome::AlreadyAnswered { recorded } => {
                            println!("Already answered: {}", recorded);
                        }
                    }
                }
                Command::Next => {
                    session.next()?;
                }
                Command::Previous => {
                    session.previous()?;
                }
                Command::Finish => {
                    if session.is_last_question() {
                        session.finish()?;
                    } else {
                        println!("Go to the last question to finish.");
                    }
                }
                Command::Quit => return Ok(false),
            }
        }
        Ok(true)
    }

    async fn show_report(&mut self, report: &QuizReport) -> Result<()> {
        println!("\nYour Score: {} / {}", report.score.correct, report.score.total);
        logging::log_quiz_summary(&report.score, &report.missed_topics);

        if report.is_perfect() {
            println!("{}", report.notes);
            return Ok(());
        }

        println!("\nAreas for Improvement: {}", report.missed_topics.join(", "));
        println!("\n{}\n", report.notes);

        if let Some(document) = &report.document {
            let path = &self.config.notes_output_path;
            if save_document(path, document).await {
                println!("Study notes saved as PDF: {}", path);
                if document.degraded {
                    println!(
                        "Note: the configured font was not found, so non-ASCII text was left out of the PDF."
                    );
                }
            } else {
                println!("The PDF could not be saved to {}. The notes above are still available.", path);
            }
        } else {
            println!("The PDF could not be created. The notes above are still available.");
        }
        Ok(())
    }

    /// 读取出题设置，输入结束时返回 None
    async fn read_settings(&mut self) -> Result<Option<QuizRequest>> {
        println!("\n=== Exam Settings ===");

        let language = loop {
            let Some(line) = self.read_line("Language [English/Malayalam] (English): ").await? else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                break Language::default();
            }
            match line.parse::<Language>() {
                Ok(language) => break language,
                Err(e) => println!("{}", e),
            }
        };

        let level = loop {
            let Some(line) = self
                .read_line("Exam Level [10th/SSLC, Plus Two, Degree] (10th/SSLC): ")
                .await?
            else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                break ExamLevel::default();
            }
            match line.parse::<ExamLevel>() {
                Ok(level) => break level,
                Err(e) => println!("{}", e),
            }
        };

        let max = self.flow.source().max_question_count();
        let default_count = self.config.default_question_count.clamp(1, max.max(1));
        let count = loop {
            let prompt = format!("Questions [1-{}] ({}): ", max, default_count);
            let Some(line) = self.read_line(&prompt).await? else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                break default_count;
            }
            match line.trim().parse::<usize>() {
                Ok(n) if (1..=max).contains(&n) => break n,
                _ => println!("Enter a number between 1 and {}.", max),
            }
        };

        let Some(topic) = self.read_line(&format!("Topic ({}): ", DEFAULT_TOPIC)).await? else {
            return Ok(None);
        };
        let topic = if topic.trim().is_empty() {
            DEFAULT_TOPIC.to_string()
        } else {
            topic.trim().to_string()
        };

        Ok(Some(QuizRequest::new(topic, language, count, level)))
    }

    async fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self
            .read_line(&format!("{} [y/N]: ", question))
            .await?
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        Ok(answer == "y" || answer == "yes")
    }

    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        use std::io::Write;
        print!("{}", prompt);
        std::io::stdout().flush()?;
        Ok(self.input.next_line().await?)
    }
}

/// 保存 PDF，失败只记录日志，返回是否保存成功
async fn save_document(path: &str, document: &RenderedDocument) -> bool {
    match tokio::fs::write(path, &document.bytes).await {
        Ok(()) => {
            info!("💾 PDF 已保存: {}", path);
            true
        }
        Err(e) => {
            error!("❌ 无法写入 PDF {}: {}", path, e);
            false
        }
    }
}

fn render_question(session: &QuizSession) {
    let idx = session.current_index();
    let Some(question) = session.current_question() else {
        return;
    };

    println!("\n[{}] Question {} of {}", progress_bar(idx + 1, session.len(), 20), idx + 1, session.len());
    println!("{}", question.question);

    let selected = session.answer_for(idx);
    for (n, option) in question.options.iter().enumerate() {
        let marker = match selected {
            Some(_) if *option == question.answer => "✅",
            Some(s) if s == option => "❌",
            _ => "  ",
        };
        println!("  {} {}. {}", marker, n + 1, option);
    }

    if selected.is_some() {
        println!("Fact: {}", question.explanation);
    }

    let score = session.partial_score();
    if score.total > 0 {
        println!("Running score: {} ({:.0}%)", score, score.percentage());
    }
    if session.is_last_question() {
        println!("(last question: f to finish and see results)");
    }
}

fn progress_bar(done: usize, total: usize, width: usize) -> String {
    let filled = if total == 0 { 0 } else { done * width / total };
    format!("{}{}", "#".repeat(filled), "-".repeat(width.saturating_sub(filled)))
}
