use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use psc_tutor::error::DocumentError;
use psc_tutor::services::revision_notes::{NOTES_FALLBACK_MESSAGE, NO_MISTAKES_MESSAGE};
use psc_tutor::{
    AppError, BackoffPolicy, Config, DocumentRenderer, ExamLevel, GenerationRequest, KeyPool,
    Language, LlmError, ModelEndpoint, PdfRenderer, QuestionSource, QuizFlow, QuizRequest,
    QuizSession, RenderedDocument, SessionError, SessionPhase,
};
use tokio_test::{assert_err, assert_ok};

const THREE_QUESTIONS: &str = r#"```json
[
  {"question":"Which is the longest river in Kerala?","options":["Periyar","Pamba","Chaliyar","Bharathapuzha"],"answer":"Periyar","explanation":"Periyar is 244 km long.","sub_topic":"Rivers"},
  {"question":"Which district has the most forest area?","options":["Idukki","Wayanad","Palakkad","Pathanamthitta"],"answer":"Idukki","explanation":"Idukki leads in forest cover.","sub_topic":"Forests"},
  {"question":"Which dam is on the Periyar?","options":["Idukki Dam","Malampuzha Dam","Banasura Sagar","Neyyar Dam"],"answer":"Idukki Dam","explanation":"The arch dam sits on the Periyar.","sub_topic":"Rivers"}
]
```"#;

/// 先返回题目，之后的调用返回笔记；可以让指定的调用失败
struct FakeGemini {
    calls: AtomicUsize,
    keys_used: Mutex<Vec<String>>,
    fail_calls: Vec<usize>,
    notes_fail: bool,
}

impl FakeGemini {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            keys_used: Mutex::new(Vec::new()),
            fail_calls: Vec::new(),
            notes_fail: false,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ModelEndpoint for FakeGemini {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, LlmError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.keys_used.lock().unwrap().push(request.api_key.to_string());

        if self.fail_calls.contains(&call) {
            return Err(LlmError::quota("429 Too Many Requests"));
        }
        if request.prompt.contains("JSON") {
            Ok(THREE_QUESTIONS.to_string())
        } else if self.notes_fail {
            Err(LlmError::transport("connection reset"))
        } else {
            Ok("- Rivers: Periyar is the longest river of Kerala.".to_string())
        }
    }
}

struct FailingRenderer;

impl DocumentRenderer for FailingRenderer {
    fn render(&self, _text: &str) -> Result<RenderedDocument, DocumentError> {
        Err(DocumentError::Pdf("disk full".to_string()))
    }
}

fn config(keys: usize) -> Config {
    Config {
        api_keys: (0..keys).map(|i| format!("gemini-key-{}", i)).collect(),
        font_path: None,
        ..Config::default()
    }
}

fn source(config: &Config, endpoint: FakeGemini) -> Arc<QuestionSource<FakeGemini>> {
    let pool = Arc::new(KeyPool::new(config.api_keys.clone()));
    Arc::new(QuestionSource::new(config, endpoint, pool).with_backoff(BackoffPolicy::none()))
}

fn request() -> QuizRequest {
    QuizRequest::new("Kerala Geography", Language::English, 3, ExamLevel::Sslc)
}

/// 答对第一题，答错第二题，第三题不答
fn play_partially(session: &mut QuizSession) {
    assert_ok!(session.select_answer("Periyar"));
    assert_ok!(session.next());
    assert_ok!(session.select_answer("Wayanad"));
    assert_ok!(session.next());
    assert_ok!(session.finish());
}

#[tokio::test]
async fn test_full_quiz_produces_report_with_document() {
    let config = config(2);
    let source = source(&config, FakeGemini::new());
    let flow = QuizFlow::new(Arc::clone(&source), PdfRenderer::new(&config));
    let mut session = QuizSession::new();

    let count = flow.start_quiz(&mut session, &request()).await.unwrap();
    assert_eq!(count, 3);
    for question in session.questions() {
        assert_eq!(question.options.len(), 4);
        assert!(question.options.contains(&question.answer));
    }

    play_partially(&mut session);
    let report = flow.complete(&session, Language::English).await.unwrap();

    assert_eq!(report.score.to_string(), "1/3");
    assert_eq!(report.missed_topics, vec!["Forests", "Rivers"]);
    assert!(report.notes.contains("Periyar"));
    let document = report.document.expect("document for missed questions");
    assert!(document.bytes.starts_with(b"%PDF"));
    assert!(document.degraded);
    assert_eq!(source.endpoint().calls(), 2);
}

#[tokio::test]
async fn test_perfect_score_skips_notes_request() {
    let config = config(1);
    let source = source(&config, FakeGemini::new());
    let flow = QuizFlow::new(Arc::clone(&source), PdfRenderer::new(&config));
    let mut session = QuizSession::new();

    flow.start_quiz(&mut session, &request()).await.unwrap();
    for answer in ["Periyar", "Idukki", "Idukki Dam"] {
        assert_ok!(session.select_answer(answer));
        assert_ok!(session.next());
    }
    assert_ok!(session.finish());

    let report = flow.complete(&session, Language::English).await.unwrap();

    assert!(report.is_perfect());
    assert_eq!(report.notes, NO_MISTAKES_MESSAGE);
    assert!(report.document.is_none());
    assert_eq!(source.endpoint().calls(), 1);
}

#[tokio::test]
async fn test_rotation_recovers_from_rate_limits() {
    let config = config(3);
    let endpoint = FakeGemini {
        fail_calls: vec![0, 1],
        ..FakeGemini::new()
    };
    let source = source(&config, endpoint);
    let flow = QuizFlow::new(Arc::clone(&source), PdfRenderer::new(&config));
    let mut session = QuizSession::new();

    flow.start_quiz(&mut session, &request()).await.unwrap();

    assert_eq!(session.phase(), SessionPhase::InProgress);
    assert_eq!(
        *source.endpoint().keys_used.lock().unwrap(),
        vec!["gemini-key-0", "gemini-key-1", "gemini-key-2"]
    );
    assert_eq!(source.key_pool().active_slot(), Some(2));
}

#[tokio::test]
async fn test_exhausted_keys_leave_session_untouched() {
    let config = config(2);
    let endpoint = FakeGemini {
        fail_calls: vec![0, 1, 2, 3],
        ..FakeGemini::new()
    };
    let source = source(&config, endpoint);
    let flow = QuizFlow::new(Arc::clone(&source), PdfRenderer::new(&config));
    let mut session = QuizSession::new();

    let err = assert_err!(flow.start_quiz(&mut session, &request()).await);

    assert!(err.is_exhausted());
    assert!(err.user_message().contains("try again later"));
    assert_eq!(session.phase(), SessionPhase::Empty);
    assert_eq!(source.endpoint().calls(), 2);
}

#[tokio::test]
async fn test_notes_failure_and_pdf_failure_do_not_abort_report() {
    let config = config(2);
    let endpoint = FakeGemini {
        notes_fail: true,
        ..FakeGemini::new()
    };
    let source = source(&config, endpoint);
    let flow = QuizFlow::new(Arc::clone(&source), FailingRenderer);
    let mut session = QuizSession::new();

    flow.start_quiz(&mut session, &request()).await.unwrap();
    play_partially(&mut session);
    let report = flow.complete(&session, Language::Malayalam).await.unwrap();

    assert_eq!(report.score.correct, 1);
    assert_eq!(report.notes, NOTES_FALLBACK_MESSAGE);
    assert!(report.document.is_none());
    // 1 次出题 + 2 次笔记（每个密钥一次）
    assert_eq!(source.endpoint().calls(), 3);
}

#[tokio::test]
async fn test_complete_requires_finished_session() {
    let config = config(1);
    let source = source(&config, FakeGemini::new());
    let flow = QuizFlow::new(Arc::clone(&source), PdfRenderer::new(&config));
    let mut session = QuizSession::new();

    flow.start_quiz(&mut session, &request()).await.unwrap();
    let err = assert_err!(flow.complete(&session, Language::English).await);

    assert!(matches!(err, AppError::Session(SessionError::NotFinished)));
}

#[tokio::test]
async fn test_sessions_share_key_pool_but_not_state() {
    let config = config(2);
    let source = source(
        &config,
        FakeGemini {
            fail_calls: vec![0],
            ..FakeGemini::new()
        },
    );
    let flow = QuizFlow::new(Arc::clone(&source), PdfRenderer::new(&config));
    let mut alice = QuizSession::new();
    let mut bob = QuizSession::new();

    let req_a = request();
    let req_b = request();
    let (a, b) = futures::join!(
        flow.start_quiz(&mut alice, &req_a),
        flow.start_quiz(&mut bob, &req_b)
    );
    assert_ok!(a);
    assert_ok!(b);

    assert_ok!(alice.select_answer("Pamba"));
    assert_eq!(alice.answer_for(0), Some("Pamba"));
    assert_eq!(bob.answer_for(0), None);
    assert!(source.key_pool().active_slot().unwrap() < 2);
}

/// 真实 API 测试，需要 GEMINI_KEY
#[tokio::test]
#[ignore]
async fn test_live_fetch_questions() {
    let config = Config::load().expect("加载配置失败");
    config.validate().expect("没有配置 API 密钥");

    let pool = Arc::new(KeyPool::new(config.api_keys.clone()));
    let source = QuestionSource::new(&config, psc_tutor::OpenAiEndpoint::new(&config), pool);

    let questions = source
        .fetch_questions(&QuizRequest::new("Kerala History", Language::English, 5, ExamLevel::Degree))
        .await
        .expect("出题失败");

    println!("生成了 {} 道题", questions.len());
    assert!(!questions.is_empty());
}
