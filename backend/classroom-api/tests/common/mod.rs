#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

use classroom_api::{
    config::Config,
    create_router,
    middlewares::auth::{JwtClaims, JwtService},
    models::{Answer, Question, Quiz, Student, StudentAnswer, Subject, TakenQuiz},
    services::AppState,
    storage::{
        memory::{InMemoryAttemptStateStore, InMemoryQuizStore},
        QuizStore, StoreError,
    },
};

pub const JWT_SECRET: &str = "test-secret";
pub const METRICS_AUTH: &str = "metrics:secret";

pub const MATH: &str = "subject-math";
pub const HISTORY: &str = "subject-history";

/// Two questions, math.
pub const QUIZ_PAIR: &str = "quiz-pair";
/// Four questions, math.
pub const QUIZ_FOUR: &str = "quiz-four";
/// One question, math.
pub const QUIZ_SINGLE: &str = "quiz-single";
/// No questions, math.
pub const QUIZ_EMPTY: &str = "quiz-empty";
/// Two questions, history.
pub const QUIZ_HISTORY: &str = "quiz-history";

pub struct TestApp {
    pub router: Router,
    pub store: InMemoryQuizStore,
    pub states: InMemoryAttemptStateStore,
}

pub fn test_config() -> Config {
    Config {
        mongo_uri: "mongodb://localhost:27017".to_string(),
        mongo_database: "classroom_test".to_string(),
        redis_uri: "redis://127.0.0.1:6379/0".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        bind_address: "127.0.0.1:0".to_string(),
        attempt_state_ttl_seconds: 60,
        metrics_auth: METRICS_AUTH.to_string(),
    }
}

pub fn create_test_app() -> TestApp {
    let store = InMemoryQuizStore::new();
    build_test_app(store.clone(), Arc::new(store))
}

/// Test app whose quiz store yields to the scheduler on every call, so that
/// concurrent requests interleave. Returns the number of commits attempted.
pub fn create_yielding_test_app() -> (TestApp, Arc<AtomicUsize>) {
    let store = InMemoryQuizStore::new();
    let yielding = YieldingQuizStore {
        inner: store.clone(),
        commits: Arc::new(AtomicUsize::new(0)),
    };
    let commits = yielding.commits.clone();
    (build_test_app(store, Arc::new(yielding)), commits)
}

fn build_test_app(store: InMemoryQuizStore, served: Arc<dyn QuizStore>) -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let states = InMemoryAttemptStateStore::new();
    seed_test_data(&store);

    let app_state = Arc::new(AppState::from_stores(
        test_config(),
        served,
        Arc::new(states.clone()),
    ));

    TestApp {
        router: create_router(app_state),
        store,
        states,
    }
}

struct YieldingQuizStore {
    inner: InMemoryQuizStore,
    commits: Arc<AtomicUsize>,
}

#[async_trait]
impl QuizStore for YieldingQuizStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }

    async fn find_quiz(&self, quiz_id: &str) -> Result<Option<Quiz>, StoreError> {
        tokio::task::yield_now().await;
        self.inner.find_quiz(quiz_id).await
    }

    async fn quiz_questions(&self, quiz_id: &str) -> Result<Vec<Question>, StoreError> {
        tokio::task::yield_now().await;
        self.inner.quiz_questions(quiz_id).await
    }

    async fn count_questions(&self, quiz_id: &str) -> Result<u64, StoreError> {
        self.inner.count_questions(quiz_id).await
    }

    async fn question_answers(&self, question_id: &str) -> Result<Vec<Answer>, StoreError> {
        tokio::task::yield_now().await;
        self.inner.question_answers(question_id).await
    }

    async fn student_answers(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> Result<Vec<StudentAnswer>, StoreError> {
        tokio::task::yield_now().await;
        self.inner.student_answers(student_id, quiz_id).await
    }

    async fn count_correct_answers(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> Result<u64, StoreError> {
        tokio::task::yield_now().await;
        self.inner.count_correct_answers(student_id, quiz_id).await
    }

    async fn find_taken_quiz(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> Result<Option<TakenQuiz>, StoreError> {
        tokio::task::yield_now().await;
        self.inner.find_taken_quiz(student_id, quiz_id).await
    }

    async fn list_taken_quizzes(&self, student_id: &str) -> Result<Vec<TakenQuiz>, StoreError> {
        self.inner.list_taken_quizzes(student_id).await
    }

    async fn commit_submission(
        &self,
        answer: &StudentAnswer,
        taken: Option<&TakenQuiz>,
    ) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.inner.commit_submission(answer, taken).await
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, StoreError> {
        self.inner.list_subjects().await
    }

    async fn find_student(&self, student_id: &str) -> Result<Option<Student>, StoreError> {
        self.inner.find_student(student_id).await
    }

    async fn save_student_interests(
        &self,
        student_id: &str,
        subject_ids: &[String],
    ) -> Result<(), StoreError> {
        self.inner.save_student_interests(student_id, subject_ids).await
    }

    async fn quizzes_for_subjects(&self, subject_ids: &[String]) -> Result<Vec<Quiz>, StoreError> {
        self.inner.quizzes_for_subjects(subject_ids).await
    }

    async fn quizzes_by_ids(&self, quiz_ids: &[String]) -> Result<Vec<Quiz>, StoreError> {
        self.inner.quizzes_by_ids(quiz_ids).await
    }
}

fn seed_test_data(store: &InMemoryQuizStore) {
    for (id, name, color) in [(MATH, "Mathematics", "#007bff"), (HISTORY, "History", "#dc3545")] {
        store
            .insert_subject(Subject {
                id: id.to_string(),
                name: name.to_string(),
                color: color.to_string(),
            })
            .unwrap();
    }

    for (id, name, subject, questions) in [
        (QUIZ_PAIR, "Fractions", MATH, 2),
        (QUIZ_FOUR, "Algebra Basics", MATH, 4),
        (QUIZ_SINGLE, "Number Line", MATH, 1),
        (QUIZ_EMPTY, "Empty Quiz", MATH, 0),
        (QUIZ_HISTORY, "World Wars", HISTORY, 2),
    ] {
        seed_quiz(store, id, name, subject, questions);
    }
}

/// Questions are `{quiz}-q{n}`; each has a `-right` and a `-wrong` answer.
fn seed_quiz(store: &InMemoryQuizStore, id: &str, name: &str, subject_id: &str, questions: i32) {
    store
        .insert_quiz(Quiz {
            id: id.to_string(),
            name: name.to_string(),
            subject_id: subject_id.to_string(),
        })
        .unwrap();

    // Inserted in reverse so ordering has to come from the position.
    for position in (1..=questions).rev() {
        let question_id = question_id(id, position);
        store
            .insert_question(Question {
                id: question_id.clone(),
                quiz_id: id.to_string(),
                text: format!("Question {} of {}", position, name),
                position,
            })
            .unwrap();

        for correct in [false, true] {
            store
                .insert_answer(Answer {
                    id: answer_id(id, position, correct),
                    question_id: question_id.clone(),
                    text: if correct { "Right" } else { "Wrong" }.to_string(),
                    is_correct: correct,
                })
                .unwrap();
        }
    }
}

pub fn question_id(quiz_id: &str, position: i32) -> String {
    format!("{}-q{}", quiz_id, position)
}

pub fn answer_id(quiz_id: &str, position: i32, correct: bool) -> String {
    format!(
        "{}-{}",
        question_id(quiz_id, position),
        if correct { "right" } else { "wrong" }
    )
}

pub fn student_token(student_id: &str) -> String {
    token_for(JwtClaims::student(student_id, 3600))
}

pub fn token_with_role(student_id: &str, role: &str) -> String {
    let mut claims = JwtClaims::student(student_id, 3600);
    claims.role = role.to_string();
    token_for(claims)
}

fn token_for(claims: JwtClaims) -> String {
    JwtService::new(JWT_SECRET)
        .generate_token(&claims)
        .expect("Failed to sign test token")
}

pub fn take_path(quiz_id: &str) -> String {
    format!("/api/v1/quizzes/{}/take", quiz_id)
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("GET")
                .uri(path)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_form(&self, path: &str, token: &str, form: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(path)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn put_json(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("PUT")
                .uri(path)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Submits the answer to question `position` of `quiz_id`.
    pub async fn answer(
        &self,
        token: &str,
        quiz_id: &str,
        position: i32,
        correct: bool,
    ) -> (StatusCode, Value) {
        let form = format!("answer_id={}", answer_id(quiz_id, position, correct));
        self.post_form(&take_path(quiz_id), token, &form).await
    }
}
