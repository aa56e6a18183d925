use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    attempt::{AttemptKey, AttemptState},
    Answer, Question, Quiz, Student, StudentAnswer, Subject, TakenQuiz,
};

pub mod memory;
pub mod mongo;
pub mod redis_state;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Persisted quiz content, student answers and results.
///
/// Implementations must enforce uniqueness of `(student_id, question_id)` for
/// student answers and of `(student_id, quiz_id)` for taken quizzes.
#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_quiz(&self, quiz_id: &str) -> Result<Option<Quiz>, StoreError>;

    /// Questions of a quiz in `(position, id)` order.
    async fn quiz_questions(&self, quiz_id: &str) -> Result<Vec<Question>, StoreError>;

    async fn count_questions(&self, quiz_id: &str) -> Result<u64, StoreError>;

    async fn question_answers(&self, question_id: &str) -> Result<Vec<Answer>, StoreError>;

    async fn student_answers(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> Result<Vec<StudentAnswer>, StoreError>;

    /// Number of the student's answers for the quiz that reference a correct answer.
    async fn count_correct_answers(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> Result<u64, StoreError>;

    async fn find_taken_quiz(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> Result<Option<TakenQuiz>, StoreError>;

    async fn list_taken_quizzes(&self, student_id: &str) -> Result<Vec<TakenQuiz>, StoreError>;

    /// Writes the answer and, when present, the taken quiz as one atomic unit.
    async fn commit_submission(
        &self,
        answer: &StudentAnswer,
        taken: Option<&TakenQuiz>,
    ) -> Result<(), StoreError>;

    async fn list_subjects(&self) -> Result<Vec<Subject>, StoreError>;

    async fn find_student(&self, student_id: &str) -> Result<Option<Student>, StoreError>;

    async fn save_student_interests(
        &self,
        student_id: &str,
        subject_ids: &[String],
    ) -> Result<(), StoreError>;

    /// Quizzes in any of the given subjects, ordered by name.
    async fn quizzes_for_subjects(&self, subject_ids: &[String]) -> Result<Vec<Quiz>, StoreError>;

    async fn quizzes_by_ids(&self, quiz_ids: &[String]) -> Result<Vec<Quiz>, StoreError>;
}

/// Soft state of attempts in progress.
#[async_trait]
pub trait AttemptStateStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn load(&self, key: &AttemptKey) -> Result<Option<AttemptState>, StoreError>;

    async fn save(&self, key: &AttemptKey, state: &AttemptState) -> Result<(), StoreError>;

    async fn clear(&self, key: &AttemptKey) -> Result<(), StoreError>;
}
