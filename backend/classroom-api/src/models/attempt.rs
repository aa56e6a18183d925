use serde::{Deserialize, Serialize};

/// Identifies one student's attempt at one quiz.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttemptKey {
    pub student_id: String,
    pub quiz_id: String,
}

impl AttemptKey {
    pub fn new(student_id: impl Into<String>, quiz_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            quiz_id: quiz_id.into(),
        }
    }

    /// Redis key for the soft state of this attempt.
    pub fn storage_key(&self) -> String {
        format!(
            "attempt:{}:{}:{}",
            self.student_id.len(),
            self.student_id,
            self.quiz_id
        )
    }
}

/// Running score and streak exponent for an attempt in progress.
///
/// The running score is display-only: the persisted result of a quiz is
/// computed from correct answers, never from this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptState {
    pub temp_score: i64,
    pub next_exponent: u32,
}

impl Default for AttemptState {
    fn default() -> Self {
        Self {
            temp_score: 0,
            next_exponent: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub answer_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerChoice {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: String,
    pub text: String,
    pub answers: Vec<AnswerChoice>,
}

/// What the student sees when opening a quiz.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TakeQuizView {
    AlreadyTaken {
        quiz_id: String,
        quiz_name: String,
        phase: AttemptPhase,
        message: String,
    },
    Question {
        quiz_id: String,
        quiz_name: String,
        phase: AttemptPhase,
        progress: i64,
        running_score: i64,
        question: QuestionView,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitAnswerResponse {
    pub correct: bool,
    pub running_score: i64,
    pub feedback: String,
    #[serde(flatten)]
    pub progression: Progression,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Progression {
    Continue {
        remaining_questions: usize,
    },
    Completed {
        final_score: f64,
        passed: bool,
        message: String,
    },
}
