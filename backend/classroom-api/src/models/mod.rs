use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod attempt;
pub mod student;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub subject_id: String,
}

/// Questions are presented in `(position, id)` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: String,
    pub quiz_id: String,
    pub text: String,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(rename = "_id")]
    pub id: String,
    pub question_id: String,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub interests: Vec<String>,
}

/// One row per (student, question); never updated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentAnswer {
    #[serde(rename = "_id")]
    pub id: String,
    pub student_id: String,
    pub quiz_id: String,
    pub question_id: String,
    pub answer_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakenQuiz {
    #[serde(rename = "_id")]
    pub id: String,
    pub student_id: String,
    pub quiz_id: String,
    pub score: f64,
    pub date: DateTime<Utc>,
}

/// Sort key for the quiz-defined question order.
pub fn question_order(question: &Question) -> (i32, &str) {
    (question.position, question.id.as_str())
}
