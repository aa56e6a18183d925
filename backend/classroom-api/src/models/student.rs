use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Subject;

/// Request to replace the student's subjects of interest
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInterestsRequest {
    #[validate(length(min = 1, max = 100, message = "Select at least one subject"))]
    pub subject_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct InterestsResponse {
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Serialize)]
pub struct AvailableQuiz {
    pub id: String,
    pub name: String,
    pub subject: Subject,
    pub questions_count: u64,
}

#[derive(Debug, Serialize)]
pub struct AvailableQuizzesResponse {
    pub quizzes: Vec<AvailableQuiz>,
}

#[derive(Debug, Serialize)]
pub struct TakenQuizSummary {
    pub quiz_id: String,
    pub quiz_name: String,
    pub subject: Option<Subject>,
    pub score: f64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TakenQuizzesResponse {
    pub taken_quizzes: Vec<TakenQuizSummary>,
}
