use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::ServiceError;
use crate::models::student::{AvailableQuiz, TakenQuizSummary};
use crate::models::Subject;
use crate::storage::QuizStore;

/// Interests, available quizzes and history of the signed-in student.
pub struct StudentService {
    store: Arc<dyn QuizStore>,
}

impl StudentService {
    pub fn new(store: Arc<dyn QuizStore>) -> Self {
        Self { store }
    }

    pub async fn interests(&self, student_id: &str) -> Result<Vec<Subject>, ServiceError> {
        let interests: HashSet<String> = self
            .store
            .find_student(student_id)
            .await?
            .map(|student| student.interests.into_iter().collect())
            .unwrap_or_default();

        if interests.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .store
            .list_subjects()
            .await?
            .into_iter()
            .filter(|subject| interests.contains(&subject.id))
            .collect())
    }

    /// Replaces the student's interests; every id must name an existing subject.
    pub async fn update_interests(
        &self,
        student_id: &str,
        subject_ids: &[String],
    ) -> Result<Vec<Subject>, ServiceError> {
        let subjects = self.store.list_subjects().await?;
        let known: HashSet<&str> = subjects.iter().map(|s| s.id.as_str()).collect();

        let mut selected: Vec<String> = Vec::with_capacity(subject_ids.len());
        for id in subject_ids {
            if !known.contains(id.as_str()) {
                return Err(ServiceError::invalid_input(format!(
                    "Unknown subject: {}",
                    id
                )));
            }
            if !selected.contains(id) {
                selected.push(id.clone());
            }
        }

        self.store
            .save_student_interests(student_id, &selected)
            .await?;

        tracing::info!(
            "Interests updated for student={}: {} subject(s)",
            student_id,
            selected.len()
        );

        Ok(subjects
            .into_iter()
            .filter(|subject| selected.contains(&subject.id))
            .collect())
    }

    /// Quizzes in the student's subjects that have questions and were not taken yet,
    /// ordered by name.
    pub async fn available_quizzes(
        &self,
        student_id: &str,
    ) -> Result<Vec<AvailableQuiz>, ServiceError> {
        let interests = match self.store.find_student(student_id).await? {
            Some(student) if !student.interests.is_empty() => student.interests,
            _ => return Ok(Vec::new()),
        };

        let taken: HashSet<String> = self
            .store
            .list_taken_quizzes(student_id)
            .await?
            .into_iter()
            .map(|taken| taken.quiz_id)
            .collect();

        let subjects = self.subjects_by_id().await?;
        let quizzes = self.store.quizzes_for_subjects(&interests).await?;

        let mut available = Vec::new();
        for quiz in quizzes {
            if taken.contains(&quiz.id) {
                continue;
            }
            let questions_count = self.store.count_questions(&quiz.id).await?;
            if questions_count == 0 {
                continue;
            }
            let Some(subject) = subjects.get(&quiz.subject_id) else {
                tracing::warn!("Quiz {} references missing subject {}", quiz.id, quiz.subject_id);
                continue;
            };

            available.push(AvailableQuiz {
                id: quiz.id,
                name: quiz.name,
                subject: subject.clone(),
                questions_count,
            });
        }

        available.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(available)
    }

    /// Results of the student's completed quizzes, ordered by quiz name.
    pub async fn taken_quizzes(
        &self,
        student_id: &str,
    ) -> Result<Vec<TakenQuizSummary>, ServiceError> {
        let taken = self.store.list_taken_quizzes(student_id).await?;
        if taken.is_empty() {
            return Ok(Vec::new());
        }

        let quiz_ids: Vec<String> = taken.iter().map(|t| t.quiz_id.clone()).collect();
        let quizzes: HashMap<String, _> = self
            .store
            .quizzes_by_ids(&quiz_ids)
            .await?
            .into_iter()
            .map(|quiz| (quiz.id.clone(), quiz))
            .collect();
        let subjects = self.subjects_by_id().await?;

        let mut summaries: Vec<TakenQuizSummary> = taken
            .into_iter()
            .map(|taken| {
                let quiz = quizzes.get(&taken.quiz_id);
                TakenQuizSummary {
                    quiz_name: quiz
                        .map(|q| q.name.clone())
                        .unwrap_or_else(|| taken.quiz_id.clone()),
                    subject: quiz.and_then(|q| subjects.get(&q.subject_id).cloned()),
                    quiz_id: taken.quiz_id,
                    score: taken.score,
                    date: taken.date,
                }
            })
            .collect();

        summaries.sort_by(|a, b| a.quiz_name.cmp(&b.quiz_name));
        Ok(summaries)
    }

    async fn subjects_by_id(&self) -> Result<HashMap<String, Subject>, ServiceError> {
        Ok(self
            .store
            .list_subjects()
            .await?
            .into_iter()
            .map(|subject| (subject.id.clone(), subject))
            .collect())
    }
}
