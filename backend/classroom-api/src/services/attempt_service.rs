use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::attempt_locks::AttemptLocks;
use super::scoring::{self, answer_feedback, completion_message, final_score, progress_percent};
use super::{AppState, ServiceError};
use crate::metrics::{record_answer, record_completion, record_rejection};
use crate::models::attempt::{
    AnswerChoice, AttemptKey, AttemptPhase, AttemptState, Progression, QuestionView,
    SubmitAnswerResponse, TakeQuizView,
};
use crate::models::{Question, Quiz, StudentAnswer, TakenQuiz};
use crate::storage::{AttemptStateStore, QuizStore, StoreError};

/// Where a student stands in a quiz before the current request is handled.
enum OpenAttempt {
    Completed(Quiz),
    Open(AttemptProgress),
}

struct AttemptProgress {
    quiz: Quiz,
    total_questions: usize,
    answered_questions: usize,
    /// Remaining questions in quiz order; never empty.
    unanswered: Vec<Question>,
}

impl AttemptProgress {
    fn current_question(&self) -> &Question {
        &self.unanswered[0]
    }

    fn progress(&self) -> i64 {
        progress_percent(self.unanswered.len(), self.total_questions).unwrap_or(100)
    }
}

/// The quiz-taking state machine: `NotStarted -> InProgress -> Completed`.
pub struct AttemptService {
    store: Arc<dyn QuizStore>,
    states: Arc<dyn AttemptStateStore>,
    locks: AttemptLocks,
}

impl AttemptService {
    pub fn new(
        store: Arc<dyn QuizStore>,
        states: Arc<dyn AttemptStateStore>,
        locks: AttemptLocks,
    ) -> Self {
        Self {
            store,
            states,
            locks,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.store.clone(),
            state.attempt_states.clone(),
            state.attempt_locks.clone(),
        )
    }

    /// The question the student has to answer next, or the "already taken" view.
    pub async fn current_question(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> Result<TakeQuizView, ServiceError> {
        let progress = match self.open_attempt(student_id, quiz_id).await? {
            OpenAttempt::Completed(quiz) => {
                return Ok(TakeQuizView::AlreadyTaken {
                    quiz_id: quiz.id,
                    phase: AttemptPhase::Completed,
                    message: format!("You have already taken the quiz {}.", quiz.name),
                    quiz_name: quiz.name,
                });
            }
            OpenAttempt::Open(progress) => progress,
        };

        let key = AttemptKey::new(student_id, quiz_id);
        let stored_state = match self.states.load(&key).await {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(
                    "Failed to load attempt state for student={}, quiz={}: {}",
                    student_id,
                    quiz_id,
                    err
                );
                None
            }
        };

        let phase = if progress.answered_questions == 0 && stored_state.is_none() {
            AttemptPhase::NotStarted
        } else {
            AttemptPhase::InProgress
        };

        let question = progress.current_question();
        let answers = self
            .store
            .question_answers(&question.id)
            .await?
            .into_iter()
            .map(|answer| AnswerChoice {
                id: answer.id,
                text: answer.text,
            })
            .collect();

        Ok(TakeQuizView::Question {
            progress: progress.progress(),
            running_score: stored_state.unwrap_or_default().temp_score,
            phase,
            question: QuestionView {
                id: question.id.clone(),
                text: question.text.clone(),
                answers,
            },
            quiz_id: progress.quiz.id,
            quiz_name: progress.quiz.name,
        })
    }

    /// Records the answer to the current question and advances the attempt.
    ///
    /// The student answer (and the taken quiz on the last question) are
    /// committed atomically; the running score is saved only after that
    /// commit, and cleared once the attempt completes.
    pub async fn submit_answer(
        &self,
        student_id: &str,
        quiz_id: &str,
        answer_id: &str,
    ) -> Result<SubmitAnswerResponse, ServiceError> {
        let key = AttemptKey::new(student_id, quiz_id);
        let _guard = self.locks.acquire(&key).await;

        tracing::info!(
            "Processing answer submission: student={}, quiz={}, answer={}",
            student_id,
            quiz_id,
            answer_id
        );

        let progress = match self.open_attempt(student_id, quiz_id).await? {
            OpenAttempt::Completed(quiz) => {
                record_rejection("already_completed");
                return Err(ServiceError::conflict(format!(
                    "Quiz {} has already been completed",
                    quiz.name
                )));
            }
            OpenAttempt::Open(progress) => progress,
        };

        let question = progress.current_question();
        let choices = self.store.question_answers(&question.id).await?;
        let Some(chosen) = choices.iter().find(|answer| answer.id == answer_id) else {
            record_rejection("invalid_answer");
            return Err(ServiceError::invalid_input(format!(
                "Answer {} is not a choice of the current question",
                answer_id
            )));
        };

        let state = self
            .states
            .load(&key)
            .await?
            .unwrap_or_default()
            .apply(chosen.is_correct);

        let now = Utc::now();
        let student_answer = StudentAnswer {
            id: Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            quiz_id: quiz_id.to_string(),
            question_id: question.id.clone(),
            answer_id: chosen.id.clone(),
            created_at: now,
        };

        let remaining_questions = progress.unanswered.len() - 1;
        let taken = if remaining_questions == 0 {
            let correct_answers = self.store.count_correct_answers(student_id, quiz_id).await?
                + u64::from(chosen.is_correct);
            let score = final_score(correct_answers, progress.total_questions as u64)
                .ok_or_else(|| ServiceError::invalid_quiz("Quiz has no questions"))?;

            Some(TakenQuiz {
                id: Uuid::new_v4().to_string(),
                student_id: student_id.to_string(),
                quiz_id: quiz_id.to_string(),
                score,
                date: now,
            })
        } else {
            None
        };

        self.store
            .commit_submission(&student_answer, taken.as_ref())
            .await
            .map_err(|err| match err {
                StoreError::Conflict(detail) => {
                    record_rejection("duplicate_submission");
                    tracing::warn!(
                        "Duplicate submission for student={}, quiz={}: {}",
                        student_id,
                        quiz_id,
                        detail
                    );
                    ServiceError::conflict("This question has already been answered")
                }
                other => ServiceError::Storage(other),
            })?;

        record_answer(chosen.is_correct);

        let progression = match taken {
            Some(taken) => {
                self.clear_state(&key).await;

                let passed = scoring::passed(taken.score);
                record_completion(passed);
                tracing::info!(
                    "Quiz completed: student={}, quiz={}, score={}, running_score={}",
                    student_id,
                    quiz_id,
                    taken.score,
                    state.temp_score
                );

                Progression::Completed {
                    final_score: taken.score,
                    passed,
                    message: completion_message(&progress.quiz.name, taken.score),
                }
            }
            None => {
                self.save_state(&key, &state).await;
                Progression::Continue {
                    remaining_questions,
                }
            }
        };

        Ok(SubmitAnswerResponse {
            correct: chosen.is_correct,
            running_score: state.temp_score,
            feedback: answer_feedback(chosen.is_correct, state.temp_score),
            progression,
        })
    }

    async fn open_attempt(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> Result<OpenAttempt, ServiceError> {
        let quiz = self
            .store
            .find_quiz(quiz_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Quiz {} not found", quiz_id)))?;

        if self
            .store
            .find_taken_quiz(student_id, quiz_id)
            .await?
            .is_some()
        {
            return Ok(OpenAttempt::Completed(quiz));
        }

        let questions = self.store.quiz_questions(quiz_id).await?;
        if questions.is_empty() {
            return Err(ServiceError::invalid_quiz(format!(
                "Quiz {} has no questions",
                quiz.name
            )));
        }

        let answered: HashSet<String> = self
            .store
            .student_answers(student_id, quiz_id)
            .await?
            .into_iter()
            .map(|answer| answer.question_id)
            .collect();

        let total_questions = questions.len();
        let unanswered: Vec<Question> = questions
            .into_iter()
            .filter(|question| !answered.contains(&question.id))
            .collect();

        if unanswered.is_empty() {
            tracing::error!(
                "Student {} answered every question of quiz {} without a result",
                student_id,
                quiz_id
            );
            return Err(ServiceError::conflict(
                "All questions of this quiz have already been answered",
            ));
        }

        Ok(OpenAttempt::Open(AttemptProgress {
            quiz,
            total_questions,
            answered_questions: total_questions - unanswered.len(),
            unanswered,
        }))
    }

    async fn save_state(&self, key: &AttemptKey, state: &AttemptState) {
        if let Err(err) = self.states.save(key, state).await {
            tracing::warn!(
                "Failed to save attempt state for student={}, quiz={}: {}",
                key.student_id,
                key.quiz_id,
                err
            );
        }
    }

    async fn clear_state(&self, key: &AttemptKey) {
        if let Err(err) = self.states.clear(key).await {
            tracing::warn!(
                "Failed to clear attempt state for student={}, quiz={}: {}",
                key.student_id,
                key.quiz_id,
                err
            );
        }
    }
}
