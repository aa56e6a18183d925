use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{AttemptStateStore, QuizStore, StoreError};
use crate::models::{
    attempt::{AttemptKey, AttemptState},
    question_order, Answer, Question, Quiz, Student, StudentAnswer, Subject, TakenQuiz,
};

#[derive(Default)]
struct QuizData {
    subjects: Vec<Subject>,
    quizzes: HashMap<String, Quiz>,
    questions: Vec<Question>,
    answers: Vec<Answer>,
    students: HashMap<String, Student>,
    student_answers: Vec<StudentAnswer>,
    taken_quizzes: Vec<TakenQuiz>,
}

/// In-memory quiz store for tests and local prototyping.
#[derive(Clone, Default)]
pub struct InMemoryQuizStore {
    data: Arc<Mutex<QuizData>>,
    fail_commits: Arc<AtomicBool>,
}

impl InMemoryQuizStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> Result<MutexGuard<'_, QuizData>, StoreError> {
        self.data
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    pub fn insert_subject(&self, subject: Subject) -> Result<(), StoreError> {
        self.data()?.subjects.push(subject);
        Ok(())
    }

    pub fn insert_quiz(&self, quiz: Quiz) -> Result<(), StoreError> {
        self.data()?.quizzes.insert(quiz.id.clone(), quiz);
        Ok(())
    }

    pub fn insert_question(&self, question: Question) -> Result<(), StoreError> {
        self.data()?.questions.push(question);
        Ok(())
    }

    pub fn insert_answer(&self, answer: Answer) -> Result<(), StoreError> {
        self.data()?.answers.push(answer);
        Ok(())
    }

    /// Makes every following `commit_submission` fail until reset.
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuizStore for InMemoryQuizStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.data().map(|_| ())
    }

    async fn find_quiz(&self, quiz_id: &str) -> Result<Option<Quiz>, StoreError> {
        Ok(self.data()?.quizzes.get(quiz_id).cloned())
    }

    async fn quiz_questions(&self, quiz_id: &str) -> Result<Vec<Question>, StoreError> {
        let mut questions: Vec<Question> = self
            .data()?
            .questions
            .iter()
            .filter(|q| q.quiz_id == quiz_id)
            .cloned()
            .collect();
        questions.sort_by(|a, b| question_order(a).cmp(&question_order(b)));
        Ok(questions)
    }

    async fn count_questions(&self, quiz_id: &str) -> Result<u64, StoreError> {
        let data = self.data()?;
        Ok(data.questions.iter().filter(|q| q.quiz_id == quiz_id).count() as u64)
    }

    async fn question_answers(&self, question_id: &str) -> Result<Vec<Answer>, StoreError> {
        Ok(self
            .data()?
            .answers
            .iter()
            .filter(|a| a.question_id == question_id)
            .cloned()
            .collect())
    }

    async fn student_answers(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> Result<Vec<StudentAnswer>, StoreError> {
        Ok(self
            .data()?
            .student_answers
            .iter()
            .filter(|a| a.student_id == student_id && a.quiz_id == quiz_id)
            .cloned()
            .collect())
    }

    async fn count_correct_answers(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> Result<u64, StoreError> {
        let data = self.data()?;
        let correct: HashSet<&str> = data
            .answers
            .iter()
            .filter(|a| a.is_correct)
            .map(|a| a.id.as_str())
            .collect();

        Ok(data
            .student_answers
            .iter()
            .filter(|a| a.student_id == student_id && a.quiz_id == quiz_id)
            .filter(|a| correct.contains(a.answer_id.as_str()))
            .count() as u64)
    }

    async fn find_taken_quiz(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> Result<Option<TakenQuiz>, StoreError> {
        Ok(self
            .data()?
            .taken_quizzes
            .iter()
            .find(|t| t.student_id == student_id && t.quiz_id == quiz_id)
            .cloned())
    }

    async fn list_taken_quizzes(&self, student_id: &str) -> Result<Vec<TakenQuiz>, StoreError> {
        Ok(self
            .data()?
            .taken_quizzes
            .iter()
            .filter(|t| t.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn commit_submission(
        &self,
        answer: &StudentAnswer,
        taken: Option<&TakenQuiz>,
    ) -> Result<(), StoreError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("commit rejected".to_string()));
        }

        let mut data = self.data()?;

        // Check every constraint before touching anything.
        if data
            .student_answers
            .iter()
            .any(|a| a.student_id == answer.student_id && a.question_id == answer.question_id)
        {
            return Err(StoreError::Conflict(format!(
                "question {} already answered",
                answer.question_id
            )));
        }
        if let Some(taken) = taken {
            if data
                .taken_quizzes
                .iter()
                .any(|t| t.student_id == taken.student_id && t.quiz_id == taken.quiz_id)
            {
                return Err(StoreError::Conflict(format!(
                    "quiz {} already taken",
                    taken.quiz_id
                )));
            }
        }

        data.student_answers.push(answer.clone());
        if let Some(taken) = taken {
            data.taken_quizzes.push(taken.clone());
        }
        Ok(())
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, StoreError> {
        let mut subjects = self.data()?.subjects.clone();
        subjects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(subjects)
    }

    async fn find_student(&self, student_id: &str) -> Result<Option<Student>, StoreError> {
        Ok(self.data()?.students.get(student_id).cloned())
    }

    async fn save_student_interests(
        &self,
        student_id: &str,
        subject_ids: &[String],
    ) -> Result<(), StoreError> {
        self.data()?.students.insert(
            student_id.to_string(),
            Student {
                id: student_id.to_string(),
                interests: subject_ids.to_vec(),
            },
        );
        Ok(())
    }

    async fn quizzes_for_subjects(&self, subject_ids: &[String]) -> Result<Vec<Quiz>, StoreError> {
        let mut quizzes: Vec<Quiz> = self
            .data()?
            .quizzes
            .values()
            .filter(|q| subject_ids.contains(&q.subject_id))
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(quizzes)
    }

    async fn quizzes_by_ids(&self, quiz_ids: &[String]) -> Result<Vec<Quiz>, StoreError> {
        let data = self.data()?;
        Ok(quiz_ids
            .iter()
            .filter_map(|id| data.quizzes.get(id).cloned())
            .collect())
    }
}

/// In-memory attempt state, the test counterpart of the Redis store.
#[derive(Clone, Default)]
pub struct InMemoryAttemptStateStore {
    states: Arc<Mutex<HashMap<AttemptKey, AttemptState>>>,
}

impl InMemoryAttemptStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn states(&self) -> Result<MutexGuard<'_, HashMap<AttemptKey, AttemptState>>, StoreError> {
        self.states
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

#[async_trait]
impl AttemptStateStore for InMemoryAttemptStateStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.states().map(|_| ())
    }

    async fn load(&self, key: &AttemptKey) -> Result<Option<AttemptState>, StoreError> {
        Ok(self.states()?.get(key).copied())
    }

    async fn save(&self, key: &AttemptKey, state: &AttemptState) -> Result<(), StoreError> {
        self.states()?.insert(key.clone(), *state);
        Ok(())
    }

    async fn clear(&self, key: &AttemptKey) -> Result<(), StoreError> {
        self.states()?.remove(key);
        Ok(())
    }
}
