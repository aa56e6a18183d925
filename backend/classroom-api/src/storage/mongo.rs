use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReplaceOptions};
use mongodb::{Client, ClientSession, Collection, Database, IndexModel};
use serde::de::DeserializeOwned;

use super::{QuizStore, StoreError};
use crate::metrics::track_db_operation;
use crate::models::{Answer, Question, Quiz, Student, StudentAnswer, Subject, TakenQuiz};

const SUBJECTS: &str = "subjects";
const QUIZZES: &str = "quizzes";
const QUESTIONS: &str = "questions";
const ANSWERS: &str = "answers";
const STUDENTS: &str = "students";
const STUDENT_ANSWERS: &str = "student_answers";
const TAKEN_QUIZZES: &str = "taken_quizzes";

const DUPLICATE_KEY_CODE: i32 = 11000;

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            StoreError::Conflict(err.to_string())
        } else {
            StoreError::Backend(err.to_string())
        }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref we)) => we.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(ref ce) => ce.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

/// MongoDB-backed quiz store. Submissions are committed in a multi-document
/// transaction, so the deployment must run as a replica set.
#[derive(Clone)]
pub struct MongoQuizStore {
    client: Client,
    mongo: Database,
}

impl MongoQuizStore {
    pub fn new(client: Client, database: &str) -> Self {
        let mongo = client.database(database);
        Self { client, mongo }
    }

    /// Creates the unique indexes the submission path relies on.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.mongo
            .collection::<Document>(STUDENT_ANSWERS)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "student_id": 1, "question_id": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;

        self.mongo
            .collection::<Document>(TAKEN_QUIZZES)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "student_id": 1, "quiz_id": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;

        self.mongo
            .collection::<Document>(QUESTIONS)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "quiz_id": 1, "position": 1 })
                    .build(),
            )
            .await?;

        tracing::info!("MongoDB indexes ensured");
        Ok(())
    }

    fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.mongo.collection::<T>(name)
    }

    async fn find_all<T>(
        &self,
        collection: &'static str,
        filter: Document,
        sort: Document,
    ) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        track_db_operation("find", collection, async {
            let cursor = self
                .collection::<T>(collection)
                .find(filter)
                .sort(sort)
                .await?;
            let rows: Vec<T> = cursor.try_collect().await?;
            Ok::<_, StoreError>(rows)
        })
        .await
    }

    async fn find_one<T>(
        &self,
        collection: &'static str,
        filter: Document,
    ) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        track_db_operation("find_one", collection, async {
            Ok::<_, StoreError>(self.collection::<T>(collection).find_one(filter).await?)
        })
        .await
    }

    async fn write_submission(
        &self,
        session: &mut ClientSession,
        answer: &StudentAnswer,
        taken: Option<&TakenQuiz>,
    ) -> Result<(), mongodb::error::Error> {
        self.collection::<StudentAnswer>(STUDENT_ANSWERS)
            .insert_one(answer)
            .session(&mut *session)
            .await?;

        if let Some(taken) = taken {
            self.collection::<TakenQuiz>(TAKEN_QUIZZES)
                .insert_one(taken)
                .session(&mut *session)
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl QuizStore for MongoQuizStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.mongo.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn find_quiz(&self, quiz_id: &str) -> Result<Option<Quiz>, StoreError> {
        self.find_one(QUIZZES, doc! { "_id": quiz_id }).await
    }

    async fn quiz_questions(&self, quiz_id: &str) -> Result<Vec<Question>, StoreError> {
        self.find_all(
            QUESTIONS,
            doc! { "quiz_id": quiz_id },
            doc! { "position": 1, "_id": 1 },
        )
        .await
    }

    async fn count_questions(&self, quiz_id: &str) -> Result<u64, StoreError> {
        track_db_operation("count", QUESTIONS, async {
            Ok::<_, StoreError>(self
                .collection::<Document>(QUESTIONS)
                .count_documents(doc! { "quiz_id": quiz_id })
                .await?)
        })
        .await
    }

    async fn question_answers(&self, question_id: &str) -> Result<Vec<Answer>, StoreError> {
        self.find_all(
            ANSWERS,
            doc! { "question_id": question_id },
            doc! { "_id": 1 },
        )
        .await
    }

    async fn student_answers(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> Result<Vec<StudentAnswer>, StoreError> {
        self.find_all(
            STUDENT_ANSWERS,
            doc! { "student_id": student_id, "quiz_id": quiz_id },
            doc! { "created_at": 1 },
        )
        .await
    }

    async fn count_correct_answers(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> Result<u64, StoreError> {
        let submitted = self.student_answers(student_id, quiz_id).await?;
        if submitted.is_empty() {
            return Ok(0);
        }

        let answer_ids: Vec<String> = submitted.into_iter().map(|a| a.answer_id).collect();
        track_db_operation("count", ANSWERS, async {
            Ok::<_, StoreError>(self
                .collection::<Document>(ANSWERS)
                .count_documents(doc! { "_id": { "$in": answer_ids }, "is_correct": true })
                .await?)
        })
        .await
    }

    async fn find_taken_quiz(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> Result<Option<TakenQuiz>, StoreError> {
        self.find_one(
            TAKEN_QUIZZES,
            doc! { "student_id": student_id, "quiz_id": quiz_id },
        )
        .await
    }

    async fn list_taken_quizzes(&self, student_id: &str) -> Result<Vec<TakenQuiz>, StoreError> {
        self.find_all(
            TAKEN_QUIZZES,
            doc! { "student_id": student_id },
            doc! { "date": 1 },
        )
        .await
    }

    async fn commit_submission(
        &self,
        answer: &StudentAnswer,
        taken: Option<&TakenQuiz>,
    ) -> Result<(), StoreError> {
        track_db_operation("transaction", STUDENT_ANSWERS, async {
            let mut session = self.client.start_session().await?;
            session.start_transaction().await?;

            if let Err(err) = self.write_submission(&mut session, answer, taken).await {
                if let Err(abort_err) = session.abort_transaction().await {
                    tracing::warn!("Failed to abort submission transaction: {}", abort_err);
                }
                return Err(StoreError::from(err));
            }

            session.commit_transaction().await?;
            Ok::<(), StoreError>(())
        })
        .await
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, StoreError> {
        self.find_all(SUBJECTS, doc! {}, doc! { "name": 1 }).await
    }

    async fn find_student(&self, student_id: &str) -> Result<Option<Student>, StoreError> {
        self.find_one(STUDENTS, doc! { "_id": student_id }).await
    }

    async fn save_student_interests(
        &self,
        student_id: &str,
        subject_ids: &[String],
    ) -> Result<(), StoreError> {
        let student = Student {
            id: student_id.to_string(),
            interests: subject_ids.to_vec(),
        };

        track_db_operation("replace", STUDENTS, async {
            self.collection::<Student>(STUDENTS)
                .replace_one(doc! { "_id": student_id }, &student)
                .with_options(ReplaceOptions::builder().upsert(true).build())
                .await?;
            Ok::<(), StoreError>(())
        })
        .await
    }

    async fn quizzes_for_subjects(&self, subject_ids: &[String]) -> Result<Vec<Quiz>, StoreError> {
        if subject_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_all(
            QUIZZES,
            doc! { "subject_id": { "$in": subject_ids.to_vec() } },
            doc! { "name": 1, "_id": 1 },
        )
        .await
    }

    async fn quizzes_by_ids(&self, quiz_ids: &[String]) -> Result<Vec<Quiz>, StoreError> {
        if quiz_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_all(
            QUIZZES,
            doc! { "_id": { "$in": quiz_ids.to_vec() } },
            doc! { "name": 1 },
        )
        .await
    }
}
