use clavier_core::model::{Choice, Question, QuestionId, ValidatedQuestion};

use super::SqliteRepository;
use super::mapping::{db_err, id_i64, map_question_row, question_id_from_i64};
use crate::repository::{QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_question(
        &self,
        question: &ValidatedQuestion,
    ) -> Result<QuestionId, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        insert_row(&mut conn, question).await
    }

    async fn insert_questions(
        &self,
        questions: &[ValidatedQuestion],
    ) -> Result<Vec<QuestionId>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let mut ids = Vec::with_capacity(questions.len());
        for question in questions {
            match insert_row(&mut tx, question).await {
                Ok(id) => ids.push(id),
                Err(err) => {
                    tx.rollback().await.map_err(db_err)?;
                    return Err(err);
                }
            }
        }

        tx.commit().await.map_err(db_err)?;
        Ok(ids)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, prompt, choice_a, choice_b, choice_c, choice_d, correct_choice, stage, hint
            FROM questions WHERE id = ?1
            ",
        )
        .bind(id_i64("question_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_question_row).transpose()
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, prompt, choice_a, choice_b, choice_c, choice_d, correct_choice, stage, hint
            FROM questions
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn has_questions(&self) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM questions LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.is_some())
    }
}

async fn insert_row(
    conn: &mut sqlx::SqliteConnection,
    question: &ValidatedQuestion,
) -> Result<QuestionId, StorageError> {
    let res = sqlx::query(
        r"
        INSERT INTO questions (
            prompt, choice_a, choice_b, choice_c, choice_d,
            correct_choice, stage, hint
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ",
    )
    .bind(question.prompt())
    .bind(question.choice(Choice::A))
    .bind(question.choice(Choice::B))
    .bind(question.choice(Choice::C))
    .bind(question.choice(Choice::D))
    .bind(question.correct_choice().as_str())
    .bind(i64::from(question.stage()))
    .bind(question.hint())
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    question_id_from_i64(res.last_insert_rowid())
}
