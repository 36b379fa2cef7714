use clavier_core::model::{AnswerCounts, AnswerLog, AnswerLogId, GameSession, SessionId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{answer_log_id_from_i64, db_err, id_i64, map_answer_row, ser};
use super::session_repo::update_session_row;
use crate::repository::{AnswerLogRepository, GamePersistence, NewAnswerLog, StorageError};

#[async_trait::async_trait]
impl AnswerLogRepository for SqliteRepository {
    async fn logs_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AnswerLog>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, session_id, question_id, selected, is_correct, answered_at
            FROM answer_logs
            WHERE session_id = ?1
            ORDER BY answered_at ASC, id ASC
            ",
        )
        .bind(id_i64("session_id", session_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_answer_row).collect()
    }

    async fn last_log(&self, session_id: SessionId) -> Result<Option<AnswerLog>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, session_id, question_id, selected, is_correct, answered_at
            FROM answer_logs
            WHERE session_id = ?1
            ORDER BY answered_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(id_i64("session_id", session_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_answer_row).transpose()
    }

    async fn answer_counts(&self, session_id: SessionId) -> Result<AnswerCounts, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN is_correct THEN 1 ELSE 0 END), 0) AS correct
            FROM answer_logs
            WHERE session_id = ?1
            ",
        )
        .bind(id_i64("session_id", session_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let total: i64 = row.try_get("total").map_err(ser)?;
        let correct: i64 = row.try_get("correct").map_err(ser)?;
        Ok(AnswerCounts {
            total: u32::try_from(total).map_err(ser)?,
            correct: u32::try_from(correct).map_err(ser)?,
        })
    }
}

#[async_trait::async_trait]
impl GamePersistence for SqliteRepository {
    async fn record_answer(
        &self,
        session: &GameSession,
        answer: NewAnswerLog,
    ) -> Result<AnswerLogId, StorageError> {
        if answer.session_id != session.id() {
            return Err(StorageError::Conflict);
        }

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        match write_answer(&mut tx, session, answer).await {
            Ok(id) => {
                tx.commit().await.map_err(db_err)?;
                Ok(id)
            }
            Err(err) => {
                tx.rollback().await.map_err(db_err)?;
                Err(err)
            }
        }
    }
}

async fn write_answer(
    conn: &mut sqlx::SqliteConnection,
    session: &GameSession,
    answer: NewAnswerLog,
) -> Result<AnswerLogId, StorageError> {
    update_session_row(conn, session).await?;

    let res = sqlx::query(
        r"
        INSERT INTO answer_logs (session_id, question_id, selected, is_correct, answered_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ",
    )
    .bind(id_i64("session_id", answer.session_id.value())?)
    .bind(id_i64("question_id", answer.question_id.value())?)
    .bind(answer.selected.as_str())
    .bind(answer.is_correct)
    .bind(answer.answered_at)
    .execute(&mut *conn)
    .await
    // The only foreign key left to break here is an unknown question.
    .map_err(|e| match db_err(e) {
        StorageError::Conflict => StorageError::NotFound,
        other => other,
    })?;

    answer_log_id_from_i64(res.last_insert_rowid())
}
