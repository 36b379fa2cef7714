use clavier_core::model::{GameSession, PlayerId, SessionId};

use super::SqliteRepository;
use super::mapping::{db_err, id_i64, map_score_row, map_session_row, session_id_from_i64};
use crate::repository::{GameSessionRepository, NewSessionRecord, ScoreRow, StorageError};

const SESSION_COLUMNS: &str = "id, player_id, started_at, completed, stage, score, streak, \
     front_joker_used, back_joker_used, mobile_joker_used";

#[async_trait::async_trait]
impl GameSessionRepository for SqliteRepository {
    async fn insert_session(&self, session: NewSessionRecord) -> Result<SessionId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO game_sessions (player_id, started_at)
            VALUES (?1, ?2)
            ",
        )
        .bind(id_i64("player_id", session.player_id.value())?)
        .bind(session.started_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match db_err(e) {
            StorageError::Conflict => StorageError::NotFound,
            other => other,
        })?;

        session_id_from_i64(res.last_insert_rowid())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<GameSession>, StorageError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM game_sessions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("session_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_session_row).transpose()
    }

    async fn update_session(&self, session: &GameSession) -> Result<(), StorageError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        update_session_row(&mut conn, session).await
    }

    async fn latest_session_for_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<GameSession>, StorageError> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM game_sessions WHERE player_id = ?1 \
             ORDER BY started_at DESC, id DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(id_i64("player_id", player_id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_session_row).transpose()
    }

    async fn sessions_for_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Vec<GameSession>, StorageError> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM game_sessions WHERE player_id = ?1 \
             ORDER BY started_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("player_id", player_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(map_session_row).collect()
    }

    async fn list_scores(&self) -> Result<Vec<ScoreRow>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT s.id, p.name, s.score, s.started_at
            FROM game_sessions s
            JOIN players p ON p.id = s.player_id
            ORDER BY s.score DESC, s.started_at ASC, s.id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_score_row).collect()
    }
}

/// Writes the mutable columns of `session`; shared with the answer transaction.
pub(super) async fn update_session_row(
    conn: &mut sqlx::SqliteConnection,
    session: &GameSession,
) -> Result<(), StorageError> {
    let perks = session.perks();
    let res = sqlx::query(
        r"
        UPDATE game_sessions SET
            completed = ?2,
            stage = ?3,
            score = ?4,
            streak = ?5,
            front_joker_used = ?6,
            back_joker_used = ?7,
            mobile_joker_used = ?8
        WHERE id = ?1
        ",
    )
    .bind(id_i64("session_id", session.id().value())?)
    .bind(session.is_completed())
    .bind(i64::from(session.stage()))
    .bind(i64::from(session.score()))
    .bind(i64::from(session.streak()))
    .bind(perks.front)
    .bind(perks.back)
    .bind(perks.mobile)
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    if res.rows_affected() == 0 {
        return Err(StorageError::NotFound);
    }
    Ok(())
}
