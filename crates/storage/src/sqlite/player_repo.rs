use clavier_core::model::{Player, PlayerId, Role};

use super::SqliteRepository;
use super::mapping::{db_err, id_i64, map_player_row, player_id_from_i64};
use crate::repository::{NewPlayerRecord, PlayerRepository, StorageError};

#[async_trait::async_trait]
impl PlayerRepository for SqliteRepository {
    async fn insert_player(&self, player: NewPlayerRecord) -> Result<PlayerId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO players (name, role, created_at)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(player.name)
        .bind(player.role.as_str())
        .bind(player.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        player_id_from_i64(res.last_insert_rowid())
    }

    async fn get_player(&self, id: PlayerId) -> Result<Option<Player>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, role, created_at
            FROM players WHERE id = ?1
            ",
        )
        .bind(id_i64("player_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_player_row).transpose()
    }

    async fn find_player_by_name(&self, name: &str) -> Result<Option<Player>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, role, created_at
            FROM players WHERE name = ?1
            ",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_player_row).transpose()
    }

    async fn update_player_role(&self, id: PlayerId, role: Role) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE players SET role = ?2 WHERE id = ?1")
            .bind(id_i64("player_id", id.value())?)
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_player(&self, id: PlayerId) -> Result<(), StorageError> {
        // Sessions and their answer logs go with the player (ON DELETE CASCADE).
        let res = sqlx::query("DELETE FROM players WHERE id = ?1")
            .bind(id_i64("player_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
