use clavier_core::model::{
    AnswerLog, AnswerLogId, Choice, GameSession, PerkFlags, Player, PlayerId, Question,
    QuestionId, Role, SessionId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{ScoreRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps driver errors; unique and foreign key violations become `Conflict`.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() || db.is_foreign_key_violation() => {
            StorageError::Conflict
        }
        _ => StorageError::Connection(e.to_string()),
    }
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn u8_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn player_id_from_i64(v: i64) -> Result<PlayerId, StorageError> {
    Ok(PlayerId::new(i64_to_u64("player_id", v)?))
}

pub(crate) fn session_id_from_i64(v: i64) -> Result<SessionId, StorageError> {
    Ok(SessionId::new(i64_to_u64("session_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn answer_log_id_from_i64(v: i64) -> Result<AnswerLogId, StorageError> {
    Ok(AnswerLogId::new(i64_to_u64("answer_log_id", v)?))
}

pub(crate) fn parse_role(s: &str) -> Result<Role, StorageError> {
    s.parse::<Role>().map_err(ser)
}

pub(crate) fn parse_choice(s: &str) -> Result<Choice, StorageError> {
    s.parse::<Choice>().map_err(ser)
}

pub(crate) fn map_player_row(row: &SqliteRow) -> Result<Player, StorageError> {
    let role: String = row.try_get("role").map_err(ser)?;
    Player::new(
        player_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        parse_role(&role)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_session_row(row: &SqliteRow) -> Result<GameSession, StorageError> {
    let perks = PerkFlags {
        front: row.try_get("front_joker_used").map_err(ser)?,
        back: row.try_get("back_joker_used").map_err(ser)?,
        mobile: row.try_get("mobile_joker_used").map_err(ser)?,
    };

    GameSession::from_persisted(
        session_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        player_id_from_i64(row.try_get::<i64, _>("player_id").map_err(ser)?)?,
        row.try_get("started_at").map_err(ser)?,
        u8_from_i64("stage", row.try_get::<i64, _>("stage").map_err(ser)?)?,
        u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        u32_from_i64("streak", row.try_get::<i64, _>("streak").map_err(ser)?)?,
        row.try_get("completed").map_err(ser)?,
        perks,
    )
    .map_err(ser)
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let correct: String = row.try_get("correct_choice").map_err(ser)?;
    let choices = [
        row.try_get::<String, _>("choice_a").map_err(ser)?,
        row.try_get::<String, _>("choice_b").map_err(ser)?,
        row.try_get::<String, _>("choice_c").map_err(ser)?,
        row.try_get::<String, _>("choice_d").map_err(ser)?,
    ];

    Question::from_persisted(
        question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("prompt").map_err(ser)?,
        choices,
        parse_choice(&correct)?,
        u8_from_i64("stage", row.try_get::<i64, _>("stage").map_err(ser)?)?,
        row.try_get::<String, _>("hint").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_answer_row(row: &SqliteRow) -> Result<AnswerLog, StorageError> {
    let selected: String = row.try_get("selected").map_err(ser)?;
    Ok(AnswerLog {
        id: answer_log_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        session_id: session_id_from_i64(row.try_get::<i64, _>("session_id").map_err(ser)?)?,
        question_id: question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?,
        selected: parse_choice(&selected)?,
        is_correct: row.try_get("is_correct").map_err(ser)?,
        answered_at: row.try_get("answered_at").map_err(ser)?,
    })
}

pub(crate) fn map_score_row(row: &SqliteRow) -> Result<ScoreRow, StorageError> {
    Ok(ScoreRow {
        session_id: session_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        player_name: row.try_get("name").map_err(ser)?,
        score: u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        started_at: row.try_get("started_at").map_err(ser)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_ids_are_rejected() {
        assert!(matches!(
            session_id_from_i64(-1).unwrap_err(),
            StorageError::Serialization(_)
        ));
        assert_eq!(player_id_from_i64(7).unwrap(), PlayerId::new(7));
    }

    #[test]
    fn stored_labels_parse() {
        assert_eq!(parse_role("back").unwrap(), Role::Back);
        assert_eq!(parse_choice("D").unwrap(), Choice::D);
        assert!(parse_role("ops").is_err());
    }
}
