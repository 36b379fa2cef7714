use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clavier_core::model::{
    AnswerCounts, AnswerLog, AnswerLogId, Choice, GameSession, Player, PlayerId, Question,
    QuestionId, Role, SessionId, ValidatedQuestion,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Insert shape for a player; the id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlayerRecord {
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Insert shape for a session; it always starts at the first stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewSessionRecord {
    pub player_id: PlayerId,
    pub started_at: DateTime<Utc>,
}

/// Insert shape for an answer log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewAnswerLog {
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub selected: Choice,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

impl NewAnswerLog {
    fn assign_id(self, id: AnswerLogId) -> AnswerLog {
        AnswerLog {
            id,
            session_id: self.session_id,
            question_id: self.question_id,
            selected: self.selected,
            is_correct: self.is_correct,
            answered_at: self.answered_at,
        }
    }
}

/// One leaderboard line: a session joined to its player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRow {
    pub session_id: SessionId,
    pub player_name: String,
    pub score: u32,
    pub started_at: DateTime<Utc>,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait PlayerRepository: Send + Sync {
    /// Insert a new player.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the name is already taken.
    async fn insert_player(&self, player: NewPlayerRecord) -> Result<PlayerId, StorageError>;

    /// Fetch a player by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_player(&self, id: PlayerId) -> Result<Option<Player>, StorageError>;

    /// Fetch a player by exact name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn find_player_by_name(&self, name: &str) -> Result<Option<Player>, StorageError>;

    /// Change the role of an existing player.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the player does not exist.
    async fn update_player_role(&self, id: PlayerId, role: Role) -> Result<(), StorageError>;

    /// Remove a player together with all of its sessions and answers.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the player does not exist.
    async fn delete_player(&self, id: PlayerId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait GameSessionRepository: Send + Sync {
    /// Create a session at stage 1 with nothing scored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the player does not exist.
    async fn insert_session(&self, session: NewSessionRecord) -> Result<SessionId, StorageError>;

    /// Fetch a session by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_session(&self, id: SessionId) -> Result<Option<GameSession>, StorageError>;

    /// Persist the mutable fields of a session (stage, score, streak, flags).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist.
    async fn update_session(&self, session: &GameSession) -> Result<(), StorageError>;

    /// Most recently started session of a player (ties broken by highest id).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn latest_session_for_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<GameSession>, StorageError>;

    /// All sessions of a player, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn sessions_for_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Vec<GameSession>, StorageError>;

    /// Every session joined to its player, by score desc, then started_at asc, then id asc.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_scores(&self) -> Result<Vec<ScoreRow>, StorageError>;
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Add a question to the catalog.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn insert_question(&self, question: &ValidatedQuestion)
    -> Result<QuestionId, StorageError>;

    /// Add several questions as one unit: either all are stored or none.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any question cannot be stored; nothing is kept then.
    async fn insert_questions(
        &self,
        questions: &[ValidatedQuestion],
    ) -> Result<Vec<QuestionId>, StorageError>;

    /// Fetch a question by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError>;

    /// The whole catalog, by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_questions(&self) -> Result<Vec<Question>, StorageError>;

    /// Whether at least one question exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn has_questions(&self) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait AnswerLogRepository: Send + Sync {
    /// Answers of a session in submission order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn logs_for_session(&self, session_id: SessionId)
    -> Result<Vec<AnswerLog>, StorageError>;

    /// The most recently submitted answer of a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn last_log(&self, session_id: SessionId) -> Result<Option<AnswerLog>, StorageError>;

    /// Total and correct answer counts of a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn answer_counts(&self, session_id: SessionId) -> Result<AnswerCounts, StorageError>;
}

/// Atomic write of a scored answer: the session update and its log row
/// succeed or fail together.
#[async_trait]
pub trait GamePersistence: Send + Sync {
    /// Update `session` and append `answer` in one unit of work.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if `answer` belongs to another session,
    /// `StorageError::NotFound` if the session does not exist.
    async fn record_answer(
        &self,
        session: &GameSession,
        answer: NewAnswerLog,
    ) -> Result<AnswerLogId, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    players: BTreeMap<PlayerId, Player>,
    sessions: BTreeMap<SessionId, GameSession>,
    questions: BTreeMap<QuestionId, Question>,
    answers: BTreeMap<AnswerLogId, AnswerLog>,
    last_id: u64,
}

impl MemoryState {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    fn session_logs(&self, session_id: SessionId) -> Vec<AnswerLog> {
        let mut logs: Vec<AnswerLog> = self
            .answers
            .values()
            .filter(|log| log.session_id == session_id)
            .cloned()
            .collect();
        logs.sort_by_key(|log| (log.answered_at, log.id));
        logs
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Ids come from one shared counter, so they are unique across entities.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[async_trait]
impl PlayerRepository for InMemoryRepository {
    async fn insert_player(&self, player: NewPlayerRecord) -> Result<PlayerId, StorageError> {
        let mut guard = self.lock()?;
        if guard.players.values().any(|p| p.name() == player.name) {
            return Err(StorageError::Conflict);
        }
        let id = PlayerId::new(guard.next_id());
        let player = Player::new(id, player.name, player.role, player.created_at).map_err(ser)?;
        guard.players.insert(id, player);
        Ok(id)
    }

    async fn get_player(&self, id: PlayerId) -> Result<Option<Player>, StorageError> {
        Ok(self.lock()?.players.get(&id).cloned())
    }

    async fn find_player_by_name(&self, name: &str) -> Result<Option<Player>, StorageError> {
        Ok(self
            .lock()?
            .players
            .values()
            .find(|p| p.name() == name)
            .cloned())
    }

    async fn update_player_role(&self, id: PlayerId, role: Role) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let player = guard.players.get_mut(&id).ok_or(StorageError::NotFound)?;
        player.set_role(role);
        Ok(())
    }

    async fn delete_player(&self, id: PlayerId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.players.remove(&id).ok_or(StorageError::NotFound)?;
        let removed: Vec<SessionId> = guard
            .sessions
            .values()
            .filter(|s| s.player_id() == id)
            .map(GameSession::id)
            .collect();
        guard.sessions.retain(|_, s| s.player_id() != id);
        guard
            .answers
            .retain(|_, log| !removed.contains(&log.session_id));
        Ok(())
    }
}

#[async_trait]
impl GameSessionRepository for InMemoryRepository {
    async fn insert_session(&self, session: NewSessionRecord) -> Result<SessionId, StorageError> {
        let mut guard = self.lock()?;
        if !guard.players.contains_key(&session.player_id) {
            return Err(StorageError::NotFound);
        }
        let id = SessionId::new(guard.next_id());
        guard.sessions.insert(
            id,
            GameSession::start(id, session.player_id, session.started_at),
        );
        Ok(id)
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<GameSession>, StorageError> {
        Ok(self.lock()?.sessions.get(&id).cloned())
    }

    async fn update_session(&self, session: &GameSession) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard
            .sessions
            .get_mut(&session.id())
            .ok_or(StorageError::NotFound)?;
        *slot = session.clone();
        Ok(())
    }

    async fn latest_session_for_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<GameSession>, StorageError> {
        Ok(self
            .sessions_for_player(player_id)
            .await?
            .into_iter()
            .next())
    }

    async fn sessions_for_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Vec<GameSession>, StorageError> {
        let guard = self.lock()?;
        let mut sessions: Vec<GameSession> = guard
            .sessions
            .values()
            .filter(|s| s.player_id() == player_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| {
            b.started_at()
                .cmp(&a.started_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        Ok(sessions)
    }

    async fn list_scores(&self) -> Result<Vec<ScoreRow>, StorageError> {
        let guard = self.lock()?;
        let mut rows = Vec::with_capacity(guard.sessions.len());
        for session in guard.sessions.values() {
            let player = guard
                .players
                .get(&session.player_id())
                .ok_or(StorageError::NotFound)?;
            rows.push(ScoreRow {
                session_id: session.id(),
                player_name: player.name().to_owned(),
                score: session.score(),
                started_at: session.started_at(),
            });
        }
        rows.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.started_at.cmp(&b.started_at))
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        Ok(rows)
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn insert_question(
        &self,
        question: &ValidatedQuestion,
    ) -> Result<QuestionId, StorageError> {
        let mut guard = self.lock()?;
        let id = QuestionId::new(guard.next_id());
        guard.questions.insert(id, question.clone().assign_id(id));
        Ok(id)
    }

    async fn insert_questions(
        &self,
        questions: &[ValidatedQuestion],
    ) -> Result<Vec<QuestionId>, StorageError> {
        let mut guard = self.lock()?;
        let ids = questions
            .iter()
            .map(|question| {
                let id = QuestionId::new(guard.next_id());
                guard.questions.insert(id, question.clone().assign_id(id));
                id
            })
            .collect();
        Ok(ids)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        Ok(self.lock()?.questions.get(&id).cloned())
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StorageError> {
        Ok(self.lock()?.questions.values().cloned().collect())
    }

    async fn has_questions(&self) -> Result<bool, StorageError> {
        Ok(!self.lock()?.questions.is_empty())
    }
}

#[async_trait]
impl AnswerLogRepository for InMemoryRepository {
    async fn logs_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AnswerLog>, StorageError> {
        Ok(self.lock()?.session_logs(session_id))
    }

    async fn last_log(&self, session_id: SessionId) -> Result<Option<AnswerLog>, StorageError> {
        Ok(self.lock()?.session_logs(session_id).pop())
    }

    async fn answer_counts(&self, session_id: SessionId) -> Result<AnswerCounts, StorageError> {
        Ok(AnswerCounts::from_logs(
            &self.lock()?.session_logs(session_id),
        ))
    }
}

#[async_trait]
impl GamePersistence for InMemoryRepository {
    async fn record_answer(
        &self,
        session: &GameSession,
        answer: NewAnswerLog,
    ) -> Result<AnswerLogId, StorageError> {
        if answer.session_id != session.id() {
            return Err(StorageError::Conflict);
        }
        let mut guard = self.lock()?;
        if !guard.questions.contains_key(&answer.question_id) {
            return Err(StorageError::NotFound);
        }
        let slot = guard
            .sessions
            .get_mut(&session.id())
            .ok_or(StorageError::NotFound)?;
        *slot = session.clone();
        let id = AnswerLogId::new(guard.next_id());
        guard.answers.insert(id, answer.assign_id(id));
        Ok(id)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub players: Arc<dyn PlayerRepository>,
    pub sessions: Arc<dyn GameSessionRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub answers: Arc<dyn AnswerLogRepository>,
    pub game: Arc<dyn GamePersistence>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_backend(InMemoryRepository::new())
    }

    pub(crate) fn from_backend<R>(repo: R) -> Self
    where
        R: PlayerRepository
            + GameSessionRepository
            + QuestionRepository
            + AnswerLogRepository
            + GamePersistence
            + Clone
            + 'static,
    {
        let players: Arc<dyn PlayerRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn GameSessionRepository> = Arc::new(repo.clone());
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let answers: Arc<dyn AnswerLogRepository> = Arc::new(repo.clone());
        let game: Arc<dyn GamePersistence> = Arc::new(repo);
        Self {
            players,
            sessions,
            questions,
            answers,
            game,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clavier_core::model::QuestionDraft;
    use clavier_core::time::fixed_now;

    fn question(stage: u8) -> ValidatedQuestion {
        QuestionDraft {
            prompt: format!("Question stage {stage}"),
            choices: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct_choice: Choice::A,
            stage,
            hint: String::new(),
        }
        .validate()
        .unwrap()
    }

    async fn player(repo: &InMemoryRepository, name: &str) -> PlayerId {
        repo.insert_player(NewPlayerRecord {
            name: name.into(),
            role: Role::Front,
            created_at: fixed_now(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn batch_insert_stores_every_question_in_order() {
        let repo = InMemoryRepository::new();
        let ids = repo
            .insert_questions(&[question(1), question(2), question(3)])
            .await
            .unwrap();
        assert_eq!(ids.len(), 3);
        let stored: Vec<_> = repo
            .list_questions()
            .await
            .unwrap()
            .iter()
            .map(|q| (q.id(), q.stage()))
            .collect();
        assert_eq!(stored, vec![(ids[0], 1), (ids[1], 2), (ids[2], 3)]);
    }

    #[tokio::test]
    async fn duplicate_player_name_conflicts() {
        let repo = InMemoryRepository::new();
        player(&repo, "Alice").await;
        let err = repo
            .insert_player(NewPlayerRecord {
                name: "Alice".into(),
                role: Role::Back,
                created_at: fixed_now(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn record_answer_updates_session_and_appends_log() {
        let repo = InMemoryRepository::new();
        let pid = player(&repo, "Alice").await;
        let qid = repo.insert_question(&question(1)).await.unwrap();
        let sid = repo
            .insert_session(NewSessionRecord {
                player_id: pid,
                started_at: fixed_now(),
            })
            .await
            .unwrap();

        let mut session = repo.get_session(sid).await.unwrap().unwrap();
        session.apply_answer(true);
        repo.record_answer(
            &session,
            NewAnswerLog {
                session_id: sid,
                question_id: qid,
                selected: Choice::A,
                is_correct: true,
                answered_at: fixed_now(),
            },
        )
        .await
        .unwrap();

        let stored = repo.get_session(sid).await.unwrap().unwrap();
        assert_eq!(stored.stage(), 2);
        assert_eq!(stored.score(), 10);
        let counts = repo.answer_counts(sid).await.unwrap();
        assert_eq!(counts, AnswerCounts { total: 1, correct: 1 });
    }

    #[tokio::test]
    async fn record_answer_rejects_mismatched_session() {
        let repo = InMemoryRepository::new();
        let pid = player(&repo, "Alice").await;
        let qid = repo.insert_question(&question(1)).await.unwrap();
        let sid = repo
            .insert_session(NewSessionRecord {
                player_id: pid,
                started_at: fixed_now(),
            })
            .await
            .unwrap();
        let session = repo.get_session(sid).await.unwrap().unwrap();
        let err = repo
            .record_answer(
                &session,
                NewAnswerLog {
                    session_id: SessionId::new(999),
                    question_id: qid,
                    selected: Choice::B,
                    is_correct: false,
                    answered_at: fixed_now(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
        assert!(repo.last_log(sid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_a_player_cascades() {
        let repo = InMemoryRepository::new();
        let pid = player(&repo, "Alice").await;
        let sid = repo
            .insert_session(NewSessionRecord {
                player_id: pid,
                started_at: fixed_now(),
            })
            .await
            .unwrap();

        repo.delete_player(pid).await.unwrap();
        assert!(repo.get_session(sid).await.unwrap().is_none());
        assert!(repo.list_scores().await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_player(pid).await.unwrap_err(),
            StorageError::NotFound
        ));
    }

    #[tokio::test]
    async fn latest_session_breaks_timestamp_ties_by_id() {
        let repo = InMemoryRepository::new();
        let pid = player(&repo, "Alice").await;
        let record = NewSessionRecord {
            player_id: pid,
            started_at: fixed_now(),
        };
        let _first = repo.insert_session(record).await.unwrap();
        let second = repo.insert_session(record).await.unwrap();

        let latest = repo.latest_session_for_player(pid).await.unwrap().unwrap();
        assert_eq!(latest.id(), second);
    }
}
