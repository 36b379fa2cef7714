use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use clavier_core::model::{
    Choice, GameSession, Perk, Player, Question, QuestionId, Role, SessionId, normalize_name,
};
use storage::repository::{
    AnswerLogRepository, GamePersistence, GameSessionRepository, NewAnswerLog, NewPlayerRecord,
    NewSessionRecord, PlayerRepository, QuestionRepository, Storage,
};

use super::state::{HintOutcome, ScoreEntry, SessionState};
use crate::Clock;
use crate::error::GameError;
use crate::question_pool::QuestionPool;

/// Runs game sessions: answers, perks and the leaderboard.
pub struct GameService {
    clock: Clock,
    players: Arc<dyn PlayerRepository>,
    sessions: Arc<dyn GameSessionRepository>,
    questions: Arc<dyn QuestionRepository>,
    answers: Arc<dyn AnswerLogRepository>,
    game: Arc<dyn GamePersistence>,
    pool: Mutex<QuestionPool>,
}

impl GameService {
    #[must_use]
    pub fn new(
        clock: Clock,
        players: Arc<dyn PlayerRepository>,
        sessions: Arc<dyn GameSessionRepository>,
        questions: Arc<dyn QuestionRepository>,
        answers: Arc<dyn AnswerLogRepository>,
        game: Arc<dyn GamePersistence>,
        pool: QuestionPool,
    ) -> Self {
        Self {
            clock,
            players,
            sessions,
            questions,
            answers,
            game,
            pool: Mutex::new(pool),
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage, pool: QuestionPool) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.players),
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.answers),
            Arc::clone(&storage.game),
            pool,
        )
    }

    /// Starts a fresh session, reusing the player with this name if there is one.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Validation` for a blank or oversized name, or a storage error.
    pub async fn start_new_game(&self, name: &str, role: Role) -> Result<SessionState, GameError> {
        let name = normalize_name(name)?;
        let now = self.clock.now();

        let player = match self.players.find_player_by_name(&name).await? {
            Some(mut player) => {
                if player.role() != role {
                    self.players.update_player_role(player.id(), role).await?;
                    player.set_role(role);
                }
                player
            }
            None => {
                let id = self
                    .players
                    .insert_player(NewPlayerRecord {
                        name: name.clone(),
                        role,
                        created_at: now,
                    })
                    .await?;
                Player::new(id, &name, role, now)?
            }
        };

        let session_id = self
            .sessions
            .insert_session(NewSessionRecord {
                player_id: player.id(),
                started_at: now,
            })
            .await?;
        let session = GameSession::start(session_id, player.id(), now);

        tracing::info!(
            session = %session_id,
            player = player.name(),
            role = role.as_str(),
            "started new game"
        );
        self.state_for(&session, &player).await
    }

    /// Most recently started session of the player, if any.
    ///
    /// # Errors
    ///
    /// Returns a storage error if lookups fail.
    pub async fn resume_last_game(&self, name: &str) -> Result<Option<SessionState>, GameError> {
        let Ok(name) = normalize_name(name) else {
            return Ok(None);
        };
        let Some(player) = self.players.find_player_by_name(&name).await? else {
            return Ok(None);
        };
        let Some(session) = self.sessions.latest_session_for_player(player.id()).await? else {
            return Ok(None);
        };

        tracing::debug!(session = %session.id(), player = player.name(), "resumed game");
        self.state_for(&session, &player).await.map(Some)
    }

    /// Scores one answer and persists it together with the session.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` variants for unknown ids, `Completed` for a finished session,
    /// or a storage error.
    pub async fn submit_answer(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
        selected: Choice,
    ) -> Result<SessionState, GameError> {
        let mut session = self.load_session(session_id).await?;
        let question = self
            .questions
            .get_question(question_id)
            .await?
            .ok_or(GameError::QuestionNotFound(question_id))?;
        if session.is_completed() {
            return Err(GameError::Completed(session_id));
        }

        let is_correct = question.is_correct(selected);
        let effect = session.apply_answer(is_correct);
        self.game
            .record_answer(
                &session,
                NewAnswerLog {
                    session_id,
                    question_id,
                    selected,
                    is_correct,
                    answered_at: self.clock.now(),
                },
            )
            .await?;

        tracing::debug!(
            session = %session_id,
            question = %question_id,
            correct = is_correct,
            delta = effect.score_delta,
            stage = effect.stage_after,
            "answer recorded"
        );
        if effect.completed {
            tracing::info!(session = %session_id, score = session.score(), "game completed");
        }

        let player = self.load_player(&session).await?;
        self.state_for(&session, &player).await
    }

    /// Front perk: skips `current_question_id` by dropping it from the pool.
    ///
    /// # Errors
    ///
    /// Returns `PerkNotAllowed` for another role, `SessionNotFound`, or a storage error.
    pub async fn use_front_joker(
        &self,
        session_id: SessionId,
        current_question_id: Option<QuestionId>,
    ) -> Result<SessionState, GameError> {
        let (mut session, player) = self.load_for_perk(session_id, Perk::SkipQuestion).await?;
        if session.perks().is_used(Perk::SkipQuestion) {
            return self.state_for(&session, &player).await;
        }

        if let Some(question_id) = current_question_id {
            self.ensure_pool_loaded().await?;
            let removed = self.pool().discard(question_id);
            tracing::debug!(question = %question_id, removed, "skipped question");
        }

        session.mark_perk_used(Perk::SkipQuestion);
        self.sessions.update_session(&session).await?;
        tracing::info!(session = %session_id, perk = "front", "perk used");
        self.state_for(&session, &player).await
    }

    /// Back perk: catch-up after a wrong answer.
    ///
    /// The flag is spent even when the last answer was correct.
    ///
    /// # Errors
    ///
    /// Returns `PerkNotAllowed` for another role, `SessionNotFound`, or a storage error.
    pub async fn use_back_joker(&self, session_id: SessionId) -> Result<SessionState, GameError> {
        let (mut session, player) = self.load_for_perk(session_id, Perk::CatchUp).await?;
        if session.perks().is_used(Perk::CatchUp) {
            return self.state_for(&session, &player).await;
        }

        let last_wrong = self
            .answers
            .last_log(session_id)
            .await?
            .is_some_and(|log| !log.is_correct);
        if last_wrong {
            session.apply_catch_up();
        }

        session.mark_perk_used(Perk::CatchUp);
        self.sessions.update_session(&session).await?;
        tracing::info!(session = %session_id, perk = "back", granted = last_wrong, "perk used");
        self.state_for(&session, &player).await
    }

    /// Mobile perk: hint for the question currently assigned to the session.
    ///
    /// # Errors
    ///
    /// Returns `PerkNotAllowed` for another role, `SessionNotFound`, or a storage error.
    pub async fn use_mobile_joker(&self, session_id: SessionId) -> Result<HintOutcome, GameError> {
        let (mut session, _player) = self.load_for_perk(session_id, Perk::Hint).await?;
        if session.perks().is_used(Perk::Hint) {
            return Ok(HintOutcome::AlreadyUsed);
        }

        let hint = self
            .current_question(&session)
            .await?
            .and_then(|q| q.hint().map(str::to_owned));

        session.mark_perk_used(Perk::Hint);
        self.sessions.update_session(&session).await?;
        tracing::info!(session = %session_id, perk = "mobile", found = hint.is_some(), "perk used");

        Ok(hint.map_or(HintOutcome::NoHint, HintOutcome::Hint))
    }

    /// Leaderboard, best score first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn list_scores(&self) -> Result<Vec<ScoreEntry>, GameError> {
        let rows = self.sessions.list_scores().await?;
        Ok(rows.into_iter().map(ScoreEntry::from).collect())
    }

    /// Sessions of the named player, most recent first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if lookups fail.
    pub async fn list_history(&self, name: &str) -> Result<Vec<GameSession>, GameError> {
        let Ok(name) = normalize_name(name) else {
            return Ok(Vec::new());
        };
        match self.players.find_player_by_name(&name).await? {
            Some(player) => Ok(self.sessions.sessions_for_player(player.id()).await?),
            None => Ok(Vec::new()),
        }
    }

    async fn load_session(&self, session_id: SessionId) -> Result<GameSession, GameError> {
        self.sessions
            .get_session(session_id)
            .await?
            .ok_or(GameError::SessionNotFound(session_id))
    }

    async fn load_player(&self, session: &GameSession) -> Result<Player, GameError> {
        self.players
            .get_player(session.player_id())
            .await?
            .ok_or(GameError::PlayerNotFound(session.player_id()))
    }

    async fn load_for_perk(
        &self,
        session_id: SessionId,
        perk: Perk,
    ) -> Result<(GameSession, Player), GameError> {
        let session = self.load_session(session_id).await?;
        let player = self.load_player(&session).await?;
        let role = player.role();
        if role.perk() != perk {
            tracing::warn!(session = %session_id, role = role.as_str(), ?perk, "perk rejected");
            return Err(GameError::PerkNotAllowed { role, perk });
        }
        Ok((session, player))
    }

    async fn state_for(
        &self,
        session: &GameSession,
        player: &Player,
    ) -> Result<SessionState, GameError> {
        let counts = self.answers.answer_counts(session.id()).await?;
        let current = self.current_question(session).await?;
        Ok(SessionState::assemble(
            session,
            player,
            counts,
            current.as_ref(),
        ))
    }

    /// Question assigned to the session's stage, `None` once completed.
    async fn current_question(&self, session: &GameSession) -> Result<Option<Question>, GameError> {
        if session.is_completed() {
            return Ok(None);
        }
        let stage = session.stage();
        let answered: HashSet<QuestionId> = self
            .answers
            .logs_for_session(session.id())
            .await?
            .into_iter()
            .map(|log| log.question_id)
            .collect();

        let picked = self.pool().pick(stage, &answered).cloned();
        if picked.is_some() {
            return Ok(picked);
        }

        self.reload_pool().await?;
        Ok(self.pool().pick(stage, &answered).cloned())
    }

    async fn ensure_pool_loaded(&self) -> Result<(), GameError> {
        if self.pool().is_empty() {
            self.reload_pool().await?;
        }
        Ok(())
    }

    async fn reload_pool(&self) -> Result<(), GameError> {
        let questions = self.questions.list_questions().await?;
        let mut pool = self.pool();
        pool.refill(questions);
        tracing::debug!(size = pool.len(), "question pool reloaded");
        Ok(())
    }

    // Every pool mutation leaves it consistent, so a poisoned lock is still usable.
    fn pool(&self) -> MutexGuard<'_, QuestionPool> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
