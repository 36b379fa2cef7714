use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{PlayerId, SessionId};
use crate::model::player::Perk;
use crate::scoring::{
    self, AnswerEffect, CATCH_UP_POINTS, CATCH_UP_STREAK, FIRST_STAGE, STAGE_MAX,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GameSessionError {
    #[error("stage must be between 1 and {max}, got {stage}")]
    InvalidStage { stage: u8, max: u8 },

    #[error("session is completed but stage is {stage}")]
    CompletedBeforeFinalStage { stage: u8 },
}

/// Which one-shot perks a session has spent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerkFlags {
    pub front: bool,
    pub back: bool,
    pub mobile: bool,
}

impl PerkFlags {
    #[must_use]
    pub fn is_used(&self, perk: Perk) -> bool {
        match perk {
            Perk::SkipQuestion => self.front,
            Perk::CatchUp => self.back,
            Perk::Hint => self.mobile,
        }
    }

    /// Marks `perk` as used. Returns false if it was already spent.
    pub fn mark_used(&mut self, perk: Perk) -> bool {
        let slot = match perk {
            Perk::SkipQuestion => &mut self.front,
            Perk::CatchUp => &mut self.back,
            Perk::Hint => &mut self.mobile,
        };
        if *slot {
            return false;
        }
        *slot = true;
        true
    }

    #[must_use]
    pub fn any(&self) -> bool {
        self.front || self.back || self.mobile
    }
}

/// One play-through by a player.
///
/// `stage` stays in `1..=STAGE_MAX`; `completed` implies the final stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    id: SessionId,
    player_id: PlayerId,
    started_at: DateTime<Utc>,
    stage: u8,
    score: u32,
    streak: u32,
    completed: bool,
    perks: PerkFlags,
}

impl GameSession {
    /// A fresh session at the first stage with nothing scored or spent.
    #[must_use]
    pub fn start(id: SessionId, player_id: PlayerId, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            player_id,
            started_at,
            stage: FIRST_STAGE,
            score: 0,
            streak: 0,
            completed: false,
            perks: PerkFlags::default(),
        }
    }

    /// Rehydrate a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `GameSessionError` if the row breaks stage invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SessionId,
        player_id: PlayerId,
        started_at: DateTime<Utc>,
        stage: u8,
        score: u32,
        streak: u32,
        completed: bool,
        perks: PerkFlags,
    ) -> Result<Self, GameSessionError> {
        if stage < FIRST_STAGE || stage > STAGE_MAX {
            return Err(GameSessionError::InvalidStage {
                stage,
                max: STAGE_MAX,
            });
        }
        if completed && stage != STAGE_MAX {
            return Err(GameSessionError::CompletedBeforeFinalStage { stage });
        }
        Ok(Self {
            id,
            player_id,
            started_at,
            stage,
            score,
            streak,
            completed,
            perks,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn stage(&self) -> u8 {
        self.stage
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn perks(&self) -> PerkFlags {
        self.perks
    }

    /// Applies the outcome of one submitted answer.
    ///
    /// Callers must not feed answers to a completed session; the state is
    /// terminal and this would keep adding points.
    pub fn apply_answer(&mut self, is_correct: bool) -> AnswerEffect {
        let stage_before = self.stage;
        let mut score_delta = 0;
        let mut completed = false;

        if is_correct {
            self.streak = self.streak.saturating_add(1);
            score_delta = scoring::points_for_correct(self.streak);
            self.score = self.score.saturating_add(score_delta);
            if self.stage < STAGE_MAX {
                self.stage += 1;
            } else {
                self.completed = true;
                completed = true;
            }
        } else {
            self.streak = 0;
        }

        AnswerEffect {
            is_correct,
            score_delta,
            stage_before,
            stage_after: self.stage,
            streak_after: self.streak,
            completed,
        }
    }

    /// Grants the catch-up after a wrong answer: points plus a one-answer streak.
    pub fn apply_catch_up(&mut self) {
        self.score = self.score.saturating_add(CATCH_UP_POINTS);
        self.streak = CATCH_UP_STREAK;
    }

    /// Spends `perk`. Returns false if it was already used in this session.
    pub fn mark_perk_used(&mut self, perk: Perk) -> bool {
        self.perks.mark_used(perk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn session() -> GameSession {
        GameSession::start(SessionId::new(1), PlayerId::new(1), fixed_now())
    }

    #[test]
    fn fresh_session_starts_at_stage_one() {
        let s = session();
        assert_eq!(s.stage(), 1);
        assert_eq!(s.score(), 0);
        assert_eq!(s.streak(), 0);
        assert!(!s.is_completed());
        assert!(!s.perks().any());
    }

    #[test]
    fn four_correct_answers_complete_the_game() {
        let mut s = session();
        let deltas: Vec<u32> = (0..4).map(|_| s.apply_answer(true).score_delta).collect();
        assert_eq!(deltas, vec![10, 10, 15, 15]);
        assert_eq!(s.score(), 50);
        assert_eq!(s.stage(), STAGE_MAX);
        assert!(s.is_completed());
    }

    #[test]
    fn every_answer_sequence_keeps_the_invariants() {
        for len in 0..=8u32 {
            for mask in 0..(1u32 << len) {
                let mut s = session();
                let mut run = 0;
                for step in 0..len {
                    if s.is_completed() {
                        break;
                    }
                    let is_correct = mask & (1 << step) != 0;
                    let score_before = s.score();
                    let effect = s.apply_answer(is_correct);

                    run = if is_correct { run + 1 } else { 0 };
                    assert_eq!(s.streak(), run, "mask {mask:#b} step {step}");
                    let expected_delta = match (is_correct, run) {
                        (false, _) => 0,
                        (true, r) if r < 3 => 10,
                        (true, _) => 15,
                    };
                    assert_eq!(effect.score_delta, expected_delta);
                    assert_eq!(s.score(), score_before + expected_delta);
                    assert!((FIRST_STAGE..=STAGE_MAX).contains(&s.stage()));
                    if s.is_completed() {
                        assert_eq!(s.stage(), STAGE_MAX);
                    }
                }
            }
        }
    }

    #[test]
    fn wrong_answer_resets_streak_only() {
        let mut s = session();
        s.apply_answer(true);
        s.apply_answer(true);
        let effect = s.apply_answer(false);
        assert!(!effect.is_correct);
        assert_eq!(effect.score_delta, 0);
        assert_eq!(effect.stage_before, effect.stage_after);
        assert_eq!(s.streak(), 0);
        assert_eq!(s.score(), 20);
        assert_eq!(s.stage(), 3);
    }

    #[test]
    fn completion_is_flagged_once() {
        let mut s = session();
        for _ in 0..3 {
            assert!(!s.apply_answer(true).completed);
        }
        assert!(s.apply_answer(true).completed);
    }

    #[test]
    fn perks_flip_once() {
        let mut s = session();
        assert!(s.mark_perk_used(Perk::Hint));
        assert!(!s.mark_perk_used(Perk::Hint));
        assert!(s.perks().mobile);
        assert!(!s.perks().front);
    }

    #[test]
    fn catch_up_restores_a_streak_of_one() {
        let mut s = session();
        s.apply_answer(false);
        s.apply_catch_up();
        assert_eq!(s.score(), 5);
        assert_eq!(s.streak(), 1);
    }

    #[test]
    fn persisted_rows_are_checked() {
        let now = fixed_now();
        let ok = GameSession::from_persisted(
            SessionId::new(2),
            PlayerId::new(1),
            now,
            4,
            55,
            4,
            true,
            PerkFlags::default(),
        );
        assert!(ok.is_ok());

        let err = GameSession::from_persisted(
            SessionId::new(2),
            PlayerId::new(1),
            now,
            2,
            0,
            0,
            true,
            PerkFlags::default(),
        )
        .unwrap_err();
        assert_eq!(err, GameSessionError::CompletedBeforeFinalStage { stage: 2 });

        let err = GameSession::from_persisted(
            SessionId::new(2),
            PlayerId::new(1),
            now,
            0,
            0,
            0,
            false,
            PerkFlags::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GameSessionError::InvalidStage { stage: 0, .. }));
    }
}
