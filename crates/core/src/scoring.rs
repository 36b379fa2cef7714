//! Stage progression and scoring rules.
//!
//! A correct answer is worth [`CORRECT_POINTS`], plus [`STREAK_BONUS`] once the
//! streak (counting the answer itself) reaches [`STREAK_BONUS_THRESHOLD`].
//! Every correct answer advances one stage until [`STAGE_MAX`]; a correct
//! answer at the final stage completes the game.

/// Number of stages in a game.
pub const STAGE_MAX: u8 = 4;

/// Stage every new session starts at.
pub const FIRST_STAGE: u8 = 1;

/// Base points for a correct answer.
pub const CORRECT_POINTS: u32 = 10;

/// Extra points for a correct answer while on a streak.
pub const STREAK_BONUS: u32 = 5;

/// Streak length (post-increment) from which the bonus applies.
pub const STREAK_BONUS_THRESHOLD: u32 = 3;

/// Points granted by the catch-up perk.
pub const CATCH_UP_POINTS: u32 = 5;

/// Streak restored by the catch-up perk.
pub const CATCH_UP_STREAK: u32 = 1;

/// Points earned by a correct answer that brings the streak to `streak`.
#[must_use]
pub fn points_for_correct(streak: u32) -> u32 {
    if streak >= STREAK_BONUS_THRESHOLD {
        CORRECT_POINTS + STREAK_BONUS
    } else {
        CORRECT_POINTS
    }
}

/// Display name of a stage.
#[must_use]
pub fn stage_label(stage: u8) -> &'static str {
    match stage {
        1 => "Qualification",
        2 => "Demi-finale",
        3 => "Boss",
        4 => "Clavier d'or",
        _ => "Inconnu",
    }
}

/// What a single submitted answer did to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerEffect {
    pub is_correct: bool,
    pub score_delta: u32,
    pub stage_before: u8,
    pub stage_after: u8,
    pub streak_after: u32,
    /// True only for the answer that finished the game.
    pub completed: bool,
}
