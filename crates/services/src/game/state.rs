use chrono::{DateTime, Utc};
use std::fmt;

use clavier_core::model::{
    AnswerCounts, Choice, GameSession, PerkFlags, Player, Question, QuestionId, Role, SessionId,
};
use clavier_core::scoring::stage_label;
use storage::repository::ScoreRow;

/// Question as shown to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub id: QuestionId,
    pub stage: u8,
    pub prompt: String,
    pub choices: [(Choice, String); 4],
    pub correct_choice: Choice,
    pub hint: Option<String>,
}

impl QuestionView {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            id: question.id(),
            stage: question.stage(),
            prompt: question.prompt().to_owned(),
            choices: Choice::ALL.map(|c| (c, question.choice(c).to_owned())),
            correct_choice: question.correct_choice(),
            hint: question.hint().map(str::to_owned),
        }
    }
}

/// Snapshot of a game session after an operation.
///
/// Carries raw values only; formatting is left to the front-end.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub session_id: SessionId,
    pub player_name: String,
    pub role: Role,
    pub stage: u8,
    pub score: u32,
    pub streak: u32,
    pub correct_answers: u32,
    pub total_answers: u32,
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    pub perks: PerkFlags,
    /// `None` once the session is completed or when no question exists for the stage.
    pub current_question: Option<QuestionView>,
}

impl SessionState {
    pub(crate) fn assemble(
        session: &GameSession,
        player: &Player,
        counts: AnswerCounts,
        current: Option<&Question>,
    ) -> Self {
        Self {
            session_id: session.id(),
            player_name: player.name().to_owned(),
            role: player.role(),
            stage: session.stage(),
            score: session.score(),
            streak: session.streak(),
            correct_answers: counts.correct,
            total_answers: counts.total,
            completed: session.is_completed(),
            started_at: session.started_at(),
            perks: session.perks(),
            current_question: current.map(QuestionView::from_question),
        }
    }

    #[must_use]
    pub fn stage_label(&self) -> &'static str {
        stage_label(self.stage)
    }

    /// Whether the perk of the player's role has been spent.
    #[must_use]
    pub fn perk_used(&self) -> bool {
        self.perks.is_used(self.role.perk())
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        AnswerCounts {
            total: self.total_answers,
            correct: self.correct_answers,
        }
        .accuracy()
    }
}

/// Result of the hint perk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintOutcome {
    Hint(String),
    NoHint,
    AlreadyUsed,
}

impl fmt::Display for HintOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hint(text) => f.write_str(text),
            Self::NoHint => f.write_str("Aucun indice disponible pour cette question."),
            Self::AlreadyUsed => f.write_str("Indice déjà utilisé."),
        }
    }
}

/// One leaderboard line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEntry {
    pub session_id: SessionId,
    pub player_name: String,
    pub score: u32,
    pub started_at: DateTime<Utc>,
}

impl From<ScoreRow> for ScoreEntry {
    fn from(row: ScoreRow) -> Self {
        Self {
            session_id: row.session_id,
            player_name: row.player_name,
            score: row.score,
            started_at: row.started_at,
        }
    }
}
