mod answer;
mod ids;
mod player;
mod question;
mod session;

pub use ids::{AnswerLogId, ParseIdError, PlayerId, QuestionId, SessionId};

pub use answer::{AnswerCounts, AnswerLog};
pub use player::{MAX_NAME_LEN, Perk, Player, PlayerError, Role, RoleError, normalize_name};
pub use question::{Choice, Question, QuestionDraft, QuestionError, ValidatedQuestion};
pub use session::{GameSession, GameSessionError, PerkFlags};
