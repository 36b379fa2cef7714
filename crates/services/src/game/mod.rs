mod service;
mod state;

pub use service::GameService;
pub use state::{HintOutcome, QuestionView, ScoreEntry, SessionState};
