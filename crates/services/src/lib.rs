#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod export;
pub mod game;
pub mod question_pool;

pub use clavier_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, ExportError, GameError};
pub use export::export_scores;
pub use game::{GameService, HintOutcome, QuestionView, ScoreEntry, SessionState};
pub use question_pool::QuestionPool;
