//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use clavier_core::model::{Perk, PlayerError, PlayerId, QuestionId, Role, SessionId};
use storage::repository::StorageError;
use storage::seed::SeedError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `GameService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GameError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error("question {0} not found")]
    QuestionNotFound(QuestionId),
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),
    #[error(transparent)]
    Validation(#[from] PlayerError),
    #[error("session {0} is already completed")]
    Completed(SessionId),
    #[error("{} cannot use the {} perk", .role.label(), .perk.label())]
    PerkNotAllowed { role: Role, perk: Perk },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while writing the leaderboard report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Seed(#[from] SeedError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
