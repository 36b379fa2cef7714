use std::sync::Arc;

use storage::repository::Storage;
use storage::seed::ensure_seeded;

use crate::Clock;
use crate::error::AppServicesError;
use crate::game::GameService;
use crate::question_pool::QuestionPool;

/// Assembles app-facing services over a seeded store.
#[derive(Clone)]
pub struct AppServices {
    game: Arc<GameService>,
    seeded: usize,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, seeding the catalog on first run.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or seeding fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        pool: QuestionPool,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(storage, clock, pool).await
    }

    /// Same wiring over any [`Storage`], e.g. [`Storage::in_memory`].
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if seeding fails.
    pub async fn from_storage(
        storage: Storage,
        clock: Clock,
        pool: QuestionPool,
    ) -> Result<Self, AppServicesError> {
        let seeded = ensure_seeded(storage.questions.as_ref()).await?;
        let game = Arc::new(GameService::from_storage(clock, &storage, pool));
        Ok(Self { game, seeded })
    }

    #[must_use]
    pub fn game(&self) -> Arc<GameService> {
        Arc::clone(&self.game)
    }

    /// Questions inserted by this bootstrap; 0 when the catalog was already present.
    #[must_use]
    pub fn seeded(&self) -> usize {
        self.seeded
    }
}
