//! Repository layer for database operations

pub mod books;
pub mod loans;
pub mod users;

use std::time::Duration;

use sqlx::{Pool, Postgres, Transaction};

use crate::error::AppResult;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub loans: loans::LoansRepository,
    lock_timeout: Duration,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            pool,
        }
    }

    /// Bound how long a unit of work waits for a row lock
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Open a unit of work. The lock timeout only applies to this
    /// transaction; dropping it without commit rolls everything back.
    pub async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;

        Ok(tx)
    }

    /// Round-trip to the database
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
