//! Loans repository: the loan ledger.
//!
//! Loans are append-only history. A row is created on borrow, its due date
//! may move while it is active, and `returned_at` is written once.

use chrono::NaiveDate;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult, BusinessRule},
    models::loan::{ActiveLoan, Loan},
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Active loans of a user with their book, most recent first
    pub async fn get_active_for_user(&self, user_id: i32) -> AppResult<Vec<ActiveLoan>> {
        let loans = sqlx::query_as::<_, ActiveLoan>(
            r#"
            SELECT l.id, l.book_id, b.title, b.author, b.isbn,
                   l.borrowed_at, l.due_date,
                   l.due_date < CURRENT_DATE AS is_overdue
            FROM loans l
            JOIN books b ON b.id = l.book_id
            WHERE l.user_id = $1 AND l.returned_at IS NULL
            ORDER BY l.borrowed_at DESC, l.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }
}

// Postgres unique_violation, raised by the one-active-loan index
const UNIQUE_VIOLATION: &str = "23505";
const ACTIVE_LOAN_INDEX: &str = "loans_one_active_per_user_book";

/// Lock the most recent active loan of a user for a book
pub async fn lock_active_in(
    conn: &mut PgConnection,
    user_id: i32,
    book_id: i32,
) -> AppResult<Option<Loan>> {
    let loan = sqlx::query_as::<_, Loan>(
        r#"
        SELECT * FROM loans
        WHERE user_id = $1 AND book_id = $2 AND returned_at IS NULL
        ORDER BY id DESC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .bind(book_id)
    .fetch_optional(conn)
    .await?;

    Ok(loan)
}

/// Record a new active loan
pub async fn create_in(
    conn: &mut PgConnection,
    user_id: i32,
    book_id: i32,
    due_date: NaiveDate,
) -> AppResult<Loan> {
    sqlx::query_as::<_, Loan>(
        r#"
        INSERT INTO loans (user_id, book_id, borrowed_at, due_date)
        VALUES ($1, $2, NOW(), $3)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(book_id)
    .bind(due_date)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        if is_active_loan_conflict(&e) {
            BusinessRule::DuplicateLoan.into()
        } else {
            AppError::from(e)
        }
    })
}

fn is_active_loan_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some(UNIQUE_VIOLATION)
                && db.constraint() == Some(ACTIVE_LOAN_INDEX)
        }
        _ => false,
    }
}

/// Close an active loan
pub async fn mark_returned_in(conn: &mut PgConnection, loan_id: i32) -> AppResult<Loan> {
    sqlx::query_as::<_, Loan>(
        r#"
        UPDATE loans SET returned_at = NOW()
        WHERE id = $1 AND returned_at IS NULL
        RETURNING *
        "#,
    )
    .bind(loan_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| BusinessRule::NoActiveLoan.into())
}

/// Move the due date of an active loan
pub async fn set_due_date_in(
    conn: &mut PgConnection,
    loan_id: i32,
    due_date: NaiveDate,
) -> AppResult<Loan> {
    sqlx::query_as::<_, Loan>(
        r#"
        UPDATE loans SET due_date = $1
        WHERE id = $2 AND returned_at IS NULL
        RETURNING *
        "#,
    )
    .bind(due_date)
    .bind(loan_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| BusinessRule::NoActiveLoan.into())
}
