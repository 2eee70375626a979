//! Loan lifecycle service
//!
//! Borrow, return and renew each run as one transaction. Rows are always
//! locked book first, then loan, so concurrent calls on the same book queue
//! behind each other instead of deadlocking. Returning early with `?` drops
//! the transaction, which rolls it back.

use chrono::{NaiveDate, Utc};

use crate::{
    error::{AppError, AppResult, BusinessRule},
    models::{
        book::Visibility,
        loan::{renewed_due_date, resolve_due_date, ActiveLoan, Loan},
    },
    repository::{books, loans, users, Repository},
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

fn require_id(value: i32, field: &str) -> AppResult<()> {
    if value <= 0 {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Borrow one copy of a book. Returns the new loan.
    #[tracing::instrument(skip(self))]
    pub async fn borrow(
        &self,
        user_id: i32,
        book_id: i32,
        due_date: Option<NaiveDate>,
    ) -> AppResult<Loan> {
        require_id(user_id, "user_id")?;
        require_id(book_id, "book_id")?;
        let due_date = resolve_due_date(due_date, Utc::now().date_naive())?;

        let mut tx = self.repository.begin().await?;

        // Serializes every borrow of this book until commit
        let book = books::lock_in(&mut *tx, book_id, Visibility::ActiveOnly)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        if !users::exists_in(&mut *tx, user_id).await? {
            return Err(AppError::NotFound(format!("User with id {} not found", user_id)));
        }

        if book.available_copies <= 0 {
            return Err(BusinessRule::OutOfStock.into());
        }

        if loans::lock_active_in(&mut *tx, user_id, book_id).await?.is_some() {
            return Err(BusinessRule::DuplicateLoan.into());
        }

        let loan = loans::create_in(&mut *tx, user_id, book_id, due_date).await?;
        books::decrement_available_in(&mut *tx, book_id).await?;

        tx.commit().await?;

        tracing::info!(loan_id = loan.id, %loan.due_date, "Book borrowed");
        Ok(loan)
    }

    /// Return the most recent active loan of a book.
    #[tracing::instrument(skip(self))]
    pub async fn return_book(&self, user_id: i32, book_id: i32) -> AppResult<Loan> {
        require_id(user_id, "user_id")?;
        require_id(book_id, "book_id")?;

        let mut tx = self.repository.begin().await?;

        // A soft-deleted book can still come back from a borrower
        books::lock_in(&mut *tx, book_id, Visibility::IncludeDeleted).await?;

        let active = loans::lock_active_in(&mut *tx, user_id, book_id)
            .await?
            .ok_or(BusinessRule::NoActiveLoan)?;

        let loan = loans::mark_returned_in(&mut *tx, active.id).await?;
        books::increment_available_in(&mut *tx, book_id).await?;

        tx.commit().await?;

        tracing::info!(loan_id = loan.id, "Book returned");
        Ok(loan)
    }

    /// Push the due date of an active loan back by `extension_days`
    /// (default 7, at least 1).
    #[tracing::instrument(skip(self))]
    pub async fn renew(
        &self,
        user_id: i32,
        book_id: i32,
        extension_days: Option<i64>,
    ) -> AppResult<Loan> {
        require_id(user_id, "user_id")?;
        require_id(book_id, "book_id")?;

        let mut tx = self.repository.begin().await?;

        let active = loans::lock_active_in(&mut *tx, user_id, book_id)
            .await?
            .ok_or(BusinessRule::NoActiveLoan)?;

        let due_date = renewed_due_date(active.due_date, extension_days)?;
        let loan = loans::set_due_date_in(&mut *tx, active.id, due_date).await?;

        tx.commit().await?;

        tracing::info!(loan_id = loan.id, %loan.due_date, "Loan renewed");
        Ok(loan)
    }

    /// Loans a user currently holds
    pub async fn active_loans(&self, user_id: i32) -> AppResult<Vec<ActiveLoan>> {
        self.repository.loans.get_active_for_user(user_id).await
    }
}
