//! Loan (borrow) model and due date rules

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Loan period applied when the borrower does not pick a due date
pub const DEFAULT_LOAN_DAYS: u64 = 14;

/// Extension applied by a renewal when none is requested
pub const DEFAULT_RENEWAL_DAYS: i64 = 7;

/// Loan row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub returned_at: Option<DateTime<Utc>>,
}

/// Loan lifecycle. `Returned` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanState {
    Active,
    Returned,
}

impl Loan {
    pub fn state(&self) -> LoanState {
        if self.returned_at.is_some() {
            LoanState::Returned
        } else {
            LoanState::Active
        }
    }
}

/// Active loan joined with its book, for the borrower's own listing
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ActiveLoan {
    pub id: i32,
    pub book_id: i32,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub is_overdue: bool,
}

/// Due date for a new loan: the requested date, or the default loan period.
pub fn resolve_due_date(requested: Option<NaiveDate>, today: NaiveDate) -> AppResult<NaiveDate> {
    match requested {
        Some(date) if date < today => Err(AppError::Validation(format!(
            "due_date {} is in the past",
            date
        ))),
        Some(date) => Ok(date),
        None => today
            .checked_add_days(Days::new(DEFAULT_LOAN_DAYS))
            .ok_or_else(|| AppError::Internal("Due date out of range".to_string())),
    }
}

/// Due date after a renewal. The extension is at least one day.
pub fn renewed_due_date(current: NaiveDate, extension_days: Option<i64>) -> AppResult<NaiveDate> {
    let days = extension_days.unwrap_or(DEFAULT_RENEWAL_DAYS).max(1);
    current
        .checked_add_days(Days::new(days as u64))
        .ok_or_else(|| AppError::Validation(format!("Cannot extend due date by {} days", days)))
}

/// Parse an optional `YYYY-MM-DD` string. Empty strings count as absent.
pub fn parse_due_date(raw: Option<&str>) -> AppResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Invalid due_date '{}', expected YYYY-MM-DD", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_due_date() {
        assert_eq!(resolve_due_date(None, date(2024, 2, 20)).unwrap(), date(2024, 3, 5));
    }

    #[test]
    fn test_requested_due_date() {
        let today = date(2024, 1, 1);
        assert_eq!(resolve_due_date(Some(date(2024, 1, 30)), today).unwrap(), date(2024, 1, 30));
        assert_eq!(resolve_due_date(Some(today), today).unwrap(), today);
    }

    #[test]
    fn test_past_due_date_rejected() {
        let result = resolve_due_date(Some(date(2023, 12, 31)), date(2024, 1, 1));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_renewal_extension() {
        let due = date(2024, 5, 28);
        assert_eq!(renewed_due_date(due, None).unwrap(), date(2024, 6, 4));
        assert_eq!(renewed_due_date(due, Some(3)).unwrap(), date(2024, 5, 31));
        assert_eq!(renewed_due_date(due, Some(0)).unwrap(), date(2024, 5, 29));
        assert_eq!(renewed_due_date(due, Some(-10)).unwrap(), date(2024, 5, 29));
    }

    #[test]
    fn test_parse_due_date() {
        assert_eq!(parse_due_date(None).unwrap(), None);
        assert_eq!(parse_due_date(Some("")).unwrap(), None);
        assert_eq!(parse_due_date(Some(" 2024-07-01 ")).unwrap(), Some(date(2024, 7, 1)));
        assert!(matches!(parse_due_date(Some("01/07/2024")), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_loan_state() {
        let mut loan = Loan {
            id: 1,
            user_id: 1,
            book_id: 7,
            borrowed_at: Utc::now(),
            due_date: date(2024, 1, 15),
            returned_at: None,
        };
        assert_eq!(loan.state(), LoanState::Active);
        loan.returned_at = Some(Utc::now());
        assert_eq!(loan.state(), LoanState::Returned);
    }
}
