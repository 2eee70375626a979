//! Borrow, return and renew endpoints
//!
//! The borrower is always the authenticated caller.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult, BusinessRule},
    models::loan::{parse_due_date, ActiveLoan},
};

use super::{ApiJson, ApiPath, ApiQuery, AuthenticatedUser};

/// Borrow request
#[derive(Deserialize, ToSchema)]
pub struct BorrowRequest {
    /// Book to borrow
    #[serde(default, deserialize_with = "positive_id")]
    #[schema(value_type = i32)]
    pub book_id: Option<i32>,
    /// Due date (YYYY-MM-DD); defaults to 14 days from today
    pub due_date: Option<String>,
}

/// Any JSON value is accepted. Integers (or integer strings) in range and
/// above zero are kept, everything else reads as missing.
fn positive_id<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let id = value.and_then(|value| match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    });
    Ok(id.and_then(|id| i32::try_from(id).ok()).filter(|id| *id > 0))
}

/// Created loan
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    pub loan_id: i32,
    pub book_id: i32,
    pub due_date: NaiveDate,
}

/// Renewal options
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RenewQuery {
    /// Days to add to the current due date (default 7, minimum 1)
    pub days: Option<i64>,
}

/// Renewed loan
#[derive(Serialize, ToSchema)]
pub struct RenewResponse {
    pub loan_id: i32,
    pub book_id: i32,
    pub due_date: NaiveDate,
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/borrow",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Loan created", body = BorrowResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Invalid book_id, no copies available or already borrowed"),
        (status = 503, description = "Book is busy, retry later")
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiJson(request): ApiJson<BorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    let book_id = request
        .book_id
        .ok_or_else(|| AppError::Validation("book_id is required".to_string()))?;
    let due_date = parse_due_date(request.due_date.as_deref())?;

    let loan = state
        .services
        .loans
        .borrow(claims.user_id, book_id, due_date)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            loan_id: loan.id,
            book_id: loan.book_id,
            due_date: loan.due_date,
        }),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    put,
    path = "/return/{book_id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("book_id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book returned"),
        (status = 400, description = "No active loan for this book"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiPath(book_id): ApiPath<i32>,
) -> AppResult<StatusCode> {
    state
        .services
        .loans
        .return_book(claims.user_id, book_id)
        .await
        .map_err(|e| match e {
            AppError::BusinessRule(rule @ BusinessRule::NoActiveLoan) => {
                AppError::BadRequest(rule.to_string())
            }
            other => other,
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Extend the due date of a borrowed book
#[utoipa::path(
    put,
    path = "/renew/{book_id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("book_id" = i32, Path, description = "Book ID"),
        RenewQuery
    ),
    responses(
        (status = 200, description = "Loan renewed", body = RenewResponse),
        (status = 401, description = "Not authenticated"),
        (status = 422, description = "No active loan for this book")
    )
)]
pub async fn renew_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiPath(book_id): ApiPath<i32>,
    ApiQuery(query): ApiQuery<RenewQuery>,
) -> AppResult<Json<RenewResponse>> {
    let loan = state
        .services
        .loans
        .renew(claims.user_id, book_id, query.days)
        .await?;

    Ok(Json(RenewResponse {
        loan_id: loan.id,
        book_id: loan.book_id,
        due_date: loan.due_date,
    }))
}

/// Books currently borrowed by the caller
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active loans, most recent first", body = Vec<ActiveLoan>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ActiveLoan>>> {
    let loans = state.services.loans.active_loans(claims.user_id).await?;
    Ok(Json(loans))
}
