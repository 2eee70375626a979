//! Book (catalog inventory) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Largest page size the catalog will serve
pub const MAX_PER_PAGE: i64 = 200;
pub const DEFAULT_PER_PAGE: i64 = 20;

/// Book row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub description: Option<String>,
    pub published_at: Option<NaiveDate>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Lifecycle of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Active,
    Deleted,
}

/// Whether a read path may see soft-deleted books
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    ActiveOnly,
    IncludeDeleted,
}

impl Visibility {
    pub fn includes_deleted(self) -> bool {
        matches!(self, Visibility::IncludeDeleted)
    }
}

impl Book {
    pub fn status(&self) -> BookStatus {
        if self.deleted_at.is_some() {
            BookStatus::Deleted
        } else {
            BookStatus::Active
        }
    }
}

/// Clamp a pair of copy counts so that `1 <= total` and `0 <= available <= total`.
/// A missing `available` means every copy is on the shelf.
pub fn clamp_copies(total: Option<i32>, available: Option<i32>) -> (i32, i32) {
    let total = total.unwrap_or(1).max(1);
    let available = available.map_or(total, |a| a.clamp(0, total));
    (total, available)
}

fn trimmed(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

/// Create book request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(max = 255, message = "Title is too long"))]
    pub title: String,
    #[validate(length(max = 255, message = "Author is too long"))]
    pub author: String,
    #[validate(length(max = 32, message = "ISBN is too long"))]
    pub isbn: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub published_at: Option<NaiveDate>,
    pub total_copies: Option<i32>,
    pub available_copies: Option<i32>,
}

/// Validated and clamped book ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub price: Decimal,
    pub description: Option<String>,
    pub published_at: Option<NaiveDate>,
    pub total_copies: i32,
    pub available_copies: i32,
}

impl TryFrom<CreateBook> for NewBook {
    type Error = AppError;

    fn try_from(book: CreateBook) -> AppResult<Self> {
        book.validate()?;

        let (total_copies, available_copies) =
            clamp_copies(book.total_copies, book.available_copies);

        Ok(NewBook {
            title: trimmed(&book.title, "Title")?,
            author: trimmed(&book.author, "Author")?,
            isbn: book.isbn,
            price: book.price.unwrap_or(Decimal::ZERO),
            description: book.description,
            published_at: book.published_at,
            total_copies,
            available_copies,
        })
    }
}

/// Partial book update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(max = 255, message = "Title is too long"))]
    pub title: Option<String>,
    #[validate(length(max = 255, message = "Author is too long"))]
    pub author: Option<String>,
    #[validate(length(max = 32, message = "ISBN is too long"))]
    pub isbn: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub published_at: Option<NaiveDate>,
    pub total_copies: Option<i32>,
    pub available_copies: Option<i32>,
}

impl UpdateBook {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.isbn.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.published_at.is_none()
            && self.total_copies.is_none()
            && self.available_copies.is_none()
    }

    /// Validate text fields and bring copy counts back into range.
    pub fn normalize(mut self) -> AppResult<Self> {
        self.validate()?;

        if let Some(ref title) = self.title {
            self.title = Some(trimmed(title, "Title")?);
        }
        if let Some(ref author) = self.author {
            self.author = Some(trimmed(author, "Author")?);
        }

        self.total_copies = self.total_copies.map(|t| t.max(1));
        self.available_copies = match (self.total_copies, self.available_copies) {
            (Some(total), Some(available)) => Some(available.clamp(0, total)),
            (None, Some(available)) => Some(available.max(0)),
            (_, None) => None,
        };

        Ok(self)
    }
}

/// Catalog listing filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Matches title, author or ISBN
    pub q: Option<String>,
    pub author: Option<String>,
    pub with_deleted: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl BookQuery {
    pub fn search_term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn author_term(&self) -> Option<&str> {
        self.author.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn visibility(&self) -> Visibility {
        if self.with_deleted.unwrap_or(false) {
            Visibility::IncludeDeleted
        } else {
            Visibility::ActiveOnly
        }
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }
}

/// Clamped page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        (total + self.per_page - 1) / self.per_page
    }
}

/// One page of catalog results
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    pub items: Vec<Book>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// Escape LIKE metacharacters and wrap the term for a substring match
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
