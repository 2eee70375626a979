//! Catalog endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookPage, BookQuery, CreateBook, UpdateBook},
};

use super::{ApiJson, ApiPath, ApiQuery, AuthenticatedUser};

/// Created book reference
#[derive(Serialize, ToSchema)]
pub struct CreatedResponse {
    /// New book ID
    pub id: i32,
    /// ID of the administrator who created it
    pub created_by: i32,
}

/// List books with search and pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Page of books, newest first", body = BookPage),
        (status = 403, description = "withDeleted requires administrator rights")
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    user: Option<AuthenticatedUser>,
    ApiQuery(query): ApiQuery<BookQuery>,
) -> AppResult<Json<BookPage>> {
    if query.visibility().includes_deleted() {
        match user {
            Some(AuthenticatedUser(claims)) => claims.require_admin()?,
            None => {
                return Err(AppError::Authentication(
                    "Login required to list deleted books".to_string(),
                ))
            }
        }
    }

    let page = state.services.catalog.list(&query).await?;
    Ok(Json(page))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get(id).await?;
    Ok(Json(book))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = CreatedResponse),
        (status = 403, description = "Administrator rights required"),
        (status = 422, description = "Missing title or author")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiJson(book): ApiJson<CreateBook>,
) -> AppResult<(StatusCode, Json<CreatedResponse>)> {
    claims.require_admin()?;

    let id = state.services.catalog.create(book).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id,
            created_by: claims.user_id,
        }),
    ))
}

/// Update an existing book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(update): ApiJson<UpdateBook>,
) -> AppResult<Json<Book>> {
    claims.require_admin()?;

    let book = state.services.catalog.update(id, update).await?;
    Ok(Json(book))
}

/// Soft-delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found or already deleted")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Restore a soft-deleted book
#[utoipa::path(
    post,
    path = "/books/{id}/restore",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book restored"),
        (status = 404, description = "No deleted book with this ID")
    )
)]
pub async fn restore_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.catalog.restore(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Permanently remove a book
#[utoipa::path(
    delete,
    path = "/books/{id}/purge",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book purged"),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Book still has active loans")
    )
)]
pub async fn purge_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.catalog.purge(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
