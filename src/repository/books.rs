//! Books repository: the inventory store.
//!
//! Plain reads and catalog edits run against the pool. The `*_in` functions
//! take a connection so the loan and catalog services can run them inside
//! their own transaction while they hold the book row lock.

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult, BusinessRule},
    models::book::{like_pattern, Book, BookQuery, NewBook, UpdateBook, Visibility},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32, visibility: Visibility) -> AppResult<Book> {
        let query = if visibility.includes_deleted() {
            "SELECT * FROM books WHERE id = $1"
        } else {
            "SELECT * FROM books WHERE id = $1 AND deleted_at IS NULL"
        };

        sqlx::query_as::<_, Book>(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Search books with pagination, newest first
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let pagination = query.pagination();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books WHERE 1=1");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM books WHERE 1=1");
        push_filters(&mut select, query);
        select
            .push(" ORDER BY id DESC LIMIT ")
            .push_bind(pagination.per_page)
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let books = select
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;

        Ok((books, total))
    }

    // =========================================================================
    // CREATE / UPDATE
    // =========================================================================

    /// Create a new book
    pub async fn create(&self, book: &NewBook) -> AppResult<i32> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO books (
                title, author, isbn, price, description, published_at,
                total_copies, available_copies
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.price)
        .bind(&book.description)
        .bind(book.published_at)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Apply a normalized partial update to an active book.
    /// Returns `false` when no active book has this id.
    pub async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<bool> {
        if update.is_empty() {
            return Ok(true);
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE books SET ");
        let mut set = builder.separated(", ");

        if let Some(ref title) = update.title {
            set.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(ref author) = update.author {
            set.push("author = ").push_bind_unseparated(author.clone());
        }
        if let Some(ref isbn) = update.isbn {
            set.push("isbn = ").push_bind_unseparated(isbn.clone());
        }
        if let Some(price) = update.price {
            set.push("price = ").push_bind_unseparated(price);
        }
        if let Some(ref description) = update.description {
            set.push("description = ").push_bind_unseparated(description.clone());
        }
        if let Some(published_at) = update.published_at {
            set.push("published_at = ").push_bind_unseparated(published_at);
        }

        // Right-hand sides see the pre-update row, so each branch keeps
        // 0 <= available_copies <= total_copies.
        match (update.total_copies, update.available_copies) {
            (Some(total), Some(available)) => {
                set.push("total_copies = ").push_bind_unseparated(total);
                set.push("available_copies = ").push_bind_unseparated(available);
            }
            (Some(total), None) => {
                set.push("total_copies = ").push_bind_unseparated(total);
                set.push("available_copies = LEAST(available_copies, ")
                    .push_bind_unseparated(total)
                    .push_unseparated(")");
            }
            (None, Some(available)) => {
                set.push("available_copies = LEAST(")
                    .push_bind_unseparated(available)
                    .push_unseparated(", total_copies)");
            }
            (None, None) => {}
        }

        set.push("updated_at = NOW()");

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND deleted_at IS NULL");

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Soft-delete a book. Returns `false` if it is missing or already deleted.
    pub async fn soft_delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE books SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &BookQuery) {
    if !query.visibility().includes_deleted() {
        builder.push(" AND deleted_at IS NULL");
    }

    if let Some(term) = query.search_term() {
        let pattern = like_pattern(term);
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR author ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR isbn ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(author) = query.author_term() {
        builder.push(" AND author ILIKE ").push_bind(like_pattern(author));
    }
}

// =========================================================================
// TRANSACTIONAL (caller holds the book row lock)
// =========================================================================

/// Lock a book row for the rest of the transaction
pub async fn lock_in(
    conn: &mut PgConnection,
    id: i32,
    visibility: Visibility,
) -> AppResult<Option<Book>> {
    let query = if visibility.includes_deleted() {
        "SELECT * FROM books WHERE id = $1 FOR UPDATE"
    } else {
        "SELECT * FROM books WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
    };

    let book = sqlx::query_as::<_, Book>(query)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(book)
}

/// Clear `deleted_at` on a locked book
pub async fn restore_in(conn: &mut PgConnection, id: i32) -> AppResult<()> {
    sqlx::query("UPDATE books SET deleted_at = NULL, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Physically remove a locked book and its returned loan history.
/// Refused while any loan of the book is still active.
pub async fn purge_in(conn: &mut PgConnection, id: i32) -> AppResult<()> {
    let active: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM loans WHERE book_id = $1 AND returned_at IS NULL)",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    if active {
        return Err(BusinessRule::BookHasActiveLoans.into());
    }

    sqlx::query("DELETE FROM books WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Take one copy off the shelf
pub async fn decrement_available_in(conn: &mut PgConnection, id: i32) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE books
        SET available_copies = available_copies - 1, updated_at = NOW()
        WHERE id = $1 AND available_copies > 0
        "#,
    )
    .bind(id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(BusinessRule::OutOfStock.into());
    }
    Ok(())
}

/// Put one copy back on the shelf, never above the total
pub async fn increment_available_in(conn: &mut PgConnection, id: i32) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE books
        SET available_copies = LEAST(available_copies + 1, total_copies), updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(conn)
    .await?;

    Ok(())
}
