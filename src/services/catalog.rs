//! Catalog service: listing and administration of books

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookPage, BookStatus, BookQuery, CreateBook, NewBook, UpdateBook, Visibility},
    repository::{books, Repository},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books with filters
    pub async fn list(&self, query: &BookQuery) -> AppResult<BookPage> {
        let pagination = query.pagination();
        let (items, total) = self.repository.books.search(query).await?;

        Ok(BookPage {
            items,
            page: pagination.page,
            per_page: pagination.per_page,
            total,
            total_pages: pagination.total_pages(total),
        })
    }

    /// Get an active book
    pub async fn get(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id, Visibility::ActiveOnly).await
    }

    /// Create a new book
    pub async fn create(&self, book: CreateBook) -> AppResult<i32> {
        let book = NewBook::try_from(book)?;
        let id = self.repository.books.create(&book).await?;
        tracing::info!("Catalog create: book id={} \"{}\"", id, book.title);
        Ok(id)
    }

    /// Update an existing book
    pub async fn update(&self, id: i32, update: UpdateBook) -> AppResult<Book> {
        let update = update.normalize()?;
        if !self.repository.books.update(id, &update).await? {
            return Err(not_found(id));
        }
        tracing::info!("Catalog update: book id={}", id);
        self.get(id).await
    }

    /// Soft-delete a book
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        if !self.repository.books.soft_delete(id).await? {
            return Err(not_found(id));
        }
        tracing::info!("Catalog delete: book id={}", id);
        Ok(())
    }

    /// Bring back a soft-deleted book
    pub async fn restore(&self, id: i32) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;

        let book = books::lock_in(&mut *tx, id, Visibility::IncludeDeleted)
            .await?
            .ok_or_else(|| not_found(id))?;
        if book.status() == BookStatus::Active {
            return Err(AppError::Validation(format!("Book with id {} is not deleted", id)));
        }

        books::restore_in(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!("Catalog restore: book id={}", id);
        Ok(())
    }

    /// Permanently remove a book and its loan history
    pub async fn purge(&self, id: i32) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;

        books::lock_in(&mut *tx, id, Visibility::IncludeDeleted)
            .await?
            .ok_or_else(|| not_found(id))?;
        books::purge_in(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::warn!("Catalog purge: book id={} removed permanently", id);
        Ok(())
    }
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Book with id {} not found", id))
}
