//! Users repository
//!
//! Accounts are owned by the authentication layer; loans only need to know
//! that the borrower exists.

use sqlx::PgConnection;

use crate::error::AppResult;

/// Check that a user row exists
pub async fn exists_in(conn: &mut PgConnection, user_id: i32) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(conn)
        .await?;
    Ok(exists)
}
