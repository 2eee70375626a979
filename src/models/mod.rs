//! Data models for Libris

pub mod book;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookPage, BookQuery, BookStatus, Visibility};
pub use loan::{ActiveLoan, Loan, LoanState};
pub use user::{Role, UserClaims};
