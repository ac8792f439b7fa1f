// File: ./src/migration/mod.rs
//! Carry-forward of unfinished tasks from the most recent past log into today.
pub mod review;
pub mod scanner;

pub use review::{MigrationReview, ReviewState};
pub use scanner::MigrationScanner;
