// File: ./src/model/mod.rs
pub mod item;
pub mod mutator;
pub mod parser;
pub mod template;

pub use item::{
    DEFAULT_BLOCK_DURATION_MINS, Decision, MigrationHistoryEntry, MigrationTask, ParsedDocument,
    Task, TimeBlock,
};
pub use parser::{extract_incomplete_tasks, parse};
