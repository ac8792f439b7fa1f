// Crate root library declaration and module exports.
pub mod calendar;
pub mod cli;
pub mod config;
pub mod context;
pub mod daily;
pub mod dates;
pub mod error;
pub mod ledger;
pub mod migration;
pub mod model;
pub mod settings;
pub mod storage;
