/*
 * This module provides the application logic layer on top of the comparison
 * engine: `CommandHandler` executes the user-level commands and `report`
 * turns a tree into text. Unit tests for `CommandHandler` are in
 * `handler_tests.rs`.
 */
pub mod handler;
pub mod report;


pub use handler::{AppError, AppResult, CommandHandler};
pub use report::{ReportOptions, StatusSummary};
