//! Core library for the Tasky task board
//!
//! This crate contains the core business logic, including:
//! - The task entity and its validation rules
//! - The file-backed task repository with atomic saves

pub mod error;
pub mod task;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
