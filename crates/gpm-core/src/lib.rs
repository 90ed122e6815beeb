//! GPM Core: domain models, error types and repository traits shared by
//! every crate in the practice manager.

pub mod error;
pub mod models;
pub mod repository;
