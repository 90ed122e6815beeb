//! Domain models for the practice manager.
//!
//! Only the records the authentication core reads or writes live here;
//! clinical records are owned by the CRUD services.

pub mod credential;
pub mod password_reset;
pub mod practice;
pub mod user;
