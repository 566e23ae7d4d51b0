//! Core business logic for polls-rs.

pub mod services;

pub use services::*;
