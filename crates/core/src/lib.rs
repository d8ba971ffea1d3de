//! Core business logic for askanai.

pub mod services;

pub use services::*;
