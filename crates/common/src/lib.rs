//! Common utilities and shared types for askanai.
//!
//! This crate provides foundational components used across all askanai crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Hashing**: Salted one-way hashes for client IPs, user agents and secrets
//! - **ID Generation**: ULID ids, poll slugs and creator keys via [`IdGenerator`]
//!
//! # Example
//!
//! ```no_run
//! use askanai_common::{AppResult, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     println!("{} listening on {}", id_gen.generate_slug(), config.server.port);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod hash;
pub mod id;

pub use config::Config;
pub use error::{AppError, AppResult, RateLimitWindow};
pub use hash::{ClientHasher, normalize_text, sha256_hex};
pub use id::IdGenerator;
