//! Common utilities and shared types for prepvault.
//!
//! This crate provides foundational components used across all prepvault
//! crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Rich text sanitization**: Write-path HTML cleaning via [`sanitize`]
//! - **Image hosting**: Blob-to-URL upload seam via [`image_host`]
//!
//! # Example
//!
//! ```no_run
//! use prepvault_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {}", id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod image_host;
pub mod sanitize;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use image_host::{HttpImageHost, ImageHost};
pub use sanitize::sanitize_rich_text;
