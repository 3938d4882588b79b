//! Common utilities and shared types for CommunityWatch.
//!
//! This crate provides foundational components used across all CommunityWatch crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Geography**: Coordinates and bounding boxes via [`GeoPoint`] and [`BoundingBox`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Sanitization**: Allow-list HTML cleaning for user-submitted text
//!
//! # Example
//!
//! ```no_run
//! use communitywatch_common::{Config, IdGenerator, AppResult};
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
pub mod geo;
pub mod id;
pub mod sanitize;

pub use config::Config;
pub use error::{AppError, AppResult, FieldErrors};
pub use geo::{BoundingBox, GeoPoint};
pub use id::IdGenerator;
pub use sanitize::sanitize_html;
