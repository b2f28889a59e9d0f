//! # wilmes-core
//!
//! Core library for wilmes - a reader for a school messaging portal.
//!
//! This library provides:
//! - Domain types for pupils, people, messages and announcements
//! - Page extractors turning the portal's markup into those types
//! - An authenticated HTTP session and the navigation on top of it
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! A request flows through three layers:
//! - **Session:** [`PortalSession`] fetches pages by relative URL
//! - **Extraction:** a [`PortalExtractor`] for the configured markup variant
//!   turns one fetched document into domain types
//! - **Navigation:** [`Connection`] knows which page holds what and
//!   composes fetches (e.g. [`Connection::new_messages`])
//!
//! ## Example
//!
//! ```rust,no_run
//! use wilmes_core::{Config, Connection};
//!
//! # async fn run() -> wilmes_core::Result<()> {
//! let config = Config::load()?;
//! let mut connection =
//!     Connection::login(&config, "https://school.example.com", "guardian", "secret").await?;
//!
//! for entry in connection.new_messages().await? {
//!     for message in entry.messages {
//!         println!("{}", message.to_text(wilmes_core::format::DEFAULT_WIDTH));
//!     }
//! }
//! connection.close().await?;
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use connection::{Connection, PupilMessages};
pub use error::{Error, Result};
pub use extract::{extractor_for, MarkupVariant, PortalExtractor};
pub use session::{HttpSession, PortalSession};
pub use types::*;

// Public modules
pub mod config;
pub mod connection;
pub mod deobfuscate;
pub mod error;
pub mod extract;
pub mod format;
pub mod logging;
pub mod markup;
pub mod person;
pub mod session;
pub mod timestamp;
pub mod types;
