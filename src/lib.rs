//! # Quill
//!
//! A small blog server: posts, comments, user accounts and a single administrator.
//! Usable both as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! quill = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quill::config::ServerConfig;
//! use quill::server::{AppState, create_router};
//!
//! let config = ServerConfig {
//!     secret_key: Some(std::env::var("SECRET_KEY")?),
//!     ..ServerConfig::default()
//! };
//! let state = Arc::new(AppState::from_config(&config)?);
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `quill` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
