//! # Linkden
//!
//! A lightweight, self-hostable home for your link collections, usable both
//! as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! linkden = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::collections::HashSet;
//! use std::sync::Arc;
//! use linkden::auth::{AuthService, TokenSigner};
//! use linkden::server::{AppState, create_router};
//! use linkden::store::SqliteStore;
//!
//! let store = SqliteStore::new("./data/linkden.db").unwrap();
//! store.initialize().unwrap();
//!
//! let auth = AuthService::new(
//!     TokenSigner::new("secret", 24),
//!     HashSet::from(["admin".to_string()]),
//! );
//! let state = Arc::new(AppState {
//!     store: Arc::new(store),
//!     auth,
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `linkden` binary. Disable with
//!   `default-features = false` for library use.

pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod tags;
pub mod types;
pub mod validation;
