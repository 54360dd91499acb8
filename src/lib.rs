//! shopdesk: multi-tenant retail and office back-office REST backend.
//!
//! Every scoped request resolves the user's selected account (retail store or
//! office) once, then threads it through services into the store.

pub mod account;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod notify;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use account::{Account, AccountKind, AccountRef, SessionAccount, User};
pub use config::{AppConfig, Catalog};
pub use error::{AppError, ConfigError};
pub use notify::{Notification, Notifier, TracingNotifier};
pub use response::{success_created, success_empty, success_many, success_ok};
pub use routes::app;
pub use state::AppState;
pub use store::{ensure_database_exists, ensure_tables, MemoryStore, PgStore, Store};
