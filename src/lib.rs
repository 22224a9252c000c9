//! # newsdesk
//!
//! A small news-site backend: articles stored in SQLite, a homepage that
//! spreads them over fixed display regions, and an admin area behind HTTP
//! Basic authentication for creating, editing and deleting articles with
//! an uploaded image.
//!
//! ## Layout
//!
//! - [`settings`]: environment-sourced configuration
//! - [`store`] / [`models`]: article persistence
//! - [`storage`]: uploaded image files
//! - [`grouping`]: homepage bucketing
//! - [`auth`] / [`messages`]: Basic auth and flash notices
//! - [`views`] / [`urls`]: route handlers and the middleware stack
//!
//! ## Example
//!
//! ```rust,no_run
//! use newsdesk::{AppContext, ArticleStore, Settings, urls};
//! use newsdesk_http::HttpServer;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::from_env()?;
//! let store = ArticleStore::connect(&settings.database_url, 5).await?;
//! store.migrate().await?;
//!
//! let bind = settings.bind;
//! let ctx = AppContext::new(settings, store).await?;
//! HttpServer::new(urls::build_handler(&ctx)).listen(bind).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod context;
pub mod error;
pub mod grouping;
pub mod logging;
pub mod messages;
pub mod models;
pub mod settings;
pub mod shortcuts;
pub mod static_files;
pub mod storage;
pub mod store;
pub mod templates;
pub mod urls;
pub mod views;

pub use context::AppContext;
pub use error::{Error, Result};
pub use models::Article;
pub use settings::Settings;
pub use store::ArticleStore;
