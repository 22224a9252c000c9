//! # newsdesk-http
//!
//! The HTTP layer newsdesk is built on.
//!
//! ## Overview
//!
//! - [`Request`] / [`Response`]: buffered request and response values
//! - [`Handler`] / [`Middleware`] / [`MiddlewareChain`]: request processing
//! - [`Router`]: method + path pattern dispatch with captured parameters
//! - [`FormData`]: urlencoded and multipart form bodies
//! - [`HttpServer`]: hyper-backed HTTP/1.1 server with graceful shutdown
//!
//! ## Example
//!
//! ```rust,no_run
//! use newsdesk_http::{FnHandler, HttpServer, Request, Response, Router};
//! use hyper::Method;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let router = Router::new().route(
//!     Method::GET,
//!     "/hello/{name}",
//!     Arc::new(FnHandler::new(|request: Request| async move {
//!         let name = request.path_param("name").unwrap_or("world").to_string();
//!         Ok(Response::ok().with_body(format!("Hello, {name}!")))
//!     })),
//! );
//!
//! HttpServer::new(Arc::new(router))
//!     .listen("127.0.0.1:8080".parse()?)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod form;
pub mod middleware;
pub mod request;
pub mod response;
pub mod router;
pub mod server;

pub use error::{Error, Result};
pub use form::{FormData, UploadedFile};
pub use middleware::{FnHandler, Handler, Middleware, MiddlewareChain};
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use router::{PathPattern, Router};
pub use server::HttpServer;
