//! Framework error type.
//!
//! Every error carries the HTTP status it should be answered with, so a
//! handler can bail out with `?` and the server still produces a sensible
//! response.

use bytes::Bytes;
use hyper::StatusCode;
use hyper::header::{CONTENT_TYPE, HeaderValue};

use crate::Response;

/// Result alias used by handlers and middleware
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while processing a request
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Method not allowed: {0}")]
	MethodNotAllowed(String),
	#[error("Bad request: {0}")]
	BadRequest(String),
	#[error("Authentication required")]
	Unauthorized,
	#[error("Payload too large: {0}")]
	PayloadTooLarge(String),
	#[error("Internal server error: {0}")]
	Internal(String),
}

impl Error {
	/// HTTP status this error is answered with
	///
	/// # Examples
	///
	/// ```
	/// use newsdesk_http::Error;
	/// use hyper::StatusCode;
	///
	/// assert_eq!(Error::NotFound("/missing".into()).status(), StatusCode::NOT_FOUND);
	/// assert_eq!(Error::Unauthorized.status(), StatusCode::UNAUTHORIZED);
	/// ```
	pub fn status(&self) -> StatusCode {
		match self {
			Error::NotFound(_) => StatusCode::NOT_FOUND,
			Error::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
			Error::BadRequest(_) => StatusCode::BAD_REQUEST,
			Error::Unauthorized => StatusCode::UNAUTHORIZED,
			Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
			Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Numeric form of [`Error::status`]
	pub fn status_code(&self) -> u16 {
		self.status().as_u16()
	}

	/// Message safe to show to a client.
	///
	/// Internal errors are reduced to the canonical reason phrase so that
	/// database or filesystem details never leak into a page.
	pub fn public_message(&self) -> String {
		match self {
			Error::Internal(_) => "The server encountered an unexpected condition.".to_string(),
			other => other.to_string(),
		}
	}
}

impl From<Error> for Response {
	fn from(error: Error) -> Self {
		let mut response = Response::new(error.status());
		response.headers.insert(
			CONTENT_TYPE,
			HeaderValue::from_static("text/plain; charset=utf-8"),
		);
		response.body = Bytes::from(error.public_message());
		response
	}
}
