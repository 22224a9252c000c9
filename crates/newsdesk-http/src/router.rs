//! Method + path routing.
//!
//! Patterns are written segment by segment:
//!
//! - `/admin` - exact match
//! - `/article/{id:int}` - captures a segment that parses as a signed integer
//! - `/tag/{name}` - captures any non-empty segment
//! - `/static/{path:*}` - captures the rest of the path, separators included
//!
//! Trailing slashes are significant: `/admin/` does not match `/admin`.
//! Captured values are percent-decoded before they reach the handler.

use async_trait::async_trait;
use hyper::Method;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{Error, Handler, Request, Response, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
	Literal(String),
	Param(String),
	IntParam(String),
	CatchAll(String),
}

/// Compiled path pattern
#[derive(Debug, Clone)]
pub struct PathPattern {
	pattern: String,
	segments: Vec<Segment>,
}

impl PathPattern {
	/// Compile a pattern string.
	///
	/// # Examples
	///
	/// ```
	/// use newsdesk_http::PathPattern;
	///
	/// let pattern = PathPattern::new("/edit/{id:int}");
	/// let params = pattern.extract_params("/edit/12").unwrap();
	/// assert_eq!(params.get("id"), Some(&"12".to_string()));
	/// assert!(pattern.extract_params("/edit/twelve").is_none());
	/// ```
	pub fn new(pattern: &str) -> Self {
		let segments = split_path(pattern)
			.map(|raw| match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
				Some(inner) => match inner.split_once(':') {
					Some((name, "int")) => Segment::IntParam(name.to_string()),
					Some((name, "*")) => Segment::CatchAll(name.to_string()),
					Some((name, _)) => Segment::Param(name.to_string()),
					None => Segment::Param(inner.to_string()),
				},
				None => Segment::Literal(raw.to_string()),
			})
			.collect();
		Self {
			pattern: pattern.to_string(),
			segments,
		}
	}

	pub fn as_str(&self) -> &str {
		&self.pattern
	}

	/// Match `path` and return the captured parameters
	pub fn extract_params(&self, path: &str) -> Option<HashMap<String, String>> {
		let mut params = HashMap::new();
		let mut parts = split_path(path);

		for segment in &self.segments {
			match segment {
				Segment::CatchAll(name) => {
					let rest: Vec<&str> = parts.by_ref().collect();
					if rest.iter().all(|p| p.is_empty()) {
						return None;
					}
					params.insert(name.clone(), decode(&rest.join("/")));
					return Some(params);
				}
				Segment::Literal(expected) => {
					if parts.next()? != expected {
						return None;
					}
				}
				Segment::Param(name) => {
					let part = parts.next()?;
					if part.is_empty() {
						return None;
					}
					params.insert(name.clone(), decode(part));
				}
				Segment::IntParam(name) => {
					let part = parts.next()?;
					part.parse::<i64>().ok()?;
					params.insert(name.clone(), part.to_string());
				}
			}
		}

		if parts.next().is_some() {
			return None;
		}
		Some(params)
	}
}

fn split_path(path: &str) -> std::str::Split<'_, char> {
	path.strip_prefix('/').unwrap_or(path).split('/')
}

fn decode(raw: &str) -> String {
	percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

struct Route {
	method: Method,
	pattern: PathPattern,
	handler: Arc<dyn Handler>,
}

/// Dispatches requests to handlers by method and path.
///
/// An unmatched path yields [`Error::NotFound`]; a path that matches only
/// under other methods yields [`Error::MethodNotAllowed`].
#[derive(Default)]
pub struct Router {
	routes: Vec<Route>,
}

impl Router {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a handler; routes are tried in registration order
	pub fn route(mut self, method: Method, pattern: &str, handler: Arc<dyn Handler>) -> Self {
		self.routes.push(Route {
			method,
			pattern: PathPattern::new(pattern),
			handler,
		});
		self
	}

	/// Number of registered routes
	pub fn len(&self) -> usize {
		self.routes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}
}

#[async_trait]
impl Handler for Router {
	async fn handle(&self, mut request: Request) -> Result<Response> {
		let mut path_matched = false;

		for route in &self.routes {
			let Some(params) = route.pattern.extract_params(request.path()) else {
				continue;
			};
			// HEAD is served by GET routes
			let method_ok = route.method == request.method
				|| (request.method == Method::HEAD && route.method == Method::GET);
			if !method_ok {
				path_matched = true;
				continue;
			}

			tracing::trace!(pattern = route.pattern.as_str(), "route matched");
			for (key, value) in params {
				request.set_path_param(key, value);
			}
			return route.handler.handle(request).await;
		}

		if path_matched {
			Err(Error::MethodNotAllowed(format!(
				"{} {}",
				request.method,
				request.path()
			)))
		} else {
			Err(Error::NotFound(request.path().to_string()))
		}
	}
}
