//! Buffered HTTP request.

use bytes::Bytes;
use hyper::http::Extensions;
use hyper::{HeaderMap, Method, Uri, Version};
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::net::SocketAddr;

use crate::{Error, Result};

/// HTTP request with a fully buffered body.
///
/// `path_params` is filled by the [`Router`](crate::Router) and `extensions`
/// carries per-request state installed by middleware.
#[derive(Debug)]
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub version: Version,
	pub headers: HeaderMap,
	pub body: Bytes,
	pub remote_addr: Option<SocketAddr>,
	pub path_params: HashMap<String, String>,
	pub extensions: Extensions,
}

impl Request {
	/// Start building a request
	///
	/// # Examples
	///
	/// ```
	/// use newsdesk_http::Request;
	/// use hyper::Method;
	///
	/// let request = Request::builder()
	///     .method(Method::GET)
	///     .uri("/article/3")
	///     .build()
	///     .unwrap();
	///
	/// assert_eq!(request.path(), "/article/3");
	/// ```
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	/// Get the request path
	pub fn path(&self) -> &str {
		self.uri.path()
	}

	/// Raw query string, if any
	pub fn query_string(&self) -> Option<&str> {
		self.uri.query()
	}

	/// URL-decoded query parameters
	pub fn query_params(&self) -> HashMap<String, String> {
		self.uri
			.query()
			.map(|q| {
				q.split('&')
					.filter(|pair| !pair.is_empty())
					.map(|pair| {
						// Split on first '=' only to preserve '=' in values
						let mut parts = pair.splitn(2, '=');
						let key = parts.next().unwrap_or("");
						let value = parts.next().unwrap_or("");
						(
							percent_decode_str(&key.replace('+', " "))
								.decode_utf8_lossy()
								.into_owned(),
							percent_decode_str(&value.replace('+', " "))
								.decode_utf8_lossy()
								.into_owned(),
						)
					})
					.collect()
			})
			.unwrap_or_default()
	}

	/// Header value as a string, when present and valid ASCII
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}

	/// Captured path parameter by name
	pub fn path_param(&self, name: &str) -> Option<&str> {
		self.path_params.get(name).map(String::as_str)
	}

	/// Set a path parameter (used by the router while matching)
	pub fn set_path_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.path_params.insert(key.into(), value.into());
	}

	/// Parse a path parameter into `T`.
	///
	/// A missing or unparseable parameter is answered with 404, since the
	/// router only lets well-formed paths through.
	pub fn parsed_path_param<T: std::str::FromStr>(&self, name: &str) -> Result<T> {
		self.path_param(name)
			.and_then(|raw| raw.parse().ok())
			.ok_or_else(|| Error::NotFound(self.path().to_string()))
	}

	/// `Content-Type` header without parameters, lowercased
	pub fn content_type(&self) -> Option<String> {
		self.header("content-type").map(|ct| {
			ct.split(';')
				.next()
				.unwrap_or("")
				.trim()
				.to_ascii_lowercase()
		})
	}
}

/// Builder for [`Request`]
#[derive(Debug, Default)]
pub struct RequestBuilder {
	method: Method,
	uri: Option<String>,
	version: Version,
	headers: HeaderMap,
	body: Bytes,
	remote_addr: Option<SocketAddr>,
}

impl RequestBuilder {
	pub fn method(mut self, method: Method) -> Self {
		self.method = method;
		self
	}

	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = Some(uri.into());
		self
	}

	pub fn version(mut self, version: Version) -> Self {
		self.version = version;
		self
	}

	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;
		self
	}

	/// Append a single header; invalid names or values are ignored
	pub fn header(mut self, name: &str, value: &str) -> Self {
		if let (Ok(name), Ok(value)) = (
			hyper::header::HeaderName::from_bytes(name.as_bytes()),
			hyper::header::HeaderValue::from_str(value),
		) {
			self.headers.append(name, value);
		}
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
		self.remote_addr = Some(addr);
		self
	}

	/// Finish the request.
	///
	/// # Errors
	///
	/// Returns [`Error::BadRequest`] when the URI does not parse.
	pub fn build(self) -> Result<Request> {
		let uri = match self.uri {
			Some(raw) => raw
				.parse::<Uri>()
				.map_err(|e| Error::BadRequest(format!("Invalid URI: {e}")))?,
			None => Uri::from_static("/"),
		};
		Ok(Request {
			method: self.method,
			uri,
			version: self.version,
			headers: self.headers,
			body: self.body,
			remote_addr: self.remote_addr,
			path_params: HashMap::new(),
			extensions: Extensions::new(),
		})
	}
}
