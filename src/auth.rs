//! HTTP Basic authentication for the admin routes.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use newsdesk_http::{Handler, Middleware, Request, Response, Result};
use std::sync::Arc;

/// Request extension naming the authenticated admin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser {
	pub username: String,
}

/// Rejects requests without the configured Basic credentials.
///
/// The wrapped handler never runs for a rejected request.
pub struct BasicAuthMiddleware {
	username: String,
	password: String,
	realm: String,
}

impl BasicAuthMiddleware {
	pub fn new(
		username: impl Into<String>,
		password: impl Into<String>,
		realm: impl Into<String>,
	) -> Self {
		Self {
			username: username.into(),
			password: password.into(),
			realm: realm.into(),
		}
	}

	fn verify(&self, header: Option<&str>) -> Option<String> {
		let (username, password) = parse_basic_header(header?)?;
		// Evaluate both comparisons so timing does not reveal which one failed
		let user_ok = constant_time_eq(username.as_bytes(), self.username.as_bytes());
		let password_ok = constant_time_eq(password.as_bytes(), self.password.as_bytes());
		(user_ok & password_ok).then_some(username)
	}

	fn challenge(&self) -> Response {
		let realm = self.realm.replace('"', "");
		Response::unauthorized()
			.with_header("WWW-Authenticate", &format!("Basic realm=\"{realm}\""))
			.with_header("Content-Type", "text/plain; charset=utf-8")
			.with_body("Authentication required")
	}
}

#[async_trait]
impl Middleware for BasicAuthMiddleware {
	async fn process(&self, mut request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		match self.verify(request.header("authorization")) {
			Some(username) => {
				request.extensions.insert(AdminUser { username });
				next.handle(request).await
			}
			None => {
				tracing::warn!(
					method = %request.method,
					path = request.path(),
					"rejected admin request without valid credentials"
				);
				Ok(self.challenge())
			}
		}
	}
}

/// Parse `Basic <base64(user:password)>`
fn parse_basic_header(header: &str) -> Option<(String, String)> {
	let (scheme, encoded) = header.trim().split_once(' ')?;
	if !scheme.eq_ignore_ascii_case("basic") {
		return None;
	}
	let decoded = STANDARD.decode(encoded.trim()).ok()?;
	let decoded = String::from_utf8(decoded).ok()?;
	let (username, password) = decoded.split_once(':')?;
	Some((username.to_string(), password.to_string()))
}

/// Compare SHA-256 digests in constant time, so neither content nor length
/// leaks through timing.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
	use sha2::{Digest, Sha256};
	use subtle::ConstantTimeEq;

	let hash_a = Sha256::digest(a);
	let hash_b = Sha256::digest(b);
	hash_a.ct_eq(&hash_b).into()
}
