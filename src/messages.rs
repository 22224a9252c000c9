//! One-shot flash messages carried across a redirect in a signed cookie.
//!
//! `MessageMiddleware` installs a [`FlashMessages`] handle in the request
//! extensions. Handlers queue messages with [`FlashMessages::success`] and
//! friends; the page rendered after the redirect consumes them with
//! [`FlashMessages::take`].

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use newsdesk_http::{Handler, Middleware, Request, Response, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

pub const MESSAGES_COOKIE: &str = "newsdesk_messages";

/// Message severity levels, named after the CSS alert classes they map to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
	Info,
	Success,
	Warning,
	Danger,
}

/// A single flash message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
	pub level: MessageLevel,
	pub text: String,
}

impl Message {
	pub fn new(level: MessageLevel, text: impl Into<String>) -> Self {
		Self {
			level,
			text: text.into(),
		}
	}
}

#[derive(Debug, Default)]
struct FlashState {
	incoming: Vec<Message>,
	outgoing: Vec<Message>,
	consumed: bool,
}

/// Per-request flash message handle
#[derive(Debug, Clone, Default)]
pub struct FlashMessages {
	state: Arc<Mutex<FlashState>>,
}

impl FlashMessages {
	fn with_incoming(incoming: Vec<Message>) -> Self {
		Self {
			state: Arc::new(Mutex::new(FlashState {
				incoming,
				..Default::default()
			})),
		}
	}

	/// Queue a message for the next rendered page
	pub fn add(&self, message: Message) {
		self.state.lock().outgoing.push(message);
	}

	pub fn success(&self, text: impl Into<String>) {
		self.add(Message::new(MessageLevel::Success, text));
	}

	pub fn danger(&self, text: impl Into<String>) {
		self.add(Message::new(MessageLevel::Danger, text));
	}

	/// Consume the messages that arrived with this request
	pub fn take(&self) -> Vec<Message> {
		let mut state = self.state.lock();
		state.consumed = true;
		std::mem::take(&mut state.incoming)
	}

	/// Messages to carry into the next request, or `None` when the cookie
	/// should be left as it is
	fn pending(&self) -> Option<Vec<Message>> {
		let mut state = self.state.lock();
		if !state.consumed && state.outgoing.is_empty() {
			return None;
		}
		let mut pending = std::mem::take(&mut state.incoming);
		pending.append(&mut state.outgoing);
		Some(pending)
	}
}

/// The request's flash handle; an unattached handle when the middleware
/// is not installed
pub fn flash(request: &Request) -> FlashMessages {
	request
		.extensions
		.get::<FlashMessages>()
		.cloned()
		.unwrap_or_default()
}

/// Cookie-backed flash message middleware
pub struct MessageMiddleware {
	secret_key: Vec<u8>,
}

impl MessageMiddleware {
	pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
		Self {
			secret_key: secret_key.as_ref().to_vec(),
		}
	}

	fn mac(&self) -> Option<HmacSha256> {
		HmacSha256::new_from_slice(&self.secret_key).ok()
	}

	/// `<base64url(json)>.<base64url(hmac)>`
	fn encode(&self, messages: &[Message]) -> Option<String> {
		let json = serde_json::to_vec(messages).ok()?;
		let payload = URL_SAFE_NO_PAD.encode(json);
		let mut mac = self.mac()?;
		mac.update(payload.as_bytes());
		let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
		Some(format!("{payload}.{signature}"))
	}

	fn decode(&self, value: &str) -> Option<Vec<Message>> {
		let (payload, signature) = value.split_once('.')?;
		let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
		let mut mac = self.mac()?;
		mac.update(payload.as_bytes());
		mac.verify_slice(&signature).ok()?;
		let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
		serde_json::from_slice(&json).ok()
	}

	fn read_cookie(request: &Request) -> Option<&str> {
		request
			.headers
			.get_all(hyper::header::COOKIE)
			.iter()
			.filter_map(|v| v.to_str().ok())
			.flat_map(|v| v.split(';'))
			.filter_map(|pair| pair.trim().split_once('='))
			.find(|(name, _)| *name == MESSAGES_COOKIE)
			.map(|(_, value)| value)
	}
}

#[async_trait]
impl Middleware for MessageMiddleware {
	async fn process(&self, mut request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let raw_cookie = Self::read_cookie(&request).map(str::to_string);
		let incoming = match raw_cookie.as_deref() {
			Some(value) => self.decode(value).unwrap_or_else(|| {
				tracing::debug!("ignoring invalid flash message cookie");
				Vec::new()
			}),
			None => Vec::new(),
		};

		let flash = FlashMessages::with_incoming(incoming);
		request.extensions.insert(flash.clone());

		let response = next.handle(request).await?;

		let Some(pending) = flash.pending() else {
			return Ok(response);
		};
		if pending.is_empty() {
			if raw_cookie.is_none() {
				return Ok(response);
			}
			return Ok(response.append_header(
				"Set-Cookie",
				&format!("{MESSAGES_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax"),
			));
		}
		match self.encode(&pending) {
			Some(value) => Ok(response.append_header(
				"Set-Cookie",
				&format!("{MESSAGES_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax"),
			)),
			None => {
				tracing::warn!("failed to encode flash messages");
				Ok(response)
			}
		}
	}
}
