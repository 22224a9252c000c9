//! Tracing subscriber setup and per-request logging.

use async_trait::async_trait;
use newsdesk_http::{Handler, Middleware, Request, Response, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the level picked from `verbosity` (0 = info,
/// 1 = debug, more = trace). SQL statement logging stays at `warn` unless
/// asked for explicitly.
pub fn init(verbosity: u8) {
	let level = match verbosity {
		0 => LevelFilter::INFO,
		1 => LevelFilter::DEBUG,
		_ => LevelFilter::TRACE,
	};
	let mut filter = EnvFilter::builder()
		.with_default_directive(level.into())
		.from_env_lossy();
	if let Ok(directive) = "sqlx=warn".parse::<Directive>() {
		filter = filter.add_directive(directive);
	}

	let registry = tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer().with_target(false));
	if registry.try_init().is_err() {
		tracing::debug!("tracing subscriber already installed");
	}
}

/// Logs one line per request with its status and duration
#[derive(Debug, Default)]
pub struct RequestLogMiddleware;

impl RequestLogMiddleware {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl Middleware for RequestLogMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let method = request.method.clone();
		let path = request.path().to_string();
		let started = Instant::now();

		let result = next.handle(request).await;

		let elapsed_ms = started.elapsed().as_millis() as u64;
		match &result {
			Ok(response) if response.status.is_server_error() => {
				tracing::error!(%method, %path, status = response.status.as_u16(), elapsed_ms, "request failed");
			}
			Ok(response) if response.status.is_client_error() => {
				tracing::warn!(%method, %path, status = response.status.as_u16(), elapsed_ms, "request rejected");
			}
			Ok(response) => {
				tracing::info!(%method, %path, status = response.status.as_u16(), elapsed_ms, "request handled");
			}
			Err(error) => {
				tracing::error!(%method, %path, status = error.status_code(), elapsed_ms, %error, "request error");
			}
		}
		result
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use newsdesk_http::FnHandler;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_passes_result_through() {
		let handler: Arc<dyn Handler> = Arc::new(FnHandler::new(|_request: Request| async {
			Err(newsdesk_http::Error::NotFound("x".into()))
		}));
		let request = Request::builder().uri("/missing").build().unwrap();

		let result = RequestLogMiddleware::new().process(request, handler).await;

		assert!(matches!(result, Err(newsdesk_http::Error::NotFound(_))));
	}

	#[rstest]
	fn test_init_twice_is_harmless() {
		init(0);
		init(2);
	}
}
