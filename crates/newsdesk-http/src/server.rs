//! HTTP/1.1 server.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::{Error, Handler, Middleware, MiddlewareChain, Request, Response};

/// Default maximum request body size (16 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// HTTP/1.1 server driving a [`Handler`].
///
/// Bodies are buffered up to the configured limit before the handler runs.
/// Handler errors are converted into responses with the error's status.
pub struct HttpServer {
	handler: Arc<dyn Handler>,
	middlewares: Vec<Arc<dyn Middleware>>,
	max_body_bytes: usize,
}

impl HttpServer {
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self {
			handler,
			middlewares: Vec::new(),
			max_body_bytes: DEFAULT_MAX_BODY_BYTES,
		}
	}

	/// Wrap the handler in an additional middleware
	pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
		self.middlewares.push(middleware);
		self
	}

	pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
		self.max_body_bytes = limit;
		self
	}

	fn into_service(self) -> RequestService {
		let handler: Arc<dyn Handler> = if self.middlewares.is_empty() {
			self.handler
		} else {
			let mut chain = MiddlewareChain::new(self.handler);
			for middleware in self.middlewares {
				chain.add_middleware(middleware);
			}
			Arc::new(chain)
		};
		RequestService {
			handler,
			max_body_bytes: self.max_body_bytes,
			remote_addr: None,
		}
	}

	/// Serve until the process exits
	pub async fn listen(self, addr: SocketAddr) -> std::io::Result<()> {
		self.listen_with_shutdown(addr, std::future::pending(), Duration::ZERO)
			.await
	}

	/// Serve until `shutdown` resolves, then stop accepting and give
	/// in-flight connections up to `grace` to finish.
	pub async fn listen_with_shutdown<F>(
		self,
		addr: SocketAddr,
		shutdown: F,
		grace: Duration,
	) -> std::io::Result<()>
	where
		F: Future<Output = ()>,
	{
		let listener = TcpListener::bind(addr).await?;
		tracing::info!(address = %listener.local_addr()?, "HTTP server listening");
		self.serve(listener, shutdown, grace).await
	}

	/// Serve on an already bound listener
	pub async fn serve<F>(
		self,
		listener: TcpListener,
		shutdown: F,
		grace: Duration,
	) -> std::io::Result<()>
	where
		F: Future<Output = ()>,
	{
		let service = self.into_service();
		let graceful = GracefulShutdown::new();
		tokio::pin!(shutdown);

		loop {
			tokio::select! {
				result = listener.accept() => {
					let (stream, remote_addr) = match result {
						Ok(accepted) => accepted,
						Err(err) => {
							tracing::warn!(error = %err, "failed to accept connection");
							continue;
						}
					};
					let io = TokioIo::new(stream);
					let service = RequestService {
						remote_addr: Some(remote_addr),
						..service.clone()
					};
					let connection = graceful.watch(http1::Builder::new().serve_connection(io, service));

					tokio::task::spawn(async move {
						if let Err(err) = connection.await {
							tracing::debug!(error = %err, %remote_addr, "connection closed with error");
						}
					});
				}
				_ = &mut shutdown => {
					tracing::info!("shutdown signal received, draining connections");
					break;
				}
			}
		}

		drop(listener);
		tokio::select! {
			_ = graceful.shutdown() => {
				tracing::info!("all connections closed");
			}
			_ = tokio::time::sleep(grace) => {
				tracing::warn!(grace_secs = grace.as_secs(), "grace period elapsed with open connections");
			}
		}
		Ok(())
	}
}

/// Service implementation for hyper
#[derive(Clone)]
struct RequestService {
	handler: Arc<dyn Handler>,
	max_body_bytes: usize,
	remote_addr: Option<SocketAddr>,
}

impl RequestService {
	async fn respond(self, req: hyper::Request<Incoming>) -> Response {
		let (parts, body) = req.into_parts();

		let body = match Limited::new(body, self.max_body_bytes).collect().await {
			Ok(collected) => collected.to_bytes(),
			Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
				return Error::PayloadTooLarge(format!(
					"request body exceeds {} bytes",
					self.max_body_bytes
				))
				.into();
			}
			Err(err) => return Error::BadRequest(format!("failed to read body: {err}")).into(),
		};

		let request = Request {
			method: parts.method,
			uri: parts.uri,
			version: parts.version,
			headers: parts.headers,
			body,
			remote_addr: self.remote_addr,
			path_params: Default::default(),
			extensions: parts.extensions,
		};

		match self.handler.handle(request).await {
			Ok(response) => response,
			Err(err) => {
				if err.status().is_server_error() {
					tracing::error!(error = %err, "request failed");
				}
				err.into()
			}
		}
	}
}

impl Service<hyper::Request<Incoming>> for RequestService {
	type Response = hyper::Response<Full<Bytes>>;
	type Error = Infallible;
	type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

	fn call(&self, req: hyper::Request<Incoming>) -> Self::Future {
		let service = self.clone();
		Box::pin(async move { Ok(into_hyper(service.respond(req).await)) })
	}
}

fn into_hyper(response: Response) -> hyper::Response<Full<Bytes>> {
	let mut hyper_response = hyper::Response::new(Full::new(response.body));
	*hyper_response.status_mut() = response.status;
	*hyper_response.headers_mut() = response.headers;
	hyper_response
}
