//! View shortcuts: template responses, redirects, 404 lookups and HTML
//! error pages.

use async_trait::async_trait;
use hyper::StatusCode;
use newsdesk_http::{Handler, Middleware, Request, Response};
use serde::Serialize;
use std::sync::Arc;

use crate::messages::Message;
use crate::models::Article;
use crate::store::ArticleStore;
use crate::templates::Templates;
use crate::{Error, Result};

/// Render `name` into a 200 HTML response
pub fn render_html<T: Serialize>(templates: &Templates, name: &str, context: &T) -> Result<Response> {
	let html = templates.render(name, context)?;
	Ok(Response::ok().with_html(html))
}

/// 302 to `location`
pub fn redirect(location: &str) -> Response {
	Response::temporary_redirect(location)
}

/// Fetch an article or fail with a not-found error
pub async fn get_or_404(store: &ArticleStore, id: i64) -> Result<Article> {
	store
		.get(id)
		.await?
		.ok_or_else(|| Error::not_found(format!("article {id}")))
}

fn error_title_and_message(status: StatusCode) -> (&'static str, &'static str) {
	match status.as_u16() {
		400 => ("Bad Request", "The request could not be understood by the server."),
		401 => ("Unauthorized", "Authentication is required to access this resource."),
		404 => ("Not Found", "The requested page could not be found."),
		405 => ("Method Not Allowed", "This method is not allowed for the requested page."),
		413 => ("Payload Too Large", "The uploaded data is too large."),
		_ => ("Server Error", "Something went wrong on our side. Please try again later."),
	}
}

#[derive(Serialize)]
struct ErrorPage<'a> {
	messages: Vec<Message>,
	status: u16,
	title: &'a str,
	message: String,
}

/// Renders `error.html` for requests that end in an error.
///
/// Client errors show the error's own message; server errors show a
/// generic text only.
pub struct ErrorPageMiddleware {
	templates: Templates,
}

impl ErrorPageMiddleware {
	pub fn new(templates: Templates) -> Self {
		Self { templates }
	}

	fn render(&self, error: newsdesk_http::Error) -> Response {
		let status = error.status();
		let (title, generic) = error_title_and_message(status);
		let message = if status.is_server_error() {
			generic.to_string()
		} else {
			error.public_message()
		};
		let page = ErrorPage {
			messages: Vec::new(),
			status: status.as_u16(),
			title,
			message,
		};
		match self.templates.render("error.html", &page) {
			Ok(html) => Response::new(status).with_html(html),
			Err(render_error) => {
				tracing::error!(error = %render_error, "failed to render error page");
				Response::from(error)
			}
		}
	}
}

#[async_trait]
impl Middleware for ErrorPageMiddleware {
	async fn process(
		&self,
		request: Request,
		next: Arc<dyn Handler>,
	) -> newsdesk_http::Result<Response> {
		match next.handle(request).await {
			Ok(response) => Ok(response),
			Err(error) => Ok(self.render(error)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use newsdesk_http::FnHandler;
	use rstest::rstest;

	fn failing(error: fn() -> newsdesk_http::Error) -> Arc<dyn Handler> {
		Arc::new(FnHandler::new(move |_request: Request| async move { Err(error()) }))
	}

	fn request() -> Request {
		Request::builder().uri("/edit/9").build().unwrap()
	}

	#[rstest]
	#[tokio::test]
	async fn test_not_found_renders_error_page() {
		let middleware = ErrorPageMiddleware::new(Templates::new().unwrap());

		let response = middleware
			.process(request(), failing(|| newsdesk_http::Error::NotFound("article 9".into())))
			.await
			.unwrap();

		assert_eq!(response.status, StatusCode::NOT_FOUND);
		assert_eq!(response.content_type(), Some("text/html; charset=utf-8"));
		assert!(response.text().contains("404 Not Found"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_internal_error_hides_details() {
		let middleware = ErrorPageMiddleware::new(Templates::new().unwrap());

		let response = middleware
			.process(request(), failing(|| newsdesk_http::Error::Internal("disk on fire".into())))
			.await
			.unwrap();

		assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
		assert!(!response.text().contains("disk on fire"));
	}

	#[rstest]
	fn test_redirect() {
		let response = redirect("/admin");

		assert_eq!(response.status, StatusCode::FOUND);
		assert_eq!(response.headers.get("location").unwrap(), "/admin");
	}

	#[rstest]
	#[tokio::test]
	async fn test_get_or_404_missing() {
		let store = ArticleStore::in_memory().await.unwrap();

		let result = get_or_404(&store, 1).await;

		assert!(matches!(result, Err(Error::NotFound(_))));
	}
}
