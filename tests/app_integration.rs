//! End-to-end tests through the complete handler stack, without sockets.

use base64::{Engine, engine::general_purpose::STANDARD};
use hyper::{Method, StatusCode};
use newsdesk::models::{NewArticle, parse_published_at};
use newsdesk::{AppContext, ArticleStore, Settings, urls};
use newsdesk_http::{Handler, Request, Response};
use rstest::{fixture, rstest};
use std::sync::Arc;
use tempfile::TempDir;

const BOUNDARY: &str = "----newsdeskboundary";
const USER: &str = "editor";
const PASSWORD: &str = "correct horse";

struct App {
	handler: Arc<dyn Handler>,
	ctx: Arc<AppContext>,
	dir: TempDir,
}

impl App {
	async fn send(&self, request: Request) -> Response {
		self.handler.handle(request).await.unwrap()
	}

	async fn get(&self, uri: &str) -> Response {
		self.send(Request::builder().uri(uri).build().unwrap()).await
	}

	async fn admin_get(&self, uri: &str) -> Response {
		self.send(Request::builder().uri(uri).header("Authorization", &auth()).build().unwrap())
			.await
	}

	async fn admin_post(&self, uri: &str, body: Vec<u8>) -> Response {
		self.send(multipart_post(uri, body).header("Authorization", &auth()).build().unwrap())
			.await
	}

	async fn seed(&self, title: &str, image: Option<&str>) -> i64 {
		self.ctx
			.store
			.create(&NewArticle {
				title: title.to_string(),
				description: format!("{title} description"),
				image_file: image.map(str::to_string),
				published_at: parse_published_at("2024-06-01T12:00").unwrap(),
			})
			.await
			.unwrap()
			.id
	}

	async fn count(&self) -> i64 {
		self.ctx.store.count().await.unwrap()
	}
}

#[fixture]
async fn app() -> App {
	let dir = TempDir::new().unwrap();
	let mut settings = Settings::with_credentials(USER, PASSWORD, "integration-secret-key");
	settings.static_dir = dir.path().join("static");
	let store = ArticleStore::in_memory().await.unwrap();
	let ctx = AppContext::new(settings, store).await.unwrap();

	App {
		handler: urls::build_handler(&ctx),
		ctx,
		dir,
	}
}

fn auth() -> String {
	format!("Basic {}", STANDARD.encode(format!("{USER}:{PASSWORD}")))
}

fn multipart_post(uri: &str, body: Vec<u8>) -> newsdesk_http::RequestBuilder {
	Request::builder()
		.method(Method::POST)
		.uri(uri)
		.header(
			"Content-Type",
			&format!("multipart/form-data; boundary={BOUNDARY}"),
		)
		.body(body)
}

fn article_form(title: &str, published_at: &str, image: Option<(&str, &[u8])>) -> Vec<u8> {
	let mut body = Vec::new();
	for (name, value) in [
		("title", title),
		("description", "Body text"),
		("publishedAt", published_at),
	] {
		body.extend_from_slice(
			format!(
				"--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
			)
			.as_bytes(),
		);
	}
	let (filename, data) = image.unwrap_or(("", b""));
	body.extend_from_slice(
		format!(
			"--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image_file\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
		)
		.as_bytes(),
	);
	body.extend_from_slice(data);
	body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
	body
}

fn location(response: &Response) -> &str {
	response.headers.get("location").unwrap().to_str().unwrap()
}

fn flash_cookie(response: &Response) -> String {
	let set_cookie = response.headers.get("set-cookie").unwrap().to_str().unwrap();
	set_cookie.split(';').next().unwrap().to_string()
}

#[rstest]
#[tokio::test]
async fn test_create_then_fetch(#[future] app: App) {
	let app = app.await;

	let response = app
		.admin_post(
			"/admin",
			article_form("Harbour reopens", "2024-05-06T07:08", Some(("harbour view.png", b"PNGDATA"))),
		)
		.await;

	assert_eq!(response.status, StatusCode::FOUND);
	assert_eq!(location(&response), "/admin");
	let articles = app.ctx.store.list_newest_first().await.unwrap();
	assert_eq!(articles.len(), 1);
	let article = &articles[0];
	assert_eq!(article.title, "Harbour reopens");
	assert_eq!(article.description, "Body text");
	assert_eq!(article.image_file.as_deref(), Some("uploads/harbour_view.png"));
	assert_eq!(article.published_at, parse_published_at("2024-05-06T07:08").unwrap());

	let page = app.get(&format!("/article/{}", article.id)).await;
	assert_eq!(page.status, StatusCode::OK);
	assert!(page.text().contains("Harbour reopens"));
	// Tera escapes `/` in rendered values
	assert!(page.text().contains("uploads&#x2F;harbour_view.png"));

	let image = app.get("/static/uploads/harbour_view.png").await;
	assert_eq!(image.status, StatusCode::OK);
	assert_eq!(image.body.as_ref(), b"PNGDATA");
	assert!(app.dir.path().join("static/uploads/harbour_view.png").is_file());
}

#[rstest]
#[case("photo..jpg")]
#[case("my...holiday.png")]
#[tokio::test]
async fn test_create_accepts_file_name_with_interior_dots(
	#[future] app: App,
	#[case] filename: &str,
) {
	let app = app.await;

	let response = app
		.admin_post("/admin", article_form("Dots", "2024-05-06T07:08", Some((filename, b"IMG"))))
		.await;

	assert_eq!(response.status, StatusCode::FOUND);
	assert_eq!(location(&response), "/admin");
	let articles = app.ctx.store.list_newest_first().await.unwrap();
	assert_eq!(articles.len(), 1);
	assert_eq!(
		articles[0].image_file.as_deref(),
		Some(format!("uploads/{filename}").as_str())
	);
	assert!(app.dir.path().join("static/uploads").join(filename).is_file());
}

#[rstest]
#[case::create("/admin")]
#[case::edit("/edit/1")]
#[tokio::test]
async fn test_rejected_article_removes_fresh_image(#[future] app: App, #[case] uri: &str) {
	let app = app.await;
	let id = app.seed("Kept", Some("uploads/keep.png")).await;
	assert_eq!(id, 1);

	let response = app
		.admin_post(uri, article_form("   ", "2024-05-06T07:08", Some(("orphan.png", b"IMG"))))
		.await;

	assert_eq!(response.status, StatusCode::BAD_REQUEST);
	assert_eq!(app.count().await, 1);
	let article = app.ctx.store.get(id).await.unwrap().unwrap();
	assert_eq!(article.title, "Kept");
	assert_eq!(article.image_file.as_deref(), Some("uploads/keep.png"));
	assert!(!app.dir.path().join("static/uploads/orphan.png").exists());
}

#[rstest]
#[case::create("/admin")]
#[case::edit("/edit/1")]
#[tokio::test]
async fn test_rejected_article_keeps_overwritten_image(#[future] app: App, #[case] uri: &str) {
	let app = app.await;
	app.seed("Kept", Some("uploads/existing.png")).await;
	let existing = app.dir.path().join("static/uploads/existing.png");
	std::fs::write(&existing, b"OLD").unwrap();

	let response = app
		.admin_post(uri, article_form("   ", "2024-05-06T07:08", Some(("existing.png", b"NEW"))))
		.await;

	assert_eq!(response.status, StatusCode::BAD_REQUEST);
	assert_eq!(app.count().await, 1);
	assert!(existing.is_file());
}

#[rstest]
#[tokio::test]
async fn test_success_message_shown_once_after_redirect(#[future] app: App) {
	let app = app.await;
	let created = app
		.admin_post("/admin", article_form("T", "2024-01-01T00:00", Some(("a.png", b"x"))))
		.await;
	let cookie = flash_cookie(&created);

	let request = |cookie: &str| {
		Request::builder()
			.uri("/admin")
			.header("Authorization", &auth())
			.header("Cookie", cookie)
			.build()
			.unwrap()
	};
	let page = app.send(request(&cookie)).await;

	assert!(page.text().contains("Article added successfully!"));
	assert!(flash_cookie(&page).ends_with('='));
}

#[rstest]
#[tokio::test]
async fn test_create_without_image_is_rejected(#[future] app: App) {
	let app = app.await;

	let response = app
		.admin_post("/admin", article_form("No picture", "2024-01-01T00:00", None))
		.await;
	let page = app
		.send(
			Request::builder()
				.uri("/admin")
				.header("Authorization", &auth())
				.header("Cookie", &flash_cookie(&response))
				.build()
				.unwrap(),
		)
		.await;

	assert_eq!(response.status, StatusCode::FOUND);
	assert_eq!(app.count().await, 0);
	assert!(page.text().contains("Failed to upload image."));
	assert!(page.text().contains("alert-danger"));
}

#[rstest]
#[tokio::test]
async fn test_edit_without_new_image_keeps_old_one(#[future] app: App) {
	let app = app.await;
	let id = app.seed("Original", Some("uploads/old.png")).await;

	let response = app
		.admin_post(&format!("/edit/{id}"), article_form("Renamed", "2024-07-01T08:30", None))
		.await;

	assert_eq!(response.status, StatusCode::FOUND);
	assert_eq!(location(&response), "/admin");
	let article = app.ctx.store.get(id).await.unwrap().unwrap();
	assert_eq!(article.title, "Renamed");
	assert_eq!(article.image_file.as_deref(), Some("uploads/old.png"));
	assert_eq!(article.published_at, parse_published_at("2024-07-01T08:30").unwrap());
}

#[rstest]
#[tokio::test]
async fn test_edit_with_new_image_replaces_reference(#[future] app: App) {
	let app = app.await;
	let id = app.seed("Original", Some("uploads/old.png")).await;

	app.admin_post(
		&format!("/edit/{id}"),
		article_form("Original", "2024-07-01T08:30", Some(("new.png", b"N"))),
	)
	.await;

	let article = app.ctx.store.get(id).await.unwrap().unwrap();
	assert_eq!(article.image_file.as_deref(), Some("uploads/new.png"));
}

#[rstest]
#[tokio::test]
async fn test_edit_form_prefills_values(#[future] app: App) {
	let app = app.await;
	let id = app.seed("Prefilled", None).await;

	let page = app.admin_get(&format!("/edit/{id}")).await;

	assert_eq!(page.status, StatusCode::OK);
	assert!(page.text().contains("value=\"Prefilled\""));
	assert!(page.text().contains("2024-06-01T12:00"));
}

#[rstest]
#[tokio::test]
async fn test_delete_then_fetch_is_not_found(#[future] app: App) {
	let app = app.await;
	let id = app.seed("Doomed", None).await;

	let response = app
		.send(
			Request::builder()
				.method(Method::POST)
				.uri(format!("/delete/{id}"))
				.header("Authorization", &auth())
				.build()
				.unwrap(),
		)
		.await;
	let page = app.get(&format!("/article/{id}")).await;

	assert_eq!(response.status, StatusCode::FOUND);
	assert_eq!(page.status, StatusCode::NOT_FOUND);
	assert!(page.text().contains("Article not found"));
}

#[rstest]
#[case(Method::GET, "/edit/42")]
#[case(Method::POST, "/delete/42")]
#[tokio::test]
async fn test_missing_article_renders_error_page(
	#[future] app: App,
	#[case] method: Method,
	#[case] uri: &str,
) {
	let app = app.await;

	let response = app
		.send(
			Request::builder()
				.method(method)
				.uri(uri)
				.header("Authorization", &auth())
				.build()
				.unwrap(),
		)
		.await;

	assert_eq!(response.status, StatusCode::NOT_FOUND);
	assert!(response.text().contains("404 Not Found"));
}

#[rstest]
#[case(Method::GET, "/admin")]
#[case(Method::POST, "/admin")]
#[case(Method::GET, "/edit/1")]
#[case(Method::POST, "/edit/1")]
#[case(Method::POST, "/delete/1")]
#[tokio::test]
async fn test_admin_routes_require_credentials(
	#[future] app: App,
	#[case] method: Method,
	#[case] uri: &str,
) {
	let app = app.await;
	let id = app.seed("Untouched", Some("uploads/keep.png")).await;
	assert_eq!(id, 1);

	let response = app
		.send(
			multipart_post(uri, article_form("Hijacked", "2024-01-01T00:00", Some(("x.png", b"x"))))
				.method(method)
				.build()
				.unwrap(),
		)
		.await;

	assert_eq!(response.status, StatusCode::UNAUTHORIZED);
	assert!(response.headers.contains_key("www-authenticate"));
	assert_eq!(app.count().await, 1);
	let article = app.ctx.store.get(id).await.unwrap().unwrap();
	assert_eq!(article.title, "Untouched");
	assert!(!app.dir.path().join("static/uploads/x.png").exists());
}

#[rstest]
#[tokio::test]
async fn test_wrong_password_is_rejected(#[future] app: App) {
	let app = app.await;
	let header = format!("Basic {}", STANDARD.encode(format!("{USER}:nope")));

	let response = app
		.send(Request::builder().uri("/admin").header("Authorization", &header).build().unwrap())
		.await;

	assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[rstest]
#[tokio::test]
async fn test_homepage_renders_every_region(#[future] app: App) {
	let app = app.await;
	for i in 0..3 {
		app.seed(&format!("Story {i}"), None).await;
	}

	let page = app.get("/").await;

	assert_eq!(page.status, StatusCode::OK);
	let html = page.text();
	for i in 0..3 {
		assert!(html.contains(&format!("Story {i}")));
	}
	assert!(html.contains("top-news"));
	assert!(html.contains("More news"));
}

#[rstest]
#[tokio::test]
async fn test_homepage_with_empty_store(#[future] app: App) {
	let app = app.await;

	let page = app.get("/").await;

	assert_eq!(page.status, StatusCode::OK);
	assert!(page.text().contains("No articles have been published yet."));
}

#[rstest]
#[tokio::test]
async fn test_logout_disables_caching(#[future] app: App) {
	let app = app.await;

	let response = app.get("/logout").await;

	assert_eq!(response.status, StatusCode::FOUND);
	assert_eq!(location(&response), "/");
	assert_eq!(
		response.headers.get("cache-control").unwrap(),
		"no-cache, no-store, must-revalidate"
	);
	assert_eq!(response.headers.get("pragma").unwrap(), "no-cache");
	assert_eq!(response.headers.get("expires").unwrap(), "0");
}

#[rstest]
#[tokio::test]
async fn test_unparseable_timestamp_is_server_error(#[future] app: App) {
	let app = app.await;

	let response = app
		.admin_post("/admin", article_form("T", "next tuesday", Some(("a.png", b"x"))))
		.await;

	assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(app.count().await, 0);
}

#[rstest]
#[case("/nowhere", StatusCode::NOT_FOUND)]
#[case("/article/abc", StatusCode::NOT_FOUND)]
#[case("/static/../Cargo.toml", StatusCode::NOT_FOUND)]
#[tokio::test]
async fn test_unknown_paths(#[future] app: App, #[case] uri: &str, #[case] status: StatusCode) {
	let app = app.await;

	let response = app.get(uri).await;

	assert_eq!(response.status, status);
	assert_eq!(response.content_type(), Some("text/html; charset=utf-8"));
}

#[rstest]
#[tokio::test]
async fn test_wrong_method_is_rejected(#[future] app: App) {
	let app = app.await;

	let response = app
		.send(Request::builder().method(Method::DELETE).uri("/admin").build().unwrap())
		.await;

	assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
}
