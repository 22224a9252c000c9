//! Route handlers.
//!
//! Each view takes the shared [`AppContext`] and the request, and returns
//! either a rendered page or a redirect. Failures propagate as
//! [`crate::Error`] and are turned into error pages further out.

use hyper::StatusCode;
use newsdesk_http::{FormData, Request, Response};
use rand::seq::SliceRandom;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::AdminUser;
use crate::context::AppContext;
use crate::grouping::{HOME_LAYOUT, group_by_lengths};
use crate::messages::{Message, flash};
use crate::models::{Article, ArticleChanges, NewArticle, format_published_at_input, parse_published_at};
use crate::shortcuts::{get_or_404, redirect, render_html};
use crate::storage::StoredImage;
use crate::{Error, Result};

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

const ADMIN_URL: &str = "/admin";

/// An article as the templates see it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleView {
	pub id: i64,
	pub title: String,
	pub description: String,
	pub image_url: Option<String>,
	pub published_display: String,
	/// Value for the edit form's `datetime-local` input
	pub published_input: String,
}

impl ArticleView {
	pub fn new(ctx: &AppContext, article: &Article) -> Self {
		Self {
			id: article.id,
			title: article.title.clone(),
			description: article.description.clone(),
			image_url: article.image_file.as_deref().map(|r| ctx.static_url(r)),
			published_display: article.published_at.format(DISPLAY_FORMAT).to_string(),
			published_input: format_published_at_input(&article.published_at),
		}
	}
}

/// Homepage regions, filled in [`HOME_LAYOUT`] order
#[derive(Debug, Default, Serialize)]
pub struct HomeSections {
	pub top: Vec<ArticleView>,
	pub headlines: Vec<ArticleView>,
	pub left: Vec<ArticleView>,
	pub right: Vec<ArticleView>,
	pub more: Vec<ArticleView>,
}

impl HomeSections {
	fn from_articles(articles: &[ArticleView]) -> Result<Self> {
		if articles.is_empty() {
			return Ok(Self::default());
		}
		let mut groups = group_by_lengths(articles, &HOME_LAYOUT)?.into_iter();
		let mut next = || groups.next().unwrap_or_default();
		Ok(Self {
			top: next(),
			headlines: next(),
			left: next(),
			right: next(),
			more: next(),
		})
	}
}

#[derive(Serialize)]
struct HomePage {
	messages: Vec<Message>,
	is_empty: bool,
	sections: HomeSections,
}

#[derive(Serialize)]
struct AdminPage {
	messages: Vec<Message>,
	articles: Vec<ArticleView>,
}

#[derive(Serialize)]
struct ArticlePage {
	messages: Vec<Message>,
	article: ArticleView,
}

#[derive(Serialize)]
struct NotFoundPage {
	messages: Vec<Message>,
}

/// The submitted title, description and publish time
struct ArticleForm {
	title: String,
	description: String,
	published_at: chrono::NaiveDateTime,
}

impl ArticleForm {
	fn parse(form: &FormData) -> Result<Self> {
		Ok(Self {
			title: form.required("title")?.to_string(),
			description: form.required("description")?.to_string(),
			published_at: parse_published_at(form.required("publishedAt")?)?,
		})
	}
}

fn admin_name(request: &Request) -> &str {
	request
		.extensions
		.get::<AdminUser>()
		.map(|user| user.username.as_str())
		.unwrap_or("-")
}

fn article_id(request: &Request) -> Result<i64> {
	Ok(request.parsed_path_param::<i64>("id")?)
}

/// `GET /`
pub async fn index(ctx: Arc<AppContext>, request: Request) -> Result<Response> {
	let mut articles = ctx.store.list_newest_first().await?;
	articles.shuffle(&mut rand::thread_rng());

	let views: Vec<ArticleView> = articles.iter().map(|a| ArticleView::new(&ctx, a)).collect();
	let page = HomePage {
		messages: flash(&request).take(),
		is_empty: views.is_empty(),
		sections: HomeSections::from_articles(&views)?,
	};
	render_html(&ctx.templates, "index.html", &page)
}

/// `GET /admin`
pub async fn admin_list(ctx: Arc<AppContext>, request: Request) -> Result<Response> {
	let articles = ctx.store.list_newest_first().await?;
	let page = AdminPage {
		messages: flash(&request).take(),
		articles: articles.iter().map(|a| ArticleView::new(&ctx, a)).collect(),
	};
	render_html(&ctx.templates, "admin.html", &page)
}

/// `POST /admin`
pub async fn admin_create(ctx: Arc<AppContext>, request: Request) -> Result<Response> {
	let messages = flash(&request);
	let mut form = FormData::from_request(&request).await?;
	let fields = ArticleForm::parse(&form)?;

	let image = match form.take_file("image_file") {
		Some(file) => ctx.uploads.store(&file).await?,
		None => None,
	};
	let Some(image) = image else {
		tracing::warn!(admin = admin_name(&request), "article submitted without an image");
		messages.danger("Failed to upload image.");
		return Ok(redirect(ADMIN_URL));
	};

	let new = NewArticle {
		title: fields.title,
		description: fields.description,
		image_file: Some(image.reference.clone()),
		published_at: fields.published_at,
	};
	let article = match ctx.store.create(&new).await {
		Ok(article) => article,
		Err(err) => return Err(discard_and_fail(&ctx, &image, err).await),
	};

	tracing::info!(article_id = article.id, admin = admin_name(&request), "article created");
	messages.success("Article added successfully!");
	Ok(redirect(ADMIN_URL))
}

/// `GET /logout`
///
/// Browsers drop cached Basic credentials only on their own terms; this
/// just sends the user home with caching disabled.
pub async fn logout(_ctx: Arc<AppContext>, _request: Request) -> Result<Response> {
	Ok(redirect("/")
		.with_header("Cache-Control", "no-cache, no-store, must-revalidate")
		.with_header("Pragma", "no-cache")
		.with_header("Expires", "0"))
}

/// `GET /article/{id}`; a missing article gets the `404.html` page
pub async fn article_detail(ctx: Arc<AppContext>, request: Request) -> Result<Response> {
	let id = article_id(&request)?;
	let messages = flash(&request).take();

	match ctx.store.get(id).await? {
		Some(article) => {
			let page = ArticlePage {
				messages,
				article: ArticleView::new(&ctx, &article),
			};
			render_html(&ctx.templates, "article.html", &page)
		}
		None => {
			tracing::debug!(article_id = id, "article not found");
			Ok(render_html(&ctx.templates, "404.html", &NotFoundPage { messages })?
				.with_status(StatusCode::NOT_FOUND))
		}
	}
}

/// `GET /edit/{id}`
pub async fn edit_form(ctx: Arc<AppContext>, request: Request) -> Result<Response> {
	let article = get_or_404(&ctx.store, article_id(&request)?).await?;
	let page = ArticlePage {
		messages: flash(&request).take(),
		article: ArticleView::new(&ctx, &article),
	};
	render_html(&ctx.templates, "edit.html", &page)
}

/// `POST /edit/{id}`; without a new file the stored image is kept
pub async fn edit_submit(ctx: Arc<AppContext>, request: Request) -> Result<Response> {
	let article = get_or_404(&ctx.store, article_id(&request)?).await?;
	let mut form = FormData::from_request(&request).await?;
	let fields = ArticleForm::parse(&form)?;

	let image = match form.take_file("image_file") {
		Some(file) => ctx.uploads.store(&file).await?,
		None => None,
	};
	let changes = ArticleChanges {
		title: fields.title,
		description: fields.description,
		image_file: image.as_ref().map(|i| i.reference.clone()),
		published_at: fields.published_at,
	};

	let result = ctx
		.store
		.update(article.id, &changes)
		.await
		.and_then(|updated| updated.ok_or_else(|| Error::not_found(format!("article {}", article.id))));
	let updated = match (result, &image) {
		(Ok(updated), _) => updated,
		(Err(err), Some(image)) => return Err(discard_and_fail(&ctx, image, err).await),
		(Err(err), None) => return Err(err),
	};

	tracing::info!(
		article_id = updated.id,
		admin = admin_name(&request),
		image_replaced = image.is_some(),
		"article updated"
	);
	flash(&request).success("Article updated successfully!");
	Ok(redirect(ADMIN_URL))
}

/// `POST /delete/{id}`
pub async fn delete(ctx: Arc<AppContext>, request: Request) -> Result<Response> {
	let article = get_or_404(&ctx.store, article_id(&request)?).await?;
	ctx.store.delete(article.id).await?;

	tracing::info!(article_id = article.id, admin = admin_name(&request), "article deleted");
	flash(&request).success("Article deleted successfully!");
	Ok(redirect(ADMIN_URL))
}

/// Remove a freshly stored image after the record write failed
async fn discard_and_fail(ctx: &AppContext, image: &StoredImage, err: Error) -> Error {
	tracing::warn!(file = %image.file_name, error = %err, "article not saved, removing uploaded image");
	ctx.uploads.discard(image).await;
	err
}
