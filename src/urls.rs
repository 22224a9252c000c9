//! URL table and the middleware stack around it.

use hyper::Method;
use newsdesk_http::{FnHandler, Handler, MiddlewareChain, Request, Response, Router};
use std::future::Future;
use std::sync::Arc;

use crate::auth::BasicAuthMiddleware;
use crate::context::AppContext;
use crate::logging::RequestLogMiddleware;
use crate::messages::MessageMiddleware;
use crate::shortcuts::ErrorPageMiddleware;
use crate::static_files::StaticFiles;
use crate::views;

/// Adapt a view function into a router handler
fn view<F, Fut>(ctx: &Arc<AppContext>, func: F) -> Arc<dyn Handler>
where
	F: Fn(Arc<AppContext>, Request) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = crate::Result<Response>> + Send + 'static,
{
	let ctx = Arc::clone(ctx);
	Arc::new(FnHandler::new(move |request: Request| {
		let response = func(Arc::clone(&ctx), request);
		async move { response.await.map_err(newsdesk_http::Error::from) }
	}))
}

/// Router with every route; admin routes sit behind Basic auth
pub fn router(ctx: &Arc<AppContext>) -> Router {
	let settings = &ctx.settings;
	let auth = Arc::new(BasicAuthMiddleware::new(
		settings.admin_username.as_str(),
		settings.admin_password.as_str(),
		settings.auth_realm.as_str(),
	));
	let protected = |handler: Arc<dyn Handler>| -> Arc<dyn Handler> {
		Arc::new(MiddlewareChain::new(handler).with_middleware(auth.clone()))
	};

	Router::new()
		.route(Method::GET, "/", view(ctx, views::index))
		.route(Method::GET, "/admin", protected(view(ctx, views::admin_list)))
		.route(Method::POST, "/admin", protected(view(ctx, views::admin_create)))
		.route(Method::GET, "/logout", view(ctx, views::logout))
		.route(Method::GET, "/article/{id:int}", view(ctx, views::article_detail))
		.route(Method::GET, "/edit/{id:int}", protected(view(ctx, views::edit_form)))
		.route(Method::POST, "/edit/{id:int}", protected(view(ctx, views::edit_submit)))
		.route(Method::POST, "/delete/{id:int}", protected(view(ctx, views::delete)))
		.route(
			Method::GET,
			"/static/{path:*}",
			Arc::new(StaticFiles::new(&settings.static_dir)),
		)
}

/// The complete application handler.
///
/// Outermost first: request log, flash messages, error pages, router.
pub fn build_handler(ctx: &Arc<AppContext>) -> Arc<dyn Handler> {
	let chain = MiddlewareChain::new(Arc::new(router(ctx)))
		.with_middleware(Arc::new(RequestLogMiddleware::new()))
		.with_middleware(Arc::new(MessageMiddleware::new(&ctx.settings.secret_key)))
		.with_middleware(Arc::new(ErrorPageMiddleware::new(ctx.templates.clone())));
	Arc::new(chain)
}
