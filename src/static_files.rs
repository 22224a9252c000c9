//! Files under the static root, served at `/static/{path:*}`.

use async_trait::async_trait;
use hyper::header::CONTENT_TYPE;
use newsdesk_http::{Error, Handler, Request, Response, Result};
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Serves the `path` capture relative to `root`
#[derive(Debug, Clone)]
pub struct StaticFiles {
	root: PathBuf,
}

impl StaticFiles {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	async fn read(&self, relative: &Path) -> Result<Vec<u8>> {
		let path = self.root.join(relative);
		let not_found = || Error::NotFound(format!("/static/{}", relative.display()));
		match fs::metadata(&path).await {
			Ok(meta) if meta.is_file() => {}
			Ok(_) => return Err(not_found()),
			Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(not_found()),
			Err(err) => return Err(Error::Internal(err.to_string())),
		}
		fs::read(&path)
			.await
			.map_err(|err| Error::Internal(err.to_string()))
	}
}

#[async_trait]
impl Handler for StaticFiles {
	async fn handle(&self, request: Request) -> Result<Response> {
		let raw = request.path_param("path").unwrap_or_default();
		let relative = sanitize_relative_path(raw)
			.filter(|p| !p.as_os_str().is_empty())
			.ok_or_else(|| Error::NotFound(request.path().to_string()))?;

		let content = self.read(&relative).await?;
		let content_type = mime_guess::from_path(&relative)
			.first_raw()
			.unwrap_or("application/octet-stream");
		Ok(Response::ok()
			.with_header(CONTENT_TYPE.as_str(), content_type)
			.with_body(content))
	}
}

/// Relative path made of normal components only; `None` when it climbs out
fn sanitize_relative_path(path: &str) -> Option<PathBuf> {
	let mut buf = PathBuf::new();
	for component in Path::new(path).components() {
		match component {
			Component::Normal(segment) => buf.push(segment),
			Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
			Component::ParentDir => return None,
		}
	}
	Some(buf)
}
