//! Application state shared by every view.

use std::sync::Arc;

use crate::Result;
use crate::settings::Settings;
use crate::storage::ImageUploads;
use crate::store::ArticleStore;
use crate::templates::Templates;

/// Everything a request handler needs, built once at startup
pub struct AppContext {
	pub settings: Settings,
	pub store: ArticleStore,
	pub uploads: ImageUploads,
	pub templates: Templates,
}

impl AppContext {
	/// Assemble the context and make sure the upload directory exists
	pub async fn new(settings: Settings, store: ArticleStore) -> Result<Arc<Self>> {
		let (uploads, local) = ImageUploads::local(&settings.static_dir, &settings.upload_subdir);
		local.prepare().await?;
		tracing::debug!(path = %local.base_path().display(), "upload directory ready");

		Ok(Arc::new(Self {
			templates: Templates::new()?,
			settings,
			store,
			uploads,
		}))
	}

	/// URL of an image reference stored on an article
	pub fn static_url(&self, reference: &str) -> String {
		format!("/static/{}", reference.trim_start_matches('/'))
	}
}
