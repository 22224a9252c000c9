//! Page templates, embedded in the binary.

use serde::Serialize;
use tera::{Context, Tera};

use crate::Result;

const TEMPLATES: &[(&str, &str)] = &[
	("base.html", include_str!("../templates/base.html")),
	("index.html", include_str!("../templates/index.html")),
	("admin.html", include_str!("../templates/admin.html")),
	("article.html", include_str!("../templates/article.html")),
	("edit.html", include_str!("../templates/edit.html")),
	("404.html", include_str!("../templates/404.html")),
	("error.html", include_str!("../templates/error.html")),
];

/// Tera renderer over the embedded templates.
///
/// Autoescaping is on for every template (all names end in `.html`).
#[derive(Debug, Clone)]
pub struct Templates {
	tera: Tera,
}

impl Templates {
	pub fn new() -> Result<Self> {
		let mut tera = Tera::default();
		tera.add_raw_templates(TEMPLATES.iter().copied())?;
		Ok(Self { tera })
	}

	/// Render `name` with a serializable context
	pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
		let context = Context::from_serialize(context)?;
		Ok(self.tera.render(name, &context)?)
	}
}
