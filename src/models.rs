//! Article records and form value parsing.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{Error, Result};

/// Format of the `published_at` form input (`<input type="datetime-local">`)
pub const PUBLISHED_AT_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const IMAGE_FILE_MAX_CHARS: usize = 300;

/// A stored article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Article {
	pub id: i64,
	pub title: String,
	pub description: String,
	/// Path relative to the static root, e.g. `uploads/photo.jpg`
	pub image_file: Option<String>,
	pub published_at: NaiveDateTime,
}

/// Fields of an article about to be created
#[derive(Debug, Clone)]
pub struct NewArticle {
	pub title: String,
	pub description: String,
	pub image_file: Option<String>,
	pub published_at: NaiveDateTime,
}

/// Changes applied by the edit form.
///
/// `image_file: None` keeps the stored reference.
#[derive(Debug, Clone)]
pub struct ArticleChanges {
	pub title: String,
	pub description: String,
	pub image_file: Option<String>,
	pub published_at: NaiveDateTime,
}

/// Parse the `published_at` form value
///
/// # Examples
///
/// ```
/// use newsdesk::models::{format_published_at_input, parse_published_at};
///
/// let ts = parse_published_at("2024-03-01T09:30").unwrap();
/// assert_eq!(format_published_at_input(&ts), "2024-03-01T09:30");
/// ```
pub fn parse_published_at(value: &str) -> Result<NaiveDateTime> {
	NaiveDateTime::parse_from_str(value, PUBLISHED_AT_INPUT_FORMAT).map_err(|source| {
		Error::InvalidTimestamp {
			value: value.to_string(),
			source,
		}
	})
}

pub fn format_published_at_input(ts: &NaiveDateTime) -> String {
	ts.format(PUBLISHED_AT_INPUT_FORMAT).to_string()
}

fn check_text(field: &str, value: &str, max_chars: usize) -> Result<()> {
	if value.trim().is_empty() {
		return Err(Error::Validation(format!("{field} is required")));
	}
	if value.chars().count() > max_chars {
		return Err(Error::Validation(format!(
			"{field} must be at most {max_chars} characters"
		)));
	}
	Ok(())
}

fn check_image(image_file: Option<&str>) -> Result<()> {
	match image_file {
		Some(path) if path.chars().count() > IMAGE_FILE_MAX_CHARS => Err(Error::Validation(
			format!("Image path must be at most {IMAGE_FILE_MAX_CHARS} characters"),
		)),
		_ => Ok(()),
	}
}

impl NewArticle {
	pub fn validate(&self) -> Result<()> {
		check_text("Title", &self.title, TITLE_MAX_CHARS)?;
		check_text("Description", &self.description, DESCRIPTION_MAX_CHARS)?;
		check_image(self.image_file.as_deref())
	}
}

impl ArticleChanges {
	pub fn validate(&self) -> Result<()> {
		check_text("Title", &self.title, TITLE_MAX_CHARS)?;
		check_text("Description", &self.description, DESCRIPTION_MAX_CHARS)?;
		check_image(self.image_file.as_deref())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::NaiveDate;
	use rstest::rstest;

	fn new_article(title: &str, description: &str) -> NewArticle {
		NewArticle {
			title: title.to_string(),
			description: description.to_string(),
			image_file: Some("uploads/a.png".to_string()),
			published_at: NaiveDate::from_ymd_opt(2024, 1, 2)
				.unwrap()
				.and_hms_opt(3, 4, 0)
				.unwrap(),
		}
	}

	#[rstest]
	fn test_parse_published_at() {
		let ts = parse_published_at("2024-01-02T03:04").unwrap();

		assert_eq!(ts, new_article("t", "d").published_at);
	}

	#[rstest]
	#[case("")]
	#[case("2024-01-02")]
	#[case("2024-01-02 03:04")]
	#[case("2024-13-02T03:04")]
	fn test_parse_published_at_rejects(#[case] value: &str) {
		assert!(matches!(
			parse_published_at(value),
			Err(Error::InvalidTimestamp { .. })
		));
	}

	#[rstest]
	#[case("T", "D", true)]
	#[case("  ", "D", false)]
	#[case("T", "", false)]
	#[case(&"x".repeat(200), "D", true)]
	#[case(&"x".repeat(201), "D", false)]
	#[case("T", &"é".repeat(500), true)]
	#[case("T", &"é".repeat(501), false)]
	fn test_validation(#[case] title: &str, #[case] description: &str, #[case] valid: bool) {
		assert_eq!(new_article(title, description).validate().is_ok(), valid);
	}
}
