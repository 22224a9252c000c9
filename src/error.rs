//! Application error type and its mapping onto HTTP statuses.

use crate::grouping::GroupingError;
use crate::settings::SettingsError;
use crate::storage::StorageError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),

	#[error("Template error: {0}")]
	Template(#[from] tera::Error),

	#[error(transparent)]
	Settings(#[from] SettingsError),

	#[error(transparent)]
	Grouping(#[from] GroupingError),

	#[error("Invalid publish time {value:?}: {source}")]
	InvalidTimestamp {
		value: String,
		#[source]
		source: chrono::ParseError,
	},

	#[error("{0}")]
	Validation(String),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error(transparent)]
	Http(#[from] newsdesk_http::Error),
}

impl Error {
	pub fn not_found(what: impl Into<String>) -> Self {
		Error::NotFound(what.into())
	}
}

impl From<Error> for newsdesk_http::Error {
	fn from(error: Error) -> Self {
		match error {
			Error::Http(inner) => inner,
			Error::NotFound(what) => newsdesk_http::Error::NotFound(what),
			Error::Validation(message) => newsdesk_http::Error::BadRequest(message),
			other => newsdesk_http::Error::Internal(other.to_string()),
		}
	}
}
