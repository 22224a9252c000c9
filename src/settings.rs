//! Runtime configuration.
//!
//! Every setting is read from a `NEWSDESK_`-prefixed environment variable.
//! Credentials and the signing key have no defaults and must be supplied.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Prefix shared by all variables
pub const ENV_PREFIX: &str = "NEWSDESK_";

const MIN_SECRET_KEY_BYTES: usize = 16;

/// Environment variable reader with prefix support
#[derive(Debug, Clone, Default)]
pub struct Env {
	pub prefix: Option<String>,
}

impl Env {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());
		self
	}

	fn key_name(&self, key: &str) -> String {
		match &self.prefix {
			Some(prefix) => format!("{prefix}{key}"),
			None => key.to_string(),
		}
	}

	/// Read a required string value
	pub fn str(&self, key: &str) -> Result<String, EnvError> {
		self.str_with_default(key, None)
	}

	/// Read a string value with a default
	pub fn str_with_default(&self, key: &str, default: Option<&str>) -> Result<String, EnvError> {
		let full_key = self.key_name(key);
		match env::var(&full_key) {
			Ok(val) => Ok(val),
			Err(_) => default
				.map(str::to_string)
				.ok_or(EnvError::MissingVariable(full_key)),
		}
	}

	/// Read and parse a value, falling back to `default` when unset
	pub fn parse_with_default<T>(&self, key: &str, default: T) -> Result<T, EnvError>
	where
		T: FromStr,
		T::Err: std::fmt::Display,
	{
		let full_key = self.key_name(key);
		match env::var(&full_key) {
			Ok(val) => val.trim().parse::<T>().map_err(|e| EnvError::ParseError {
				key: full_key,
				value_len: val.len(),
				error: e.to_string(),
			}),
			Err(_) => Ok(default),
		}
	}
}

/// Environment variable errors
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
	#[error("Missing environment variable: {0}")]
	MissingVariable(String),

	#[error("Failed to parse environment variable '{key}' (value length: {value_len}): {error}")]
	ParseError {
		key: String,
		// Length only, so secrets never end up in logs
		value_len: usize,
		error: String,
	},
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error(transparent)]
	Env(#[from] EnvError),

	#[error("Invalid setting {key}: {reason}")]
	Invalid { key: &'static str, reason: String },
}

/// Application settings
#[derive(Clone)]
pub struct Settings {
	pub bind: SocketAddr,
	pub database_url: String,
	/// Root served under `/static/`
	pub static_dir: PathBuf,
	/// Upload directory, relative to `static_dir`
	pub upload_subdir: String,
	pub admin_username: String,
	pub admin_password: String,
	pub secret_key: String,
	pub auth_realm: String,
	pub max_body_bytes: usize,
	pub shutdown_grace: Duration,
}

impl std::fmt::Debug for Settings {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Settings")
			.field("bind", &self.bind)
			.field("database_url", &self.database_url)
			.field("static_dir", &self.static_dir)
			.field("upload_subdir", &self.upload_subdir)
			.field("admin_username", &self.admin_username)
			.field("admin_password", &"<redacted>")
			.field("secret_key", &"<redacted>")
			.field("auth_realm", &self.auth_realm)
			.field("max_body_bytes", &self.max_body_bytes)
			.field("shutdown_grace", &self.shutdown_grace)
			.finish()
	}
}

impl Settings {
	/// Defaults plus the given credentials; used by tests and embedders
	pub fn with_credentials(
		admin_username: impl Into<String>,
		admin_password: impl Into<String>,
		secret_key: impl Into<String>,
	) -> Self {
		Self {
			bind: SocketAddr::from(([0, 0, 0, 0], 5673)),
			database_url: "sqlite://articles.db".to_string(),
			static_dir: PathBuf::from("static"),
			upload_subdir: "uploads".to_string(),
			admin_username: admin_username.into(),
			admin_password: admin_password.into(),
			secret_key: secret_key.into(),
			auth_realm: "newsdesk".to_string(),
			max_body_bytes: newsdesk_http::server::DEFAULT_MAX_BODY_BYTES,
			shutdown_grace: Duration::from_secs(30),
		}
	}

	/// Load from the process environment and validate
	pub fn from_env() -> Result<Self, SettingsError> {
		Self::from_env_with(&Env::new().with_prefix(ENV_PREFIX))
	}

	pub fn from_env_with(env: &Env) -> Result<Self, SettingsError> {
		let defaults = Self::with_credentials("", "", "");
		let settings = Self {
			bind: env.parse_with_default("BIND", defaults.bind)?,
			database_url: env.str_with_default("DATABASE_URL", Some(&defaults.database_url))?,
			static_dir: PathBuf::from(env.str_with_default("STATIC_DIR", Some("static"))?),
			upload_subdir: env.str_with_default("UPLOAD_SUBDIR", Some(&defaults.upload_subdir))?,
			admin_username: env.str("ADMIN_USERNAME")?,
			admin_password: env.str("ADMIN_PASSWORD")?,
			secret_key: env.str("SECRET_KEY")?,
			auth_realm: env.str_with_default("AUTH_REALM", Some(&defaults.auth_realm))?,
			max_body_bytes: env.parse_with_default("MAX_BODY_BYTES", defaults.max_body_bytes)?,
			shutdown_grace: Duration::from_secs(
				env.parse_with_default("SHUTDOWN_GRACE_SECS", defaults.shutdown_grace.as_secs())?,
			),
		};
		settings.validate()?;
		Ok(settings)
	}

	/// Reject configurations the server cannot run safely with
	pub fn validate(&self) -> Result<(), SettingsError> {
		let invalid = |key, reason: &str| {
			Err(SettingsError::Invalid {
				key,
				reason: reason.to_string(),
			})
		};
		if self.admin_username.trim().is_empty() {
			return invalid("ADMIN_USERNAME", "must not be empty");
		}
		if self.admin_username.contains(':') {
			return invalid("ADMIN_USERNAME", "must not contain ':'");
		}
		if self.admin_password.is_empty() {
			return invalid("ADMIN_PASSWORD", "must not be empty");
		}
		if self.secret_key.len() < MIN_SECRET_KEY_BYTES {
			return invalid("SECRET_KEY", "must be at least 16 bytes");
		}
		if self.upload_subdir.is_empty()
			|| self.upload_subdir.starts_with('/')
			|| self.upload_subdir.split('/').any(|s| s == "..")
		{
			return invalid("UPLOAD_SUBDIR", "must be a relative path inside the static root");
		}
		if self.max_body_bytes == 0 {
			return invalid("MAX_BODY_BYTES", "must be greater than zero");
		}
		Ok(())
	}

	/// Directory uploaded images are written to
	pub fn upload_dir(&self) -> PathBuf {
		self.static_dir.join(&self.upload_subdir)
	}
}
