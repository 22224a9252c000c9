//! SQLite-backed article persistence.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::Result;
use crate::models::{Article, ArticleChanges, NewArticle};

const SCHEMA: &[&str] = &[
	"CREATE TABLE IF NOT EXISTS articles (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		title VARCHAR(200) NOT NULL,
		description VARCHAR(500) NOT NULL,
		image_file VARCHAR(300) NULL,
		published_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
	)",
	"CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles (published_at)",
];

const COLUMNS: &str = "id, title, description, image_file, published_at";

/// Article store over a SQLite pool
#[derive(Debug, Clone)]
pub struct ArticleStore {
	pool: SqlitePool,
}

impl ArticleStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Open (creating if missing) the database at `url`
	pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
		let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
		let pool = SqlitePoolOptions::new()
			.max_connections(max_connections)
			.connect_with(options)
			.await?;
		Ok(Self::new(pool))
	}

	/// Private in-memory database, migrated.
	///
	/// The pool holds exactly one connection that is never recycled, since
	/// the data lives only as long as that connection.
	pub async fn in_memory() -> Result<Self> {
		let pool = SqlitePoolOptions::new()
			.min_connections(1)
			.max_connections(1)
			.idle_timeout(None)
			.max_lifetime(None)
			.connect("sqlite::memory:")
			.await?;
		let store = Self::new(pool);
		store.migrate().await?;
		Ok(store)
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	/// Create the schema if it does not exist yet
	pub async fn migrate(&self) -> Result<()> {
		for statement in SCHEMA {
			sqlx::query(statement).execute(&self.pool).await?;
		}
		Ok(())
	}

	/// All articles, most recently published first
	pub async fn list_newest_first(&self) -> Result<Vec<Article>> {
		let articles = sqlx::query_as::<_, Article>(&format!(
			"SELECT {COLUMNS} FROM articles ORDER BY published_at DESC, id DESC"
		))
		.fetch_all(&self.pool)
		.await?;
		Ok(articles)
	}

	pub async fn get(&self, id: i64) -> Result<Option<Article>> {
		let article =
			sqlx::query_as::<_, Article>(&format!("SELECT {COLUMNS} FROM articles WHERE id = ?"))
				.bind(id)
				.fetch_optional(&self.pool)
				.await?;
		Ok(article)
	}

	/// Insert a new article and return it with its assigned id
	pub async fn create(&self, new: &NewArticle) -> Result<Article> {
		new.validate()?;
		let article = sqlx::query_as::<_, Article>(&format!(
			"INSERT INTO articles (title, description, image_file, published_at)
			 VALUES (?, ?, ?, ?)
			 RETURNING {COLUMNS}"
		))
		.bind(&new.title)
		.bind(&new.description)
		.bind(&new.image_file)
		.bind(new.published_at)
		.fetch_one(&self.pool)
		.await?;
		tracing::debug!(article_id = article.id, "article created");
		Ok(article)
	}

	/// Apply `changes`; `None` when no article has this id
	pub async fn update(&self, id: i64, changes: &ArticleChanges) -> Result<Option<Article>> {
		changes.validate()?;
		let article = sqlx::query_as::<_, Article>(&format!(
			"UPDATE articles
			 SET title = ?, description = ?, image_file = COALESCE(?, image_file), published_at = ?
			 WHERE id = ?
			 RETURNING {COLUMNS}"
		))
		.bind(&changes.title)
		.bind(&changes.description)
		.bind(&changes.image_file)
		.bind(changes.published_at)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;
		if article.is_some() {
			tracing::debug!(article_id = id, "article updated");
		}
		Ok(article)
	}

	/// Delete by id; whether a row was removed
	pub async fn delete(&self, id: i64) -> Result<bool> {
		let result = sqlx::query("DELETE FROM articles WHERE id = ?")
			.bind(id)
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() > 0)
	}

	pub async fn count(&self) -> Result<i64> {
		let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
			.fetch_one(&self.pool)
			.await?;
		Ok(count)
	}

	pub async fn close(&self) {
		self.pool.close().await;
	}
}
