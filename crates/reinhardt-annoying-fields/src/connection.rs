//! Database connection management
//!
//! A thin wrapper over `sqlx::AnyPool` that remembers which backend it talks
//! to, so sea-query statements can be rendered in the right dialect.

use std::sync::{Arc, Once};
use std::time::Duration;

use sea_query::{MysqlQueryBuilder, PostgresQueryBuilder, QueryStatementWriter, SqliteQueryBuilder};
use serde::{Deserialize, Serialize};
use sqlx::any::AnyPoolOptions;
use sqlx::{Any, AnyPool, Transaction};

use crate::error::ConnectionError;

static INIT_DRIVERS: Once = Once::new();

fn init_drivers() {
	INIT_DRIVERS.call_once(|| {
		sqlx::any::install_default_drivers();
	});
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseBackend {
	Postgres,
	MySql,
	Sqlite,
}

impl DatabaseBackend {
	/// Detect database backend type from URL
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_annoying_fields::connection::DatabaseBackend;
	///
	/// assert_eq!(DatabaseBackend::from_url("postgres://localhost/db").unwrap(), DatabaseBackend::Postgres);
	/// assert_eq!(DatabaseBackend::from_url("sqlite::memory:").unwrap(), DatabaseBackend::Sqlite);
	/// assert!(DatabaseBackend::from_url("redis://localhost").is_err());
	/// ```
	pub fn from_url(url: &str) -> Result<Self, ConnectionError> {
		if url.starts_with("postgres://") || url.starts_with("postgresql://") {
			Ok(DatabaseBackend::Postgres)
		} else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
			Ok(DatabaseBackend::MySql)
		} else if url.starts_with("sqlite:") {
			Ok(DatabaseBackend::Sqlite)
		} else {
			let scheme = url.split(':').next().unwrap_or(url);
			Err(ConnectionError::UnsupportedScheme(scheme.to_string()))
		}
	}

	/// Build SQL string for this backend
	pub fn build_sql<T>(&self, statement: &T) -> String
	where
		T: QueryStatementWriter,
	{
		match self {
			DatabaseBackend::Postgres => statement.to_string(PostgresQueryBuilder),
			DatabaseBackend::MySql => statement.to_string(MysqlQueryBuilder),
			DatabaseBackend::Sqlite => statement.to_string(SqliteQueryBuilder),
		}
	}
}

/// Database settings
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
	pub url: String,
	pub max_connections: u32,
	pub min_connections: u32,
	/// Seconds to wait for a pooled connection
	pub connect_timeout: u64,
	/// Seconds before an idle connection is closed, 0 keeps it forever
	pub idle_timeout: u64,
}

impl Default for DatabaseSettings {
	fn default() -> Self {
		Self {
			url: "sqlite::memory:".to_string(),
			max_connections: 10,
			min_connections: 1,
			connect_timeout: 30,
			idle_timeout: 600,
		}
	}
}

impl DatabaseSettings {
	/// Settings for `url` with default pool sizing
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_annoying_fields::connection::DatabaseSettings;
	///
	/// let settings = DatabaseSettings::new("postgres://localhost/app");
	/// assert_eq!(settings.url, "postgres://localhost/app");
	/// assert_eq!(settings.max_connections, 10);
	/// ```
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			..Self::default()
		}
	}

	pub fn max_connections(mut self, max: u32) -> Self {
		self.max_connections = max;
		self
	}

	pub fn min_connections(mut self, min: u32) -> Self {
		self.min_connections = min;
		self
	}

	/// Load settings from `DATABASE_URL` and `DATABASE_MAX_CONNECTIONS`
	pub fn from_env() -> Result<Self, ConnectionError> {
		let mut settings = Self::default();

		if let Ok(url) = std::env::var("DATABASE_URL") {
			settings.url = url;
		}

		if let Ok(max) = std::env::var("DATABASE_MAX_CONNECTIONS") {
			settings.max_connections =
				max.trim()
					.parse()
					.map_err(|_| ConnectionError::InvalidConfig {
						key: "DATABASE_MAX_CONNECTIONS",
						value: max.clone(),
					})?;
		}

		Ok(settings)
	}

	/// An in-memory SQLite database lives only as long as its connection
	pub fn is_in_memory(&self) -> bool {
		self.url.starts_with("sqlite:") && self.url.contains(":memory:")
	}
}

/// Pooled database connection
#[derive(Clone)]
pub struct DatabaseConnection {
	pool: Arc<AnyPool>,
	backend: DatabaseBackend,
}

impl DatabaseConnection {
	/// Connect with default settings
	///
	/// # Examples
	///
	/// ```rust,no_run
	/// use reinhardt_annoying_fields::connection::DatabaseConnection;
	///
	/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
	/// let conn = DatabaseConnection::connect("sqlite::memory:").await?;
	/// conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)").await?;
	/// # Ok(())
	/// # }
	/// ```
	pub async fn connect(url: &str) -> Result<Self, ConnectionError> {
		Self::connect_with(&DatabaseSettings::new(url)).await
	}

	pub async fn connect_with(settings: &DatabaseSettings) -> Result<Self, ConnectionError> {
		let backend = DatabaseBackend::from_url(&settings.url)?;
		init_drivers();

		let mut options = AnyPoolOptions::new()
			.acquire_timeout(Duration::from_secs(settings.connect_timeout));

		if settings.is_in_memory() {
			// Every extra connection would see a different empty database
			options = options
				.max_connections(1)
				.min_connections(1)
				.idle_timeout(None)
				.max_lifetime(None);
		} else {
			let idle = (settings.idle_timeout > 0).then(|| Duration::from_secs(settings.idle_timeout));
			options = options
				.max_connections(settings.max_connections)
				.min_connections(settings.min_connections)
				.idle_timeout(idle);
		}

		let pool = options.connect(&settings.url).await?;
		tracing::debug!(?backend, "database pool ready");

		Ok(Self {
			pool: Arc::new(pool),
			backend,
		})
	}

	/// Create a connection from an existing pool
	pub fn from_pool(pool: Arc<AnyPool>, database_url: &str) -> Result<Self, ConnectionError> {
		Ok(Self {
			pool,
			backend: DatabaseBackend::from_url(database_url)?,
		})
	}

	pub fn backend(&self) -> DatabaseBackend {
		self.backend
	}

	pub fn pool(&self) -> &AnyPool {
		&self.pool
	}

	/// Build SQL string for the current database backend
	pub fn build_sql<T>(&self, statement: &T) -> String
	where
		T: QueryStatementWriter,
	{
		self.backend.build_sql(statement)
	}

	/// Execute a statement outside of any transaction
	pub async fn execute(&self, sql: &str) -> Result<u64, sqlx::Error> {
		tracing::trace!(sql, "execute");
		let result = sqlx::query(sql).execute(&*self.pool).await?;
		Ok(result.rows_affected())
	}

	/// Begin a database transaction
	pub async fn begin(&self) -> Result<Transaction<'static, Any>, sqlx::Error> {
		self.pool.begin().await
	}
}

impl std::fmt::Debug for DatabaseConnection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DatabaseConnection")
			.field("backend", &self.backend)
			.finish()
	}
}
