//! Reverse one-to-one accessors
//!
//! [`ReverseOneToOneDescriptor`] is the standard lookup from the owning model
//! to its dependent row. [`AutoReverseOneToOneDescriptor`] wraps it and
//! creates the row when the lookup comes back empty.

use std::fmt;
use std::sync::Arc;

use sea_query::{
	Alias, Asterisk, Expr, ExprTrait, InsertStatement, OnConflict, Query, SelectStatement,
};
use sqlx::any::AnyRow;
use sqlx::{Any, AnyConnection, FromRow, Transaction};

use crate::connection::{DatabaseBackend, DatabaseConnection};
use crate::error::RelationError;
use crate::model::{Model, RelatedCache};

/// Standard reverse one-to-one accessor
///
/// Reads the cache slot on the owning instance first and only queries the
/// database when it is empty. A missing row is reported as
/// [`RelationError::DoesNotExist`].
pub struct ReverseOneToOneDescriptor<T, R> {
	related_field: String,
	cache: fn(&T) -> &RelatedCache<R>,
}

impl<T, R> ReverseOneToOneDescriptor<T, R> {
	/// Accessor for rows of `R` whose `related_field` column holds the owner's key
	pub fn new(related_field: impl Into<String>, cache: fn(&T) -> &RelatedCache<R>) -> Self {
		Self {
			related_field: related_field.into(),
			cache,
		}
	}

	/// Column on the dependent table pointing back at the owner
	pub fn related_field(&self) -> &str {
		&self.related_field
	}

	/// Related object already loaded on `instance`, if any
	pub fn cached(&self, instance: &T) -> Option<Arc<R>> {
		(self.cache)(instance).get()
	}

	pub fn is_cached(&self, instance: &T) -> bool {
		(self.cache)(instance).is_cached()
	}

	/// Store `value` as the related object of `instance`
	///
	/// Returns the cached object, which is the existing one if the slot was
	/// already filled.
	pub fn set(&self, instance: &T, value: R) -> Arc<R> {
		(self.cache)(instance).set(Arc::new(value))
	}
}

impl<T, R> ReverseOneToOneDescriptor<T, R>
where
	T: Model,
	R: Model + for<'r> FromRow<'r, AnyRow> + Unpin,
{
	/// Look up the related object on a pooled connection
	pub async fn get(&self, instance: &T, db: &DatabaseConnection) -> Result<Arc<R>, RelationError> {
		if let Some(obj) = self.cached(instance) {
			return Ok(obj);
		}

		let mut conn = db.pool().acquire().await?;
		self.get_with(instance, db.backend(), &mut conn).await
	}

	pub(crate) async fn get_with(
		&self,
		instance: &T,
		backend: DatabaseBackend,
		conn: &mut AnyConnection,
	) -> Result<Arc<R>, RelationError> {
		let cache = (self.cache)(instance);
		if let Some(obj) = cache.get() {
			return Ok(obj);
		}

		let pk = owner_key(instance)?;
		let sql = backend.build_sql(&self.lookup_statement(pk));
		cache.get_or_try_init(|| fetch_one::<R>(sql, conn)).await
	}

	/// Insert a row holding only the back-reference unless one already exists
	///
	/// Every other column takes its database default. Returns `true` if this
	/// call inserted the row.
	pub(crate) async fn create_if_absent_with(
		&self,
		pk: T::PrimaryKey,
		backend: DatabaseBackend,
		conn: &mut AnyConnection,
	) -> Result<bool, RelationError> {
		let sql = backend.build_sql(&self.insert_statement(pk));
		tracing::trace!(sql = %sql, "create if absent");

		let result = sqlx::query(&sql).execute(conn).await?;
		Ok(result.rows_affected() > 0)
	}

	fn lookup_statement(&self, pk: T::PrimaryKey) -> SelectStatement {
		let pk: sea_query::Value = pk.into();
		Query::select()
			.column(Asterisk)
			.from(Alias::new(R::table_name()))
			.and_where(Expr::col(Alias::new(self.related_field.clone())).eq(pk))
			.limit(1)
			.to_owned()
	}

	fn insert_statement(&self, pk: T::PrimaryKey) -> InsertStatement {
		let pk: sea_query::Value = pk.into();
		Query::insert()
			.into_table(Alias::new(R::table_name()))
			.columns([Alias::new(self.related_field.clone())])
			.values_panic([pk.into()])
			.on_conflict(
				// MySQL has no DO NOTHING, it gets a self-assignment instead
				OnConflict::column(Alias::new(self.related_field.clone()))
					.do_nothing_on([Alias::new(self.related_field.clone())])
					.to_owned(),
			)
			.to_owned()
	}
}

impl<T, R> fmt::Debug for ReverseOneToOneDescriptor<T, R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReverseOneToOneDescriptor")
			.field("related_field", &self.related_field)
			.finish()
	}
}

/// Reverse one-to-one accessor that creates the related row on first read
///
/// # Examples
///
/// ```rust,no_run
/// use reinhardt_annoying_fields::associations::AutoOneToOneField;
/// use reinhardt_annoying_fields::connection::DatabaseConnection;
/// use reinhardt_annoying_fields::model::{Model, RelatedCache};
/// use std::sync::Arc;
///
/// struct User {
///     id: Option<i64>,
///     profile: RelatedCache<Profile>,
/// }
///
/// #[derive(sqlx::FromRow)]
/// struct Profile {
///     user_id: i64,
///     bio: String,
/// }
///
/// impl Model for User {
///     type PrimaryKey = i64;
///     fn table_name() -> &'static str { "auth_user" }
///     fn model_name() -> &'static str { "User" }
///     fn primary_key(&self) -> Option<i64> { self.id }
/// }
///
/// impl Model for Profile {
///     type PrimaryKey = i64;
///     fn table_name() -> &'static str { "profiles" }
///     fn model_name() -> &'static str { "Profile" }
///     fn primary_key_field() -> &'static str { "user_id" }
///     fn primary_key(&self) -> Option<i64> { Some(self.user_id) }
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let db = DatabaseConnection::connect("sqlite::memory:").await?;
/// let field: AutoOneToOneField<User> = AutoOneToOneField::new("user_id");
/// let profile = field.contribute_to_related_class(|u: &User| &u.profile);
///
/// let user = User { id: Some(1), profile: RelatedCache::new() };
/// let first = profile.get(&user, &db).await?;
/// let second = profile.get(&user, &db).await?;
/// assert!(Arc::ptr_eq(&first, &second));
/// # Ok(())
/// # }
/// ```
pub struct AutoReverseOneToOneDescriptor<T, R> {
	inner: ReverseOneToOneDescriptor<T, R>,
}

impl<T, R> AutoReverseOneToOneDescriptor<T, R> {
	pub fn new(related_field: impl Into<String>, cache: fn(&T) -> &RelatedCache<R>) -> Self {
		Self {
			inner: ReverseOneToOneDescriptor::new(related_field, cache),
		}
	}

	/// The standard accessor this one wraps
	pub fn standard(&self) -> &ReverseOneToOneDescriptor<T, R> {
		&self.inner
	}

	pub fn related_field(&self) -> &str {
		self.inner.related_field()
	}
}

impl<T, R> AutoReverseOneToOneDescriptor<T, R>
where
	T: Model,
	R: Model + for<'r> FromRow<'r, AnyRow> + Unpin,
{
	/// Get the related object, creating it if it does not exist yet
	///
	/// Runs in one transaction: standard lookup, then on a miss an
	/// insert-if-absent followed by a second standard lookup, so the object
	/// returned is always the one held in the instance's cache. Any error
	/// rolls the transaction back and is returned unchanged.
	pub async fn get(&self, instance: &T, db: &DatabaseConnection) -> Result<Arc<R>, RelationError> {
		if let Some(obj) = self.inner.cached(instance) {
			return Ok(obj);
		}
		let pk = owner_key(instance)?;

		let mut tx = db.begin().await?;
		let result = self.resolve(instance, pk, db.backend(), &mut tx).await;
		finish(tx, result).await
	}

	/// Insert the related row for `instance` unless it already exists
	///
	/// Returns `true` if a row was inserted by this call.
	pub async fn create_if_absent(
		&self,
		instance: &T,
		db: &DatabaseConnection,
	) -> Result<bool, RelationError> {
		let pk = owner_key(instance)?;

		let mut tx = db.begin().await?;
		let result = self
			.inner
			.create_if_absent_with(pk, db.backend(), &mut tx)
			.await;
		finish(tx, result).await
	}

	async fn resolve(
		&self,
		instance: &T,
		pk: T::PrimaryKey,
		backend: DatabaseBackend,
		conn: &mut AnyConnection,
	) -> Result<Arc<R>, RelationError> {
		match self.inner.get_with(instance, backend, conn).await {
			Err(RelationError::DoesNotExist { .. }) => self
				.create_missing(instance, pk, backend, conn)
				.await
				.map(|(obj, _)| obj),
			other => other,
		}
	}

	/// Insert-if-absent after a lookup miss, then look the row up again
	///
	/// The flag is `false` when another writer created the row between the
	/// miss and the insert.
	async fn create_missing(
		&self,
		instance: &T,
		pk: T::PrimaryKey,
		backend: DatabaseBackend,
		conn: &mut AnyConnection,
	) -> Result<(Arc<R>, bool), RelationError> {
		let created = self
			.inner
			.create_if_absent_with(pk.clone(), backend, conn)
			.await?;
		tracing::debug!(
			model = R::model_name(),
			owner = T::model_name(),
			pk = ?pk,
			created,
			"related object was missing"
		);

		let obj = self.inner.get_with(instance, backend, conn).await?;
		Ok((obj, created))
	}
}

impl<T, R> fmt::Debug for AutoReverseOneToOneDescriptor<T, R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AutoReverseOneToOneDescriptor")
			.field("related_field", &self.inner.related_field)
			.finish()
	}
}

/// Commit on success; on failure roll back and return the original error
async fn finish<V>(
	tx: Transaction<'static, Any>,
	result: Result<V, RelationError>,
) -> Result<V, RelationError> {
	match result {
		Ok(value) => {
			tx.commit().await?;
			Ok(value)
		}
		Err(e) => {
			if let Err(rollback_err) = tx.rollback().await {
				tracing::warn!(error = %rollback_err, original = %e, "rollback failed");
			}
			Err(e)
		}
	}
}

fn owner_key<T: Model>(instance: &T) -> Result<T::PrimaryKey, RelationError> {
	instance
		.primary_key()
		.ok_or(RelationError::UnsavedInstance {
			model: T::model_name(),
		})
}

async fn fetch_one<R>(sql: String, conn: &mut AnyConnection) -> Result<Arc<R>, RelationError>
where
	R: Model + for<'r> FromRow<'r, AnyRow> + Unpin,
{
	tracing::trace!(sql = %sql, "related object lookup");

	let row = sqlx::query_as::<Any, R>(&sql).fetch_optional(conn).await?;
	row.map(Arc::new).ok_or(RelationError::DoesNotExist {
		model: R::model_name(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	struct User {
		id: Option<i64>,
		profile: RelatedCache<Profile>,
	}

	impl Model for User {
		type PrimaryKey = i64;

		fn table_name() -> &'static str {
			"auth_user"
		}

		fn model_name() -> &'static str {
			"User"
		}

		fn primary_key(&self) -> Option<i64> {
			self.id
		}
	}

	#[derive(Debug, sqlx::FromRow)]
	struct Profile {
		user_id: i64,
	}

	impl Model for Profile {
		type PrimaryKey = i64;

		fn table_name() -> &'static str {
			"profiles"
		}

		fn model_name() -> &'static str {
			"Profile"
		}

		fn primary_key_field() -> &'static str {
			"user_id"
		}

		fn primary_key(&self) -> Option<i64> {
			Some(self.user_id)
		}
	}

	fn descriptor() -> ReverseOneToOneDescriptor<User, Profile> {
		ReverseOneToOneDescriptor::new("user_id", |u: &User| &u.profile)
	}

	#[test]
	fn test_lookup_statement() {
		let sql = DatabaseBackend::Sqlite.build_sql(&descriptor().lookup_statement(7));
		assert!(sql.starts_with("SELECT *"));
		assert!(sql.contains("\"profiles\""));
		assert!(sql.contains("\"user_id\" = 7"));
		assert!(sql.contains("LIMIT 1"));
	}

	#[rstest]
	#[case(DatabaseBackend::Postgres, "ON CONFLICT (\"user_id\") DO NOTHING")]
	#[case(DatabaseBackend::Sqlite, "ON CONFLICT (\"user_id\") DO NOTHING")]
	#[case(DatabaseBackend::MySql, "ON DUPLICATE KEY UPDATE `user_id` = `user_id`")]
	fn test_insert_ignores_existing_row_per_backend(
		#[case] backend: DatabaseBackend,
		#[case] expected: &str,
	) {
		let sql = backend.build_sql(&descriptor().insert_statement(7));
		assert!(sql.ends_with(expected), "{sql}");
		assert!(!sql.contains("IGNORE"));
	}

	#[test]
	fn test_insert_statement_only_sets_back_reference() {
		let sql = DatabaseBackend::Postgres.build_sql(&descriptor().insert_statement(7));
		assert!(sql.starts_with("INSERT INTO \"profiles\" (\"user_id\")"));
		assert!(sql.contains("VALUES (7)"));
		assert!(sql.contains("ON CONFLICT (\"user_id\") DO NOTHING"));
	}

	#[test]
	fn test_set_populates_cache() {
		let user = User {
			id: Some(1),
			profile: RelatedCache::new(),
		};
		let desc = descriptor();
		assert!(!desc.is_cached(&user));

		let stored = desc.set(&user, Profile { user_id: 1 });
		assert!(desc.is_cached(&user));
		assert!(Arc::ptr_eq(&stored, &desc.cached(&user).unwrap()));
		assert_eq!(stored.primary_key(), Some(1));
	}

	#[test]
	fn test_owner_key_requires_saved_instance() {
		let user = User {
			id: None,
			profile: RelatedCache::new(),
		};
		let err = owner_key(&user).unwrap_err();
		assert!(matches!(err, RelationError::UnsavedInstance { model: "User" }));
	}

	async fn profiles_db() -> DatabaseConnection {
		let db = DatabaseConnection::connect("sqlite::memory:").await.unwrap();
		db.execute("CREATE TABLE profiles (user_id INTEGER NOT NULL UNIQUE)")
			.await
			.unwrap();
		db
	}

	#[tokio::test]
	async fn test_row_created_by_another_writer_after_miss() {
		let db = profiles_db().await;
		let auto: AutoReverseOneToOneDescriptor<User, Profile> =
			AutoReverseOneToOneDescriptor::new("user_id", |u: &User| &u.profile);
		let user = User {
			id: Some(3),
			profile: RelatedCache::new(),
		};
		let mut conn = db.pool().acquire().await.unwrap();

		let miss = auto
			.standard()
			.get_with(&user, db.backend(), &mut conn)
			.await
			.unwrap_err();
		assert!(miss.is_does_not_exist());
		assert!(!auto.standard().is_cached(&user));

		// Another writer inserts between the miss and our insert
		assert!(
			auto.standard()
				.create_if_absent_with(3, db.backend(), &mut conn)
				.await
				.unwrap()
		);

		let (profile, created) = auto
			.create_missing(&user, 3, db.backend(), &mut conn)
			.await
			.unwrap();
		assert!(!created);
		assert_eq!(profile.user_id, 3);
		assert!(Arc::ptr_eq(&profile, &auto.standard().cached(&user).unwrap()));

		let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE user_id = 3")
			.fetch_one(&mut *conn)
			.await
			.unwrap();
		assert_eq!(count, 1);
	}

	#[tokio::test]
	async fn test_failed_rollback_keeps_original_error() {
		let db = profiles_db().await;
		let mut tx = db.begin().await.unwrap();
		// End the transaction underneath sqlx so its own ROLLBACK has nothing to undo
		sqlx::query("ROLLBACK").execute(&mut *tx).await.unwrap();

		let result: Result<(), RelationError> = finish(
			tx,
			Err(RelationError::DoesNotExist { model: "Profile" }),
		)
		.await;

		assert!(matches!(
			result,
			Err(RelationError::DoesNotExist { model: "Profile" })
		));
	}
}
