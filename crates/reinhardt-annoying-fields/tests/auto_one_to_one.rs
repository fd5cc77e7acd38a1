//! Integration tests for the auto-creating one-to-one accessor
//!
//! Runs against an in-memory SQLite database through `sqlx::AnyPool`. The pool
//! holds a single connection, so the database lives for the whole test and
//! concurrent accessors queue on it.
//!
//! ## Test Coverage
//!
//! - First access creates exactly one row with column defaults
//! - Repeated access returns the cached object
//! - Existing rows are returned without inserting
//! - create_if_absent reports whether it inserted
//! - Two copies of the same owner racing for the pooled connection
//! - Unsaved owners and failing lookups

use std::sync::Arc;

use reinhardt_annoying_fields::prelude::*;
use reinhardt_annoying_fields::associations::AutoReverseOneToOneDescriptor;

// ========================================
// Test Fixtures
// ========================================

#[derive(Debug)]
struct User {
	id: Option<i64>,
	profile: RelatedCache<UserProfile>,
}

impl User {
	fn saved(id: i64) -> Self {
		Self {
			id: Some(id),
			profile: RelatedCache::new(),
		}
	}
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
struct UserProfile {
	id: i64,
	user_id: i64,
	bio: String,
}

impl Model for UserProfile {
	type PrimaryKey = i64;

	fn table_name() -> &'static str {
		"user_profiles"
	}

	fn model_name() -> &'static str {
		"UserProfile"
	}

	fn primary_key(&self) -> Option<i64> {
		Some(self.id)
	}
}

/// Row type for a table that is never created
#[derive(Debug, sqlx::FromRow)]
struct Missing {
	user_id: i64,
}

impl Model for Missing {
	type PrimaryKey = i64;

	fn table_name() -> &'static str {
		"missing_table"
	}

	fn model_name() -> &'static str {
		"Missing"
	}

	fn primary_key(&self) -> Option<i64> {
		Some(self.user_id)
	}
}

/// Owner whose related rows live in `missing_table`
struct Owner {
	missing: RelatedCache<Missing>,
}

impl Model for Owner {
	type PrimaryKey = i64;

	fn table_name() -> &'static str {
		"owners"
	}

	fn model_name() -> &'static str {
		"Owner"
	}

	fn primary_key(&self) -> Option<i64> {
		Some(10)
	}
}

async fn setup() -> DatabaseConnection {
	let db = DatabaseConnection::connect("sqlite::memory:").await.unwrap();
	db.execute(
		"CREATE TABLE user_profiles (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			user_id INTEGER NOT NULL UNIQUE,
			bio TEXT NOT NULL DEFAULT ''
		)",
	)
	.await
	.unwrap();
	db
}

fn profile_accessor() -> AutoReverseOneToOneDescriptor<User, UserProfile> {
	let field: AutoOneToOneField<User> =
		AutoOneToOneField::new("user_id").on_delete(CascadeAction::Cascade);
	field.contribute_to_related_class(|u: &User| &u.profile)
}

async fn profile_count(db: &DatabaseConnection, user_id: i64) -> i64 {
	sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_profiles WHERE user_id = ?")
		.bind(user_id)
		.fetch_one(db.pool())
		.await
		.unwrap()
}

// ========================================
// Tests
// ========================================

#[tokio::test]
async fn test_first_access_creates_row() {
	let db = setup().await;
	let accessor = profile_accessor();
	let user = User::saved(1);

	assert_eq!(profile_count(&db, 1).await, 0);

	let profile = accessor.get(&user, &db).await.unwrap();
	assert_eq!(profile.user_id, 1);
	assert_eq!(profile.bio, "");
	assert_eq!(profile_count(&db, 1).await, 1);
	assert!(user.profile.is_cached());
}

#[tokio::test]
async fn test_second_access_returns_cached_object() {
	let db = setup().await;
	let accessor = profile_accessor();
	let user = User::saved(2);

	let first = accessor.get(&user, &db).await.unwrap();
	let second = accessor.get(&user, &db).await.unwrap();

	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(profile_count(&db, 2).await, 1);
}

#[tokio::test]
async fn test_existing_row_is_returned_without_insert() {
	let db = setup().await;
	db.execute("INSERT INTO user_profiles (user_id, bio) VALUES (3, 'hello')")
		.await
		.unwrap();

	let accessor = profile_accessor();
	let user = User::saved(3);
	let profile = accessor.get(&user, &db).await.unwrap();

	assert_eq!(profile.bio, "hello");
	assert_eq!(profile_count(&db, 3).await, 1);
}

#[tokio::test]
async fn test_fresh_instance_reads_row_created_earlier() {
	let db = setup().await;
	let accessor = profile_accessor();

	let created = accessor.get(&User::saved(4), &db).await.unwrap();
	let reread = accessor.get(&User::saved(4), &db).await.unwrap();

	assert!(!Arc::ptr_eq(&created, &reread));
	assert_eq!(created.id, reread.id);
	assert_eq!(profile_count(&db, 4).await, 1);
}

#[tokio::test]
async fn test_create_if_absent_reports_insert() {
	let db = setup().await;
	let accessor = profile_accessor();
	let user = User::saved(5);

	assert!(accessor.create_if_absent(&user, &db).await.unwrap());
	assert!(!accessor.create_if_absent(&user, &db).await.unwrap());
	assert_eq!(profile_count(&db, 5).await, 1);
	// Only the database was touched
	assert!(!user.profile.is_cached());
}

#[tokio::test]
async fn test_queued_first_access_leaves_one_row() {
	let db = setup().await;
	let accessor = profile_accessor();
	let a = User::saved(6);
	let b = User::saved(6);

	let (pa, pb) = tokio::join!(accessor.get(&a, &db), accessor.get(&b, &db));
	let (pa, pb) = (pa.unwrap(), pb.unwrap());

	assert_eq!(pa.id, pb.id);
	assert_eq!(profile_count(&db, 6).await, 1);
}

#[tokio::test]
async fn test_unsaved_instance_fails() {
	let db = setup().await;
	let accessor = profile_accessor();
	let user = User {
		id: None,
		profile: RelatedCache::new(),
	};

	let err = accessor.get(&user, &db).await.unwrap_err();
	assert!(matches!(err, RelationError::UnsavedInstance { model: "User" }));

	let err = accessor.create_if_absent(&user, &db).await.unwrap_err();
	assert!(matches!(err, RelationError::UnsavedInstance { .. }));
}

#[tokio::test]
async fn test_standard_accessor_does_not_create() {
	let db = setup().await;
	let accessor = profile_accessor();
	let user = User::saved(7);

	let err = accessor.standard().get(&user, &db).await.unwrap_err();
	assert!(err.is_does_not_exist());
	assert_eq!(err.to_string(), "UserProfile matching query does not exist");
	assert_eq!(profile_count(&db, 7).await, 0);
	assert!(!user.profile.is_cached());
}

#[tokio::test]
async fn test_preset_cache_skips_database() {
	let db = setup().await;
	let accessor = profile_accessor();
	let user = User::saved(8);

	let preset = accessor.standard().set(
		&user,
		UserProfile {
			id: 99,
			user_id: 8,
			bio: "preset".to_string(),
		},
	);
	let got = accessor.get(&user, &db).await.unwrap();

	assert!(Arc::ptr_eq(&preset, &got));
	assert_eq!(profile_count(&db, 8).await, 0);
}

#[tokio::test]
async fn test_database_error_propagates_and_rolls_back() {
	let db = setup().await;

	let accessor: AutoReverseOneToOneDescriptor<Owner, Missing> =
		AutoReverseOneToOneDescriptor::new("user_id", |o: &Owner| &o.missing);
	let owner = Owner {
		missing: RelatedCache::new(),
	};

	let err = accessor.get(&owner, &db).await.unwrap_err();
	assert!(matches!(err, RelationError::Database(_)));
	assert!(!owner.missing.is_cached());

	// The connection is usable again after the rollback
	assert_eq!(profile_count(&db, 10).await, 0);
}
