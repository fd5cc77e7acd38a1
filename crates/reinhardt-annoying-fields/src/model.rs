//! Model trait and per-instance related-object cache

use std::fmt;
use std::sync::Arc;

use tokio::sync::OnceCell;

/// Minimal model metadata needed to resolve relations
///
/// # Examples
///
/// ```
/// use reinhardt_annoying_fields::model::Model;
///
/// struct User {
///     id: Option<i64>,
/// }
///
/// impl Model for User {
///     type PrimaryKey = i64;
///     fn table_name() -> &'static str { "auth_user" }
///     fn model_name() -> &'static str { "User" }
///     fn primary_key(&self) -> Option<i64> { self.id }
/// }
///
/// assert_eq!(User::primary_key_field(), "id");
/// assert_eq!(User { id: Some(3) }.primary_key(), Some(3));
/// ```
pub trait Model: Send + Sync + 'static {
	/// Primary key type
	type PrimaryKey: Into<sea_query::Value> + Clone + fmt::Debug + Send + Sync;

	/// Database table name
	fn table_name() -> &'static str;

	/// Model name as written in code, e.g. `UserProfile`
	fn model_name() -> &'static str;

	/// Primary key column name
	fn primary_key_field() -> &'static str {
		"id"
	}

	/// Primary key value, `None` until the instance is saved
	fn primary_key(&self) -> Option<Self::PrimaryKey>;
}

/// Related-object slot stored on the owning instance
///
/// Once filled, every read returns a clone of the same `Arc`, so callers can
/// rely on `Arc::ptr_eq` for identity.
pub struct RelatedCache<R> {
	slot: OnceCell<Arc<R>>,
}

impl<R> RelatedCache<R> {
	pub fn new() -> Self {
		Self {
			slot: OnceCell::new(),
		}
	}

	/// Cached object, if any
	pub fn get(&self) -> Option<Arc<R>> {
		self.slot.get().cloned()
	}

	pub fn is_cached(&self) -> bool {
		self.slot.initialized()
	}

	/// Fill the slot unless it is already filled; returns the cached object
	pub fn set(&self, value: Arc<R>) -> Arc<R> {
		// An already cached object wins
		let _ = self.slot.set(value.clone());
		self.slot.get().cloned().unwrap_or(value)
	}

	/// Drop the cached object so the next access hits the database
	pub fn take(&mut self) -> Option<Arc<R>> {
		self.slot.take()
	}

	pub(crate) async fn get_or_try_init<E, F, Fut>(&self, init: F) -> Result<Arc<R>, E>
	where
		F: FnOnce() -> Fut,
		Fut: std::future::Future<Output = Result<Arc<R>, E>>,
	{
		self.slot.get_or_try_init(init).await.cloned()
	}
}

impl<R> Default for RelatedCache<R> {
	fn default() -> Self {
		Self::new()
	}
}

impl<R> Clone for RelatedCache<R> {
	fn clone(&self) -> Self {
		let cache = Self::new();
		if let Some(value) = self.get() {
			let _ = cache.slot.set(value);
		}
		cache
	}
}

impl<R: fmt::Debug> fmt::Debug for RelatedCache<R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RelatedCache")
			.field("cached", &self.slot.get())
			.finish()
	}
}
