//! # Reinhardt Annoying Fields
//!
//! Two model fields that remove common boilerplate:
//!
//! - **AutoOneToOneField**: a one-to-one relation whose reverse accessor
//!   creates the dependent row on first access instead of failing with
//!   "does not exist".
//! - **JsonField**: a text column holding JSON, exposed to model code as
//!   `serde_json::Value`.
//!
//! ## AutoOneToOneField
//!
//! ```rust,no_run
//! use reinhardt_annoying_fields::prelude::*;
//!
//! struct User {
//!     id: Option<i64>,
//!     profile: RelatedCache<Profile>,
//! }
//!
//! #[derive(sqlx::FromRow)]
//! struct Profile {
//!     user_id: i64,
//!     home_page: String,
//! }
//!
//! impl Model for User {
//!     type PrimaryKey = i64;
//!     fn table_name() -> &'static str { "auth_user" }
//!     fn model_name() -> &'static str { "User" }
//!     fn primary_key(&self) -> Option<i64> { self.id }
//! }
//!
//! impl Model for Profile {
//!     type PrimaryKey = i64;
//!     fn table_name() -> &'static str { "profiles" }
//!     fn model_name() -> &'static str { "Profile" }
//!     fn primary_key_field() -> &'static str { "user_id" }
//!     fn primary_key(&self) -> Option<i64> { Some(self.user_id) }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseConnection::connect("sqlite::memory:").await?;
//! db.execute("CREATE TABLE profiles (user_id INTEGER PRIMARY KEY, home_page TEXT NOT NULL DEFAULT '')")
//!     .await?;
//!
//! let user_field: AutoOneToOneField<User> = AutoOneToOneField::new("user_id").primary_key(true);
//! let profile = user_field.contribute_to_related_class(|u: &User| &u.profile);
//!
//! let user = User { id: Some(1), profile: RelatedCache::new() };
//! // Created on the spot, no DoesNotExist
//! let p = profile.get(&user, &db).await?;
//! assert_eq!(p.home_page, "");
//! # Ok(())
//! # }
//! ```
//!
//! ## JsonField
//!
//! See [`json`] for conversion rules.
//!
//! ## Logging
//!
//! Events are emitted through `tracing`: SQL at `trace`, auto-creation at
//! `debug`, and undecodable JSON columns at `warn`.

pub mod associations;
pub mod connection;
pub mod error;
pub mod fields;
pub mod json;
pub mod model;

pub use associations::{
	AutoOneToOneField, AutoReverseOneToOneDescriptor, CascadeAction, ReverseOneToOneDescriptor,
	ReverseRelationship,
};
pub use connection::{DatabaseBackend, DatabaseConnection, DatabaseSettings};
pub use error::{ConnectionError, FieldError, RelationError};
pub use fields::{BaseField, Field, FieldDeconstruction, FieldKwarg, TextField};
pub use json::{JsonDefault, JsonField, JsonFieldValue};
pub use model::{Model, RelatedCache};

pub mod prelude {
	pub use crate::associations::{AutoOneToOneField, CascadeAction};
	pub use crate::connection::{DatabaseConnection, DatabaseSettings};
	pub use crate::error::{FieldError, RelationError};
	pub use crate::fields::Field;
	pub use crate::json::{JsonField, JsonFieldValue};
	pub use crate::model::{Model, RelatedCache};
}
