//! # Reinhardt Annoying
//!
//! Small helpers that take the boilerplate out of Reinhardt models.
//!
//! ## Feature Flags
//!
//! - `full` (default) - Everything below
//! - `json` - [`JsonField`], a text column holding JSON
//! - `auto-one-to-one` - [`AutoOneToOneField`], a one-to-one relation that
//!   creates the related row on first access (implies `connection`)
//! - `connection` - Pooled `sqlx` connection and [`DatabaseSettings`]
//!
//! ## Quick Example
//!
//! ```rust
//! use reinhardt_annoying::prelude::*;
//! use serde_json::json;
//!
//! let settings = JsonField::new().null(true);
//! let stored = settings
//!     .get_db_prep_save(&JsonFieldValue::from(json!({"theme": "dark"})))
//!     .unwrap();
//! assert_eq!(stored.as_deref(), Some("{\n  \"theme\": \"dark\"\n}"));
//! ```

// Module re-exports following Django's structure
#[cfg(feature = "auto-one-to-one")]
pub mod associations {
	pub use reinhardt_annoying_fields::associations::*;
}
#[cfg(feature = "connection")]
pub mod connection {
	pub use reinhardt_annoying_fields::connection::*;
}
pub mod error {
	pub use reinhardt_annoying_fields::error::*;
}
#[cfg(any(feature = "json", feature = "auto-one-to-one"))]
pub mod fields {
	pub use reinhardt_annoying_fields::fields::*;
}
#[cfg(feature = "json")]
pub mod json {
	pub use reinhardt_annoying_fields::json::*;
}
#[cfg(feature = "auto-one-to-one")]
pub mod model {
	pub use reinhardt_annoying_fields::model::*;
}

#[cfg(feature = "auto-one-to-one")]
pub use reinhardt_annoying_fields::{
	AutoOneToOneField, AutoReverseOneToOneDescriptor, CascadeAction, Model, RelatedCache,
	ReverseOneToOneDescriptor,
};
#[cfg(feature = "connection")]
pub use reinhardt_annoying_fields::{DatabaseBackend, DatabaseConnection, DatabaseSettings};
pub use reinhardt_annoying_fields::{ConnectionError, FieldError, RelationError};
#[cfg(feature = "json")]
pub use reinhardt_annoying_fields::{JsonDefault, JsonField, JsonFieldValue};

pub mod prelude {
	pub use crate::{FieldError, RelationError};

	#[cfg(feature = "auto-one-to-one")]
	pub use crate::{AutoOneToOneField, CascadeAction, Model, RelatedCache};
	#[cfg(feature = "connection")]
	pub use crate::{DatabaseConnection, DatabaseSettings};
	#[cfg(any(feature = "json", feature = "auto-one-to-one"))]
	pub use reinhardt_annoying_fields::fields::Field;
	#[cfg(feature = "json")]
	pub use crate::{JsonField, JsonFieldValue};
}
