//! Error types for field conversion, relation access and connections

use thiserror::Error;

/// Errors raised while converting a field value
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FieldError {
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("Deserialization error: {0}")]
	Deserialization(String),
}

impl From<serde_json::Error> for FieldError {
	fn from(err: serde_json::Error) -> Self {
		if err.is_data() || err.is_syntax() || err.is_eof() {
			FieldError::Deserialization(err.to_string())
		} else {
			FieldError::Serialization(err.to_string())
		}
	}
}

/// Errors raised while resolving a one-to-one relation
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RelationError {
	/// The standard lookup found no related row
	#[error("{model} matching query does not exist")]
	DoesNotExist { model: &'static str },

	/// The owning instance has no primary key yet
	#[error("{model} instance needs a primary key before related objects can be accessed")]
	UnsavedInstance { model: &'static str },

	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),
}

impl RelationError {
	/// Check whether this is the "related row is absent" case
	pub fn is_does_not_exist(&self) -> bool {
		matches!(self, RelationError::DoesNotExist { .. })
	}
}

/// Errors raised while opening a database connection
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConnectionError {
	#[error("Unsupported database URL scheme: {0}")]
	UnsupportedScheme(String),

	#[error("Invalid configuration value for {key}: {value}")]
	InvalidConfig { key: &'static str, value: String },

	#[error("Database connection error: {0}")]
	Database(#[from] sqlx::Error),
}
