//! JSON-backed text field
//!
//! `JsonField` stores structured values in a plain text column. Objects and
//! arrays are serialized on the way in and deserialized on the way out, so
//! model code works with `serde_json::Value` instead of strings.
//!
//! Reading is lenient: an empty column reads as [`JsonFieldValue::Null`] and a
//! column that cannot be decoded is handed back untouched as
//! [`JsonFieldValue::Raw`] instead of failing the whole row.
//!
//! # Examples
//!
//! ```
//! use reinhardt_annoying_fields::json::{JsonField, JsonFieldValue};
//! use serde_json::json;
//!
//! let field = JsonField::new().null(true).blank(true);
//!
//! let value = JsonFieldValue::from(json!({"title": "test", "type": 3}));
//! let stored = field.get_db_prep_save(&value).unwrap();
//! assert_eq!(
//!     stored.as_deref(),
//!     Some("{\n  \"title\": \"test\",\n  \"type\": 3\n}")
//! );
//!
//! assert_eq!(field.from_db_value(stored), value);
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::FieldError;
use crate::fields::{BaseField, Field, FieldDeconstruction, FieldKwarg, TextField};

/// Converts a structured value into its stored text form
pub type Serializer = Arc<dyn Fn(&Value) -> Result<String, FieldError> + Send + Sync>;

/// Converts stored text back into a structured value
pub type Deserializer = Arc<dyn Fn(&str) -> Result<Value, FieldError> + Send + Sync>;

const DEFAULT_SERIALIZER_NAME: &str = "reinhardt_annoying_fields::json::dumps";
const DEFAULT_DESERIALIZER_NAME: &str = "reinhardt_annoying_fields::json::loads";

/// In-memory value of a [`JsonField`]
#[derive(Debug, Clone, PartialEq)]
pub enum JsonFieldValue {
	/// No value (empty column, SQL NULL or JSON `null`)
	Null,
	/// A decoded JSON value
	Value(Value),
	/// Stored text that the deserializer rejected, passed through as-is
	///
	/// A plain JSON string is stored without quotes, so it reads back here
	/// rather than as `Value(String)`. Compare through [`to_json`] when the
	/// variant does not matter.
	///
	/// [`to_json`]: JsonFieldValue::to_json
	Raw(String),
}

impl JsonFieldValue {
	pub fn is_null(&self) -> bool {
		matches!(self, JsonFieldValue::Null)
	}

	/// Borrow the decoded value, if there is one
	pub fn as_value(&self) -> Option<&Value> {
		match self {
			JsonFieldValue::Value(v) => Some(v),
			_ => None,
		}
	}

	/// JSON view of this value; raw text becomes a JSON string
	pub fn to_json(&self) -> Value {
		match self {
			JsonFieldValue::Null => Value::Null,
			JsonFieldValue::Value(v) => v.clone(),
			JsonFieldValue::Raw(s) => Value::String(s.clone()),
		}
	}
}

impl From<Value> for JsonFieldValue {
	fn from(value: Value) -> Self {
		match value {
			Value::Null => JsonFieldValue::Null,
			other => JsonFieldValue::Value(other),
		}
	}
}

impl From<Option<Value>> for JsonFieldValue {
	fn from(value: Option<Value>) -> Self {
		value.map_or(JsonFieldValue::Null, JsonFieldValue::from)
	}
}

/// Default value of a [`JsonField`]
#[derive(Clone)]
pub enum JsonDefault {
	Value(Value),
	Callable {
		name: String,
		func: Arc<dyn Fn() -> Value + Send + Sync>,
	},
}

impl fmt::Debug for JsonDefault {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			JsonDefault::Value(v) => f.debug_tuple("Value").field(v).finish(),
			JsonDefault::Callable { name, .. } => f.debug_tuple("Callable").field(name).finish(),
		}
	}
}

/// Default serializer: keys sorted at every level, two-space indent
///
/// # Examples
///
/// ```
/// use reinhardt_annoying_fields::json::dumps;
/// use serde_json::json;
///
/// let text = dumps(&json!({"b": 1, "a": [true, null]})).unwrap();
/// assert_eq!(text, "{\n  \"a\": [\n    true,\n    null\n  ],\n  \"b\": 1\n}");
/// ```
pub fn dumps(value: &Value) -> Result<String, FieldError> {
	serde_json::to_string_pretty(&sort_keys(value))
		.map_err(|e| FieldError::Serialization(e.to_string()))
}

/// Default deserializer
pub fn loads(value: &str) -> Result<Value, FieldError> {
	serde_json::from_str(value).map_err(|e| FieldError::Deserialization(e.to_string()))
}

// Rebuilds objects in key order so the output does not depend on
// serde_json's map backend.
fn sort_keys(value: &Value) -> Value {
	match value {
		Value::Object(map) => {
			let mut entries: Vec<_> = map.iter().collect();
			entries.sort_by(|a, b| a.0.cmp(b.0));
			Value::Object(
				entries
					.into_iter()
					.map(|(k, v)| (k.clone(), sort_keys(v)))
					.collect(),
			)
		}
		Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
		other => other.clone(),
	}
}

/// JsonField - text column holding JSON
#[derive(Clone)]
pub struct JsonField {
	pub base: BaseField,
	serializer_name: String,
	serializer: Serializer,
	deserializer_name: String,
	deserializer: Deserializer,
	default: Option<JsonDefault>,
}

impl Default for JsonField {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for JsonField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("JsonField")
			.field("base", &self.base)
			.field("serializer", &self.serializer_name)
			.field("deserializer", &self.deserializer_name)
			.field("default", &self.default)
			.finish()
	}
}

impl JsonField {
	/// Create a JsonField using the default serializer and deserializer
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_annoying_fields::json::JsonField;
	///
	/// let field = JsonField::new();
	/// assert!(!field.base.null);
	/// assert!(!field.has_default());
	/// ```
	pub fn new() -> Self {
		Self {
			base: BaseField::new(),
			serializer_name: DEFAULT_SERIALIZER_NAME.to_string(),
			serializer: Arc::new(dumps),
			deserializer_name: DEFAULT_DESERIALIZER_NAME.to_string(),
			deserializer: Arc::new(loads),
			default: None,
		}
	}

	pub fn null(mut self, null: bool) -> Self {
		self.base.null = null;
		self
	}

	pub fn blank(mut self, blank: bool) -> Self {
		self.base.blank = blank;
		self
	}

	pub fn db_column(mut self, column: impl Into<String>) -> Self {
		self.base.db_column = Some(column.into());
		self
	}

	/// Replace the serializer
	///
	/// `name` is recorded by [`Field::deconstruct`] so migrations can refer to
	/// the function.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_annoying_fields::json::{JsonField, JsonFieldValue};
	/// use serde_json::json;
	///
	/// let field = JsonField::new().serializer("compact", |v| Ok(v.to_string()));
	/// let stored = field.get_prep_value(&JsonFieldValue::from(json!([1, 2]))).unwrap();
	/// assert_eq!(stored.as_deref(), Some("[1,2]"));
	/// ```
	pub fn serializer<F>(mut self, name: impl Into<String>, serializer: F) -> Self
	where
		F: Fn(&Value) -> Result<String, FieldError> + Send + Sync + 'static,
	{
		self.serializer_name = name.into();
		self.serializer = Arc::new(serializer);
		self
	}

	/// Replace the deserializer
	pub fn deserializer<F>(mut self, name: impl Into<String>, deserializer: F) -> Self
	where
		F: Fn(&str) -> Result<Value, FieldError> + Send + Sync + 'static,
	{
		self.deserializer_name = name.into();
		self.deserializer = Arc::new(deserializer);
		self
	}

	/// Set a constant default value
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_annoying_fields::json::{JsonField, JsonFieldValue};
	/// use serde_json::json;
	///
	/// let field = JsonField::new().with_default(json!({}));
	/// assert_eq!(field.get_default(), JsonFieldValue::Value(json!({})));
	/// ```
	pub fn with_default(mut self, value: Value) -> Self {
		self.base.default = Some(FieldKwarg::Json(value.clone()));
		self.default = Some(JsonDefault::Value(value));
		self
	}

	/// Set a default produced by calling `func` each time one is needed
	pub fn default_fn<F>(mut self, name: impl Into<String>, func: F) -> Self
	where
		F: Fn() -> Value + Send + Sync + 'static,
	{
		let name = name.into();
		self.base.default = Some(FieldKwarg::Callable(name.clone()));
		self.default = Some(JsonDefault::Callable {
			name,
			func: Arc::new(func),
		});
		self
	}

	pub fn has_default(&self) -> bool {
		self.default.is_some()
	}

	/// Convert stored text into the in-memory value
	///
	/// An empty string is treated as "no value". If the deserializer rejects
	/// the text, the text itself is returned as [`JsonFieldValue::Raw`].
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_annoying_fields::json::{JsonField, JsonFieldValue};
	/// use serde_json::json;
	///
	/// let field = JsonField::new();
	/// assert_eq!(field.to_python(""), JsonFieldValue::Null);
	/// assert_eq!(field.to_python("[1, 2]"), JsonFieldValue::Value(json!([1, 2])));
	/// assert_eq!(field.to_python("not json"), JsonFieldValue::Raw("not json".into()));
	/// ```
	pub fn to_python(&self, value: &str) -> JsonFieldValue {
		if value.is_empty() {
			return JsonFieldValue::Null;
		}

		match (self.deserializer)(value) {
			Ok(decoded) => JsonFieldValue::from(decoded),
			Err(e) => {
				tracing::warn!(
					field = self.base.name.as_deref().unwrap_or("<unnamed>"),
					error = %e,
					"stored value is not valid JSON, returning it unchanged"
				);
				JsonFieldValue::Raw(value.to_string())
			}
		}
	}

	/// Convert a column value read from the database
	pub fn from_db_value(&self, value: Option<String>) -> JsonFieldValue {
		match value {
			Some(text) => self.to_python(&text),
			None => JsonFieldValue::Null,
		}
	}

	/// Convert the in-memory value into the text to store
	///
	/// Objects and arrays always go through the serializer. Any other value is
	/// handed to the plain text conversion unchanged, and empty strings are
	/// stored as NULL.
	pub fn get_prep_value(&self, value: &JsonFieldValue) -> Result<Option<String>, FieldError> {
		match value {
			JsonFieldValue::Null => Ok(None),
			JsonFieldValue::Raw(text) if text.is_empty() => Ok(None),
			JsonFieldValue::Raw(text) => Ok(Some(text.clone())),
			JsonFieldValue::Value(Value::String(text)) if text.is_empty() => Ok(None),
			JsonFieldValue::Value(v @ (Value::Object(_) | Value::Array(_))) => {
				(self.serializer)(v).map(Some)
			}
			JsonFieldValue::Value(other) => Ok(TextField::get_prep_value(other)),
		}
	}

	/// Convert the in-memory value for an INSERT/UPDATE
	pub fn get_db_prep_save(&self, value: &JsonFieldValue) -> Result<Option<String>, FieldError> {
		self.get_prep_value(value)
	}

	/// Default value for new instances
	///
	/// Returns the structured default as-is (or the result of calling it),
	/// never its serialized text. Without a default this is
	/// [`JsonFieldValue::Null`].
	pub fn get_default(&self) -> JsonFieldValue {
		match &self.default {
			Some(JsonDefault::Value(v)) => JsonFieldValue::from(v.clone()),
			Some(JsonDefault::Callable { func, .. }) => JsonFieldValue::from(func()),
			None => JsonFieldValue::Null,
		}
	}

	/// Text shown outside of storage, e.g. in forms and fixtures
	///
	/// Always goes through the serializer, `Null` included, except that a
	/// nullable field holding `Null` renders nothing.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_annoying_fields::json::{JsonField, JsonFieldValue};
	///
	/// let strict = JsonField::new();
	/// assert_eq!(strict.value_from_object(&JsonFieldValue::Null).unwrap().as_deref(), Some("null"));
	///
	/// let nullable = JsonField::new().null(true);
	/// assert_eq!(nullable.value_from_object(&JsonFieldValue::Null).unwrap(), None);
	/// ```
	pub fn value_from_object(&self, value: &JsonFieldValue) -> Result<Option<String>, FieldError> {
		if self.base.null && value.is_null() {
			return Ok(None);
		}
		(self.serializer)(&value.to_json()).map(Some)
	}
}

impl Field for JsonField {
	fn deconstruct(&self) -> FieldDeconstruction {
		let mut kwargs = self.base.get_kwargs();
		kwargs.insert(
			"serializer".to_string(),
			FieldKwarg::Callable(self.serializer_name.clone()),
		);
		kwargs.insert(
			"deserializer".to_string(),
			FieldKwarg::Callable(self.deserializer_name.clone()),
		);

		FieldDeconstruction {
			name: self.base.name.clone(),
			path: "reinhardt.annoying.fields.JsonField".to_string(),
			kwargs,
		}
	}

	fn set_attributes_from_name(&mut self, name: &str) {
		self.base.name = Some(name.to_string());
	}

	fn name(&self) -> Option<&str> {
		self.base.name.as_deref()
	}

	fn is_null(&self) -> bool {
		self.base.null
	}
}
