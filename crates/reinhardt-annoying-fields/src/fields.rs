// Field definitions and deconstruction API
// Corresponds to Django's field system

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Field deconstruction result
/// Returns (name, path, kwargs) similar to Django's deconstruct()
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDeconstruction {
	pub name: Option<String>,
	pub path: String,
	pub kwargs: HashMap<String, FieldKwarg>,
}

/// Keyword argument for field construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldKwarg {
	String(String),
	Int(i64),
	Bool(bool),
	Json(serde_json::Value),
	Callable(String), // Function name as string
}

/// Core Field trait - all field types implement this
pub trait Field: Send + Sync {
	/// Deconstruct the field into a serializable representation
	fn deconstruct(&self) -> FieldDeconstruction;

	/// Set field name and attributes from model introspection
	fn set_attributes_from_name(&mut self, name: &str);

	/// Get field name
	fn name(&self) -> Option<&str>;

	/// Check if field is a primary key
	fn is_primary_key(&self) -> bool {
		false
	}

	/// Check if field allows null
	fn is_null(&self) -> bool {
		false
	}
}

/// Base field attributes shared by all fields
#[derive(Debug, Clone)]
pub struct BaseField {
	pub name: Option<String>,
	pub null: bool,
	pub blank: bool,
	pub default: Option<FieldKwarg>,
	pub db_column: Option<String>,
	pub primary_key: bool,
	pub unique: bool,
}

impl BaseField {
	/// Creates a new BaseField with default values
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_annoying_fields::fields::BaseField;
	///
	/// let field = BaseField::new();
	/// assert!(!field.null);
	/// assert!(!field.blank);
	/// assert!(!field.primary_key);
	/// ```
	pub fn new() -> Self {
		Self {
			name: None,
			null: false,
			blank: false,
			default: None,
			db_column: None,
			primary_key: false,
			unique: false,
		}
	}

	/// Extract non-default kwargs for deconstruction
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_annoying_fields::fields::{BaseField, FieldKwarg};
	///
	/// let mut field = BaseField::new();
	/// field.null = true;
	/// field.blank = true;
	///
	/// let kwargs = field.get_kwargs();
	/// assert_eq!(kwargs.get("null"), Some(&FieldKwarg::Bool(true)));
	/// assert_eq!(kwargs.get("blank"), Some(&FieldKwarg::Bool(true)));
	/// assert!(!kwargs.contains_key("primary_key"));
	/// ```
	pub fn get_kwargs(&self) -> HashMap<String, FieldKwarg> {
		let mut kwargs = HashMap::new();

		if self.null {
			kwargs.insert("null".to_string(), FieldKwarg::Bool(true));
		}
		if self.blank {
			kwargs.insert("blank".to_string(), FieldKwarg::Bool(true));
		}
		if let Some(ref default) = self.default {
			kwargs.insert("default".to_string(), default.clone());
		}
		if let Some(ref db_column) = self.db_column {
			kwargs.insert(
				"db_column".to_string(),
				FieldKwarg::String(db_column.clone()),
			);
		}
		if self.primary_key {
			kwargs.insert("primary_key".to_string(), FieldKwarg::Bool(true));
		}
		if self.unique {
			kwargs.insert("unique".to_string(), FieldKwarg::Bool(true));
		}

		kwargs
	}
}

impl Default for BaseField {
	fn default() -> Self {
		Self::new()
	}
}

/// TextField
#[derive(Debug, Clone)]
pub struct TextField {
	pub base: BaseField,
}

impl Default for TextField {
	fn default() -> Self {
		Self::new()
	}
}

impl TextField {
	/// Create a new TextField for storing large text
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_annoying_fields::fields::TextField;
	///
	/// let field = TextField::new();
	/// assert!(!field.base.null);
	/// ```
	pub fn new() -> Self {
		Self {
			base: BaseField::new(),
		}
	}

	/// Text conversion applied before a scalar is written to the column
	///
	/// Strings pass through as-is; `null` maps to SQL NULL; every other
	/// scalar is stored using its JSON text form.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_annoying_fields::fields::TextField;
	/// use serde_json::json;
	///
	/// assert_eq!(TextField::get_prep_value(&json!("hello")), Some("hello".to_string()));
	/// assert_eq!(TextField::get_prep_value(&json!(3)), Some("3".to_string()));
	/// assert_eq!(TextField::get_prep_value(&json!(null)), None);
	/// ```
	pub fn get_prep_value(value: &serde_json::Value) -> Option<String> {
		match value {
			serde_json::Value::Null => None,
			serde_json::Value::String(s) => Some(s.clone()),
			other => Some(other.to_string()),
		}
	}
}

impl Field for TextField {
	fn deconstruct(&self) -> FieldDeconstruction {
		FieldDeconstruction {
			name: self.base.name.clone(),
			path: "reinhardt.orm.models.TextField".to_string(),
			kwargs: self.base.get_kwargs(),
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
