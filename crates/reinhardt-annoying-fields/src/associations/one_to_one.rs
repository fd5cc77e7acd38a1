//! Auto-creating One-to-One relationship definition
//!
//! Drop-in variant of a one-to-one field: the reverse accessor on the target
//! model never reports "does not exist", it creates the related row instead.

use std::marker::PhantomData;

use super::descriptor::AutoReverseOneToOneDescriptor;
use super::{CascadeAction, ReverseRelationship, generate_reverse_accessor_singular};
use crate::fields::{BaseField, Field, FieldDeconstruction, FieldKwarg};
use crate::model::{Model, RelatedCache};

/// One-to-one field that creates the related object on first access
///
/// Declared on the dependent model and pointing at the owning model `T`.
///
/// # Type Parameters
///
/// * `T` - The owning model the field points to
///
/// # Examples
///
/// ```
/// use reinhardt_annoying_fields::associations::{AutoOneToOneField, CascadeAction};
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
/// // class MyProfile: user = AutoOneToOneField(User, primary_key=True)
/// let user: AutoOneToOneField<User> = AutoOneToOneField::new("user_id")
///     .primary_key(true)
///     .on_delete(CascadeAction::Cascade);
/// assert_eq!(user.get_field_name(), "user_id");
/// assert!(user.is_primary_key_field());
/// ```
#[derive(Debug, Clone)]
pub struct AutoOneToOneField<T> {
	pub base: BaseField,
	/// The foreign key column on the dependent model's table
	field_name: String,
	related_name: Option<String>,
	on_delete: CascadeAction,
	on_update: CascadeAction,
	db_constraint: Option<String>,
	_phantom: PhantomData<fn() -> T>,
}

impl<T: Model> AutoOneToOneField<T> {
	/// Create a new auto one-to-one field backed by `field_name`
	pub fn new(field_name: impl Into<String>) -> Self {
		let mut base = BaseField::new();
		// One-to-one columns are always unique
		base.unique = true;

		Self {
			base,
			field_name: field_name.into(),
			related_name: None,
			on_delete: CascadeAction::default(),
			on_update: CascadeAction::default(),
			db_constraint: None,
			_phantom: PhantomData,
		}
	}

	/// Set the reverse relation accessor name
	pub fn related_name(mut self, name: impl Into<String>) -> Self {
		self.related_name = Some(name.into());
		self
	}

	pub fn on_delete(mut self, action: CascadeAction) -> Self {
		self.on_delete = action;
		self
	}

	pub fn on_update(mut self, action: CascadeAction) -> Self {
		self.on_update = action;
		self
	}

	/// Use the relation as the dependent model's primary key
	pub fn primary_key(mut self, primary_key: bool) -> Self {
		self.base.primary_key = primary_key;
		self
	}

	pub fn null(mut self, null: bool) -> Self {
		self.base.null = null;
		self
	}

	pub fn db_constraint(mut self, name: impl Into<String>) -> Self {
		self.db_constraint = Some(name.into());
		self
	}

	/// Get the field name
	pub fn get_field_name(&self) -> &str {
		&self.field_name
	}

	/// Get the related_name
	pub fn get_related_name(&self) -> Option<&str> {
		self.related_name.as_deref()
	}

	pub fn get_on_delete(&self) -> CascadeAction {
		self.on_delete
	}

	pub fn get_on_update(&self) -> CascadeAction {
		self.on_update
	}

	pub fn get_db_constraint(&self) -> Option<&str> {
		self.db_constraint.as_deref()
	}

	pub fn is_primary_key_field(&self) -> bool {
		self.base.primary_key
	}

	/// Name of the accessor installed on `T` for dependent model `R`
	pub fn accessor_name<R: Model>(&self) -> String {
		self.get_or_generate_reverse_name(R::model_name())
	}

	/// Install the auto-creating accessor on the owning model
	///
	/// `cache` points at the [`RelatedCache`] slot inside `T` that holds the
	/// related object once loaded.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_annoying_fields::associations::AutoOneToOneField;
	/// use reinhardt_annoying_fields::model::{Model, RelatedCache};
	///
	/// struct User {
	///     id: Option<i64>,
	///     profile: RelatedCache<Profile>,
	/// }
	///
	/// struct Profile {
	///     user_id: i64,
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
	/// let field: AutoOneToOneField<User> = AutoOneToOneField::new("user_id");
	/// let accessor = field.contribute_to_related_class(|u: &User| &u.profile);
	/// assert_eq!(accessor.related_field(), "user_id");
	/// assert_eq!(field.accessor_name::<Profile>(), "profile");
	/// ```
	pub fn contribute_to_related_class<R>(
		&self,
		cache: fn(&T) -> &RelatedCache<R>,
	) -> AutoReverseOneToOneDescriptor<T, R>
	where
		R: Model,
	{
		AutoReverseOneToOneDescriptor::new(self.field_name.clone(), cache)
	}
}

impl<T: Model> ReverseRelationship for AutoOneToOneField<T> {
	fn get_or_generate_reverse_name(&self, model_name: &str) -> String {
		self.related_name
			.clone()
			.unwrap_or_else(|| generate_reverse_accessor_singular(model_name))
	}

	fn explicit_reverse_name(&self) -> Option<&str> {
		self.related_name.as_deref()
	}
}

impl<T: Model> Field for AutoOneToOneField<T> {
	fn deconstruct(&self) -> FieldDeconstruction {
		let mut kwargs = self.base.get_kwargs();
		// Implied by the field type
		kwargs.remove("unique");

		kwargs.insert(
			"to".to_string(),
			FieldKwarg::String(T::model_name().to_string()),
		);
		kwargs.insert(
			"on_delete".to_string(),
			FieldKwarg::String(self.on_delete.as_sql().to_string()),
		);
		if self.on_update != CascadeAction::NoAction {
			kwargs.insert(
				"on_update".to_string(),
				FieldKwarg::String(self.on_update.as_sql().to_string()),
			);
		}
		if let Some(ref related_name) = self.related_name {
			kwargs.insert(
				"related_name".to_string(),
				FieldKwarg::String(related_name.clone()),
			);
		}
		if let Some(ref constraint) = self.db_constraint {
			kwargs.insert(
				"db_constraint".to_string(),
				FieldKwarg::String(constraint.clone()),
			);
		}

		FieldDeconstruction {
			name: self.base.name.clone(),
			path: "reinhardt.annoying.fields.AutoOneToOneField".to_string(),
			kwargs,
		}
	}

	fn set_attributes_from_name(&mut self, name: &str) {
		self.base.name = Some(name.to_string());
	}

	fn name(&self) -> Option<&str> {
		self.base.name.as_deref()
	}

	fn is_primary_key(&self) -> bool {
		self.base.primary_key
	}

	fn is_null(&self) -> bool {
		self.base.null
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct User {
		id: Option<i64>,
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

	struct UserProfile;

	impl Model for UserProfile {
		type PrimaryKey = i64;

		fn table_name() -> &'static str {
			"user_profiles"
		}

		fn model_name() -> &'static str {
			"UserProfile"
		}

		fn primary_key(&self) -> Option<i64> {
			None
		}
	}

	#[test]
	fn test_auto_one_to_one_creation() {
		let field: AutoOneToOneField<User> = AutoOneToOneField::new("user_id");
		assert_eq!(field.get_field_name(), "user_id");
		assert_eq!(field.get_related_name(), None);
		assert_eq!(field.get_on_delete(), CascadeAction::NoAction);
		assert_eq!(field.get_on_update(), CascadeAction::NoAction);
		assert!(field.base.unique);
		assert!(!field.is_primary_key_field());
		assert_eq!(User { id: Some(1) }.primary_key(), Some(1));
	}

	#[test]
	fn test_auto_one_to_one_builder() {
		let field: AutoOneToOneField<User> = AutoOneToOneField::new("user_id")
			.related_name("profile")
			.on_delete(CascadeAction::Cascade)
			.on_update(CascadeAction::SetNull)
			.null(true)
			.db_constraint("fk_profile_user")
			.primary_key(true);

		assert_eq!(field.get_related_name(), Some("profile"));
		assert_eq!(field.get_on_delete(), CascadeAction::Cascade);
		assert_eq!(field.get_on_update(), CascadeAction::SetNull);
		assert!(field.is_null());
		assert_eq!(field.get_db_constraint(), Some("fk_profile_user"));
		assert!(field.is_primary_key());
	}

	#[test]
	fn test_accessor_name_generated_and_explicit() {
		let field: AutoOneToOneField<User> = AutoOneToOneField::new("user_id");
		assert_eq!(field.accessor_name::<UserProfile>(), "user_profile");
		assert_eq!(field.explicit_reverse_name(), None);

		let named = field.related_name("profile");
		assert_eq!(named.accessor_name::<UserProfile>(), "profile");
		assert_eq!(named.explicit_reverse_name(), Some("profile"));
	}

	#[test]
	fn test_deconstruct() {
		let mut field: AutoOneToOneField<User> = AutoOneToOneField::new("user_id")
			.primary_key(true)
			.on_delete(CascadeAction::Cascade)
			.related_name("profile");
		field.set_attributes_from_name("user");
		let dec = field.deconstruct();

		assert_eq!(dec.name, Some("user".to_string()));
		assert_eq!(dec.path, "reinhardt.annoying.fields.AutoOneToOneField");
		assert_eq!(
			dec.kwargs.get("to"),
			Some(&FieldKwarg::String("User".to_string()))
		);
		assert_eq!(
			dec.kwargs.get("on_delete"),
			Some(&FieldKwarg::String("CASCADE".to_string()))
		);
		assert_eq!(
			dec.kwargs.get("related_name"),
			Some(&FieldKwarg::String("profile".to_string()))
		);
		assert_eq!(dec.kwargs.get("primary_key"), Some(&FieldKwarg::Bool(true)));
		assert!(!dec.kwargs.contains_key("unique"));
		assert!(!dec.kwargs.contains_key("on_update"));
	}
}
