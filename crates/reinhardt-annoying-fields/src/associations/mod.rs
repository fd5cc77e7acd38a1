//! Relationship definitions
//!
//! [`AutoOneToOneField`] is a one-to-one relation whose reverse accessor
//! creates the related row the first time it is read. The accessor itself
//! lives in [`descriptor`].

pub mod descriptor;
pub mod one_to_one;

pub use descriptor::{AutoReverseOneToOneDescriptor, ReverseOneToOneDescriptor};
pub use one_to_one::AutoOneToOneField;

use serde::{Deserialize, Serialize};

/// Cascade action for foreign key relationships
///
/// # Examples
///
/// ```
/// use reinhardt_annoying_fields::associations::CascadeAction;
///
/// assert_eq!(CascadeAction::default(), CascadeAction::NoAction);
/// assert_eq!(CascadeAction::SetNull.as_sql(), "SET NULL");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CascadeAction {
	/// Do nothing (default behavior, may cause constraint violations)
	#[default]
	NoAction,
	/// Restrict deletion/update if dependent objects exist
	Restrict,
	/// Set foreign key to NULL when referenced object is deleted/updated
	SetNull,
	/// Set foreign key to its default value
	SetDefault,
	/// Cascade deletion/update to dependent objects
	Cascade,
}

impl CascadeAction {
	pub fn as_sql(&self) -> &'static str {
		match self {
			CascadeAction::NoAction => "NO ACTION",
			CascadeAction::Restrict => "RESTRICT",
			CascadeAction::SetNull => "SET NULL",
			CascadeAction::SetDefault => "SET DEFAULT",
			CascadeAction::Cascade => "CASCADE",
		}
	}
}

/// Naming of the accessor installed on the other side of a relation
pub trait ReverseRelationship {
	/// Get the reverse accessor name, generating one if not explicitly set
	fn get_or_generate_reverse_name(&self, model_name: &str) -> String;

	/// Explicit `related_name`, if any
	fn explicit_reverse_name(&self) -> Option<&str>;
}

/// Singular accessor name for a model, e.g. `UserProfile` -> `user_profile`
///
/// # Examples
///
/// ```
/// use reinhardt_annoying_fields::associations::generate_reverse_accessor_singular;
///
/// assert_eq!(generate_reverse_accessor_singular("UserProfile"), "user_profile");
/// assert_eq!(generate_reverse_accessor_singular("Profile"), "profile");
/// ```
pub fn generate_reverse_accessor_singular(model_name: &str) -> String {
	let mut name = String::with_capacity(model_name.len() + 4);
	let mut prev_lower = false;

	for ch in model_name.chars() {
		if ch.is_uppercase() {
			if prev_lower {
				name.push('_');
			}
			name.extend(ch.to_lowercase());
			prev_lower = false;
		} else {
			name.push(ch);
			prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
		}
	}

	name
}
