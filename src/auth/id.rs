//! Strongly typed identifiers for local users and the platform application.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $check:path) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				$check($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				$check($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (user, app).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (user, app).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (user, app).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
	/// The identifier must consist of ASCII digits only.
	#[error("{kind} identifier must be numeric.")]
	NotNumeric {
		/// Kind of identifier (user, app).
		kind: &'static str,
	},
}

def_id! { UserId, "Identifier of the local BOOP user owning a credential.", "User", validate_view }
def_id! { AppId, "Numeric Meta application identifier.", "App", validate_numeric }

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

fn validate_numeric(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	validate_view(kind, view)?;

	if !view.bytes().all(|b| b.is_ascii_digit()) {
		return Err(IdentifierError::NotNumeric { kind });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn user_ids_reject_whitespace_and_empty_values() {
		assert!(UserId::new(" u1").is_err(), "Leading whitespace must be rejected.");
		assert!(UserId::new("u1 ").is_err(), "Trailing whitespace must be rejected.");
		assert!(UserId::new("").is_err());

		let user = UserId::new("cm3k9user").expect("User fixture should be considered valid.");

		assert_eq!(user.as_ref(), "cm3k9user");
	}

	#[test]
	fn app_ids_must_be_numeric() {
		AppId::new("1234567890").expect("Numeric app id should be accepted.");

		assert_eq!(
			AppId::new("12ab").expect_err("Alphanumeric app id must be rejected."),
			IdentifierError::NotNumeric { kind: "App" },
		);
		assert_eq!(
			AppId::new("").expect_err("Empty app id must be rejected."),
			IdentifierError::Empty { kind: "App" },
		);
		assert!(AppId::new("-12").is_err());
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let user: UserId =
			serde_json::from_str("\"user-42\"").expect("User should deserialize successfully.");

		assert_eq!(user.as_ref(), "user-42");
		assert!(serde_json::from_str::<UserId>("\"with space\"").is_err());
		assert!(serde_json::from_str::<AppId>("\"not-a-number\"").is_err());
	}

	#[test]
	fn length_limits_apply() {
		let exact = "a".repeat(IDENTIFIER_MAX_LEN);

		UserId::new(&exact).expect("Exact length should succeed.");

		let too_long = "a".repeat(IDENTIFIER_MAX_LEN + 1);

		assert!(UserId::new(&too_long).is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<UserId, u8> = HashMap::from_iter([(
			UserId::new("user-123").expect("User used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("user-123"), Some(&7));
	}
}
