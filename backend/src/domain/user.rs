//! User identity and profile model.
//!
//! Usernames follow the classic `^[\w.@+-]+$` account-name pattern and the
//! literal `me` is reserved for the profile shortcut route. Emails get a
//! shape check only; deliverability is not this layer's concern.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum length for usernames and personal names.
pub const NAME_MAX: usize = 150;
/// Maximum length for email addresses (RFC 5321 path limit).
pub const EMAIL_MAX: usize = 254;

const RESERVED_USERNAME: &str = "me";

/// Validation errors raised by the user value types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyUsername,
    UsernameTooLong { max: usize },
    UsernameInvalidCharacters,
    ReservedUsername,
    EmptyEmail,
    EmailTooLong { max: usize },
    EmailInvalid,
    EmptyName,
    NameTooLong { max: usize },
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::UsernameTooLong { max } => {
                write!(f, "username must be at most {max} characters")
            }
            Self::UsernameInvalidCharacters => write!(
                f,
                "username may only contain letters, digits and @/./+/-/_ characters",
            ),
            Self::ReservedUsername => {
                write!(f, "username '{RESERVED_USERNAME}' is reserved")
            }
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::EmailTooLong { max } => write!(f, "email must be at most {max} characters"),
            Self::EmailInvalid => write!(f, "email must look like an address"),
            Self::EmptyName => write!(f, "name must not be empty"),
            Self::NameTooLong { max } => write!(f, "name must be at most {max} characters"),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Stable user identifier backed by the serial primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i32);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

static USERNAME_RE: OnceLock<Regex> = OnceLock::new();

fn username_regex() -> &'static Regex {
    USERNAME_RE.get_or_init(|| {
        // Length is enforced separately; this regex constrains allowed characters.
        Regex::new(r"^[\w.@+-]+$")
            .unwrap_or_else(|error| panic!("username regex failed to compile: {error}"))
    })
}

/// Account name, unique per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and construct a [`Username`].
    pub fn new(value: impl Into<String>) -> Result<Self, UserValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        if value.chars().count() > NAME_MAX {
            return Err(UserValidationError::UsernameTooLong { max: NAME_MAX });
        }
        if !username_regex().is_match(&value) {
            return Err(UserValidationError::UsernameInvalidCharacters);
        }
        if value == RESERVED_USERNAME {
            return Err(UserValidationError::ReservedUsername);
        }
        Ok(Self(value))
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Email address, unique per user and used as the login identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validate and construct an [`Email`].
    pub fn new(value: impl Into<String>) -> Result<Self, UserValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(UserValidationError::EmptyEmail);
        }
        if value.chars().count() > EMAIL_MAX {
            return Err(UserValidationError::EmailTooLong { max: EMAIL_MAX });
        }
        let Some((local, host)) = value.split_once('@') else {
            return Err(UserValidationError::EmailInvalid);
        };
        if local.is_empty() || host.is_empty() || !host.contains('.') || host.contains('@') {
            return Err(UserValidationError::EmailInvalid);
        }
        Ok(Self(value))
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl TryFrom<String> for Email {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// First or last name of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PersonName(String);

impl PersonName {
    /// Validate and construct a [`PersonName`].
    pub fn new(value: impl Into<String>) -> Result<Self, UserValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(UserValidationError::EmptyName);
        }
        if value.chars().count() > NAME_MAX {
            return Err(UserValidationError::NameTooLong { max: NAME_MAX });
        }
        Ok(Self(value))
    }
}

impl AsRef<str> for PersonName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<PersonName> for String {
    fn from(value: PersonName) -> Self {
        value.0
    }
}

impl TryFrom<String> for PersonName {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Persisted user profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: Email,
    pub first_name: PersonName,
    pub last_name: PersonName,
    /// Media-relative path of the stored avatar, when one is set.
    pub avatar: Option<String>,
    /// Staff users may mutate any recipe.
    pub is_staff: bool,
}

/// Validated registration data ready for persistence.
///
/// `password_hash` is an argon2 PHC string; plain passwords never cross
/// this boundary.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Username,
    pub email: Email,
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub password_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ada.lovelace")]
    #[case("user@host")]
    #[case("under_score-plus+")]
    fn username_accepts_pattern(#[case] raw: &str) {
        assert!(Username::new(raw).is_ok());
    }

    #[rstest]
    #[case("", UserValidationError::EmptyUsername)]
    #[case("has space", UserValidationError::UsernameInvalidCharacters)]
    #[case("bang!", UserValidationError::UsernameInvalidCharacters)]
    #[case("me", UserValidationError::ReservedUsername)]
    fn username_rejects_invalid(#[case] raw: &str, #[case] expected: UserValidationError) {
        assert_eq!(Username::new(raw).unwrap_err(), expected);
    }

    #[rstest]
    fn username_rejects_overlong() {
        let raw = "a".repeat(NAME_MAX + 1);
        assert_eq!(
            Username::new(raw).unwrap_err(),
            UserValidationError::UsernameTooLong { max: NAME_MAX }
        );
    }

    #[rstest]
    #[case("ada@example.org")]
    #[case("a.b+tag@mail.example.co")]
    fn email_accepts_addresses(#[case] raw: &str) {
        assert!(Email::new(raw).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("plainaddress")]
    #[case("@example.org")]
    #[case("ada@nodot")]
    fn email_rejects_invalid(#[case] raw: &str) {
        assert!(Email::new(raw).is_err());
    }

    #[rstest]
    fn person_name_rejects_blank() {
        assert_eq!(
            PersonName::new("   ").unwrap_err(),
            UserValidationError::EmptyName
        );
    }
}
