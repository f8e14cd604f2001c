//! Credential handling: argon2 password hashing and the login service.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::password_hash::rand_core::OsRng;
use argon2::Argon2;
use async_trait::async_trait;

use super::Error;
use super::ports::{LoginService, UserRepository};
use super::user::User;

/// Validation errors for login payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialsError {
    #[error("email must not be empty")]
    EmptyEmail,
    #[error("password must not be empty")]
    EmptyPassword,
}

/// Shape-validated login input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: String,
    password: String,
}

impl LoginCredentials {
    /// Validate that both parts are present.
    pub fn new(email: &str, password: &str) -> Result<Self, CredentialsError> {
        if email.trim().is_empty() {
            return Err(CredentialsError::EmptyEmail);
        }
        if password.is_empty() {
            return Err(CredentialsError::EmptyPassword);
        }
        Ok(Self {
            email: email.to_owned(),
            password: password.to_owned(),
        })
    }

    /// Login email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Plain password; never leaves the login path.
    pub fn password(&self) -> &str {
        &self.password
    }
}

/// Hash a password into an argon2 PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|error| Error::internal(format!("password hashing failed: {error}")))
}

/// Verify a password against a stored PHC string.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(error) => {
            tracing::warn!(%error, "stored password hash failed to parse");
            false
        }
    }
}

/// [`LoginService`] backed by the user repository and argon2 verification.
#[derive(Clone)]
pub struct PasswordLoginService {
    users: Arc<dyn UserRepository>,
}

impl PasswordLoginService {
    /// Create a login service over the given user repository.
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl LoginService for PasswordLoginService {
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<User, Error> {
        let found = self
            .users
            .find_by_email_with_hash(credentials.email())
            .await?;
        match found {
            Some((user, hash)) if verify_password(credentials.password(), &hash) => Ok(user),
            _ => Err(Error::unauthorized("invalid credentials")),
        }
    }
}
