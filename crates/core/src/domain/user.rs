// User Domain Model

use super::error::{DomainError, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// User identifier
pub type UserId = String;

/// Registered user (password is only ever held as a salted hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: i64,
}

impl User {
    /// Build a new user from raw registration input.
    ///
    /// `salt` is mixed into the SHA-256 digest and stored alongside it as
    /// `salt$hex`.
    pub fn new(
        id: UserId,
        name: &str,
        email: &str,
        password: &str,
        salt: &str,
        created_at: i64,
    ) -> Result<Self> {
        validate_registration(name, email, password)?;

        Ok(Self {
            id,
            name: name.trim().to_string(),
            email: email.trim().to_lowercase(),
            password_hash: hash_password(password, salt),
            created_at,
        })
    }

    /// Check a candidate password against the stored hash
    pub fn verify_password(&self, candidate: &str) -> bool {
        match self.password_hash.split_once('$') {
            Some((salt, _)) => hash_password(candidate, salt) == self.password_hash,
            None => false,
        }
    }
}

/// Validate registration fields (all required, email must look like one)
pub fn validate_registration(name: &str, email: &str, password: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DomainError::ValidationError("name is required".to_string()));
    }
    if email.trim().is_empty() {
        return Err(DomainError::ValidationError("email is required".to_string()));
    }
    if password.is_empty() {
        return Err(DomainError::ValidationError(
            "password is required".to_string(),
        ));
    }

    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(DomainError::ValidationError(format!(
            "invalid email address: {}",
            email
        ))),
    }
}

fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{}${:x}", salt, hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(password: &str) -> User {
        User::new(
            "u-1".to_string(),
            " John Doe ",
            "JohnDoe@Example.com",
            password,
            "salt",
            1_700_000_000_000,
        )
        .unwrap()
    }

    #[test]
    fn test_new_user_normalizes_fields() {
        let u = user("securepassword");
        assert_eq!(u.name, "John Doe");
        assert_eq!(u.email, "johndoe@example.com");
        assert!(u.password_hash.starts_with("salt$"));
        assert!(!u.password_hash.contains("securepassword"));
    }

    #[test]
    fn test_verify_password() {
        let u = user("securepassword");
        assert!(u.verify_password("securepassword"));
        assert!(!u.verify_password("wrong"));
    }

    #[test]
    fn test_validation_rejects_empty_fields() {
        assert!(validate_registration("", "a@b.c", "pw").is_err());
        assert!(validate_registration("n", "", "pw").is_err());
        assert!(validate_registration("n", "a@b.c", "").is_err());
    }

    #[test]
    fn test_validation_rejects_malformed_email() {
        let err = validate_registration("n", "not-an-email", "pw").unwrap_err();
        assert!(err.to_string().contains("invalid email"));
        assert!(validate_registration("n", "@example.com", "pw").is_err());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(user("pw")).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "johndoe@example.com");
    }
}
