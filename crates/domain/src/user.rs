//! User identity as seen by checkout.

use serde::{Deserialize, Serialize};

use crate::{DomainError, UserId};

/// The parts of a user record checkout needs: who they are and where to
/// send the confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
}

impl User {
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

/// Checks that an email has a non-empty local part and a dotted domain.
pub fn validate_email(email: &str) -> Result<(), DomainError> {
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
    });

    if !valid || email.chars().any(char::is_whitespace) {
        return Err(DomainError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("a.b+c@mail.example.org").is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        for email in ["", "ada", "@example.com", "ada@", "ada@example", "ada@.com", "a da@example.com"] {
            assert_eq!(
                validate_email(email),
                Err(DomainError::InvalidEmail(email.to_string())),
                "{email}"
            );
        }
    }
}
