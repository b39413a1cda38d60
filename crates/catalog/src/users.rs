use common::UserId;
use domain::{User, validate_email};
use store::Store;

use crate::Result;

/// Creates and looks up user identities. Credentials live elsewhere.
pub struct UserService<S: Store> {
    store: S,
}

impl<S: Store> UserService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Registers a new identity for the email address.
    #[tracing::instrument(skip(self))]
    pub async fn register(&self, email: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        validate_email(&email)?;

        let user = self.store.create_user(&email).await?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.store.get_user(user_id).await?)
    }
}
