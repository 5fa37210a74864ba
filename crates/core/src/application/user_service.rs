// User Service - registration use cases

use crate::domain::User;
use crate::error::Result;
use crate::port::{IdProvider, TimeProvider, UserRepository};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Inbound port used by the HTTP layer
#[async_trait]
pub trait UserService: Send + Sync {
    /// Validate, hash and persist a new user
    async fn add_user(&self, name: &str, email: &str, password: &str) -> Result<User>;

    async fn get_user(&self, id: &str) -> Result<Option<User>>;
}

/// Registration service over a [`UserRepository`]
pub struct RegistrationService {
    repo: Arc<dyn UserRepository>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl RegistrationService {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            repo,
            id_provider,
            time_provider,
        }
    }
}

#[async_trait]
impl UserService for RegistrationService {
    async fn add_user(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let id = self.id_provider.generate_id();
        let salt = self.id_provider.generate_id();
        let user = User::new(
            id,
            name,
            email,
            password,
            &salt,
            self.time_provider.now_millis(),
        )?;

        self.repo.save(&user).await?;
        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.repo.find_by_id(id).await
    }
}
