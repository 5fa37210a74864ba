// User Repository Port (Interface)

use crate::domain::User;
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for User persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user
    async fn save(&self, user: &User) -> Result<()>;

    /// Find user by ID (`None` when absent)
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// HashMap-backed repository; rejects duplicate emails like the SQL schema does
    #[derive(Default)]
    pub struct InMemoryUserRepository {
        users: Mutex<HashMap<String, User>>,
    }

    impl InMemoryUserRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn len(&self) -> usize {
            self.users.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[async_trait]
    impl UserRepository for InMemoryUserRepository {
        async fn save(&self, user: &User) -> Result<()> {
            let mut users = self.users.lock().unwrap();
            if users.values().any(|u| u.email == user.email) {
                return Err(AppError::Conflict(format!(
                    "email already registered: {}",
                    user.email
                )));
            }
            users.insert(user.id.clone(), user.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
            Ok(self.users.lock().unwrap().get(id).cloned())
        }
    }
}
