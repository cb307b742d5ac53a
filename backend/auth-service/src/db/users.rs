/// Account storage
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::models::{Account, NewAccount};

/// Account lookup and creation used by the session service.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new account. Username and email are unique.
    async fn create(&self, account: NewAccount) -> AuthResult<Account>;

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Account>>;

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Account>>;
}

/// Process-local account table.
#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn create(&self, account: NewAccount) -> AuthResult<Account> {
        let mut accounts = self.accounts.write().await;

        // Checked under the write lock: two registrations for one name
        // cannot both pass.
        for existing in accounts.values() {
            if existing.username == account.username {
                return Err(AuthError::DuplicateAccount("username"));
            }
            if existing.email.eq_ignore_ascii_case(&account.email) {
                return Err(AuthError::DuplicateAccount("email"));
            }
        }

        let created = Account {
            id: Uuid::new_v4(),
            full_name: account.full_name,
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            address: account.address,
            phone_number: account.phone_number,
            city: account.city,
            postal_code: account.postal_code,
            created_at: Utc::now(),
        };
        accounts.insert(created.id, created.clone());

        Ok(created)
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|account| account.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }
}
