use crate::domain_model::{Email, UserId, UserIdentity};
use crate::domain_port::{DirectoryError, UserDirectory};
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: DashMap<Email, UserIdentity>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_or_create_by_email(&self, email: &Email) -> Result<UserIdentity, DirectoryError> {
        let user = self
            .users
            .entry(email.clone())
            .or_insert_with(|| UserIdentity {
                user_id: UserId::new_random(),
                email: email.clone(),
            })
            .clone();
        Ok(user)
    }
}
