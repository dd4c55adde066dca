use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::mysql::MySqlDatabaseError;
use sqlx::{MySqlPool, Row};

const ER_DUP_ENTRY: u16 = 1062;

pub struct MySqlUserDirectory {
    pool: MySqlPool,
}

impl MySqlUserDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserDirectory { pool }
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<UserIdentity>, DirectoryError> {
        let row = sqlx::query("SELECT user_id FROM user WHERE email = ?")
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DirectoryError::Store(format!("query user_id: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let user_id_bytes: Vec<u8> = row
            .try_get("user_id")
            .map_err(|e| DirectoryError::Store(format!("decode user_id: {e}")))?;
        let user_id = user_id_from_bytes(&user_id_bytes)?;

        Ok(Some(UserIdentity {
            user_id,
            email: email.clone(),
        }))
    }
}

#[async_trait::async_trait]
impl UserDirectory for MySqlUserDirectory {
    async fn find_or_create_by_email(&self, email: &Email) -> Result<UserIdentity, DirectoryError> {
        if let Some(user) = self.find_by_email(email).await? {
            return Ok(user);
        }

        let user_id = UserId::new_random();
        let inserted = sqlx::query(
            r#"
INSERT INTO user (user_id, email)
VALUES (?, ?)
"#,
        )
        .bind(user_id.0.as_bytes().as_slice())
        .bind(email.as_str())
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(UserIdentity {
                user_id,
                email: email.clone(),
            }),
            // a concurrent login created the row first
            Err(e) if is_dup_key(&e) => self.find_by_email(email).await?.ok_or_else(|| {
                DirectoryError::Inconsistent(format!("duplicate user {email} vanished"))
            }),
            Err(e) => Err(DirectoryError::Store(e.to_string())),
        }
    }
}

fn user_id_from_bytes(bytes: &[u8]) -> Result<UserId, DirectoryError> {
    uuid::Uuid::from_slice(bytes)
        .map(UserId)
        .map_err(|e| DirectoryError::Store(format!("user_id is not a uuid: {e}")))
}

fn is_dup_key(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db) = err else {
        return false;
    };
    db.try_downcast_ref::<MySqlDatabaseError>()
        .is_some_and(|e| e.number() == ER_DUP_ENTRY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_decodes_from_binary_column() {
        let id = UserId::new_random();
        let decoded = user_id_from_bytes(id.0.as_bytes()).unwrap();
        assert_eq!(decoded, id);
    }

    #[test]
    fn malformed_user_id_is_a_store_error() {
        assert!(matches!(
            user_id_from_bytes(&[1, 2, 3]),
            Err(DirectoryError::Store(_))
        ));
        assert!(matches!(
            user_id_from_bytes(&[]),
            Err(DirectoryError::Store(_))
        ));
    }
}
