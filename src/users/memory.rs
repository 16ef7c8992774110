//! In-memory user repository backing the tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::repo::{RepoError, UniqueField, UserRepository};
use super::repo_types::{NewUser, User};

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i64, User>,
    last_id: i64,
}

impl Table {
    fn conflict(&self, username: &str, email: &str, except: Option<i64>) -> Option<UniqueField> {
        let others = self.rows.values().filter(|u| Some(u.id) != except);
        for u in others {
            if u.username == username {
                return Some(UniqueField::Username);
            }
            if u.email == email {
                return Some(UniqueField::Email);
            }
        }
        None
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    table: RwLock<Table>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.table.read().await.rows.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, new: NewUser) -> Result<User, RepoError> {
        let mut table = self.table.write().await;
        if let Some(field) = table.conflict(&new.username, &new.email, None) {
            return Err(RepoError::Duplicate(field));
        }
        table.last_id += 1;
        let user = User {
            id: table.last_id,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            bio: new.bio,
            profile_picture: new.profile_picture,
            date_joined: OffsetDateTime::now_utc(),
        };
        table.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let table = self.table.read().await;
        Ok(table.rows.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let table = self.table.read().await;
        Ok(table.rows.values().find(|u| u.email == email).cloned())
    }

    async fn update(&self, user: &User) -> Result<Option<User>, RepoError> {
        let mut table = self.table.write().await;
        if !table.rows.contains_key(&user.id) {
            return Ok(None);
        }
        if let Some(field) = table.conflict(&user.username, &user.email, Some(user.id)) {
            return Err(RepoError::Duplicate(field));
        }
        let Some(row) = table.rows.get_mut(&user.id) else {
            return Ok(None);
        };
        row.username = user.username.clone();
        row.email = user.email.clone();
        row.password_hash = user.password_hash.clone();
        row.bio = user.bio.clone();
        row.profile_picture = user.profile_picture.clone();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: i64) -> Result<Option<User>, RepoError> {
        Ok(self.table.write().await.rows.remove(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
            bio: String::new(),
            profile_picture: None,
        }
    }

    #[tokio::test]
    async fn ids_are_assigned_and_never_reused() {
        let repo = InMemoryUserRepository::new();
        let a = repo.create(new_user("a", "a@example.com")).await.unwrap();
        let b = repo.create(new_user("b", "b@example.com")).await.unwrap();
        assert_ne!(a.id, b.id);

        repo.delete(b.id).await.unwrap();
        let c = repo.create(new_user("c", "c@example.com")).await.unwrap();
        assert!(c.id > b.id);
    }

    #[tokio::test]
    async fn create_enforces_both_unique_columns() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("a", "a@example.com")).await.unwrap();

        let err = repo.create(new_user("a", "other@example.com")).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(UniqueField::Username)));
        let err = repo.create(new_user("other", "a@example.com")).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(UniqueField::Email)));
        assert_eq!(repo.count().await, 1);
    }

    #[tokio::test]
    async fn update_ignores_own_row_for_uniqueness() {
        let repo = InMemoryUserRepository::new();
        let mut a = repo.create(new_user("a", "a@example.com")).await.unwrap();
        repo.create(new_user("b", "b@example.com")).await.unwrap();

        a.bio = "hello".into();
        let saved = repo.update(&a).await.unwrap().expect("row exists");
        assert_eq!(saved.bio, "hello");

        a.email = "b@example.com".into();
        let err = repo.update(&a).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(UniqueField::Email)));
    }

    #[tokio::test]
    async fn update_and_delete_missing_row() {
        let repo = InMemoryUserRepository::new();
        let ghost = repo.create(new_user("g", "g@example.com")).await.unwrap();
        assert!(repo.delete(ghost.id).await.unwrap().is_some());
        assert!(repo.delete(ghost.id).await.unwrap().is_none());
        assert!(repo.update(&ghost).await.unwrap().is_none());
        assert!(repo.get_by_id(ghost.id).await.unwrap().is_none());
    }
}
