use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::{Result, UserError};
use crate::users::dto::{PublicUser, UserDetail};
use crate::users::repo::UserStore;
use crate::users::repo_types::{InsertedUserRow, MessageRow, NewUserRow};

struct StoredMessage {
    id: i64,
    from_username: String,
    to_username: String,
    body: String,
    sent_at: OffsetDateTime,
    read_at: Option<OffsetDateTime>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<String, NewUserRow>,
    messages: Vec<StoredMessage>,
    next_message_id: i64,
}

/// `UserStore` held in process memory, for tests and local wiring.
#[derive(Default)]
pub struct InMemoryUserStore {
    tables: Mutex<Tables>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|e| UserError::Storage(anyhow::anyhow!("store lock poisoned: {}", e)))
    }

    /// Stands in for the message-sending side. Both ends must exist.
    pub fn insert_message(&self, from: &str, to: &str, body: &str) -> Result<i64> {
        let mut t = self.lock()?;
        for name in [from, to] {
            if !t.users.contains_key(name) {
                return Err(UserError::NotFound(name.to_string()));
            }
        }
        t.next_message_id += 1;
        let id = t.next_message_id;
        t.messages.push(StoredMessage {
            id,
            from_username: from.to_string(),
            to_username: to.to_string(),
            body: body.to_string(),
            sent_at: OffsetDateTime::now_utc(),
            read_at: None,
        });
        Ok(id)
    }

    /// Raw stored digest, for asserting what actually hit storage.
    pub fn stored_password(&self, username: &str) -> Option<String> {
        self.lock()
            .ok()
            .and_then(|t| t.users.get(username).map(|u| u.password.clone()))
    }

    fn joined<F>(&self, keep: F) -> Result<Vec<MessageRow>>
    where
        F: Fn(&StoredMessage) -> Option<&str>,
    {
        let t = self.lock()?;
        let mut rows = Vec::new();
        for m in &t.messages {
            let Some(other) = keep(m) else { continue };
            // Inner join: skip rows whose counterpart is missing.
            let Some(u) = t.users.get(other) else { continue };
            rows.push(MessageRow {
                id: m.id,
                username: u.username.clone(),
                first_name: u.first_name.clone(),
                last_name: u.last_name.clone(),
                phone: u.phone.clone(),
                body: m.body.clone(),
                sent_at: m.sent_at,
                read_at: m.read_at,
            });
        }
        Ok(rows)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert_user(&self, user: NewUserRow) -> Result<InsertedUserRow> {
        let mut t = self.lock()?;
        if t.users.contains_key(&user.username) {
            return Err(UserError::DuplicateKey(user.username));
        }
        let inserted = InsertedUserRow {
            username: user.username.clone(),
            password: user.password.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone(),
        };
        t.users.insert(user.username.clone(), user);
        Ok(inserted)
    }

    async fn find_password(&self, username: &str) -> Result<Option<String>> {
        Ok(self.lock()?.users.get(username).map(|u| u.password.clone()))
    }

    async fn touch_login(&self, username: &str, at: OffsetDateTime) -> Result<u64> {
        let mut t = self.lock()?;
        match t.users.get_mut(username) {
            Some(u) => {
                u.last_login_at = at;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn list_users(&self) -> Result<Vec<PublicUser>> {
        let t = self.lock()?;
        Ok(t.users
            .values()
            .map(|u| PublicUser {
                username: u.username.clone(),
                first_name: u.first_name.clone(),
                last_name: u.last_name.clone(),
                phone: u.phone.clone(),
            })
            .collect())
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserDetail>> {
        let t = self.lock()?;
        Ok(t.users.get(username).map(|u| UserDetail {
            username: u.username.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            phone: u.phone.clone(),
            join_at: u.join_at,
            last_login_at: u.last_login_at,
        }))
    }

    async fn user_exists(&self, username: &str) -> Result<bool> {
        Ok(self.lock()?.users.contains_key(username))
    }

    async fn messages_from(&self, username: &str) -> Result<Vec<MessageRow>> {
        self.joined(|m| (m.from_username == username).then_some(m.to_username.as_str()))
    }

    async fn messages_to(&self, username: &str) -> Result<Vec<MessageRow>> {
        self.joined(|m| (m.to_username == username).then_some(m.from_username.as_str()))
    }
}
