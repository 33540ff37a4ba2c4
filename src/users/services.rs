use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Result, UserError};
use crate::password::PasswordHasher;
use crate::users::dto::{
    PublicUser, ReceivedMessage, RegisterUser, RegisteredUser, SentMessage, UserDetail,
};
use crate::users::repo::UserStore;
use crate::users::repo_types::NewUserRow;

/// Stateless accessor over the users and messages tables. Storage and
/// hashing are injected; everything durable lives in the store.
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    work_factor: u32,
}

impl UserDirectory {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        work_factor: u32,
    ) -> Self {
        Self {
            store,
            hasher,
            work_factor,
        }
    }

    /// Hashes the password and inserts the user. `join_at` and
    /// `last_login_at` both take the same registration instant.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegisterUser) -> Result<RegisteredUser> {
        let RegisterUser {
            username,
            password,
            first_name,
            last_name,
            phone,
        } = input;

        let hasher = Arc::clone(&self.hasher);
        let work_factor = self.work_factor;
        let digest = tokio::task::spawn_blocking(move || hasher.hash(&password, work_factor))
            .await
            .map_err(|e| {
                error!(error = %e, "spawn_blocking join error");
                UserError::Hashing(e.to_string())
            })?
            .map_err(|e| UserError::Hashing(e.to_string()))?;

        let now = OffsetDateTime::now_utc();
        let row = NewUserRow {
            username,
            password: digest,
            first_name,
            last_name,
            phone,
            join_at: now,
            last_login_at: now,
        };

        let inserted = self.store.insert_user(row).await.map_err(|e| {
            match &e {
                UserError::DuplicateKey(_) => warn!("username already registered"),
                other => error!(error = %other, "insert user failed"),
            }
            e
        })?;

        info!("user registered");
        Ok(inserted.into())
    }

    /// `Ok(false)` on a wrong password; `InvalidCredentials` when the
    /// username is unknown.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<bool> {
        let Some(digest) = self.store.find_password(username).await? else {
            warn!("login unknown username");
            return Err(UserError::InvalidCredentials);
        };

        let hasher = Arc::clone(&self.hasher);
        let plain = password.to_owned();
        let ok = tokio::task::spawn_blocking(move || hasher.verify(&plain, &digest))
            .await
            .map_err(|e| {
                error!(error = %e, "spawn_blocking join error");
                UserError::Hashing(e.to_string())
            })?
            .map_err(|e| UserError::Hashing(e.to_string()))?;

        if !ok {
            warn!("login invalid password");
        }
        Ok(ok)
    }

    /// Unknown usernames are accepted silently; nothing is updated.
    #[instrument(skip(self))]
    pub async fn update_login_timestamp(&self, username: &str) -> Result<()> {
        let touched = self
            .store
            .touch_login(username, OffsetDateTime::now_utc())
            .await?;
        if touched == 0 {
            debug!("login timestamp update matched no user");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn all(&self) -> Result<Vec<PublicUser>> {
        self.store.list_users().await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, username: &str) -> Result<UserDetail> {
        self.store
            .find_user(username)
            .await?
            .ok_or_else(|| UserError::NotFound(username.to_string()))
    }

    /// Messages sent by `username`. Empty for a user who sent nothing;
    /// `NotFound` only when the user does not exist.
    #[instrument(skip(self))]
    pub async fn messages_from(&self, username: &str) -> Result<Vec<SentMessage>> {
        self.ensure_exists(username).await?;
        let rows = self.store.messages_from(username).await?;
        Ok(rows.into_iter().map(SentMessage::from).collect())
    }

    /// Messages received by `username`; same empty/`NotFound` split as
    /// [`messages_from`](Self::messages_from).
    #[instrument(skip(self))]
    pub async fn messages_to(&self, username: &str) -> Result<Vec<ReceivedMessage>> {
        self.ensure_exists(username).await?;
        let rows = self.store.messages_to(username).await?;
        Ok(rows.into_iter().map(ReceivedMessage::from).collect())
    }

    async fn ensure_exists(&self, username: &str) -> Result<()> {
        if self.store.user_exists(username).await? {
            Ok(())
        } else {
            Err(UserError::NotFound(username.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::Argon2Hasher;
    use crate::users::memory::InMemoryUserStore;
    use crate::users::repo::UserStore as _;

    fn directory() -> (UserDirectory, Arc<InMemoryUserStore>) {
        let store = Arc::new(InMemoryUserStore::new());
        let dir = UserDirectory::new(store.clone(), Arc::new(Argon2Hasher::new(1024)), 1);
        (dir, store)
    }

    fn input(username: &str, password: &str) -> RegisterUser {
        RegisterUser {
            username: username.into(),
            password: password.into(),
            first_name: format!("{}-first", username),
            last_name: format!("{}-last", username),
            phone: "+14155550100".into(),
        }
    }

    #[tokio::test]
    async fn alice_scenario() {
        let (dir, _) = directory();
        let reg = dir.register(input("alice", "secret1")).await.unwrap();
        assert_eq!(reg.username, "alice");
        assert_eq!(reg.first_name, "alice-first");

        assert!(dir.authenticate("alice", "secret1").await.unwrap());
        assert!(!dir.authenticate("alice", "wrong").await.unwrap());

        let all = dir.all().await.unwrap();
        assert!(all.contains(&PublicUser {
            username: "alice".into(),
            first_name: "alice-first".into(),
            last_name: "alice-last".into(),
            phone: "+14155550100".into(),
        }));

        let got = dir.get("alice").await.unwrap();
        assert_eq!(got.username, "alice");
        assert_eq!(got.last_name, "alice-last");
        assert_eq!(got.phone, "+14155550100");
        assert_eq!(got.join_at, got.last_login_at);
    }

    #[tokio::test]
    async fn plaintext_is_never_stored() {
        let (dir, store) = directory();
        let reg = dir.register(input("carol", "hunter22")).await.unwrap();
        let stored = store.stored_password("carol").unwrap();
        assert_ne!(stored, "hunter22");
        assert_eq!(reg.password, stored);
        assert!(Argon2Hasher::default().verify("hunter22", &stored).unwrap());
    }

    #[tokio::test]
    async fn duplicate_registration_is_duplicate_key() {
        let (dir, _) = directory();
        dir.register(input("dave", "pw")).await.unwrap();
        let err = dir.register(input("dave", "other")).await.unwrap_err();
        assert!(matches!(err, UserError::DuplicateKey(_)));
        assert_eq!(err.status(), 409);
    }

    #[tokio::test]
    async fn unknown_user_cannot_authenticate() {
        let (dir, _) = directory();
        let err = dir.authenticate("nonexistent", "anything").await.unwrap_err();
        assert!(matches!(err, UserError::InvalidCredentials));
    }

    #[tokio::test]
    async fn corrupt_stored_digest_is_internal_error() {
        let (dir, store) = directory();
        let now = OffsetDateTime::now_utc();
        store
            .insert_user(NewUserRow {
                username: "mallory".into(),
                password: "not-a-hash".into(),
                first_name: "Mal".into(),
                last_name: "Lory".into(),
                phone: "555-0199".into(),
                join_at: now,
                last_login_at: now,
            })
            .await
            .unwrap();

        let err = dir.authenticate("mallory", "not-a-hash").await.unwrap_err();
        assert!(matches!(err, UserError::Hashing(_)));
        assert_eq!(err.status(), 500);
    }

    #[tokio::test]
    async fn get_unknown_user_is_not_found() {
        let (dir, _) = directory();
        let err = dir.get("nonexistent").await.unwrap_err();
        assert!(matches!(err, UserError::NotFound(ref u) if u == "nonexistent"));
        assert_eq!(err.status(), 404);
    }

    #[tokio::test]
    async fn login_timestamp_moves_forward() {
        let (dir, _) = directory();
        dir.register(input("erin", "pw")).await.unwrap();
        let before = dir.get("erin").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        dir.update_login_timestamp("erin").await.unwrap();
        let after = dir.get("erin").await.unwrap();
        assert_eq!(after.join_at, before.join_at);
        assert!(after.last_login_at > before.last_login_at);
    }

    #[tokio::test]
    async fn login_timestamp_for_unknown_user_is_silent() {
        let (dir, _) = directory();
        dir.update_login_timestamp("ghost").await.unwrap();
        assert!(dir.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn messages_without_traffic_are_empty() {
        let (dir, _) = directory();
        dir.register(input("quiet", "pw")).await.unwrap();
        assert!(dir.messages_from("quiet").await.unwrap().is_empty());
        assert!(dir.messages_to("quiet").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn messages_for_unknown_user_are_not_found() {
        let (dir, _) = directory();
        assert!(matches!(
            dir.messages_from("nobody").await.unwrap_err(),
            UserError::NotFound(_)
        ));
        assert!(matches!(
            dir.messages_to("nobody").await.unwrap_err(),
            UserError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn messages_carry_counterpart_profiles() {
        let (dir, store) = directory();
        dir.register(input("alice", "pw")).await.unwrap();
        dir.register(input("bob", "pw")).await.unwrap();
        let id = store.insert_message("alice", "bob", "lunch?").unwrap();

        let sent = dir.messages_from("alice").await.unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id, id);
        assert_eq!(sent[0].body, "lunch?");
        assert!(sent[0].read_at.is_none());
        let bob = dir.get("bob").await.unwrap();
        assert_eq!(sent[0].to_user.username, bob.username);
        assert_eq!(sent[0].to_user.first_name, bob.first_name);
        assert_eq!(sent[0].to_user.last_name, bob.last_name);
        assert_eq!(sent[0].to_user.phone, bob.phone);

        let received = dir.messages_to("bob").await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].from_user.username, "alice");
        assert_eq!(received[0].from_user.first_name, "alice-first");
        assert_eq!(received[0].sent_at, sent[0].sent_at);

        assert!(dir.messages_to("alice").await.unwrap().is_empty());
        assert!(dir.messages_from("bob").await.unwrap().is_empty());
    }
}
