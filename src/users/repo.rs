use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::error::{Result, UserError};
use crate::users::dto::{PublicUser, UserDetail};
use crate::users::repo_types::{InsertedUserRow, MessageRow, NewUserRow};

/// Data access for users and their messages. Implementations never
/// interpolate caller input into SQL.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `DuplicateKey` when the username is taken.
    async fn insert_user(&self, user: NewUserRow) -> Result<InsertedUserRow>;
    async fn find_password(&self, username: &str) -> Result<Option<String>>;
    /// Returns the number of rows touched.
    async fn touch_login(&self, username: &str, at: OffsetDateTime) -> Result<u64>;
    async fn list_users(&self) -> Result<Vec<PublicUser>>;
    async fn find_user(&self, username: &str) -> Result<Option<UserDetail>>;
    async fn user_exists(&self, username: &str) -> Result<bool>;
    /// Messages sent by `username`, each joined with the recipient profile.
    async fn messages_from(&self, username: &str) -> Result<Vec<MessageRow>>;
    /// Messages received by `username`, each joined with the sender profile.
    async fn messages_to(&self, username: &str) -> Result<Vec<MessageRow>>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert_user(&self, user: NewUserRow) -> Result<InsertedUserRow> {
        let inserted = sqlx::query_as::<_, InsertedUserRow>(
            r#"
            INSERT INTO users (username, password, first_name, last_name, phone, join_at, last_login_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING username, password, first_name, last_name, phone
            "#,
        )
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(user.join_at)
        .bind(user.last_login_at)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                UserError::DuplicateKey(user.username.clone())
            }
            other => other.into(),
        })?;
        Ok(inserted)
    }

    async fn find_password(&self, username: &str) -> Result<Option<String>> {
        let digest = sqlx::query_scalar::<_, String>(
            r#"SELECT password FROM users WHERE username = $1"#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(digest)
    }

    async fn touch_login(&self, username: &str, at: OffsetDateTime) -> Result<u64> {
        let done = sqlx::query(r#"UPDATE users SET last_login_at = $1 WHERE username = $2"#)
            .bind(at)
            .bind(username)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected())
    }

    async fn list_users(&self) -> Result<Vec<PublicUser>> {
        let users = sqlx::query_as::<_, PublicUser>(
            r#"SELECT username, first_name, last_name, phone FROM users"#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserDetail>> {
        let user = sqlx::query_as::<_, UserDetail>(
            r#"
            SELECT username, first_name, last_name, phone, join_at, last_login_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn user_exists(&self, username: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)"#,
        )
        .bind(username)
        .fetch_one(&self.db)
        .await?;
        Ok(exists)
    }

    async fn messages_from(&self, username: &str) -> Result<Vec<MessageRow>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT m.id, t.username, t.first_name, t.last_name, t.phone,
                   m.body, m.sent_at, m.read_at
            FROM messages AS m
            JOIN users AS t ON m.to_username = t.username
            WHERE m.from_username = $1
            ORDER BY m.sent_at, m.id
            "#,
        )
        .bind(username)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn messages_to(&self, username: &str) -> Result<Vec<MessageRow>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT m.id, f.username, f.first_name, f.last_name, f.phone,
                   m.body, m.sent_at, m.read_at
            FROM messages AS m
            JOIN users AS f ON m.from_username = f.username
            WHERE m.to_username = $1
            ORDER BY m.sent_at, m.id
            "#,
        )
        .bind(username)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
