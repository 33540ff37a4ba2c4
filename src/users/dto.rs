use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::users::repo_types::{InsertedUserRow, MessageRow};

/// Registration input. `password` is plaintext here and nowhere else.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// Result of registration; `password` holds the stored digest.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RegisteredUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

impl From<InsertedUserRow> for RegisteredUser {
    fn from(r: InsertedUserRow) -> Self {
        Self {
            username: r.username,
            password: r.password,
            first_name: r.first_name,
            last_name: r.last_name,
            phone: r.phone,
        }
    }
}

/// Profile fields safe to show anyone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct PublicUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, sqlx::FromRow)]
pub struct UserDetail {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    #[serde(with = "time::serde::rfc3339")]
    pub join_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_login_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SentMessage {
    pub id: i64,
    pub to_user: PublicUser,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub sent_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub id: i64,
    pub from_user: PublicUser,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub sent_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,
}

fn split(r: MessageRow) -> (i64, PublicUser, String, OffsetDateTime, Option<OffsetDateTime>) {
    let other = PublicUser {
        username: r.username,
        first_name: r.first_name,
        last_name: r.last_name,
        phone: r.phone,
    };
    (r.id, other, r.body, r.sent_at, r.read_at)
}

impl From<MessageRow> for SentMessage {
    fn from(r: MessageRow) -> Self {
        let (id, to_user, body, sent_at, read_at) = split(r);
        Self { id, to_user, body, sent_at, read_at }
    }
}

impl From<MessageRow> for ReceivedMessage {
    fn from(r: MessageRow) -> Self {
        let (id, from_user, body, sent_at, read_at) = split(r);
        Self { id, from_user, body, sent_at, read_at }
    }
}
