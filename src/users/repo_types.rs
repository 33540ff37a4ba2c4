use sqlx::FromRow;
use time::OffsetDateTime;

/// Row written by registration.
#[derive(Debug, Clone)]
pub struct NewUserRow {
    pub username: String,
    pub password: String, // digest, never plaintext
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub join_at: OffsetDateTime,
    pub last_login_at: OffsetDateTime,
}

/// Columns returned by `INSERT ... RETURNING`.
#[derive(Debug, Clone, FromRow)]
pub struct InsertedUserRow {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// A message joined with the profile of the user on the other end.
#[derive(Debug, Clone, FromRow)]
pub struct MessageRow {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub body: String,
    pub sent_at: OffsetDateTime,
    pub read_at: Option<OffsetDateTime>,
}
