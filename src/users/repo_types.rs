use sqlx::FromRow;
use time::OffsetDateTime;

/// A stored user record. `password_hash` and `otp` never leave the
/// service; the outward shape is `dto::UserView`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub name: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub mobile_number: String,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<String>,
    pub status: Option<String>,
    pub otp: Option<String>,
    pub image: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Candidate record for insertion; the id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub name: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub mobile_number: String,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<String>,
    pub status: Option<String>,
}
