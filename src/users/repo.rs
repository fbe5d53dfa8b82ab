use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{NewUser, User};
use crate::error::RepoError;

/// Durable store of user records. Uniqueness over username, email and
/// mobile number is enforced on the write path: `insert` and `update` are
/// conditional writes that surface `RepoError::Conflict` naming every
/// colliding field, so callers never need a check-then-act sequence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError>;
    async fn exists_by_id(&self, id: i64) -> Result<bool, RepoError>;
    async fn find_all(&self) -> Result<Vec<User>, RepoError>;
    /// Records whose username OR email equals `identifier`.
    async fn find_by_username_or_email(&self, identifier: &str) -> Result<Vec<User>, RepoError>;
    /// First record whose email OR mobile number equals `identifier`.
    async fn find_first_by_email_or_mobile_number(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, RepoError>;
    async fn insert(&self, new_user: NewUser) -> Result<User, RepoError>;
    async fn update(&self, user: User) -> Result<User, RepoError>;
    async fn delete_by_id(&self, id: i64) -> Result<(), RepoError>;
}

/// Postgres-backed repository. The unique indexes on `users` are the
/// source of truth for the uniqueness invariant.
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Name every unique field already taken by a record other than
    /// `exclude_id`. Field names match the client-facing conflict message.
    async fn colliding_fields(
        &self,
        username: &str,
        email: &str,
        mobile_number: &str,
        exclude_id: Option<i64>,
    ) -> Result<Vec<String>, RepoError> {
        let row: (Option<bool>, Option<bool>, Option<bool>) = sqlx::query_as(
            r#"
            SELECT bool_or(username = $1), bool_or(email = $2), bool_or(mobile_number = $3)
            FROM users
            WHERE (username = $1 OR email = $2 OR mobile_number = $3)
              AND ($4::bigint IS NULL OR id <> $4)
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(mobile_number)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        let mut fields = Vec::new();
        if row.0.unwrap_or(false) {
            fields.push("Username".to_string());
        }
        if row.1.unwrap_or(false) {
            fields.push("Email".to_string());
        }
        if row.2.unwrap_or(false) {
            fields.push("Mobile number".to_string());
        }
        Ok(fields)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, name, email, password_hash, mobile_number,
                   role, phone, address, gender, dob, status, otp, image, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn exists_by_id(&self, id: i64) -> Result<bool, RepoError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn find_all(&self) -> Result<Vec<User>, RepoError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, name, email, password_hash, mobile_number,
                   role, phone, address, gender, dob, status, otp, image, created_at
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> Result<Vec<User>, RepoError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, name, email, password_hash, mobile_number,
                   role, phone, address, gender, dob, status, otp, image, created_at
            FROM users
            WHERE username = $1 OR email = $1
            ORDER BY id
            "#,
        )
        .bind(identifier)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn find_first_by_email_or_mobile_number(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, name, email, password_hash, mobile_number,
                   role, phone, address, gender, dob, status, otp, image, created_at
            FROM users
            WHERE email = $1 OR mobile_number = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, RepoError> {
        let inserted = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, name, email, password_hash, mobile_number,
                               role, phone, address, gender, dob, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, username, name, email, password_hash, mobile_number,
                      role, phone, address, gender, dob, status, otp, image, created_at
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.mobile_number)
        .bind(&new_user.role)
        .bind(&new_user.phone)
        .bind(&new_user.address)
        .bind(&new_user.gender)
        .bind(&new_user.dob)
        .bind(&new_user.status)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(user) => Ok(user),
            Err(e) if is_unique_violation(&e) => {
                let fields = self
                    .colliding_fields(
                        &new_user.username,
                        &new_user.email,
                        &new_user.mobile_number,
                        None,
                    )
                    .await?;
                if fields.is_empty() {
                    // the conflicting row vanished between the insert and the lookup
                    return Err(RepoError::Database(e));
                }
                Err(RepoError::Conflict(fields))
            }
            Err(e) => Err(RepoError::Database(e)),
        }
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2, name = $3, email = $4, password_hash = $5,
                mobile_number = $6, role = $7, phone = $8, address = $9,
                gender = $10, dob = $11, status = $12, otp = $13, image = $14
            WHERE id = $1
            RETURNING id, username, name, email, password_hash, mobile_number,
                      role, phone, address, gender, dob, status, otp, image, created_at
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.mobile_number)
        .bind(&user.role)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.gender)
        .bind(&user.dob)
        .bind(&user.status)
        .bind(&user.otp)
        .bind(&user.image)
        .fetch_optional(&self.pool)
        .await;

        match updated {
            Ok(Some(updated)) => Ok(updated),
            Ok(None) => Err(RepoError::NotFound(user.id)),
            Err(e) if is_unique_violation(&e) => {
                let fields = self
                    .colliding_fields(&user.username, &user.email, &user.mobile_number, Some(user.id))
                    .await?;
                if fields.is_empty() {
                    return Err(RepoError::Database(e));
                }
                Err(RepoError::Conflict(fields))
            }
            Err(e) => Err(RepoError::Database(e)),
        }
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}
