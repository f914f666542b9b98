//! User entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use usermgmt_core::types::{DbId, Timestamp};

/// Full user row from the `users` table.
///
/// Contains the password hash and salt -- NEVER serialize this to API
/// responses directly. Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub age: i32,
    pub password_hash: String,
    pub salt: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Safe user representation for API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub age: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            age: user.age,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// DTO for inserting a new user. The caller generates `id`, the hash, and
/// the salt.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub age: i32,
    pub password_hash: String,
    pub salt: String,
}

/// DTO for updating an existing user. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
}

impl UpdateUser {
    /// Whether applying this update to `user` would change any column.
    pub fn changes(&self, user: &User) -> bool {
        self.name.as_ref().is_some_and(|n| *n != user.name)
            || self.email.as_ref().is_some_and(|e| *e != user.email)
            || self.age.is_some_and(|a| a != user.age)
    }
}
