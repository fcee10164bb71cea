use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::errors::RestError;

/// The only lifecycle state modelled for an account.
pub const STATUS_ACTIVE: &str = "active";

/// User record as it moves between the handler, the service and the store.
///
/// Deserializes from the create body: absent fields become empty strings and
/// the server-owned fields (`id`, `status`, `date_created`) are ignored.
/// Never serialized directly; responses go through [`User::marshall`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, FromRow)]
#[serde(default)]
pub struct User {
    #[serde(skip_deserializing)]
    pub id: i64,
    pub name: String,
    pub email: String,
    pub telegram_user: String,
    #[serde(skip_deserializing)]
    pub status: String,
    #[serde(skip_deserializing)]
    pub date_created: String,
    #[sqlx(default)]
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User as returned to the client. Has no password field at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub telegram_user: String,
    pub status: String,
    pub date_created: String,
}

impl User {
    /// Normalizes the record in place and rejects it when the email or the
    /// password is blank. Only the create path validates.
    pub fn validate(&mut self) -> Result<(), RestError> {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self.telegram_user = self.telegram_user.trim().to_lowercase();
        if self.email.is_empty() {
            return Err(RestError::bad_request("invalid email address"));
        }

        self.password = self.password.trim().to_string();
        if self.password.is_empty() {
            return Err(RestError::bad_request("invalid password"));
        }
        Ok(())
    }

    /// Projects the record for a response.
    ///
    /// `is_public` currently selects the same field set as the private view.
    /// It is kept so callers already pass the caller's visibility once it
    /// starts hiding contact fields.
    pub fn marshall(&self, _is_public: bool) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            telegram_user: self.telegram_user.clone(),
            status: self.status.clone(),
            date_created: self.date_created.clone(),
        }
    }
}

/// Element-wise [`User::marshall`], preserving order.
pub fn marshall_all(users: &[User], is_public: bool) -> Vec<PublicUser> {
    users.iter().map(|u| u.marshall(is_public)).collect()
}
