use std::{future::Future, time::Duration};

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::error;

use crate::errors::RestError;
use crate::users::dto::{User, STATUS_ACTIVE};

const INSERT_USER: &str = r#"
    INSERT INTO users (name, email, telegram_user, status, password, date_created)
    VALUES ($1, $2, $3, $4, $5, $6)
    RETURNING id
"#;

const SELECT_USER_BY_ID: &str = r#"
    SELECT id, name, email, telegram_user, status, date_created
    FROM users
    WHERE id = $1
"#;

const SELECT_USER_BY_CREDENTIALS: &str = r#"
    SELECT id, name, email, telegram_user, status, date_created
    FROM users
    WHERE email = $1 AND password = $2 AND status = $3
"#;

/// Durable storage for users. Implementations classify their own failures.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// Inserts the user and writes the generated id back onto it.
    async fn save(&self, user: &mut User) -> Result<(), RestError>;

    async fn get(&self, user_id: i64) -> Result<User, RestError>;

    /// Looks up an active user whose stored digest equals `password_hash`.
    async fn find_by_credentials(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<User, RestError>;
}

#[derive(Debug, Error)]
enum StoreError {
    #[error(transparent)]
    Driver(#[from] sqlx::Error),
    #[error("store call exceeded {0:?}")]
    Deadline(Duration),
}

impl StoreError {
    fn is_no_rows(&self) -> bool {
        matches!(self, Self::Driver(sqlx::Error::RowNotFound))
    }
}

#[derive(Clone)]
pub struct PgUsersRepository {
    db: PgPool,
    query_timeout: Duration,
}

impl PgUsersRepository {
    pub fn new(db: PgPool, query_timeout: Duration) -> Self {
        Self { db, query_timeout }
    }

    async fn within_deadline<T, F>(&self, query: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, query).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Deadline(self.query_timeout)),
        }
    }
}

fn classify_save(e: StoreError) -> RestError {
    error!(error = %e, "error when trying to save user");
    RestError::internal("error saving user", e)
}

fn classify_get(user_id: i64, e: StoreError) -> RestError {
    // A missing row is a store failure here too; only login maps it to 404.
    error!(error = %e, user_id, "error when trying to get user by id");
    RestError::internal("error fetching user", e)
}

fn classify_find(e: StoreError) -> RestError {
    if e.is_no_rows() {
        return RestError::not_found("invalid user credentials");
    }
    error!(error = %e, "error when trying to get user by email and password");
    RestError::internal("error when trying to find user", e)
}

#[async_trait]
impl UsersRepository for PgUsersRepository {
    async fn save(&self, user: &mut User) -> Result<(), RestError> {
        let id = self
            .within_deadline(
                sqlx::query_scalar::<_, i64>(INSERT_USER)
                    .bind(&user.name)
                    .bind(&user.email)
                    .bind(&user.telegram_user)
                    .bind(&user.status)
                    .bind(&user.password)
                    .bind(&user.date_created)
                    .fetch_one(&self.db),
            )
            .await
            .map_err(classify_save)?;
        user.id = id;
        Ok(())
    }

    async fn get(&self, user_id: i64) -> Result<User, RestError> {
        self.within_deadline(
            sqlx::query_as::<_, User>(SELECT_USER_BY_ID)
                .bind(user_id)
                .fetch_one(&self.db),
        )
        .await
        .map_err(|e| classify_get(user_id, e))
    }

    async fn find_by_credentials(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<User, RestError> {
        self.within_deadline(
            sqlx::query_as::<_, User>(SELECT_USER_BY_CREDENTIALS)
                .bind(email)
                .bind(password_hash)
                .bind(STATUS_ACTIVE)
                .fetch_one(&self.db),
        )
        .await
        .map_err(classify_find)
    }
}
