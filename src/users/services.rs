use std::sync::Arc;

use async_trait::async_trait;
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};
use tracing::{error, info};

use crate::errors::RestError;
use crate::users::{
    dto::{LoginRequest, User, STATUS_ACTIVE},
    password::PasswordHasher,
    repo::UsersRepository,
};

/// Storage format of `date_created`, always UTC.
const DB_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Use cases exposed to the HTTP layer.
#[async_trait]
pub trait UsersService: Send + Sync {
    async fn create_user(&self, user: User) -> Result<User, RestError>;
    async fn get_user(&self, user_id: i64) -> Result<User, RestError>;
    async fn login_user(&self, request: LoginRequest) -> Result<User, RestError>;
}

pub struct DefaultUsersService {
    repo: Arc<dyn UsersRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl DefaultUsersService {
    pub fn new(repo: Arc<dyn UsersRepository>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { repo, hasher }
    }

    // Argon2 is CPU-bound; keep it off the async workers.
    async fn hash_password(&self, plain: String) -> Result<String, RestError> {
        let hasher = Arc::clone(&self.hasher);
        match tokio::task::spawn_blocking(move || hasher.hash(&plain)).await {
            Ok(Ok(hash)) => Ok(hash),
            Ok(Err(e)) => {
                error!(error = %e, "hash_password failed");
                Err(RestError::internal("error processing password", e))
            }
            Err(e) => {
                error!(error = %e, "hash_password task failed");
                Err(RestError::internal("error processing password", e))
            }
        }
    }
}

fn now_db_format() -> Result<String, RestError> {
    OffsetDateTime::now_utc()
        .format(DB_DATE_FORMAT)
        .map_err(|e| RestError::internal("error saving user", e))
}

#[async_trait]
impl UsersService for DefaultUsersService {
    async fn create_user(&self, mut user: User) -> Result<User, RestError> {
        user.validate()?;

        user.status = STATUS_ACTIVE.to_string();
        user.date_created = now_db_format()?;
        user.password = self.hash_password(std::mem::take(&mut user.password)).await?;
        self.repo.save(&mut user).await?;

        info!(user_id = user.id, email = %user.email, "user created");
        Ok(user)
    }

    async fn get_user(&self, user_id: i64) -> Result<User, RestError> {
        self.repo.get(user_id).await
    }

    // Emails are stored lowercased; the login email is matched as given.
    async fn login_user(&self, request: LoginRequest) -> Result<User, RestError> {
        let password_hash = self.hash_password(request.password).await?;
        let user = self
            .repo
            .find_by_credentials(&request.email, &password_hash)
            .await?;
        info!(user_id = user.id, "user logged in");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::password::{Argon2Hasher, Md5Hasher};
    use std::sync::Mutex;

    type SaveFn = Box<dyn Fn(&mut User) -> Result<(), RestError> + Send + Sync>;
    type GetFn = Box<dyn Fn(i64) -> Result<User, RestError> + Send + Sync>;
    type FindFn = Box<dyn Fn(&str, &str) -> Result<User, RestError> + Send + Sync>;

    /// Repository double driven by per-test closures. Records saved users.
    struct StubRepo {
        save: SaveFn,
        get: GetFn,
        find: FindFn,
        saved: Mutex<Vec<User>>,
    }

    impl StubRepo {
        fn new() -> Self {
            Self {
                save: Box::new(|_: &mut User| -> Result<(), RestError> {
                    panic!("save not expected")
                }),
                get: Box::new(|_: i64| -> Result<User, RestError> { panic!("get not expected") }),
                find: Box::new(|_: &str, _: &str| -> Result<User, RestError> {
                    panic!("find not expected")
                }),
                saved: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl UsersRepository for StubRepo {
        async fn save(&self, user: &mut User) -> Result<(), RestError> {
            (self.save)(user)?;
            self.saved.lock().unwrap().push(user.clone());
            Ok(())
        }

        async fn get(&self, user_id: i64) -> Result<User, RestError> {
            (self.get)(user_id)
        }

        async fn find_by_credentials(
            &self,
            email: &str,
            password_hash: &str,
        ) -> Result<User, RestError> {
            (self.find)(email, password_hash)
        }
    }

    fn service_with(repo: StubRepo) -> (DefaultUsersService, Arc<StubRepo>) {
        let repo = Arc::new(repo);
        let hasher = Arc::new(Argon2Hasher::new("service-test-salt").unwrap());
        (DefaultUsersService::new(repo.clone(), hasher), repo)
    }

    fn john(password: &str) -> User {
        User {
            name: "John".into(),
            email: "John@Mail.com ".into(),
            password: password.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_sets_server_fields_and_assigns_id() {
        let mut repo = StubRepo::new();
        repo.save = Box::new(|user: &mut User| {
            user.id = 666;
            Ok(())
        });
        let (service, repo) = service_with(repo);

        let created = service.create_user(john("admin")).await.expect("created");

        assert_eq!(created.id, 666);
        assert_eq!(created.status, STATUS_ACTIVE);
        assert_eq!(created.email, "john@mail.com");
        assert!(!created.date_created.is_empty());
        assert_ne!(created.password, "admin");
        assert!(created.password.starts_with("$argon2id$"));
        assert_eq!(repo.saved.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn date_created_uses_storage_format() {
        let mut repo = StubRepo::new();
        repo.save = Box::new(|_: &mut User| Ok(()));
        let (service, _) = service_with(repo);

        let created = service.create_user(john("admin")).await.unwrap();
        let parsed = time::PrimitiveDateTime::parse(&created.date_created, DB_DATE_FORMAT);
        assert!(parsed.is_ok(), "unexpected format: {}", created.date_created);
    }

    #[tokio::test]
    async fn create_with_missing_password_is_bad_request_and_skips_store() {
        let (service, repo) = service_with(StubRepo::new());

        let err = service.create_user(john("   ")).await.unwrap_err();

        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "invalid password");
        assert!(repo.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_with_blank_email_is_bad_request() {
        let (service, _) = service_with(StubRepo::new());
        let mut user = john("admin");
        user.email = "  ".into();

        let err = service.create_user(user).await.unwrap_err();
        assert_eq!(err.message(), "invalid email address");
    }

    #[tokio::test]
    async fn create_propagates_repository_failure_unchanged() {
        let mut repo = StubRepo::new();
        repo.save = Box::new(|_: &mut User| {
            Err(RestError::internal(
                "error saving user",
                std::io::Error::other("database error"),
            ))
        });
        let (service, _) = service_with(repo);

        let err = service.create_user(john("admin")).await.unwrap_err();
        assert!(matches!(err, RestError::InternalServerError { .. }));
        assert_eq!(err.message(), "error saving user");
    }

    #[tokio::test]
    async fn get_delegates_to_repository() {
        let mut repo = StubRepo::new();
        repo.get = Box::new(|id: i64| {
            Ok(User {
                id,
                name: "John".into(),
                ..Default::default()
            })
        });
        let (service, _) = service_with(repo);

        let user = service.get_user(666).await.unwrap();
        assert_eq!(user.id, 666);
        assert_eq!(user.name, "John");
    }

    #[tokio::test]
    async fn get_propagates_store_failure() {
        let mut repo = StubRepo::new();
        repo.get = Box::new(|_: i64| {
            Err(RestError::internal(
                "error fetching user",
                std::io::Error::other("no rows in result set"),
            ))
        });
        let (service, _) = service_with(repo);

        let err = service.get_user(9).await.unwrap_err();
        assert!(matches!(err, RestError::InternalServerError { .. }));
        assert_eq!(err.message(), "error fetching user");
    }

    #[tokio::test]
    async fn login_compares_the_same_digest_as_create() {
        let stored = Arc::new(Mutex::new(String::new()));
        let mut repo = StubRepo::new();
        let on_save = stored.clone();
        repo.save = Box::new(move |user: &mut User| {
            *on_save.lock().unwrap() = user.password.clone();
            user.id = 1;
            Ok(())
        });
        let on_find = stored.clone();
        repo.find = Box::new(move |email: &str, hash: &str| {
            if email == "john@mail.com" && hash == *on_find.lock().unwrap() {
                Ok(User {
                    id: 1,
                    email: email.into(),
                    status: STATUS_ACTIVE.into(),
                    ..Default::default()
                })
            } else {
                Err(RestError::not_found("invalid user credentials"))
            }
        });
        let (service, _) = service_with(repo);

        service.create_user(john("admin")).await.unwrap();

        let ok = service
            .login_user(LoginRequest {
                email: "john@mail.com".into(),
                password: "admin".into(),
            })
            .await
            .expect("login");
        assert_eq!(ok.id, 1);

        let wrong = service
            .login_user(LoginRequest {
                email: "john@mail.com".into(),
                password: "nope".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(wrong, RestError::NotFound(_)));
    }

    #[tokio::test]
    async fn login_does_not_normalize_email() {
        let seen = Arc::new(Mutex::new(String::new()));
        let mut repo = StubRepo::new();
        let on_find = seen.clone();
        repo.find = Box::new(move |email: &str, _: &str| {
            *on_find.lock().unwrap() = email.to_string();
            Err(RestError::not_found("invalid user credentials"))
        });
        let repo = Arc::new(repo);
        let service = DefaultUsersService::new(repo, Arc::new(Md5Hasher));

        let err = service
            .login_user(LoginRequest {
                email: " John@Mail.com".into(),
                password: "admin".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.message(), "invalid user credentials");
        assert_eq!(*seen.lock().unwrap(), " John@Mail.com");
    }

    #[derive(Debug)]
    struct FailingHasher;

    impl PasswordHasher for FailingHasher {
        fn hash(&self, _plain: &str) -> anyhow::Result<String> {
            anyhow::bail!("hasher unavailable")
        }
    }

    #[tokio::test]
    async fn hashing_failure_is_internal() {
        let service = DefaultUsersService::new(Arc::new(StubRepo::new()), Arc::new(FailingHasher));
        let err = service.create_user(john("admin")).await.unwrap_err();
        assert!(matches!(err, RestError::InternalServerError { .. }));
        assert_eq!(err.message(), "error processing password");
    }
}
