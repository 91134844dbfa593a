//! Batch user creation

use super::LifecycleOrchestrator;
use super::types::{PasswordStatus, UserCreationRequest, UserCreationResult, UserStatus};

impl LifecycleOrchestrator {
    /// Create one user and, if a password is given, its login profile
    ///
    /// A user whose password step fails is left in place; the caller detects
    /// that state through `password_status`.
    pub async fn create_user(&self, request: UserCreationRequest) -> UserCreationResult {
        let username = request.username.clone();
        let mut result = UserCreationResult {
            username: username.clone(),
            user_status: UserStatus::CreationError,
            password_status: PasswordStatus::NotAttempted,
            success: false,
            error: None,
            error_kind: None,
        };

        match self.directory.create_user(&username).await {
            Ok(_) => result.user_status = UserStatus::CreatedSuccess,
            Err(err) => {
                result.user_status = if err.is_already_exists() {
                    UserStatus::AlreadyExists
                } else {
                    UserStatus::CreationError
                };
                log::info!("Creating user '{username}' failed: {err}");
                result.error_kind = Some(err.kind());
                result.error = Some(err.to_string());
                return result;
            }
        }

        let Some(password) = request.password() else {
            log::info!("Created user '{username}'");
            result.success = true;
            return result;
        };

        match self
            .directory
            .create_login_profile(&username, password, request.require_reset)
            .await
        {
            Ok(_) => {
                log::info!("Created user '{username}' with login profile");
                result.password_status = PasswordStatus::CreatedSuccess;
                result.success = true;
            }
            Err(err) => {
                result.password_status = PasswordStatus::from_error(&err);
                if result.password_status == PasswordStatus::UserNotFound {
                    log::warn!(
                        "Login profile for '{username}' found no user right after creation"
                    );
                }
                log::info!("Created user '{username}' but setting its password failed: {err}");
                result.error_kind = Some(err.kind());
                result.error = Some(err.to_string());
            }
        }

        result
    }

    /// Create many users concurrently, one result per request in the same order
    pub async fn create_multiple(
        &self,
        requests: Vec<UserCreationRequest>,
    ) -> Vec<UserCreationResult> {
        let results = self
            .runner
            .run(
                "create users",
                requests,
                |request| request.username.clone(),
                |request| {
                    let orchestrator = self.clone();
                    async move { orchestrator.create_user(request).await }
                },
                UserCreationResult::worker_failed,
            )
            .await;
        self.runner.progress().complete();
        results
    }
}

#[cfg(test)]
mod tests {
    use crate::ClientConfig;
    use crate::directory::{InMemoryDirectory, PasswordPolicy, RemoteDirectory};
    use crate::error::ErrorKind;
    use crate::lifecycle::{
        LifecycleOrchestrator, PasswordStatus, UserCreationRequest, UserStatus,
    };
    use std::sync::Arc;

    fn orchestrator(directory: Arc<InMemoryDirectory>) -> LifecycleOrchestrator {
        LifecycleOrchestrator::new(directory, &ClientConfig::default())
    }

    #[tokio::test]
    async fn test_create_without_password() {
        let directory = Arc::new(InMemoryDirectory::new());
        let result = orchestrator(directory.clone())
            .create_user(UserCreationRequest::new("alice"))
            .await;

        assert!(result.success);
        assert_eq!(result.user_status, UserStatus::CreatedSuccess);
        assert_eq!(result.password_status, PasswordStatus::NotAttempted);
        assert!(directory.get_user("alice").await.is_ok());
    }

    #[tokio::test]
    async fn test_create_with_password_and_reset() {
        let directory = Arc::new(InMemoryDirectory::new());
        let result = orchestrator(directory.clone())
            .create_user(
                UserCreationRequest::new("alice")
                    .with_password("long-enough")
                    .with_require_reset(true),
            )
            .await;

        assert!(result.success);
        assert_eq!(result.password_status, PasswordStatus::CreatedSuccess);
        let profile = directory.get_login_profile("alice").await.unwrap();
        assert!(profile.password_reset_required);
    }

    #[tokio::test]
    async fn test_password_violation_keeps_user() {
        let directory = Arc::new(InMemoryDirectory::with_password_policy(PasswordPolicy {
            minimum_length: 20,
            ..Default::default()
        }));
        let result = orchestrator(directory.clone())
            .create_user(UserCreationRequest::new("alice").with_password("short"))
            .await;

        assert!(!result.success);
        assert_eq!(result.user_status, UserStatus::CreatedSuccess);
        assert_eq!(result.password_status, PasswordStatus::PolicyViolation);
        assert_eq!(result.error_kind, Some(ErrorKind::PolicyViolation));
        // No rollback of the created user
        assert!(directory.get_user("alice").await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_in_second_batch() {
        let directory = Arc::new(InMemoryDirectory::new());
        let orchestrator = orchestrator(directory.clone());

        let first = orchestrator
            .create_multiple(vec![UserCreationRequest::new("alice")])
            .await;
        let created = directory.get_user("alice").await.unwrap();

        let second = orchestrator
            .create_multiple(vec![UserCreationRequest::new("alice").with_password("long-enough")])
            .await;

        assert!(first[0].success);
        assert!(!second[0].success);
        assert_eq!(second[0].user_status, UserStatus::AlreadyExists);
        assert_eq!(second[0].password_status, PasswordStatus::NotAttempted);
        assert_eq!(directory.get_user("alice").await.unwrap(), created);
        assert!(directory.get_login_profile("alice").await.is_err());
    }

    #[tokio::test]
    async fn test_create_multiple_preserves_order() {
        let directory = Arc::new(InMemoryDirectory::new());
        let names: Vec<String> = (0..25).map(|i| format!("user{i:02}")).collect();
        let requests = names.iter().map(UserCreationRequest::new).collect();

        let results = orchestrator(directory.clone()).create_multiple(requests).await;

        assert_eq!(results.len(), names.len());
        for (result, name) in results.iter().zip(&names) {
            assert_eq!(&result.username, name);
            assert!(result.success);
        }
        assert_eq!(directory.user_count().await, 25);
    }
}
