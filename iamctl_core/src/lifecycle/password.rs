//! Console passwords of existing users

use super::LifecycleOrchestrator;
use super::types::{PasswordRequest, PasswordResult, PasswordStatus};

impl LifecycleOrchestrator {
    /// Give an existing user its first console password
    pub async fn set_user_password(&self, request: PasswordRequest) -> PasswordResult {
        let PasswordRequest {
            username,
            password,
            require_reset,
        } = request;
        match self
            .directory
            .create_login_profile(&username, &password, require_reset)
            .await
        {
            Ok(_) => {
                log::info!("Set console password for '{username}'");
                PasswordResult::succeeded(username, PasswordStatus::CreatedSuccess)
            }
            Err(err) => {
                log::info!("Setting the password of '{username}' failed: {err}");
                PasswordResult::failed(username, &err)
            }
        }
    }

    /// Set many first passwords concurrently, results in request order
    pub async fn set_multiple_passwords(
        &self,
        requests: Vec<PasswordRequest>,
    ) -> Vec<PasswordResult> {
        let results = self
            .runner
            .run(
                "set passwords",
                requests,
                |request| request.username.clone(),
                |request| {
                    let orchestrator = self.clone();
                    async move { orchestrator.set_user_password(request).await }
                },
                PasswordResult::worker_failed,
            )
            .await;
        self.runner.progress().complete();
        results
    }

    /// Replace the password of a user that already has a login profile
    ///
    /// A user without a login profile reports `UserNotFound`; the error
    /// message tells the two cases apart.
    pub async fn update_user_password(&self, request: PasswordRequest) -> PasswordResult {
        let PasswordRequest {
            username,
            password,
            require_reset,
        } = request;
        match self
            .directory
            .update_login_profile(&username, &password, require_reset)
            .await
        {
            Ok(()) => {
                log::info!("Updated console password for '{username}'");
                PasswordResult::succeeded(username, PasswordStatus::UpdatedSuccess)
            }
            Err(err) => {
                log::info!("Updating the password of '{username}' failed: {err}");
                PasswordResult::failed(username, &err)
            }
        }
    }

    /// Update many passwords concurrently, results in request order
    pub async fn update_multiple_passwords(
        &self,
        requests: Vec<PasswordRequest>,
    ) -> Vec<PasswordResult> {
        let results = self
            .runner
            .run(
                "update passwords",
                requests,
                |request| request.username.clone(),
                |request| {
                    let orchestrator = self.clone();
                    async move { orchestrator.update_user_password(request).await }
                },
                PasswordResult::worker_failed,
            )
            .await;
        self.runner.progress().complete();
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientConfig;
    use crate::directory::{InMemoryDirectory, RemoteDirectory};
    use crate::error::ErrorKind;
    use std::sync::Arc;

    async fn orchestrator() -> (Arc<InMemoryDirectory>, LifecycleOrchestrator) {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.create_user("alice").await.unwrap();
        directory.create_user("bob").await.unwrap();
        directory
            .create_login_profile("bob", "first-password", false)
            .await
            .unwrap();
        let orchestrator = LifecycleOrchestrator::new(directory.clone(), &ClientConfig::default());
        (directory, orchestrator)
    }

    #[tokio::test]
    async fn test_set_password_classifies_each_outcome() {
        let (directory, orchestrator) = orchestrator().await;

        let results = orchestrator
            .set_multiple_passwords(vec![
                PasswordRequest::new("alice", "long-enough-pw").with_require_reset(true),
                PasswordRequest::new("bob", "long-enough-pw"),
                PasswordRequest::new("ghost", "long-enough-pw"),
            ])
            .await;

        assert_eq!(results[0].password_status, PasswordStatus::CreatedSuccess);
        assert!(results[0].success);
        assert!(
            directory
                .get_login_profile("alice")
                .await
                .unwrap()
                .password_reset_required
        );
        assert_eq!(results[1].password_status, PasswordStatus::AlreadyExists);
        assert_eq!(results[1].error_kind, Some(ErrorKind::Conflict));
        assert_eq!(results[2].password_status, PasswordStatus::UserNotFound);
        assert_eq!(results[2].error_kind, Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_set_password_rejected_by_policy() {
        let (_, orchestrator) = orchestrator().await;
        let result = orchestrator
            .set_user_password(PasswordRequest::new("alice", "short"))
            .await;

        assert!(!result.success);
        assert_eq!(result.password_status, PasswordStatus::PolicyViolation);
        assert_eq!(result.error_kind, Some(ErrorKind::PolicyViolation));
    }

    #[tokio::test]
    async fn test_update_password_needs_a_login_profile() {
        let (_, orchestrator) = orchestrator().await;

        let results = orchestrator
            .update_multiple_passwords(vec![
                PasswordRequest::new("bob", "second-password"),
                PasswordRequest::new("alice", "second-password"),
            ])
            .await;

        assert!(results[0].success);
        assert_eq!(results[0].password_status, PasswordStatus::UpdatedSuccess);
        assert!(!results[1].success);
        assert_eq!(results[1].password_status, PasswordStatus::UserNotFound);
        assert!(results[1].error.as_deref().unwrap().contains("Login Profile"));
    }
}
