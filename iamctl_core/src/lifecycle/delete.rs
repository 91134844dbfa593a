//! Batch user deletion with optional forced cleanup
//!
//! Cleanup is best-effort: each removal step may fail without stopping the
//! following ones, and only the final delete decides the outcome. A forced
//! delete whose final call fails can leave the user partially detached.

use super::LifecycleOrchestrator;
use super::types::{DeletionStatus, UserDeletionRequest, UserDeletionResult};
use crate::dependencies::UserDependencies;

pub(crate) const USER_NOT_FOUND: &str = "User does not exist";
pub(crate) const USER_HAS_DEPENDENCIES: &str = "User has dependencies that must be removed first";

fn record_cleanup_failure(
    errors: &mut Vec<String>,
    entity: &str,
    step: String,
    err: impl std::fmt::Display,
) {
    log::warn!("Cleanup of '{entity}': {step} failed: {err}");
    errors.push(format!("{step}: {err}"));
}

impl LifecycleOrchestrator {
    /// Delete one user, removing its dependencies first if `force` is set
    pub async fn delete_user(&self, request: UserDeletionRequest) -> UserDeletionResult {
        let username = request.username;
        let mut cleanup_errors = Vec::new();

        if request.force {
            match self.inspector.check(&username).await {
                Ok(dependencies) => {
                    cleanup_errors = self
                        .remove_user_dependencies(&username, &dependencies)
                        .await;
                }
                Err(err) => {
                    log::debug!("Skipping cleanup of '{username}': {err}");
                }
            }
        }

        match self.directory.delete_user(&username).await {
            Ok(()) => {
                log::info!("Deleted user '{username}'");
                UserDeletionResult {
                    username,
                    success: true,
                    status: DeletionStatus::Deleted,
                    error: None,
                    error_kind: None,
                    cleanup_errors,
                }
            }
            Err(err) => {
                log::info!("Deleting user '{username}' failed: {err}");
                let status = DeletionStatus::from_error(&err);
                let error = match status {
                    DeletionStatus::NotFound => USER_NOT_FOUND.to_string(),
                    DeletionStatus::HasDependencies => USER_HAS_DEPENDENCIES.to_string(),
                    _ => err.to_string(),
                };
                UserDeletionResult {
                    username,
                    success: false,
                    status,
                    error: Some(error),
                    error_kind: Some(err.kind()),
                    cleanup_errors,
                }
            }
        }
    }

    /// Delete many users concurrently, one result per request in the same order
    pub async fn delete_multiple(
        &self,
        requests: Vec<UserDeletionRequest>,
    ) -> Vec<UserDeletionResult> {
        let results = self
            .runner
            .run(
                "delete users",
                requests,
                |request| request.username.clone(),
                |request| {
                    let orchestrator = self.clone();
                    async move { orchestrator.delete_user(request).await }
                },
                UserDeletionResult::worker_failed,
            )
            .await;
        self.runner.progress().complete();
        results
    }

    /// Remove everything in `dependencies`, returning the swallowed failures
    async fn remove_user_dependencies(
        &self,
        username: &str,
        dependencies: &UserDependencies,
    ) -> Vec<String> {
        let mut errors = Vec::new();

        for group in &dependencies.groups {
            if let Err(err) = self.directory.remove_user_from_group(group, username).await {
                record_cleanup_failure(
                    &mut errors,
                    username,
                    format!("remove from group {group}"),
                    err,
                );
            }
        }

        // Re-list so attachments made after the snapshot are detached too
        match self.directory.list_attached_user_policies(username).await {
            Ok(policies) => {
                for policy in policies {
                    if let Err(err) = self
                        .directory
                        .detach_user_policy(username, &policy.policy_arn)
                        .await
                    {
                        record_cleanup_failure(
                            &mut errors,
                            username,
                            format!("detach policy {}", policy.policy_arn),
                            err,
                        );
                    }
                }
            }
            Err(err) => {
                record_cleanup_failure(
                    &mut errors,
                    username,
                    "list attached policies".to_string(),
                    err,
                );
            }
        }

        for policy_name in &dependencies.inline_policies {
            if let Err(err) = self.directory.delete_user_policy(username, policy_name).await {
                record_cleanup_failure(
                    &mut errors,
                    username,
                    format!("delete inline policy {policy_name}"),
                    err,
                );
            }
        }

        for access_key_id in &dependencies.access_keys {
            if let Err(err) = self.directory.delete_access_key(username, access_key_id).await {
                record_cleanup_failure(
                    &mut errors,
                    username,
                    format!("delete access key {access_key_id}"),
                    err,
                );
            }
        }

        if dependencies.has_login_profile
            && let Err(err) = self.directory.delete_login_profile(username).await
        {
            record_cleanup_failure(
                &mut errors,
                username,
                "delete login profile".to_string(),
                err,
            );
        }

        errors
    }
}
