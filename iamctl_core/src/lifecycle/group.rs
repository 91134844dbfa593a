//! Batch group creation and deletion

use super::LifecycleOrchestrator;
use super::types::{
    DeletionStatus, GroupCreationResult, GroupDeletionRequest, GroupDeletionResult, GroupStatus,
};
use crate::batch::WorkerFailure;

pub(crate) const GROUP_NOT_FOUND: &str = "Group does not exist";
pub(crate) const GROUP_HAS_DEPENDENCIES: &str =
    "Group has dependencies that must be removed first";

impl LifecycleOrchestrator {
    pub async fn create_group(&self, group_name: String) -> GroupCreationResult {
        match self.directory.create_group(&group_name).await {
            Ok(()) => {
                log::info!("Created group '{group_name}'");
                GroupCreationResult {
                    group_name,
                    status: GroupStatus::CreatedSuccess,
                    success: true,
                    error: None,
                    error_kind: None,
                }
            }
            Err(err) => {
                log::info!("Creating group '{group_name}' failed: {err}");
                let status = if err.is_already_exists() {
                    GroupStatus::AlreadyExists
                } else {
                    GroupStatus::CreationError
                };
                GroupCreationResult {
                    group_name,
                    status,
                    success: false,
                    error: Some(err.to_string()),
                    error_kind: Some(err.kind()),
                }
            }
        }
    }

    /// Create many groups concurrently, results in input order
    pub async fn create_groups(&self, group_names: Vec<String>) -> Vec<GroupCreationResult> {
        let results = self
            .runner
            .run(
                "create groups",
                group_names,
                |name| name.clone(),
                |group_name| {
                    let orchestrator = self.clone();
                    async move { orchestrator.create_group(group_name).await }
                },
                GroupCreationResult::worker_failed,
            )
            .await;
        self.runner.progress().complete();
        results
    }

    /// Delete one group, first detaching its policies and members if `force` is set
    ///
    /// Cleanup failures are collected but only the final delete is authoritative.
    pub async fn delete_group(&self, request: GroupDeletionRequest) -> GroupDeletionResult {
        let group_name = request.group_name;
        let mut cleanup_errors = Vec::new();

        if request.force {
            match self.inspector.check_group(&group_name).await {
                Ok(dependencies) => {
                    for arn in &dependencies.attached_policy_arns {
                        if let Err(err) =
                            self.directory.detach_group_policy(&group_name, arn).await
                        {
                            log::warn!(
                                "Cleanup of group '{group_name}': detach {arn} failed: {err}"
                            );
                            cleanup_errors.push(format!("detach policy {arn}: {err}"));
                        }
                    }
                    for member in &dependencies.members {
                        if let Err(err) = self
                            .directory
                            .remove_user_from_group(&group_name, member)
                            .await
                        {
                            log::warn!(
                                "Cleanup of group '{group_name}': remove {member} failed: {err}"
                            );
                            cleanup_errors.push(format!("remove member {member}: {err}"));
                        }
                    }
                }
                Err(err) => log::debug!("Skipping cleanup of group '{group_name}': {err}"),
            }
        }

        match self.directory.delete_group(&group_name).await {
            Ok(()) => {
                log::info!("Deleted group '{group_name}'");
                GroupDeletionResult {
                    group_name,
                    success: true,
                    status: DeletionStatus::Deleted,
                    error: None,
                    error_kind: None,
                    cleanup_errors,
                }
            }
            Err(err) => {
                log::info!("Deleting group '{group_name}' failed: {err}");
                let status = DeletionStatus::from_error(&err);
                let error = match status {
                    DeletionStatus::NotFound => GROUP_NOT_FOUND.to_string(),
                    DeletionStatus::HasDependencies => GROUP_HAS_DEPENDENCIES.to_string(),
                    _ => err.to_string(),
                };
                GroupDeletionResult {
                    group_name,
                    success: false,
                    status,
                    error: Some(error),
                    error_kind: Some(err.kind()),
                    cleanup_errors,
                }
            }
        }
    }

    /// Delete many groups concurrently, one result per request in the same order
    pub async fn delete_groups(
        &self,
        requests: Vec<GroupDeletionRequest>,
    ) -> Vec<GroupDeletionResult> {
        let results = self
            .runner
            .run(
                "delete groups",
                requests,
                |request| request.group_name.clone(),
                |request| {
                    let orchestrator = self.clone();
                    async move { orchestrator.delete_group(request).await }
                },
                |group_name, failure: WorkerFailure| GroupDeletionResult {
                    group_name: group_name.to_string(),
                    success: false,
                    status: DeletionStatus::DeletionError,
                    error: Some(failure.to_string()),
                    error_kind: Some(failure.kind()),
                    cleanup_errors: Vec::new(),
                },
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
    use std::sync::Arc;

    async fn populated_group() -> Arc<InMemoryDirectory> {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.create_group("ops").await.unwrap();
        directory.create_user("alice").await.unwrap();
        directory.add_user_to_group("ops", "alice").await.unwrap();
        directory.attach_group_policy("ops", "p1").await.unwrap();
        directory
    }

    #[tokio::test]
    async fn test_create_groups_reports_existing() {
        let directory = populated_group().await;
        let orchestrator = LifecycleOrchestrator::new(directory.clone(), &ClientConfig::default());

        let results = orchestrator
            .create_groups(vec!["dev".to_string(), "ops".to_string()])
            .await;

        assert!(results[0].success);
        assert_eq!(results[0].status, GroupStatus::CreatedSuccess);
        assert!(!results[1].success);
        assert_eq!(results[1].status, GroupStatus::AlreadyExists);
        assert_eq!(directory.list_groups().await.unwrap(), ["dev", "ops"]);
    }

    #[tokio::test]
    async fn test_delete_group_with_dependencies() {
        let directory = populated_group().await;
        let orchestrator = LifecycleOrchestrator::new(directory.clone(), &ClientConfig::default());

        let results = orchestrator
            .delete_groups(vec![
                GroupDeletionRequest::new("ops", false),
                GroupDeletionRequest::new("missing", false),
            ])
            .await;

        assert_eq!(results[0].status, DeletionStatus::HasDependencies);
        assert_eq!(results[0].error.as_deref(), Some(GROUP_HAS_DEPENDENCIES));
        assert_eq!(results[1].status, DeletionStatus::NotFound);
        assert_eq!(results[1].error.as_deref(), Some(GROUP_NOT_FOUND));
        assert!(directory.get_group_members("ops").await.is_ok());
    }

    #[tokio::test]
    async fn test_force_delete_group() {
        let directory = populated_group().await;
        let orchestrator = LifecycleOrchestrator::new(directory.clone(), &ClientConfig::default());

        let result = orchestrator
            .delete_group(GroupDeletionRequest::new("ops", true))
            .await;

        assert!(result.success, "{result:?}");
        assert!(directory.get_group_members("ops").await.unwrap_err().is_not_found());
        // The member survives, only its membership is gone
        assert!(directory.list_groups_for_user("alice").await.unwrap().is_empty());
    }
}
