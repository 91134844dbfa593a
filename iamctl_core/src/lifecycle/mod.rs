//! Lifecycle orchestration over a remote directory
//!
//! [`LifecycleOrchestrator`] exposes the batch operations over users, their
//! passwords, policies and groups, plus a few directory listings. Each batch
//! fans out one worker per item through the [`BatchRunner`] and returns one
//! result per input, in input order. A failing item never aborts or rolls
//! back its siblings.

mod create;
mod delete;
mod group;
mod membership;
mod password;
mod policy;
pub mod types;
mod validate;

pub use policy::{PolicySyncPlan, plan_policy_sync};
pub use types::{
    AttachPolicyRequest, AttachPolicyResult, DeletionStatus, GroupCreationResult,
    GroupDeletionRequest, GroupDeletionResult, GroupMembershipRequest, GroupMembershipResult,
    GroupStatus, MembershipChange, PasswordRequest, PasswordResult, PasswordStatus, PolicyFailure,
    PolicyOperation, SyncPoliciesRequest, SyncPoliciesResult, UserCreationRequest,
    UserCreationResult, UserDeletionRequest, UserDeletionResult, UserStatus,
};
pub use validate::{
    validate_attach_requests, validate_creation_requests, validate_membership_requests,
    validate_password_requests, validate_unique_names,
};

use crate::ClientConfig;
use crate::batch::BatchRunner;
use crate::dependencies::{
    DependencyCheckResult, DependencyInspector, GroupDependencies, GroupDependencyCheckResult,
    UserDependencies,
};
use crate::directory::{RemoteDirectory, User};
use crate::error::DirectoryResult;
use crate::progress::ProgressProvider;
use std::sync::Arc;

/// Batch lifecycle operations against one directory
#[derive(Clone)]
pub struct LifecycleOrchestrator {
    directory: Arc<dyn RemoteDirectory>,
    inspector: DependencyInspector,
    runner: BatchRunner,
}

impl LifecycleOrchestrator {
    pub fn new(directory: Arc<dyn RemoteDirectory>, config: &ClientConfig) -> Self {
        Self::with_runner(directory, BatchRunner::new(config))
    }

    pub fn with_runner(directory: Arc<dyn RemoteDirectory>, runner: BatchRunner) -> Self {
        let inspector = DependencyInspector::new(directory.clone(), runner.clone());
        Self {
            directory,
            inspector,
            runner,
        }
    }

    /// Report batch progress to the given provider
    pub fn with_progress(self, progress: Arc<dyn ProgressProvider>) -> Self {
        let runner = self.runner.with_progress(progress);
        Self::with_runner(self.directory, runner)
    }

    pub fn directory(&self) -> &Arc<dyn RemoteDirectory> {
        &self.directory
    }

    pub fn inspector(&self) -> &DependencyInspector {
        &self.inspector
    }

    /// Snapshot one user's dependencies
    pub async fn check_dependencies(&self, username: &str) -> DirectoryResult<UserDependencies> {
        self.inspector.check(username).await
    }

    /// Snapshot many users' dependencies concurrently
    pub async fn check_multiple_dependencies(
        &self,
        usernames: Vec<String>,
    ) -> Vec<DependencyCheckResult> {
        self.inspector.check_multiple(usernames).await
    }

    /// Snapshot one group's members and attached policies
    pub async fn check_group_dependencies(
        &self,
        group_name: &str,
    ) -> DirectoryResult<GroupDependencies> {
        self.inspector.check_group(group_name).await
    }

    /// Snapshot many groups concurrently
    pub async fn check_multiple_group_dependencies(
        &self,
        group_names: Vec<String>,
    ) -> Vec<GroupDependencyCheckResult> {
        self.inspector.check_groups(group_names).await
    }

    pub async fn list_users(&self) -> DirectoryResult<Vec<User>> {
        self.directory.list_users().await
    }

    pub async fn list_groups(&self) -> DirectoryResult<Vec<String>> {
        self.directory.list_groups().await
    }

    /// Names of a group's members
    pub async fn list_group_members(&self, group_name: &str) -> DirectoryResult<Vec<String>> {
        self.directory.get_group_members(group_name).await
    }
}
