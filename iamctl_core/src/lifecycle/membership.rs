//! Batch group membership changes

use super::LifecycleOrchestrator;
use super::types::{GroupMembershipRequest, GroupMembershipResult, MembershipChange};
use crate::batch::WorkerFailure;

impl LifecycleOrchestrator {
    /// Add one user to one group; adding an existing member is a no-op
    pub async fn add_user_to_group(
        &self,
        request: GroupMembershipRequest,
    ) -> GroupMembershipResult {
        self.change_membership(request, MembershipChange::Add).await
    }

    /// Remove one user from one group
    pub async fn remove_user_from_group(
        &self,
        request: GroupMembershipRequest,
    ) -> GroupMembershipResult {
        self.change_membership(request, MembershipChange::Remove).await
    }

    /// Add many user/group pairs concurrently, results in request order
    pub async fn add_users_to_groups(
        &self,
        requests: Vec<GroupMembershipRequest>,
    ) -> Vec<GroupMembershipResult> {
        self.change_memberships("add to groups", requests, MembershipChange::Add)
            .await
    }

    /// Remove many user/group pairs concurrently, results in request order
    pub async fn remove_users_from_groups(
        &self,
        requests: Vec<GroupMembershipRequest>,
    ) -> Vec<GroupMembershipResult> {
        self.change_memberships("remove from groups", requests, MembershipChange::Remove)
            .await
    }

    async fn change_membership(
        &self,
        request: GroupMembershipRequest,
        change: MembershipChange,
    ) -> GroupMembershipResult {
        let GroupMembershipRequest {
            group_name,
            username,
        } = &request;
        let outcome = match change {
            MembershipChange::Add => self.directory.add_user_to_group(group_name, username).await,
            MembershipChange::Remove => {
                self.directory
                    .remove_user_from_group(group_name, username)
                    .await
            }
        };

        match outcome {
            Ok(()) => {
                log::info!("Membership {change:?} of '{username}' in '{group_name}'");
                GroupMembershipResult::new(request, change, None)
            }
            Err(err) => {
                log::info!("Membership {change:?} of '{username}' in '{group_name}' failed: {err}");
                let error = Some((err.to_string(), err.kind()));
                GroupMembershipResult::new(request, change, error)
            }
        }
    }

    async fn change_memberships(
        &self,
        operation: &str,
        requests: Vec<GroupMembershipRequest>,
        change: MembershipChange,
    ) -> Vec<GroupMembershipResult> {
        let results = self
            .runner
            .run_keyed(
                operation,
                requests,
                GroupMembershipRequest::clone,
                |request| {
                    let orchestrator = self.clone();
                    async move { orchestrator.change_membership(request, change).await }
                },
                |request: &GroupMembershipRequest, failure: WorkerFailure| {
                    let error = Some((failure.to_string(), failure.kind()));
                    GroupMembershipResult::new(request.clone(), change, error)
                },
            )
            .await;
        self.runner.progress().complete();
        results
    }
}
