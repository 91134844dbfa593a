//! Dependency inspection for users and groups
//!
//! A dependency snapshot describes everything that blocks deleting an entity
//! at the moment it was read. Snapshots are never cached: remote state may
//! change between the check and any decision made on it.

use crate::batch::{BatchItem, BatchRunner, WorkerFailure};
use crate::directory::RemoteDirectory;
use crate::error::{DirectoryResult, ErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Everything attached to a user that blocks its deletion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDependencies {
    /// Group names the user belongs to
    pub groups: BTreeSet<String>,
    /// Attached managed policy names
    pub managed_policies: BTreeSet<String>,
    /// Attached managed policy ARNs
    pub managed_policy_arns: BTreeSet<String>,
    /// Inline policy names
    pub inline_policies: BTreeSet<String>,
    /// Access key ids
    pub access_keys: BTreeSet<String>,
    pub has_login_profile: bool,
}

impl UserDependencies {
    /// True if any category is non-empty
    pub fn has_dependencies(&self) -> bool {
        !self.groups.is_empty()
            || !self.managed_policies.is_empty()
            || !self.inline_policies.is_empty()
            || !self.access_keys.is_empty()
            || self.has_login_profile
    }
}

/// Everything attached to a group that blocks its deletion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDependencies {
    pub members: BTreeSet<String>,
    pub attached_policy_arns: BTreeSet<String>,
}

impl GroupDependencies {
    pub fn has_dependencies(&self) -> bool {
        !self.members.is_empty() || !self.attached_policy_arns.is_empty()
    }
}

/// Outcome of checking one user in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyCheckResult {
    pub username: String,
    /// Present iff the check succeeded
    pub dependencies: Option<UserDependencies>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl DependencyCheckResult {
    fn failed(username: &str, kind: ErrorKind, error: String) -> Self {
        Self {
            username: username.to_string(),
            dependencies: None,
            error: Some(error),
            error_kind: Some(kind),
        }
    }
}

impl BatchItem for DependencyCheckResult {
    fn is_success(&self) -> bool {
        self.dependencies.is_some()
    }
}

/// Outcome of checking one group in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDependencyCheckResult {
    pub group_name: String,
    pub dependencies: Option<GroupDependencies>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl BatchItem for GroupDependencyCheckResult {
    fn is_success(&self) -> bool {
        self.dependencies.is_some()
    }
}

/// Read-only inspector assembling dependency snapshots
#[derive(Clone)]
pub struct DependencyInspector {
    directory: Arc<dyn RemoteDirectory>,
    runner: BatchRunner,
}

/// Degrade a failed listing to an empty result
fn or_empty<T: Default>(result: DirectoryResult<T>, category: &str, entity: &str) -> T {
    result.unwrap_or_else(|err| {
        log::warn!("Listing {category} for '{entity}' failed, treating as empty: {err}");
        T::default()
    })
}

impl DependencyInspector {
    pub fn new(directory: Arc<dyn RemoteDirectory>, runner: BatchRunner) -> Self {
        Self { directory, runner }
    }

    /// Snapshot a user's dependencies
    ///
    /// Fails only if the user itself cannot be read. Any other failing listing
    /// leaves its category empty.
    pub async fn check(&self, username: &str) -> DirectoryResult<UserDependencies> {
        self.directory.get_user(username).await?;

        let directory = &self.directory;
        let (groups, policies, inline, keys, profile) = tokio::join!(
            directory.list_groups_for_user(username),
            directory.list_attached_user_policies(username),
            directory.list_user_policies(username),
            directory.list_access_keys(username),
            directory.get_login_profile(username),
        );

        let policies = or_empty(policies, "attached policies", username);
        let has_login_profile = match profile {
            Ok(_) => true,
            Err(err) if err.is_not_found() => false,
            Err(err) => {
                log::warn!("Reading login profile of '{username}' failed, assuming present: {err}");
                true
            }
        };

        Ok(UserDependencies {
            groups: or_empty(groups, "groups", username).into_iter().collect(),
            managed_policies: policies.iter().map(|p| p.policy_name.clone()).collect(),
            managed_policy_arns: policies.into_iter().map(|p| p.policy_arn).collect(),
            inline_policies: or_empty(inline, "inline policies", username)
                .into_iter()
                .collect(),
            access_keys: or_empty(keys, "access keys", username)
                .into_iter()
                .map(|k| k.access_key_id)
                .collect(),
            has_login_profile,
        })
    }

    /// Check many users concurrently, one result per input in the same order
    pub async fn check_multiple(&self, usernames: Vec<String>) -> Vec<DependencyCheckResult> {
        let results = self
            .runner
            .run(
                "check dependencies",
                usernames,
                |name| name.clone(),
                |username| {
                    let inspector = self.clone();
                    async move {
                        match inspector.check(&username).await {
                            Ok(dependencies) => DependencyCheckResult {
                                username,
                                dependencies: Some(dependencies),
                                error: None,
                                error_kind: None,
                            },
                            Err(err) => DependencyCheckResult::failed(
                                &username,
                                err.kind(),
                                err.to_string(),
                            ),
                        }
                    }
                },
                |username, failure: WorkerFailure| {
                    DependencyCheckResult::failed(username, failure.kind(), failure.to_string())
                },
            )
            .await;
        self.runner.progress().complete();
        results
    }

    /// Snapshot a group's members and attached policies
    pub async fn check_group(&self, group_name: &str) -> DirectoryResult<GroupDependencies> {
        let members = self.directory.get_group_members(group_name).await?;
        let policies = or_empty(
            self.directory.list_attached_group_policies(group_name).await,
            "attached policies",
            group_name,
        );

        Ok(GroupDependencies {
            members: members.into_iter().collect(),
            attached_policy_arns: policies.into_iter().map(|p| p.policy_arn).collect(),
        })
    }

    /// Check many groups concurrently
    pub async fn check_groups(&self, group_names: Vec<String>) -> Vec<GroupDependencyCheckResult> {
        fn failed(group_name: &str, kind: ErrorKind, error: String) -> GroupDependencyCheckResult {
            GroupDependencyCheckResult {
                group_name: group_name.to_string(),
                dependencies: None,
                error: Some(error),
                error_kind: Some(kind),
            }
        }

        let results = self
            .runner
            .run(
                "check group dependencies",
                group_names,
                |name| name.clone(),
                |group_name| {
                    let inspector = self.clone();
                    async move {
                        match inspector.check_group(&group_name).await {
                            Ok(dependencies) => GroupDependencyCheckResult {
                                group_name,
                                dependencies: Some(dependencies),
                                error: None,
                                error_kind: None,
                            },
                            Err(err) => failed(&group_name, err.kind(), err.to_string()),
                        }
                    }
                },
                |group_name, failure: WorkerFailure| {
                    failed(group_name, failure.kind(), failure.to_string())
                },
            )
            .await;
        self.runner.progress().complete();
        results
    }
}
