//! Mock implementation of RemoteDirectory for testing

use async_trait::async_trait;
use iamctl_core::directory::{
    AccessKey, AccessKeyMetadata, AttachedPolicy, InMemoryDirectory, LoginProfile,
    RemoteDirectory, User,
};
use iamctl_core::error::{DirectoryError, DirectoryResult};
use rand::Rng;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Remote directory operations, used to address injected behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateUser,
    GetUser,
    DeleteUser,
    ListUsers,
    ListGroupsForUser,
    AddUserToGroup,
    RemoveUserFromGroup,
    ListAttachedUserPolicies,
    AttachUserPolicy,
    DetachUserPolicy,
    ListUserPolicies,
    PutUserPolicy,
    DeleteUserPolicy,
    ListAccessKeys,
    CreateAccessKey,
    DeleteAccessKey,
    CreateLoginProfile,
    GetLoginProfile,
    UpdateLoginProfile,
    DeleteLoginProfile,
    CreateGroup,
    ListGroups,
    GetGroupMembers,
    ListAttachedGroupPolicies,
    AttachGroupPolicy,
    DetachGroupPolicy,
    DeleteGroup,
}

impl Operation {
    /// True for operations that change directory state
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Operation::GetUser
                | Operation::ListUsers
                | Operation::ListGroups
                | Operation::ListGroupsForUser
                | Operation::ListAttachedUserPolicies
                | Operation::ListUserPolicies
                | Operation::ListAccessKeys
                | Operation::GetLoginProfile
                | Operation::GetGroupMembers
                | Operation::ListAttachedGroupPolicies
        )
    }
}

/// One call observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: Operation,
    /// Identifying arguments in call order (user, group, ARN, key id, policy name)
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
enum Injected {
    Fail(DirectoryError),
    Panic,
    Hang,
}

#[derive(Debug, Clone)]
struct Rule {
    operation: Operation,
    /// Matches when any argument equals it; `None` matches every call
    target: Option<String>,
    action: Injected,
}

impl Rule {
    fn matches(&self, operation: Operation, args: &[&str]) -> bool {
        self.operation == operation
            && self
                .target
                .as_deref()
                .is_none_or(|target| args.contains(&target))
    }
}

/// Configuration for mock behavior
#[derive(Debug, Default)]
struct MockBehavior {
    rules: Vec<Rule>,
    latency: Option<(Duration, Duration)>,
}

/// Mock implementation of RemoteDirectory for testing
///
/// Calls are forwarded to an [`InMemoryDirectory`] unless a configured rule
/// intercepts them. Every call is recorded.
///
/// # Examples
///
/// ```rust,no_run
/// use iamctl_test_utils::{MockDirectory, Operation};
/// use iamctl_core::{DirectoryError, RemoteDirectory};
///
/// # async fn example() {
/// let mock = MockDirectory::new();
/// mock.fail(
///     Operation::CreateUser,
///     "bob",
///     DirectoryError::from_vendor("Throttling", "Rate exceeded"),
/// );
///
/// assert!(mock.create_user("alice").await.is_ok());
/// assert!(mock.create_user("bob").await.is_err());
/// # }
/// ```
#[derive(Clone)]
pub struct MockDirectory {
    inner: InMemoryDirectory,
    behavior: Arc<Mutex<MockBehavior>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl Default for MockDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDirectory {
    /// Create a new mock over an empty directory
    pub fn new() -> Self {
        Self::with_directory(InMemoryDirectory::new())
    }

    /// Create a mock over an existing directory
    pub fn with_directory(inner: InMemoryDirectory) -> Self {
        Self {
            inner,
            behavior: Arc::new(Mutex::new(MockBehavior::default())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The backing directory, for seeding and inspecting state
    pub fn inner(&self) -> &InMemoryDirectory {
        &self.inner
    }

    /// Fail calls of `operation` involving `target` with `error`
    pub fn fail(&self, operation: Operation, target: impl Into<String>, error: DirectoryError) {
        self.add_rule(operation, Some(target.into()), Injected::Fail(error));
    }

    /// Fail every call of `operation` with `error`
    pub fn fail_all(&self, operation: Operation, error: DirectoryError) {
        self.add_rule(operation, None, Injected::Fail(error));
    }

    /// Panic inside calls of `operation` involving `target`
    pub fn panic_on(&self, operation: Operation, target: impl Into<String>) {
        self.add_rule(operation, Some(target.into()), Injected::Panic);
    }

    /// Never complete calls of `operation` involving `target`
    pub fn hang_on(&self, operation: Operation, target: impl Into<String>) {
        self.add_rule(operation, Some(target.into()), Injected::Hang);
    }

    /// Delay every call by a random duration in `min..=max`
    pub fn set_latency(&self, min: Duration, max: Duration) {
        self.behavior.lock().unwrap().latency = Some((min, max.max(min)));
    }

    /// Remove all injected behavior
    pub fn reset(&self) {
        let mut behavior = self.behavior.lock().unwrap();
        behavior.rules.clear();
        behavior.latency = None;
    }

    /// All recorded calls in arrival order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls of `operation`
    pub fn call_count(&self, operation: Operation) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Recorded calls that change directory state
    pub fn mutating_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation.is_mutation())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn add_rule(&self, operation: Operation, target: Option<String>, action: Injected) {
        self.behavior.lock().unwrap().rules.push(Rule {
            operation,
            target,
            action,
        });
    }

    /// Record the call and decide what to inject; no lock outlives this function
    fn plan(&self, operation: Operation, args: &[&str]) -> (Option<Duration>, Option<Injected>) {
        self.calls.lock().unwrap().push(RecordedCall {
            operation,
            args: args.iter().map(|a| a.to_string()).collect(),
        });

        let behavior = self.behavior.lock().unwrap();
        let delay = behavior.latency.map(|(min, max)| {
            if min == max {
                min
            } else {
                rand::rng().random_range(min..=max)
            }
        });
        let action = behavior
            .rules
            .iter()
            .find(|rule| rule.matches(operation, args))
            .map(|rule| rule.action.clone());
        (delay, action)
    }

    async fn intercept(&self, operation: Operation, args: &[&str]) -> DirectoryResult<()> {
        let (delay, action) = self.plan(operation, args);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match action {
            None => Ok(()),
            Some(Injected::Fail(error)) => Err(error),
            Some(Injected::Panic) => panic!("injected panic in {operation:?} for {args:?}"),
            Some(Injected::Hang) => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl RemoteDirectory for MockDirectory {
    async fn create_user(&self, user_name: &str) -> DirectoryResult<User> {
        self.intercept(Operation::CreateUser, &[user_name]).await?;
        self.inner.create_user(user_name).await
    }

    async fn get_user(&self, user_name: &str) -> DirectoryResult<User> {
        self.intercept(Operation::GetUser, &[user_name]).await?;
        self.inner.get_user(user_name).await
    }

    async fn delete_user(&self, user_name: &str) -> DirectoryResult<()> {
        self.intercept(Operation::DeleteUser, &[user_name]).await?;
        self.inner.delete_user(user_name).await
    }

    async fn list_users(&self) -> DirectoryResult<Vec<User>> {
        self.intercept(Operation::ListUsers, &[]).await?;
        self.inner.list_users().await
    }

    async fn list_groups_for_user(&self, user_name: &str) -> DirectoryResult<Vec<String>> {
        self.intercept(Operation::ListGroupsForUser, &[user_name])
            .await?;
        self.inner.list_groups_for_user(user_name).await
    }

    async fn add_user_to_group(&self, group_name: &str, user_name: &str) -> DirectoryResult<()> {
        self.intercept(Operation::AddUserToGroup, &[group_name, user_name])
            .await?;
        self.inner.add_user_to_group(group_name, user_name).await
    }

    async fn remove_user_from_group(
        &self,
        group_name: &str,
        user_name: &str,
    ) -> DirectoryResult<()> {
        self.intercept(Operation::RemoveUserFromGroup, &[group_name, user_name])
            .await?;
        self.inner.remove_user_from_group(group_name, user_name).await
    }

    async fn list_attached_user_policies(
        &self,
        user_name: &str,
    ) -> DirectoryResult<Vec<AttachedPolicy>> {
        self.intercept(Operation::ListAttachedUserPolicies, &[user_name])
            .await?;
        self.inner.list_attached_user_policies(user_name).await
    }

    async fn attach_user_policy(&self, user_name: &str, policy_arn: &str) -> DirectoryResult<()> {
        self.intercept(Operation::AttachUserPolicy, &[user_name, policy_arn])
            .await?;
        self.inner.attach_user_policy(user_name, policy_arn).await
    }

    async fn detach_user_policy(&self, user_name: &str, policy_arn: &str) -> DirectoryResult<()> {
        self.intercept(Operation::DetachUserPolicy, &[user_name, policy_arn])
            .await?;
        self.inner.detach_user_policy(user_name, policy_arn).await
    }

    async fn list_user_policies(&self, user_name: &str) -> DirectoryResult<Vec<String>> {
        self.intercept(Operation::ListUserPolicies, &[user_name])
            .await?;
        self.inner.list_user_policies(user_name).await
    }

    async fn put_user_policy(
        &self,
        user_name: &str,
        policy_name: &str,
        policy_document: &str,
    ) -> DirectoryResult<()> {
        self.intercept(Operation::PutUserPolicy, &[user_name, policy_name])
            .await?;
        self.inner
            .put_user_policy(user_name, policy_name, policy_document)
            .await
    }

    async fn delete_user_policy(&self, user_name: &str, policy_name: &str) -> DirectoryResult<()> {
        self.intercept(Operation::DeleteUserPolicy, &[user_name, policy_name])
            .await?;
        self.inner.delete_user_policy(user_name, policy_name).await
    }

    async fn list_access_keys(&self, user_name: &str) -> DirectoryResult<Vec<AccessKeyMetadata>> {
        self.intercept(Operation::ListAccessKeys, &[user_name]).await?;
        self.inner.list_access_keys(user_name).await
    }

    async fn create_access_key(&self, user_name: &str) -> DirectoryResult<AccessKey> {
        self.intercept(Operation::CreateAccessKey, &[user_name])
            .await?;
        self.inner.create_access_key(user_name).await
    }

    async fn delete_access_key(&self, user_name: &str, access_key_id: &str) -> DirectoryResult<()> {
        self.intercept(Operation::DeleteAccessKey, &[user_name, access_key_id])
            .await?;
        self.inner.delete_access_key(user_name, access_key_id).await
    }

    async fn create_login_profile(
        &self,
        user_name: &str,
        password: &str,
        password_reset_required: bool,
    ) -> DirectoryResult<LoginProfile> {
        self.intercept(Operation::CreateLoginProfile, &[user_name])
            .await?;
        self.inner
            .create_login_profile(user_name, password, password_reset_required)
            .await
    }

    async fn get_login_profile(&self, user_name: &str) -> DirectoryResult<LoginProfile> {
        self.intercept(Operation::GetLoginProfile, &[user_name])
            .await?;
        self.inner.get_login_profile(user_name).await
    }

    async fn update_login_profile(
        &self,
        user_name: &str,
        password: &str,
        password_reset_required: bool,
    ) -> DirectoryResult<()> {
        self.intercept(Operation::UpdateLoginProfile, &[user_name])
            .await?;
        self.inner
            .update_login_profile(user_name, password, password_reset_required)
            .await
    }

    async fn delete_login_profile(&self, user_name: &str) -> DirectoryResult<()> {
        self.intercept(Operation::DeleteLoginProfile, &[user_name])
            .await?;
        self.inner.delete_login_profile(user_name).await
    }

    async fn create_group(&self, group_name: &str) -> DirectoryResult<()> {
        self.intercept(Operation::CreateGroup, &[group_name]).await?;
        self.inner.create_group(group_name).await
    }

    async fn list_groups(&self) -> DirectoryResult<Vec<String>> {
        self.intercept(Operation::ListGroups, &[]).await?;
        self.inner.list_groups().await
    }

    async fn get_group_members(&self, group_name: &str) -> DirectoryResult<Vec<String>> {
        self.intercept(Operation::GetGroupMembers, &[group_name])
            .await?;
        self.inner.get_group_members(group_name).await
    }

    async fn list_attached_group_policies(
        &self,
        group_name: &str,
    ) -> DirectoryResult<Vec<AttachedPolicy>> {
        self.intercept(Operation::ListAttachedGroupPolicies, &[group_name])
            .await?;
        self.inner.list_attached_group_policies(group_name).await
    }

    async fn attach_group_policy(&self, group_name: &str, policy_arn: &str) -> DirectoryResult<()> {
        self.intercept(Operation::AttachGroupPolicy, &[group_name, policy_arn])
            .await?;
        self.inner.attach_group_policy(group_name, policy_arn).await
    }

    async fn detach_group_policy(&self, group_name: &str, policy_arn: &str) -> DirectoryResult<()> {
        self.intercept(Operation::DetachGroupPolicy, &[group_name, policy_arn])
            .await?;
        self.inner.detach_group_policy(group_name, policy_arn).await
    }

    async fn delete_group(&self, group_name: &str) -> DirectoryResult<()> {
        self.intercept(Operation::DeleteGroup, &[group_name]).await?;
        self.inner.delete_group(group_name).await
    }
}
