//! Remote identity directory capability
//!
//! The orchestrator never talks to a provider SDK directly. Every remote call
//! goes through [`RemoteDirectory`], which is passed in as an
//! `Arc<dyn RemoteDirectory>` so tests and offline tooling can supply their
//! own implementation.

pub mod memory;

pub use memory::{DirectorySnapshot, InMemoryDirectory, PasswordPolicy};

use crate::error::DirectoryResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A directory user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_name: String,
    pub user_id: String,
    pub arn: String,
    pub create_date: DateTime<Utc>,
}

/// A managed policy attached to a user or group
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttachedPolicy {
    pub policy_name: String,
    pub policy_arn: String,
}

impl AttachedPolicy {
    /// Build an attachment from an ARN, using the last path segment as its name
    pub fn from_arn(policy_arn: &str) -> Self {
        let policy_name = policy_arn
            .rsplit('/')
            .next()
            .unwrap_or(policy_arn)
            .to_string();
        Self {
            policy_name,
            policy_arn: policy_arn.to_string(),
        }
    }
}

/// Access key status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessKeyStatus {
    Active,
    Inactive,
}

/// Access key metadata as returned by a listing (no secret)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessKeyMetadata {
    pub user_name: String,
    pub access_key_id: String,
    pub status: AccessKeyStatus,
    pub create_date: DateTime<Utc>,
}

/// Newly created access key, the only time the secret is visible
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessKey {
    pub user_name: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub status: AccessKeyStatus,
    pub create_date: DateTime<Utc>,
}

/// Console login profile of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginProfile {
    pub user_name: String,
    pub password_reset_required: bool,
    pub create_date: DateTime<Utc>,
}

/// Single-entity operations against a remote identity directory
///
/// Each call either succeeds or fails with a classifiable
/// [`DirectoryError`](crate::error::DirectoryError). Implementations must be
/// safe to call concurrently from many tasks.
#[async_trait]
pub trait RemoteDirectory: Send + Sync {
    // Users

    async fn create_user(&self, user_name: &str) -> DirectoryResult<User>;

    async fn get_user(&self, user_name: &str) -> DirectoryResult<User>;

    async fn delete_user(&self, user_name: &str) -> DirectoryResult<()>;

    /// Every user, ordered by name
    async fn list_users(&self) -> DirectoryResult<Vec<User>>;

    // Group membership

    /// Names of the groups the user belongs to
    async fn list_groups_for_user(&self, user_name: &str) -> DirectoryResult<Vec<String>>;

    async fn add_user_to_group(&self, group_name: &str, user_name: &str) -> DirectoryResult<()>;

    async fn remove_user_from_group(&self, group_name: &str, user_name: &str)
    -> DirectoryResult<()>;

    // Managed policies

    async fn list_attached_user_policies(
        &self,
        user_name: &str,
    ) -> DirectoryResult<Vec<AttachedPolicy>>;

    /// Attach a managed policy; attaching an already-attached ARN is a no-op
    async fn attach_user_policy(&self, user_name: &str, policy_arn: &str) -> DirectoryResult<()>;

    async fn detach_user_policy(&self, user_name: &str, policy_arn: &str) -> DirectoryResult<()>;

    // Inline policies

    /// Names of the user's inline policies
    async fn list_user_policies(&self, user_name: &str) -> DirectoryResult<Vec<String>>;

    async fn put_user_policy(
        &self,
        user_name: &str,
        policy_name: &str,
        policy_document: &str,
    ) -> DirectoryResult<()>;

    async fn delete_user_policy(&self, user_name: &str, policy_name: &str)
    -> DirectoryResult<()>;

    // Access keys

    async fn list_access_keys(&self, user_name: &str) -> DirectoryResult<Vec<AccessKeyMetadata>>;

    async fn create_access_key(&self, user_name: &str) -> DirectoryResult<AccessKey>;

    async fn delete_access_key(&self, user_name: &str, access_key_id: &str)
    -> DirectoryResult<()>;

    // Login profiles

    async fn create_login_profile(
        &self,
        user_name: &str,
        password: &str,
        password_reset_required: bool,
    ) -> DirectoryResult<LoginProfile>;

    /// Fails with `NoSuchEntity` when the user has no login profile
    async fn get_login_profile(&self, user_name: &str) -> DirectoryResult<LoginProfile>;

    /// Replace the password of an existing login profile
    ///
    /// Fails with `NoSuchEntity` when the user has no login profile.
    async fn update_login_profile(
        &self,
        user_name: &str,
        password: &str,
        password_reset_required: bool,
    ) -> DirectoryResult<()>;

    async fn delete_login_profile(&self, user_name: &str) -> DirectoryResult<()>;

    // Groups

    async fn create_group(&self, group_name: &str) -> DirectoryResult<()>;

    /// Names of every group, ordered
    async fn list_groups(&self) -> DirectoryResult<Vec<String>>;

    /// Names of the group's members
    async fn get_group_members(&self, group_name: &str) -> DirectoryResult<Vec<String>>;

    async fn list_attached_group_policies(
        &self,
        group_name: &str,
    ) -> DirectoryResult<Vec<AttachedPolicy>>;

    async fn attach_group_policy(&self, group_name: &str, policy_arn: &str)
    -> DirectoryResult<()>;

    async fn detach_group_policy(&self, group_name: &str, policy_arn: &str)
    -> DirectoryResult<()>;

    async fn delete_group(&self, group_name: &str) -> DirectoryResult<()>;
}
