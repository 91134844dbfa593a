//! In-memory directory implementation
//!
//! This module provides a [`RemoteDirectory`] backed by process memory that
//! reproduces the provider's observable semantics (conflicts, not-found,
//! password policy, key quotas). Its state can be persisted as a JSON
//! snapshot so the CLI can operate against a local directory file.

use crate::directory::{
    AccessKey, AccessKeyMetadata, AccessKeyStatus, AttachedPolicy, LoginProfile, RemoteDirectory,
    User,
};
use crate::error::{
    DirectoryError, DirectoryResult, ErrorCode, InternalError, Result, ValidationError,
};
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Maximum number of access keys a single user may hold
pub const MAX_ACCESS_KEYS_PER_USER: usize = 2;

const DEFAULT_ACCOUNT_ID: &str = "123456789012";

/// Password rules enforced by [`RemoteDirectory::create_login_profile`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub minimum_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_numbers: bool,
    pub require_symbols: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            minimum_length: 8,
            require_uppercase: false,
            require_lowercase: false,
            require_numbers: false,
            require_symbols: false,
        }
    }
}

impl PasswordPolicy {
    /// Same rules with a different minimum length, which must be at least one
    pub fn with_minimum_length(self, minimum_length: usize) -> Result<Self> {
        if minimum_length == 0 {
            return Err(ValidationError::invalid_configuration(
                "password minimum length must be at least 1",
            )
            .into());
        }
        Ok(Self {
            minimum_length,
            ..self
        })
    }

    /// Return the first rule the password breaks, if any
    pub fn violation(&self, password: &str) -> Option<String> {
        if password.chars().count() < self.minimum_length {
            return Some(format!(
                "Password should have a minimum length of {}",
                self.minimum_length
            ));
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            return Some("Password should have at least one uppercase letter".to_string());
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            return Some("Password should have at least one lowercase letter".to_string());
        }
        if self.require_numbers && !password.chars().any(|c| c.is_ascii_digit()) {
            return Some("Password should have at least one number".to_string());
        }
        if self.require_symbols && !password.chars().any(|c| c.is_ascii_punctuation()) {
            return Some("Password should have at least one symbol".to_string());
        }
        None
    }
}

/// Stored state of one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user: User,
    #[serde(default)]
    pub attached_policies: BTreeSet<String>,
    /// Inline policy name to policy document
    #[serde(default)]
    pub inline_policies: BTreeMap<String, String>,
    #[serde(default)]
    pub access_keys: Vec<AccessKeyMetadata>,
    #[serde(default)]
    pub login_profile: Option<LoginProfile>,
}

/// Stored state of one group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    #[serde(default)]
    pub members: BTreeSet<String>,
    #[serde(default)]
    pub attached_policies: BTreeSet<String>,
}

/// Serializable state of an [`InMemoryDirectory`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    #[serde(default = "default_account_id")]
    pub account_id: String,
    #[serde(default)]
    pub password_policy: PasswordPolicy,
    #[serde(default)]
    pub users: BTreeMap<String, UserRecord>,
    #[serde(default)]
    pub groups: BTreeMap<String, GroupRecord>,
    /// Sequence used for generated user and key identifiers
    #[serde(default)]
    pub next_id: u64,
}

fn default_account_id() -> String {
    DEFAULT_ACCOUNT_ID.to_string()
}

impl Default for DirectorySnapshot {
    fn default() -> Self {
        Self {
            account_id: default_account_id(),
            password_policy: PasswordPolicy::default(),
            users: BTreeMap::new(),
            groups: BTreeMap::new(),
            next_id: 0,
        }
    }
}

impl DirectorySnapshot {
    fn user(&self, user_name: &str) -> DirectoryResult<&UserRecord> {
        self.users.get(user_name).ok_or_else(|| missing_user(user_name))
    }

    fn user_mut(&mut self, user_name: &str) -> DirectoryResult<&mut UserRecord> {
        self.users
            .get_mut(user_name)
            .ok_or_else(|| missing_user(user_name))
    }

    fn group(&self, group_name: &str) -> DirectoryResult<&GroupRecord> {
        self.groups
            .get(group_name)
            .ok_or_else(|| missing_group(group_name))
    }

    fn group_mut(&mut self, group_name: &str) -> DirectoryResult<&mut GroupRecord> {
        self.groups
            .get_mut(group_name)
            .ok_or_else(|| missing_group(group_name))
    }

    fn next_identifier(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:016X}", self.next_id)
    }

    fn groups_of(&self, user_name: &str) -> Vec<String> {
        self.groups
            .iter()
            .filter(|(_, group)| group.members.contains(user_name))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

fn missing_user(user_name: &str) -> DirectoryError {
    DirectoryError::no_such_entity(format!("The user with name {user_name} cannot be found."))
}

fn missing_group(group_name: &str) -> DirectoryError {
    DirectoryError::no_such_entity(format!(
        "The group with name {group_name} cannot be found."
    ))
}

fn generate_secret() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(40)
        .map(char::from)
        .collect()
}

/// Directory held entirely in memory
#[derive(Debug, Clone)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<DirectorySnapshot>>,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    /// Create an empty directory with the default password policy
    pub fn new() -> Self {
        Self::from_snapshot(DirectorySnapshot::default())
    }

    /// Create an empty directory enforcing the given password policy
    pub fn with_password_policy(policy: PasswordPolicy) -> Self {
        Self::from_snapshot(DirectorySnapshot {
            password_policy: policy,
            ..Default::default()
        })
    }

    /// Create a directory from previously captured state
    pub fn from_snapshot(snapshot: DirectorySnapshot) -> Self {
        Self {
            state: Arc::new(RwLock::new(snapshot)),
        }
    }

    /// Capture the current state
    pub async fn snapshot(&self) -> DirectorySnapshot {
        self.state.read().await.clone()
    }

    /// Replace the password policy of the directory
    pub async fn set_password_policy(&self, policy: PasswordPolicy) {
        self.state.write().await.password_policy = policy;
    }

    /// Load a directory from a JSON snapshot file, or start empty if it does not exist
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let snapshot: DirectorySnapshot = serde_json::from_slice(&bytes)?;
                log::debug!(
                    "Loaded directory snapshot from {} ({} users, {} groups)",
                    path.display(),
                    snapshot.users.len(),
                    snapshot.groups.len()
                );
                Ok(Self::from_snapshot(snapshot))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No snapshot at {}, starting empty", path.display());
                Ok(Self::new())
            }
            Err(e) => Err(InternalError::snapshot(path, e.to_string()).into()),
        }
    }

    /// Persist the current state as a JSON snapshot file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot().await;
        let json = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| InternalError::snapshot(path, e.to_string()))?;
        }
        tokio::fs::write(path, json)
            .await
            .map_err(|e| InternalError::snapshot(path, e.to_string()))?;
        Ok(())
    }

    /// Number of users currently in the directory
    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }
}

#[async_trait]
impl RemoteDirectory for InMemoryDirectory {
    async fn create_user(&self, user_name: &str) -> DirectoryResult<User> {
        if user_name.is_empty() {
            return Err(DirectoryError::new(
                ErrorCode::InvalidInput,
                "User name must not be empty",
            ));
        }

        let mut state = self.state.write().await;
        if state.users.contains_key(user_name) {
            return Err(DirectoryError::already_exists(format!(
                "User with name {user_name} already exists."
            )));
        }

        let user = User {
            user_name: user_name.to_string(),
            user_id: state.next_identifier("AIDA"),
            arn: format!("arn:aws:iam::{}:user/{user_name}", state.account_id),
            create_date: Utc::now(),
        };
        state.users.insert(
            user_name.to_string(),
            UserRecord {
                user: user.clone(),
                attached_policies: BTreeSet::new(),
                inline_policies: BTreeMap::new(),
                access_keys: Vec::new(),
                login_profile: None,
            },
        );
        Ok(user)
    }

    async fn get_user(&self, user_name: &str) -> DirectoryResult<User> {
        let state = self.state.read().await;
        Ok(state.user(user_name)?.user.clone())
    }

    async fn delete_user(&self, user_name: &str) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        let record = state.user(user_name)?;

        let blocked_by = if !record.attached_policies.is_empty() {
            Some("detach all policies")
        } else if !record.inline_policies.is_empty() {
            Some("delete all inline policies")
        } else if !record.access_keys.is_empty() {
            Some("delete all access keys")
        } else if record.login_profile.is_some() {
            Some("delete the login profile")
        } else if !state.groups_of(user_name).is_empty() {
            Some("remove the user from all groups")
        } else {
            None
        };

        if let Some(step) = blocked_by {
            return Err(DirectoryError::delete_conflict(format!(
                "Cannot delete entity, must {step} first."
            )));
        }

        state.users.remove(user_name);
        Ok(())
    }

    async fn list_users(&self) -> DirectoryResult<Vec<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().map(|record| record.user.clone()).collect())
    }

    async fn list_groups_for_user(&self, user_name: &str) -> DirectoryResult<Vec<String>> {
        let state = self.state.read().await;
        state.user(user_name)?;
        Ok(state.groups_of(user_name))
    }

    async fn add_user_to_group(&self, group_name: &str, user_name: &str) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        state.user(user_name)?;
        state
            .group_mut(group_name)?
            .members
            .insert(user_name.to_string());
        Ok(())
    }

    async fn remove_user_from_group(
        &self,
        group_name: &str,
        user_name: &str,
    ) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        state.user(user_name)?;
        if !state.group_mut(group_name)?.members.remove(user_name) {
            return Err(DirectoryError::no_such_entity(format!(
                "The user {user_name} is not a member of group {group_name}."
            )));
        }
        Ok(())
    }

    async fn list_attached_user_policies(
        &self,
        user_name: &str,
    ) -> DirectoryResult<Vec<AttachedPolicy>> {
        let state = self.state.read().await;
        Ok(state
            .user(user_name)?
            .attached_policies
            .iter()
            .map(|arn| AttachedPolicy::from_arn(arn))
            .collect())
    }

    async fn attach_user_policy(&self, user_name: &str, policy_arn: &str) -> DirectoryResult<()> {
        if policy_arn.is_empty() {
            return Err(DirectoryError::new(
                ErrorCode::InvalidInput,
                "Policy ARN must not be empty",
            ));
        }
        let mut state = self.state.write().await;
        state
            .user_mut(user_name)?
            .attached_policies
            .insert(policy_arn.to_string());
        Ok(())
    }

    async fn detach_user_policy(&self, user_name: &str, policy_arn: &str) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        if !state
            .user_mut(user_name)?
            .attached_policies
            .remove(policy_arn)
        {
            return Err(DirectoryError::no_such_entity(format!(
                "Policy {policy_arn} was not found."
            )));
        }
        Ok(())
    }

    async fn list_user_policies(&self, user_name: &str) -> DirectoryResult<Vec<String>> {
        let state = self.state.read().await;
        Ok(state
            .user(user_name)?
            .inline_policies
            .keys()
            .cloned()
            .collect())
    }

    async fn put_user_policy(
        &self,
        user_name: &str,
        policy_name: &str,
        policy_document: &str,
    ) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        state
            .user_mut(user_name)?
            .inline_policies
            .insert(policy_name.to_string(), policy_document.to_string());
        Ok(())
    }

    async fn delete_user_policy(&self, user_name: &str, policy_name: &str) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        if state
            .user_mut(user_name)?
            .inline_policies
            .remove(policy_name)
            .is_none()
        {
            return Err(DirectoryError::no_such_entity(format!(
                "The user policy with name {policy_name} cannot be found."
            )));
        }
        Ok(())
    }

    async fn list_access_keys(&self, user_name: &str) -> DirectoryResult<Vec<AccessKeyMetadata>> {
        let state = self.state.read().await;
        Ok(state.user(user_name)?.access_keys.clone())
    }

    async fn create_access_key(&self, user_name: &str) -> DirectoryResult<AccessKey> {
        let mut state = self.state.write().await;
        if state.user(user_name)?.access_keys.len() >= MAX_ACCESS_KEYS_PER_USER {
            return Err(DirectoryError::new(
                ErrorCode::LimitExceeded,
                format!("Cannot exceed quota for AccessKeysPerUser: {MAX_ACCESS_KEYS_PER_USER}"),
            ));
        }

        let access_key_id = state.next_identifier("AKIA");
        let key = AccessKey {
            user_name: user_name.to_string(),
            access_key_id,
            secret_access_key: generate_secret(),
            status: AccessKeyStatus::Active,
            create_date: Utc::now(),
        };
        state.user_mut(user_name)?.access_keys.push(AccessKeyMetadata {
            user_name: key.user_name.clone(),
            access_key_id: key.access_key_id.clone(),
            status: key.status,
            create_date: key.create_date,
        });
        Ok(key)
    }

    async fn delete_access_key(&self, user_name: &str, access_key_id: &str) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        let keys = &mut state.user_mut(user_name)?.access_keys;
        let before = keys.len();
        keys.retain(|k| k.access_key_id != access_key_id);
        if keys.len() == before {
            return Err(DirectoryError::no_such_entity(format!(
                "The Access Key with id {access_key_id} cannot be found."
            )));
        }
        Ok(())
    }

    async fn create_login_profile(
        &self,
        user_name: &str,
        password: &str,
        password_reset_required: bool,
    ) -> DirectoryResult<LoginProfile> {
        let mut state = self.state.write().await;
        if state.user(user_name)?.login_profile.is_some() {
            return Err(DirectoryError::already_exists(format!(
                "Login Profile for user {user_name} already exists."
            )));
        }
        if let Some(violation) = state.password_policy.violation(password) {
            return Err(DirectoryError::password_policy(violation));
        }

        let profile = LoginProfile {
            user_name: user_name.to_string(),
            password_reset_required,
            create_date: Utc::now(),
        };
        state.user_mut(user_name)?.login_profile = Some(profile.clone());
        Ok(profile)
    }

    async fn get_login_profile(&self, user_name: &str) -> DirectoryResult<LoginProfile> {
        let state = self.state.read().await;
        state.user(user_name)?.login_profile.clone().ok_or_else(|| {
            DirectoryError::no_such_entity(format!(
                "Login Profile for User {user_name} cannot be found."
            ))
        })
    }

    async fn update_login_profile(
        &self,
        user_name: &str,
        password: &str,
        password_reset_required: bool,
    ) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        if let Some(violation) = state.password_policy.violation(password) {
            state.user(user_name)?;
            return Err(DirectoryError::password_policy(violation));
        }
        let profile = state.user_mut(user_name)?.login_profile.as_mut().ok_or_else(|| {
            DirectoryError::no_such_entity(format!(
                "Login Profile for User {user_name} cannot be found."
            ))
        })?;
        profile.password_reset_required = password_reset_required;
        Ok(())
    }

    async fn delete_login_profile(&self, user_name: &str) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        if state.user_mut(user_name)?.login_profile.take().is_none() {
            return Err(DirectoryError::no_such_entity(format!(
                "Login Profile for User {user_name} cannot be found."
            )));
        }
        Ok(())
    }

    async fn create_group(&self, group_name: &str) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        if state.groups.contains_key(group_name) {
            return Err(DirectoryError::already_exists(format!(
                "Group with name {group_name} already exists."
            )));
        }
        state
            .groups
            .insert(group_name.to_string(), GroupRecord::default());
        Ok(())
    }

    async fn list_groups(&self) -> DirectoryResult<Vec<String>> {
        let state = self.state.read().await;
        Ok(state.groups.keys().cloned().collect())
    }

    async fn get_group_members(&self, group_name: &str) -> DirectoryResult<Vec<String>> {
        let state = self.state.read().await;
        Ok(state.group(group_name)?.members.iter().cloned().collect())
    }

    async fn list_attached_group_policies(
        &self,
        group_name: &str,
    ) -> DirectoryResult<Vec<AttachedPolicy>> {
        let state = self.state.read().await;
        Ok(state
            .group(group_name)?
            .attached_policies
            .iter()
            .map(|arn| AttachedPolicy::from_arn(arn))
            .collect())
    }

    async fn attach_group_policy(&self, group_name: &str, policy_arn: &str) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        state
            .group_mut(group_name)?
            .attached_policies
            .insert(policy_arn.to_string());
        Ok(())
    }

    async fn detach_group_policy(&self, group_name: &str, policy_arn: &str) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        if !state
            .group_mut(group_name)?
            .attached_policies
            .remove(policy_arn)
        {
            return Err(DirectoryError::no_such_entity(format!(
                "Policy {policy_arn} was not found."
            )));
        }
        Ok(())
    }

    async fn delete_group(&self, group_name: &str) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        let group = state.group(group_name)?;
        if !group.members.is_empty() {
            return Err(DirectoryError::delete_conflict(
                "Cannot delete entity, must remove users from group first.",
            ));
        }
        if !group.attached_policies.is_empty() {
            return Err(DirectoryError::delete_conflict(
                "Cannot delete entity, must detach all policies first.",
            ));
        }
        state.groups.remove(group_name);
        Ok(())
    }
}
