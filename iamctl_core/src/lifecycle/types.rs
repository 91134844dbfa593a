//! Request and result types of the lifecycle operations

use crate::batch::{BatchItem, WorkerFailure};
use crate::error::{DirectoryError, ErrorCode, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request to create one user and optionally its console password
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreationRequest {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub require_reset: bool,
}

impl UserCreationRequest {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: None,
            require_reset: false,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_require_reset(mut self, require_reset: bool) -> Self {
        self.require_reset = require_reset;
        self
    }

    /// The password to set, if any; an empty string means none
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

/// Outcome of the user creation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    AlreadyExists,
    CreationError,
    CreatedSuccess,
}

/// Outcome of the login profile step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordStatus {
    UserNotFound,
    PolicyViolation,
    AlreadyExists,
    CreationError,
    CreatedSuccess,
    UpdatedSuccess,
    NotAttempted,
}

impl PasswordStatus {
    /// Classify a failed login profile call
    pub fn from_error(err: &DirectoryError) -> Self {
        match err.code {
            ErrorCode::NoSuchEntity => Self::UserNotFound,
            ErrorCode::PasswordPolicyViolation => Self::PolicyViolation,
            ErrorCode::EntityAlreadyExists => Self::AlreadyExists,
            _ => Self::CreationError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreationResult {
    pub username: String,
    pub user_status: UserStatus,
    pub password_status: PasswordStatus,
    pub success: bool,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl UserCreationResult {
    pub(crate) fn worker_failed(username: &str, failure: WorkerFailure) -> Self {
        Self {
            username: username.to_string(),
            user_status: UserStatus::CreationError,
            password_status: PasswordStatus::NotAttempted,
            success: false,
            error: Some(failure.to_string()),
            error_kind: Some(failure.kind()),
        }
    }
}

impl BatchItem for UserCreationResult {
    fn is_success(&self) -> bool {
        self.success
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeletionRequest {
    pub username: String,
    /// Remove every dependency before deleting
    #[serde(default)]
    pub force: bool,
}

impl UserDeletionRequest {
    pub fn new(username: impl Into<String>, force: bool) -> Self {
        Self {
            username: username.into(),
            force,
        }
    }
}

/// Outcome of deleting a user or group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStatus {
    Deleted,
    NotFound,
    HasDependencies,
    DeletionError,
}

impl DeletionStatus {
    pub(crate) fn from_error(err: &DirectoryError) -> Self {
        if err.is_not_found() {
            Self::NotFound
        } else if err.is_delete_conflict() {
            Self::HasDependencies
        } else {
            Self::DeletionError
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeletionResult {
    pub username: String,
    pub success: bool,
    pub status: DeletionStatus,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    /// Failures swallowed during forced cleanup; they never change `success`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleanup_errors: Vec<String>,
}

impl UserDeletionResult {
    pub(crate) fn worker_failed(username: &str, failure: WorkerFailure) -> Self {
        Self {
            username: username.to_string(),
            success: false,
            status: DeletionStatus::DeletionError,
            error: Some(failure.to_string()),
            error_kind: Some(failure.kind()),
            cleanup_errors: Vec::new(),
        }
    }
}

impl BatchItem for UserDeletionResult {
    fn is_success(&self) -> bool {
        self.success
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPoliciesRequest {
    pub username: String,
    pub desired_arns: Vec<String>,
    /// Empty means the caller does not know the current state
    #[serde(default)]
    pub current_arns: Vec<String>,
}

impl SyncPoliciesRequest {
    pub fn new<D, C>(username: impl Into<String>, desired_arns: D, current_arns: C) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            username: username.into(),
            desired_arns: desired_arns.into_iter().map(Into::into).collect(),
            current_arns: current_arns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Which half of a policy sync an ARN belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyOperation {
    Attach,
    Detach,
}

/// Structured record of one failed attach or detach
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyFailure {
    pub arn: String,
    pub operation: PolicyOperation,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPoliciesResult {
    pub username: String,
    pub attached_arns: Vec<String>,
    pub detached_arns: Vec<String>,
    /// `"<arn>: <message>"` per failed attach
    pub attach_errors: Vec<String>,
    /// `"<arn>: <message>"` per failed detach
    pub detach_errors: Vec<String>,
    pub failures: Vec<PolicyFailure>,
    pub attached_count: usize,
    pub detached_count: usize,
    pub success: bool,
    /// Set when the sync did not run to completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl SyncPoliciesResult {
    pub(crate) fn worker_failed(username: &str, failure: WorkerFailure) -> Self {
        Self {
            username: username.to_string(),
            success: false,
            error: Some(failure.to_string()),
            error_kind: Some(failure.kind()),
            ..Self::default()
        }
    }
}

impl BatchItem for SyncPoliciesResult {
    fn is_success(&self) -> bool {
        self.success
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachPolicyRequest {
    pub username: String,
    pub policy_arn: String,
}

impl AttachPolicyRequest {
    pub fn new(username: impl Into<String>, policy_arn: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            policy_arn: policy_arn.into(),
        }
    }
}

impl fmt::Display for AttachPolicyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {}", self.username, self.policy_arn)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachPolicyResult {
    pub username: String,
    pub policy_arn: String,
    pub success: bool,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl BatchItem for AttachPolicyResult {
    fn is_success(&self) -> bool {
        self.success
    }
}

/// Request to set or replace one existing user's console password
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub require_reset: bool,
}

impl PasswordRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            require_reset: false,
        }
    }

    pub fn with_require_reset(mut self, require_reset: bool) -> Self {
        self.require_reset = require_reset;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResult {
    pub username: String,
    pub password_status: PasswordStatus,
    pub success: bool,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl PasswordResult {
    pub(crate) fn succeeded(username: String, password_status: PasswordStatus) -> Self {
        Self {
            username,
            password_status,
            success: true,
            error: None,
            error_kind: None,
        }
    }

    pub(crate) fn failed(username: String, err: &DirectoryError) -> Self {
        Self {
            username,
            password_status: PasswordStatus::from_error(err),
            success: false,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
        }
    }

    pub(crate) fn worker_failed(username: &str, failure: WorkerFailure) -> Self {
        Self {
            username: username.to_string(),
            password_status: PasswordStatus::CreationError,
            success: false,
            error: Some(failure.to_string()),
            error_kind: Some(failure.kind()),
        }
    }
}

impl BatchItem for PasswordResult {
    fn is_success(&self) -> bool {
        self.success
    }
}

/// Outcome of creating a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    AlreadyExists,
    CreationError,
    CreatedSuccess,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCreationResult {
    pub group_name: String,
    pub status: GroupStatus,
    pub success: bool,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl GroupCreationResult {
    pub(crate) fn worker_failed(group_name: &str, failure: WorkerFailure) -> Self {
        Self {
            group_name: group_name.to_string(),
            status: GroupStatus::CreationError,
            success: false,
            error: Some(failure.to_string()),
            error_kind: Some(failure.kind()),
        }
    }
}

impl BatchItem for GroupCreationResult {
    fn is_success(&self) -> bool {
        self.success
    }
}

/// Direction of a membership change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipChange {
    Add,
    Remove,
}

/// One user/group pair to add or remove
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupMembershipRequest {
    pub group_name: String,
    pub username: String,
}

impl GroupMembershipRequest {
    pub fn new(group_name: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            username: username.into(),
        }
    }
}

impl fmt::Display for GroupMembershipRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.username, self.group_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembershipResult {
    pub group_name: String,
    pub username: String,
    pub change: MembershipChange,
    pub success: bool,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl GroupMembershipResult {
    pub(crate) fn new(
        request: GroupMembershipRequest,
        change: MembershipChange,
        error: Option<(String, ErrorKind)>,
    ) -> Self {
        let (error, error_kind) = match error {
            Some((message, kind)) => (Some(message), Some(kind)),
            None => (None, None),
        };
        Self {
            group_name: request.group_name,
            username: request.username,
            change,
            success: error.is_none(),
            error,
            error_kind,
        }
    }
}

impl BatchItem for GroupMembershipResult {
    fn is_success(&self) -> bool {
        self.success
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDeletionRequest {
    pub group_name: String,
    #[serde(default)]
    pub force: bool,
}

impl GroupDeletionRequest {
    pub fn new(group_name: impl Into<String>, force: bool) -> Self {
        Self {
            group_name: group_name.into(),
            force,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDeletionResult {
    pub group_name: String,
    pub success: bool,
    pub status: DeletionStatus,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleanup_errors: Vec<String>,
}

impl BatchItem for GroupDeletionResult {
    fn is_success(&self) -> bool {
        self.success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_password_means_none() {
        let request = UserCreationRequest::new("alice").with_password("");
        assert_eq!(request.password(), None);

        let request = UserCreationRequest::new("alice").with_password("s3cret-pass");
        assert_eq!(request.password(), Some("s3cret-pass"));
    }

    #[test]
    fn test_creation_request_deserializes_with_defaults() {
        let request: UserCreationRequest =
            serde_json::from_str(r#"{"username": "bob"}"#).unwrap();
        assert_eq!(request, UserCreationRequest::new("bob"));
    }

    #[test]
    fn test_deletion_status_from_error() {
        assert_eq!(
            DeletionStatus::from_error(&DirectoryError::no_such_entity("x")),
            DeletionStatus::NotFound
        );
        assert_eq!(
            DeletionStatus::from_error(&DirectoryError::delete_conflict("x")),
            DeletionStatus::HasDependencies
        );
        assert_eq!(
            DeletionStatus::from_error(&DirectoryError::from_vendor("Throttling", "x")),
            DeletionStatus::DeletionError
        );
    }

    #[test]
    fn test_password_status_from_error() {
        assert_eq!(
            PasswordStatus::from_error(&DirectoryError::password_policy("too short")),
            PasswordStatus::PolicyViolation
        );
        assert_eq!(
            PasswordStatus::from_error(&DirectoryError::already_exists("x")),
            PasswordStatus::AlreadyExists
        );
        assert_eq!(
            PasswordStatus::from_error(&DirectoryError::no_such_entity("x")),
            PasswordStatus::UserNotFound
        );
        assert_eq!(
            PasswordStatus::from_error(&DirectoryError::from_vendor("Throttling", "x")),
            PasswordStatus::CreationError
        );
    }

    #[test]
    fn test_password_request_deserializes_with_defaults() {
        let request: PasswordRequest =
            serde_json::from_str(r#"{"username": "bob", "password": "long-enough"}"#).unwrap();
        assert_eq!(request, PasswordRequest::new("bob", "long-enough"));
    }

    #[test]
    fn test_membership_result_success_follows_error() {
        let request = GroupMembershipRequest::new("ops", "alice");
        assert_eq!(request.to_string(), "alice in ops");

        let ok = GroupMembershipResult::new(request.clone(), MembershipChange::Add, None);
        assert!(ok.is_success());

        let failed = GroupMembershipResult::new(
            request,
            MembershipChange::Remove,
            Some(("missing".to_string(), ErrorKind::NotFound)),
        );
        assert!(!failed.is_success());
        assert_eq!(failed.error_kind, Some(ErrorKind::NotFound));
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&PasswordStatus::PolicyViolation).unwrap(),
            "\"policy_violation\""
        );
        assert_eq!(
            serde_json::to_string(&DeletionStatus::HasDependencies).unwrap(),
            "\"has_dependencies\""
        );
    }

    #[test]
    fn test_worker_failure_results_are_failures() {
        let result = UserCreationResult::worker_failed("x", WorkerFailure::Cancelled);
        assert!(!result.is_success());
        assert_eq!(result.error_kind, Some(ErrorKind::TransientOrUnknown));

        let result = UserDeletionResult::worker_failed("x", WorkerFailure::Cancelled);
        assert_eq!(result.status, DeletionStatus::DeletionError);

        let result = SyncPoliciesResult::worker_failed("x", WorkerFailure::Cancelled);
        assert!(!result.is_success());
        assert!(result.attached_arns.is_empty());
        assert_eq!(result.error.as_deref(), Some("worker was cancelled before completing"));
    }
}
