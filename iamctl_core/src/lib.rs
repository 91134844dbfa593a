//! iamctl Core Library
//!
//! This is the core library for iamctl, providing concurrent batch lifecycle
//! operations (create, delete, dependency check, policy sync) over an
//! abstract remote identity directory.

pub mod batch;
pub mod dependencies;
pub mod directory;
pub mod error;
pub mod lifecycle;
pub mod progress;
pub mod report;

// Mock implementations and testing utilities live in the iamctl-test-utils crate

// Re-export main types
pub use batch::{BatchItem, BatchRunner, WorkerFailure};
pub use dependencies::{
    DependencyCheckResult, DependencyInspector, GroupDependencies, GroupDependencyCheckResult,
    UserDependencies,
};
pub use directory::{
    AccessKey, AccessKeyMetadata, AccessKeyStatus, AttachedPolicy, DirectorySnapshot,
    InMemoryDirectory, LoginProfile, PasswordPolicy, RemoteDirectory, User,
};
pub use error::{DirectoryError, DirectoryResult, Error, ErrorCode, ErrorKind, Result};
pub use lifecycle::{
    AttachPolicyRequest, AttachPolicyResult, DeletionStatus, GroupCreationResult,
    GroupDeletionRequest, GroupDeletionResult, GroupMembershipRequest, GroupMembershipResult,
    GroupStatus, LifecycleOrchestrator, MembershipChange, PasswordRequest, PasswordResult,
    PasswordStatus, PolicyFailure, PolicyOperation, PolicySyncPlan, SyncPoliciesRequest,
    SyncPoliciesResult, UserCreationRequest, UserCreationResult, UserDeletionRequest,
    UserDeletionResult, UserStatus, plan_policy_sync, validate_attach_requests,
    validate_creation_requests, validate_membership_requests, validate_password_requests,
    validate_unique_names,
};
pub use progress::{LogProvider, NullProvider, ProgressProvider, ProgressUpdate};
pub use report::BatchReport;

/// Core client configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Upper bound on concurrently running batch items, `None` for one task per item
    pub max_concurrency: Option<usize>,
    /// Deadline for each batch item, `None` to wait indefinitely
    pub operation_timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Create a test configuration
    pub fn test() -> Self {
        Self {
            max_concurrency: Some(4),
            operation_timeout_secs: Some(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_unbounded() {
        let config = ClientConfig::default();
        assert_eq!(config.max_concurrency, None);
        assert_eq!(config.operation_timeout_secs, None);
    }

    #[test]
    fn test_config_deserializes_partial() {
        let config: ClientConfig = serde_json::from_str(r#"{"max_concurrency": 8}"#).unwrap();
        assert_eq!(config.max_concurrency, Some(8));
        assert_eq!(config.operation_timeout_secs, None);
    }
}
