//! Plain-text descriptions of core result types

use iamctl_core::{
    AttachPolicyResult, DeletionStatus, DependencyCheckResult, GroupCreationResult,
    GroupDeletionResult, GroupDependencyCheckResult, GroupMembershipResult, GroupStatus,
    MembershipChange, PasswordResult, PasswordStatus, SyncPoliciesResult, UserCreationResult,
    UserDeletionResult, UserStatus,
};
use std::collections::BTreeSet;

/// What a formatter needs to know about one batch item
pub trait Describe {
    /// Entity the result is about
    fn subject(&self) -> String;

    /// One-line outcome
    fn outcome(&self) -> String;

    /// Extra lines shown under the outcome in human output
    fn details(&self) -> Vec<String> {
        Vec::new()
    }
}

fn error_or(error: &Option<String>, fallback: &str) -> String {
    error.clone().unwrap_or_else(|| fallback.to_string())
}

fn join(items: &BTreeSet<String>) -> String {
    items.iter().cloned().collect::<Vec<_>>().join(", ")
}

impl Describe for UserCreationResult {
    fn subject(&self) -> String {
        self.username.clone()
    }

    fn outcome(&self) -> String {
        match (self.user_status, self.password_status) {
            (UserStatus::CreatedSuccess, PasswordStatus::CreatedSuccess) => {
                "created with login profile".to_string()
            }
            (UserStatus::CreatedSuccess, PasswordStatus::NotAttempted) => "created".to_string(),
            (UserStatus::CreatedSuccess, _) => format!(
                "created, login profile failed: {}",
                error_or(&self.error, "unknown error")
            ),
            (UserStatus::AlreadyExists, _) => "already exists".to_string(),
            (UserStatus::CreationError, _) => error_or(&self.error, "creation failed"),
        }
    }
}

impl Describe for UserDeletionResult {
    fn subject(&self) -> String {
        self.username.clone()
    }

    fn outcome(&self) -> String {
        match self.status {
            DeletionStatus::Deleted => "deleted".to_string(),
            _ => error_or(&self.error, "deletion failed"),
        }
    }

    fn details(&self) -> Vec<String> {
        self.cleanup_errors
            .iter()
            .map(|e| format!("cleanup: {e}"))
            .collect()
    }
}

impl Describe for GroupDeletionResult {
    fn subject(&self) -> String {
        self.group_name.clone()
    }

    fn outcome(&self) -> String {
        match self.status {
            DeletionStatus::Deleted => "deleted".to_string(),
            _ => error_or(&self.error, "deletion failed"),
        }
    }

    fn details(&self) -> Vec<String> {
        self.cleanup_errors
            .iter()
            .map(|e| format!("cleanup: {e}"))
            .collect()
    }
}

impl Describe for DependencyCheckResult {
    fn subject(&self) -> String {
        self.username.clone()
    }

    fn outcome(&self) -> String {
        match &self.dependencies {
            Some(deps) if deps.has_dependencies() => "has dependencies".to_string(),
            Some(_) => "no dependencies".to_string(),
            None => error_or(&self.error, "check failed"),
        }
    }

    fn details(&self) -> Vec<String> {
        let Some(deps) = &self.dependencies else {
            return Vec::new();
        };
        let mut lines = Vec::new();
        if !deps.groups.is_empty() {
            lines.push(format!("groups: {}", join(&deps.groups)));
        }
        if !deps.managed_policy_arns.is_empty() {
            lines.push(format!("policies: {}", join(&deps.managed_policy_arns)));
        }
        if !deps.inline_policies.is_empty() {
            lines.push(format!("inline policies: {}", join(&deps.inline_policies)));
        }
        if !deps.access_keys.is_empty() {
            lines.push(format!("access keys: {}", join(&deps.access_keys)));
        }
        if deps.has_login_profile {
            lines.push("login profile".to_string());
        }
        lines
    }
}

impl Describe for GroupDependencyCheckResult {
    fn subject(&self) -> String {
        self.group_name.clone()
    }

    fn outcome(&self) -> String {
        match &self.dependencies {
            Some(deps) if deps.has_dependencies() => "has dependencies".to_string(),
            Some(_) => "no dependencies".to_string(),
            None => error_or(&self.error, "check failed"),
        }
    }

    fn details(&self) -> Vec<String> {
        let Some(deps) = &self.dependencies else {
            return Vec::new();
        };
        let mut lines = Vec::new();
        if !deps.members.is_empty() {
            lines.push(format!("members: {}", join(&deps.members)));
        }
        if !deps.attached_policy_arns.is_empty() {
            lines.push(format!("policies: {}", join(&deps.attached_policy_arns)));
        }
        lines
    }
}

impl Describe for SyncPoliciesResult {
    fn subject(&self) -> String {
        self.username.clone()
    }

    fn outcome(&self) -> String {
        if let Some(error) = &self.error {
            return error.clone();
        }
        let counts = format!(
            "{} attached, {} detached",
            self.attached_count, self.detached_count
        );
        if self.success {
            counts
        } else {
            format!("{counts}, {} failed", self.failures.len())
        }
    }

    fn details(&self) -> Vec<String> {
        self.attached_arns
            .iter()
            .map(|arn| format!("+ {arn}"))
            .chain(self.detached_arns.iter().map(|arn| format!("- {arn}")))
            .chain(self.attach_errors.iter().map(|e| format!("attach failed: {e}")))
            .chain(self.detach_errors.iter().map(|e| format!("detach failed: {e}")))
            .collect()
    }
}

impl Describe for AttachPolicyResult {
    fn subject(&self) -> String {
        format!("{} <- {}", self.username, self.policy_arn)
    }

    fn outcome(&self) -> String {
        if self.success {
            "attached".to_string()
        } else {
            error_or(&self.error, "attach failed")
        }
    }
}

impl Describe for PasswordResult {
    fn subject(&self) -> String {
        self.username.clone()
    }

    fn outcome(&self) -> String {
        match self.password_status {
            PasswordStatus::CreatedSuccess => "password set".to_string(),
            PasswordStatus::UpdatedSuccess => "password updated".to_string(),
            PasswordStatus::AlreadyExists => "already has a password".to_string(),
            _ => error_or(&self.error, "password change failed"),
        }
    }
}

impl Describe for GroupCreationResult {
    fn subject(&self) -> String {
        self.group_name.clone()
    }

    fn outcome(&self) -> String {
        match self.status {
            GroupStatus::CreatedSuccess => "created".to_string(),
            GroupStatus::AlreadyExists => "already exists".to_string(),
            GroupStatus::CreationError => error_or(&self.error, "creation failed"),
        }
    }
}

impl Describe for GroupMembershipResult {
    fn subject(&self) -> String {
        format!("{} in {}", self.username, self.group_name)
    }

    fn outcome(&self) -> String {
        match (self.success, self.change) {
            (true, MembershipChange::Add) => "added".to_string(),
            (true, MembershipChange::Remove) => "removed".to_string(),
            (false, _) => error_or(&self.error, "membership change failed"),
        }
    }
}
