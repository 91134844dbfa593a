//! Pre-flight checks for batch inputs
//!
//! Batch operations accept any input and report per-item failures. Items of
//! one batch are assumed independent, so callers that build batches from
//! user input can reject overlapping or empty identifiers up front.

use super::types::{
    AttachPolicyRequest, GroupMembershipRequest, PasswordRequest, UserCreationRequest,
};
use crate::error::{Result, ValidationError};
use std::collections::HashSet;

/// Reject empty or repeated identifiers of one entity kind
pub fn validate_unique_names<'a, I>(entity: &str, names: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(ValidationError::missing_field(&format!("{entity} name")).into());
        }
        if !seen.insert(name) {
            return Err(ValidationError::duplicate_item(entity, name).into());
        }
    }
    Ok(())
}

pub fn validate_creation_requests(requests: &[UserCreationRequest]) -> Result<()> {
    validate_unique_names("user", requests.iter().map(|r| r.username.as_str()))
}

/// Each (user, policy) pair must appear once and name a policy
pub fn validate_attach_requests(requests: &[AttachPolicyRequest]) -> Result<()> {
    let mut seen = HashSet::new();
    for request in requests {
        if request.username.trim().is_empty() {
            return Err(ValidationError::missing_field("user name").into());
        }
        if request.policy_arn.trim().is_empty() {
            return Err(ValidationError::invalid_parameter(
                "policy_arn",
                &format!("empty policy for user '{}'", request.username),
            )
            .into());
        }
        if !seen.insert((request.username.as_str(), request.policy_arn.as_str())) {
            return Err(ValidationError::duplicate_item("policy", &request.policy_arn).into());
        }
    }
    Ok(())
}

/// One request per user, each with a password
pub fn validate_password_requests(requests: &[PasswordRequest]) -> Result<()> {
    validate_unique_names("user", requests.iter().map(|r| r.username.as_str()))?;
    match requests.iter().find(|r| r.password.is_empty()) {
        Some(request) => Err(ValidationError::invalid_parameter(
            "password",
            &format!("empty password for user '{}'", request.username),
        )
        .into()),
        None => Ok(()),
    }
}

/// Each (group, user) pair must appear once with both names present
pub fn validate_membership_requests(requests: &[GroupMembershipRequest]) -> Result<()> {
    let mut seen = HashSet::new();
    for request in requests {
        if request.group_name.trim().is_empty() {
            return Err(ValidationError::missing_field("group name").into());
        }
        if request.username.trim().is_empty() {
            return Err(ValidationError::missing_field("user name").into());
        }
        if !seen.insert(request) {
            return Err(ValidationError::duplicate_item("user", &request.username).into());
        }
    }
    Ok(())
}
