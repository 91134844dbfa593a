//! Directory fixture builders for creating test scenarios

use crate::mocks::MockDirectory;
use iamctl_core::directory::{InMemoryDirectory, PasswordPolicy, RemoteDirectory};
use iamctl_core::error::DirectoryResult;
use std::collections::BTreeSet;

/// Builder for one seeded user and its dependencies
#[derive(Debug, Clone, Default)]
pub struct UserFixture {
    name: String,
    groups: Vec<String>,
    policies: Vec<String>,
    inline_policies: Vec<String>,
    access_keys: usize,
    password: Option<String>,
}

impl UserFixture {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Add the user to a group (created if needed)
    pub fn in_group(mut self, group: &str) -> Self {
        self.groups.push(group.to_string());
        self
    }

    /// Attach a managed policy
    pub fn with_policy(mut self, arn: &str) -> Self {
        self.policies.push(arn.to_string());
        self
    }

    /// Put an inline policy with an empty document
    pub fn with_inline_policy(mut self, name: &str) -> Self {
        self.inline_policies.push(name.to_string());
        self
    }

    /// Create `count` access keys
    pub fn with_access_keys(mut self, count: usize) -> Self {
        self.access_keys = count;
        self
    }

    /// Create a login profile with the given password
    pub fn with_login_profile(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    /// Convenience: one of every dependency kind
    pub fn with_all_dependencies(self) -> Self {
        self.in_group("fixture-group")
            .with_policy("arn:aws:iam::aws:policy/ReadOnlyAccess")
            .with_inline_policy("fixture-inline")
            .with_access_keys(1)
            .with_login_profile("fixture-password")
    }
}

/// Builder for one seeded group
#[derive(Debug, Clone, Default)]
pub struct GroupFixture {
    name: String,
    policies: Vec<String>,
}

impl GroupFixture {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            policies: Vec::new(),
        }
    }

    pub fn with_policy(mut self, arn: &str) -> Self {
        self.policies.push(arn.to_string());
        self
    }
}

/// Builder for a seeded directory
///
/// # Examples
///
/// ```rust,no_run
/// use iamctl_test_utils::{DirectoryFixture, UserFixture};
///
/// # async fn example() {
/// let directory = DirectoryFixture::new()
///     .with_user(UserFixture::new("alice").with_policy("p1"))
///     .with_user(UserFixture::new("bob"))
///     .build()
///     .await
///     .unwrap();
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct DirectoryFixture {
    password_policy: PasswordPolicy,
    users: Vec<UserFixture>,
    groups: Vec<GroupFixture>,
}

impl DirectoryFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = policy;
        self
    }

    pub fn with_user(mut self, user: UserFixture) -> Self {
        self.users.push(user);
        self
    }

    /// Add plain users without dependencies
    pub fn with_users(mut self, names: &[&str]) -> Self {
        self.users.extend(names.iter().map(|n| UserFixture::new(n)));
        self
    }

    pub fn with_group(mut self, group: GroupFixture) -> Self {
        self.groups.push(group);
        self
    }

    /// Seed a new in-memory directory
    pub async fn build(self) -> DirectoryResult<InMemoryDirectory> {
        let directory = InMemoryDirectory::with_password_policy(self.password_policy);

        let mut group_names: BTreeSet<String> =
            self.groups.iter().map(|g| g.name.clone()).collect();
        for user in &self.users {
            group_names.extend(user.groups.iter().cloned());
        }
        for group in &group_names {
            directory.create_group(group).await?;
        }
        for group in &self.groups {
            for arn in &group.policies {
                directory.attach_group_policy(&group.name, arn).await?;
            }
        }

        for user in &self.users {
            directory.create_user(&user.name).await?;
            for group in &user.groups {
                directory.add_user_to_group(group, &user.name).await?;
            }
            for arn in &user.policies {
                directory.attach_user_policy(&user.name, arn).await?;
            }
            for name in &user.inline_policies {
                directory.put_user_policy(&user.name, name, "{}").await?;
            }
            for _ in 0..user.access_keys {
                directory.create_access_key(&user.name).await?;
            }
            if let Some(password) = &user.password {
                directory
                    .create_login_profile(&user.name, password, false)
                    .await?;
            }
        }

        Ok(directory)
    }

    /// Seed a directory and wrap it in a [`MockDirectory`]
    pub async fn build_mock(self) -> DirectoryResult<MockDirectory> {
        Ok(MockDirectory::with_directory(self.build().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_seeds_dependencies() {
        let directory = DirectoryFixture::new()
            .with_user(UserFixture::new("alice").with_all_dependencies())
            .with_users(&["bob", "carol"])
            .with_group(GroupFixture::new("ops").with_policy("p9"))
            .build()
            .await
            .unwrap();

        assert_eq!(directory.user_count().await, 3);
        assert_eq!(
            directory.list_groups_for_user("alice").await.unwrap(),
            vec!["fixture-group".to_string()]
        );
        assert_eq!(directory.list_access_keys("alice").await.unwrap().len(), 1);
        assert!(directory.get_login_profile("alice").await.is_ok());
        assert_eq!(
            directory.list_attached_group_policies("ops").await.unwrap()[0].policy_arn,
            "p9"
        );
    }

    #[tokio::test]
    async fn test_shared_group_created_once() {
        let directory = DirectoryFixture::new()
            .with_user(UserFixture::new("a").in_group("devs"))
            .with_user(UserFixture::new("b").in_group("devs"))
            .build()
            .await
            .unwrap();

        assert_eq!(directory.get_group_members("devs").await.unwrap().len(), 2);
    }
}
