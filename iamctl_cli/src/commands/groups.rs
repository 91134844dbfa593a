//! `iamctl groups` commands

use super::non_empty;
use crate::error::{CliResult, ExitCode};
use crate::session::Session;
use anyhow::Context;
use clap::{Args, Subcommand};
use iamctl_core::{
    GroupDeletionRequest, GroupMembershipRequest, validate_membership_requests,
    validate_unique_names,
};

/// Create, inspect and delete groups and manage their members
#[derive(Debug, Args)]
pub struct GroupsCommand {
    #[command(subcommand)]
    pub command: GroupsSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum GroupsSubcommand {
    /// Create groups
    Create {
        #[arg(required = true)]
        groups: Vec<String>,
    },

    /// Add users to a group
    AddUser {
        group: String,

        #[arg(required = true)]
        users: Vec<String>,
    },

    /// Remove users from a group
    RemoveUser {
        group: String,

        #[arg(required = true)]
        users: Vec<String>,
    },

    /// List every group
    List,

    /// List the members of a group
    Members { group: String },

    /// Show members and attached policies of groups
    Deps {
        #[arg(required = true)]
        groups: Vec<String>,
    },

    /// Delete groups
    Delete {
        #[arg(required = true)]
        groups: Vec<String>,

        /// Detach policies and remove members first
        #[arg(long)]
        force: bool,

        /// Do not ask for confirmation with --force
        #[arg(short, long)]
        yes: bool,
    },
}

fn membership_requests(group: &str, users: Vec<String>) -> CliResult<Vec<GroupMembershipRequest>> {
    let requests: Vec<_> = non_empty(users, "users")?
        .into_iter()
        .map(|user| GroupMembershipRequest::new(group.trim(), user))
        .collect();
    validate_membership_requests(&requests)?;
    Ok(requests)
}

pub async fn execute(command: GroupsCommand, session: &Session) -> CliResult<ExitCode> {
    match command.command {
        GroupsSubcommand::Create { groups } => {
            let groups = non_empty(groups, "groups")?;
            validate_unique_names("group", groups.iter().map(String::as_str))?;
            let report = session
                .run(move |orchestrator| async move { orchestrator.create_groups(groups).await })
                .await;
            session.persist().await?;
            session.print_report(&report)
        }

        GroupsSubcommand::AddUser { group, users } => {
            let requests = membership_requests(&group, users)?;
            let report = session
                .run(move |orchestrator| async move {
                    orchestrator.add_users_to_groups(requests).await
                })
                .await;
            session.persist().await?;
            session.print_report(&report)
        }

        GroupsSubcommand::RemoveUser { group, users } => {
            let requests = membership_requests(&group, users)?;
            let report = session
                .run(move |orchestrator| async move {
                    orchestrator.remove_users_from_groups(requests).await
                })
                .await;
            session.persist().await?;
            session.print_report(&report)
        }

        GroupsSubcommand::List => {
            let groups = session
                .orchestrator()
                .list_groups()
                .await
                .context("Failed to list groups")?;
            session.print_list(&groups, String::clone, |_| String::new())
        }

        GroupsSubcommand::Members { group } => {
            let members = session
                .orchestrator()
                .list_group_members(&group)
                .await
                .with_context(|| format!("Failed to list members of '{group}'"))?;
            session.print_list(&members, String::clone, |_| String::new())
        }

        GroupsSubcommand::Deps { groups } => {
            let groups = non_empty(groups, "groups")?;
            validate_unique_names("group", groups.iter().map(String::as_str))?;
            let report = session
                .run(move |orchestrator| async move {
                    orchestrator.check_multiple_group_dependencies(groups).await
                })
                .await;
            session.print_report(&report)
        }

        GroupsSubcommand::Delete { groups, force, yes } => {
            let groups = non_empty(groups, "groups")?;
            validate_unique_names("group", groups.iter().map(String::as_str))?;
            if force {
                let prompt = format!(
                    "Force delete {} group(s), detaching policies and removing members?",
                    groups.len()
                );
                if !session.confirm(&prompt, yes)? {
                    eprintln!("Cancelled.");
                    return Ok(ExitCode::Success);
                }
            }

            let requests = groups
                .into_iter()
                .map(|group| GroupDeletionRequest::new(group, force))
                .collect();
            let report = session
                .run(move |orchestrator| async move { orchestrator.delete_groups(requests).await })
                .await;
            session.persist().await?;
            session.print_report(&report)
        }
    }
}
