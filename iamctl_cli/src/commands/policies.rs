//! `iamctl policies` commands

use super::non_empty;
use crate::error::{CliError, CliResult, ExitCode};
use crate::session::Session;
use anyhow::Context;
use clap::{Args, Subcommand};
use iamctl_core::{
    AttachPolicyRequest, RemoteDirectory, SyncPoliciesRequest, validate_attach_requests,
    validate_unique_names,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Attach and reconcile managed policies
#[derive(Debug, Args)]
pub struct PoliciesCommand {
    #[command(subcommand)]
    pub command: PoliciesSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum PoliciesSubcommand {
    /// Make a user's attached policies equal to the desired set
    Sync {
        /// User whose policies are reconciled
        user: String,

        /// Desired policy ARNs, comma separated (pass "" to detach everything)
        #[arg(long, value_delimiter = ',', required = true, value_name = "ARN,...")]
        desired: Vec<String>,

        /// Currently attached ARNs; read from the directory when omitted
        #[arg(long, value_delimiter = ',', value_name = "ARN,...")]
        current: Option<Vec<String>>,
    },

    /// Reconcile many users at once from a JSON file
    SyncFile {
        /// JSON array of {"username", "desired_arns", "current_arns"}; a missing
        /// "current_arns" is read from the directory
        #[arg(value_name = "PATH")]
        file: PathBuf,
    },

    /// Attach policies to a user
    Attach {
        /// User to attach to
        #[arg(short, long)]
        user: String,

        /// Policy ARN (can be specified multiple times or comma separated)
        #[arg(short, long = "policy", value_delimiter = ',', required = true)]
        policies: Vec<String>,
    },
}

/// One line of a sync file
#[derive(Debug, Deserialize)]
struct SyncEntry {
    username: String,
    desired_arns: Vec<String>,
    #[serde(default)]
    current_arns: Option<Vec<String>>,
}

async fn read_sync_entries(path: &Path) -> CliResult<Vec<SyncEntry>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let entries = serde_json::from_str(&content)
        .with_context(|| format!("Invalid sync list in {}", path.display()))?;
    Ok(entries)
}

async fn attached_arns(session: &Session, user: &str) -> anyhow::Result<Vec<String>> {
    let policies = session
        .directory()
        .list_attached_user_policies(user)
        .await
        .with_context(|| format!("Failed to read policies attached to '{user}'"))?;
    Ok(policies.into_iter().map(|policy| policy.policy_arn).collect())
}

fn clean(arns: Vec<String>) -> Vec<String> {
    arns.into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect()
}

pub async fn execute(command: PoliciesCommand, session: &Session) -> CliResult<ExitCode> {
    match command.command {
        PoliciesSubcommand::Sync {
            user,
            desired,
            current,
        } => {
            let desired = clean(desired);
            let current = match current {
                Some(current) => clean(current),
                None => attached_arns(session, &user).await?,
            };
            log::debug!("Syncing '{user}': desired {desired:?}, current {current:?}");

            let report = session
                .run(move |orchestrator| async move {
                    vec![orchestrator.sync_policies(&user, &desired, &current).await]
                })
                .await;
            session.persist().await?;
            session.print_report(&report)
        }

        PoliciesSubcommand::SyncFile { file } => {
            let entries = read_sync_entries(&file).await?;
            if entries.is_empty() {
                return Err(CliError::misuse(&format!("No users in {}", file.display())));
            }
            validate_unique_names("user", entries.iter().map(|e| e.username.as_str()))?;

            let mut requests = Vec::with_capacity(entries.len());
            for entry in entries {
                let current = match entry.current_arns {
                    Some(current) => clean(current),
                    // Unknown users fail per ARN inside the batch
                    None => attached_arns(session, &entry.username)
                        .await
                        .unwrap_or_else(|err| {
                            log::debug!("{err:#}");
                            Vec::new()
                        }),
                };
                requests.push(SyncPoliciesRequest::new(
                    entry.username,
                    clean(entry.desired_arns),
                    current,
                ));
            }
            log::debug!("Syncing policies for {} user(s)", requests.len());

            let report = session
                .run(move |orchestrator| async move { orchestrator.sync_multiple(requests).await })
                .await;
            session.persist().await?;
            session.print_report(&report)
        }

        PoliciesSubcommand::Attach { user, policies } => {
            let policies = non_empty(policies, "policies")?;
            let requests = policies
                .into_iter()
                .map(|arn| AttachPolicyRequest::new(user.as_str(), arn))
                .collect::<Vec<_>>();
            validate_attach_requests(&requests)?;
            let report = session
                .run(move |orchestrator| async move {
                    orchestrator.attach_multiple_policies(requests).await
                })
                .await;
            session.persist().await?;
            session.print_report(&report)
        }
    }
}
