//! `iamctl users` commands

use super::non_empty;
use crate::error::{CliError, CliResult, ExitCode};
use crate::session::Session;
use anyhow::Context;
use clap::{Args, Subcommand};
use iamctl_core::{
    PasswordRequest, UserCreationRequest, UserDeletionRequest, validate_creation_requests,
    validate_password_requests, validate_unique_names,
};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Create, delete and inspect users
#[derive(Debug, Args)]
pub struct UsersCommand {
    #[command(subcommand)]
    pub command: UsersSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum UsersSubcommand {
    /// Create users, optionally with a console password
    Create {
        /// User to create as NAME or NAME:PASSWORD (can be specified multiple times)
        #[arg(short, long = "user", value_name = "NAME[:PASSWORD]")]
        users: Vec<String>,

        /// JSON file with an array of {"username", "password", "require_reset"}
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,

        /// Require a password reset at first sign-in
        #[arg(long)]
        require_reset: bool,
    },

    /// Delete users
    Delete {
        /// Users to delete
        #[arg(required = true)]
        names: Vec<String>,

        /// Remove group memberships, policies, keys and login profiles first
        #[arg(long)]
        force: bool,

        /// Do not ask for confirmation with --force
        #[arg(short, long)]
        yes: bool,
    },

    /// Show what blocks deleting users
    Deps {
        /// Users to inspect
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Give existing users their first console password
    SetPassword(PasswordArgs),

    /// Replace the console password of users that already have one
    UpdatePassword(PasswordArgs),

    /// List every user
    List,
}

#[derive(Debug, Args)]
pub struct PasswordArgs {
    /// User and password as NAME:PASSWORD (can be specified multiple times)
    #[arg(short, long = "user", value_name = "NAME:PASSWORD")]
    users: Vec<String>,

    /// JSON file with an array of {"username", "password", "require_reset"}
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Require a password reset at next sign-in
    #[arg(long)]
    require_reset: bool,
}

/// Parse `NAME` or `NAME:PASSWORD`
pub fn parse_user_arg(arg: &str) -> CliResult<UserCreationRequest> {
    let (name, password) = match arg.split_once(':') {
        Some((name, password)) => (name.trim(), Some(password)),
        None => (arg.trim(), None),
    };
    if name.is_empty() {
        return Err(CliError::misuse(&format!("Invalid user '{arg}': empty name")));
    }
    let request = UserCreationRequest::new(name);
    Ok(match password {
        Some(password) => request.with_password(password),
        None => request,
    })
}

/// Parse `NAME:PASSWORD`, where the password is required
pub fn parse_password_arg(arg: &str) -> CliResult<PasswordRequest> {
    match arg.split_once(':') {
        Some((name, password)) if !name.trim().is_empty() && !password.is_empty() => {
            Ok(PasswordRequest::new(name.trim(), password))
        }
        _ => Err(CliError::misuse(&format!(
            "Invalid user '{arg}': expected NAME:PASSWORD"
        ))),
    }
}

async fn read_requests<T: DeserializeOwned>(path: &Path) -> CliResult<Vec<T>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let requests: Vec<T> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid user list in {}", path.display()))?;
    Ok(requests)
}

impl PasswordArgs {
    async fn into_requests(self) -> CliResult<Vec<PasswordRequest>> {
        let mut requests: Vec<PasswordRequest> = match &self.file {
            Some(path) => read_requests(path).await?,
            None => Vec::new(),
        };
        for arg in &self.users {
            requests.push(parse_password_arg(arg)?);
        }
        if requests.is_empty() {
            return Err(CliError::misuse("No users given, pass --user or --file"));
        }
        if self.require_reset {
            requests = requests
                .into_iter()
                .map(|r| r.with_require_reset(true))
                .collect();
        }
        validate_password_requests(&requests)?;
        Ok(requests)
    }
}

pub async fn execute(command: UsersCommand, session: &Session) -> CliResult<ExitCode> {
    match command.command {
        UsersSubcommand::Create {
            users,
            file,
            require_reset,
        } => {
            let mut requests = Vec::new();
            if let Some(path) = &file {
                requests.extend(read_requests::<UserCreationRequest>(path).await?);
            }
            for arg in &users {
                requests.push(parse_user_arg(arg)?);
            }
            if requests.is_empty() {
                return Err(CliError::misuse("No users given, pass --user or --file"));
            }
            if require_reset {
                requests = requests
                    .into_iter()
                    .map(|r| r.with_require_reset(true))
                    .collect();
            }
            validate_creation_requests(&requests)?;

            log::debug!("Creating {} user(s)", requests.len());
            let report = session
                .run(move |orchestrator| async move {
                    orchestrator.create_multiple(requests).await
                })
                .await;
            session.persist().await?;
            session.print_report(&report)
        }

        UsersSubcommand::Delete { names, force, yes } => {
            let names = non_empty(names, "users")?;
            validate_unique_names("user", names.iter().map(String::as_str))?;
            if force {
                let prompt = format!(
                    "Force delete {} user(s) and everything attached to them?",
                    names.len()
                );
                if !session.confirm(&prompt, yes)? {
                    eprintln!("Cancelled.");
                    return Ok(ExitCode::Success);
                }
            }

            let requests = names
                .into_iter()
                .map(|name| UserDeletionRequest::new(name, force))
                .collect();
            let report = session
                .run(move |orchestrator| async move {
                    orchestrator.delete_multiple(requests).await
                })
                .await;
            session.persist().await?;
            session.print_report(&report)
        }

        UsersSubcommand::Deps { names } => {
            let names = non_empty(names, "users")?;
            validate_unique_names("user", names.iter().map(String::as_str))?;
            let report = session
                .run(move |orchestrator| async move {
                    orchestrator.check_multiple_dependencies(names).await
                })
                .await;
            session.print_report(&report)
        }

        UsersSubcommand::SetPassword(args) => {
            let requests = args.into_requests().await?;
            let report = session
                .run(move |orchestrator| async move {
                    orchestrator.set_multiple_passwords(requests).await
                })
                .await;
            session.persist().await?;
            session.print_report(&report)
        }

        UsersSubcommand::UpdatePassword(args) => {
            let requests = args.into_requests().await?;
            let report = session
                .run(move |orchestrator| async move {
                    orchestrator.update_multiple_passwords(requests).await
                })
                .await;
            session.persist().await?;
            session.print_report(&report)
        }

        UsersSubcommand::List => {
            let users = session
                .orchestrator()
                .list_users()
                .await
                .context("Failed to list users")?;
            session.print_list(&users, |user| user.user_name.clone(), |user| user.arn.clone())
        }
    }
}
