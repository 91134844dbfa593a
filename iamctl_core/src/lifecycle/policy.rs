//! Policy reconciliation and batch policy attachment
//!
//! A sync diffs the desired ARN set against the current one and then issues
//! every attach and detach concurrently, bounded by the runner's call pool.
//! The two halves never overlap, so no ordering between them is needed.
//! Partial failures are reported, not retried or rolled back.

use super::LifecycleOrchestrator;
use super::types::{
    AttachPolicyRequest, AttachPolicyResult, PolicyFailure, PolicyOperation, SyncPoliciesRequest,
    SyncPoliciesResult,
};
use crate::batch::{WorkerFailure, acquire};
use crate::error::{DirectoryResult, ErrorKind};
use crate::progress::{ProgressProvider, ProgressUpdate};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Corrective operations needed to reach a desired policy set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySyncPlan {
    /// Desired but not current
    pub to_attach: BTreeSet<String>,
    /// Current but not desired
    pub to_detach: BTreeSet<String>,
}

impl PolicySyncPlan {
    pub fn is_noop(&self) -> bool {
        self.to_attach.is_empty() && self.to_detach.is_empty()
    }
}

/// Diff desired against current ARNs
///
/// ARNs present in both are left alone. Duplicates in either input collapse.
pub fn plan_policy_sync<D, C>(desired: D, current: C) -> PolicySyncPlan
where
    D: IntoIterator,
    D::Item: Into<String>,
    C: IntoIterator,
    C::Item: Into<String>,
{
    let desired: BTreeSet<String> = desired.into_iter().map(Into::into).collect();
    let current: BTreeSet<String> = current.into_iter().map(Into::into).collect();

    PolicySyncPlan {
        to_attach: desired.difference(&current).cloned().collect(),
        to_detach: current.difference(&desired).cloned().collect(),
    }
}

/// Outcomes appended by concurrent policy calls
#[derive(Default)]
struct SyncOutcomes {
    attached: Vec<String>,
    detached: Vec<String>,
    attach_errors: Vec<String>,
    detach_errors: Vec<String>,
    failures: Vec<PolicyFailure>,
}

impl SyncOutcomes {
    fn record(
        &mut self,
        operation: PolicyOperation,
        arn: String,
        outcome: Result<(), (ErrorKind, String)>,
    ) {
        match (operation, outcome) {
            (PolicyOperation::Attach, Ok(())) => self.attached.push(arn),
            (PolicyOperation::Detach, Ok(())) => self.detached.push(arn),
            (operation, Err((kind, message))) => {
                let line = format!("{arn}: {message}");
                match operation {
                    PolicyOperation::Attach => self.attach_errors.push(line),
                    PolicyOperation::Detach => self.detach_errors.push(line),
                }
                self.failures.push(PolicyFailure {
                    arn,
                    operation,
                    kind,
                });
            }
        }
    }

    fn completed(&self) -> usize {
        self.attached.len() + self.detached.len() + self.failures.len()
    }
}

impl LifecycleOrchestrator {
    /// Bring a user's attached managed policies to exactly `desired_arns`
    ///
    /// An empty `current_arns` means the current state is unknown and the full
    /// desired set is attached; attaching an already attached ARN is a no-op
    /// on the directory side.
    pub async fn sync_policies(
        &self,
        username: &str,
        desired_arns: &[String],
        current_arns: &[String],
    ) -> SyncPoliciesResult {
        let progress = self.runner.progress().clone();
        let result = self
            .reconcile(username, desired_arns, current_arns, Some(progress))
            .await;
        self.runner.progress().complete();
        result
    }

    /// Sync many users concurrently, one result per request in the same order
    ///
    /// Progress is reported per user rather than per ARN.
    pub async fn sync_multiple(
        &self,
        requests: Vec<SyncPoliciesRequest>,
    ) -> Vec<SyncPoliciesResult> {
        let results = self
            .runner
            .run(
                "sync policies",
                requests,
                |request| request.username.clone(),
                |request| {
                    let orchestrator = self.clone();
                    async move {
                        orchestrator
                            .reconcile(
                                &request.username,
                                &request.desired_arns,
                                &request.current_arns,
                                None,
                            )
                            .await
                    }
                },
                SyncPoliciesResult::worker_failed,
            )
            .await;
        self.runner.progress().complete();
        results
    }

    async fn reconcile(
        &self,
        username: &str,
        desired_arns: &[String],
        current_arns: &[String],
        progress: Option<Arc<dyn ProgressProvider>>,
    ) -> SyncPoliciesResult {
        let plan = plan_policy_sync(desired_arns.iter().cloned(), current_arns.iter().cloned());
        let total = plan.to_attach.len() + plan.to_detach.len();
        log::debug!(
            "Policy sync for '{username}': {} to attach, {} to detach",
            plan.to_attach.len(),
            plan.to_detach.len()
        );

        let outcomes = Arc::new(Mutex::new(SyncOutcomes::default()));
        let timeout = self.runner.timeout();
        let mut handles = Vec::with_capacity(total);

        let operations = plan
            .to_attach
            .into_iter()
            .map(|arn| (PolicyOperation::Attach, arn))
            .chain(
                plan.to_detach
                    .into_iter()
                    .map(|arn| (PolicyOperation::Detach, arn)),
            );

        for (operation, arn) in operations {
            let directory = self.directory.clone();
            let outcomes = outcomes.clone();
            let progress = progress.clone();
            let calls = self.runner.call_permits();
            let username = username.to_string();
            let task_arn = arn.clone();

            let handle = tokio::spawn(async move {
                let call = async {
                    match operation {
                        PolicyOperation::Attach => {
                            directory.attach_user_policy(&username, &task_arn).await
                        }
                        PolicyOperation::Detach => {
                            directory.detach_user_policy(&username, &task_arn).await
                        }
                    }
                };
                // The deadline starts once the permit is granted
                let outcome = match acquire(calls).await {
                    Ok(_permit) => settle(call, timeout).await,
                    Err(failure) => Err((failure.kind(), failure.to_string())),
                };
                if let Err((_, message)) = &outcome {
                    log::info!(
                        "Policy {operation:?} of {task_arn} for '{username}' failed: {message}"
                    );
                }

                let mut guard = outcomes.lock().await;
                let succeeded = outcome.is_ok();
                guard.record(operation, task_arn.clone(), outcome);
                if let Some(progress) = progress {
                    progress.report(ProgressUpdate::BatchProgress {
                        operation: "sync policies".to_string(),
                        completed: guard.completed(),
                        total,
                        item: Some(task_arn.clone()),
                        succeeded,
                    });
                }
            });
            handles.push((operation, arn, handle));
        }

        for (operation, arn, handle) in handles {
            if let Err(join_error) = handle.await {
                let failure = WorkerFailure::from_join_error(join_error);
                log::warn!("Policy {operation:?} of {arn} for '{username}' failed: {failure}");
                outcomes
                    .lock()
                    .await
                    .record(operation, arn, Err((failure.kind(), failure.to_string())));
            }
        }

        let mut outcomes = std::mem::take(&mut *outcomes.lock().await);
        outcomes.attached.sort();
        outcomes.detached.sort();
        outcomes.attach_errors.sort();
        outcomes.detach_errors.sort();
        outcomes.failures.sort_by(|a, b| a.arn.cmp(&b.arn));

        SyncPoliciesResult {
            username: username.to_string(),
            attached_count: outcomes.attached.len(),
            detached_count: outcomes.detached.len(),
            success: outcomes.attach_errors.is_empty() && outcomes.detach_errors.is_empty(),
            attached_arns: outcomes.attached,
            detached_arns: outcomes.detached,
            attach_errors: outcomes.attach_errors,
            detach_errors: outcomes.detach_errors,
            failures: outcomes.failures,
            error: None,
            error_kind: None,
        }
    }

    /// Attach one managed policy to one user
    pub async fn attach_policy(&self, request: AttachPolicyRequest) -> AttachPolicyResult {
        let AttachPolicyRequest {
            username,
            policy_arn,
        } = request;
        match self.directory.attach_user_policy(&username, &policy_arn).await {
            Ok(()) => {
                log::info!("Attached {policy_arn} to '{username}'");
                AttachPolicyResult {
                    username,
                    policy_arn,
                    success: true,
                    error: None,
                    error_kind: None,
                }
            }
            Err(err) => {
                log::info!("Attaching {policy_arn} to '{username}' failed: {err}");
                AttachPolicyResult {
                    username,
                    policy_arn,
                    success: false,
                    error: Some(err.to_string()),
                    error_kind: Some(err.kind()),
                }
            }
        }
    }

    /// Attach many user/policy pairs concurrently, results in request order
    pub async fn attach_multiple_policies(
        &self,
        requests: Vec<AttachPolicyRequest>,
    ) -> Vec<AttachPolicyResult> {
        let results = self
            .runner
            .run_keyed(
                "attach policies",
                requests,
                AttachPolicyRequest::clone,
                |request| {
                    let orchestrator = self.clone();
                    async move { orchestrator.attach_policy(request).await }
                },
                |request: &AttachPolicyRequest, failure: WorkerFailure| AttachPolicyResult {
                    username: request.username.clone(),
                    policy_arn: request.policy_arn.clone(),
                    success: false,
                    error: Some(failure.to_string()),
                    error_kind: Some(failure.kind()),
                },
            )
            .await;
        self.runner.progress().complete();
        results
    }
}

/// Await a directory call under an optional deadline
async fn settle<F>(
    call: F,
    timeout: Option<std::time::Duration>,
) -> Result<(), (ErrorKind, String)>
where
    F: std::future::Future<Output = DirectoryResult<()>>,
{
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => {
                let failure = WorkerFailure::TimedOut(limit);
                return Err((failure.kind(), failure.to_string()));
            }
        },
        None => call.await,
    };
    result.map_err(|err| (err.kind(), err.to_string()))
}
