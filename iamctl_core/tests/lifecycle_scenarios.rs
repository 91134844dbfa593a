//! End-to-end batch scenarios against a fault-injecting directory

use iamctl_core::{
    AttachPolicyRequest, ClientConfig, DeletionStatus, DirectoryError, ErrorKind,
    LifecycleOrchestrator, PasswordStatus, RemoteDirectory, SyncPoliciesRequest,
    UserCreationRequest, UserDeletionRequest, UserStatus,
};
use iamctl_test_utils::{DirectoryFixture, MockDirectory, Operation, UserFixture};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn orchestrator(mock: &MockDirectory, config: &ClientConfig) -> LifecycleOrchestrator {
    LifecycleOrchestrator::new(Arc::new(mock.clone()), config)
}

fn arns(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn batch_create_preserves_order_under_random_latency() {
    let mock = MockDirectory::new();
    mock.set_latency(Duration::from_millis(1), Duration::from_millis(25));
    let names: Vec<String> = (0..40).map(|i| format!("user-{i}")).collect();

    let results = orchestrator(&mock, &ClientConfig::default())
        .create_multiple(
            names
                .iter()
                .map(|n| UserCreationRequest::new(n.as_str()))
                .collect(),
        )
        .await;

    assert_eq!(results.len(), names.len());
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.username, names[i]);
        assert!(result.success);
    }
}

#[tokio::test]
async fn batch_create_isolates_a_failing_item() {
    let mock = MockDirectory::new();
    mock.fail(
        Operation::CreateUser,
        "user-3",
        DirectoryError::from_vendor("ServiceFailure", "internal error"),
    );
    let requests = (0..6)
        .map(|i| UserCreationRequest::new(format!("user-{i}")).with_password("long-enough"))
        .collect();

    let results = orchestrator(&mock, &ClientConfig::default())
        .create_multiple(requests)
        .await;

    for (i, result) in results.iter().enumerate() {
        if i == 3 {
            assert!(!result.success);
            assert_eq!(result.user_status, UserStatus::CreationError);
            assert_eq!(result.error_kind, Some(ErrorKind::TransientOrUnknown));
            assert!(result.error.as_deref().unwrap().contains("internal error"));
        } else {
            assert!(result.success, "{result:?}");
            assert_eq!(result.password_status, PasswordStatus::CreatedSuccess);
        }
    }
    assert_eq!(mock.inner().user_count().await, 5);
}

#[tokio::test]
async fn login_profile_reporting_user_missing_is_flagged() {
    let mock = MockDirectory::new();
    mock.fail(
        Operation::CreateLoginProfile,
        "ghostly",
        DirectoryError::no_such_entity("The user with name ghostly cannot be found."),
    );

    let result = orchestrator(&mock, &ClientConfig::default())
        .create_user(UserCreationRequest::new("ghostly").with_password("long-enough"))
        .await;

    assert!(!result.success);
    assert_eq!(result.user_status, UserStatus::CreatedSuccess);
    assert_eq!(result.password_status, PasswordStatus::UserNotFound);
}

#[tokio::test]
async fn panicking_remote_call_becomes_item_failure() {
    let mock = MockDirectory::new();
    mock.panic_on(Operation::CreateUser, "crashy");

    let results = orchestrator(&mock, &ClientConfig::default())
        .create_multiple(vec![
            UserCreationRequest::new("before"),
            UserCreationRequest::new("crashy"),
            UserCreationRequest::new("after"),
        ])
        .await;

    assert!(results[0].success);
    assert!(!results[1].success);
    assert_eq!(results[1].username, "crashy");
    assert_eq!(results[1].error_kind, Some(ErrorKind::TransientOrUnknown));
    assert!(results[1].error.as_deref().unwrap().contains("panicked"));
    assert!(results[2].success);
}

#[tokio::test]
async fn hung_remote_call_times_out_without_blocking_the_batch() {
    let mock = MockDirectory::new();
    mock.hang_on(Operation::DeleteUser, "stuck");
    mock.inner().create_user("stuck").await.unwrap();
    mock.inner().create_user("fine").await.unwrap();
    let config = ClientConfig {
        operation_timeout_secs: Some(1),
        ..ClientConfig::default()
    };

    let results = orchestrator(&mock, &config)
        .delete_multiple(vec![
            UserDeletionRequest::new("stuck", false),
            UserDeletionRequest::new("fine", false),
        ])
        .await;

    assert!(!results[0].success);
    assert_eq!(results[0].status, DeletionStatus::DeletionError);
    assert!(results[0].error.as_deref().unwrap().contains("timed out"));
    assert!(results[1].success);
}

#[tokio::test]
async fn delete_with_dependencies_then_force() {
    let mock = DirectoryFixture::new()
        .with_user(UserFixture::new("alice").with_policy("arn:aws:iam::aws:policy/ReadOnlyAccess"))
        .build_mock()
        .await
        .unwrap();
    let orchestrator = orchestrator(&mock, &ClientConfig::default());

    let first = orchestrator
        .delete_multiple(vec![UserDeletionRequest::new("alice", false)])
        .await;
    assert!(!first[0].success);
    assert!(first[0].error.as_deref().unwrap().contains("dependencies"));

    let second = orchestrator
        .delete_multiple(vec![UserDeletionRequest::new("alice", true)])
        .await;
    assert!(second[0].success);
    assert_eq!(mock.call_count(Operation::DetachUserPolicy), 1);
    assert!(mock.inner().get_user("alice").await.is_err());
}

#[tokio::test]
async fn forced_cleanup_is_best_effort() {
    let mock = DirectoryFixture::new()
        .with_user(UserFixture::new("alice").with_all_dependencies())
        .build_mock()
        .await
        .unwrap();
    mock.fail_all(
        Operation::DeleteAccessKey,
        DirectoryError::from_vendor("Throttling", "Rate exceeded"),
    );

    let result = orchestrator(&mock, &ClientConfig::default())
        .delete_user(UserDeletionRequest::new("alice", true))
        .await;

    // Later steps still ran
    assert_eq!(mock.call_count(Operation::DeleteLoginProfile), 1);
    assert!(mock.inner().get_login_profile("alice").await.is_err());
    assert!(mock.inner().list_groups_for_user("alice").await.unwrap().is_empty());

    // The remaining key blocks the authoritative delete
    assert!(!result.success);
    assert_eq!(result.status, DeletionStatus::HasDependencies);
    assert_eq!(result.cleanup_errors.len(), 1);
    assert!(result.cleanup_errors[0].contains("access key"));
}

#[tokio::test]
async fn dependency_check_issues_no_mutations() {
    let mock = DirectoryFixture::new()
        .with_user(UserFixture::new("alice").with_all_dependencies())
        .with_users(&["bob"])
        .build_mock()
        .await
        .unwrap();

    let results = orchestrator(&mock, &ClientConfig::default())
        .check_multiple_dependencies(vec!["alice".into(), "bob".into(), "nobody".into()])
        .await;

    assert!(mock.mutating_calls().is_empty());
    assert!(results[0].dependencies.as_ref().unwrap().has_dependencies());
    assert!(!results[1].dependencies.as_ref().unwrap().has_dependencies());
    assert_eq!(results[2].error_kind, Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn dependency_check_degrades_failed_listings_to_empty() {
    let mock = DirectoryFixture::new()
        .with_user(UserFixture::new("alice").with_all_dependencies())
        .build_mock()
        .await
        .unwrap();
    mock.fail_all(
        Operation::ListAccessKeys,
        DirectoryError::from_vendor("ServiceFailure", "unavailable"),
    );

    let deps = orchestrator(&mock, &ClientConfig::default())
        .check_dependencies("alice")
        .await
        .unwrap();

    assert!(deps.access_keys.is_empty());
    assert_eq!(deps.groups.len(), 1);
    assert!(deps.has_login_profile);
}

#[tokio::test]
async fn policy_sync_scenario() {
    let mock = DirectoryFixture::new()
        .with_user(UserFixture::new("bob").with_policy("p2").with_policy("p3"))
        .build_mock()
        .await
        .unwrap();

    let result = orchestrator(&mock, &ClientConfig::default())
        .sync_policies("bob", &arns(&["p1", "p2"]), &arns(&["p2", "p3"]))
        .await;

    assert!(result.success);
    assert_eq!(result.attached_arns, arns(&["p1"]));
    assert_eq!(result.detached_arns, arns(&["p3"]));
    // p2 was never touched
    assert!(
        mock.calls()
            .iter()
            .all(|c| !c.args.contains(&"p2".to_string()))
    );
}

#[tokio::test]
async fn policy_sync_does_not_roll_back_partial_success() {
    let mock = DirectoryFixture::new()
        .with_users(&["bob"])
        .build_mock()
        .await
        .unwrap();
    mock.fail(
        Operation::AttachUserPolicy,
        "p2",
        DirectoryError::from_vendor("LimitExceeded", "Too many policies"),
    );

    let result = orchestrator(&mock, &ClientConfig::default())
        .sync_policies("bob", &arns(&["p1", "p2", "p3"]), &[])
        .await;

    assert!(!result.success);
    assert_eq!(result.attached_arns, arns(&["p1", "p3"]));
    assert_eq!(result.attach_errors.len(), 1);
    assert!(result.attach_errors[0].starts_with("p2: "));
    assert_eq!(result.failures[0].kind, ErrorKind::TransientOrUnknown);
    assert_eq!(mock.call_count(Operation::DetachUserPolicy), 0);

    let attached = mock.inner().list_attached_user_policies("bob").await.unwrap();
    assert_eq!(attached.len(), 2);
}

#[tokio::test]
async fn bounded_fan_out_keeps_result_contract() {
    let mock = MockDirectory::new();
    mock.set_latency(Duration::from_millis(1), Duration::from_millis(5));
    let config = ClientConfig {
        max_concurrency: Some(3),
        ..ClientConfig::default()
    };
    let requests: Vec<_> = (0..12)
        .map(|i| UserCreationRequest::new(format!("u{i}")))
        .collect();

    let results = orchestrator(&mock, &config).create_multiple(requests).await;

    assert_eq!(results.len(), 12);
    assert!(results.iter().all(|r| r.success));
    assert_eq!(results[11].username, "u11");
}

#[tokio::test]
async fn batch_sync_keeps_order_and_isolates_users() {
    let mock = DirectoryFixture::new()
        .with_user(UserFixture::new("bob").with_policy("p1"))
        .with_users(&["carol", "dave"])
        .build_mock()
        .await
        .unwrap();
    mock.set_latency(Duration::from_millis(1), Duration::from_millis(20));
    mock.fail(
        Operation::AttachUserPolicy,
        "carol",
        DirectoryError::from_vendor("LimitExceeded", "Too many policies"),
    );

    let results = orchestrator(&mock, &ClientConfig::default())
        .sync_multiple(vec![
            SyncPoliciesRequest::new("bob", ["p2"], ["p1"]),
            SyncPoliciesRequest::new("carol", ["p1", "p2"], Vec::<String>::new()),
            SyncPoliciesRequest::new("ghost", ["p1"], Vec::<String>::new()),
            SyncPoliciesRequest::new("dave", ["p3"], Vec::<String>::new()),
        ])
        .await;

    let names: Vec<_> = results.iter().map(|r| r.username.as_str()).collect();
    assert_eq!(names, ["bob", "carol", "ghost", "dave"]);

    assert!(results[0].success);
    assert_eq!(results[0].attached_arns, arns(&["p2"]));
    assert_eq!(results[0].detached_arns, arns(&["p1"]));

    assert!(!results[1].success);
    assert_eq!(results[1].attach_errors.len(), 2);

    assert!(!results[2].success);
    assert_eq!(results[2].failures[0].kind, ErrorKind::NotFound);

    assert!(results[3].success);
    assert_eq!(results[3].attached_arns, arns(&["p3"]));
}

#[tokio::test]
async fn batch_sync_hung_user_times_out_alone() {
    let mock = DirectoryFixture::new()
        .with_users(&["stuck", "fine"])
        .build_mock()
        .await
        .unwrap();
    mock.hang_on(Operation::AttachUserPolicy, "stuck");
    let config = ClientConfig {
        operation_timeout_secs: Some(1),
        ..ClientConfig::default()
    };

    let results = orchestrator(&mock, &config)
        .sync_multiple(vec![
            SyncPoliciesRequest::new("stuck", ["p1"], Vec::<String>::new()),
            SyncPoliciesRequest::new("fine", ["p1"], Vec::<String>::new()),
        ])
        .await;

    let stuck = &results[0];
    assert!(!stuck.success);
    let timed_out = stuck
        .error
        .iter()
        .chain(&stuck.attach_errors)
        .any(|e| e.contains("timed out"));
    assert!(timed_out, "{stuck:?}");
    assert!(results[1].success);
}

#[tokio::test]
async fn policy_sync_honours_concurrency_limit() {
    let mock = DirectoryFixture::new()
        .with_users(&["bob"])
        .build_mock()
        .await
        .unwrap();
    mock.set_latency(Duration::from_millis(50), Duration::from_millis(50));
    let config = ClientConfig {
        max_concurrency: Some(1),
        ..ClientConfig::default()
    };
    let desired: Vec<String> = (0..10).map(|i| format!("p{i}")).collect();

    let start = Instant::now();
    let result = orchestrator(&mock, &config)
        .sync_policies("bob", &desired, &[])
        .await;

    assert!(result.success);
    assert_eq!(result.attached_count, 10);
    // Ten calls of 50ms one at a time
    assert!(start.elapsed() >= Duration::from_millis(450), "{:?}", start.elapsed());
}

#[tokio::test]
async fn bounded_batch_sync_does_not_starve_its_own_calls() {
    let mock = DirectoryFixture::new()
        .with_users(&["u0", "u1", "u2"])
        .build_mock()
        .await
        .unwrap();
    mock.set_latency(Duration::from_millis(1), Duration::from_millis(5));
    let config = ClientConfig {
        max_concurrency: Some(1),
        ..ClientConfig::default()
    };
    let none: Vec<String> = Vec::new();
    let requests = (0..3)
        .map(|i| SyncPoliciesRequest::new(format!("u{i}"), ["p1", "p2", "p3"], none.clone()))
        .collect();

    let results = tokio::time::timeout(
        Duration::from_secs(10),
        orchestrator(&mock, &config).sync_multiple(requests),
    )
    .await
    .expect("nested sync deadlocked");

    assert!(results.iter().all(|r| r.success && r.attached_count == 3));
}

#[tokio::test]
async fn attach_failure_keeps_the_request_identity() {
    let mock = DirectoryFixture::new()
        .with_users(&["ops <- team"])
        .build_mock()
        .await
        .unwrap();
    mock.panic_on(Operation::AttachUserPolicy, "p <- 1");

    let results = orchestrator(&mock, &ClientConfig::default())
        .attach_multiple_policies(vec![
            AttachPolicyRequest::new("ops <- team", "p <- 1"),
            AttachPolicyRequest::new("ops <- team", "p2"),
        ])
        .await;

    assert!(!results[0].success);
    assert_eq!(results[0].username, "ops <- team");
    assert_eq!(results[0].policy_arn, "p <- 1");
    assert!(results[0].error.as_deref().unwrap().contains("panicked"));
    assert!(results[1].success);
}
