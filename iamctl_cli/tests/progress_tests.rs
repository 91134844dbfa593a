#[cfg(test)]
mod progress_tests {
    use iamctl_cli::progress::renderer::ProgressRenderer;
    use iamctl_cli::progress::{create_progress_infrastructure, render_progress};
    use iamctl_core::error::{DirectoryError, ErrorCode};
    use iamctl_core::progress::ProgressUpdate;
    use iamctl_core::{ClientConfig, LifecycleOrchestrator, UserCreationRequest};
    use iamctl_test_utils::{MockDirectory, Operation};
    use std::sync::Arc;

    #[test]
    fn test_progress_renderer_handles_updates() {
        let mut renderer = ProgressRenderer::new();

        renderer.handle_update(ProgressUpdate::BatchProgress {
            operation: "create users".to_string(),
            completed: 1,
            total: 2,
            item: Some("alice".to_string()),
            succeeded: true,
        });
        renderer.handle_update(ProgressUpdate::BatchProgress {
            operation: "create users".to_string(),
            completed: 2,
            total: 2,
            item: Some("bob".to_string()),
            succeeded: false,
        });
        // Finish should not panic
        renderer.finish();
    }

    #[test]
    fn test_renderer_tolerates_inconsistent_totals() {
        let mut renderer = ProgressRenderer::new();
        renderer.handle_update(ProgressUpdate::BatchProgress {
            operation: "delete users".to_string(),
            completed: 5,
            total: 3,
            item: None,
            succeeded: true,
        });
        renderer.finish();
    }

    #[tokio::test]
    async fn test_batch_reports_every_item_then_completes() {
        let (provider, mut rx) = create_progress_infrastructure();
        let mock = Arc::new(MockDirectory::new());
        mock.fail(
            Operation::CreateUser,
            "bob",
            DirectoryError::new(ErrorCode::ServiceFailure, "boom"),
        );
        let orchestrator = LifecycleOrchestrator::new(mock, &ClientConfig::default())
            .with_progress(provider);

        let results = orchestrator
            .create_multiple(vec![
                UserCreationRequest::new("alice"),
                UserCreationRequest::new("bob"),
                UserCreationRequest::new("carol"),
            ])
            .await;
        assert_eq!(results.len(), 3);

        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }

        let batch: Vec<_> = updates
            .iter()
            .map(|u| match u {
                ProgressUpdate::BatchProgress {
                    completed,
                    total,
                    item,
                    succeeded,
                    ..
                } => (*completed, *total, item.clone(), *succeeded),
            })
            .collect();

        assert_eq!(batch.len(), 3);
        assert!(batch.iter().all(|(_, total, _, _)| *total == 3));
        let mut completed: Vec<_> = batch.iter().map(|(c, _, _, _)| *c).collect();
        completed.sort();
        assert_eq!(completed, vec![1, 2, 3]);
        let failed: Vec<_> = batch
            .iter()
            .filter(|(_, _, _, ok)| !ok)
            .filter_map(|(_, _, item, _)| item.clone())
            .collect();
        assert_eq!(failed, vec!["bob".to_string()]);
    }

    #[tokio::test]
    async fn test_render_progress_exits_after_complete() {
        let (provider, rx) = create_progress_infrastructure();
        let renderer = tokio::spawn(render_progress(rx));

        provider.report(ProgressUpdate::BatchProgress {
            operation: "check dependencies".to_string(),
            completed: 1,
            total: 1,
            item: Some("alice".to_string()),
            succeeded: true,
        });
        provider.complete();

        tokio::time::timeout(std::time::Duration::from_secs(5), renderer)
            .await
            .expect("renderer did not stop")
            .unwrap();
    }
}
