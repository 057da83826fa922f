/// # Integration Tests Module
///
/// End-to-end flows over the in-memory doubles: a scoped connection wrapping
/// a transaction, a readiness poll, and configuration errors that stop a run
/// before anything is acquired.

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::core::db::{run_in_transaction, wait_until_queryable, with_connection, PollPolicy, SearchIndexStatus};
    use crate::core::{Lookup, SnippetError};
    use crate::output::OutputFormat;
    use crate::snippets::{catalogue, Snippet};
    use crate::test_utils::error_testing;
    use crate::test_utils::*;
    use clap::ValueEnum;
    use futures::FutureExt;
    use mongodb::bson::doc;
    use std::time::Duration;

    fn ready(queryable: bool) -> SearchIndexStatus {
        SearchIndexStatus {
            name: "vector_index".to_string(),
            status: Some(if queryable { "READY" } else { "BUILDING" }.to_string()),
            queryable,
            index_type: Some("vectorSearch".to_string()),
            latest_definition: None,
        }
    }

    #[tokio::test]
    async fn test_failed_transaction_inside_scope_leaves_nothing() {
        let probe = Probe::default();
        let connector = FakeConnector::new(probe.clone());

        let (result, session) = with_connection(&connector, |handle| async move {
            handle.record_op();
            let mut session = StagedSession::new();
            let result = run_in_transaction(&mut session, |s: &mut StagedSession| {
                async move {
                    s.stage(doc! { "title": "The Bluest Eye" })?;
                    s.stage(doc! { "title": "Sula" })?;
                    Err::<(), _>(SnippetError::Transaction("duplicate key on third insert".to_string()))
                }
                .boxed()
            })
            .await;
            Ok((result, session))
        })
        .await
        .unwrap();

        assert!(matches!(result, Err(SnippetError::Transaction(_))));
        assert!(session.committed().is_empty());
        assert_eq!(session.calls(), vec!["start", "abort"]);
        assert_eq!(probe.ops(), 1);
        assert_eq!(probe.closes(), 1);
    }

    #[tokio::test]
    async fn test_committed_transaction_inside_scope() {
        let probe = Probe::default();
        let connector = FakeConnector::new(probe.clone());

        let committed = with_connection(&connector, |_handle| async move {
            let mut session = StagedSession::new();
            let staged = run_in_transaction(&mut session, |s: &mut StagedSession| {
                async move {
                    for title in ["The Bluest Eye", "Sula", "Song of Solomon"] {
                        s.stage(doc! { "title": title, "author": "Toni Morrison" })?;
                    }
                    Ok(3)
                }
                .boxed()
            })
            .await?;
            assert_eq!(staged, 3);
            Ok(session.committed().len())
        })
        .await
        .unwrap();

        assert_eq!(committed, 3);
        assert_eq!(probe.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_timeout_still_releases_connection() {
        let probe = Probe::default();
        let connector = FakeConnector::new(probe.clone());
        let policy = PollPolicy::new(Duration::from_secs(5), Some(Duration::from_secs(10)));

        let result = with_connection(&connector, |_handle| async move {
            let catalog = ScriptedCatalog::new(vec![None, Some(ready(false))]);
            wait_until_queryable(&catalog, "vector_index", &policy).await
        })
        .await;

        assert!(matches!(result, Err(SnippetError::Timeout(_))));
        assert_eq!(probe.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_reports_ready_status() {
        let connector = FakeConnector::new(Probe::default());
        let status = with_connection(&connector, |_handle| async move {
            let catalog = ScriptedCatalog::new(vec![Some(ready(false)), Some(ready(true))]);
            wait_until_queryable(&catalog, "vector_index", &PollPolicy::default()).await
        })
        .await
        .unwrap();

        assert!(status.queryable);
        assert_eq!(status.status.as_deref(), Some("READY"));
    }

    #[tokio::test]
    async fn test_no_match_is_a_value() {
        let probe = Probe::default();
        let connector = FakeConnector::new(probe.clone());
        let found: Lookup<i32> = with_connection(&connector, |_handle| async move { Ok(None.into()) })
            .await
            .unwrap();
        assert_eq!(found, Lookup::NoMatch);
        assert_eq!(probe.closes(), 1);
    }

    #[test]
    fn test_missing_uri_is_fatal_configuration() {
        let config = Config::from_toml_str(
            r#"
            [connection]
            uri_env = "DRIVER_SNIPPETS_INTEGRATION_UNSET"
            "#,
        )
        .unwrap();
        let err = config.resolve_uri(None).unwrap_err();
        error_testing::verify_error_message_quality(&err, "missing uri");
        error_testing::assert_config_error::<String>(Err(err), "DRIVER_SNIPPETS_INTEGRATION_UNSET");
    }

    #[tokio::test]
    async fn test_failed_acquire_runs_nothing() {
        let probe = Probe::default();
        let connector = FakeConnector::failing(probe.clone());
        let result = with_connection(&connector, |handle| async move {
            handle.record_op();
            Ok(())
        })
        .await;

        error_testing::assert_config_error(result, "MONGODB_URI");
        assert_eq!(probe.ops(), 0);
        assert_eq!(probe.closes(), 0);
    }

    #[test]
    fn test_catalogue_exports_every_snippet() {
        let markdown = catalogue().export(OutputFormat::Markdown).unwrap();
        for snippet in Snippet::value_variants() {
            assert!(
                markdown.contains(&format!("| {} |", snippet.name())),
                "missing {} in catalogue",
                snippet.name()
            );
        }
    }
}
