/// # Test Utilities Module
///
/// In-memory doubles for the three seams the snippets are built on:
///
/// - `FakeConnector` / `FakeConnection`: acquisition and release, counted by a `Probe`
/// - `StagedSession`: a transactional store that only publishes writes on commit
/// - `ScriptedCatalog`: a search index listing that replays scripted states
///
/// Plus assertion helpers for the error taxonomy.

use crate::core::db::{Connection, Connector, SearchIndexCatalog, SearchIndexStatus, TransactionalSession};
use crate::core::{Result, SnippetError};
use async_trait::async_trait;
use mongodb::bson::Document;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shared counters observed by tests after a scope has finished.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    connects: Arc<AtomicUsize>,
    ops: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl Probe {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn ops(&self) -> usize {
        self.ops.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct FakeConnector {
    probe: Probe,
    fail_connect: bool,
    fail_close: bool,
}

impl FakeConnector {
    pub fn new(probe: Probe) -> Self {
        FakeConnector {
            probe,
            fail_connect: false,
            fail_close: false,
        }
    }

    /// A connector whose acquisition always fails.
    pub fn failing(probe: Probe) -> Self {
        FakeConnector {
            fail_connect: true,
            ..FakeConnector::new(probe)
        }
    }

    /// Connections from this connector fail to release.
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Conn = FakeConnection;

    async fn connect(&self) -> Result<FakeConnection> {
        if self.fail_connect {
            return Err(SnippetError::Config(
                "You must set your 'MONGODB_URI' environment variable or pass --uri".to_string(),
            ));
        }
        self.probe.connects.fetch_add(1, Ordering::SeqCst);
        Ok(FakeConnection {
            probe: self.probe.clone(),
            fail_close: self.fail_close,
        })
    }
}

#[derive(Debug)]
pub struct FakeConnection {
    probe: Probe,
    fail_close: bool,
}

/// Handle given to operations; records that an operation ran.
#[derive(Debug, Clone)]
pub struct FakeHandle {
    probe: Probe,
}

impl FakeHandle {
    pub fn record_op(&self) {
        self.probe.ops.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connection for FakeConnection {
    type Handle = FakeHandle;

    fn handle(&self) -> FakeHandle {
        FakeHandle {
            probe: self.probe.clone(),
        }
    }

    async fn close(self) -> Result<()> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(SnippetError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "socket closed during shutdown",
            )));
        }
        Ok(())
    }
}

/// Transactional store: writes are staged and only become visible on commit.
#[derive(Debug, Default)]
pub struct StagedSession {
    in_transaction: bool,
    staged: Vec<Document>,
    committed: Vec<Document>,
    calls: Vec<&'static str>,
    fail_commit: bool,
    fail_abort: bool,
}

impl StagedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    pub fn failing_abort(mut self) -> Self {
        self.fail_abort = true;
        self
    }

    /// Stages a write inside the open transaction.
    pub fn stage(&mut self, doc: Document) -> Result<()> {
        if !self.in_transaction {
            return Err(SnippetError::Transaction("no transaction in progress".to_string()));
        }
        self.staged.push(doc);
        Ok(())
    }

    /// Writes visible outside the transaction.
    pub fn committed(&self) -> &[Document] {
        &self.committed
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.clone()
    }
}

#[async_trait]
impl TransactionalSession for StagedSession {
    async fn start(&mut self) -> Result<()> {
        self.calls.push("start");
        if self.in_transaction {
            return Err(SnippetError::Transaction("transaction already in progress".to_string()));
        }
        self.in_transaction = true;
        self.staged.clear();
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.calls.push("commit");
        if !self.in_transaction {
            return Err(SnippetError::Transaction("no transaction in progress".to_string()));
        }
        if self.fail_commit {
            return Err(SnippetError::Transaction("commit failed: write concern timeout".to_string()));
        }
        self.committed.append(&mut self.staged);
        self.in_transaction = false;
        Ok(())
    }

    async fn abort(&mut self) -> Result<()> {
        self.calls.push("abort");
        if self.fail_abort {
            return Err(SnippetError::Transaction("abort failed: connection reset".to_string()));
        }
        self.staged.clear();
        self.in_transaction = false;
        Ok(())
    }
}

/// Replays scripted listing states; the last state repeats once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedCatalog {
    script: Mutex<VecDeque<Option<SearchIndexStatus>>>,
    last: Mutex<Option<SearchIndexStatus>>,
    calls: AtomicUsize,
    failing: bool,
}

impl ScriptedCatalog {
    pub fn new(script: Vec<Option<SearchIndexStatus>>) -> Self {
        ScriptedCatalog {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    /// A catalog whose listing always fails.
    pub fn failing() -> Self {
        ScriptedCatalog {
            failing: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchIndexCatalog for ScriptedCatalog {
    async fn describe(&self, _name: &str) -> Result<Option<SearchIndexStatus>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(SnippetError::SearchIndex("listing failed".to_string()));
        }

        let next = self.script.lock().ok().and_then(|mut script| script.pop_front());
        let mut last = self
            .last
            .lock()
            .map_err(|_| SnippetError::SearchIndex("catalog lock poisoned".to_string()))?;
        if let Some(state) = next {
            *last = state;
        }
        Ok(last.clone())
    }
}

/// Error testing utilities
pub mod error_testing {
    use crate::core::SnippetError;

    /// Asserts that `result` is a `Config` error whose message contains `needle`.
    pub fn assert_config_error<T: std::fmt::Debug>(result: Result<T, SnippetError>, needle: &str) {
        match result {
            Err(SnippetError::Config(msg)) => assert!(
                msg.contains(needle),
                "Config error '{}' should mention '{}'",
                msg,
                needle
            ),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    /// Checks that an error message is specific enough to act on.
    pub fn verify_error_message_quality(err: &SnippetError, context: &str) {
        let msg = err.to_string();
        assert!(msg.len() > 15, "Error message too short in {}: '{}'", context, msg);
        assert!(msg.contains(':'), "Error message lacks a category prefix in {}: '{}'", context, msg);
    }
}
