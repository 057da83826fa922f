/// Connection Lifecycle Module
///
/// This module provides connection acquisition, scoped operation and
/// guaranteed release for every snippet:
///
/// `Unconnected -> Connected -> (Operating)* -> Disconnected`
///
/// `Disconnected` is terminal and reachable from every other state through the
/// release path. [`with_connection`] runs the release step exactly once no
/// matter how the operation exits: success, error, early return or panic.

use crate::core::{Result, SnippetError};
use async_trait::async_trait;
use futures::FutureExt;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::Client;
use std::future::{Future, IntoFuture};
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Represents the connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Nothing acquired yet
    Unconnected,
    /// Connection acquired and verified
    Connected,
    /// At least one operation has been issued
    Operating,
    /// Connection released; terminal
    Disconnected,
}

impl Default for LifecycleState {
    fn default() -> Self {
        LifecycleState::Unconnected
    }
}

impl LifecycleState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, next) {
            (Disconnected, _) => false,
            (_, Disconnected) => true,
            (Unconnected, Connected) => true,
            (Connected, Operating) | (Operating, Operating) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == LifecycleState::Disconnected
    }
}

/// Acquires a connection.
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: Connection;

    /// Opens and verifies a connection. Failures are fatal to the caller.
    async fn connect(&self) -> Result<Self::Conn>;
}

/// A releasable connection.
///
/// Operations receive a [`Connection::Handle`] rather than the connection
/// itself, so only the owning scope can release it.
#[async_trait]
pub trait Connection: Send + Sync + Sized {
    type Handle: Send;

    fn handle(&self) -> Self::Handle;

    /// Releases the connection. Called at most once per connection.
    async fn close(self) -> Result<()>;
}

/// Owns one connection and tracks its lifecycle state.
pub struct ConnectionScope<C: Connection> {
    conn: Option<C>,
    state: LifecycleState,
}

impl<C: Connection> ConnectionScope<C> {
    /// Acquires a connection through `connector`.
    pub async fn open<K>(connector: &K) -> Result<Self>
    where
        K: Connector<Conn = C>,
    {
        let conn = connector.connect().await?;
        let mut scope = ConnectionScope {
            conn: Some(conn),
            state: LifecycleState::Unconnected,
        };
        scope.transition(LifecycleState::Connected)?;
        Ok(scope)
    }

    /// Gets the current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    fn transition(&mut self, next: LifecycleState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(SnippetError::Lifecycle(format!(
                "illegal transition {:?} -> {:?}",
                self.state, next
            )));
        }
        debug!(from = ?self.state, to = ?next, "connection lifecycle transition");
        self.state = next;
        Ok(())
    }

    /// Runs one operation against a handle to the connection.
    pub async fn operate<F, Fut, T>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(C::Handle) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.transition(LifecycleState::Operating)?;
        let handle = match &self.conn {
            Some(conn) => conn.handle(),
            None => {
                return Err(SnippetError::Lifecycle(
                    "connection already released".to_string(),
                ))
            }
        };
        op(handle).await
    }

    /// Releases the connection. A second call is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => {
                self.transition(LifecycleState::Disconnected)?;
                conn.close().await
            }
            None => Ok(()),
        }
    }
}

impl<C: Connection> Drop for ConnectionScope<C> {
    fn drop(&mut self) {
        if self.conn.is_some() {
            warn!(state = ?self.state, "connection scope dropped without being closed");
        }
    }
}

/// Acquires a connection, runs `op`, and releases the connection exactly once.
///
/// Acquisition failure is returned without running `op`. After a failed
/// operation the operation's error is returned and a release failure is only
/// logged. A panic inside `op` is resumed after the release step has run.
pub async fn with_connection<K, F, Fut, T>(connector: &K, op: F) -> Result<T>
where
    K: Connector,
    F: FnOnce(<K::Conn as Connection>::Handle) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut scope = ConnectionScope::open(connector).await?;
    let outcome = AssertUnwindSafe(scope.operate(op)).catch_unwind().await;
    let released = scope.close().await;

    match outcome {
        Ok(Ok(value)) => released.map(|()| value),
        Ok(Err(err)) => {
            if let Err(close_err) = released {
                error!(error = %close_err, "failed to release connection after operation error");
            }
            Err(err)
        }
        Err(panic) => {
            if let Err(close_err) = released {
                error!(error = %close_err, "failed to release connection after panic");
            }
            std::panic::resume_unwind(panic)
        }
    }
}

/// Connector backed by the MongoDB driver.
///
/// Acquisition constructs the client and pings the deployment, bounded by an
/// optional wall-clock deadline.
#[derive(Debug, Clone)]
pub struct DriverConnector {
    options: ClientOptions,
    deadline: Option<Duration>,
}

impl DriverConnector {
    pub fn new(options: ClientOptions) -> Self {
        DriverConnector {
            options,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }
}

#[async_trait]
impl Connector for DriverConnector {
    type Conn = Client;

    async fn connect(&self) -> Result<Client> {
        let client = Client::with_options(self.options.clone()).map_err(SnippetError::Connect)?;
        let admin = client.database("admin");
        let ping = admin.run_command(doc! { "ping": 1 }).into_future();

        let outcome = match self.deadline {
            Some(limit) => match tokio::time::timeout(limit, ping).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    client.shutdown().await;
                    return Err(SnippetError::Timeout(format!(
                        "deployment did not respond within {:?}",
                        limit
                    )));
                }
            },
            None => ping.await,
        };

        if let Err(e) = outcome {
            client.shutdown().await;
            return Err(SnippetError::Connect(e));
        }

        debug!(hosts = ?self.options.hosts, "connected to deployment");
        Ok(client)
    }
}

#[async_trait]
impl Connection for Client {
    type Handle = Client;

    fn handle(&self) -> Client {
        self.clone()
    }

    async fn close(self) -> Result<()> {
        self.shutdown().await;
        debug!("client shut down");
        Ok(())
    }
}
