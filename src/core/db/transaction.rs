/// Transaction Runner Module
///
/// Wraps a bounded sequence of operations in start/commit. Any failure inside
/// the unit aborts the transaction before the original error is returned, so a
/// failed unit leaves no visible writes behind.
///
/// `Started -> Committed` and `Started -> Aborted` are the successful
/// transitions; a commit or abort the server rejects ends in `Failed`. All of
/// them consume the [`Transaction`], so a committed transaction can never be
/// aborted and vice versa.

use crate::core::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use mongodb::options::TransactionOptions;
use mongodb::{Client, ClientSession};
use tracing::{debug, error, warn};

/// Represents the transaction states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Started,
    Committed,
    Aborted,
    /// Commit or abort returned an error
    Failed,
}

/// A session able to run one transaction at a time.
#[async_trait]
pub trait TransactionalSession: Send {
    async fn start(&mut self) -> Result<()>;
    async fn commit(&mut self) -> Result<()>;
    async fn abort(&mut self) -> Result<()>;
}

/// An open transaction on a borrowed session.
pub struct Transaction<'s, S: TransactionalSession> {
    session: &'s mut S,
    state: TransactionState,
}

impl<'s, S: TransactionalSession> Transaction<'s, S> {
    /// Starts a transaction on `session`.
    pub async fn begin(session: &'s mut S) -> Result<Self> {
        session.start().await?;
        debug!("transaction started");
        Ok(Transaction {
            session,
            state: TransactionState::Started,
        })
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Session to issue the transaction's operations on.
    pub fn session(&mut self) -> &mut S {
        self.session
    }

    pub async fn commit(mut self) -> Result<TransactionState> {
        if let Err(e) = self.session.commit().await {
            self.state = TransactionState::Failed;
            return Err(e);
        }
        self.state = TransactionState::Committed;
        debug!("transaction committed");
        Ok(self.state)
    }

    pub async fn abort(mut self) -> Result<TransactionState> {
        if let Err(e) = self.session.abort().await {
            self.state = TransactionState::Failed;
            return Err(e);
        }
        self.state = TransactionState::Aborted;
        debug!("transaction aborted");
        Ok(self.state)
    }
}

impl<'s, S: TransactionalSession> Drop for Transaction<'s, S> {
    fn drop(&mut self) {
        if self.state == TransactionState::Started {
            warn!("transaction dropped while still open");
        }
    }
}

/// Runs `op` inside a transaction on `session`.
///
/// Success commits. Failure aborts and returns the operation's error; an
/// abort failure is logged but does not replace it. A failed commit is
/// returned as-is with no abort attempt.
pub async fn run_in_transaction<S, F, T>(session: &mut S, op: F) -> Result<T>
where
    S: TransactionalSession,
    F: for<'a> FnOnce(&'a mut S) -> BoxFuture<'a, Result<T>>,
{
    let mut txn = Transaction::begin(session).await?;
    match op(txn.session()).await {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(abort_err) = txn.abort().await {
                error!(error = %abort_err, "failed to abort transaction");
            }
            Err(err)
        }
    }
}

/// Driver session running transactions with fixed options.
pub struct DriverSession {
    session: ClientSession,
    options: TransactionOptions,
}

impl DriverSession {
    pub async fn open(client: &Client, options: TransactionOptions) -> Result<Self> {
        let session = client.start_session().await?;
        Ok(DriverSession { session, options })
    }

    /// The underlying session, passed to operations via `.session(..)`.
    pub fn client_session(&mut self) -> &mut ClientSession {
        &mut self.session
    }
}

#[async_trait]
impl TransactionalSession for DriverSession {
    async fn start(&mut self) -> Result<()> {
        self.session
            .start_transaction()
            .with_options(self.options.clone())
            .await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.session.commit_transaction().await?;
        Ok(())
    }

    async fn abort(&mut self) -> Result<()> {
        self.session.abort_transaction().await?;
        Ok(())
    }
}
