/// Database Module
///
/// This module provides the lifecycle helpers every snippet uses to talk to
/// the driver.
///
/// ## Architecture
///
/// - **Connection Lifecycle** (`connection.rs`): acquire, scoped operation, guaranteed release
/// - **Client Options** (`options.rs`): translate the configuration into driver options
/// - **Transactions** (`transaction.rs`): start/commit with abort on failure
/// - **Search Indexes** (`search_index.rs`): create/list/update/drop and readiness polling
///
/// ## Error Handling
///
/// All operations use the standardized `SnippetError` type; an empty lookup is
/// a `Lookup::NoMatch` value rather than an error.
pub mod connection;
pub mod options;
pub mod search_index;
pub mod transaction;

pub use connection::*;
pub use search_index::{wait_until_queryable, PollPolicy, SearchIndexCatalog, SearchIndexStatus};
pub use transaction::{run_in_transaction, Transaction, TransactionState, TransactionalSession};
