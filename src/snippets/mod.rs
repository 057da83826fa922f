/// Snippets Module
///
/// The catalogue of runnable examples. Each submodule exposes data-returning
/// operations over a collection or database (usable against any deployment)
/// and thin `run_*` entry points that open a connection through
/// [`with_connection`](crate::core::db::with_connection), print the outcome and
/// release the connection.
pub mod aggregation;
pub mod compound;
pub mod connect;
pub mod count;
pub mod delete;
pub mod find;
pub mod insert;
pub mod logging;
pub mod projection;
pub mod run_command;
pub mod search_indexes;
pub mod sort;
pub mod transaction;
pub mod update;

use crate::config::{redact_uri, Config};
use crate::core::db::options;
use crate::core::db::DriverConnector;
use crate::core::Result;
use crate::output::DocumentGrid;
use clap::ValueEnum;
use mongodb::bson::{doc, Bson};
use mongodb::Collection;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Everything a snippet needs to connect.
#[derive(Debug, Clone)]
pub struct SnippetContext {
    pub config: Config,
    pub uri: String,
}

impl SnippetContext {
    pub fn new(config: Config, uri: String) -> Self {
        SnippetContext { config, uri }
    }

    /// Connector built from this context's configuration and connection string.
    pub async fn connector(&self) -> Result<DriverConnector> {
        options::connector(&self.config, &self.uri).await
    }
}

/// Orders `inserted_ids` by insertion index.
pub(crate) fn ordered_ids(inserted_ids: HashMap<usize, Bson>) -> Vec<Bson> {
    let mut ids: Vec<(usize, Bson)> = inserted_ids.into_iter().collect();
    ids.sort_by_key(|(index, _)| *index);
    ids.into_iter().map(|(_, id)| id).collect()
}

/// Drops `coll` and inserts `records`, so reruns start from the same data.
/// Returns the number of records inserted.
pub async fn reseed<T>(coll: &Collection<T>, records: &[T]) -> Result<usize>
where
    T: Serialize + Send + Sync,
{
    coll.drop().await?;
    let result = coll.insert_many(records).await?;
    Ok(result.inserted_ids.len())
}

/// Line printed after a collection has been reseeded.
pub fn inserted_message(count: usize) -> String {
    format!("Number of documents inserted: {}", count)
}

/// Every runnable snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Snippet {
    FindOne,
    QuickStart,
    InsertMany,
    StructTags,
    UpdateOne,
    UpdateMany,
    ReplaceOne,
    ReplaceRestaurant,
    DeleteOne,
    DeleteRestaurant,
    DeleteMany,
    Count,
    Aggregation,
    Sort,
    Projection,
    Compound,
    RunCommand,
    Transaction,
    Session,
    SearchIndexes,
    Logging,
    CustomLogging,
    LogOperations,
    Tls,
    ClusterSettings,
    ClusterSettingsUri,
    ConnectionPool,
    ConnectionPoolUri,
    Oidc,
}

impl Snippet {
    /// Command-line name, e.g. `find-one`.
    pub fn name(&self) -> String {
        self.to_possible_value()
            .map(|value| value.get_name().to_string())
            .unwrap_or_default()
    }

    /// Operation kind the snippet demonstrates.
    pub fn kind(&self) -> &'static str {
        use Snippet::*;
        match self {
            FindOne | QuickStart => "point lookup",
            InsertMany => "bulk insert",
            StructTags => "bulk insert + find",
            UpdateOne => "point update",
            UpdateMany => "bulk update",
            ReplaceOne | ReplaceRestaurant => "point replace",
            DeleteOne | DeleteRestaurant => "point delete",
            DeleteMany => "bulk delete",
            Count => "count",
            Aggregation => "aggregation pipeline",
            Sort => "find with sort",
            Projection => "find with projection",
            Compound => "find-and-modify",
            RunCommand => "raw cursor command",
            Transaction => "multi-statement transaction",
            Session => "single-statement transaction",
            SearchIndexes => "index lifecycle",
            Logging => "insert under logging",
            CustomLogging => "insert under capture",
            LogOperations => "mixed writes",
            Tls | ClusterSettings | ClusterSettingsUri | ConnectionPool | ConnectionPoolUri | Oidc => {
                "connect only"
            }
        }
    }

    pub fn description(&self) -> &'static str {
        use Snippet::*;
        match self {
            FindOne => "Find \"The Room\" with a projection, sorted by rating",
            QuickStart => "Find \"Back to the Future\" and print it as JSON",
            InsertMany => "Insert two haikus and print their ids",
            StructTags => "Insert blog posts whose empty fields are omitted",
            UpdateOne => "Set avg_rating on one restaurant by _id",
            UpdateMany => "Set avg_rating on Brooklyn pizza restaurants",
            ReplaceOne => "Replace the Shrek movie document",
            ReplaceRestaurant => "Replace Rizzo's Fine Pizza",
            DeleteOne => "Delete the movie \"Twilight\"",
            DeleteRestaurant => "Delete the restaurant \"New Corner\"",
            DeleteMany => "Delete movies longer than 800 minutes",
            Count => "Estimated count and count of movies from China",
            Aggregation => "Average tea ratings and top visits",
            Sort => "Sort courses by enrollment and title",
            Projection => "Include and exclude tea fields",
            Compound => "Find-one-and-delete/replace/update on teas",
            RunCommand => "listCollections as a cursor command",
            Transaction => "Insert three books in one transaction",
            Session => "Insert one book in a transaction",
            SearchIndexes => "Create, poll, list, update and drop search indexes",
            Logging => "Log driver commands to stderr",
            CustomLogging => "Capture driver events in memory",
            LogOperations => "Insert, delete and update with command logging",
            Tls => "Connect with a CA file and client certificate",
            ClusterSettings => "Server selection timeout and local threshold via options",
            ClusterSettingsUri => "Server selection timeout and local threshold via the URI",
            ConnectionPool => "Pool bounds and idle time via options",
            ConnectionPoolUri => "Pool bounds and idle time via the URI",
            Oidc => "MONGODB-OIDC with a token file callback",
        }
    }

    pub async fn run(self, ctx: &SnippetContext) -> Result<()> {
        use Snippet::*;
        info!(snippet = %self.name(), uri = %redact_uri(&ctx.uri), "running snippet");
        match self {
            FindOne => find::run_find_one(ctx).await,
            QuickStart => find::run_quick_start(ctx).await,
            InsertMany => insert::run_insert_many(ctx).await,
            StructTags => insert::run_struct_tags(ctx).await,
            UpdateOne => update::run_update_one(ctx).await,
            UpdateMany => update::run_update_many(ctx).await,
            ReplaceOne => update::run_replace_one(ctx).await,
            ReplaceRestaurant => update::run_replace_restaurant(ctx).await,
            DeleteOne => delete::run_delete_one(ctx).await,
            DeleteRestaurant => delete::run_delete_restaurant(ctx).await,
            DeleteMany => delete::run_delete_many(ctx).await,
            Count => count::run(ctx).await,
            Aggregation => aggregation::run(ctx).await,
            Sort => sort::run(ctx).await,
            Projection => projection::run(ctx).await,
            Compound => compound::run(ctx).await,
            RunCommand => run_command::run(ctx).await,
            Transaction => transaction::run_transaction(ctx).await,
            Session => transaction::run_session(ctx).await,
            SearchIndexes => search_indexes::run(ctx).await,
            Logging => logging::run_standard(ctx).await,
            CustomLogging => logging::run_custom(ctx).await,
            LogOperations => logging::run_log_operations(ctx).await,
            Tls => connect::run_tls(ctx).await,
            ClusterSettings => connect::run_cluster_settings(ctx).await,
            ClusterSettingsUri => connect::run_cluster_settings_uri(ctx).await,
            ConnectionPool => connect::run_connection_pool(ctx).await,
            ConnectionPoolUri => connect::run_connection_pool_uri(ctx).await,
            Oidc => connect::run_oidc(ctx).await,
        }
    }
}

/// The catalogue as a grid of `name`, `kind` and `description`.
pub fn catalogue() -> DocumentGrid {
    DocumentGrid::from_documents(Snippet::value_variants().iter().map(|snippet| {
        doc! {
            "name": snippet.name(),
            "kind": snippet.kind(),
            "description": snippet.description(),
        }
    }))
}
