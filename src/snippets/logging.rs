/// Logging Snippet Module
///
/// Driver logging on `testDB.testColl`.
///
/// Each snippet runs its operations under a scoped subscriber so the driver's
/// `mongodb::command` and `mongodb::connection` events are routed for that
/// run only. Events emitted by background driver tasks that were spawned
/// outside the scope are not captured.

use super::SnippetContext;
use crate::config::Config;
use crate::core::db::with_connection;
use crate::core::Result;
use crate::logging::{capture_subscriber, filter_directives, filter_from_directives, stderr_subscriber, LogBuffer};
use mongodb::bson::{doc, Bson, Document};
use mongodb::Collection;
use tracing::instrument::WithSubscriber;
use tracing_subscriber::EnvFilter;

pub const DATABASE: &str = "testDB";
pub const COLLECTION: &str = "testColl";

/// Write counts from [`log_operations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationCounts {
    pub inserted: usize,
    pub deleted: u64,
    pub modified: u64,
}

/// Copy of `base` with the given driver components at debug and an optional
/// document truncation length.
pub fn debug_components(base: &Config, components: &[&str], max_document_length: Option<usize>) -> Config {
    let mut config = base.clone();
    for component in components {
        config
            .logging
            .components
            .insert(component.to_string(), "debug".to_string());
    }
    if max_document_length.is_some() {
        config.logging.max_document_length = max_document_length;
    }
    config
}

fn component_filter(config: &Config) -> Result<EnvFilter> {
    filter_from_directives(&filter_directives(&config.logging, None)?)
}

pub async fn insert_item(coll: &Collection<Document>, item: &str) -> Result<Bson> {
    Ok(coll.insert_one(doc! { "item": item }).await?.inserted_id)
}

/// Inserts three fruits, deletes one and updates another.
pub async fn log_operations(coll: &Collection<Document>) -> Result<OperationCounts> {
    let docs = ["starfruit", "kiwi", "cantaloupe"].map(|item| doc! { "item": item });
    let inserted = coll.insert_many(docs).await?.inserted_ids.len();
    let deleted = coll.delete_one(doc! { "item": "kiwi" }).await?.deleted_count;
    let modified = coll
        .update_one(doc! { "item": "cantaloupe" }, doc! { "$set": { "qty": 3 } })
        .await?
        .modified_count;
    Ok(OperationCounts {
        inserted,
        deleted,
        modified,
    })
}

/// Command events at debug on stderr, documents truncated to 25 bytes.
pub async fn run_standard(ctx: &SnippetContext) -> Result<()> {
    let config = debug_components(&ctx.config, &["command"], Some(25));
    let subscriber = stderr_subscriber(component_filter(&config)?);
    let scoped = SnippetContext::new(config, ctx.uri.clone());

    async {
        let connector = scoped.connector().await?;
        with_connection(&connector, |client| async move {
            let coll = client.database(DATABASE).collection::<Document>(COLLECTION);
            insert_item(&coll, "grapefruit").await
        })
        .await
    }
    .with_subscriber(subscriber)
    .await?;
    Ok(())
}

/// Command and connection events captured in memory, then printed.
pub async fn run_custom(ctx: &SnippetContext) -> Result<()> {
    let config = debug_components(&ctx.config, &["command", "connection"], None);
    let buffer = LogBuffer::new();
    let subscriber = capture_subscriber(component_filter(&config)?, buffer.clone());
    let scoped = SnippetContext::new(config, ctx.uri.clone());

    async {
        let connector = scoped.connector().await?;
        with_connection(&connector, |client| async move {
            let coll = client.database(DATABASE).collection::<Document>(COLLECTION);
            insert_item(&coll, "grapefruit").await
        })
        .await
    }
    .with_subscriber(subscriber)
    .await?;

    println!("{}", buffer.contents());
    Ok(())
}

pub async fn run_log_operations(ctx: &SnippetContext) -> Result<()> {
    let config = debug_components(&ctx.config, &["command"], None);
    let subscriber = stderr_subscriber(component_filter(&config)?);
    let scoped = SnippetContext::new(config, ctx.uri.clone());

    let counts = async {
        let connector = scoped.connector().await?;
        with_connection(&connector, |client| async move {
            let coll = client.database(DATABASE).collection::<Document>(COLLECTION);
            log_operations(&coll).await
        })
        .await
    }
    .with_subscriber(subscriber)
    .await?;

    println!(
        "Inserted: {}, deleted: {}, modified: {}",
        counts.inserted, counts.deleted, counts.modified
    );
    Ok(())
}
