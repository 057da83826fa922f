/// Delete Snippet Module
///
/// Point and bulk deletes.

use super::SnippetContext;
use crate::core::db::with_connection;
use crate::core::Result;
use mongodb::bson::{doc, Document};
use mongodb::Collection;

/// Deletes the first document matching `filter`. Returns the deleted count.
pub async fn delete_first(coll: &Collection<Document>, filter: Document) -> Result<u64> {
    Ok(coll.delete_one(filter).await?.deleted_count)
}

/// Deletes every document matching `filter`. Returns the deleted count.
pub async fn delete_matching(coll: &Collection<Document>, filter: Document) -> Result<u64> {
    Ok(coll.delete_many(filter).await?.deleted_count)
}

/// Filter for movies longer than `minutes`.
pub fn runtime_over(minutes: i32) -> Document {
    doc! { "runtime": { "$gt": minutes } }
}

pub async fn run_delete_one(ctx: &SnippetContext) -> Result<()> {
    let connector = ctx.connector().await?;
    let deleted = with_connection(&connector, |client| async move {
        let coll = client.database("sample_mflix").collection::<Document>("movies");
        delete_first(&coll, doc! { "title": "Twilight" }).await
    })
    .await?;

    println!("Number of documents deleted: {}", deleted);
    Ok(())
}

pub async fn run_delete_restaurant(ctx: &SnippetContext) -> Result<()> {
    let connector = ctx.connector().await?;
    let deleted = with_connection(&connector, |client| async move {
        let coll = client
            .database("sample_restaurants")
            .collection::<Document>("restaurants");
        delete_first(&coll, doc! { "name": "New Corner" }).await
    })
    .await?;

    println!("Documents deleted: {}", deleted);
    Ok(())
}

pub async fn run_delete_many(ctx: &SnippetContext) -> Result<()> {
    let connector = ctx.connector().await?;
    let deleted = with_connection(&connector, |client| async move {
        let coll = client.database("sample_mflix").collection::<Document>("movies");
        delete_matching(&coll, runtime_over(800)).await
    })
    .await?;

    println!("Documents deleted: {}", deleted);
    Ok(())
}
