/// Find Snippet Module
///
/// Point lookups on `sample_mflix.movies`.

use super::SnippetContext;
use crate::core::db::with_connection;
use crate::core::{Lookup, Result};
use crate::output::pretty_json;
use mongodb::bson::{doc, Document};
use mongodb::Collection;
use std::time::Duration;
use tracing::debug;

pub const DATABASE: &str = "sample_mflix";
pub const COLLECTION: &str = "movies";

/// Connect deadline for the quick start when none is configured.
pub const QUICK_START_DEADLINE: Duration = Duration::from_secs(20);

/// Highest-rated movie titled `title`, projected to `title` and `imdb`.
pub async fn find_one_projected(coll: &Collection<Document>, title: &str) -> Result<Lookup<Document>> {
    let found = coll
        .find_one(doc! { "title": title })
        .projection(doc! { "_id": 0, "title": 1, "imdb": 1 })
        .sort(doc! { "rating": -1 })
        .await?;
    Ok(found.into())
}

pub async fn find_by_title(coll: &Collection<Document>, title: &str) -> Result<Lookup<Document>> {
    Ok(coll.find_one(doc! { "title": title }).await?.into())
}

pub async fn run_find_one(ctx: &SnippetContext) -> Result<()> {
    let connector = ctx.connector().await?;
    let found = with_connection(&connector, |client| async move {
        let coll = client.database(DATABASE).collection::<Document>(COLLECTION);
        find_one_projected(&coll, "The Room").await
    })
    .await?;

    match found {
        Lookup::Found(doc) => println!("{}", pretty_json(&doc)?),
        Lookup::NoMatch => debug!("no movie matched the filter"),
    }
    Ok(())
}

pub async fn run_quick_start(ctx: &SnippetContext) -> Result<()> {
    let deadline = ctx
        .config
        .connection
        .connect_deadline()
        .unwrap_or(QUICK_START_DEADLINE);
    let connector = ctx.connector().await?.with_deadline(Some(deadline));

    let title = "Back to the Future";
    let found = with_connection(&connector, |client| async move {
        let coll = client.database(DATABASE).collection::<Document>(COLLECTION);
        find_by_title(&coll, title).await
    })
    .await?;

    match found {
        Lookup::Found(doc) => println!("{}", pretty_json(&doc)?),
        Lookup::NoMatch => println!("No document was found with the title {}", title),
    }
    Ok(())
}
