/// Count Snippet Module
///
/// Estimated and filtered document counts on `sample_mflix.movies`.

use super::SnippetContext;
use crate::core::db::with_connection;
use crate::core::Result;
use mongodb::bson::{doc, Document};
use mongodb::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    /// From collection metadata
    pub estimated: u64,
    /// Exact count of documents matching the filter
    pub matching: u64,
}

pub async fn count_movies(coll: &Collection<Document>, filter: Document) -> Result<Counts> {
    let estimated = coll.estimated_document_count().await?;
    let matching = coll.count_documents(filter).await?;
    Ok(Counts { estimated, matching })
}

pub async fn run(ctx: &SnippetContext) -> Result<()> {
    let connector = ctx.connector().await?;
    let counts = with_connection(&connector, |client| async move {
        let coll = client.database("sample_mflix").collection::<Document>("movies");
        count_movies(&coll, doc! { "countries": "China" }).await
    })
    .await?;

    println!(
        "Estimated number of documents in the movies collection: {}",
        counts.estimated
    );
    println!("Number of movies from China: {}", counts.matching);
    Ok(())
}
