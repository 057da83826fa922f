/// Projection Snippet Module
///
/// Field inclusion and exclusion on `tea.ratings`.

use super::{inserted_message, reseed, SnippetContext};
use crate::core::db::with_connection;
use crate::core::Result;
use crate::output::DocumentGrid;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::Collection;

pub const DATABASE: &str = "tea";
pub const COLLECTION: &str = "ratings";

/// Five teas with a rating each.
pub fn teas() -> Vec<Document> {
    [
        ("Masala", 10),
        ("Assam", 5),
        ("Oolong", 7),
        ("Earl Grey", 8),
        ("English Breakfast", 5),
    ]
    .into_iter()
    .map(|(tea, rating)| doc! { "type": tea, "rating": rating })
    .collect()
}

/// Every document with `projection` applied.
pub async fn project(coll: &Collection<Document>, projection: Document) -> Result<Vec<Document>> {
    Ok(coll
        .find(doc! {})
        .projection(projection)
        .await?
        .try_collect()
        .await?)
}

/// Same as [`project`] through a `$project` stage.
pub async fn project_by_pipeline(coll: &Collection<Document>, projection: Document) -> Result<Vec<Document>> {
    Ok(coll
        .aggregate(vec![doc! { "$project": projection }])
        .await?
        .try_collect()
        .await?)
}

pub async fn run(ctx: &SnippetContext) -> Result<()> {
    let connector = ctx.connector().await?;
    let (excluded, included, aggregated) = with_connection(&connector, |client| async move {
        let coll = client.database(DATABASE).collection::<Document>(COLLECTION);
        let inserted = reseed(&coll, &teas()).await?;
        println!("{}", inserted_message(inserted));

        let excluded = project(&coll, doc! { "rating": 0 }).await?;
        let included = project(&coll, doc! { "type": 1, "rating": 1, "_id": 0 }).await?;
        let aggregated = project_by_pipeline(&coll, doc! { "type": 1, "rating": 1, "_id": 0 }).await?;
        Ok((excluded, included, aggregated))
    })
    .await?;

    println!("Exclude Projection:");
    print!("{}", DocumentGrid::from_documents(excluded).render());
    println!("Include Projection:");
    print!("{}", DocumentGrid::from_documents(included).render());
    println!("Aggregation Projection:");
    print!("{}", DocumentGrid::from_documents(aggregated).render());
    Ok(())
}
