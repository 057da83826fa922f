/// Aggregation Snippet Module
///
/// Aggregation pipelines over `tea.ratings`.

use super::{inserted_message, reseed, SnippetContext};
use crate::core::db::with_connection;
use crate::core::Result;
use crate::output::DocumentGrid;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::Collection;
use serde::Deserialize;

/// Average rating and number of ratings for one tea type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypeAverage {
    #[serde(rename = "_id")]
    pub tea: String,
    pub average: f64,
    pub count: i32,
}

/// 19 ratings with visit counts.
pub fn tea_ratings() -> Vec<Document> {
    [
        ("Masala", 10, 24),
        ("Earl Grey", 5, 7),
        ("Masala", 7, 10),
        ("Earl Grey", 9, 12),
        ("Earl Grey", 5, 4),
        ("Masala", 9, 18),
        ("Earl Grey", 8, 15),
        ("Masala", 9, 14),
        ("Masala", 10, 24),
        ("Earl Grey", 10, 19),
        ("Masala", 7, 13),
        ("Masala", 5, 8),
        ("Masala", 9, 21),
        ("Earl Grey", 10, 17),
        ("Earl Grey", 5, 5),
        ("Masala", 9, 19),
        ("Earl Grey", 7, 14),
        ("Masala", 8, 17),
        ("Masala", 9, 20),
    ]
    .into_iter()
    .map(|(tea, rating, visits)| doc! { "type": tea, "rating": rating, "visits": visits })
    .collect()
}

pub fn average_pipeline() -> Vec<Document> {
    vec![doc! {
        "$group": {
            "_id": "$type",
            "average": { "$avg": "$rating" },
            "count": { "$sum": 1 },
        }
    }]
}

/// Ratings above 8, without `_id` and `rating`, most visits first, top five.
pub fn top_visits_pipeline() -> Vec<Document> {
    vec![
        doc! { "$match": { "rating": { "$gt": 8 } } },
        doc! { "$unset": ["_id", "rating"] },
        doc! { "$sort": { "visits": -1, "type": 1 } },
        doc! { "$limit": 5 },
    ]
}

/// Averages per tea type, ordered by type name.
pub async fn average_by_type(coll: &Collection<Document>) -> Result<Vec<TypeAverage>> {
    let docs: Vec<Document> = coll.aggregate(average_pipeline()).await?.try_collect().await?;
    let mut averages = docs
        .into_iter()
        .map(bson::from_document::<TypeAverage>)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    averages.sort_by(|a, b| a.tea.cmp(&b.tea));
    Ok(averages)
}

pub async fn top_visits(coll: &Collection<Document>) -> Result<Vec<Document>> {
    Ok(coll.aggregate(top_visits_pipeline()).await?.try_collect().await?)
}

pub async fn run(ctx: &SnippetContext) -> Result<()> {
    let connector = ctx.connector().await?;
    let (inserted, averages, top) = with_connection(&connector, |client| async move {
        let coll = client.database("tea").collection::<Document>("ratings");
        let inserted = reseed(&coll, &tea_ratings()).await?;
        let averages = average_by_type(&coll).await?;
        let top = top_visits(&coll).await?;
        Ok((inserted, averages, top))
    })
    .await?;

    println!("{}", inserted_message(inserted));
    println!("Average:");
    for avg in &averages {
        println!("{} has an average rating of {}", avg.tea, avg.average);
        println!("{} Count: {}", avg.tea, avg.count);
    }
    println!("Unset:");
    print!("{}", DocumentGrid::from_documents(top).render());
    Ok(())
}
