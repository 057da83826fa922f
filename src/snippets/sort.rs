/// Sort Snippet Module
///
/// Sorted finds and a `$sort` stage on `db.courses`.

use super::{inserted_message, reseed, SnippetContext};
use crate::core::db::with_connection;
use crate::core::Result;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::Collection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub enrollment: i32,
}

impl Course {
    pub fn new(title: &str, enrollment: i32) -> Self {
        Course {
            title: title.to_string(),
            enrollment,
        }
    }
}

pub fn courses() -> Vec<Course> {
    vec![
        Course::new("World Fiction", 35),
        Course::new("Abstract Algebra", 60),
        Course::new("Modern Poetry", 12),
        Course::new("Plate Tectonics", 35),
    ]
}

/// Every course ordered by `sort`.
pub async fn sorted(coll: &Collection<Course>, sort: Document) -> Result<Vec<Course>> {
    Ok(coll.find(doc! {}).sort(sort).await?.try_collect().await?)
}

/// Same ordering through an aggregation `$sort` stage.
pub async fn sorted_by_pipeline(coll: &Collection<Course>, sort: Document) -> Result<Vec<Course>> {
    let pipeline = vec![doc! { "$sort": sort }, doc! { "$project": { "_id": 0 } }];
    let cursor = coll.aggregate(pipeline).with_type::<Course>().await?;
    Ok(cursor.try_collect().await?)
}

fn print_section(heading: &str, courses: &[Course]) -> Result<()> {
    println!("{}", heading);
    for course in courses {
        println!("{}", serde_json::to_string(course)?);
    }
    Ok(())
}

pub async fn run(ctx: &SnippetContext) -> Result<()> {
    let connector = ctx.connector().await?;
    let sections = with_connection(&connector, |client| async move {
        let coll = client.database("db").collection::<Course>("courses");
        let inserted = reseed(&coll, &courses()).await?;
        println!("{}", inserted_message(inserted));

        Ok(vec![
            ("Ascending Sort:", sorted(&coll, doc! { "enrollment": 1 }).await?),
            ("Descending Sort:", sorted(&coll, doc! { "enrollment": -1 }).await?),
            ("Multi Sort:", sorted(&coll, doc! { "enrollment": -1, "title": 1 }).await?),
            (
                "Aggregation Sort:",
                sorted_by_pipeline(&coll, doc! { "enrollment": -1, "title": 1 }).await?,
            ),
        ])
    })
    .await?;

    for (heading, courses) in &sections {
        print_section(heading, courses)?;
    }
    Ok(())
}
