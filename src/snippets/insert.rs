/// Insert Snippet Module
///
/// Bulk inserts: haikus as plain records, blog posts with omitted empty fields.

use super::{ordered_ids, SnippetContext};
use crate::core::db::with_connection;
use crate::core::Result;
use crate::output::DocumentGrid;
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, Document};
use mongodb::Collection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Haiku {
    pub title: String,
    pub text: String,
}

/// Blog post whose zero-valued fields are left out of the stored document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub word_count: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}

pub fn haikus() -> Vec<Haiku> {
    vec![
        Haiku {
            title: "Record of a Shriveled Datum".to_string(),
            text: "No bytes, no problem. Just insert a document, in MongoDB".to_string(),
        },
        Haiku {
            title: "Showcasing a Blossoming Binary".to_string(),
            text: "Binary data, safely stored with GridFS. Bucket the data".to_string(),
        },
    ]
}

pub fn blog_posts() -> Vec<BlogPost> {
    vec![
        BlogPost {
            title: "Caring for your Monstera plant".to_string(),
            word_count: 478,
            tags: vec![
                "plant care".to_string(),
                "gardening".to_string(),
                "housekeeping".to_string(),
            ],
            ..Default::default()
        },
        BlogPost {
            title: "Annuals vs. Perennials?".to_string(),
            author: "Sam Lee".to_string(),
            word_count: 682,
            tags: vec!["flowering plants".to_string(), "gardening".to_string()],
            ..Default::default()
        },
    ]
}

/// Inserts `records` and returns their ids in insertion order.
pub async fn insert_all<T>(coll: &Collection<T>, records: &[T]) -> Result<Vec<Bson>>
where
    T: Serialize + Send + Sync,
{
    let result = coll.insert_many(records).await?;
    Ok(ordered_ids(result.inserted_ids))
}

pub async fn find_all(coll: &Collection<Document>) -> Result<Vec<Document>> {
    Ok(coll.find(doc! {}).await?.try_collect().await?)
}

pub async fn run_insert_many(ctx: &SnippetContext) -> Result<()> {
    let connector = ctx.connector().await?;
    let ids = with_connection(&connector, |client| async move {
        let coll = client.database("insertDB").collection::<Haiku>("haikus");
        insert_all(&coll, &haikus()).await
    })
    .await?;

    println!("{} documents inserted with IDs:", ids.len());
    for id in ids {
        println!("\t{}", id);
    }
    Ok(())
}

pub async fn run_struct_tags(ctx: &SnippetContext) -> Result<()> {
    let connector = ctx.connector().await?;
    let stored = with_connection(&connector, |client| async move {
        let coll = client.database("sample_training").collection::<BlogPost>("blogPosts");
        insert_all(&coll, &blog_posts()).await?;
        find_all(&coll.clone_with_type::<Document>()).await
    })
    .await?;

    print!("{}", DocumentGrid::from_documents(stored).render());
    Ok(())
}
