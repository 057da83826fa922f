/// Update Snippet Module
///
/// Updates and replacements on restaurants and movies.

use super::SnippetContext;
use crate::core::db::with_connection;
use crate::core::Result;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, doc, Document};
use mongodb::results::UpdateResult;
use mongodb::Collection;
use serde::Serialize;

pub const RESTAURANTS_DB: &str = "sample_restaurants";
pub const RESTAURANTS: &str = "restaurants";

pub const UPDATE_ONE_ID: &str = "5eb3d668b31de5d588f4292b";

pub const SHREK_PLOT: &str = "After his swamp is filled with magical creatures, an ogre agrees to rescue a princess for a villainous lord in order to get his land back.";

#[derive(Debug, Serialize)]
struct IdFilter {
    #[serde(rename = "_id")]
    id: ObjectId,
}

#[derive(Debug, Serialize)]
struct CuisineBoroughFilter<'a> {
    cuisine: &'a str,
    borough: &'a str,
}

/// `$set` payload for the rating field.
#[derive(Debug, Serialize)]
pub struct RatingUpdate {
    pub avg_rating: f64,
}

/// Replacement restaurant body.
#[derive(Debug, Clone, Serialize)]
pub struct RestaurantReplacement {
    pub name: String,
    pub cuisine: String,
}

fn set(update: &impl Serialize) -> Result<Document> {
    Ok(doc! { "$set": bson::to_document(update)? })
}

pub async fn set_rating_by_id(coll: &Collection<Document>, id: ObjectId, avg_rating: f64) -> Result<UpdateResult> {
    let filter = bson::to_document(&IdFilter { id })?;
    Ok(coll.update_one(filter, set(&RatingUpdate { avg_rating })?).await?)
}

pub async fn set_rating_by_cuisine(
    coll: &Collection<Document>,
    cuisine: &str,
    borough: &str,
    avg_rating: f64,
) -> Result<UpdateResult> {
    let filter = bson::to_document(&CuisineBoroughFilter { cuisine, borough })?;
    Ok(coll.update_many(filter, set(&RatingUpdate { avg_rating })?).await?)
}

pub async fn replace_by_title(coll: &Collection<Document>, title: &str, replacement: Document) -> Result<UpdateResult> {
    Ok(coll.replace_one(doc! { "title": title }, replacement).await?)
}

pub async fn replace_restaurant(
    coll: &Collection<Document>,
    name: &str,
    replacement: &RestaurantReplacement,
) -> Result<UpdateResult> {
    Ok(coll
        .replace_one(doc! { "name": name }, bson::to_document(replacement)?)
        .await?)
}

pub async fn run_update_one(ctx: &SnippetContext) -> Result<()> {
    let id = ObjectId::parse_str(UPDATE_ONE_ID)?;
    let connector = ctx.connector().await?;
    let result = with_connection(&connector, |client| async move {
        let coll = client.database(RESTAURANTS_DB).collection::<Document>(RESTAURANTS);
        set_rating_by_id(&coll, id, 4.4).await
    })
    .await?;

    println!("Documents updated: {}", result.modified_count);
    Ok(())
}

pub async fn run_update_many(ctx: &SnippetContext) -> Result<()> {
    let connector = ctx.connector().await?;
    let result = with_connection(&connector, |client| async move {
        let coll = client.database(RESTAURANTS_DB).collection::<Document>(RESTAURANTS);
        set_rating_by_cuisine(&coll, "Pizza", "Brooklyn", 4.5).await
    })
    .await?;

    println!("Documents updated: {}", result.modified_count);
    Ok(())
}

pub async fn run_replace_one(ctx: &SnippetContext) -> Result<()> {
    let connector = ctx.connector().await?;
    let result = with_connection(&connector, |client| async move {
        let coll = client.database("sample_mflix").collection::<Document>("movies");
        replace_by_title(&coll, "Shrek", doc! { "title": "Shrek", "plot": SHREK_PLOT }).await
    })
    .await?;

    if result.matched_count != 0 {
        println!("Matched and replaced an existing document.");
    }
    Ok(())
}

pub async fn run_replace_restaurant(ctx: &SnippetContext) -> Result<()> {
    let replacement = RestaurantReplacement {
        name: "Rizzo's Pizza".to_string(),
        cuisine: "Pizza/American".to_string(),
    };
    let connector = ctx.connector().await?;
    let result = with_connection(&connector, |client| async move {
        let coll = client.database(RESTAURANTS_DB).collection::<Document>(RESTAURANTS);
        replace_restaurant(&coll, "Rizzo's Fine Pizza", &replacement).await
    })
    .await?;

    if result.matched_count != 0 {
        println!("Number of documents replaced: {}", result.modified_count);
    }
    Ok(())
}
