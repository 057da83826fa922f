/// Compound Operations Snippet Module
///
/// Find-and-modify operations on `tea.ratings`.

use super::projection::{teas, COLLECTION, DATABASE};
use super::{inserted_message, reseed, SnippetContext};
use crate::core::db::with_connection;
use crate::core::{Lookup, Result};
use crate::output::pretty_json;
use mongodb::bson::{doc, Document};
use mongodb::options::ReturnDocument;
use mongodb::Collection;

/// Deletes the first match and returns it.
pub async fn find_and_delete(coll: &Collection<Document>, filter: Document) -> Result<Lookup<Document>> {
    Ok(coll.find_one_and_delete(filter).await?.into())
}

/// Replaces the first match and returns the replacement as stored.
pub async fn find_and_replace(
    coll: &Collection<Document>,
    filter: Document,
    replacement: Document,
) -> Result<Lookup<Document>> {
    Ok(coll
        .find_one_and_replace(filter, replacement)
        .return_document(ReturnDocument::After)
        .await?
        .into())
}

/// Applies `update` to the first match and returns the updated document.
pub async fn find_and_update(
    coll: &Collection<Document>,
    filter: Document,
    update: Document,
) -> Result<Lookup<Document>> {
    Ok(coll
        .find_one_and_update(filter, update)
        .return_document(ReturnDocument::After)
        .await?
        .into())
}

fn print_outcome(heading: &str, outcome: Lookup<Document>) -> Result<()> {
    println!("{}", heading);
    match outcome {
        Lookup::Found(doc) => println!("{}", pretty_json(&doc)?),
        Lookup::NoMatch => println!("No document matched the filter"),
    }
    Ok(())
}

pub async fn run(ctx: &SnippetContext) -> Result<()> {
    let connector = ctx.connector().await?;
    let (deleted, replaced, updated) = with_connection(&connector, |client| async move {
        let coll = client.database(DATABASE).collection::<Document>(COLLECTION);
        let inserted = reseed(&coll, &teas()).await?;
        println!("{}", inserted_message(inserted));

        let deleted = find_and_delete(&coll, doc! { "type": "Assam" }).await?;
        let replaced = find_and_replace(
            &coll,
            doc! { "type": "English Breakfast" },
            doc! { "type": "Ceylon", "rating": 6 },
        )
        .await?;
        let updated = find_and_update(
            &coll,
            doc! { "type": "Oolong" },
            doc! { "$set": { "rating": 9 } },
        )
        .await?;
        Ok((deleted, replaced, updated))
    })
    .await?;

    print_outcome("FindOneAndDelete:", deleted)?;
    print_outcome("FindOneAndReplace:", replaced)?;
    print_outcome("FindOneAndUpdate:", updated)?;
    Ok(())
}
