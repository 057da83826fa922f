/// Run Command Snippet Module
///
/// Raw cursor command against the `plants` database.

use super::SnippetContext;
use crate::core::db::with_connection;
use crate::core::Result;
use crate::output::pretty_json;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::Database;

/// `listCollections` restricted to writable collections.
pub fn list_writable_collections() -> Document {
    doc! {
        "listCollections": 1,
        "filter": { "info.readOnly": false },
    }
}

/// Runs `command` and drains the cursor it returns.
pub async fn run_cursor(db: &Database, command: Document) -> Result<Vec<Document>> {
    Ok(db.run_cursor_command(command).await?.try_collect().await?)
}

pub async fn run(ctx: &SnippetContext) -> Result<()> {
    let connector = ctx.connector().await?;
    let collections = with_connection(&connector, |client| async move {
        let db = client.database("plants");
        run_cursor(&db, list_writable_collections()).await
    })
    .await?;

    for info in &collections {
        println!("{}", pretty_json(info)?);
    }
    Ok(())
}
