/// Transaction Snippet Module
///
/// Writes to `myDB.myColl` inside a single transaction.

use super::{ordered_ids, SnippetContext};
use crate::core::db::options::transaction_options;
use crate::core::db::transaction::DriverSession;
use crate::core::db::{run_in_transaction, with_connection};
use crate::core::Result;
use crate::output::cell_text;
use futures::FutureExt;
use mongodb::bson::Bson;
use mongodb::options::TransactionOptions;
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};

pub const DATABASE: &str = "myDB";
pub const COLLECTION: &str = "myColl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
}

impl Book {
    pub fn new(title: &str, author: &str) -> Self {
        Book {
            title: title.to_string(),
            author: author.to_string(),
        }
    }
}

pub fn morrison_books() -> Vec<Book> {
    ["The Bluest Eye", "Sula", "Song of Solomon"]
        .into_iter()
        .map(|title| Book::new(title, "Toni Morrison"))
        .collect()
}

/// Inserts `books` in one transaction. Returns their ids in insertion order.
///
/// Nothing is visible in `coll` unless every insert succeeds and the commit
/// is acknowledged.
pub async fn insert_books_in_transaction(
    client: &Client,
    coll: Collection<Book>,
    books: Vec<Book>,
    options: TransactionOptions,
) -> Result<Vec<Bson>> {
    let mut session = DriverSession::open(client, options).await?;
    run_in_transaction(&mut session, move |session: &mut DriverSession| {
        async move {
            let result = coll
                .insert_many(&books)
                .session(session.client_session())
                .await?;
            Ok(ordered_ids(result.inserted_ids))
        }
        .boxed()
    })
    .await
}

/// Inserts a single `book` in a transaction and returns its id.
pub async fn insert_book_in_transaction(
    client: &Client,
    coll: Collection<Book>,
    book: Book,
    options: TransactionOptions,
) -> Result<Bson> {
    let mut session = DriverSession::open(client, options).await?;
    run_in_transaction(&mut session, move |session: &mut DriverSession| {
        async move {
            let result = coll
                .insert_one(&book)
                .session(session.client_session())
                .await?;
            Ok(result.inserted_id)
        }
        .boxed()
    })
    .await
}

pub async fn run_transaction(ctx: &SnippetContext) -> Result<()> {
    let options = transaction_options(&ctx.config.transaction)?;
    let connector = ctx.connector().await?;
    let ids = with_connection(&connector, |client| async move {
        let coll = client.database(DATABASE).collection::<Book>(COLLECTION);
        insert_books_in_transaction(&client, coll, morrison_books(), options).await
    })
    .await?;

    let ids: Vec<String> = ids.iter().map(cell_text).collect();
    println!("[{}]", ids.join(" "));
    Ok(())
}

pub async fn run_session(ctx: &SnippetContext) -> Result<()> {
    let options = transaction_options(&ctx.config.transaction)?;
    let connector = ctx.connector().await?;
    let id = with_connection(&connector, |client| async move {
        let coll = client.database(DATABASE).collection::<Book>(COLLECTION);
        insert_book_in_transaction(&client, coll, Book::new("Sula", "Toni Morrison"), options).await
    })
    .await?;

    println!("{}", cell_text(&id));
    Ok(())
}
