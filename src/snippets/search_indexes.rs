/// Search Index Snippet Module
///
/// Search index lifecycle on `sample_mflix.embedded_movies`. Indexes created
/// by a run are dropped again even when a later step fails.

use super::SnippetContext;
use crate::core::db::search_index::{
    create_search_index, drop_search_index, list_search_indexes, search_index_model, update_search_index,
    vector_index_model, Quantization, SearchDefinition, Similarity, VectorDefinition, VectorField,
};
use crate::core::db::{wait_until_queryable, with_connection, SearchIndexStatus};
use crate::core::Result;
use crate::output::DocumentGrid;
use mongodb::bson::{doc, Document};
use mongodb::Collection;
use std::future::Future;
use tracing::warn;

pub const DATABASE: &str = "sample_mflix";
pub const COLLECTION: &str = "embedded_movies";
pub const VECTOR_INDEX: &str = "vector_index";
pub const SEARCH_INDEX: &str = "atlas_search_index";

/// Dimensions of the `plot_embedding` vectors.
pub const PLOT_DIMENSIONS: i32 = 1536;

/// Scalar-quantized dot-product index over `plot_embedding`.
pub fn plot_vector_definition() -> VectorDefinition {
    VectorDefinition {
        fields: vec![VectorField::vector("plot_embedding", PLOT_DIMENSIONS, Similarity::DotProduct)
            .quantized(Quantization::Scalar)],
    }
}

/// The same index without quantization.
pub fn plot_vector_definition_unquantized() -> VectorDefinition {
    VectorDefinition {
        fields: vec![VectorField::vector("plot_embedding", PLOT_DIMENSIONS, Similarity::DotProduct)],
    }
}

/// Static full-text mapping over `plot`.
pub fn plot_search_definition() -> SearchDefinition {
    SearchDefinition::static_fields([("plot", "string")])
}

fn status_row(status: &SearchIndexStatus) -> Document {
    doc! {
        "name": status.name.clone(),
        "type": status.index_type.clone().unwrap_or_default(),
        "status": status.status.clone().unwrap_or_default(),
        "queryable": status.queryable,
    }
}

/// Listing as a grid of name, type, status and queryable.
pub fn status_grid(statuses: &[SearchIndexStatus]) -> DocumentGrid {
    DocumentGrid::from_documents(statuses.iter().map(status_row))
}

/// Returns `outcome`, running `cleanup` first when it is an error. A cleanup
/// failure is logged and never replaces the original error.
pub async fn cleanup_on_error<T, C, Fut>(outcome: Result<T>, cleanup: C) -> Result<T>
where
    C: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    if outcome.is_err() {
        if let Err(cleanup_err) = cleanup().await {
            warn!(error = %cleanup_err, "failed to drop search indexes after error");
        }
    }
    outcome
}

async fn drop_all(coll: &Collection<Document>, names: Vec<&str>) -> Result<()> {
    for name in names {
        drop_search_index(coll, name).await?;
    }
    Ok(())
}

pub async fn run(ctx: &SnippetContext) -> Result<()> {
    let policy = ctx.config.search.poll_policy();
    let connector = ctx.connector().await?;

    let statuses = with_connection(&connector, |client| async move {
        let coll = client.database(DATABASE).collection::<Document>(COLLECTION);

        let name = create_search_index(&coll, vector_index_model(VECTOR_INDEX, &plot_vector_definition())?).await?;
        println!("New search index named {} is building.", name);

        let search_name = cleanup_on_error(
            async {
                println!("Polling to check if the index is ready. This may take up to a minute.");
                wait_until_queryable(&coll, &name, &policy).await?;
                println!("{} is ready for querying.", name);
                create_search_index(&coll, search_index_model(SEARCH_INDEX, &plot_search_definition())?).await
            }
            .await,
            || drop_all(&coll, vec![name.as_str()]),
        )
        .await?;
        println!("New search index named {} is building.", search_name);

        let statuses = cleanup_on_error(
            async {
                let statuses = list_search_indexes(&coll, None).await?;
                update_search_index(&coll, &name, &plot_vector_definition_unquantized()).await?;
                println!("Updated the definition of {}.", name);
                Ok(statuses)
            }
            .await,
            || drop_all(&coll, vec![search_name.as_str(), name.as_str()]),
        )
        .await?;

        drop_all(&coll, vec![search_name.as_str(), name.as_str()]).await?;
        println!("Dropped {} and {}.", search_name, name);
        Ok(statuses)
    })
    .await?;

    println!("Search indexes before update:");
    print!("{}", status_grid(&statuses).render());
    Ok(())
}
