/// Search Index Module
///
/// Search index management: typed definitions, create/list/update/drop, and
/// polling until a freshly built index becomes queryable.

use crate::core::{Result, SnippetError};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::{Collection, SearchIndexModel, SearchIndexType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(600);

/// How often to poll and how long to wait at most. `timeout: None` waits forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Option<Duration>,
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        PollPolicy { interval, timeout }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy::new(DEFAULT_POLL_INTERVAL, Some(DEFAULT_POLL_TIMEOUT))
    }
}

/// One entry of the search index listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchIndexStatus {
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub queryable: bool,
    #[serde(rename = "type", default)]
    pub index_type: Option<String>,
    #[serde(rename = "latestDefinition", default)]
    pub latest_definition: Option<Document>,
}

impl SearchIndexStatus {
    /// Decodes a listing document. A missing `queryable` flag means not queryable.
    pub fn from_document(doc: Document) -> Result<Self> {
        Ok(bson::from_document(doc)?)
    }
}

/// Source of search index metadata.
#[async_trait]
pub trait SearchIndexCatalog: Send + Sync {
    /// Current listing entry for `name`, or `None` if the index is not listed.
    async fn describe(&self, name: &str) -> Result<Option<SearchIndexStatus>>;
}

#[async_trait]
impl SearchIndexCatalog for Collection<Document> {
    async fn describe(&self, name: &str) -> Result<Option<SearchIndexStatus>> {
        let statuses = list_search_indexes(self, Some(name)).await?;
        Ok(statuses.into_iter().find(|status| status.name == name))
    }
}

/// Polls `catalog` until the index named `name` reports `queryable: true`.
///
/// An index that is not listed yet, or listed with `queryable: false`, is not
/// ready. The last check happens at the deadline; if the index is still not
/// queryable then, a `Timeout` error is returned.
pub async fn wait_until_queryable<C>(catalog: &C, name: &str, policy: &PollPolicy) -> Result<SearchIndexStatus>
where
    C: SearchIndexCatalog + ?Sized,
{
    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        match catalog.describe(name).await? {
            Some(status) if status.queryable => {
                info!(index = name, attempts, "search index is ready for querying");
                return Ok(status);
            }
            Some(status) => {
                debug!(index = name, status = ?status.status, attempts, "search index not queryable yet")
            }
            None => debug!(index = name, attempts, "search index not listed yet"),
        }

        let pause = match policy.timeout {
            Some(limit) => {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    return Err(SnippetError::Timeout(format!(
                        "search index '{}' was not queryable after {:?} ({} checks)",
                        name, limit, attempts
                    )));
                }
                policy.interval.min(limit - elapsed)
            }
            None => policy.interval,
        };
        tokio::time::sleep(pause).await;
    }
}

/// Vector similarity function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Similarity {
    Euclidean,
    Cosine,
    DotProduct,
}

/// Automatic vector quantization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantization {
    Scalar,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Vector,
    Filter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorField {
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_dimensions: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<Similarity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantization: Option<Quantization>,
}

impl VectorField {
    pub fn vector(path: impl Into<String>, num_dimensions: i32, similarity: Similarity) -> Self {
        VectorField {
            kind: FieldKind::Vector,
            path: path.into(),
            num_dimensions: Some(num_dimensions),
            similarity: Some(similarity),
            quantization: None,
        }
    }

    pub fn filter(path: impl Into<String>) -> Self {
        VectorField {
            kind: FieldKind::Filter,
            path: path.into(),
            num_dimensions: None,
            similarity: None,
            quantization: None,
        }
    }

    pub fn quantized(mut self, quantization: Quantization) -> Self {
        self.quantization = Some(quantization);
        self
    }
}

/// Definition of a vector search index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorDefinition {
    pub fields: Vec<VectorField>,
}

/// Definition of a full-text search index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchDefinition {
    pub mappings: Mappings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mappings {
    pub dynamic: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldMapping>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMapping {
    #[serde(rename = "type")]
    pub kind: String,
}

impl SearchDefinition {
    /// Static mappings over the given `(field, type)` pairs.
    pub fn static_fields<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        SearchDefinition {
            mappings: Mappings {
                dynamic: false,
                fields: fields
                    .into_iter()
                    .map(|(name, kind)| {
                        (
                            name.to_string(),
                            FieldMapping {
                                kind: kind.to_string(),
                            },
                        )
                    })
                    .collect(),
            },
        }
    }

    pub fn dynamic() -> Self {
        SearchDefinition {
            mappings: Mappings {
                dynamic: true,
                fields: BTreeMap::new(),
            },
        }
    }
}

/// Encodes a typed definition into the document the server expects.
pub fn definition_document<D: Serialize>(definition: &D) -> Result<Document> {
    Ok(bson::to_document(definition)?)
}

pub fn vector_index_model(name: &str, definition: &VectorDefinition) -> Result<SearchIndexModel> {
    Ok(SearchIndexModel::builder()
        .definition(definition_document(definition)?)
        .name(name.to_string())
        .index_type(SearchIndexType::VectorSearch)
        .build())
}

pub fn search_index_model(name: &str, definition: &SearchDefinition) -> Result<SearchIndexModel> {
    Ok(SearchIndexModel::builder()
        .definition(definition_document(definition)?)
        .name(name.to_string())
        .index_type(SearchIndexType::Search)
        .build())
}

/// Submits an index build. Returns the server-assigned name.
pub async fn create_search_index(coll: &Collection<Document>, model: SearchIndexModel) -> Result<String> {
    let name = coll.create_search_index(model).await?;
    info!(index = %name, collection = %coll.name(), "search index is building");
    Ok(name)
}

/// Lists search indexes, optionally restricted to one name.
pub async fn list_search_indexes(coll: &Collection<Document>, name: Option<&str>) -> Result<Vec<SearchIndexStatus>> {
    let stage = match name {
        Some(name) => doc! { "$listSearchIndexes": { "name": name } },
        None => doc! { "$listSearchIndexes": {} },
    };
    let docs: Vec<Document> = coll.aggregate(vec![stage]).await?.try_collect().await?;
    docs.into_iter().map(SearchIndexStatus::from_document).collect()
}

pub async fn update_search_index<D: Serialize>(coll: &Collection<Document>, name: &str, definition: &D) -> Result<()> {
    coll.update_search_index(name, definition_document(definition)?).await?;
    info!(index = name, "search index definition updated");
    Ok(())
}

pub async fn drop_search_index(coll: &Collection<Document>, name: &str) -> Result<()> {
    coll.drop_search_index(name).await?;
    info!(index = name, "search index dropped");
    Ok(())
}
