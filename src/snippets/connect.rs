/// Connection Snippet Module
///
/// Connect-only snippets: each applies one group of client settings, connects,
/// confirms the deployment answers and disconnects.

use super::SnippetContext;
use crate::config::{AuthConfig, Config, PoolConfig};
use crate::core::db::options::append_query;
use crate::core::db::with_connection;
use crate::core::{Result, SnippetError};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Token file mounted into Kubernetes pods.
pub const SERVICE_ACCOUNT_TOKEN_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

pub const SERVER_SELECTION_TIMEOUT_MS: u64 = 10_000;
pub const LOCAL_THRESHOLD_MS: u64 = 15;
pub const MAX_POOL_SIZE: u32 = 50;
pub const MIN_POOL_SIZE: u32 = 10;
pub const MAX_IDLE_TIME_MS: u64 = 30_000;

pub fn cluster_settings(base: &Config) -> Config {
    let mut config = base.clone();
    config.connection.server_selection_timeout_ms = Some(SERVER_SELECTION_TIMEOUT_MS);
    config.connection.local_threshold_ms = Some(LOCAL_THRESHOLD_MS);
    config
}

pub fn cluster_settings_query() -> Vec<(&'static str, String)> {
    vec![
        ("serverSelectionTimeoutMS", SERVER_SELECTION_TIMEOUT_MS.to_string()),
        ("localThresholdMS", LOCAL_THRESHOLD_MS.to_string()),
    ]
}

pub fn pool_settings(base: &Config) -> Config {
    let mut config = base.clone();
    config.pool = Some(PoolConfig {
        min_pool_size: Some(MIN_POOL_SIZE),
        max_pool_size: Some(MAX_POOL_SIZE),
        max_idle_time_ms: Some(MAX_IDLE_TIME_MS),
    });
    config
}

pub fn pool_query() -> Vec<(&'static str, String)> {
    vec![
        ("maxPoolSize", MAX_POOL_SIZE.to_string()),
        ("minPoolSize", MIN_POOL_SIZE.to_string()),
        ("maxIdleTimeMS", MAX_IDLE_TIME_MS.to_string()),
    ]
}

/// Configuration with OIDC authentication. Without an `[auth]` section the
/// access token is read from the pod's service account token file.
pub fn oidc_settings(base: &Config) -> Config {
    let mut config = base.clone();
    if config.auth.is_none() {
        config.auth = Some(AuthConfig {
            mechanism: "MONGODB-OIDC".to_string(),
            token_file: Some(PathBuf::from(SERVICE_ACCOUNT_TOKEN_FILE)),
            properties: BTreeMap::new(),
        });
    }
    config
}

/// Connects with `ctx`, then releases the connection.
pub async fn connect_and_release(ctx: &SnippetContext) -> Result<()> {
    let connector = ctx.connector().await?;
    with_connection(&connector, |_client| async move { Ok(()) }).await
}

pub async fn run_tls(ctx: &SnippetContext) -> Result<()> {
    if ctx.config.tls.is_none() {
        return Err(SnippetError::Config(
            "the tls snippet needs a [tls] section with ca_file and cert_key_file".to_string(),
        ));
    }
    connect_and_release(ctx).await?;
    println!("Connected to MongoDB with TLS");
    Ok(())
}

pub async fn run_cluster_settings(ctx: &SnippetContext) -> Result<()> {
    let scoped = SnippetContext::new(cluster_settings(&ctx.config), ctx.uri.clone());
    connect_and_release(&scoped).await?;
    println!("Connected to MongoDB with cluster settings options");
    Ok(())
}

pub async fn run_cluster_settings_uri(ctx: &SnippetContext) -> Result<()> {
    let scoped = SnippetContext::new(ctx.config.clone(), append_query(&ctx.uri, &cluster_settings_query()));
    connect_and_release(&scoped).await?;
    println!("Connected to MongoDB with cluster settings in the connection string");
    Ok(())
}

pub async fn run_connection_pool(ctx: &SnippetContext) -> Result<()> {
    let scoped = SnippetContext::new(pool_settings(&ctx.config), ctx.uri.clone());
    connect_and_release(&scoped).await?;
    println!("Connected to MongoDB with connection pool options");
    Ok(())
}

pub async fn run_connection_pool_uri(ctx: &SnippetContext) -> Result<()> {
    let scoped = SnippetContext::new(ctx.config.clone(), append_query(&ctx.uri, &pool_query()));
    connect_and_release(&scoped).await?;
    println!("Connected to MongoDB with connection pool settings in the connection string");
    Ok(())
}

pub async fn run_oidc(ctx: &SnippetContext) -> Result<()> {
    let scoped = SnippetContext::new(oidc_settings(&ctx.config), ctx.uri.clone());
    connect_and_release(&scoped).await?;
    println!("Connected to MongoDB with MONGODB-OIDC");
    Ok(())
}
