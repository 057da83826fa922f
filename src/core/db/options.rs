/// Client Options Module
///
/// Translation of [`Config`] into driver options.
///
/// Settings present in the configuration override whatever the connection
/// string carried; absent settings leave the parsed values alone.

use crate::config::{redact_uri, AuthConfig, Config, TlsConfig, TransactionConfig, WriteConcernSetting};
use crate::core::db::connection::DriverConnector;
use crate::core::{Result, SnippetError};
use futures::FutureExt;
use mongodb::bson::Document;
use mongodb::options::oidc::{self, IdpServerResponse};
use mongodb::options::{
    Acknowledgment, AuthMechanism, ClientOptions, Credential, Tls, TlsOptions, TransactionOptions,
    WriteConcern,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Parses `uri` and layers the configured settings on top.
pub async fn client_options(config: &Config, uri: &str) -> Result<ClientOptions> {
    let mut options = ClientOptions::parse(uri).await.map_err(|e| {
        SnippetError::Config(format!("invalid connection string '{}': {}", redact_uri(uri), e))
    })?;
    apply_settings(&mut options, config)?;
    debug!(uri = %redact_uri(uri), "client options resolved");
    Ok(options)
}

/// Builds a connector for `uri`, bounded by the configured connect deadline.
pub async fn connector(config: &Config, uri: &str) -> Result<DriverConnector> {
    let options = client_options(config, uri).await?;
    Ok(DriverConnector::new(options).with_deadline(config.connection.connect_deadline()))
}

/// Applies cluster, pool, TLS, logging and authentication settings.
pub fn apply_settings(options: &mut ClientOptions, config: &Config) -> Result<()> {
    let connection = &config.connection;
    if let Some(name) = &connection.app_name {
        options.app_name = Some(name.clone());
    }
    if let Some(ms) = connection.server_selection_timeout_ms {
        options.server_selection_timeout = Some(Duration::from_millis(ms));
    }
    if let Some(ms) = connection.local_threshold_ms {
        options.local_threshold = Some(Duration::from_millis(ms));
    }
    if let Some(ms) = connection.connect_timeout_ms {
        options.connect_timeout = Some(Duration::from_millis(ms));
    }

    if let Some(pool) = &config.pool {
        if pool.min_pool_size.is_some() {
            options.min_pool_size = pool.min_pool_size;
        }
        if pool.max_pool_size.is_some() {
            options.max_pool_size = pool.max_pool_size;
        }
        if let Some(ms) = pool.max_idle_time_ms {
            options.max_idle_time = Some(Duration::from_millis(ms));
        }
    }

    if let Some(tls) = &config.tls {
        options.tls = Some(tls_options(tls)?);
    }

    if let Some(length) = config.logging.max_document_length {
        options.tracing_max_document_length_bytes = Some(length);
    }

    if let Some(auth) = &config.auth {
        options.credential = Some(oidc_credential(auth)?);
    }

    Ok(())
}

fn existing_file(path: &Path, what: &str) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(SnippetError::Config(format!(
            "{} '{}' does not exist",
            what,
            path.display()
        )))
    }
}

/// Enables TLS with the configured CA and client certificate/key files.
pub fn tls_options(tls: &TlsConfig) -> Result<Tls> {
    let ca_file = tls
        .ca_file
        .as_deref()
        .map(|path| existing_file(path, "CA file"))
        .transpose()?;
    let cert_key_file = tls
        .cert_key_file
        .as_deref()
        .map(|path| existing_file(path, "certificate key file"))
        .transpose()?;

    let options = TlsOptions::builder()
        .ca_file_path(ca_file)
        .cert_key_file_path(cert_key_file)
        .allow_invalid_certificates(tls.allow_invalid_certificates)
        .build();
    Ok(Tls::Enabled(options))
}

/// MONGODB-OIDC credential.
///
/// With a `token_file` the credential carries a machine callback that reads
/// the access token from that file on every invocation; otherwise the
/// driver's built-in provider selected by the `ENVIRONMENT` property is used.
pub fn oidc_credential(auth: &AuthConfig) -> Result<Credential> {
    let properties = if auth.properties.is_empty() {
        None
    } else {
        let mut doc = Document::new();
        for (key, value) in &auth.properties {
            doc.insert(key.clone(), value.clone());
        }
        Some(doc)
    };

    let mut credential = Credential::builder()
        .mechanism(AuthMechanism::MongoDbOidc)
        .mechanism_properties(properties)
        .build();

    if let Some(path) = &auth.token_file {
        credential.oidc_callback = token_file_callback(path.clone());
    }

    Ok(credential)
}

fn token_file_callback(path: PathBuf) -> oidc::Callback {
    oidc::Callback::machine(move |_| {
        let path = path.clone();
        async move {
            let access_token = tokio::fs::read_to_string(&path).await?;
            Ok::<_, mongodb::error::Error>(IdpServerResponse::builder()
                .access_token(access_token.trim().to_string())
                .expires(None)
                .refresh_token(None)
                .build())
        }
        .boxed()
    })
}

/// Maps a parsed write concern setting to the driver's write concern.
pub fn write_concern(setting: &WriteConcernSetting) -> WriteConcern {
    let w = match setting {
        WriteConcernSetting::Majority => Acknowledgment::Majority,
        WriteConcernSetting::Nodes(nodes) => Acknowledgment::Nodes(*nodes),
        WriteConcernSetting::Tag(tag) => Acknowledgment::Custom(tag.clone()),
    };
    WriteConcern::builder().w(w).build()
}

/// Transaction options carrying the configured write concern.
pub fn transaction_options(config: &TransactionConfig) -> Result<TransactionOptions> {
    let setting: WriteConcernSetting = config.write_concern.parse()?;
    Ok(TransactionOptions::builder()
        .write_concern(write_concern(&setting))
        .build())
}

/// Appends `key=value` query parameters to a connection string.
pub fn append_query(uri: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return uri.to_string();
    }

    let query = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    if uri.contains('?') {
        let separator = if uri.ends_with('?') || uri.ends_with('&') { "" } else { "&" };
        format!("{}{}{}", uri, separator, query)
    } else {
        let authority_end = uri.find("://").map(|i| i + 3).unwrap_or(0);
        if uri[authority_end..].contains('/') {
            format!("{}?{}", uri, query)
        } else {
            format!("{}/?{}", uri, query)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use std::collections::BTreeMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    async fn parsed(uri: &str) -> ClientOptions {
        ClientOptions::parse(uri).await.expect("parse connection string")
    }

    #[tokio::test]
    async fn test_cluster_and_pool_settings_applied() {
        let mut config = Config::default();
        config.connection.app_name = Some("driver-snippets".to_string());
        config.connection.server_selection_timeout_ms = Some(10_000);
        config.connection.local_threshold_ms = Some(15);
        config.pool = Some(PoolConfig {
            min_pool_size: Some(10),
            max_pool_size: Some(50),
            max_idle_time_ms: Some(30_000),
        });
        config.logging.max_document_length = Some(25);

        let options = client_options(&config, "mongodb://localhost:27017").await.unwrap();
        assert_eq!(options.app_name.as_deref(), Some("driver-snippets"));
        assert_eq!(options.server_selection_timeout, Some(Duration::from_secs(10)));
        assert_eq!(options.local_threshold, Some(Duration::from_millis(15)));
        assert_eq!(options.min_pool_size, Some(10));
        assert_eq!(options.max_pool_size, Some(50));
        assert_eq!(options.max_idle_time, Some(Duration::from_secs(30)));
        assert_eq!(options.tracing_max_document_length_bytes, Some(25));
        assert!(options.tls.is_none());
        assert!(options.credential.is_none());
    }

    #[tokio::test]
    async fn test_uri_settings_survive_empty_config() {
        let uri = append_query(
            "mongodb://localhost:27017",
            &[("maxPoolSize", "50".to_string()), ("minPoolSize", "10".to_string())],
        );
        let mut options = parsed(&uri).await;
        apply_settings(&mut options, &Config::default()).unwrap();
        assert_eq!(options.max_pool_size, Some(50));
        assert_eq!(options.min_pool_size, Some(10));
    }

    #[tokio::test]
    async fn test_invalid_uri_is_config_error() {
        let result = client_options(&Config::default(), "mongodb://user:pw@").await;
        match result {
            Err(SnippetError::Config(msg)) => assert!(!msg.contains("pw")),
            other => panic!("Expected Config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_tls_missing_file_rejected() {
        let tls = TlsConfig {
            ca_file: Some(PathBuf::from("/nonexistent/ca.pem")),
            cert_key_file: None,
            allow_invalid_certificates: false,
        };
        match tls_options(&tls) {
            Err(SnippetError::Config(msg)) => assert!(msg.contains("CA file")),
            other => panic!("Expected Config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_tls_options_with_files() {
        let mut ca = NamedTempFile::new().unwrap();
        writeln!(ca, "-----BEGIN CERTIFICATE-----").unwrap();
        let cert = NamedTempFile::new().unwrap();

        let tls = TlsConfig {
            ca_file: Some(ca.path().to_path_buf()),
            cert_key_file: Some(cert.path().to_path_buf()),
            allow_invalid_certificates: false,
        };
        match tls_options(&tls).unwrap() {
            Tls::Enabled(options) => {
                assert_eq!(options.ca_file_path.as_deref(), Some(ca.path()));
                assert_eq!(options.cert_key_file_path.as_deref(), Some(cert.path()));
            }
            Tls::Disabled => panic!("Expected TLS to be enabled"),
        }
    }

    #[test]
    fn test_oidc_credential_properties() {
        let auth = AuthConfig {
            mechanism: "MONGODB-OIDC".to_string(),
            token_file: Some(PathBuf::from("/var/run/secrets/token")),
            properties: BTreeMap::from([("TOKEN_RESOURCE".to_string(), "audience".to_string())]),
        };
        let credential = oidc_credential(&auth).unwrap();
        assert_eq!(credential.mechanism, Some(AuthMechanism::MongoDbOidc));
        let properties = credential.mechanism_properties.expect("properties");
        assert_eq!(properties.get_str("TOKEN_RESOURCE").unwrap(), "audience");
    }

    #[test]
    fn test_write_concern_mapping() {
        let majority = write_concern(&WriteConcernSetting::Majority);
        assert_eq!(majority.w, Some(Acknowledgment::Majority));

        let nodes = write_concern(&WriteConcernSetting::Nodes(2));
        assert_eq!(nodes.w, Some(Acknowledgment::Nodes(2)));

        let options = transaction_options(&TransactionConfig::default()).unwrap();
        assert_eq!(
            options.write_concern.and_then(|wc| wc.w),
            Some(Acknowledgment::Majority)
        );
    }

    #[test]
    fn test_append_query() {
        let params = [("serverSelectionTimeoutMS", "10000".to_string())];
        assert_eq!(
            append_query("mongodb://localhost:27017", &params),
            "mongodb://localhost:27017/?serverSelectionTimeoutMS=10000"
        );
        assert_eq!(
            append_query("mongodb+srv://cluster.example.net/?w=majority", &params),
            "mongodb+srv://cluster.example.net/?w=majority&serverSelectionTimeoutMS=10000"
        );
        assert_eq!(
            append_query("mongodb://localhost:27017/admin", &params),
            "mongodb://localhost:27017/admin?serverSelectionTimeoutMS=10000"
        );
        assert_eq!(append_query("mongodb://localhost", &[]), "mongodb://localhost");
    }

    #[tokio::test]
    async fn test_connector_carries_deadline() {
        let mut config = Config::default();
        config.connection.connect_deadline_secs = Some(20);

        let connector = connector(&config, "mongodb://localhost:27017").await.unwrap();
        assert_eq!(connector.deadline(), Some(Duration::from_secs(20)));
    }
}
