use shaorma::{RawChild, RemoteError, RemoteSource};

use crate::snapshot;

/// Where the realtime database lives and how to authenticate against it.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    /// Base URL, e.g. `https://example-default-rtdb.firebaseio.com`.
    pub database_url: String,
    /// Database secret or ID token, sent as the `auth` query parameter.
    pub auth_token: Option<String>,
}

/// Reads collections from a Firebase Realtime Database over REST.
pub struct FirebaseSource {
    config: FirebaseConfig,
    client: reqwest::Client,
}

impl FirebaseSource {
    pub fn new(config: FirebaseConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// `{database_url}/{path}.json`, plus the auth token when configured.
    pub fn collection_url(&self, path: &str) -> Result<reqwest::Url, RemoteError> {
        let raw = format!(
            "{}/{}.json",
            self.config.database_url.trim_end_matches('/'),
            path.trim_matches('/')
        );

        let mut url = reqwest::Url::parse(&raw)
            .map_err(|e| RemoteError::Network(format!("invalid database URL {raw}: {e}")))?;

        if let Some(token) = &self.config.auth_token {
            url.query_pairs_mut().append_pair("auth", token);
        }

        Ok(url)
    }
}

#[async_trait::async_trait]
impl RemoteSource for FirebaseSource {
    fn label(&self) -> &str {
        &self.config.database_url
    }

    async fn read(&self, path: &str) -> Result<Vec<RawChild>, RemoteError> {
        let url = self.collection_url(path)?;
        tracing::debug!(path, "reading collection");

        let response = self
            .client
            .get(url)
            .header("User-Agent", "shaorma")
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status().as_u16()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))?;

        let children = snapshot::into_children(body)?;
        tracing::debug!(path, count = children.len(), "collection read");
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(url: &str, token: Option<&str>) -> FirebaseSource {
        FirebaseSource::new(FirebaseConfig {
            database_url: url.to_owned(),
            auth_token: token.map(str::to_owned),
        })
    }

    #[test]
    fn url_joins_base_and_path() {
        let url = source("https://db.example.com/", None)
            .collection_url("/Stores")
            .unwrap();
        assert_eq!(url.as_str(), "https://db.example.com/Stores.json");
    }

    #[test]
    fn url_carries_encoded_token() {
        let url = source("https://db.example.com", Some("a b&c"))
            .collection_url("Category")
            .unwrap();
        assert_eq!(url.as_str(), "https://db.example.com/Category.json?auth=a+b%26c");
    }

    #[test]
    fn bad_base_url_is_reported() {
        let err = source("not a url", None).collection_url("Stores").unwrap_err();
        assert!(matches!(err, RemoteError::Network(_)));
    }
}
