//! Where template bytes come from.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::FetchError;

/// Fetches template bytes by filename.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, FetchError>;
}

/// Filenames are relative paths with no parent or root components.
fn check_name(filename: &str) -> Result<(), FetchError> {
    let path = Path::new(filename);
    let plain = !filename.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)));
    if plain {
        Ok(())
    } else {
        Err(FetchError::InvalidName(filename.to_string()))
    }
}

/// Templates stored under a local directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl TemplateSource for DirSource {
    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, FetchError> {
        check_name(filename)?;
        let path = self.root.join(filename);
        debug!(path = %path.display(), "reading template");
        tokio::fs::read(&path).await.map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                FetchError::NotFound(filename.to_string())
            } else {
                FetchError::Io {
                    filename: filename.to_string(),
                    source,
                }
            }
        })
    }
}

/// Templates held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    templates: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filename: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(filename, bytes);
        self
    }

    pub fn insert(&mut self, filename: &str, bytes: impl Into<Vec<u8>>) {
        self.templates.insert(filename.to_string(), bytes.into());
    }
}

#[async_trait]
impl TemplateSource for MemorySource {
    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, FetchError> {
        self.templates
            .get(filename)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(filename.to_string()))
    }
}

/// Templates served over HTTP relative to a base URL.
#[cfg(feature = "http")]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "http")]
impl HttpSource {
    /// `base_url` like `https://forms.example.org/templates`; a trailing
    /// slash is ignored.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, filename: &str) -> String {
        format!("{}/{}", self.base_url, filename.trim_start_matches('/'))
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl TemplateSource for HttpSource {
    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, FetchError> {
        check_name(filename)?;
        let url = self.url_for(filename);

        debug!(url = %url, "fetching template");
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(filename.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}
