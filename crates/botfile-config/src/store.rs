//! Secret-sealed document storage
//!
//! `load` returns a document with every sensitive value unsealed; `save`
//! seals them again and replaces the file in one rename.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::model::Document;
use crate::secrets::SecretKey;
use crate::{BotFileError, Result};

/// Storage backend for bot files
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the document at `path`, unsealing sensitive fields with `secret`
    async fn load(&self, path: &Path, secret: Option<&str>) -> Result<Document>;

    /// Seal sensitive fields with `secret` and persist the document at `path`
    async fn save(&self, document: &Document, path: &Path, secret: Option<&str>) -> Result<()>;
}

/// Bot files on the local filesystem
#[derive(Debug, Clone, Default)]
pub struct FileStore;

impl FileStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn load(&self, path: &Path, secret: Option<&str>) -> Result<Document> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BotFileError::ConfigNotFound(path.to_path_buf())
            } else {
                BotFileError::io(path, e)
            }
        })?;

        let mut document = Document::from_json(&content)?;
        unseal_document(&mut document, secret)?;
        debug!(path = %path.display(), services = document.services.len(), "loaded bot file");
        Ok(document)
    }

    async fn save(&self, document: &Document, path: &Path, secret: Option<&str>) -> Result<()> {
        let sealed = seal_document(document, secret)?;
        let content = sealed.to_pretty_json()?;

        let tmp = temp_path(path);
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| BotFileError::persist(path, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(BotFileError::persist(path, e));
        }

        debug!(path = %path.display(), sealed = sealed.is_sealed(), "saved bot file");
        Ok(())
    }
}

/// Unseal every sensitive value in place
///
/// A sealed document requires a secret whose key opens the padlock.
/// A supplied secret must parse even when the document is not sealed.
pub fn unseal_document(document: &mut Document, secret: Option<&str>) -> Result<()> {
    let key = secret.map(SecretKey::parse).transpose()?;
    if !document.is_sealed() {
        return Ok(());
    }
    let key = key.ok_or_else(|| {
        BotFileError::bad_secret("this bot file is sealed, you need to pass in --secret")
    })?;

    if let Some(padlock) = document.padlock.as_deref() {
        key.unseal(padlock)?;
    }

    for service in &mut document.services {
        for value in service.sensitive_values_mut() {
            *value = key.unseal(value)?;
        }
    }
    Ok(())
}

/// Produce the on-disk form of an unsealed document
pub fn seal_document(document: &Document, secret: Option<&str>) -> Result<Document> {
    let Some(secret) = secret else {
        if document.is_sealed() {
            return Err(BotFileError::bad_secret(
                "this bot file is sealed, you need to pass in --secret to save it",
            ));
        }
        return Ok(document.clone());
    };

    let key = SecretKey::parse(secret)?;
    let mut sealed = document.clone();
    for service in &mut sealed.services {
        for value in service.sensitive_values_mut() {
            *value = key.seal(value)?;
        }
    }
    sealed.padlock = Some(key.seal(sealed.name.as_deref().unwrap_or_default())?);
    Ok(sealed)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
