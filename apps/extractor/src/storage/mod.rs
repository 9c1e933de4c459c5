//! Artifact store for the per-URL outputs: the sanitized page and the structured result.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use thiserror::Error;
use tracing::info;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const RAW_PREFIX: &str = "rawData";
const STRUCTURED_PREFIX: &str = "sorted_data";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize structured data: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    output_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes `rawData_<ts>.html`.
    pub async fn save_raw(
        &self,
        html: &str,
        at: DateTime<Local>,
    ) -> Result<PathBuf, StorageError> {
        let path = self.write_new(RAW_PREFIX, "html", at, html.as_bytes()).await?;
        info!("Raw HTML saved to {}", path.display());
        Ok(path)
    }

    /// Writes `sorted_data_<ts>.json`, pretty-printed with 4-space indentation.
    pub async fn save_structured<T: Serialize>(
        &self,
        data: &T,
        at: DateTime<Local>,
    ) -> Result<PathBuf, StorageError> {
        let bytes = to_pretty_json(data)?;
        let path = self
            .write_new(STRUCTURED_PREFIX, "json", at, &bytes)
            .await?;
        info!("Structured data saved to {}", path.display());
        Ok(path)
    }

    async fn write_new(
        &self,
        prefix: &str,
        extension: &str,
        at: DateTime<Local>,
        contents: &[u8],
    ) -> Result<PathBuf, StorageError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: self.output_dir.clone(),
                source,
            })?;

        let stem = format!("{prefix}_{}", at.format(TIMESTAMP_FORMAT));
        let mut path = self.output_dir.join(format!("{stem}.{extension}"));
        let mut n = 1;
        // Two URLs finishing within the same second share a timestamp.
        while tokio::fs::try_exists(&path).await.unwrap_or(false) {
            path = self.output_dir.join(format!("{stem}_{n}.{extension}"));
            n += 1;
        }

        tokio::fs::write(&path, contents)
            .await
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

fn to_pretty_json<T: Serialize>(data: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    data.serialize(&mut ser)?;
    Ok(buf)
}
