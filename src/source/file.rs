use crate::model::SourceError;
use crate::source::traits::{RawReport, ReportSource};
use std::path::PathBuf;
use tracing::info;

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl ReportSource for FileSource {
    async fn fetch(&self) -> Result<RawReport, SourceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        info!("📄 Read {} ({} bytes)", self.path.display(), bytes.len());

        Ok(RawReport {
            name: self.path.display().to_string(),
            bytes,
        })
    }
}
