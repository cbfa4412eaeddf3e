use crate::model::SourceError;

/// Raw bytes of a report plus the name it was loaded under (file name or URL),
/// used to tell CSV from HTML exports.
#[derive(Debug, Clone)]
pub struct RawReport {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[async_trait::async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch(&self) -> Result<RawReport, SourceError>;
}
