// Report sources: local files or remote CSV exports.

pub mod file;
pub mod http;
pub mod traits;

pub use file::FileSource;
pub use http::HttpSource;
pub use traits::{RawReport, ReportSource};

use crate::config::SourceConfig;
use crate::model::SourceError;

/// Builds the source a config entry points to.
pub fn from_config(cfg: &SourceConfig) -> Result<Box<dyn ReportSource>, SourceError> {
    Ok(match cfg {
        SourceConfig::File { path } => Box::new(FileSource::new(path.clone())),
        SourceConfig::Url { url } => Box::new(HttpSource::new(url.clone())?),
    })
}
