use crate::model::SourceError;
use crate::source::traits::{RawReport, ReportSource};
use reqwest::Client;
use tracing::info;

/// Downloads a CSV export, e.g. a spreadsheet published with `output=csv`.
pub struct HttpSource {
    client: Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent("florit-restock/0.1")
            .build()
            .map_err(|e| SourceError::HttpError(e.to_string()))?;

        Ok(Self { client, url: url.into() })
    }
}

#[async_trait::async_trait]
impl ReportSource for HttpSource {
    async fn fetch(&self) -> Result<RawReport, SourceError> {
        let response = self.client.get(&self.url)
            .send()
            .await
            .map_err(|e| SourceError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::InvalidResponse {
                url: self.url.clone(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes()
            .await
            .map_err(|e| SourceError::HttpError(e.to_string()))?;
        info!("🌐 Downloaded {} ({} bytes)", self.url, bytes.len());

        Ok(RawReport {
            name: self.url.clone(),
            bytes: bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response on a local port.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{}/stock.csv", addr)
    }

    fn source(url: String) -> HttpSource {
        // Local listeners must not go through a proxy taken from the environment.
        let client = Client::builder().no_proxy().build().unwrap();
        HttpSource { client, url }
    }

    #[tokio::test]
    async fn downloads_the_body() {
        let url = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 8\r\nConnection: close\r\n\r\na,b\n1,2\n").await;
        let report = source(url.clone()).fetch().await.unwrap();
        assert_eq!(report.bytes, b"a,b\n1,2\n");
        assert_eq!(report.name, url);
    }

    #[tokio::test]
    async fn error_status_is_an_invalid_response() {
        let url = serve_once("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
        match source(url.clone()).fetch().await {
            Err(SourceError::InvalidResponse { url: failed, status }) => {
                assert_eq!(status, 404);
                assert_eq!(failed, url);
            }
            other => panic!("unexpected: {:?}", other.map(|r| r.name)),
        }
    }

    #[tokio::test]
    async fn refused_connection_is_an_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = source(format!("http://{}/stock.csv", addr)).fetch().await.unwrap_err();
        assert!(matches!(err, SourceError::HttpError(_)));
    }

    #[test]
    fn builds_with_default_client() {
        assert!(HttpSource::new("https://example.com/export?format=csv").is_ok());
    }
}
