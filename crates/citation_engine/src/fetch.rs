use std::path::Path;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use futures_util::StreamExt;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};

use crate::decode::decode_html;
use crate::types::{DocumentMetadata, FailureKind, FetchError, FetchedDocument};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 10 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
            user_agent: concat!("cite-harvest/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Supplies the HTML of a conversation page. The extractor never sees how the
/// document was obtained.
#[async_trait::async_trait]
pub trait DocumentProvider: Send + Sync {
    async fn fetch_document(&self, source: &str) -> Result<FetchedDocument, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpDocumentProvider {
    settings: FetchSettings,
}

impl HttpDocumentProvider {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn build_client(
        &self,
        redirect_counter: Arc<AtomicUsize>,
    ) -> Result<reqwest::Client, FetchError> {
        let redirect_limit = self.settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            let count = attempt.previous().len();
            redirect_counter.store(count, Ordering::Relaxed);
            if count >= redirect_limit {
                attempt.error("redirect limit exceeded")
            } else {
                attempt.follow()
            }
        });

        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(policy)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ct))
    }

    fn too_large(&self, actual: u64) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl DocumentProvider for HttpDocumentProvider {
    async fn fetch_document(&self, url: &str) -> Result<FetchedDocument, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let redirect_counter = Arc::new(AtomicUsize::new(0));
        let client = self.build_client(redirect_counter.clone())?;

        let response = client
            .get(parsed)
            .header(USER_AGENT, self.settings.user_agent.as_str())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct) {
                return Err(FetchError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(next_len));
            }
            bytes.extend_from_slice(&chunk);
        }
        engine_debug!("Downloaded {} bytes from {}", bytes.len(), final_url);

        let decoded = decode_html(&bytes, content_type.as_deref())
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))?;

        let metadata = DocumentMetadata {
            source: url.to_string(),
            final_url: Some(final_url),
            redirect_count: redirect_counter.load(Ordering::Relaxed),
            content_type,
            encoding_label: decoded.encoding_label,
            byte_len: bytes.len() as u64,
        };
        engine_info!(
            "Fetched {} ({} bytes, {}, {} redirects)",
            metadata.source,
            metadata.byte_len,
            metadata.encoding_label,
            metadata.redirect_count
        );

        Ok(FetchedDocument {
            html: decoded.html,
            metadata,
        })
    }
}

/// Reads a page that was already rendered and saved to disk, e.g. from a
/// browser's "save page as".
#[derive(Debug, Clone)]
pub struct FileDocumentProvider {
    max_bytes: u64,
}

impl FileDocumentProvider {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }
}

impl Default for FileDocumentProvider {
    fn default() -> Self {
        Self::new(FetchSettings::default().max_bytes)
    }
}

#[async_trait::async_trait]
impl DocumentProvider for FileDocumentProvider {
    async fn fetch_document(&self, path: &str) -> Result<FetchedDocument, FetchError> {
        let path = Path::new(path);
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| FetchError::new(FailureKind::Io, format!("{}: {err}", path.display())))?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(FetchError::new(
                FailureKind::TooLarge {
                    max_bytes: self.max_bytes,
                    actual: Some(bytes.len() as u64),
                },
                "file too large",
            ));
        }

        let decoded = decode_html(&bytes, None)
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))?;
        engine_info!(
            "Read {} ({} bytes, {})",
            path.display(),
            bytes.len(),
            decoded.encoding_label
        );

        Ok(FetchedDocument {
            html: decoded.html,
            metadata: DocumentMetadata {
                source: path.display().to_string(),
                final_url: None,
                redirect_count: 0,
                content_type: None,
                encoding_label: decoded.encoding_label,
                byte_len: bytes.len() as u64,
            },
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
