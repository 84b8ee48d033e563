//! Loading documents from disk or over HTTP.

use crate::error::{ConversionError, SourceError};
use crate::html::html_to_graph;
use crate::ids::IdSource;
use crate::json::json_to_graph;
use crate::model::Graph;
use crate::traffic::{TrafficRecord, parse_traffic, traffic_to_graph};
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    #[default]
    Auto,
    Html,
    Json,
    Traffic,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Auto => "auto",
            DocumentFormat::Html => "html",
            DocumentFormat::Json => "json",
            DocumentFormat::Traffic => "traffic",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(DocumentFormat::Auto),
            "html" | "htm" => Ok(DocumentFormat::Html),
            "json" => Ok(DocumentFormat::Json),
            "traffic" => Ok(DocumentFormat::Traffic),
            other => Err(format!("Unknown document format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Html(String),
    Json(Value),
    Traffic(Vec<TrafficRecord>),
}

impl Document {
    pub fn format(&self) -> DocumentFormat {
        match self {
            Document::Html(_) => DocumentFormat::Html,
            Document::Json(_) => DocumentFormat::Json,
            Document::Traffic(_) => DocumentFormat::Traffic,
        }
    }

    /// Run the walker that fits this document.
    pub fn to_graph<I: IdSource + ?Sized>(&self, ids: &mut I) -> Graph {
        match self {
            Document::Html(html) => html_to_graph(html, ids).graph,
            Document::Json(value) => json_to_graph(value, ids).graph,
            Document::Traffic(records) => traffic_to_graph(records, ids),
        }
    }
}

pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Decide what `text` is.
///
/// An explicit format wins. Otherwise the content type, then the file
/// extension are consulted, and as a last resort the text is tried as JSON
/// before being treated as HTML. A JSON array of request/response records
/// is taken for recorded traffic.
pub fn classify(
    text: &str,
    format: DocumentFormat,
    content_type: Option<&str>,
    name: Option<&str>,
) -> Result<Document, ConversionError> {
    match format {
        DocumentFormat::Html => return Ok(Document::Html(text.to_string())),
        DocumentFormat::Json => {
            let value = serde_json::from_str(text).map_err(ConversionError::InvalidJson)?;
            return Ok(Document::Json(value));
        }
        DocumentFormat::Traffic => return parse_traffic(text).map(Document::Traffic),
        DocumentFormat::Auto => {}
    }

    let content_type = content_type.map(str::to_lowercase).unwrap_or_default();
    let extension = name
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    if content_type.contains("html") || extension == "html" || extension == "htm" {
        return Ok(Document::Html(text.to_string()));
    }

    let declared_json = content_type.contains("json") || extension == "json";
    match serde_json::from_str::<Value>(text) {
        Ok(value) if looks_like_traffic(&value) => {
            let records = serde_json::from_value(value).map_err(ConversionError::InvalidTraffic)?;
            Ok(Document::Traffic(records))
        }
        Ok(value) => Ok(Document::Json(value)),
        Err(e) if declared_json => Err(ConversionError::InvalidJson(e)),
        Err(_) => Ok(Document::Html(text.to_string())),
    }
}

fn looks_like_traffic(value: &Value) -> bool {
    match value {
        Value::Array(items) if !items.is_empty() => items.iter().all(|item| {
            item.as_object()
                .is_some_and(|o| o.contains_key("request") && o.contains_key("response"))
        }),
        _ => false,
    }
}

pub async fn load_file(path: &Path, format: DocumentFormat) -> Result<Document, SourceError> {
    let text = tokio::fs::read_to_string(path).await?;
    debug!("Read {} bytes from {}", text.len(), path.display());
    let name = path.file_name().and_then(|n| n.to_str());
    Ok(classify(&text, format, None, name)?)
}

/// Fetches documents over HTTP(S).
pub struct DocumentSource {
    client: Client,
}

impl DocumentSource {
    pub fn new() -> Result<Self, SourceError> {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(concat!("docgraph/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str, format: DocumentFormat) -> Result<Document, SourceError> {
        let parsed = Url::parse(url).map_err(|e| SourceError::InvalidUrl(format!("{}: {}", url, e)))?;

        info!("Fetching {}", parsed);
        let response = self.client.get(parsed.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.text().await?;
        debug!(
            "Fetched {} bytes ({})",
            body.len(),
            content_type.as_deref().unwrap_or("no content type")
        );

        let name = parsed.path_segments().and_then(|mut s| s.next_back());
        Ok(classify(&body, format, content_type.as_deref(), name)?)
    }

    /// Load `input`, fetching it when it is an http(s) URL and reading it
    /// from disk otherwise.
    pub async fn load(&self, input: &str, format: DocumentFormat) -> Result<Document, SourceError> {
        if is_url(input) {
            self.fetch(input, format).await
        } else {
            load_file(Path::new(input), format).await
        }
    }
}
