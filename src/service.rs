//! The remote extraction/generation service boundary.
//!
//! [`ExtractionService`] is the seam between the lifecycle controller and the
//! network. [`HttpExtractionService`] is the production implementation; tests
//! substitute an in-process double.
//!
//! ## Wire contract
//!
//! | Endpoint | Request | 2xx body |
//! |----------|---------|----------|
//! | `POST /upload-pdfs`  | multipart, one part per file under a shared field | `{ "extracted_data": [...] }` |
//! | `POST /generate-pdf` | JSON `{ "extracted_data": [...] }` | PDF bytes |
//!
//! Non-2xx responses carry `{ "error": "..." }`, used verbatim; without it
//! the message falls back to `HTTP error! status: <code>`.

use crate::config::ClientConfig;
use crate::error::{Operation, PreviewError};
use crate::model::{ContentItem, ExtractedDataset, UploadFile};
use futures::future::BoxFuture;
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Extraction and generation operations offered by the remote service.
pub trait ExtractionService: Send + Sync {
    /// Upload `files` and return the extracted item list.
    fn extract<'a>(&'a self, files: &'a [UploadFile]) -> BoxFuture<'a, Result<ExtractedDataset, PreviewError>>;

    /// Regenerate a PDF from a previously extracted dataset.
    fn generate<'a>(&'a self, dataset: &'a ExtractedDataset) -> BoxFuture<'a, Result<Vec<u8>, PreviewError>>;
}

/// Success body of `/upload-pdfs`.
#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    extracted_data: Option<Vec<ContentItem>>,
}

/// Request body of `/generate-pdf`.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    extracted_data: &'a ExtractedDataset,
}

/// Failure body of either endpoint.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// [`ExtractionService`] over HTTP, backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpExtractionService {
    client: reqwest::Client,
    upload_url: Url,
    generate_url: Url,
    file_field: String,
    timeout_secs: u64,
}

impl HttpExtractionService {
    pub fn new(config: &ClientConfig) -> Result<Self, PreviewError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| PreviewError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            upload_url: config.upload_url()?,
            generate_url: config.generate_url()?,
            file_field: config.file_field.clone(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    async fn upload(&self, files: &[UploadFile]) -> Result<ExtractedDataset, PreviewError> {
        let op = Operation::Extract;
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.name.clone())
                .mime_str("application/pdf")
                .map_err(|e| PreviewError::Internal(e.to_string()))?;
            form = form.part(self.file_field.clone(), part);
        }

        info!("Uploading {} file(s) to {}", files.len(), self.upload_url);
        let response = self
            .client
            .post(self.upload_url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| PreviewError::from_reqwest(op, self.timeout_secs, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| PreviewError::from_reqwest(op, self.timeout_secs, e))?;
        if !status.is_success() {
            return Err(service_error(status, &body));
        }

        let dataset = parse_extract_body(&body)?;
        debug!("Extraction returned {} items", dataset.len());
        Ok(dataset)
    }

    async fn regenerate(&self, dataset: &ExtractedDataset) -> Result<Vec<u8>, PreviewError> {
        let op = Operation::Generate;
        info!("Requesting PDF for {} items from {}", dataset.len(), self.generate_url);
        let response = self
            .client
            .post(self.generate_url.clone())
            .json(&GenerateRequest {
                extracted_data: dataset,
            })
            .send()
            .await
            .map_err(|e| PreviewError::from_reqwest(op, self.timeout_secs, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| PreviewError::from_reqwest(op, self.timeout_secs, e))?;
        if !status.is_success() {
            return Err(service_error(status, &body));
        }
        debug!("Generated PDF is {} bytes", body.len());
        Ok(body.to_vec())
    }
}

impl ExtractionService for HttpExtractionService {
    fn extract<'a>(&'a self, files: &'a [UploadFile]) -> BoxFuture<'a, Result<ExtractedDataset, PreviewError>> {
        Box::pin(self.upload(files))
    }

    fn generate<'a>(&'a self, dataset: &'a ExtractedDataset) -> BoxFuture<'a, Result<Vec<u8>, PreviewError>> {
        Box::pin(self.regenerate(dataset))
    }
}

/// Decode a 2xx `/upload-pdfs` body. A missing or `null` `extracted_data` is an
/// empty result; individual items are never rejected here.
pub fn parse_extract_body(body: &[u8]) -> Result<ExtractedDataset, PreviewError> {
    serde_json::from_slice::<ExtractResponse>(body)
        .map(|r| ExtractedDataset::new(r.extracted_data.unwrap_or_default()))
        .map_err(|e| PreviewError::InvalidResponse {
            operation: Operation::Extract,
            detail: e.to_string(),
        })
}

/// Build the error for a non-2xx response.
pub fn service_error(status: StatusCode, body: &[u8]) -> PreviewError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
    PreviewError::Service {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_field_is_used_verbatim() {
        let e = service_error(StatusCode::INTERNAL_SERVER_ERROR, br#"{"error":"disk full"}"#);
        match e {
            PreviewError::Service { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "disk full");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_or_blank_error_falls_back_to_status() {
        let bodies: [&[u8]; 4] = [b"", b"<html>Bad Gateway</html>", br#"{"error":"  "}"#, br#"{"detail":"x"}"#];
        for body in bodies {
            let e = service_error(StatusCode::BAD_GATEWAY, body);
            assert_eq!(e.to_string(), "HTTP error! status: 502");
        }
    }

    #[test]
    fn extract_body_parses_items_in_order() {
        let body = json!({
            "extracted_data": [
                {"source_filename": "a.pdf", "type": "text", "content": "Hello"},
                {"source_filename": "b.pdf", "type": "image", "title": "Fig", "content": "data:,"}
            ]
        });
        let ds = parse_extract_body(body.to_string().as_bytes()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.items()[0].source_filename(), "a.pdf");
        assert_eq!(ds.items()[1].kind(), Some("image"));
    }

    #[test]
    fn one_malformed_item_does_not_reject_the_body() {
        let body = json!({
            "extracted_data": [
                {"source_filename": "a.pdf", "type": "text", "content": "Hello"},
                {"source_filename": "a.pdf", "content": "no type"},
                {"source_filename": "a.pdf", "type": "chart", "title": 7},
                {"source_filename": "a.pdf", "type": "text", "content": "Foo"}
            ]
        });
        let ds = parse_extract_body(body.to_string().as_bytes()).unwrap();
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.items()[1].content_kind(), None);
        assert_eq!(ds.items()[2].title().as_deref(), Some("7"));
        assert_eq!(serde_json::to_value(&ds).unwrap(), body["extracted_data"]);
    }

    #[test]
    fn extract_body_without_key_is_empty() {
        assert!(parse_extract_body(b"{}").unwrap().is_empty());
        assert!(parse_extract_body(br#"{"extracted_data": null}"#).unwrap().is_empty());
    }

    #[test]
    fn extract_body_not_json_is_invalid_response() {
        let e = parse_extract_body(b"%PDF-1.4").unwrap_err();
        assert!(matches!(e, PreviewError::InvalidResponse { operation: Operation::Extract, .. }));
    }

    #[test]
    fn generate_request_wraps_dataset() {
        let ds = ExtractedDataset::new(vec![ContentItem::text("a.pdf", "Hello")]);
        let body = serde_json::to_value(GenerateRequest { extracted_data: &ds }).unwrap();
        assert_eq!(
            body,
            json!({"extracted_data": [{"source_filename": "a.pdf", "type": "text", "content": "Hello"}]})
        );
    }

    #[test]
    fn http_service_builds_from_default_config() {
        let svc = HttpExtractionService::new(&ClientConfig::default()).unwrap();
        assert_eq!(svc.upload_url.path(), "/upload-pdfs");
        assert_eq!(svc.generate_url.path(), "/generate-pdf");
        assert_eq!(svc.file_field, "pdfFile");
    }
}
