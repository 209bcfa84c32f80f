//! Integration tests for `HttpExtractionService` against a local HTTP server.
//!
//! Each test binds a one-shot server on `127.0.0.1:0` that captures the raw
//! request and answers with a canned response.
//!
//! Run with:
//!   cargo test --test http_service -- --nocapture

use edgequake_pdfpreview::{
    ClientConfig, ContentItem, ExtractedDataset, ExtractionService, HttpExtractionService,
    LifecyclePhase, MemorySink, Operation, PreviewDocument, PreviewError,
    RequestLifecycleController, UploadFile,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

// ── One-shot server ──────────────────────────────────────────────────────────

struct Captured {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        header(&self.headers, name)
    }

    fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Decode a chunked body, or `None` if it is not complete yet.
fn decode_chunked(mut data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        let line_end = find(data, b"\r\n")?;
        let size_line = std::str::from_utf8(&data[..line_end]).ok()?;
        let size = usize::from_str_radix(size_line.split(';').next()?.trim(), 16).ok()?;
        data = &data[line_end + 2..];
        if size == 0 {
            return Some(out);
        }
        if data.len() < size + 2 {
            return None;
        }
        out.extend_from_slice(&data[..size]);
        data = &data[size + 2..];
    }
}

async fn read_more(stream: &mut TcpStream, buf: &mut Vec<u8>) {
    let mut chunk = [0u8; 8192];
    let n = stream.read(&mut chunk).await.unwrap();
    assert!(n > 0, "client closed the connection early");
    buf.extend_from_slice(&chunk[..n]);
}

async fn read_request(stream: &mut TcpStream) -> Captured {
    let mut buf = Vec::new();
    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        read_more(stream, &mut buf).await;
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap().split(' ');
    let method = request_line.next().unwrap().to_string();
    let path = request_line.next().unwrap().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let mut body = buf[header_end..].to_vec();
    if let Some(len) = header(&headers, "content-length") {
        let len: usize = len.parse().unwrap();
        while body.len() < len {
            read_more(stream, &mut body).await;
        }
        body.truncate(len);
    } else if header(&headers, "transfer-encoding") == Some("chunked") {
        body = loop {
            if let Some(decoded) = decode_chunked(&body) {
                break decoded;
            }
            read_more(stream, &mut body).await;
        };
    }

    Captured {
        method,
        path,
        headers,
        body,
    }
}

/// Serve exactly one request with the given response, returning the base URL
/// and a handle resolving to the captured request.
async fn serve_once(
    status: u16,
    content_type: &'static str,
    body: impl Into<Vec<u8>>,
) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = body.into();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let captured = read_request(&mut stream).await;
        let reason = match status {
            200 => "OK",
            500 => "Internal Server Error",
            _ => "Error",
        };
        let head = format!(
            "HTTP/1.1 {status} {reason}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            body.len()
        );
        stream.write_all(head.as_bytes()).await.unwrap();
        stream.write_all(&body).await.unwrap();
        stream.shutdown().await.ok();
        captured
    });
    (format!("http://{addr}"), handle)
}

fn service_for(base_url: &str) -> (ClientConfig, HttpExtractionService) {
    let config = ClientConfig::builder().base_url(base_url).request_timeout_secs(5).build().unwrap();
    let service = HttpExtractionService::new(&config).unwrap();
    (config, service)
}

fn pdf(name: &str) -> UploadFile {
    UploadFile::new(name, format!("%PDF-1.7 body of {name}").into_bytes())
}

// ── /upload-pdfs ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_sends_one_pdf_part_per_file() {
    let response = json!({"extracted_data": [
        {"source_filename": "a.pdf", "type": "text", "content": "Hello"},
        {"source_filename": "b.pdf", "type": "text", "content": "World"}
    ]});
    let (base, server) = serve_once(200, "application/json", response.to_string()).await;
    let (_, service) = service_for(&base);

    let files = vec![pdf("a.pdf"), pdf("b.pdf")];
    let dataset = service.extract(&files).await.unwrap();
    let req = server.await.unwrap();

    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/upload-pdfs");
    let content_type = req.header("content-type").unwrap();
    let boundary = content_type
        .strip_prefix("multipart/form-data; boundary=")
        .expect("multipart content type");

    let body = req.body_text();
    assert_eq!(body.matches(&format!("--{boundary}\r\n")).count(), 2);
    assert_eq!(body.matches("name=\"pdfFile\"").count(), 2);
    assert!(body.contains("filename=\"a.pdf\""));
    assert!(body.contains("filename=\"b.pdf\""));
    assert_eq!(body.to_ascii_lowercase().matches("content-type: application/pdf").count(), 2);
    assert!(body.contains("%PDF-1.7 body of b.pdf"));

    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.items()[1].source_filename(), "b.pdf");
}

#[tokio::test]
async fn upload_error_field_is_used_verbatim() {
    let (base, server) = serve_once(500, "application/json", r#"{"error":"disk full"}"#).await;
    let (_, service) = service_for(&base);

    let err = service.extract(&[pdf("a.pdf")]).await.unwrap_err();
    server.await.unwrap();

    match err {
        PreviewError::Service { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "disk full");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn upload_without_error_body_reports_status() {
    let (base, server) = serve_once(502, "text/html", "<html>Bad Gateway</html>").await;
    let (_, service) = service_for(&base);

    let err = service.extract(&[pdf("a.pdf")]).await.unwrap_err();
    server.await.unwrap();

    assert_eq!(err.to_string(), "HTTP error! status: 502");
}

#[tokio::test]
async fn upload_success_with_undecodable_body_is_invalid_response() {
    let (base, server) = serve_once(200, "text/plain", "not json").await;
    let (_, service) = service_for(&base);

    let err = service.extract(&[pdf("a.pdf")]).await.unwrap_err();
    server.await.unwrap();

    assert!(matches!(
        err,
        PreviewError::InvalidResponse {
            operation: Operation::Extract,
            ..
        }
    ));
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let (_, service) = service_for(&format!("http://{addr}"));

    let err = service.extract(&[pdf("a.pdf")]).await.unwrap_err();

    assert!(matches!(
        err,
        PreviewError::Transport {
            operation: Operation::Extract,
            ..
        }
    ));
}

// ── /generate-pdf ────────────────────────────────────────────────────────────

#[tokio::test]
async fn generate_posts_json_and_returns_pdf_bytes() {
    let pdf_bytes: Vec<u8> = b"%PDF-1.4\n\x00\xff\xfe binary tail".to_vec();
    let (base, server) = serve_once(200, "application/pdf", pdf_bytes.clone()).await;
    let (_, service) = service_for(&base);

    let raw_item = json!({"source_filename": "a.pdf", "type": "chart", "title": null, "page": 2});
    let dataset = ExtractedDataset::new(vec![
        ContentItem::text("a.pdf", "Hello"),
        ContentItem::from_value(raw_item.clone()),
    ]);
    let bytes = service.generate(&dataset).await.unwrap();
    let req = server.await.unwrap();

    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/generate-pdf");
    assert!(req.header("content-type").unwrap().starts_with("application/json"));
    let sent: Value = serde_json::from_slice(&req.body).unwrap();
    assert_eq!(
        sent,
        json!({"extracted_data": [
            {"source_filename": "a.pdf", "type": "text", "content": "Hello"},
            raw_item
        ]})
    );
    assert_eq!(bytes, pdf_bytes);
}

#[tokio::test]
async fn generate_error_field_is_used_verbatim() {
    let (base, server) = serve_once(500, "application/json", r#"{"error":"render failed"}"#).await;
    let (_, service) = service_for(&base);

    let dataset = ExtractedDataset::new(vec![ContentItem::text("a.pdf", "Hello")]);
    let err = service.generate(&dataset).await.unwrap_err();
    server.await.unwrap();

    assert!(matches!(err, PreviewError::Service { status: 500, .. }));
    assert_eq!(err.to_string(), "render failed");
}

// ── Through the controller ───────────────────────────────────────────────────

#[tokio::test]
async fn disk_full_reaches_the_status_line() {
    let (base, server) = serve_once(500, "application/json", r#"{"error":"disk full"}"#).await;
    let (config, service) = service_for(&base);
    let mut controller = RequestLifecycleController::new(config, Arc::new(service), PreviewDocument::new())
        .with_sink(Arc::new(MemorySink::new()));

    let err = controller.request_extraction(vec![pdf("a.pdf")]).await.unwrap_err();
    server.await.unwrap();

    assert!(matches!(err, PreviewError::Service { status: 500, .. }));
    assert_eq!(controller.phase(), LifecyclePhase::Idle);
    assert!(controller.status().unwrap().text.contains("disk full"));
    assert!(!controller.can_download());
}
