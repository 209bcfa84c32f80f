//! Extracted content as returned by the service.
//!
//! [`ContentItem`] keeps each wire object exactly as received, so what goes
//! back to `/generate-pdf` is what came from `/upload-pdfs`. Fields are read
//! through lenient accessors: a missing or mistyped field never fails
//! decoding, it only makes that one item unrenderable. Rendering goes through
//! [`ContentItem::classify`], which yields the closed [`ContentBlock`] enum.

use crate::error::{ItemError, PreviewError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::path::Path;

static NULL: Value = Value::Null;

/// One unit of extracted content, tagged with its source document.
///
/// Any JSON value decodes. Items without a recognised string `type` are
/// skipped by the renderer but still travel with the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentItem {
    raw: Value,
}

/// The closed set of item kinds the renderer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Image,
    Table,
}

impl ContentKind {
    /// Map a wire discriminator to a kind. Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(ContentKind::Text),
            "image" => Some(ContentKind::Image),
            "table" => Some(ContentKind::Table),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Image => "image",
            ContentKind::Table => "table",
        }
    }
}

/// Typed view of a [`ContentItem`], carrying exactly what each kind needs.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock<'a> {
    Text { text: Cow<'a, str> },
    Image { title: Cow<'a, str>, src: &'a str },
    Table { title: Cow<'a, str>, table: TablePayload },
}

impl ContentItem {
    pub fn text(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(source, ContentKind::Text, None, Value::String(text.into()))
    }

    pub fn image(source: impl Into<String>, title: impl Into<String>, src: impl Into<String>) -> Self {
        Self::new(source, ContentKind::Image, Some(title.into()), Value::String(src.into()))
    }

    /// A table item whose content is the serialised `{columns, data}` string.
    pub fn table(source: impl Into<String>, title: impl Into<String>, table: &TablePayload) -> Self {
        let content = serde_json::to_string(table).unwrap_or_default();
        Self::new(source, ContentKind::Table, Some(title.into()), Value::String(content))
    }

    fn new(source: impl Into<String>, kind: ContentKind, title: Option<String>, content: Value) -> Self {
        let mut obj = Map::new();
        obj.insert("source_filename".into(), Value::String(source.into()));
        obj.insert("type".into(), Value::String(kind.as_str().into()));
        if let Some(title) = title {
            obj.insert("title".into(), Value::String(title));
        }
        obj.insert("content".into(), content);
        Self { raw: Value::Object(obj) }
    }

    /// Wrap a wire value as-is.
    pub fn from_value(raw: Value) -> Self {
        Self { raw }
    }

    /// The wire value, unchanged.
    pub fn as_value(&self) -> &Value {
        &self.raw
    }

    /// Any key of the wire object (page numbers, captions, …).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    /// Document that produced this item. Used only for grouping.
    ///
    /// Missing or `null` reads as empty; other non-strings as their JSON text.
    pub fn source_filename(&self) -> Cow<'_, str> {
        lenient_str(self.raw.get("source_filename")).unwrap_or(Cow::Borrowed(""))
    }

    /// The `type` discriminator, if it is a string.
    pub fn kind(&self) -> Option<&str> {
        self.raw.get("type").and_then(Value::as_str)
    }

    /// The discriminator as shown in logs and skip reports.
    pub fn kind_label(&self) -> String {
        match self.raw.get("type") {
            Some(Value::String(s)) => s.clone(),
            None | Some(Value::Null) => "<missing>".to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// Label for image and table items.
    pub fn title(&self) -> Option<Cow<'_, str>> {
        lenient_str(self.raw.get("title"))
    }

    /// Payload, interpreted according to the kind. Missing reads as `null`.
    pub fn content(&self) -> &Value {
        self.raw.get("content").unwrap_or(&NULL)
    }

    /// The parsed discriminator, if it is one the renderer knows.
    pub fn content_kind(&self) -> Option<ContentKind> {
        self.kind().and_then(ContentKind::parse)
    }

    /// Interpret this item's payload according to its kind.
    ///
    /// Returns `Ok(None)` for unknown kinds (they are skipped, not errors),
    /// and an [`ItemError`] when the payload does not fit the kind. `index`
    /// is the item's position in the dataset, used in the error.
    pub fn classify(&self, index: usize) -> Result<Option<ContentBlock<'_>>, ItemError> {
        let Some(kind) = self.content_kind() else {
            return Ok(None);
        };
        let title = self.title().unwrap_or(Cow::Borrowed(""));
        let content = self.content();
        let block = match kind {
            ContentKind::Text => ContentBlock::Text {
                text: match content {
                    Value::String(s) => Cow::Borrowed(s.as_str()),
                    Value::Null => Cow::Borrowed(""),
                    other => Cow::Owned(other.to_string()),
                },
            },
            ContentKind::Image => match content {
                Value::String(src) if !src.trim().is_empty() => ContentBlock::Image { title, src },
                other => {
                    return Err(malformed(
                        index,
                        kind,
                        format!("expected an image reference string, got {}", json_type(other)),
                    ))
                }
            },
            ContentKind::Table => ContentBlock::Table {
                title,
                table: TablePayload::from_content(content).map_err(|detail| malformed(index, kind, detail))?,
            },
        };
        Ok(Some(block))
    }
}

fn malformed(index: usize, kind: ContentKind, detail: String) -> ItemError {
    ItemError::Malformed {
        index,
        kind: kind.as_str().to_string(),
        detail,
    }
}

fn lenient_str(v: Option<&Value>) -> Option<Cow<'_, str>> {
    match v {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(Cow::Borrowed(s.as_str())),
        Some(other) => Some(Cow::Owned(other.to_string())),
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "an empty string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Deserialised table content: column names plus positionally-aligned rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TablePayload {
    pub columns: Vec<Value>,
    pub data: Vec<Vec<Value>>,
}

impl TablePayload {
    pub fn new<C, R>(columns: impl IntoIterator<Item = C>, data: impl IntoIterator<Item = R>) -> Self
    where
        C: Into<Value>,
        R: IntoIterator,
        R::Item: Into<Value>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            data: data
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Decode a table payload that is either a JSON string or an inline object.
    pub fn from_content(content: &Value) -> Result<Self, String> {
        match content {
            Value::String(s) => serde_json::from_str(s).map_err(|e| e.to_string()),
            Value::Object(_) => serde_json::from_value(content.clone()).map_err(|e| e.to_string()),
            other => Err(format!("expected a serialised table, got {}", json_type(other))),
        }
    }

    /// Header cells in column order.
    pub fn header_cells(&self) -> Vec<String> {
        self.columns.iter().map(cell_text).collect()
    }

    /// Body rows in data order, each padded with empty cells up to the column count.
    pub fn body_rows(&self) -> Vec<Vec<String>> {
        let width = self.columns.len();
        self.data
            .iter()
            .map(|row| {
                let mut cells: Vec<String> = row.iter().map(cell_text).collect();
                if cells.len() < width {
                    cells.resize(width, String::new());
                }
                cells
            })
            .collect()
    }
}

/// Display text of a table cell: strings unquoted, `null` empty, everything else as JSON.
pub fn cell_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// The ordered item list from one successful extraction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedDataset {
    items: Vec<ContentItem>,
}

impl ExtractedDataset {
    pub fn new(items: Vec<ContentItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ContentItem> {
        self.items.iter()
    }

    /// Maximal runs of adjacent items sharing a `source_filename`, in input order.
    ///
    /// Each run is `(start_index, items)`. A file that reappears after another
    /// file's items starts a new run.
    pub fn source_runs(&self) -> Vec<(usize, &[ContentItem])> {
        let mut runs = Vec::new();
        let mut start = 0;
        for i in 1..=self.items.len() {
            let boundary = i == self.items.len()
                || self.items[i].source_filename() != self.items[i - 1].source_filename();
            if boundary {
                runs.push((start, &self.items[start..i]));
                start = i;
            }
        }
        runs
    }
}

impl From<Vec<ContentItem>> for ExtractedDataset {
    fn from(items: Vec<ContentItem>) -> Self {
        Self::new(items)
    }
}

impl<'a> IntoIterator for &'a ExtractedDataset {
    type Item = &'a ContentItem;
    type IntoIter = std::slice::Iter<'a, ContentItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// One file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk; the upload name is the path's file name.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, PreviewError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => PreviewError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => PreviewError::FileNotFound {
                path: path.to_path_buf(),
            },
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());
        Ok(Self { name, bytes })
    }

    /// Whether the bytes start with the `%PDF` magic.
    pub fn is_pdf(&self) -> bool {
        self.bytes.starts_with(b"%PDF")
    }

    /// First (up to) four bytes, for diagnostics.
    pub fn magic(&self) -> Vec<u8> {
        self.bytes.iter().take(4).copied().collect()
    }
}
