//! Preview rendering: turn an [`ExtractedDataset`] into display nodes.
//!
//! ## Data Flow
//!
//! ```text
//! ExtractedDataset ──▶ source runs ──▶ classify ──▶ PreviewNode ──▶ DisplaySurface
//!                      (headers)       (closed enum)              (commit once)
//! ```
//!
//! Every render starts from the placeholder state and builds the complete
//! node list before handing it to the surface, so a surface never shows a
//! mix of old and new content, and an aborted render leaves only the
//! placeholder behind.
//!
//! Grouping is by adjacency only: the renderer never sorts by filename, it
//! emits a `Content from: <file>` header whenever the source changes.

pub mod html;

use crate::config::TableErrorPolicy;
use crate::error::{ItemError, PreviewError};
use crate::model::{ContentBlock, ExtractedDataset};
use serde::Serialize;
use std::borrow::Cow;
use tracing::{debug, warn};

/// One element of the rendered preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum PreviewNode {
    /// Marks the start of a run of items from one source document.
    GroupHeader { source_filename: String },
    /// Literal text; surfaces must never interpret it as markup.
    Paragraph { text: String },
    /// A titled image.
    Figure { title: String, src: String },
    /// A titled table with a header row and positionally-aligned body rows.
    Table {
        title: String,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Stand-in for an item whose payload could not be rendered.
    ItemError {
        title: Option<String>,
        message: String,
    },
}

impl PreviewNode {
    /// Label shown for a group header.
    pub fn header_label(source_filename: &str) -> String {
        format!("Content from: {source_filename}")
    }

    /// Whether this node represents a dataset item (as opposed to a header).
    pub fn is_item_block(&self) -> bool {
        !matches!(self, PreviewNode::GroupHeader { .. })
    }
}

/// Where rendered previews are displayed.
///
/// Implementations only have to support two transitions: back to the
/// placeholder, and from the placeholder to a complete node list.
pub trait DisplaySurface {
    /// Drop all content and show the placeholder text.
    fn show_placeholder(&mut self, text: &str);

    /// Replace the placeholder with a fully built preview.
    fn commit(&mut self, nodes: Vec<PreviewNode>);
}

/// In-memory display surface; serialise it with [`html`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreviewDocument {
    placeholder: Option<String>,
    nodes: Vec<PreviewNode>,
}

impl PreviewDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Placeholder text, if the preview is currently empty.
    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    pub fn nodes(&self) -> &[PreviewNode] {
        &self.nodes
    }

    /// Header labels in display order.
    pub fn group_headers(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                PreviewNode::GroupHeader { source_filename } => Some(source_filename.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Number of item blocks (everything except headers).
    pub fn block_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_item_block()).count()
    }
}

impl DisplaySurface for PreviewDocument {
    fn show_placeholder(&mut self, text: &str) {
        self.nodes.clear();
        self.placeholder = Some(text.to_string());
    }

    fn commit(&mut self, nodes: Vec<PreviewNode>) {
        self.placeholder = None;
        self.nodes = nodes;
    }
}

/// An item the renderer intentionally produced no output for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedItem {
    pub index: usize,
    pub kind: String,
}

/// What one render call produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderSummary {
    /// Number of `Content from:` headers emitted.
    pub group_headers: usize,
    /// Number of item blocks emitted, error placeholders included.
    pub blocks: usize,
    /// Items with an unrecognised kind.
    pub skipped: Vec<SkippedItem>,
    /// Items replaced by an error placeholder.
    pub failed: Vec<ItemError>,
}

/// Renders datasets onto a [`DisplaySurface`].
#[derive(Debug)]
pub struct ContentRenderer<S: DisplaySurface> {
    surface: S,
    placeholder: String,
    table_errors: TableErrorPolicy,
}

impl<S: DisplaySurface> ContentRenderer<S> {
    /// Create a renderer and put the surface into the placeholder state.
    pub fn new(mut surface: S, placeholder: impl Into<String>, table_errors: TableErrorPolicy) -> Self {
        let placeholder = placeholder.into();
        surface.show_placeholder(&placeholder);
        Self {
            surface,
            placeholder,
            table_errors,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Reset the surface to the placeholder state.
    pub fn clear(&mut self) {
        self.surface.show_placeholder(&self.placeholder);
    }

    /// Rebuild the preview from `dataset`.
    ///
    /// # Errors
    /// [`PreviewError::MalformedItem`] when an item's payload is malformed and
    /// the policy is [`TableErrorPolicy::Abort`]; the surface is then left in
    /// the placeholder state.
    pub fn render(&mut self, dataset: &ExtractedDataset) -> Result<RenderSummary, PreviewError> {
        self.clear();

        let mut nodes = Vec::with_capacity(dataset.len() + 4);
        let mut summary = RenderSummary::default();

        for (start, run) in dataset.source_runs() {
            nodes.push(PreviewNode::GroupHeader {
                source_filename: run[0].source_filename().into_owned(),
            });
            summary.group_headers += 1;

            for (offset, item) in run.iter().enumerate() {
                let index = start + offset;
                match item.classify(index) {
                    Ok(Some(block)) => {
                        nodes.push(block_node(block));
                        summary.blocks += 1;
                    }
                    Ok(None) => {
                        let kind = item.kind_label();
                        debug!("Item {}: skipping unrecognised type '{}'", index, kind);
                        summary.skipped.push(SkippedItem { index, kind });
                    }
                    Err(err) => match self.table_errors {
                        TableErrorPolicy::Abort => {
                            warn!("Aborting render: {}", err);
                            return Err(err.into());
                        }
                        TableErrorPolicy::Isolate => {
                            warn!("{}", err);
                            nodes.push(PreviewNode::ItemError {
                                title: item.title().map(Cow::into_owned),
                                message: format!("Could not display this {}: {}", item.kind_label(), detail_of(&err)),
                            });
                            summary.blocks += 1;
                            summary.failed.push(err);
                        }
                    },
                }
            }
        }

        if nodes.is_empty() {
            return Ok(summary);
        }

        debug!(
            "Rendered {} blocks under {} headers ({} skipped, {} failed)",
            summary.blocks,
            summary.group_headers,
            summary.skipped.len(),
            summary.failed.len()
        );
        self.surface.commit(nodes);
        Ok(summary)
    }
}

fn block_node(block: ContentBlock<'_>) -> PreviewNode {
    match block {
        ContentBlock::Text { text } => PreviewNode::Paragraph {
            text: text.into_owned(),
        },
        ContentBlock::Image { title, src } => PreviewNode::Figure {
            title: title.into_owned(),
            src: src.to_string(),
        },
        ContentBlock::Table { title, table } => PreviewNode::Table {
            title: title.into_owned(),
            columns: table.header_cells(),
            rows: table.body_rows(),
        },
    }
}

fn detail_of(err: &ItemError) -> &str {
    match err {
        ItemError::Malformed { detail, .. } => detail,
    }
}
