//! HTML serialisation of a [`PreviewDocument`].
//!
//! Every piece of extracted text goes through `html_escape` before it is
//! written: paragraphs, titles, cell values and filenames are content, never
//! markup. Image sources are escaped as double-quoted attribute values.

use super::{PreviewDocument, PreviewNode};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;

/// Render the preview body (no `<html>` wrapper).
pub fn to_html_fragment(doc: &PreviewDocument) -> String {
    let mut out = String::new();

    if let Some(text) = doc.placeholder() {
        let _ = writeln!(out, "<p class=\"placeholder\">{}</p>", encode_text(text));
        return out;
    }

    let mut group_open = false;
    for node in doc.nodes() {
        match node {
            PreviewNode::GroupHeader { source_filename } => {
                if group_open {
                    out.push_str("</section>\n");
                }
                out.push_str("<section class=\"source-group\">\n");
                let _ = writeln!(
                    out,
                    "<h3 class=\"group-header\">{}</h3>",
                    encode_text(&PreviewNode::header_label(source_filename))
                );
                group_open = true;
            }
            PreviewNode::Paragraph { text } => {
                let _ = writeln!(out, "<p>{}</p>", encode_text(text));
            }
            PreviewNode::Figure { title, src } => {
                out.push_str("<figure class=\"content-image\">\n");
                let _ = writeln!(out, "<h4>{}</h4>", encode_text(title));
                let _ = writeln!(
                    out,
                    "<img src=\"{}\" alt=\"{}\">",
                    encode_double_quoted_attribute(src),
                    encode_double_quoted_attribute(title)
                );
                out.push_str("</figure>\n");
            }
            PreviewNode::Table { title, columns, rows } => {
                render_table(&mut out, title, columns, rows);
            }
            PreviewNode::ItemError { title, message } => {
                out.push_str("<div class=\"item-error\">\n");
                if let Some(title) = title {
                    let _ = writeln!(out, "<h4>{}</h4>", encode_text(title));
                }
                let _ = writeln!(out, "<p>{}</p>", encode_text(message));
                out.push_str("</div>\n");
            }
        }
    }
    if group_open {
        out.push_str("</section>\n");
    }
    out
}

fn render_table(out: &mut String, title: &str, columns: &[String], rows: &[Vec<String>]) {
    out.push_str("<div class=\"content-table\">\n");
    let _ = writeln!(out, "<h4>{}</h4>", encode_text(title));
    out.push_str("<table>\n<thead>\n<tr>");
    for column in columns {
        let _ = write!(out, "<th>{}</th>", encode_text(column));
    }
    out.push_str("</tr>\n</thead>\n<tbody>\n");
    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            let _ = write!(out, "<td>{}</td>", encode_text(cell));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n</div>\n");
}

/// Render a standalone HTML page around the preview fragment.
pub fn to_html_page(doc: &PreviewDocument, page_title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n<main id=\"preview\">\n{}</main>\n</body>\n</html>\n",
        encode_text(page_title),
        PAGE_STYLE,
        to_html_fragment(doc)
    )
}

const PAGE_STYLE: &str = "body{font-family:sans-serif;max-width:60rem;margin:2rem auto}\
.group-header{border-bottom:1px solid #ccc;padding-bottom:.25rem}\
.placeholder{color:#888}\
img{max-width:100%}\
table{border-collapse:collapse}th,td{border:1px solid #999;padding:.25rem .5rem}\
.item-error{color:#a00;border:1px dashed #a00;padding:.5rem}";
