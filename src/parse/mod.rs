//! Document loading and text normalization
//!
//! Turns files on disk (plain text, Markdown, HTML) into normalized document
//! text for corpus ingestion, and provides the whitespace normalization used
//! by article extraction.

use crate::error::{Error, Result};
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use std::path::Path;

/// Collapse runs of whitespace into single spaces, preserving paragraph breaks
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { " " });
        }
        blank_run = 0;
        let mut first = true;
        for word in line.split_whitespace() {
            if !first {
                out.push(' ');
            }
            out.push_str(word);
            first = false;
        }
    }

    out
}

/// Strip decorative separator rows (50+ repeated punctuation characters)
pub fn strip_separator_rows(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let t = line.trim();
            !(t.len() >= 50 && t.chars().all(|c| "-=_*#".contains(c)))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render Markdown to plain text, keeping heading and paragraph structure
pub fn markdown_to_text(markdown: &str) -> String {
    let parser = Parser::new(markdown);
    let mut out = String::new();

    for event in parser {
        match event {
            Event::Text(t) | Event::Code(t) => out.push_str(&t),
            Event::SoftBreak => out.push(' '),
            Event::HardBreak => out.push('\n'),
            Event::Start(Tag::Paragraph | Tag::Heading { .. } | Tag::Item) => {
                if !out.is_empty() {
                    out.push('\n');
                }
            }
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::CodeBlock) => {
                out.push('\n');
            }
            _ => {}
        }
    }

    normalize_whitespace(&out)
}

/// Extract plain text from HTML
pub fn html_to_text(html: &str) -> String {
    let text = html2text::from_read(html.as_bytes(), 80).unwrap_or_else(|_| html.to_string());
    normalize_whitespace(&text)
}

/// First Markdown H1, used as a document title when present
pub fn markdown_title(markdown: &str) -> Option<String> {
    let parser = Parser::new(markdown);
    let mut in_heading = false;
    let mut title = String::new();

    for event in parser {
        match event {
            Event::Start(Tag::Heading { .. }) => in_heading = true,
            Event::Text(t) if in_heading => title.push_str(&t),
            Event::End(TagEnd::Heading(_)) => break,
            _ => {}
        }
    }

    let title = title.trim().to_string();
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Heuristic binary check: NUL bytes or mostly non-text content
pub fn is_binary_content(content: &[u8]) -> bool {
    let sample = &content[..content.len().min(8192)];
    if sample.contains(&0) {
        return true;
    }
    let non_text = sample
        .iter()
        .filter(|&&b| b < 0x09 || (b > 0x0d && b < 0x20))
        .count();
    !sample.is_empty() && non_text * 10 > sample.len()
}

/// Whether a file looks like ingestible text, by extension and MIME guess
pub fn is_text_file(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some("txt" | "md" | "markdown" | "html" | "htm" | "text") => true,
        Some(_) => mime_guess::from_path(path)
            .first()
            .map(|m| m.type_() == mime_guess::mime::TEXT)
            .unwrap_or(false),
        None => false,
    }
}

/// A file loaded and normalized for ingestion
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub title: String,
    pub text: String,
}

/// Load one file into normalized document text
pub fn load_file(path: &Path) -> Result<LoadedDocument> {
    let bytes = std::fs::read(path)?;
    if is_binary_content(&bytes) {
        return Err(Error::Parse(format!(
            "binary content: {}",
            path.display()
        )));
    }

    let raw = String::from_utf8_lossy(&bytes);
    let stem_title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .replace(['_', '-'], " ")
        .trim()
        .to_string();

    let (title, text) = match path.extension().and_then(|e| e.to_str()) {
        Some("md" | "markdown") => (
            markdown_title(&raw).unwrap_or(stem_title),
            markdown_to_text(&raw),
        ),
        Some("html" | "htm") => (stem_title, html_to_text(&raw)),
        _ => (stem_title, normalize_whitespace(&strip_separator_rows(&raw))),
    };

    Ok(LoadedDocument { title, text })
}
