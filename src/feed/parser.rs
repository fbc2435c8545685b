//! RSS 2.0 / Atom feed parsing
//!
//! Event-driven parsing over `quick-xml`; lenient by design. Anything that
//! fails to parse yields whatever entries were readable before the error,
//! since a malformed feed must degrade, never raise.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One entry as read off the wire, before scoring
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published: Option<String>,
}

/// Fields we capture text for while inside an item/entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Summary,
    Content,
    Published,
    Updated,
}

fn field_for(name: &[u8]) -> Option<Field> {
    match name {
        b"title" => Some(Field::Title),
        b"link" => Some(Field::Link),
        b"description" | b"summary" => Some(Field::Summary),
        b"content" | b"encoded" => Some(Field::Content),
        b"pubDate" | b"published" | b"date" => Some(Field::Published),
        b"updated" => Some(Field::Updated),
        _ => None,
    }
}

/// Parse an RSS or Atom document into raw entries, in document order
pub fn parse_feed(xml: &str) -> Vec<RawEntry> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut in_entry = false;
    let mut current = RawEntry::default();
    let mut content = String::new();
    let mut updated = String::new();
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"item" | b"entry" => {
                        in_entry = true;
                        current = RawEntry::default();
                        content.clear();
                        updated.clear();
                    }
                    other if in_entry => {
                        field = field_for(other);
                        if field == Some(Field::Link) {
                            // Atom puts the URL in an href attribute
                            if let Some(href) = atom_link_href(e) {
                                current.link = href;
                                field = None;
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(ref e)) => {
                if in_entry && e.local_name().as_ref() == b"link" {
                    if let Some(href) = atom_link_href(e) {
                        if current.link.is_empty() {
                            current.link = href;
                        }
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(f) = field {
                    let text = t.unescape().unwrap_or_default();
                    append_field(&mut current, &mut content, &mut updated, f, &text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(f) = field {
                    let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                    append_field(&mut current, &mut content, &mut updated, f, &text);
                }
            }
            Ok(Event::End(ref e)) => {
                match e.local_name().as_ref() {
                    b"item" | b"entry" => {
                        if in_entry {
                            finish_entry(&mut entries, &mut current, &content, &updated);
                        }
                        in_entry = false;
                    }
                    _ => field = None,
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break, // lenient: keep what parsed cleanly
            _ => {}
        }
    }

    entries
}

fn atom_link_href(e: &BytesStart<'_>) -> Option<String> {
    let mut href = None;
    let mut rel_alternate = true;

    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"href" => {
                href = attr.unescape_value().ok().map(|v| v.into_owned());
            }
            b"rel" => {
                let rel = attr.unescape_value().ok().unwrap_or_default();
                rel_alternate = rel.is_empty() || rel == "alternate";
            }
            _ => {}
        }
    }

    if rel_alternate {
        href
    } else {
        None
    }
}

fn append_field(
    current: &mut RawEntry,
    content: &mut String,
    updated: &mut String,
    field: Field,
    text: &str,
) {
    match field {
        Field::Title => current.title.push_str(text),
        Field::Link => current.link.push_str(text.trim()),
        Field::Summary => current.summary.push_str(text),
        Field::Content => content.push_str(text),
        Field::Published => {
            if current.published.is_none() {
                current.published = Some(text.trim().to_string());
            }
        }
        Field::Updated => updated.push_str(text.trim()),
    }
}

fn finish_entry(entries: &mut Vec<RawEntry>, current: &mut RawEntry, content: &str, updated: &str) {
    let mut entry = std::mem::take(current);

    // Atom feeds without <summary> still carry <content>
    if entry.summary.is_empty() && !content.is_empty() {
        entry.summary = content.to_string();
    }
    if entry.published.is_none() && !updated.is_empty() {
        entry.published = Some(updated.to_string());
    }

    entry.title = entry.title.trim().to_string();
    entry.summary = entry.summary.trim().to_string();

    if !entry.link.is_empty() {
        entries.push(entry);
    }
}
