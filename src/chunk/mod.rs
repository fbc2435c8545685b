//! Overlap-joined text chunking
//!
//! Splits long documents into retrievable units while:
//! - Ending chunks on sentence boundaries whenever one is near
//! - Carrying overlapping context between adjacent chunks
//! - Keeping every cut on a UTF-8 character boundary

use crate::error::{Error, Result};

/// How far back from the window end to look for a sentence-terminating period
const SENTENCE_LOOKBACK: usize = 100;

/// Split `text` into overlapping chunks of roughly `target_chars` bytes.
///
/// Input no longer than `target_chars` comes back as a single trimmed chunk.
/// Otherwise a window of `target_chars` advances across the text; if a period
/// falls within the window's last [`SENTENCE_LOOKBACK`] bytes the cut moves to
/// just after it, and the next window starts `overlap_chars` before the cut.
pub fn chunk_text(text: &str, target_chars: usize, overlap_chars: usize) -> Result<Vec<String>> {
    if target_chars == 0 {
        return Err(Error::Config("chunk target size must be positive".to_string()));
    }
    if overlap_chars >= target_chars {
        return Err(Error::Config(format!(
            "chunk overlap ({}) must be smaller than target size ({})",
            overlap_chars, target_chars
        )));
    }

    if text.len() <= target_chars {
        return Ok(vec![text.trim().to_string()]);
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < text.len() {
        let window_end = start + target_chars;

        if window_end >= text.len() {
            let tail = text[start..].trim();
            if !tail.is_empty() {
                chunks.push(tail.to_string());
            }
            break;
        }

        let window_end = ensure_char_boundary(text, window_end);
        let search_from =
            ensure_char_boundary(text, window_end.saturating_sub(SENTENCE_LOOKBACK)).max(start);

        // Pull the cut back to just after the nearest period, if one is close
        // enough; '.' is a single byte, so cut stays on a char boundary.
        let cut = match text[search_from..window_end].rfind('.') {
            Some(i) => search_from + i + 1,
            None => window_end,
        };

        let piece = text[start..cut].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        let mut next = ensure_char_boundary(text, cut.saturating_sub(overlap_chars));
        if next <= start {
            // Degenerate target/overlap combination where the sentence cut
            // regressed past the overlap; force forward progress.
            next = next_char_boundary(text, start + 1);
        }
        start = next;
    }

    Ok(chunks)
}

/// Round `pos` down to the nearest valid UTF-8 character boundary
fn ensure_char_boundary(text: &str, pos: usize) -> usize {
    if pos >= text.len() {
        return text.len();
    }
    let mut adjusted = pos;
    while adjusted > 0 && !text.is_char_boundary(adjusted) {
        adjusted -= 1;
    }
    adjusted
}

/// Round `pos` up to the nearest valid UTF-8 character boundary
fn next_char_boundary(text: &str, pos: usize) -> usize {
    if pos >= text.len() {
        return text.len();
    }
    let mut adjusted = pos;
    while adjusted < text.len() && !text.is_char_boundary(adjusted) {
        adjusted += 1;
    }
    adjusted
}
