//! Default content optimizer.
//!
//! JSON is canonicalized through `serde_json` (after stripping comments and
//! trailing commas, so JSONC is accepted). HTML, CSS and SVG get conservative
//! whitespace and comment removal that never reorders or rewrites tokens.
//! HTML keeps its indentation and never touches `<script>` or `<style>`
//! bodies.

use bytes::Bytes;

use super::Optimizer;
use crate::error::OptimizeError;

/// Optimizer for JSON, HTML, CSS and SVG. Other types pass through.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardOptimizer;

impl Optimizer for StandardOptimizer {
    fn optimize(&self, mime: &str, bytes: Bytes) -> Result<Bytes, OptimizeError> {
        if mime.starts_with("application/json") {
            let text = std::str::from_utf8(&bytes)?;
            return Ok(Bytes::from(canonicalize_json(text)?));
        }
        if mime.starts_with("text/html") {
            let text = std::str::from_utf8(&bytes)?;
            return Ok(Bytes::from(minify_html(text)));
        }
        if mime.starts_with("text/css") {
            let text = std::str::from_utf8(&bytes)?;
            return Ok(Bytes::from(minify_css(text)));
        }
        if mime.starts_with("image/svg+xml") {
            let text = std::str::from_utf8(&bytes)?;
            return Ok(Bytes::from(minify_svg(text)));
        }
        Ok(bytes)
    }
}

/// Parse JSON (comments allowed) and re-serialize it compactly.
pub fn canonicalize_json(text: &str) -> Result<String, OptimizeError> {
    let value: serde_json::Value = serde_json::from_str(&strip_json_comments(text))?;
    Ok(serde_json::to_string(&value)?)
}

/// Remove `//` and `/* */` comments and trailing commas outside strings.
pub fn strip_json_comments(text: &str) -> String {
    let without_comments = strip_c_comments(text, true);
    strip_trailing_commas(&without_comments)
}

fn strip_c_comments(text: &str, line_comments: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(quote) = in_string {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == quote {
                in_string = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                in_string = Some(c);
                out.push(c);
            }
            '/' if line_comments && chars.peek() == Some(&'/') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for skipped in chars.by_ref() {
                    if previous == '*' && skipped == '/' {
                        break;
                    }
                    previous = skipped;
                }
            }
            _ => out.push(c),
        }
    }

    out
}

fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(&escaped) = chars.get(i + 1) {
                    out.push(escaped);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}' | ']')) {
                i += 1;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }

    out
}

/// Strip comments, indentation and blank lines from a stylesheet.
pub fn minify_css(text: &str) -> String {
    join_trimmed_lines(&strip_c_comments(text, false))
}

/// Strip XML comments and whitespace-only runs between tags.
pub fn minify_svg(text: &str) -> String {
    let without_comments = strip_markup_comments(text);
    let mut out = String::with_capacity(without_comments.len());
    let mut pending = String::new();

    for c in without_comments.chars() {
        if c.is_whitespace() {
            pending.push(c);
            continue;
        }
        if !pending.is_empty() {
            let between_tags = out.ends_with('>') && c == '<';
            if !between_tags {
                out.push_str(&pending);
            }
            pending.clear();
        }
        out.push(c);
    }

    out
}

/// Strip comments, blank lines and trailing whitespace from an HTML
/// document.
///
/// Documents containing `<pre` or `<textarea` are returned unchanged since
/// their whitespace is significant. `<script>` and `<style>` elements are
/// copied verbatim, comment markers inside them included. Indentation and
/// conditional comments are kept.
pub fn minify_html(text: &str) -> String {
    let lower = text.to_ascii_lowercase();
    if lower.contains("<pre") || lower.contains("<textarea") {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut markup = String::new();
    let mut pos = 0;

    while pos < text.len() {
        let rest = &lower[pos..];
        let comment = rest.find("<!--");
        let raw = RAW_TEXT_TAGS
            .iter()
            .filter_map(|tag| find_open_tag(rest, tag).map(|at| (at, *tag)))
            .min_by_key(|(at, _)| *at);

        match (comment, raw) {
            (Some(at), raw) if raw.is_none_or(|(raw_at, _)| at < raw_at) => {
                markup.push_str(&text[pos..pos + at]);
                let after = &text[pos + at..];
                let len = after.find("-->").map_or(after.len(), |end| end + 3);
                if after.starts_with("<!--[if") {
                    markup.push_str(&after[..len]);
                }
                pos += at + len;
            }
            (_, Some((at, tag))) => {
                markup.push_str(&text[pos..pos + at]);
                tidy_lines(&markup, false, &mut out);
                markup.clear();

                let start = pos + at;
                let close = format!("</{tag}");
                let end = lower[start..]
                    .find(&close)
                    .and_then(|c| lower[start + c..].find('>').map(|g| start + c + g + 1))
                    .unwrap_or(text.len());
                out.push_str(&text[start..end]);
                pos = end;
            }
            _ => {
                markup.push_str(&text[pos..]);
                pos = text.len();
            }
        }
    }

    tidy_lines(&markup, true, &mut out);
    out
}

/// Elements whose bodies are not markup.
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

/// Offset of the first `<tag` opening tag in already-lowercased `lower`.
fn find_open_tag(lower: &str, tag: &str) -> Option<usize> {
    let needle = format!("<{tag}");
    let mut from = 0;
    while let Some(found) = lower[from..].find(&needle) {
        let at = from + found;
        match lower.as_bytes().get(at + needle.len()) {
            None | Some(b'>' | b'/') => return Some(at),
            Some(b) if b.is_ascii_whitespace() => return Some(at),
            Some(_) => from = at + needle.len(),
        }
    }
    None
}

/// Append `segment` to `out`, dropping trailing whitespace before each line
/// break and lines left empty. The final unterminated piece is only trimmed
/// when it ends the document.
fn tidy_lines(segment: &str, at_end: bool, out: &mut String) {
    let mut pieces = segment.split('\n').peekable();
    while let Some(piece) = pieces.next() {
        if pieces.peek().is_none() {
            out.push_str(if at_end { piece.trim_end() } else { piece });
            break;
        }
        let trimmed = piece.trim_end();
        if trimmed.is_empty() && (out.is_empty() || out.ends_with('\n')) {
            continue;
        }
        out.push_str(trimmed);
        out.push('\n');
    }
}

fn strip_markup_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("<!--") {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        rest = after.find("-->").map_or("", |end| &after[end + 3..]);
    }
    out.push_str(rest);
    out
}

fn join_trimmed_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
