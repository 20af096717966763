//! Attachment markers embedded in message text.
//!
//! Uploaded files travel inside the message body as `[dosya:<url>]`, one per
//! line. Stored messages already use this exact syntax, so both the writer
//! and the parser here must keep it byte-for-byte.

use serde::{Deserialize, Serialize};

pub const MARKER_PREFIX: &str = "[dosya:";
pub const MARKER_SUFFIX: char = ']';

/// One renderable piece of a message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Segment {
    Text(String),
    LineBreak,
    Attachment(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Video,
    Audio,
    Document,
    Other,
}

impl AttachmentKind {
    /// Guess from the url's file extension, ignoring any query or fragment.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let file = path.rsplit('/').next().unwrap_or(path);
        let Some((_, ext)) = file.rsplit_once('.') else {
            return Self::Other;
        };

        match ext.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "svg" => Self::Image,
            "mp4" | "webm" | "mov" | "mkv" => Self::Video,
            "mp3" | "wav" | "ogg" | "m4a" | "flac" => Self::Audio,
            "pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "txt" | "zip" => {
                Self::Document
            }
            _ => Self::Other,
        }
    }
}

pub fn attachment_marker(url: &str) -> String {
    format!("{MARKER_PREFIX}{url}{MARKER_SUFFIX}")
}

/// Append a marker for `url` to composer text, on its own line.
pub fn append_attachment(text: &str, url: &str) -> String {
    let mut out = String::with_capacity(text.len() + url.len() + MARKER_PREFIX.len() + 2);
    out.push_str(text);
    if !text.is_empty() && !text.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&attachment_marker(url));
    out
}

/// Url of the first well-formed marker in `line`, if any.
///
/// Matches the shortest `[dosya:...]` span; an empty url does not count.
pub fn find_marker(line: &str) -> Option<&str> {
    let start = line.find(MARKER_PREFIX)? + MARKER_PREFIX.len();
    let rest = &line[start..];
    let end = rest.find(MARKER_SUFFIX)?;
    let url = &rest[..end];
    (!url.is_empty()).then_some(url)
}

/// Split message content into renderable segments.
pub fn render(content: &str) -> Vec<Segment> {
    if !content.contains(MARKER_PREFIX) {
        return vec![Segment::Text(content.to_string())];
    }

    let lines: Vec<&str> = content.split('\n').collect();
    let last = lines.len() - 1;
    let mut segments = Vec::with_capacity(lines.len() * 2);

    for (index, line) in lines.iter().enumerate() {
        match find_marker(line) {
            Some(url) => segments.push(Segment::Attachment(url.to_string())),
            None => {
                segments.push(Segment::Text(line.to_string()));
                if index < last {
                    segments.push(Segment::LineBreak);
                }
            }
        }
    }

    segments
}

/// Every attachment url referenced by `content`, in order.
pub fn attachments(content: &str) -> impl Iterator<Item = &str> {
    content.split('\n').filter_map(find_marker)
}

/// Plain-text rendering with attachments replaced by a short placeholder.
pub fn to_plain_text(content: &str) -> String {
    render(content)
        .into_iter()
        .map(|segment| match segment {
            Segment::Text(text) => text,
            Segment::LineBreak => "\n".to_string(),
            Segment::Attachment(url) => format!("[attachment: {url}]\n"),
        })
        .collect()
}
