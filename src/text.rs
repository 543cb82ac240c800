use dashmap::DashMap;
use std::fmt;
use tower_lsp::lsp_types::{Position, Range, Url};

pub type DocumentStore = DashMap<DocumentKey, Document>;

type LineOffset = usize;

/// Byte range into a document's text, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closed-open membership: `start <= offset < end`.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// Identity of a document inside the project index.
///
/// Two URIs that name the same file (differing percent-encoding, drive letter
/// case or path separators) map to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey(String);

impl DocumentKey {
    pub fn from_uri(uri: &Url) -> Self {
        let raw = match uri.to_file_path() {
            Ok(path) => path.to_string_lossy().into_owned(),
            Err(_) => uri.path().to_string(),
        };
        Self::normalize(&raw)
    }

    fn normalize(raw: &str) -> Self {
        let mut key = raw.replace('\\', "/");
        // Drive letters: "/C:/x", "C:/x" and "/c%3A/x" must agree.
        let bytes = key.as_bytes();
        let drive_at = if bytes.first() == Some(&b'/') { 1 } else { 0 };
        if bytes.len() > drive_at + 1
            && bytes[drive_at].is_ascii_alphabetic()
            && bytes[drive_at + 1] == b':'
        {
            let letter = (bytes[drive_at] as char).to_ascii_lowercase();
            key = format!("/{}{}", letter, &key[drive_at + 1..]);
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name component, e.g. `startup.txt`.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// File name without its extension, which is how scenes are named.
    pub fn scene_name(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(dot) if dot > 0 => &name[..dot],
            _ => name,
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A span inside a specific document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub document: DocumentKey,
    pub span: Span,
}

impl Location {
    pub fn new(document: DocumentKey, span: Span) -> Self {
        Self { document, span }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    uri: Url,
    key: DocumentKey,
    version: i32,
    text: String,
    line_index: LineIndex,
}

impl Document {
    pub fn new(uri: Url, version: i32, text: String) -> Self {
        let line_index = LineIndex::new(&text);
        let key = DocumentKey::from_uri(&uri);
        Self {
            uri,
            key,
            version,
            text,
            line_index,
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn offset(&self, position: Position) -> Option<usize> {
        self.line_index.offset(&self.text, position)
    }

    pub fn position_at(&self, byte_offset: usize) -> Position {
        self.line_index.position_at(&self.text, byte_offset)
    }

    pub fn range_of(&self, span: Span) -> Range {
        Range {
            start: self.position_at(span.start),
            end: self.position_at(span.end),
        }
    }
}

#[derive(Debug, Clone)]
struct LineIndex {
    line_starts: Vec<LineOffset>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (idx, ch) in text.char_indices() {
            if ch == '\n' {
                line_starts.push(idx + 1);
            }
        }
        Self { line_starts }
    }

    fn offset(&self, text: &str, position: Position) -> Option<usize> {
        let line = position.line as usize;
        let line_start = *self.line_starts.get(line)?;
        let line_end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(text.len());
        let line_slice = text[line_start..line_end].trim_end_matches(['\n', '\r']);

        let mut current_units = 0u32;
        for (byte_idx, ch) in line_slice.char_indices() {
            if current_units >= position.character {
                return Some(line_start + byte_idx);
            }
            current_units += ch.len_utf16() as u32;
        }

        if current_units == position.character {
            return Some(line_start + line_slice.len());
        }

        None
    }

    fn position_at(&self, text: &str, byte_offset: usize) -> Position {
        let mut clamped = byte_offset.min(text.len());
        while !text.is_char_boundary(clamped) {
            clamped -= 1;
        }
        let line = self.line_for_offset(clamped);
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        let column_units = text[line_start..clamped]
            .chars()
            .map(|ch| ch.len_utf16() as u32)
            .sum();

        Position {
            line: line as u32,
            character: column_units,
        }
    }

    fn line_for_offset(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next_line) => next_line.saturating_sub(1),
        }
    }
}

/// Start of the line containing `offset`.
pub(crate) fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map(|idx| idx + 1).unwrap_or(0)
}

/// End of the line containing `offset`, excluding any `\r\n` / `\n`.
pub(crate) fn line_end(text: &str, offset: usize) -> usize {
    let end = text[offset..]
        .find('\n')
        .map(|idx| offset + idx)
        .unwrap_or(text.len());
    if end > offset && text.as_bytes()[end - 1] == b'\r' {
        end - 1
    } else {
        end
    }
}

/// Offset of the first byte of the next line, or the end of the text.
pub(crate) fn next_line_start(text: &str, offset: usize) -> usize {
    text[offset..]
        .find('\n')
        .map(|idx| offset + idx + 1)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(text: &str) -> Document {
        Document::new(
            Url::parse("file:///project/scenes/startup.txt").unwrap(),
            1,
            text.to_string(),
        )
    }

    #[test]
    fn converts_offsets_to_positions_and_back() {
        let document = doc("*create var 3\n*if var > 1\n  *goto done\n");
        let position = document.position_at(18);
        assert_eq!(position, Position { line: 1, character: 4 });
        assert_eq!(document.offset(position), Some(18));
    }

    #[test]
    fn counts_utf16_units_for_columns() {
        let document = doc("caf\u{e9} \u{1f600} x");
        let offset = document.text().find('x').unwrap();
        assert_eq!(document.position_at(offset).character, 8);
    }

    #[test]
    fn span_membership_is_closed_open() {
        let span = Span::new(4, 9);
        assert!(span.contains(4));
        assert!(span.contains(8));
        assert!(!span.contains(9));
    }

    #[test]
    fn normalizes_equivalent_uris_to_one_key() {
        let a = DocumentKey::from_uri(&Url::parse("file:///C:/game/startup.txt").unwrap());
        let b = DocumentKey::from_uri(&Url::parse("file:///c%3A/game/startup.txt").unwrap());
        assert_eq!(a, b);
        assert_eq!(a.file_name(), "startup.txt");
        assert_eq!(a.scene_name(), "startup");
    }

    #[test]
    fn finds_line_boundaries() {
        let text = "one\r\ntwo\nthree";
        assert_eq!(line_start(text, 6), 5);
        assert_eq!(line_end(text, 0), 3);
        assert_eq!(next_line_start(text, 0), 5);
        assert_eq!(line_end(text, 10), text.len());
    }
}
