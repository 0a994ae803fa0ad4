//! Markup tokenization and tree construction.
//!
//! The parser is a single left-to-right scan without backtracking. It keeps
//! one scan state and a stack of open elements whose bottom is always the
//! synthetic root. Malformed input never fails: an unterminated tag stops the
//! scan and everything built so far is kept.

use sk_dom::Document;
use sk_dom::NodeId;
use std::collections::HashMap;

/// Characters stripped from both ends of a text run.
const TEXT_TRIM: &[char] = &[' ', '\t', '\n', '\r'];

/// Parses markup into a [`Document`].
#[derive(Debug, Default)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn parse(&self, input: &str) -> Document {
        let bytes = input.as_bytes();
        let mut builder = TreeBuilder::new(input);
        let mut state = ScanState::Data;
        let mut idx = 0_usize;

        loop {
            state = match state {
                ScanState::Data if idx >= bytes.len() => ScanState::Done,
                ScanState::Data if bytes[idx] == b'<' => ScanState::TagOpen,
                ScanState::Data => ScanState::Text,
                ScanState::TagOpen => match find_byte(bytes, idx.saturating_add(1), b'>') {
                    Some(end) => {
                        builder.tag(&input[idx + 1..end]);
                        idx = end + 1;
                        ScanState::Data
                    }
                    None => {
                        log::debug!(
                            "markup truncated at byte {idx}: tag is never closed, dropping {} trailing bytes",
                            bytes.len() - idx
                        );
                        builder.document.mark_truncated();
                        ScanState::Done
                    }
                },
                ScanState::Text => {
                    let end = find_byte(bytes, idx, b'<').unwrap_or(bytes.len());
                    builder.text(&input[idx..end]);
                    idx = end;
                    ScanState::Data
                }
                ScanState::Done => break,
            };
        }

        builder.finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Between constructs; decides what starts at the cursor.
    Data,
    /// Cursor is on `<`.
    TagOpen,
    /// Cursor is on the first byte of a text run.
    Text,
    Done,
}

struct TreeBuilder {
    document: Document,
    open: Vec<NodeId>,
}

impl TreeBuilder {
    fn new(source: &str) -> Self {
        Self {
            document: Document::new(source),
            open: vec![Document::ROOT],
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(Document::ROOT)
    }

    fn tag(&mut self, body: &str) {
        if body.starts_with('/') {
            // Closing tags pop whatever is open; the name is not checked.
            if self.open.len() > 1 {
                self.open.pop();
            }
            return;
        }

        if body.is_empty() {
            return;
        }

        let (body, self_closing) = match body.strip_suffix('/') {
            Some(stripped) => (stripped, true),
            None => (body, false),
        };

        let (name, rest) = match body.find(' ') {
            Some(space) => (&body[..space], &body[space..]),
            None => (body, ""),
        };

        let attributes = parse_attributes(rest);
        let parent = self.current();
        if let Some(id) = self.document.append_element(parent, name, attributes) {
            if !self_closing {
                self.open.push(id);
            }
        }
    }

    fn text(&mut self, raw: &str) {
        let trimmed = raw.trim_matches(TEXT_TRIM);
        if trimmed.is_empty() {
            return;
        }

        let parent = self.current();
        self.document.append_text(parent, trimmed);
    }

    fn finish(self) -> Document {
        self.document
    }
}

/// Reads `key="value"` pairs left to right. The first pair whose value is
/// missing, unquoted or unterminated ends the scan; pairs after it are
/// dropped.
fn parse_attributes(input: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    let mut rest = input;

    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }

        let Some(eq) = rest.find('=') else {
            break;
        };
        let key = &rest[..eq];

        let Some(quoted) = rest[eq + 1..].strip_prefix('"') else {
            break;
        };
        let Some(close) = quoted.find('"') else {
            break;
        };

        attributes.insert(key.to_owned(), quoted[..close].to_owned());
        rest = &quoted[close + 1..];
    }

    attributes
}

fn find_byte(bytes: &[u8], from: usize, byte: u8) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|candidate| *candidate == byte)
        .map(|offset| from + offset)
}
