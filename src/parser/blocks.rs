//! Indentation-delimited blocks under `*choice`, `*scene_list`, `*stat_chart`
//! and friends.

use crate::diagnostics::{DiagnosticCode, ScriptDiagnostic};
use crate::text::{line_end, next_line_start, Span};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BlockLine {
    /// The whole line, without its line break.
    pub span: Span,
    /// Width of the leading whitespace.
    pub indent: usize,
}

impl BlockLine {
    pub fn content<'a>(&self, text: &'a str) -> &'a str {
        &text[self.span.start + self.indent..self.span.end]
    }

    pub fn content_start(&self) -> usize {
        self.span.start + self.indent
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Block {
    /// Non-blank lines belonging to the block.
    pub lines: Vec<BlockLine>,
    /// Indentation established by the first line.
    pub indent: usize,
    /// End of the last line in the block, or the header's end when empty.
    pub end: usize,
}

/// Read the block following the header line that ends at `header_end`.
///
/// The first line indented deeper than `header_indent` fixes the block's
/// indentation width and character. The block runs while lines keep at
/// least that width in that character; blank lines never end it.
pub(crate) fn read_block(
    text: &str,
    header_end: usize,
    header_indent: usize,
) -> (Block, Option<ScriptDiagnostic>) {
    let mut block = Block {
        lines: Vec::new(),
        indent: 0,
        end: header_end,
    };
    let mut unit: Option<char> = None;
    let mut pos = next_line_start(text, header_end);

    while pos < text.len() {
        let end = line_end(text, pos);
        let line = &text[pos..end];
        let next = next_line_start(text, pos);
        if line.trim().is_empty() {
            pos = next;
            continue;
        }

        let prefix_len = line.len() - line.trim_start().len();
        let prefix = &line[..prefix_len];
        if prefix_len <= header_indent {
            break;
        }
        if prefix.contains(' ') && prefix.contains('\t') {
            let error = ScriptDiagnostic::new(
                DiagnosticCode::MixedIndentation,
                Span::new(pos, pos + prefix_len),
            );
            return (block, Some(error));
        }

        let ch = prefix.chars().next().unwrap_or(' ');
        match unit {
            None => {
                unit = Some(ch);
                block.indent = prefix_len;
            }
            Some(expected) if expected != ch || prefix_len < block.indent => break,
            Some(_) => {}
        }

        block.lines.push(BlockLine {
            span: Span::new(pos, end),
            indent: prefix_len,
        });
        block.end = end;
        pos = next;
    }

    (block, None)
}

/// Width of the whitespace before `offset` on its line.
pub(crate) fn indent_at(text: &str, offset: usize) -> usize {
    let start = crate::text::line_start(text, offset);
    let line = &text[start..line_end(text, start)];
    line.len() - line.trim_start().len()
}
