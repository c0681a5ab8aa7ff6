//! Lexical helpers over the raw source text.
//!
//! `yaml-rust2` reports where each node starts but not where it ends, and it
//! reports anchors by number rather than by name. These helpers recover both
//! from the source so edits can overwrite exactly the text of a node.

use crate::value::ScalarStyle;
use yaml_rust2::scanner::Marker;

/// Maps parser markers (character indices) to byte offsets, and byte offsets
/// to 1-based line and column numbers.
pub(crate) struct LineIndex {
    /// Byte offset of every char, present only for non-ASCII input.
    char_offsets: Option<Vec<usize>>,
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub(crate) fn new(source: &str) -> Self {
        let char_offsets = if source.is_ascii() {
            None
        } else {
            Some(source.char_indices().map(|(i, _)| i).collect())
        };
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            char_offsets,
            line_starts,
            len: source.len(),
        }
    }

    pub(crate) fn byte_offset(&self, marker: &Marker) -> usize {
        let index = marker.index();
        match &self.char_offsets {
            Some(offsets) => offsets.get(index).copied().unwrap_or(self.len),
            None => index.min(self.len),
        }
    }

    /// 1-based (line, column) of a byte offset; the column counts characters.
    pub(crate) fn position(&self, source: &str, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let start = self.line_starts[line];
        let col = source
            .get(start..offset)
            .map_or(offset - start, |prefix| prefix.chars().count());
        (line + 1, col + 1)
    }
}

/// Where a scalar starting at `start` ends, plus the indentation of its
/// content lines for block scalars.
pub(crate) fn scalar_end(
    source: &str,
    start: usize,
    style: ScalarStyle,
    value: &str,
    flow: bool,
) -> (usize, Option<usize>) {
    match style {
        ScalarStyle::SingleQuoted => (single_quoted_end(source, start), None),
        ScalarStyle::DoubleQuoted => (double_quoted_end(source, start), None),
        ScalarStyle::Literal | ScalarStyle::Folded => {
            let (end, indent) = block_scalar_end(source, start);
            (end, Some(indent))
        }
        ScalarStyle::Plain => (plain_multiline_end(source, start, value, flow), None),
    }
}

fn single_quoted_end(source: &str, start: usize) -> usize {
    let bytes = source.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn double_quoted_end(source: &str, start: usize) -> usize {
    let bytes = source.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// End of a plain scalar on its first line.
fn plain_line_end(source: &str, start: usize, flow: bool) -> usize {
    let rest = &source[start..];
    let mut end = start;
    let mut prev_blank = false;
    let mut chars = rest.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        match c {
            '\n' | '\r' => break,
            '#' if prev_blank => break,
            ':' if next.is_none_or(|n| n.is_whitespace())
                || (flow && matches!(next, Some(',' | '[' | ']' | '{' | '}'))) =>
            {
                break;
            }
            ',' | '[' | ']' | '{' | '}' if flow => break,
            _ => {}
        }
        prev_blank = c == ' ' || c == '\t';
        if !prev_blank {
            end = start + i + c.len_utf8();
        }
    }
    end
}

/// End of a plain scalar that may continue over several lines.
///
/// Continuation lines are consumed until the non-blank characters seen match
/// the parsed value.
fn plain_multiline_end(source: &str, start: usize, value: &str, flow: bool) -> usize {
    let wanted = non_blank(value);
    let mut end = plain_line_end(source, start, flow);
    let mut seen = non_blank(&source[start..end]);
    let mut pos = end;

    while seen < wanted {
        let Some(nl) = source[pos..].find('\n') else {
            break;
        };
        let line_start = pos + nl + 1;
        let content_start = line_start
            + source[line_start..]
                .find(|c: char| c != ' ' && c != '\t')
                .unwrap_or(source.len() - line_start);
        if content_start >= source.len() {
            break;
        }
        if source[content_start..].starts_with(['\n', '\r']) {
            pos = content_start;
            continue;
        }
        let line_end = plain_line_end(source, content_start, flow);
        if line_end == content_start {
            break;
        }
        seen += non_blank(&source[content_start..line_end]);
        end = line_end;
        pos = line_end;
    }
    end
}

fn non_blank(s: &str) -> usize {
    s.chars().filter(|c| !c.is_whitespace()).count()
}

/// Extent of a `|` or `>` block scalar starting at its indicator, and the
/// indentation of its content lines.
fn block_scalar_end(source: &str, start: usize) -> (usize, usize) {
    let header_end = source[start..].find('\n').map_or(source.len(), |i| start + i);
    let header = strip_comment(&source[start..header_end]).trim_end();
    let line_start = line_start(source, start);
    let parent_indent = leading_spaces(&source[line_start..]);

    let mut end = start + header.len();
    let mut indent = None;
    let mut pos = header_end;
    while pos < source.len() {
        let next_start = pos + 1;
        let next_end = source[next_start..]
            .find('\n')
            .map_or(source.len(), |i| next_start + i);
        let line = &source[next_start..next_end];
        if line.trim().is_empty() {
            pos = next_end;
            continue;
        }
        let line_indent = leading_spaces(line);
        match indent {
            None if line_indent <= parent_indent => break,
            None => indent = Some(line_indent),
            Some(required) if line_indent < required => break,
            Some(_) => {}
        }
        end = next_end - usize::from(line.ends_with('\r'));
        pos = next_end;
    }
    (end, indent.unwrap_or(parent_indent + 2))
}

/// Offset of the `|` or `>` indicator of the block scalar whose parser
/// marker is at `pos`. The marker may sit on the indicator itself or past
/// the header line.
pub(crate) fn block_header(source: &str, pos: usize) -> usize {
    if source[pos..].starts_with(['|', '>']) {
        return pos;
    }
    let end = prev_content_end(source, pos);
    let start = source[..end]
        .rfind(|c: char| c.is_whitespace() || matches!(c, '[' | '{' | ','))
        .map_or(0, |i| i + 1);
    if source[start..end].starts_with(['|', '>']) {
        start
    } else {
        pos
    }
}

/// Whether the line holding `pos` ends in `\r\n`. The last line, which has
/// no terminator, follows the rest of the text.
pub(crate) fn crlf_at(source: &str, pos: usize) -> bool {
    let end = line_end(source, pos);
    if end < source.len() {
        source[..end].ends_with('\r')
    } else {
        source.contains("\r\n")
    }
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

pub(crate) fn line_start(source: &str, pos: usize) -> usize {
    source[..pos].rfind('\n').map_or(0, |i| i + 1)
}

/// Byte offset of the end of the line containing `pos` (the `\n` itself, or
/// the end of input).
pub(crate) fn line_end(source: &str, pos: usize) -> usize {
    source[pos..].find('\n').map_or(source.len(), |i| pos + i)
}

/// The part of a line before any `#` comment.
pub(crate) fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut prev_blank = true;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '#') if prev_blank => return &line[..i],
            _ => {}
        }
        prev_blank = c == ' ' || c == '\t';
    }
    line
}

/// Offset just past the last non-blank, non-comment character before `pos`.
pub(crate) fn prev_content_end(source: &str, pos: usize) -> usize {
    let mut upto = pos;
    loop {
        let start = line_start(source, upto);
        let code = strip_comment(&source[start..upto]).trim_end();
        if !code.is_empty() {
            return start + code.len();
        }
        if start == 0 {
            return 0;
        }
        upto = start - 1;
    }
}

/// Name of the anchor (`&name`) written before the node content at `pos`,
/// skipping an interleaved tag.
pub(crate) fn preceding_anchor(source: &str, pos: usize) -> Option<String> {
    let mut upto = pos;
    for _ in 0..2 {
        let end = prev_content_end(source, upto);
        let start = source[..end]
            .rfind(|c: char| c.is_whitespace() || matches!(c, '[' | '{' | ','))
            .map_or(0, |i| i + 1);
        let word = &source[start..end];
        if let Some(name) = word.strip_prefix('&') {
            return Some(name.to_string());
        }
        if !word.starts_with('!') {
            return None;
        }
        upto = start;
    }
    None
}

/// Offset past the anchor and tag properties (`&a !!str`) written at `pos`,
/// or `pos` itself when none start there.
pub(crate) fn skip_properties(source: &str, pos: usize) -> usize {
    let mut end = pos;
    let mut next = pos;
    while source[next..].starts_with(['&', '!']) {
        end = source[next..]
            .find(char::is_whitespace)
            .map_or(source.len(), |i| next + i);
        let rest = &source[end..];
        next = end + (rest.len() - rest.trim_start_matches([' ', '\t']).len());
    }
    end
}

/// Anchor name of the node whose content starts at `pos`.
pub(crate) fn anchor_name(source: &str, pos: usize) -> Option<String> {
    let mut next = pos;
    while source[next..].starts_with('!') {
        let end = source[next..]
            .find(char::is_whitespace)
            .map_or(source.len(), |i| next + i);
        let rest = &source[end..];
        next = end + (rest.len() - rest.trim_start_matches([' ', '\t']).len());
    }
    if let Some(rest) = source[next..].strip_prefix('&') {
        let len = rest
            .find(|c: char| c.is_whitespace() || matches!(c, ',' | '[' | ']' | '{' | '}'))
            .unwrap_or(rest.len());
        return Some(rest[..len].to_string());
    }
    preceding_anchor(source, pos)
}

/// Name and end offset of the alias token (`*name`) starting at `start`.
pub(crate) fn alias_token(source: &str, start: usize) -> (String, usize) {
    let name_start = start + 1;
    let name_len = source[name_start..]
        .find(|c: char| c.is_whitespace() || matches!(c, ',' | '[' | ']' | '{' | '}'))
        .unwrap_or(source.len() - name_start);
    let end = name_start + name_len;
    (source[name_start..end].to_string(), end)
}
