//! Comment scanner: splits source text into code and comment spans.
//!
//! The code lexer is just literal-aware enough to not be fooled by comment
//! delimiters inside strings, template literals, or regex literals. It
//! tracks the previous significant token to decide whether a `/` starts a
//! regex or is a division operator.

use crate::model::{CommentBlock, CommentKind, SourceSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Code,
    Comment(CommentKind),
}

/// One piece of the partition produced by [`Scanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub span: SourceSpan,
    /// False only for a block comment that reached end of input.
    pub terminated: bool,
}

impl Span {
    pub fn is_code(&self) -> bool {
        self.kind == SpanKind::Code
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.text(source)
    }

    /// Build the comment view of this span, delimiters removed.
    pub fn comment(&self, source: &str) -> Option<CommentBlock> {
        let SpanKind::Comment(kind) = self.kind else {
            return None;
        };
        let (open, close) = match kind {
            CommentKind::Doc => (3, 2),
            CommentKind::Block => (2, 2),
            CommentKind::Line => (2, 0),
        };
        let close = if self.terminated { close } else { 0 };
        let start = (self.span.start + open).min(self.span.end);
        let end = self.span.end.saturating_sub(close).max(start);
        Some(CommentBlock {
            kind,
            span: self.span,
            text: source[start..end].to_string(),
            terminated: self.terminated,
        })
    }
}

// -- Code lexer ---------------------------------------------------------------

/// Words after which a `/` begins a regex literal.
const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

#[derive(Debug, Clone, Copy)]
enum Prev {
    Start,
    Punct(u8),
    Word { keyword: bool },
    Operand,
}

/// Result of one lexer step at a code position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// `//` or `/*` begins here.
    CommentStart,
    /// A single structural byte; advance by one.
    Punct(u8),
    /// A literal, word, number or whitespace ends at this offset.
    Skip(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct CodeLexer {
    prev: Prev,
}

impl CodeLexer {
    pub(crate) fn new() -> Self {
        CodeLexer { prev: Prev::Start }
    }

    fn regex_allowed(&self) -> bool {
        match self.prev {
            Prev::Start => true,
            Prev::Punct(b) => !matches!(b, b')' | b']'),
            Prev::Word { keyword } => keyword,
            Prev::Operand => false,
        }
    }

    /// Classify the code at `pos`. Comment starts leave the lexer state untouched.
    pub(crate) fn step(&mut self, bytes: &[u8], pos: usize) -> Step {
        let b = bytes[pos];
        let next = bytes.get(pos + 1).copied();
        match b {
            b'/' if matches!(next, Some(b'/') | Some(b'*')) => Step::CommentStart,
            b'/' if self.regex_allowed() => {
                self.prev = Prev::Operand;
                Step::Skip(skip_regex(bytes, pos))
            }
            b'\'' | b'"' | b'`' => {
                self.prev = Prev::Operand;
                Step::Skip(skip_string(bytes, pos, b))
            }
            b' ' | b'\t' | b'\n' | b'\r' => Step::Skip(pos + 1),
            b'0'..=b'9' => {
                self.prev = Prev::Operand;
                Step::Skip(skip_while(bytes, pos, |c| {
                    c.is_ascii_alphanumeric() || c == b'.' || c == b'_'
                }))
            }
            c if is_ident_byte(c) => {
                let end = skip_while(bytes, pos, is_ident_byte);
                let word = std::str::from_utf8(&bytes[pos..end]).unwrap_or("");
                self.prev = Prev::Word {
                    keyword: REGEX_KEYWORDS.contains(&word),
                };
                Step::Skip(end)
            }
            c => {
                self.prev = Prev::Punct(c);
                Step::Punct(c)
            }
        }
    }
}

fn is_ident_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$' || c >= 0x80
}

fn skip_while(bytes: &[u8], pos: usize, pred: impl Fn(u8) -> bool) -> usize {
    let mut i = pos;
    while i < bytes.len() && pred(bytes[i]) {
        i += 1;
    }
    i
}

/// Skip a quoted literal starting at `pos`. Plain strings stop at an
/// unescaped newline so one bad quote cannot swallow the rest of the file.
fn skip_string(bytes: &[u8], pos: usize, quote: u8) -> usize {
    let mut i = pos + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            c if c == quote => return i + 1,
            b'\n' if quote != b'`' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Skip a regex literal starting at `pos`, including trailing flags.
fn skip_regex(bytes: &[u8], pos: usize) -> usize {
    let mut i = pos + 1;
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => {
                return skip_while(bytes, i + 1, |c| c.is_ascii_alphabetic());
            }
            b'\n' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

// -- Scanner ------------------------------------------------------------------

/// Lazy iterator over the code/comment partition of a source text.
///
/// Cloning a scanner (or calling [`scan`] again) restarts the sequence.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    lexer: CodeLexer,
}

/// Start scanning `source` from the beginning.
pub fn scan(source: &str) -> Scanner<'_> {
    Scanner::new(source)
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Scanner {
            source,
            pos: 0,
            line: 1,
            lexer: CodeLexer::new(),
        }
    }

    fn emit(&mut self, kind: SpanKind, end: usize, terminated: bool) -> Span {
        let text = &self.source[self.pos..end];
        let newlines = text.bytes().filter(|&b| b == b'\n').count();
        let trailing = usize::from(text.ends_with('\n'));
        let span = SourceSpan {
            start: self.pos,
            end,
            start_line: self.line,
            end_line: self.line + newlines - trailing,
        };
        self.pos = end;
        self.line += newlines;
        Span {
            kind,
            span,
            terminated,
        }
    }

    fn comment(&mut self) -> Span {
        let bytes = self.source.as_bytes();
        let start = self.pos;
        if bytes[start + 1] == b'/' {
            let end = self.source[start..]
                .find('\n')
                .map_or(bytes.len(), |i| start + i);
            return self.emit(SpanKind::Comment(CommentKind::Line), end, true);
        }
        let is_doc = bytes.get(start + 2) == Some(&b'*')
            && !matches!(bytes.get(start + 3), Some(b'*') | Some(b'/'));
        let kind = if is_doc {
            CommentKind::Doc
        } else {
            CommentKind::Block
        };
        match self.source[start + 2..].find("*/") {
            Some(i) => self.emit(SpanKind::Comment(kind), start + 2 + i + 2, true),
            None => self.emit(SpanKind::Comment(kind), bytes.len(), false),
        }
    }
}

impl Iterator for Scanner<'_> {
    type Item = Span;

    fn next(&mut self) -> Option<Span> {
        let bytes = self.source.as_bytes();
        if self.pos >= bytes.len() {
            return None;
        }
        let mut i = self.pos;
        while i < bytes.len() {
            match self.lexer.step(bytes, i) {
                Step::CommentStart => break,
                Step::Punct(_) => i += 1,
                Step::Skip(end) => i = end.min(bytes.len()),
            }
        }
        if i == self.pos {
            return Some(self.comment());
        }
        Some(self.emit(SpanKind::Code, i, true))
    }
}

// -- Brace outline ------------------------------------------------------------

/// Brace nesting of the code spans, used to scope constructs.
#[derive(Debug, Default)]
pub struct Outline {
    /// (offset, depth from this offset on), ascending.
    marks: Vec<(usize, usize)>,
    /// (open offset, close offset) pairs; close is `None` when unbalanced.
    blocks: Vec<(usize, Option<usize>)>,
}

impl Outline {
    pub fn build(source: &str, spans: &[Span]) -> Self {
        let bytes = source.as_bytes();
        let mut lexer = CodeLexer::new();
        let mut outline = Outline::default();
        let mut stack: Vec<usize> = Vec::new();

        for span in spans.iter().filter(|s| s.is_code()) {
            let mut i = span.span.start;
            while i < span.span.end {
                match lexer.step(bytes, i) {
                    Step::Punct(b'{') => {
                        outline.blocks.push((i, None));
                        stack.push(outline.blocks.len() - 1);
                        outline.marks.push((i + 1, stack.len()));
                        i += 1;
                    }
                    Step::Punct(b'}') => {
                        if let Some(idx) = stack.pop() {
                            outline.blocks[idx].1 = Some(i);
                        }
                        outline.marks.push((i + 1, stack.len()));
                        i += 1;
                    }
                    Step::Punct(_) | Step::CommentStart => i += 1,
                    Step::Skip(end) => i = end,
                }
            }
        }
        outline
    }

    /// Brace depth at `offset`.
    pub fn depth_at(&self, offset: usize) -> usize {
        match self.marks.partition_point(|&(at, _)| at <= offset) {
            0 => 0,
            n => self.marks[n - 1].1,
        }
    }

    /// Opening offsets of the `{...}` blocks containing `offset`, innermost first.
    pub fn enclosing_blocks(&self, offset: usize) -> impl Iterator<Item = usize> + '_ {
        self.blocks
            .iter()
            .rev()
            .filter(move |(open, close)| *open < offset && close.map_or(true, |c| offset <= c))
            .map(|(open, _)| *open)
    }
}
