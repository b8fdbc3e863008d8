//! Expansion of `expr => expected;` assertions into compilable statements.
//!
//! The input is treated as opaque C-like text. It is cut into chunks after every
//! `;`, `{` or `}` that ends a line, and each chunk is either passed through
//! untouched or, when it has the shape `<indent><expr> => <expected>;`, rewritten
//! into a capture statement plus an assertion call. A small scanner tracks string
//! literals, character literals and comments so that `=>` or `;` inside them is
//! never mistaken for assertion syntax.
//!
//! Malformed assertions are not reported here; they pass through verbatim and the
//! build tool rejects them.

use std::borrow::Cow;

/// Temporary the left-hand expression is captured into.
pub const CAPTURE_VAR: &str = "test_res";
/// Assertion entry point provided by the template.
pub const ASSERT_FN: &str = "test_asserteqm";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Code,
    Literal,
    LineComment,
    BlockComment,
}

fn classify(bytes: &[u8]) -> Vec<Class> {
    let mut classes = vec![Class::Code; bytes.len()];
    let mut state = Class::Code;
    let mut quote = b'"';
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match state {
            Class::Code => match (b, bytes.get(i + 1).copied()) {
                (b'"' | b'\'', _) => {
                    state = Class::Literal;
                    quote = b;
                    classes[i] = Class::Literal;
                }
                (b'/', Some(b'/')) => {
                    state = Class::LineComment;
                    classes[i] = Class::LineComment;
                }
                (b'/', Some(b'*')) => {
                    state = Class::BlockComment;
                    classes[i] = Class::BlockComment;
                    classes[i + 1] = Class::BlockComment;
                    i += 2;
                    continue;
                }
                _ => {}
            },
            Class::Literal => {
                // Unterminated literals end at the line break.
                if b == b'\n' {
                    state = Class::Code;
                } else {
                    classes[i] = Class::Literal;
                    if b == b'\\' {
                        if let Some(c) = classes.get_mut(i + 1) {
                            *c = Class::Literal;
                        }
                        i += 2;
                        continue;
                    }
                    if b == quote {
                        state = Class::Code;
                    }
                }
            }
            Class::LineComment => {
                if b == b'\n' {
                    state = Class::Code;
                } else {
                    classes[i] = Class::LineComment;
                }
            }
            Class::BlockComment => {
                classes[i] = Class::BlockComment;
                if b == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    classes[i + 1] = Class::BlockComment;
                    state = Class::Code;
                    i += 2;
                    continue;
                }
            }
        }
        i += 1;
    }

    classes
}

/// Turns CRLF line endings into LF. Test sources are read as text, and the
/// chunk boundaries only recognize a bare `\n`.
pub fn normalize_newlines(source: &str) -> Cow<'_, str> {
    if source.contains("\r\n") {
        Cow::Owned(source.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(source)
    }
}

/// Splits `source` into chunks. The newline after a chunk-ending `;`, `{` or `}`
/// is consumed, so joining the chunks with `"\n"` reproduces the input exactly.
pub fn split_chunks(source: &str) -> Vec<&str> {
    let bytes = source.as_bytes();
    let classes = classify(bytes);
    let mut chunks = Vec::new();
    let mut start = 0;

    for i in 1..bytes.len() {
        if bytes[i] != b'\n' || classes[i] != Class::Code {
            continue;
        }
        let ends_statement = matches!(bytes[i - 1], b';' | b'{' | b'}')
            && matches!(classes[i - 1], Class::Code | Class::LineComment);
        if ends_statement {
            chunks.push(&source[start..i]);
            start = i + 1;
        }
    }
    chunks.push(&source[start..]);
    chunks
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assertion<'a> {
    pub indent: &'a str,
    /// Trimmed expression left of `=>`; may span lines.
    pub expr: &'a str,
    /// Trimmed expression between `=>` and the terminating `;`.
    pub expected: &'a str,
    /// Whitespace and comments after the terminating `;`, kept verbatim.
    pub trailer: &'a str,
}

impl Assertion<'_> {
    /// The label passed to the assertion call, as a C string literal body.
    pub fn label(&self) -> String {
        escape_label(self.expr)
    }

    pub fn render(&self) -> String {
        format!(
            "{indent}{CAPTURE_VAR} = {expr};\n{indent}{ASSERT_FN}({CAPTURE_VAR}, {expected}, \"{label}\");{trailer}",
            indent = self.indent,
            expr = self.expr,
            expected = self.expected,
            label = self.label(),
            trailer = self.trailer,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Code(&'a str),
    Assertion(Assertion<'a>),
}

impl Token<'_> {
    pub fn render(&self) -> String {
        match self {
            Token::Code(text) => (*text).to_string(),
            Token::Assertion(assertion) => assertion.render(),
        }
    }
}

fn skip_blank_lines(mut s: &str) -> &str {
    while let Some((line, rest)) = s.split_once('\n') {
        if !line.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r')) {
            break;
        }
        s = rest;
    }
    s
}

/// Recognizes `<indent><expr> => <expected>;` in a single chunk.
pub fn recognize(chunk: &str) -> Option<Assertion<'_>> {
    let body = skip_blank_lines(chunk);
    let indent_len = body.len() - body.trim_start_matches([' ', '\t']).len();
    let bytes = body.as_bytes();
    let classes = classify(bytes);
    let is_code = |i: usize| classes[i] == Class::Code;

    let arrow = (indent_len..bytes.len().saturating_sub(1))
        .find(|&i| bytes[i] == b'=' && bytes[i + 1] == b'>' && is_code(i) && is_code(i + 1))?;
    let semi = (arrow + 2..bytes.len()).find(|&i| bytes[i] == b';' && is_code(i))?;

    let trailer_is_inert = bytes[semi + 1..]
        .iter()
        .zip(&classes[semi + 1..])
        .all(|(b, c)| {
            b.is_ascii_whitespace() || matches!(c, Class::LineComment | Class::BlockComment)
        });
    if !trailer_is_inert {
        return None;
    }

    let expr = body[indent_len..arrow].trim();
    let expected = body[arrow + 2..semi].trim();
    if expr.is_empty() || expected.is_empty() {
        return None;
    }

    Some(Assertion {
        indent: &body[..indent_len],
        expr,
        expected,
        trailer: &body[semi + 1..],
    })
}

pub fn lex(source: &str) -> Vec<Token<'_>> {
    split_chunks(source)
        .into_iter()
        .map(|chunk| match recognize(chunk) {
            Some(assertion) => Token::Assertion(assertion),
            None => Token::Code(chunk),
        })
        .collect()
}

pub fn escape_label(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    for c in expr.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub text: String,
    pub chunks: usize,
    pub assertions: usize,
}

pub fn transform(source: &str) -> Transformed {
    let tokens = lex(source);
    let assertions = tokens
        .iter()
        .filter(|t| matches!(t, Token::Assertion(_)))
        .count();
    let text = tokens
        .iter()
        .map(Token::render)
        .collect::<Vec<_>>()
        .join("\n");
    tracing::debug!(chunks = tokens.len(), assertions, "transformed test source");
    Transformed {
        text,
        chunks: tokens.len(),
        assertions,
    }
}
