use std::fmt;

use crate::token::{Span, Token};

/// A single reported problem. The pipeline is never interrupted by one of
/// these: every stage accumulates them and keeps going.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Span,
    /// 1-based.
    pub line: u32,
    /// 1-based.
    pub column: u32,
    /// Stamped by the pipeline once the compilation unit is known.
    pub file_name: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    SyntaxError,
    TypeError,
    ReferenceError,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        message: impl Into<String>,
        span: Span,
        line: u32,
        column: u32,
    ) -> Diagnostic {
        Diagnostic {
            kind,
            message: message.into(),
            span,
            line,
            column,
            file_name: String::new(),
        }
    }

    /// Anchors the diagnostic to `token`'s span and position.
    pub fn at_token(kind: DiagnosticKind, message: impl Into<String>, token: &Token) -> Diagnostic {
        Diagnostic::new(kind, message, token.span, token.line, token.column)
    }

    /// Byte-span form used by tests: `lo..hi: Kind: message`.
    pub fn with_span_display(&self) -> String {
        format!("{}: {:?}: {}", self.span, self.kind, self.message)
    }
}

/// 1-based line/column of a byte offset. Only used on error paths, so a
/// linear scan is fine.
pub fn line_col(src: &str, offset: usize) -> (u32, u32) {
    let mut line = 1;
    let mut line_start = 0;
    for (i, c) in src.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            line_start = i + 1;
        }
    }
    let column = src[line_start..offset.min(src.len())].chars().count() as u32 + 1;
    (line, column)
}

impl Diagnostic {
    /// Anchors the diagnostic to `span`, computing line/column from `src`.
    pub fn at_span(
        kind: DiagnosticKind,
        message: impl Into<String>,
        span: Span,
        src: &str,
    ) -> Diagnostic {
        let (line, column) = line_col(src, span.lo);
        Diagnostic::new(kind, message, span, line, column)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {:?}: {}",
            self.line, self.column, self.kind, self.message
        )
    }
}
