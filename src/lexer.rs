use std::{iter::Peekable, ops::Range, str::Chars};

use crate::{
    diagnostic::{Diagnostic, DiagnosticKind},
    token::{Literal, Span, Token, TokenKind, KEYWORDS},
};

/// Lexes `src` into a token stream carrying synthetic `Indent`/`Dedent`/
/// `Newline` tokens. Never fails hard: problems are recorded as diagnostics
/// and lexing continues to the end of the input.
pub fn lex(src: &str) -> Outcome {
    Lexer::new(src).lex()
}

pub struct Outcome {
    pub tokens: Vec<Token>,
    pub errors: Vec<Diagnostic>,
}

/// The Ave lexer.
///
/// ## Implementation Remarks
///
/// Layout is tracked with two independent stacks: indentation widths
/// (starting at `[0]`) and open brackets. While any bracket is open,
/// physical line structure is plain whitespace and no layout token is
/// emitted.
///
/// Layout emission is driven from line breaks: the width of the *next*
/// non-blank line is measured first, and exactly one of `Indent`,
/// `Dedent`+ or `Newline` is emitted. Consecutive separators never repeat.
pub struct Lexer<'src> {
    src: &'src str,
    iter: Peekable<Chars<'src>>,
    cursor: usize,
    current_lo: usize,
    line: u32,
    column: u32,
    token_line: u32,
    token_column: u32,
    indents: Vec<u32>,
    brackets: Vec<TokenKind>,
    tokens: Vec<Token>,
    errors: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Lexer<'src> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            current_lo: 0,
            line: 1,
            column: 1,
            token_line: 1,
            token_column: 1,
            indents: vec![0],
            brackets: Vec::new(),
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn lex(mut self) -> Outcome {
        // The first physical line is subject to layout as well.
        if let Some((width, span)) = self.measure_line() {
            self.apply_layout(width, span);
        }

        while let Some(c) = self.peek() {
            match c {
                '\n' if self.brackets.is_empty() => {
                    self.advance();
                    if let Some((width, span)) = self.measure_line() {
                        self.apply_layout(width, span);
                    }
                }
                c if c.is_ascii_whitespace() => {
                    // Includes `\n` inside brackets.
                    self.advance();
                }
                '#' => self.skip_comment(),
                '"' | '\'' => self.string(c),
                c if c.is_ascii_digit() => self.number(),
                c if c.is_ascii_alphabetic() || c == '_' => self.identifier_or_keyword(),
                _ => self.operator(),
            }
        }

        // Close any open indentation levels at the end of input.
        self.current_lo = self.cursor;
        self.token_line = self.line;
        self.token_column = self.column;
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent);
        }
        self.push(TokenKind::Newline);
        self.push(TokenKind::Eof);

        Outcome {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    /// Measures the leading width of the next non-blank line. Blank and
    /// comment-only lines are consumed and ignored. Returns `None` at the
    /// end of input (the EOF handler owns the remaining layout).
    fn measure_line(&mut self) -> Option<(u32, Span)> {
        loop {
            let line_start = self.cursor;
            let mut width = 0u32;
            loop {
                match self.peek() {
                    // A tab counts as a single column. Fixed policy.
                    Some(' ') | Some('\t') => {
                        self.advance();
                        width += 1;
                    }
                    Some('\r') => {
                        self.advance();
                    }
                    _ => break,
                }
            }
            match self.peek() {
                Some('\n') => {
                    self.advance();
                }
                Some('#') => {
                    self.skip_comment();
                    if self.peek() == Some('\n') {
                        self.advance();
                    } else {
                        return None;
                    }
                }
                None => return None,
                _ => {
                    return Some((width, Span::new(line_start, self.cursor)));
                }
            }
        }
    }

    fn apply_layout(&mut self, width: u32, span: Span) {
        self.current_lo = span.lo;
        self.token_line = self.line;
        self.token_column = 1;

        let top = *self.indents.last().expect("indent stack never empties");
        if width > top {
            self.indents.push(width);
            self.push_spanned(TokenKind::Indent, span);
        } else if width < top {
            while self.indents.len() > 1 && width < *self.indents.last().unwrap() {
                self.indents.pop();
                self.push_spanned(TokenKind::Dedent, span);
            }
            if width != *self.indents.last().unwrap() {
                self.error_at("Inconsistent dedent", span);
            }
        } else {
            let previous = self.tokens.last().map(|t| t.kind);
            let suppress = matches!(
                previous,
                None | Some(TokenKind::Newline) | Some(TokenKind::Indent) | Some(TokenKind::Dedent)
            );
            if !suppress {
                self.push_spanned(TokenKind::Newline, span);
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn string(&mut self, quote: char) {
        self.mark();
        self.advance();
        let content_lo = self.cursor;
        let mut terminated = false;
        while let Some(c) = self.advance() {
            if c == quote {
                terminated = true;
                break;
            }
        }
        let content_hi = if terminated {
            self.cursor - quote.len_utf8()
        } else {
            self.cursor
        };
        let content = self.src[content_lo..content_hi].to_owned();
        if !terminated {
            self.error("Unterminated string literal");
        }
        self.push_literal(TokenKind::Str, Literal::Str(content.into()));
    }

    fn number(&mut self) {
        self.mark();
        let first = self.advance().expect("caller checked for a digit");

        if first == '0' && self.peek() == Some('x') {
            self.advance();
            let digits = self.take_while(|c| c.is_ascii_hexdigit());
            if digits == 0 {
                self.error("Expected at least one digit after '0x'");
            }
            self.push_literal(TokenKind::Hex, Literal::Hex(self.substr().into()));
            self.check_adjacent_identifier();
            return;
        }
        if first == '0' && self.peek() == Some('b') {
            self.advance();
            let digits = self.take_while(|c| c == '0' || c == '1');
            if digits == 0 {
                self.error("Expected at least one digit after '0b'");
            }
            self.push_literal(TokenKind::Binary, Literal::Binary(self.substr().into()));
            self.check_adjacent_identifier();
            return;
        }

        self.take_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') && self.peek2().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            self.take_while(|c| c.is_ascii_digit());
        }
        if let Some('e' | 'E') = self.peek() {
            let follows_exponent = match self.peek2() {
                Some('+' | '-') => true,
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if follows_exponent {
                self.advance();
                if let Some('+' | '-') = self.peek() {
                    self.advance();
                }
                self.take_while(|c| c.is_ascii_digit());
            }
        }

        let value: f64 = self.substr().parse().unwrap_or(f64::NAN);
        self.push_literal(TokenKind::Number, Literal::Number(value));
        self.check_adjacent_identifier();
    }

    fn check_adjacent_identifier(&mut self) {
        if let Some(c) = self.peek() {
            if c.is_ascii_alphabetic() || c == '_' {
                let span = Span::new(self.cursor, self.cursor + c.len_utf8());
                self.error_at("Identifier starts immediately after number literal", span);
            }
        }
    }

    fn identifier_or_keyword(&mut self) {
        self.mark();
        self.advance();
        self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
        match KEYWORDS.get(self.substr()) {
            Some(&keyword) => self.push(keyword),
            None => self.push(TokenKind::Name),
        }
    }

    fn operator(&mut self) {
        use TokenKind::*;
        self.mark();
        let c = self.advance().expect("caller peeked");
        let kind = match c {
            '+' => match self.peek() {
                Some('+') => self.advance_with(PlusPlus),
                Some('=') => self.advance_with(PlusEq),
                _ => Plus,
            },
            '-' => match self.peek() {
                Some('-') => self.advance_with(MinusMinus),
                Some('=') => self.advance_with(MinusEq),
                Some('>') => self.advance_with(Arrow),
                _ => Minus,
            },
            '*' => match self.peek() {
                Some('*') => {
                    self.advance();
                    match self.peek() {
                        Some('=') => self.advance_with(StarStarEq),
                        _ => StarStar,
                    }
                }
                Some('=') => self.advance_with(StarEq),
                _ => Star,
            },
            '/' => match self.peek() {
                Some('/') => {
                    self.advance();
                    match self.peek() {
                        Some('=') => self.advance_with(SlashSlashEq),
                        _ => SlashSlash,
                    }
                }
                Some('=') => self.advance_with(SlashEq),
                _ => Slash,
            },
            '%' => match self.peek() {
                Some('=') => self.advance_with(PercentEq),
                _ => Percent,
            },
            '<' => match self.peek() {
                Some('=') => self.advance_with(LessEq),
                _ => Less,
            },
            '>' => match self.peek() {
                Some('=') => self.advance_with(GreaterEq),
                _ => Greater,
            },
            '=' => match self.peek() {
                Some('=') => self.advance_with(EqEq),
                _ => Eq,
            },
            '!' => match self.peek() {
                Some('=') => self.advance_with(BangEq),
                _ => Bang,
            },
            ':' => Colon,
            ';' => Semicolon,
            '.' => Dot,
            ',' => Comma,
            '|' => Pipe,
            '&' => Amp,
            '^' => Caret,
            '(' => self.open_bracket(LParen),
            '[' => self.open_bracket(LBracket),
            '{' => self.open_bracket(LBrace),
            ')' => self.close_bracket(RParen, LParen),
            ']' => self.close_bracket(RBracket, LBracket),
            '}' => self.close_bracket(RBrace, LBrace),
            c => {
                self.error(&format!("Unexpected character '{c}'"));
                return;
            }
        };
        self.push(kind);
    }

    fn open_bracket(&mut self, kind: TokenKind) -> TokenKind {
        self.brackets.push(kind);
        kind
    }

    fn close_bracket(&mut self, kind: TokenKind, expected_open: TokenKind) -> TokenKind {
        match self.brackets.pop() {
            Some(open) if open == expected_open => {}
            _ => {
                let raw = self.substr().to_owned();
                self.error(&format!("Unmatched '{raw}'"));
            }
        }
        kind
    }
}

impl Lexer<'_> {
    /// Starts a new token at the current position.
    fn mark(&mut self) {
        self.current_lo = self.cursor;
        self.token_line = self.line;
        self.token_column = self.column;
    }

    /// Returns the next character and advances the cursor.
    fn advance(&mut self) -> Option<char> {
        let c = self.iter.next()?;
        self.cursor += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    fn peek(&mut self) -> Option<char> {
        self.iter.peek().copied()
    }

    fn peek2(&self) -> Option<char> {
        let mut iter = self.iter.clone();
        iter.next();
        iter.next()
    }

    /// Advances while the predicate holds, returning how many characters
    /// were consumed.
    fn take_while(&mut self, predicate: fn(char) -> bool) -> usize {
        let mut n = 0;
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.advance();
            n += 1;
        }
        n
    }

    fn range(&self) -> Range<usize> {
        self.current_lo..self.cursor
    }

    fn span(&self) -> Span {
        Span::new(self.current_lo, self.cursor)
    }

    /// The substring of the current token's marked bounds.
    fn substr(&self) -> &str {
        &self.src[self.range()]
    }

    fn push(&mut self, kind: TokenKind) {
        let span = self.span();
        self.push_spanned(kind, span);
    }

    fn push_spanned(&mut self, kind: TokenKind, span: Span) {
        self.tokens
            .push(Token::new(kind, span, self.token_line, self.token_column));
    }

    fn push_literal(&mut self, kind: TokenKind, literal: Literal) {
        let token =
            Token::new(kind, self.span(), self.token_line, self.token_column).with_literal(literal);
        self.tokens.push(token);
    }

    fn error(&mut self, message: &str) {
        let span = self.span();
        self.error_at(message, span);
    }

    fn error_at(&mut self, message: &str, span: Span) {
        self.errors.push(Diagnostic::new(
            DiagnosticKind::SyntaxError,
            message,
            span,
            self.token_line,
            self.token_column,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lexed(input: &str) -> Vec<(TokenKind, Range<usize>)> {
        lex(input)
            .tokens
            .into_iter()
            .map(|t| (t.kind, t.span.range()))
            .collect()
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input).tokens.into_iter().map(|t| t.kind).collect()
    }

    fn errors(input: &str) -> Vec<String> {
        lex(input)
            .errors
            .iter()
            .map(Diagnostic::with_span_display)
            .collect()
    }

    macro_rules! cases {
        (match .. {
            $($str:expr => [$(($kind:ident, $range:expr)),* $(,)?]),* $(,)?
        }) => {{
            &[$((
                $str,
                vec![$((TokenKind::$kind, $range)),*],
            )),*]
        }};
    }

    #[test]
    fn tests_with_span() {
        let cases: &[(&str, Vec<(TokenKind, Range<usize>)>)] = cases!(match .. {
            "+ - * / % ** //" => [
                (Plus, 0..1),
                (Minus, 2..3),
                (Star, 4..5),
                (Slash, 6..7),
                (Percent, 8..9),
                (StarStar, 10..12),
                (SlashSlash, 13..15),
                (Newline, 15..15),
                (Eof, 15..15),
            ],
            "+= -= *= /= %= **= //=" => [
                (PlusEq, 0..2),
                (MinusEq, 3..5),
                (StarEq, 6..8),
                (SlashEq, 9..11),
                (PercentEq, 12..14),
                (StarStarEq, 15..18),
                (SlashSlashEq, 19..22),
                (Newline, 22..22),
                (Eof, 22..22),
            ],
            "< <= > >= == != is ! ++ -- ->" => [
                (Less, 0..1),
                (LessEq, 2..4),
                (Greater, 5..6),
                (GreaterEq, 7..9),
                (EqEq, 10..12),
                (BangEq, 13..15),
                (Is, 16..18),
                (Bang, 19..20),
                (PlusPlus, 21..23),
                (MinusMinus, 24..26),
                (Arrow, 27..29),
                (Newline, 29..29),
                (Eof, 29..29),
            ],
            "var let const func record if elif else while for return" => [
                (Var, 0..3),
                (Let, 4..7),
                (Const, 8..13),
                (Func, 14..18),
                (Record, 19..25),
                (If, 26..28),
                (Elif, 29..33),
                (Else, 34..38),
                (While, 39..44),
                (For, 45..48),
                (Return, 49..55),
                (Newline, 55..55),
                (Eof, 55..55),
            ],
            "num str bool any object void true false and or" => [
                (TyNum, 0..3),
                (TyStr, 4..7),
                (TyBool, 8..12),
                (TyAny, 13..16),
                (TyObject, 17..23),
                (TyVoid, 24..28),
                (True, 29..33),
                (False, 34..39),
                (And, 40..43),
                (Or, 44..46),
                (Newline, 46..46),
                (Eof, 46..46),
            ],
            "foo _bar baz123 vars" => [
                (Name, 0..3),
                (Name, 4..8),
                (Name, 9..15),
                (Name, 16..20),
                (Newline, 20..20),
                (Eof, 20..20),
            ],
            "1 3.14 1e9 2.5e-3 0xff 0b101" => [
                (Number, 0..1),
                (Number, 2..6),
                (Number, 7..10),
                (Number, 11..17),
                (Hex, 18..22),
                (Binary, 23..28),
                (Newline, 28..28),
                (Eof, 28..28),
            ],
        });

        for (input, tokens) in cases {
            assert_eq!(&lexed(input), tokens, "input: {input:?}");
        }
    }

    #[test]
    fn number_payloads() {
        let tokens = lex("42 2.5 0xff 0b10").tokens;
        assert_eq!(tokens[0].literal, Some(Literal::Number(42.0)));
        assert_eq!(tokens[1].literal, Some(Literal::Number(2.5)));
        assert_eq!(tokens[2].literal, Some(Literal::Hex("0xff".into())));
        assert_eq!(tokens[3].literal, Some(Literal::Binary("0b10".into())));
    }

    #[test]
    fn string_payloads() {
        let tokens = lex("\"hello\" 'world'").tokens;
        assert_eq!(tokens[0].literal, Some(Literal::Str("hello".into())));
        assert_eq!(tokens[1].literal, Some(Literal::Str("world".into())));
    }

    #[test]
    fn string_may_span_lines() {
        let out = lex("\"a\nb\" x");
        assert!(out.errors.is_empty());
        assert_eq!(out.tokens[0].literal, Some(Literal::Str("a\nb".into())));
        // The following token starts on line 2.
        assert_eq!(out.tokens[1].line, 2);
    }

    #[test]
    fn unterminated_string() {
        assert_eq!(
            errors("x = \"hello"),
            ["4..10: SyntaxError: Unterminated string literal"]
        );
        // Lexing continues and still produces the partial token.
        assert_eq!(
            kinds("x = \"hello"),
            [
                TokenKind::Name,
                TokenKind::Eq,
                TokenKind::Str,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn identifier_adjacent_to_number() {
        assert_eq!(
            errors("12abc"),
            ["2..3: SyntaxError: Identifier starts immediately after number literal"]
        );
    }

    #[test]
    fn hex_without_digits() {
        assert_eq!(
            errors("0x"),
            ["0..2: SyntaxError: Expected at least one digit after '0x'"]
        );
        assert_eq!(
            errors("0b"),
            ["0..2: SyntaxError: Expected at least one digit after '0b'"]
        );
    }

    #[test]
    fn comments_are_discarded() {
        assert_eq!(
            kinds("a # comment\nb"),
            [
                TokenKind::Name,
                TokenKind::Newline,
                TokenKind::Name,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn layout_basic_block() {
        assert_eq!(
            kinds("var k = 4\nwhile k\n  k -= 1"),
            [
                TokenKind::Var,
                TokenKind::Name,
                TokenKind::Eq,
                TokenKind::Number,
                TokenKind::Newline,
                TokenKind::While,
                TokenKind::Name,
                TokenKind::Indent,
                TokenKind::Name,
                TokenKind::MinusEq,
                TokenKind::Number,
                TokenKind::Dedent,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn layout_nested_blocks_dedent_together() {
        assert_eq!(
            kinds("if a\n  if b\n    c\nd"),
            [
                TokenKind::If,
                TokenKind::Name,
                TokenKind::Indent,
                TokenKind::If,
                TokenKind::Name,
                TokenKind::Indent,
                TokenKind::Name,
                TokenKind::Dedent,
                TokenKind::Dedent,
                TokenKind::Name,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn layout_blank_lines_are_ignored() {
        assert_eq!(
            kinds("a\n\n\nb"),
            [
                TokenKind::Name,
                TokenKind::Newline,
                TokenKind::Name,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
        // A blank line inside a block does not close it.
        assert_eq!(
            kinds("if a\n  b\n\n  c"),
            [
                TokenKind::If,
                TokenKind::Name,
                TokenKind::Indent,
                TokenKind::Name,
                TokenKind::Newline,
                TokenKind::Name,
                TokenKind::Dedent,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn layout_suppressed_inside_brackets() {
        assert_eq!(
            kinds("f(\n  1,\n  2\n)"),
            [
                TokenKind::Name,
                TokenKind::LParen,
                TokenKind::Number,
                TokenKind::Comma,
                TokenKind::Number,
                TokenKind::RParen,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn indent_dedent_counts_balance() {
        for input in [
            "if a\n  b",
            "if a\n  if b\n    c",
            "if a\n  b\nc\nif d\n  e",
            "a",
            "",
        ] {
            let tokens = lex(input).tokens;
            let indents = tokens
                .iter()
                .filter(|t| t.kind == TokenKind::Indent)
                .count();
            let dedents = tokens
                .iter()
                .filter(|t| t.kind == TokenKind::Dedent)
                .count();
            assert_eq!(indents, dedents, "input: {input:?}");
        }
    }

    #[test]
    fn inconsistent_dedent() {
        assert_eq!(
            errors("if a\n    b\n  c"),
            ["11..13: SyntaxError: Inconsistent dedent"]
        );
    }

    #[test]
    fn unmatched_close_bracket() {
        assert_eq!(errors(")"), ["0..1: SyntaxError: Unmatched ')'"]);
        assert_eq!(errors("(]"), ["1..2: SyntaxError: Unmatched ']'"]);
    }

    #[test]
    fn line_and_column_positions() {
        let tokens = lex("let a\n  b").tokens;
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 5));
        // Indent token sits at the start of line 2; `b` follows it.
        assert_eq!(tokens[2].kind, TokenKind::Indent);
        assert_eq!((tokens[3].line, tokens[3].column), (2, 3));
    }

    #[test]
    fn raw_lexemes_reproduce_source() {
        let src = "let a = 1 + foo(2, \"three\")";
        let out = lex(src);
        let joined: Vec<_> = out
            .tokens
            .iter()
            .filter(|t| {
                !matches!(
                    t.kind,
                    TokenKind::Indent | TokenKind::Dedent | TokenKind::Newline | TokenKind::Eof
                )
            })
            .map(|t| t.raw(src))
            .collect();
        assert_eq!(
            joined,
            ["let", "a", "=", "1", "+", "foo", "(", "2", "\"three\"", ")"]
        );
    }
}
