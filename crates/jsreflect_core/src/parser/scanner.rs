//! JavaScript lexer (scanner) for the SpiderMonkey dialect: ES5 plus the
//! JS 1.7/1.8 extensions (`let`, `yield`, `for each`, expression closures)
//! and, with the `e4x` feature, the E4X punctuators.
//!
//! See [`Scanner`] for the main entry point.

use crate::error::{ReflectError, ReflectResult};

// ─────────────────────────────────────────────────────────────────────────────
// Position / Span
// ─────────────────────────────────────────────────────────────────────────────

/// A byte offset + line/column location in source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset from the beginning of the source string.
    pub offset: usize,
    /// 1-based line number, counted from the configured starting line.
    pub line: u32,
    /// 0-based column number, measured in UTF-16 code units.
    pub column: u32,
}

/// A half-open `[start, end)` source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Inclusive start of the span.
    pub start: Position,
    /// Exclusive end of the span.
    pub end: Position,
}

impl Span {
    /// The span from the start of `self` to the end of `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────────────

/// The syntactic category of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────────────────
    /// Decimal, hex (`0x…`) or legacy octal (`017`) numeric literal.
    NumericLiteral,
    /// String literal enclosed in `"` or `'`; the value is cooked.
    StringLiteral,
    /// Regular-expression literal.  Only produced by
    /// [`Scanner::rescan_regexp`]; a plain scan yields `/` or `/=`.
    RegExpLiteral,

    // ── Identifiers ───────────────────────────────────────────────────────
    /// A plain or escaped identifier.  `of`, `each`, `get`, `set` and
    /// `namespace` are ordinary identifiers, recognised by the parser.
    Identifier,

    // ── Reserved words ────────────────────────────────────────────────────
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Enum,
    Export,
    Extends,
    False,
    Finally,
    For,
    Function,
    If,
    Import,
    In,
    Instanceof,
    Let,
    New,
    Null,
    Return,
    Super,
    Switch,
    This,
    Throw,
    True,
    Try,
    Typeof,
    Var,
    Void,
    While,
    With,
    Yield,

    // ── Punctuators ───────────────────────────────────────────────────────
    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Dot,
    DotDotDot,
    Semicolon,
    Comma,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    EqualEqual,
    BangEqual,
    EqualEqualEqual,
    BangEqualEqual,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    LessLess,
    GreaterGreater,
    GreaterGreaterGreater,
    Ampersand,
    Pipe,
    Caret,
    Bang,
    Tilde,
    AmpersandAmpersand,
    PipePipe,
    Question,
    Colon,
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    LessLessEqual,
    GreaterGreaterEqual,
    GreaterGreaterGreaterEqual,
    AmpersandEqual,
    PipeEqual,
    CaretEqual,

    // ── E4X punctuators ───────────────────────────────────────────────────
    /// `..` descendants operator.
    DotDot,
    /// `::` qualified-name separator.
    ColonColon,
    /// `@` attribute selector.
    At,

    // ── End of file ───────────────────────────────────────────────────────
    Eof,
}

impl TokenKind {
    /// `true` for reserved words, which are still valid property names
    /// after `.` and in object-literal keys.
    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Break
                | Case
                | Catch
                | Class
                | Const
                | Continue
                | Debugger
                | Default
                | Delete
                | Do
                | Else
                | Enum
                | Export
                | Extends
                | False
                | Finally
                | For
                | Function
                | If
                | Import
                | In
                | Instanceof
                | Let
                | New
                | Null
                | Return
                | Super
                | Switch
                | This
                | Throw
                | True
                | Try
                | Typeof
                | Var
                | Void
                | While
                | With
                | Yield
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TokenValue / Token
// ─────────────────────────────────────────────────────────────────────────────

/// Semantic payload of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    /// Punctuators and end of file carry no value.
    None,
    /// Identifier or keyword name, or the cooked contents of a string.
    Str(String),
    /// Numeric value.
    Number(f64),
    /// Regular-expression body and flags.
    RegExp {
        /// Text between the slashes.
        source: String,
        /// Trailing flag letters.
        flags: String,
    },
}

/// A single lexical token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The syntactic category.
    pub kind: TokenKind,
    /// The semantic payload.
    pub value: TokenValue,
    /// Source location.
    pub span: Span,
    /// `true` when at least one line terminator appeared between the
    /// previous token and this one.  Drives automatic semicolon insertion.
    pub had_line_terminator_before: bool,
}

impl Token {
    /// The string payload, or `""` for tokens without one.
    pub fn text(&self) -> &str {
        match &self.value {
            TokenValue::Str(s) => s,
            _ => "",
        }
    }

    /// `true` for an [`TokenKind::Identifier`] spelled exactly `name`.
    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text() == name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Character-classification helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Returns `true` for *LineTerminator* code points.
pub(crate) fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Returns `true` for *WhiteSpace* **or** *LineTerminator* characters.
fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\t'
        | '\x0B'
        | '\x0C'
        | ' '
        | '\u{00A0}'
        | '\u{FEFF}'
        | '\u{1680}'
        | '\u{2000}'..='\u{200A}'
        | '\u{202F}'
        | '\u{205F}'
        | '\u{3000}'
    ) || is_line_terminator(c)
}

/// Returns `true` for characters that may *start* an identifier.
pub(crate) fn is_id_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

/// Returns `true` for characters that may *continue* an identifier.
pub(crate) fn is_id_continue(c: char) -> bool {
    c == '$' || c == '_' || c == '\u{200C}' || c == '\u{200D}' || c.is_alphanumeric()
}

/// Map an identifier string to a reserved-word [`TokenKind`], or return
/// `None` for plain identifiers.
fn keyword_kind(s: &str) -> Option<TokenKind> {
    let kind = match s {
        "break" => TokenKind::Break,
        "case" => TokenKind::Case,
        "catch" => TokenKind::Catch,
        "class" => TokenKind::Class,
        "const" => TokenKind::Const,
        "continue" => TokenKind::Continue,
        "debugger" => TokenKind::Debugger,
        "default" => TokenKind::Default,
        "delete" => TokenKind::Delete,
        "do" => TokenKind::Do,
        "else" => TokenKind::Else,
        "enum" => TokenKind::Enum,
        "export" => TokenKind::Export,
        "extends" => TokenKind::Extends,
        "false" => TokenKind::False,
        "finally" => TokenKind::Finally,
        "for" => TokenKind::For,
        "function" => TokenKind::Function,
        "if" => TokenKind::If,
        "import" => TokenKind::Import,
        "in" => TokenKind::In,
        "instanceof" => TokenKind::Instanceof,
        "let" => TokenKind::Let,
        "new" => TokenKind::New,
        "null" => TokenKind::Null,
        "return" => TokenKind::Return,
        "super" => TokenKind::Super,
        "switch" => TokenKind::Switch,
        "this" => TokenKind::This,
        "throw" => TokenKind::Throw,
        "true" => TokenKind::True,
        "try" => TokenKind::Try,
        "typeof" => TokenKind::Typeof,
        "var" => TokenKind::Var,
        "void" => TokenKind::Void,
        "while" => TokenKind::While,
        "with" => TokenKind::With,
        "yield" => TokenKind::Yield,
        _ => return None,
    };
    Some(kind)
}

// ─────────────────────────────────────────────────────────────────────────────
// Scanner
// ─────────────────────────────────────────────────────────────────────────────

/// JavaScript lexer.
///
/// Produces a stream of [`Token`]s from a UTF-8 source string.  Call
/// [`Scanner::next_token`] repeatedly until a token with
/// [`TokenKind::Eof`] is returned.  Comments are skipped.
///
/// A `/` is always scanned as a punctuator; the parser knows when it is in
/// operand position and calls [`Scanner::rescan_regexp`] to reinterpret it.
///
/// # Example
///
/// ```
/// use jsreflect_core::parser::scanner::{Scanner, TokenKind};
///
/// let mut sc = Scanner::new("let x = 42;");
/// loop {
///     let tok = sc.next_token().unwrap();
///     if tok.kind == TokenKind::Eof { break; }
///     println!("{:?}", tok.kind);
/// }
/// ```
pub struct Scanner<'src> {
    /// The complete source string.
    source: &'src str,
    /// Current byte position within `source`.
    pos: usize,
    /// Current line number.
    line: u32,
    /// Current 0-based UTF-16 column.
    column: u32,
}

impl<'src> Scanner<'src> {
    /// Create a new scanner whose first line is line 1.
    pub fn new(source: &'src str) -> Self {
        Self::with_start_line(source, 1)
    }

    /// Create a new scanner whose first line is numbered `line`.
    pub fn with_start_line(source: &'src str, line: u32) -> Self {
        Self {
            source,
            pos: 0,
            line,
            column: 0,
        }
    }

    /// Returns `true` when all input has been consumed.
    pub fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// The complete source text.
    pub fn source(&self) -> &'src str {
        self.source
    }

    // ── Low-level character helpers ─────────────────────────────────────────

    pub(crate) fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    pub(crate) fn peek2(&self) -> Option<char> {
        let mut it = self.source[self.pos..].chars();
        it.next();
        it.next()
    }

    /// `true` when the unconsumed input starts with `s`.
    pub(crate) fn starts_with(&self, s: &str) -> bool {
        self.source[self.pos..].starts_with(s)
    }

    /// Advance past the current character and update line/column tracking.
    ///
    /// `\r\n` is treated as a single line terminator.  Returns `None` at end
    /// of input.
    pub(crate) fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        match ch {
            '\r' => {
                if self.source[self.pos..].starts_with('\n') {
                    self.pos += 1;
                }
                self.line += 1;
                self.column = 0;
            }
            '\n' | '\u{2028}' | '\u{2029}' => {
                self.line += 1;
                self.column = 0;
            }
            _ => {
                self.column += ch.len_utf16() as u32;
            }
        }
        Some(ch)
    }

    /// Consume `expected` if it is the next character.
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume `s` if the unconsumed input starts with it.
    pub(crate) fn eat_str(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            for _ in s.chars() {
                self.bump();
            }
            true
        } else {
            false
        }
    }

    /// The current position.
    pub fn position(&self) -> Position {
        Position {
            offset: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    /// Rewind (or fast-forward) to a position previously returned by
    /// [`Scanner::position`] or found in a token span.
    pub(crate) fn reset_to(&mut self, pos: Position) {
        self.pos = pos.offset;
        self.line = pos.line;
        self.column = pos.column;
    }

    /// Syntax error at `pos`.
    pub(crate) fn error_at(&self, pos: Position, message: impl Into<String>) -> ReflectError {
        ReflectError::syntax(message, pos.line, pos.column)
    }

    fn error(&self, message: impl Into<String>) -> ReflectError {
        self.error_at(self.position(), message)
    }

    // ── Whitespace and comments ─────────────────────────────────────────────

    /// Consume whitespace and comments; return `true` if any line terminators
    /// were crossed.
    fn skip_trivia(&mut self) -> ReflectResult<bool> {
        let mut had_lt = false;
        loop {
            match self.peek() {
                Some(c) if is_js_whitespace(c) => {
                    if is_line_terminator(c) {
                        had_lt = true;
                    }
                    self.bump();
                }
                Some('/') if self.peek2() == Some('/') => self.skip_line_comment(),
                Some('/') if self.peek2() == Some('*') => {
                    let start = self.position();
                    self.bump();
                    self.bump();
                    loop {
                        if self.eat_str("*/") {
                            break;
                        }
                        match self.bump() {
                            Some(c) if is_line_terminator(c) => had_lt = true,
                            Some(_) => {}
                            None => {
                                return Err(self.error_at(start, "unterminated comment"));
                            }
                        }
                    }
                }
                // SGML-style comment openers are single-line comments.
                Some('<') if !cfg!(feature = "e4x") && self.starts_with("<!--") => {
                    self.skip_line_comment()
                }
                Some('-') if (had_lt || self.pos == 0) && self.starts_with("-->") => {
                    self.skip_line_comment()
                }
                _ => return Ok(had_lt),
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if is_line_terminator(c) {
                break;
            }
            self.bump();
        }
    }

    // ── Escapes ─────────────────────────────────────────────────────────────

    fn scan_hex_digits_exact(&mut self, count: usize) -> ReflectResult<u32> {
        let mut value = 0u32;
        for _ in 0..count {
            match self.peek().and_then(|c| c.to_digit(16)) {
                Some(d) => {
                    self.bump();
                    value = value * 16 + d;
                }
                None => return Err(self.error("malformed hexadecimal character escape sequence")),
            }
        }
        Ok(value)
    }

    /// Consume the rest of a `\u` escape (the `u` already consumed) and
    /// return its code unit or code point.
    fn scan_unicode_escape(&mut self) -> ReflectResult<u32> {
        if self.eat('{') {
            let mut value = 0u32;
            let mut count = 0usize;
            while let Some(d) = self.peek().and_then(|c| c.to_digit(16)) {
                self.bump();
                value = value.saturating_mul(16).saturating_add(d);
                count += 1;
            }
            if count == 0 || !self.eat('}') || value > 0x10FFFF {
                return Err(self.error("malformed Unicode character escape sequence"));
            }
            Ok(value)
        } else {
            self.scan_hex_digits_exact(4)
                .map_err(|_| self.error("malformed Unicode character escape sequence"))
        }
    }

    /// Decode one escape sequence starting *after* the leading `\` and push
    /// the result onto `out`.  Surrogate pairs written as two `\u` escapes
    /// are combined; a lone surrogate becomes U+FFFD.
    fn scan_escape_sequence(&mut self, out: &mut String) -> ReflectResult<()> {
        let Some(c) = self.bump() else {
            return Err(self.error("unterminated string literal"));
        };
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{C}'),
            'v' => out.push('\u{B}'),
            'x' => {
                let v = self.scan_hex_digits_exact(2)?;
                out.push(char::from_u32(v).unwrap_or('\u{FFFD}'));
            }
            'u' => {
                let v = self.scan_unicode_escape()?;
                if (0xD800..0xDC00).contains(&v) && self.starts_with("\\u") {
                    let save = self.position();
                    self.bump();
                    self.bump();
                    let lo = self.scan_unicode_escape()?;
                    if (0xDC00..0xE000).contains(&lo) {
                        let combined = 0x10000 + ((v - 0xD800) << 10) + (lo - 0xDC00);
                        out.push(char::from_u32(combined).unwrap_or('\u{FFFD}'));
                        return Ok(());
                    }
                    self.reset_to(save);
                }
                out.push(char::from_u32(v).unwrap_or('\u{FFFD}'));
            }
            '0'..='7' => {
                // Legacy octal escape, at most three digits and at most \377.
                let mut value = c.to_digit(8).unwrap_or(0);
                let max_len = if c <= '3' { 3 } else { 2 };
                let mut len = 1;
                while len < max_len {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            self.bump();
                            value = value * 8 + d;
                            len += 1;
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or('\u{FFFD}'));
            }
            c if is_line_terminator(c) => {}
            c => out.push(c),
        }
        Ok(())
    }

    // ── String literal ──────────────────────────────────────────────────────

    fn scan_string(&mut self, quote: char, start: Position) -> ReflectResult<Token> {
        let mut cooked = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error_at(start, "unterminated string literal")),
                Some(c) if is_line_terminator(c) => {
                    return Err(self.error_at(start, "unterminated string literal"));
                }
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    self.scan_escape_sequence(&mut cooked)?;
                }
                Some(c) => {
                    self.bump();
                    cooked.push(c);
                }
            }
        }
        Ok(self.token(TokenKind::StringLiteral, TokenValue::Str(cooked), start))
    }

    // ── Regular-expression literal ──────────────────────────────────────────

    /// Reinterpret the `/` or `/=` token starting at `start` as the opening
    /// of a regular-expression literal and scan the whole literal.
    pub fn rescan_regexp(&mut self, start: Position) -> ReflectResult<Token> {
        self.reset_to(start);
        self.bump(); // opening '/'
        let body_start = self.pos;
        let mut in_class = false;
        loop {
            match self.peek() {
                None => return Err(self.error_at(start, "unterminated regular expression literal")),
                Some(c) if is_line_terminator(c) => {
                    return Err(self.error_at(start, "unterminated regular expression literal"));
                }
                Some('[') => {
                    in_class = true;
                    self.bump();
                }
                Some(']') => {
                    in_class = false;
                    self.bump();
                }
                Some('/') if !in_class => break,
                Some('\\') => {
                    self.bump();
                    match self.peek() {
                        Some(c) if !is_line_terminator(c) => {
                            self.bump();
                        }
                        _ => {
                            return Err(
                                self.error_at(start, "unterminated regular expression literal")
                            );
                        }
                    }
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        let source = self.source[body_start..self.pos].to_string();
        self.bump(); // closing '/'
        let flags_start = self.pos;
        while matches!(self.peek(), Some(c) if is_id_continue(c)) {
            self.bump();
        }
        let flags = self.source[flags_start..self.pos].to_string();
        if let Some(bad) = flags.chars().find(|c| !matches!(c, 'g' | 'i' | 'm' | 'y')) {
            return Err(self.error_at(start, format!("invalid regular expression flag {bad}")));
        }
        Ok(self.token(
            TokenKind::RegExpLiteral,
            TokenValue::RegExp { source, flags },
            start,
        ))
    }

    // ── Numeric literal ─────────────────────────────────────────────────────

    fn scan_decimal_digits(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
    }

    /// Consume an optional exponent part (`e` / `E`, optional sign, digits).
    fn scan_exponent(&mut self) -> ReflectResult<()> {
        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                return Err(self.error("missing exponent"));
            }
            self.scan_decimal_digits();
        }
        Ok(())
    }

    /// Scan a numeric literal given that `first` has already been consumed.
    fn scan_numeric(&mut self, first: char, start: Position) -> ReflectResult<Token> {
        let num_start = start.offset;
        let value = if first == '0' && matches!(self.peek(), Some('x' | 'X')) {
            self.bump();
            let digits_start = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                self.bump();
            }
            if self.pos == digits_start {
                return Err(self.error("missing hexadecimal digits after '0x'"));
            }
            parse_radix(&self.source[digits_start..self.pos], 16)
        } else if first == '0' && matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.scan_decimal_digits();
            let digits = &self.source[num_start + 1..self.pos];
            if digits.chars().all(|c| matches!(c, '0'..='7')) {
                parse_radix(digits, 8)
            } else {
                // `089` is a decimal literal with a leading zero.
                if self.eat('.') {
                    self.scan_decimal_digits();
                }
                self.scan_exponent()?;
                parse_decimal(&self.source[num_start..self.pos])
            }
        } else {
            self.scan_decimal_digits();
            if first != '.' && self.eat('.') {
                self.scan_decimal_digits();
            }
            self.scan_exponent()?;
            parse_decimal(&self.source[num_start..self.pos])
        };
        if matches!(self.peek(), Some(c) if is_id_start(c) || c.is_ascii_digit()) {
            return Err(self.error("identifier starts immediately after numeric literal"));
        }
        Ok(self.token(TokenKind::NumericLiteral, TokenValue::Number(value), start))
    }

    // ── Identifier / keyword ────────────────────────────────────────────────

    /// Scan an identifier whose first character has not yet been consumed.
    fn scan_identifier(&mut self, start: Position) -> ReflectResult<Token> {
        let mut name = String::new();
        let mut escaped = false;
        loop {
            match self.peek() {
                Some('\\') => {
                    self.bump();
                    if !self.eat('u') {
                        return Err(self.error("illegal character in identifier"));
                    }
                    let v = self.scan_unicode_escape()?;
                    let c = char::from_u32(v)
                        .filter(|&c| {
                            if name.is_empty() {
                                is_id_start(c)
                            } else {
                                is_id_continue(c)
                            }
                        })
                        .ok_or_else(|| self.error("illegal character in identifier"))?;
                    name.push(c);
                    escaped = true;
                }
                Some(c) if (name.is_empty() && is_id_start(c)) || is_id_continue(c) => {
                    self.bump();
                    name.push(c);
                }
                _ => break,
            }
        }
        // Escaped spellings of reserved words are plain identifiers.
        let kind = if escaped {
            TokenKind::Identifier
        } else {
            keyword_kind(&name).unwrap_or(TokenKind::Identifier)
        };
        Ok(self.token(kind, TokenValue::Str(name), start))
    }

    fn token(&self, kind: TokenKind, value: TokenValue, start: Position) -> Token {
        Token {
            kind,
            value,
            span: Span {
                start,
                end: self.position(),
            },
            had_line_terminator_before: false,
        }
    }

    // ── Main public API ─────────────────────────────────────────────────────

    /// Scan and return the next [`Token`].
    ///
    /// Returns a token with [`TokenKind::Eof`] when the input is exhausted.
    pub fn next_token(&mut self) -> ReflectResult<Token> {
        let had_lt = self.skip_trivia()?;
        let mut tok = self.scan_significant()?;
        tok.had_line_terminator_before = had_lt;
        Ok(tok)
    }

    fn scan_significant(&mut self) -> ReflectResult<Token> {
        use TokenKind::*;

        let start = self.position();
        let Some(c) = self.peek() else {
            return Ok(self.token(Eof, TokenValue::None, start));
        };

        if is_id_start(c) || c == '\\' {
            return self.scan_identifier(start);
        }
        if c.is_ascii_digit()
            || (c == '.' && matches!(self.peek2(), Some(d) if d.is_ascii_digit()))
        {
            self.bump();
            return self.scan_numeric(c, start);
        }

        self.bump();
        let kind = match c {
            '"' | '\'' => return self.scan_string(c, start),
            '{' => LeftBrace,
            '}' => RightBrace,
            '(' => LeftParen,
            ')' => RightParen,
            '[' => LeftBracket,
            ']' => RightBracket,
            ';' => Semicolon,
            ',' => Comma,
            '~' => Tilde,
            '?' => Question,
            '.' => {
                if self.eat_str("..") {
                    DotDotDot
                } else if cfg!(feature = "e4x") && self.eat('.') {
                    DotDot
                } else {
                    Dot
                }
            }
            ':' => {
                if cfg!(feature = "e4x") && self.eat(':') {
                    ColonColon
                } else {
                    Colon
                }
            }
            '@' if cfg!(feature = "e4x") => At,
            '=' => {
                if self.eat('=') {
                    if self.eat('=') { EqualEqualEqual } else { EqualEqual }
                } else {
                    Equal
                }
            }
            '!' => {
                if self.eat('=') {
                    if self.eat('=') { BangEqualEqual } else { BangEqual }
                } else {
                    Bang
                }
            }
            '+' => {
                if self.eat('+') {
                    PlusPlus
                } else if self.eat('=') {
                    PlusEqual
                } else {
                    Plus
                }
            }
            '-' => {
                if self.eat('-') {
                    MinusMinus
                } else if self.eat('=') {
                    MinusEqual
                } else {
                    Minus
                }
            }
            '*' => {
                if self.eat('=') { StarEqual } else { Star }
            }
            '/' => {
                if self.eat('=') { SlashEqual } else { Slash }
            }
            '%' => {
                if self.eat('=') { PercentEqual } else { Percent }
            }
            '^' => {
                if self.eat('=') { CaretEqual } else { Caret }
            }
            '&' => {
                if self.eat('&') {
                    AmpersandAmpersand
                } else if self.eat('=') {
                    AmpersandEqual
                } else {
                    Ampersand
                }
            }
            '|' => {
                if self.eat('|') {
                    PipePipe
                } else if self.eat('=') {
                    PipeEqual
                } else {
                    Pipe
                }
            }
            '<' => {
                if self.eat('<') {
                    if self.eat('=') { LessLessEqual } else { LessLess }
                } else if self.eat('=') {
                    LessEqual
                } else {
                    Less
                }
            }
            '>' => {
                if self.eat('>') {
                    if self.eat('>') {
                        if self.eat('=') {
                            GreaterGreaterGreaterEqual
                        } else {
                            GreaterGreaterGreater
                        }
                    } else if self.eat('=') {
                        GreaterGreaterEqual
                    } else {
                        GreaterGreater
                    }
                } else if self.eat('=') {
                    GreaterEqual
                } else {
                    Greater
                }
            }
            _ => {
                return Err(self.error_at(start, format!("illegal character {c:?}")));
            }
        };
        Ok(self.token(kind, TokenValue::None, start))
    }

    /// Convenience: tokenize the entire `source` string and return all tokens
    /// (the [`TokenKind::Eof`] sentinel is **not** included).  Every `/` is
    /// returned as a punctuator.
    ///
    /// # Errors
    ///
    /// Returns the first [`ReflectError::SyntaxError`] encountered.
    pub fn tokenize_all(source: &'src str) -> ReflectResult<Vec<Token>> {
        let mut scanner = Scanner::new(source);
        let mut tokens = Vec::new();
        loop {
            let tok = scanner.next_token()?;
            if tok.kind == TokenKind::Eof {
                break;
            }
            tokens.push(tok);
        }
        Ok(tokens)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Numeric parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Accumulate digits in `radix` as an `f64`, so literals wider than 64 bits
/// still round the way the engine's `Number` would.
fn parse_radix(digits: &str, radix: u32) -> f64 {
    digits
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d))
}

fn parse_decimal(raw: &str) -> f64 {
    raw.parse::<f64>().unwrap_or(f64::NAN)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Scanner::tokenize_all(src)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn tokens(src: &str) -> Vec<Token> {
        Scanner::tokenize_all(src).unwrap()
    }

    // ── Keywords / identifiers ───────────────────────────────────────────────

    #[test]
    fn test_keywords_reserved() {
        let toks = kinds("break case catch const let yield typeof void in instanceof");
        assert_eq!(
            toks,
            vec![
                TokenKind::Break,
                TokenKind::Case,
                TokenKind::Catch,
                TokenKind::Const,
                TokenKind::Let,
                TokenKind::Yield,
                TokenKind::Typeof,
                TokenKind::Void,
                TokenKind::In,
                TokenKind::Instanceof,
            ]
        );
    }

    #[test]
    fn test_contextual_words_are_identifiers() {
        let toks = tokens("of each get set");
        assert!(toks.iter().all(|t| t.kind == TokenKind::Identifier));
        assert!(toks[1].is_ident("each"));
    }

    #[test]
    fn test_identifier_unicode_escape_is_cooked() {
        let toks = tokens(r"\u0061bc");
        assert_eq!(toks[0].kind, TokenKind::Identifier);
        assert_eq!(toks[0].text(), "abc");
    }

    #[test]
    fn test_escaped_keyword_is_identifier() {
        let toks = tokens(r"v\u0061r");
        assert_eq!(toks[0].kind, TokenKind::Identifier);
        assert_eq!(toks[0].text(), "var");
    }

    // ── Numbers ──────────────────────────────────────────────────────────────

    #[test]
    fn test_numeric_values() {
        let toks = tokens("0 42 3.5 .5 1e3 0x1F 017 089 5.");
        let values: Vec<f64> = toks
            .iter()
            .map(|t| match t.value {
                TokenValue::Number(n) => n,
                _ => panic!("expected number"),
            })
            .collect();
        assert_eq!(values, vec![0.0, 42.0, 3.5, 0.5, 1000.0, 31.0, 15.0, 89.0, 5.0]);
    }

    #[test]
    fn test_numeric_followed_by_identifier_is_error() {
        assert!(Scanner::tokenize_all("3in").is_err());
    }

    // ── Strings ──────────────────────────────────────────────────────────────

    #[test]
    fn test_string_escapes_are_cooked() {
        let toks = tokens(r#""a\nb\x41B\u{43}\101\'""#);
        assert_eq!(toks[0].text(), "a\nbABCA'");
    }

    #[test]
    fn test_string_surrogate_pair_escape() {
        let toks = tokens(r#""\uD83D\uDE00""#);
        assert_eq!(toks[0].text(), "\u{1F600}");
    }

    #[test]
    fn test_string_line_continuation() {
        let toks = tokens("'a\\\nb'");
        assert_eq!(toks[0].text(), "ab");
    }

    #[test]
    fn test_string_unterminated_error() {
        let err = Scanner::tokenize_all("'abc").unwrap_err();
        assert!(matches!(err, ReflectError::SyntaxError { line: 1, column: 0, .. }));
    }

    // ── Regular expressions ──────────────────────────────────────────────────

    #[test]
    fn test_slash_is_punctuator_until_rescanned() {
        let mut sc = Scanner::new("/a[/]b/gi;");
        let slash = sc.next_token().unwrap();
        assert_eq!(slash.kind, TokenKind::Slash);
        let re = sc.rescan_regexp(slash.span.start).unwrap();
        assert_eq!(re.kind, TokenKind::RegExpLiteral);
        assert_eq!(
            re.value,
            TokenValue::RegExp {
                source: "a[/]b".into(),
                flags: "gi".into()
            }
        );
        assert_eq!(sc.next_token().unwrap().kind, TokenKind::Semicolon);
    }

    #[test]
    fn test_regexp_rescan_from_slash_equal() {
        let mut sc = Scanner::new("/=x/");
        let tok = sc.next_token().unwrap();
        assert_eq!(tok.kind, TokenKind::SlashEqual);
        let re = sc.rescan_regexp(tok.span.start).unwrap();
        assert_eq!(
            re.value,
            TokenValue::RegExp {
                source: "=x".into(),
                flags: String::new()
            }
        );
    }

    #[test]
    fn test_error_unterminated_regexp() {
        let mut sc = Scanner::new("/abc\n/");
        let tok = sc.next_token().unwrap();
        assert!(sc.rescan_regexp(tok.span.start).is_err());
    }

    // ── Comments ─────────────────────────────────────────────────────────────

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("a // line\n/* block */ b"),
            vec![TokenKind::Identifier, TokenKind::Identifier]
        );
    }

    #[test]
    fn test_block_comment_with_line_terminator_sets_flag() {
        let toks = tokens("a /*\n*/ b");
        assert!(toks[1].had_line_terminator_before);
    }

    #[test]
    fn test_error_unterminated_block_comment() {
        assert!(Scanner::tokenize_all("/* never closed").is_err());
    }

    // ── Punctuators ──────────────────────────────────────────────────────────

    #[test]
    fn test_punctuators_shift_and_assign() {
        assert_eq!(
            kinds(">>>= >>= <<= >>> >> << >= <="),
            vec![
                TokenKind::GreaterGreaterGreaterEqual,
                TokenKind::GreaterGreaterEqual,
                TokenKind::LessLessEqual,
                TokenKind::GreaterGreaterGreater,
                TokenKind::GreaterGreater,
                TokenKind::LessLess,
                TokenKind::GreaterEqual,
                TokenKind::LessEqual,
            ]
        );
    }

    #[test]
    fn test_punctuators_equality_and_logic() {
        assert_eq!(
            kinds("=== !== == != && || ! ~"),
            vec![
                TokenKind::EqualEqualEqual,
                TokenKind::BangEqualEqual,
                TokenKind::EqualEqual,
                TokenKind::BangEqual,
                TokenKind::AmpersandAmpersand,
                TokenKind::PipePipe,
                TokenKind::Bang,
                TokenKind::Tilde,
            ]
        );
    }

    #[test]
    fn test_spread_dots() {
        assert_eq!(
            kinds("...a"),
            vec![TokenKind::DotDotDot, TokenKind::Identifier]
        );
    }

    #[cfg(feature = "e4x")]
    #[test]
    fn test_e4x_punctuators() {
        assert_eq!(
            kinds("a..b ns::c @d"),
            vec![
                TokenKind::Identifier,
                TokenKind::DotDot,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::ColonColon,
                TokenKind::Identifier,
                TokenKind::At,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_number_then_method_call() {
        assert_eq!(
            kinds("1..toString"),
            vec![TokenKind::NumericLiteral, TokenKind::Dot, TokenKind::Identifier]
        );
    }

    // ── Line tracking ─────────────────────────────────────────────────────────

    #[test]
    fn test_line_column_tracking() {
        let toks = tokens("x\n  y");
        assert_eq!(toks[0].span.start.line, 1);
        assert_eq!(toks[0].span.start.column, 0);
        assert_eq!(toks[1].span.start.line, 2);
        assert_eq!(toks[1].span.start.column, 2);
    }

    #[test]
    fn test_start_line_offset() {
        let mut sc = Scanner::with_start_line("\nx", 10);
        let tok = sc.next_token().unwrap();
        assert_eq!(tok.span.start.line, 11);
    }

    #[test]
    fn test_column_counts_utf16_units() {
        let toks = tokens("'\u{1F600}' x");
        assert_eq!(toks[1].span.start.column, 5);
    }

    #[test]
    fn test_crlf_counts_as_one_line() {
        let toks = tokens("x\r\ny");
        assert_eq!(toks[1].span.start.line, 2);
    }

    #[test]
    fn test_asi_flag() {
        let toks = tokens("x\ny z");
        assert!(!toks[0].had_line_terminator_before);
        assert!(toks[1].had_line_terminator_before);
        assert!(!toks[2].had_line_terminator_before);
    }

    #[test]
    fn test_illegal_character() {
        let err = Scanner::tokenize_all("a # b").unwrap_err();
        assert!(matches!(err, ReflectError::SyntaxError { column: 2, .. }));
    }
}
