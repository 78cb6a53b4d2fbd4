//! JavaScript parser producing zone-allocated parse trees.
//!
//! - [`scanner`] — lexer that converts raw source text into
//!   [`scanner::Token`]s.
//! - [`parse_node`] — the parse-tree node types the reflect layer consumes.
//!
//! The parser itself is a recursive-descent parser over one current token
//! plus at most one token of lookahead.  Its grammar is split by concern
//! across the private `statements`, `expressions`, `functions`, `patterns`
//! and (with the `e4x` feature) `xml` modules, each contributing an
//! `impl Parser` block.
//!
//! Entry point: [`parse`].

/// Parse-tree node definitions.
pub mod parse_node;
/// JavaScript lexer.
pub mod scanner;

mod expressions;
mod functions;
mod patterns;
mod statements;
#[cfg(feature = "e4x")]
mod xml;

use tracing::debug;

use crate::error::{ReflectError, ReflectResult};
use crate::parser::parse_node::{
    Arity, DefnFlags, IterFlags, JsOp, ListFlags, Node, ParseNode, ParseNodeKind, TokenPos,
};
use crate::parser::scanner::{Position, Scanner, Span, Token, TokenKind};
use crate::zone::Zone;

/// Parse `source` into a parse tree allocated in `zone`.
///
/// Lines are numbered from `start_line`.  Nesting deeper than `max_depth`
/// statements or expressions fails with
/// [`ReflectError::TooMuchRecursion`].
///
/// # Example
///
/// ```
/// use jsreflect_core::parser::parse;
/// use jsreflect_core::parser::parse_node::ParseNodeKind;
/// use jsreflect_core::zone::Zone;
///
/// let zone = Zone::new();
/// let program = parse(&zone, "x = 1;", 1, 1024).unwrap();
/// assert_eq!(program.kind, ParseNodeKind::StatementList);
/// assert_eq!(program.count(), 1);
/// ```
pub fn parse<'z>(
    zone: &'z Zone,
    source: &str,
    start_line: u32,
    max_depth: usize,
) -> ReflectResult<Node<'z>> {
    debug!(bytes = source.len(), start_line, "parse start");
    let mut parser = Parser::new(zone, source, start_line, max_depth)?;
    let program = parser.program()?;
    debug!(
        statements = program.count(),
        zone_bytes = zone.allocated_bytes(),
        "parse finished"
    );
    Ok(program)
}

// ─────────────────────────────────────────────────────────────────────────────
// Parser state
// ─────────────────────────────────────────────────────────────────────────────

/// Per-function state collected while parsing a function body.
#[derive(Debug, Default)]
struct FunctionContext {
    /// A `yield` appeared directly in this function.
    is_generator: bool,
}

pub(crate) struct Parser<'z, 'src> {
    zone: &'z Zone,
    scanner: Scanner<'src>,
    /// The current (not yet consumed) token.
    cur: Token,
    /// Lookahead buffer: at most one peeked token.
    peeked: Option<Token>,
    /// End of the most recently consumed token.
    prev_end: Position,
    depth: usize,
    max_depth: usize,
    /// `false` while parsing a `for` initializer, where `in` ends the
    /// expression.
    allow_in: bool,
    functions: Vec<FunctionContext>,
}

impl<'z, 'src> Parser<'z, 'src> {
    fn new(
        zone: &'z Zone,
        source: &'src str,
        start_line: u32,
        max_depth: usize,
    ) -> ReflectResult<Self> {
        let mut scanner = Scanner::with_start_line(source, start_line);
        let origin = scanner.position();
        let cur = scanner.next_token()?;
        Ok(Self {
            zone,
            scanner,
            cur,
            peeked: None,
            prev_end: origin,
            depth: 0,
            max_depth,
            allow_in: true,
            functions: Vec::new(),
        })
    }

    /// Program ::= Statement*
    fn program(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.prev_end;
        let mut items = Vec::new();
        while !self.at(TokenKind::Eof) {
            items.push(self.statement()?);
        }
        Ok(self.new_list(
            ParseNodeKind::StatementList,
            JsOp::Nop,
            self.span_from(start),
            &items,
            ListFlags::NONE,
        ))
    }

    // ── Token helpers ───────────────────────────────────────────────────────

    /// Consume the current token and return it.
    fn advance(&mut self) -> ReflectResult<Token> {
        let next = match self.peeked.take() {
            Some(tok) => tok,
            None => self.scanner.next_token()?,
        };
        let prev = std::mem::replace(&mut self.cur, next);
        self.prev_end = prev.span.end;
        Ok(prev)
    }

    /// The token after the current one.
    fn peek(&mut self) -> ReflectResult<&Token> {
        let tok = match self.peeked.take() {
            Some(tok) => tok,
            None => self.scanner.next_token()?,
        };
        Ok(self.peeked.insert(tok))
    }

    fn peek_kind(&mut self) -> ReflectResult<TokenKind> {
        Ok(self.peek()?.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.cur.kind == kind
    }

    /// Consume the current token if it has the given kind.
    fn eat(&mut self, kind: TokenKind) -> ReflectResult<bool> {
        if self.at(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Consume a token of the given kind or fail with `message`.
    fn expect(&mut self, kind: TokenKind, message: &str) -> ReflectResult<Token> {
        if self.at(kind) {
            self.advance()
        } else {
            Err(self.error_here(message))
        }
    }

    /// Automatic semicolon insertion.
    fn consume_semicolon(&mut self) -> ReflectResult<()> {
        if self.eat(TokenKind::Semicolon)? {
            return Ok(());
        }
        if self.at(TokenKind::RightBrace)
            || self.at(TokenKind::Eof)
            || self.cur.had_line_terminator_before
        {
            Ok(())
        } else {
            Err(self.error_here("missing ; before statement"))
        }
    }

    /// Re-read the current `/` or `/=` token as a regular-expression literal.
    fn rescan_regexp(&mut self) -> ReflectResult<()> {
        self.peeked = None;
        let had_lt = self.cur.had_line_terminator_before;
        let mut tok = self.scanner.rescan_regexp(self.cur.span.start)?;
        tok.had_line_terminator_before = had_lt;
        self.cur = tok;
        Ok(())
    }

    fn error_here(&self, message: &str) -> ReflectError {
        if self.at(TokenKind::Eof) && message == "syntax error" {
            return self.error_at(self.cur.span, "unexpected end of script");
        }
        self.error_at(self.cur.span, message)
    }

    fn error_at(&self, pos: TokenPos, message: &str) -> ReflectError {
        ReflectError::syntax(message, pos.start.line, pos.start.column)
    }

    /// The span from `start` to the end of the last consumed token.
    fn span_from(&self, start: Position) -> Span {
        Span {
            start,
            end: self.prev_end,
        }
    }

    // ── Recursion and context ───────────────────────────────────────────────

    /// Run `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> ReflectResult<T>) -> ReflectResult<T> {
        if self.depth >= self.max_depth {
            return Err(ReflectError::TooMuchRecursion);
        }
        self.depth += 1;
        let result = crate::stack::with_headroom(|| f(self));
        self.depth -= 1;
        result
    }

    /// Run `f` with `in` allowed or disallowed as a binary operator.
    fn with_allow_in<T>(
        &mut self,
        allow: bool,
        f: impl FnOnce(&mut Self) -> ReflectResult<T>,
    ) -> ReflectResult<T> {
        let saved = std::mem::replace(&mut self.allow_in, allow);
        let result = f(self);
        self.allow_in = saved;
        result
    }

    fn in_function(&self) -> bool {
        !self.functions.is_empty()
    }

    // ── Node construction ───────────────────────────────────────────────────

    fn alloc(&self, kind: ParseNodeKind, op: JsOp, pos: TokenPos, arity: Arity<'z>) -> Node<'z> {
        self.zone.alloc(ParseNode::new(kind, op, pos, arity))
    }

    fn atom(&self, text: &str) -> &'z str {
        self.zone.alloc_str(text)
    }

    fn new_nullary(&self, kind: ParseNodeKind, pos: TokenPos) -> Node<'z> {
        self.alloc(kind, JsOp::Nop, pos, Arity::Nullary)
    }

    fn new_unary(&self, kind: ParseNodeKind, op: JsOp, pos: TokenPos, kid: Option<Node<'z>>) -> Node<'z> {
        self.alloc(kind, op, pos, Arity::Unary(kid))
    }

    fn new_binary(
        &self,
        kind: ParseNodeKind,
        op: JsOp,
        pos: TokenPos,
        left: Option<Node<'z>>,
        right: Node<'z>,
    ) -> Node<'z> {
        self.alloc(
            kind,
            op,
            pos,
            Arity::Binary {
                left,
                right,
                iflags: IterFlags::Plain,
            },
        )
    }

    fn new_ternary(
        &self,
        kind: ParseNodeKind,
        pos: TokenPos,
        a: Option<Node<'z>>,
        b: Option<Node<'z>>,
        c: Option<Node<'z>>,
    ) -> Node<'z> {
        self.alloc(kind, JsOp::Nop, pos, Arity::Ternary(a, b, c))
    }

    fn new_list(
        &self,
        kind: ParseNodeKind,
        op: JsOp,
        pos: TokenPos,
        items: &[Node<'z>],
        xflags: ListFlags,
    ) -> Node<'z> {
        let items = self.zone.alloc_slice(items);
        self.alloc(kind, op, pos, Arity::List { items, xflags })
    }

    fn new_name(
        &self,
        atom: &'z str,
        pos: TokenPos,
        expr: Option<Node<'z>>,
        dflags: DefnFlags,
        slot: Option<u32>,
    ) -> Node<'z> {
        self.alloc(
            ParseNodeKind::Name,
            JsOp::Nop,
            pos,
            Arity::Name {
                atom,
                expr,
                dflags,
                slot,
            },
        )
    }

    /// An empty `Comma` list: an array elision.
    fn new_elision(&self, pos: TokenPos) -> Node<'z> {
        self.new_list(ParseNodeKind::Comma, JsOp::Nop, pos, &[], ListFlags::NONE)
    }
}
