//! E4X grammar: XML literals, qualified names, attribute selectors,
//! filters and `default xml namespace`.
//!
//! XML literals are read character by character straight from the scanner.
//! When the parser reaches a `<` in operand position it rewinds the scanner
//! to that `<`, reads the markup, and resumes ordinary tokenization after
//! it.  `{…}` escapes inside markup switch back to token mode for the
//! enclosed expression and rewind to the character after its `}`.

use crate::error::{ReflectError, ReflectResult};
use crate::parser::Parser;
use crate::parser::parse_node::{Arity, DefnFlags, JsOp, ListFlags, Node, ParseNodeKind};
use crate::parser::scanner::{Position, Span, TokenKind, is_id_continue, is_id_start};

fn is_xml_name_start(c: char) -> bool {
    is_id_start(c) || c == ':'
}

fn is_xml_name_char(c: char) -> bool {
    is_id_continue(c) || matches!(c, ':' | '-' | '.')
}

impl<'z, 'src> Parser<'z, 'src> {
    // ── Expression forms ────────────────────────────────────────────────────

    /// `default xml namespace = expr;`
    pub(super) fn default_xml_namespace(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.advance()?;
        self.advance()?;
        if !self.cur.is_ident("namespace") {
            return Err(self.error_here("missing namespace after default xml"));
        }
        self.advance()?;
        self.expect(TokenKind::Equal, "missing = after default xml namespace")?;
        let namespace = self.expression()?;
        self.consume_semicolon()?;
        Ok(self.new_unary(ParseNodeKind::DefXmlNs, JsOp::Nop, self.span_from(start), Some(namespace)))
    }

    /// The E4X forms that may follow `.`: filters `a.(cond)`, `a.*`,
    /// `a.@attr` and `a.ns::name`.  Returns `None` for an ordinary
    /// property name.
    pub(super) fn xml_member_suffix(
        &mut self,
        start: Position,
        object: Node<'z>,
    ) -> ReflectResult<Option<Node<'z>>> {
        let kind = self.cur.kind;
        let selector = match kind {
            TokenKind::LeftParen => {
                self.advance()?;
                let filter = self.with_allow_in(true, |p| p.expression())?;
                self.expect(TokenKind::RightParen, "missing ) in parenthetical")?;
                return Ok(Some(self.new_binary(
                    ParseNodeKind::Filter,
                    JsOp::Nop,
                    self.span_from(start),
                    Some(object),
                    filter,
                )));
            }
            TokenKind::Star | TokenKind::At => self.xml_property_selector()?,
            _ if (kind == TokenKind::Identifier || kind.is_keyword())
                && self.peek_kind()? == TokenKind::ColonColon =>
            {
                self.xml_property_selector()?
            }
            _ => return Ok(None),
        };
        Ok(Some(self.new_binary(
            ParseNodeKind::Elem,
            JsOp::Nop,
            self.span_from(start),
            Some(object),
            selector,
        )))
    }

    /// A name, `*`, qualified name or attribute selector, as found after
    /// `..` or `.`.
    pub(super) fn xml_property_selector(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        let kind = self.cur.kind;
        let base = match kind {
            TokenKind::At => return self.xml_attribute_selector(),
            TokenKind::Star => {
                let tok = self.advance()?;
                self.new_nullary(ParseNodeKind::AnyName, tok.span)
            }
            _ if kind == TokenKind::Identifier || kind.is_keyword() => {
                let tok = self.advance()?;
                self.new_qname_part(tok.text(), tok.span)
            }
            _ => return Err(self.error_here("missing name after .. operator")),
        };
        if self.at(TokenKind::ColonColon) {
            return self.xml_qualified_suffix(start, base);
        }
        Ok(base)
    }

    /// `ns::name` or `function::name`, with the namespace as the current
    /// token.
    pub(super) fn xml_qualified_name(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        let tok = self.advance()?;
        let namespace = if tok.kind == TokenKind::Function {
            self.new_nullary(ParseNodeKind::FunctionNs, tok.span)
        } else {
            self.new_qname_part(tok.text(), tok.span)
        };
        self.xml_qualified_suffix(start, namespace)
    }

    /// `::name`, `::*` or `::[expr]` after `namespace`.
    pub(super) fn xml_qualified_suffix(
        &mut self,
        start: Position,
        namespace: Node<'z>,
    ) -> ReflectResult<Node<'z>> {
        self.expect(TokenKind::ColonColon, "missing :: in qualified name")?;
        let kind = self.cur.kind;
        let local = match kind {
            TokenKind::LeftBracket => {
                self.advance()?;
                let name = self.with_allow_in(true, |p| p.expression())?;
                self.expect(TokenKind::RightBracket, "missing ] in index expression")?;
                return Ok(self.new_binary(
                    ParseNodeKind::DblColon,
                    JsOp::Nop,
                    self.span_from(start),
                    Some(namespace),
                    name,
                ));
            }
            TokenKind::Star => {
                self.advance()?;
                "*"
            }
            _ if kind == TokenKind::Identifier || kind.is_keyword() => {
                let tok = self.advance()?;
                self.atom(tok.text())
            }
            _ => return Err(self.error_here("missing name after ::")),
        };
        Ok(self.alloc(
            ParseNodeKind::DblColon,
            JsOp::Nop,
            self.span_from(start),
            Arity::Name {
                atom: local,
                expr: Some(namespace),
                dflags: DefnFlags::NONE,
                slot: None,
            },
        ))
    }

    /// `@name`, `@ns::name`, `@*` or `@[expr]`.
    pub(super) fn xml_attribute_selector(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.expect(TokenKind::At, "missing @")?;
        let kid = if self.eat(TokenKind::LeftBracket)? {
            let name = self.with_allow_in(true, |p| p.expression())?;
            self.expect(TokenKind::RightBracket, "missing ] in index expression")?;
            name
        } else {
            match self.xml_property_selector() {
                Ok(kid) if kid.is_kind(ParseNodeKind::At) => {
                    return Err(self.error_at(kid.pos, "missing name after @"));
                }
                other => other?,
            }
        };
        Ok(self.new_unary(ParseNodeKind::At, JsOp::Nop, self.span_from(start), Some(kid)))
    }

    fn new_qname_part(&self, text: &str, pos: Span) -> Node<'z> {
        let atom = self.atom(text);
        self.alloc(
            ParseNodeKind::Name,
            JsOp::QNamePart,
            pos,
            Arity::Name {
                atom,
                expr: None,
                dflags: DefnFlags::NONE,
                slot: None,
            },
        )
    }

    // ── Markup ──────────────────────────────────────────────────────────────

    /// An XML literal starting at the current `<` token.
    pub(super) fn xml_literal(&mut self) -> ReflectResult<Node<'z>> {
        self.peeked = None;
        self.scanner.reset_to(self.cur.span.start);
        let node = self.xml_markup()?;
        self.resume_tokens()?;
        Ok(node)
    }

    /// Continue ordinary tokenization at the scanner's position.
    fn resume_tokens(&mut self) -> ReflectResult<()> {
        self.prev_end = self.scanner.position();
        self.peeked = None;
        self.cur = self.scanner.next_token()?;
        Ok(())
    }

    fn xml_pos(&self, start: Position) -> Span {
        Span {
            start,
            end: self.scanner.position(),
        }
    }

    fn xml_error(&self, message: &str) -> ReflectError {
        self.scanner.error_at(self.scanner.position(), message)
    }

    fn xml_markup(&mut self) -> ReflectResult<Node<'z>> {
        self.nested(|p| p.xml_markup_inner())
    }

    fn xml_markup_inner(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.scanner.position();
        if self.scanner.eat_str("<!--") {
            let text = self.xml_read_until("-->", "unterminated XML comment")?;
            return Ok(self.alloc(ParseNodeKind::XmlComment, JsOp::Nop, self.xml_pos(start), Arity::Atom(text)));
        }
        if self.scanner.eat_str("<![CDATA[") {
            let text = self.xml_read_until("]]>", "unterminated XML CDATA section")?;
            return Ok(self.alloc(ParseNodeKind::XmlCdata, JsOp::Nop, self.xml_pos(start), Arity::Atom(text)));
        }
        if self.scanner.eat_str("<?") {
            let target = self.xml_read_name_run();
            if target.is_empty() {
                return Err(self.xml_error("missing XML processing instruction target"));
            }
            self.xml_skip_space();
            let data = self.xml_read_until("?>", "unterminated XML processing instruction")?;
            return Ok(self.alloc(
                ParseNodeKind::XmlPi,
                JsOp::Nop,
                self.xml_pos(start),
                Arity::Pi { target, data },
            ));
        }
        if self.scanner.eat_str("<>") {
            let contents = self.xml_content()?;
            if !self.scanner.eat_str("</>") {
                return Err(self.xml_error("XML list is not terminated"));
            }
            return Ok(self.new_list(ParseNodeKind::XmlList, JsOp::Nop, self.xml_pos(start), &contents, ListFlags::NONE));
        }

        self.scanner.bump();
        let tag = self.xml_tag_body()?;
        if self.scanner.eat_str("/>") {
            return Ok(self.new_list(ParseNodeKind::XmlPtagC, JsOp::Nop, self.xml_pos(start), &tag, ListFlags::NONE));
        }
        if !self.scanner.eat_str(">") {
            return Err(self.xml_error("missing > in XML tag"));
        }
        let stag = self.new_list(ParseNodeKind::XmlStagO, JsOp::Nop, self.xml_pos(start), &tag, ListFlags::NONE);

        let mut items = vec![stag];
        items.extend(self.xml_content()?);

        let etag_start = self.scanner.position();
        if !self.scanner.eat_str("</") {
            return Err(self.xml_error("XML tag is not terminated"));
        }
        let end_name = self.xml_name()?;
        self.xml_skip_space();
        if !self.scanner.eat_str(">") {
            return Err(self.xml_error("missing > in XML tag"));
        }
        if let (Arity::Atom(open), Arity::Atom(close)) = (&tag[0].arity, &end_name.arity)
            && open != close
        {
            return Err(self.scanner.error_at(
                etag_start,
                format!("XML tag name mismatch (expected {open})"),
            ));
        }
        items.push(self.new_list(
            ParseNodeKind::XmlEtagO,
            JsOp::Nop,
            self.xml_pos(etag_start),
            &[end_name],
            ListFlags::NONE,
        ));
        Ok(self.new_list(ParseNodeKind::XmlElem, JsOp::Nop, self.xml_pos(start), &items, ListFlags::NONE))
    }

    /// Tag name followed by alternating attribute names and values.
    fn xml_tag_body(&mut self) -> ReflectResult<Vec<Node<'z>>> {
        let mut items = vec![self.xml_name()?];
        loop {
            self.xml_skip_space();
            if self.scanner.peek() == Some('>') || self.scanner.starts_with("/>") {
                return Ok(items);
            }
            let name = self.xml_name()?;
            self.xml_skip_space();
            if !self.scanner.eat_str("=") {
                return Err(self.xml_error("missing = in XML attribute"));
            }
            self.xml_skip_space();
            let value = match self.scanner.peek() {
                Some('{') => self.xml_escape()?,
                Some(quote @ ('"' | '\'')) => {
                    let start = self.scanner.position();
                    self.scanner.bump();
                    let text = self.xml_read_until(
                        if quote == '"' { "\"" } else { "'" },
                        "unterminated XML attribute value",
                    )?;
                    self.alloc(ParseNodeKind::XmlAttr, JsOp::Nop, self.xml_pos(start), Arity::Atom(text))
                }
                _ => return Err(self.xml_error("missing quote in XML attribute value")),
            };
            items.push(name);
            items.push(value);
        }
    }

    /// A tag or attribute name; a list when it contains `{…}` escapes.
    fn xml_name(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.scanner.position();
        let mut parts = Vec::new();
        loop {
            match self.scanner.peek() {
                Some('{') => parts.push(self.xml_escape()?),
                Some(c) if is_xml_name_start(c) || (!parts.is_empty() && is_xml_name_char(c)) => {
                    let part_start = self.scanner.position();
                    let text = self.xml_read_name_run();
                    parts.push(self.alloc(ParseNodeKind::XmlName, JsOp::Nop, self.xml_pos(part_start), Arity::Atom(text)));
                }
                _ => break,
            }
        }
        match parts.as_slice() {
            [] => Err(self.xml_error("missing XML name")),
            [single] if single.is_kind(ParseNodeKind::XmlName) => Ok(*single),
            _ => Ok(self.new_list(ParseNodeKind::XmlName, JsOp::Nop, self.xml_pos(start), &parts, ListFlags::NONE)),
        }
    }

    /// Element content up to (not including) the next `</`.
    fn xml_content(&mut self) -> ReflectResult<Vec<Node<'z>>> {
        let mut items = Vec::new();
        loop {
            if self.scanner.starts_with("</") {
                return Ok(items);
            }
            match self.scanner.peek() {
                None => return Err(self.xml_error("unterminated XML literal")),
                Some('{') => items.push(self.xml_escape()?),
                Some('<') => items.push(self.xml_markup()?),
                Some(_) => {
                    let start = self.scanner.position();
                    let from = start.offset;
                    while let Some(c) = self.scanner.peek() {
                        if c == '<' || c == '{' {
                            break;
                        }
                        self.scanner.bump();
                    }
                    let raw = &self.scanner.source()[from..self.scanner.position().offset];
                    let kind = if raw.chars().all(char::is_whitespace) {
                        ParseNodeKind::XmlSpace
                    } else {
                        ParseNodeKind::XmlText
                    };
                    let text = self.atom(raw);
                    items.push(self.alloc(kind, JsOp::Nop, self.xml_pos(start), Arity::Atom(text)));
                }
            }
        }
    }

    /// `{expr}` inside markup.
    fn xml_escape(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.scanner.position();
        self.scanner.bump();
        self.peeked = None;
        self.cur = self.scanner.next_token()?;
        let expr = self.with_allow_in(true, |p| p.expression())?;
        if !self.at(TokenKind::RightBrace) {
            return Err(self.error_here("missing } in XML expression"));
        }
        self.scanner.reset_to(self.cur.span.end);
        self.peeked = None;
        Ok(self.new_unary(ParseNodeKind::XmlCurlyExpr, JsOp::Nop, self.xml_pos(start), Some(expr)))
    }

    fn xml_skip_space(&mut self) {
        while self.scanner.peek().is_some_and(char::is_whitespace) {
            self.scanner.bump();
        }
    }

    fn xml_read_name_run(&mut self) -> &'z str {
        let from = self.scanner.position().offset;
        while self.scanner.peek().is_some_and(is_xml_name_char) {
            self.scanner.bump();
        }
        self.atom(&self.scanner.source()[from..self.scanner.position().offset])
    }

    /// Text up to `terminator`, consuming the terminator.
    fn xml_read_until(&mut self, terminator: &str, message: &str) -> ReflectResult<&'z str> {
        let from = self.scanner.position().offset;
        loop {
            if self.scanner.starts_with(terminator) {
                let text = self.atom(&self.scanner.source()[from..self.scanner.position().offset]);
                self.scanner.eat_str(terminator);
                return Ok(text);
            }
            if self.scanner.bump().is_none() {
                return Err(self.xml_error(message));
            }
        }
    }
}
