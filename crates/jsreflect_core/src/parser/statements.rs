//! Statement grammar.

use crate::error::ReflectResult;
use crate::parser::Parser;
use crate::parser::parse_node::{Arity, DefnFlags, IterFlags, JsOp, ListFlags, Node, ParseNodeKind};
use crate::parser::scanner::{Position, Span, TokenKind};

impl<'z, 'src> Parser<'z, 'src> {
    pub(super) fn statement(&mut self) -> ReflectResult<Node<'z>> {
        self.nested(|p| p.statement_inner())
    }

    fn statement_inner(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        let kind = self.cur.kind;
        match kind {
            TokenKind::LeftBrace => self.block_statement(),
            TokenKind::Var => self.declaration_statement(ParseNodeKind::Var),
            TokenKind::Const => self.declaration_statement(ParseNodeKind::Const),
            TokenKind::Let => {
                if self.peek_kind()? == TokenKind::LeftParen {
                    self.let_block(true)
                } else {
                    self.declaration_statement(ParseNodeKind::Let)
                }
            }
            TokenKind::Function => {
                #[cfg(feature = "e4x")]
                if self.peek_kind()? == TokenKind::ColonColon {
                    return self.expression_statement();
                }
                self.function_declaration()
            }
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::Do => self.do_while_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::Break => self.jump_statement(ParseNodeKind::Break),
            TokenKind::Continue => self.jump_statement(ParseNodeKind::Continue),
            TokenKind::Return => self.return_statement(),
            TokenKind::Throw => self.throw_statement(),
            TokenKind::Try => self.try_statement(),
            TokenKind::Switch => self.switch_statement(),
            TokenKind::With => self.with_statement(),
            TokenKind::Debugger => {
                self.advance()?;
                self.consume_semicolon()?;
                Ok(self.new_nullary(ParseNodeKind::Debugger, self.span_from(start)))
            }
            TokenKind::Semicolon => {
                self.advance()?;
                Ok(self.new_unary(ParseNodeKind::Semi, JsOp::Nop, self.span_from(start), None))
            }
            TokenKind::Identifier if self.peek_kind()? == TokenKind::Colon => {
                self.labeled_statement()
            }
            #[cfg(feature = "e4x")]
            TokenKind::Default if self.peek()?.is_ident("xml") => self.default_xml_namespace(),
            _ => self.expression_statement(),
        }
    }

    fn expression_statement(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        let expr = self.expression()?;
        self.consume_semicolon()?;
        Ok(self.new_unary(ParseNodeKind::Semi, JsOp::Nop, self.span_from(start), Some(expr)))
    }

    /// Statements up to (not including) a closing `}`.
    pub(super) fn statements_until_brace(&mut self) -> ReflectResult<Vec<Node<'z>>> {
        let mut items = Vec::new();
        while !self.at(TokenKind::RightBrace) {
            if self.at(TokenKind::Eof) {
                return Err(self.error_here("missing } in compound statement"));
            }
            items.push(self.statement()?);
        }
        Ok(items)
    }

    /// `{ … }`.  A block that declares with `let` gets its own lexical scope.
    pub(super) fn block_statement(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.expect(TokenKind::LeftBrace, "missing { before block")?;
        let items = self.statements_until_brace()?;
        self.expect(TokenKind::RightBrace, "missing } in compound statement")?;
        let pos = self.span_from(start);
        let list = self.new_list(ParseNodeKind::StatementList, JsOp::Nop, pos, &items, ListFlags::NONE);
        if declares_let(&items) {
            Ok(self.new_unary(ParseNodeKind::LexicalScope, JsOp::Nop, pos, Some(list)))
        } else {
            Ok(list)
        }
    }

    // ── Declarations ────────────────────────────────────────────────────────

    fn declaration_statement(&mut self, kind: ParseNodeKind) -> ReflectResult<Node<'z>> {
        let decl = self.variable_declaration(kind, false)?;
        self.consume_semicolon()?;
        Ok(decl)
    }

    /// `var`/`const`/`let` followed by declarators.  In a `for` head
    /// (`for_head`), destructuring declarators may omit the initializer.
    pub(super) fn variable_declaration(
        &mut self,
        kind: ParseNodeKind,
        for_head: bool,
    ) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.advance()?;
        let dflags = if kind == ParseNodeKind::Const {
            DefnFlags::CONST
        } else {
            DefnFlags::NONE
        };
        let mut items = Vec::new();
        loop {
            items.push(self.declarator(dflags, for_head)?);
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        Ok(self.new_list(kind, JsOp::Nop, self.span_from(start), &items, ListFlags::NONE))
    }

    /// A `Name` with optional initializer, or `Assign(pattern, init)`.
    fn declarator(&mut self, dflags: DefnFlags, for_head: bool) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        let target = self.binding_target(dflags)?;
        if let Arity::Name { atom, .. } = target.arity {
            if !self.eat(TokenKind::Equal)? {
                return Ok(target);
            }
            let init = self.assignment_expr()?;
            return Ok(self.new_name(atom, target.pos, Some(init), dflags, None));
        }
        if self.eat(TokenKind::Equal)? {
            let init = self.assignment_expr()?;
            return Ok(self.new_binary(
                ParseNodeKind::Assign,
                JsOp::Nop,
                self.span_from(start),
                Some(target),
                init,
            ));
        }
        if for_head {
            Ok(target)
        } else {
            Err(self.error_here("missing = in destructuring declaration"))
        }
    }

    /// `let (head) body`, as a statement or an expression.
    pub(super) fn let_block(&mut self, is_statement: bool) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.advance()?;
        let head_start = self.cur.span.start;
        self.expect(TokenKind::LeftParen, "missing ( before let head")?;
        let mut decls = Vec::new();
        if !self.at(TokenKind::RightParen) {
            loop {
                decls.push(self.with_allow_in(true, |p| p.declarator(DefnFlags::NONE, false))?);
                if !self.eat(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "missing ) after let head")?;
        let head = self.new_list(
            ParseNodeKind::Let,
            JsOp::Nop,
            self.span_from(head_start),
            &decls,
            ListFlags::NONE,
        );
        let body = if is_statement {
            self.statement()?
        } else {
            self.assignment_expr()?
        };
        let scope = self.new_unary(ParseNodeKind::LexicalScope, JsOp::Nop, body.pos, Some(body));
        Ok(self.new_binary(ParseNodeKind::Let, JsOp::Nop, self.span_from(start), Some(head), scope))
    }

    // ── Control flow ────────────────────────────────────────────────────────

    fn parenthesized_condition(&mut self) -> ReflectResult<Node<'z>> {
        self.expect(TokenKind::LeftParen, "missing ( before condition")?;
        let cond = self.with_allow_in(true, |p| p.expression())?;
        self.expect(TokenKind::RightParen, "missing ) after condition")?;
        Ok(cond)
    }

    fn if_statement(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.advance()?;
        let test = self.parenthesized_condition()?;
        let consequent = self.statement()?;
        let alternate = if self.eat(TokenKind::Else)? {
            Some(self.statement()?)
        } else {
            None
        };
        Ok(self.new_ternary(
            ParseNodeKind::If,
            self.span_from(start),
            Some(test),
            Some(consequent),
            alternate,
        ))
    }

    fn while_statement(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.advance()?;
        let test = self.parenthesized_condition()?;
        let body = self.statement()?;
        Ok(self.new_binary(ParseNodeKind::While, JsOp::Nop, self.span_from(start), Some(test), body))
    }

    fn do_while_statement(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.advance()?;
        let body = self.statement()?;
        self.expect(TokenKind::While, "missing while after do-loop body")?;
        let test = self.parenthesized_condition()?;
        self.eat(TokenKind::Semicolon)?;
        Ok(self.new_binary(ParseNodeKind::DoWhile, JsOp::Nop, self.span_from(start), Some(body), test))
    }

    /// All `for` forms.
    ///
    /// `for (var x = e in o)` is produced as `Seq[Var[x = e], For(…)]`, with
    /// the loop's own declaration holding just `x`.
    fn for_statement(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.advance()?;
        let mut iflags = IterFlags::Plain;
        if self.cur.is_ident("each") {
            self.advance()?;
            iflags = IterFlags::ForEach;
        }
        self.expect(TokenKind::LeftParen, "missing ( after for")?;
        let head_start = self.cur.span.start;

        let mut decl = None;
        let mut init = None;
        let kind = self.cur.kind;
        match kind {
            TokenKind::Semicolon => {}
            TokenKind::Var | TokenKind::Const => {
                let kind = if kind == TokenKind::Var {
                    ParseNodeKind::Var
                } else {
                    ParseNodeKind::Const
                };
                decl = Some(self.with_allow_in(false, |p| p.variable_declaration(kind, true))?);
            }
            TokenKind::Let if self.peek_kind()? != TokenKind::LeftParen => {
                decl = Some(
                    self.with_allow_in(false, |p| p.variable_declaration(ParseNodeKind::Let, true))?,
                );
            }
            _ => init = Some(self.with_allow_in(false, |p| p.expression())?),
        }

        let is_of = self.cur.is_ident("of");
        if self.at(TokenKind::In) || is_of {
            self.advance()?;
            if is_of {
                if iflags == IterFlags::ForEach {
                    return Err(self.error_at(self.span_from(start), "invalid for each loop"));
                }
                iflags = IterFlags::ForOf;
            }
            let object = if is_of {
                self.with_allow_in(true, |p| p.assignment_expr())?
            } else {
                self.with_allow_in(true, |p| p.expression())?
            };
            self.expect(TokenKind::RightParen, "missing ) after for-loop control")?;
            let head_pos = self.span_from(head_start);
            return self.for_in_rest(start, head_pos, decl, init, object, iflags);
        }

        if iflags == IterFlags::ForEach {
            return Err(self.error_at(self.span_from(start), "invalid for each loop"));
        }
        if let Some(decl) = decl {
            self.check_complete_declarators(decl)?;
        }
        self.expect(TokenKind::Semicolon, "missing ; after for-loop initializer")?;
        let test = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenKind::Semicolon, "missing ; after for-loop condition")?;
        let update = if self.at(TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenKind::RightParen, "missing ) after for-loop control")?;
        let head = self.new_ternary(
            ParseNodeKind::ForHead,
            self.span_from(head_start),
            decl.or(init),
            test,
            update,
        );
        let body = self.statement()?;
        Ok(self.new_for(self.span_from(start), head, body, IterFlags::Plain))
    }

    fn for_in_rest(
        &mut self,
        start: Position,
        head_pos: Span,
        decl: Option<Node<'z>>,
        init: Option<Node<'z>>,
        object: Node<'z>,
        iflags: IterFlags,
    ) -> ReflectResult<Node<'z>> {
        let Some(decl) = decl else {
            let target = match init {
                Some(target) => target,
                None => return Err(self.error_at(head_pos, "invalid for/in left-hand side")),
            };
            self.check_assignment_target(target, true, "invalid for/in left-hand side")?;
            let head = self.new_ternary(
                ParseNodeKind::ForIn,
                head_pos,
                None,
                Some(target),
                Some(object),
            );
            let body = self.statement()?;
            return Ok(self.new_for(self.span_from(start), head, body, iflags));
        };

        let [item] = decl.list()? else {
            return Err(self.error_at(decl.pos, "invalid for/in left-hand side"));
        };
        let item = *item;
        if item.is_kind(ParseNodeKind::Assign) {
            return Err(self.error_at(
                item.pos,
                "for-in loop variable declaration may not have an initializer",
            ));
        }

        // `for (var x = e in o)`: keep the initializer in a prelude.
        let prelude_init = item.is_kind(ParseNodeKind::Name) && item.name_expr()?.is_some();
        if prelude_init
            && (decl.kind != ParseNodeKind::Var || iflags == IterFlags::ForOf)
        {
            return Err(self.error_at(
                item.pos,
                "for-in loop variable declaration may not have an initializer",
            ));
        }
        let target = if prelude_init {
            self.new_name(item.atom()?, item.pos, None, item.dflags(), None)
        } else {
            item
        };
        let loop_decl = self.new_list(decl.kind, JsOp::Nop, decl.pos, &[target], ListFlags::FOR_IN_VAR);
        let kid1 = if decl.kind == ParseNodeKind::Let {
            self.new_unary(ParseNodeKind::LexicalScope, JsOp::Nop, decl.pos, Some(loop_decl))
        } else {
            loop_decl
        };
        let head = self.new_ternary(ParseNodeKind::ForIn, head_pos, Some(kid1), Some(target), Some(object));
        let body = self.statement()?;
        let for_node = self.new_for(self.span_from(start), head, body, iflags);
        if prelude_init {
            return Ok(self.new_list(
                ParseNodeKind::Seq,
                JsOp::Nop,
                self.span_from(start),
                &[decl, for_node],
                ListFlags::NONE,
            ));
        }
        Ok(for_node)
    }

    /// In a plain `for (;;)` head, destructuring declarators need an
    /// initializer.
    fn check_complete_declarators(&self, decl: Node<'z>) -> ReflectResult<()> {
        for item in decl.list()? {
            if matches!(item.kind, ParseNodeKind::Array | ParseNodeKind::Object) {
                return Err(self.error_at(item.pos, "missing = in destructuring declaration"));
            }
        }
        Ok(())
    }

    pub(super) fn new_for(
        &self,
        pos: Span,
        head: Node<'z>,
        body: Node<'z>,
        iflags: IterFlags,
    ) -> Node<'z> {
        self.alloc(
            ParseNodeKind::For,
            JsOp::Nop,
            pos,
            Arity::Binary {
                left: Some(head),
                right: body,
                iflags,
            },
        )
    }

    /// `break`/`continue` with an optional label.
    fn jump_statement(&mut self, kind: ParseNodeKind) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.advance()?;
        let label = if self.at(TokenKind::Identifier) && !self.cur.had_line_terminator_before {
            let tok = self.advance()?;
            Some(self.atom(tok.text()))
        } else {
            None
        };
        self.consume_semicolon()?;
        let arity = match label {
            Some(label) => Arity::Atom(label),
            None => Arity::Nullary,
        };
        Ok(self.alloc(kind, JsOp::Nop, self.span_from(start), arity))
    }

    fn return_statement(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        if !self.in_function() {
            return Err(self.error_here("return not in function"));
        }
        self.advance()?;
        let argument = if self.at(TokenKind::Semicolon)
            || self.at(TokenKind::RightBrace)
            || self.at(TokenKind::Eof)
            || self.cur.had_line_terminator_before
        {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume_semicolon()?;
        Ok(self.new_unary(ParseNodeKind::Return, JsOp::Nop, self.span_from(start), argument))
    }

    fn throw_statement(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.advance()?;
        if self.cur.had_line_terminator_before {
            return Err(self.error_here("no line break is allowed between 'throw' and its expression"));
        }
        let argument = self.expression()?;
        self.consume_semicolon()?;
        Ok(self.new_unary(ParseNodeKind::Throw, JsOp::Nop, self.span_from(start), Some(argument)))
    }

    /// `try` with any number of (guarded) catch clauses and an optional
    /// `finally`.  Each catch is wrapped in its own lexical scope.
    fn try_statement(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.advance()?;
        let block = self.block_statement()?;

        let mut catches = Vec::new();
        let mut seen_unguarded = false;
        let catches_start = self.cur.span.start;
        while self.at(TokenKind::Catch) {
            let catch_start = self.cur.span.start;
            if seen_unguarded {
                return Err(self.error_here("catch after unconditional catch"));
            }
            self.advance()?;
            self.expect(TokenKind::LeftParen, "missing ( before catch")?;
            let param = self.binding_target(DefnFlags::NONE)?;
            let guard = if self.eat(TokenKind::If)? {
                Some(self.expression()?)
            } else {
                None
            };
            seen_unguarded = guard.is_none();
            self.expect(TokenKind::RightParen, "missing ) after catch")?;
            let body = self.block_statement()?;
            let pos = self.span_from(catch_start);
            let catch = self.new_ternary(ParseNodeKind::Catch, pos, Some(param), guard, Some(body));
            catches.push(self.new_unary(ParseNodeKind::LexicalScope, JsOp::Nop, pos, Some(catch)));
        }
        let catch_list = if catches.is_empty() {
            None
        } else {
            Some(self.new_list(
                ParseNodeKind::CatchList,
                JsOp::Nop,
                self.span_from(catches_start),
                &catches,
                ListFlags::NONE,
            ))
        };

        let finalizer = if self.eat(TokenKind::Finally)? {
            Some(self.block_statement()?)
        } else {
            None
        };
        if catch_list.is_none() && finalizer.is_none() {
            return Err(self.error_here("missing catch or finally after try"));
        }
        Ok(self.new_ternary(
            ParseNodeKind::Try,
            self.span_from(start),
            Some(block),
            catch_list,
            finalizer,
        ))
    }

    /// `switch`.  The case list is wrapped in a lexical scope when any case
    /// body declares with `let`.
    fn switch_statement(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.advance()?;
        self.expect(TokenKind::LeftParen, "missing ( before switch expression")?;
        let discriminant = self.with_allow_in(true, |p| p.expression())?;
        self.expect(TokenKind::RightParen, "missing ) after switch expression")?;
        let body_start = self.cur.span.start;
        self.expect(TokenKind::LeftBrace, "missing { before switch body")?;

        let mut cases = Vec::new();
        let mut seen_default = false;
        let mut lexical = false;
        while !self.at(TokenKind::RightBrace) {
            let case_start = self.cur.span.start;
            let (kind, test) = match self.cur.kind {
                TokenKind::Case => {
                    self.advance()?;
                    (ParseNodeKind::Case, Some(self.expression()?))
                }
                TokenKind::Default => {
                    if seen_default {
                        return Err(self.error_here("more than one switch default"));
                    }
                    seen_default = true;
                    self.advance()?;
                    (ParseNodeKind::Default, None)
                }
                _ => return Err(self.error_here("invalid switch statement")),
            };
            self.expect(TokenKind::Colon, "missing : after case label")?;
            let stmts_start = self.cur.span.start;
            let mut stmts = Vec::new();
            while !self.at_case_boundary()? {
                stmts.push(self.statement()?);
            }
            lexical |= declares_let(&stmts);
            let body = self.new_list(
                ParseNodeKind::StatementList,
                JsOp::Nop,
                self.span_from(stmts_start),
                &stmts,
                ListFlags::NONE,
            );
            cases.push(self.new_binary(kind, JsOp::Nop, self.span_from(case_start), test, body));
        }
        self.expect(TokenKind::RightBrace, "missing } after case list")?;

        let body_pos = self.span_from(body_start);
        let case_list = self.new_list(ParseNodeKind::StatementList, JsOp::Nop, body_pos, &cases, ListFlags::NONE);
        let cases_node = if lexical {
            self.new_unary(ParseNodeKind::LexicalScope, JsOp::Nop, body_pos, Some(case_list))
        } else {
            case_list
        };
        Ok(self.new_binary(
            ParseNodeKind::Switch,
            JsOp::Nop,
            self.span_from(start),
            Some(discriminant),
            cases_node,
        ))
    }

    fn at_case_boundary(&mut self) -> ReflectResult<bool> {
        Ok(match self.cur.kind {
            TokenKind::Case | TokenKind::RightBrace => true,
            TokenKind::Eof => return Err(self.error_here("missing } after case list")),
            TokenKind::Default => {
                #[cfg(feature = "e4x")]
                if self.peek()?.is_ident("xml") {
                    return Ok(false);
                }
                true
            }
            _ => false,
        })
    }

    fn with_statement(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.advance()?;
        self.expect(TokenKind::LeftParen, "missing ( before with-statement object")?;
        let object = self.with_allow_in(true, |p| p.expression())?;
        self.expect(TokenKind::RightParen, "missing ) after with-statement object")?;
        let body = self.statement()?;
        Ok(self.new_binary(ParseNodeKind::With, JsOp::Nop, self.span_from(start), Some(object), body))
    }

    fn labeled_statement(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        let label = self.advance()?;
        let label = self.atom(label.text());
        self.expect(TokenKind::Colon, "missing : after label")?;
        let body = self.statement()?;
        let node = self.alloc(
            ParseNodeKind::Label,
            JsOp::Nop,
            self.span_from(start),
            Arity::Name {
                atom: label,
                expr: Some(body),
                dflags: DefnFlags::NONE,
                slot: None,
            },
        );
        Ok(node)
    }
}

/// `true` when a statement list directly contains a `let` declaration.
fn declares_let(items: &[Node<'_>]) -> bool {
    items
        .iter()
        .any(|item| item.is_kind(ParseNodeKind::Let) && item.is_list())
}

#[cfg(test)]
mod tests {
    use crate::error::ReflectError;
    use crate::parser::parse;
    use crate::parser::parse_node::{IterFlags, ListFlags, Node, ParseNodeKind};
    use crate::zone::Zone;

    fn first<'z>(zone: &'z Zone, src: &str) -> Node<'z> {
        let program = parse(zone, src, 1, 1024).unwrap_or_else(|e| panic!("{src:?}: {e}"));
        program.list().unwrap()[0]
    }

    fn syntax_error(src: &str) -> String {
        let zone = Zone::new();
        match parse(&zone, src, 1, 1024) {
            Err(e @ ReflectError::SyntaxError { .. }) => e.to_string(),
            other => panic!("{src:?}: expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_var_declarators() {
        let zone = Zone::new();
        let decl = first(&zone, "var a = 1, b;");
        assert_eq!(decl.kind, ParseNodeKind::Var);
        let items = decl.list().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].name_expr().unwrap().is_some());
        assert!(items[1].name_expr().unwrap().is_none());
    }

    #[test]
    fn test_destructuring_declarator_is_assign() {
        let zone = Zone::new();
        let decl = first(&zone, "var [a, b] = c;");
        let item = decl.list().unwrap()[0];
        assert_eq!(item.kind, ParseNodeKind::Assign);
        let (left, _) = item.pair().unwrap();
        assert_eq!(left.kind, ParseNodeKind::Array);
    }

    #[test]
    fn test_destructuring_without_initializer_is_error() {
        assert!(syntax_error("var [a];").contains("missing = in destructuring declaration"));
    }

    #[test]
    fn test_empty_and_expression_statements() {
        let zone = Zone::new();
        let empty = first(&zone, ";");
        assert_eq!(empty.kind, ParseNodeKind::Semi);
        assert!(empty.kid().unwrap().is_none());
        let expr = first(&zone, "x;");
        assert!(expr.kid().unwrap().is_some());
    }

    #[test]
    fn test_block_with_let_gets_lexical_scope() {
        let zone = Zone::new();
        let plain = first(&zone, "{ x; }");
        assert_eq!(plain.kind, ParseNodeKind::StatementList);
        let scoped = first(&zone, "{ let x = 1; }");
        assert_eq!(scoped.kind, ParseNodeKind::LexicalScope);
        assert_eq!(scoped.required_kid().unwrap().kind, ParseNodeKind::StatementList);
    }

    #[test]
    fn test_for_in_with_initializer_has_prelude() {
        let zone = Zone::new();
        let seq = first(&zone, "for (var x = 1 in o);");
        assert_eq!(seq.kind, ParseNodeKind::Seq);
        let [prelude, for_node] = seq.list().unwrap() else {
            panic!("expected two items");
        };
        assert_eq!(prelude.kind, ParseNodeKind::Var);
        let (head, _) = for_node.pair().unwrap();
        assert_eq!(head.kind, ParseNodeKind::ForIn);
        let (decl, target, _) = head.ternary().unwrap();
        let decl = decl.unwrap();
        assert!(decl.xflags().contains(ListFlags::FOR_IN_VAR));
        assert!(target.unwrap().name_expr().unwrap().is_none());
    }

    #[test]
    fn test_for_each_and_for_of_flags() {
        let zone = Zone::new();
        assert_eq!(first(&zone, "for each (x in o);").iflags(), IterFlags::ForEach);
        assert_eq!(first(&zone, "for (x of o);").iflags(), IterFlags::ForOf);
        assert_eq!(first(&zone, "for (x in o);").iflags(), IterFlags::Plain);
    }

    #[test]
    fn test_for_let_in_is_scoped() {
        let zone = Zone::new();
        let for_node = first(&zone, "for (let k in o);");
        let (head, _) = for_node.pair().unwrap();
        let (decl, _, _) = head.ternary().unwrap();
        assert_eq!(decl.unwrap().kind, ParseNodeKind::LexicalScope);
    }

    #[test]
    fn test_classic_for_head() {
        let zone = Zone::new();
        let for_node = first(&zone, "for (var i = 0; i < n; i++) {}");
        let (head, body) = for_node.pair().unwrap();
        assert_eq!(head.kind, ParseNodeKind::ForHead);
        let (init, test, update) = head.ternary().unwrap();
        assert_eq!(init.unwrap().kind, ParseNodeKind::Var);
        assert_eq!(test.unwrap().kind, ParseNodeKind::Lt);
        assert_eq!(update.unwrap().kind, ParseNodeKind::PostIncrement);
        assert_eq!(body.kind, ParseNodeKind::StatementList);
    }

    #[test]
    fn test_in_inside_for_init_parens() {
        let zone = Zone::new();
        let for_node = first(&zone, "for (var i = (a in b); i;) {}");
        let (head, _) = for_node.pair().unwrap();
        assert_eq!(head.kind, ParseNodeKind::ForHead);
    }

    #[test]
    fn test_for_each_of_is_error() {
        assert!(syntax_error("for each (x of o);").contains("invalid for each loop"));
    }

    #[test]
    fn test_try_catch_shapes() {
        let zone = Zone::new();
        let try_node = first(&zone, "try {} catch (e if e) {} catch (f) {} finally {}");
        let (_, catches, finalizer) = try_node.ternary().unwrap();
        let catches = catches.unwrap().list().unwrap();
        assert_eq!(catches.len(), 2);
        assert_eq!(catches[0].kind, ParseNodeKind::LexicalScope);
        let catch = catches[0].required_kid().unwrap();
        let (_, guard, _) = catch.ternary().unwrap();
        assert!(guard.is_some());
        assert!(finalizer.is_some());
    }

    #[test]
    fn test_catch_after_unconditional_catch_is_error() {
        assert!(syntax_error("try {} catch (e) {} catch (f) {}").contains("catch after unconditional catch"));
    }

    #[test]
    fn test_try_requires_handler() {
        assert!(syntax_error("try {}").contains("missing catch or finally after try"));
    }

    #[test]
    fn test_switch_lexical_wrapping() {
        let zone = Zone::new();
        let plain = first(&zone, "switch (x) { case 1: a; default: b; }");
        let (_, cases) = plain.pair().unwrap();
        assert_eq!(cases.kind, ParseNodeKind::StatementList);
        assert_eq!(cases.count(), 2);
        let scoped = first(&zone, "switch (x) { case 1: let y = 2; }");
        let (_, cases) = scoped.pair().unwrap();
        assert_eq!(cases.kind, ParseNodeKind::LexicalScope);
    }

    #[test]
    fn test_duplicate_default_is_error() {
        assert!(syntax_error("switch (x) { default: default: }").contains("more than one switch default"));
    }

    #[test]
    fn test_labels_and_jumps() {
        let zone = Zone::new();
        let label = first(&zone, "outer: for (;;) { break outer; continue; }");
        assert_eq!(label.kind, ParseNodeKind::Label);
        assert_eq!(label.atom().unwrap(), "outer");
    }

    #[test]
    fn test_break_label_not_across_newline() {
        let zone = Zone::new();
        let program = parse(&zone, "for (;;) { break\nfoo; }", 1, 1024).unwrap();
        let for_node = program.list().unwrap()[0];
        let (_, body) = for_node.pair().unwrap();
        assert_eq!(body.count(), 2);
    }

    #[test]
    fn test_return_outside_function_is_error() {
        assert!(syntax_error("return 1;").contains("return not in function"));
    }

    #[test]
    fn test_throw_newline_is_error() {
        assert!(syntax_error("throw\nx;").contains("no line break"));
    }

    #[test]
    fn test_let_block_statement() {
        let zone = Zone::new();
        let node = first(&zone, "let (x = 1) x;");
        assert_eq!(node.kind, ParseNodeKind::Let);
        let (head, body) = node.pair().unwrap();
        assert_eq!(head.count(), 1);
        assert_eq!(body.kind, ParseNodeKind::LexicalScope);
        assert_eq!(body.required_kid().unwrap().kind, ParseNodeKind::Semi);
    }

    #[test]
    fn test_const_declarators_are_flagged() {
        use crate::parser::parse_node::DefnFlags;
        let zone = Zone::new();
        let decl = first(&zone, "const a = 1;");
        assert_eq!(decl.kind, ParseNodeKind::Const);
        assert!(decl.list().unwrap()[0].dflags().contains(DefnFlags::CONST));
    }

    #[test]
    fn test_do_while_and_with() {
        let zone = Zone::new();
        let node = first(&zone, "do x++; while (x < 3)");
        assert_eq!(node.kind, ParseNodeKind::DoWhile);
        let node = first(&zone, "with (o) f();");
        assert_eq!(node.kind, ParseNodeKind::With);
    }

    #[test]
    fn test_debugger_statement() {
        let zone = Zone::new();
        assert_eq!(first(&zone, "debugger;").kind, ParseNodeKind::Debugger);
    }
}
