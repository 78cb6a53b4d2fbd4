//! Expression grammar.
//!
//! Binary operators are parsed by precedence climbing.  A run of the same
//! left-associative operator is collected into one flat list node
//! (`a + b + c` → `Add[a, b, c]`); a single application stays binary.

use crate::error::ReflectResult;
use crate::parser::Parser;
use crate::parser::parse_node::{
    Arity, DefnFlags, FunctionBox, IterFlags, JsOp, ListFlags, Node, ParseNodeKind,
};
use crate::parser::scanner::{Position, Span, TokenKind, TokenValue};

/// Binding power, node kind and operator code of a binary operator token.
fn binary_operator(kind: TokenKind, allow_in: bool) -> Option<(u8, ParseNodeKind, JsOp)> {
    use ParseNodeKind as K;
    let entry = match kind {
        TokenKind::PipePipe => (1, K::Or, JsOp::Or),
        TokenKind::AmpersandAmpersand => (2, K::And, JsOp::And),
        TokenKind::Pipe => (3, K::BitOr, JsOp::BitOr),
        TokenKind::Caret => (4, K::BitXor, JsOp::BitXor),
        TokenKind::Ampersand => (5, K::BitAnd, JsOp::BitAnd),
        TokenKind::EqualEqual => (6, K::Eq, JsOp::Eq),
        TokenKind::BangEqual => (6, K::Ne, JsOp::Ne),
        TokenKind::EqualEqualEqual => (6, K::StrictEq, JsOp::StrictEq),
        TokenKind::BangEqualEqual => (6, K::StrictNe, JsOp::StrictNe),
        TokenKind::Less => (7, K::Lt, JsOp::Lt),
        TokenKind::LessEqual => (7, K::Le, JsOp::Le),
        TokenKind::Greater => (7, K::Gt, JsOp::Gt),
        TokenKind::GreaterEqual => (7, K::Ge, JsOp::Ge),
        TokenKind::Instanceof => (7, K::Instanceof, JsOp::Instanceof),
        TokenKind::In if allow_in => (7, K::In, JsOp::In),
        TokenKind::LessLess => (8, K::Lsh, JsOp::Lsh),
        TokenKind::GreaterGreater => (8, K::Rsh, JsOp::Rsh),
        TokenKind::GreaterGreaterGreater => (8, K::Ursh, JsOp::Ursh),
        TokenKind::Plus => (9, K::Add, JsOp::Add),
        TokenKind::Minus => (9, K::Sub, JsOp::Sub),
        TokenKind::Star => (10, K::Star, JsOp::Mul),
        TokenKind::Slash => (10, K::Div, JsOp::Div),
        TokenKind::Percent => (10, K::Mod, JsOp::Mod),
        _ => return None,
    };
    Some(entry)
}

/// Node kind and operator code of an assignment operator token.
fn assignment_operator(kind: TokenKind) -> Option<(ParseNodeKind, JsOp)> {
    use ParseNodeKind as K;
    let entry = match kind {
        TokenKind::Equal => (K::Assign, JsOp::Nop),
        TokenKind::PlusEqual => (K::AddAssign, JsOp::Add),
        TokenKind::MinusEqual => (K::SubAssign, JsOp::Sub),
        TokenKind::StarEqual => (K::MulAssign, JsOp::Mul),
        TokenKind::SlashEqual => (K::DivAssign, JsOp::Div),
        TokenKind::PercentEqual => (K::ModAssign, JsOp::Mod),
        TokenKind::LessLessEqual => (K::LshAssign, JsOp::Lsh),
        TokenKind::GreaterGreaterEqual => (K::RshAssign, JsOp::Rsh),
        TokenKind::GreaterGreaterGreaterEqual => (K::UrshAssign, JsOp::Ursh),
        TokenKind::PipeEqual => (K::BitOrAssign, JsOp::BitOr),
        TokenKind::CaretEqual => (K::BitXorAssign, JsOp::BitXor),
        TokenKind::AmpersandEqual => (K::BitAndAssign, JsOp::BitAnd),
        _ => return None,
    };
    Some(entry)
}

/// Node kind and operator code of a prefix unary operator token.
fn unary_operator(kind: TokenKind) -> Option<(ParseNodeKind, JsOp)> {
    use ParseNodeKind as K;
    let entry = match kind {
        TokenKind::Typeof => (K::Typeof, JsOp::Typeof),
        TokenKind::Void => (K::Void, JsOp::Void),
        TokenKind::Bang => (K::Not, JsOp::Not),
        TokenKind::Tilde => (K::BitNot, JsOp::BitNot),
        TokenKind::Plus => (K::Pos, JsOp::Pos),
        TokenKind::Minus => (K::Neg, JsOp::Neg),
        TokenKind::Delete => (K::Delete, JsOp::Nop),
        _ => return None,
    };
    Some(entry)
}

impl<'z, 'src> Parser<'z, 'src> {
    /// Expression ::= AssignmentExpression (`,` AssignmentExpression)*
    pub(super) fn expression(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        let first = self.assignment_expr()?;
        if !self.at(TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(TokenKind::Comma)? {
            items.push(self.assignment_expr()?);
        }
        Ok(self.new_list(
            ParseNodeKind::Comma,
            JsOp::Nop,
            self.span_from(start),
            &items,
            ListFlags::NONE,
        ))
    }

    pub(super) fn assignment_expr(&mut self) -> ReflectResult<Node<'z>> {
        self.nested(|p| p.assignment_inner())
    }

    fn assignment_inner(&mut self) -> ReflectResult<Node<'z>> {
        if self.at(TokenKind::Yield) {
            return self.yield_expr();
        }
        let start = self.cur.span.start;
        let left = self.conditional_expr()?;
        let Some((kind, op)) = assignment_operator(self.cur.kind) else {
            return Ok(left);
        };
        if kind == ParseNodeKind::Assign {
            self.check_assignment_target(left, true, "invalid assignment left-hand side")?;
        } else {
            self.check_assignment_target(left, false, "invalid assignment left-hand side")?;
        }
        self.advance()?;
        let right = self.assignment_expr()?;
        Ok(self.new_binary(kind, op, self.span_from(start), Some(left), right))
    }

    fn yield_expr(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        if !self.in_function() {
            return Err(self.error_here("yield not in function"));
        }
        if let Some(context) = self.functions.last_mut() {
            context.is_generator = true;
        }
        self.advance()?;
        let ends_operand = matches!(
            self.cur.kind,
            TokenKind::RightParen
                | TokenKind::RightBracket
                | TokenKind::RightBrace
                | TokenKind::Comma
                | TokenKind::Semicolon
                | TokenKind::Colon
                | TokenKind::For
                | TokenKind::Eof
        );
        let argument = if ends_operand || self.cur.had_line_terminator_before {
            None
        } else {
            Some(self.assignment_expr()?)
        };
        Ok(self.new_unary(ParseNodeKind::Yield, JsOp::Nop, self.span_from(start), argument))
    }

    fn conditional_expr(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        let test = self.binary_expr(1)?;
        if !self.eat(TokenKind::Question)? {
            return Ok(test);
        }
        let consequent = self.with_allow_in(true, |p| p.assignment_expr())?;
        self.expect(TokenKind::Colon, "missing : in conditional expression")?;
        let alternate = self.assignment_expr()?;
        Ok(self.new_ternary(
            ParseNodeKind::Conditional,
            self.span_from(start),
            Some(test),
            Some(consequent),
            Some(alternate),
        ))
    }

    /// Operators binding at least as tightly as `min_prec`.
    fn binary_expr(&mut self, min_prec: u8) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        let mut left = self.unary_expr()?;
        while let Some((prec, kind, op)) = binary_operator(self.cur.kind, self.allow_in) {
            if prec < min_prec {
                break;
            }
            self.advance()?;
            let mut operands = vec![left, self.binary_expr(prec + 1)?];
            while let Some((_, next, _)) = binary_operator(self.cur.kind, self.allow_in) {
                if next != kind {
                    break;
                }
                self.advance()?;
                operands.push(self.binary_expr(prec + 1)?);
            }
            left = self.new_chain(kind, op, start, &operands);
        }
        Ok(left)
    }

    fn new_chain(&self, kind: ParseNodeKind, op: JsOp, start: Position, operands: &[Node<'z>]) -> Node<'z> {
        let pos = self.span_from(start);
        match operands {
            [left, right] => self.new_binary(kind, op, pos, Some(left), right),
            _ => self.new_list(kind, op, pos, operands, ListFlags::NONE),
        }
    }

    fn unary_expr(&mut self) -> ReflectResult<Node<'z>> {
        self.nested(|p| p.unary_inner())
    }

    fn unary_inner(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        if let Some((kind, op)) = unary_operator(self.cur.kind) {
            self.advance()?;
            let operand = self.unary_expr()?;
            let op = if kind == ParseNodeKind::Delete {
                match operand.kind {
                    ParseNodeKind::Name => JsOp::DelName,
                    ParseNodeKind::Dot => JsOp::DelProp,
                    ParseNodeKind::Elem => JsOp::DelElem,
                    _ => JsOp::Nop,
                }
            } else {
                op
            };
            return Ok(self.new_unary(kind, op, self.span_from(start), Some(operand)));
        }
        if self.at(TokenKind::PlusPlus) || self.at(TokenKind::MinusMinus) {
            let (kind, message) = if self.at(TokenKind::PlusPlus) {
                (ParseNodeKind::PreIncrement, "invalid increment operand")
            } else {
                (ParseNodeKind::PreDecrement, "invalid decrement operand")
            };
            self.advance()?;
            let operand = self.unary_expr()?;
            self.check_assignment_target(operand, false, message)?;
            return Ok(self.new_unary(kind, JsOp::Nop, self.span_from(start), Some(operand)));
        }

        let operand = self.left_hand_side_expr()?;
        if (self.at(TokenKind::PlusPlus) || self.at(TokenKind::MinusMinus))
            && !self.cur.had_line_terminator_before
        {
            let (kind, message) = if self.at(TokenKind::PlusPlus) {
                (ParseNodeKind::PostIncrement, "invalid increment operand")
            } else {
                (ParseNodeKind::PostDecrement, "invalid decrement operand")
            };
            self.check_assignment_target(operand, false, message)?;
            self.advance()?;
            return Ok(self.new_unary(kind, JsOp::Nop, self.span_from(start), Some(operand)));
        }
        Ok(operand)
    }

    // ── Member and call expressions ─────────────────────────────────────────

    fn left_hand_side_expr(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        let base = if self.at(TokenKind::New) {
            self.new_expr()?
        } else {
            self.primary_expr()?
        };
        self.member_suffixes(start, base, true)
    }

    /// `new` MemberExpression Arguments?
    fn new_expr(&mut self) -> ReflectResult<Node<'z>> {
        self.nested(|p| {
            let start = p.cur.span.start;
            p.advance()?;
            let callee_start = p.cur.span.start;
            let callee = if p.at(TokenKind::New) {
                p.new_expr()?
            } else {
                p.primary_expr()?
            };
            let callee = p.member_suffixes(callee_start, callee, false)?;
            let mut items = vec![callee];
            if p.at(TokenKind::LeftParen) {
                items.extend(p.arguments()?);
            }
            Ok(p.new_list(
                ParseNodeKind::New,
                JsOp::New,
                p.span_from(start),
                &items,
                ListFlags::NONE,
            ))
        })
    }

    /// Property accesses, calls and (with e4x) filters and descendants
    /// applied to `expr`.
    fn member_suffixes(
        &mut self,
        start: Position,
        mut expr: Node<'z>,
        allow_call: bool,
    ) -> ReflectResult<Node<'z>> {
        loop {
            expr = match self.cur.kind {
                TokenKind::Dot => {
                    self.advance()?;
                    #[cfg(feature = "e4x")]
                    if let Some(node) = self.xml_member_suffix(start, expr)? {
                        expr = node;
                        continue;
                    }
                    if !(self.at(TokenKind::Identifier) || self.cur.kind.is_keyword()) {
                        return Err(self.error_here("missing name after . operator"));
                    }
                    let name = self.advance()?;
                    let atom = self.atom(name.text());
                    self.alloc(
                        ParseNodeKind::Dot,
                        JsOp::Nop,
                        self.span_from(start),
                        Arity::Name {
                            atom,
                            expr: Some(expr),
                            dflags: DefnFlags::NONE,
                            slot: None,
                        },
                    )
                }
                TokenKind::LeftBracket => {
                    self.advance()?;
                    let index = self.with_allow_in(true, |p| p.expression())?;
                    self.expect(TokenKind::RightBracket, "missing ] in index expression")?;
                    self.new_binary(ParseNodeKind::Elem, JsOp::Nop, self.span_from(start), Some(expr), index)
                }
                TokenKind::LeftParen if allow_call => {
                    let mut items = vec![expr];
                    items.extend(self.arguments()?);
                    self.new_list(
                        ParseNodeKind::Call,
                        JsOp::Call,
                        self.span_from(start),
                        &items,
                        ListFlags::NONE,
                    )
                }
                #[cfg(feature = "e4x")]
                TokenKind::DotDot => {
                    self.advance()?;
                    let name = self.xml_property_selector()?;
                    self.new_binary(ParseNodeKind::DblDot, JsOp::Nop, self.span_from(start), Some(expr), name)
                }
                _ => return Ok(expr),
            };
        }
    }

    /// `( args )`.  A lone argument followed by `for` is a generator
    /// expression.
    fn arguments(&mut self) -> ReflectResult<Vec<Node<'z>>> {
        self.expect(TokenKind::LeftParen, "missing ( before arguments")?;
        let mut args = Vec::new();
        if !self.at(TokenKind::RightParen) {
            loop {
                let arg_start = self.cur.span.start;
                let arg = self.with_allow_in(true, |p| p.assignment_expr())?;
                if args.is_empty() && self.at(TokenKind::For) {
                    args.push(self.generator_expression(arg_start, arg)?);
                    if !self.at(TokenKind::RightParen) {
                        return Err(self.error_here("generator expression must be parenthesized"));
                    }
                    break;
                }
                args.push(arg);
                if !self.eat(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "missing ) after argument list")?;
        Ok(args)
    }

    // ── Primary expressions ─────────────────────────────────────────────────

    pub(super) fn primary_expr(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        let kind = self.cur.kind;
        match kind {
            TokenKind::Identifier => {
                #[cfg(feature = "e4x")]
                if self.peek_kind()? == TokenKind::ColonColon {
                    return self.xml_qualified_name();
                }
                let tok = self.advance()?;
                let atom = self.atom(tok.text());
                Ok(self.new_name(atom, tok.span, None, DefnFlags::NONE, None))
            }
            TokenKind::This | TokenKind::Null | TokenKind::True | TokenKind::False => {
                let tok = self.advance()?;
                let kind = match kind {
                    TokenKind::This => ParseNodeKind::This,
                    TokenKind::Null => ParseNodeKind::Null,
                    TokenKind::True => ParseNodeKind::True,
                    _ => ParseNodeKind::False,
                };
                Ok(self.new_nullary(kind, tok.span))
            }
            TokenKind::NumericLiteral => {
                let tok = self.advance()?;
                let value = match tok.value {
                    TokenValue::Number(n) => n,
                    _ => 0.0,
                };
                Ok(self.alloc(ParseNodeKind::Number, JsOp::Nop, tok.span, Arity::Number(value)))
            }
            TokenKind::StringLiteral => {
                let tok = self.advance()?;
                let atom = self.atom(tok.text());
                Ok(self.alloc(ParseNodeKind::String, JsOp::Nop, tok.span, Arity::Atom(atom)))
            }
            TokenKind::Slash | TokenKind::SlashEqual => {
                self.rescan_regexp()?;
                let tok = self.advance()?;
                let (source, flags) = match &tok.value {
                    TokenValue::RegExp { source, flags } => (self.atom(source), self.atom(flags)),
                    _ => ("", ""),
                };
                Ok(self.alloc(
                    ParseNodeKind::RegExp,
                    JsOp::Nop,
                    tok.span,
                    Arity::RegExp { source, flags },
                ))
            }
            TokenKind::LeftBracket => self.array_literal(),
            TokenKind::LeftBrace => self.object_literal(),
            TokenKind::LeftParen => self.parenthesized(),
            TokenKind::Function => {
                #[cfg(feature = "e4x")]
                if self.peek_kind()? == TokenKind::ColonColon {
                    return self.xml_qualified_name();
                }
                self.function_expression()
            }
            TokenKind::Let => {
                if self.peek_kind()? != TokenKind::LeftParen {
                    return Err(self.error_here("missing ( before let head"));
                }
                self.let_block(false)
            }
            #[cfg(feature = "e4x")]
            TokenKind::Less => self.xml_literal(),
            #[cfg(feature = "e4x")]
            TokenKind::Star => {
                self.advance()?;
                let any = self.new_nullary(ParseNodeKind::AnyName, self.span_from(start));
                if self.at(TokenKind::ColonColon) {
                    return self.xml_qualified_suffix(start, any);
                }
                Ok(any)
            }
            #[cfg(feature = "e4x")]
            TokenKind::At => self.xml_attribute_selector(),
            _ => Err(self.error_here("syntax error")),
        }
    }

    /// `( Expression )`, or a parenthesized generator expression.
    fn parenthesized(&mut self) -> ReflectResult<Node<'z>> {
        self.advance()?;
        let inner_start = self.cur.span.start;
        let expr = self.with_allow_in(true, |p| p.expression())?;
        if self.at(TokenKind::For) {
            if expr.is_kind(ParseNodeKind::Comma) {
                return Err(self.error_here("generator expression must be parenthesized"));
            }
            let genexp = self.generator_expression(inner_start, expr)?;
            self.expect(TokenKind::RightParen, "missing ) in parenthetical")?;
            return Ok(genexp);
        }
        self.expect(TokenKind::RightParen, "missing ) in parenthetical")?;
        Ok(expr)
    }

    /// `[ … ]`: elements, elisions, spreads, or an array comprehension.
    fn array_literal(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.advance()?;
        let mut items = Vec::new();
        let mut xflags = ListFlags::NONE;
        loop {
            if self.at(TokenKind::RightBracket) {
                break;
            }
            if self.at(TokenKind::Comma) {
                let comma = self.advance()?;
                items.push(self.new_elision(comma.span));
                xflags = xflags | ListFlags::HOLEY;
                continue;
            }
            let elem_start = self.cur.span.start;
            let elem = if self.eat(TokenKind::DotDotDot)? {
                let operand = self.with_allow_in(true, |p| p.assignment_expr())?;
                self.new_unary(ParseNodeKind::Spread, JsOp::Nop, self.span_from(elem_start), Some(operand))
            } else {
                self.with_allow_in(true, |p| p.assignment_expr())?
            };
            if items.is_empty() && self.at(TokenKind::For) && !elem.is_kind(ParseNodeKind::Spread) {
                return self.array_comprehension(start, elem);
            }
            items.push(elem);
            if !self.at(TokenKind::RightBracket) {
                self.expect(TokenKind::Comma, "missing ] after element list")?;
            }
        }
        self.expect(TokenKind::RightBracket, "missing ] after element list")?;
        Ok(self.new_list(ParseNodeKind::Array, JsOp::Nop, self.span_from(start), &items, xflags))
    }

    /// Property name: identifier (keywords included), string or number.
    /// Returns the key and whether it was a plain identifier.
    pub(super) fn property_key(&mut self) -> ReflectResult<(Node<'z>, bool)> {
        let tok = self.advance()?;
        let node = match tok.kind {
            TokenKind::Identifier => {
                let atom = self.atom(tok.text());
                return Ok((self.new_name(atom, tok.span, None, DefnFlags::NONE, None), true));
            }
            kind if kind.is_keyword() => {
                let atom = self.atom(tok.text());
                self.new_name(atom, tok.span, None, DefnFlags::NONE, None)
            }
            TokenKind::StringLiteral => {
                let atom = self.atom(tok.text());
                self.alloc(ParseNodeKind::String, JsOp::Nop, tok.span, Arity::Atom(atom))
            }
            TokenKind::NumericLiteral => {
                let value = match tok.value {
                    TokenValue::Number(n) => n,
                    _ => 0.0,
                };
                self.alloc(ParseNodeKind::Number, JsOp::Nop, tok.span, Arity::Number(value))
            }
            _ => return Err(self.error_at(tok.span, "invalid property id")),
        };
        Ok((node, false))
    }

    /// `{ … }`.  Shorthand properties mark the literal `DESTRUCT`: valid
    /// only as a destructuring target.
    fn object_literal(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.advance()?;
        let mut props = Vec::new();
        let mut xflags = ListFlags::NONE;
        while !self.at(TokenKind::RightBrace) {
            let prop_start = self.cur.span.start;
            let accessor = if self.cur.is_ident("get") {
                Some(JsOp::Getter)
            } else if self.cur.is_ident("set") {
                Some(JsOp::Setter)
            } else {
                None
            };
            let accessor = match accessor {
                Some(op) => {
                    let next = self.peek_kind()?;
                    let names_property = next == TokenKind::Identifier
                        || next == TokenKind::StringLiteral
                        || next == TokenKind::NumericLiteral
                        || next.is_keyword();
                    names_property.then_some(op)
                }
                None => None,
            };
            let prop = if let Some(op) = accessor {
                self.advance()?;
                let (key, _) = self.property_key()?;
                let func = self.function_rest(prop_start, None)?;
                self.new_binary(ParseNodeKind::Colon, op, self.span_from(prop_start), Some(key), func)
            } else {
                let (key, is_ident) = self.property_key()?;
                let value = if self.eat(TokenKind::Colon)? {
                    self.with_allow_in(true, |p| p.assignment_expr())?
                } else if is_ident && (self.at(TokenKind::Comma) || self.at(TokenKind::RightBrace)) {
                    xflags = xflags | ListFlags::DESTRUCT;
                    self.new_name(key.atom()?, key.pos, None, DefnFlags::NONE, None)
                } else {
                    return Err(self.error_here("missing : after property id"));
                };
                self.new_binary(ParseNodeKind::Colon, JsOp::InitProp, self.span_from(prop_start), Some(key), value)
            };
            props.push(prop);
            if !self.at(TokenKind::RightBrace) {
                self.expect(TokenKind::Comma, "missing } after property list")?;
            }
        }
        self.expect(TokenKind::RightBrace, "missing } after property list")?;
        Ok(self.new_list(ParseNodeKind::Object, JsOp::Nop, self.span_from(start), &props, xflags))
    }

    // ── Comprehensions ──────────────────────────────────────────────────────

    /// `[body for … if …]`, after `body` has been parsed.
    fn array_comprehension(&mut self, start: Position, body: Node<'z>) -> ReflectResult<Node<'z>> {
        let push = self.new_unary(ParseNodeKind::ArrayPush, JsOp::Nop, body.pos, Some(body));
        let nest = self.comprehension_tail(push)?;
        self.expect(TokenKind::RightBracket, "missing ] after element list")?;
        let pos = self.span_from(start);
        let scope = self.new_unary(ParseNodeKind::LexicalScope, JsOp::Nop, nest.pos, Some(nest));
        Ok(self.new_list(ParseNodeKind::ArrayComp, JsOp::Nop, pos, &[scope], ListFlags::NONE))
    }

    /// `(body for … if …)`: a call of a synthesized generator function.
    pub(super) fn generator_expression(&mut self, start: Position, body: Node<'z>) -> ReflectResult<Node<'z>> {
        let yield_node = self.new_unary(ParseNodeKind::Yield, JsOp::Nop, body.pos, Some(body));
        let stmt = self.new_unary(ParseNodeKind::Semi, JsOp::Nop, body.pos, Some(yield_node));
        let nest = self.comprehension_tail(stmt)?;
        let pos = self.span_from(start);
        let body_list = self.new_list(ParseNodeKind::StatementList, JsOp::Nop, pos, &[nest], ListFlags::NONE);
        let funbox = self.zone.alloc(FunctionBox {
            name: None,
            body: body_list,
            is_generator: true,
            is_expression_closure: false,
            has_rest: false,
            is_genexp: true,
        });
        let func = self.alloc(ParseNodeKind::Function, JsOp::Nop, pos, Arity::Func(funbox));
        Ok(self.new_list(ParseNodeKind::Call, JsOp::Call, pos, &[func], ListFlags::NONE))
    }

    /// One or more `for [each] (pattern in/of expr)` blocks and an optional
    /// `if (cond)`, wrapped around `innermost`.
    fn comprehension_tail(&mut self, innermost: Node<'z>) -> ReflectResult<Node<'z>> {
        let mut blocks = Vec::new();
        while self.at(TokenKind::For) {
            let for_start = self.cur.span.start;
            self.advance()?;
            let mut iflags = IterFlags::Plain;
            if self.cur.is_ident("each") {
                self.advance()?;
                iflags = IterFlags::ForEach;
            }
            self.expect(TokenKind::LeftParen, "missing ( after for")?;
            let pattern = self.binding_target(DefnFlags::NONE)?;
            if self.cur.is_ident("of") {
                if iflags == IterFlags::ForEach {
                    return Err(self.error_here("invalid for each loop"));
                }
                iflags = IterFlags::ForOf;
                self.advance()?;
            } else {
                self.expect(TokenKind::In, "missing in after for")?;
            }
            let source = self.with_allow_in(true, |p| p.expression())?;
            self.expect(TokenKind::RightParen, "missing ) after for-loop control")?;
            let head = self.new_ternary(
                ParseNodeKind::ForIn,
                self.span_from(for_start),
                None,
                Some(pattern),
                Some(source),
            );
            blocks.push((for_start, head, iflags));
        }

        let mut nest = innermost;
        if self.at(TokenKind::If) {
            let if_start = self.cur.span.start;
            self.advance()?;
            self.expect(TokenKind::LeftParen, "missing ( before condition")?;
            let filter = self.with_allow_in(true, |p| p.expression())?;
            self.expect(TokenKind::RightParen, "missing ) after condition")?;
            nest = self.new_ternary(ParseNodeKind::If, self.span_from(if_start), Some(filter), Some(nest), None);
        }
        let end = self.prev_end;
        for (for_start, head, iflags) in blocks.into_iter().rev() {
            let pos = Span { start: for_start, end };
            nest = self.new_for(pos, head, nest, iflags);
        }
        Ok(nest)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ReflectError;
    use crate::parser::parse;
    use crate::parser::parse_node::{Arity, IterFlags, JsOp, ListFlags, Node, ParseNodeKind};
    use crate::zone::Zone;

    fn expr<'z>(zone: &'z Zone, src: &str) -> Node<'z> {
        let program = parse(zone, src, 1, 1024).unwrap_or_else(|e| panic!("{src:?}: {e}"));
        program.list().unwrap()[0].required_kid().unwrap()
    }

    fn syntax_error(src: &str) -> String {
        let zone = Zone::new();
        match parse(&zone, src, 1, 1024) {
            Err(e @ ReflectError::SyntaxError { .. }) => e.to_string(),
            other => panic!("{src:?}: expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        let zone = Zone::new();
        let e = expr(&zone, "1 + 2 * 3;");
        assert_eq!(e.kind, ParseNodeKind::Add);
        let (_, right) = e.pair().unwrap();
        assert_eq!(right.kind, ParseNodeKind::Star);
    }

    #[test]
    fn test_same_operator_chain_is_flat_list() {
        let zone = Zone::new();
        let e = expr(&zone, "a || b || c;");
        assert_eq!(e.kind, ParseNodeKind::Or);
        assert!(e.is_list());
        assert_eq!(e.count(), 3);
        let e = expr(&zone, "a + b + c + d;");
        assert_eq!(e.count(), 4);
    }

    #[test]
    fn test_mixed_same_precedence_nests() {
        let zone = Zone::new();
        let e = expr(&zone, "a + b - c;");
        assert_eq!(e.kind, ParseNodeKind::Sub);
        let (left, _) = e.pair().unwrap();
        assert_eq!(left.kind, ParseNodeKind::Add);
        assert!(left.is_binary());
    }

    #[test]
    fn test_chain_span_covers_operands() {
        let zone = Zone::new();
        let e = expr(&zone, "a || b || c;");
        assert_eq!(e.pos.start.column, 0);
        assert_eq!(e.pos.end.column, 11);
    }

    #[test]
    fn test_assignment_operators() {
        let zone = Zone::new();
        let e = expr(&zone, "x >>>= 1;");
        assert_eq!(e.kind, ParseNodeKind::UrshAssign);
        assert_eq!(e.op, JsOp::Ursh);
        let e = expr(&zone, "[a, b] = c;");
        assert_eq!(e.kind, ParseNodeKind::Assign);
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(syntax_error("1 = 2;").contains("invalid assignment left-hand side"));
        assert!(syntax_error("[a] += 1;").contains("invalid assignment left-hand side"));
        assert!(syntax_error("++1;").contains("invalid increment operand"));
    }

    #[test]
    fn test_update_expressions() {
        let zone = Zone::new();
        assert_eq!(expr(&zone, "x++;").kind, ParseNodeKind::PostIncrement);
        assert_eq!(expr(&zone, "--x;").kind, ParseNodeKind::PreDecrement);
    }

    #[test]
    fn test_unary_and_delete_ops() {
        let zone = Zone::new();
        let e = expr(&zone, "typeof x;");
        assert_eq!(e.kind, ParseNodeKind::Typeof);
        let e = expr(&zone, "delete a.b;");
        assert_eq!(e.op, JsOp::DelProp);
    }

    #[test]
    fn test_member_and_call_chain() {
        let zone = Zone::new();
        let e = expr(&zone, "a.b[c](d, e);");
        assert_eq!(e.kind, ParseNodeKind::Call);
        assert_eq!(e.count(), 3);
        let callee = e.list().unwrap()[0];
        assert_eq!(callee.kind, ParseNodeKind::Elem);
        let (object, _) = callee.pair().unwrap();
        assert_eq!(object.kind, ParseNodeKind::Dot);
        assert_eq!(object.atom().unwrap(), "b");
    }

    #[test]
    fn test_keyword_property_names() {
        let zone = Zone::new();
        let e = expr(&zone, "a.default;");
        assert_eq!(e.atom().unwrap(), "default");
    }

    #[test]
    fn test_new_with_and_without_arguments() {
        let zone = Zone::new();
        let e = expr(&zone, "new Foo;");
        assert_eq!(e.kind, ParseNodeKind::New);
        assert_eq!(e.count(), 1);
        let e = expr(&zone, "new a.B(1)(2);");
        assert_eq!(e.kind, ParseNodeKind::Call);
        assert_eq!(e.list().unwrap()[0].kind, ParseNodeKind::New);
    }

    #[test]
    fn test_array_holes_and_spread() {
        let zone = Zone::new();
        let e = expr(&zone, "[1,,3];");
        let items = e.list().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].kind, ParseNodeKind::Comma);
        assert_eq!(items[1].count(), 0);
        assert!(e.xflags().contains(ListFlags::HOLEY));
        assert_eq!(expr(&zone, "[1,];").count(), 1);
        assert_eq!(expr(&zone, "[,];").count(), 1);
        let e = expr(&zone, "[...xs];");
        assert_eq!(e.list().unwrap()[0].kind, ParseNodeKind::Spread);
    }

    #[test]
    fn test_object_literal_properties() {
        let zone = Zone::new();
        let e = expr(&zone, "({a: 1, 'b': 2, 3: c, get d() { return 1; }, set d(v) {}});");
        let props = e.list().unwrap();
        assert_eq!(props.len(), 5);
        assert_eq!(props[0].op, JsOp::InitProp);
        assert_eq!(props[3].op, JsOp::Getter);
        assert_eq!(props[4].op, JsOp::Setter);
        assert!(!e.xflags().contains(ListFlags::DESTRUCT));
    }

    #[test]
    fn test_get_as_plain_property_name() {
        let zone = Zone::new();
        let e = expr(&zone, "({get: 1, set: 2});");
        assert_eq!(e.list().unwrap()[0].op, JsOp::InitProp);
    }

    #[test]
    fn test_shorthand_marks_destruct() {
        let zone = Zone::new();
        let e = expr(&zone, "({a});");
        assert!(e.xflags().contains(ListFlags::DESTRUCT));
    }

    #[test]
    fn test_array_comprehension_shape() {
        let zone = Zone::new();
        let e = expr(&zone, "[x for (x in o) if (x)];");
        assert_eq!(e.kind, ParseNodeKind::ArrayComp);
        let scope = e.list().unwrap()[0];
        let for_node = scope.required_kid().unwrap();
        assert_eq!(for_node.kind, ParseNodeKind::For);
        let (_, inner) = for_node.pair().unwrap();
        assert_eq!(inner.kind, ParseNodeKind::If);
        let (_, push, _) = inner.ternary().unwrap();
        assert_eq!(push.unwrap().kind, ParseNodeKind::ArrayPush);
    }

    #[test]
    fn test_generator_expression_shape() {
        let zone = Zone::new();
        let e = expr(&zone, "(x for each (x in o));");
        assert!(e.is_generator_expr());
        let for_node = e.generator_expr().unwrap();
        assert_eq!(for_node.iflags(), IterFlags::ForEach);
        let e = expr(&zone, "f(x for (x in o));");
        assert!(e.list().unwrap()[1].is_generator_expr());
    }

    #[test]
    fn test_generator_expression_needs_parens_among_args() {
        assert!(syntax_error("f(x for (x in o), 1);").contains("generator expression must be parenthesized"));
    }

    #[test]
    fn test_literals() {
        let zone = Zone::new();
        assert!(matches!(expr(&zone, "0x10;").arity, Arity::Number(n) if n == 16.0));
        assert!(matches!(expr(&zone, "'hi';").arity, Arity::Atom("hi")));
        assert_eq!(expr(&zone, "null;").kind, ParseNodeKind::Null);
        assert_eq!(expr(&zone, "this;").kind, ParseNodeKind::This);
    }

    #[test]
    fn test_conditional_and_comma() {
        let zone = Zone::new();
        assert_eq!(expr(&zone, "a ? b : c;").kind, ParseNodeKind::Conditional);
        let e = expr(&zone, "a, b, c;");
        assert_eq!(e.kind, ParseNodeKind::Comma);
        assert_eq!(e.count(), 3);
    }

    #[test]
    fn test_let_expression() {
        let zone = Zone::new();
        let e = expr(&zone, "y = let (x = 1) x + 1;");
        let (_, right) = e.pair().unwrap();
        assert_eq!(right.kind, ParseNodeKind::Let);
        assert!(right.is_binary());
    }

    #[test]
    fn test_yield_outside_function_is_error() {
        assert!(syntax_error("yield 1;").contains("yield not in function"));
    }

    #[test]
    fn test_reserved_word_is_error() {
        assert!(syntax_error("class;").contains("syntax error"));
    }
}
