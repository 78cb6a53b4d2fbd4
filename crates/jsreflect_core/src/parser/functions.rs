//! Function grammar: declarations, expressions, getters and setters.
//!
//! Named parameters become `Name` nodes carrying their slot number and, when
//! present, their default value.  A destructured parameter is not listed
//! among the named parameters; instead it contributes an
//! `Assign(pattern, placeholder)` entry to a `var` prologue statement placed
//! at the head of the body, where the placeholder `Name` carries the slot
//! and the default value.

use crate::error::ReflectResult;
use crate::parser::parse_node::{
    Arity, DefnFlags, FunctionBox, JsOp, ListFlags, Node, ParseNodeKind,
};
use crate::parser::scanner::{Position, TokenKind};
use crate::parser::{FunctionContext, Parser};

/// Formal parameters as parsed, before the body.
struct Formals<'z> {
    named: Vec<Node<'z>>,
    prologue: Vec<Node<'z>>,
    has_rest: bool,
    start: Position,
}

impl<'z, 'src> Parser<'z, 'src> {
    /// `function name(…) body` in statement position.
    pub(super) fn function_declaration(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.advance()?;
        if !self.at(TokenKind::Identifier) {
            return Err(self.error_here("function statement requires a name"));
        }
        let name = self.advance()?;
        let name = self.atom(name.text());
        self.function_rest(start, Some(name))
    }

    /// `function name?(…) body` in expression position.
    pub(super) fn function_expression(&mut self) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.advance()?;
        let name = if self.at(TokenKind::Identifier) {
            let tok = self.advance()?;
            Some(self.atom(tok.text()))
        } else {
            None
        };
        self.function_rest(start, name)
    }

    /// Parameters and body, starting at `(`.
    pub(super) fn function_rest(
        &mut self,
        start: Position,
        name: Option<&'z str>,
    ) -> ReflectResult<Node<'z>> {
        self.functions.push(FunctionContext::default());
        let saved_allow_in = std::mem::replace(&mut self.allow_in, true);
        let parsed = self.formals_and_body();
        self.allow_in = saved_allow_in;
        let context = self.functions.pop().unwrap_or_default();
        let (formals, body, is_expression_closure) = parsed?;

        let args_body = if formals.named.is_empty() {
            body
        } else {
            let mut items = formals.named;
            items.push(body);
            self.new_list(
                ParseNodeKind::ArgsBody,
                JsOp::Nop,
                self.span_from(formals.start),
                &items,
                ListFlags::NONE,
            )
        };
        let funbox = self.zone.alloc(FunctionBox {
            name,
            body: args_body,
            is_generator: context.is_generator,
            is_expression_closure,
            has_rest: formals.has_rest,
            is_genexp: false,
        });
        Ok(self.alloc(
            ParseNodeKind::Function,
            JsOp::Nop,
            self.span_from(start),
            Arity::Func(funbox),
        ))
    }

    fn formals_and_body(&mut self) -> ReflectResult<(Formals<'z>, Node<'z>, bool)> {
        let formals = self.formals()?;
        let prologue = if formals.prologue.is_empty() {
            None
        } else {
            let pos = self.span_from(formals.start);
            let var = self.new_list(ParseNodeKind::Var, JsOp::Nop, pos, &formals.prologue, ListFlags::NONE);
            Some(self.new_unary(ParseNodeKind::Semi, JsOp::Nop, pos, Some(var)))
        };

        if self.at(TokenKind::LeftBrace) {
            let body_start = self.cur.span.start;
            self.advance()?;
            let mut items: Vec<Node<'z>> = prologue.into_iter().collect();
            let xflags = if items.is_empty() {
                ListFlags::NONE
            } else {
                ListFlags::DESTRUCT
            };
            items.extend(self.statements_until_brace()?);
            self.expect(TokenKind::RightBrace, "missing } after function body")?;
            let body = self.new_list(
                ParseNodeKind::StatementList,
                JsOp::Nop,
                self.span_from(body_start),
                &items,
                xflags,
            );
            return Ok((formals, body, false));
        }

        // Expression closure.
        let expr = self.assignment_expr()?;
        let ret = self.new_unary(ParseNodeKind::Return, JsOp::Nop, expr.pos, Some(expr));
        let body = match prologue {
            Some(prologue) => self.new_list(
                ParseNodeKind::Seq,
                JsOp::Nop,
                prologue.pos.to(expr.pos),
                &[prologue, ret],
                ListFlags::DESTRUCT,
            ),
            None => ret,
        };
        Ok((formals, body, true))
    }

    /// `( … )` formal parameter list.
    fn formals(&mut self) -> ReflectResult<Formals<'z>> {
        let start = self.cur.span.start;
        self.expect(TokenKind::LeftParen, "missing ( before formal parameters")?;
        let mut formals = Formals {
            named: Vec::new(),
            prologue: Vec::new(),
            has_rest: false,
            start,
        };
        let mut slot = 0u32;
        let mut seen_default = false;
        while !self.at(TokenKind::RightParen) {
            let param_start = self.cur.span.start;
            if self.eat(TokenKind::DotDotDot)? {
                if !self.at(TokenKind::Identifier) {
                    return Err(self.error_here("missing name after ... in rest parameter"));
                }
                let tok = self.advance()?;
                let atom = self.atom(tok.text());
                formals
                    .named
                    .push(self.new_name(atom, tok.span, None, DefnFlags::NONE, Some(slot)));
                formals.has_rest = true;
                if !self.at(TokenKind::RightParen) {
                    return Err(self.error_here("parameter after rest parameter"));
                }
                break;
            }

            let target = match self.cur.kind {
                TokenKind::Identifier | TokenKind::LeftBracket | TokenKind::LeftBrace => {
                    self.binding_target(DefnFlags::NONE)?
                }
                _ => return Err(self.error_here("missing formal parameter")),
            };
            let default = if self.eat(TokenKind::Equal)? {
                Some(self.assignment_expr()?)
            } else {
                None
            };
            if default.is_some() {
                seen_default = true;
            } else if seen_default {
                return Err(self.error_at(
                    target.pos,
                    "parameter(s) with default followed by parameter without default",
                ));
            }
            let dflags = if default.is_some() {
                DefnFlags::DEFAULT
            } else {
                DefnFlags::NONE
            };

            if let Arity::Name { atom, .. } = target.arity {
                formals
                    .named
                    .push(self.new_name(atom, target.pos, default, dflags, Some(slot)));
            } else {
                let placeholder = self.new_name("", target.pos, default, dflags, Some(slot));
                formals.prologue.push(self.new_binary(
                    ParseNodeKind::Assign,
                    JsOp::Nop,
                    self.span_from(param_start),
                    Some(target),
                    placeholder,
                ));
            }
            slot += 1;
            if !self.at(TokenKind::RightParen) {
                self.expect(TokenKind::Comma, "missing ) after formal parameters")?;
            }
        }
        self.expect(TokenKind::RightParen, "missing ) after formal parameters")?;
        Ok(formals)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ReflectError;
    use crate::parser::parse;
    use crate::parser::parse_node::{DefnFlags, ListFlags, Node, ParseNodeKind};
    use crate::zone::Zone;

    fn function<'z>(zone: &'z Zone, src: &str) -> Node<'z> {
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
    fn test_named_params_precede_body() {
        let zone = Zone::new();
        let f = function(&zone, "function f(a, b) { return a; }");
        let funbox = f.funbox().unwrap();
        assert_eq!(funbox.name, Some("f"));
        assert_eq!(funbox.body.kind, ParseNodeKind::ArgsBody);
        let items = funbox.body.list().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].frame_slot(), Some(1));
        assert_eq!(items[2].kind, ParseNodeKind::StatementList);
    }

    #[test]
    fn test_no_params_body_alone() {
        let zone = Zone::new();
        let f = function(&zone, "function f() {}");
        assert_eq!(f.funbox().unwrap().body.kind, ParseNodeKind::StatementList);
    }

    #[test]
    fn test_destructured_param_prologue() {
        let zone = Zone::new();
        let f = function(&zone, "function f([a, b] = [], ...rest) {}");
        let funbox = f.funbox().unwrap();
        assert!(funbox.has_rest);
        let items = funbox.body.list().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].atom().unwrap(), "rest");
        assert_eq!(items[0].frame_slot(), Some(1));

        let body = items[1];
        assert!(body.xflags().contains(ListFlags::DESTRUCT));
        let prologue = body.list().unwrap()[0].required_kid().unwrap();
        assert_eq!(prologue.kind, ParseNodeKind::Var);
        let (pattern, placeholder) = prologue.list().unwrap()[0].pair().unwrap();
        assert_eq!(pattern.kind, ParseNodeKind::Array);
        assert_eq!(placeholder.frame_slot(), Some(0));
        assert!(placeholder.dflags().contains(DefnFlags::DEFAULT));
        assert!(placeholder.name_expr().unwrap().is_some());
    }

    #[test]
    fn test_default_values_recorded() {
        let zone = Zone::new();
        let f = function(&zone, "function f(a, b = 2) {}");
        let items = f.funbox().unwrap().body.list().unwrap();
        assert!(!items[0].dflags().contains(DefnFlags::DEFAULT));
        assert!(items[1].dflags().contains(DefnFlags::DEFAULT));
    }

    #[test]
    fn test_default_must_not_precede_plain_param() {
        assert!(syntax_error("function f(a = 1, b) {}").contains("followed by parameter without default"));
    }

    #[test]
    fn test_rest_must_be_last() {
        assert!(syntax_error("function f(...a, b) {}").contains("parameter after rest parameter"));
    }

    #[test]
    fn test_expression_closure() {
        let zone = Zone::new();
        let f = function(&zone, "function sq(x) x * x;");
        let funbox = f.funbox().unwrap();
        assert!(funbox.is_expression_closure);
        let body = *funbox.body.list().unwrap().last().unwrap();
        assert_eq!(body.kind, ParseNodeKind::Return);
    }

    #[test]
    fn test_expression_closure_with_destructuring_is_seq() {
        let zone = Zone::new();
        let f = function(&zone, "function g([a]) a;");
        let body = f.funbox().unwrap().body;
        assert_eq!(body.kind, ParseNodeKind::Seq);
        assert!(body.xflags().contains(ListFlags::DESTRUCT));
    }

    #[test]
    fn test_yield_marks_generator() {
        let zone = Zone::new();
        let f = function(&zone, "function g() { yield 1; }");
        assert!(f.funbox().unwrap().is_generator);
        let f = function(&zone, "function h() { function g() { yield 1; } }");
        assert!(!f.funbox().unwrap().is_generator);
    }

    #[test]
    fn test_declaration_requires_name() {
        assert!(syntax_error("function () {}").contains("function statement requires a name"));
    }

    #[test]
    fn test_function_expression_may_be_anonymous() {
        let zone = Zone::new();
        let stmt = function(&zone, "(function () {});");
        let f = stmt.required_kid().unwrap();
        assert_eq!(f.kind, ParseNodeKind::Function);
        assert_eq!(f.funbox().unwrap().name, None);
    }

    #[test]
    fn test_in_allowed_inside_function_in_for_init() {
        let zone = Zone::new();
        let program = parse(&zone, "for (var f = function () { return a in b; }; ;) {}", 1, 1024);
        assert!(program.is_ok());
    }
}
