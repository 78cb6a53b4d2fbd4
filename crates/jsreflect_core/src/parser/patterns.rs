//! Destructuring patterns.
//!
//! Binding positions (declarators, parameters, catch parameters,
//! comprehension heads) are parsed directly as patterns so their leaves can
//! carry definition flags.  Assignment targets are parsed as expressions and
//! checked afterwards.

use crate::error::ReflectResult;
use crate::parser::Parser;
use crate::parser::parse_node::{DefnFlags, JsOp, ListFlags, Node, ParseNodeKind};
use crate::parser::scanner::TokenKind;

impl<'z, 'src> Parser<'z, 'src> {
    /// An identifier, array pattern or object pattern whose leaf names get
    /// `dflags`.
    pub(super) fn binding_target(&mut self, dflags: DefnFlags) -> ReflectResult<Node<'z>> {
        match self.cur.kind {
            TokenKind::Identifier => {
                let tok = self.advance()?;
                let atom = self.atom(tok.text());
                Ok(self.new_name(atom, tok.span, None, dflags, None))
            }
            TokenKind::LeftBracket => self.nested(|p| p.array_binding(dflags)),
            TokenKind::LeftBrace => self.nested(|p| p.object_binding(dflags)),
            _ => Err(self.error_here("missing variable name")),
        }
    }

    fn array_binding(&mut self, dflags: DefnFlags) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.advance()?;
        let mut items = Vec::new();
        let mut xflags = ListFlags::NONE;
        while !self.at(TokenKind::RightBracket) {
            if self.at(TokenKind::Comma) {
                let comma = self.advance()?;
                items.push(self.new_elision(comma.span));
                xflags = xflags | ListFlags::HOLEY;
                continue;
            }
            items.push(self.binding_target(dflags)?);
            if !self.at(TokenKind::RightBracket) {
                self.expect(TokenKind::Comma, "missing ] after element list")?;
            }
        }
        self.expect(TokenKind::RightBracket, "missing ] after element list")?;
        Ok(self.new_list(ParseNodeKind::Array, JsOp::Nop, self.span_from(start), &items, xflags))
    }

    fn object_binding(&mut self, dflags: DefnFlags) -> ReflectResult<Node<'z>> {
        let start = self.cur.span.start;
        self.advance()?;
        let mut props = Vec::new();
        let mut xflags = ListFlags::NONE;
        while !self.at(TokenKind::RightBrace) {
            let prop_start = self.cur.span.start;
            let (key, is_ident) = self.property_key()?;
            let value = if self.eat(TokenKind::Colon)? {
                self.binding_target(dflags)?
            } else if is_ident {
                xflags = xflags | ListFlags::DESTRUCT;
                self.new_name(key.atom()?, key.pos, None, dflags, None)
            } else {
                return Err(self.error_here("missing : after property id"));
            };
            props.push(self.new_binary(
                ParseNodeKind::Colon,
                JsOp::InitProp,
                self.span_from(prop_start),
                Some(key),
                value,
            ));
            if !self.at(TokenKind::RightBrace) {
                self.expect(TokenKind::Comma, "missing } after property list")?;
            }
        }
        self.expect(TokenKind::RightBrace, "missing } after property list")?;
        Ok(self.new_list(ParseNodeKind::Object, JsOp::Nop, self.span_from(start), &props, xflags))
    }

    /// Check that `node` can be assigned to.  Array and object literals are
    /// accepted as destructuring patterns when `allow_pattern` is set.
    pub(super) fn check_assignment_target(
        &self,
        node: Node<'z>,
        allow_pattern: bool,
        message: &str,
    ) -> ReflectResult<()> {
        match node.kind {
            ParseNodeKind::Name | ParseNodeKind::Dot | ParseNodeKind::Elem | ParseNodeKind::Call => Ok(()),
            #[cfg(feature = "e4x")]
            ParseNodeKind::At | ParseNodeKind::DblColon | ParseNodeKind::DblDot => Ok(()),
            ParseNodeKind::Array if allow_pattern => {
                for item in node.list()? {
                    let is_elision = item.is_kind(ParseNodeKind::Comma) && item.count() == 0;
                    if !is_elision {
                        self.check_assignment_target(item, true, message)?;
                    }
                }
                Ok(())
            }
            ParseNodeKind::Object if allow_pattern => {
                for prop in node.list()? {
                    if prop.op != JsOp::InitProp {
                        return Err(self.error_at(prop.pos, message));
                    }
                    let (_, value) = prop.binary()?;
                    self.check_assignment_target(value, true, message)?;
                }
                Ok(())
            }
            _ => Err(self.error_at(node.pos, message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ReflectError;
    use crate::parser::parse;
    use crate::parser::parse_node::{DefnFlags, ListFlags, ParseNodeKind};
    use crate::zone::Zone;

    #[test]
    fn test_const_pattern_leaves_are_flagged() {
        let zone = Zone::new();
        let program = parse(&zone, "const [a, {b: c}] = o;", 1, 1024).unwrap();
        let decl = program.list().unwrap()[0];
        let (pattern, _) = decl.list().unwrap()[0].pair().unwrap();
        let items = pattern.list().unwrap();
        assert!(items[0].dflags().contains(DefnFlags::CONST));
        let (_, c) = items[1].list().unwrap()[0].pair().unwrap();
        assert!(c.dflags().contains(DefnFlags::CONST));
    }

    #[test]
    fn test_binding_holes() {
        let zone = Zone::new();
        let program = parse(&zone, "var [, a] = o;", 1, 1024).unwrap();
        let decl = program.list().unwrap()[0];
        let (pattern, _) = decl.list().unwrap()[0].pair().unwrap();
        assert!(pattern.xflags().contains(ListFlags::HOLEY));
        assert_eq!(pattern.list().unwrap()[0].kind, ParseNodeKind::Comma);
    }

    #[test]
    fn test_shorthand_binding() {
        let zone = Zone::new();
        let program = parse(&zone, "var {a, b: c} = o;", 1, 1024).unwrap();
        let decl = program.list().unwrap()[0];
        let (pattern, _) = decl.list().unwrap()[0].pair().unwrap();
        assert!(pattern.xflags().contains(ListFlags::DESTRUCT));
        assert_eq!(pattern.count(), 2);
    }

    #[test]
    fn test_nested_assignment_pattern() {
        let zone = Zone::new();
        assert!(parse(&zone, "[a, {b}, [c.d]] = o;", 1, 1024).is_ok());
    }

    #[test]
    fn test_getter_in_pattern_is_error() {
        let zone = Zone::new();
        let err = parse(&zone, "({get a() {}} = o);", 1, 1024).unwrap_err();
        assert!(matches!(err, ReflectError::SyntaxError { .. }));
    }

    #[test]
    fn test_spread_in_pattern_is_error() {
        let zone = Zone::new();
        let err = parse(&zone, "[...a] = o;", 1, 1024).unwrap_err();
        assert!(matches!(err, ReflectError::SyntaxError { .. }));
    }
}
