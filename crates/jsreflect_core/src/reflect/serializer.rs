//! Parse tree → AST translation.
//!
//! [`Serializer`] walks a parse tree produced by [`crate::parser`] and emits
//! one [`NodeBuilder`] call per output node.  Dispatch is split between
//! statement and expression position; patterns, functions, comprehensions
//! and (with the `e4x` feature) XML markup have their own entry points.
//!
//! The parse tree's shapes are the producer's, so several constructs are
//! reshaped on the way out:
//!
//! - flat operator chains (`Add[a, b, c]`) are re-associated to the left;
//! - destructured parameters are recovered from the body's prologue;
//! - `for (var x = e in o)` preludes are folded back into the loop;
//! - comprehension loop nests are unrolled into block lists;
//! - catch clauses are split into guarded handlers and one handler.
//!
//! Every unexpected kind or arity is a [`ReflectError::BadParseNode`].

use std::rc::Rc;

use tracing::debug;

use crate::error::{ReflectError, ReflectResult};
use crate::parser::parse_node::{
    Arity, DefnFlags, FunctionBox, IterFlags, JsOp, ListFlags, Node, ParseNodeKind,
};
use crate::parser::scanner::Span;
use crate::reflect::builder::{FunctionData, NodeBuilder, NodeData, PropKind, VarDeclKind};
use crate::reflect::operators::{aop, binop, unop};
use crate::reflect::value::{AstValue, MaybeNode, RegExpValue};

use ParseNodeKind as K;

fn unexpected(what: &str, pn: Node<'_>) -> ReflectError {
    ReflectError::bad_parse_node(format!("{what}: {:?}", pn.kind))
}

fn missing(what: &str, pn: Node<'_>) -> ReflectError {
    ReflectError::bad_parse_node(format!("{:?} node without {what}", pn.kind))
}

/// Translates one parse tree.
pub struct Serializer {
    builder: NodeBuilder,
    depth: usize,
    max_depth: usize,
}

impl Serializer {
    pub fn new(builder: NodeBuilder, max_depth: usize) -> Self {
        Self {
            builder,
            depth: 0,
            max_depth,
        }
    }

    pub fn into_builder(self) -> NodeBuilder {
        self.builder
    }

    /// Translate a whole program.
    pub fn program(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        if !pn.is_kind(K::StatementList) {
            return Err(unexpected("unexpected program node", pn));
        }
        debug!(statements = pn.count(), "serialize start");
        let body = self.statements(pn.list()?)?;
        let program = self.builder.build(Some(pn.pos), NodeData::Program { body })?;
        debug!(allocations = self.builder.heap().allocations(), "serialize finished");
        Ok(program)
    }

    /// Run `f` one recursion level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> ReflectResult<T>) -> ReflectResult<T> {
        if self.depth >= self.max_depth {
            return Err(ReflectError::TooMuchRecursion);
        }
        self.depth += 1;
        let result = crate::stack::with_headroom(|| f(self));
        self.depth -= 1;
        result
    }

    fn build(&mut self, pos: Span, data: NodeData) -> ReflectResult<AstValue> {
        self.builder.build(Some(pos), data)
    }

    fn list(&mut self, values: Vec<MaybeNode>) -> ReflectResult<AstValue> {
        self.builder.build_list(values)
    }

    // ── Lists and optional children ─────────────────────────────────────────

    fn statements(&mut self, items: &[Node<'_>]) -> ReflectResult<AstValue> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(MaybeNode::Node(self.statement(item)?));
        }
        self.list(out)
    }

    fn expressions(&mut self, items: &[Node<'_>]) -> ReflectResult<AstValue> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(MaybeNode::Node(self.expression(item)?));
        }
        self.list(out)
    }

    fn opt_expression(&mut self, pn: Option<Node<'_>>) -> ReflectResult<MaybeNode> {
        pn.map(|pn| self.expression(pn)).transpose().map(MaybeNode::from)
    }

    fn opt_statement(&mut self, pn: Option<Node<'_>>) -> ReflectResult<MaybeNode> {
        pn.map(|pn| self.statement(pn)).transpose().map(MaybeNode::from)
    }

    /// An identifier for `atom`.  Names without a parse node of their own
    /// (labels, property names after `.`, function names) have no location.
    fn identifier_atom(&mut self, atom: &str, pos: Option<Span>) -> ReflectResult<AstValue> {
        let name = self.builder.heap().string(atom)?;
        self.builder.build(pos, NodeData::Identifier { name })
    }

    fn identifier(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        let atom = pn.atom()?;
        self.identifier_atom(atom, Some(pn.pos))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    fn statement(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        self.nested(|s| s.statement_inner(pn))
    }

    fn statement_inner(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        match pn.kind {
            K::Function => self.function(pn, true),
            K::Var | K::Const => self.variable_declaration(pn, false),
            K::Let if pn.is_binary() => self.let_form(pn, false),
            K::Let => self.variable_declaration(pn, true),
            K::Semi => match pn.kid()? {
                Some(kid) => {
                    let expression = self.expression(kid)?;
                    self.build(pn.pos, NodeData::Expression { expression })
                }
                None => self.build(pn.pos, NodeData::Empty),
            },
            K::LexicalScope => {
                let inner = pn.required_kid()?;
                if inner.is_kind(K::StatementList) {
                    self.block_statement(inner)
                } else {
                    self.statement(inner)
                }
            }
            K::StatementList => self.block_statement(pn),
            K::If => {
                let (test, consequent, alternate) = pn.ternary()?;
                let test = self.expression(test.ok_or_else(|| missing("a test", pn))?)?;
                let consequent = self.statement(consequent.ok_or_else(|| missing("a consequent", pn))?)?;
                let alternate = self.opt_statement(alternate)?;
                self.build(pn.pos, NodeData::If { test, consequent, alternate })
            }
            K::Switch => self.switch_statement(pn),
            K::Try => self.try_statement(pn),
            K::With | K::While => {
                let (left, right) = pn.pair()?;
                let expr = self.expression(left)?;
                let body = self.statement(right)?;
                let data = if pn.is_kind(K::With) {
                    NodeData::With { object: expr, body }
                } else {
                    NodeData::While { test: expr, body }
                };
                self.build(pn.pos, data)
            }
            K::DoWhile => {
                let (left, right) = pn.pair()?;
                let body = self.statement(left)?;
                let test = self.expression(right)?;
                self.build(pn.pos, NodeData::DoWhile { body, test })
            }
            K::For => self.for_statement(pn),
            K::Seq => self.for_in_with_prelude(pn),
            K::Break | K::Continue => {
                let label = match pn.arity {
                    Arity::Atom(label) => MaybeNode::Node(self.identifier_atom(label, None)?),
                    Arity::Nullary => MaybeNode::NoNode,
                    _ => return Err(unexpected("unexpected jump arity", pn)),
                };
                let data = if pn.is_kind(K::Break) {
                    NodeData::Break { label }
                } else {
                    NodeData::Continue { label }
                };
                self.build(pn.pos, data)
            }
            K::Label => {
                let label = self.identifier_atom(pn.atom()?, None)?;
                let body = pn.name_expr()?.ok_or_else(|| missing("a body", pn))?;
                let body = self.statement(body)?;
                self.build(pn.pos, NodeData::Labeled { label, body })
            }
            K::Throw => {
                let argument = self.expression(pn.required_kid()?)?;
                self.build(pn.pos, NodeData::Throw { argument })
            }
            K::Return => {
                let argument = self.opt_expression(pn.kid()?)?;
                self.build(pn.pos, NodeData::Return { argument })
            }
            K::Debugger => self.build(pn.pos, NodeData::Debugger),
            #[cfg(feature = "e4x")]
            K::DefXmlNs => {
                let namespace = self.expression(pn.required_kid()?)?;
                self.build(pn.pos, NodeData::XmlDefaultDeclaration { namespace })
            }
            K::Nop => self.build(pn.pos, NodeData::Empty),
            _ => Err(unexpected("unexpected statement type", pn)),
        }
    }

    fn block_statement(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        let body = self.statements(pn.list()?)?;
        self.build(pn.pos, NodeData::Block { body })
    }

    // ── Declarations ────────────────────────────────────────────────────────

    /// `var`/`const` (`is_let` false) or `let` declarations.  The kind
    /// starts as `var` or `let`; a const leaf upgrades it.
    fn variable_declaration(&mut self, pn: Node<'_>, is_let: bool) -> ReflectResult<AstValue> {
        let mut kind = if is_let { VarDeclKind::Let } else { VarDeclKind::Var };
        let items = pn.list()?;

        // A for-in head: one pattern, no initializer.
        if pn.xflags().contains(ListFlags::FOR_IN_VAR) {
            let [head] = items else {
                return Err(unexpected("for-in declaration without exactly one target", pn));
            };
            let id = self.pattern(head, Some(&mut kind))?;
            let declarator = self.build(
                head.pos,
                NodeData::VariableDeclarator {
                    id,
                    init: MaybeNode::Node(AstValue::Null),
                },
            )?;
            let declarations = self.list(vec![MaybeNode::Node(declarator)])?;
            return self.build(pn.pos, NodeData::VariableDeclaration { kind, declarations });
        }

        let mut declarators = Vec::with_capacity(items.len());
        for item in items {
            declarators.push(MaybeNode::Node(self.variable_declarator(item, &mut kind)?));
        }
        let declarations = self.list(declarators)?;
        self.build(pn.pos, NodeData::VariableDeclaration { kind, declarations })
    }

    fn variable_declarator(&mut self, pn: Node<'_>, kind: &mut VarDeclKind) -> ReflectResult<AstValue> {
        let (target, init) = match pn.kind {
            K::Name => (pn, pn.name_expr()?),
            K::Assign => {
                let (left, right) = pn.pair()?;
                (left, Some(right))
            }
            _ => return Err(unexpected("unexpected declarator", pn)),
        };
        let pos = match init {
            Some(init) => pn.pos.to(init.pos),
            None => pn.pos,
        };
        let id = self.pattern(target, Some(kind))?;
        let init = self.opt_expression(init)?;
        self.build(pos, NodeData::VariableDeclarator { id, init })
    }

    /// `let (head) body`, as a statement or an expression.
    fn let_form(&mut self, pn: Node<'_>, is_expression: bool) -> ReflectResult<AstValue> {
        let (head, scope) = pn.pair()?;
        if !scope.is_kind(K::LexicalScope) {
            return Err(unexpected("let body outside a lexical scope", scope));
        }
        let mut kind = VarDeclKind::LetHead;
        let items = head.list()?;
        let mut declarators = Vec::with_capacity(items.len());
        for item in items {
            declarators.push(MaybeNode::Node(self.variable_declarator(item, &mut kind)?));
        }
        let head = self.list(declarators)?;
        let body = scope.required_kid()?;
        if is_expression {
            let body = self.expression(body)?;
            self.build(pn.pos, NodeData::LetExpression { head, body })
        } else {
            let body = self.statement(body)?;
            self.build(pn.pos, NodeData::LetStatement { head, body })
        }
    }

    // ── Compound statements ─────────────────────────────────────────────────

    fn switch_statement(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        let (left, right) = pn.pair()?;
        let discriminant = self.expression(left)?;
        let (cases, lexical) = if right.is_kind(K::LexicalScope) {
            (right.required_kid()?, true)
        } else {
            (right, false)
        };
        let items = cases.list()?;
        let mut out = Vec::with_capacity(items.len());
        for case in items {
            let (test, body) = case.binary()?;
            let test = self.opt_expression(test)?;
            let consequent = self.statements(body.list()?)?;
            out.push(MaybeNode::Node(
                self.build(case.pos, NodeData::SwitchCase { test, consequent })?,
            ));
        }
        let cases = self.list(out)?;
        self.build(pn.pos, NodeData::Switch { discriminant, cases, lexical })
    }

    fn try_statement(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        let (block, catches, finalizer) = pn.ternary()?;
        let block = self.statement(block.ok_or_else(|| missing("a block", pn))?)?;

        let mut guarded = Vec::new();
        let mut handler = AstValue::Null;
        if let Some(catches) = catches {
            for scope in catches.list()? {
                let (clause, is_guarded) = self.catch_clause(scope.required_kid()?)?;
                if is_guarded {
                    guarded.push(MaybeNode::Node(clause));
                } else if handler.is_null() {
                    handler = clause;
                } else {
                    return Err(unexpected("second unguarded catch clause", scope));
                }
            }
        }
        let guarded_handlers = self.list(guarded)?;
        let finalizer = self.opt_statement(finalizer)?;
        self.build(
            pn.pos,
            NodeData::Try {
                block,
                guarded_handlers,
                handler,
                finalizer,
            },
        )
    }

    /// A catch clause, and whether it carries a guard.
    fn catch_clause(&mut self, pn: Node<'_>) -> ReflectResult<(AstValue, bool)> {
        if !pn.is_kind(K::Catch) {
            return Err(unexpected("unexpected catch clause", pn));
        }
        let (param, guard, body) = pn.ternary()?;
        let param = self.pattern(param.ok_or_else(|| missing("a parameter", pn))?, None)?;
        let guard = self.opt_expression(guard)?;
        let is_guarded = !guard.is_no_node();
        let body = self.statement(body.ok_or_else(|| missing("a body", pn))?)?;
        let clause = self.build(pn.pos, NodeData::CatchClause { param, guard, body })?;
        Ok((clause, is_guarded))
    }

    // ── Loops ───────────────────────────────────────────────────────────────

    fn for_statement(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        let (head, body) = pn.pair()?;
        let body = self.statement(body)?;

        if head.is_kind(K::ForIn) {
            let (decl, target, _) = head.ternary()?;
            let left = match decl {
                None => self.pattern(target.ok_or_else(|| missing("a target", head))?, None)?,
                Some(scope) if scope.is_kind(K::LexicalScope) => {
                    self.variable_declaration(scope.required_kid()?, true)?
                }
                Some(decl) => self.variable_declaration(decl, false)?,
            };
            return self.for_of_or_in(pn, head, left, body);
        }

        let (init, test, update) = head.ternary()?;
        let init = self.for_init(init)?;
        let test = self.opt_expression(test)?;
        let update = self.opt_expression(update)?;
        self.build(pn.pos, NodeData::For { init, test, update, body })
    }

    fn for_init(&mut self, pn: Option<Node<'_>>) -> ReflectResult<MaybeNode> {
        let Some(pn) = pn else {
            return Ok(MaybeNode::NoNode);
        };
        let init = match pn.kind {
            K::Var | K::Const => self.variable_declaration(pn, false)?,
            K::Let if pn.is_list() => self.variable_declaration(pn, true)?,
            _ => self.expression(pn)?,
        };
        Ok(MaybeNode::Node(init))
    }

    /// `Seq[Var[x = e], For(…)]`: a for-in whose declaration keeps its
    /// initializer.
    fn for_in_with_prelude(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        let [prelude, for_node] = pn.list()? else {
            return Err(unexpected("for-in prelude without exactly two items", pn));
        };
        if !prelude.is_kind(K::Var) || !for_node.is_kind(K::For) {
            return Err(unexpected("unexpected for-in prelude", pn));
        }
        let left = self.variable_declaration(prelude, false)?;
        let (head, body) = for_node.pair()?;
        if !head.is_kind(K::ForIn) {
            return Err(unexpected("for-in prelude without a for-in head", head));
        }
        let body = self.statement(body)?;
        self.for_of_or_in(for_node, head, left, body)
    }

    fn for_of_or_in(
        &mut self,
        for_node: Node<'_>,
        head: Node<'_>,
        left: AstValue,
        body: AstValue,
    ) -> ReflectResult<AstValue> {
        let (_, _, object) = head.ternary()?;
        let right = self.expression(object.ok_or_else(|| missing("an object", head))?)?;
        let data = match for_node.iflags() {
            IterFlags::ForOf => NodeData::ForOf { left, right, body },
            iflags => NodeData::ForIn {
                left,
                right,
                body,
                each: iflags == IterFlags::ForEach,
            },
        };
        self.build(for_node.pos, data)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────

    fn expression(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        self.nested(|s| s.expression_inner(pn))
    }

    fn expression_inner(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        match pn.kind {
            K::Function => self.function(pn, false),
            K::Comma => {
                let expressions = self.expressions(pn.list()?)?;
                self.build(pn.pos, NodeData::Sequence { expressions })
            }
            K::Conditional => {
                let (test, consequent, alternate) = pn.ternary()?;
                let (Some(test), Some(consequent), Some(alternate)) = (test, consequent, alternate) else {
                    return Err(missing("three operands", pn));
                };
                let test = self.expression(test)?;
                let consequent = self.expression(consequent)?;
                let alternate = self.expression(alternate)?;
                self.build(pn.pos, NodeData::Conditional { test, consequent, alternate })
            }
            K::Or | K::And if pn.is_binary() => {
                let (left, right) = pn.pair()?;
                let left = self.expression(left)?;
                let right = self.expression(right)?;
                let or = pn.is_kind(K::Or);
                self.build(pn.pos, NodeData::Logical { or, left, right })
            }
            K::Or | K::And => self.left_associate(pn),
            K::PreIncrement | K::PreDecrement | K::PostIncrement | K::PostDecrement => {
                let argument = self.expression(pn.required_kid()?)?;
                let increment = matches!(pn.kind, K::PreIncrement | K::PostIncrement);
                let prefix = matches!(pn.kind, K::PreIncrement | K::PreDecrement);
                self.build(pn.pos, NodeData::Update { increment, prefix, argument })
            }
            kind if kind.is_assignment() => {
                let operator = aop(pn.op)?;
                let (left, right) = pn.pair()?;
                let left = self.pattern(left, None)?;
                let right = self.expression(right)?;
                self.build(pn.pos, NodeData::Assignment { operator, left, right })
            }
            K::Add
            | K::Sub
            | K::StrictEq
            | K::Eq
            | K::StrictNe
            | K::Ne
            | K::Lt
            | K::Le
            | K::Gt
            | K::Ge
            | K::Lsh
            | K::Rsh
            | K::Ursh
            | K::Star
            | K::Div
            | K::Mod
            | K::BitOr
            | K::BitXor
            | K::BitAnd
            | K::In
            | K::Instanceof
            | K::DblDot => {
                if !pn.is_binary() {
                    return self.left_associate(pn);
                }
                let operator = binop(pn.kind)?;
                let (left, right) = pn.pair()?;
                let left = self.expression(left)?;
                let right = self.expression(right)?;
                self.build(pn.pos, NodeData::Binary { operator, left, right })
            }
            K::Delete | K::Typeof | K::Void | K::Not | K::BitNot | K::Pos | K::Neg => {
                let operator = unop(pn.kind, pn.op)?;
                let argument = self.expression(pn.required_kid()?)?;
                self.build(pn.pos, NodeData::Unary { operator, argument })
            }
            K::New | K::Call => {
                if pn.is_generator_expr() {
                    return self.comprehension(pn.generator_expr()?, pn.pos, true);
                }
                let [callee, args @ ..] = pn.list()? else {
                    return Err(missing("a callee", pn));
                };
                let callee = self.expression(callee)?;
                let arguments = self.expressions(args)?;
                let data = if pn.is_kind(K::New) {
                    NodeData::New { callee, arguments }
                } else {
                    NodeData::Call { callee, arguments }
                };
                self.build(pn.pos, data)
            }
            K::Dot => {
                let object = pn.name_expr()?.ok_or_else(|| missing("an object", pn))?;
                let object = self.expression(object)?;
                let property = self.identifier_atom(pn.atom()?, None)?;
                self.build(
                    pn.pos,
                    NodeData::Member {
                        computed: false,
                        object,
                        property,
                    },
                )
            }
            K::Elem => {
                let (left, right) = pn.pair()?;
                let object = self.expression(left)?;
                let property = self.expression(right)?;
                self.build(
                    pn.pos,
                    NodeData::Member {
                        computed: true,
                        object,
                        property,
                    },
                )
            }
            K::Array => {
                let items = pn.list()?;
                let mut elements = Vec::with_capacity(items.len());
                for item in items {
                    elements.push(if is_elision(item) {
                        MaybeNode::NoNode
                    } else {
                        MaybeNode::Node(self.expression(item)?)
                    });
                }
                let elements = self.list(elements)?;
                self.build(pn.pos, NodeData::Array { elements })
            }
            K::Spread => {
                let expression = self.expression(pn.required_kid()?)?;
                self.build(pn.pos, NodeData::Spread { expression })
            }
            K::Object => {
                // Shorthand properties are only valid as a destructuring target.
                if pn.xflags().contains(ListFlags::DESTRUCT) {
                    return Err(ReflectError::syntax(
                        "invalid object initializer",
                        pn.pos.start.line,
                        pn.pos.start.column,
                    ));
                }
                let items = pn.list()?;
                let mut properties = Vec::with_capacity(items.len());
                for item in items {
                    properties.push(MaybeNode::Node(self.property(item)?));
                }
                let properties = self.list(properties)?;
                self.build(pn.pos, NodeData::Object { properties })
            }
            K::Name => self.identifier(pn),
            K::This => self.build(pn.pos, NodeData::This),
            K::String | K::RegExp | K::Number | K::True | K::False | K::Null => self.literal(pn),
            K::Yield => {
                let argument = self.opt_expression(pn.kid()?)?;
                self.build(pn.pos, NodeData::Yield { argument })
            }
            K::ArrayComp => {
                let [scope] = pn.list()? else {
                    return Err(unexpected("array comprehension without exactly one scope", pn));
                };
                if !scope.is_kind(K::LexicalScope) {
                    return Err(unexpected("array comprehension outside a lexical scope", scope));
                }
                self.comprehension(scope.required_kid()?, pn.pos, false)
            }
            K::Let => self.let_form(pn, true),
            #[cfg(feature = "e4x")]
            _ => self.xml_expression(pn),
            #[cfg(not(feature = "e4x"))]
            _ => Err(unexpected("unexpected expression type", pn)),
        }
    }

    /// Fold a flat operator chain `op[a, b, c]` into `op(op(a, b), c)`.
    /// Each step spans from the chain's start to the end of its right
    /// operand.
    fn left_associate(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        let [head, rest @ ..] = pn.list()? else {
            return Err(missing("operands", pn));
        };
        let logical = matches!(pn.kind, K::Or | K::And);
        let operator = if logical { None } else { Some(binop(pn.kind)?) };

        let mut left = self.expression(head)?;
        for next in rest {
            let right = self.expression(next)?;
            let subpos = Span {
                start: pn.pos.start,
                end: next.pos.end,
            };
            let data = match operator {
                Some(operator) => NodeData::Binary { operator, left, right },
                None => NodeData::Logical {
                    or: pn.is_kind(K::Or),
                    left,
                    right,
                },
            };
            left = self.build(subpos, data)?;
        }
        Ok(left)
    }

    fn property(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        let kind = match pn.op {
            JsOp::InitProp => PropKind::Init,
            JsOp::Getter => PropKind::Get,
            JsOp::Setter => PropKind::Set,
            _ => return Err(unexpected("unexpected object-literal property", pn)),
        };
        let (key, value) = pn.pair()?;
        let key = self.property_name(key)?;
        let value = self.expression(value)?;
        self.build(pn.pos, NodeData::Property { key, value, kind })
    }

    fn property_name(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        match pn.kind {
            K::Name => self.identifier(pn),
            K::String | K::Number => self.literal(pn),
            _ => Err(unexpected("unexpected property name", pn)),
        }
    }

    fn literal(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        let value = match pn.arity {
            Arity::Atom(text) if pn.is_kind(K::String) => self.builder.heap().string(text)?,
            Arity::Number(n) => AstValue::Number(n),
            Arity::RegExp { source, flags } => {
                let heap = self.builder.heap();
                AstValue::RegExp(Rc::new(RegExpValue {
                    source: heap.intern_string(source)?,
                    flags: heap.intern_string(flags)?,
                }))
            }
            Arity::Nullary => match pn.kind {
                K::Null => AstValue::Null,
                K::True => AstValue::Boolean(true),
                K::False => AstValue::Boolean(false),
                _ => return Err(unexpected("unexpected literal type", pn)),
            },
            _ => return Err(unexpected("unexpected literal type", pn)),
        };
        self.build(pn.pos, NodeData::Literal { value })
    }

    // ── Comprehensions ──────────────────────────────────────────────────────

    /// Unroll `For(…, For(…, If(filter, body)))` into blocks, an optional
    /// filter and the body.  Array comprehensions end in `ArrayPush(body)`;
    /// generator expressions in `Semi(Yield(body))`.
    fn comprehension(&mut self, pn: Node<'_>, pos: Span, is_generator: bool) -> ReflectResult<AstValue> {
        if !pn.is_kind(K::For) {
            return Err(unexpected("comprehension without a for block", pn));
        }
        let mut blocks = Vec::new();
        let mut next = pn;
        while next.is_kind(K::For) {
            blocks.push(MaybeNode::Node(self.comprehension_block(next)?));
            next = next.binary()?.1;
        }

        let mut filter = MaybeNode::NoNode;
        if next.is_kind(K::If) {
            let (test, inner, _) = next.ternary()?;
            filter = self.opt_expression(test)?;
            next = inner.ok_or_else(|| missing("a body", next))?;
        } else if !is_generator && next.is_kind(K::StatementList) && next.count() == 0 {
            let elements = self.list(Vec::new())?;
            return self.build(pos, NodeData::Array { elements });
        }

        let body = if is_generator {
            let yielded = match next.kind {
                K::Semi => next.required_kid()?,
                _ => return Err(unexpected("generator expression body is not a statement", next)),
            };
            if !yielded.is_kind(K::Yield) {
                return Err(unexpected("generator expression body is not a yield", yielded));
            }
            yielded.required_kid()?
        } else {
            if !next.is_kind(K::ArrayPush) {
                return Err(unexpected("comprehension body is not an array push", next));
            }
            next.required_kid()?
        };
        let body = self.expression(body)?;
        let blocks = self.list(blocks)?;
        let data = if is_generator {
            NodeData::Generator { body, blocks, filter }
        } else {
            NodeData::Comprehension { body, blocks, filter }
        };
        self.build(pos, data)
    }

    fn comprehension_block(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        let (head, _) = pn.pair()?;
        if !head.is_kind(K::ForIn) {
            return Err(unexpected("comprehension block without a for-in head", head));
        }
        let (_, target, source) = head.ternary()?;
        let left = self.pattern(target.ok_or_else(|| missing("a target", head))?, None)?;
        let right = self.expression(source.ok_or_else(|| missing("a source", head))?)?;
        let each = pn.iflags() == IterFlags::ForEach;
        self.build(head.pos, NodeData::ComprehensionBlock { left, right, each })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Patterns
    // ─────────────────────────────────────────────────────────────────────

    /// A destructuring target.  When `kind` is given, a const leaf upgrades
    /// a `var` declaration to `const`.
    fn pattern(&mut self, pn: Node<'_>, kind: Option<&mut VarDeclKind>) -> ReflectResult<AstValue> {
        self.nested(|s| s.pattern_inner(pn, kind))
    }

    fn pattern_inner(&mut self, pn: Node<'_>, mut kind: Option<&mut VarDeclKind>) -> ReflectResult<AstValue> {
        match pn.kind {
            K::Object => {
                let items = pn.list()?;
                let mut properties = Vec::with_capacity(items.len());
                for item in items {
                    if item.op != JsOp::InitProp {
                        return Err(unexpected("unexpected object-pattern property", item));
                    }
                    let (key, value) = item.pair()?;
                    let key = self.property_name(key)?;
                    let value = self.pattern(value, kind.as_deref_mut())?;
                    properties.push(MaybeNode::Node(
                        self.build(item.pos, NodeData::PropertyPattern { key, value })?,
                    ));
                }
                let properties = self.list(properties)?;
                self.build(pn.pos, NodeData::ObjectPattern { properties })
            }
            K::Array => {
                let items = pn.list()?;
                let mut elements = Vec::with_capacity(items.len());
                for item in items {
                    elements.push(if is_elision(item) {
                        MaybeNode::NoNode
                    } else {
                        MaybeNode::Node(self.pattern(item, kind.as_deref_mut())?)
                    });
                }
                let elements = self.list(elements)?;
                self.build(pn.pos, NodeData::ArrayPattern { elements })
            }
            K::Name => {
                if let Some(kind) = kind
                    && pn.dflags().contains(DefnFlags::CONST)
                    && *kind != VarDeclKind::LetHead
                {
                    *kind = VarDeclKind::Const;
                }
                self.expression_inner(pn)
            }
            _ => self.expression_inner(pn),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Functions
    // ─────────────────────────────────────────────────────────────────────

    fn function(&mut self, pn: Node<'_>, is_declaration: bool) -> ReflectResult<AstValue> {
        let funbox = pn.funbox()?;
        let id = match funbox.name {
            Some(name) => MaybeNode::Node(self.identifier_atom(name, None)?),
            None => MaybeNode::NoNode,
        };
        let (params, defaults, rest, body) = self.function_args_and_body(funbox)?;
        let data = FunctionData {
            id,
            params,
            defaults,
            body,
            rest,
            generator: funbox.is_generator,
            expression: funbox.is_expression_closure,
        };
        let data = if is_declaration {
            NodeData::FunctionDeclaration(data)
        } else {
            NodeData::FunctionExpression(data)
        };
        self.build(pn.pos, data)
    }

    /// Parameters, defaults, rest parameter and body of a function.
    fn function_args_and_body(
        &mut self,
        funbox: &FunctionBox<'_>,
    ) -> ReflectResult<(AstValue, AstValue, MaybeNode, AstValue)> {
        let pn = funbox.body;
        let (args, body) = if pn.is_kind(K::ArgsBody) {
            let Some((body, args)) = pn.list()?.split_last() else {
                return Err(missing("a body", pn));
            };
            (args, *body)
        } else {
            (&[][..], pn)
        };

        let destructuring = body.is_list() && body.xflags().contains(ListFlags::DESTRUCT);
        let prologue = if destructuring {
            let head = body.list()?.first().copied().ok_or_else(|| missing("a prologue", body))?;
            if !head.is_kind(K::Semi) {
                return Err(unexpected("unexpected destructuring prologue", head));
            }
            let var = head.required_kid()?;
            if !var.is_kind(K::Var) {
                return Err(unexpected("unexpected destructuring prologue", var));
            }
            var.list()?
        } else {
            &[]
        };

        let (params, defaults, rest) = self.function_args(args, prologue, funbox.has_rest)?;

        let body = match body.kind {
            // Expression closure.
            K::Return => self.expression(body.required_kid()?)?,
            // Expression closure with a destructuring prologue.
            K::Seq => {
                let ret = body
                    .list()?
                    .get(1)
                    .copied()
                    .filter(|ret| ret.is_kind(K::Return))
                    .ok_or_else(|| missing("a return", body))?;
                self.expression(ret.required_kid()?)?
            }
            K::StatementList => {
                let items = body.list()?;
                let items = if destructuring { items.get(1..).unwrap_or(&[]) } else { items };
                let statements = self.statements(items)?;
                self.build(body.pos, NodeData::Block { body: statements })?
            }
            _ => return Err(unexpected("unexpected function contents", body)),
        };
        Ok((params, defaults, rest, body))
    }

    /// Walk named parameters and prologue entries in slot order.  A
    /// prologue entry `Assign(pattern, placeholder)` claims the slot its
    /// placeholder names; every other slot takes the next named parameter.
    fn function_args(
        &mut self,
        args: &[Node<'_>],
        prologue: &[Node<'_>],
        has_rest: bool,
    ) -> ReflectResult<(AstValue, AstValue, MaybeNode)> {
        let mut params = Vec::new();
        let mut defaults = Vec::new();
        let mut rest = MaybeNode::NoNode;
        let mut args = args.iter().copied().peekable();
        let mut prologue = prologue.iter().copied().peekable();
        let mut slot = 0u32;

        loop {
            if let Some(entry) = prologue.peek().copied() {
                let (target, placeholder) = entry.pair()?;
                if placeholder.frame_slot() == Some(slot) {
                    params.push(MaybeNode::Node(self.pattern(target, None)?));
                    if let Some(default) = default_value(placeholder)? {
                        defaults.push(MaybeNode::Node(self.expression(default)?));
                    }
                    prologue.next();
                    slot += 1;
                    continue;
                }
            }
            match args.next() {
                Some(arg) => {
                    let id = self.identifier(arg)?;
                    if has_rest && args.peek().is_none() {
                        rest = MaybeNode::Node(id);
                    } else {
                        params.push(MaybeNode::Node(id));
                    }
                    if let Some(default) = default_value(arg)? {
                        defaults.push(MaybeNode::Node(self.expression(default)?));
                    }
                }
                None if prologue.peek().is_some() => {
                    return Err(ReflectError::bad_parse_node("missing function argument"));
                }
                None => break,
            }
            slot += 1;
        }

        let params = self.list(params)?;
        let defaults = self.list(defaults)?;
        Ok((params, defaults, rest))
    }

    // ─────────────────────────────────────────────────────────────────────
    // E4X
    // ─────────────────────────────────────────────────────────────────────

    #[cfg(feature = "e4x")]
    fn xml_expression(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        match pn.kind {
            K::XmlUnary => self.expression(pn.required_kid()?),
            K::AnyName => self.build(pn.pos, NodeData::XmlAnyName),
            K::DblColon => {
                let (namespace, right, computed) = match pn.arity {
                    Arity::Binary {
                        left: Some(left),
                        right,
                        ..
                    } => (left, self.expression(right)?, true),
                    Arity::Name {
                        atom,
                        expr: Some(namespace),
                        ..
                    } => (namespace, self.identifier_atom(atom, None)?, false),
                    _ => return Err(unexpected("unexpected qualified name", pn)),
                };
                if namespace.is_kind(K::FunctionNs) {
                    return self.build(pn.pos, NodeData::XmlFunctionQualifiedIdentifier { right, computed });
                }
                let left = self.expression(namespace)?;
                self.build(pn.pos, NodeData::XmlQualifiedIdentifier { left, right, computed })
            }
            K::At => {
                let kid = pn.required_kid()?;
                let is_name = kid.is_kind(K::Name) && kid.op == JsOp::QNamePart;
                let computed = !(is_name || kid.is_kind(K::DblColon) || kid.is_kind(K::AnyName));
                let attribute = self.expression(kid)?;
                self.build(pn.pos, NodeData::XmlAttributeSelector { attribute, computed })
            }
            K::Filter => {
                let (left, right) = pn.pair()?;
                let left = self.expression(left)?;
                let right = self.expression(right)?;
                self.build(pn.pos, NodeData::XmlFilterExpression { left, right })
            }
            _ => self.xml(pn),
        }
    }

    #[cfg(feature = "e4x")]
    fn xml(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        self.nested(|s| s.xml_inner(pn))
    }

    #[cfg(feature = "e4x")]
    fn xml_inner(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        let data = match pn.kind {
            K::XmlCurlyExpr => NodeData::XmlEscape {
                expression: self.expression(pn.required_kid()?)?,
            },
            K::XmlElem => NodeData::XmlElement {
                contents: self.xmls(pn)?,
            },
            K::XmlList => NodeData::XmlList {
                contents: self.xmls(pn)?,
            },
            K::XmlStagO => NodeData::XmlStartTag {
                contents: self.xmls(pn)?,
            },
            K::XmlEtagO => NodeData::XmlEndTag {
                contents: self.xmls(pn)?,
            },
            K::XmlPtagC => NodeData::XmlPointTag {
                contents: self.xmls(pn)?,
            },
            K::XmlText | K::XmlSpace => NodeData::XmlText {
                text: self.atom_string(pn)?,
            },
            K::XmlName if pn.is_list() => NodeData::XmlName {
                contents: self.xmls(pn)?,
            },
            K::XmlName => NodeData::XmlName {
                contents: self.atom_string(pn)?,
            },
            K::XmlAttr => NodeData::XmlAttribute {
                value: self.atom_string(pn)?,
            },
            K::XmlCdata => NodeData::XmlCdata {
                contents: self.atom_string(pn)?,
            },
            K::XmlComment => NodeData::XmlComment {
                contents: self.atom_string(pn)?,
            },
            K::XmlPi => {
                let Arity::Pi { target, data } = pn.arity else {
                    return Err(unexpected("unexpected processing instruction arity", pn));
                };
                let heap = self.builder.heap();
                NodeData::XmlProcessingInstruction {
                    target: heap.string(target)?,
                    contents: heap.string(data)?,
                }
            }
            _ => return Err(unexpected("unexpected XML node type", pn)),
        };
        self.build(pn.pos, data)
    }

    #[cfg(feature = "e4x")]
    fn xmls(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        let items = pn.list()?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(MaybeNode::Node(self.xml(item)?));
        }
        self.list(out)
    }

    #[cfg(feature = "e4x")]
    fn atom_string(&mut self, pn: Node<'_>) -> ReflectResult<AstValue> {
        let atom = pn.atom()?;
        self.builder.heap().string(atom)
    }
}

/// An empty `Comma` list marks an array elision.
fn is_elision(pn: Node<'_>) -> bool {
    pn.is_kind(K::Comma) && pn.count() == 0
}

/// The default value of a parameter or prologue placeholder.
fn default_value<'z>(pn: Node<'z>) -> ReflectResult<Option<Node<'z>>> {
    if !pn.dflags().contains(DefnFlags::DEFAULT) {
        return Ok(None);
    }
    pn.name_expr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::parser::parse_node::ParseNode;
    use crate::reflect::builder::OverrideTable;
    use crate::reflect::value::AstHeap;
    use crate::zone::Zone;

    fn serialize_with(src: &str, loc: bool, overrides: Option<&OverrideTable>) -> ReflectResult<AstValue> {
        let zone = Zone::new();
        let tree = parse(&zone, src, 1, 1024)?;
        let builder = NodeBuilder::configure(None, loc, overrides, AstHeap::new())?;
        Serializer::new(builder, 1024).program(tree)
    }

    fn json(src: &str) -> serde_json::Value {
        serialize_with(src, false, None)
            .unwrap_or_else(|e| panic!("{src:?}: {e}"))
            .to_json()
    }

    fn first_expr(src: &str) -> serde_json::Value {
        json(src)["body"][0]["expression"].clone()
    }

    #[test]
    fn test_program_shape() {
        let v = json("x;");
        assert_eq!(v["type"], "Program");
        assert_eq!(v["body"][0]["type"], "ExpressionStatement");
        assert_eq!(v["body"][0]["expression"]["name"], "x");
        assert!(v["loc"].is_null());
    }

    #[test]
    fn test_precedence_nesting() {
        let e = first_expr("1+2*3;");
        assert_eq!(e["operator"], "+");
        assert_eq!(e["left"]["value"], 1);
        assert_eq!(e["right"]["operator"], "*");
        assert_eq!(e["right"]["right"]["value"], 3);
    }

    #[test]
    fn test_left_association_with_locations() {
        let v = serialize_with("a || b || c", true, None).unwrap().to_json();
        let outer = &v["body"][0]["expression"];
        assert_eq!(outer["type"], "LogicalExpression");
        assert_eq!(outer["right"]["name"], "c");
        assert_eq!(outer["loc"]["end"]["column"], 11);
        let inner = &outer["left"];
        assert_eq!(inner["left"]["name"], "a");
        assert_eq!(inner["right"]["name"], "b");
        assert_eq!(inner["loc"]["start"]["column"], 0);
        assert_eq!(inner["loc"]["end"]["column"], 6);
    }

    #[test]
    fn test_binary_chain_folds_left() {
        let e = first_expr("a - b - c;");
        assert_eq!(e["type"], "BinaryExpression");
        assert_eq!(e["left"]["type"], "BinaryExpression");
        assert_eq!(e["left"]["left"]["name"], "a");
        assert_eq!(e["right"]["name"], "c");
    }

    #[test]
    fn test_array_elision_is_hole() {
        let value = serialize_with("[1,,3]", false, None).unwrap();
        let elements = value.get("body").unwrap().as_array().unwrap().get(0).unwrap();
        let elements = elements
            .get("expression")
            .and_then(|e| e.get("elements"))
            .and_then(AstValue::as_array)
            .unwrap();
        assert_eq!(elements.len(), 3);
        assert!(elements.is_hole(1));
        assert!(!elements.is_hole(2));
    }

    #[test]
    fn test_declarations() {
        let v = json("var x = null, y;");
        let decl = &v["body"][0];
        assert_eq!(decl["kind"], "var");
        assert_eq!(decl["declarations"][0]["init"]["type"], "Literal");
        assert!(decl["declarations"][0]["init"]["value"].is_null());
        assert!(decl["declarations"][1]["init"].is_null());
        assert_eq!(json("const a = 1;")["body"][0]["kind"], "const");
        assert_eq!(json("let a = 1;")["body"][0]["kind"], "let");
    }

    #[test]
    fn test_destructuring_declarator() {
        let v = json("var {a, b: [c,,d]} = o;");
        let id = &v["body"][0]["declarations"][0]["id"];
        assert_eq!(id["type"], "ObjectPattern");
        assert_eq!(id["properties"][0]["type"], "PropertyPattern");
        assert_eq!(id["properties"][0]["kind"], "init");
        assert_eq!(id["properties"][1]["value"]["type"], "ArrayPattern");
        assert!(id["properties"][1]["value"]["elements"][1].is_null());
    }

    #[test]
    fn test_shorthand_object_expression_is_syntax_error() {
        let err = serialize_with("({a});", false, None).unwrap_err();
        match err {
            ReflectError::SyntaxError { message, .. } => assert_eq!(message, "invalid object initializer"),
            other => panic!("expected syntax error, got {other:?}"),
        }
        assert!(serialize_with("({a} = o);", false, None).is_ok());
    }

    #[test]
    fn test_object_properties() {
        let e = first_expr("({a: 1, 'b': 2, 3: 4, get c() { return 1; }, set c(v) {}});");
        let props = &e["properties"];
        assert_eq!(props[0]["key"]["type"], "Identifier");
        assert_eq!(props[1]["key"]["type"], "Literal");
        assert_eq!(props[2]["key"]["value"], 3);
        assert_eq!(props[3]["kind"], "get");
        assert_eq!(props[3]["value"]["type"], "FunctionExpression");
        assert_eq!(props[4]["kind"], "set");
    }

    #[test]
    fn test_for_in_forms() {
        let v = json("for (var x = 1 in o);");
        let stmt = &v["body"][0];
        assert_eq!(stmt["type"], "ForInStatement");
        assert_eq!(stmt["left"]["declarations"][0]["init"]["value"], 1);
        assert_eq!(stmt["each"], false);

        let v = json("for each (x in o);");
        assert_eq!(v["body"][0]["each"], true);
        assert_eq!(v["body"][0]["left"]["type"], "Identifier");

        let v = json("for (let [a, b] of o);");
        assert_eq!(v["body"][0]["type"], "ForOfStatement");
        assert_eq!(v["body"][0]["left"]["kind"], "let");
        assert!(v["body"][0]["left"]["declarations"][0]["init"].is_null());

        let v = json("for (var i = 0; i < n; i++) {}");
        let stmt = &v["body"][0];
        assert_eq!(stmt["type"], "ForStatement");
        assert_eq!(stmt["init"]["type"], "VariableDeclaration");
        assert_eq!(stmt["update"]["type"], "UpdateExpression");
        assert_eq!(stmt["body"]["type"], "BlockStatement");

        let v = json("for (;;);");
        assert!(v["body"][0]["init"].is_null());
        assert!(v["body"][0]["test"].is_null());
    }

    #[test]
    fn test_try_partitioning() {
        let v = json("try {} catch (e if e) {} catch (f) {}");
        let stmt = &v["body"][0];
        assert_eq!(stmt["guardedHandlers"].as_array().unwrap().len(), 1);
        assert_eq!(stmt["guardedHandlers"][0]["guard"]["name"], "e");
        assert_eq!(stmt["handler"]["param"]["name"], "f");
        assert!(stmt["finalizer"].is_null());

        let v = json("try {} finally {}");
        assert!(v["body"][0]["handler"].is_null());
        assert_eq!(v["body"][0]["finalizer"]["type"], "BlockStatement");
    }

    #[test]
    fn test_switch_lexical_flag() {
        let v = json("switch (x) { case 1: let y = 2; break; default: }");
        let stmt = &v["body"][0];
        assert_eq!(stmt["lexical"], true);
        assert_eq!(stmt["cases"][0]["test"]["value"], 1);
        assert!(stmt["cases"][1]["test"].is_null());
        assert_eq!(json("switch (x) {}")["body"][0]["lexical"], false);
    }

    #[test]
    fn test_let_forms() {
        let v = json("let (x = 1) x;");
        assert_eq!(v["body"][0]["type"], "LetStatement");
        assert_eq!(v["body"][0]["head"][0]["id"]["name"], "x");
        let e = first_expr("(let (x = 1, y) x + y);");
        assert_eq!(e["type"], "LetExpression");
        assert_eq!(e["body"]["type"], "BinaryExpression");
    }

    #[test]
    fn test_function_shapes() {
        let v = json("function f([a,b]=[], ...rest){}");
        let f = &v["body"][0];
        assert_eq!(f["type"], "FunctionDeclaration");
        assert_eq!(f["id"]["name"], "f");
        assert_eq!(f["params"].as_array().unwrap().len(), 1);
        assert_eq!(f["params"][0]["type"], "ArrayPattern");
        assert_eq!(f["defaults"][0]["type"], "ArrayExpression");
        assert_eq!(f["rest"]["name"], "rest");
        assert_eq!(f["body"]["type"], "BlockStatement");
        assert_eq!(f["body"]["body"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_params_interleave_by_slot() {
        let v = json("function f(a, {b}, c = 1) { return a; }");
        let f = &v["body"][0];
        assert_eq!(f["params"][0]["name"], "a");
        assert_eq!(f["params"][1]["type"], "ObjectPattern");
        assert_eq!(f["params"][2]["name"], "c");
        assert_eq!(f["defaults"][0]["value"], 1);
        assert!(f["rest"].is_null());
        assert_eq!(f["body"]["body"][0]["type"], "ReturnStatement");
    }

    #[test]
    fn test_expression_closures() {
        let e = first_expr("(function (x) x * x);");
        assert_eq!(e["expression"], true);
        assert_eq!(e["body"]["type"], "BinaryExpression");
        assert!(e["id"].is_null());

        let e = first_expr("(function ([a, b]) a);");
        assert_eq!(e["params"][0]["type"], "ArrayPattern");
        assert_eq!(e["body"]["name"], "a");
    }

    #[test]
    fn test_generator_flag() {
        let v = json("function g() { yield 1; }");
        assert_eq!(v["body"][0]["generator"], true);
        assert_eq!(v["body"][0]["body"]["body"][0]["expression"]["type"], "YieldExpression");
    }

    #[test]
    fn test_comprehensions() {
        let e = first_expr("[x for (x in o) if (x)];");
        assert_eq!(e["type"], "ComprehensionExpression");
        assert_eq!(e["blocks"].as_array().unwrap().len(), 1);
        assert_eq!(e["blocks"][0]["left"]["name"], "x");
        assert_eq!(e["filter"]["name"], "x");
        assert_eq!(e["body"]["name"], "x");

        let e = first_expr("(x for each (x in o));");
        assert_eq!(e["type"], "GeneratorExpression");
        assert_eq!(e["blocks"][0]["each"], true);
        assert!(e["filter"].is_null());

        let e = first_expr("[[a, b] for (a in x) for (b in y)];");
        assert_eq!(e["blocks"].as_array().unwrap().len(), 2);
        assert_eq!(e["blocks"][1]["right"]["name"], "y");
    }

    #[test]
    fn test_generator_expression_as_sole_argument() {
        let e = first_expr("f(x for (x in o));");
        assert_eq!(e["type"], "CallExpression");
        assert_eq!(e["arguments"][0]["type"], "GeneratorExpression");
    }

    #[test]
    fn test_members_and_calls() {
        let e = first_expr("new a.b(c)[d];");
        assert_eq!(e["type"], "MemberExpression");
        assert_eq!(e["computed"], true);
        assert_eq!(e["object"]["type"], "NewExpression");
        assert_eq!(e["object"]["callee"]["computed"], false);
        assert_eq!(e["object"]["callee"]["property"]["name"], "b");
        assert_eq!(e["object"]["arguments"][0]["name"], "c");
    }

    #[test]
    fn test_unary_update_and_assignment() {
        let e = first_expr("delete a.b;");
        assert_eq!(e["operator"], "delete");
        assert_eq!(e["prefix"], true);
        let e = first_expr("x++;");
        assert_eq!(e["operator"], "++");
        assert_eq!(e["prefix"], false);
        let e = first_expr("x >>>= 2;");
        assert_eq!(e["type"], "AssignmentExpression");
        assert_eq!(e["operator"], ">>>=");
        let e = first_expr("[a, b] = c;");
        assert_eq!(e["left"]["type"], "ArrayPattern");
    }

    #[test]
    fn test_literals() {
        let v = json("'s'; 1.5; /re/g; true; false; null; this;");
        let body = &v["body"];
        assert_eq!(body[0]["expression"]["value"], "s");
        assert_eq!(body[1]["expression"]["value"], 1.5);
        assert_eq!(body[2]["expression"]["value"], "/re/g");
        assert_eq!(body[3]["expression"]["value"], true);
        assert_eq!(body[4]["expression"]["value"], false);
        assert!(body[5]["expression"]["value"].is_null());
        assert_eq!(body[6]["expression"]["type"], "ThisExpression");
    }

    #[test]
    fn test_statements_misc() {
        let v = json("a: while (1) { if (x) break a; else continue a; } do ; while (0); debugger; with (o) {} ;");
        let body = &v["body"];
        assert_eq!(body[0]["type"], "LabeledStatement");
        assert_eq!(body[0]["label"]["name"], "a");
        let inner = &body[0]["body"]["body"]["body"][0];
        assert_eq!(inner["consequent"]["type"], "BreakStatement");
        assert_eq!(inner["alternate"]["label"]["name"], "a");
        assert_eq!(body[1]["type"], "DoWhileStatement");
        assert_eq!(body[2]["type"], "DebuggerStatement");
        assert_eq!(body[3]["type"], "WithStatement");
        assert_eq!(body[4]["type"], "EmptyStatement");
    }

    #[test]
    fn test_unlocated_identifiers() {
        let v = serialize_with("a.b; function f() {}", true, None).unwrap().to_json();
        let member = &v["body"][0]["expression"];
        assert!(member["property"]["loc"].is_null());
        assert!(member["object"]["loc"].is_object());
        assert!(v["body"][1]["id"]["loc"].is_null());
    }

    #[test]
    fn test_override_replaces_every_binary_node() {
        let table = OverrideTable::new().with_callback("binaryExpression", |_| Ok(AstValue::Number(7.0)));
        let v = serialize_with("1 + 2 * 3;", false, Some(&table)).unwrap().to_json();
        assert_eq!(v["body"][0]["expression"], 7);
    }

    #[test]
    fn test_depth_limit() {
        let zone = Zone::new();
        let src = "a".to_string() + &".b".repeat(100) + ";";
        let tree = parse(&zone, &src, 1, 1024).unwrap();
        let builder = NodeBuilder::configure(None, false, None, AstHeap::new()).unwrap();
        let err = Serializer::new(builder, 32).program(tree).unwrap_err();
        assert_eq!(err, ReflectError::TooMuchRecursion);
    }

    #[test]
    fn test_unexpected_statement_kind_is_internal() {
        let zone = Zone::new();
        let stray = zone.alloc(ParseNode::new(K::Case, JsOp::Nop, Span::default(), Arity::Nullary));
        let program = zone.alloc(ParseNode::new(
            K::StatementList,
            JsOp::Nop,
            Span::default(),
            Arity::List {
                items: zone.alloc_slice(&[&*stray]),
                xflags: ListFlags::NONE,
            },
        ));
        let builder = NodeBuilder::configure(None, false, None, AstHeap::new()).unwrap();
        let err = Serializer::new(builder, 64).program(program).unwrap_err();
        assert!(matches!(err, ReflectError::BadParseNode(_)));
    }

    fn span(line: u32, start: u32, end: u32) -> Span {
        use crate::parser::scanner::Position;
        Span {
            start: Position {
                offset: start as usize,
                line,
                column: start,
            },
            end: Position {
                offset: end as usize,
                line,
                column: end,
            },
        }
    }

    fn name<'z>(zone: &'z Zone, atom: &'z str) -> Node<'z> {
        zone.alloc(ParseNode::new(
            K::Name,
            JsOp::Nop,
            Span::default(),
            Arity::Name {
                atom,
                expr: None,
                dflags: DefnFlags::NONE,
                slot: None,
            },
        ))
    }

    fn list<'z>(zone: &'z Zone, kind: ParseNodeKind, items: &[Node<'z>]) -> Node<'z> {
        zone.alloc(ParseNode::new(
            kind,
            JsOp::Nop,
            Span::default(),
            Arity::List {
                items: zone.alloc_slice(items),
                xflags: ListFlags::NONE,
            },
        ))
    }

    fn program_of<'z>(zone: &'z Zone, statement: Node<'z>) -> Node<'z> {
        list(zone, K::StatementList, &[statement])
    }

    #[test]
    fn test_comprehension_without_body_is_empty_array() {
        let zone = Zone::new();
        let head = zone.alloc(ParseNode::new(
            K::ForIn,
            JsOp::Nop,
            Span::default(),
            Arity::Ternary(None, Some(name(&zone, "x")), Some(name(&zone, "o"))),
        ));
        let for_block = zone.alloc(ParseNode::new(
            K::For,
            JsOp::Nop,
            Span::default(),
            Arity::Binary {
                left: Some(head),
                right: list(&zone, K::StatementList, &[]),
                iflags: IterFlags::Plain,
            },
        ));
        let scope = zone.alloc(ParseNode::new(K::LexicalScope, JsOp::Nop, Span::default(), Arity::Unary(Some(for_block))));
        let comp = zone.alloc(ParseNode::new(
            K::ArrayComp,
            JsOp::Nop,
            span(1, 0, 20),
            Arity::List {
                items: zone.alloc_slice(&[&*scope]),
                xflags: ListFlags::NONE,
            },
        ));
        let semi = zone.alloc(ParseNode::new(K::Semi, JsOp::Nop, Span::default(), Arity::Unary(Some(comp))));

        let builder = NodeBuilder::configure(None, true, None, AstHeap::new()).unwrap();
        let v = Serializer::new(builder, 64).program(program_of(&zone, semi)).unwrap().to_json();
        let e = &v["body"][0]["expression"];
        assert_eq!(e["type"], "ArrayExpression");
        assert_eq!(e["elements"], serde_json::json!([]));
        assert_eq!(e["loc"]["start"]["column"], 0);
        assert_eq!(e["loc"]["end"]["column"], 20);
    }

    #[test]
    fn test_second_unguarded_catch_is_internal() {
        fn catch_scope<'z>(zone: &'z Zone, param: &'z str) -> Node<'z> {
            let body = list(zone, K::StatementList, &[]);
            let catch = zone.alloc(ParseNode::new(
                K::Catch,
                JsOp::Nop,
                Span::default(),
                Arity::Ternary(Some(name(zone, param)), None, Some(body)),
            ));
            zone.alloc(ParseNode::new(K::LexicalScope, JsOp::Nop, Span::default(), Arity::Unary(Some(catch))))
        }

        let zone = Zone::new();
        let catches = list(&zone, K::CatchList, &[catch_scope(&zone, "a"), catch_scope(&zone, "b")]);
        let try_node = zone.alloc(ParseNode::new(
            K::Try,
            JsOp::Nop,
            Span::default(),
            Arity::Ternary(Some(list(&zone, K::StatementList, &[])), Some(catches), None),
        ));

        let builder = NodeBuilder::configure(None, false, None, AstHeap::new()).unwrap();
        let err = Serializer::new(builder, 64).program(program_of(&zone, try_node)).unwrap_err();
        assert!(matches!(err, ReflectError::BadParseNode(_)));
        assert_eq!(err.kind(), crate::error::ErrorKind::Internal);
    }

    #[cfg(feature = "e4x")]
    #[test]
    fn test_xml_literals() {
        let e = first_expr("<a x=\"1\">t{e}</a>;");
        assert_eq!(e["type"], "XMLElement");
        let contents = &e["contents"];
        assert_eq!(contents[0]["type"], "XMLStartTag");
        assert_eq!(contents[0]["contents"][0]["type"], "XMLName");
        assert_eq!(contents[0]["contents"][0]["contents"], "a");
        assert_eq!(contents[0]["contents"][2]["type"], "XMLAttribute");
        assert_eq!(contents[1]["type"], "XMLText");
        assert_eq!(contents[2]["type"], "XMLEscape");
        assert_eq!(contents[2]["expression"]["name"], "e");
        assert_eq!(contents[3]["type"], "XMLEndTag");
    }

    #[cfg(feature = "e4x")]
    #[test]
    fn test_xml_selectors() {
        let e = first_expr("x.@y;");
        assert_eq!(e["type"], "MemberExpression");
        assert_eq!(e["property"]["type"], "XMLAttributeSelector");
        assert_eq!(e["property"]["computed"], false);

        let e = first_expr("@[y];");
        assert_eq!(e["computed"], true);

        let e = first_expr("ns::name;");
        assert_eq!(e["type"], "XMLQualifiedIdentifier");
        assert_eq!(e["left"]["name"], "ns");
        assert_eq!(e["right"]["name"], "name");
        assert_eq!(e["computed"], false);

        let e = first_expr("function::f;");
        assert_eq!(e["type"], "XMLFunctionQualifiedIdentifier");

        let e = first_expr("a.(b == 1);");
        assert_eq!(e["type"], "XMLFilterExpression");

        let e = first_expr("a..b;");
        assert_eq!(e["operator"], "..");

        let v = json("default xml namespace = 'n';");
        assert_eq!(v["body"][0]["type"], "XMLDefaultDeclaration");
    }
}
