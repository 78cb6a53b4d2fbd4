//! Node construction.
//!
//! [`NodeBuilder`] turns a node type, an optional source position and a
//! typed payload ([`NodeData`]) into an AST value.  By default this is an
//! object with a `type` tag, the payload's fields and a `loc`.  When the
//! caller's [`OverrideTable`] has a callable entry for the type, that callable
//! is invoked instead with the raw children, and its result replaces the
//! default node entirely.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::error::{ReflectError, ReflectResult};
use crate::parser::scanner::Span;
use crate::reflect::ast_type::AstType;
use crate::reflect::operators::{AssignmentOperator, BinaryOperator, UnaryOperator};
use crate::reflect::value::{AstHeap, AstValue, MaybeNode};

// ─────────────────────────────────────────────────────────────────────────────
// Override table
// ─────────────────────────────────────────────────────────────────────────────

/// A builder override.  Receives the node's children in callback-argument
/// order, followed by the location when locations are tracked.
pub type Callback = Rc<dyn Fn(&[AstValue]) -> ReflectResult<AstValue>>;

/// One entry of an override table.
#[derive(Clone)]
pub enum BuilderEntry {
    Callable(Callback),
    /// Present but `null`/`undefined`: no override.
    Absent,
    /// Any non-callable value.  Rejected when the builder is configured.
    Other(AstValue),
}

impl fmt::Debug for BuilderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuilderEntry::Callable(_) => f.write_str("Callable(<fn>)"),
            BuilderEntry::Absent => f.write_str("Absent"),
            BuilderEntry::Other(v) => f.debug_tuple("Other").field(v).finish(),
        }
    }
}

/// Per-node-type overrides, keyed by callback name (`"binaryExpression"`,
/// `"identifier"`, …).  Unknown names are ignored.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    entries: Vec<(String, BuilderEntry)>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an entry.
    pub fn insert(&mut self, name: impl Into<String>, entry: BuilderEntry) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = entry,
            None => self.entries.push((name, entry)),
        }
    }

    /// Builder-style `insert` of a callable entry.
    pub fn with_callback(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&[AstValue]) -> ReflectResult<AstValue> + 'static,
    ) -> Self {
        self.insert(name, BuilderEntry::Callable(Rc::new(f)));
        self
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &BuilderEntry)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node payloads
// ─────────────────────────────────────────────────────────────────────────────

/// `kind` of a `VariableDeclaration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarDeclKind {
    Var,
    Const,
    Let,
    /// Declarators of a let block or let expression head.  Rendered as
    /// `let`, and never upgraded to `const`.
    LetHead,
}

impl VarDeclKind {
    pub fn token(self) -> &'static str {
        match self {
            VarDeclKind::Var => "var",
            VarDeclKind::Const => "const",
            VarDeclKind::Let | VarDeclKind::LetHead => "let",
        }
    }
}

/// `kind` of an object-literal `Property`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropKind {
    Init,
    Get,
    Set,
}

impl PropKind {
    pub fn token(self) -> &'static str {
        match self {
            PropKind::Init => "init",
            PropKind::Get => "get",
            PropKind::Set => "set",
        }
    }
}

/// Children of a function node.
#[derive(Debug, Clone)]
pub struct FunctionData {
    pub id: MaybeNode,
    pub params: AstValue,
    pub defaults: AstValue,
    pub body: AstValue,
    pub rest: MaybeNode,
    pub generator: bool,
    pub expression: bool,
}

/// The typed children of one AST node.  List children are already-built
/// array values (see [`NodeBuilder::build_list`]).
#[derive(Debug, Clone)]
pub enum NodeData {
    Program { body: AstValue },
    Identifier { name: AstValue },
    Literal { value: AstValue },
    Property { key: AstValue, value: AstValue, kind: PropKind },
    FunctionDeclaration(FunctionData),
    FunctionExpression(FunctionData),
    VariableDeclaration { kind: VarDeclKind, declarations: AstValue },
    VariableDeclarator { id: AstValue, init: MaybeNode },

    Sequence { expressions: AstValue },
    Conditional { test: AstValue, consequent: AstValue, alternate: AstValue },
    Unary { operator: UnaryOperator, argument: AstValue },
    Binary { operator: BinaryOperator, left: AstValue, right: AstValue },
    Assignment { operator: AssignmentOperator, left: AstValue, right: AstValue },
    Logical { or: bool, left: AstValue, right: AstValue },
    Update { increment: bool, prefix: bool, argument: AstValue },
    New { callee: AstValue, arguments: AstValue },
    Call { callee: AstValue, arguments: AstValue },
    Member { computed: bool, object: AstValue, property: AstValue },
    Array { elements: AstValue },
    Spread { expression: AstValue },
    Object { properties: AstValue },
    This,
    Comprehension { body: AstValue, blocks: AstValue, filter: MaybeNode },
    Generator { body: AstValue, blocks: AstValue, filter: MaybeNode },
    Yield { argument: MaybeNode },
    LetExpression { head: AstValue, body: AstValue },

    Empty,
    Block { body: AstValue },
    Expression { expression: AstValue },
    Labeled { label: AstValue, body: AstValue },
    If { test: AstValue, consequent: AstValue, alternate: MaybeNode },
    Switch { discriminant: AstValue, cases: AstValue, lexical: bool },
    While { test: AstValue, body: AstValue },
    DoWhile { body: AstValue, test: AstValue },
    For { init: MaybeNode, test: MaybeNode, update: MaybeNode, body: AstValue },
    ForIn { left: AstValue, right: AstValue, body: AstValue, each: bool },
    ForOf { left: AstValue, right: AstValue, body: AstValue },
    Break { label: MaybeNode },
    Continue { label: MaybeNode },
    With { object: AstValue, body: AstValue },
    Return { argument: MaybeNode },
    /// `handler` is `null` when there is no unguarded catch clause.
    Try { block: AstValue, guarded_handlers: AstValue, handler: AstValue, finalizer: MaybeNode },
    Throw { argument: AstValue },
    Debugger,
    LetStatement { head: AstValue, body: AstValue },

    SwitchCase { test: MaybeNode, consequent: AstValue },
    CatchClause { param: AstValue, guard: MaybeNode, body: AstValue },
    ComprehensionBlock { left: AstValue, right: AstValue, each: bool },

    ArrayPattern { elements: AstValue },
    ObjectPattern { properties: AstValue },
    PropertyPattern { key: AstValue, value: AstValue },

    #[cfg(feature = "e4x")]
    XmlDefaultDeclaration { namespace: AstValue },
    #[cfg(feature = "e4x")]
    XmlAnyName,
    #[cfg(feature = "e4x")]
    XmlQualifiedIdentifier { left: AstValue, right: AstValue, computed: bool },
    #[cfg(feature = "e4x")]
    XmlFunctionQualifiedIdentifier { right: AstValue, computed: bool },
    #[cfg(feature = "e4x")]
    XmlAttributeSelector { attribute: AstValue, computed: bool },
    #[cfg(feature = "e4x")]
    XmlFilterExpression { left: AstValue, right: AstValue },
    #[cfg(feature = "e4x")]
    XmlElement { contents: AstValue },
    #[cfg(feature = "e4x")]
    XmlList { contents: AstValue },
    #[cfg(feature = "e4x")]
    XmlEscape { expression: AstValue },
    #[cfg(feature = "e4x")]
    XmlText { text: AstValue },
    #[cfg(feature = "e4x")]
    XmlStartTag { contents: AstValue },
    #[cfg(feature = "e4x")]
    XmlEndTag { contents: AstValue },
    #[cfg(feature = "e4x")]
    XmlPointTag { contents: AstValue },
    /// `contents` is a string for a simple name, a list otherwise.
    #[cfg(feature = "e4x")]
    XmlName { contents: AstValue },
    #[cfg(feature = "e4x")]
    XmlAttribute { value: AstValue },
    #[cfg(feature = "e4x")]
    XmlCdata { contents: AstValue },
    #[cfg(feature = "e4x")]
    XmlComment { contents: AstValue },
    #[cfg(feature = "e4x")]
    XmlProcessingInstruction { target: AstValue, contents: AstValue },
}

/// A payload value before interning.
enum Slot {
    Value(AstValue),
    Maybe(MaybeNode),
    Bool(bool),
    Token(&'static str),
}

type Slots = SmallVec<[(&'static str, Slot); 8]>;

fn v(value: AstValue) -> Slot {
    Slot::Value(value)
}

fn m(value: MaybeNode) -> Slot {
    Slot::Maybe(value)
}

fn function_slots(f: FunctionData) -> (Slots, SmallVec<[usize; 8]>) {
    let slots: Slots = SmallVec::from_vec(vec![
        ("id", m(f.id)),
        ("params", v(f.params)),
        ("defaults", v(f.defaults)),
        ("body", v(f.body)),
        ("rest", m(f.rest)),
        ("generator", Slot::Bool(f.generator)),
        ("expression", Slot::Bool(f.expression)),
    ]);
    // The callback receives neither defaults nor rest.
    (slots, SmallVec::from_slice(&[0, 1, 3, 5, 6]))
}

impl NodeData {
    pub fn ast_type(&self) -> AstType {
        use NodeData as D;
        match self {
            D::Program { .. } => AstType::Program,
            D::Identifier { .. } => AstType::Identifier,
            D::Literal { .. } => AstType::Literal,
            D::Property { .. } => AstType::Property,
            D::FunctionDeclaration(_) => AstType::FunctionDeclaration,
            D::FunctionExpression(_) => AstType::FunctionExpression,
            D::VariableDeclaration { .. } => AstType::VariableDeclaration,
            D::VariableDeclarator { .. } => AstType::VariableDeclarator,
            D::Sequence { .. } => AstType::SequenceExpression,
            D::Conditional { .. } => AstType::ConditionalExpression,
            D::Unary { .. } => AstType::UnaryExpression,
            D::Binary { .. } => AstType::BinaryExpression,
            D::Assignment { .. } => AstType::AssignmentExpression,
            D::Logical { .. } => AstType::LogicalExpression,
            D::Update { .. } => AstType::UpdateExpression,
            D::New { .. } => AstType::NewExpression,
            D::Call { .. } => AstType::CallExpression,
            D::Member { .. } => AstType::MemberExpression,
            D::Array { .. } => AstType::ArrayExpression,
            D::Spread { .. } => AstType::SpreadExpression,
            D::Object { .. } => AstType::ObjectExpression,
            D::This => AstType::ThisExpression,
            D::Comprehension { .. } => AstType::ComprehensionExpression,
            D::Generator { .. } => AstType::GeneratorExpression,
            D::Yield { .. } => AstType::YieldExpression,
            D::LetExpression { .. } => AstType::LetExpression,
            D::Empty => AstType::EmptyStatement,
            D::Block { .. } => AstType::BlockStatement,
            D::Expression { .. } => AstType::ExpressionStatement,
            D::Labeled { .. } => AstType::LabeledStatement,
            D::If { .. } => AstType::IfStatement,
            D::Switch { .. } => AstType::SwitchStatement,
            D::While { .. } => AstType::WhileStatement,
            D::DoWhile { .. } => AstType::DoWhileStatement,
            D::For { .. } => AstType::ForStatement,
            D::ForIn { .. } => AstType::ForInStatement,
            D::ForOf { .. } => AstType::ForOfStatement,
            D::Break { .. } => AstType::BreakStatement,
            D::Continue { .. } => AstType::ContinueStatement,
            D::With { .. } => AstType::WithStatement,
            D::Return { .. } => AstType::ReturnStatement,
            D::Try { .. } => AstType::TryStatement,
            D::Throw { .. } => AstType::ThrowStatement,
            D::Debugger => AstType::DebuggerStatement,
            D::LetStatement { .. } => AstType::LetStatement,
            D::SwitchCase { .. } => AstType::SwitchCase,
            D::CatchClause { .. } => AstType::CatchClause,
            D::ComprehensionBlock { .. } => AstType::ComprehensionBlock,
            D::ArrayPattern { .. } => AstType::ArrayPattern,
            D::ObjectPattern { .. } => AstType::ObjectPattern,
            D::PropertyPattern { .. } => AstType::PropertyPattern,
            #[cfg(feature = "e4x")]
            D::XmlDefaultDeclaration { .. } => AstType::XmlDefaultDeclaration,
            #[cfg(feature = "e4x")]
            D::XmlAnyName => AstType::XmlAnyName,
            #[cfg(feature = "e4x")]
            D::XmlQualifiedIdentifier { .. } => AstType::XmlQualifiedIdentifier,
            #[cfg(feature = "e4x")]
            D::XmlFunctionQualifiedIdentifier { .. } => AstType::XmlFunctionQualifiedIdentifier,
            #[cfg(feature = "e4x")]
            D::XmlAttributeSelector { .. } => AstType::XmlAttributeSelector,
            #[cfg(feature = "e4x")]
            D::XmlFilterExpression { .. } => AstType::XmlFilterExpression,
            #[cfg(feature = "e4x")]
            D::XmlElement { .. } => AstType::XmlElement,
            #[cfg(feature = "e4x")]
            D::XmlList { .. } => AstType::XmlList,
            #[cfg(feature = "e4x")]
            D::XmlEscape { .. } => AstType::XmlEscape,
            #[cfg(feature = "e4x")]
            D::XmlText { .. } => AstType::XmlText,
            #[cfg(feature = "e4x")]
            D::XmlStartTag { .. } => AstType::XmlStartTag,
            #[cfg(feature = "e4x")]
            D::XmlEndTag { .. } => AstType::XmlEndTag,
            #[cfg(feature = "e4x")]
            D::XmlPointTag { .. } => AstType::XmlPointTag,
            #[cfg(feature = "e4x")]
            D::XmlName { .. } => AstType::XmlName,
            #[cfg(feature = "e4x")]
            D::XmlAttribute { .. } => AstType::XmlAttribute,
            #[cfg(feature = "e4x")]
            D::XmlCdata { .. } => AstType::XmlCdata,
            #[cfg(feature = "e4x")]
            D::XmlComment { .. } => AstType::XmlComment,
            #[cfg(feature = "e4x")]
            D::XmlProcessingInstruction { .. } => AstType::XmlProcessingInstruction,
        }
    }

    /// The default fields in order, and the indices of those fields passed
    /// to an override, in callback-argument order.
    fn into_slots(self) -> (Slots, SmallVec<[usize; 8]>) {
        use NodeData as D;
        let (slots, order): (Vec<(&'static str, Slot)>, &[usize]) = match self {
            D::Program { body } => (vec![("body", v(body))], &[0]),
            D::Identifier { name } => (vec![("name", v(name))], &[0]),
            D::Literal { value } => (vec![("value", v(value))], &[0]),
            D::Property { key, value, kind } => (
                vec![("key", v(key)), ("value", v(value)), ("kind", Slot::Token(kind.token()))],
                &[2, 0, 1],
            ),
            D::FunctionDeclaration(f) | D::FunctionExpression(f) => return function_slots(f),
            D::VariableDeclaration { kind, declarations } => (
                vec![("kind", Slot::Token(kind.token())), ("declarations", v(declarations))],
                &[0, 1],
            ),
            D::VariableDeclarator { id, init } => (vec![("id", v(id)), ("init", m(init))], &[0, 1]),

            D::Sequence { expressions } => (vec![("expressions", v(expressions))], &[0]),
            D::Conditional { test, consequent, alternate } => (
                vec![("test", v(test)), ("consequent", v(consequent)), ("alternate", v(alternate))],
                &[0, 1, 2],
            ),
            D::Unary { operator, argument } => (
                vec![
                    ("operator", Slot::Token(operator.token())),
                    ("argument", v(argument)),
                    ("prefix", Slot::Bool(true)),
                ],
                &[0, 1],
            ),
            D::Binary { operator, left, right } => (
                vec![("operator", Slot::Token(operator.token())), ("left", v(left)), ("right", v(right))],
                &[0, 1, 2],
            ),
            D::Assignment { operator, left, right } => (
                vec![("operator", Slot::Token(operator.token())), ("left", v(left)), ("right", v(right))],
                &[0, 1, 2],
            ),
            D::Logical { or, left, right } => (
                vec![
                    ("operator", Slot::Token(if or { "||" } else { "&&" })),
                    ("left", v(left)),
                    ("right", v(right)),
                ],
                &[0, 1, 2],
            ),
            D::Update { increment, prefix, argument } => (
                vec![
                    ("operator", Slot::Token(if increment { "++" } else { "--" })),
                    ("argument", v(argument)),
                    ("prefix", Slot::Bool(prefix)),
                ],
                &[1, 0, 2],
            ),
            D::New { callee, arguments } => (vec![("callee", v(callee)), ("arguments", v(arguments))], &[0, 1]),
            D::Call { callee, arguments } => (vec![("callee", v(callee)), ("arguments", v(arguments))], &[0, 1]),
            D::Member { computed, object, property } => (
                vec![("object", v(object)), ("property", v(property)), ("computed", Slot::Bool(computed))],
                &[2, 0, 1],
            ),
            D::Array { elements } => (vec![("elements", v(elements))], &[0]),
            D::Spread { expression } => (vec![("expression", v(expression))], &[0]),
            D::Object { properties } => (vec![("properties", v(properties))], &[0]),
            D::This => (vec![], &[]),
            D::Comprehension { body, blocks, filter } | D::Generator { body, blocks, filter } => (
                vec![("body", v(body)), ("blocks", v(blocks)), ("filter", m(filter))],
                &[0, 1, 2],
            ),
            D::Yield { argument } => (vec![("argument", m(argument))], &[0]),
            D::LetExpression { head, body } | D::LetStatement { head, body } => {
                (vec![("head", v(head)), ("body", v(body))], &[0, 1])
            }

            D::Empty | D::Debugger => (vec![], &[]),
            D::Block { body } => (vec![("body", v(body))], &[0]),
            D::Expression { expression } => (vec![("expression", v(expression))], &[0]),
            D::Labeled { label, body } => (vec![("label", v(label)), ("body", v(body))], &[0, 1]),
            D::If { test, consequent, alternate } => (
                vec![("test", v(test)), ("consequent", v(consequent)), ("alternate", m(alternate))],
                &[0, 1, 2],
            ),
            D::Switch { discriminant, cases, lexical } => (
                vec![("discriminant", v(discriminant)), ("cases", v(cases)), ("lexical", Slot::Bool(lexical))],
                &[0, 1, 2],
            ),
            D::While { test, body } => (vec![("test", v(test)), ("body", v(body))], &[0, 1]),
            D::DoWhile { body, test } => (vec![("body", v(body)), ("test", v(test))], &[0, 1]),
            D::For { init, test, update, body } => (
                vec![("init", m(init)), ("test", m(test)), ("update", m(update)), ("body", v(body))],
                &[0, 1, 2, 3],
            ),
            D::ForIn { left, right, body, each } => (
                vec![("left", v(left)), ("right", v(right)), ("body", v(body)), ("each", Slot::Bool(each))],
                &[0, 1, 2, 3],
            ),
            D::ForOf { left, right, body } => (
                vec![("left", v(left)), ("right", v(right)), ("body", v(body))],
                &[0, 1, 2],
            ),
            D::Break { label } | D::Continue { label } => (vec![("label", m(label))], &[0]),
            D::With { object, body } => (vec![("object", v(object)), ("body", v(body))], &[0, 1]),
            D::Return { argument } => (vec![("argument", m(argument))], &[0]),
            D::Try { block, guarded_handlers, handler, finalizer } => (
                vec![
                    ("block", v(block)),
                    ("guardedHandlers", v(guarded_handlers)),
                    ("handler", v(handler)),
                    ("finalizer", m(finalizer)),
                ],
                &[0, 1, 2, 3],
            ),
            D::Throw { argument } => (vec![("argument", v(argument))], &[0]),

            D::SwitchCase { test, consequent } => {
                (vec![("test", m(test)), ("consequent", v(consequent))], &[0, 1])
            }
            D::CatchClause { param, guard, body } => (
                vec![("param", v(param)), ("guard", m(guard)), ("body", v(body))],
                &[0, 1, 2],
            ),
            D::ComprehensionBlock { left, right, each } => (
                vec![("left", v(left)), ("right", v(right)), ("each", Slot::Bool(each))],
                &[0, 1, 2],
            ),

            D::ArrayPattern { elements } => (vec![("elements", v(elements))], &[0]),
            D::ObjectPattern { properties } => (vec![("properties", v(properties))], &[0]),
            D::PropertyPattern { key, value } => (
                vec![("key", v(key)), ("value", v(value)), ("kind", Slot::Token("init"))],
                &[0, 1],
            ),

            #[cfg(feature = "e4x")]
            D::XmlDefaultDeclaration { namespace } => (vec![("namespace", v(namespace))], &[0]),
            #[cfg(feature = "e4x")]
            D::XmlAnyName => (vec![], &[]),
            #[cfg(feature = "e4x")]
            D::XmlQualifiedIdentifier { left, right, computed } => (
                vec![("left", v(left)), ("right", v(right)), ("computed", Slot::Bool(computed))],
                &[0, 1, 2],
            ),
            #[cfg(feature = "e4x")]
            D::XmlFunctionQualifiedIdentifier { right, computed } => {
                (vec![("right", v(right)), ("computed", Slot::Bool(computed))], &[0, 1])
            }
            #[cfg(feature = "e4x")]
            D::XmlAttributeSelector { attribute, computed } => {
                (vec![("attribute", v(attribute)), ("computed", Slot::Bool(computed))], &[0, 1])
            }
            #[cfg(feature = "e4x")]
            D::XmlFilterExpression { left, right } => (vec![("left", v(left)), ("right", v(right))], &[0, 1]),
            #[cfg(feature = "e4x")]
            D::XmlElement { contents }
            | D::XmlList { contents }
            | D::XmlStartTag { contents }
            | D::XmlEndTag { contents }
            | D::XmlPointTag { contents }
            | D::XmlName { contents }
            | D::XmlCdata { contents }
            | D::XmlComment { contents } => (vec![("contents", v(contents))], &[0]),
            #[cfg(feature = "e4x")]
            D::XmlEscape { expression } => (vec![("expression", v(expression))], &[0]),
            #[cfg(feature = "e4x")]
            D::XmlText { text } => (vec![("text", v(text))], &[0]),
            #[cfg(feature = "e4x")]
            D::XmlAttribute { value } => (vec![("value", v(value))], &[0]),
            #[cfg(feature = "e4x")]
            D::XmlProcessingInstruction { target, contents } => {
                (vec![("target", v(target)), ("contents", v(contents))], &[0, 1])
            }
        };
        (SmallVec::from_vec(slots), SmallVec::from_slice(order))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NodeBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Builds AST values for one reflect call.
pub struct NodeBuilder {
    heap: AstHeap,
    save_loc: bool,
    /// `source` of every location: the configured name or `null`.
    source: AstValue,
    callbacks: HashMap<AstType, Callback>,
}

impl fmt::Debug for NodeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeBuilder")
            .field("save_loc", &self.save_loc)
            .field("source", &self.source)
            .field("overrides", &self.callbacks.len())
            .finish()
    }
}

impl NodeBuilder {
    /// Set up a builder.  Every entry of `overrides` naming a node type must
    /// be callable or absent; anything else is a `TypeError`.
    pub fn configure(
        source: Option<&str>,
        save_loc: bool,
        overrides: Option<&OverrideTable>,
        mut heap: AstHeap,
    ) -> ReflectResult<Self> {
        let source = match source {
            Some(name) if save_loc => heap.string(name)?,
            _ => AstValue::Null,
        };

        let mut callbacks = HashMap::new();
        if let Some(table) = overrides {
            for (name, entry) in table.entries() {
                let Some(ty) = AstType::from_callback_name(name) else {
                    continue;
                };
                match entry {
                    BuilderEntry::Callable(f) => {
                        callbacks.insert(ty, Rc::clone(f));
                    }
                    BuilderEntry::Absent => {}
                    BuilderEntry::Other(value) => {
                        return Err(ReflectError::TypeError(format!(
                            "builder.{name} ({}) is not a function",
                            describe(value)
                        )));
                    }
                }
            }
            debug!(entries = table.len(), overrides = callbacks.len(), "builder overrides validated");
        }

        Ok(Self {
            heap,
            save_loc,
            source,
            callbacks,
        })
    }

    pub fn heap(&mut self) -> &mut AstHeap {
        &mut self.heap
    }

    pub fn into_heap(self) -> AstHeap {
        self.heap
    }

    /// Whether `ty` is overridden.
    pub fn has_override(&self, ty: AstType) -> bool {
        self.callbacks.contains_key(&ty)
    }

    /// Build one node.  `pos` of `None` gives a `null` location even when
    /// locations are tracked.
    pub fn build(&mut self, pos: Option<Span>, data: NodeData) -> ReflectResult<AstValue> {
        let ty = data.ast_type();
        let (slots, order) = data.into_slots();

        if let Some(callback) = self.callbacks.get(&ty).cloned() {
            let mut slots: SmallVec<[Option<Slot>; 8]> = slots.into_iter().map(|(_, s)| Some(s)).collect();
            let mut args: SmallVec<[AstValue; 8]> = SmallVec::new();
            for index in order {
                let slot = slots
                    .get_mut(index)
                    .and_then(Option::take)
                    .ok_or_else(|| ReflectError::Internal(format!("bad callback order for {ty:?}")))?;
                let arg = match slot {
                    Slot::Maybe(node) => node.into_callback_arg(),
                    other => self.slot_value(other)?,
                };
                args.push(arg);
            }
            if self.save_loc {
                args.push(self.location_for(pos)?);
            }
            trace!(callback = ty.callback_name(), args = args.len(), "builder override");
            return callback(&args);
        }

        let mut node = self.heap.new_object()?;
        let tag = self.heap.string(ty.type_name())?;
        self.heap.set_field(&mut node, "type", tag)?;
        for (name, slot) in slots {
            let value = match slot {
                Slot::Maybe(child) => child.into_field(),
                other => self.slot_value(other)?,
            };
            self.heap.set_field(&mut node, name, value)?;
        }
        let loc = self.location_for(pos)?;
        self.heap.set_field(&mut node, "loc", loc)?;
        Ok(node.finish())
    }

    fn slot_value(&mut self, slot: Slot) -> ReflectResult<AstValue> {
        Ok(match slot {
            Slot::Value(value) => value,
            Slot::Maybe(node) => node.into_field(),
            Slot::Bool(b) => AstValue::Boolean(b),
            Slot::Token(s) => self.heap.string(s)?,
        })
    }

    /// Build an ordered list.  No-node entries become holes.
    pub fn build_list(&mut self, elements: Vec<MaybeNode>) -> ReflectResult<AstValue> {
        let mut array = self.heap.new_array(elements.len())?;
        for (index, element) in elements.into_iter().enumerate() {
            self.heap.set_element(&mut array, index, element.into_element())?;
        }
        Ok(array.finish())
    }

    /// `{start: {line, column}, end: {line, column}, source}`, or `null` when
    /// locations are not tracked or `pos` is absent.
    pub fn location_for(&mut self, pos: Option<Span>) -> ReflectResult<AstValue> {
        let Some(pos) = pos.filter(|_| self.save_loc) else {
            return Ok(AstValue::Null);
        };
        let start = self.point(pos.start.line, pos.start.column)?;
        let end = self.point(pos.end.line, pos.end.column)?;
        let mut loc = self.heap.new_object()?;
        self.heap.set_field(&mut loc, "start", start)?;
        self.heap.set_field(&mut loc, "end", end)?;
        self.heap.set_field(&mut loc, "source", self.source.clone())?;
        Ok(loc.finish())
    }

    fn point(&mut self, line: u32, column: u32) -> ReflectResult<AstValue> {
        let mut point = self.heap.new_object()?;
        self.heap.set_field(&mut point, "line", AstValue::Number(f64::from(line)))?;
        self.heap.set_field(&mut point, "column", AstValue::Number(f64::from(column)))?;
        Ok(point.finish())
    }
}

fn describe(value: &AstValue) -> String {
    match value {
        AstValue::Undefined => "undefined".into(),
        AstValue::Null => "null".into(),
        AstValue::Boolean(b) => b.to_string(),
        AstValue::Number(n) => n.to_string(),
        AstValue::String(s) => format!("{s:?}"),
        AstValue::RegExp(re) => re.to_string(),
        AstValue::Object(_) => "object".into(),
        AstValue::Array(_) => "array".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::scanner::Position;
    use std::cell::Cell;

    fn span(line: u32, col: u32, end_col: u32) -> Span {
        Span {
            start: Position { offset: col as usize, line, column: col },
            end: Position { offset: end_col as usize, line, column: end_col },
        }
    }

    fn builder(save_loc: bool, overrides: Option<&OverrideTable>) -> NodeBuilder {
        NodeBuilder::configure(Some("a.js"), save_loc, overrides, AstHeap::new()).unwrap()
    }

    #[test]
    fn test_default_node_shape() {
        let mut b = builder(true, None);
        let name = b.heap().string("x").unwrap();
        let node = b.build(Some(span(1, 0, 1)), NodeData::Identifier { name }).unwrap();
        let keys: Vec<_> = node.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["type", "name", "loc"]);
        assert_eq!(node.node_type(), Some("Identifier"));
        let loc = node.get("loc").unwrap();
        assert_eq!(loc.get("source").and_then(AstValue::as_str), Some("a.js"));
        assert_eq!(loc.get("end").unwrap().get("column"), Some(&AstValue::Number(1.0)));
    }

    #[test]
    fn test_loc_null_when_untracked_or_absent() {
        let mut b = builder(false, None);
        let node = b.build(Some(span(1, 0, 1)), NodeData::This).unwrap();
        assert_eq!(node.get("loc"), Some(&AstValue::Null));

        let mut b = builder(true, None);
        let node = b.build(None, NodeData::This).unwrap();
        assert_eq!(node.get("loc"), Some(&AstValue::Null));
    }

    #[test]
    fn test_no_node_field_is_null() {
        let mut b = builder(false, None);
        let node = b.build(None, NodeData::Return { argument: MaybeNode::NoNode }).unwrap();
        assert_eq!(node.get("argument"), Some(&AstValue::Null));
    }

    #[test]
    fn test_build_list_holes() {
        let mut b = builder(false, None);
        let list = b
            .build_list(vec![MaybeNode::Node(AstValue::Null), MaybeNode::NoNode])
            .unwrap();
        let arr = list.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert!(!arr.is_hole(0));
        assert!(arr.is_hole(1));
    }

    #[test]
    fn test_override_replaces_node_and_gets_args_in_order() {
        let seen = Rc::new(Cell::new(0usize));
        let seen_in = Rc::clone(&seen);
        let table = OverrideTable::new().with_callback("updateExpression", move |args| {
            seen_in.set(args.len());
            assert_eq!(args[1].as_str(), Some("++"));
            assert_eq!(args[2], AstValue::Boolean(false));
            Ok(AstValue::Number(42.0))
        });
        let mut b = builder(false, Some(&table));
        let result = b
            .build(
                None,
                NodeData::Update {
                    increment: true,
                    prefix: false,
                    argument: AstValue::Null,
                },
            )
            .unwrap();
        assert_eq!(result, AstValue::Number(42.0));
        assert_eq!(seen.get(), 3);
    }

    #[test]
    fn test_override_receives_undefined_and_trailing_loc() {
        let table = OverrideTable::new().with_callback("ifStatement", |args| {
            assert_eq!(args.len(), 4);
            assert!(args[2].is_undefined());
            assert!(args[3].as_object().is_some());
            Ok(AstValue::Null)
        });
        let mut b = builder(true, Some(&table));
        b.build(
            Some(span(1, 0, 5)),
            NodeData::If {
                test: AstValue::Boolean(true),
                consequent: AstValue::Null,
                alternate: MaybeNode::NoNode,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_function_callback_omits_defaults_and_rest() {
        let table = OverrideTable::new().with_callback("functionExpression", |args| {
            assert_eq!(args.len(), 5);
            assert!(args[0].is_undefined());
            Ok(AstValue::Null)
        });
        let mut b = builder(false, Some(&table));
        let empty = b.build_list(Vec::new()).unwrap();
        b.build(
            None,
            NodeData::FunctionExpression(FunctionData {
                id: MaybeNode::NoNode,
                params: empty.clone(),
                defaults: empty.clone(),
                body: AstValue::Null,
                rest: MaybeNode::NoNode,
                generator: false,
                expression: false,
            }),
        )
        .unwrap();
    }

    #[test]
    fn test_non_callable_entry_is_type_error() {
        let mut table = OverrideTable::new();
        table.insert("literal", BuilderEntry::Other(AstValue::Number(3.0)));
        let err = NodeBuilder::configure(None, true, Some(&table), AstHeap::new()).unwrap_err();
        assert!(matches!(err, ReflectError::TypeError(_)));
    }

    #[test]
    fn test_absent_and_unknown_entries_ignored() {
        let mut table = OverrideTable::new();
        table.insert("literal", BuilderEntry::Absent);
        table.insert("notANodeType", BuilderEntry::Other(AstValue::Null));
        let b = NodeBuilder::configure(None, true, Some(&table), AstHeap::new()).unwrap();
        assert!(!b.has_override(AstType::Literal));
    }

    #[test]
    fn test_callback_error_propagates() {
        let table = OverrideTable::new()
            .with_callback("thisExpression", |_| Err(ReflectError::TypeError("boom".into())));
        let mut b = builder(false, Some(&table));
        let err = b.build(None, NodeData::This).unwrap_err();
        assert_eq!(err, ReflectError::TypeError("boom".into()));
    }
}
