//! Parse-tree node definitions.
//!
//! The parser produces a tree of [`ParseNode`]s allocated in a
//! [`Zone`](crate::zone::Zone).  Each node has a closed [`ParseNodeKind`], an
//! operator code ([`JsOp`]), a source span and a kind-specific payload
//! ([`Arity`]).  The shapes are the producer's, not the output schema's:
//! operator chains arrive flattened, destructured parameters arrive as a
//! prologue statement, comprehensions arrive as nested loops, and so on.
//! The reflect serializer reshapes them.
//!
//! Accessors such as [`ParseNode::kid`] or [`ParseNode::list`] check the
//! arity and return [`ReflectError::BadParseNode`] on a mismatch, so a
//! malformed tree is reported as an internal error instead of panicking.

use std::fmt;

use crate::error::{ReflectError, ReflectResult};
use crate::parser::scanner::Span;

/// Source span of a parse node.
pub type TokenPos = Span;

// ─────────────────────────────────────────────────────────────────────────────
// ParseNodeKind
// ─────────────────────────────────────────────────────────────────────────────

/// The syntactic category of a parse node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseNodeKind {
    // ── Statements ────────────────────────────────────────────────────────
    /// `{ … }`, a function body, or the whole program.
    StatementList,
    /// Expression statement, or an empty statement when the kid is absent.
    Semi,
    /// A statement that compiles to nothing (for example a bare `function`
    /// statement hoisted elsewhere).
    Nop,
    /// Implicit block scope introduced by `let`, `catch` or a comprehension.
    LexicalScope,
    Var,
    Const,
    /// `let` declaration (list arity) or let block/expression (binary arity).
    Let,
    Function,
    If,
    Switch,
    Case,
    Default,
    While,
    DoWhile,
    /// Any `for` loop: left is the head, right the body.
    For,
    /// `for (init; test; update)` head.
    ForHead,
    /// `for (… in/of …)` head: kid1 declaration, kid2 target, kid3 object.
    ForIn,
    Break,
    Continue,
    /// Labelled statement.
    Label,
    Throw,
    Return,
    Try,
    CatchList,
    Catch,
    With,
    Debugger,
    /// Synthesized statement sequence (`for (var x = e in o)` prelude, or
    /// an expression-closure body with a destructuring prologue).
    Seq,
    /// Function parameters followed by the body as the last element.
    ArgsBody,

    // ── Expressions ───────────────────────────────────────────────────────
    /// Comma expression, or an array elision when empty.
    Comma,
    Conditional,
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    StrictEq,
    Eq,
    StrictNe,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Instanceof,
    Lsh,
    Rsh,
    Ursh,
    Add,
    Sub,
    Star,
    Div,
    Mod,
    Assign,
    AddAssign,
    SubAssign,
    BitOrAssign,
    BitXorAssign,
    BitAndAssign,
    LshAssign,
    RshAssign,
    UrshAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
    Typeof,
    Void,
    Not,
    BitNot,
    Pos,
    Neg,
    Delete,
    New,
    Call,
    /// `a.b`: name arity, atom is the property name, expr the object.
    Dot,
    /// `a[b]`.
    Elem,
    Array,
    Spread,
    Object,
    /// Object-literal property; the op says init, getter or setter.
    Colon,
    Name,
    This,
    String,
    Number,
    RegExp,
    True,
    False,
    Null,
    Yield,
    ArrayComp,
    ArrayPush,

    // ── E4X ───────────────────────────────────────────────────────────────
    /// Wrapper marking an XML name used as an expression.
    XmlUnary,
    /// `*`.
    AnyName,
    /// `ns::name` (name arity) or `ns::[expr]` (binary arity).
    DblColon,
    /// `@attr`.
    At,
    /// `a.(cond)`.
    Filter,
    /// `a..b`.
    DblDot,
    /// The `function` in `function::name`.
    FunctionNs,
    /// `default xml namespace = …`.
    DefXmlNs,
    XmlCurlyExpr,
    XmlElem,
    XmlList,
    XmlStagO,
    XmlEtagO,
    XmlPtagC,
    XmlText,
    XmlSpace,
    XmlName,
    XmlAttr,
    XmlCdata,
    XmlComment,
    XmlPi,
}

impl ParseNodeKind {
    /// `true` for the twelve assignment kinds.
    pub fn is_assignment(self) -> bool {
        use ParseNodeKind::*;
        matches!(
            self,
            Assign
                | AddAssign
                | SubAssign
                | BitOrAssign
                | BitXorAssign
                | BitAndAssign
                | LshAssign
                | RshAssign
                | UrshAssign
                | MulAssign
                | DivAssign
                | ModAssign
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JsOp
// ─────────────────────────────────────────────────────────────────────────────

/// Operator code attached to a parse node.
///
/// Assignment nodes use the arithmetic code of their compound operator
/// (`Nop` for plain `=`); object properties use `InitProp`, `Getter` or
/// `Setter`; names used as XML qualified-name parts use `QNamePart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JsOp {
    #[default]
    Nop,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lsh,
    Rsh,
    Ursh,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Instanceof,
    Or,
    And,
    Not,
    BitNot,
    Neg,
    Pos,
    Typeof,
    Void,
    DelName,
    DelProp,
    DelElem,
    Call,
    New,
    InitProp,
    Getter,
    Setter,
    QNamePart,
    XmlName,
    SetXmlName,
    BindXmlName,
}

// ─────────────────────────────────────────────────────────────────────────────
// Flags
// ─────────────────────────────────────────────────────────────────────────────

/// Extra flags on list nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListFlags(u8);

impl ListFlags {
    /// No flags.
    pub const NONE: ListFlags = ListFlags(0);
    /// A statement list (or `Seq`) that begins with a destructuring
    /// prologue; an object literal that used destructuring shorthand.
    pub const DESTRUCT: ListFlags = ListFlags(1);
    /// A declaration in a `for (… in …)` head: holds exactly one pattern.
    pub const FOR_IN_VAR: ListFlags = ListFlags(2);
    /// An array literal containing holes.
    pub const HOLEY: ListFlags = ListFlags(4);

    /// `true` when every flag in `other` is set.
    pub fn contains(self, other: ListFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ListFlags {
    type Output = ListFlags;

    fn bitor(self, rhs: ListFlags) -> ListFlags {
        ListFlags(self.0 | rhs.0)
    }
}

/// Definition flags on name nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DefnFlags(u8);

impl DefnFlags {
    /// No flags.
    pub const NONE: DefnFlags = DefnFlags(0);
    /// The binding was declared with `const`.
    pub const CONST: DefnFlags = DefnFlags(1);
    /// The parameter has a default value in `expr`.
    pub const DEFAULT: DefnFlags = DefnFlags(2);

    /// `true` when every flag in `other` is set.
    pub fn contains(self, other: DefnFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for DefnFlags {
    type Output = DefnFlags;

    fn bitor(self, rhs: DefnFlags) -> DefnFlags {
        DefnFlags(self.0 | rhs.0)
    }
}

/// Iteration mode of a `for` loop or comprehension block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IterFlags {
    /// Plain loop, or `for (… in …)`.
    #[default]
    Plain,
    /// `for each (… in …)`.
    ForEach,
    /// `for (… of …)`.
    ForOf,
}

// ─────────────────────────────────────────────────────────────────────────────
// FunctionBox
// ─────────────────────────────────────────────────────────────────────────────

/// Per-function data the parser collects while parsing a function.
#[derive(Debug)]
pub struct FunctionBox<'z> {
    /// The function's name, if any.
    pub name: Option<&'z str>,
    /// Either an [`ParseNodeKind::ArgsBody`] list (named parameters then the
    /// body) or, for a function without named parameters, the body alone.
    /// The body is a `StatementList`, a `Return` (expression closure) or a
    /// `Seq` (expression closure with a destructuring prologue).
    pub body: &'z ParseNode<'z>,
    /// The body contains `yield`.
    pub is_generator: bool,
    /// Declared with an expression body: `function (x) x * x`.
    pub is_expression_closure: bool,
    /// The last named parameter is a rest parameter.
    pub has_rest: bool,
    /// Synthesized for a generator expression.
    pub is_genexp: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// ParseNode
// ─────────────────────────────────────────────────────────────────────────────

/// A zone-allocated parse-node reference.
pub type Node<'z> = &'z ParseNode<'z>;

/// Kind-specific payload of a [`ParseNode`].
#[derive(Debug)]
pub enum Arity<'z> {
    /// No children.
    Nullary,
    /// A string payload: string literals, XML text, names and so on.
    Atom(&'z str),
    /// A numeric literal.
    Number(f64),
    /// A regular-expression literal.
    RegExp {
        /// Pattern text.
        source: &'z str,
        /// Flag letters.
        flags: &'z str,
    },
    /// One optional child.
    Unary(Option<Node<'z>>),
    /// Two children; `left` is absent for `default:` cases.
    Binary {
        /// Left child.
        left: Option<Node<'z>>,
        /// Right child.
        right: Node<'z>,
        /// Loop mode, for `For` nodes.
        iflags: IterFlags,
    },
    /// Three optional children.
    Ternary(Option<Node<'z>>, Option<Node<'z>>, Option<Node<'z>>),
    /// An ordered list of children.
    List {
        /// Children in source order.
        items: &'z [Node<'z>],
        /// Extra flags.
        xflags: ListFlags,
    },
    /// A name: identifiers, `a.b` member accesses, labels, parameters.
    Name {
        /// The identifier text.
        atom: &'z str,
        /// Initializer, default value, or the object of a `Dot`.
        expr: Option<Node<'z>>,
        /// Definition flags.
        dflags: DefnFlags,
        /// Formal parameter slot, for parameters and prologue placeholders.
        slot: Option<u32>,
    },
    /// A function.
    Func(&'z FunctionBox<'z>),
    /// An XML processing instruction.
    Pi {
        /// The target name.
        target: &'z str,
        /// Everything after the target.
        data: &'z str,
    },
}

/// One node of the parse tree.
pub struct ParseNode<'z> {
    /// Syntactic category.
    pub kind: ParseNodeKind,
    /// Operator code.
    pub op: JsOp,
    /// Source span.
    pub pos: TokenPos,
    /// Kind-specific payload.
    pub arity: Arity<'z>,
}

impl fmt::Debug for ParseNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseNode")
            .field("kind", &self.kind)
            .field("op", &self.op)
            .field("arity", &self.arity)
            .finish()
    }
}

impl<'z> ParseNode<'z> {
    /// Build a node.
    pub fn new(kind: ParseNodeKind, op: JsOp, pos: TokenPos, arity: Arity<'z>) -> Self {
        Self {
            kind,
            op,
            pos,
            arity,
        }
    }

    /// `true` when the node has the given kind.
    pub fn is_kind(&self, kind: ParseNodeKind) -> bool {
        self.kind == kind
    }

    fn mismatch(&self, expected: &str) -> ReflectError {
        ReflectError::bad_parse_node(format!("{:?} node is not {expected}", self.kind))
    }

    /// `true` for list arity.
    pub fn is_list(&self) -> bool {
        matches!(self.arity, Arity::List { .. })
    }

    /// `true` for binary arity.
    pub fn is_binary(&self) -> bool {
        matches!(self.arity, Arity::Binary { .. })
    }

    /// `true` for name arity.
    pub fn is_name(&self) -> bool {
        matches!(self.arity, Arity::Name { .. })
    }

    /// The child of a unary node (possibly absent).
    pub fn kid(&self) -> ReflectResult<Option<Node<'z>>> {
        match self.arity {
            Arity::Unary(kid) => Ok(kid),
            _ => Err(self.mismatch("unary")),
        }
    }

    /// The child of a unary node, which must be present.
    pub fn required_kid(&self) -> ReflectResult<Node<'z>> {
        self.kid()?.ok_or_else(|| self.mismatch("a unary node with a child"))
    }

    /// The `(left, right)` children of a binary node.
    pub fn binary(&self) -> ReflectResult<(Option<Node<'z>>, Node<'z>)> {
        match self.arity {
            Arity::Binary { left, right, .. } => Ok((left, right)),
            _ => Err(self.mismatch("binary")),
        }
    }

    /// The `(left, right)` children of a binary node whose left child must
    /// be present.
    pub fn pair(&self) -> ReflectResult<(Node<'z>, Node<'z>)> {
        match self.binary()? {
            (Some(left), right) => Ok((left, right)),
            (None, _) => Err(self.mismatch("a binary node with a left child")),
        }
    }

    /// The loop mode of a binary node.
    pub fn iflags(&self) -> IterFlags {
        match self.arity {
            Arity::Binary { iflags, .. } => iflags,
            _ => IterFlags::Plain,
        }
    }

    /// The three children of a ternary node.
    pub fn ternary(&self) -> ReflectResult<(Option<Node<'z>>, Option<Node<'z>>, Option<Node<'z>>)> {
        match self.arity {
            Arity::Ternary(a, b, c) => Ok((a, b, c)),
            _ => Err(self.mismatch("ternary")),
        }
    }

    /// The children of a list node.
    pub fn list(&self) -> ReflectResult<&'z [Node<'z>]> {
        match self.arity {
            Arity::List { items, .. } => Ok(items),
            _ => Err(self.mismatch("a list")),
        }
    }

    /// The extra flags of a list node (empty for other arities).
    pub fn xflags(&self) -> ListFlags {
        match self.arity {
            Arity::List { xflags, .. } => xflags,
            _ => ListFlags::NONE,
        }
    }

    /// The number of children of a list node (zero for other arities).
    pub fn count(&self) -> usize {
        match self.arity {
            Arity::List { items, .. } => items.len(),
            _ => 0,
        }
    }

    /// The atom of a name or atom node.
    pub fn atom(&self) -> ReflectResult<&'z str> {
        match self.arity {
            Arity::Name { atom, .. } | Arity::Atom(atom) => Ok(atom),
            _ => Err(self.mismatch("a name or atom")),
        }
    }

    /// The expression of a name node.
    pub fn name_expr(&self) -> ReflectResult<Option<Node<'z>>> {
        match self.arity {
            Arity::Name { expr, .. } => Ok(expr),
            _ => Err(self.mismatch("a name")),
        }
    }

    /// The definition flags of a name node (empty for other arities).
    pub fn dflags(&self) -> DefnFlags {
        match self.arity {
            Arity::Name { dflags, .. } => dflags,
            _ => DefnFlags::NONE,
        }
    }

    /// The formal parameter slot of a name node.
    pub fn frame_slot(&self) -> Option<u32> {
        match self.arity {
            Arity::Name { slot, .. } => slot,
            _ => None,
        }
    }

    /// The function box of a function node.
    pub fn funbox(&self) -> ReflectResult<&'z FunctionBox<'z>> {
        match self.arity {
            Arity::Func(funbox) => Ok(funbox),
            _ => Err(self.mismatch("a function")),
        }
    }

    /// The numeric value of a number node.
    pub fn number(&self) -> ReflectResult<f64> {
        match self.arity {
            Arity::Number(n) => Ok(n),
            _ => Err(self.mismatch("a number")),
        }
    }

    /// `true` when this is a call of a generator-expression function.
    pub fn is_generator_expr(&self) -> bool {
        if !self.is_kind(ParseNodeKind::Call) {
            return false;
        }
        match self.list() {
            Ok([callee]) => matches!(
                callee.arity,
                Arity::Func(funbox) if funbox.is_genexp
            ),
            _ => false,
        }
    }

    /// For a generator-expression call, the comprehension loop nest inside
    /// the synthesized function body.
    pub fn generator_expr(&self) -> ReflectResult<Node<'z>> {
        let [callee] = self.list()? else {
            return Err(self.mismatch("a generator-expression call"));
        };
        let body = callee.funbox()?.body;
        let body = if body.is_kind(ParseNodeKind::ArgsBody) {
            body.list()?
                .last()
                .copied()
                .ok_or_else(|| body.mismatch("a non-empty argument list"))?
        } else {
            body
        };
        match body.list()? {
            [first, ..] => Ok(*first),
            [] => Err(body.mismatch("a generator-expression body")),
        }
    }
}
