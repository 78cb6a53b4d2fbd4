//! Operator display tables.
//!
//! Three fixed tables map operator codes to the token strings that appear in
//! the `operator` field of assignment, binary and unary expression nodes.
//! The resolvers translate parse-tree operators into table entries; a code
//! outside a table is an internal-consistency error.

use crate::error::{ReflectError, ReflectResult};
use crate::parser::parse_node::{JsOp, ParseNodeKind};

// ─────────────────────────────────────────────────────────────────────────────
// Assignment operators
// ─────────────────────────────────────────────────────────────────────────────

/// Assignment operators, in display-table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentOperator {
    Assign,
    Plus,
    Minus,
    Star,
    Div,
    Mod,
    Lsh,
    Rsh,
    Ursh,
    BitOr,
    BitXor,
    BitAnd,
}

impl AssignmentOperator {
    pub const ALL: [AssignmentOperator; 12] = [
        Self::Assign,
        Self::Plus,
        Self::Minus,
        Self::Star,
        Self::Div,
        Self::Mod,
        Self::Lsh,
        Self::Rsh,
        Self::Ursh,
        Self::BitOr,
        Self::BitXor,
        Self::BitAnd,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Plus => "+=",
            Self::Minus => "-=",
            Self::Star => "*=",
            Self::Div => "/=",
            Self::Mod => "%=",
            Self::Lsh => "<<=",
            Self::Rsh => ">>=",
            Self::Ursh => ">>>=",
            Self::BitOr => "|=",
            Self::BitXor => "^=",
            Self::BitAnd => "&=",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Binary operators
// ─────────────────────────────────────────────────────────────────────────────

/// Non-logical binary operators, in display-table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    Lsh,
    Rsh,
    Ursh,
    Plus,
    Minus,
    Star,
    Div,
    Mod,
    BitOr,
    BitXor,
    BitAnd,
    In,
    Instanceof,
    /// E4X descendants, `a..b`.
    #[cfg(feature = "e4x")]
    DblDot,
}

impl BinaryOperator {
    pub const ALL: &'static [BinaryOperator] = &[
        Self::Eq,
        Self::Ne,
        Self::StrictEq,
        Self::StrictNe,
        Self::Lt,
        Self::Le,
        Self::Gt,
        Self::Ge,
        Self::Lsh,
        Self::Rsh,
        Self::Ursh,
        Self::Plus,
        Self::Minus,
        Self::Star,
        Self::Div,
        Self::Mod,
        Self::BitOr,
        Self::BitXor,
        Self::BitAnd,
        Self::In,
        Self::Instanceof,
        #[cfg(feature = "e4x")]
        Self::DblDot,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::StrictEq => "===",
            Self::StrictNe => "!==",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lsh => "<<",
            Self::Rsh => ">>",
            Self::Ursh => ">>>",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::BitAnd => "&",
            Self::In => "in",
            Self::Instanceof => "instanceof",
            #[cfg(feature = "e4x")]
            Self::DblDot => "..",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Unary operators
// ─────────────────────────────────────────────────────────────────────────────

/// Prefix unary operators, in display-table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Delete,
    Neg,
    Pos,
    Not,
    BitNot,
    Typeof,
    Void,
}

impl UnaryOperator {
    pub const ALL: [UnaryOperator; 7] = [
        Self::Delete,
        Self::Neg,
        Self::Pos,
        Self::Not,
        Self::BitNot,
        Self::Typeof,
        Self::Void,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Neg => "-",
            Self::Pos => "+",
            Self::Not => "!",
            Self::BitNot => "~",
            Self::Typeof => "typeof",
            Self::Void => "void",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolvers
// ─────────────────────────────────────────────────────────────────────────────

/// Resolve the operator of an assignment node.  Plain `=` carries no
/// arithmetic op.
pub fn aop(op: JsOp) -> ReflectResult<AssignmentOperator> {
    Ok(match op {
        JsOp::Nop => AssignmentOperator::Assign,
        JsOp::Add => AssignmentOperator::Plus,
        JsOp::Sub => AssignmentOperator::Minus,
        JsOp::Mul => AssignmentOperator::Star,
        JsOp::Div => AssignmentOperator::Div,
        JsOp::Mod => AssignmentOperator::Mod,
        JsOp::Lsh => AssignmentOperator::Lsh,
        JsOp::Rsh => AssignmentOperator::Rsh,
        JsOp::Ursh => AssignmentOperator::Ursh,
        JsOp::BitOr => AssignmentOperator::BitOr,
        JsOp::BitXor => AssignmentOperator::BitXor,
        JsOp::BitAnd => AssignmentOperator::BitAnd,
        other => {
            return Err(ReflectError::bad_parse_node(format!(
                "no assignment operator for {other:?}"
            )));
        }
    })
}

/// Resolve the operator of a binary node from its kind.
pub fn binop(kind: ParseNodeKind) -> ReflectResult<BinaryOperator> {
    Ok(match kind {
        ParseNodeKind::Lsh => BinaryOperator::Lsh,
        ParseNodeKind::Rsh => BinaryOperator::Rsh,
        ParseNodeKind::Ursh => BinaryOperator::Ursh,
        ParseNodeKind::Lt => BinaryOperator::Lt,
        ParseNodeKind::Le => BinaryOperator::Le,
        ParseNodeKind::Gt => BinaryOperator::Gt,
        ParseNodeKind::Ge => BinaryOperator::Ge,
        ParseNodeKind::Eq => BinaryOperator::Eq,
        ParseNodeKind::Ne => BinaryOperator::Ne,
        ParseNodeKind::StrictEq => BinaryOperator::StrictEq,
        ParseNodeKind::StrictNe => BinaryOperator::StrictNe,
        ParseNodeKind::Add => BinaryOperator::Plus,
        ParseNodeKind::Sub => BinaryOperator::Minus,
        ParseNodeKind::Star => BinaryOperator::Star,
        ParseNodeKind::Div => BinaryOperator::Div,
        ParseNodeKind::Mod => BinaryOperator::Mod,
        ParseNodeKind::BitOr => BinaryOperator::BitOr,
        ParseNodeKind::BitXor => BinaryOperator::BitXor,
        ParseNodeKind::BitAnd => BinaryOperator::BitAnd,
        ParseNodeKind::In => BinaryOperator::In,
        ParseNodeKind::Instanceof => BinaryOperator::Instanceof,
        #[cfg(feature = "e4x")]
        ParseNodeKind::DblDot => BinaryOperator::DblDot,
        other => {
            return Err(ReflectError::bad_parse_node(format!(
                "no binary operator for {other:?}"
            )));
        }
    })
}

/// Resolve the operator of a unary node.  `delete` is identified by kind
/// since its op varies with the operand.
pub fn unop(kind: ParseNodeKind, op: JsOp) -> ReflectResult<UnaryOperator> {
    if kind == ParseNodeKind::Delete {
        return Ok(UnaryOperator::Delete);
    }
    Ok(match op {
        JsOp::Neg => UnaryOperator::Neg,
        JsOp::Pos => UnaryOperator::Pos,
        JsOp::Not => UnaryOperator::Not,
        JsOp::BitNot => UnaryOperator::BitNot,
        JsOp::Typeof => UnaryOperator::Typeof,
        JsOp::Void => UnaryOperator::Void,
        other => {
            return Err(ReflectError::bad_parse_node(format!(
                "no unary operator for {other:?}"
            )));
        }
    })
}
