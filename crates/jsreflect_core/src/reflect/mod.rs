//! The reflect layer: parse trees in, ESTree-style AST values out.
//!
//! - [`operators`] — operator display tables.
//! - [`ast_type`] — the closed set of node types and their callback names.
//! - [`value`] — the AST value model and its allocation capability.
//! - [`builder`] — node construction with optional per-type overrides.
//! - [`serializer`] — parse-tree walk.
//!
//! Entry point: [`reflect_parse`].

pub mod ast_type;
pub mod builder;
pub mod operators;
pub mod serializer;
pub mod value;

use serde::Deserialize;
use tracing::debug;

use crate::error::ReflectResult;
use crate::parser::parse;
use crate::reflect::builder::{NodeBuilder, OverrideTable};
use crate::reflect::serializer::Serializer;
use crate::reflect::value::{AstHeap, AstValue};
use crate::zone::Zone;

/// Default recursion bound shared by the parser and the serializer.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Options of one [`reflect_parse`] call.
///
/// ```
/// use jsreflect_core::ReflectOptions;
///
/// let opts = ReflectOptions::new().source("a.js").line(10);
/// assert!(opts.loc);
/// assert_eq!(opts.line, 10);
/// ```
#[derive(Debug, Clone)]
pub struct ReflectOptions {
    /// Attach source locations to nodes.
    pub loc: bool,
    /// `source` of every location.  Ignored without `loc`.
    pub source: Option<String>,
    /// Number of the first line.  Ignored without `loc`.
    pub line: u32,
    /// Recursion bound for parsing and serialization.
    pub max_depth: usize,
    /// Cap on object, array and string allocations.
    pub max_allocations: Option<usize>,
    /// Per-type construction overrides.
    pub builder: Option<OverrideTable>,
}

impl Default for ReflectOptions {
    fn default() -> Self {
        Self {
            loc: true,
            source: None,
            line: 1,
            max_depth: DEFAULT_MAX_DEPTH,
            max_allocations: None,
            builder: None,
        }
    }
}

impl ReflectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loc(mut self, loc: bool) -> Self {
        self.loc = loc;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_allocations(mut self, max_allocations: usize) -> Self {
        self.max_allocations = Some(max_allocations);
        self
    }

    pub fn builder(mut self, builder: OverrideTable) -> Self {
        self.builder = Some(builder);
        self
    }
}

/// The data-only subset of [`ReflectOptions`], as read from JSON.
///
/// Unknown keys are ignored; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReflectConfig {
    pub loc: bool,
    pub source: Option<String>,
    pub line: u32,
    pub max_depth: usize,
    pub max_allocations: Option<usize>,
}

impl Default for ReflectConfig {
    fn default() -> Self {
        Self {
            loc: true,
            source: None,
            line: 1,
            max_depth: DEFAULT_MAX_DEPTH,
            max_allocations: None,
        }
    }
}

impl From<ReflectConfig> for ReflectOptions {
    fn from(config: ReflectConfig) -> Self {
        Self {
            loc: config.loc,
            source: config.source,
            line: config.line,
            max_depth: config.max_depth,
            max_allocations: config.max_allocations,
            builder: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry point
// ─────────────────────────────────────────────────────────────────────────────

/// Parse `source` and return its AST, rooted at a `Program` node.
///
/// The override table is checked before parsing, so a non-callable entry is
/// reported even for invalid source.
///
/// ```
/// use jsreflect_core::{reflect_parse, ReflectOptions};
///
/// let ast = reflect_parse("x = 1;", &ReflectOptions::new().loc(false)).unwrap();
/// assert_eq!(ast.node_type(), Some("Program"));
/// ```
pub fn reflect_parse(source: &str, opts: &ReflectOptions) -> ReflectResult<AstValue> {
    let heap = AstHeap::with_budget(opts.max_allocations);
    let builder = NodeBuilder::configure(opts.source.as_deref(), opts.loc, opts.builder.as_ref(), heap)?;

    let start_line = if opts.loc { opts.line } else { 1 };
    debug!(
        bytes = source.len(),
        loc = opts.loc,
        start_line,
        max_depth = opts.max_depth,
        "reflect_parse"
    );

    let zone = Zone::new();
    let tree = parse(&zone, source, start_line, opts.max_depth)?;
    debug!(zone_bytes = zone.allocated_bytes(), "parse tree ready");

    let mut serializer = Serializer::new(builder, opts.max_depth);
    let program = serializer.program(tree)?;
    debug!(allocations = serializer.into_builder().into_heap().allocations(), "reflect_parse done");
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ReflectError};
    use crate::reflect::builder::BuilderEntry;

    #[test]
    fn test_defaults() {
        let opts = ReflectOptions::default();
        assert!(opts.loc);
        assert_eq!(opts.line, 1);
        assert_eq!(opts.max_depth, DEFAULT_MAX_DEPTH);
        assert!(opts.source.is_none());
        assert!(opts.builder.is_none());
    }

    #[test]
    fn test_config_from_json() {
        let config: ReflectConfig = serde_json::from_str(r#"{"loc": false, "maxDepth": 64}"#).unwrap();
        assert!(!config.loc);
        assert_eq!(config.line, 1);
        let opts = ReflectOptions::from(config);
        assert_eq!(opts.max_depth, 64);
        assert!(!opts.loc);
    }

    #[test]
    fn test_loc_off_ignores_line_and_source() {
        let opts = ReflectOptions::new().loc(false).line(10).source("a.js");
        let ast = reflect_parse("x;", &opts).unwrap().to_json();
        assert!(ast["loc"].is_null());
        assert!(ast["body"][0]["loc"].is_null());
    }

    #[test]
    fn test_line_offset() {
        let ast = reflect_parse("x;\ny;", &ReflectOptions::new().line(10)).unwrap().to_json();
        assert_eq!(ast["body"][0]["loc"]["start"]["line"], 10);
        assert_eq!(ast["body"][1]["loc"]["start"]["line"], 11);
    }

    #[test]
    fn test_type_error_before_syntax_error() {
        let mut table = OverrideTable::new();
        table.insert("identifier", BuilderEntry::Other(AstValue::Number(1.0)));
        let err = reflect_parse("(((", &ReflectOptions::new().builder(table)).unwrap_err();
        assert!(matches!(err, ReflectError::TypeError(_)));
        assert_eq!(err.kind(), ErrorKind::User);
    }

    #[test]
    fn test_syntax_error_is_user_error() {
        let err = reflect_parse("var;", &ReflectOptions::new()).unwrap_err();
        assert!(matches!(err, ReflectError::SyntaxError { .. }));
        assert_eq!(err.kind(), ErrorKind::User);
    }

    #[test]
    fn test_allocation_budget() {
        let err = reflect_parse("a + b;", &ReflectOptions::new().max_allocations(3)).unwrap_err();
        assert_eq!(err, ReflectError::OutOfMemory);
        assert_eq!(err.kind(), ErrorKind::Resource);
    }
}
